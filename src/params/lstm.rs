use super::{ParamInitializer, BIAS_KEY, RECURRENT_WEIGHT_KEY, WEIGHT_KEY};
use crate::{
    carve, plan::count_params, LayerKind, LayerSpec, LayoutError, LayoutPlan, NamedViews,
    ParamRole, Result, Segment, WeightInit,
};

const FAMILY: &str = "lstm";

/// LSTM parameters in the IFOG gate order: input weights
/// `(n_in, 4 * n_out)`, recurrent weights `(n_out, 4 * n_out)`, then one
/// bias per gate unit `(4 * n_out,)`.
///
/// On first initialization the forget-gate quarter of the bias,
/// `[n_out, 2 * n_out)`, is overwritten with the spec's forget-gate
/// constant. Forget gates that start near 1 keep early gradients from
/// vanishing over long ranges (Sutskever's thesis, p. 19).
#[derive(Debug)]
pub struct LstmParams;

impl LstmParams {
    fn dims(&self, spec: &LayerSpec) -> Result<(usize, usize)> {
        spec.validate()?;

        match *spec.kind() {
            LayerKind::Lstm { n_in, n_out } => Ok((n_in, n_out)),
            _ => Err(LayoutError::InvalidConfiguration {
                family: FAMILY,
                what: "spec is not an LSTM layer",
            }),
        }
    }
}

impl ParamInitializer for LstmParams {
    fn family(&self) -> &'static str {
        FAMILY
    }

    fn num_params(&self, spec: &LayerSpec) -> Result<usize> {
        self.dims(spec)?;
        count_params(spec)
    }

    fn param_keys(&self, spec: &LayerSpec) -> Result<Vec<&'static str>> {
        self.dims(spec)?;
        Ok(vec![WEIGHT_KEY, RECURRENT_WEIGHT_KEY, BIAS_KEY])
    }

    fn weight_keys(&self, spec: &LayerSpec) -> Result<Vec<&'static str>> {
        self.dims(spec)?;
        Ok(vec![WEIGHT_KEY, RECURRENT_WEIGHT_KEY])
    }

    fn bias_keys(&self, spec: &LayerSpec) -> Result<Vec<&'static str>> {
        self.dims(spec)?;
        Ok(vec![BIAS_KEY])
    }

    fn plan(&self, spec: &LayerSpec) -> Result<LayoutPlan> {
        let (n_in, n_out) = self.dims(spec)?;

        let segments = vec![
            Segment::new(WEIGHT_KEY, ParamRole::Weight, vec![n_in, 4 * n_out]),
            Segment::new(
                RECURRENT_WEIGHT_KEY,
                ParamRole::Weight,
                vec![n_out, 4 * n_out],
            ),
            Segment::new(BIAS_KEY, ParamRole::Bias, vec![4 * n_out]),
        ];

        LayoutPlan::new(FAMILY, segments, count_params(spec)?)
    }

    fn init<'a>(
        &self,
        spec: &LayerSpec,
        params: &'a mut [f32],
        init_params: bool,
        weight_init: &dyn WeightInit,
    ) -> Result<NamedViews<'a>> {
        let (n_in, n_out) = self.dims(spec)?;
        let mut views = carve(params, &self.plan(spec)?)?;

        if init_params {
            let fan_in = n_out as f64;
            let fan_out = (n_in + n_out) as f64;

            if let Some(w) = views.get_mut(WEIGHT_KEY) {
                weight_init.init(fan_in, fan_out, w)?;
            }
            if let Some(rw) = views.get_mut(RECURRENT_WEIGHT_KEY) {
                weight_init.init(fan_in, fan_out, rw)?;
            }
            if let Some(b) = views.get_mut(BIAS_KEY) {
                b.fill(spec.bias_init());
                // Forget-gate range, written after the general fill so it
                // overrides it.
                let forget = spec.forget_gate_bias_init();
                for unit in n_out..2 * n_out {
                    b[[unit]] = forget;
                }
            }
        }

        Ok(views)
    }
}
