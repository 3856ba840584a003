use super::{ParamInitializer, BIAS_KEY, GAIN_KEY, RECURRENT_WEIGHT_KEY, WEIGHT_KEY};
use crate::{
    carve, plan::count_params, LayerKind, LayerSpec, LayoutError, LayoutPlan, NamedViews,
    ParamRole, Result, Segment, WeightInit,
};

const FAMILY: &str = "simple_rnn";

struct RnnDims {
    n_in: usize,
    n_out: usize,
    use_bias: bool,
    layer_norm: bool,
}

/// Simple (Elman) recurrent unit: input weights `(n_in, n_out)`,
/// recurrent weights `(n_out, n_out)`, then the optional bias and the
/// optional layer-norm gains. The gain segment holds `2 * n_out` values,
/// one gain vector per normalized pre-activation term.
#[derive(Debug)]
pub struct SimpleRnnParams;

impl SimpleRnnParams {
    fn dims(&self, spec: &LayerSpec) -> Result<RnnDims> {
        spec.validate()?;

        match *spec.kind() {
            LayerKind::SimpleRnn {
                n_in,
                n_out,
                use_bias,
                layer_norm,
            } => Ok(RnnDims {
                n_in,
                n_out,
                use_bias,
                layer_norm,
            }),
            _ => Err(LayoutError::InvalidConfiguration {
                family: FAMILY,
                what: "spec is not a simple RNN layer",
            }),
        }
    }
}

impl ParamInitializer for SimpleRnnParams {
    fn family(&self) -> &'static str {
        FAMILY
    }

    fn num_params(&self, spec: &LayerSpec) -> Result<usize> {
        self.dims(spec)?;
        count_params(spec)
    }

    fn param_keys(&self, spec: &LayerSpec) -> Result<Vec<&'static str>> {
        let mut keys = self.weight_keys(spec)?;
        keys.extend(self.bias_keys(spec)?);
        Ok(keys)
    }

    fn weight_keys(&self, spec: &LayerSpec) -> Result<Vec<&'static str>> {
        let dims = self.dims(spec)?;

        let mut keys = vec![WEIGHT_KEY, RECURRENT_WEIGHT_KEY];
        if dims.layer_norm {
            keys.push(GAIN_KEY);
        }
        Ok(keys)
    }

    fn bias_keys(&self, spec: &LayerSpec) -> Result<Vec<&'static str>> {
        let dims = self.dims(spec)?;
        Ok(if dims.use_bias { vec![BIAS_KEY] } else { vec![] })
    }

    fn plan(&self, spec: &LayerSpec) -> Result<LayoutPlan> {
        let dims = self.dims(spec)?;
        let n = dims.n_out;

        let mut segments = vec![
            Segment::new(WEIGHT_KEY, ParamRole::Weight, vec![dims.n_in, n]),
            Segment::new(RECURRENT_WEIGHT_KEY, ParamRole::Weight, vec![n, n]),
        ];
        if dims.use_bias {
            segments.push(Segment::new(BIAS_KEY, ParamRole::Bias, vec![n]));
        }
        if dims.layer_norm {
            segments.push(Segment::new(GAIN_KEY, ParamRole::Gain, vec![2 * n]));
        }

        LayoutPlan::new(FAMILY, segments, count_params(spec)?)
    }

    fn init<'a>(
        &self,
        spec: &LayerSpec,
        params: &'a mut [f32],
        init_params: bool,
        weight_init: &dyn WeightInit,
    ) -> Result<NamedViews<'a>> {
        let dims = self.dims(spec)?;
        let mut views = carve(params, &self.plan(spec)?)?;

        if init_params {
            if let Some(w) = views.get_mut(WEIGHT_KEY) {
                weight_init.init(dims.n_in as f64, dims.n_out as f64, w)?;
            }
            if let Some(rw) = views.get_mut(RECURRENT_WEIGHT_KEY) {
                weight_init.init(dims.n_out as f64, dims.n_out as f64, rw)?;
            }
            if dims.use_bias {
                if let Some(b) = views.get_mut(BIAS_KEY) {
                    b.fill(spec.bias_init());
                }
            }
            if dims.layer_norm {
                if let Some(g) = views.get_mut(GAIN_KEY) {
                    g.fill(spec.gain_init());
                }
            }
        }

        Ok(views)
    }
}
