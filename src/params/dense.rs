use super::{ParamInitializer, BIAS_KEY, WEIGHT_KEY};
use crate::{
    carve, plan::count_params, LayerKind, LayerSpec, LayoutError, LayoutPlan, NamedViews,
    ParamRole, Result, Segment, WeightInit,
};

const FAMILY: &str = "dense";

/// Fully connected layer: a `(n_in, n_out)` weight matrix followed by an
/// optional `(n_out,)` bias, weights at the low offsets.
#[derive(Debug)]
pub struct DenseParams;

impl DenseParams {
    fn dims(&self, spec: &LayerSpec) -> Result<(usize, usize, bool)> {
        spec.validate()?;

        match *spec.kind() {
            LayerKind::Dense {
                n_in,
                n_out,
                has_bias,
            } => Ok((n_in, n_out, has_bias)),
            _ => Err(LayoutError::InvalidConfiguration {
                family: FAMILY,
                what: "spec is not a dense layer",
            }),
        }
    }
}

impl ParamInitializer for DenseParams {
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
        self.dims(spec)?;
        Ok(vec![WEIGHT_KEY])
    }

    fn bias_keys(&self, spec: &LayerSpec) -> Result<Vec<&'static str>> {
        let (_, _, has_bias) = self.dims(spec)?;
        Ok(if has_bias { vec![BIAS_KEY] } else { vec![] })
    }

    fn plan(&self, spec: &LayerSpec) -> Result<LayoutPlan> {
        let (n_in, n_out, has_bias) = self.dims(spec)?;

        let mut segments = vec![Segment::new(WEIGHT_KEY, ParamRole::Weight, vec![n_in, n_out])];
        if has_bias {
            segments.push(Segment::new(BIAS_KEY, ParamRole::Bias, vec![n_out]));
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
        let (n_in, n_out, has_bias) = self.dims(spec)?;
        let mut views = carve(params, &self.plan(spec)?)?;

        if init_params {
            if let Some(w) = views.get_mut(WEIGHT_KEY) {
                weight_init.init(n_in as f64, n_out as f64, w)?;
            }
            if has_bias {
                if let Some(b) = views.get_mut(BIAS_KEY) {
                    b.fill(spec.bias_init());
                }
            }
        }

        Ok(views)
    }
}
