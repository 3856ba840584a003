use super::{
    ParamInitializer, BETA_KEY, GAMMA_KEY, GLOBAL_LOG_STD_KEY, GLOBAL_MEAN_KEY, GLOBAL_VAR_KEY,
};
use crate::{
    carve, plan::count_params, LayerKind, LayerSpec, LayoutError, LayoutPlan, NamedViews,
    ParamRole, Result, Segment, WeightInit,
};

const FAMILY: &str = "batch_norm";

struct BatchNormDims {
    n_out: usize,
    use_log_std: bool,
    trainable_gamma_beta: bool,
}

impl BatchNormDims {
    fn spread_key(&self) -> &'static str {
        if self.use_log_std {
            GLOBAL_LOG_STD_KEY
        } else {
            GLOBAL_VAR_KEY
        }
    }
}

/// Batch normalization.
///
/// The running mean and the running spread estimate (variance, or log10
/// standard deviation when `use_log_std` is set) are kept as parameters
/// so a saved flat vector restores inference behavior on its own. Gamma
/// and beta stay fixed unless `trainable_gamma_beta` is set, in which
/// case they occupy the low offsets ahead of the statistics.
#[derive(Debug)]
pub struct BatchNormParams;

impl BatchNormParams {
    fn dims(&self, spec: &LayerSpec) -> Result<BatchNormDims> {
        spec.validate()?;

        match *spec.kind() {
            LayerKind::BatchNorm {
                n_out,
                use_log_std,
                trainable_gamma_beta,
            } => Ok(BatchNormDims {
                n_out,
                use_log_std,
                trainable_gamma_beta,
            }),
            _ => Err(LayoutError::InvalidConfiguration {
                family: FAMILY,
                what: "spec is not a batch normalization layer",
            }),
        }
    }
}

impl ParamInitializer for BatchNormParams {
    fn family(&self) -> &'static str {
        FAMILY
    }

    fn num_params(&self, spec: &LayerSpec) -> Result<usize> {
        self.dims(spec)?;
        count_params(spec)
    }

    fn param_keys(&self, spec: &LayerSpec) -> Result<Vec<&'static str>> {
        let dims = self.dims(spec)?;

        let mut keys = Vec::with_capacity(4);
        if dims.trainable_gamma_beta {
            keys.push(GAMMA_KEY);
            keys.push(BETA_KEY);
        }
        keys.push(GLOBAL_MEAN_KEY);
        keys.push(dims.spread_key());
        Ok(keys)
    }

    fn weight_keys(&self, spec: &LayerSpec) -> Result<Vec<&'static str>> {
        let dims = self.dims(spec)?;
        Ok(if dims.trainable_gamma_beta {
            vec![GAMMA_KEY, BETA_KEY]
        } else {
            vec![]
        })
    }

    fn bias_keys(&self, spec: &LayerSpec) -> Result<Vec<&'static str>> {
        self.dims(spec)?;
        Ok(vec![])
    }

    fn plan(&self, spec: &LayerSpec) -> Result<LayoutPlan> {
        let dims = self.dims(spec)?;
        let n = dims.n_out;

        let mut segments = Vec::with_capacity(4);
        if dims.trainable_gamma_beta {
            segments.push(Segment::new(GAMMA_KEY, ParamRole::Gain, vec![n]));
            segments.push(Segment::new(BETA_KEY, ParamRole::Bias, vec![n]));
        }
        segments.push(Segment::new(GLOBAL_MEAN_KEY, ParamRole::RunningStat, vec![n]));
        segments.push(Segment::new(dims.spread_key(), ParamRole::RunningStat, vec![n]));

        LayoutPlan::new(FAMILY, segments, count_params(spec)?)
    }

    fn init<'a>(
        &self,
        spec: &LayerSpec,
        params: &'a mut [f32],
        init_params: bool,
        _weight_init: &dyn WeightInit,
    ) -> Result<NamedViews<'a>> {
        let dims = self.dims(spec)?;
        let mut views = carve(params, &self.plan(spec)?)?;

        if init_params {
            if dims.trainable_gamma_beta {
                if let Some(gamma) = views.get_mut(GAMMA_KEY) {
                    gamma.fill(spec.gain_init());
                }
                if let Some(beta) = views.get_mut(BETA_KEY) {
                    beta.fill(spec.bias_init());
                }
            }

            // Mean 0 plus variance 0 (or log10 stdev 0) both read as "no
            // normalization adjustment accumulated yet": s = sqrt(v) with
            // the estimate treated as identity, and log10(1) = 0.
            if let Some(mean) = views.get_mut(GLOBAL_MEAN_KEY) {
                mean.fill(0.0);
            }
            if let Some(spread) = views.get_mut(dims.spread_key()) {
                spread.fill(0.0);
            }
        }

        Ok(views)
    }
}
