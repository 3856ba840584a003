use super::{ParamInitializer, BIAS_KEY, POINTWISE_WEIGHT_KEY, WEIGHT_KEY};
use crate::{
    carve, plan::count_params, LayerKind, LayerSpec, LayoutError, LayoutPlan, NamedViews,
    ParamRole, Result, Segment, WeightInit,
};

const FAMILY: &str = "separable_convolution2d";

struct SeparableDims {
    n_in: usize,
    n_out: usize,
    depth_multiplier: usize,
    kernel: [usize; 2],
    stride: [usize; 2],
    has_bias: bool,
}

/// Separable 2-D convolution: a depthwise kernel stack
/// `(depth_multiplier, n_in, kh, kw)` followed by a 1x1 pointwise mix
/// `(n_out, depth_multiplier * n_in, 1, 1)`, with the optional bias at
/// the low offsets before both.
#[derive(Debug)]
pub struct SeparableConvolutionParams;

impl SeparableConvolutionParams {
    fn dims(&self, spec: &LayerSpec) -> Result<SeparableDims> {
        spec.validate()?;

        match *spec.kind() {
            LayerKind::SeparableConvolution2D {
                n_in,
                n_out,
                depth_multiplier,
                kernel,
                stride,
                has_bias,
            } => Ok(SeparableDims {
                n_in,
                n_out,
                depth_multiplier,
                kernel,
                stride,
                has_bias,
            }),
            _ => Err(LayoutError::InvalidConfiguration {
                family: FAMILY,
                what: "spec is not a separable convolution layer",
            }),
        }
    }
}

impl ParamInitializer for SeparableConvolutionParams {
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
        Ok(vec![WEIGHT_KEY, POINTWISE_WEIGHT_KEY])
    }

    fn bias_keys(&self, spec: &LayerSpec) -> Result<Vec<&'static str>> {
        let dims = self.dims(spec)?;
        Ok(if dims.has_bias { vec![BIAS_KEY] } else { vec![] })
    }

    fn plan(&self, spec: &LayerSpec) -> Result<LayoutPlan> {
        let dims = self.dims(spec)?;
        let [kh, kw] = dims.kernel;

        let mut segments = Vec::with_capacity(3);
        if dims.has_bias {
            segments.push(Segment::new(BIAS_KEY, ParamRole::Bias, vec![dims.n_out]));
        }
        segments.push(Segment::new(
            WEIGHT_KEY,
            ParamRole::Weight,
            vec![dims.depth_multiplier, dims.n_in, kh, kw],
        ));
        segments.push(Segment::new(
            POINTWISE_WEIGHT_KEY,
            ParamRole::Weight,
            vec![dims.n_out, dims.depth_multiplier * dims.n_in, 1, 1],
        ));

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
            if dims.has_bias {
                if let Some(b) = views.get_mut(BIAS_KEY) {
                    b.fill(spec.bias_init());
                }
            }

            let [kh, kw] = dims.kernel;
            let [sh, sw] = dims.stride;

            if let Some(w) = views.get_mut(WEIGHT_KEY) {
                let fan_in = (dims.n_in * kh * kw) as f64;
                let fan_out = (dims.depth_multiplier * kh * kw) as f64 / (sh * sw) as f64;
                weight_init.init(fan_in, fan_out, w)?;
            }

            if let Some(pw) = views.get_mut(POINTWISE_WEIGHT_KEY) {
                // The pointwise stage sees every depthwise map once, so
                // both fans are the map count.
                let fan = (dims.n_in * dims.depth_multiplier) as f64;
                weight_init.init(fan, fan, pw)?;
            }
        }

        Ok(views)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Constant;

    fn spec() -> LayerSpec {
        LayerSpec::new(LayerKind::SeparableConvolution2D {
            n_in: 3,
            n_out: 8,
            depth_multiplier: 2,
            kernel: [3, 3],
            stride: [1, 1],
            has_bias: true,
        })
    }

    #[test]
    fn plan_is_bias_depthwise_pointwise() {
        let plan = SeparableConvolutionParams.plan(&spec()).unwrap();

        let names: Vec<_> = plan.segments().iter().map(|s| s.name()).collect();
        assert_eq!(names, [BIAS_KEY, WEIGHT_KEY, POINTWISE_WEIGHT_KEY]);

        assert_eq!(plan.segments()[1].shape(), &[2, 3, 3, 3]);
        assert_eq!(plan.segments()[2].shape(), &[8, 6, 1, 1]);
        assert_eq!(plan.total_len(), 8 + 54 + 48);
    }

    #[test]
    fn both_weight_stages_are_weight_keys() {
        let spec = spec();
        let params = SeparableConvolutionParams;

        assert_eq!(
            params.weight_keys(&spec).unwrap(),
            [WEIGHT_KEY, POINTWISE_WEIGHT_KEY]
        );
        assert!(params.is_weight_param(&spec, POINTWISE_WEIGHT_KEY).unwrap());
        assert!(params.is_bias_param(&spec, BIAS_KEY).unwrap());
        assert!(!params.is_bias_param(&spec, WEIGHT_KEY).unwrap());
    }

    #[test]
    fn gradients_match_the_parameter_layout() {
        let spec = spec();
        let params = SeparableConvolutionParams;

        let mut grad = vec![0.0f32; 110];
        let views = params.gradients_from_flattened(&spec, &mut grad).unwrap();

        assert_eq!(
            views.keys().collect::<Vec<_>>(),
            [BIAS_KEY, WEIGHT_KEY, POINTWISE_WEIGHT_KEY]
        );
        assert_eq!(views.get(POINTWISE_WEIGHT_KEY).unwrap().shape(), &[8, 6, 1, 1]);
    }

    #[test]
    fn init_fills_the_three_segments() {
        let mut buffer = vec![0.0f32; 110];

        SeparableConvolutionParams
            .init(&spec().with_bias_init(-1.0), &mut buffer, true, &Constant(0.5))
            .unwrap();

        assert!(buffer[..8].iter().all(|&x| x == -1.0));
        assert!(buffer[8..].iter().all(|&x| x == 0.5));
    }
}
