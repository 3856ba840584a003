use super::{ParamInitializer, BIAS_KEY, WEIGHT_KEY};
use crate::{
    carve, plan::count_params, LayerKind, LayerSpec, LayoutError, LayoutPlan, NamedViews,
    ParamRole, Result, Segment, WeightInit,
};

const FAMILY: &str = "depthwise_convolution2d";

struct DepthwiseDims {
    n_in: usize,
    depth_multiplier: usize,
    kernel: [usize; 2],
    stride: [usize; 2],
    has_bias: bool,
}

impl DepthwiseDims {
    /// Output channel count: every input channel spawns
    /// `depth_multiplier` feature maps.
    fn n_out(&self) -> usize {
        self.n_in * self.depth_multiplier
    }
}

/// Depthwise 2-D convolution: one `(kh, kw, n_in, depth_multiplier)`
/// kernel stack plus one bias per produced feature map, bias at the low
/// offsets like the standard convolution.
#[derive(Debug)]
pub struct DepthwiseConvolutionParams;

impl DepthwiseConvolutionParams {
    fn dims(&self, spec: &LayerSpec) -> Result<DepthwiseDims> {
        spec.validate()?;

        match *spec.kind() {
            LayerKind::DepthwiseConvolution2D {
                n_in,
                depth_multiplier,
                kernel,
                stride,
                has_bias,
            } => Ok(DepthwiseDims {
                n_in,
                depth_multiplier,
                kernel,
                stride,
                has_bias,
            }),
            _ => Err(LayoutError::InvalidConfiguration {
                family: FAMILY,
                what: "spec is not a depthwise convolution layer",
            }),
        }
    }
}

impl ParamInitializer for DepthwiseConvolutionParams {
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
        let dims = self.dims(spec)?;
        Ok(if dims.has_bias { vec![BIAS_KEY] } else { vec![] })
    }

    fn plan(&self, spec: &LayerSpec) -> Result<LayoutPlan> {
        let dims = self.dims(spec)?;
        let [kh, kw] = dims.kernel;

        let mut segments = Vec::with_capacity(2);
        if dims.has_bias {
            segments.push(Segment::new(BIAS_KEY, ParamRole::Bias, vec![dims.n_out()]));
        }
        segments.push(Segment::new(
            WEIGHT_KEY,
            ParamRole::Weight,
            vec![kh, kw, dims.n_in, dims.depth_multiplier],
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
            if let Some(w) = views.get_mut(WEIGHT_KEY) {
                let [kh, kw] = dims.kernel;
                let [sh, sw] = dims.stride;
                let fan_in = (dims.n_in * kh * kw) as f64;
                let fan_out = (dims.depth_multiplier * kh * kw) as f64 / (sh * sw) as f64;
                weight_init.init(fan_in, fan_out, w)?;
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
        LayerSpec::new(LayerKind::DepthwiseConvolution2D {
            n_in: 3,
            depth_multiplier: 2,
            kernel: [3, 3],
            stride: [1, 1],
            has_bias: true,
        })
    }

    #[test]
    fn one_bias_per_produced_feature_map() {
        let plan = DepthwiseConvolutionParams.plan(&spec()).unwrap();

        assert_eq!(plan.segments()[0].name(), BIAS_KEY);
        assert_eq!(plan.segments()[0].shape(), &[6]);
        assert_eq!(plan.segments()[1].shape(), &[3, 3, 3, 2]);
        assert_eq!(plan.total_len(), 54 + 6);
    }

    #[test]
    fn init_splits_bias_and_weights() {
        let mut buffer = vec![0.0f32; 60];

        DepthwiseConvolutionParams
            .init(&spec().with_bias_init(1.0), &mut buffer, true, &Constant(3.0))
            .unwrap();

        assert!(buffer[..6].iter().all(|&x| x == 1.0));
        assert!(buffer[6..].iter().all(|&x| x == 3.0));
    }
}
