use super::{ParamInitializer, BIAS_KEY, WEIGHT_KEY};
use crate::{
    carve, plan::count_params, LayerKind, LayerSpec, LayoutError, LayoutPlan, NamedViews,
    ParamRole, Result, Segment, WeightInit,
};

const FAMILY_2D: &str = "convolution2d";
const FAMILY_1D: &str = "convolution1d";

struct ConvDims {
    n_in: usize,
    n_out: usize,
    kernel: Vec<usize>,
    stride: Vec<usize>,
    has_bias: bool,
}

impl ConvDims {
    fn kernel_len(&self) -> usize {
        self.kernel.iter().product()
    }

    fn stride_len(&self) -> usize {
        self.stride.iter().product()
    }

    /// Weight tensor shape: `(out_channels, in_channels, spatial...)` in
    /// row-major order.
    fn weight_shape(&self) -> Vec<usize> {
        let mut shape = vec![self.n_out, self.n_in];
        shape.extend_from_slice(&self.kernel);
        shape
    }
}

/// Standard 1-D / 2-D convolution.
///
/// The flat buffer stores the bias at the low offsets and the kernel
/// weights after it, the opposite of the dense convention. That order is
/// frozen; serialized vectors depend on it.
#[derive(Debug)]
pub struct ConvolutionParams;

impl ConvolutionParams {
    fn dims(&self, spec: &LayerSpec) -> Result<ConvDims> {
        spec.validate()?;

        match *spec.kind() {
            LayerKind::Convolution2D {
                n_in,
                n_out,
                kernel,
                stride,
                has_bias,
            } => Ok(ConvDims {
                n_in,
                n_out,
                kernel: kernel.to_vec(),
                stride: stride.to_vec(),
                has_bias,
            }),
            LayerKind::Convolution1D {
                n_in,
                n_out,
                kernel,
                stride,
                has_bias,
            } => Ok(ConvDims {
                n_in,
                n_out,
                kernel: vec![kernel],
                stride: vec![stride],
                has_bias,
            }),
            _ => Err(LayoutError::InvalidConfiguration {
                family: FAMILY_2D,
                what: "spec is not a convolution layer",
            }),
        }
    }

    fn family_of(&self, spec: &LayerSpec) -> &'static str {
        match spec.kind() {
            LayerKind::Convolution1D { .. } => FAMILY_1D,
            _ => FAMILY_2D,
        }
    }
}

impl ParamInitializer for ConvolutionParams {
    fn family(&self) -> &'static str {
        FAMILY_2D
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

        let mut segments = Vec::with_capacity(2);
        if dims.has_bias {
            segments.push(Segment::new(BIAS_KEY, ParamRole::Bias, vec![dims.n_out]));
        }
        segments.push(Segment::new(
            WEIGHT_KEY,
            ParamRole::Weight,
            dims.weight_shape(),
        ));

        LayoutPlan::new(self.family_of(spec), segments, count_params(spec)?)
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
                let fan_in = (dims.n_in * dims.kernel_len()) as f64;
                let fan_out = (dims.n_out * dims.kernel_len()) as f64 / dims.stride_len() as f64;
                weight_init.init(fan_in, fan_out, w)?;
            }
        }

        Ok(views)
    }
}
