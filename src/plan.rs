use crate::{LayerKind, LayerSpec, LayoutError, Result};

/// What a parameter segment holds, which decides how it is filled on
/// first initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamRole {
    /// Filled by the pluggable weight-init strategy.
    Weight,
    /// Filled with the spec's bias-init constant.
    Bias,
    /// Filled with the spec's gain-init constant.
    Gain,
    /// Running statistic, filled with zero.
    RunningStat,
}

/// A named, shaped, contiguous sub-range of the flat parameter vector.
///
/// The element count is always the product of `shape`, so a segment can
/// never describe a view that would not reshape cleanly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    name: &'static str,
    role: ParamRole,
    shape: Vec<usize>,
}

impl Segment {
    pub fn new(name: &'static str, role: ParamRole, shape: Vec<usize>) -> Self {
        Self { name, role, shape }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn role(&self) -> ParamRole {
        self.role
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// The number of scalar elements this segment occupies.
    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The ordered segment sequence for one layer.
///
/// Segment order is part of the ABI: serialized flat vectors are only
/// readable with the exact order their layer family emitted, so the
/// per-family orders are frozen. Plans are derived fresh from the spec
/// whenever needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutPlan {
    family: &'static str,
    segments: Vec<Segment>,
    total_len: usize,
}

impl LayoutPlan {
    /// Builds a plan from a family's segments, cross-checking the segment
    /// lengths against the independently computed parameter count.
    ///
    /// # Errors
    /// Returns `ShapeMismatch` if the sum of the segment lengths differs
    /// from `counted`. The planners and the counter are the two code
    /// paths that silently corrupt training when they drift apart, so the
    /// disagreement is refused here rather than trusted.
    pub fn new(family: &'static str, segments: Vec<Segment>, counted: usize) -> Result<Self> {
        let total_len = segments.iter().map(Segment::len).sum();

        if total_len != counted {
            return Err(LayoutError::ShapeMismatch {
                family,
                planned: total_len,
                counted,
            });
        }

        Ok(Self {
            family,
            segments,
            total_len,
        })
    }

    pub fn family(&self) -> &'static str {
        self.family
    }

    /// The segments in buffer order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// The total number of scalar elements the layer needs.
    pub fn total_len(&self) -> usize {
        self.total_len
    }
}

/// Counts the scalar parameters a layer needs, without planning segments.
///
/// This is deliberately independent arithmetic: every planner's segment
/// sum is checked against it in `LayoutPlan::new`.
///
/// # Errors
/// Returns `InvalidConfiguration` for a malformed spec.
pub(crate) fn count_params(spec: &LayerSpec) -> Result<usize> {
    spec.validate()?;

    let count = match *spec.kind() {
        LayerKind::Dense {
            n_in,
            n_out,
            has_bias,
        } => n_in * n_out + if has_bias { n_out } else { 0 },

        LayerKind::Convolution2D {
            n_in,
            n_out,
            kernel: [kh, kw],
            has_bias,
            ..
        } => n_in * n_out * kh * kw + if has_bias { n_out } else { 0 },

        LayerKind::Convolution1D {
            n_in,
            n_out,
            kernel,
            has_bias,
            ..
        } => n_in * n_out * kernel + if has_bias { n_out } else { 0 },

        LayerKind::DepthwiseConvolution2D {
            n_in,
            depth_multiplier,
            kernel: [kh, kw],
            has_bias,
            ..
        } => {
            let depthwise = n_in * depth_multiplier * kh * kw;
            depthwise + if has_bias { n_in * depth_multiplier } else { 0 }
        }

        LayerKind::SeparableConvolution2D {
            n_in,
            n_out,
            depth_multiplier,
            kernel: [kh, kw],
            has_bias,
            ..
        } => {
            let depthwise = n_in * depth_multiplier * kh * kw;
            let pointwise = n_in * depth_multiplier * n_out;
            depthwise + pointwise + if has_bias { n_out } else { 0 }
        }

        LayerKind::BatchNorm {
            n_out,
            trainable_gamma_beta,
            ..
        } => 2 * n_out + if trainable_gamma_beta { 2 * n_out } else { 0 },

        LayerKind::Lstm { n_in, n_out } => {
            n_in * 4 * n_out + n_out * 4 * n_out + 4 * n_out
        }

        LayerKind::SimpleRnn {
            n_in,
            n_out,
            use_bias,
            layer_norm,
        } => {
            n_in * n_out
                + n_out * n_out
                + if use_bias { n_out } else { 0 }
                + if layer_norm { 2 * n_out } else { 0 }
        }
    };

    Ok(count)
}
