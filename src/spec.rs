use serde::{Deserialize, Serialize};

use crate::{LayoutError, Result};

/// Per-layer hyperparameters relevant to the parameter layout.
///
/// The `kind` picks the layer family and carries the family-specific
/// dimensions; the remaining fields are the constants applied when the
/// carved views are filled for the first time. Specs are immutable once
/// built and cheap to clone, so plans are derived fresh whenever needed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    kind: LayerKind,
    bias_init: f32,
    gain_init: f32,
    forget_gate_bias_init: f32,
}

impl LayerSpec {
    /// Creates a spec with the default init constants: biases 0.0, gains
    /// 1.0 and the LSTM forget-gate bias 1.0.
    pub fn new(kind: LayerKind) -> Self {
        Self {
            kind,
            bias_init: 0.0,
            gain_init: 1.0,
            forget_gate_bias_init: 1.0,
        }
    }

    /// Sets the constant biases are filled with on first initialization.
    pub fn with_bias_init(mut self, bias_init: f32) -> Self {
        self.bias_init = bias_init;
        self
    }

    /// Sets the constant layer-norm gains (and batch-norm gammas) are
    /// filled with on first initialization.
    pub fn with_gain_init(mut self, gain_init: f32) -> Self {
        self.gain_init = gain_init;
        self
    }

    /// Sets the constant written over the forget-gate range of an LSTM
    /// bias, overriding the plain bias init there.
    pub fn with_forget_gate_bias_init(mut self, forget_gate_bias_init: f32) -> Self {
        self.forget_gate_bias_init = forget_gate_bias_init;
        self
    }

    pub fn kind(&self) -> &LayerKind {
        &self.kind
    }

    pub fn bias_init(&self) -> f32 {
        self.bias_init
    }

    pub fn gain_init(&self) -> f32 {
        self.gain_init
    }

    pub fn forget_gate_bias_init(&self) -> f32 {
        self.forget_gate_bias_init
    }

    /// Returns the registry tag of this spec's layer family.
    pub fn family(&self) -> &'static str {
        self.kind.family()
    }

    /// Checks the dimensions of this spec.
    ///
    /// # Errors
    /// Returns `InvalidConfiguration` if any required dimension, kernel
    /// extent, stride or depth multiplier is zero.
    pub fn validate(&self) -> Result<()> {
        self.kind.validate()
    }
}

/// The supported layer families and their layout-relevant dimensions.
///
/// A tagged union instead of a class hierarchy: planners and counters
/// match on the variant, and a kernel of the wrong rank for a family is
/// not representable in the first place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayerKind {
    /// Fully connected layer.
    Dense {
        n_in: usize,
        n_out: usize,
        has_bias: bool,
    },

    /// 2-D convolution. `kernel` and `stride` are `[height, width]`.
    Convolution2D {
        n_in: usize,
        n_out: usize,
        kernel: [usize; 2],
        stride: [usize; 2],
        has_bias: bool,
    },

    /// 1-D convolution over a single spatial dimension.
    Convolution1D {
        n_in: usize,
        n_out: usize,
        kernel: usize,
        stride: usize,
        has_bias: bool,
    },

    /// Depthwise 2-D convolution: every input channel produces
    /// `depth_multiplier` output maps, so `n_out = n_in * depth_multiplier`.
    DepthwiseConvolution2D {
        n_in: usize,
        depth_multiplier: usize,
        kernel: [usize; 2],
        stride: [usize; 2],
        has_bias: bool,
    },

    /// Separable 2-D convolution: a depthwise stage followed by a 1x1
    /// pointwise stage mixing the `n_in * depth_multiplier` maps into
    /// `n_out` channels.
    SeparableConvolution2D {
        n_in: usize,
        n_out: usize,
        depth_multiplier: usize,
        kernel: [usize; 2],
        stride: [usize; 2],
        has_bias: bool,
    },

    /// Batch normalization. The running statistics are kept as parameters;
    /// gamma and beta only become parameters when `trainable_gamma_beta`
    /// is set.
    BatchNorm {
        n_out: usize,
        use_log_std: bool,
        trainable_gamma_beta: bool,
    },

    /// LSTM with the IFOG gate ordering (input, forget, output,
    /// modulation).
    Lstm { n_in: usize, n_out: usize },

    /// Simple (Elman) recurrent unit, optionally layer-normalized.
    SimpleRnn {
        n_in: usize,
        n_out: usize,
        use_bias: bool,
        layer_norm: bool,
    },
}

impl LayerKind {
    /// Returns the registry tag of this family.
    pub fn family(&self) -> &'static str {
        match self {
            LayerKind::Dense { .. } => "dense",
            LayerKind::Convolution2D { .. } => "convolution2d",
            LayerKind::Convolution1D { .. } => "convolution1d",
            LayerKind::DepthwiseConvolution2D { .. } => "depthwise_convolution2d",
            LayerKind::SeparableConvolution2D { .. } => "separable_convolution2d",
            LayerKind::BatchNorm { .. } => "batch_norm",
            LayerKind::Lstm { .. } => "lstm",
            LayerKind::SimpleRnn { .. } => "simple_rnn",
        }
    }

    fn validate(&self) -> Result<()> {
        let family = self.family();
        let fail = |what| Err(LayoutError::InvalidConfiguration { family, what });

        match *self {
            LayerKind::Dense { n_in, n_out, .. } | LayerKind::Lstm { n_in, n_out } => {
                if n_in == 0 || n_out == 0 {
                    return fail("n_in and n_out must be positive");
                }
            }
            LayerKind::SimpleRnn { n_in, n_out, .. } => {
                if n_in == 0 || n_out == 0 {
                    return fail("n_in and n_out must be positive");
                }
            }
            LayerKind::Convolution2D {
                n_in,
                n_out,
                kernel,
                stride,
                ..
            } => {
                if n_in == 0 || n_out == 0 {
                    return fail("n_in and n_out must be positive");
                }
                if kernel.contains(&0) {
                    return fail("kernel extents must be positive");
                }
                if stride.contains(&0) {
                    return fail("strides must be positive");
                }
            }
            LayerKind::Convolution1D {
                n_in,
                n_out,
                kernel,
                stride,
                ..
            } => {
                if n_in == 0 || n_out == 0 {
                    return fail("n_in and n_out must be positive");
                }
                if kernel == 0 {
                    return fail("kernel extent must be positive");
                }
                if stride == 0 {
                    return fail("stride must be positive");
                }
            }
            LayerKind::DepthwiseConvolution2D {
                n_in,
                depth_multiplier,
                kernel,
                stride,
                ..
            } => {
                if n_in == 0 {
                    return fail("n_in must be positive");
                }
                if depth_multiplier == 0 {
                    return fail("depth multiplier must be positive");
                }
                if kernel.contains(&0) {
                    return fail("kernel extents must be positive");
                }
                if stride.contains(&0) {
                    return fail("strides must be positive");
                }
            }
            LayerKind::SeparableConvolution2D {
                n_in,
                n_out,
                depth_multiplier,
                kernel,
                stride,
                ..
            } => {
                if n_in == 0 || n_out == 0 {
                    return fail("n_in and n_out must be positive");
                }
                if depth_multiplier == 0 {
                    return fail("depth multiplier must be positive");
                }
                if kernel.contains(&0) {
                    return fail("kernel extents must be positive");
                }
                if stride.contains(&0) {
                    return fail("strides must be positive");
                }
            }
            LayerKind::BatchNorm { n_out, .. } => {
                if n_out == 0 {
                    return fail("n_out must be positive");
                }
            }
        }

        Ok(())
    }
}
