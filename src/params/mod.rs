//! Per-family parameter initializers.
//!
//! One stateless strategy per layer family. Each one plans the family's
//! frozen segment order, carves parameter views, fills them on first
//! construction and re-carves the identical views out of a flat gradient
//! buffer. Planning and carving share a single call site, so the forward
//! and backward layouts cannot drift apart.

mod batch_norm;
mod convolution;
mod dense;
mod depthwise;
mod lstm;
mod separable;
mod simple_rnn;

pub use batch_norm::BatchNormParams;
pub use convolution::ConvolutionParams;
pub use dense::DenseParams;
pub use depthwise::DepthwiseConvolutionParams;
pub use lstm::LstmParams;
pub use separable::SeparableConvolutionParams;
pub use simple_rnn::SimpleRnnParams;

use crate::{carve, LayerSpec, LayoutPlan, NamedViews, Result, WeightInit};

/// Weight matrix key.
pub const WEIGHT_KEY: &str = "W";
/// Bias vector key.
pub const BIAS_KEY: &str = "b";
/// Recurrent weight key (previous time step to current time step).
pub const RECURRENT_WEIGHT_KEY: &str = "RW";
/// Pointwise weight key of a separable convolution.
pub const POINTWISE_WEIGHT_KEY: &str = "pW";
/// Layer-norm gain key.
pub const GAIN_KEY: &str = "g";
/// Batch-norm scale key.
pub const GAMMA_KEY: &str = "gamma";
/// Batch-norm shift key.
pub const BETA_KEY: &str = "beta";
/// Batch-norm running mean key.
pub const GLOBAL_MEAN_KEY: &str = "mean";
/// Batch-norm running variance key.
pub const GLOBAL_VAR_KEY: &str = "var";
/// Batch-norm running log10 standard deviation key.
pub const GLOBAL_LOG_STD_KEY: &str = "log10stdev";

/// A layer family's parameter layout strategy.
///
/// Implementations hold no state; a single instance serves every layer of
/// the family concurrently. Registering an implementation under its tag
/// in the `LayerLayoutRegistry` adds a new family without touching
/// existing code.
pub trait ParamInitializer: Send + Sync + std::fmt::Debug {
    /// The registry tag of the family this strategy lays out.
    fn family(&self) -> &'static str;

    /// The total number of scalar parameters the layer needs.
    ///
    /// # Errors
    /// Returns `InvalidConfiguration` for a malformed spec or a spec of a
    /// different family.
    fn num_params(&self, spec: &LayerSpec) -> Result<usize>;

    /// Every parameter key of the layer, weights before biases.
    fn param_keys(&self, spec: &LayerSpec) -> Result<Vec<&'static str>>;

    /// The keys of the weight-role parameters.
    fn weight_keys(&self, spec: &LayerSpec) -> Result<Vec<&'static str>>;

    /// The keys of the bias-role parameters.
    fn bias_keys(&self, spec: &LayerSpec) -> Result<Vec<&'static str>>;

    fn is_weight_param(&self, spec: &LayerSpec, key: &str) -> Result<bool> {
        Ok(self.weight_keys(spec)?.iter().any(|k| *k == key))
    }

    fn is_bias_param(&self, spec: &LayerSpec, key: &str) -> Result<bool> {
        Ok(self.bias_keys(spec)?.iter().any(|k| *k == key))
    }

    /// Plans the family's frozen segment order for this spec.
    ///
    /// # Errors
    /// Returns `InvalidConfiguration` for a malformed spec and
    /// `ShapeMismatch` if the segments disagree with `num_params`.
    fn plan(&self, spec: &LayerSpec) -> Result<LayoutPlan>;

    /// Carves `params` into the layer's named views and, when
    /// `init_params` is set, fills them: weights through `weight_init`,
    /// biases and gains with the spec's constants, running statistics
    /// with zero. When `init_params` is unset the views alias whatever
    /// the buffer already holds (the load path).
    ///
    /// # Errors
    /// Returns `BufferTooSmall` if `params` is shorter than the plan, or
    /// whatever `weight_init` fails with.
    fn init<'a>(
        &self,
        spec: &LayerSpec,
        params: &'a mut [f32],
        init_params: bool,
        weight_init: &dyn WeightInit,
    ) -> Result<NamedViews<'a>>;

    /// Carves a flat gradient buffer into views named and shaped exactly
    /// like the parameter views.
    ///
    /// This reuses `plan`, the same call site `init` carves from; the
    /// backward layout is the forward layout by construction. Gradients
    /// are produced by backpropagation before this is called, so no
    /// initialization is applied.
    ///
    /// # Errors
    /// Fails exactly like `init` with `init_params` unset.
    fn gradients_from_flattened<'a>(
        &self,
        spec: &LayerSpec,
        gradient: &'a mut [f32],
    ) -> Result<NamedViews<'a>> {
        carve(gradient, &self.plan(spec)?)
    }
}
