//! Layer parameter layout and view carving.
//!
//! A network keeps every learnable value in one contiguous flat vector,
//! with a flat gradient vector of the same length next to it. This crate
//! computes, per layer, how many scalars that vector owes the layer and
//! in which order, carves the vector into named, shaped, non-copying
//! [`ndarray`] views, fills the views on first construction, and later
//! carves the *identical* views out of the gradient vector for the
//! optimizer. Planning and carving share one code path, so the forward
//! and backward layouts cannot drift apart; an offset bug here corrupts
//! training silently instead of failing, which is why the split is
//! structural rather than tested-for.
//!
//! Segment order and the row-major view layout are part of the ABI:
//! serialized flat vectors are only readable by the exact layout that
//! wrote them.

mod carve;
mod error;
mod plan;
mod registry;
mod spec;
mod views;
mod weights;

pub mod params;

pub use carve::carve;
pub use error::{LayoutError, Result};
pub use plan::{LayoutPlan, ParamRole, Segment};
pub use registry::{global_registry, LayerLayoutRegistry};
pub use spec::{LayerKind, LayerSpec};
pub use views::NamedViews;
pub use weights::{Constant, Relu, WeightInit, Xavier, XavierUniform};

use std::sync::Arc;

use params::ParamInitializer;

fn resolve(spec: &LayerSpec) -> Result<Arc<dyn ParamInitializer>> {
    global_registry().resolve(spec.family())
}

/// The total number of scalar parameters the layer needs.
///
/// # Errors
/// Returns `InvalidConfiguration` for a malformed spec.
pub fn num_params(spec: &LayerSpec) -> Result<usize> {
    resolve(spec)?.num_params(spec)
}

/// Every parameter key of the layer, weights listed before biases.
pub fn param_keys(spec: &LayerSpec) -> Result<Vec<&'static str>> {
    resolve(spec)?.param_keys(spec)
}

/// The keys of the layer's weight-role parameters.
pub fn weight_keys(spec: &LayerSpec) -> Result<Vec<&'static str>> {
    resolve(spec)?.weight_keys(spec)
}

/// The keys of the layer's bias-role parameters.
pub fn bias_keys(spec: &LayerSpec) -> Result<Vec<&'static str>> {
    resolve(spec)?.bias_keys(spec)
}

pub fn is_weight_param(spec: &LayerSpec, key: &str) -> Result<bool> {
    resolve(spec)?.is_weight_param(spec, key)
}

pub fn is_bias_param(spec: &LayerSpec, key: &str) -> Result<bool> {
    resolve(spec)?.is_bias_param(spec, key)
}

/// Carves the layer's parameter window out of the flat vector and, when
/// `init_params` is set, fills the views: weights through `weight_init`,
/// biases and gains with the spec's constants, running statistics with
/// zero. With `init_params` unset the views alias whatever the buffer
/// already holds.
///
/// # Errors
/// Returns `BufferTooSmall` if `params` is shorter than the layer's
/// layout, plus whatever `weight_init` fails with.
pub fn init<'a>(
    spec: &LayerSpec,
    params: &'a mut [f32],
    init_params: bool,
    weight_init: &dyn WeightInit,
) -> Result<NamedViews<'a>> {
    resolve(spec)?.init(spec, params, init_params, weight_init)
}

/// Carves the layer's gradient window into views named and shaped
/// exactly like the ones `init` produces, with no initialization.
///
/// # Errors
/// Fails exactly like `init` with `init_params` unset.
pub fn gradients_from_flattened<'a>(
    spec: &LayerSpec,
    gradient: &'a mut [f32],
) -> Result<NamedViews<'a>> {
    resolve(spec)?.gradients_from_flattened(spec, gradient)
}
