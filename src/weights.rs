use ndarray::{Array, ArrayViewMutD};
use ndarray_rand::RandomExt;
use rand_distr::{Normal, Uniform};

use crate::{LayoutError, Result};

/// A pluggable weight-fill strategy.
///
/// The layout engine hands the strategy an already carved, already shaped
/// view plus the layer's effective connectivity; the strategy fills the
/// view in place. The view keeps aliasing the flat buffer, so the fill
/// lands directly in the network's parameter vector.
pub trait WeightInit: Send + Sync {
    /// Fills `target` in place.
    ///
    /// # Arguments
    /// * `fan_in` - Effective input connectivity of the segment.
    /// * `fan_out` - Effective output connectivity of the segment.
    /// * `target` - The weight view to fill.
    ///
    /// # Errors
    /// Returns `InvalidConfiguration` if the fans produce an unusable
    /// sampling distribution.
    fn init(&self, fan_in: f64, fan_out: f64, target: &mut ArrayViewMutD<'_, f32>) -> Result<()>;
}

/// Fills every weight with one constant. Mostly useful in tests and for
/// deliberately degenerate baselines.
pub struct Constant(pub f32);

impl WeightInit for Constant {
    fn init(&self, _fan_in: f64, _fan_out: f64, target: &mut ArrayViewMutD<'_, f32>) -> Result<()> {
        target.fill(self.0);
        Ok(())
    }
}

/// Gaussian Xavier/Glorot init: N(0, 2 / (fan_in + fan_out)).
pub struct Xavier;

impl WeightInit for Xavier {
    fn init(&self, fan_in: f64, fan_out: f64, target: &mut ArrayViewMutD<'_, f32>) -> Result<()> {
        let std = (2.0 / (fan_in + fan_out)).sqrt() as f32;
        let dist = Normal::new(0.0, std).map_err(|_| LayoutError::InvalidConfiguration {
            family: "xavier",
            what: "fans produce an invalid standard deviation",
        })?;

        let dim = target.raw_dim();
        target.assign(&Array::random_using(dim, dist, &mut rand::rng()));
        Ok(())
    }
}

/// Uniform Xavier/Glorot init: U(-a, a) with a = sqrt(6 / (fan_in + fan_out)).
pub struct XavierUniform;

impl WeightInit for XavierUniform {
    fn init(&self, fan_in: f64, fan_out: f64, target: &mut ArrayViewMutD<'_, f32>) -> Result<()> {
        let a = (6.0 / (fan_in + fan_out)).sqrt() as f32;
        let dist = Uniform::new(-a, a).map_err(|_| LayoutError::InvalidConfiguration {
            family: "xavier_uniform",
            what: "fans produce invalid uniform bounds",
        })?;

        let dim = target.raw_dim();
        target.assign(&Array::random_using(dim, dist, &mut rand::rng()));
        Ok(())
    }
}

/// He init for rectified units: N(0, 2 / fan_in).
pub struct Relu;

impl WeightInit for Relu {
    fn init(&self, fan_in: f64, _fan_out: f64, target: &mut ArrayViewMutD<'_, f32>) -> Result<()> {
        let std = (2.0 / fan_in).sqrt() as f32;
        let dist = Normal::new(0.0, std).map_err(|_| LayoutError::InvalidConfiguration {
            family: "relu",
            what: "fan_in produces an invalid standard deviation",
        })?;

        let dim = target.raw_dim();
        target.assign(&Array::random_using(dim, dist, &mut rand::rng()));
        Ok(())
    }
}
