use std::{
    collections::HashMap,
    sync::{Arc, OnceLock, RwLock},
};

use log::debug;

use crate::{
    params::{
        BatchNormParams, ConvolutionParams, DenseParams, DepthwiseConvolutionParams, LstmParams,
        ParamInitializer, SeparableConvolutionParams, SimpleRnnParams,
    },
    LayoutError, Result,
};

/// The lookup from a layer-family tag to its parameter initializer.
///
/// Registration happens once when a library wires itself up; after that
/// the registry is only read, so a plain read-write lock carries the
/// concurrent resolution traffic.
pub struct LayerLayoutRegistry {
    entries: RwLock<HashMap<String, Arc<dyn ParamInitializer>>>,
}

impl LayerLayoutRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a registry with every built-in layer family registered.
    pub fn with_builtins() -> Self {
        let registry = Self::new();

        let convolution = Arc::new(ConvolutionParams);
        registry.register("dense", Arc::new(DenseParams));
        registry.register("convolution2d", convolution.clone());
        registry.register("convolution1d", convolution);
        registry.register("depthwise_convolution2d", Arc::new(DepthwiseConvolutionParams));
        registry.register("separable_convolution2d", Arc::new(SeparableConvolutionParams));
        registry.register("batch_norm", Arc::new(BatchNormParams));
        registry.register("lstm", Arc::new(LstmParams));
        registry.register("simple_rnn", Arc::new(SimpleRnnParams));

        registry
    }

    /// Registers an initializer under a family tag, replacing any
    /// previous entry for the tag.
    pub fn register(&self, tag: impl Into<String>, initializer: Arc<dyn ParamInitializer>) {
        let tag = tag.into();
        debug!("registering layer family {tag}");

        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(tag, initializer);
    }

    /// Resolves the initializer registered under a family tag.
    ///
    /// # Errors
    /// Returns `UnknownLayerFamily` if nothing was registered for `tag`.
    pub fn resolve(&self, tag: &str) -> Result<Arc<dyn ParamInitializer>> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(tag)
            .cloned()
            .ok_or_else(|| LayoutError::UnknownLayerFamily {
                tag: tag.to_string(),
            })
    }
}

impl Default for LayerLayoutRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The process-wide registry the crate-level functions resolve through,
/// pre-seeded with the built-in families.
pub fn global_registry() -> &'static LayerLayoutRegistry {
    static GLOBAL: OnceLock<LayerLayoutRegistry> = OnceLock::new();
    GLOBAL.get_or_init(LayerLayoutRegistry::with_builtins)
}
