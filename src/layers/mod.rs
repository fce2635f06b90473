//! Series drawing strategies, keyed by the series `type`.
//!
//! The process-wide registry is filled with the built-ins on first use.
//! Renders take a snapshot, so user layers never run under the lock.

mod builtin;

pub use builtin::{CdfLayer, HistLayer, LineLayer, ScatterLayer};

use crate::data::Table;
use crate::error::{LayerError, UnknownLayerError};
use crate::spec::SeriesSpec;
use crate::surface::Surface;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Draws one series onto a surface.
pub trait Layer: Send + Sync {
    fn draw(&self, surface: &mut dyn Surface, table: &Table, series: &SeriesSpec) -> Result<(), LayerError>;
}

impl<F> Layer for F
where
    F: Fn(&mut dyn Surface, &Table, &SeriesSpec) -> Result<(), LayerError> + Send + Sync,
{
    fn draw(&self, surface: &mut dyn Surface, table: &Table, series: &SeriesSpec) -> Result<(), LayerError> {
        self(surface, table, series)
    }
}

/// Name to layer table. Cheap to clone.
#[derive(Clone, Default)]
pub struct LayerRegistry {
    layers: HashMap<String, Arc<dyn Layer>>,
}

impl LayerRegistry {
    /// Registry without any layer.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry holding `line`, `scatter`, `hist`, `cdf` and `ecdf`.
    pub fn builtin() -> Self {
        let mut reg = Self::empty();
        let cdf: Arc<dyn Layer> = Arc::new(CdfLayer);
        reg.register("line", LineLayer);
        reg.register("scatter", ScatterLayer);
        reg.register("hist", HistLayer);
        reg.insert("cdf", cdf.clone());
        reg.insert("ecdf", cdf);
        reg
    }

    /// Add or replace a layer. The last registration wins.
    pub fn register(&mut self, name: impl Into<String>, layer: impl Layer + 'static) {
        self.insert(name, Arc::new(layer));
    }

    pub fn insert(&mut self, name: impl Into<String>, layer: Arc<dyn Layer>) {
        self.layers.insert(name.into(), layer);
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Layer>, UnknownLayerError> {
        self.layers
            .get(name)
            .cloned()
            .ok_or_else(|| UnknownLayerError(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.layers.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.layers.keys().cloned().collect();
        names.sort();
        names
    }
}

impl std::fmt::Debug for LayerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayerRegistry")
            .field("layers", &self.names())
            .finish()
    }
}

static REGISTRY: Lazy<RwLock<LayerRegistry>> = Lazy::new(|| RwLock::new(LayerRegistry::builtin()));

/// Register a layer in the process-wide registry.
pub fn register_layer(name: impl Into<String>, layer: impl Layer + 'static) {
    let mut reg = REGISTRY.write().unwrap_or_else(|e| e.into_inner());
    reg.register(name, layer);
}

/// Restore the process-wide registry to the built-ins.
pub fn reset_layers() {
    let mut reg = REGISTRY.write().unwrap_or_else(|e| e.into_inner());
    *reg = LayerRegistry::builtin();
}

/// Copy of the process-wide registry.
pub fn global_registry() -> LayerRegistry {
    REGISTRY.read().unwrap_or_else(|e| e.into_inner()).clone()
}
