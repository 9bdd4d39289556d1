//! In-memory fakes for storage traits (testing only)
//!
//! Provides `MemoryLayerStore`, which satisfies the `LayerStore` contract
//! without any external dependencies and counts the queries it serves.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::StorageError;
use crate::schema::{Layer, LayersDocument, WidgetAssignment};
use crate::storage_traits::*;

/// In-memory layer store backed by two vectors.
#[derive(Debug, Default)]
pub struct MemoryLayerStore {
    layers: Mutex<Vec<Layer>>,
    widgets: Mutex<Vec<WidgetAssignment>>,
    layer_queries: AtomicU64,
    widget_queries: AtomicU64,
    unavailable: AtomicBool,
}

impl MemoryLayerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store seeded with layers and widgets.
    pub fn with_data(layers: Vec<Layer>, widgets: Vec<WidgetAssignment>) -> Self {
        Self {
            layers: Mutex::new(layers),
            widgets: Mutex::new(widgets),
            ..Self::default()
        }
    }

    /// Insert or replace a layer by name.
    pub fn put_layer(&self, layer: Layer) {
        let mut layers = self.layers.lock().unwrap();
        match layers.iter_mut().find(|l| l.name == layer.name) {
            Some(existing) => *existing = layer,
            None => layers.push(layer),
        }
    }

    /// Remove a layer by name. Widget assignments are left in place.
    pub fn remove_layer(&self, name: &str) {
        self.layers.lock().unwrap().retain(|l| l.name != name);
    }

    /// Append a widget assignment.
    pub fn add_widget(&self, widget: WidgetAssignment) {
        self.widgets.lock().unwrap().push(widget);
    }

    /// Make every query fail with `StorageError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of `get_layers` calls served.
    pub fn layer_queries(&self) -> u64 {
        self.layer_queries.load(Ordering::SeqCst)
    }

    /// Number of `get_widget_assignments` calls served.
    pub fn widget_queries(&self) -> u64 {
        self.widget_queries.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> StorageResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable(
                "memory store marked unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl LayerStore for MemoryLayerStore {
    async fn get_layers(&self) -> StorageResult<LayersDocument> {
        self.layer_queries.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        let layers = self.layers.lock().unwrap();
        Ok(LayersDocument {
            layers: layers.clone(),
        })
    }

    async fn get_widget_assignments(
        &self,
        filter: WidgetFilter,
    ) -> StorageResult<Vec<WidgetAssignment>> {
        self.widget_queries.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        let widgets = self.widgets.lock().unwrap();
        let mut matching: Vec<WidgetAssignment> =
            widgets.iter().filter(|w| filter.matches(w)).cloned().collect();
        // Stable sort keeps insertion order for equal positions
        matching.sort_by(|a, b| a.position.total_cmp(&b.position));
        Ok(matching)
    }
}
