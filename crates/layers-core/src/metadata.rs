//! Cross-request cache of layer metadata.
//!
//! The snapshot holds every published widget assignment plus the layers
//! indexed by name. It lives under one fixed cache key and expires when
//! the layer change token is signalled; the next read recomputes it.

use std::collections::HashMap;
use std::sync::Arc;

use layers_state::{Layer, LayerStore, WidgetAssignment, WidgetFilter};
use tracing::instrument;

use crate::cache::MemoryCache;
use crate::config::LayersConfig;
use crate::error::{LayerError, Result};
use crate::metrics::{Counter, METRICS};
use crate::obs::emit_snapshot_recomputed;
use crate::signal::Signal;

/// Consistent read of all published widgets and all layers.
#[derive(Debug, Clone, Default)]
pub struct MetadataSnapshot {
    /// Published assignments in store order
    pub assignments: Vec<WidgetAssignment>,
    /// Layers by name
    pub layers: HashMap<String, Layer>,
}

impl MetadataSnapshot {
    /// Build a snapshot, indexing layers by name. Later duplicates win.
    pub fn new(assignments: Vec<WidgetAssignment>, layers: Vec<Layer>) -> Self {
        let layers = layers
            .into_iter()
            .map(|layer| (layer.name.clone(), layer))
            .collect();
        Self {
            assignments,
            layers,
        }
    }

    pub fn layer(&self, name: &str) -> Option<&Layer> {
        self.layers.get(name)
    }
}

/// Snapshot provider shared by every request.
pub struct MetadataCache {
    cache: MemoryCache<Arc<MetadataSnapshot>>,
    signal: Arc<Signal>,
    cache_key: String,
    change_token: String,
}

impl MetadataCache {
    pub fn new(signal: Arc<Signal>, config: &LayersConfig) -> Self {
        Self {
            cache: MemoryCache::new(),
            signal,
            cache_key: config.cache_key.clone(),
            change_token: config.change_token.clone(),
        }
    }

    /// Current snapshot, recomputed from `store` after invalidation.
    #[instrument(skip(self, store), fields(key = %self.cache_key))]
    pub async fn get(&self, store: &dyn LayerStore) -> Result<Arc<MetadataSnapshot>> {
        self.cache
            .get_or_create(
                &self.cache_key,
                || vec![self.signal.get_token(&self.change_token)],
                || async {
                    let assignments = store
                        .get_widget_assignments(WidgetFilter::Published)
                        .await?;
                    let layers = store.get_layers().await?.layers;
                    let snapshot = MetadataSnapshot::new(assignments, layers);

                    METRICS.inc(Counter::SnapshotRecomputes);
                    emit_snapshot_recomputed(
                        &self.cache_key,
                        snapshot.assignments.len(),
                        snapshot.layers.len(),
                    );
                    Ok::<_, LayerError>(Arc::new(snapshot))
                },
            )
            .await
    }

    /// Drop the cached snapshot without raising the shared signal.
    pub fn evict(&self) {
        self.cache.remove(&self.cache_key);
    }
}
