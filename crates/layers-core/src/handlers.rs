//! Invalidation side of the metadata cache.
//!
//! Code that writes layers or widget assignments calls into
//! [`LayerMetadataHandler`], which raises the layer change token. The
//! engine itself only listens to that token.

use std::sync::Arc;

use layers_state::{ContentItem, Layer};
use tracing::info;

use crate::signal::Signal;

/// Raises the layer change token on metadata writes.
pub struct LayerMetadataHandler {
    signal: Arc<Signal>,
    change_token: String,
}

impl LayerMetadataHandler {
    pub fn new(signal: Arc<Signal>, change_token: impl Into<String>) -> Self {
        Self {
            signal,
            change_token: change_token.into(),
        }
    }

    /// A layer was created, renamed, re-ruled or deleted.
    pub fn layer_changed(&self, layer: &Layer) {
        info!(event = "layers.layer_changed", layer = %layer.name);
        self.signal.signal_token(&self.change_token);
    }

    /// A widget was published, unpublished, moved or removed.
    pub fn widget_changed(&self, item: &ContentItem) {
        info!(
            event = "layers.widget_changed",
            content_item_id = %item.content_item_id,
            content_type = %item.content_type,
        );
        self.signal.signal_token(&self.change_token);
    }
}
