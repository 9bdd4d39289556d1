//! Storage trait definitions for the layer engine
//!
//! `LayerStore` is the only way the engine reads layer metadata. It is
//! read-only and backend-agnostic; whoever writes layers or widget
//! assignments is responsible for raising the layer change signal.
//!
//! In-memory fakes are provided for testing via the `fakes` module.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::schema::{LayersDocument, WidgetAssignment};

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Which widget assignments a query returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetFilter {
    /// Only widgets whose content item is published
    Published,
    /// Every widget, drafts included
    All,
}

impl WidgetFilter {
    /// Whether an assignment passes this filter.
    pub fn matches(&self, assignment: &WidgetAssignment) -> bool {
        match self {
            WidgetFilter::Published => assignment.content_item.published,
            WidgetFilter::All => true,
        }
    }
}

/// Read access to layers and widget assignments.
///
/// Guarantees:
/// - Both queries return the complete set per call (no pagination).
/// - `get_widget_assignments` is ordered by `position`; ties keep
///   insertion order.
#[async_trait]
pub trait LayerStore: Send + Sync {
    /// Fetch every layer.
    async fn get_layers(&self) -> StorageResult<LayersDocument>;

    /// Fetch widget assignments matching the filter.
    async fn get_widget_assignments(
        &self,
        filter: WidgetFilter,
    ) -> StorageResult<Vec<WidgetAssignment>>;
}
