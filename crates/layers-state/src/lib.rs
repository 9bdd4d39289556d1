//! Layers-State: persistence boundary for the layer engine
//!
//! This crate describes the data the layer engine reads: layers with their
//! visibility rules and the published widgets assigned to them. Storage is
//! owned elsewhere; the engine only talks to it through [`LayerStore`].
//!
//! ## Layer 0 - Data/Persistence
//!
//! Focus: read-only access to the complete layer and widget sets.
//!
//! ## Key Components
//!
//! - `Layer` / `LayersDocument`: named, rule-gated visibility scopes
//! - `ContentItem`: the widget content itself
//! - `WidgetAssignment`: a widget bound to one layer and one zone
//! - `LayerStore`: async query trait, with in-memory fakes in [`fakes`]

mod error;
pub mod fakes;
mod schema;
pub mod storage_traits;

pub use error::StorageError;
pub use schema::{ContentItem, ContentItemId, Layer, LayersDocument, WidgetAssignment};
pub use storage_traits::{LayerStore, StorageResult, WidgetFilter};
