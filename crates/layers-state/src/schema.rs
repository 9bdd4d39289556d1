//! Record definitions for layers and widget assignments
//!
//! Records:
//! - layers: named visibility scopes with a rule expression
//! - content items: widget content of some content type
//! - widget assignments: content item + layer name + zone name

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named, rule-gated visibility scope for widgets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layer {
    /// Unique layer name
    pub name: String,
    /// Boolean rule expression; empty means the layer never activates
    #[serde(default)]
    pub rule: Option<String>,
    /// Free-form description shown to authors
    #[serde(default)]
    pub description: Option<String>,
}

impl Layer {
    /// Create a layer with the given rule text
    pub fn new(name: impl Into<String>, rule: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rule: Some(rule.into()),
            description: None,
        }
    }

    /// Create a layer without a rule
    pub fn without_rule(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rule: None,
            description: None,
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Rule text, if it is present and not blank
    pub fn rule_text(&self) -> Option<&str> {
        self.rule
            .as_deref()
            .map(str::trim)
            .filter(|rule| !rule.is_empty())
    }
}

/// The full set of layers as persisted by the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayersDocument {
    pub layers: Vec<Layer>,
}

/// Identifier of a content item
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentItemId(pub String);

impl ContentItemId {
    /// Generate a new random ContentItemId
    pub fn new() -> Self {
        ContentItemId(Uuid::new_v4().simple().to_string())
    }
}

impl Default for ContentItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ContentItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Widget content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub content_item_id: ContentItemId,
    /// Technical content type name, e.g. "HtmlWidget". Expected to match
    /// `[A-Z][A-Za-z0-9]*`; widget CSS classes are derived from it.
    pub content_type: String,
    #[serde(default)]
    pub display_text: String,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub published_utc: Option<DateTime<Utc>>,
    /// Type-specific content parts
    #[serde(default)]
    pub body: serde_json::Value,
}

impl ContentItem {
    /// Create a published content item of the given type
    pub fn new(content_type: impl Into<String>, display_text: impl Into<String>) -> Self {
        Self {
            content_item_id: ContentItemId::new(),
            content_type: content_type.into(),
            display_text: display_text.into(),
            published: true,
            published_utc: Some(Utc::now()),
            body: serde_json::Value::Null,
        }
    }

    /// Set the content body
    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = body;
        self
    }

    /// Mark the item as a draft
    pub fn draft(mut self) -> Self {
        self.published = false;
        self.published_utc = None;
        self
    }
}

/// A widget bound to exactly one layer and one zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetAssignment {
    pub content_item: ContentItem,
    /// Layer name
    pub layer: String,
    /// Target zone name
    pub zone: String,
    /// Ordering hint inside the zone; stores return assignments sorted by it
    #[serde(default)]
    pub position: f64,
    /// Show the widget's display text in its wrapper
    #[serde(default)]
    pub render_title: bool,
}

impl WidgetAssignment {
    /// Bind a content item to a layer and zone
    pub fn new(
        content_item: ContentItem,
        layer: impl Into<String>,
        zone: impl Into<String>,
    ) -> Self {
        Self {
            content_item,
            layer: layer.into(),
            zone: zone.into(),
            position: 0.0,
            render_title: false,
        }
    }

    /// Set the position
    pub fn at_position(mut self, position: f64) -> Self {
        self.position = position;
        self
    }
}
