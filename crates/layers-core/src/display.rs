//! Building display shapes for widget content.

use async_trait::async_trait;
use layers_state::ContentItem;
use serde_json::json;

use crate::error::Result;
use crate::layout::Shape;

/// Model-binding context passed to display drivers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelUpdater {
    /// Prefix for bound field names
    pub prefix: String,
}

impl ModelUpdater {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

/// Turns a content item into its display shape.
#[async_trait]
pub trait ContentDisplayBuilder: Send + Sync {
    async fn build_display(&self, item: &ContentItem, updater: &ModelUpdater) -> Result<Shape>;
}

/// Builds a `Content` shape carrying the item's fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicDisplayBuilder;

#[async_trait]
impl ContentDisplayBuilder for BasicDisplayBuilder {
    async fn build_display(&self, item: &ContentItem, updater: &ModelUpdater) -> Result<Shape> {
        let mut shape = Shape::new("Content");
        shape.add_alternate(format!("Content__{}", item.content_type));
        shape.properties = json!({
            "content_item_id": item.content_item_id.0,
            "content_type": item.content_type,
            "display_text": item.display_text,
            "prefix": updater.prefix,
            "body": item.body,
        });
        Ok(shape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_basic_builder_carries_fields() {
        let item = ContentItem::new("HtmlWidget", "Welcome").with_body(json!({ "html": "<p>hi</p>" }));
        let shape = BasicDisplayBuilder
            .build_display(&item, &ModelUpdater::default())
            .await
            .unwrap();

        assert_eq!(shape.shape_type, "Content");
        assert_eq!(shape.alternates, vec!["Content__HtmlWidget"]);
        assert_eq!(shape.properties["display_text"], "Welcome");
        assert_eq!(shape.properties["body"]["html"], "<p>hi</p>");
        assert!(shape.classes.is_empty());
    }
}
