//! Merging widgets into the current layout.
//!
//! Widgets are appended to their zone in the order they are placed; the
//! composer never reorders. Callers place widgets in snapshot order.

use layers_state::WidgetAssignment;

use crate::error::{LayerError, Result};
use crate::layout::{Layout, Shape, WidgetWrapper, ZoneHandle, ZoneItem};

/// CSS class for a content type name.
///
/// ASCII letters and digits are kept, every uppercase letter after the
/// first becomes `-` plus its lowercase form, and anything else becomes
/// `_`. The mapping is injective only over technical type names
/// (`[A-Z][A-Za-z0-9]*`, see [`ContentItem::content_type`]); outside that
/// set names can collide, e.g. `htmlWidget` and `HtmlWidget`.
///
/// [`ContentItem::content_type`]: layers_state::ContentItem::content_type
pub fn html_classify(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, ch) in name.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if i > 0 {
                out.push('-');
            }
            out.push(ch.to_ascii_lowercase());
        } else if ch.is_ascii_alphanumeric() {
            out.push(ch);
        } else {
            out.push('_');
        }
    }
    out
}

/// Places built widget content into layout zones.
#[derive(Debug, Clone)]
pub struct LayoutComposer {
    widget_class: String,
}

impl Default for LayoutComposer {
    fn default() -> Self {
        Self::new("widget")
    }
}

impl LayoutComposer {
    pub fn new(widget_class: impl Into<String>) -> Self {
        Self {
            widget_class: widget_class.into(),
        }
    }

    /// Annotate content with widget classes and wrap it with its alternates.
    pub fn wrap(&self, assignment: &WidgetAssignment, mut content: Shape) -> WidgetWrapper {
        let content_type = &assignment.content_item.content_type;
        content.add_class(self.widget_class.clone());
        content.add_class(format!(
            "{}-{}",
            self.widget_class,
            html_classify(content_type)
        ));

        WidgetWrapper {
            widget: assignment.content_item.clone(),
            content,
            render_title: assignment.render_title,
            alternates: vec![
                format!("Widget_Wrapper__{content_type}"),
                format!("Widget_Wrapper__Zone__{}", assignment.zone),
            ],
        }
    }

    /// Wrap `content` and append it to the assignment's zone.
    pub async fn place(
        &self,
        layout: &Layout,
        assignment: &WidgetAssignment,
        content: Shape,
    ) -> Result<()> {
        let zone = layout
            .zone(&assignment.zone)
            .ok_or_else(|| LayerError::ZoneNotFound {
                zone: assignment.zone.clone(),
                widget: assignment.content_item.content_item_id.to_string(),
            })?;
        let item = ZoneItem::Widget(self.wrap(assignment, content));

        match zone {
            ZoneHandle::OnDemand(zone) => zone.add(item).await,
            ZoneHandle::Shape(zone) => zone.add(item),
        }
        Ok(())
    }
}
