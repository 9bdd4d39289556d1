//! Page layout and zone containers.
//!
//! A [`Layout`] maps zone names to [`ZoneHandle`]s. A zone is either a
//! plain ordered list ([`ShapeZone`]) that accepts synchronous appends, or
//! a [`ZoneOnDemand`] placeholder that materializes its list on the first
//! asynchronous add. Layouts are shared behind `Arc` and mutate through
//! short-lived interior locks, never held across an await.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use layers_state::ContentItem;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

use crate::error::Result;

/// Renderable display content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    /// Template family, e.g. "Content"
    pub shape_type: String,
    #[serde(default)]
    pub classes: Vec<String>,
    /// More specific templates, most generic first
    #[serde(default)]
    pub alternates: Vec<String>,
    #[serde(default)]
    pub properties: serde_json::Value,
}

impl Shape {
    pub fn new(shape_type: impl Into<String>) -> Self {
        Self {
            shape_type: shape_type.into(),
            ..Self::default()
        }
    }

    /// Add a class once.
    pub fn add_class(&mut self, class: impl Into<String>) {
        let class = class.into();
        if !self.classes.contains(&class) {
            self.classes.push(class);
        }
    }

    /// Add an alternate once.
    pub fn add_alternate(&mut self, alternate: impl Into<String>) {
        let alternate = alternate.into();
        if !self.alternates.contains(&alternate) {
            self.alternates.push(alternate);
        }
    }
}

/// A placed widget: the content item and its built display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetWrapper {
    pub widget: ContentItem,
    pub content: Shape,
    /// Whether the wrapper template shows the widget's display text
    #[serde(default)]
    pub render_title: bool,
    /// Wrapper template alternates
    pub alternates: Vec<String>,
}

/// Anything a zone can hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ZoneItem {
    Shape(Shape),
    Widget(WidgetWrapper),
}

impl ZoneItem {
    pub fn as_widget(&self) -> Option<&WidgetWrapper> {
        match self {
            ZoneItem::Widget(w) => Some(w),
            ZoneItem::Shape(_) => None,
        }
    }
}

/// Ordered, append-only zone.
#[derive(Debug)]
pub struct ShapeZone {
    name: String,
    items: Mutex<Vec<ZoneItem>>,
}

impl ShapeZone {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            items: Mutex::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append synchronously.
    pub fn add(&self, item: ZoneItem) {
        self.items
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(item);
    }

    pub fn items(&self) -> Vec<ZoneItem> {
        self.items.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

/// Zone placeholder that materializes on first add.
#[derive(Debug)]
pub struct ZoneOnDemand {
    name: String,
    zone: OnceCell<Arc<ShapeZone>>,
}

impl ZoneOnDemand {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            zone: OnceCell::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether anything has been added yet.
    pub fn is_materialized(&self) -> bool {
        self.zone.initialized()
    }

    /// Materialize the zone if needed, then append.
    pub async fn add(&self, item: ZoneItem) {
        let zone = self
            .zone
            .get_or_init(|| async { Arc::new(ShapeZone::new(self.name.clone())) })
            .await;
        zone.add(item);
    }

    pub fn items(&self) -> Vec<ZoneItem> {
        self.zone.get().map(|z| z.items()).unwrap_or_default()
    }
}

/// Capability-tagged reference to a zone.
#[derive(Debug, Clone)]
pub enum ZoneHandle {
    OnDemand(Arc<ZoneOnDemand>),
    Shape(Arc<ShapeZone>),
}

impl ZoneHandle {
    pub fn name(&self) -> &str {
        match self {
            ZoneHandle::OnDemand(z) => z.name(),
            ZoneHandle::Shape(z) => z.name(),
        }
    }

    pub fn items(&self) -> Vec<ZoneItem> {
        match self {
            ZoneHandle::OnDemand(z) => z.items(),
            ZoneHandle::Shape(z) => z.items(),
        }
    }
}

/// The in-flight page layout.
#[derive(Debug, Default)]
pub struct Layout {
    zones: RwLock<HashMap<String, ZoneHandle>>,
    on_demand_zones: bool,
}

impl Layout {
    /// Layout that only knows explicitly added zones.
    pub fn new() -> Self {
        Self::default()
    }

    /// Layout that creates a [`ZoneOnDemand`] for any unknown zone name.
    pub fn with_on_demand_zones() -> Self {
        Self {
            zones: RwLock::new(HashMap::new()),
            on_demand_zones: true,
        }
    }

    /// Register a plain list zone.
    pub fn add_shape_zone(&self, name: impl Into<String>) -> Arc<ShapeZone> {
        let name = name.into();
        let zone = Arc::new(ShapeZone::new(name.clone()));
        self.insert(name, ZoneHandle::Shape(zone.clone()));
        zone
    }

    /// Register an on-demand zone.
    pub fn add_on_demand_zone(&self, name: impl Into<String>) -> Arc<ZoneOnDemand> {
        let name = name.into();
        let zone = Arc::new(ZoneOnDemand::new(name.clone()));
        self.insert(name, ZoneHandle::OnDemand(zone.clone()));
        zone
    }

    fn insert(&self, name: String, handle: ZoneHandle) {
        self.zones
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name, handle);
    }

    /// Resolve a zone by name.
    pub fn zone(&self, name: &str) -> Option<ZoneHandle> {
        if let Some(handle) = self
            .zones
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
        {
            return Some(handle.clone());
        }
        if !self.on_demand_zones {
            return None;
        }
        let mut zones = self.zones.write().unwrap_or_else(|e| e.into_inner());
        Some(
            zones
                .entry(name.to_string())
                .or_insert_with(|| ZoneHandle::OnDemand(Arc::new(ZoneOnDemand::new(name))))
                .clone(),
        )
    }

    /// Items of a zone, empty if the zone does not exist.
    pub fn items(&self, name: &str) -> Vec<ZoneItem> {
        self.zones
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .map(ZoneHandle::items)
            .unwrap_or_default()
    }

    /// All zones with their items, sorted by zone name.
    pub fn snapshot(&self) -> BTreeMap<String, Vec<ZoneItem>> {
        self.zones
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(name, handle)| (name.clone(), handle.items()))
            .collect()
    }
}

/// Access to the current request's layout.
#[async_trait]
pub trait LayoutAccessor: Send + Sync {
    async fn get_layout(&self) -> Result<Arc<Layout>>;
}

/// Accessor over a layout built by the caller.
pub struct SharedLayoutAccessor {
    layout: Arc<Layout>,
}

impl SharedLayoutAccessor {
    pub fn new(layout: Arc<Layout>) -> Self {
        Self { layout }
    }
}

#[async_trait]
impl LayoutAccessor for SharedLayoutAccessor {
    async fn get_layout(&self) -> Result<Arc<Layout>> {
        Ok(self.layout.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape(name: &str) -> ZoneItem {
        ZoneItem::Shape(Shape::new(name))
    }

    #[test]
    fn test_shape_zone_appends_in_order() {
        let zone = ShapeZone::new("Footer");
        zone.add(shape("a"));
        zone.add(shape("b"));
        assert_eq!(zone.items(), vec![shape("a"), shape("b")]);
    }

    #[tokio::test]
    async fn test_zone_on_demand_materializes_on_first_add() {
        let zone = ZoneOnDemand::new("Sidebar");
        assert!(!zone.is_materialized());
        assert!(zone.items().is_empty());

        zone.add(shape("a")).await;
        zone.add(shape("b")).await;
        assert!(zone.is_materialized());
        assert_eq!(zone.items(), vec![shape("a"), shape("b")]);
    }

    #[test]
    fn test_strict_layout_does_not_invent_zones() {
        let layout = Layout::new();
        layout.add_shape_zone("Content");
        assert!(layout.zone("Content").is_some());
        assert!(layout.zone("Missing").is_none());
    }

    #[test]
    fn test_on_demand_layout_creates_missing_zone_once() {
        let layout = Layout::with_on_demand_zones();
        let first = layout.zone("Header").unwrap();
        let second = layout.zone("Header").unwrap();
        match (first, second) {
            (ZoneHandle::OnDemand(a), ZoneHandle::OnDemand(b)) => assert!(Arc::ptr_eq(&a, &b)),
            other => panic!("expected on-demand zones, got {other:?}"),
        }
    }

    #[test]
    fn test_shape_dedups_classes_and_alternates() {
        let mut s = Shape::new("Content");
        s.add_class("widget");
        s.add_class("widget");
        s.add_alternate("Content__Html");
        s.add_alternate("Content__Html");
        assert_eq!(s.classes, vec!["widget"]);
        assert_eq!(s.alternates, vec!["Content__Html"]);
    }

    #[test]
    fn test_snapshot_sorted_by_zone_name() {
        let layout = Layout::new();
        layout.add_shape_zone("Sidebar").add(shape("s"));
        layout.add_shape_zone("Content").add(shape("c"));
        let names: Vec<String> = layout.snapshot().into_keys().collect();
        assert_eq!(names, vec!["Content", "Sidebar"]);
    }
}
