//! Trait contract tests for LayerStore.
//!
//! These tests verify the behavioral contract of the storage trait
//! using the in-memory fake. Any conforming implementation must pass these.

use layers_state::fakes::MemoryLayerStore;
use layers_state::storage_traits::*;
use layers_state::{ContentItem, Layer, StorageError, WidgetAssignment};

fn widget(name: &str, layer: &str, zone: &str) -> WidgetAssignment {
    WidgetAssignment::new(ContentItem::new("HtmlWidget", name), layer, zone)
}

#[tokio::test]
async fn get_layers_returns_complete_set() {
    let store = MemoryLayerStore::with_data(
        vec![Layer::new("Always", "true"), Layer::new("Homepage", "isHomepage()")],
        vec![],
    );

    let doc = store.get_layers().await.unwrap();
    let names: Vec<&str> = doc.layers.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(names, vec!["Always", "Homepage"]);
}

#[tokio::test]
async fn published_filter_excludes_drafts() {
    let store = MemoryLayerStore::new();
    store.add_widget(widget("live", "Always", "Content"));
    store.add_widget(WidgetAssignment::new(
        ContentItem::new("HtmlWidget", "draft").draft(),
        "Always",
        "Content",
    ));

    let published = store
        .get_widget_assignments(WidgetFilter::Published)
        .await
        .unwrap();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].content_item.display_text, "live");

    let all = store.get_widget_assignments(WidgetFilter::All).await.unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn assignments_ordered_by_position_then_insertion() {
    let store = MemoryLayerStore::new();
    store.add_widget(widget("third", "L", "Footer").at_position(2.0));
    store.add_widget(widget("first", "L", "Footer").at_position(1.0));
    store.add_widget(widget("second", "L", "Footer").at_position(1.0));

    let widgets = store
        .get_widget_assignments(WidgetFilter::Published)
        .await
        .unwrap();
    let names: Vec<&str> = widgets
        .iter()
        .map(|w| w.content_item.display_text.as_str())
        .collect();
    assert_eq!(names, vec!["first", "second", "third"]);
}

#[tokio::test]
async fn put_layer_replaces_by_name() {
    let store = MemoryLayerStore::new();
    store.put_layer(Layer::new("Homepage", "false"));
    store.put_layer(Layer::new("Homepage", "true"));

    let doc = store.get_layers().await.unwrap();
    assert_eq!(doc.layers.len(), 1);
    assert_eq!(doc.layers[0].rule_text(), Some("true"));
}

#[tokio::test]
async fn remove_layer_keeps_widgets() {
    let store = MemoryLayerStore::with_data(
        vec![Layer::new("Gone", "true")],
        vec![widget("orphan", "Gone", "Content")],
    );
    store.remove_layer("Gone");

    assert!(store.get_layers().await.unwrap().layers.is_empty());
    assert_eq!(
        store
            .get_widget_assignments(WidgetFilter::Published)
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn unavailable_store_fails_queries() {
    let store = MemoryLayerStore::new();
    store.set_unavailable(true);

    let err = store.get_layers().await.unwrap_err();
    assert!(matches!(err, StorageError::Unavailable(_)));

    let err = store
        .get_widget_assignments(WidgetFilter::Published)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Unavailable(_)));
}

#[tokio::test]
async fn query_counters_track_calls() {
    let store = MemoryLayerStore::new();
    store.get_layers().await.unwrap();
    store.get_layers().await.unwrap();
    store
        .get_widget_assignments(WidgetFilter::Published)
        .await
        .unwrap();

    assert_eq!(store.layer_queries(), 2);
    assert_eq!(store.widget_queries(), 1);
}
