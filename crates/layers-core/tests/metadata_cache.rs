//! Cross-request metadata cache: reuse, invalidation and concurrent misses.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use layers_core::{
    ContentItem, Layer, LayerError, LayerMetadataHandler, LayersConfig, MetadataCache, Signal,
    WidgetAssignment,
};
use layers_state::fakes::MemoryLayerStore;
use layers_state::{LayerStore, LayersDocument, StorageResult, WidgetFilter};

fn fixture() -> MemoryLayerStore {
    MemoryLayerStore::with_data(
        vec![Layer::new("Always", "true")],
        vec![WidgetAssignment::new(
            ContentItem::new("HtmlWidget", "hello"),
            "Always",
            "Content",
        )],
    )
}

fn cache(signal: &Arc<Signal>) -> MetadataCache {
    MetadataCache::new(signal.clone(), &LayersConfig::default())
}

/// Store that yields before every read so concurrent callers interleave.
struct YieldingStore(MemoryLayerStore);

#[async_trait]
impl LayerStore for YieldingStore {
    async fn get_layers(&self) -> StorageResult<LayersDocument> {
        tokio::task::yield_now().await;
        self.0.get_layers().await
    }

    async fn get_widget_assignments(
        &self,
        filter: WidgetFilter,
    ) -> StorageResult<Vec<WidgetAssignment>> {
        tokio::task::yield_now().await;
        self.0.get_widget_assignments(filter).await
    }
}

/// Store whose layer read races with a metadata write.
struct RacingStore {
    inner: MemoryLayerStore,
    handler: LayerMetadataHandler,
}

#[async_trait]
impl LayerStore for RacingStore {
    async fn get_layers(&self) -> StorageResult<LayersDocument> {
        let layer = Layer::new("Late", "true");
        self.inner.put_layer(layer.clone());
        self.handler.layer_changed(&layer);
        self.inner.get_layers().await
    }

    async fn get_widget_assignments(
        &self,
        filter: WidgetFilter,
    ) -> StorageResult<Vec<WidgetAssignment>> {
        self.inner.get_widget_assignments(filter).await
    }
}

#[tokio::test]
async fn snapshot_is_reused_until_signalled() {
    let signal = Arc::new(Signal::new());
    let store = fixture();
    let metadata = cache(&signal);

    let first = metadata.get(&store).await.unwrap();
    let second = metadata.get(&store).await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(store.widget_queries(), 1);
    assert_eq!(store.layer_queries(), 1);
}

#[tokio::test]
async fn metadata_write_triggers_requery() {
    let signal = Arc::new(Signal::new());
    let store = fixture();
    let metadata = cache(&signal);
    let handler = LayerMetadataHandler::new(signal.clone(), LayersConfig::default().change_token);

    let before = metadata.get(&store).await.unwrap();
    assert!(before.layer("Homepage").is_none());

    let layer = Layer::new("Homepage", "isHomepage()");
    store.put_layer(layer.clone());
    handler.layer_changed(&layer);

    let after = metadata.get(&store).await.unwrap();
    assert!(after.layer("Homepage").is_some());
    assert_eq!(store.widget_queries(), 2);
}

#[tokio::test]
async fn widget_write_triggers_requery() {
    let signal = Arc::new(Signal::new());
    let store = fixture();
    let metadata = cache(&signal);
    let handler = LayerMetadataHandler::new(signal.clone(), LayersConfig::default().change_token);

    assert_eq!(metadata.get(&store).await.unwrap().assignments.len(), 1);

    let widget = WidgetAssignment::new(ContentItem::new("MenuWidget", "menu"), "Always", "Footer");
    store.add_widget(widget.clone());
    handler.widget_changed(&widget.content_item);

    assert_eq!(metadata.get(&store).await.unwrap().assignments.len(), 2);
}

#[tokio::test]
async fn unrelated_signal_keeps_snapshot() {
    let signal = Arc::new(Signal::new());
    let store = fixture();
    let metadata = cache(&signal);

    metadata.get(&store).await.unwrap();
    signal.signal_token("content.types.changed");
    metadata.get(&store).await.unwrap();
    assert_eq!(store.widget_queries(), 1);
}

#[tokio::test]
async fn drafts_are_not_in_the_snapshot() {
    let signal = Arc::new(Signal::new());
    let store = fixture();
    store.add_widget(WidgetAssignment::new(
        ContentItem::new("HtmlWidget", "draft").draft(),
        "Always",
        "Content",
    ));

    let snapshot = cache(&signal).get(&store).await.unwrap();
    let names: Vec<&str> = snapshot
        .assignments
        .iter()
        .map(|a| a.content_item.display_text.as_str())
        .collect();
    assert_eq!(names, vec!["hello"]);
}

#[tokio::test]
async fn concurrent_misses_query_once() {
    let signal = Arc::new(Signal::new());
    let store = YieldingStore(fixture());
    let metadata = cache(&signal);

    let results = join_all((0..8).map(|_| metadata.get(&store))).await;
    let snapshots: Vec<_> = results.into_iter().map(Result::unwrap).collect();

    assert_eq!(store.0.widget_queries(), 1);
    assert!(snapshots.iter().all(|s| Arc::ptr_eq(s, &snapshots[0])));
}

#[tokio::test]
async fn signal_during_fetch_expires_result() {
    let signal = Arc::new(Signal::new());
    let store = RacingStore {
        inner: fixture(),
        handler: LayerMetadataHandler::new(signal.clone(), LayersConfig::default().change_token),
    };
    let metadata = cache(&signal);

    metadata.get(&store).await.unwrap();
    metadata.get(&store).await.unwrap();
    assert_eq!(store.inner.widget_queries(), 2);
}

#[tokio::test]
async fn store_failure_is_not_cached() {
    let signal = Arc::new(Signal::new());
    let store = fixture();
    let metadata = cache(&signal);

    store.set_unavailable(true);
    let err = metadata.get(&store).await.unwrap_err();
    assert!(matches!(err, LayerError::Storage(_)));

    store.set_unavailable(false);
    let snapshot = metadata.get(&store).await.unwrap();
    assert_eq!(snapshot.assignments.len(), 1);
}

#[tokio::test]
async fn evict_forces_requery() {
    let signal = Arc::new(Signal::new());
    let store = fixture();
    let metadata = cache(&signal);

    metadata.get(&store).await.unwrap();
    metadata.evict();
    metadata.get(&store).await.unwrap();
    assert_eq!(store.widget_queries(), 2);
}
