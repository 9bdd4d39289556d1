//! Layers Core Library
//!
//! Decides, for each rendered page, which widgets are injected into which
//! zones of the layout. Widgets are bound to layers; a layer carries a
//! boolean rule evaluated once per request by an embedded expression
//! engine. Layer and widget metadata is cached across requests and
//! invalidated through a change signal.
//!
//! Entry point: [`LayerFilter::on_result_execution`].

pub mod cache;
pub mod composer;
pub mod config;
pub mod display;
pub mod handlers;
pub mod layout;
pub mod metadata;
pub mod metrics;
pub mod obs;
pub mod pipeline;
pub mod rules;
pub mod scripting;
pub mod services;
pub mod signal;
pub mod telemetry;
pub mod theme;

mod error;

pub use cache::MemoryCache;
pub use composer::{html_classify, LayoutComposer};
pub use config::{LayersConfig, DEFAULT_CACHE_KEY, DEFAULT_SCRIPT_ENGINE, LAYER_CHANGE_TOKEN};
pub use display::{BasicDisplayBuilder, ContentDisplayBuilder, ModelUpdater};
pub use error::{LayerError, Result};
pub use handlers::LayerMetadataHandler;
pub use layout::{
    Layout, LayoutAccessor, Shape, ShapeZone, SharedLayoutAccessor, WidgetWrapper, ZoneHandle,
    ZoneItem, ZoneOnDemand,
};
pub use metadata::{MetadataCache, MetadataSnapshot};
pub use metrics::{Counter, MetricsSnapshot, METRICS};
pub use pipeline::{
    LayerFilter, LayerOutcome, LayerPassReport, ResultExecutingContext, ResultKind, SkipReason,
};
pub use rules::RuleEvaluator;
pub use scripting::{
    DefaultLayerMethods, DefaultScriptingManager, ExpressionEngine, GlobalMethod,
    GlobalMethodProvider, RequestBindings, ScriptError, ScriptScope, ScriptValue,
    ScriptingEngine, ScriptingManager,
};
pub use services::{RequestServices, ServiceCollection, ServiceProvider};
pub use signal::{ChangeToken, Signal};
pub use telemetry::init_tracing;
pub use theme::{AdminThemeService, SiteThemes, ThemeManager};

pub use layers_state::{
    ContentItem, ContentItemId, Layer, LayerStore, LayersDocument, WidgetAssignment,
};

/// Layers version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
