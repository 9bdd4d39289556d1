//! The per-response layer pass.
//!
//! [`LayerFilter`] is shared by all requests and holds no request state.
//! Each call builds its own [`RequestServices`] and [`RuleEvaluator`],
//! checks the gate, then walks the metadata snapshot in order:
//!
//! 1. resolve the widget's layer (missing layers are skipped)
//! 2. evaluate the layer rule, once per layer per request
//! 3. build the widget display and place it into its zone
//!
//! Any fault fails the response; `false` rules and stale layer references
//! are normal outcomes.

use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::composer::LayoutComposer;
use crate::config::LayersConfig;
use crate::error::Result;
use crate::metadata::MetadataCache;
use crate::metrics::{Counter, METRICS};
use crate::obs::{emit_layers_skipped, emit_pass_finished, emit_stale_assignment, emit_widget_placed};
use crate::rules::RuleEvaluator;
use crate::scripting::{RequestBindings, ScriptingManager};
use crate::services::{RequestServices, ServiceProvider};

/// Kind of result the response is producing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultKind {
    View,
    Page,
    PartialView,
    Json,
    Redirect,
    Content,
    Empty,
}

impl ResultKind {
    /// Whether this is a full view or page render.
    pub fn is_full_view(&self) -> bool {
        matches!(self, ResultKind::View | ResultKind::Page)
    }
}

/// Everything the filter sees about one outgoing response.
pub struct ResultExecutingContext<'a> {
    pub result: ResultKind,
    /// Whether the request targets an administrative surface
    pub is_admin: bool,
    pub request: Arc<RequestBindings>,
    pub services: &'a dyn ServiceProvider,
}

/// Why a response was left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NotFullView,
    AdminRequest,
    AdminTheme,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::NotFullView => "not_full_view",
            SkipReason::AdminRequest => "admin_request",
            SkipReason::AdminTheme => "admin_theme",
        }
    }
}

/// Counters for one layer pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerPassReport {
    /// Scripting engine invocations
    pub rule_evaluations: u64,
    pub widgets_placed: usize,
    /// Widgets whose layer evaluated false
    pub widgets_hidden: usize,
    /// Widgets whose layer no longer exists
    pub stale_assignments: usize,
}

/// Result of running the filter on one response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LayerOutcome {
    Skipped { reason: SkipReason },
    Applied(LayerPassReport),
}

/// Result filter that injects layer widgets into the layout.
pub struct LayerFilter {
    config: LayersConfig,
    scripting: Arc<dyn ScriptingManager>,
    metadata: Arc<MetadataCache>,
    composer: LayoutComposer,
}

impl LayerFilter {
    pub fn new(
        config: LayersConfig,
        scripting: Arc<dyn ScriptingManager>,
        metadata: Arc<MetadataCache>,
    ) -> Self {
        let composer = LayoutComposer::new(config.widget_class.clone());
        Self {
            config,
            scripting,
            metadata,
            composer,
        }
    }

    pub fn config(&self) -> &LayersConfig {
        &self.config
    }

    /// Run the layer pass, then continue the response with `next`.
    ///
    /// `next` runs whether or not layers applied; it does not run if the
    /// pass fails.
    pub async fn on_result_execution<F, Fut, T>(
        &self,
        ctx: &ResultExecutingContext<'_>,
        next: F,
    ) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        self.apply(ctx).await?;
        Ok(next().await)
    }

    /// Run the layer pass without a continuation.
    #[instrument(skip_all, fields(path = %ctx.request.path))]
    pub async fn apply(&self, ctx: &ResultExecutingContext<'_>) -> Result<LayerOutcome> {
        if !ctx.result.is_full_view() {
            return Ok(skipped(SkipReason::NotFullView));
        }
        if ctx.is_admin {
            return Ok(skipped(SkipReason::AdminRequest));
        }

        let services = RequestServices::new(ctx.services);

        // Non-admin requests can still render with the admin theme, e.g. login.
        let selected_theme = services.theme_manager()?.current_theme_id().await?;
        let admin_theme = services.admin_theme_service()?.admin_theme_name().await?;
        if selected_theme == admin_theme {
            return Ok(skipped(SkipReason::AdminTheme));
        }

        let store = services.layer_store()?;
        let snapshot = self.metadata.get(store.as_ref()).await?;
        let layout = services.layout_accessor()?.get_layout().await?;
        let display = services.display_builder()?;
        let updater = services.model_updater()?;

        let mut rules = RuleEvaluator::for_request(
            self.scripting.as_ref(),
            &self.config.script_engine,
            ctx.request.clone(),
        )?;
        let mut report = LayerPassReport::default();

        for assignment in &snapshot.assignments {
            let Some(layer) = snapshot.layer(&assignment.layer) else {
                report.stale_assignments += 1;
                METRICS.inc(Counter::StaleAssignments);
                emit_stale_assignment(
                    &assignment.content_item.content_item_id.0,
                    &assignment.layer,
                );
                continue;
            };

            if !rules.evaluate(layer)? {
                report.widgets_hidden += 1;
                continue;
            }

            let content = display
                .build_display(&assignment.content_item, updater)
                .await?;
            self.composer.place(&layout, assignment, content).await?;

            report.widgets_placed += 1;
            METRICS.inc(Counter::WidgetsPlaced);
            emit_widget_placed(
                &assignment.content_item.content_item_id.0,
                &assignment.layer,
                &assignment.zone,
            );
        }

        report.rule_evaluations = rules.evaluations();
        emit_pass_finished(
            report.rule_evaluations,
            report.widgets_placed,
            report.widgets_hidden,
            report.stale_assignments,
        );
        Ok(LayerOutcome::Applied(report))
    }
}

fn skipped(reason: SkipReason) -> LayerOutcome {
    emit_layers_skipped(reason.as_str());
    LayerOutcome::Skipped { reason }
}
