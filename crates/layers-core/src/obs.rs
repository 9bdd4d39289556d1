//! Structured observability hooks for the layer pass.
//!
//! Lifecycle events are emitted at `info!`; per-widget and per-rule events
//! at `debug!`. A stale layer reference is expected drift and is logged at
//! `debug!`, never as an error.

use tracing::{debug, info};

/// Emit event: layers did not apply to this response.
pub fn emit_layers_skipped(reason: &str) {
    debug!(event = "layers.skipped", reason = %reason);
}

/// Emit event: the metadata snapshot was recomputed from the store.
///
/// # Example
///
/// ```ignore
/// emit_snapshot_recomputed("layers.filter:all-widgets", 12, 3);
/// // logs: event=layers.snapshot_recomputed key=... assignments=12 layers=3
/// ```
pub fn emit_snapshot_recomputed(key: &str, assignments: usize, layers: usize) {
    info!(
        event = "layers.snapshot_recomputed",
        key = %key,
        assignments = assignments,
        layers = layers,
    );
}

/// Emit event: a layer rule produced a result.
pub fn emit_rule_evaluated(layer: &str, active: bool) {
    debug!(event = "layers.rule_evaluated", layer = %layer, active = active);
}

/// Emit event: a widget was placed into a zone.
pub fn emit_widget_placed(content_item_id: &str, layer: &str, zone: &str) {
    debug!(
        event = "layers.widget_placed",
        content_item_id = %content_item_id,
        layer = %layer,
        zone = %zone,
    );
}

/// Emit event: a widget references a layer that no longer exists.
pub fn emit_stale_assignment(content_item_id: &str, layer: &str) {
    debug!(
        event = "layers.stale_assignment",
        content_item_id = %content_item_id,
        layer = %layer,
    );
}

/// Emit event: a layer pass completed.
pub fn emit_pass_finished(
    rule_evaluations: u64,
    widgets_placed: usize,
    widgets_hidden: usize,
    stale_assignments: usize,
) {
    info!(
        event = "layers.pass_finished",
        rule_evaluations = rule_evaluations,
        widgets_placed = widgets_placed,
        widgets_hidden = widgets_hidden,
        stale_assignments = stale_assignments,
    );
}
