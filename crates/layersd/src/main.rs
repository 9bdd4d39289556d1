//! layersd - run the layer engine against a site fixture
//!
//! A fixture is a JSON file describing a site: configuration, themes,
//! layers, widget assignments, layout zones and a list of requests.
//!
//! ## Commands
//!
//! - `render`: run one layer pass per request and print each outcome with
//!   the resulting layout
//! - `check`: validate every layer rule without evaluating it

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use layers_core::{
    init_tracing, BasicDisplayBuilder, DefaultScriptingManager, Layer, LayerFilter, LayerOutcome,
    LayersConfig, Layout, MetadataCache, ModelUpdater, RequestBindings, ResultExecutingContext,
    ResultKind, ScriptingManager, ServiceCollection, SharedLayoutAccessor, Signal, SiteThemes,
    WidgetAssignment, ZoneItem, METRICS,
};
use layers_state::fakes::MemoryLayerStore;
use serde::{Deserialize, Serialize};
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "layersd")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Render layer widgets for a site fixture", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the layer pass for every request in the fixture
    Render {
        /// Path to the site fixture (JSON)
        fixture: PathBuf,

        /// Pretty-print the output
        #[arg(long)]
        pretty: bool,
    },

    /// Validate layer rule syntax
    Check {
        /// Path to the site fixture (JSON)
        fixture: PathBuf,
    },
}

/// Zones registered on every request's layout.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FixtureZones {
    shape: Vec<String>,
    on_demand: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct FixtureRequest {
    #[serde(flatten)]
    bindings: RequestBindings,
    #[serde(default = "default_result")]
    result: ResultKind,
    #[serde(default)]
    is_admin: bool,
}

fn default_result() -> ResultKind {
    ResultKind::View
}

#[derive(Debug, Deserialize)]
struct SiteFixture {
    /// Falls back to `LayersConfig::from_env` when absent
    #[serde(default)]
    config: Option<LayersConfig>,
    #[serde(default)]
    themes: SiteThemes,
    #[serde(default)]
    layers: Vec<Layer>,
    #[serde(default)]
    widgets: Vec<WidgetAssignment>,
    #[serde(default)]
    zones: FixtureZones,
    #[serde(default)]
    requests: Vec<FixtureRequest>,
}

#[derive(Debug, Serialize)]
struct RenderedRequest {
    path: String,
    #[serde(flatten)]
    outcome: LayerOutcome,
    layout: BTreeMap<String, Vec<ZoneItem>>,
}

#[derive(Debug, Serialize)]
struct RuleCheck {
    layer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    rule: Option<String>,
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    init_tracing(cli.json, level);

    match cli.command {
        Commands::Render { fixture, pretty } => cmd_render(&fixture, pretty).await,
        Commands::Check { fixture } => cmd_check(&fixture),
    }
}

async fn cmd_render(path: &Path, pretty: bool) -> Result<()> {
    let fixture = load_fixture(path)?;
    let rendered = render_site(fixture).await?;

    let output = if pretty {
        serde_json::to_string_pretty(&rendered)?
    } else {
        serde_json::to_string(&rendered)?
    };
    println!("{output}");

    METRICS.flush();
    Ok(())
}

fn cmd_check(path: &Path) -> Result<()> {
    let fixture = load_fixture(path)?;
    let config = resolve_config(fixture.config)?;
    let checks = check_rules(&fixture.layers, &config)?;
    println!("{}", serde_json::to_string_pretty(&checks)?);

    let invalid = checks.iter().filter(|c| !c.valid).count();
    if invalid > 0 {
        bail!("{invalid} layer rule(s) failed validation");
    }
    info!(layers = checks.len(), "all layer rules are valid");
    Ok(())
}

fn load_fixture(path: &Path) -> Result<SiteFixture> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read fixture: {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid fixture JSON in {:?}", path))
}

fn resolve_config(config: Option<LayersConfig>) -> Result<LayersConfig> {
    match config {
        Some(config) => {
            config.validate().context("Invalid fixture config")?;
            Ok(config)
        }
        None => LayersConfig::from_env().context("Invalid layer configuration in environment"),
    }
}

fn build_layout(config: &LayersConfig, zones: &FixtureZones) -> Arc<Layout> {
    let layout = if config.on_demand_zones {
        Layout::with_on_demand_zones()
    } else {
        Layout::new()
    };
    for name in &zones.shape {
        layout.add_shape_zone(name.as_str());
    }
    for name in &zones.on_demand {
        layout.add_on_demand_zone(name.as_str());
    }
    Arc::new(layout)
}

/// Run every fixture request through one shared filter and metadata cache.
async fn render_site(fixture: SiteFixture) -> Result<Vec<RenderedRequest>> {
    let config = resolve_config(fixture.config)?;
    let store = Arc::new(MemoryLayerStore::with_data(fixture.layers, fixture.widgets));
    let themes = Arc::new(fixture.themes);
    let metadata = Arc::new(MetadataCache::new(Arc::new(Signal::new()), &config));
    let filter = LayerFilter::new(
        config.clone(),
        Arc::new(DefaultScriptingManager::with_defaults()),
        metadata,
    );

    let mut rendered = Vec::with_capacity(fixture.requests.len());
    for request in fixture.requests {
        let layout = build_layout(&config, &fixture.zones);
        let services = ServiceCollection::new()
            .with_theme_manager(themes.clone())
            .with_admin_theme_service(themes.clone())
            .with_layer_store(store.clone())
            .with_layout_accessor(Arc::new(SharedLayoutAccessor::new(layout.clone())))
            .with_display_builder(Arc::new(BasicDisplayBuilder))
            .with_model_updater(Arc::new(ModelUpdater::default()));

        let path = request.bindings.path.clone();
        let ctx = ResultExecutingContext {
            result: request.result,
            is_admin: request.is_admin,
            request: Arc::new(request.bindings),
            services: &services,
        };

        let outcome = filter
            .apply(&ctx)
            .await
            .with_context(|| format!("Layer pass failed for {path}"))?;
        rendered.push(RenderedRequest {
            path,
            outcome,
            layout: layout.snapshot(),
        });
    }
    Ok(rendered)
}

/// Validate every rule with the engine the filter would evaluate it with.
fn check_rules(layers: &[Layer], config: &LayersConfig) -> Result<Vec<RuleCheck>> {
    let engine = DefaultScriptingManager::with_defaults()
        .get_engine(&config.script_engine)
        .with_context(|| format!("Scripting engine not registered: {}", config.script_engine))?;
    let checks = layers
        .iter()
        .map(|layer| {
            let rule = layer.rule_text().map(str::to_string);
            // A layer without a rule is valid but never displays.
            let error = rule
                .as_deref()
                .and_then(|r| engine.validate(r).err())
                .map(|e| e.to_string());
            RuleCheck {
                layer: layer.name.clone(),
                rule,
                valid: error.is_none(),
                error,
            }
        })
        .collect();
    Ok(checks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn write_fixture(dir: &tempfile::TempDir, fixture: serde_json::Value) -> PathBuf {
        let path = dir.path().join("site.json");
        std::fs::write(&path, serde_json::to_string(&fixture).unwrap()).unwrap();
        path
    }

    fn widget(id: &str, layer: &str, zone: &str) -> serde_json::Value {
        json!({
            "content_item": {
                "content_item_id": id,
                "content_type": "HtmlWidget",
                "display_text": id,
                "published": true
            },
            "layer": layer,
            "zone": zone
        })
    }

    fn placed(rendered: &RenderedRequest, zone: &str) -> Vec<String> {
        rendered
            .layout
            .get(zone)
            .map(|items| {
                items
                    .iter()
                    .filter_map(ZoneItem::as_widget)
                    .map(|w| w.widget.display_text.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn blog_site() -> serde_json::Value {
        json!({
            "config": { "on_demand_zones": false },
            "themes": { "theme": "TheBlogTheme", "admin_theme": "TheAdmin" },
            "layers": [
                { "name": "Always", "rule": "true" },
                { "name": "Homepage", "rule": "isHomepage()" }
            ],
            "widgets": [
                widget("footer", "Always", "Footer"),
                widget("hero", "Homepage", "Content")
            ],
            "zones": { "shape": ["Content", "Footer"] },
            "requests": [
                { "path": "/" },
                { "path": "/about" },
                { "path": "/api/items", "result": "json" }
            ]
        })
    }

    #[tokio::test]
    async fn test_render_site_from_fixture_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(&dir, blog_site());

        let fixture = load_fixture(&path).unwrap();
        let rendered = render_site(fixture).await.unwrap();
        assert_eq!(rendered.len(), 3);

        assert_eq!(placed(&rendered[0], "Content"), vec!["hero"]);
        assert_eq!(placed(&rendered[0], "Footer"), vec!["footer"]);

        assert!(placed(&rendered[1], "Content").is_empty());
        assert_eq!(placed(&rendered[1], "Footer"), vec!["footer"]);

        assert!(matches!(rendered[2].outcome, LayerOutcome::Skipped { .. }));
        assert!(placed(&rendered[2], "Footer").is_empty());
    }

    #[tokio::test]
    async fn test_rendered_output_serializes() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(&dir, blog_site());
        let rendered = render_site(load_fixture(&path).unwrap()).await.unwrap();

        let value = serde_json::to_value(&rendered).unwrap();
        assert_eq!(value[0]["outcome"], "applied");
        assert_eq!(value[0]["widgets_placed"], 2);
        assert_eq!(value[2]["outcome"], "skipped");
        assert_eq!(value[2]["reason"], "not_full_view");
        assert_eq!(value[0]["layout"]["Footer"][0]["kind"], "widget");
    }

    #[tokio::test]
    async fn test_missing_zone_fails_strict_fixture() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(
            &dir,
            json!({
                "config": { "on_demand_zones": false },
                "themes": { "theme": "TheBlogTheme", "admin_theme": "TheAdmin" },
                "layers": [{ "name": "Always", "rule": "true" }],
                "widgets": [widget("w", "Always", "Sidebar")],
                "requests": [{ "path": "/" }]
            }),
        );

        let err = render_site(load_fixture(&path).unwrap()).await.unwrap_err();
        assert!(format!("{err:#}").contains("zone 'Sidebar' not found"));
    }

    #[tokio::test]
    async fn test_on_demand_fixture_creates_zones() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(
            &dir,
            json!({
                "config": { "on_demand_zones": true },
                "themes": { "theme": "TheBlogTheme", "admin_theme": "TheAdmin" },
                "layers": [{ "name": "Always", "rule": "true" }],
                "widgets": [widget("w", "Always", "Sidebar")],
                "requests": [{ "path": "/" }]
            }),
        );

        let rendered = render_site(load_fixture(&path).unwrap()).await.unwrap();
        assert_eq!(placed(&rendered[0], "Sidebar"), vec!["w"]);
    }

    #[test]
    fn test_check_rules_reports_syntax_errors() {
        let layers = vec![
            Layer::new("Homepage", "isHomepage()"),
            Layer::new("Broken", "url('~/blog*') &&"),
            Layer::without_rule("Empty"),
        ];
        let checks = check_rules(&layers, &LayersConfig::default()).unwrap();

        assert!(checks[0].valid);
        assert!(!checks[1].valid);
        assert!(checks[1].error.is_some());
        assert!(checks[2].valid);
        assert!(checks[2].rule.is_none());
    }

    #[test]
    fn test_check_rules_uses_configured_engine() {
        let layers = vec![Layer::new("Homepage", "isHomepage()")];
        let config = LayersConfig::default().with_script_engine("js");

        let err = check_rules(&layers, &config).unwrap_err();
        assert!(err.to_string().contains("Scripting engine not registered: js"));
    }

    #[test]
    fn test_load_fixture_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_fixture(&dir.path().join("missing.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read fixture"));
    }

    #[test]
    fn test_fixture_config_is_validated() {
        let config = LayersConfig::default().with_script_engine(" ");
        assert!(resolve_config(Some(config)).is_err());
    }
}
