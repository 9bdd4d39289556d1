//! Request-scoped service resolution.
//!
//! The request pipeline exposes its services through a
//! [`ServiceProvider`]. [`RequestServices`] wraps one provider for one
//! response and resolves each service at most once, on first use.

use std::sync::{Arc, OnceLock};

use layers_state::LayerStore;

use crate::display::{ContentDisplayBuilder, ModelUpdater};
use crate::error::{LayerError, Result};
use crate::layout::LayoutAccessor;
use crate::theme::{AdminThemeService, ThemeManager};

/// Services the layer pipeline needs from the host.
pub trait ServiceProvider: Send + Sync {
    fn theme_manager(&self) -> Option<Arc<dyn ThemeManager>>;
    fn admin_theme_service(&self) -> Option<Arc<dyn AdminThemeService>>;
    fn layer_store(&self) -> Option<Arc<dyn LayerStore>>;
    fn layout_accessor(&self) -> Option<Arc<dyn LayoutAccessor>>;
    fn display_builder(&self) -> Option<Arc<dyn ContentDisplayBuilder>>;
    fn model_updater(&self) -> Option<Arc<ModelUpdater>>;
}

fn resolve<'a, T: ?Sized>(
    cell: &'a OnceLock<Arc<T>>,
    name: &'static str,
    lookup: impl FnOnce() -> Option<Arc<T>>,
) -> Result<&'a Arc<T>> {
    if let Some(service) = cell.get() {
        return Ok(service);
    }
    let service = lookup().ok_or(LayerError::ServiceUnavailable(name))?;
    Ok(cell.get_or_init(|| service))
}

/// Memoized view over a [`ServiceProvider`] for one response.
pub struct RequestServices<'a> {
    provider: &'a dyn ServiceProvider,
    theme_manager: OnceLock<Arc<dyn ThemeManager>>,
    admin_theme_service: OnceLock<Arc<dyn AdminThemeService>>,
    layer_store: OnceLock<Arc<dyn LayerStore>>,
    layout_accessor: OnceLock<Arc<dyn LayoutAccessor>>,
    display_builder: OnceLock<Arc<dyn ContentDisplayBuilder>>,
    model_updater: OnceLock<Arc<ModelUpdater>>,
}

impl<'a> RequestServices<'a> {
    pub fn new(provider: &'a dyn ServiceProvider) -> Self {
        Self {
            provider,
            theme_manager: OnceLock::new(),
            admin_theme_service: OnceLock::new(),
            layer_store: OnceLock::new(),
            layout_accessor: OnceLock::new(),
            display_builder: OnceLock::new(),
            model_updater: OnceLock::new(),
        }
    }

    pub fn theme_manager(&self) -> Result<&Arc<dyn ThemeManager>> {
        resolve(&self.theme_manager, "theme manager", || {
            self.provider.theme_manager()
        })
    }

    pub fn admin_theme_service(&self) -> Result<&Arc<dyn AdminThemeService>> {
        resolve(&self.admin_theme_service, "admin theme service", || {
            self.provider.admin_theme_service()
        })
    }

    pub fn layer_store(&self) -> Result<&Arc<dyn LayerStore>> {
        resolve(&self.layer_store, "layer store", || self.provider.layer_store())
    }

    pub fn layout_accessor(&self) -> Result<&Arc<dyn LayoutAccessor>> {
        resolve(&self.layout_accessor, "layout accessor", || {
            self.provider.layout_accessor()
        })
    }

    pub fn display_builder(&self) -> Result<&Arc<dyn ContentDisplayBuilder>> {
        resolve(&self.display_builder, "content display builder", || {
            self.provider.display_builder()
        })
    }

    pub fn model_updater(&self) -> Result<&Arc<ModelUpdater>> {
        resolve(&self.model_updater, "model updater", || {
            self.provider.model_updater()
        })
    }
}

/// `ServiceProvider` over fixed registrations.
#[derive(Default, Clone)]
pub struct ServiceCollection {
    theme_manager: Option<Arc<dyn ThemeManager>>,
    admin_theme_service: Option<Arc<dyn AdminThemeService>>,
    layer_store: Option<Arc<dyn LayerStore>>,
    layout_accessor: Option<Arc<dyn LayoutAccessor>>,
    display_builder: Option<Arc<dyn ContentDisplayBuilder>>,
    model_updater: Option<Arc<ModelUpdater>>,
}

impl ServiceCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_theme_manager(mut self, service: Arc<dyn ThemeManager>) -> Self {
        self.theme_manager = Some(service);
        self
    }

    pub fn with_admin_theme_service(mut self, service: Arc<dyn AdminThemeService>) -> Self {
        self.admin_theme_service = Some(service);
        self
    }

    pub fn with_layer_store(mut self, service: Arc<dyn LayerStore>) -> Self {
        self.layer_store = Some(service);
        self
    }

    pub fn with_layout_accessor(mut self, service: Arc<dyn LayoutAccessor>) -> Self {
        self.layout_accessor = Some(service);
        self
    }

    pub fn with_display_builder(mut self, service: Arc<dyn ContentDisplayBuilder>) -> Self {
        self.display_builder = Some(service);
        self
    }

    pub fn with_model_updater(mut self, service: Arc<ModelUpdater>) -> Self {
        self.model_updater = Some(service);
        self
    }
}

impl ServiceProvider for ServiceCollection {
    fn theme_manager(&self) -> Option<Arc<dyn ThemeManager>> {
        self.theme_manager.clone()
    }

    fn admin_theme_service(&self) -> Option<Arc<dyn AdminThemeService>> {
        self.admin_theme_service.clone()
    }

    fn layer_store(&self) -> Option<Arc<dyn LayerStore>> {
        self.layer_store.clone()
    }

    fn layout_accessor(&self) -> Option<Arc<dyn LayoutAccessor>> {
        self.layout_accessor.clone()
    }

    fn display_builder(&self) -> Option<Arc<dyn ContentDisplayBuilder>> {
        self.display_builder.clone()
    }

    fn model_updater(&self) -> Option<Arc<ModelUpdater>> {
        self.model_updater.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::SiteThemes;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingProvider {
        inner: ServiceCollection,
        theme_lookups: AtomicU32,
    }

    impl ServiceProvider for CountingProvider {
        fn theme_manager(&self) -> Option<Arc<dyn ThemeManager>> {
            self.theme_lookups.fetch_add(1, Ordering::SeqCst);
            self.inner.theme_manager()
        }
        fn admin_theme_service(&self) -> Option<Arc<dyn AdminThemeService>> {
            self.inner.admin_theme_service()
        }
        fn layer_store(&self) -> Option<Arc<dyn LayerStore>> {
            self.inner.layer_store()
        }
        fn layout_accessor(&self) -> Option<Arc<dyn LayoutAccessor>> {
            self.inner.layout_accessor()
        }
        fn display_builder(&self) -> Option<Arc<dyn ContentDisplayBuilder>> {
            self.inner.display_builder()
        }
        fn model_updater(&self) -> Option<Arc<ModelUpdater>> {
            self.inner.model_updater()
        }
    }

    #[test]
    fn test_service_resolved_once() {
        let provider = CountingProvider {
            inner: ServiceCollection::new()
                .with_theme_manager(Arc::new(SiteThemes::new("TheBlogTheme", "TheAdmin"))),
            theme_lookups: AtomicU32::new(0),
        };
        let services = RequestServices::new(&provider);

        services.theme_manager().unwrap();
        services.theme_manager().unwrap();
        assert_eq!(provider.theme_lookups.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_missing_service_is_an_error() {
        let provider = ServiceCollection::new();
        let services = RequestServices::new(&provider);
        let err = services.layer_store().err().unwrap();
        assert!(matches!(err, LayerError::ServiceUnavailable("layer store")));
    }
}
