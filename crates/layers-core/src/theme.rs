//! Theme resolution seams used by the layer gate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Resolves the presentation theme of the current request.
#[async_trait]
pub trait ThemeManager: Send + Sync {
    async fn current_theme_id(&self) -> Result<Option<String>>;
}

/// Resolves the tenant's administrative theme.
#[async_trait]
pub trait AdminThemeService: Send + Sync {
    async fn admin_theme_name(&self) -> Result<Option<String>>;
}

/// Fixed theme assignment for a site.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteThemes {
    pub theme: Option<String>,
    pub admin_theme: Option<String>,
}

impl SiteThemes {
    pub fn new(theme: impl Into<String>, admin_theme: impl Into<String>) -> Self {
        Self {
            theme: Some(theme.into()),
            admin_theme: Some(admin_theme.into()),
        }
    }
}

#[async_trait]
impl ThemeManager for SiteThemes {
    async fn current_theme_id(&self) -> Result<Option<String>> {
        Ok(self.theme.clone())
    }
}

#[async_trait]
impl AdminThemeService for SiteThemes {
    async fn admin_theme_name(&self) -> Result<Option<String>> {
        Ok(self.admin_theme.clone())
    }
}
