//! Request bindings and the default layer rule methods.
//!
//! | Method | Meaning |
//! |---|---|
//! | `isHomepage()` | request path is the site root |
//! | `isAnonymous()` | no authenticated user |
//! | `isAuthenticated()` | an authenticated user |
//! | `url(pattern, ...)` | path matches any pattern; `~/` is the root, trailing `*` is a prefix |
//! | `culture(name, ...)` | request culture equals any name |

use serde::{Deserialize, Serialize};

use super::{GlobalMethod, GlobalMethodProvider, ScriptError, ScriptValue};

/// Request state visible to rule expressions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestBindings {
    /// Request path relative to the site root, e.g. "/blog/post-1"
    pub path: String,
    #[serde(default)]
    pub authenticated: bool,
    #[serde(default)]
    pub culture: Option<String>,
}

impl RequestBindings {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            authenticated: false,
            culture: None,
        }
    }

    pub fn authenticated(mut self) -> Self {
        self.authenticated = true;
        self
    }

    pub fn with_culture(mut self, culture: impl Into<String>) -> Self {
        self.culture = Some(culture.into());
        self
    }

    fn normalized_path(&self) -> String {
        normalize_path(&self.path)
    }
}

fn normalize_path(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

/// Match a request path against a `url()` pattern.
pub fn url_matches(path: &str, pattern: &str) -> bool {
    let pattern = pattern.trim();
    let pattern = pattern.strip_prefix('~').unwrap_or(pattern);
    let path = normalize_path(path).to_lowercase();

    match pattern.strip_suffix('*') {
        Some(prefix) => {
            let prefix = prefix.to_lowercase();
            let prefix = if prefix.starts_with('/') {
                prefix
            } else {
                format!("/{prefix}")
            };
            path.starts_with(&prefix) || format!("{path}/") == prefix
        }
        None => path == normalize_path(pattern).to_lowercase(),
    }
}

fn expect_no_args(method: &str, args: &[ScriptValue]) -> Result<(), ScriptError> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(ScriptError::Arity {
            method: method.to_string(),
            expected: "0".to_string(),
            actual: args.len(),
        })
    }
}

fn text_args<'a>(method: &str, args: &'a [ScriptValue]) -> Result<Vec<&'a str>, ScriptError> {
    if args.is_empty() {
        return Err(ScriptError::Arity {
            method: method.to_string(),
            expected: "at least 1".to_string(),
            actual: 0,
        });
    }
    args.iter()
        .map(|arg| {
            arg.as_str().ok_or_else(|| {
                ScriptError::Type(format!(
                    "{method} expects string arguments, got {}",
                    arg.type_name()
                ))
            })
        })
        .collect()
}

/// The rule methods layers are authored against.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultLayerMethods;

impl GlobalMethodProvider for DefaultLayerMethods {
    fn methods(&self) -> Vec<GlobalMethod> {
        vec![
            GlobalMethod::new("isHomepage", |req, args| {
                expect_no_args("isHomepage", args)?;
                Ok(ScriptValue::Bool(req.normalized_path() == "/"))
            }),
            GlobalMethod::new("isAnonymous", |req, args| {
                expect_no_args("isAnonymous", args)?;
                Ok(ScriptValue::Bool(!req.authenticated))
            }),
            GlobalMethod::new("isAuthenticated", |req, args| {
                expect_no_args("isAuthenticated", args)?;
                Ok(ScriptValue::Bool(req.authenticated))
            }),
            GlobalMethod::new("url", |req, args| {
                let patterns = text_args("url", args)?;
                Ok(ScriptValue::Bool(
                    patterns.iter().any(|p| url_matches(&req.path, p)),
                ))
            }),
            GlobalMethod::new("culture", |req, args| {
                let names = text_args("culture", args)?;
                let current = req.culture.as_deref().unwrap_or_default();
                Ok(ScriptValue::Bool(
                    names.iter().any(|n| n.eq_ignore_ascii_case(current)),
                ))
            }),
        ]
    }
}
