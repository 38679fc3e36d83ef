//! Render context threaded through the hook pipeline.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CoreError;
use crate::json::SharedJson;
use crate::message::HttpRequest;
use crate::result::RenderError;

/// Partial extra supplied by the hosting server for one request.
pub type SessionExtra = Map<String, Value>;

/// Keys of `RenderContextExtra` with a fixed meaning.
pub const RESERVED_EXTRA_KEYS: [&str; 4] = ["title", "noCache", "initState", "routerBase"];

fn default_router_base() -> String {
    "/".to_string()
}

/// Open JSON object carried alongside the request.
///
/// Reserved keys are typed fields; anything plugins add lives in `fields`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderContextExtra {
    /// Page title.
    #[serde(default)]
    pub title: String,
    /// Disables page caching for this request.
    #[serde(default)]
    pub no_cache: bool,
    /// State serialized into the page for client hydration.
    #[serde(default)]
    pub init_state: Map<String, Value>,
    /// Router base the request URL was resolved against.
    #[serde(default = "default_router_base")]
    pub router_base: String,
    /// Plugin-defined fields.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Default for RenderContextExtra {
    fn default() -> Self {
        Self {
            title: String::new(),
            no_cache: false,
            init_state: Map::new(),
            router_base: default_router_base(),
            fields: Map::new(),
        }
    }
}

impl RenderContextExtra {
    /// Merge a session extra over the defaults.
    ///
    /// Keys present in `session` override the defaults; unknown keys become
    /// plugin fields.
    pub fn with_session(session: &SessionExtra) -> Result<Self, CoreError> {
        let mut merged = Map::new();
        merged.insert("title".into(), Value::String(String::new()));
        merged.insert("noCache".into(), Value::Bool(false));
        merged.insert("initState".into(), Value::Object(Map::new()));
        merged.insert("routerBase".into(), Value::String(default_router_base()));
        for (key, value) in session {
            merged.insert(key.clone(), value.clone());
        }

        serde_json::from_value(Value::Object(merged))
            .map_err(|e| CoreError::InvalidExtra(e.to_string()))
    }

    /// Get a plugin-defined field.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Set a plugin-defined field. Reserved keys must be set through their
    /// typed fields.
    pub fn set_field(&mut self, key: impl Into<String>, value: Value) -> Result<(), CoreError> {
        let key = key.into();
        if RESERVED_EXTRA_KEYS.contains(&key.as_str()) {
            return Err(CoreError::InvalidExtra(format!(
                "'{}' is reserved and cannot be set as a plugin field",
                key
            )));
        }
        self.fields.insert(key, value);
        Ok(())
    }

    /// Set a plugin-defined field from a shared JSON graph.
    pub fn insert_shared(&mut self, key: impl Into<String>, value: &SharedJson) -> Result<(), CoreError> {
        self.set_field(key, value.to_value()?)
    }
}

/// The unit threaded through the rendering pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderContext {
    /// The (router-base normalized) request.
    pub request: HttpRequest,
    /// Request metadata.
    pub extra: RenderContextExtra,
    /// Error recorded before rendering; skips the renderer when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RenderError>,
}

impl RenderContext {
    /// Create a render context without an error.
    pub fn new(request: HttpRequest, extra: RenderContextExtra) -> Self {
        Self {
            request,
            extra,
            error: None,
        }
    }

    /// Record an error on the context.
    pub fn with_error(mut self, error: RenderError) -> Self {
        self.error = Some(error);
        self
    }
}

/// Input and output of the `requestResolved` hook.
///
/// `original` is restored after every callback, so later phases always see
/// the context as it was before resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedRequest {
    /// Snapshot of the context before resolution.
    pub original: RenderContext,
    /// Context as resolved by plugins.
    pub resolved: RenderContext,
}

impl ResolvedRequest {
    /// Seed a resolved request from the initial context.
    pub fn new(context: RenderContext) -> Self {
        Self {
            original: context.clone(),
            resolved: context,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn session(value: Value) -> SessionExtra {
        match value {
            Value::Object(map) => map,
            _ => panic!("session must be an object"),
        }
    }

    #[test]
    fn test_default_extra() {
        let extra = RenderContextExtra::default();
        assert_eq!(extra.title, "");
        assert!(!extra.no_cache);
        assert!(extra.init_state.is_empty());
        assert_eq!(extra.router_base, "/");
    }

    #[test]
    fn test_with_session_overrides_defaults() {
        let extra = RenderContextExtra::with_session(&session(json!({
            "title": "Home",
            "routerBase": "/app1",
            "abtest": "b"
        })))
        .unwrap();

        assert_eq!(extra.title, "Home");
        assert_eq!(extra.router_base, "/app1");
        assert!(!extra.no_cache);
        assert_eq!(extra.field("abtest"), Some(&json!("b")));
    }

    #[test]
    fn test_with_session_rejects_wrong_types() {
        let result = RenderContextExtra::with_session(&session(json!({ "noCache": "yes" })));
        assert!(matches!(result, Err(CoreError::InvalidExtra(_))));
    }

    #[test]
    fn test_extra_serializes_camel_case_and_flattens_fields() {
        let mut extra = RenderContextExtra::default();
        extra.no_cache = true;
        extra.set_field("locale", json!("en")).unwrap();

        let value = serde_json::to_value(&extra).unwrap();
        assert_eq!(
            value,
            json!({
                "title": "",
                "noCache": true,
                "initState": {},
                "routerBase": "/",
                "locale": "en"
            })
        );
    }

    #[test]
    fn test_set_field_rejects_reserved_keys() {
        let mut extra = RenderContextExtra::default();
        assert!(extra.set_field("title", json!("x")).is_err());
        assert!(extra.fields.is_empty());
    }

    #[test]
    fn test_insert_shared_field() {
        let obj = crate::json::SharedObject::new();
        obj.insert("a", SharedJson::from(json!(1)));
        let mut extra = RenderContextExtra::default();
        extra
            .insert_shared("data", &SharedJson::Object(obj))
            .unwrap();
        assert_eq!(extra.field("data"), Some(&json!({ "a": 1 })));
    }

    #[test]
    fn test_resolved_request_seed() {
        let ctx = RenderContext::new(HttpRequest::new("/a"), RenderContextExtra::default());
        let resolved = ResolvedRequest::new(ctx.clone());
        assert_eq!(resolved.original, ctx);
        assert_eq!(resolved.resolved, ctx);
    }
}
