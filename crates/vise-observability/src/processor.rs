//! Per-hook summaries of intercepting values.
//!
//! Summaries keep traces short: markup and cached content are cut to a
//! fixed prefix, and `initState` is replaced by a prefix of its JSON text.
//! With full logging the whole value is serialized instead.

use serde_json::{json, Map, Value};
use vise_hooks::{HookName, HookValue};

/// Prefix length kept from long strings.
pub const TRUNCATE_AT: usize = 100;

/// First `max` characters of `s`.
pub fn prefix(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((end, _)) => &s[..end],
        None => s,
    }
}

fn ellipsis(s: &str) -> String {
    format!("{}...", prefix(s, TRUNCATE_AT))
}

fn str_at<'a>(value: &'a Value, pointer: &str) -> &'a str {
    value.pointer(pointer).and_then(Value::as_str).unwrap_or_default()
}

/// Replace `initState` in an extra object by a prefix of its JSON text.
fn redact_extra(extra: &Value) -> Value {
    let mut extra = extra.as_object().cloned().unwrap_or_default();
    let init_state = match extra.get("initState") {
        Some(state) if !state.is_null() => {
            Value::String(prefix(&state.to_string(), TRUNCATE_AT).to_string())
        }
        _ => Value::Null,
    };
    extra.insert("initState".into(), init_state);
    Value::Object(extra)
}

/// Redact the extra of a serialized context.
fn redact_context(context: &Value) -> Value {
    let mut context = context.clone();
    if let Some(extra) = context.get("extra").map(redact_extra) {
        if let Some(obj) = context.as_object_mut() {
            obj.insert("extra".into(), extra);
        }
    }
    context
}

/// Summarize the value a hook intercepted with. An empty summary means
/// there is nothing to trace.
pub fn summarize(hook: HookName, value: &HookValue, full_log: bool) -> String {
    let data = value.to_json();

    if full_log && !matches!((hook, value), (HookName::Render, HookValue::Result(_))) {
        return data.to_string();
    }

    match hook {
        HookName::ReceiveRequest => json!({
            "renderBy": data.get("renderBy"),
            "extra": data.pointer("/context/extra"),
        })
        .to_string(),
        HookName::RequestResolved | HookName::BeforeRender => redact_context(&data).to_string(),
        HookName::FindCache => json!({
            "renderBy": data.get("renderBy"),
            "content": ellipsis(str_at(&data, "/content")),
        })
        .to_string(),
        HookName::HitCache => json!({
            "key": data.get("key"),
            "expire": data.get("expire"),
            "content": ellipsis(str_at(&data, "/content")),
        })
        .to_string(),
        HookName::Render => summarize_render(&data, full_log),
        HookName::AfterRender => summarize_after_render(&data),
        HookName::BeforeResponse => {
            let mut response = data.as_object().cloned().unwrap_or_default();
            let body = match response.get("body").and_then(Value::as_str) {
                Some(body) if !body.is_empty() => ellipsis(body),
                _ => String::new(),
            };
            response.insert("body".into(), Value::String(body));
            Value::Object(response).to_string()
        }
        HookName::BeforeUseCache => data.to_string(),
    }
}

fn summarize_render(data: &Value, full_log: bool) -> String {
    let result = match data.get("type").and_then(Value::as_str) {
        Some("error") => Value::String(format!(
            "render failed with: {}",
            data.get("error").cloned().unwrap_or_default()
        )),
        Some("render") => {
            if full_log {
                return data.to_string();
            }
            Value::String(ellipsis(str_at(data, "/ssrResult/app")))
        }
        _ => Value::Null,
    };

    json!({
        "renderBy": data.get("renderBy"),
        "result": result,
    })
    .to_string()
}

fn summarize_after_render(data: &Value) -> String {
    let mut summary = Map::new();
    summary.insert(
        "renderBy".into(),
        data.get("renderBy").cloned().unwrap_or_default(),
    );
    summary.insert(
        "context".into(),
        json!({
            "request": { "url": data.pointer("/context/request/url") },
            "extra": data
                .pointer("/context/extra")
                .map(redact_extra)
                .unwrap_or_default(),
        }),
    );
    match data.get("type").and_then(Value::as_str) {
        Some("error") => {
            summary.insert("error".into(), data.get("error").cloned().unwrap_or_default());
        }
        kind => {
            summary.insert("type".into(), json!(kind));
        }
    }
    Value::Object(summary).to_string()
}
