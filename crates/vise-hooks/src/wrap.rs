//! Per-hook callback adapters applied while merging plugins.

use std::sync::Arc;

use futures::FutureExt;
use vise_core::json::deep_equal;
use vise_core::{FindCacheResult, RenderResult};

use crate::callback::{raw_callback, RawCallback};
use crate::name::HookName;
use crate::value::HookValue;

/// Wrap a plugin's callback with the adapter of its hook.
///
/// - `receiveRequest`: an interception becomes an intercepted `RenderResult`
///   stamped with the plugin name.
/// - `render`: a defined result is stamped with the plugin name.
/// - `afterRender`: the output is stamped when it differs from the input.
/// - `requestResolved`: the `original` context is restored after the call.
/// - `findCache`: non-empty content is tagged with the plugin name; empty
///   content is a miss.
pub fn wrap_callback(plugin: &str, hook: HookName, callback: RawCallback) -> RawCallback {
    let plugin: Arc<str> = Arc::from(plugin);

    match hook {
        HookName::ReceiveRequest => raw_callback(move |value: HookValue| {
            let call = callback(value);
            let plugin = plugin.clone();
            async move {
                Ok(match call.await? {
                    Some(HookValue::Interception(interception)) => Some(HookValue::Result(
                        RenderResult::intercepted(interception.context, &*plugin),
                    )),
                    other => other,
                })
            }
            .boxed()
        }),
        HookName::Render => raw_callback(move |value: HookValue| {
            let call = callback(value);
            let plugin = plugin.clone();
            async move {
                Ok(match call.await? {
                    Some(HookValue::Result(mut result)) => {
                        result.render_by = plugin.to_string();
                        Some(HookValue::Result(result))
                    }
                    other => other,
                })
            }
            .boxed()
        }),
        HookName::AfterRender => raw_callback(move |value: HookValue| {
            let before = match &value {
                HookValue::Result(result) => Some(result.clone()),
                _ => None,
            };
            let call = callback(value);
            let plugin = plugin.clone();
            async move {
                Ok(match call.await? {
                    Some(HookValue::Result(mut result)) => {
                        let changed = before
                            .as_ref()
                            .map_or(true, |before| !deep_equal(before, &result));
                        if changed {
                            result.render_by = plugin.to_string();
                        }
                        Some(HookValue::Result(result))
                    }
                    other => other,
                })
            }
            .boxed()
        }),
        HookName::RequestResolved => raw_callback(move |value: HookValue| {
            let original = match &value {
                HookValue::Resolved(resolved) => Some(resolved.original.clone()),
                _ => None,
            };
            let call = callback(value);
            async move {
                Ok(match (call.await?, original) {
                    (Some(HookValue::Resolved(mut resolved)), Some(original)) => {
                        resolved.original = original;
                        Some(HookValue::Resolved(resolved))
                    }
                    (other, _) => other,
                })
            }
            .boxed()
        }),
        HookName::FindCache => raw_callback(move |value: HookValue| {
            let call = callback(value);
            let plugin = plugin.clone();
            async move {
                Ok(match call.await? {
                    Some(HookValue::CacheContent(content)) if content.is_empty() => None,
                    Some(HookValue::CacheContent(content)) => {
                        Some(HookValue::CacheFound(FindCacheResult {
                            content,
                            render_by: plugin.to_string(),
                        }))
                    }
                    other => other,
                })
            }
            .boxed()
        }),
        HookName::BeforeUseCache
        | HookName::HitCache
        | HookName::BeforeRender
        | HookName::BeforeResponse => callback,
    }
}
