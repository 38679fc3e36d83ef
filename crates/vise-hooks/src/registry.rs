//! Hook registry and composition strategies.
//!
//! A registry holds one slot per hook identifier. It is built once from the
//! merged plugins and only read afterwards, so one `Arc<HookRegistry>` can be
//! shared by every concurrent request.

use std::any::Any;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;

use futures::future::join_all;
use futures::FutureExt;
use tokio::task::JoinError;

use crate::callback::RawCallback;
use crate::error::{HookError, HookResult};
use crate::name::{HookSlotId, Strategy};
use crate::plugin::{merge_plugins, MergedCallback, ViseHooks};
use crate::value::HookValue;

/// A callback registered on a slot, with the plugin that declared it.
#[derive(Clone)]
pub struct TappedCallback {
    /// Declaring plugin.
    pub plugin: String,
    /// Wrapped callback.
    pub callback: RawCallback,
}

/// The ordered callbacks of one hook identifier.
#[derive(Clone)]
pub struct HookSlot {
    strategy: Strategy,
    callbacks: Vec<TappedCallback>,
}

impl HookSlot {
    fn new(strategy: Strategy) -> Self {
        Self {
            strategy,
            callbacks: Vec::new(),
        }
    }

    /// Composition strategy of the slot.
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Plugins of the registered callbacks, in invocation order.
    pub fn plugins(&self) -> impl Iterator<Item = &str> {
        self.callbacks.iter().map(|tapped| tapped.plugin.as_str())
    }
}

/// Callback lists for every hook identifier.
#[derive(Clone)]
pub struct HookRegistry {
    slots: BTreeMap<HookSlotId, HookSlot>,
}

impl HookRegistry {
    /// Create a registry with every slot empty.
    pub fn new() -> Self {
        Self {
            slots: HookSlotId::all()
                .map(|slot| (slot, HookSlot::new(slot.strategy())))
                .collect(),
        }
    }

    /// Build the registry for an app: merge its plugins and register every
    /// wrapped callback.
    pub fn from_hooks(hooks: &ViseHooks) -> HookResult<Self> {
        let merged = merge_plugins(&hooks.all_plugins())?;
        let mut registry = Self::new();
        for MergedCallback {
            slot,
            plugin,
            callback,
            ..
        } in merged
        {
            registry.tap(slot, plugin, callback);
        }
        Ok(registry)
    }

    /// Append a callback to a slot. Callbacks run in the order they were tapped.
    pub fn tap(&mut self, slot: HookSlotId, plugin: impl Into<String>, callback: RawCallback) {
        self.slots
            .entry(slot)
            .or_insert_with(|| HookSlot::new(slot.strategy()))
            .callbacks
            .push(TappedCallback {
                plugin: plugin.into(),
                callback,
            });
    }

    /// Get a slot.
    pub fn slot(&self, slot: HookSlotId) -> Option<&HookSlot> {
        self.slots.get(&slot)
    }

    /// Number of callbacks registered on a slot.
    pub fn callback_count(&self, slot: HookSlotId) -> usize {
        self.slots
            .get(&slot)
            .map_or(0, |slot| slot.callbacks.len())
    }

    /// Invoke the callbacks of a slot with its composition strategy.
    ///
    /// - Parallel-Bail: all callbacks start concurrently; the first defined
    ///   result in registration order wins. Callbacks still running are left
    ///   to finish on their own.
    /// - Series-Waterfall: callbacks run one after the other, each receiving
    ///   the previous output. Always yields a value.
    /// - Parallel-Settle-All: all callbacks run concurrently and are awaited.
    ///   Yields nothing.
    ///
    /// The first callback error, in registration order, is returned.
    pub async fn invoke(&self, slot: HookSlotId, value: HookValue) -> HookResult<Option<HookValue>> {
        let callbacks = self
            .slots
            .get(&slot)
            .map(|slot| slot.callbacks.as_slice())
            .unwrap_or_default();

        match slot.strategy() {
            Strategy::ParallelBail => parallel_bail(slot, callbacks, value).await,
            Strategy::SeriesWaterfall => series_waterfall(slot, callbacks, value).await,
            Strategy::ParallelSettleAll => parallel_settle_all(slot, callbacks, value).await,
        }
    }
}

impl Default for HookRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for (id, slot) in &self.slots {
            map.entry(&id.as_str(), &slot.plugins().collect::<Vec<_>>());
        }
        map.finish()
    }
}

fn spawn_all(
    callbacks: &[TappedCallback],
    value: &HookValue,
) -> Vec<(String, tokio::task::JoinHandle<HookResult<Option<HookValue>>>)> {
    callbacks
        .iter()
        .map(|tapped| {
            let callback = tapped.callback.clone();
            let value = value.clone();
            let handle = tokio::spawn(async move { callback(value).await });
            (tapped.plugin.clone(), handle)
        })
        .collect()
}

async fn parallel_bail(
    slot: HookSlotId,
    callbacks: &[TappedCallback],
    value: HookValue,
) -> HookResult<Option<HookValue>> {
    // dropping a JoinHandle detaches its task
    for (plugin, handle) in spawn_all(callbacks, &value) {
        match handle.await {
            Ok(Ok(Some(output))) => return Ok(Some(output)),
            Ok(Ok(None)) => {}
            Ok(Err(err)) => return Err(callback_failed(slot, &plugin, err)),
            Err(err) => return Err(join_failed(slot, &plugin, err)),
        }
    }
    Ok(None)
}

async fn series_waterfall(
    slot: HookSlotId,
    callbacks: &[TappedCallback],
    value: HookValue,
) -> HookResult<Option<HookValue>> {
    let mut current = value;
    for tapped in callbacks {
        let callback = tapped.callback.clone();
        let input = current.clone();
        let call = AssertUnwindSafe(async move { callback(input).await }).catch_unwind();
        match call.await {
            Ok(Ok(Some(output))) => current = output,
            Ok(Ok(None)) => {}
            Ok(Err(err)) => return Err(callback_failed(slot, &tapped.plugin, err)),
            Err(payload) => return Err(panicked(slot, &tapped.plugin, payload)),
        }
    }
    Ok(Some(current))
}

async fn parallel_settle_all(
    slot: HookSlotId,
    callbacks: &[TappedCallback],
    value: HookValue,
) -> HookResult<Option<HookValue>> {
    let (plugins, handles): (Vec<_>, Vec<_>) = spawn_all(callbacks, &value).into_iter().unzip();
    let outcomes = join_all(handles).await;

    for (plugin, outcome) in plugins.iter().zip(outcomes) {
        match outcome {
            Ok(Ok(_)) => {}
            Ok(Err(err)) => return Err(callback_failed(slot, plugin, err)),
            Err(err) => return Err(join_failed(slot, plugin, err)),
        }
    }
    Ok(None)
}

fn callback_failed(slot: HookSlotId, plugin: &str, err: HookError) -> HookError {
    tracing::warn!(hook = %slot, plugin = %plugin, error = %err, "hook callback failed");
    err
}

fn join_failed(slot: HookSlotId, plugin: &str, err: JoinError) -> HookError {
    match err.try_into_panic() {
        Ok(payload) => panicked(slot, plugin, payload),
        Err(err) => {
            tracing::warn!(hook = %slot, plugin = %plugin, error = %err, "hook callback cancelled");
            HookError::Panicked {
                hook: slot.as_str(),
                plugin: plugin.to_string(),
                message: err.to_string(),
            }
        }
    }
}

fn panicked(slot: HookSlotId, plugin: &str, payload: Box<dyn Any + Send>) -> HookError {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string());

    tracing::warn!(hook = %slot, plugin = %plugin, panic = %message, "hook callback panicked");
    HookError::Panicked {
        hook: slot.as_str(),
        plugin: plugin.to_string(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback::raw_callback;
    use crate::name::HookName;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn content(s: &str) -> HookValue {
        HookValue::CacheContent(s.to_string())
    }

    fn returning(output: Option<&'static str>, delay_ms: u64) -> RawCallback {
        raw_callback(move |_| {
            async move {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                Ok(output.map(content))
            }
            .boxed()
        })
    }

    fn appending(suffix: &'static str) -> RawCallback {
        raw_callback(move |value| {
            async move {
                match value {
                    HookValue::CacheContent(s) => Ok(Some(content(&format!("{}{}", s, suffix)))),
                    other => Ok(Some(other)),
                }
            }
            .boxed()
        })
    }

    const BAIL: HookSlotId = HookSlotId::Public(HookName::Render);
    const WATERFALL: HookSlotId = HookSlotId::Public(HookName::AfterRender);
    const SETTLE: HookSlotId = HookSlotId::Public(HookName::HitCache);

    // === Registry Tests ===

    #[test]
    fn test_new_registry_has_every_slot() {
        let registry = HookRegistry::new();
        for slot in HookSlotId::all() {
            assert_eq!(registry.callback_count(slot), 0);
            assert_eq!(registry.slot(slot).unwrap().strategy(), slot.strategy());
        }
    }

    #[test]
    fn test_from_hooks_registers_app_plugin_first() {
        let hooks = ViseHooks::new("shop")
            .with_hooks(crate::HookSet::new().on_render(|_| async { Ok(None) }))
            .with_plugin(crate::Plugin::new(
                "vise-plugin-a",
                crate::HookSet::new().on_render(|_| async { Ok(None) }),
            ));
        let registry = HookRegistry::from_hooks(&hooks).unwrap();
        let plugins: Vec<_> = registry.slot(BAIL).unwrap().plugins().collect();
        assert_eq!(plugins, vec!["app-shop", "vise-plugin-a"]);
    }

    // === Parallel-Bail Tests ===

    #[tokio::test]
    async fn test_bail_empty_is_undefined() {
        let registry = HookRegistry::new();
        assert_eq!(registry.invoke(BAIL, content("x")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_bail_prefers_registration_order() {
        let mut registry = HookRegistry::new();
        registry.tap(BAIL, "vise-plugin-slow", returning(Some("slow"), 30));
        registry.tap(BAIL, "vise-plugin-fast", returning(Some("fast"), 0));

        let out = registry.invoke(BAIL, content("x")).await.unwrap();
        assert_eq!(out, Some(content("slow")));
    }

    #[tokio::test]
    async fn test_bail_skips_undefined() {
        let mut registry = HookRegistry::new();
        registry.tap(BAIL, "vise-plugin-a", returning(None, 0));
        registry.tap(BAIL, "vise-plugin-b", returning(Some("b"), 5));

        let out = registry.invoke(BAIL, content("x")).await.unwrap();
        assert_eq!(out, Some(content("b")));
    }

    #[tokio::test]
    async fn test_bail_does_not_cancel_later_callbacks() {
        let finished = Arc::new(AtomicUsize::new(0));
        let counter = finished.clone();

        let mut registry = HookRegistry::new();
        registry.tap(BAIL, "vise-plugin-a", returning(Some("a"), 0));
        registry.tap(
            BAIL,
            "vise-plugin-b",
            raw_callback(move |_| {
                let counter = counter.clone();
                async move {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(None)
                }
                .boxed()
            }),
        );

        let out = registry.invoke(BAIL, content("x")).await.unwrap();
        assert_eq!(out, Some(content("a")));

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_bail_propagates_error() {
        let mut registry = HookRegistry::new();
        registry.tap(
            BAIL,
            "vise-plugin-a",
            raw_callback(|_| async { Err(HookError::failed("boom")) }.boxed()),
        );
        registry.tap(BAIL, "vise-plugin-b", returning(Some("b"), 0));

        let err = registry.invoke(BAIL, content("x")).await.unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }

    #[tokio::test]
    async fn test_bail_panic_becomes_error() {
        let mut registry = HookRegistry::new();
        registry.tap(
            BAIL,
            "vise-plugin-a",
            raw_callback(|_| {
                async {
                    let explode = true;
                    if explode {
                        panic!("render exploded");
                    }
                    Ok(None)
                }
                .boxed()
            }),
        );

        let err = registry.invoke(BAIL, content("x")).await.unwrap_err();
        match err {
            HookError::Panicked {
                hook,
                plugin,
                message,
            } => {
                assert_eq!(hook, "render");
                assert_eq!(plugin, "vise-plugin-a");
                assert_eq!(message, "render exploded");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    // === Series-Waterfall Tests ===

    #[tokio::test]
    async fn test_waterfall_pipes_in_order() {
        let mut registry = HookRegistry::new();
        registry.tap(WATERFALL, "vise-plugin-a", appending("-a"));
        registry.tap(WATERFALL, "vise-plugin-b", appending("-b"));

        let out = registry.invoke(WATERFALL, content("x")).await.unwrap();
        assert_eq!(out, Some(content("x-a-b")));
    }

    #[tokio::test]
    async fn test_waterfall_empty_returns_input() {
        let registry = HookRegistry::new();
        let out = registry.invoke(WATERFALL, content("x")).await.unwrap();
        assert_eq!(out, Some(content("x")));
    }

    #[tokio::test]
    async fn test_waterfall_undefined_keeps_previous() {
        let mut registry = HookRegistry::new();
        registry.tap(WATERFALL, "vise-plugin-a", appending("-a"));
        registry.tap(WATERFALL, "vise-plugin-b", returning(None, 0));

        let out = registry.invoke(WATERFALL, content("x")).await.unwrap();
        assert_eq!(out, Some(content("x-a")));
    }

    #[tokio::test]
    async fn test_waterfall_stops_at_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let mut registry = HookRegistry::new();
        registry.tap(
            WATERFALL,
            "vise-plugin-a",
            raw_callback(|_| async { Err(HookError::failed("bad")) }.boxed()),
        );
        registry.tap(
            WATERFALL,
            "vise-plugin-b",
            raw_callback(move |value| {
                counter.fetch_add(1, Ordering::SeqCst);
                async move { Ok(Some(value)) }.boxed()
            }),
        );

        assert!(registry.invoke(WATERFALL, content("x")).await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    // === Parallel-Settle-All Tests ===

    #[tokio::test]
    async fn test_settle_all_awaits_every_callback() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = HookRegistry::new();
        for (name, delay) in [("vise-plugin-a", 20), ("vise-plugin-b", 0)] {
            let counter = calls.clone();
            registry.tap(
                SETTLE,
                name,
                raw_callback(move |_| {
                    let counter = counter.clone();
                    async move {
                        tokio::time::sleep(Duration::from_millis(delay)).await;
                        counter.fetch_add(1, Ordering::SeqCst);
                        Ok(Some(content("ignored")))
                    }
                    .boxed()
                }),
            );
        }

        let out = registry.invoke(SETTLE, content("x")).await.unwrap();
        assert_eq!(out, None);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
