//! Plugins and plugin merging.

use std::sync::LazyLock;

use regex::Regex;

use crate::callback::{Enforce, HookSet, RawCallback};
use crate::error::{HookError, HookResult};
use crate::name::HookSlotId;
use crate::wrap::wrap_callback;

/// Plugin names: `vise-plugin-`, `app-` or `vise:` followed by lowercase
/// alphanumerics with internal hyphens.
static LEGAL_PLUGIN_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(vise-plugin-|app-|vise:)[a-z]([a-z0-9-]*[a-z0-9])?$")
        .expect("valid regex")
});

/// Check a plugin name against the legal naming pattern.
pub fn validate_plugin_name(name: &str) -> HookResult<()> {
    if LEGAL_PLUGIN_NAME.is_match(name) {
        Ok(())
    } else {
        Err(HookError::InvalidPluginName(name.to_string()))
    }
}

/// A named bundle of hook callbacks.
#[derive(Debug, Clone)]
pub struct Plugin {
    /// Plugin name; provenance of every result its callbacks produce.
    pub name: String,
    /// Declared callbacks.
    pub hooks: HookSet,
}

impl Plugin {
    /// Create a plugin.
    pub fn new(name: impl Into<String>, hooks: HookSet) -> Self {
        Self {
            name: name.into(),
            hooks,
        }
    }
}

/// Hook configuration of one app: its own hooks plus its plugins.
#[derive(Debug, Clone)]
pub struct ViseHooks {
    /// App name; the app's own hooks form the plugin `app-<app_name>`.
    pub app_name: String,
    /// Hooks declared inline by the app.
    pub hooks: HookSet,
    /// Plugins, in registration order.
    pub plugins: Vec<Plugin>,
}

impl ViseHooks {
    /// Create an empty hook configuration for an app.
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            hooks: HookSet::new(),
            plugins: Vec::new(),
        }
    }

    /// Set the app's own hooks.
    pub fn with_hooks(mut self, hooks: HookSet) -> Self {
        self.hooks = hooks;
        self
    }

    /// Add a plugin.
    pub fn with_plugin(mut self, plugin: Plugin) -> Self {
        self.plugins.push(plugin);
        self
    }

    /// Name of the implicit plugin holding the app's own hooks.
    pub fn app_plugin_name(&self) -> String {
        format!("app-{}", self.app_name)
    }

    /// All plugins, the app's own first.
    pub fn all_plugins(&self) -> Vec<Plugin> {
        let mut plugins = Vec::with_capacity(self.plugins.len() + 1);
        plugins.push(Plugin::new(self.app_plugin_name(), self.hooks.clone()));
        plugins.extend(self.plugins.iter().cloned());
        plugins
    }
}

/// A wrapped callback ready for registration.
#[derive(Clone)]
pub struct MergedCallback {
    /// Slot the callback is dispatched through.
    pub slot: HookSlotId,
    /// Name of the declaring plugin.
    pub plugin: String,
    /// Wrapped callback.
    pub callback: RawCallback,
    enforce: Option<Enforce>,
}

impl std::fmt::Debug for MergedCallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MergedCallback")
            .field("slot", &self.slot)
            .field("plugin", &self.plugin)
            .field("enforce", &self.enforce)
            .finish_non_exhaustive()
    }
}

/// Merge plugins into one ordered callback list.
///
/// Every name is validated before anything is wrapped. Callbacks are wrapped
/// with their hook's adapter, then partitioned by `enforce`: `pre` first,
/// unmarked next, `post` last. Registration order is kept within each group.
pub fn merge_plugins(plugins: &[Plugin]) -> HookResult<Vec<MergedCallback>> {
    for plugin in plugins {
        validate_plugin_name(&plugin.name)?;
    }

    let wrapped: Vec<MergedCallback> = plugins
        .iter()
        .flat_map(|plugin| {
            plugin.hooks.decls().iter().map(move |decl| MergedCallback {
                slot: decl.hook.slot(),
                plugin: plugin.name.clone(),
                callback: wrap_callback(&plugin.name, decl.hook, decl.callback.clone()),
                enforce: decl.enforce,
            })
        })
        .collect();

    let group = |enforce: Option<Enforce>| {
        wrapped
            .iter()
            .filter(move |merged| merged.enforce == enforce)
            .cloned()
    };

    let merged: Vec<MergedCallback> = group(Some(Enforce::Pre))
        .chain(group(None))
        .chain(group(Some(Enforce::Post)))
        .collect();

    tracing::debug!(
        plugins = plugins.len(),
        callbacks = merged.len(),
        "merged vise plugins"
    );

    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::name::{HookName, InnerHookName};

    // === Name Validation Tests ===

    #[test]
    fn test_legal_plugin_names() {
        for name in [
            "vise-plugin-foo",
            "app-my-app",
            "vise:core",
            "vise:page-cache",
            "app-a",
            "app-a1",
        ] {
            assert!(validate_plugin_name(name).is_ok(), "{}", name);
        }
    }

    #[test]
    fn test_illegal_plugin_names() {
        for name in [
            "foo",
            "app-",
            "app-Foo",
            "vise-plugin-foo-",
            "vise:-x",
            "app-1a",
            "vise-plugin-a_b",
            "",
        ] {
            assert!(
                matches!(validate_plugin_name(name), Err(HookError::InvalidPluginName(_))),
                "{}",
                name
            );
        }
    }

    // === Merge Tests ===

    fn noop_render() -> HookSet {
        HookSet::new().on_render(|_| async { Ok(None) })
    }

    #[test]
    fn test_app_plugin_is_prepended() {
        let hooks = ViseHooks::new("shop")
            .with_hooks(noop_render())
            .with_plugin(Plugin::new("vise-plugin-a", noop_render()));

        let merged = merge_plugins(&hooks.all_plugins()).unwrap();
        let owners: Vec<_> = merged.iter().map(|m| m.plugin.as_str()).collect();
        assert_eq!(owners, vec!["app-shop", "vise-plugin-a"]);
    }

    #[test]
    fn test_invalid_name_rejects_whole_merge() {
        let plugins = vec![
            Plugin::new("vise-plugin-ok", noop_render()),
            Plugin::new("BadName", noop_render()),
        ];
        let err = merge_plugins(&plugins).unwrap_err();
        assert_eq!(err.to_string(), "illegal vise plugin name: BadName");
    }

    #[test]
    fn test_invalid_app_name_is_rejected() {
        let hooks = ViseHooks::new("My App").with_hooks(noop_render());
        assert!(merge_plugins(&hooks.all_plugins()).is_err());
    }

    #[test]
    fn test_enforce_partition_is_stable() {
        let plugins = vec![
            Plugin::new(
                "vise-plugin-a",
                HookSet::new()
                    .on_render(|_| async { Ok(None) })
                    .enforce(Enforce::Post)
                    .on_render(|_| async { Ok(None) }),
            ),
            Plugin::new(
                "vise-plugin-b",
                HookSet::new()
                    .on_render(|_| async { Ok(None) })
                    .enforce(Enforce::Pre)
                    .on_render(|_| async { Ok(None) })
                    .on_render(|_| async { Ok(None) })
                    .enforce(Enforce::Pre),
            ),
        ];

        let merged = merge_plugins(&plugins).unwrap();
        let order: Vec<_> = merged
            .iter()
            .map(|m| (m.plugin.as_str(), m.enforce))
            .collect();
        assert_eq!(
            order,
            vec![
                ("vise-plugin-b", Some(Enforce::Pre)),
                ("vise-plugin-b", Some(Enforce::Pre)),
                ("vise-plugin-a", None),
                ("vise-plugin-b", None),
                ("vise-plugin-a", Some(Enforce::Post)),
            ]
        );
    }

    #[test]
    fn test_shape_changing_hooks_use_inner_slots() {
        let plugins = vec![Plugin::new(
            "vise-plugin-a",
            HookSet::new()
                .on_receive_request(|_| async { Ok(None) })
                .on_find_cache(|_| async { Ok(None) })
                .on_render(|_| async { Ok(None) }),
        )];

        let slots: Vec<_> = merge_plugins(&plugins)
            .unwrap()
            .into_iter()
            .map(|m| m.slot)
            .collect();
        assert_eq!(
            slots,
            vec![
                HookSlotId::Inner(InnerHookName::ReceiveRequestInner),
                HookSlotId::Inner(InnerHookName::FindCacheInner),
                HookSlotId::Public(HookName::Render),
            ]
        );
    }
}
