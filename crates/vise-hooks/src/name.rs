//! Hook identifiers.
//!
//! Plugin authors see the nine public `HookName`s. Two of them change their
//! return shape once wrapped (`receiveRequest` and `findCache`), so the
//! lifecycle dispatches those through internal slots. `HOOK_TO_INNER` is the
//! only link between the two namespaces.

use std::fmt;
use std::str::FromStr;

use crate::error::HookError;

/// Composition strategy of a hook slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Run all callbacks concurrently; the first defined result in
    /// registration order wins.
    ParallelBail,
    /// Run callbacks in order, piping each output into the next.
    SeriesWaterfall,
    /// Run all callbacks concurrently for their side effects.
    ParallelSettleAll,
}

/// Public hook names, as declared by plugins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HookName {
    ReceiveRequest,
    RequestResolved,
    BeforeUseCache,
    FindCache,
    HitCache,
    BeforeRender,
    Render,
    AfterRender,
    BeforeResponse,
}

/// All public hooks, in lifecycle order.
pub const ALL_HOOKS: [HookName; 9] = [
    HookName::ReceiveRequest,
    HookName::RequestResolved,
    HookName::BeforeUseCache,
    HookName::FindCache,
    HookName::HitCache,
    HookName::BeforeRender,
    HookName::Render,
    HookName::AfterRender,
    HookName::BeforeResponse,
];

/// Internal hook names for wrapped callbacks whose return shape differs
/// from the plugin-facing contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InnerHookName {
    ReceiveRequestInner,
    FindCacheInner,
}

/// Public hooks dispatched through an internal slot.
pub const HOOK_TO_INNER: [(HookName, InnerHookName); 2] = [
    (HookName::ReceiveRequest, InnerHookName::ReceiveRequestInner),
    (HookName::FindCache, InnerHookName::FindCacheInner),
];

impl HookName {
    /// Name as written by plugin authors.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReceiveRequest => "receiveRequest",
            Self::RequestResolved => "requestResolved",
            Self::BeforeUseCache => "beforeUseCache",
            Self::FindCache => "findCache",
            Self::HitCache => "hitCache",
            Self::BeforeRender => "beforeRender",
            Self::Render => "render",
            Self::AfterRender => "afterRender",
            Self::BeforeResponse => "beforeResponse",
        }
    }

    /// Composition strategy bound to this hook.
    pub fn strategy(&self) -> Strategy {
        match self {
            Self::ReceiveRequest
            | Self::BeforeUseCache
            | Self::FindCache
            | Self::Render
            | Self::BeforeResponse => Strategy::ParallelBail,
            Self::RequestResolved | Self::BeforeRender | Self::AfterRender => {
                Strategy::SeriesWaterfall
            }
            Self::HitCache => Strategy::ParallelSettleAll,
        }
    }

    /// Whether every invocation is traced, regardless of its output.
    pub fn always_logs(&self) -> bool {
        matches!(self, Self::Render | Self::HitCache)
    }

    /// Slot the lifecycle dispatches this hook through.
    pub fn slot(&self) -> HookSlotId {
        HOOK_TO_INNER
            .iter()
            .find(|(public, _)| public == self)
            .map(|(_, inner)| HookSlotId::Inner(*inner))
            .unwrap_or(HookSlotId::Public(*self))
    }
}

impl fmt::Display for HookName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HookName {
    type Err = HookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_HOOKS
            .iter()
            .find(|hook| hook.as_str() == s)
            .copied()
            .ok_or_else(|| HookError::UnknownHook(s.to_string()))
    }
}

impl InnerHookName {
    /// Internal slot name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReceiveRequestInner => "receiveRequestInner",
            Self::FindCacheInner => "findCacheInner",
        }
    }

    /// Public hook this slot serves.
    pub fn public(&self) -> HookName {
        match self {
            Self::ReceiveRequestInner => HookName::ReceiveRequest,
            Self::FindCacheInner => HookName::FindCache,
        }
    }
}

/// A registry slot: either a public hook or an internal one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HookSlotId {
    Public(HookName),
    Inner(InnerHookName),
}

impl HookSlotId {
    /// Every slot held by a registry.
    pub fn all() -> impl Iterator<Item = HookSlotId> {
        ALL_HOOKS
            .into_iter()
            .map(HookSlotId::Public)
            .chain(HOOK_TO_INNER.into_iter().map(|(_, inner)| HookSlotId::Inner(inner)))
    }

    /// Public hook served by this slot.
    pub fn hook(&self) -> HookName {
        match self {
            Self::Public(hook) => *hook,
            Self::Inner(inner) => inner.public(),
        }
    }

    /// Composition strategy of this slot.
    pub fn strategy(&self) -> Strategy {
        self.hook().strategy()
    }

    /// Slot name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public(hook) => hook.as_str(),
            Self::Inner(inner) => inner.as_str(),
        }
    }
}

impl fmt::Display for HookSlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
