// src/generation/hook.rs
//! Generation hook: per-member interception policy
//!
//! The hook is consulted while a proxy implementation is synthesized, never
//! per call. Its decisions are recorded on the generated descriptor and stay
//! fixed for the descriptor's lifetime.
//!
//! A hook takes part in the cache key through `identity()`. A hook that
//! returns `None` is keyed by instance, so only requests sharing the same
//! `Arc` share an implementation. Hooks that return a name must include every
//! setting that changes their decisions in it.
//!
//! Hooks run while the generation cache holds its synthesis lock. A hook must
//! not call back into `ProxyGenerator::generate` or create proxies: on the
//! same thread such a call fails with `ReentrantSynthesis`, and from another
//! thread it deadlocks.

use crate::model::{FieldInfo, MemberInfo, MetadataEntry, TypeInfo};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Decision for a single member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HookDecision {
    /// Route calls through the interceptor chain
    Intercept,
    /// Pass calls straight to the implementation and log a warning
    Skip,
    /// Pass calls straight to the implementation
    SkipSilently,
    /// Fail the synthesis
    Abort,
}

impl HookDecision {
    pub fn intercepts(&self) -> bool {
        matches!(self, HookDecision::Intercept)
    }
}

/// Pluggable generation policy
pub trait GenerationHook: Send + Sync {
    /// Decide whether an overridable member is intercepted
    fn should_intercept(&self, _ty: &TypeInfo, _member: &MemberInfo) -> HookDecision {
        HookDecision::Intercept
    }

    /// A member that cannot be intercepted (e.g. non-overridable) was found.
    ///
    /// `Intercept` is treated like `SkipSilently`; `Abort` fails synthesis.
    fn non_proxyable_member(&self, _ty: &TypeInfo, _member: &MemberInfo, _reason: &str) -> HookDecision {
        HookDecision::SkipSilently
    }

    /// A public field was found; fields have no accessor to intercept
    fn non_proxyable_field(&self, _ty: &TypeInfo, _field: &FieldInfo) -> HookDecision {
        HookDecision::SkipSilently
    }

    /// Metadata was dropped from a synthesized member
    fn metadata_not_replicated(&self, _owner: &str, _entry: &MetadataEntry, _reason: &str) {}

    /// Called once after all members were inspected
    fn members_inspected(&self) {}

    /// Identity used in the cache key; `None` keys on the instance
    fn identity(&self) -> Option<String> {
        None
    }
}

/// Intercepts every overridable member
#[derive(Debug, Clone, Copy, Default)]
pub struct AllMembersHook;

impl GenerationHook for AllMembersHook {
    fn identity(&self) -> Option<String> {
        Some("AllMembersHook".to_string())
    }
}

/// Intercepts only the named members; everything else passes through
#[derive(Debug, Clone, Default)]
pub struct MemberFilterHook {
    members: BTreeSet<String>,
}

impl MemberFilterHook {
    pub fn new<I, S>(members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            members: members.into_iter().map(Into::into).collect(),
        }
    }
}

impl GenerationHook for MemberFilterHook {
    fn should_intercept(&self, _ty: &TypeInfo, member: &MemberInfo) -> HookDecision {
        if self.members.contains(member.name()) {
            HookDecision::Intercept
        } else {
            HookDecision::SkipSilently
        }
    }

    fn identity(&self) -> Option<String> {
        let names: Vec<&str> = self.members.iter().map(String::as_str).collect();
        Some(format!("MemberFilterHook({})", names.join(",")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MemberBuilder, TypeBuilder, TypeRef};

    #[test]
    fn test_filter_hook_decisions() {
        let iface = TypeBuilder::interface("IRepo")
            .member(MemberBuilder::method("Save").param("v", TypeRef::Any))
            .member(MemberBuilder::method("Load").returns(TypeRef::Any))
            .build()
            .unwrap();

        let hook = MemberFilterHook::new(["Save"]);
        let save = iface.members_named("Save").next().unwrap();
        let load = iface.members_named("Load").next().unwrap();

        assert_eq!(hook.should_intercept(&iface, save), HookDecision::Intercept);
        assert_eq!(hook.should_intercept(&iface, load), HookDecision::SkipSilently);
    }

    #[test]
    fn test_identity() {
        assert_eq!(AllMembersHook.identity().as_deref(), Some("AllMembersHook"));
        assert_ne!(
            MemberFilterHook::new(["A"]).identity(),
            MemberFilterHook::new(["B"]).identity()
        );
        assert_eq!(
            MemberFilterHook::new(["B", "A"]).identity(),
            MemberFilterHook::new(["A", "B"]).identity()
        );
    }
}
