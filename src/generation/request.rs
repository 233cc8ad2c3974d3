// src/generation/request.rs
//! Proxy requests, generation options and cache keys

use crate::generation::hook::{AllMembersHook, GenerationHook};
use crate::generation::metadata::{ArgumentReplicator, MetadataReplicator};
use crate::generation::naming::{DefaultNaming, NamingStrategy};
use crate::interception::InterceptorSelector;
use crate::model::{TypeId, TypeInfo};
use crate::utils::config::GenerationConfig;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Which flavour of proxy is requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProxyKind {
    /// Interfaces only; calls have no default implementation
    Interface,
    /// Interfaces forwarding to a separate target
    InterfaceWithTarget,
    /// Subclass of a base type; falls back to the base implementation
    Class,
    /// Subclass of a base type forwarding to a separate target
    ClassWithTarget,
}

impl ProxyKind {
    pub fn has_target(&self) -> bool {
        matches!(self, ProxyKind::InterfaceWithTarget | ProxyKind::ClassWithTarget)
    }

    pub fn is_class(&self) -> bool {
        matches!(self, ProxyKind::Class | ProxyKind::ClassWithTarget)
    }
}

/// How failed metadata replication is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataPolicy {
    /// Any irreplicable entry fails synthesis
    Strict,
    /// Irreplicable entries are dropped and reported
    #[default]
    BestEffort,
    /// Only mandatory entries are replicated
    Skip,
}

/// Options that shape a generated implementation
#[derive(Clone)]
pub struct GenerationOptions {
    pub hook: Arc<dyn GenerationHook>,
    pub naming: Arc<dyn NamingStrategy>,
    pub metadata_policy: MetadataPolicy,
    /// Metadata names never replicated
    pub metadata_to_avoid: BTreeSet<String>,
    pub replicator: Arc<dyn MetadataReplicator>,
    /// Per-instance interceptor selection; not part of the cache key
    pub selector: Option<Arc<dyn InterceptorSelector>>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            hook: Arc::new(AllMembersHook),
            naming: Arc::new(DefaultNaming::default()),
            metadata_policy: MetadataPolicy::default(),
            metadata_to_avoid: BTreeSet::new(),
            replicator: Arc::new(ArgumentReplicator),
            selector: None,
        }
    }
}

impl GenerationOptions {
    /// Options seeded from the `generation` config section
    pub fn from_config(config: &GenerationConfig) -> Self {
        Self {
            naming: Arc::new(DefaultNaming::new(config.naming_prefix.clone())),
            metadata_policy: config.metadata_policy,
            metadata_to_avoid: config.metadata_to_avoid.iter().cloned().collect(),
            ..Self::default()
        }
    }

    pub fn with_hook(mut self, hook: impl GenerationHook + 'static) -> Self {
        self.hook = Arc::new(hook);
        self
    }

    pub fn with_naming(mut self, naming: impl NamingStrategy + 'static) -> Self {
        self.naming = Arc::new(naming);
        self
    }

    pub fn with_metadata_policy(mut self, policy: MetadataPolicy) -> Self {
        self.metadata_policy = policy;
        self
    }

    pub fn avoid_metadata(mut self, name: impl Into<String>) -> Self {
        self.metadata_to_avoid.insert(name.into());
        self
    }

    pub fn with_replicator(mut self, replicator: impl MetadataReplicator + 'static) -> Self {
        self.replicator = Arc::new(replicator);
        self
    }

    pub fn with_selector(mut self, selector: impl InterceptorSelector + 'static) -> Self {
        self.selector = Some(Arc::new(selector));
        self
    }

    fn key(&self) -> OptionsKey {
        OptionsKey {
            hook: ComponentKey::of(&self.hook, self.hook.identity()),
            naming: ComponentKey::of(&self.naming, self.naming.identity()),
            replicator: ComponentKey::of(&self.replicator, self.replicator.identity()),
            metadata_policy: self.metadata_policy,
            metadata_to_avoid: self.metadata_to_avoid.iter().cloned().collect(),
        }
    }
}

impl fmt::Debug for GenerationOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationOptions")
            .field("hook", &self.hook.identity())
            .field("naming", &self.naming.identity())
            .field("metadata_policy", &self.metadata_policy)
            .field("metadata_to_avoid", &self.metadata_to_avoid)
            .field("selector", &self.selector.is_some())
            .finish()
    }
}

/// Structural description of the implementation to synthesize
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    kind: ProxyKind,
    base: Option<Arc<TypeInfo>>,
    interfaces: Vec<Arc<TypeInfo>>,
    mixin_types: Vec<Arc<TypeInfo>>,
    options: GenerationOptions,
}

impl ProxyRequest {
    /// Pure interface proxy
    pub fn for_interfaces(interfaces: &[Arc<TypeInfo>]) -> Self {
        Self {
            kind: ProxyKind::Interface,
            base: None,
            interfaces: dedup(interfaces),
            mixin_types: Vec::new(),
            options: GenerationOptions::default(),
        }
    }

    /// Class proxy over `base`
    pub fn for_class(base: &Arc<TypeInfo>) -> Self {
        Self {
            kind: ProxyKind::Class,
            base: Some(Arc::clone(base)),
            interfaces: Vec::new(),
            mixin_types: Vec::new(),
            options: GenerationOptions::default(),
        }
    }

    /// Forward to a separate target instead of the default fallback
    pub fn with_target(mut self) -> Self {
        self.kind = match self.kind {
            ProxyKind::Interface | ProxyKind::InterfaceWithTarget => ProxyKind::InterfaceWithTarget,
            ProxyKind::Class | ProxyKind::ClassWithTarget => ProxyKind::ClassWithTarget,
        };
        self
    }

    /// Additional interfaces (class proxies)
    pub fn with_interfaces(mut self, interfaces: &[Arc<TypeInfo>]) -> Self {
        let mut all = self.interfaces;
        all.extend(interfaces.iter().cloned());
        self.interfaces = dedup(&all);
        self
    }

    pub fn with_mixin_types(mut self, mixin_types: &[Arc<TypeInfo>]) -> Self {
        self.mixin_types = mixin_types.to_vec();
        self
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn kind(&self) -> ProxyKind {
        self.kind
    }

    pub fn base(&self) -> Option<&Arc<TypeInfo>> {
        self.base.as_ref()
    }

    /// Requested interfaces in request order
    pub fn interfaces(&self) -> &[Arc<TypeInfo>] {
        &self.interfaces
    }

    pub fn mixin_types(&self) -> &[Arc<TypeInfo>] {
        &self.mixin_types
    }

    pub fn options(&self) -> &GenerationOptions {
        &self.options
    }

    /// Name of the primary contract (base type, else first interface)
    pub fn primary_name(&self) -> &str {
        self.base
            .as_ref()
            .or_else(|| self.interfaces.first())
            .map(|t| t.name())
            .unwrap_or("Object")
    }

    /// Structural identity for cache lookups
    pub fn cache_key(&self, backend: &str) -> CacheKey {
        let mut interfaces: Vec<TypeId> = self.interfaces.iter().map(|i| i.id()).collect();
        interfaces.sort();

        CacheKey {
            kind: self.kind,
            base: self.base.as_ref().map(|b| b.id()),
            interfaces,
            mixins: self.mixin_types.iter().map(|m| m.id()).collect(),
            backend: backend.to_string(),
            options: self.options.key(),
        }
    }

    /// SHA-256 over the request's names, hex encoded
    ///
    /// Stable across process runs as long as every option component declares
    /// an identity; instance-keyed components make it process-local.
    pub fn fingerprint(&self) -> String {
        let mut interfaces: Vec<&str> = self.interfaces.iter().map(|i| i.name()).collect();
        interfaces.sort_unstable();
        let mixins: Vec<&str> = self.mixin_types.iter().map(|m| m.name()).collect();
        let options = self.options.key();

        let canonical = format!(
            "{:?}|{}|{}|{}|{}|{}|{}|{:?}|{}",
            self.kind,
            self.base.as_ref().map(|b| b.name()).unwrap_or(""),
            interfaces.join(","),
            mixins.join(","),
            options.hook,
            options.naming,
            options.replicator,
            options.metadata_policy,
            options.metadata_to_avoid.join(",")
        );
        hex::encode(Sha256::digest(canonical.as_bytes()))
    }
}

fn dedup(interfaces: &[Arc<TypeInfo>]) -> Vec<Arc<TypeInfo>> {
    let mut seen = HashSet::new();
    interfaces
        .iter()
        .filter(|i| seen.insert(i.id()))
        .cloned()
        .collect()
}

/// Cache identity of a pluggable option component
///
/// Components without a declared identity are keyed by instance. The key
/// holds the `Arc` so the address cannot be reused while the entry lives.
enum ComponentKey<T: ?Sized> {
    Named(String),
    Instance(Arc<T>),
}

impl<T: ?Sized> ComponentKey<T> {
    fn of(component: &Arc<T>, identity: Option<String>) -> Self {
        match identity {
            Some(name) => ComponentKey::Named(name),
            None => ComponentKey::Instance(Arc::clone(component)),
        }
    }

    fn address(instance: &Arc<T>) -> usize {
        Arc::as_ptr(instance) as *const () as usize
    }
}

impl<T: ?Sized> Clone for ComponentKey<T> {
    fn clone(&self) -> Self {
        match self {
            ComponentKey::Named(name) => ComponentKey::Named(name.clone()),
            ComponentKey::Instance(instance) => ComponentKey::Instance(Arc::clone(instance)),
        }
    }
}

impl<T: ?Sized> PartialEq for ComponentKey<T> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ComponentKey::Named(a), ComponentKey::Named(b)) => a == b,
            (ComponentKey::Instance(a), ComponentKey::Instance(b)) => {
                Self::address(a) == Self::address(b)
            }
            _ => false,
        }
    }
}

impl<T: ?Sized> Eq for ComponentKey<T> {}

impl<T: ?Sized> Hash for ComponentKey<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            ComponentKey::Named(name) => {
                0u8.hash(state);
                name.hash(state);
            }
            ComponentKey::Instance(instance) => {
                1u8.hash(state);
                Self::address(instance).hash(state);
            }
        }
    }
}

impl<T: ?Sized> fmt::Display for ComponentKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentKey::Named(name) => write!(f, "{}", name),
            ComponentKey::Instance(instance) => write!(f, "instance@{:#x}", Self::address(instance)),
        }
    }
}

impl<T: ?Sized> fmt::Debug for ComponentKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Identity-significant option values
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct OptionsKey {
    hook: ComponentKey<dyn GenerationHook>,
    naming: ComponentKey<dyn NamingStrategy>,
    replicator: ComponentKey<dyn MetadataReplicator>,
    metadata_policy: MetadataPolicy,
    metadata_to_avoid: Vec<String>,
}

/// Structural identity of a proxy request
///
/// Interface order does not matter; mixin order does, since members delegate
/// to mixin slots by index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    kind: ProxyKind,
    base: Option<TypeId>,
    interfaces: Vec<TypeId>,
    mixins: Vec<TypeId>,
    backend: String,
    options: OptionsKey,
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids = |ids: &[TypeId]| {
            ids.iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(",")
        };
        write!(f, "{:?}(", self.kind)?;
        if let Some(base) = &self.base {
            write!(f, "base={}; ", base)?;
        }
        write!(
            f,
            "interfaces=[{}]; mixins=[{}]; hook={})",
            ids(&self.interfaces),
            ids(&self.mixins),
            self.options.hook
        )
    }
}
