// src/proxy/generator.rs
//! Proxy generator: entry points for creating proxies
//!
//! Every entry point builds a `ProxyRequest`, fetches or synthesizes the
//! descriptor through the generation cache and binds the instance parts.
//! Synthesis errors surface from the call that triggered synthesis;
//! construction errors (`ConstructorMismatch`, `MixinTypeMismatch`,
//! `TargetTypeMismatch`) surface from `instantiate`.

use crate::generation::cache::GenerationCache;
use crate::generation::request::{GenerationOptions, ProxyRequest};
use crate::generation::resolver::ContractResolver;
use crate::generation::source::SourceEmitter;
use crate::generation::synthesizer::{ClosureBackend, ForwarderBackend, Synthesizer};
use crate::interception::Interceptor;
use crate::model::{Target, TypeInfo, Value};
use crate::proxy::descriptor::{ProxyParts, ProxyTypeDescriptor};
use crate::proxy::instance::Proxy;
use crate::utils::errors::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Creates proxies against an explicit generation cache
pub struct ProxyGenerator {
    cache: Arc<GenerationCache>,
    backend: Arc<dyn ForwarderBackend>,
}

impl ProxyGenerator {
    pub fn new(cache: Arc<GenerationCache>) -> Self {
        Self {
            cache,
            backend: Arc::new(ClosureBackend),
        }
    }

    /// Generator over the process-wide cache
    pub fn with_shared_cache() -> Self {
        Self::new(GenerationCache::shared())
    }

    pub fn with_backend(mut self, backend: impl ForwarderBackend + 'static) -> Self {
        self.backend = Arc::new(backend);
        self
    }

    pub fn cache(&self) -> &Arc<GenerationCache> {
        &self.cache
    }

    /// Cached descriptor for `request`, synthesized on first use
    pub fn generate(&self, request: &ProxyRequest) -> Result<Arc<ProxyTypeDescriptor>> {
        let key = request.cache_key(self.backend.name());
        self.cache.get_or_create(&key, |naming| {
            let resolved = ContractResolver::new(request).resolve()?;
            Synthesizer::new(self.backend.as_ref()).synthesize(request, key.clone(), resolved, naming)
        })
    }

    /// Render the descriptor for `request` as Rust source and persist it
    /// under `dir`, keyed by its structural fingerprint
    pub fn emit_source(&self, request: &ProxyRequest, dir: &Path) -> Result<PathBuf> {
        let descriptor = self.generate(request)?;
        SourceEmitter::new().persist(&descriptor, dir)
    }

    /// Proxy over interfaces; forwards to `target` when one is given
    pub fn create_interface_proxy(
        &self,
        interfaces: &[Arc<TypeInfo>],
        target: Option<Arc<dyn Target>>,
        mixins: &[Arc<dyn Target>],
        options: &GenerationOptions,
        interceptors: &[Arc<dyn Interceptor>],
    ) -> Result<Arc<Proxy>> {
        let mut request = ProxyRequest::for_interfaces(interfaces)
            .with_mixin_types(&mixin_types(mixins))
            .with_options(options.clone());
        if target.is_some() {
            request = request.with_target();
        }

        self.generate(&request)?.instantiate(ProxyParts {
            target,
            constructor_args: Vec::new(),
            mixins: mixins.to_vec(),
            interceptors: interceptors.to_vec(),
            selector: options.selector.clone(),
        })
    }

    /// Subclass proxy; unintercepted members fall back to a base instance
    /// built from `constructor_args`
    pub fn create_class_proxy(
        &self,
        base: &Arc<TypeInfo>,
        interfaces: &[Arc<TypeInfo>],
        constructor_args: &[Value],
        mixins: &[Arc<dyn Target>],
        options: &GenerationOptions,
        interceptors: &[Arc<dyn Interceptor>],
    ) -> Result<Arc<Proxy>> {
        let request = ProxyRequest::for_class(base)
            .with_interfaces(interfaces)
            .with_mixin_types(&mixin_types(mixins))
            .with_options(options.clone());

        self.generate(&request)?.instantiate(ProxyParts {
            target: None,
            constructor_args: constructor_args.to_vec(),
            mixins: mixins.to_vec(),
            interceptors: interceptors.to_vec(),
            selector: options.selector.clone(),
        })
    }

    /// Subclass proxy whose real implementation is `target`
    pub fn create_class_proxy_with_target(
        &self,
        base: &Arc<TypeInfo>,
        target: Arc<dyn Target>,
        mixins: &[Arc<dyn Target>],
        options: &GenerationOptions,
        interceptors: &[Arc<dyn Interceptor>],
    ) -> Result<Arc<Proxy>> {
        let request = ProxyRequest::for_class(base)
            .with_target()
            .with_mixin_types(&mixin_types(mixins))
            .with_options(options.clone());

        self.generate(&request)?.instantiate(ProxyParts {
            target: Some(target),
            constructor_args: Vec::new(),
            mixins: mixins.to_vec(),
            interceptors: interceptors.to_vec(),
            selector: options.selector.clone(),
        })
    }
}

impl Default for ProxyGenerator {
    fn default() -> Self {
        Self::new(Arc::new(GenerationCache::new()))
    }
}

fn mixin_types(mixins: &[Arc<dyn Target>]) -> Vec<Arc<TypeInfo>> {
    mixins.iter().map(|m| Arc::clone(m.type_info())).collect()
}
