// src/generation/synthesizer.rs
//! Implementation synthesizer
//!
//! Turns a resolved member table into a `ProxyTypeDescriptor`: a vtable of
//! forwarders, one per member, plus a synthesized type description. A
//! forwarder for an intercepted member builds an `Invocation`, runs the chain
//! from the first interceptor and hands back the return slot. What happens at
//! the end of the chain is decided by the invocation, not by the forwarder.
//!
//! Generic members get a single forwarder per open shape; type arguments are
//! bound per call.

use crate::generation::metadata::replicate_all;
use crate::generation::naming::NamingScope;
use crate::generation::request::{CacheKey, ProxyRequest};
use crate::generation::resolver::{ResolvedContract, Slot};
use crate::interception::Invocation;
use crate::model::{Frame, MemberInfo, TypeInfo, TypeRef, Value};
use crate::observability::SYNTHESES;
use crate::proxy::{GeneratedMember, Proxy, ProxyTypeDescriptor};
use crate::utils::errors::{ProxyError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Entry of the generated vtable
pub type Forwarder =
    Arc<dyn Fn(&Proxy, &GeneratedMember, &[TypeRef], &mut [Value]) -> anyhow::Result<Value> + Send + Sync>;

/// Produces forwarders for synthesized members
pub trait ForwarderBackend: Send + Sync {
    /// Backend name; part of the cache key
    fn name(&self) -> &'static str;

    fn forwarder(&self, member: &MemberInfo, slot: Slot, intercepted: bool) -> Forwarder;
}

/// Forwarders as stored closures
#[derive(Debug, Clone, Copy, Default)]
pub struct ClosureBackend;

impl ForwarderBackend for ClosureBackend {
    fn name(&self) -> &'static str {
        "closure"
    }

    fn forwarder(&self, member: &MemberInfo, _slot: Slot, intercepted: bool) -> Forwarder {
        if !intercepted {
            return forwarder(|proxy, generated, generic_args, args| {
                let target = proxy
                    .slot_target(generated.slot())
                    .ok_or_else(|| ProxyError::NoImplementation {
                        member: generated.member().qualified_name(),
                    })?;
                let mut frame = Frame::new(generated.name(), args, generic_args);
                target.invoke_member(generated.shape(), &mut frame)
            });
        }

        let by_ref: Arc<[usize]> = member.signature().by_ref_slots().into();
        forwarder(move |proxy, generated, generic_args, args| {
            let mut invocation = Invocation::new(proxy, generated, generic_args.to_vec(), args.to_vec());
            let outcome = invocation.proceed();

            // Copy-back runs once, after the outermost proceed, even on failure
            let (mut arguments, return_value) = invocation.into_parts();
            for &i in by_ref.iter() {
                if let (Some(slot), Some(value)) = (args.get_mut(i), arguments.get_mut(i)) {
                    *slot = std::mem::replace(value, Value::Unit);
                }
            }

            outcome?;
            complete(generated, generic_args, return_value)
        })
    }
}

fn forwarder<F>(f: F) -> Forwarder
where
    F: Fn(&Proxy, &GeneratedMember, &[TypeRef], &mut [Value]) -> anyhow::Result<Value> + Send + Sync + 'static,
{
    Arc::new(f)
}

fn complete(generated: &GeneratedMember, generic_args: &[TypeRef], value: Option<Value>) -> anyhow::Result<Value> {
    let returns = generated.member().signature().bound_return(generic_args);
    match value {
        Some(value) if returns.admits(&value) => Ok(value),
        Some(value) => Err(ProxyError::ReturnTypeMismatch {
            member: generated.member().qualified_name(),
            expected: returns.to_string(),
            actual: value.type_ref().to_string(),
        }
        .into()),
        None if returns == TypeRef::Unit => Ok(Value::Unit),
        None => Err(ProxyError::MissingReturnValue {
            member: generated.member().qualified_name(),
        }
        .into()),
    }
}

/// Builds descriptors from resolved contracts
pub struct Synthesizer<'a> {
    backend: &'a dyn ForwarderBackend,
}

impl<'a> Synthesizer<'a> {
    pub fn new(backend: &'a dyn ForwarderBackend) -> Self {
        Self { backend }
    }

    pub fn synthesize(
        &self,
        request: &ProxyRequest,
        key: CacheKey,
        resolved: ResolvedContract,
        naming: &NamingScope,
    ) -> Result<ProxyTypeDescriptor> {
        let options = request.options();
        let hook = options.hook.as_ref();

        let mut replicated = Vec::with_capacity(resolved.members.len());
        for entry in &resolved.members {
            let owner = entry.member.qualified_name();
            replicated.push(replicate_all(&owner, entry.member.metadata(), options, hook)?);
        }
        let type_metadata = match request.base() {
            Some(base) => replicate_all(base.name(), base.metadata(), options, hook)?,
            None => Vec::new(),
        };

        // Names are reserved after every fallible step
        let name = naming.unique_name(&options.naming.proxy_name(request));

        let mut members = Vec::with_capacity(resolved.members.len());
        for (index, (entry, metadata)) in resolved.members.into_iter().zip(replicated).enumerate() {
            let member = Arc::new(entry.member.synthesized(&name, metadata));
            let intercepted = entry.decision.intercepts();
            let forwarder = self.backend.forwarder(&member, entry.slot, intercepted);

            members.push(GeneratedMember {
                index,
                by_ref_slots: member.signature().by_ref_slots(),
                member,
                source: entry.member,
                contract: entry.contract.name().to_string(),
                contracts: entry.contracts,
                tag: entry.tag,
                slot: entry.slot,
                decision: entry.decision,
                forwarder,
            });
        }

        let type_info = TypeInfo::synthesized(
            name.clone(),
            request.base().cloned(),
            resolved.interfaces.clone(),
            members.iter().map(|m| Arc::clone(&m.member)).collect(),
            type_metadata,
        );

        let by_shape: HashMap<_, _> = members
            .iter()
            .map(|m| (m.member.shape().clone(), m.index))
            .collect();

        metrics::counter!(SYNTHESES).increment(1);
        info!(
            "Synthesized {} with {} members ({} intercepted) using the {} backend",
            name,
            members.len(),
            members.iter().filter(|m| m.decision.intercepts()).count(),
            self.backend.name()
        );

        Ok(ProxyTypeDescriptor {
            name,
            key,
            fingerprint: request.fingerprint(),
            kind: request.kind(),
            base: request.base().cloned(),
            interfaces: request.interfaces().to_vec(),
            exposed: resolved.interfaces,
            mixin_types: request.mixin_types().to_vec(),
            members,
            by_shape,
            type_info,
            backend: self.backend.name(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::cache::GenerationCache;
    use crate::generation::request::GenerationOptions;
    use crate::generation::resolver::{ContractResolver, ResolutionTag};
    use crate::model::{MemberBuilder, MetadataArg, MetadataEntry, TypeBuilder};

    fn synthesize(request: &ProxyRequest) -> Result<ProxyTypeDescriptor> {
        let cache: GenerationCache<ProxyTypeDescriptor> = GenerationCache::new();
        synthesize_in(request, cache.naming())
    }

    fn synthesize_in(request: &ProxyRequest, naming: &NamingScope) -> Result<ProxyTypeDescriptor> {
        let resolved = ContractResolver::new(request).resolve()?;
        Synthesizer::new(&ClosureBackend).synthesize(
            request,
            request.cache_key(ClosureBackend.name()),
            resolved,
            naming,
        )
    }

    #[test]
    fn test_descriptor_layout() {
        let store = TypeBuilder::interface("IStore")
            .member(
                MemberBuilder::method("Get")
                    .generic("T")
                    .param("key", TypeRef::Str)
                    .returns(TypeRef::param("T"))
                    .metadata(MetadataEntry::new("Cached").arg(30i64))
                    .metadata(MetadataEntry::new("Seeded").arg(MetadataArg::Computed("now()".into()))),
            )
            .member(MemberBuilder::method("TryGet").param("key", TypeRef::Str).out_param("value", TypeRef::Any))
            .build()
            .unwrap();

        let request = ProxyRequest::for_interfaces(&[store.clone()]).with_target();
        let descriptor = synthesize(&request).unwrap();

        assert_eq!(descriptor.name(), "Proxies.IStoreProxy");
        assert_eq!(descriptor.members().len(), 2);

        let get = &descriptor.members()[0];
        assert_eq!(get.tag(), ResolutionTag::ImplementInterface);
        assert_eq!(get.slot(), Slot::Target);
        assert!(get.is_intercepted());
        assert_eq!(get.member().declaring_type(), "Proxies.IStoreProxy");
        assert_eq!(get.member().metadata().len(), 1);
        assert_eq!(get.source().metadata().len(), 2);

        assert_eq!(descriptor.members()[1].by_ref_slots(), &[1]);
        assert!(descriptor.type_info().is_assignable_to(&store));
        assert!(descriptor.type_info().members_named("Get").next().is_some());
    }

    #[test]
    fn test_strict_metadata_fails_synthesis() {
        let iface = TypeBuilder::interface("IJob")
            .member(
                MemberBuilder::method("Run")
                    .metadata(MetadataEntry::new("Seeded").arg(MetadataArg::Computed("rand()".into()))),
            )
            .build()
            .unwrap();
        let request = ProxyRequest::for_interfaces(&[iface]).with_options(
            GenerationOptions::default()
                .with_metadata_policy(crate::generation::request::MetadataPolicy::Strict),
        );

        assert!(matches!(
            synthesize(&request),
            Err(ProxyError::IrreplicableMetadata { .. })
        ));
    }

    #[test]
    fn test_failed_synthesis_does_not_reserve_name() {
        let iface = TypeBuilder::interface("IJob")
            .member(
                MemberBuilder::method("Run")
                    .metadata(MetadataEntry::new("Seeded").arg(MetadataArg::Computed("rand()".into()))),
            )
            .build()
            .unwrap();
        let cache: GenerationCache<ProxyTypeDescriptor> = GenerationCache::new();

        let strict = ProxyRequest::for_interfaces(&[iface.clone()]).with_options(
            GenerationOptions::default()
                .with_metadata_policy(crate::generation::request::MetadataPolicy::Strict),
        );
        assert!(synthesize_in(&strict, cache.naming()).is_err());

        let lenient = ProxyRequest::for_interfaces(&[iface]);
        let descriptor = synthesize_in(&lenient, cache.naming()).unwrap();
        assert_eq!(descriptor.name(), "Proxies.IJobProxy");
    }
}
