// src/generation/mod.rs
//! Proxy type generation
//!
//! Turns a `ProxyRequest` into a `ProxyTypeDescriptor`:
//!
//! 1. **request**: what to proxy, and the options that shape the result
//! 2. **resolver**: flattens contracts into one member table and picks the
//!    fallback slot for every member
//! 3. **hook** / **metadata**: filtering and metadata replication policy
//! 4. **synthesizer**: builds the vtable through a forwarder backend
//! 5. **cache**: one descriptor per structural key, shared process-wide
//!
//! **naming** and **source** cover type names and optional source output.

pub mod cache;
pub mod hook;
pub mod metadata;
pub mod naming;
pub mod request;
pub mod resolver;
pub mod source;
pub mod synthesizer;

pub use cache::{CacheStats, GenerationCache};
pub use hook::{AllMembersHook, GenerationHook, HookDecision, MemberFilterHook};
pub use metadata::{ArgumentReplicator, MetadataReplicator};
pub use naming::{DefaultNaming, NamingScope, NamingStrategy};
pub use request::{CacheKey, GenerationOptions, MetadataPolicy, ProxyKind, ProxyRequest};
pub use resolver::{ContractResolver, ResolutionTag, ResolvedContract, ResolvedMember, Slot};
pub use source::SourceEmitter;
pub use synthesizer::{ClosureBackend, Forwarder, ForwarderBackend, Synthesizer};
