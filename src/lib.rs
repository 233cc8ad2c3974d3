// src/lib.rs
//! Dynamic proxy engine
//!
//! Synthesizes implementations of interface and class contracts at run
//! time. Every call on a proxy is reified as an `Invocation` and passed
//! through an ordered chain of interceptors before (optionally) reaching a
//! real implementation: a target, the base class, or a mixin.
//!
//! # Architecture
//!
//! - **model**: contract descriptions, dynamic values and call targets
//! - **generation**: contract resolution, vtable synthesis and the
//!   generation cache
//! - **interception**: invocations, interceptors and selectors
//! - **proxy**: the generator entry points and proxy instances
//! - **observability**: tracing setup and metric names
//! - **utils**: configuration and errors
//!
//! # Example
//!
//! ```
//! use dynaproxy::interception::{interceptor_fn, Invocation};
//! use dynaproxy::model::{MemberBuilder, Target, TypeBuilder, TypeRef, Value};
//! use dynaproxy::{GenerationOptions, ProxyGenerator};
//!
//! let clock = TypeBuilder::interface("IClock")
//!     .member(MemberBuilder::method("Now").returns(TypeRef::Int))
//!     .build()?;
//!
//! let fixed = interceptor_fn(|invocation: &mut Invocation<'_>| {
//!     invocation.set_return_value(1_700_000_000i64);
//!     Ok(())
//! });
//!
//! let proxy = ProxyGenerator::default().create_interface_proxy(
//!     &[clock],
//!     None,
//!     &[],
//!     &GenerationOptions::default(),
//!     &[fixed],
//! )?;
//! assert_eq!(proxy.call("Now", &mut [])?, Value::Int(1_700_000_000));
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod generation;
pub mod interception;
pub mod model;
pub mod observability;
pub mod proxy;
pub mod utils;

// Re-export commonly used types
pub use generation::{GenerationCache, GenerationOptions, MetadataPolicy, ProxyRequest};
pub use interception::{Interceptor, InterceptorSelector, Invocation};
pub use proxy::{Proxy, ProxyGenerator, ProxyTypeDescriptor};
pub use utils::config::EngineConfig;
pub use utils::errors::{ProxyError, Result};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
