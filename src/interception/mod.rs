// src/interception/mod.rs
//! Call interception layer
//!
//! Every intercepted call on a proxy becomes an `Invocation` that travels
//! through the proxy's interceptor chain:
//!
//! - **Interceptor**: one step of the chain; proceeds or short-circuits
//! - **Invocation**: the reified call (arguments, return slot, target)
//! - **Selector**: per-member subset of the bound interceptors
//! - **LoggingInterceptor**: records calls and emits tracing events
//!
//! # Architecture
//!
//! ```text
//! Caller
//!     │
//!     └─ Proxy member → Forwarder → Invocation
//!                                      │
//!                                      ├─ interceptor[0].intercept
//!                                      ├─ interceptor[1].intercept
//!                                      └─ target / base / mixin
//! ```

pub mod interceptor;
pub mod invocation;
pub mod logging;

// Re-export commonly used types
pub use interceptor::{interceptor_fn, FnInterceptor, Interceptor, InterceptorSelector};
pub use invocation::{Invocation, InvocationKind};
pub use logging::{CallRecord, LoggingInterceptor};
