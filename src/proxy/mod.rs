// src/proxy/mod.rs
//! Proxy creation and instances
//!
//! - **generator**: entry points for interface and class proxies
//! - **descriptor**: the cached, shareable synthesized implementation
//! - **instance**: proxy objects and call dispatch
//! - **mixin**: binding mixin instances to descriptor slots
//! - **proxy_util**: introspection over nested proxies

pub mod descriptor;
pub mod generator;
pub mod instance;
pub mod mixin;
pub mod proxy_util;

pub use descriptor::{GeneratedMember, ProxyParts, ProxyTypeDescriptor};
pub use generator::ProxyGenerator;
pub use instance::Proxy;
pub use mixin::MixinComposer;
