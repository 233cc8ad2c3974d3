// src/proxy/proxy_util.rs
//! Proxy introspection helpers

use crate::model::Target;
use crate::proxy::instance::Proxy;
use std::sync::Arc;

/// True if `target` is a proxy instance
pub fn is_proxy(target: &dyn Target) -> bool {
    target.as_any().is::<Proxy>()
}

/// Downcast to a proxy
pub fn as_proxy(target: &dyn Target) -> Option<&Proxy> {
    target.as_any().downcast_ref::<Proxy>()
}

/// Innermost real target behind any number of nested proxies
///
/// Returns `target` itself when it is not a proxy, or when the innermost
/// proxy has no target.
pub fn unproxied(target: &Arc<dyn Target>) -> Arc<dyn Target> {
    let mut current = Arc::clone(target);
    loop {
        let next = as_proxy(current.as_ref()).and_then(|p| p.target().cloned());
        match next {
            Some(inner) => current = inner,
            None => return current,
        }
    }
}
