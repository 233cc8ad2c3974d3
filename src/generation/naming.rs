// src/generation/naming.rs
//! Names for synthesized implementations

use crate::generation::request::ProxyRequest;
use dashmap::DashMap;

/// Chooses the name of a synthesized implementation
///
/// Runs under the generation cache's synthesis lock; must not generate proxies.
pub trait NamingStrategy: Send + Sync {
    fn proxy_name(&self, request: &ProxyRequest) -> String;

    /// Identity used in the cache key; `None` keys on the instance
    fn identity(&self) -> Option<String> {
        None
    }
}

/// `<prefix>.<Primary>Proxy`
#[derive(Debug, Clone)]
pub struct DefaultNaming {
    prefix: String,
}

impl DefaultNaming {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Default for DefaultNaming {
    fn default() -> Self {
        Self::new("Proxies")
    }
}

impl NamingStrategy for DefaultNaming {
    fn proxy_name(&self, request: &ProxyRequest) -> String {
        let primary = request.primary_name();
        if self.prefix.is_empty() {
            format!("{}Proxy", primary)
        } else {
            format!("{}.{}Proxy", self.prefix, primary)
        }
    }

    fn identity(&self) -> Option<String> {
        Some(format!("DefaultNaming({})", self.prefix))
    }
}

/// Hands out unique names within one generation cache
#[derive(Debug, Default)]
pub struct NamingScope {
    used: DashMap<String, usize>,
}

impl NamingScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// `name` on first use, then `name_1`, `name_2`, ...
    pub fn unique_name(&self, name: &str) -> String {
        let mut count = self.used.entry(name.to_string()).or_insert(0);
        let suffix = *count;
        *count += 1;

        if suffix == 0 {
            name.to_string()
        } else {
            format!("{}_{}", name, suffix)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TypeBuilder;

    #[test]
    fn test_default_naming() {
        let iface = TypeBuilder::interface("IStore").build().unwrap();
        let request = ProxyRequest::for_interfaces(&[iface]);

        assert_eq!(DefaultNaming::default().proxy_name(&request), "Proxies.IStoreProxy");
        assert_eq!(DefaultNaming::new("").proxy_name(&request), "IStoreProxy");
    }

    #[test]
    fn test_unique_names() {
        let scope = NamingScope::new();
        assert_eq!(scope.unique_name("Proxies.AProxy"), "Proxies.AProxy");
        assert_eq!(scope.unique_name("Proxies.AProxy"), "Proxies.AProxy_1");
        assert_eq!(scope.unique_name("Proxies.AProxy"), "Proxies.AProxy_2");
        assert_eq!(scope.unique_name("Proxies.BProxy"), "Proxies.BProxy");
    }
}
