//! Scheme-to-endpoint resolution

use crate::endpoint::Endpoint;
use crate::local::LocalEndpoint;
use crate::url::EndpointUrl;
use bulkcp_types::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Registry mapping URL schemes to endpoint implementations
#[derive(Debug, Clone)]
pub struct EndpointResolver {
    endpoints: HashMap<String, Arc<dyn Endpoint>>,
}

impl EndpointResolver {
    /// Create an empty resolver
    pub fn empty() -> Self {
        Self {
            endpoints: HashMap::new(),
        }
    }

    /// Create a resolver with the built-in `file` endpoint registered
    pub fn new() -> Self {
        let mut resolver = Self::empty();
        resolver.register(Arc::new(LocalEndpoint::new()));
        resolver
    }

    /// Register an endpoint under its scheme, replacing any previous one
    pub fn register(&mut self, endpoint: Arc<dyn Endpoint>) {
        debug!(scheme = endpoint.scheme(), "registering endpoint");
        self.endpoints
            .insert(endpoint.scheme().to_string(), endpoint);
    }

    /// Resolve the endpoint serving a URL's scheme
    pub fn resolve(&self, url: &EndpointUrl) -> Result<Arc<dyn Endpoint>> {
        self.endpoints
            .get(url.scheme())
            .cloned()
            .ok_or_else(|| Error::config(format!("no endpoint for scheme '{}'", url.scheme())))
    }
}

impl Default for EndpointResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryEndpoint;

    #[test]
    fn test_default_resolves_file() {
        let resolver = EndpointResolver::new();
        assert!(resolver.resolve(&EndpointUrl::parse("file:///x")).is_ok());
        assert!(resolver.resolve(&EndpointUrl::parse("/bare/path")).is_ok());
        assert!(resolver.resolve(&EndpointUrl::parse("mem://x")).is_err());
    }

    #[test]
    fn test_register_custom_scheme() {
        let mut resolver = EndpointResolver::empty();
        resolver.register(Arc::new(MemoryEndpoint::new()));
        assert!(resolver.resolve(&EndpointUrl::parse("mem://x")).is_ok());
        assert!(resolver.resolve(&EndpointUrl::parse("file:///x")).is_err());
    }
}
