pub mod istio;

use std::{collections::BTreeMap, path::Path};

use async_trait::async_trait;
use kube::Client;
use thiserror::Error;

use crate::common::Conversion;

pub type ProviderFlags = BTreeMap<String, String>;
type ProviderConstructor = fn(&ProviderFlags) -> Box<dyn Provider>;

const PROVIDERS: [(&str, ProviderConstructor); 1] = [(istio::PROVIDER_NAME, istio::IstioProvider::boxed)];

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("kubernetes api error {0}")]
    Kube(#[from] kube::Error),
    #[error("unable to decode manifest {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("unable to read manifest {0}")]
    Io(#[from] std::io::Error),
    #[error("unknown provider {0}")]
    UnknownProvider(String),
}

/// Which namespaces the source objects are read from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NamespaceScope {
    All,
    Namespace(String),
}

impl NamespaceScope {
    pub fn includes(&self, namespace: &str) -> bool {
        match self {
            NamespaceScope::All => true,
            NamespaceScope::Namespace(scope) => scope == namespace,
        }
    }
}

#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn read_resources_from_cluster(&mut self, client: Client, scope: &NamespaceScope) -> Result<(), ProviderError>;

    async fn read_resources_from_file(&mut self, path: &Path, scope: &NamespaceScope) -> Result<(), ProviderError>;

    /// Converts everything read so far. Never fails as a whole: problems are reported in the result.
    fn to_gateway_api(&self) -> Conversion;
}

pub fn supported_providers() -> impl Iterator<Item = &'static str> {
    PROVIDERS.iter().map(|(name, _)| *name)
}

pub fn create_provider(name: &str, flags: &ProviderFlags) -> Result<Box<dyn Provider>, ProviderError> {
    PROVIDERS
        .iter()
        .find(|(provider_name, _)| *provider_name == name)
        .map(|(_, constructor)| constructor(flags))
        .ok_or_else(|| ProviderError::UnknownProvider(name.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    pub fn test_provider_registry() {
        assert_eq!(supported_providers().collect::<Vec<_>>(), vec!["istio"]);
        let provider = create_provider("istio", &ProviderFlags::new()).unwrap();
        assert_eq!(provider.name(), "istio");
        assert!(matches!(create_provider("kong", &ProviderFlags::new()), Err(ProviderError::UnknownProvider(name)) if name == "kong"));
    }

    #[test]
    pub fn test_namespace_scope() {
        assert!(NamespaceScope::All.includes("apps"));
        assert!(NamespaceScope::Namespace("apps".to_owned()).includes("apps"));
        assert!(!NamespaceScope::Namespace("apps".to_owned()).includes("default"));
    }
}
