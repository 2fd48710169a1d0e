use std::{collections::BTreeMap, path::PathBuf};

use serde::Deserialize;
use thiserror::Error;
use typed_builder::TypedBuilder;

use crate::{
    providers::{self, ProviderFlags},
    Result,
};

#[derive(Clone, Debug, Default, TypedBuilder, Deserialize, PartialEq)]
#[serde(default)]
pub struct Configuration {
    #[builder(default)]
    pub providers: Vec<String>,
    #[builder(default, setter(strip_option))]
    pub namespace: Option<String>,
    #[builder(default)]
    pub all_namespaces: bool,
    #[builder(default, setter(strip_option))]
    pub input_file: Option<PathBuf>,
    #[builder(default, setter(strip_option))]
    pub kubeconfig: Option<PathBuf>,
    #[builder(default)]
    pub allow_experimental_gw_api: bool,
    /// Provider name to provider scoped flags, e.g. `istio: {gateway-class-name: istio}`.
    #[builder(default)]
    pub provider_flags: BTreeMap<String, ProviderFlags>,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("at least one provider must be configured, supported providers are {0}")]
    NoProviders(String),
    #[error("unknown provider {0}, supported providers are {1}")]
    UnknownProvider(String, String),
    #[error("namespace and all namespaces can't be used together")]
    ConflictingNamespaces,
}

impl Configuration {
    pub fn validate(&self) -> Result<()> {
        let supported = providers::supported_providers().collect::<Vec<_>>().join(", ");
        if self.providers.is_empty() {
            return Err(ConfigurationError::NoProviders(supported).into());
        }
        if let Some(unknown) = self.providers.iter().find(|provider| !providers::supported_providers().any(|name| name == provider.as_str())) {
            return Err(ConfigurationError::UnknownProvider(unknown.clone(), supported).into());
        }
        if self.namespace.is_some() && self.all_namespaces {
            return Err(ConfigurationError::ConflictingNamespaces.into());
        }
        Ok(())
    }

    pub fn provider_flags(&self, provider: &str) -> ProviderFlags {
        self.provider_flags.get(provider).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn validation_error(configuration: &Configuration) -> Option<ConfigurationError> {
        configuration.validate().err().and_then(|e| e.downcast::<ConfigurationError>().ok()).map(|e| *e)
    }

    #[test]
    pub fn test_configuration_from_yaml() {
        let configuration: Configuration = serde_yaml::from_str(
            r"
providers: [istio]
namespace: apps
input_file: manifests/istio.yaml
provider_flags:
  istio:
    gateway-class-name: custom
",
        )
        .unwrap();

        let expected = Configuration::builder()
            .providers(vec!["istio".to_owned()])
            .namespace("apps".to_owned())
            .input_file(PathBuf::from("manifests/istio.yaml"))
            .provider_flags(BTreeMap::from([("istio".to_owned(), BTreeMap::from([("gateway-class-name".to_owned(), "custom".to_owned())]))]))
            .build();
        assert_eq!(configuration, expected);
        assert!(configuration.validate().is_ok());
        assert_eq!(configuration.provider_flags("istio").get("gateway-class-name").map(String::as_str), Some("custom"));
        assert!(configuration.provider_flags("kong").is_empty());
    }

    #[test]
    pub fn test_configuration_validation() {
        let configuration = Configuration::builder().build();
        assert_eq!(validation_error(&configuration), Some(ConfigurationError::NoProviders("istio".to_owned())));

        let configuration = Configuration::builder().providers(vec!["istio".to_owned(), "kong".to_owned()]).build();
        assert_eq!(validation_error(&configuration), Some(ConfigurationError::UnknownProvider("kong".to_owned(), "istio".to_owned())));

        let configuration = Configuration::builder().providers(vec!["istio".to_owned()]).namespace("apps".to_owned()).all_namespaces(true).build();
        assert_eq!(validation_error(&configuration), Some(ConfigurationError::ConflictingNamespaces));
    }
}
