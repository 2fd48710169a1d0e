mod converter;
pub mod crd;
mod gateway_converter;
mod hosts;
mod reader;
mod route_converter;
mod storage;

use std::path::Path;

use async_trait::async_trait;
pub use converter::Converter;
use kube::Client;
pub use reader::read_manifest;
pub use storage::Storage;
use tracing::info;
use typed_builder::TypedBuilder;

use super::{NamespaceScope, Provider, ProviderError, ProviderFlags};
use crate::common::Conversion;

pub const PROVIDER_NAME: &str = "istio";
pub const GATEWAY_CLASS_NAME_FLAG: &str = "gateway-class-name";
pub const DEFAULT_GATEWAY_CLASS_NAME: &str = "istio";

#[derive(Debug, TypedBuilder)]
pub struct IstioProvider {
    #[builder(default = DEFAULT_GATEWAY_CLASS_NAME.to_owned())]
    gateway_class_name: String,
    #[builder(default)]
    storage: Storage,
}

impl IstioProvider {
    pub fn boxed(flags: &ProviderFlags) -> Box<dyn Provider> {
        let gateway_class_name = flags.get(GATEWAY_CLASS_NAME_FLAG).cloned().unwrap_or(DEFAULT_GATEWAY_CLASS_NAME.to_owned());
        Box::new(Self::builder().gateway_class_name(gateway_class_name).build())
    }
}

#[async_trait]
impl Provider for IstioProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn read_resources_from_cluster(&mut self, client: Client, scope: &NamespaceScope) -> Result<(), ProviderError> {
        info!("Reading istio resources from cluster {scope:?}");
        let storage = reader::read_cluster(client, scope).await?;
        self.storage.merge(storage);
        Ok(())
    }

    async fn read_resources_from_file(&mut self, path: &Path, scope: &NamespaceScope) -> Result<(), ProviderError> {
        info!("Reading istio resources from {}", path.display());
        let content = tokio::fs::read_to_string(path).await?;
        let storage = read_manifest(&content, scope)?;
        self.storage.merge(storage);
        Ok(())
    }

    fn to_gateway_api(&self) -> Conversion {
        Converter::new(&self.gateway_class_name).convert(&self.storage)
    }
}
