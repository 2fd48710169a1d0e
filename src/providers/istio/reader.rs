use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::{api::ListParams, Api, Client};
use serde::Deserialize;
use serde_yaml::Value;
use tracing::debug;

use super::{
    crd::{IstioGateway, VirtualService, GATEWAY_KIND, ISTIO_GROUP, ISTIO_SUPPORTED_VERSIONS, VIRTUAL_SERVICE_KIND},
    storage::Storage,
};
use crate::{
    common::DEFAULT_NAMESPACE_NAME,
    providers::{NamespaceScope, ProviderError},
};

const LIST_KIND: &str = "List";

/// Decodes every Istio Gateway and VirtualService of a multi-document YAML (or JSON) manifest.
pub fn read_manifest(content: &str, scope: &NamespaceScope) -> Result<Storage, ProviderError> {
    let mut storage = Storage::new();
    for document in serde_yaml::Deserializer::from_str(content) {
        let value = Value::deserialize(document)?;
        read_document(value, scope, &mut storage)?;
    }
    debug!("Read {} gateways and {} virtual services from manifest", storage.gateways_len(), storage.virtual_services_len());
    Ok(storage)
}

fn read_document(value: Value, scope: &NamespaceScope, storage: &mut Storage) -> Result<(), ProviderError> {
    if value.is_null() {
        return Ok(());
    }

    let kind = value.get("kind").and_then(Value::as_str).unwrap_or_default().to_owned();
    let api_version = value.get("apiVersion").and_then(Value::as_str).unwrap_or_default().to_owned();

    if kind == LIST_KIND {
        if let Some(Value::Sequence(items)) = value.get("items") {
            for item in items {
                read_document(item.clone(), scope, storage)?;
            }
        }
        return Ok(());
    }

    let is_istio = api_version.split_once('/').is_some_and(|(group, version)| group == ISTIO_GROUP && ISTIO_SUPPORTED_VERSIONS.contains(&version));
    if !is_istio {
        debug!("Skipping {api_version} {kind}");
        return Ok(());
    }

    match kind.as_str() {
        GATEWAY_KIND => {
            let mut gateway: IstioGateway = serde_yaml::from_value(value)?;
            if in_scope(&mut gateway.metadata, scope) {
                storage.save_gateway(gateway);
            }
        },
        VIRTUAL_SERVICE_KIND => {
            let mut virtual_service: VirtualService = serde_yaml::from_value(value)?;
            if in_scope(&mut virtual_service.metadata, scope) {
                storage.save_virtual_service(virtual_service);
            }
        },
        _ => debug!("Skipping {api_version} {kind}"),
    }
    Ok(())
}

fn in_scope(metadata: &mut ObjectMeta, scope: &NamespaceScope) -> bool {
    let namespace = metadata.namespace.get_or_insert_with(|| DEFAULT_NAMESPACE_NAME.to_owned());
    scope.includes(namespace)
}

pub async fn read_cluster(client: Client, scope: &NamespaceScope) -> Result<Storage, ProviderError> {
    let (gateways, virtual_services): (Api<IstioGateway>, Api<VirtualService>) = match scope {
        NamespaceScope::All => (Api::all(client.clone()), Api::all(client)),
        NamespaceScope::Namespace(namespace) => (Api::namespaced(client.clone(), namespace), Api::namespaced(client, namespace)),
    };

    let list_params = ListParams::default();
    let mut storage = Storage::new();
    for gateway in gateways.list(&list_params).await?.items {
        storage.save_gateway(gateway);
    }
    for virtual_service in virtual_services.list(&list_params).await?.items {
        storage.save_virtual_service(virtual_service);
    }
    debug!("Read {} gateways and {} virtual services from cluster", storage.gateways_len(), storage.virtual_services_len());
    Ok(storage)
}
