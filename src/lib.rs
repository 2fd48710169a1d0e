pub mod common;
pub mod configuration;
pub mod printer;
pub mod providers;
pub mod resource_manager;

use common::{Conversion, ErrorList, GatewayResources, Notifications, Severity};
use configuration::Configuration;
use kube::{
    config::{KubeConfigOptions, Kubeconfig},
    Client, Config,
};
use providers::{NamespaceScope, Provider};
use tracing::{debug, info};

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Result<T> = std::result::Result<T, Error>;

/// Diagnostics of one provider.
#[derive(Debug, Default)]
pub struct ProviderReport {
    pub name: String,
    pub notifications: Notifications,
    pub errors: ErrorList,
}

/// Everything converted in one run: the merged objects of every provider and each provider's diagnostics.
#[derive(Debug, Default)]
pub struct Report {
    pub resources: GatewayResources,
    pub providers: Vec<ProviderReport>,
}

impl Report {
    pub fn has_errors(&self) -> bool {
        self.providers.iter().any(|provider| !provider.errors.is_empty())
    }
}

pub async fn convert(configuration: &Configuration) -> Result<Report> {
    configuration.validate()?;
    let mut providers = configuration
        .providers
        .iter()
        .map(|name| providers::create_provider(name, &configuration.provider_flags(name)))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    if let Some(input_file) = &configuration.input_file {
        let scope = file_scope(configuration);
        for provider in &mut providers {
            provider.read_resources_from_file(input_file, &scope).await?;
        }
    } else {
        let (client, default_namespace) = create_client(configuration).await?;
        let scope = cluster_scope(configuration, default_namespace);
        for provider in &mut providers {
            provider.read_resources_from_cluster(client.clone(), &scope).await?;
        }
    }

    let mut report = Report::default();
    for provider in &providers {
        report.providers.push(collect(provider.as_ref(), configuration.allow_experimental_gw_api, &mut report.resources));
    }
    info!("Converted {} objects from {} providers", report.resources.len(), report.providers.len());
    Ok(report)
}

fn collect(provider: &dyn Provider, allow_experimental_gw_api: bool, resources: &mut GatewayResources) -> ProviderReport {
    let Conversion { resources: mut converted, errors, mut notifications } = provider.to_gateway_api();
    if !allow_experimental_gw_api {
        let withheld = converted.withhold_experimental();
        if withheld > 0 {
            notifications.notify(
                Severity::Warning,
                format!("{withheld} objects of experimental gateway api kinds were not printed, use --allow-experimental-gw-api to include them"),
                &[],
            );
        }
    }
    resources.merge(converted);
    ProviderReport { name: provider.name().to_owned(), notifications, errors }
}

/// Manifests carry their own namespaces, so only an explicit namespace narrows a file read.
fn file_scope(configuration: &Configuration) -> NamespaceScope {
    match &configuration.namespace {
        Some(namespace) if !configuration.all_namespaces => NamespaceScope::Namespace(namespace.clone()),
        _ => NamespaceScope::All,
    }
}

fn cluster_scope(configuration: &Configuration, default_namespace: String) -> NamespaceScope {
    if configuration.all_namespaces {
        return NamespaceScope::All;
    }
    NamespaceScope::Namespace(configuration.namespace.clone().unwrap_or(default_namespace))
}

async fn create_client(configuration: &Configuration) -> Result<(Client, String)> {
    let config = match &configuration.kubeconfig {
        Some(path) => {
            debug!("Using kubeconfig {}", path.display());
            let kubeconfig = Kubeconfig::read_from(path)?;
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default()).await?
        },
        None => Config::infer().await?,
    };
    let default_namespace = config.default_namespace.clone();
    Ok((Client::try_from(config)?, default_namespace))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use pretty_assertions::assert_eq;

    use super::*;

    const MANIFEST: &str = r"
apiVersion: networking.istio.io/v1beta1
kind: Gateway
metadata:
  name: gateway
  namespace: apps
spec:
  servers:
  - port:
      number: 443
      name: tls
      protocol: TLS
    tls:
      mode: PASSTHROUGH
    hosts: ['*']
---
apiVersion: networking.istio.io/v1beta1
kind: VirtualService
metadata:
  name: db
  namespace: apps
spec:
  hosts: [db.example.com]
  gateways: [gateway]
  tls:
  - match:
    - sniHosts: [db.example.com]
    route:
    - destination:
        host: db
  http:
  - route:
    - destination:
        host: web
";

    async fn write_manifest(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("ingress2gateway-{name}-{}.yaml", std::process::id()));
        tokio::fs::write(&path, MANIFEST).await.unwrap();
        path
    }

    #[tokio::test]
    pub async fn test_convert_withholds_experimental_kinds() {
        let input_file = write_manifest("standard").await;
        let configuration = Configuration::builder().providers(vec!["istio".to_owned()]).input_file(input_file.clone()).build();
        let report = convert(&configuration).await.unwrap();
        tokio::fs::remove_file(input_file).await.unwrap();

        assert_eq!(report.resources.gateways.len(), 1);
        assert_eq!(report.resources.http_routes.len(), 1);
        assert!(report.resources.tls_routes.is_empty());
        assert!(!report.has_errors());

        let provider = &report.providers[0];
        assert_eq!(provider.name, "istio");
        let warning = provider.notifications.iter().find(|n| n.severity == Severity::Warning).unwrap();
        assert!(warning.message.starts_with("1 objects of experimental gateway api kinds"));
    }

    #[tokio::test]
    pub async fn test_convert_withholds_reference_grants_of_withheld_routes() {
        let input_file = std::env::temp_dir().join(format!("ingress2gateway-tcp-grant-{}.yaml", std::process::id()));
        tokio::fs::write(
            &input_file,
            r"
apiVersion: networking.istio.io/v1beta1
kind: Gateway
metadata:
  name: gw
  namespace: istio-system
spec:
  servers:
  - port:
      number: 9000
      name: tcp
      protocol: TCP
    hosts: ['*']
---
apiVersion: networking.istio.io/v1beta1
kind: VirtualService
metadata:
  name: db
  namespace: apps
spec:
  hosts: ['*']
  gateways: [istio-system/gw]
  tcp:
  - route:
    - destination:
        host: db
        port:
          number: 5432
",
        )
        .await
        .unwrap();

        let configuration = Configuration::builder().providers(vec!["istio".to_owned()]).input_file(input_file.clone()).build();
        let report = convert(&configuration).await.unwrap();
        assert!(report.resources.tcp_routes.is_empty());
        assert!(report.resources.reference_grants.is_empty());

        let configuration = Configuration::builder()
            .providers(vec!["istio".to_owned()])
            .input_file(input_file.clone())
            .allow_experimental_gw_api(true)
            .build();
        let report = convert(&configuration).await.unwrap();
        tokio::fs::remove_file(input_file).await.unwrap();
        assert_eq!(report.resources.tcp_routes.len(), 1);
        let grant = report.resources.reference_grants.values().next().unwrap();
        assert_eq!(grant.spec.from[0].kind, "TCPRoute");
    }

    #[tokio::test]
    pub async fn test_convert_with_experimental_kinds_and_namespace() {
        let input_file = write_manifest("experimental").await;
        let configuration = Configuration::builder()
            .providers(vec!["istio".to_owned()])
            .input_file(input_file.clone())
            .allow_experimental_gw_api(true)
            .build();
        let report = convert(&configuration).await.unwrap();
        assert_eq!(report.resources.tls_routes.len(), 1);
        assert_eq!(report.providers[0].notifications.count(Severity::Warning), 0);

        let configuration = Configuration::builder().providers(vec!["istio".to_owned()]).input_file(input_file.clone()).namespace("other".to_owned()).build();
        let report = convert(&configuration).await.unwrap();
        tokio::fs::remove_file(input_file).await.unwrap();
        assert!(report.resources.is_empty());
    }

    #[tokio::test]
    pub async fn test_convert_rejects_invalid_configuration() {
        let configuration = Configuration::builder().providers(vec!["kong".to_owned()]).build();
        assert!(convert(&configuration).await.is_err());
    }

    #[test]
    pub fn test_namespace_scopes() {
        let configuration = Configuration::builder().providers(vec!["istio".to_owned()]).build();
        assert_eq!(file_scope(&configuration), NamespaceScope::All);
        assert_eq!(cluster_scope(&configuration, "team".to_owned()), NamespaceScope::Namespace("team".to_owned()));

        let configuration = Configuration::builder().providers(vec!["istio".to_owned()]).namespace("apps".to_owned()).build();
        assert_eq!(file_scope(&configuration), NamespaceScope::Namespace("apps".to_owned()));
        assert_eq!(cluster_scope(&configuration, "team".to_owned()), NamespaceScope::Namespace("apps".to_owned()));

        let configuration = Configuration::builder().providers(vec!["istio".to_owned()]).all_namespaces(true).build();
        assert_eq!(cluster_scope(&configuration, "team".to_owned()), NamespaceScope::All);
    }
}
