use std::{
    collections::{BTreeMap, BTreeSet},
    net::IpAddr,
};

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;
use tracing::debug;

use crate::common::{ResourceKey, DEFAULT_NAMESPACE_NAME};

pub const ANY_NAMESPACE: &str = "*";
pub const SAME_NAMESPACE: &str = ".";
pub const ANY_HOST: &str = "*";

/// Hostname patterns a Gateway accepts, keyed by the namespace selector of the Server host.
pub type AllowedHosts = BTreeMap<String, BTreeSet<String>>;

lazy_static! {
    static ref ROUTE_HOSTNAME: Regex =
        Regex::new(r"^(\*\.)?[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$").expect("hostname pattern is valid");
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VisibilityError {
    #[error("gateway {gateway} namespace is not in exportTo {export_to:?}")]
    NotExported { gateway: String, export_to: Vec<String> },
    #[error("gateway {0} was not found or produced no listeners")]
    UnknownGateway(String),
    #[error("none of the hosts {hosts:?} are allowed by gateway {gateway}")]
    NoMatchingHost { gateway: String, hosts: Vec<String> },
}

/// Wildcard overlap between two hostnames. `*` alone matches everything.
pub fn hostname_matches(n: &str, o: &str) -> bool {
    match (n.strip_prefix('*'), o.strip_prefix('*')) {
        (Some(n_suffix), Some(o_suffix)) => {
            if n.len() < o.len() {
                o_suffix.ends_with(n_suffix)
            } else {
                n_suffix.ends_with(o_suffix)
            }
        },
        (Some(n_suffix), None) => o.ends_with(n_suffix),
        (None, Some(o_suffix)) => n.ends_with(o_suffix),
        (None, None) => n == o,
    }
}

/// Splits a Server host `namespace/dnsName`. A bare name is visible from every namespace.
pub fn split_server_host(host: &str) -> (&str, &str) {
    match host.split_once('/') {
        Some((namespace, dns_name)) => (namespace, dns_name),
        None => (ANY_NAMESPACE, host),
    }
}

/// Splits a VirtualService gateway reference `namespace/name`. A bare name lives in the route's namespace.
pub fn split_gateway_reference<'a>(reference: &'a str, route_namespace: &'a str) -> (&'a str, &'a str) {
    match reference.split_once('/') {
        Some((namespace, name)) => (namespace, name),
        None => (route_namespace, reference),
    }
}

/// `<service>.<namespace>.svc[...]` resolves to the service and its namespace, anything else is a
/// service name in the fallback namespace.
pub fn parse_k8s_service_from_domain(domain: &str, fallback_namespace: &str) -> (String, String) {
    let mut parts = domain.splitn(3, '.');
    if let (Some(service), Some(namespace), Some(rest)) = (parts.next(), parts.next(), parts.next()) {
        if rest == "svc" || rest.starts_with("svc.") {
            return (service.to_owned(), namespace.to_owned());
        }
    }
    let namespace = if fallback_namespace.is_empty() { DEFAULT_NAMESPACE_NAME } else { fallback_namespace };
    (domain.to_owned(), namespace.to_owned())
}

pub fn is_valid_route_hostname(hostname: &str) -> bool {
    ROUTE_HOSTNAME.is_match(hostname) && hostname.parse::<IpAddr>().is_err()
}

/// Decides which Gateways a VirtualService may attach to.
pub struct GatewayVisibility<'a> {
    route_namespace: &'a str,
    route_hosts: &'a [String],
    export_to: BTreeSet<&'a str>,
}

impl<'a> GatewayVisibility<'a> {
    pub fn new(route_namespace: &'a str, route_hosts: &'a [String], export_to: &'a [String]) -> Self {
        let export_to = if export_to.is_empty() {
            BTreeSet::from([ANY_NAMESPACE])
        } else {
            export_to.iter().map(String::as_str).collect()
        };
        Self { route_namespace, route_hosts, export_to }
    }

    pub fn check(&self, gateway: &ResourceKey, allowed_hosts: Option<&AllowedHosts>) -> Result<(), VisibilityError> {
        if !self.is_exported_to(&gateway.namespace) {
            return Err(VisibilityError::NotExported {
                gateway: gateway.to_string(),
                export_to: self.export_to.iter().map(|s| (*s).to_owned()).collect(),
            });
        }

        let Some(allowed_hosts) = allowed_hosts else {
            return Err(VisibilityError::UnknownGateway(gateway.to_string()));
        };

        let same_namespace = gateway.namespace == self.route_namespace;
        let mut selectors = vec![self.route_namespace];
        if same_namespace {
            selectors.push(SAME_NAMESPACE);
        }
        selectors.push(ANY_NAMESPACE);

        for route_host in self.route_hosts {
            for selector in &selectors {
                if let Some(gateway_host) =
                    allowed_hosts.get(*selector).and_then(|hosts| hosts.iter().find(|gateway_host| hostname_matches(gateway_host, route_host)))
                {
                    debug!("Route host {route_host} matches {selector}/{gateway_host} on {gateway}");
                    return Ok(());
                }
            }
        }

        Err(VisibilityError::NoMatchingHost {
            gateway: gateway.to_string(),
            hosts: self.route_hosts.to_vec(),
        })
    }

    fn is_exported_to(&self, namespace: &str) -> bool {
        self.export_to.contains(namespace)
            || self.export_to.contains(ANY_NAMESPACE)
            || (self.export_to.contains(SAME_NAMESPACE) && namespace == self.route_namespace)
    }
}
