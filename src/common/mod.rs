mod backend_tls_policy;
mod field_errors;
mod listener;
mod notifications;
mod resource_key;

use std::collections::{BTreeMap, BTreeSet};

pub use backend_tls_policy::{
    BackendTLSPolicy, BackendTLSPolicySpec, BackendTLSPolicyTargetRefs, BackendTLSPolicyValidation, BackendTLSPolicyValidationCaCertificateRefs,
    BackendTLSPolicyValidationSubjectAltNames,
};
pub use field_errors::{ErrorList, FieldError, FieldPath};
use gateway_api::apis::{
    experimental::{grpcroutes::GRPCRoute, tcproutes::TCPRoute, tlsroutes::TLSRoute, udproutes::UDPRoute},
    standard::{gateways::Gateway, httproutes::HTTPRoute, referencegrants::ReferenceGrant},
};
pub use listener::{ListenerConfig, ProtocolType, TlsType};
pub use notifications::{Notification, Notifications, Severity};
pub use resource_key::{ParentRef, ResourceKey, RouteRefKey, DEFAULT_GROUP_NAME, DEFAULT_KIND_NAME, DEFAULT_NAMESPACE_NAME};

pub const HTTP_ROUTE_KIND: &str = "HTTPRoute";
pub const TLS_ROUTE_KIND: &str = "TLSRoute";
pub const TCP_ROUTE_KIND: &str = "TCPRoute";
const EXPERIMENTAL_ROUTE_KINDS: [&str; 4] = [TLS_ROUTE_KIND, TCP_ROUTE_KIND, "UDPRoute", "GRPCRoute"];

/// Converted Gateway API objects, one map per kind. Every map always exists, possibly empty.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GatewayResources {
    pub gateways: BTreeMap<ResourceKey, Gateway>,
    pub http_routes: BTreeMap<ResourceKey, HTTPRoute>,
    pub grpc_routes: BTreeMap<ResourceKey, GRPCRoute>,
    pub tls_routes: BTreeMap<ResourceKey, TLSRoute>,
    pub tcp_routes: BTreeMap<ResourceKey, TCPRoute>,
    pub udp_routes: BTreeMap<ResourceKey, UDPRoute>,
    pub backend_tls_policies: BTreeMap<ResourceKey, BackendTLSPolicy>,
    pub reference_grants: BTreeMap<ResourceKey, ReferenceGrant>,
}

impl GatewayResources {
    pub fn merge(&mut self, other: GatewayResources) {
        self.gateways.extend(other.gateways);
        self.http_routes.extend(other.http_routes);
        self.grpc_routes.extend(other.grpc_routes);
        self.tls_routes.extend(other.tls_routes);
        self.tcp_routes.extend(other.tcp_routes);
        self.udp_routes.extend(other.udp_routes);
        self.backend_tls_policies.extend(other.backend_tls_policies);
        self.reference_grants.extend(other.reference_grants);
    }

    /// Number of objects that only exist in the experimental channel.
    pub fn experimental_len(&self) -> usize {
        self.grpc_routes.len() + self.tls_routes.len() + self.tcp_routes.len() + self.udp_routes.len() + self.backend_tls_policies.len()
    }

    /// Removes the experimental channel kinds and returns how many objects were dropped.
    ///
    /// ReferenceGrants keep only the standard route kinds and the Gateways a remaining HTTPRoute attaches
    /// to. A grant left with nothing to allow is removed too.
    pub fn withhold_experimental(&mut self) -> usize {
        let withheld = self.experimental_len();
        self.grpc_routes.clear();
        self.tls_routes.clear();
        self.tcp_routes.clear();
        self.udp_routes.clear();
        self.backend_tls_policies.clear();

        let http_routes = &self.http_routes;
        self.reference_grants.retain(|key, grant| {
            grant.spec.from.retain(|from| !EXPERIMENTAL_ROUTE_KINDS.contains(&from.kind.as_str()));
            let from_namespaces: BTreeSet<&str> = grant.spec.from.iter().map(|from| from.namespace.as_str()).collect();
            let attached: BTreeSet<&str> = http_routes
                .iter()
                .filter(|(route_key, _)| from_namespaces.contains(route_key.namespace.as_str()))
                .flat_map(|(route_key, route)| {
                    route.spec.parent_refs.iter().flatten().filter_map(move |parent| {
                        let namespace = parent.namespace.as_deref().unwrap_or(&route_key.namespace);
                        (namespace == key.namespace).then_some(parent.name.as_str())
                    })
                })
                .collect();
            grant.spec.to.retain(|to| to.name.as_deref().is_some_and(|name| attached.contains(name)));
            !grant.spec.from.is_empty() && !grant.spec.to.is_empty()
        });
        withheld
    }

    pub fn len(&self) -> usize {
        self.gateways.len() + self.http_routes.len() + self.reference_grants.len() + self.experimental_len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// What a provider hands back from one conversion run.
#[derive(Debug, Default)]
pub struct Conversion {
    pub resources: GatewayResources,
    pub errors: ErrorList,
    pub notifications: Notifications,
}
