use std::collections::BTreeMap;

use gateway_api::apis::standard::referencegrants::{ReferenceGrant, ReferenceGrantFrom, ReferenceGrantSpec, ReferenceGrantTo};
use tracing::{debug, info};

use super::{
    crd::{VirtualService, GATEWAY_KIND, ISTIO_GROUP},
    gateway_converter::convert_gateway,
    hosts::{split_gateway_reference, AllowedHosts, GatewayVisibility},
    route_converter::RouteConverter,
    storage::Storage,
};
use crate::common::{
    Conversion, ErrorList, GatewayResources, Notifications, ParentRef, ResourceKey, RouteRefKey, DEFAULT_GROUP_NAME, DEFAULT_KIND_NAME, HTTP_ROUTE_KIND,
    TCP_ROUTE_KIND, TLS_ROUTE_KIND,
};

/// Istio's implicit gateway for sidecars. It has no Gateway API counterpart.
pub const MESH_GATEWAY: &str = "mesh";
const REFERENCE_GRANT_KIND: &str = "ReferenceGrant";

/// One conversion run. The allowed hosts index lives here and is dropped with the converter.
pub struct Converter {
    gateway_class_name: String,
    gw_allowed_hosts: BTreeMap<ResourceKey, AllowedHosts>,
    resources: GatewayResources,
    notifications: Notifications,
    errors: ErrorList,
}

impl Converter {
    pub fn new(gateway_class_name: &str) -> Self {
        Self {
            gateway_class_name: gateway_class_name.to_owned(),
            gw_allowed_hosts: BTreeMap::new(),
            resources: GatewayResources::default(),
            notifications: Notifications::new(),
            errors: ErrorList::new(),
        }
    }

    pub fn convert(mut self, storage: &Storage) -> Conversion {
        for (key, source) in storage.gateways() {
            let (gateway, allowed_hosts) = convert_gateway(source, &self.gateway_class_name, &mut self.notifications, &mut self.errors);
            self.gw_allowed_hosts.insert(key.clone(), allowed_hosts);
            self.resources.gateways.insert(ResourceKey::from(&gateway), gateway);
        }

        for (key, virtual_service) in storage.virtual_services() {
            self.convert_virtual_service(key, virtual_service);
        }

        info!(
            "Converted {} gateways and {} virtual services into {} objects with {} errors",
            storage.gateways_len(),
            storage.virtual_services_len(),
            self.resources.len(),
            self.errors.len()
        );
        Conversion {
            resources: self.resources,
            errors: self.errors,
            notifications: self.notifications,
        }
    }

    fn convert_virtual_service(&mut self, key: &ResourceKey, virtual_service: &VirtualService) {
        debug!("Converting virtual service {key}");
        let (mut http_routes, mut tls_routes, mut tcp_routes) = {
            let mut route_converter = RouteConverter::new(key, virtual_service, &mut self.notifications, &mut self.errors);
            (route_converter.convert_http_routes(), route_converter.convert_tls_routes(), route_converter.convert_tcp_routes())
        };

        let parents = self.accepted_parents(key, virtual_service);
        let namespace = key.namespace.as_str();
        if !parents.is_empty() {
            for route in &mut http_routes {
                route.spec.parent_refs = Some(parents.iter().map(|parent| ParentRef(parent, namespace).into()).collect());
            }
            for route in &mut tls_routes {
                route.spec.parent_refs = Some(parents.iter().map(|parent| ParentRef(parent, namespace).into()).collect());
            }
            for route in &mut tcp_routes {
                route.spec.parent_refs = Some(parents.iter().map(|parent| ParentRef(parent, namespace).into()).collect());
            }
        }

        let mut route_kinds = vec![];
        if !http_routes.is_empty() {
            route_kinds.push(HTTP_ROUTE_KIND);
        }
        if !tls_routes.is_empty() {
            route_kinds.push(TLS_ROUTE_KIND);
        }
        if !tcp_routes.is_empty() {
            route_kinds.push(TCP_ROUTE_KIND);
        }
        self.generate_reference_grants(namespace, &parents, &route_kinds);

        self.resources.http_routes.extend(http_routes.into_iter().map(|route| (ResourceKey::from(&route), route)));
        self.resources.tls_routes.extend(tls_routes.into_iter().map(|route| (ResourceKey::from(&route), route)));
        self.resources.tcp_routes.extend(tcp_routes.into_iter().map(|route| (ResourceKey::from(&route), route)));
    }

    /// Gateways the virtual service declares and is allowed to attach to, in declaration order.
    fn accepted_parents(&mut self, key: &ResourceKey, virtual_service: &VirtualService) -> Vec<RouteRefKey> {
        let visibility = GatewayVisibility::new(&key.namespace, &virtual_service.spec.hosts, &virtual_service.spec.export_to);
        let mut parents = vec![];
        for reference in &virtual_service.spec.gateways {
            if reference == MESH_GATEWAY {
                self.notifications.info(format!("ignoring gateway {MESH_GATEWAY}: sidecar routing has no gateway api equivalent"), key);
                continue;
            }

            let (namespace, name) = split_gateway_reference(reference, &key.namespace);
            let gateway_key = ResourceKey::with_kind(ISTIO_GROUP, GATEWAY_KIND, name, namespace);
            match visibility.check(&gateway_key, self.gw_allowed_hosts.get(&gateway_key)) {
                Ok(()) => {
                    let parent = RouteRefKey::namespaced(name, namespace);
                    if !parents.contains(&parent) {
                        parents.push(parent);
                    }
                },
                Err(e) => self.notifications.warning(format!("not attaching to gateway {reference}: {e}"), key),
            }
        }
        parents
    }

    /// One ReferenceGrant per route namespace and gateway namespace pair, shared by every virtual service
    /// of the route namespace.
    fn generate_reference_grants(&mut self, route_namespace: &str, parents: &[RouteRefKey], route_kinds: &[&str]) {
        if route_kinds.is_empty() {
            return;
        }

        for parent in parents.iter().filter(|parent| parent.resource_key.namespace != route_namespace) {
            let gateway_namespace = &parent.resource_key.namespace;
            let name = format!("generated-reference-grant-from-{route_namespace}-to-{gateway_namespace}");
            let grant_key = ResourceKey::with_kind(DEFAULT_GROUP_NAME, REFERENCE_GRANT_KIND, &name, gateway_namespace);
            let grant = self.resources.reference_grants.entry(grant_key).or_insert_with(|| {
                let mut grant = ReferenceGrant::new(&name, ReferenceGrantSpec { from: vec![], to: vec![] });
                grant.metadata.namespace = Some(gateway_namespace.clone());
                grant
            });

            for kind in route_kinds {
                let from = ReferenceGrantFrom {
                    group: DEFAULT_GROUP_NAME.to_owned(),
                    kind: (*kind).to_owned(),
                    namespace: route_namespace.to_owned(),
                };
                if !grant.spec.from.contains(&from) {
                    grant.spec.from.push(from);
                }
            }

            let to = ReferenceGrantTo {
                group: DEFAULT_GROUP_NAME.to_owned(),
                kind: DEFAULT_KIND_NAME.to_owned(),
                name: Some(parent.resource_key.name.clone()),
            };
            if !grant.spec.to.contains(&to) {
                grant.spec.to.push(to);
            }
        }
    }
}
