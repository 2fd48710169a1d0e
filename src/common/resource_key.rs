use std::fmt::Display;

use gateway_api::{
    apis::experimental::{
        tcproutes::{TCPRoute, TCPRouteParentRefs},
        tlsroutes::{TLSRoute, TLSRouteParentRefs},
    },
    apis::standard::{
        gateways::Gateway,
        httproutes::{HTTPRoute, HTTPRouteParentRefs},
        referencegrants::ReferenceGrant,
    },
};
use kube::{Resource, ResourceExt};

use crate::providers::istio::crd::{IstioGateway, VirtualService, ISTIO_GROUP};

pub const DEFAULT_GROUP_NAME: &str = "gateway.networking.k8s.io";
pub const DEFAULT_NAMESPACE_NAME: &str = "default";
pub const DEFAULT_KIND_NAME: &str = "Gateway";

#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ResourceKey {
    pub group: String,
    pub namespace: String,
    pub name: String,
    pub kind: String,
}

impl ResourceKey {
    pub fn namespaced(name: &str, namespace: &str) -> Self {
        Self {
            name: name.to_owned(),
            namespace: namespace.to_owned(),
            ..Default::default()
        }
    }

    pub fn with_kind(group: &str, kind: &str, name: &str, namespace: &str) -> Self {
        Self {
            group: group.to_owned(),
            namespace: namespace.to_owned(),
            name: name.to_owned(),
            kind: kind.to_owned(),
        }
    }

    fn from_resource<K: Resource<DynamicType = ()>>(group: &str, resource: &K) -> Self {
        let namespace = resource.meta().namespace.clone().unwrap_or(DEFAULT_NAMESPACE_NAME.to_owned());
        Self {
            group: group.to_owned(),
            namespace,
            name: resource.name_any(),
            kind: K::kind(&()).into_owned(),
        }
    }
}

impl Default for ResourceKey {
    fn default() -> Self {
        Self {
            group: DEFAULT_GROUP_NAME.to_owned(),
            namespace: DEFAULT_NAMESPACE_NAME.to_owned(),
            name: String::default(),
            kind: DEFAULT_KIND_NAME.to_owned(),
        }
    }
}

impl Display for ResourceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.kind, self.namespace, self.name)
    }
}

impl From<&IstioGateway> for ResourceKey {
    fn from(value: &IstioGateway) -> Self {
        Self::from_resource(ISTIO_GROUP, value)
    }
}

impl From<&VirtualService> for ResourceKey {
    fn from(value: &VirtualService) -> Self {
        Self::from_resource(ISTIO_GROUP, value)
    }
}

impl From<&Gateway> for ResourceKey {
    fn from(value: &Gateway) -> Self {
        Self::from_resource(DEFAULT_GROUP_NAME, value)
    }
}

impl From<&HTTPRoute> for ResourceKey {
    fn from(value: &HTTPRoute) -> Self {
        Self::from_resource(DEFAULT_GROUP_NAME, value)
    }
}

impl From<&TLSRoute> for ResourceKey {
    fn from(value: &TLSRoute) -> Self {
        Self::from_resource(DEFAULT_GROUP_NAME, value)
    }
}

impl From<&TCPRoute> for ResourceKey {
    fn from(value: &TCPRoute) -> Self {
        Self::from_resource(DEFAULT_GROUP_NAME, value)
    }
}

impl From<&ReferenceGrant> for ResourceKey {
    fn from(value: &ReferenceGrant) -> Self {
        Self::from_resource(DEFAULT_GROUP_NAME, value)
    }
}

/// A parent Gateway accepted for a route. Turned into the route kind's own parent reference type,
/// which carries the namespace only when it differs from the route's.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Default)]
pub struct RouteRefKey {
    pub resource_key: ResourceKey,
    pub section_name: Option<String>,
    pub port: Option<i32>,
}

impl RouteRefKey {
    pub fn namespaced(name: &str, namespace: &str) -> Self {
        Self {
            resource_key: ResourceKey::namespaced(name, namespace),
            ..Default::default()
        }
    }
}

/// A parent Gateway seen from a route in the given namespace.
#[derive(Clone, Copy, Debug)]
pub struct ParentRef<'a>(pub &'a RouteRefKey, pub &'a str);

macro_rules! parent_ref_from_route_ref_key {
    ($($parent_ref:ty),+) => {
        $(
            impl From<ParentRef<'_>> for $parent_ref {
                fn from(ParentRef(route_ref, route_namespace): ParentRef<'_>) -> Self {
                    let key = &route_ref.resource_key;
                    Self {
                        group: Some(key.group.clone()),
                        kind: Some(key.kind.clone()),
                        name: key.name.clone(),
                        namespace: (key.namespace != route_namespace).then(|| key.namespace.clone()),
                        port: route_ref.port,
                        section_name: route_ref.section_name.clone(),
                    }
                }
            }
        )+
    };
}

parent_ref_from_route_ref_key!(HTTPRouteParentRefs, TLSRouteParentRefs, TCPRouteParentRefs);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    pub fn test_parent_ref_namespace_only_when_different() {
        let route_ref = RouteRefKey::namespaced("gw", "istio-system");
        let same: HTTPRouteParentRefs = ParentRef(&route_ref, "istio-system").into();
        assert_eq!(same.namespace, None);
        assert_eq!(same.group.as_deref(), Some(DEFAULT_GROUP_NAME));
        assert_eq!(same.kind.as_deref(), Some(DEFAULT_KIND_NAME));

        let other: TLSRouteParentRefs = ParentRef(&route_ref, "apps").into();
        assert_eq!(other.namespace.as_deref(), Some("istio-system"));
        assert_eq!(other.name, "gw");

        let tcp: TCPRouteParentRefs = ParentRef(&route_ref, "apps").into();
        assert_eq!(tcp.namespace.as_deref(), Some("istio-system"));
        assert_eq!(tcp.section_name, None);
    }

    #[test]
    pub fn test_resource_key_from_istio_objects() {
        let vs: VirtualService = serde_yaml::from_str(
            r"
apiVersion: networking.istio.io/v1beta1
kind: VirtualService
metadata:
  name: reviews
spec:
  hosts: [reviews.example.com]
",
        )
        .unwrap();
        let key = ResourceKey::from(&vs);
        assert_eq!(key, ResourceKey::with_kind(ISTIO_GROUP, "VirtualService", "reviews", DEFAULT_NAMESPACE_NAME));
        assert_eq!(key.to_string(), "VirtualService/default/reviews");
    }
}
