use std::collections::BTreeMap;

use super::crd::{IstioGateway, VirtualService};
use crate::common::ResourceKey;

/// Istio objects gathered for one conversion run, iterated in key order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Storage {
    gateways: BTreeMap<ResourceKey, IstioGateway>,
    virtual_services: BTreeMap<ResourceKey, VirtualService>,
}

impl Storage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save_gateway(&mut self, gateway: IstioGateway) {
        self.gateways.insert(ResourceKey::from(&gateway), gateway);
    }

    pub fn save_virtual_service(&mut self, virtual_service: VirtualService) {
        self.virtual_services.insert(ResourceKey::from(&virtual_service), virtual_service);
    }

    pub fn gateways(&self) -> impl Iterator<Item = (&ResourceKey, &IstioGateway)> {
        self.gateways.iter()
    }

    pub fn virtual_services(&self) -> impl Iterator<Item = (&ResourceKey, &VirtualService)> {
        self.virtual_services.iter()
    }

    pub fn gateways_len(&self) -> usize {
        self.gateways.len()
    }

    pub fn virtual_services_len(&self) -> usize {
        self.virtual_services.len()
    }

    pub fn merge(&mut self, other: Storage) {
        self.gateways.extend(other.gateways);
        self.virtual_services.extend(other.virtual_services);
    }
}
