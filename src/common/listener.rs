use std::fmt::Display;

use gateway_api::apis::standard::gateways::{GatewayListeners, GatewayListenersTls, GatewayListenersTlsMode};

/// Gateway API listener protocols produced by the converters.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Hash, Eq)]
pub enum ProtocolType {
    Http,
    Https,
    Tcp,
    Tls,
    Udp,
}

impl Display for ProtocolType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut e = format! {"{self:?}"};
        e.make_ascii_uppercase();
        write!(f, "{e}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsType {
    Terminate,
    Passthrough,
}

impl From<TlsType> for GatewayListenersTlsMode {
    fn from(value: TlsType) -> Self {
        match value {
            TlsType::Terminate => GatewayListenersTlsMode::Terminate,
            TlsType::Passthrough => GatewayListenersTlsMode::Passthrough,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct ListenerConfig {
    pub name: String,
    pub port: i32,
    pub hostname: Option<String>,
    pub tls_type: Option<TlsType>,
}

impl ListenerConfig {
    pub fn into_listener(self, protocol: ProtocolType) -> GatewayListeners {
        GatewayListeners {
            name: self.name,
            port: self.port,
            hostname: self.hostname,
            protocol: protocol.to_string(),
            tls: self.tls_type.map(|tls_type| GatewayListenersTls {
                mode: Some(tls_type.into()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}
