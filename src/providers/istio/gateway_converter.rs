use gateway_api::apis::standard::gateways::{Gateway, GatewaySpec};
use kube::api::ObjectMeta;
use tracing::debug;

use super::{
    crd::{IstioGateway, Server, ServerTlsSettings},
    hosts::{split_server_host, AllowedHosts, ANY_HOST, SAME_NAMESPACE},
};
use crate::common::{ErrorList, FieldError, FieldPath, ListenerConfig, Notifications, ProtocolType, ResourceKey, TlsType};

const SUPPORTED_PROTOCOLS: [&str; 7] = ["HTTP", "HTTPS", "GRPC", "HTTP2", "MONGO", "TCP", "TLS"];
const SUPPORTED_TLS_MODES: [&str; 6] = ["PASSTHROUGH", "SIMPLE", "MUTUAL", "AUTO_PASSTHROUGH", "ISTIO_MUTUAL", "OPTIONAL_MUTUAL"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IstioProtocol {
    Http,
    Https,
    Http2,
    Grpc,
    Tcp,
    Tls,
    Mongo,
}

impl IstioProtocol {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "HTTP" => Self::Http,
            "HTTPS" => Self::Https,
            "HTTP2" => Self::Http2,
            "GRPC" => Self::Grpc,
            "TCP" => Self::Tcp,
            "TLS" => Self::Tls,
            "MONGO" => Self::Mongo,
            _ => return None,
        })
    }

    pub fn protocol_type(self, has_tls: bool) -> ProtocolType {
        match self {
            IstioProtocol::Http => ProtocolType::Http,
            IstioProtocol::Https => ProtocolType::Https,
            IstioProtocol::Tcp | IstioProtocol::Mongo => ProtocolType::Tcp,
            IstioProtocol::Tls => ProtocolType::Tls,
            IstioProtocol::Http2 | IstioProtocol::Grpc if has_tls => ProtocolType::Https,
            IstioProtocol::Http2 | IstioProtocol::Grpc => ProtocolType::Http,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IstioTlsMode {
    Passthrough,
    Simple,
    Mutual,
    AutoPassthrough,
    IstioMutual,
    OptionalMutual,
}

impl IstioTlsMode {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "PASSTHROUGH" => Self::Passthrough,
            "SIMPLE" => Self::Simple,
            "MUTUAL" => Self::Mutual,
            "AUTO_PASSTHROUGH" => Self::AutoPassthrough,
            "ISTIO_MUTUAL" => Self::IstioMutual,
            "OPTIONAL_MUTUAL" => Self::OptionalMutual,
            _ => return None,
        })
    }

    /// `None` for the mesh mTLS modes, which have no Gateway API listener equivalent.
    pub fn tls_type(self) -> Option<TlsType> {
        match self {
            IstioTlsMode::Passthrough | IstioTlsMode::AutoPassthrough => Some(TlsType::Passthrough),
            IstioTlsMode::Simple | IstioTlsMode::Mutual => Some(TlsType::Terminate),
            IstioTlsMode::IstioMutual | IstioTlsMode::OptionalMutual => None,
        }
    }
}

pub fn listener_name(protocol: ProtocolType, namespace: &str, hostname: &str) -> String {
    let namespace = if namespace == SAME_NAMESPACE { "dot" } else { namespace };
    format!("{protocol}-protocol-{namespace}-ns-{hostname}").to_lowercase().replace('*', "wildcard")
}

/// Converts one Istio Gateway. Servers that cannot be converted are skipped, so the result is always a
/// Gateway together with the allowed hosts index of the Servers that made it.
pub fn convert_gateway(
    source: &IstioGateway,
    gateway_class_name: &str,
    notifications: &mut Notifications,
    errors: &mut ErrorList,
) -> (Gateway, AllowedHosts) {
    let key = ResourceKey::from(source);
    let root = FieldPath::new("Gateway").key(&format!("{}/{}", key.namespace, key.name)).child("spec");
    debug!("Converting gateway {key}");

    if !source.spec.selector.is_empty() {
        notifications.info(format!("ignoring field: {}", root.child("selector")), &key);
    }

    let mut allowed_hosts = AllowedHosts::new();
    let mut listeners = vec![];
    for (i, server) in source.spec.servers.iter().enumerate() {
        let path = root.child("servers").index(i);
        let Some(converted) = convert_server(&key, server, &path, notifications, errors) else {
            continue;
        };

        for host in &server.hosts {
            let (namespace, dns_name) = split_server_host(host);
            allowed_hosts.entry(namespace.to_owned()).or_default().insert(dns_name.to_owned());
            let config = ListenerConfig {
                name: listener_name(converted.protocol, namespace, dns_name),
                port: converted.port,
                hostname: (dns_name != ANY_HOST).then(|| dns_name.to_owned()),
                tls_type: converted.tls_type,
            };
            listeners.push(config.into_listener(converted.protocol));
        }
    }

    let gateway = Gateway {
        metadata: ObjectMeta {
            name: Some(key.name.clone()),
            namespace: Some(key.namespace.clone()),
            labels: source.metadata.labels.clone(),
            annotations: source.metadata.annotations.clone(),
            ..Default::default()
        },
        spec: GatewaySpec {
            gateway_class_name: gateway_class_name.to_owned(),
            listeners,
            ..Default::default()
        },
        status: None,
    };
    debug!("Gateway {key} converted with {} listeners", gateway.spec.listeners.len());
    (gateway, allowed_hosts)
}

struct ConvertedServer {
    protocol: ProtocolType,
    port: i32,
    tls_type: Option<TlsType>,
}

fn convert_server(
    key: &ResourceKey,
    server: &Server,
    path: &FieldPath,
    notifications: &mut Notifications,
    errors: &mut ErrorList,
) -> Option<ConvertedServer> {
    let Some(port) = &server.port else {
        errors.push(FieldError::required(path.child("port"), "server port is required"));
        notifications.error(format!("skipping server {path}: port is not set"), key);
        return None;
    };

    if server.bind.is_some() {
        notifications.info(format!("ignoring field: {}", path.child("bind")), key);
    }
    if server.default_endpoint.is_some() {
        notifications.info(format!("ignoring field: {}", path.child("defaultEndpoint")), key);
    }
    if server.name.is_some() {
        notifications.info(format!("ignoring field: {}", path.child("name")), key);
    }
    if port.target_port.is_some() {
        notifications.info(format!("ignoring field: {}", path.child("port").child("targetPort")), key);
    }

    let Ok(port_number) = i32::try_from(port.number) else {
        errors.push(FieldError::invalid(path.child("port").child("number"), port.number.to_string(), "port number is out of range"));
        notifications.error(format!("skipping server {path}: port {} is out of range", port.number), key);
        return None;
    };

    let Some(protocol) = IstioProtocol::from_name(&port.protocol) else {
        errors.push(FieldError::not_supported(path.child("port").child("protocol"), &port.protocol, &SUPPORTED_PROTOCOLS));
        notifications.error(format!("unknown istio server protocol {}", port.protocol), key);
        return None;
    };

    let tls_type = match &server.tls {
        Some(tls) => {
            let tls_path = path.child("tls");
            let mode_name = tls.mode.as_deref().unwrap_or("PASSTHROUGH");
            let Some(mode) = IstioTlsMode::from_name(mode_name) else {
                errors.push(FieldError::not_supported(tls_path.child("mode"), mode_name, &SUPPORTED_TLS_MODES));
                notifications.error(format!("unknown istio server tls mode {mode_name}"), key);
                return None;
            };
            let Some(tls_type) = mode.tls_type() else {
                notifications.warning(format!("skipping server {}: tls mode {mode_name} has no gateway api equivalent", path), key);
                return None;
            };
            notify_ignored_tls_fields(key, tls, &tls_path, notifications);
            Some(tls_type)
        },
        None => None,
    };

    Some(ConvertedServer {
        protocol: protocol.protocol_type(server.tls.is_some()),
        port: port_number,
        tls_type,
    })
}

fn notify_ignored_tls_fields(key: &ResourceKey, tls: &ServerTlsSettings, path: &FieldPath, notifications: &mut Notifications) {
    let ignored = [
        ("httpsRedirect", tls.https_redirect),
        ("serverCertificate", tls.server_certificate.is_some()),
        ("privateKey", tls.private_key.is_some()),
        ("caCertificates", tls.ca_certificates.is_some()),
        ("credentialName", tls.credential_name.is_some()),
        ("subjectAltNames", !tls.subject_alt_names.is_empty()),
        ("verifyCertificateSpki", !tls.verify_certificate_spki.is_empty()),
        ("verifyCertificateHash", !tls.verify_certificate_hash.is_empty()),
        ("minProtocolVersion", tls.min_protocol_version.is_some()),
        ("maxProtocolVersion", tls.max_protocol_version.is_some()),
        ("cipherSuites", !tls.cipher_suites.is_empty()),
    ];
    for (field, _) in ignored.iter().filter(|(_, is_set)| *is_set) {
        notifications.info(format!("ignoring field: {}", path.child(field)), key);
    }
}
