use std::{collections::BTreeSet, str::FromStr};

use gateway_api::apis::{
    experimental::{
        tcproutes::{TCPRoute, TCPRouteRules, TCPRouteRulesBackendRefs, TCPRouteSpec},
        tlsroutes::{TLSRoute, TLSRouteRules, TLSRouteRulesBackendRefs, TLSRouteSpec},
    },
    standard::httproutes::{
        HTTPRoute, HTTPRouteRules, HTTPRouteRulesBackendRefs, HTTPRouteRulesFilters, HTTPRouteRulesFiltersRequestHeaderModifier,
        HTTPRouteRulesFiltersRequestHeaderModifierAdd, HTTPRouteRulesFiltersRequestHeaderModifierSet, HTTPRouteRulesFiltersRequestMirror,
        HTTPRouteRulesFiltersRequestMirrorBackendRef, HTTPRouteRulesFiltersRequestRedirect, HTTPRouteRulesFiltersRequestRedirectPath,
        HTTPRouteRulesFiltersRequestRedirectPathType, HTTPRouteRulesFiltersRequestRedirectScheme, HTTPRouteRulesFiltersResponseHeaderModifier,
        HTTPRouteRulesFiltersResponseHeaderModifierAdd, HTTPRouteRulesFiltersResponseHeaderModifierSet, HTTPRouteRulesFiltersType,
        HTTPRouteRulesFiltersUrlRewrite, HTTPRouteRulesFiltersUrlRewritePath, HTTPRouteRulesFiltersUrlRewritePathType, HTTPRouteRulesMatches,
        HTTPRouteRulesMatchesHeaders, HTTPRouteRulesMatchesHeadersType, HTTPRouteRulesMatchesMethod, HTTPRouteRulesMatchesPath,
        HTTPRouteRulesMatchesPathType, HTTPRouteRulesMatchesQueryParams, HTTPRouteRulesMatchesQueryParamsType, HTTPRouteRulesTimeouts, HTTPRouteSpec,
    },
};
use gateway_api::duration::Duration as GatewayDuration;
use kube::api::ObjectMeta;
use tracing::debug;

use super::{
    crd::{Destination, HeaderOperations, Headers, HttpMatchRequest, HttpRedirect, HttpRewrite, HttpRoute, StringMatch, StringMatchKind, VirtualService},
    hosts::{is_valid_route_hostname, parse_k8s_service_from_domain},
};
use crate::common::{ErrorList, FieldError, FieldPath, Notifications, ResourceKey};

const DEFAULT_REDIRECT_CODE: i64 = 301;
const PREFIX_MATCH_SUFFIX: &str = "prefix-match";
const SUPPORTED_METHODS: [&str; 9] = ["GET", "HEAD", "POST", "PUT", "DELETE", "CONNECT", "OPTIONS", "TRACE", "PATCH"];
const SUPPORTED_SCHEMES: [&str; 2] = ["http", "https"];

/// A backend resolved from an Istio destination host.
#[derive(Clone, Debug, PartialEq, Eq)]
struct Backend {
    name: String,
    namespace: String,
    port: Option<i32>,
}

/// Converts the `http`, `tls` and `tcp` rules of one VirtualService. Parent references are attached by
/// the caller once gateway visibility is known.
pub struct RouteConverter<'a> {
    key: &'a ResourceKey,
    virtual_service: &'a VirtualService,
    root: FieldPath,
    notifications: &'a mut Notifications,
    errors: &'a mut ErrorList,
}

impl<'a> RouteConverter<'a> {
    pub fn new(key: &'a ResourceKey, virtual_service: &'a VirtualService, notifications: &'a mut Notifications, errors: &'a mut ErrorList) -> Self {
        let root = FieldPath::new("VirtualService").key(&format!("{}/{}", key.namespace, key.name)).child("spec");
        Self { key, virtual_service, root, notifications, errors }
    }

    pub fn convert_http_routes(&mut self) -> Vec<HTTPRoute> {
        let hostnames = self.route_hostnames();
        let mut routes = vec![];
        let virtual_service = self.virtual_service;
        for (index, rule) in virtual_service.spec.http.iter().enumerate() {
            let name = self.rule_name(index, rule.name.as_deref());
            for (name, rule) in self.convert_http_rule(index, rule, name) {
                routes.push(HTTPRoute {
                    metadata: self.object_meta(name),
                    spec: HTTPRouteSpec {
                        hostnames: (!hostnames.is_empty()).then(|| hostnames.clone()),
                        parent_refs: None,
                        rules: Some(vec![rule]),
                    },
                    status: None,
                });
            }
        }
        debug!("VirtualService {} produced {} HTTPRoutes", self.key, routes.len());
        routes
    }

    pub fn convert_tls_routes(&mut self) -> Vec<TLSRoute> {
        let mut routes = vec![];
        let virtual_service = self.virtual_service;
        for (index, rule) in virtual_service.spec.tls.iter().enumerate() {
            let path = self.root.child("tls").index(index);
            let mut hostnames = BTreeSet::new();
            for (match_index, tls_match) in rule.matches.iter().enumerate() {
                let match_path = path.child("match").index(match_index);
                hostnames.extend(tls_match.sni_hosts.iter().cloned());
                self.notify_ignored(&match_path, "destinationSubnets", !tls_match.destination_subnets.is_empty());
                self.notify_ignored(&match_path, "port", tls_match.port.is_some());
                self.notify_ignored(&match_path, "sourceLabels", !tls_match.source_labels.is_empty());
                self.notify_ignored(&match_path, "gateways", !tls_match.gateways.is_empty());
                self.notify_ignored(&match_path, "sourceNamespace", tls_match.source_namespace.is_some());
            }

            let backend_refs = rule
                .route
                .iter()
                .enumerate()
                .map(|(i, destination)| {
                    let backend = self.backend(&destination.destination, &path.child("route").index(i).child("destination"));
                    TLSRouteRulesBackendRefs {
                        name: backend.name,
                        namespace: Some(backend.namespace),
                        port: backend.port,
                        // weight is a proto3 int32, 0 is the same as unset
                        weight: destination.weight.filter(|weight| *weight != 0),
                        ..Default::default()
                    }
                })
                .collect::<Vec<_>>();

            routes.push(TLSRoute {
                metadata: self.object_meta(self.rule_name(index, None)),
                spec: TLSRouteSpec {
                    hostnames: (!hostnames.is_empty()).then(|| hostnames.into_iter().collect()),
                    parent_refs: None,
                    rules: vec![TLSRouteRules { backend_refs: Some(backend_refs), name: None }],
                },
                status: None,
            });
        }
        routes
    }

    pub fn convert_tcp_routes(&mut self) -> Vec<TCPRoute> {
        let mut routes = vec![];
        let virtual_service = self.virtual_service;
        for (index, rule) in virtual_service.spec.tcp.iter().enumerate() {
            let path = self.root.child("tcp").index(index);
            for (match_index, tcp_match) in rule.matches.iter().enumerate() {
                let match_path = path.child("match").index(match_index);
                self.notify_ignored(&match_path, "destinationSubnets", !tcp_match.destination_subnets.is_empty());
                self.notify_ignored(&match_path, "port", tcp_match.port.is_some());
                self.notify_ignored(&match_path, "sourceLabels", !tcp_match.source_labels.is_empty());
                self.notify_ignored(&match_path, "gateways", !tcp_match.gateways.is_empty());
                self.notify_ignored(&match_path, "sourceNamespace", tcp_match.source_namespace.is_some());
            }

            let backend_refs = rule
                .route
                .iter()
                .enumerate()
                .map(|(i, destination)| {
                    let backend = self.backend(&destination.destination, &path.child("route").index(i).child("destination"));
                    TCPRouteRulesBackendRefs {
                        name: backend.name,
                        namespace: Some(backend.namespace),
                        port: backend.port,
                        weight: destination.weight.filter(|weight| *weight != 0),
                        ..Default::default()
                    }
                })
                .collect::<Vec<_>>();

            routes.push(TCPRoute {
                metadata: self.object_meta(self.rule_name(index, None)),
                spec: TCPRouteSpec {
                    parent_refs: None,
                    rules: vec![TCPRouteRules { backend_refs: Some(backend_refs), name: None }],
                },
                status: None,
            });
        }
        routes
    }

    fn route_hostnames(&mut self) -> Vec<String> {
        let mut hostnames = vec![];
        let virtual_service = self.virtual_service;
        for (i, host) in virtual_service.spec.hosts.iter().enumerate() {
            if is_valid_route_hostname(host) {
                hostnames.push(host.clone());
            } else {
                let path = self.root.child("hosts").index(i);
                self.notifications.warning(format!("ignoring {path}: {host:?} is not a valid HTTPRoute hostname"), self.key);
            }
        }
        hostnames
    }

    fn rule_name(&self, index: usize, rule_name: Option<&str>) -> String {
        match rule_name {
            Some(rule_name) if !rule_name.is_empty() => format!("{}-{rule_name}", self.key.name),
            _ => format!("{}-idx-{index}", self.key.name),
        }
    }

    fn object_meta(&self, name: String) -> ObjectMeta {
        ObjectMeta {
            name: Some(name),
            namespace: Some(self.key.namespace.clone()),
            labels: self.virtual_service.metadata.labels.clone(),
            annotations: self.virtual_service.metadata.annotations.clone(),
            ..Default::default()
        }
    }

    fn notify_ignored(&mut self, path: &FieldPath, field: &str, is_set: bool) {
        if is_set {
            self.notifications.info(format!("ignoring field: {}", path.child(field)), self.key);
        }
    }

    fn convert_http_rule(&mut self, index: usize, rule: &HttpRoute, name: String) -> Vec<(String, HTTPRouteRules)> {
        let path = self.root.child("http").index(index);
        if rule.mirror.is_some() && !rule.mirrors.is_empty() {
            self.errors.push(FieldError::invalid(path.child("mirrors"), "mirror and mirrors", "mirror and mirrors are mutually exclusive"));
            self.notifications.warning(format!("skipping {path}: mirror and mirrors are both set"), self.key);
            return vec![];
        }

        self.notify_ignored(&path, "retries", rule.retries.is_some());
        self.notify_ignored(&path, "fault", rule.fault.is_some());
        self.notify_ignored(&path, "corsPolicy", rule.cors_policy.is_some());
        self.notify_ignored(&path, "delegate", rule.delegate.is_some());
        self.notify_ignored(&path, "directResponse", rule.direct_response.is_some());

        let matches =
            rule.matches.iter().enumerate().map(|(i, request_match)| self.convert_match(request_match, &path.child("match").index(i))).collect::<Vec<_>>();

        let mut filters = vec![];
        if let Some(redirect) = &rule.redirect {
            filters.push(self.convert_redirect(redirect, &path.child("redirect")));
        }
        if let Some(headers) = &rule.headers {
            filters.extend(header_filters(headers));
        }
        filters.extend(self.convert_mirrors(rule, &path));

        let backend_refs = rule
            .route
            .iter()
            .enumerate()
            .map(|(i, destination)| {
                let destination_path = path.child("route").index(i);
                self.notify_ignored(&destination_path, "headers", destination.headers.is_some());
                let backend = self.backend(&destination.destination, &destination_path.child("destination"));
                HTTPRouteRulesBackendRefs {
                    name: backend.name,
                    namespace: Some(backend.namespace),
                    port: backend.port,
                    weight: destination.weight.filter(|weight| *weight != 0),
                    ..Default::default()
                }
            })
            .collect::<Vec<_>>();

        let timeouts = rule.timeout.as_deref().and_then(|timeout| self.convert_timeout(timeout, &path.child("timeout")));

        let template = HTTPRouteRules {
            backend_refs: (!backend_refs.is_empty()).then_some(backend_refs),
            filters: (!filters.is_empty()).then_some(filters),
            matches: None,
            timeouts,
        };

        match &rule.rewrite {
            Some(rewrite) => {
                self.notify_ignored(&path.child("rewrite"), "uriRegexRewrite", rewrite.uri_regex_rewrite.is_some());
                split_rewrite(name, template, matches, rewrite)
            },
            None => vec![(name, with_matches(template, matches))],
        }
    }

    fn convert_match(&mut self, request_match: &HttpMatchRequest, path: &FieldPath) -> HTTPRouteRulesMatches {
        self.notify_ignored(path, "scheme", request_match.scheme.is_some());
        self.notify_ignored(path, "authority", request_match.authority.is_some());
        self.notify_ignored(path, "port", request_match.port.is_some());
        self.notify_ignored(path, "sourceLabels", !request_match.source_labels.is_empty());
        self.notify_ignored(path, "ignoreUriCase", request_match.ignore_uri_case);
        self.notify_ignored(path, "withoutHeaders", !request_match.without_headers.is_empty());
        self.notify_ignored(path, "sourceNamespace", request_match.source_namespace.is_some());
        self.notify_ignored(path, "gateways", !request_match.gateways.is_empty());
        self.notify_ignored(path, "statPrefix", request_match.stat_prefix.is_some());

        let path_match = request_match.uri.as_ref().and_then(|uri| {
            let (r#type, value) = match uri.kind() {
                Some(StringMatchKind::Exact(value)) => (HTTPRouteRulesMatchesPathType::Exact, value),
                Some(StringMatchKind::Prefix(value)) => (HTTPRouteRulesMatchesPathType::PathPrefix, value),
                Some(StringMatchKind::Regex(value)) => (HTTPRouteRulesMatchesPathType::RegularExpression, value),
                None => {
                    self.errors.push(FieldError::required(path.child("uri"), "one of exact, prefix or regex must be set"));
                    return None;
                },
            };
            Some(HTTPRouteRulesMatchesPath { r#type: Some(r#type), value: Some(value.to_owned()) })
        });

        let mut headers = vec![];
        for (name, string_match) in &request_match.headers {
            if let Some((exact, value)) = self.exact_or_regex(string_match, &path.child("headers").key(name)) {
                let r#type = if exact { HTTPRouteRulesMatchesHeadersType::Exact } else { HTTPRouteRulesMatchesHeadersType::RegularExpression };
                headers.push(HTTPRouteRulesMatchesHeaders { name: name.clone(), r#type: Some(r#type), value });
            }
        }

        let mut query_params = vec![];
        for (name, string_match) in &request_match.query_params {
            if let Some((exact, value)) = self.exact_or_regex(string_match, &path.child("queryParams").key(name)) {
                let r#type =
                    if exact { HTTPRouteRulesMatchesQueryParamsType::Exact } else { HTTPRouteRulesMatchesQueryParamsType::RegularExpression };
                query_params.push(HTTPRouteRulesMatchesQueryParams { name: name.clone(), r#type: Some(r#type), value });
            }
        }

        let method = request_match.method.as_ref().and_then(|method| {
            let method_path = path.child("method");
            match method.kind() {
                Some(StringMatchKind::Exact(value)) => {
                    let method = http_method(value);
                    if method.is_none() {
                        self.errors.push(FieldError::not_supported(method_path, value, &SUPPORTED_METHODS));
                    }
                    method
                },
                Some(StringMatchKind::Prefix(_)) => {
                    self.errors.push(FieldError::not_supported(method_path, "prefix", &["exact"]));
                    None
                },
                Some(StringMatchKind::Regex(_)) => {
                    self.errors.push(FieldError::not_supported(method_path, "regex", &["exact"]));
                    None
                },
                None => {
                    self.errors.push(FieldError::required(method_path, "exact must be set"));
                    None
                },
            }
        });

        HTTPRouteRulesMatches {
            headers: (!headers.is_empty()).then_some(headers),
            method,
            path: path_match,
            query_params: (!query_params.is_empty()).then_some(query_params),
        }
    }

    /// Header and query parameter predicates only support exact and regex matching. Anything else is
    /// recorded as an error and the single predicate is dropped.
    fn exact_or_regex(&mut self, string_match: &StringMatch, path: &FieldPath) -> Option<(bool, String)> {
        match string_match.kind() {
            Some(StringMatchKind::Exact(value)) => Some((true, value.to_owned())),
            Some(StringMatchKind::Regex(value)) => Some((false, value.to_owned())),
            Some(StringMatchKind::Prefix(_)) => {
                self.errors.push(FieldError::not_supported(path.clone(), "prefix", &["exact", "regex"]));
                None
            },
            None => {
                self.errors.push(FieldError::required(path.clone(), "one of exact or regex must be set"));
                None
            },
        }
    }

    fn convert_redirect(&mut self, redirect: &HttpRedirect, path: &FieldPath) -> HTTPRouteRulesFilters {
        self.notify_ignored(path, "derivePort", redirect.derive_port.is_some());

        let port = redirect.port.and_then(|port| match i32::try_from(port) {
            Ok(port) => Some(port),
            Err(_) => {
                self.errors.push(FieldError::invalid(path.child("port"), port.to_string(), "port is out of range"));
                None
            },
        });

        let scheme = redirect.scheme.as_deref().filter(|scheme| !scheme.is_empty()).and_then(|scheme| match scheme {
            "http" => Some(HTTPRouteRulesFiltersRequestRedirectScheme::Http),
            "https" => Some(HTTPRouteRulesFiltersRequestRedirectScheme::Https),
            _ => {
                self.errors.push(FieldError::not_supported(path.child("scheme"), scheme, &SUPPORTED_SCHEMES));
                None
            },
        });

        HTTPRouteRulesFilters {
            r#type: HTTPRouteRulesFiltersType::RequestRedirect,
            request_redirect: Some(HTTPRouteRulesFiltersRequestRedirect {
                hostname: redirect.authority.clone().filter(|authority| !authority.is_empty()),
                path: redirect.uri.clone().filter(|uri| !uri.is_empty()).map(|uri| HTTPRouteRulesFiltersRequestRedirectPath {
                    r#type: HTTPRouteRulesFiltersRequestRedirectPathType::ReplaceFullPath,
                    replace_full_path: Some(uri),
                    replace_prefix_match: None,
                }),
                port,
                scheme,
                status_code: Some(redirect.redirect_code.filter(|code| *code != 0).map_or(DEFAULT_REDIRECT_CODE, i64::from)),
            }),
            ..Default::default()
        }
    }

    /// Every mirror becomes a RequestMirror filter. Gateway API mirrors all requests, so any configured
    /// percentage is dropped.
    fn convert_mirrors(&mut self, rule: &HttpRoute, path: &FieldPath) -> Vec<HTTPRouteRulesFilters> {
        let mut filters = vec![];
        if rule.mirror_percent.is_some() || rule.mirror_percentage.is_some() {
            self.notifications.info(format!("ignoring mirror percentage of {path}: all requests will be mirrored"), self.key);
        }
        if let Some(mirror) = &rule.mirror {
            filters.push(self.mirror_filter(mirror, &path.child("mirror")));
        }
        for (i, mirror) in rule.mirrors.iter().enumerate() {
            let mirror_path = path.child("mirrors").index(i);
            if mirror.percentage.is_some() {
                self.notifications.info(format!("ignoring field: {}: all requests will be mirrored", mirror_path.child("percentage")), self.key);
            }
            filters.push(self.mirror_filter(&mirror.destination, &mirror_path.child("destination")));
        }
        filters
    }

    fn mirror_filter(&mut self, destination: &Destination, path: &FieldPath) -> HTTPRouteRulesFilters {
        let backend = self.backend(destination, path);
        HTTPRouteRulesFilters {
            r#type: HTTPRouteRulesFiltersType::RequestMirror,
            request_mirror: Some(HTTPRouteRulesFiltersRequestMirror {
                backend_ref: HTTPRouteRulesFiltersRequestMirrorBackendRef {
                    name: backend.name,
                    namespace: Some(backend.namespace),
                    port: backend.port,
                    ..Default::default()
                },
            }),
            ..Default::default()
        }
    }

    fn backend(&mut self, destination: &Destination, path: &FieldPath) -> Backend {
        self.notify_ignored(path, "subset", destination.subset.is_some());
        let (name, namespace) = parse_k8s_service_from_domain(&destination.host, &self.key.namespace);
        let port = match destination.port.as_ref().and_then(|port| port.number) {
            Some(number) => match i32::try_from(number) {
                Ok(port) => Some(port),
                Err(_) => {
                    self.errors.push(FieldError::invalid(path.child("port").child("number"), number.to_string(), "port is out of range"));
                    None
                },
            },
            None => None,
        };
        Backend { name, namespace, port }
    }

    fn convert_timeout(&mut self, timeout: &str, path: &FieldPath) -> Option<HTTPRouteRulesTimeouts> {
        let parsed = kube_core::Duration::from_str(timeout)
            .map_err(|e| e.to_string())
            .and_then(|duration| GatewayDuration::try_from(std::time::Duration::from(duration)).map_err(|e| e.to_string()));
        match parsed {
            Ok(duration) => Some(HTTPRouteRulesTimeouts { request: Some(duration.to_string()), backend_request: None }),
            Err(e) => {
                self.errors.push(FieldError::invalid(path.clone(), timeout, e));
                None
            },
        }
    }
}

fn http_method(method: &str) -> Option<HTTPRouteRulesMatchesMethod> {
    Some(match method {
        "GET" => HTTPRouteRulesMatchesMethod::Get,
        "HEAD" => HTTPRouteRulesMatchesMethod::Head,
        "POST" => HTTPRouteRulesMatchesMethod::Post,
        "PUT" => HTTPRouteRulesMatchesMethod::Put,
        "DELETE" => HTTPRouteRulesMatchesMethod::Delete,
        "CONNECT" => HTTPRouteRulesMatchesMethod::Connect,
        "OPTIONS" => HTTPRouteRulesMatchesMethod::Options,
        "TRACE" => HTTPRouteRulesMatchesMethod::Trace,
        "PATCH" => HTTPRouteRulesMatchesMethod::Patch,
        _ => return None,
    })
}

fn header_filters(headers: &Headers) -> Vec<HTTPRouteRulesFilters> {
    let mut filters = vec![];
    if let Some(request) = headers.request.as_ref().filter(|operations| !is_empty(operations)) {
        filters.push(HTTPRouteRulesFilters {
            r#type: HTTPRouteRulesFiltersType::RequestHeaderModifier,
            request_header_modifier: Some(HTTPRouteRulesFiltersRequestHeaderModifier {
                add: non_empty(
                    request.add.iter().map(|(name, value)| HTTPRouteRulesFiltersRequestHeaderModifierAdd { name: name.clone(), value: value.clone() }),
                ),
                set: non_empty(
                    request.set.iter().map(|(name, value)| HTTPRouteRulesFiltersRequestHeaderModifierSet { name: name.clone(), value: value.clone() }),
                ),
                remove: non_empty(request.remove.iter().cloned()),
            }),
            ..Default::default()
        });
    }
    if let Some(response) = headers.response.as_ref().filter(|operations| !is_empty(operations)) {
        filters.push(HTTPRouteRulesFilters {
            r#type: HTTPRouteRulesFiltersType::ResponseHeaderModifier,
            response_header_modifier: Some(HTTPRouteRulesFiltersResponseHeaderModifier {
                add: non_empty(
                    response.add.iter().map(|(name, value)| HTTPRouteRulesFiltersResponseHeaderModifierAdd { name: name.clone(), value: value.clone() }),
                ),
                set: non_empty(
                    response.set.iter().map(|(name, value)| HTTPRouteRulesFiltersResponseHeaderModifierSet { name: name.clone(), value: value.clone() }),
                ),
                remove: non_empty(response.remove.iter().cloned()),
            }),
            ..Default::default()
        });
    }
    filters
}

fn is_empty(operations: &HeaderOperations) -> bool {
    operations.add.is_empty() && operations.set.is_empty() && operations.remove.is_empty()
}

fn non_empty<T>(items: impl Iterator<Item = T>) -> Option<Vec<T>> {
    let items: Vec<_> = items.collect();
    (!items.is_empty()).then_some(items)
}

fn with_matches(mut rule: HTTPRouteRules, matches: Vec<HTTPRouteRulesMatches>) -> HTTPRouteRules {
    rule.matches = (!matches.is_empty()).then_some(matches);
    rule
}

fn with_filter(mut rule: HTTPRouteRules, filter: HTTPRouteRulesFilters) -> HTTPRouteRules {
    rule.filters.get_or_insert_with(Vec::new).push(filter);
    rule
}

fn url_rewrite(hostname: Option<String>, path: Option<HTTPRouteRulesFiltersUrlRewritePath>) -> HTTPRouteRulesFilters {
    HTTPRouteRulesFilters {
        r#type: HTTPRouteRulesFiltersType::UrlRewrite,
        url_rewrite: Some(HTTPRouteRulesFiltersUrlRewrite { hostname, path }),
        ..Default::default()
    }
}

/// Matches without a path, with an untyped path or with a prefix path.
fn is_prefix_match(request_match: &HTTPRouteRulesMatches) -> bool {
    match &request_match.path {
        None => true,
        Some(path) => matches!(path.r#type, None | Some(HTTPRouteRulesMatchesPathType::PathPrefix)),
    }
}

/// Istio rewrites the matched prefix for prefix matches and the whole path otherwise, while a Gateway API
/// URLRewrite filter has a single mode per rule. Rules with both kinds of matches are split in two.
fn split_rewrite(name: String, template: HTTPRouteRules, matches: Vec<HTTPRouteRulesMatches>, rewrite: &HttpRewrite) -> Vec<(String, HTTPRouteRules)> {
    let hostname = rewrite.authority.clone().filter(|authority| !authority.is_empty());
    let Some(uri) = rewrite.uri.as_deref().filter(|uri| !uri.is_empty()) else {
        let rule = with_matches(template, matches);
        return match hostname {
            Some(hostname) => vec![(name, with_filter(rule, url_rewrite(Some(hostname), None)))],
            None => vec![(name, rule)],
        };
    };

    let no_matches = matches.is_empty();
    let (prefix_matches, full_path_matches): (Vec<_>, Vec<_>) = matches.into_iter().partition(is_prefix_match);

    let mut rules = vec![];
    if !full_path_matches.is_empty() {
        let path = HTTPRouteRulesFiltersUrlRewritePath {
            r#type: HTTPRouteRulesFiltersUrlRewritePathType::ReplaceFullPath,
            replace_full_path: Some(uri.to_owned()),
            replace_prefix_match: None,
        };
        let rule = with_filter(with_matches(template.clone(), full_path_matches), url_rewrite(hostname.clone(), Some(path)));
        rules.push((name.clone(), rule));
    }

    if no_matches || !prefix_matches.is_empty() {
        let path = HTTPRouteRulesFiltersUrlRewritePath {
            r#type: HTTPRouteRulesFiltersUrlRewritePathType::ReplacePrefixMatch,
            replace_full_path: None,
            replace_prefix_match: Some(uri.to_owned()),
        };
        let rule = with_filter(with_matches(template, prefix_matches), url_rewrite(hostname, Some(path)));
        rules.push((format!("{name}-{PREFIX_MATCH_SUFFIX}"), rule));
    }
    rules
}
