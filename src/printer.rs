use std::{collections::BTreeMap, io::Write};

use itertools::Itertools;
use serde::Serialize;

use crate::{
    common::{ErrorList, GatewayResources, Notifications, ResourceKey},
    Report, Result,
};

const DOCUMENT_SEPARATOR: &str = "---";
const SEVERITY_HEADER: &str = "SEVERITY";
const MESSAGE_HEADER: &str = "MESSAGE";
const OBJECTS_HEADER: &str = "OBJECTS";

/// Writes the converted objects to `out` and the diagnostics of every provider to `err`.
pub fn print_report(report: &Report, out: &mut impl Write, err: &mut impl Write) -> Result<()> {
    print_resources(out, &report.resources)?;
    for provider in &report.providers {
        print_notifications(err, &provider.name, &provider.notifications)?;
        print_errors(err, &provider.name, &provider.errors)?;
    }
    Ok(())
}

/// Every kind in a fixed order, every object in key order, as `---` separated YAML documents.
pub fn print_resources(out: &mut impl Write, resources: &GatewayResources) -> Result<()> {
    print_objects(out, &resources.gateways)?;
    print_objects(out, &resources.http_routes)?;
    print_objects(out, &resources.grpc_routes)?;
    print_objects(out, &resources.tls_routes)?;
    print_objects(out, &resources.tcp_routes)?;
    print_objects(out, &resources.udp_routes)?;
    print_objects(out, &resources.backend_tls_policies)?;
    print_objects(out, &resources.reference_grants)?;
    out.flush()?;
    Ok(())
}

fn print_objects<T: Serialize>(out: &mut impl Write, objects: &BTreeMap<ResourceKey, T>) -> Result<()> {
    for object in objects.values() {
        let document = serde_yaml::to_string(object)?;
        write!(out, "{DOCUMENT_SEPARATOR}\n{document}")?;
    }
    Ok(())
}

pub fn print_notifications(err: &mut impl Write, provider: &str, notifications: &Notifications) -> Result<()> {
    if notifications.is_empty() {
        return Ok(());
    }

    let rows = notifications.iter().map(|n| (n.severity.to_string(), n.message.clone(), n.objects.iter().join(", "))).collect::<Vec<_>>();
    let severity_width = rows.iter().map(|(severity, _, _)| severity.len()).chain([SEVERITY_HEADER.len()]).max().unwrap_or_default();
    let message_width = rows.iter().map(|(_, message, _)| message.len()).chain([MESSAGE_HEADER.len()]).max().unwrap_or_default();

    writeln!(err, "Notifications from {}:", provider.to_uppercase())?;
    writeln!(err, "{SEVERITY_HEADER:severity_width$}  {MESSAGE_HEADER:message_width$}  {OBJECTS_HEADER}")?;
    for (severity, message, objects) in rows {
        writeln!(err, "{severity:severity_width$}  {message:message_width$}  {objects}")?;
    }
    writeln!(err)?;
    Ok(())
}

pub fn print_errors(err: &mut impl Write, provider: &str, errors: &ErrorList) -> Result<()> {
    if errors.is_empty() {
        return Ok(());
    }
    writeln!(err, "Conversion errors from {} ({}):", provider.to_uppercase(), errors.len())?;
    for error in errors {
        writeln!(err, "  {error}")?;
    }
    writeln!(err)?;
    Ok(())
}
