use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
    process::ExitCode,
};

use clap::{Args, Parser, Subcommand};
use ingress2gateway::{configuration::Configuration, printer, providers::istio, Result};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    filter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    Layer, Registry,
};

const DEFAULT_LOG_FILE: &str = "ingress2gateway.log";

pub enum Guard {
    Appender(WorkerGuard),
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct CommandArgs {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Prints Gateway API objects converted from provider resources
    Print(PrintArgs),
}

#[derive(Args, Debug)]
struct PrintArgs {
    /// Multi document YAML manifest to read instead of the cluster
    #[arg(long)]
    input_file: Option<PathBuf>,
    #[arg(long)]
    kubeconfig: Option<PathBuf>,
    #[arg(short = 'n', long)]
    namespace: Option<String>,
    #[arg(short = 'A', long)]
    all_namespaces: bool,
    /// Comma separated provider names
    #[arg(long, value_delimiter = ',')]
    providers: Vec<String>,
    /// Also print TLSRoute, TCPRoute, UDPRoute, GRPCRoute and BackendTLSPolicy objects
    #[arg(long)]
    allow_experimental_gw_api: bool,
    /// gatewayClassName of the generated Gateways
    #[arg(long)]
    istio_gateway_class_name: Option<String>,
    #[arg(long)]
    config_file: Option<PathBuf>,
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl PrintArgs {
    /// Flags override the configuration file.
    fn into_configuration(self) -> Result<Configuration> {
        let mut configuration: Configuration = match &self.config_file {
            Some(config_file) => serde_yaml::from_str(&std::fs::read_to_string(config_file)?)?,
            None => Configuration::default(),
        };

        if !self.providers.is_empty() {
            configuration.providers = self.providers;
        }
        if self.namespace.is_some() {
            configuration.namespace = self.namespace;
        }
        if self.all_namespaces {
            configuration.all_namespaces = true;
        }
        if self.input_file.is_some() {
            configuration.input_file = self.input_file;
        }
        if self.kubeconfig.is_some() {
            configuration.kubeconfig = self.kubeconfig;
        }
        if self.allow_experimental_gw_api {
            configuration.allow_experimental_gw_api = true;
        }
        if let Some(gateway_class_name) = self.istio_gateway_class_name {
            configuration
                .provider_flags
                .entry(istio::PROVIDER_NAME.to_owned())
                .or_default()
                .insert(istio::GATEWAY_CLASS_NAME_FLAG.to_owned(), gateway_class_name);
        }
        Ok(configuration)
    }
}

fn init_tracing_logging(log_file: Option<&Path>) -> Vec<Guard> {
    let (console_writer, console_guard) = tracing_appender::non_blocking(std::io::stderr());
    let console_filter = tracing_subscriber::EnvFilter::new(std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_owned()));
    let console_layer = fmt::layer()
        .event_format(fmt::format().compact())
        .with_writer(console_writer)
        .with_target(true)
        .with_span_events(FmtSpan::NONE)
        .with_ansi(false)
        .with_filter(filter::filter_fn(|meta| !meta.is_span()))
        .with_filter(console_filter);

    let mut guards = vec![Guard::Appender(console_guard)];
    let file_layer = log_file.map(|log_file| {
        let directory = log_file.parent().filter(|parent| !parent.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."));
        let file_name = log_file.file_name().unwrap_or_else(|| OsStr::new(DEFAULT_LOG_FILE));
        let (file_writer, file_guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(directory, file_name));
        guards.push(Guard::Appender(file_guard));
        let file_filter = tracing_subscriber::EnvFilter::new(std::env::var("RUST_FILE_LOG").unwrap_or_else(|_| "debug".to_owned()));
        fmt::layer()
            .with_writer(file_writer)
            .with_span_events(FmtSpan::NONE)
            .with_target(true)
            .with_ansi(false)
            .with_filter(filter::filter_fn(|meta| !meta.is_span()))
            .with_filter(file_filter)
    });

    Registry::default().with(console_layer).with(file_layer).init();
    guards
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<ExitCode> {
    let CommandArgs { command: Command::Print(args) } = CommandArgs::parse();
    let _guards = init_tracing_logging(args.log_file.as_deref());

    let configuration = args.into_configuration()?;
    info!("Converting with {configuration:?}");
    let report = ingress2gateway::convert(&configuration).await?;

    let stdout = std::io::stdout();
    let stderr = std::io::stderr();
    printer::print_report(&report, &mut stdout.lock(), &mut stderr.lock())?;

    Ok(if report.has_errors() { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}
