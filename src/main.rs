#![forbid(unsafe_code)]
use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use indicator_registry::client::{PrometheusClient, RegistryClient};
use indicator_registry::config::tls::{ClientTlsMaterial, TlsPaths, server_config};
use indicator_registry::config::{self, RegistryConfig, load_configuration, parse_interval};
use indicator_registry::exporters::{
    DocumentConverter, ExporterController, ExporterControllerConfig, GrafanaDashboardConverter,
    OsFilesystem, PrometheusReloader, PrometheusRulesConverter, Reloader,
};
use indicator_registry::http::server::RegistryServer;
use indicator_registry::http::state::HttpServerState;
use indicator_registry::patch::{DirectoryPatchSource, PatchSource, StaticPatchSource};
use indicator_registry::registration::RegistrationAgent;
use indicator_registry::status::StatusController;
use indicator_registry::storage::{DocumentStore, StatusStore, SystemClock};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{Level, event};

#[derive(Parser, Debug)]
#[command(name = "indicator-registry", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the registry HTTP API until interrupted.
    Registry(RegistryArgs),
    /// Periodically register indicator document files.
    Register(RegisterArgs),
    /// Evaluate indicator thresholds and push the statuses to the registry.
    StatusController(StatusControllerArgs),
    /// Write Prometheus alerting rules for every registered document.
    PrometheusRulesExporter(PrometheusRulesExporterArgs),
    /// Write Grafana dashboards for every registered document.
    GrafanaDashboardExporter(GrafanaDashboardExporterArgs),
}

#[derive(Args, Debug)]
struct TlsArgs {
    /// Certificate presented by this process.
    #[arg(long, value_name = "PATH")]
    tls_pem_path: Option<PathBuf>,
    /// Private key of the certificate.
    #[arg(long, value_name = "PATH")]
    tls_key_path: Option<PathBuf>,
    /// CA bundle the peer certificate must chain to.
    #[arg(long, value_name = "PATH")]
    tls_root_ca_pem: Option<PathBuf>,
}

impl TlsArgs {
    fn paths(&self, config: &RegistryConfig) -> TlsPaths {
        TlsPaths {
            pem_path: self.tls_pem_path.clone(),
            key_path: self.tls_key_path.clone(),
            root_ca_pem: self.tls_root_ca_pem.clone(),
        }
        .or(TlsPaths {
            pem_path: config.tls_pem_path.clone(),
            key_path: config.tls_key_path.clone(),
            root_ca_pem: config.tls_root_ca_pem.clone(),
        })
    }
}

#[derive(Args, Debug)]
struct RegistryArgs {
    /// Serve plain HTTP when no TLS material is configured.
    #[arg(long)]
    insecure: bool,
    #[command(flatten)]
    tls: TlsArgs,
}

#[derive(Args, Debug)]
struct ClientArgs {
    /// Base URL of the registry.
    #[arg(long, value_name = "URL")]
    registry: String,
    /// Name the registry certificate is issued for.
    #[arg(long, value_name = "NAME")]
    tls_server_cn: Option<String>,
    #[command(flatten)]
    tls: TlsArgs,
}

#[derive(Args, Debug)]
struct RegisterArgs {
    #[command(flatten)]
    client: ClientArgs,
    /// Indicator document files.
    #[arg(long, value_name = "PATH", required = true, num_args = 1..)]
    documents: Vec<PathBuf>,
    /// Directory of patch files applied before registration.
    #[arg(long, value_name = "DIR")]
    patches: Option<PathBuf>,
    #[arg(long, default_value = "1m", value_parser = parse_interval)]
    interval: Duration,
}

#[derive(Args, Debug)]
struct StatusControllerArgs {
    #[command(flatten)]
    client: ClientArgs,
    /// Base URL of the Prometheus server queried for indicator values.
    #[arg(long, value_name = "URL")]
    prometheus: String,
    #[arg(long, default_value = "1m", value_parser = parse_interval)]
    interval: Duration,
}

#[derive(Args, Debug)]
struct PrometheusRulesExporterArgs {
    #[command(flatten)]
    client: ClientArgs,
    #[arg(long, value_name = "DIR")]
    output_directory: PathBuf,
    /// Prometheus server reloaded after each export.
    #[arg(long, value_name = "URL")]
    prometheus: Option<String>,
    #[arg(long, default_value = "1m", value_parser = parse_interval)]
    interval: Duration,
}

#[derive(Args, Debug)]
struct GrafanaDashboardExporterArgs {
    #[command(flatten)]
    client: ClientArgs,
    #[arg(long, value_name = "DIR")]
    output_directory: PathBuf,
    #[arg(long, default_value = "1m", value_parser = parse_interval)]
    interval: Duration,
}

fn main() -> Result<()> {
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .map_err(|e| anyhow::anyhow!("Failed to install CryptoProvider: {:?}", e))?;

    let cli = Cli::parse();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create Tokio runtime")?;

    runtime.block_on(async_main(cli))
}

async fn async_main(cli: Cli) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .init();

    load_configuration().context("Failed to load configuration")?;
    let config = config::get().context("Failed to get configuration")?;

    let _sentry = config.sentry_dsn.as_ref().map(|dsn| {
        sentry::init((
            dsn.clone(),
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    // Exit the program if a panic occurs
    let default_panic = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        default_panic(info);
        std::process::exit(1);
    }));

    match cli.command {
        Command::Registry(args) => run_registry(&config, args).await,
        Command::Register(args) => run_register(&config, args).await,
        Command::StatusController(args) => run_status_controller(&config, args).await,
        Command::PrometheusRulesExporter(args) => {
            let reloader = args
                .prometheus
                .as_deref()
                .map(PrometheusReloader::new)
                .transpose()?
                .map(|reloader| Arc::new(reloader) as Arc<dyn Reloader>);
            run_exporter(
                &config,
                &args.client,
                Arc::new(PrometheusRulesConverter),
                args.output_directory,
                args.interval,
                "prometheus rules",
                reloader,
            )
            .await
        }
        Command::GrafanaDashboardExporter(args) => {
            run_exporter(
                &config,
                &args.client,
                Arc::new(GrafanaDashboardConverter),
                args.output_directory,
                args.interval,
                "grafana dashboards",
                None,
            )
            .await
        }
    }
}

async fn run_registry(config: &RegistryConfig, args: RegistryArgs) -> Result<()> {
    let clock = Arc::new(SystemClock);
    let state = HttpServerState::new(
        Arc::new(DocumentStore::new(config.document_ttl()?, clock.clone())),
        Arc::new(StatusStore::new(clock)),
    )?;

    let paths = args.tls.paths(config);
    let tls = if paths.is_empty() {
        if !args.insecure {
            bail!("TLS material is required, pass --insecure to serve plain HTTP");
        }
        None
    } else {
        Some(server_config(&paths).context("Invalid TLS configuration")?)
    };

    let address = SocketAddr::from((config.endpoint, config.port));
    let server = RegistryServer::new(state, address, tls)?;
    let handle = server.handle();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.close();
        }
    });

    match server.serve().await {
        Ok(()) => {
            event!(Level::INFO, "HTTP server stopped gracefully");
            Ok(())
        }
        Err(err) => {
            event!(Level::ERROR, "HTTP server failed: {:#}", err);
            Err(err)
        }
    }
}

fn client_tls(config: &RegistryConfig, args: &ClientArgs) -> Result<Option<ClientTlsMaterial>> {
    let paths = args.tls.paths(config);
    if paths.is_empty() {
        return Ok(None);
    }
    Ok(Some(
        paths.client_material().context("Invalid TLS configuration")?,
    ))
}

fn registry_client(config: &RegistryConfig, args: &ClientArgs) -> Result<Arc<RegistryClient>> {
    let tls = client_tls(config, args)?;
    Ok(Arc::new(RegistryClient::with_tls(
        &args.registry,
        tls.as_ref(),
        args.tls_server_cn.as_deref(),
    )?))
}

/// Token cancelled on Ctrl-C.
fn shutdown_token() -> CancellationToken {
    let token = CancellationToken::new();
    let cancel = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            event!(Level::INFO, "Interrupted, stopping");
            cancel.cancel();
        }
    });
    token
}

async fn run_register(config: &RegistryConfig, args: RegisterArgs) -> Result<()> {
    let client = registry_client(config, &args.client)?;
    let patch_source: Arc<dyn PatchSource> = match args.patches {
        Some(directory) => Arc::new(DirectoryPatchSource::new(directory)),
        None => Arc::new(StaticPatchSource::default()),
    };

    let agent = RegistrationAgent::new(client, patch_source, args.documents, args.interval);
    agent.start(shutdown_token()).await;
    Ok(())
}

async fn run_status_controller(config: &RegistryConfig, args: StatusControllerArgs) -> Result<()> {
    let client = registry_client(config, &args.client)?;
    let prometheus = Arc::new(PrometheusClient::new(&args.prometheus)?);

    let controller = StatusController::new(client.clone(), client, prometheus, args.interval);
    controller.start(shutdown_token()).await;
    Ok(())
}

async fn run_exporter(
    config: &RegistryConfig,
    client: &ClientArgs,
    converter: Arc<dyn DocumentConverter>,
    output_directory: PathBuf,
    update_frequency: Duration,
    doc_type: &str,
    reloader: Option<Arc<dyn Reloader>>,
) -> Result<()> {
    let controller = ExporterController::new(ExporterControllerConfig {
        document_getter: registry_client(config, client)?,
        converter,
        output_directory,
        filesystem: Arc::new(OsFilesystem),
        update_frequency,
        doc_type: doc_type.to_string(),
        reloader,
    });
    controller.start(shutdown_token()).await;
    Ok(())
}
