use std::env;
use std::fs;
use std::io::{self, IsTerminal, Write};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use config::{Config, Environment, File, FileFormat};
use log::{LevelFilter, debug, info};
use tokio::net::TcpListener;

use roost::api::{self, AppState};
use roost::auth::AuthState;
use roost::config::AppConfig;
use roost::probe;
use roost::supervisor::Supervisor;
use roost::tenants::TenantDirs;

const APP_NAME: &str = "roost";

fn main() {
    if let Err(err) = try_main() {
        let _ = writeln!(io::stderr(), "{err:?}");
        std::process::exit(1);
    }
}

#[tokio::main]
async fn async_main(ctx: RuntimeContext, cmd: ServeCommand) -> Result<()> {
    handle_serve(&ctx, cmd).await
}

fn try_main() -> Result<()> {
    let cli = Cli::parse();

    let ctx = RuntimeContext::new(cli.common.clone())?;
    ctx.init_logging()?;
    debug!("config file: {}", ctx.config_file.display());

    match cli.command {
        Command::Serve(cmd) => async_main(ctx, cmd),
        Command::Init(cmd) => handle_init(&ctx, cmd),
        Command::Config { command } => handle_config(&ctx, command),
    }
}

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Roost - multi-tenant bot hosting control plane.",
    propagate_version = true
)]
struct Cli {
    #[command(flatten)]
    common: CommonOpts,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Args)]
struct CommonOpts {
    /// Override the config file path
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Reduce output to only errors
    #[arg(short, long, action = clap::ArgAction::SetTrue, global = true)]
    quiet: bool,
    /// Increase logging verbosity (stackable)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Enable debug logging (equivalent to -vv)
    #[arg(long, global = true)]
    debug: bool,
    /// Output logs as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server
    Serve(ServeCommand),
    /// Write a default config file
    Init(InitCommand),
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Debug, Args)]
struct ServeCommand {
    /// Override the bind host
    #[arg(long)]
    host: Option<String>,
    /// Override the bind port
    #[arg(short, long)]
    port: Option<u16>,
}

#[derive(Debug, Args)]
struct InitCommand {
    /// Overwrite an existing config file
    #[arg(long)]
    force: bool,
}

#[derive(Debug, Subcommand)]
enum ConfigCommand {
    /// Print the effective configuration as TOML
    Show,
    /// Print the config file path
    Path,
}

struct RuntimeContext {
    common: CommonOpts,
    config_file: PathBuf,
    config: AppConfig,
}

impl RuntimeContext {
    fn new(common: CommonOpts) -> Result<Self> {
        let config_file = resolve_config_file(common.config.clone())?;
        let config = load_config(&config_file)?;
        Ok(Self {
            common,
            config_file,
            config,
        })
    }

    fn init_logging(&self) -> Result<()> {
        use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

        if self.common.quiet {
            log::set_max_level(LevelFilter::Off);
            return Ok(());
        }

        let level = match self.effective_log_level() {
            LevelFilter::Off => "off",
            LevelFilter::Error => "error",
            LevelFilter::Warn => "warn",
            LevelFilter::Info => "info",
            LevelFilter::Debug => "debug",
            LevelFilter::Trace => "trace",
        };

        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("roost={level},tower_http={level}")));

        if self.common.json {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()
                .ok();
        } else {
            let disable_color =
                env::var_os("NO_COLOR").is_some() || !io::stderr().is_terminal();
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().with_ansi(!disable_color))
                .try_init()
                .ok();
        }

        // Also init env_logger for compatibility with log crate users
        let mut builder =
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
        builder.filter_level(self.effective_log_level());
        builder.try_init().ok();

        Ok(())
    }

    fn effective_log_level(&self) -> LevelFilter {
        if self.common.debug {
            LevelFilter::Debug
        } else {
            match (self.common.verbose, self.config.logging.level.as_str()) {
                (0, "off") => LevelFilter::Off,
                (0, "error") => LevelFilter::Error,
                (0, "warn") => LevelFilter::Warn,
                (0, "debug") => LevelFilter::Debug,
                (0, "trace") => LevelFilter::Trace,
                (0, _) => LevelFilter::Info,
                (1, _) => LevelFilter::Debug,
                (_, _) => LevelFilter::Trace,
            }
        }
    }
}

fn resolve_config_file(override_path: Option<PathBuf>) -> Result<PathBuf> {
    let config_file = match override_path {
        Some(path) => {
            if path.is_dir() {
                path.join("config.toml")
            } else {
                path
            }
        }
        None => default_config_dir()?.join("config.toml"),
    };

    if config_file.parent().is_none() {
        return Err(anyhow!("invalid config file path: {config_file:?}"));
    }

    Ok(config_file)
}

fn default_config_dir() -> Result<PathBuf> {
    if let Some(dir) = env::var_os("XDG_CONFIG_HOME") {
        return Ok(PathBuf::from(dir).join(APP_NAME));
    }
    let home = env::var_os("HOME").ok_or_else(|| anyhow!("HOME is not set"))?;
    Ok(PathBuf::from(home).join(".config").join(APP_NAME))
}

fn env_prefix() -> String {
    APP_NAME.to_uppercase()
}

fn load_config(config_file: &Path) -> Result<AppConfig> {
    let built = Config::builder()
        .add_source(
            File::from(config_file)
                .format(FileFormat::Toml)
                .required(false),
        )
        .add_source(Environment::with_prefix(env_prefix().as_str()).separator("__"))
        .build()
        .context("building configuration")?;

    let config: AppConfig = built
        .try_deserialize()
        .context("deserializing configuration")?;

    Ok(config)
}

fn handle_init(ctx: &RuntimeContext, cmd: InitCommand) -> Result<()> {
    if ctx.config_file.exists() && !cmd.force {
        return Err(anyhow!(
            "config file already exists at {} (use --force to overwrite)",
            ctx.config_file.display()
        ));
    }

    if let Some(parent) = ctx.config_file.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating config directory {parent:?}"))?;
    }

    let toml = toml::to_string_pretty(&AppConfig::default())
        .context("serializing default config to TOML")?;
    fs::write(&ctx.config_file, toml)
        .with_context(|| format!("writing {}", ctx.config_file.display()))?;

    info!("wrote default config to {}", ctx.config_file.display());
    Ok(())
}

fn handle_config(ctx: &RuntimeContext, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show => {
            let toml = toml::to_string_pretty(&ctx.config)
                .context("serializing effective config to TOML")?;
            print!("{toml}");
        }
        ConfigCommand::Path => {
            println!("{}", ctx.config_file.display());
        }
    }
    Ok(())
}

async fn handle_serve(ctx: &RuntimeContext, cmd: ServeCommand) -> Result<()> {
    info!("Starting bot hosting control plane...");

    let auth_config = ctx.config.auth.clone();
    if !auth_config.dev_mode && auth_config.resolve_jwt_secret().is_none() {
        anyhow::bail!(
            "auth.jwt_secret is required outside dev mode (set it in config or via env)"
        );
    }
    info!(
        "Auth mode: {}",
        if auth_config.dev_mode {
            "development"
        } else {
            "production"
        }
    );
    let auth_state = AuthState::new(auth_config);

    let data_dir = ctx.config.paths.data_dir.clone();
    fs::create_dir_all(&data_dir)
        .with_context(|| format!("creating data directory {}", data_dir.display()))?;
    info!("Data directory: {}", data_dir.display());

    let dirs = TenantDirs::new(data_dir);
    let resource_probe = probe::select_backend(&ctx.config.probe);
    let supervisor = Arc::new(Supervisor::new(
        dirs,
        resource_probe,
        &ctx.config.supervisor,
    ));

    let files_state = roost_files::FilesState::new(ctx.config.files.to_files_config());

    let state = AppState::new(supervisor, auth_state, files_state);
    let app = api::create_router_with_config(state, ctx.config.server.max_upload_size_mb);

    let host = cmd.host.unwrap_or_else(|| ctx.config.server.host.clone());
    let port = cmd.port.unwrap_or(ctx.config.server.port);
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .with_context(|| format!("invalid bind address {host}:{port}"))?;
    info!("Listening on http://{}", addr);

    let listener = TcpListener::bind(addr).await.context("binding to address")?;

    // Workers are spawned in their own process groups and are not stopped
    // here. They keep running across a control plane restart; the registry
    // is rebuilt lazily as tenants issue new start requests.
    let shutdown_signal = async move {
        let ctrl_c = async {
            if tokio::signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(_) => std::future::pending::<()>().await,
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }

        info!("Shutdown signal received, draining connections");
    };

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal)
    .await
    .context("running server")?;

    Ok(())
}
