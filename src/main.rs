use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use oracle_metrics_agent::{
    agent_config_error, agent_connection_error, run_once, AgentConfig, ConfigOverrides,
    HealthStatus, MetricOutput, OracleExecutor, QueryExecutor, Result,
};
use tracing_subscriber::{fmt, EnvFilter};

/// Oracle diagnostics in InfluxDB line protocol, one collection per invocation.
#[derive(Parser)]
#[command(name = "oracle-metrics", version, about)]
struct Cli {
    /// Path to a YAML (or .json) configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Database user.
    #[arg(short, long, env = "ORACLE_METRICS_USER")]
    user: Option<String>,

    /// Database password.
    #[arg(short, long, env = "ORACLE_METRICS_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// File holding the database password.
    #[arg(long)]
    pfile: Option<String>,

    /// Connect string: TNS alias, Easy Connect or full descriptor.
    #[arg(short, long, env = "ORACLE_METRICS_DSN")]
    dsn: Option<String>,

    /// Instance name written on every line (derived from the dsn by default).
    #[arg(short, long)]
    instance: Option<String>,

    /// Diagnostic log filter on stderr (off, error, warn, info, debug, trace).
    #[arg(long, env = "ORACLE_METRICS_LOG", default_value = "off")]
    log_level: String,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            user: self.user.clone(),
            password: self.password.clone(),
            password_file: self.pfile.clone(),
            dsn: self.dsn.clone(),
            instance: self.instance.clone(),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(error) = init_tracing(&cli.log_level) {
        return fatal(error);
    }

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(error) => return fatal(error),
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => return fatal(agent_config_error("runtime", format!("building tokio runtime: {e}"))),
    };

    match runtime.block_on(collect(&config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => fatal(error),
    }
}

fn init_tracing(level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .map_err(|e| agent_config_error("log_level", format!("invalid log level '{level}': {e}")))?;

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(true)
        .init();

    Ok(())
}

fn load_config(cli: &Cli) -> Result<AgentConfig> {
    let config = match &cli.config {
        Some(path) => AgentConfig::load(path)?,
        None => AgentConfig::default(),
    };

    let config = config.apply(cli.overrides()).resolve_password()?;
    config.validate()?;
    Ok(config)
}

async fn collect(config: &AgentConfig) -> Result<()> {
    // Fail before connecting when no instance name can be derived
    config.instance_id()?;

    let executor = OracleExecutor::connect(config.connection.clone()).await?;

    let health = executor
        .health_check()
        .await
        .unwrap_or_else(|e| HealthStatus::unhealthy(e.to_string()));
    if !health.is_healthy {
        let _ = executor.close().await;
        return Err(agent_connection_error(
            executor.dsn(),
            format!("connection unusable after connect: {}", health.message),
        ));
    }
    tracing::debug!(health = %health, "connection ready");

    let mut output = MetricOutput::stdio();
    let summary = run_once(&executor, config, &mut output).await?;

    if !summary.is_clean() {
        tracing::info!(failures = summary.failures.len(), "run completed with skipped collectors");
    }

    Ok(())
}

/// Report a fatal error on the error channel and pick the exit code
fn fatal(error: impl std::fmt::Display) -> ExitCode {
    let _ = MetricOutput::stdio().report(&error);
    ExitCode::from(1)
}
