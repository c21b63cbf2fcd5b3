// MIT License - Copyright (c) 2026 Peter Wright
// Simplex FACP monitor

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use tokio::signal::unix::{signal, SignalKind};
use tokio::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use simplex_facp::transport::{DataBits, Parity, StopBits};
use simplex_facp::{
    FramedLink, InteractiveLink, LogSink, Monitor, MonitorConfig, PanelLink, PointCatalog,
    Protocol, Session,
};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "simplex-monitor")]
#[command(about = "Monitor a Simplex fire alarm panel over its serial port")]
struct Cli {
    /// Path to the TOML configuration file (default: search standard locations)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Link protocol, overriding the config file (interactive or framed)
    #[arg(long)]
    protocol: Option<String>,

    /// Log in, run this command, print the reply and exit (repeatable)
    #[arg(long, value_name = "COMMAND")]
    exec: Vec<String>,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

const CONFIG_LOCATIONS: &[&str] = &["config/config.toml", "config.toml"];

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Config {
    serial: SerialToml,
    monitor: MonitorToml,
    panel: PanelToml,
    points: PointsToml,
    logging: LoggingToml,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct SerialToml {
    port: String,
    baudrate: u32,
    /// Defaults from the protocol when omitted
    parity: Option<String>,
    data_bits: u8,
    stop_bits: u8,
    /// Per-byte read timeout in seconds
    timeout: f64,
    protocol: String,
}

impl Default for SerialToml {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baudrate: 19200,
            parity: None,
            data_bits: 8,
            stop_bits: 1,
            timeout: 1.0,
            protocol: Protocol::default().to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct MonitorToml {
    poll_interval: u64,
    retry_delay: u64,
    max_retries: u32,
    command_timeout_ms: u64,
    list_timeout_ms: u64,
}

impl Default for MonitorToml {
    fn default() -> Self {
        Self {
            poll_interval: 60,
            retry_delay: 5,
            max_retries: 3,
            command_timeout_ms: 2000,
            list_timeout_ms: 3000,
        }
    }
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct PanelToml {
    passcode: Option<String>,
}

impl std::fmt::Debug for PanelToml {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PanelToml")
            .field("passcode", &self.passcode.as_ref().map(|_| "***"))
            .finish()
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct PointsToml {
    file: Option<PathBuf>,
    export_dir: PathBuf,
}

impl Default for PointsToml {
    fn default() -> Self {
        Self {
            file: None,
            export_dir: PathBuf::from("data/exports"),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct LoggingToml {
    level: String,
    file: Option<PathBuf>,
}

impl Default for LoggingToml {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// First existing config file: `--config`, then the working directory,
/// then `~/.simplex-monitor/`, then `/etc/simplex-monitor/`.
fn find_config(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let mut candidates: Vec<PathBuf> = CONFIG_LOCATIONS.iter().map(PathBuf::from).collect();
    if let Some(home) = std::env::var_os("HOME") {
        candidates.push(Path::new(&home).join(".simplex-monitor/config.toml"));
    }
    candidates.push(PathBuf::from("/etc/simplex-monitor/config.toml"));
    candidates.into_iter().find(|p| p.exists())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            toml::from_str(&text).context("Failed to parse config file")
        }
        None => Ok(Config::default()),
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Apply `SIMPLEX_*` environment overrides.
fn apply_env(config: &mut Config) -> Result<()> {
    if let Some(port) = env_var("SIMPLEX_PORT") {
        config.serial.port = port;
    }
    if let Some(baud) = env_var("SIMPLEX_BAUDRATE") {
        config.serial.baudrate = baud.parse().context("Invalid SIMPLEX_BAUDRATE")?;
    }
    if let Some(interval) = env_var("SIMPLEX_POLL_INTERVAL") {
        config.monitor.poll_interval = interval.parse().context("Invalid SIMPLEX_POLL_INTERVAL")?;
    }
    if let Some(passcode) = env_var("SIMPLEX_PASSCODE") {
        config.panel.passcode = Some(passcode);
    }
    if let Some(level) = env_var("SIMPLEX_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(file) = env_var("SIMPLEX_LOG_FILE") {
        config.logging.file = Some(PathBuf::from(file));
    }
    if let Some(protocol) = env_var("SIMPLEX_PROTOCOL") {
        config.serial.protocol = protocol;
    }
    Ok(())
}

fn build_monitor_config(config: &Config) -> Result<MonitorConfig> {
    let passcode = config.panel.passcode.as_deref().context(
        "Panel passcode must be set in [panel] passcode or the SIMPLEX_PASSCODE environment variable",
    )?;
    let protocol: Protocol = config.serial.protocol.parse()?;
    let read_timeout = Duration::try_from_secs_f64(config.serial.timeout)
        .context("Invalid [serial] timeout")?;

    let mut builder = MonitorConfig::builder()
        .port(&config.serial.port)
        .baud_rate(config.serial.baudrate)
        .data_bits(DataBits::try_from(config.serial.data_bits)?)
        .stop_bits(StopBits::try_from(config.serial.stop_bits)?)
        .read_timeout(read_timeout)
        .protocol(protocol)
        .passcode(passcode)
        .poll_interval(Duration::from_secs(config.monitor.poll_interval))
        .retry_delay(Duration::from_secs(config.monitor.retry_delay))
        .max_retries(config.monitor.max_retries)
        .command_timeout(Duration::from_millis(config.monitor.command_timeout_ms))
        .list_timeout(Duration::from_millis(config.monitor.list_timeout_ms));
    if let Some(parity) = &config.serial.parity {
        builder = builder.parity(parity.parse::<Parity>()?);
    }
    Ok(builder.build())
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

fn init_logging(config: &LoggingToml) -> Result<()> {
    // RUST_LOG overrides the configured level (e.g. RUST_LOG=simplex_facp=trace).
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.level.to_lowercase()))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    // systemd journal already adds timestamps, so omit them when running under systemd
    let stdout_layer = if std::env::var_os("JOURNAL_STREAM").is_some() {
        fmt::layer().without_time().boxed()
    } else {
        fmt::layer().boxed()
    };

    let file_layer = match &config.file {
        Some(path) => {
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)).boxed())
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();
    Ok(())
}

// ---------------------------------------------------------------------------
// Running
// ---------------------------------------------------------------------------

/// Log in, run each command once and print its reply.
async fn exec_commands<L: PanelLink>(link: L, config: &MonitorConfig, commands: &[String]) -> Result<()> {
    let mut session = Session::new(link).with_timeouts(config.command_timeout, config.list_timeout);
    if !session.login(&config.passcode).await? {
        anyhow::bail!("Panel rejected the passcode");
    }

    for command in commands {
        let reply = session
            .command(command)
            .await
            .with_context(|| format!("Command {command} failed"))?;
        println!("{command}:\n{reply}\n");
    }

    if let Err(e) = session.logout().await {
        warn!("Logout failed: {e}");
    }
    Ok(())
}

async fn run_monitor<L: PanelLink>(
    link: L,
    config: &MonitorConfig,
    catalog: Option<PointCatalog>,
    export_dir: &Path,
) -> Result<()> {
    let mut sigterm = signal(SignalKind::terminate())?;
    let shutdown = async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("Received SIGINT, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    };
    monitor_until(link, config, catalog, export_dir, shutdown).await
}

/// Run the monitor until `shutdown` completes, then log out and export the
/// catalog if one was loaded.
async fn monitor_until<L, F>(
    link: L,
    config: &MonitorConfig,
    catalog: Option<PointCatalog>,
    export_dir: &Path,
    shutdown: F,
) -> Result<()>
where
    L: PanelLink,
    F: Future<Output = ()>,
{
    let mut monitor = Monitor::from_config(link, catalog, config);
    let handle = monitor.handle();
    let stopper = async move {
        shutdown.await;
        handle.stop();
    };

    // A stop is only noticed between polls, so keep driving the monitor
    // after the signal arrives.
    let mut sink = LogSink;
    let result = {
        let run = monitor.run(&mut sink);
        tokio::pin!(run);
        tokio::select! {
            result = &mut run => result,
            _ = stopper => run.await,
        }
    };

    monitor.close().await;

    if let Some(catalog) = monitor.directory() {
        if let Err(e) = catalog.export_to_dir(export_dir) {
            error!("Failed to export points: {e}");
        }
    }

    result?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = find_config(cli.config.as_deref());
    let mut config = load_config(config_path.as_deref())?;
    apply_env(&mut config)?;
    if let Some(protocol) = &cli.protocol {
        config.serial.protocol = protocol.clone();
    }

    init_logging(&config.logging)?;
    match &config_path {
        Some(path) => info!("Configuration loaded from {}", path.display()),
        None => info!("No config file found; using defaults and environment"),
    }

    let monitor_config = build_monitor_config(&config)?;
    info!(
        "Connecting to panel on {} at {} baud ({} protocol, parity {})",
        monitor_config.serial.port,
        monitor_config.serial.baud_rate,
        monitor_config.protocol,
        monitor_config.serial.parity
    );
    let port = monitor_config
        .serial
        .open()
        .with_context(|| format!("Failed to open serial port {}", monitor_config.serial.port))?;

    if !cli.exec.is_empty() {
        return match monitor_config.protocol {
            Protocol::Interactive => {
                exec_commands(InteractiveLink::new(port), &monitor_config, &cli.exec).await
            }
            Protocol::Framed => {
                let link = FramedLink::new(port, monitor_config.serial.read_timeout);
                exec_commands(link, &monitor_config, &cli.exec).await
            }
        };
    }

    let catalog = match &config.points.file {
        Some(file) => Some(
            PointCatalog::load(file)
                .with_context(|| format!("Failed to load points file {}", file.display()))?,
        ),
        None => {
            warn!("No points file configured; transitions will have no descriptions");
            None
        }
    };

    let export_dir = &config.points.export_dir;
    match monitor_config.protocol {
        Protocol::Interactive => {
            run_monitor(InteractiveLink::new(port), &monitor_config, catalog, export_dir).await?
        }
        Protocol::Framed => {
            let link = FramedLink::new(port, monitor_config.serial.read_timeout);
            run_monitor(link, &monitor_config, catalog, export_dir).await?
        }
    }

    info!("Shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    /// In-memory panel that grants any passcode and always lists the same
    /// points. Commands are shared so they can be checked after the monitor
    /// has consumed the link.
    struct StaticPanel {
        sent: Arc<Mutex<Vec<String>>>,
    }

    impl PanelLink for StaticPanel {
        async fn exchange(
            &mut self,
            command: &str,
            _reply_timeout: Duration,
        ) -> simplex_facp::Result<String> {
            self.sent.lock().unwrap().push(command.to_string());
            Ok(match command {
                "LOGIN" => "ENTER PASSCODE:".to_string(),
                "CLIST" => "CLIST\r\nA1 F1-\r\n-".to_string(),
                "LOGOUT" => "-".to_string(),
                _ => "ACCESS GRANTED\r\n-".to_string(),
            })
        }

        fn protocol(&self) -> Protocol {
            Protocol::Interactive
        }
    }

    #[tokio::test]
    async fn test_shutdown_logs_out_and_exports() {
        let dir = tempfile::tempdir().unwrap();
        let points = dir.path().join("points.csv");
        std::fs::write(&points, "A1,HW,T,LOBBY,FLOOR 1\n").unwrap();
        let catalog = PointCatalog::load(&points).unwrap();

        let config = MonitorConfig::builder()
            .passcode("1234")
            .poll_interval(Duration::from_millis(10))
            .build();
        let sent = Arc::new(Mutex::new(Vec::new()));
        let link = StaticPanel { sent: sent.clone() };
        let export_dir = dir.path().join("exports");

        let shutdown = tokio::time::sleep(Duration::from_millis(50));
        monitor_until(link, &config, Some(catalog), &export_dir, shutdown)
            .await
            .unwrap();

        let sent = sent.lock().unwrap();
        assert_eq!(sent.first().map(String::as_str), Some("LOGIN"));
        assert_eq!(sent.last().map(String::as_str), Some("LOGOUT"));
        assert!(sent.iter().any(|c| c == "CLIST"));

        let exported: Vec<_> = std::fs::read_dir(&export_dir).unwrap().collect();
        assert_eq!(exported.len(), 1);
        let written = std::fs::read_to_string(exported[0].as_ref().unwrap().path()).unwrap();
        assert!(written.contains("A1"), "{written}");
        assert!(written.contains("F1-"), "{written}");
    }

    #[test]
    fn test_config_defaults_from_empty_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.serial.baudrate, 19200);
        assert_eq!(config.serial.protocol, "interactive");
        assert_eq!(config.monitor.poll_interval, 60);
        assert_eq!(config.monitor.max_retries, 3);
        assert!(config.panel.passcode.is_none());
        assert_eq!(config.points.export_dir, PathBuf::from("data/exports"));
    }

    #[test]
    fn test_missing_passcode_is_an_error() {
        let config: Config = toml::from_str("").unwrap();
        assert!(build_monitor_config(&config).is_err());
    }

    #[test]
    fn test_build_monitor_config() {
        let config: Config = toml::from_str(
            r#"
            [serial]
            port = "/dev/ttyS1"
            baudrate = 9600
            protocol = "framed"
            timeout = 0.5

            [monitor]
            poll_interval = 15
            max_retries = 5

            [panel]
            passcode = "4321"

            [points]
            file = "data/points/points.csv"
            "#,
        )
        .unwrap();

        let mc = build_monitor_config(&config).unwrap();
        assert_eq!(mc.serial.port, "/dev/ttyS1");
        assert_eq!(mc.serial.baud_rate, 9600);
        assert_eq!(mc.protocol, Protocol::Framed);
        assert_eq!(mc.serial.parity, Parity::Even);
        assert_eq!(mc.serial.read_timeout, Duration::from_millis(500));
        assert_eq!(mc.poll_interval, Duration::from_secs(15));
        assert_eq!(mc.max_retries, 5);
        assert_eq!(mc.passcode.expose(), "4321");
        assert!(!format!("{:?}", config.panel).contains("4321"));
    }

    #[test]
    fn test_explicit_parity_wins() {
        let config: Config = toml::from_str(
            r#"
            [serial]
            protocol = "framed"
            parity = "none"
            [panel]
            passcode = "1"
            "#,
        )
        .unwrap();
        assert_eq!(build_monitor_config(&config).unwrap().serial.parity, Parity::None);
    }

    #[test]
    fn test_bad_protocol_rejected() {
        let config: Config = toml::from_str(
            r#"
            [serial]
            protocol = "modbus"
            [panel]
            passcode = "1"
            "#,
        )
        .unwrap();
        assert!(build_monitor_config(&config).is_err());
    }

    #[test]
    fn test_explicit_config_path_used_as_is() {
        let path = PathBuf::from("/nonexistent/simplex.toml");
        assert_eq!(find_config(Some(path.as_path())), Some(path.clone()));
        assert!(load_config(Some(path.as_path())).is_err());
    }
}
