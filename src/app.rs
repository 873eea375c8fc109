use std::io;

use anyhow::Result;
use tracing::{instrument, warn};

use crate::cli::{Command, FakeArgs, LogLevel, OutputFormat};
use crate::hw::{
    DeviceSession, HardwareClient, TransportConfig,
    fake_hardware_client as build_fake_hardware_client,
    real_hardware_client as build_real_hardware_client,
};
use crate::telemetry;
use crate::terminal::{SystemTerminalClient, TerminalClient};

/// Creates a hardware client backed by libusb.
#[must_use]
pub fn real_hardware_client(config: TransportConfig) -> Box<dyn HardwareClient> {
    build_real_hardware_client(config)
}

/// Creates a hardware client backed by an in-memory photo frame.
///
/// ```
/// let fake = dpf::FakeArgs::builder().build();
/// let client = dpf::fake_hardware_client(fake, dpf::TransportConfig::default());
/// let _ = client;
/// ```
#[must_use]
pub fn fake_hardware_client(
    fake_args: FakeArgs,
    config: TransportConfig,
) -> Box<dyn HardwareClient> {
    let (backend, log) = fake_args.into_backend_config();
    build_fake_hardware_client(backend, config, log)
}

/// Session-level helper for acquiring exclusive access to a photo frame.
pub struct SessionHandler {
    hardware_client: Box<dyn HardwareClient>,
}

impl SessionHandler {
    /// Creates a session handler around a hardware client.
    #[must_use]
    pub fn new(hardware_client: Box<dyn HardwareClient>) -> Self {
        Self { hardware_client }
    }

    /// Opens the photo frame.
    ///
    /// ```
    /// let fake = dpf::FakeArgs::builder().build();
    /// let client = dpf::fake_hardware_client(fake, dpf::TransportConfig::default());
    /// let session = dpf::SessionHandler::new(client).open()?;
    /// session.close();
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error if the device is missing or any open step fails.
    #[instrument(skip(self), level = "info")]
    pub fn open(self) -> Result<DeviceSession> {
        self.hardware_client.open().map_err(|error| {
            warn!(%error, "failed to open photo frame");
            error.into()
        })
    }
}

/// Runs a CLI command against the given hardware client.
///
/// ```
/// use clap::Parser;
///
/// let args = dpf::Args::try_parse_from(["dpf", "--fake", "dimensions"])?;
/// let transport = args.transport_config();
/// let (command, maybe_fake_args) = args.into_command_and_fake_args();
/// let hardware_client = match maybe_fake_args {
///     Some(fake_args) => dpf::fake_hardware_client(fake_args, transport),
///     None => dpf::real_hardware_client(transport),
/// };
/// let mut out = Vec::new();
/// dpf::run(command, &mut out, hardware_client, dpf::OutputFormat::Json)?;
/// # Ok::<(), anyhow::Error>(())
/// ```
///
/// # Errors
///
/// Returns an error if tracing initialisation fails, USB interaction fails, or
/// output writing fails.
pub fn run<W>(
    command: Command,
    out: &mut W,
    hardware_client: Box<dyn HardwareClient>,
    output_format: OutputFormat,
) -> Result<()>
where
    W: io::Write,
{
    run_with_log_level(command, out, hardware_client, None, output_format)
}

/// Runs a CLI command with an explicit telemetry log-level override.
///
/// # Errors
///
/// Returns an error if tracing initialisation fails, USB interaction fails, or
/// output writing fails.
pub fn run_with_log_level<W>(
    command: Command,
    out: &mut W,
    hardware_client: Box<dyn HardwareClient>,
    log_level: Option<LogLevel>,
    output_format: OutputFormat,
) -> Result<()>
where
    W: io::Write,
{
    run_with_clients_and_log_level(
        command,
        out,
        &SystemTerminalClient,
        hardware_client,
        log_level,
        output_format,
    )
}

/// Runs a CLI command with injected clients.
///
/// # Errors
///
/// Returns an error if tracing initialisation fails, USB interaction fails, or
/// output writing fails.
pub fn run_with_clients<W>(
    command: Command,
    out: &mut W,
    terminal_client: &dyn TerminalClient,
    hardware_client: Box<dyn HardwareClient>,
    output_format: OutputFormat,
) -> Result<()>
where
    W: io::Write,
{
    run_with_clients_and_log_level(
        command,
        out,
        terminal_client,
        hardware_client,
        None,
        output_format,
    )
}

/// Runs a CLI command with injected clients and explicit telemetry settings.
///
/// ```
/// use clap::Parser;
///
/// struct FakeTerminal;
/// impl dpf::TerminalClient for FakeTerminal {
///     fn stdout_is_terminal(&self) -> bool { false }
///     fn stderr_is_terminal(&self) -> bool { false }
/// }
///
/// let args = dpf::Args::try_parse_from([
///     "dpf",
///     "--log-level",
///     "trace",
///     "--fake",
///     "brightness",
///     "3",
/// ])?;
/// let log_level = args.log_level();
/// let transport = args.transport_config();
/// let (command, maybe_fake_args) = args.into_command_and_fake_args();
/// let hardware_client = match maybe_fake_args {
///     Some(fake_args) => dpf::fake_hardware_client(fake_args, transport),
///     None => dpf::real_hardware_client(transport),
/// };
/// let mut out = Vec::new();
/// dpf::run_with_clients_and_log_level(
///     command,
///     &mut out,
///     &FakeTerminal,
///     hardware_client,
///     log_level,
///     dpf::OutputFormat::Pretty,
/// )?;
/// assert_eq!("Applied brightness: 3\n", String::from_utf8(out)?);
/// # Ok::<(), anyhow::Error>(())
/// ```
///
/// # Errors
///
/// Returns an error if tracing initialisation fails, USB interaction fails, or
/// output writing fails.
#[instrument(
    skip(out, terminal_client, hardware_client),
    level = "info",
    fields(command = %command_name(&command), ?log_level)
)]
pub fn run_with_clients_and_log_level<W>(
    command: Command,
    out: &mut W,
    terminal_client: &dyn TerminalClient,
    hardware_client: Box<dyn HardwareClient>,
    log_level: Option<LogLevel>,
    output_format: OutputFormat,
) -> Result<()>
where
    W: io::Write,
{
    telemetry::initialise_tracing(
        "dpf",
        terminal_client.stderr_is_terminal(),
        log_level.map(LogLevel::as_level_filter),
    )?;

    crate::cli::control::run(
        hardware_client,
        &command,
        out,
        output_format,
        terminal_client,
    )
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Dimensions => "dimensions",
        Command::Brightness(_args) => "brightness",
        Command::Fill(_args) => "fill",
        Command::Blit(_args) => "blit",
    }
}
