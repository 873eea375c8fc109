use std::time::Duration;

use bon::Builder;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::filter::LevelFilter;

use crate::cli::control::{BlitArgs, BrightnessArgs, ColourArgs};
use crate::error::FixtureError;
use crate::hw::{
    DimensionsFixture, FakeBackendConfig, FakeInResponse, FakeOutResponse, InResponsesFixture,
    PanelDimensions, TrafficLog, TransportConfig,
};

/// Command-line options for the photo frame tool.
#[derive(Debug, Parser)]
#[command(name = "dpf", about = "Drive hacked AX206 USB photo frames.")]
pub struct Args {
    /// Log level override; defaults to `RUST_LOG` or `warn`.
    #[arg(long, global = true, value_enum)]
    log_level: Option<LogLevel>,
    /// Output format; defaults to pretty on a terminal and JSON otherwise.
    #[arg(long, global = true, value_enum)]
    output: Option<OutputFormat>,
    /// Timeout for each USB bulk transfer (e.g. `500ms`, `2s`).
    #[arg(long, global = true, default_value = "1s", value_parser = parse_duration)]
    timeout: Duration,
    /// Uses an in-memory photo frame instead of USB hardware.
    #[arg(long, global = true)]
    fake: bool,
    /// Panel size reported by the fake frame, as `WIDTHxHEIGHT`.
    #[arg(long, global = true, requires = "fake")]
    fake_dimensions: Option<DimensionsFixture>,
    /// Raw IN responses returned by the fake frame before its own, as
    /// comma-separated hexadecimal payloads.
    #[arg(long, global = true, requires = "fake")]
    fake_in: Option<InResponsesFixture>,
    #[arg(skip)]
    pending_fake: Option<FakeArgs>,
    #[command(subcommand)]
    command: Command,
}

impl Args {
    /// Creates argument values directly without CLI parsing.
    ///
    /// ```
    /// use dpf::{Args, Command};
    ///
    /// let args = Args::new(Command::Dimensions);
    /// let _ = args;
    /// ```
    #[must_use]
    pub fn new(command: Command) -> Self {
        Self {
            log_level: None,
            output: None,
            timeout: TransportConfig::default().timeout(),
            fake: false,
            fake_dimensions: None,
            fake_in: None,
            pending_fake: None,
            command,
        }
    }

    /// Enables fake backend mode with pre-built fake configuration.
    #[must_use]
    pub fn with_fake(mut self, fake: FakeArgs) -> Self {
        self.fake = true;
        self.pending_fake = Some(fake);
        self
    }

    /// Returns the requested log level override.
    #[must_use]
    pub fn log_level(&self) -> Option<LogLevel> {
        self.log_level
    }

    /// Returns the requested output format.
    #[must_use]
    pub fn output_format(&self) -> Option<OutputFormat> {
        self.output
    }

    /// Returns transport settings derived from the arguments.
    #[must_use]
    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig::builder().timeout(self.timeout).build()
    }

    /// Splits parsed CLI arguments into command and optional fake-client settings.
    #[must_use]
    pub fn into_command_and_fake_args(self) -> (Command, Option<FakeArgs>) {
        let Args {
            fake,
            fake_dimensions,
            fake_in,
            pending_fake,
            command,
            ..
        } = self;

        if let Some(fake_args) = pending_fake {
            return (command, Some(fake_args));
        }
        let fake_args = fake.then(|| FakeArgs {
            dimensions: fake_dimensions.map(PanelDimensions::from),
            in_responses: fake_in.map(Vec::from).unwrap_or_default(),
            out_responses: Vec::new(),
            traffic_log: TrafficLog::default(),
        });

        (command, fake_args)
    }
}

/// Fake backend arguments for programmatic runs.
///
/// ```
/// let log = dpf::TrafficLog::default();
/// let fake = dpf::FakeArgs::builder()
///     .dimensions("320x240")?
///     .traffic_log(log.clone())
///     .build();
/// let _ = fake;
/// # Ok::<(), dpf::FixtureError>(())
/// ```
#[derive(Debug, Builder)]
pub struct FakeArgs {
    #[builder(with = |value: &str| -> std::result::Result<_, FixtureError> {
        value.parse::<DimensionsFixture>().map(PanelDimensions::from)
    })]
    dimensions: Option<PanelDimensions>,
    #[builder(default)]
    in_responses: Vec<FakeInResponse>,
    #[builder(default)]
    out_responses: Vec<FakeOutResponse>,
    #[builder(default)]
    traffic_log: TrafficLog,
}

impl FakeArgs {
    pub(crate) fn into_backend_config(self) -> (FakeBackendConfig, TrafficLog) {
        let Self {
            dimensions,
            in_responses,
            out_responses,
            traffic_log,
        } = self;

        let config = FakeBackendConfig::builder()
            .maybe_dimensions(dimensions)
            .in_responses(in_responses)
            .out_responses(out_responses)
            .build();
        (config, traffic_log)
    }
}

/// Supported CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Query the panel size.
    Dimensions,
    /// Set the backlight level (0..=7); out-of-range values are clamped.
    Brightness(BrightnessArgs),
    /// Fill the whole panel with one RGB colour.
    Fill(ColourArgs),
    /// Decode an image file and blit it at an offset.
    Blit(BlitArgs),
}

/// Log level override for telemetry.
#[derive(Debug, Clone, Copy, Eq, PartialEq, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub(crate) fn as_level_filter(self) -> LevelFilter {
        match self {
            Self::Off => LevelFilter::OFF,
            Self::Error => LevelFilter::ERROR,
            Self::Warn => LevelFilter::WARN,
            Self::Info => LevelFilter::INFO,
            Self::Debug => LevelFilter::DEBUG,
            Self::Trace => LevelFilter::TRACE,
        }
    }
}

/// Output rendering for command results.
#[derive(Debug, Clone, Copy, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable lines.
    Pretty,
    /// One JSON document per result.
    Json,
}

fn parse_duration(value: &str) -> Result<Duration, String> {
    humantime::parse_duration(value).map_err(|error| error.to_string())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use clap::error::ErrorKind;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn fake_fixture_flags_require_fake_mode() {
        let result = Args::try_parse_from(["dpf", "--fake-dimensions", "320x240", "dimensions"]);

        let error = result.expect_err("fake fixture flags should require --fake");
        assert_eq!(ErrorKind::MissingRequiredArgument, error.kind());
    }

    #[test]
    fn fake_mode_builds_fake_settings() {
        let cli = Args::try_parse_from([
            "dpf",
            "--fake",
            "--fake-dimensions",
            "128x128",
            "--fake-in",
            "80008000FF",
            "dimensions",
        ])
        .expect("valid fake arguments should parse");

        let (command, fake_args) = cli.into_command_and_fake_args();
        assert_matches!(command, Command::Dimensions);
        let fake_args = fake_args.expect("fake mode should produce fake settings");
        assert_eq!(PanelDimensions::new(128, 128), fake_args.dimensions);
        assert_eq!(1, fake_args.in_responses.len());
    }

    #[test]
    fn invalid_fake_dimensions_fail_parsing() {
        let result =
            Args::try_parse_from(["dpf", "--fake", "--fake-dimensions", "wide", "dimensions"]);

        let error = result.expect_err("malformed dimensions should fail parsing");
        assert_eq!(ErrorKind::ValueValidation, error.kind());
    }

    #[test]
    fn timeout_accepts_humantime_values() {
        let cli = Args::try_parse_from(["dpf", "--timeout", "250ms", "dimensions"])
            .expect("timeout should parse");
        assert_eq!(Duration::from_millis(250), cli.transport_config().timeout());
    }

    #[test]
    fn without_fake_flag_no_fake_settings_are_built() {
        let cli = Args::try_parse_from(["dpf", "dimensions"]).expect("plain command should parse");
        let (_command, fake_args) = cli.into_command_and_fake_args();
        assert_matches!(fake_args, None);
    }
}
