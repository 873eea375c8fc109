use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::instrument;

use crate::cli::{Command, OutputFormat};
use crate::error::CliConfigError;
use crate::hw::{DeviceSession, HardwareClient, PanelDimensions};
use crate::media::{Point, Rgb565, Rgb565Image};
use crate::terminal::TerminalClient;
use crate::{
    BlitHandler, Brightness, BrightnessHandler, DimensionsHandler, FullscreenColourHandler,
    SessionHandler,
};

/// JSON result emitted by one command.
#[derive(Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum ControlResult {
    Dimensions {
        width: u16,
        height: u16,
    },
    Brightness {
        requested: i64,
        applied: u8,
    },
    Fill {
        red: u8,
        green: u8,
        blue: u8,
        width: u16,
        height: u16,
    },
    Blit {
        x: u16,
        y: u16,
        width: u16,
        height: u16,
        bytes_written: usize,
    },
}

/// Arguments for `brightness`.
#[derive(Debug, Args)]
pub struct BrightnessArgs {
    /// Backlight level; values outside 0..=7 are clamped.
    #[arg(allow_negative_numbers = true)]
    level: i64,
}

impl BrightnessArgs {
    /// Creates brightness arguments.
    ///
    /// ```
    /// use dpf::BrightnessArgs;
    ///
    /// let args = BrightnessArgs::new(9);
    /// assert_eq!(7, args.brightness().value());
    /// ```
    #[must_use]
    pub fn new(level: i64) -> Self {
        Self { level }
    }

    /// Returns the clamped brightness.
    #[must_use]
    pub fn brightness(&self) -> Brightness {
        Brightness::clamped(self.level)
    }
}

/// Arguments for `fill`.
#[derive(Debug, Args)]
pub struct ColourArgs {
    red: u8,
    green: u8,
    blue: u8,
}

impl ColourArgs {
    /// Creates colour arguments.
    #[must_use]
    pub fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }
}

/// Arguments for `blit`.
#[derive(Debug, Args)]
pub struct BlitArgs {
    /// Image file to decode and blit.
    image_file: PathBuf,
    /// Left edge of the image on the panel.
    #[arg(long, default_value_t = 0)]
    x: u16,
    /// Top edge of the image on the panel.
    #[arg(long, default_value_t = 0)]
    y: u16,
}

impl BlitArgs {
    /// Creates blit arguments.
    ///
    /// ```
    /// use std::path::Path;
    ///
    /// use dpf::BlitArgs;
    ///
    /// let args = BlitArgs::new("photo.png", 10, 20);
    /// assert_eq!(Path::new("photo.png"), args.path());
    /// ```
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, x: u16, y: u16) -> Self {
        Self {
            image_file: path.into(),
            x,
            y,
        }
    }

    /// Returns the selected image path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.image_file
    }
}

/// Opens the frame, executes one command and always closes the session.
#[instrument(skip(client, command, out, terminal_client), level = "info", fields(?output_format))]
pub(crate) fn run<W>(
    client: Box<dyn HardwareClient>,
    command: &Command,
    out: &mut W,
    output_format: OutputFormat,
    terminal_client: &dyn TerminalClient,
) -> Result<()>
where
    W: io::Write,
{
    let mut session = SessionHandler::new(client).open()?;
    let command_result = run_with_session(&mut session, command);
    session.close();

    let result = command_result?;
    write_result(out, output_format, &result, terminal_client.stdout_is_terminal())
}

#[instrument(skip(session, command), level = "debug")]
fn run_with_session(session: &mut DeviceSession, command: &Command) -> Result<ControlResult> {
    let result = match command {
        Command::Dimensions => {
            let dimensions = DimensionsHandler::get_dimensions(session)?;
            ControlResult::Dimensions {
                width: dimensions.width(),
                height: dimensions.height(),
            }
        }
        Command::Brightness(args) => {
            let brightness = args.brightness();
            BrightnessHandler::set_brightness(session, brightness)?;
            ControlResult::Brightness {
                requested: args.level,
                applied: brightness.value(),
            }
        }
        Command::Fill(args) => {
            let dimensions = DimensionsHandler::get_dimensions(session)?;
            let colour = Rgb565::from_rgb(args.red, args.green, args.blue);
            FullscreenColourHandler::fill(session, dimensions, colour)?;
            ControlResult::Fill {
                red: args.red,
                green: args.green,
                blue: args.blue,
                width: dimensions.width(),
                height: dimensions.height(),
            }
        }
        Command::Blit(args) => {
            let dimensions = DimensionsHandler::get_dimensions(session)?;
            let image = load_image(args, dimensions)?;
            BlitHandler::blit(session, &image)?;
            let rect = image.rect();
            ControlResult::Blit {
                x: rect.min.x,
                y: rect.min.y,
                width: rect.width(),
                height: rect.height(),
                bytes_written: image.pixels().len(),
            }
        }
    };
    Ok(result)
}

fn load_image(args: &BlitArgs, panel: PanelDimensions) -> Result<Rgb565Image> {
    let path = args.path();
    let source = image::open(path)
        .with_context(|| format!("failed to decode image `{}`", path.display()))?
        .to_rgb8();
    let (image_width, image_height) = source.dimensions();

    let fits_horizontally = u32::from(args.x) + image_width <= u32::from(panel.width());
    let fits_vertically = u32::from(args.y) + image_height <= u32::from(panel.height());
    if !(fits_horizontally && fits_vertically) {
        return Err(CliConfigError::ImageOutsidePanel {
            path: path.display().to_string(),
            image_width,
            image_height,
            x: args.x,
            y: args.y,
            panel,
        }
        .into());
    }

    Ok(Rgb565Image::from_rgb_image(&source, Point::new(args.x, args.y))?)
}

fn write_result(
    out: &mut impl io::Write,
    output_format: OutputFormat,
    result: &ControlResult,
    styled: bool,
) -> Result<()> {
    match output_format {
        OutputFormat::Pretty => write_pretty(out, result, styled),
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, result)?;
            writeln!(out)?;
            Ok(())
        }
    }
}

fn write_pretty(out: &mut impl io::Write, result: &ControlResult, styled: bool) -> Result<()> {
    if styled {
        write!(out, "{} ", "✓".green())?;
    }
    match result {
        ControlResult::Dimensions { width, height } => {
            writeln!(out, "Panel dimensions: {width}x{height}")?;
        }
        ControlResult::Brightness { requested, applied } => {
            if i64::from(*applied) == *requested {
                writeln!(out, "Applied brightness: {applied}")?;
            } else {
                writeln!(out, "Applied brightness: {applied} (clamped from {requested})")?;
            }
        }
        ControlResult::Fill {
            red,
            green,
            blue,
            width,
            height,
        } => {
            writeln!(
                out,
                "Filled {width}x{height} panel with #{red:02X}{green:02X}{blue:02X}"
            )?;
        }
        ControlResult::Blit {
            x,
            y,
            width,
            height,
            bytes_written,
        } => {
            writeln!(
                out,
                "Blitted {width}x{height} image at ({x},{y}): {bytes_written} bytes"
            )?;
        }
    }
    Ok(())
}
