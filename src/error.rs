use derive_more::From;
use thiserror::Error;

use crate::handlers::{BlitError, DimensionsError, FrameCodecError};
use crate::protocol::{OpenStep, TransferStage};

/// Errors returned while opening the photo frame.
#[derive(Debug, Error)]
pub enum OpenError {
    #[error("no photo frame with USB id {vendor_id:04x}:{product_id:04x} was found")]
    DeviceNotFound { vendor_id: u16, product_id: u16 },
    #[error("failed to {step}")]
    OpenFailure {
        step: OpenStep,
        #[source]
        source: rusb::Error,
    },
}

/// Errors returned by the bulk-only transport stages.
#[derive(Debug, Error)]
pub enum TransportError {
    /// A bulk OUT transfer failed or transferred fewer bytes than requested.
    #[error("failed to write {stage} stage: wrote {written} of {expected} bytes")]
    Write {
        stage: TransferStage,
        expected: usize,
        written: usize,
        #[source]
        source: Option<rusb::Error>,
    },
    /// A bulk IN transfer failed.
    #[error("failed to read {stage} stage")]
    Read {
        stage: TransferStage,
        #[source]
        source: rusb::Error,
    },
    /// The status envelope was too short to carry a signature.
    #[error("status envelope is too short: got {received} bytes")]
    ShortStatus { received: usize },
    /// The status envelope did not start with `USBS`.
    #[error("status envelope has invalid signature {}", hex::encode_upper(.signature))]
    BadStatusSignature { signature: [u8; 4] },
}

/// Errors returned when parsing fake backend fixtures.
#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("panel dimensions must look like `WIDTHxHEIGHT`, got `{value}`")]
    InvalidDimensions { value: String },
    #[error("panel dimensions must be non-zero 16-bit values")]
    InvalidDimensionValue(#[from] std::num::ParseIntError),
    #[error("fixture payload is not valid hexadecimal")]
    InvalidHex(#[from] hex::FromHexError),
}

/// Errors returned when validating runtime backend options.
#[derive(Debug, Error)]
pub(crate) enum CliConfigError {
    #[error("image `{path}` ({image_width}x{image_height} at {x},{y}) does not fit panel {panel}")]
    ImageOutsidePanel {
        path: String,
        image_width: u32,
        image_height: u32,
        x: u16,
        y: u16,
        panel: crate::hw::PanelDimensions,
    },
}

/// Errors returned by telemetry initialisation.
#[derive(Debug, Error)]
pub(crate) enum TelemetryError {
    #[error("failed to install tracing subscriber")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),
}

/// Top-level device errors wrapping module-specific error types.
#[derive(Debug, Error, From)]
pub enum DeviceError {
    #[error(transparent)]
    #[from(OpenError, Box<OpenError>)]
    Open(Box<OpenError>),
    #[error(transparent)]
    #[from(TransportError, Box<TransportError>)]
    Transport(Box<TransportError>),
    #[error(transparent)]
    #[from(FrameCodecError, Box<FrameCodecError>)]
    FrameCodec(Box<FrameCodecError>),
    #[error(transparent)]
    #[from(DimensionsError, Box<DimensionsError>)]
    Dimensions(Box<DimensionsError>),
    #[error(transparent)]
    #[from(BlitError, Box<BlitError>)]
    Blit(Box<BlitError>),
}
