mod app;
mod cli;
mod error;
mod handlers;
mod hw;
mod media;
mod protocol;
mod telemetry;
mod terminal;
mod utils;

pub use app::{
    SessionHandler, fake_hardware_client, real_hardware_client, run, run_with_clients,
    run_with_clients_and_log_level, run_with_log_level,
};
pub use cli::{
    Args, BlitArgs, BrightnessArgs, ColourArgs, Command, FakeArgs, LogLevel, OutputFormat,
};
pub use error::{DeviceError, FixtureError, OpenError, TransportError};
pub use handlers::{
    BlitError, BlitHandler, Brightness, BrightnessHandler, Cdb, CommandFrame, DimensionsError,
    DimensionsHandler, FrameCodecError, FullscreenColourHandler, StatusEnvelope,
};
pub use hw::{
    BulkTransport, DeviceSession, FakeInResponse, FakeOutResponse, HardwareClient,
    PanelDimensions, ReadCompletion, TrafficLog, Transfer, TransportConfig,
};
pub use media::{Point, RGB565_BYTES_PER_PIXEL, Rect, Rgb565, Rgb565Image, Rgb565ImageError};
pub use protocol::{DPF_PRODUCT_ID, DPF_VENDOR_ID, Direction, OpenStep, TransferStage};
pub use terminal::TerminalClient;
