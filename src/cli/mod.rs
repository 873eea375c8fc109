pub(crate) mod command;
pub(crate) mod control;

pub use self::command::{Args, Command, FakeArgs, LogLevel, OutputFormat};
pub use self::control::{BlitArgs, BrightnessArgs, ColourArgs};
