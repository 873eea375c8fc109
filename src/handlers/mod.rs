mod blit;
mod brightness;
mod dimensions;
mod frame_codec;
mod fullscreen_colour;

pub use self::blit::{BlitError, BlitHandler};
pub use self::brightness::{Brightness, BrightnessHandler};
pub use self::dimensions::{DimensionsError, DimensionsHandler};
pub use self::frame_codec::{Cdb, CommandFrame, FrameCodecError, StatusEnvelope};
pub use self::fullscreen_colour::FullscreenColourHandler;
