mod rgb565_image;

pub use self::rgb565_image::{
    Point, RGB565_BYTES_PER_PIXEL, Rect, Rgb565, Rgb565Image, Rgb565ImageError,
};
