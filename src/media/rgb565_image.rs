use image::RgbImage;
use thiserror::Error;

/// Bytes per RGB565 pixel.
pub const RGB565_BYTES_PER_PIXEL: usize = 2;

/// Errors returned when building an RGB565 image.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum Rgb565ImageError {
    /// The pixel buffer does not cover the rectangle exactly.
    #[error("rgb565 buffer for {rect} must be {expected_len} bytes, got {actual_len}")]
    LengthMismatch {
        rect: Rect,
        expected_len: usize,
        actual_len: usize,
    },
    /// The source image does not fit in 16-bit panel coordinates.
    #[error("image of {width}x{height} at {origin} exceeds 16-bit panel coordinates")]
    OutOfRange {
        origin: Point,
        width: u32,
        height: u32,
    },
}

/// Pixel coordinate on the panel.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Default, derive_more::Display)]
#[display("({x},{y})")]
pub struct Point {
    pub x: u16,
    pub y: u16,
}

impl Point {
    /// Creates a point.
    #[must_use]
    pub const fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }
}

/// Half-open rectangle: `min` is inclusive, `max` is exclusive.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, derive_more::Display)]
#[display("[{min}, {max})")]
pub struct Rect {
    pub min: Point,
    pub max: Point,
}

impl Rect {
    /// Creates a rectangle from its inclusive minimum and exclusive maximum.
    #[must_use]
    pub const fn new(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    /// Returns the width in pixels, zero when `max.x <= min.x`.
    #[must_use]
    pub const fn width(&self) -> u16 {
        self.max.x.saturating_sub(self.min.x)
    }

    /// Returns the height in pixels, zero when `max.y <= min.y`.
    #[must_use]
    pub const fn height(&self) -> u16 {
        self.max.y.saturating_sub(self.min.y)
    }

    /// Returns `true` when the rectangle covers no pixels.
    ///
    /// ```
    /// use dpf::{Point, Rect};
    ///
    /// assert!(Rect::new(Point::new(4, 4), Point::new(4, 8)).is_empty());
    /// assert!(!Rect::new(Point::new(0, 0), Point::new(1, 1)).is_empty());
    /// ```
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    fn pixel_bytes(&self) -> usize {
        usize::from(self.width()) * usize::from(self.height()) * RGB565_BYTES_PER_PIXEL
    }
}

/// 16-bit colour with 5 bits red, 6 bits green, 5 bits blue.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, derive_more::From, derive_more::Into)]
pub struct Rgb565(u16);

impl Rgb565 {
    /// Packs an 8-bit-per-channel colour.
    ///
    /// ```
    /// use dpf::Rgb565;
    ///
    /// assert_eq!(0xF800, u16::from(Rgb565::from_rgb(0xFF, 0x00, 0x00)));
    /// assert_eq!(0x07E0, u16::from(Rgb565::from_rgb(0x00, 0xFF, 0x00)));
    /// assert_eq!(0x001F, u16::from(Rgb565::from_rgb(0x00, 0x00, 0xFF)));
    /// ```
    #[must_use]
    pub const fn from_rgb(red: u8, green: u8, blue: u8) -> Self {
        let red = (red as u16 >> 3) << 11;
        let green = (green as u16 >> 2) << 5;
        let blue = blue as u16 >> 3;
        Self(red | green | blue)
    }

    /// Returns the two bytes the frame expects on the wire, high byte first.
    #[must_use]
    pub const fn to_wire(self) -> [u8; 2] {
        self.0.to_be_bytes()
    }
}

/// RGB565 pixels covering one rectangle of the panel.
///
/// Pixels are stored row-major, two bytes each, high byte first.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Rgb565Image {
    rect: Rect,
    pixels: Vec<u8>,
}

impl Rgb565Image {
    /// Creates an image from pre-encoded pixel bytes.
    ///
    /// # Errors
    ///
    /// Returns an error when `pixels` does not hold exactly
    /// `width * height * 2` bytes.
    pub fn new(rect: Rect, pixels: Vec<u8>) -> Result<Self, Rgb565ImageError> {
        let expected_len = rect.pixel_bytes();
        if pixels.len() != expected_len {
            return Err(Rgb565ImageError::LengthMismatch {
                rect,
                expected_len,
                actual_len: pixels.len(),
            });
        }
        Ok(Self { rect, pixels })
    }

    /// Creates a single-colour image covering `rect`.
    ///
    /// ```
    /// use dpf::{Point, Rect, Rgb565, Rgb565Image};
    ///
    /// let rect = Rect::new(Point::new(0, 0), Point::new(2, 1));
    /// let image = Rgb565Image::filled(rect, Rgb565::from_rgb(0xFF, 0x00, 0x00));
    /// assert_eq!(&[0xF8, 0x00, 0xF8, 0x00], image.pixels());
    /// ```
    #[must_use]
    pub fn filled(rect: Rect, colour: Rgb565) -> Self {
        let pixel_count = rect.pixel_bytes() / RGB565_BYTES_PER_PIXEL;
        let pixels = colour.to_wire().repeat(pixel_count);
        Self { rect, pixels }
    }

    /// Converts an 8-bit RGB image placed with its top-left corner at `origin`.
    ///
    /// # Errors
    ///
    /// Returns an error when the placed image extends past 16-bit coordinates.
    pub fn from_rgb_image(source: &RgbImage, origin: Point) -> Result<Self, Rgb565ImageError> {
        let (width, height) = source.dimensions();
        let out_of_range = || Rgb565ImageError::OutOfRange {
            origin,
            width,
            height,
        };
        let max_x = u32::from(origin.x)
            .checked_add(width)
            .and_then(|value| u16::try_from(value).ok())
            .ok_or_else(out_of_range)?;
        let max_y = u32::from(origin.y)
            .checked_add(height)
            .and_then(|value| u16::try_from(value).ok())
            .ok_or_else(out_of_range)?;

        let pixels = source
            .pixels()
            .flat_map(|pixel| {
                let [red, green, blue] = pixel.0;
                Rgb565::from_rgb(red, green, blue).to_wire()
            })
            .collect();
        Self::new(Rect::new(origin, Point::new(max_x, max_y)), pixels)
    }

    /// Returns the covered rectangle.
    #[must_use]
    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Returns the encoded pixel bytes.
    #[must_use]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}
