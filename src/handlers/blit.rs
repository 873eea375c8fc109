use thiserror::Error;
use tracing::instrument;

use crate::error::DeviceError;
use crate::hw::DeviceSession;
use crate::media::{Rect, Rgb565Image};
use crate::protocol::SUBCOMMAND_BLIT;

use super::Cdb;

/// Errors returned before a blit reaches the device.
#[derive(Debug, Error, Clone, Copy, Eq, PartialEq)]
pub enum BlitError {
    /// The rectangle covers no pixels.
    #[error("invalid argument: blit rectangle {rect} is empty")]
    InvalidArgument { rect: Rect },
}

/// Handler for rectangle blits.
pub struct BlitHandler;

impl BlitHandler {
    /// Returns the blit CDB for a half-open rectangle.
    ///
    /// The device expects inclusive maximum coordinates.
    ///
    /// ```
    /// use dpf::{BlitHandler, Point, Rect};
    ///
    /// let rect = Rect::new(Point::new(0, 0), Point::new(320, 240));
    /// let cdb = BlitHandler::cdb_for(rect)?;
    /// assert_eq!(&[0x3F, 0x01, 0xEF, 0x00], &cdb.as_bytes()[11..15]);
    /// # Ok::<(), dpf::BlitError>(())
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`BlitError::InvalidArgument`] when the rectangle is empty.
    pub fn cdb_for(rect: Rect) -> Result<Cdb, BlitError> {
        if rect.is_empty() {
            return Err(BlitError::InvalidArgument { rect });
        }

        Ok(Cdb::passthrough()
            .with_byte(5, 0x06)
            .with_byte(6, SUBCOMMAND_BLIT)
            .with_u16_le(7, rect.min.x)
            .with_u16_le(9, rect.min.y)
            .with_u16_le(11, rect.max.x - 1)
            .with_u16_le(13, rect.max.y - 1))
    }

    /// Transfers the image's pixels into its rectangle on the panel.
    ///
    /// ```no_run
    /// # fn demo(session: &mut dpf::DeviceSession) -> Result<(), dpf::DeviceError> {
    /// use dpf::{BlitHandler, Point, Rect, Rgb565, Rgb565Image};
    ///
    /// let rect = Rect::new(Point::new(10, 10), Point::new(20, 20));
    /// let image = Rgb565Image::filled(rect, Rgb565::from_rgb(0x00, 0x80, 0xFF));
    /// BlitHandler::blit(session, &image)?;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`BlitError::InvalidArgument`] for an empty rectangle before
    /// any transfer, or a transport error when any stage fails.
    #[instrument(
        skip(session, image),
        level = "info",
        fields(rect = %image.rect(), bytes = image.pixels().len())
    )]
    pub fn blit(session: &mut DeviceSession, image: &Rgb565Image) -> Result<(), DeviceError> {
        let cdb = Self::cdb_for(image.rect())?;
        session.write_command(cdb.as_bytes(), Some(image.pixels()))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::media::Point;

    #[test]
    fn cdb_for_encodes_inclusive_maximum() {
        let rect = Rect::new(Point::new(0x0102, 0x0304), Point::new(0x0506, 0x0708));
        let cdb = BlitHandler::cdb_for(rect).expect("non-empty rectangle should encode");

        assert_eq!(
            &[
                0xCD, 0x00, 0x00, 0x00, 0x00, 0x06, 0x12, 0x02, 0x01, 0x04, 0x03, 0x05, 0x05, 0x07,
                0x07, 0x00
            ],
            cdb.as_bytes()
        );
    }

    #[test]
    fn cdb_for_single_pixel_uses_same_min_and_max() {
        let rect = Rect::new(Point::new(5, 9), Point::new(6, 10));
        let cdb = BlitHandler::cdb_for(rect).expect("1x1 rectangle should encode");
        assert_eq!(&[5, 0, 9, 0, 5, 0, 9, 0], &cdb.as_bytes()[7..15]);
    }

    #[rstest]
    #[case(Rect::new(Point::new(4, 0), Point::new(4, 10)))]
    #[case(Rect::new(Point::new(9, 0), Point::new(4, 10)))]
    #[case(Rect::new(Point::new(0, 10), Point::new(4, 10)))]
    #[case(Rect::new(Point::new(0, 0), Point::new(0, 0)))]
    fn cdb_for_rejects_empty_rectangles(#[case] rect: Rect) {
        assert_matches!(
            BlitHandler::cdb_for(rect),
            Err(BlitError::InvalidArgument { rect: rejected }) if rejected == rect
        );
    }
}
