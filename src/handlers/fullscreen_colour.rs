use tracing::instrument;

use crate::error::DeviceError;
use crate::hw::{DeviceSession, PanelDimensions};
use crate::media::{Point, Rect, Rgb565, Rgb565Image};

use super::BlitHandler;

/// Handler for full-screen colour fills.
pub struct FullscreenColourHandler;

impl FullscreenColourHandler {
    fn image_for(dimensions: PanelDimensions, colour: Rgb565) -> Rgb565Image {
        let rect = Rect::new(
            Point::default(),
            Point::new(dimensions.width(), dimensions.height()),
        );
        Rgb565Image::filled(rect, colour)
    }

    /// Fills the whole panel with one colour.
    ///
    /// ```no_run
    /// # fn demo(session: &mut dpf::DeviceSession) -> Result<(), dpf::DeviceError> {
    /// use dpf::{DimensionsHandler, FullscreenColourHandler, Rgb565};
    ///
    /// let dimensions = DimensionsHandler::get_dimensions(session)?;
    /// FullscreenColourHandler::fill(session, dimensions, Rgb565::from_rgb(0, 0, 0))?;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error when the blit fails.
    #[instrument(skip(session), level = "info", fields(%dimensions))]
    pub fn fill(
        session: &mut DeviceSession,
        dimensions: PanelDimensions,
        colour: Rgb565,
    ) -> Result<(), DeviceError> {
        BlitHandler::blit(session, &Self::image_for(dimensions, colour))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn image_for_covers_whole_panel() {
        let dimensions = PanelDimensions::new(4, 3).expect("4x3 should be valid");
        let image = FullscreenColourHandler::image_for(dimensions, Rgb565::from_rgb(0, 0, 0xFF));

        assert_eq!(
            Rect::new(Point::new(0, 0), Point::new(4, 3)),
            image.rect()
        );
        assert_eq!(24, image.pixels().len());
        assert!(image.pixels().chunks(2).all(|pixel| pixel == [0x00, 0x1F]));
    }
}
