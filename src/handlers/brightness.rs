use tracing::instrument;

use crate::error::DeviceError;
use crate::hw::DeviceSession;
use crate::protocol::{PROPERTY_BRIGHTNESS, SUBCOMMAND_SET_PROPERTY};

use super::Cdb;

const MIN_BRIGHTNESS: u8 = 0;
const MAX_BRIGHTNESS: u8 = 7;

/// Backlight level in the inclusive range `0..=7`.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Brightness(u8);

impl Brightness {
    /// Creates a brightness level, clamping out-of-range values.
    ///
    /// Values outside `0..=7` may address a different property on the
    /// device, so they are corrected rather than rejected.
    ///
    /// ```
    /// use dpf::Brightness;
    ///
    /// assert_eq!(7, Brightness::clamped(9).value());
    /// assert_eq!(0, Brightness::clamped(-3).value());
    /// assert_eq!(4, Brightness::clamped(4).value());
    /// ```
    #[must_use]
    pub fn clamped(level: i64) -> Self {
        let level = level.clamp(i64::from(MIN_BRIGHTNESS), i64::from(MAX_BRIGHTNESS));
        Self(u8::try_from(level).unwrap_or(MAX_BRIGHTNESS))
    }

    /// Returns the level.
    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }
}

/// Handler for brightness commands.
pub struct BrightnessHandler;

impl BrightnessHandler {
    /// Returns the set-property CDB for `brightness`.
    ///
    /// ```
    /// use dpf::{Brightness, BrightnessHandler};
    ///
    /// let cdb = BrightnessHandler::cdb_for(Brightness::clamped(5));
    /// assert_eq!(&[0xCD, 0, 0, 0, 0, 6, 0x01, 0x01, 0x00, 0x05, 0x00], &cdb.as_bytes()[..11]);
    /// ```
    #[must_use]
    pub fn cdb_for(brightness: Brightness) -> Cdb {
        Cdb::passthrough()
            .with_byte(5, 0x06)
            .with_byte(6, SUBCOMMAND_SET_PROPERTY)
            .with_u16_le(7, PROPERTY_BRIGHTNESS)
            .with_u16_le(9, u16::from(brightness.value()))
    }

    /// Sets the backlight level.
    ///
    /// ```no_run
    /// # fn demo(session: &mut dpf::DeviceSession) -> Result<(), dpf::DeviceError> {
    /// use dpf::{Brightness, BrightnessHandler};
    ///
    /// BrightnessHandler::set_brightness(session, Brightness::clamped(6))?;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error when any transport stage fails.
    #[instrument(skip(session), level = "info", fields(level = brightness.value()))]
    pub fn set_brightness(
        session: &mut DeviceSession,
        brightness: Brightness,
    ) -> Result<(), DeviceError> {
        let cdb = Self::cdb_for(brightness);
        session.write_command(cdb.as_bytes(), None)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(0, 0)]
    #[case(3, 3)]
    #[case(7, 7)]
    #[case(8, 7)]
    #[case(9, 7)]
    #[case(i64::MAX, 7)]
    #[case(-1, 0)]
    #[case(i64::MIN, 0)]
    fn brightness_clamps_into_range(#[case] level: i64, #[case] expected: u8) {
        assert_eq!(expected, Brightness::clamped(level).value());
    }

    #[rstest]
    #[case(9)]
    #[case(255)]
    #[case(-40)]
    fn out_of_range_levels_encode_like_their_clamped_value(#[case] level: i64) {
        let clamped = level.clamp(0, 7);
        assert_eq!(
            BrightnessHandler::cdb_for(Brightness::clamped(clamped)),
            BrightnessHandler::cdb_for(Brightness::clamped(level))
        );
    }

    #[test]
    fn cdb_for_brightness_matches_protocol() {
        let cdb = BrightnessHandler::cdb_for(Brightness::clamped(9));
        assert_eq!(
            &[
                0xCD, 0x00, 0x00, 0x00, 0x00, 0x06, 0x01, 0x01, 0x00, 0x07, 0x00, 0x00, 0x00, 0x00,
                0x00, 0x00
            ],
            cdb.as_bytes()
        );
    }
}
