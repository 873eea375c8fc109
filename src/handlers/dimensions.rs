use thiserror::Error;
use tracing::{info, instrument};

use crate::error::DeviceError;
use crate::hw::{DeviceSession, PanelDimensions};

use super::Cdb;

const READ_SELECTOR: u8 = 0x02;
const RESPONSE_LEN: u32 = 5;
const MIN_RESPONSE_LEN: usize = 4;

/// Errors returned when decoding a dimensions response.
#[derive(Debug, Error, Clone, Copy, Eq, PartialEq)]
pub enum DimensionsError {
    /// The device returned too few bytes to carry width and height.
    #[error("dimensions response is too short: expected at least {expected} bytes, got {actual}")]
    ShortResponse { expected: usize, actual: usize },
}

/// Handler for the panel dimensions query.
pub struct DimensionsHandler;

impl DimensionsHandler {
    /// Returns the fixed dimensions-query CDB.
    #[must_use]
    pub fn cdb() -> Cdb {
        Cdb::passthrough().with_byte(5, READ_SELECTOR)
    }

    /// Decodes width and height from a dimensions response.
    ///
    /// ```
    /// use dpf::DimensionsHandler;
    ///
    /// let dimensions = DimensionsHandler::decode(&[0x40, 0x01, 0xB0, 0x00, 0xFF])?;
    /// assert_eq!((320, 176), (dimensions.width(), dimensions.height()));
    /// # Ok::<(), dpf::DimensionsError>(())
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error when fewer than 4 bytes are present.
    pub fn decode(response: &[u8]) -> Result<PanelDimensions, DimensionsError> {
        let Some(&[width_low, width_high, height_low, height_high]) =
            response.first_chunk::<MIN_RESPONSE_LEN>()
        else {
            return Err(DimensionsError::ShortResponse {
                expected: MIN_RESPONSE_LEN,
                actual: response.len(),
            });
        };

        Ok(PanelDimensions::from_raw(
            u16::from_le_bytes([width_low, width_high]),
            u16::from_le_bytes([height_low, height_high]),
        ))
    }

    /// Queries the panel size.
    ///
    /// ```no_run
    /// # fn demo(session: &mut dpf::DeviceSession) -> Result<(), dpf::DeviceError> {
    /// let dimensions = dpf::DimensionsHandler::get_dimensions(session)?;
    /// println!("{dimensions}");
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error when any transport stage fails, including the status
    /// stage, or the response is too short.
    #[instrument(skip(session), level = "info")]
    pub fn get_dimensions(session: &mut DeviceSession) -> Result<PanelDimensions, DeviceError> {
        let completion = session.read_command(Self::cdb().as_bytes(), RESPONSE_LEN)?;
        let response = completion.into_data()?;
        let dimensions = Self::decode(&response)?;
        info!(%dimensions, "panel dimensions reported");
        Ok(dimensions)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[test]
    fn cdb_uses_read_selector_without_subcommand() {
        assert_eq!(
            &[0xCD, 0, 0, 0, 0, 0x02, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
            DimensionsHandler::cdb().as_bytes()
        );
    }

    #[rstest]
    #[case(&[0x40, 0x01, 0xB0, 0x00, 0xFF], 320, 176)]
    #[case(&[0x40, 0x01, 0xF0, 0x00, 0x00], 320, 240)]
    #[case(&[0x80, 0x00, 0x80, 0x00], 128, 128)]
    fn decode_reads_little_endian_pairs(
        #[case] response: &[u8],
        #[case] width: u16,
        #[case] height: u16,
    ) {
        let dimensions = DimensionsHandler::decode(response).expect("response should decode");
        assert_eq!((width, height), (dimensions.width(), dimensions.height()));
    }

    #[test]
    fn decode_rejects_short_response() {
        assert_matches!(
            DimensionsHandler::decode(&[0x40, 0x01, 0xF0]),
            Err(DimensionsError::ShortResponse {
                expected: 4,
                actual: 3
            })
        );
    }
}
