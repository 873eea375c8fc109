use thiserror::Error;

use crate::error::TransportError;
use crate::protocol::{
    CBW_LEN, CBW_SIGNATURE, CBW_TAG, CDB_LEN, CSW_LEN, CSW_SIGNATURE, Direction,
    OPCODE_PASSTHROUGH,
};

const SIGNATURE_LEN: usize = 4;

/// Errors returned by command frame encoding.
#[derive(Debug, Error, Clone, Copy, Eq, PartialEq)]
pub enum FrameCodecError {
    /// The command descriptor block does not fit in the 16-byte CDB field.
    #[error("invalid command: CDB is {length} bytes, max {max}")]
    InvalidCommand { length: usize, max: usize },
    /// The data stage does not fit in the 32-bit transfer-length field.
    #[error("data stage of {length} bytes exceeds the 32-bit transfer length")]
    DataTooLarge { length: u64 },
}

/// Vendor command descriptor block, always 16 bytes and prefixed by the
/// passthrough opcode.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Cdb([u8; CDB_LEN]);

impl Cdb {
    /// Creates a zeroed CDB carrying only the passthrough opcode.
    #[must_use]
    pub(crate) const fn passthrough() -> Self {
        let mut bytes = [0u8; CDB_LEN];
        bytes[0] = OPCODE_PASSTHROUGH;
        Self(bytes)
    }

    /// Sets one byte.
    #[must_use]
    pub(crate) const fn with_byte(mut self, index: usize, value: u8) -> Self {
        self.0[index] = value;
        self
    }

    /// Sets a little-endian 16-bit field starting at `index`.
    #[must_use]
    pub(crate) const fn with_u16_le(mut self, index: usize, value: u16) -> Self {
        let [low, high] = value.to_le_bytes();
        self.0[index] = low;
        self.0[index + 1] = high;
        self
    }

    /// Returns the CDB bytes.
    ///
    /// ```
    /// use dpf::BrightnessHandler;
    ///
    /// let cdb = BrightnessHandler::cdb_for(dpf::Brightness::clamped(3));
    /// assert_eq!(0xCD, cdb.as_bytes()[0]);
    /// ```
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Encoder for the 31-byte bulk-only command block wrapper.
///
/// Layout: signature (4), tag (4), data-transfer length (4, LE), flags (1),
/// LUN (1), CDB length (1), CDB (16, zero padded).
pub struct CommandFrame;

impl CommandFrame {
    /// Encodes a command frame.
    ///
    /// ```
    /// use dpf::{CommandFrame, Direction};
    ///
    /// let frame = CommandFrame::encode(&[0xCD, 0x00], 5, Direction::DeviceToHost)?;
    /// assert_eq!(b"USBC", &frame[0..4]);
    /// assert_eq!([5, 0, 0, 0], frame[8..12]);
    /// assert_eq!(0x80, frame[12]);
    /// assert_eq!(2, frame[14]);
    /// # Ok::<(), dpf::FrameCodecError>(())
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error when `cdb` is longer than 16 bytes.
    pub fn encode(
        cdb: &[u8],
        data_length: u32,
        direction: Direction,
    ) -> Result<[u8; CBW_LEN], FrameCodecError> {
        let cdb_length = u8::try_from(cdb.len())
            .ok()
            .filter(|length| usize::from(*length) <= CDB_LEN)
            .ok_or(FrameCodecError::InvalidCommand {
                length: cdb.len(),
                max: CDB_LEN,
            })?;

        let mut frame = [0u8; CBW_LEN];
        frame[0..4].copy_from_slice(&CBW_SIGNATURE);
        frame[4..8].copy_from_slice(&CBW_TAG);
        frame[8..12].copy_from_slice(&data_length.to_le_bytes());
        frame[12] = direction.flags();
        frame[13] = 0x00;
        frame[14] = cdb_length;
        frame[15..15 + cdb.len()].copy_from_slice(cdb);
        Ok(frame)
    }
}

/// Decoded 13-byte command status wrapper.
///
/// Only the signature is validated; tag, residue and status are informational.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct StatusEnvelope {
    tag: Option<[u8; 4]>,
    residue: Option<u32>,
    status: Option<u8>,
}

impl StatusEnvelope {
    /// Validates a received status envelope.
    ///
    /// ```
    /// use dpf::StatusEnvelope;
    ///
    /// let envelope = StatusEnvelope::decode(b"USBS\xde\xad\xbe\xef\0\0\0\0\0")?;
    /// assert_eq!(Some(0), envelope.status());
    /// # Ok::<(), dpf::TransportError>(())
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::ShortStatus`] when fewer than 4 bytes were
    /// received, and [`TransportError::BadStatusSignature`] when the first 4
    /// bytes are not `USBS`.
    pub fn decode(bytes: &[u8]) -> Result<Self, TransportError> {
        let Some(signature) = bytes.first_chunk::<SIGNATURE_LEN>() else {
            return Err(TransportError::ShortStatus {
                received: bytes.len(),
            });
        };
        if *signature != CSW_SIGNATURE {
            return Err(TransportError::BadStatusSignature {
                signature: *signature,
            });
        }

        let tag = bytes.get(4..8).and_then(|tag| tag.try_into().ok());
        let residue = bytes
            .get(8..12)
            .and_then(|residue| residue.try_into().ok())
            .map(u32::from_le_bytes);
        let status = bytes.get(CSW_LEN - 1).copied();

        Ok(Self {
            tag,
            residue,
            status,
        })
    }

    /// Returns the echoed tag, when the envelope carried one.
    #[must_use]
    pub fn tag(&self) -> Option<[u8; 4]> {
        self.tag
    }

    /// Returns the data residue, when the envelope carried one.
    #[must_use]
    pub fn residue(&self) -> Option<u32> {
        self.residue
    }

    /// Returns the status byte, when the envelope carried one.
    #[must_use]
    pub fn status(&self) -> Option<u8> {
        self.status
    }
}
