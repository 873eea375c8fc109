use std::time::Duration;

use tracing::{debug, instrument, trace, warn};

use super::transport::{BulkTransport, TransportConfig};
use crate::error::{DeviceError, TransportError};
use crate::handlers::{CommandFrame, FrameCodecError, StatusEnvelope};
use crate::protocol::{CSW_LEN, Direction, TransferStage};
use crate::utils::format_hex;

/// Data returned by a device-to-host command together with its status.
///
/// A failed status stage does not discard the data that was already
/// transferred. Whether partial data is usable is the caller's decision;
/// [`ReadCompletion::into_data`] treats any status failure as fatal.
#[derive(Debug)]
pub struct ReadCompletion {
    data: Vec<u8>,
    status: Result<StatusEnvelope, TransportError>,
}

impl ReadCompletion {
    /// Returns the bytes transferred during the data stage.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Returns the status stage outcome.
    #[must_use]
    pub fn status(&self) -> &Result<StatusEnvelope, TransportError> {
        &self.status
    }

    /// Splits the completion into data and status outcome.
    #[must_use]
    pub fn into_parts(self) -> (Vec<u8>, Result<StatusEnvelope, TransportError>) {
        (self.data, self.status)
    }

    /// Returns the data when the status stage succeeded.
    ///
    /// # Errors
    ///
    /// Returns the status stage error, dropping the data.
    pub fn into_data(self) -> Result<Vec<u8>, TransportError> {
        self.status.map(|_envelope| self.data)
    }
}

/// An open photo frame driven over bulk-only transport.
///
/// Every operation is a blocking command, data, status sequence. Operations
/// take `&mut self`; callers sharing a session across threads must serialise
/// access themselves.
pub struct DeviceSession {
    transport: Box<dyn BulkTransport>,
    timeout: Duration,
}

impl std::fmt::Debug for DeviceSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSession")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl DeviceSession {
    /// Wraps an already-open bulk transport.
    #[must_use]
    pub fn new(transport: Box<dyn BulkTransport>, config: &TransportConfig) -> Self {
        Self {
            transport,
            timeout: config.timeout(),
        }
    }

    /// Sends a host-to-device command with an optional data stage.
    ///
    /// # Errors
    ///
    /// Returns an error when the CDB cannot be framed, any stage fails to
    /// transfer completely, or the status envelope is invalid. Later stages
    /// are not attempted after a failure.
    #[instrument(
        skip(self, cdb, data),
        level = "debug",
        fields(data_len = data.map_or(0, <[u8]>::len))
    )]
    pub fn write_command(&mut self, cdb: &[u8], data: Option<&[u8]>) -> Result<(), DeviceError> {
        let data_length = data_length(data.map_or(0, <[u8]>::len))?;
        let frame = CommandFrame::encode(cdb, data_length, Direction::HostToDevice)?;
        trace!(frame = %format_hex(&frame), "sending command frame");

        self.write_stage(TransferStage::Command, &frame)?;
        if let Some(data) = data {
            self.write_stage(TransferStage::Data, data)?;
        }
        self.read_status()?;
        Ok(())
    }

    /// Sends a device-to-host command and reads up to `expected_length` bytes.
    ///
    /// The returned data holds exactly the bytes the device transferred, which
    /// may be fewer than requested.
    ///
    /// # Errors
    ///
    /// Returns an error when the CDB cannot be framed, the command frame fails
    /// to write, or the data stage fails to read. Status stage failures are
    /// reported inside the returned [`ReadCompletion`].
    #[instrument(skip(self, cdb), level = "debug")]
    pub fn read_command(
        &mut self,
        cdb: &[u8],
        expected_length: u32,
    ) -> Result<ReadCompletion, DeviceError> {
        let frame = CommandFrame::encode(cdb, expected_length, Direction::DeviceToHost)?;
        trace!(frame = %format_hex(&frame), "sending command frame");
        self.write_stage(TransferStage::Command, &frame)?;

        let capacity = usize::try_from(expected_length).map_err(|_error| {
            FrameCodecError::DataTooLarge {
                length: u64::from(expected_length),
            }
        })?;
        let mut data = vec![0u8; capacity];
        let received = self
            .transport
            .read_in(&mut data, self.timeout)
            .map_err(|source| TransportError::Read {
                stage: TransferStage::Data,
                source,
            })?;
        data.truncate(received);
        debug!(data = %format_hex(&data), "read data stage");

        let status = self.read_status();
        if let Err(error) = &status {
            warn!(%error, received, "status stage failed after data stage");
        }
        Ok(ReadCompletion { data, status })
    }

    /// Reads and validates one status envelope.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Read`] when the transfer fails,
    /// [`TransportError::ShortStatus`] when fewer than 4 bytes arrive, and
    /// [`TransportError::BadStatusSignature`] on a signature mismatch.
    pub fn read_status(&mut self) -> Result<StatusEnvelope, TransportError> {
        let mut buffer = [0u8; CSW_LEN];
        let received = self
            .transport
            .read_in(&mut buffer, self.timeout)
            .map_err(|source| TransportError::Read {
                stage: TransferStage::Status,
                source,
            })?;
        let envelope = StatusEnvelope::decode(&buffer[..received])?;
        trace!(status = %format_hex(&buffer[..received]), "status envelope accepted");
        Ok(envelope)
    }

    /// Releases the interface, device and USB context.
    ///
    /// Release failures are logged, never returned, so closing after a failed
    /// operation always completes.
    #[instrument(skip(self), level = "debug")]
    pub fn close(self) {
        if let Err(error) = self.transport.close() {
            warn!(%error, "failed to release photo frame cleanly");
        }
    }

    fn write_stage(&mut self, stage: TransferStage, bytes: &[u8]) -> Result<(), TransportError> {
        match self.transport.write_out(bytes, self.timeout) {
            Ok(written) if written == bytes.len() => Ok(()),
            Ok(written) => Err(TransportError::Write {
                stage,
                expected: bytes.len(),
                written,
                source: None,
            }),
            Err(source) => Err(TransportError::Write {
                stage,
                expected: bytes.len(),
                written: 0,
                source: Some(source),
            }),
        }
    }
}

fn data_length(length: usize) -> Result<u32, FrameCodecError> {
    u32::try_from(length).map_err(|_error| FrameCodecError::DataTooLarge {
        length: length as u64,
    })
}
