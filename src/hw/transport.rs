use std::time::Duration;

use bon::Builder;

use crate::protocol::{DPF_PRODUCT_ID, DPF_VENDOR_ID};

const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);

/// Blocking bulk-endpoint capability used by [`crate::DeviceSession`].
///
/// Implementations own one bulk OUT and one bulk IN endpoint. Both calls
/// block for at most `timeout` and report the number of bytes transferred.
pub trait BulkTransport: Send {
    /// Writes `data` to the bulk OUT endpoint.
    ///
    /// # Errors
    ///
    /// Returns the underlying USB error when the transfer fails.
    fn write_out(&mut self, data: &[u8], timeout: Duration) -> Result<usize, rusb::Error>;

    /// Reads up to `buffer.len()` bytes from the bulk IN endpoint.
    ///
    /// # Errors
    ///
    /// Returns the underlying USB error when the transfer fails.
    fn read_in(&mut self, buffer: &mut [u8], timeout: Duration) -> Result<usize, rusb::Error>;

    /// Releases every resource held by the transport.
    ///
    /// # Errors
    ///
    /// Returns the first release failure; remaining resources are still
    /// released.
    fn close(self: Box<Self>) -> Result<(), rusb::Error> {
        Ok(())
    }
}

/// Settings for opening and driving a photo frame.
///
/// ```
/// use std::time::Duration;
///
/// let config = dpf::TransportConfig::builder()
///     .timeout(Duration::from_millis(250))
///     .build();
/// assert_eq!(Duration::from_millis(250), config.timeout());
/// assert_eq!(0x1908, config.vendor_id());
/// ```
#[derive(Debug, Clone, Copy, Eq, PartialEq, Builder)]
pub struct TransportConfig {
    /// Timeout applied to every bulk transfer.
    #[builder(default = DEFAULT_TIMEOUT)]
    timeout: Duration,
    #[builder(default = DPF_VENDOR_ID)]
    vendor_id: u16,
    #[builder(default = DPF_PRODUCT_ID)]
    product_id: u16,
}

impl TransportConfig {
    /// Returns the per-transfer timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the USB vendor ID to open.
    #[must_use]
    pub fn vendor_id(&self) -> u16 {
        self.vendor_id
    }

    /// Returns the USB product ID to open.
    #[must_use]
    pub fn product_id(&self) -> u16 {
        self.product_id
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}
