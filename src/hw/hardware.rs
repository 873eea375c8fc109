use tracing::info;

use super::fake_backend::{FakeBackendConfig, FakeTransport, TrafficLog};
use super::session::DeviceSession;
use super::transport::TransportConfig;
use super::usb_backend::UsbBulkTransport;
use crate::error::DeviceError;

/// Builds a hardware client backed by libusb.
pub(crate) fn real_hardware_client(config: TransportConfig) -> Box<dyn HardwareClient> {
    Box::new(RealHardwareClient { config })
}

/// Builds a hardware client backed by an in-memory photo frame.
pub(crate) fn fake_hardware_client(
    backend: FakeBackendConfig,
    transport: TransportConfig,
    log: TrafficLog,
) -> Box<dyn HardwareClient> {
    Box::new(FakeHardwareClient {
        backend,
        transport,
        log,
    })
}

/// Opens photo frame sessions.
pub trait HardwareClient: Send {
    /// Opens the photo frame and returns an exclusive session.
    ///
    /// # Errors
    ///
    /// Returns an error when no device is found or any open step fails.
    fn open(self: Box<Self>) -> Result<DeviceSession, DeviceError>;
}

#[derive(Debug)]
struct RealHardwareClient {
    config: TransportConfig,
}

impl HardwareClient for RealHardwareClient {
    fn open(self: Box<Self>) -> Result<DeviceSession, DeviceError> {
        let transport = UsbBulkTransport::open(&self.config)?;
        Ok(DeviceSession::new(Box::new(transport), &self.config))
    }
}

#[derive(Debug)]
struct FakeHardwareClient {
    backend: FakeBackendConfig,
    transport: TransportConfig,
    log: TrafficLog,
}

impl HardwareClient for FakeHardwareClient {
    fn open(self: Box<Self>) -> Result<DeviceSession, DeviceError> {
        let Self {
            backend,
            transport,
            log,
        } = *self;
        info!("using fake photo frame backend");
        let fake = FakeTransport::new(backend, log);
        Ok(DeviceSession::new(Box::new(fake), &transport))
    }
}
