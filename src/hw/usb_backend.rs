use std::fmt;
use std::time::Duration;

use rusb::{Context, DeviceHandle, TransferType, UsbContext};
use tracing::{debug, info, instrument, warn};

use super::transport::{BulkTransport, TransportConfig};
use crate::error::OpenError;
use crate::protocol::{CONFIGURATION, IN_ENDPOINT, INTERFACE, OUT_ENDPOINT, OpenStep};

/// USB host stack able to locate and open one device.
pub(crate) trait UsbStack {
    type Device: UsbDevice;

    /// Opens the first device matching the ids.
    ///
    /// Returns [`OpenError::DeviceNotFound`] only when no device matches.
    fn open_device(&self, vendor_id: u16, product_id: u16) -> Result<Self::Device, OpenError>;
}

/// Operations the open sequence and bulk transport need from an open device.
pub(crate) trait UsbDevice {
    fn auto_detach_kernel_driver(&mut self) -> Result<(), rusb::Error>;
    fn configuration(&self) -> Result<u8, rusb::Error>;
    fn set_configuration(&mut self, configuration: u8) -> Result<(), rusb::Error>;
    fn claim(&mut self, interface: u8) -> Result<(), rusb::Error>;
    fn release(&mut self, interface: u8) -> Result<(), rusb::Error>;
    fn has_bulk_endpoint(&self, interface: u8, address: u8) -> Result<bool, rusb::Error>;
    fn write_bulk_out(&self, data: &[u8], timeout: Duration) -> Result<usize, rusb::Error>;
    fn read_bulk_in(&self, buffer: &mut [u8], timeout: Duration) -> Result<usize, rusb::Error>;
}

impl UsbStack for Context {
    type Device = DeviceHandle<Context>;

    fn open_device(&self, vendor_id: u16, product_id: u16) -> Result<Self::Device, OpenError> {
        let devices = self.devices().map_err(failed(OpenStep::Device))?;
        let device = devices
            .iter()
            .find(|device| {
                device.device_descriptor().is_ok_and(|descriptor| {
                    descriptor.vendor_id() == vendor_id && descriptor.product_id() == product_id
                })
            })
            .ok_or(OpenError::DeviceNotFound {
                vendor_id,
                product_id,
            })?;
        debug!(
            bus = device.bus_number(),
            address = device.address(),
            "found photo frame"
        );
        device.open().map_err(failed(OpenStep::Device))
    }
}

impl UsbDevice for DeviceHandle<Context> {
    fn auto_detach_kernel_driver(&mut self) -> Result<(), rusb::Error> {
        self.set_auto_detach_kernel_driver(true)
    }

    fn configuration(&self) -> Result<u8, rusb::Error> {
        self.active_configuration()
    }

    fn set_configuration(&mut self, configuration: u8) -> Result<(), rusb::Error> {
        self.set_active_configuration(configuration)
    }

    fn claim(&mut self, interface: u8) -> Result<(), rusb::Error> {
        self.claim_interface(interface)
    }

    fn release(&mut self, interface: u8) -> Result<(), rusb::Error> {
        self.release_interface(interface)
    }

    fn has_bulk_endpoint(&self, interface: u8, address: u8) -> Result<bool, rusb::Error> {
        let config = self.device().active_config_descriptor()?;
        let found = config
            .interfaces()
            .flat_map(|candidate| candidate.descriptors())
            .filter(|descriptor| descriptor.interface_number() == interface)
            .flat_map(|descriptor| descriptor.endpoint_descriptors().collect::<Vec<_>>())
            .any(|endpoint| {
                endpoint.address() == address && endpoint.transfer_type() == TransferType::Bulk
            });
        Ok(found)
    }

    fn write_bulk_out(&self, data: &[u8], timeout: Duration) -> Result<usize, rusb::Error> {
        self.write_bulk(OUT_ENDPOINT, data, timeout)
    }

    fn read_bulk_in(&self, buffer: &mut [u8], timeout: Duration) -> Result<usize, rusb::Error> {
        self.read_bulk(IN_ENDPOINT, buffer, timeout)
    }
}

/// Bulk transport over a claimed interface.
///
/// Field order is release order: the interface is released first, then the
/// device handle closes, then the context is dropped.
pub(crate) struct UsbBulkTransport<S: UsbStack = Context> {
    interface: ClaimedInterface<S::Device>,
    _stack: S,
}

impl<S: UsbStack> fmt::Debug for UsbBulkTransport<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UsbBulkTransport")
            .field("interface", &self.interface.number)
            .field("claimed", &self.interface.claimed)
            .finish_non_exhaustive()
    }
}

impl UsbBulkTransport {
    /// Runs the open sequence against the first device matching `config`.
    #[instrument(
        skip(config),
        level = "info",
        fields(
            vendor_id = %format!("{:04x}", config.vendor_id()),
            product_id = %format!("{:04x}", config.product_id())
        )
    )]
    pub(crate) fn open(config: &TransportConfig) -> Result<Self, OpenError> {
        let context = Context::new().map_err(failed(OpenStep::Context))?;
        Self::open_with(context, config)
    }
}

impl<S: UsbStack> UsbBulkTransport<S> {
    /// Opens, configures and claims the device reachable through `stack`.
    ///
    /// Every resource acquired before a failing step is released in reverse
    /// order before the error is returned.
    fn open_with(stack: S, config: &TransportConfig) -> Result<Self, OpenError> {
        let mut device = stack.open_device(config.vendor_id(), config.product_id())?;

        match device.auto_detach_kernel_driver() {
            Ok(()) => {}
            Err(rusb::Error::NotSupported) => {
                debug!("kernel driver auto-detach is not supported on this platform");
            }
            Err(error) => return Err(failed(OpenStep::DetachKernelDriver)(error)),
        }

        select_configuration(&mut device)?;

        device
            .claim(INTERFACE)
            .map_err(failed(OpenStep::ClaimInterface))?;
        let interface = ClaimedInterface {
            device,
            number: INTERFACE,
            claimed: true,
        };

        require_bulk_endpoint(&interface.device, OUT_ENDPOINT, OpenStep::OutEndpoint)?;
        require_bulk_endpoint(&interface.device, IN_ENDPOINT, OpenStep::InEndpoint)?;

        info!("photo frame opened");
        Ok(Self {
            interface,
            _stack: stack,
        })
    }
}

impl<S> BulkTransport for UsbBulkTransport<S>
where
    S: UsbStack + Send,
    S::Device: Send,
{
    fn write_out(&mut self, data: &[u8], timeout: Duration) -> Result<usize, rusb::Error> {
        self.interface.device.write_bulk_out(data, timeout)
    }

    fn read_in(&mut self, buffer: &mut [u8], timeout: Duration) -> Result<usize, rusb::Error> {
        self.interface.device.read_bulk_in(buffer, timeout)
    }

    fn close(mut self: Box<Self>) -> Result<(), rusb::Error> {
        self.interface.release()
    }
}

/// Claimed interface guard; releases the claim when dropped.
struct ClaimedInterface<D: UsbDevice> {
    device: D,
    number: u8,
    claimed: bool,
}

impl<D: UsbDevice> ClaimedInterface<D> {
    fn release(&mut self) -> Result<(), rusb::Error> {
        if !self.claimed {
            return Ok(());
        }
        self.claimed = false;
        self.device.release(self.number)
    }
}

impl<D: UsbDevice> Drop for ClaimedInterface<D> {
    fn drop(&mut self) {
        if let Err(error) = self.release() {
            warn!(%error, interface = self.number, "failed to release USB interface");
        }
    }
}

fn select_configuration(device: &mut impl UsbDevice) -> Result<(), OpenError> {
    let active = device
        .configuration()
        .map_err(failed(OpenStep::Configuration))?;
    if active != CONFIGURATION {
        debug!(active, wanted = CONFIGURATION, "switching USB configuration");
        device
            .set_configuration(CONFIGURATION)
            .map_err(failed(OpenStep::Configuration))?;
    }
    Ok(())
}

fn require_bulk_endpoint(
    device: &impl UsbDevice,
    address: u8,
    step: OpenStep,
) -> Result<(), OpenError> {
    if device
        .has_bulk_endpoint(INTERFACE, address)
        .map_err(failed(step))?
    {
        Ok(())
    } else {
        Err(failed(step)(rusb::Error::NotFound))
    }
}

fn failed(step: OpenStep) -> impl Fn(rusb::Error) -> OpenError {
    move |source| OpenError::OpenFailure { step, source }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex, PoisonError};

    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[derive(Debug, Clone, Copy, Eq, PartialEq)]
    enum Event {
        ReleaseInterface,
        CloseDevice,
        DropContext,
    }

    #[derive(Debug, Clone, Default)]
    struct EventLog(Arc<Mutex<Vec<Event>>>);

    impl EventLog {
        fn push(&self, event: Event) {
            self.0
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(event);
        }

        fn events(&self) -> Vec<Event> {
            self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
        }
    }

    struct RecordingStack {
        log: EventLog,
        present: bool,
        fail_at: Option<OpenStep>,
        detach_error: rusb::Error,
    }

    impl RecordingStack {
        fn new(log: &EventLog) -> Self {
            Self {
                log: log.clone(),
                present: true,
                fail_at: None,
                detach_error: rusb::Error::Io,
            }
        }

        fn failing_at(log: &EventLog, step: OpenStep) -> Self {
            let mut stack = Self::new(log);
            stack.fail_at = Some(step);
            stack
        }
    }

    impl Drop for RecordingStack {
        fn drop(&mut self) {
            self.log.push(Event::DropContext);
        }
    }

    impl UsbStack for RecordingStack {
        type Device = RecordingDevice;

        fn open_device(
            &self,
            vendor_id: u16,
            product_id: u16,
        ) -> Result<Self::Device, OpenError> {
            if !self.present {
                return Err(OpenError::DeviceNotFound {
                    vendor_id,
                    product_id,
                });
            }
            if self.fail_at == Some(OpenStep::Device) {
                return Err(failed(OpenStep::Device)(rusb::Error::Access));
            }
            Ok(RecordingDevice {
                log: self.log.clone(),
                fail_at: self.fail_at,
                detach_error: self.detach_error,
                configuration: 0,
            })
        }
    }

    struct RecordingDevice {
        log: EventLog,
        fail_at: Option<OpenStep>,
        detach_error: rusb::Error,
        configuration: u8,
    }

    impl RecordingDevice {
        fn check(&self, step: OpenStep, error: rusb::Error) -> Result<(), rusb::Error> {
            if self.fail_at == Some(step) {
                Err(error)
            } else {
                Ok(())
            }
        }
    }

    impl Drop for RecordingDevice {
        fn drop(&mut self) {
            self.log.push(Event::CloseDevice);
        }
    }

    impl UsbDevice for RecordingDevice {
        fn auto_detach_kernel_driver(&mut self) -> Result<(), rusb::Error> {
            self.check(OpenStep::DetachKernelDriver, self.detach_error)
        }

        fn configuration(&self) -> Result<u8, rusb::Error> {
            Ok(self.configuration)
        }

        fn set_configuration(&mut self, configuration: u8) -> Result<(), rusb::Error> {
            self.check(OpenStep::Configuration, rusb::Error::Busy)?;
            self.configuration = configuration;
            Ok(())
        }

        fn claim(&mut self, _interface: u8) -> Result<(), rusb::Error> {
            self.check(OpenStep::ClaimInterface, rusb::Error::Busy)
        }

        fn release(&mut self, _interface: u8) -> Result<(), rusb::Error> {
            self.log.push(Event::ReleaseInterface);
            Ok(())
        }

        fn has_bulk_endpoint(&self, _interface: u8, address: u8) -> Result<bool, rusb::Error> {
            let missing = match self.fail_at {
                Some(OpenStep::OutEndpoint) => address == OUT_ENDPOINT,
                Some(OpenStep::InEndpoint) => address == IN_ENDPOINT,
                _ => false,
            };
            Ok(!missing)
        }

        fn write_bulk_out(&self, data: &[u8], _timeout: Duration) -> Result<usize, rusb::Error> {
            Ok(data.len())
        }

        fn read_bulk_in(
            &self,
            _buffer: &mut [u8],
            _timeout: Duration,
        ) -> Result<usize, rusb::Error> {
            Err(rusb::Error::Timeout)
        }
    }

    const ALL_RELEASED: [Event; 3] = [
        Event::ReleaseInterface,
        Event::CloseDevice,
        Event::DropContext,
    ];

    #[rstest]
    #[case(OpenStep::Device, &[Event::DropContext])]
    #[case(OpenStep::DetachKernelDriver, &[Event::CloseDevice, Event::DropContext])]
    #[case(OpenStep::Configuration, &[Event::CloseDevice, Event::DropContext])]
    #[case(OpenStep::ClaimInterface, &[Event::CloseDevice, Event::DropContext])]
    #[case(OpenStep::OutEndpoint, &ALL_RELEASED)]
    #[case(OpenStep::InEndpoint, &ALL_RELEASED)]
    fn failed_open_releases_acquired_resources_in_reverse(
        #[case] step: OpenStep,
        #[case] expected: &[Event],
    ) {
        let log = EventLog::default();
        let stack = RecordingStack::failing_at(&log, step);

        let result = UsbBulkTransport::open_with(stack, &TransportConfig::default());

        assert_matches!(
            result,
            Err(OpenError::OpenFailure { step: failed_step, .. }) if failed_step == step
        );
        assert_eq!(expected, log.events().as_slice());
    }

    #[test]
    fn missing_device_is_not_found() {
        let log = EventLog::default();
        let mut stack = RecordingStack::new(&log);
        stack.present = false;

        let result = UsbBulkTransport::open_with(stack, &TransportConfig::default());

        assert_matches!(
            result,
            Err(OpenError::DeviceNotFound {
                vendor_id: 0x1908,
                product_id: 0x0102
            })
        );
        assert_eq!(vec![Event::DropContext], log.events());
    }

    #[test]
    fn unsupported_kernel_driver_detach_is_tolerated() {
        let log = EventLog::default();
        let mut stack = RecordingStack::failing_at(&log, OpenStep::DetachKernelDriver);
        stack.detach_error = rusb::Error::NotSupported;

        let transport = UsbBulkTransport::open_with(stack, &TransportConfig::default());

        assert!(transport.is_ok(), "NotSupported detach should not fail open");
    }

    #[test]
    fn close_releases_interface_then_device_then_context() {
        let log = EventLog::default();
        let transport =
            UsbBulkTransport::open_with(RecordingStack::new(&log), &TransportConfig::default())
                .expect("open should succeed");

        Box::new(transport).close().expect("close should succeed");

        assert_eq!(ALL_RELEASED.to_vec(), log.events());
    }

    #[test]
    fn dropping_open_transport_releases_in_reverse_order() {
        let log = EventLog::default();
        let transport =
            UsbBulkTransport::open_with(RecordingStack::new(&log), &TransportConfig::default())
                .expect("open should succeed");

        drop(transport);

        assert_eq!(ALL_RELEASED.to_vec(), log.events());
    }
}
