mod fake_backend;
mod hardware;
mod model;
mod session;
mod transport;
mod usb_backend;

pub(crate) use self::fake_backend::{DimensionsFixture, FakeBackendConfig, InResponsesFixture};
pub use self::fake_backend::{FakeInResponse, FakeOutResponse, TrafficLog, Transfer};
pub use self::hardware::HardwareClient;
pub(crate) use self::hardware::{fake_hardware_client, real_hardware_client};
pub use self::model::PanelDimensions;
pub use self::session::{DeviceSession, ReadCompletion};
pub use self::transport::{BulkTransport, TransportConfig};
