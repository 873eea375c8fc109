use strum_macros::{Display, EnumIter};

/// USB vendor ID of hacked AX206 photo frames.
pub const DPF_VENDOR_ID: u16 = 0x1908;
/// USB product ID of hacked AX206 photo frames.
pub const DPF_PRODUCT_ID: u16 = 0x0102;

pub(crate) const CONFIGURATION: u8 = 1;
pub(crate) const INTERFACE: u8 = 0;
pub(crate) const OUT_ENDPOINT: u8 = 0x01;
pub(crate) const IN_ENDPOINT: u8 = 0x81;

/// Command block wrapper signature, ASCII `USBC`.
pub(crate) const CBW_SIGNATURE: [u8; 4] = *b"USBC";
/// Command status wrapper signature, ASCII `USBS`.
pub(crate) const CSW_SIGNATURE: [u8; 4] = *b"USBS";
/// Constant tag; only one command is ever in flight.
pub(crate) const CBW_TAG: [u8; 4] = [0xDE, 0xAD, 0xBE, 0xEF];
pub(crate) const CBW_LEN: usize = 31;
pub(crate) const CSW_LEN: usize = 13;
pub(crate) const CDB_LEN: usize = 16;

/// Vendor SCSI passthrough opcode carried in CDB byte 0.
pub(crate) const OPCODE_PASSTHROUGH: u8 = 0xCD;
pub(crate) const SUBCOMMAND_SET_PROPERTY: u8 = 0x01;
pub(crate) const SUBCOMMAND_BLIT: u8 = 0x12;
pub(crate) const PROPERTY_BRIGHTNESS: u16 = 0x0001;

/// Direction of the data stage that follows a command frame.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Display)]
pub enum Direction {
    /// Data flows from the host to the frame (bulk OUT).
    #[strum(to_string = "host_to_device")]
    HostToDevice,
    /// Data flows from the frame to the host (bulk IN).
    #[strum(to_string = "device_to_host")]
    DeviceToHost,
}

impl Direction {
    /// Returns the `bmCBWFlags` byte for this direction.
    ///
    /// ```
    /// use dpf::Direction;
    ///
    /// assert_eq!(0x80, Direction::DeviceToHost.flags());
    /// assert_eq!(0x00, Direction::HostToDevice.flags());
    /// ```
    #[must_use]
    pub const fn flags(self) -> u8 {
        match self {
            Self::HostToDevice => 0x00,
            Self::DeviceToHost => 0x80,
        }
    }
}

/// One bulk transfer within a BOT command sequence.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Display)]
pub enum TransferStage {
    /// The 31-byte command frame written to OUT.
    #[strum(to_string = "command")]
    Command,
    /// The optional data stage, OUT for writes and IN for reads.
    #[strum(to_string = "data")]
    Data,
    /// The 13-byte status envelope read from IN.
    #[strum(to_string = "status")]
    Status,
}

/// One step of the device open sequence.
#[derive(Debug, Clone, Copy, Eq, PartialEq, EnumIter, Display)]
pub enum OpenStep {
    #[strum(to_string = "create libusb context")]
    Context,
    #[strum(to_string = "open device")]
    Device,
    #[strum(to_string = "auto-detach kernel driver")]
    DetachKernelDriver,
    #[strum(to_string = "select configuration")]
    Configuration,
    #[strum(to_string = "claim interface")]
    ClaimInterface,
    #[strum(to_string = "locate bulk OUT endpoint")]
    OutEndpoint,
    #[strum(to_string = "locate bulk IN endpoint")]
    InEndpoint,
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use pretty_assertions::assert_eq;
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn signatures_spell_bot_magic() {
        assert_eq!([0x55, 0x53, 0x42, 0x43], CBW_SIGNATURE);
        assert_eq!([0x55, 0x53, 0x42, 0x53], CSW_SIGNATURE);
    }

    #[test]
    fn open_steps_have_distinct_descriptions() {
        let names: Vec<String> = OpenStep::iter().map(|step| step.to_string()).collect();
        let distinct: HashSet<&str> = names.iter().map(String::as_str).collect();
        assert_eq!(names.len(), distinct.len());
    }
}
