use std::collections::VecDeque;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use bon::Builder;
use tracing::trace;

use super::model::PanelDimensions;
use super::transport::BulkTransport;
use crate::error::FixtureError;
use crate::protocol::{CBW_LEN, CBW_SIGNATURE, CBW_TAG, CSW_SIGNATURE, Direction};

const DEFAULT_DIMENSIONS: PanelDimensions = PanelDimensions::from_raw(320, 240);
const DIMENSIONS_READ_SELECTOR: u8 = 0x02;

/// Scripted response to one bulk IN read.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum FakeInResponse {
    /// The device returns these bytes, truncated to the read buffer.
    Bytes(Vec<u8>),
    /// The transfer fails.
    Error(rusb::Error),
}

/// Scripted response to one bulk OUT write.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum FakeOutResponse {
    /// The whole buffer is accepted.
    Accept,
    /// Only the first `n` bytes are accepted.
    Short(usize),
    /// The transfer fails.
    Error(rusb::Error),
}

/// One completed bulk transfer observed by the fake device.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Transfer {
    /// Bytes accepted on the OUT endpoint.
    Out(Vec<u8>),
    /// Bytes returned on the IN endpoint.
    In(Vec<u8>),
}

/// Shared record of every transfer performed against a fake device.
///
/// Clones share the same record, so a test can keep one handle while the
/// session owns the transport.
#[derive(Debug, Clone, Default)]
pub struct TrafficLog {
    transfers: Arc<Mutex<Vec<Transfer>>>,
}

impl TrafficLog {
    /// Returns every transfer in order.
    #[must_use]
    pub fn transfers(&self) -> Vec<Transfer> {
        self.transfers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the payloads written to the OUT endpoint, in order.
    #[must_use]
    pub fn out_transfers(&self) -> Vec<Vec<u8>> {
        self.transfers()
            .into_iter()
            .filter_map(|transfer| match transfer {
                Transfer::Out(bytes) => Some(bytes),
                Transfer::In(_) => None,
            })
            .collect()
    }

    /// Returns the payloads read from the IN endpoint, in order.
    #[must_use]
    pub fn in_transfers(&self) -> Vec<Vec<u8>> {
        self.transfers()
            .into_iter()
            .filter_map(|transfer| match transfer {
                Transfer::In(bytes) => Some(bytes),
                Transfer::Out(_) => None,
            })
            .collect()
    }

    fn record(&self, transfer: Transfer) {
        self.transfers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(transfer);
    }
}

/// Parsed `WIDTHxHEIGHT` fixture.
#[derive(Debug, Clone, Copy, derive_more::Into)]
pub(crate) struct DimensionsFixture {
    dimensions: PanelDimensions,
}

impl FromStr for DimensionsFixture {
    type Err = FixtureError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || FixtureError::InvalidDimensions {
            value: value.to_string(),
        };
        let (width, height) = value
            .trim()
            .split_once(['x', 'X'])
            .ok_or_else(invalid)?;
        let dimensions = PanelDimensions::new(width.trim().parse()?, height.trim().parse()?)
            .ok_or_else(invalid)?;
        Ok(Self { dimensions })
    }
}

/// Parsed comma-separated hexadecimal IN responses.
#[derive(Debug, Clone, derive_more::Into)]
pub(crate) struct InResponsesFixture {
    responses: Vec<FakeInResponse>,
}

impl FromStr for InResponsesFixture {
    type Err = FixtureError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.trim().is_empty() {
            return Ok(Self {
                responses: Vec::new(),
            });
        }
        let responses = value
            .split(',')
            .map(|payload| {
                let cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
                hex::decode(cleaned).map(FakeInResponse::Bytes)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { responses })
    }
}

/// Settings for constructing a fake photo frame.
#[derive(Debug, Clone, Builder)]
pub(crate) struct FakeBackendConfig {
    #[builder(default = DEFAULT_DIMENSIONS)]
    dimensions: PanelDimensions,
    /// IN responses returned before the emulated device's own responses.
    #[builder(default)]
    in_responses: Vec<FakeInResponse>,
    /// OUT outcomes applied before writes are accepted unconditionally.
    #[builder(default)]
    out_responses: Vec<FakeOutResponse>,
}

/// In-memory photo frame speaking the bulk-only command protocol.
///
/// It answers dimension queries from its configured panel size and
/// acknowledges every complete command with a `USBS` envelope. Scripted
/// responses override what the emulated device would return, one transfer at
/// a time, while the emulated state still advances.
#[derive(Debug)]
pub(crate) struct FakeTransport {
    dimensions: PanelDimensions,
    in_script: VecDeque<FakeInResponse>,
    out_script: VecDeque<FakeOutResponse>,
    pending_in: VecDeque<Vec<u8>>,
    awaiting_data_out: usize,
    log: TrafficLog,
}

impl FakeTransport {
    pub(crate) fn new(config: FakeBackendConfig, log: TrafficLog) -> Self {
        Self {
            dimensions: config.dimensions,
            in_script: config.in_responses.into(),
            out_script: config.out_responses.into(),
            pending_in: VecDeque::new(),
            awaiting_data_out: 0,
            log,
        }
    }

    fn accept_out(&mut self, bytes: &[u8]) {
        if self.awaiting_data_out > 0 {
            self.awaiting_data_out = self.awaiting_data_out.saturating_sub(bytes.len());
            if self.awaiting_data_out == 0 {
                self.pending_in.push_back(status_envelope());
            }
            return;
        }

        let Some(command) = ParsedCommand::parse(bytes) else {
            trace!(len = bytes.len(), "fake device ignored unframed OUT transfer");
            return;
        };
        self.pending_in.clear();
        match command.direction {
            Direction::DeviceToHost => {
                let mut response = self.response_for(&command.cdb);
                response.resize(command.data_length, 0x00);
                self.pending_in.push_back(response);
                self.pending_in.push_back(status_envelope());
            }
            Direction::HostToDevice if command.data_length == 0 => {
                self.pending_in.push_back(status_envelope());
            }
            Direction::HostToDevice => {
                self.awaiting_data_out = command.data_length;
            }
        }
    }

    fn response_for(&self, cdb: &[u8]) -> Vec<u8> {
        if cdb.get(5) == Some(&DIMENSIONS_READ_SELECTOR) {
            let mut response = Vec::with_capacity(5);
            response.extend_from_slice(&self.dimensions.width().to_le_bytes());
            response.extend_from_slice(&self.dimensions.height().to_le_bytes());
            response.push(0x00);
            return response;
        }
        Vec::new()
    }
}

impl BulkTransport for FakeTransport {
    fn write_out(&mut self, data: &[u8], _timeout: Duration) -> Result<usize, rusb::Error> {
        let accepted = match self.out_script.pop_front().unwrap_or(FakeOutResponse::Accept) {
            FakeOutResponse::Accept => data.len(),
            FakeOutResponse::Short(limit) => limit.min(data.len()),
            FakeOutResponse::Error(error) => return Err(error),
        };

        self.log.record(Transfer::Out(data[..accepted].to_vec()));
        if accepted == data.len() {
            self.accept_out(data);
        }
        Ok(accepted)
    }

    fn read_in(&mut self, buffer: &mut [u8], _timeout: Duration) -> Result<usize, rusb::Error> {
        let emulated = self.pending_in.pop_front();
        let bytes = match self.in_script.pop_front() {
            Some(FakeInResponse::Bytes(bytes)) => bytes,
            Some(FakeInResponse::Error(error)) => return Err(error),
            None => emulated.ok_or(rusb::Error::Timeout)?,
        };

        let len = bytes.len().min(buffer.len());
        buffer[..len].copy_from_slice(&bytes[..len]);
        self.log.record(Transfer::In(bytes[..len].to_vec()));
        Ok(len)
    }
}

struct ParsedCommand {
    data_length: usize,
    direction: Direction,
    cdb: Vec<u8>,
}

impl ParsedCommand {
    fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != CBW_LEN || bytes[0..4] != CBW_SIGNATURE {
            return None;
        }
        let data_length = u32::from_le_bytes(bytes[8..12].try_into().ok()?);
        let direction = if bytes[12] & 0x80 == 0 {
            Direction::HostToDevice
        } else {
            Direction::DeviceToHost
        };
        let cdb_len = usize::from(bytes[14]).min(16);
        Some(Self {
            data_length: usize::try_from(data_length).ok()?,
            direction,
            cdb: bytes[15..15 + cdb_len].to_vec(),
        })
    }
}

fn status_envelope() -> Vec<u8> {
    let mut envelope = Vec::with_capacity(13);
    envelope.extend_from_slice(&CSW_SIGNATURE);
    envelope.extend_from_slice(&CBW_TAG);
    envelope.extend_from_slice(&0u32.to_le_bytes());
    envelope.push(0x00);
    envelope
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("320x240", 320, 240)]
    #[case(" 128 X 128 ", 128, 128)]
    fn dimensions_fixture_parses(#[case] raw: &str, #[case] width: u16, #[case] height: u16) {
        let fixture: DimensionsFixture = raw.parse().expect("fixture should parse");
        let dimensions: PanelDimensions = fixture.into();
        assert_eq!((width, height), (dimensions.width(), dimensions.height()));
    }

    #[rstest]
    #[case("320")]
    #[case("0x240")]
    fn dimensions_fixture_rejects_malformed_values(#[case] raw: &str) {
        let result = raw.parse::<DimensionsFixture>();
        assert_matches!(result, Err(FixtureError::InvalidDimensions { .. }));
    }

    #[test]
    fn in_responses_fixture_parses_hex_list() {
        let fixture: InResponsesFixture = "4001F00000, 55 53 42 53"
            .parse()
            .expect("fixture should parse");
        let responses: Vec<FakeInResponse> = fixture.into();
        assert_eq!(
            vec![
                FakeInResponse::Bytes(vec![0x40, 0x01, 0xF0, 0x00, 0x00]),
                FakeInResponse::Bytes(vec![0x55, 0x53, 0x42, 0x53]),
            ],
            responses
        );
    }

    #[test]
    fn in_responses_fixture_rejects_odd_hex() {
        let result = "ABC".parse::<InResponsesFixture>();
        assert_matches!(result, Err(FixtureError::InvalidHex(_)));
    }

    #[test]
    fn unframed_reads_time_out() {
        let config = FakeBackendConfig::builder().build();
        let mut transport = FakeTransport::new(config, TrafficLog::default());

        let mut buffer = [0u8; 13];
        let result = transport.read_in(&mut buffer, Duration::from_millis(1));
        assert_matches!(result, Err(rusb::Error::Timeout));
    }
}
