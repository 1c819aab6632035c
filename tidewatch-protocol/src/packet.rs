//! Packet encoding and decoding for the platform protocol.
//!
//! Packet format:
//! - START (1 byte): `$` synchronization byte
//! - OP (1 byte): operation type, `R` for device reports
//! - LENGTH (2 bytes, BE): payload length
//! - SERIAL (12 bytes): ASCII device serial number
//! - VERSION (1 byte): protocol version, 0x5B
//! - COMMAND (2 bytes, BE): command code
//! - MODEL (1 byte): device model, 0x1D
//! - PACKET ID (1 byte)
//! - HEADER CRC (2 bytes, BE): CRC16/MODBUS over the 21 bytes above
//! - PAYLOAD (LENGTH bytes)
//! - PAYLOAD CRC (2 bytes, BE): only present when LENGTH > 0

use alloc::vec::Vec;

use crate::crc::crc16_modbus;

/// Packet synchronization byte
pub const FRAME_START: u8 = b'$';

/// Operation type used for every device-originated report
pub const OP_REPORT: u8 = b'R';

/// Protocol version byte
pub const PROTOCOL_VERSION: u8 = 0x5B;

/// Device model byte
pub const DEVICE_MODEL: u8 = 0x1D;

/// Fixed header length, excluding its CRC
pub const HEADER_LEN: usize = 21;

/// Length of each CRC field
pub const CRC_LEN: usize = 2;

/// Bytes needed before the payload length can be read (START, OP, LENGTH)
pub const LENGTH_FIELD_END: usize = 4;

/// Smallest valid packet: header and header CRC with no payload
pub const MIN_FRAME_LEN: usize = HEADER_LEN + CRC_LEN;

/// Largest payload the 16-bit length field can describe
pub const MAX_PAYLOAD_LEN: usize = u16::MAX as usize;

/// Length of the device serial field
pub const SERIAL_LEN: usize = 12;

const OFFSET_OP: usize = 1;
const OFFSET_LEN: usize = 2;
const OFFSET_SERIAL: usize = 4;
const OFFSET_VERSION: usize = 16;
const OFFSET_COMMAND: usize = 17;
const OFFSET_MODEL: usize = 19;
const OFFSET_PACKET_ID: usize = 20;

/// Errors that can occur during packet encoding or decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PacketError {
    /// Payload does not fit the 16-bit length field
    PayloadTooLarge,
    /// Fewer bytes than a bare header and header CRC
    Truncated,
    /// First byte is not the start marker
    BadStartMarker,
    /// Header checksum mismatch
    HeaderCrc { expected: u16, actual: u16 },
    /// Declared payload length disagrees with the bytes carried
    LengthMismatch { declared: u16, carried: usize },
    /// Payload checksum mismatch
    PayloadCrc { expected: u16, actual: u16 },
}

impl PacketError {
    /// Returns true for checksum failures, as opposed to structural ones
    pub fn is_crc(&self) -> bool {
        matches!(
            self,
            PacketError::HeaderCrc { .. } | PacketError::PayloadCrc { .. }
        )
    }
}

/// Total on-wire length of a packet carrying `payload_len` payload bytes
pub const fn frame_len(payload_len: u16) -> usize {
    let len = payload_len as usize;
    if len == 0 {
        HEADER_LEN + CRC_LEN
    } else {
        HEADER_LEN + CRC_LEN + len + CRC_LEN
    }
}

/// Twelve-byte ASCII device serial number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceSerial([u8; SERIAL_LEN]);

impl DeviceSerial {
    /// Wrap raw serial bytes
    pub const fn from_bytes(bytes: [u8; SERIAL_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse a serial from text
    ///
    /// Returns `None` unless `text` is exactly 12 printable ASCII characters.
    pub fn parse(text: &str) -> Option<Self> {
        let bytes = text.as_bytes();
        if bytes.len() != SERIAL_LEN || !bytes.iter().all(|b| b.is_ascii_graphic()) {
            return None;
        }
        let mut out = [0u8; SERIAL_LEN];
        out.copy_from_slice(bytes);
        Some(Self(out))
    }

    /// Raw serial bytes as sent on the wire
    pub fn as_bytes(&self) -> &[u8; SERIAL_LEN] {
        &self.0
    }
}

impl Default for DeviceSerial {
    fn default() -> Self {
        Self(*b"000000065531")
    }
}

/// Fixed 21-byte packet header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Header {
    /// Operation type
    pub op_type: u8,
    /// Payload length in bytes
    pub payload_len: u16,
    /// Device serial number
    pub serial: DeviceSerial,
    /// Protocol version
    pub version: u8,
    /// Command code
    pub command: u16,
    /// Device model
    pub model: u8,
    /// Packet identifier
    pub packet_id: u8,
}

impl Header {
    /// Write the header into the first 21 bytes of `out`
    fn write(&self, out: &mut [u8; HEADER_LEN]) {
        out[0] = FRAME_START;
        out[OFFSET_OP] = self.op_type;
        out[OFFSET_LEN..OFFSET_LEN + 2].copy_from_slice(&self.payload_len.to_be_bytes());
        out[OFFSET_SERIAL..OFFSET_SERIAL + SERIAL_LEN].copy_from_slice(self.serial.as_bytes());
        out[OFFSET_VERSION] = self.version;
        out[OFFSET_COMMAND..OFFSET_COMMAND + 2].copy_from_slice(&self.command.to_be_bytes());
        out[OFFSET_MODEL] = self.model;
        out[OFFSET_PACKET_ID] = self.packet_id;
    }

    /// Read a header from the first 21 bytes of `bytes`
    fn read(bytes: &[u8; HEADER_LEN]) -> Self {
        let mut serial = [0u8; SERIAL_LEN];
        serial.copy_from_slice(&bytes[OFFSET_SERIAL..OFFSET_SERIAL + SERIAL_LEN]);
        Self {
            op_type: bytes[OFFSET_OP],
            payload_len: u16::from_be_bytes([bytes[OFFSET_LEN], bytes[OFFSET_LEN + 1]]),
            serial: DeviceSerial(serial),
            version: bytes[OFFSET_VERSION],
            command: u16::from_be_bytes([bytes[OFFSET_COMMAND], bytes[OFFSET_COMMAND + 1]]),
            model: bytes[OFFSET_MODEL],
            packet_id: bytes[OFFSET_PACKET_ID],
        }
    }

    /// Read the payload length from a partially received frame
    ///
    /// Returns `None` until the START, OP and LENGTH bytes are available.
    pub fn peek_payload_len(partial: &[u8]) -> Option<u16> {
        if partial.len() < LENGTH_FIELD_END {
            return None;
        }
        Some(u16::from_be_bytes([partial[OFFSET_LEN], partial[OFFSET_LEN + 1]]))
    }
}

/// A parsed or constructed platform packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Packet header
    pub header: Header,
    /// Payload data
    pub payload: Vec<u8>,
}

impl Packet {
    /// Create a packet with the fixed protocol version and device model
    pub fn new(
        serial: DeviceSerial,
        op_type: u8,
        command: u16,
        packet_id: u8,
        payload: &[u8],
    ) -> Result<Self, PacketError> {
        let payload_len =
            u16::try_from(payload.len()).map_err(|_| PacketError::PayloadTooLarge)?;

        Ok(Self {
            header: Header {
                op_type,
                payload_len,
                serial,
                version: PROTOCOL_VERSION,
                command,
                model: DEVICE_MODEL,
                packet_id,
            },
            payload: Vec::from(payload),
        })
    }

    /// Create a device report with no payload
    pub fn empty(serial: DeviceSerial, command: u16) -> Self {
        Self {
            header: Header {
                op_type: OP_REPORT,
                payload_len: 0,
                serial,
                version: PROTOCOL_VERSION,
                command,
                model: DEVICE_MODEL,
                packet_id: 0,
            },
            payload: Vec::new(),
        }
    }

    /// Command code carried in the header
    pub fn command(&self) -> u16 {
        self.header.command
    }

    /// Total encoded length
    pub fn encoded_len(&self) -> usize {
        frame_len(self.header.payload_len)
    }

    /// Encode this packet into its wire bytes
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());

        let mut header = [0u8; HEADER_LEN];
        self.header.write(&mut header);
        out.extend_from_slice(&header);
        out.extend_from_slice(&crc16_modbus(&header).to_be_bytes());

        if !self.payload.is_empty() {
            out.extend_from_slice(&self.payload);
            out.extend_from_slice(&crc16_modbus(&self.payload).to_be_bytes());
        }

        out
    }

    /// Decode and validate a complete packet
    ///
    /// The header checksum is always verified before the payload checksum,
    /// and the declared payload length must match the bytes carried.
    pub fn decode(bytes: &[u8]) -> Result<Self, PacketError> {
        if bytes.len() < MIN_FRAME_LEN {
            return Err(PacketError::Truncated);
        }
        if bytes[0] != FRAME_START {
            return Err(PacketError::BadStartMarker);
        }

        let mut raw_header = [0u8; HEADER_LEN];
        raw_header.copy_from_slice(&bytes[..HEADER_LEN]);
        let expected = crc16_modbus(&raw_header);
        let actual = u16::from_be_bytes([bytes[HEADER_LEN], bytes[HEADER_LEN + 1]]);
        if expected != actual {
            return Err(PacketError::HeaderCrc { expected, actual });
        }

        let header = Header::read(&raw_header);
        if bytes.len() != frame_len(header.payload_len) {
            let carried = bytes.len().saturating_sub(MIN_FRAME_LEN + CRC_LEN);
            return Err(PacketError::LengthMismatch {
                declared: header.payload_len,
                carried,
            });
        }

        if header.payload_len == 0 {
            return Ok(Self {
                header,
                payload: Vec::new(),
            });
        }

        let payload_end = MIN_FRAME_LEN + header.payload_len as usize;
        let payload = &bytes[MIN_FRAME_LEN..payload_end];
        let expected = crc16_modbus(payload);
        let actual = u16::from_be_bytes([bytes[payload_end], bytes[payload_end + 1]]);
        if expected != actual {
            return Err(PacketError::PayloadCrc { expected, actual });
        }

        Ok(Self {
            header,
            payload: Vec::from(payload),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn serial() -> DeviceSerial {
        DeviceSerial::parse("000000065531").unwrap()
    }

    #[test]
    fn test_heartbeat_layout() {
        let bytes = Packet::empty(serial(), 0x0000).encode();

        assert_eq!(bytes.len(), 23);
        assert_eq!(bytes[0], b'$');
        assert_eq!(bytes[1], b'R');
        assert_eq!(&bytes[2..4], &[0x00, 0x00]); // length
        assert_eq!(&bytes[4..16], b"000000065531");
        assert_eq!(bytes[16], 0x5B); // version
        assert_eq!(&bytes[17..19], &[0x00, 0x00]); // command
        assert_eq!(bytes[19], 0x1D); // model
        assert_eq!(bytes[20], 0x00); // packet id

        let crc = crc16_modbus(&bytes[..21]);
        assert_eq!(&bytes[21..23], &crc.to_be_bytes());
    }

    #[test]
    fn test_payload_layout() {
        let packet = Packet::new(serial(), OP_REPORT, 0x1D00, 7, &[0xAA, 0xBB, 0xCC]).unwrap();
        let bytes = packet.encode();

        assert_eq!(bytes.len(), frame_len(3));
        assert_eq!(bytes.len(), 21 + 2 + 3 + 2);
        assert_eq!(&bytes[2..4], &[0x00, 0x03]);
        assert_eq!(&bytes[17..19], &[0x1D, 0x00]);
        assert_eq!(bytes[20], 7);
        assert_eq!(&bytes[23..26], &[0xAA, 0xBB, 0xCC]);

        let payload_crc = crc16_modbus(&[0xAA, 0xBB, 0xCC]);
        assert_eq!(&bytes[26..28], &payload_crc.to_be_bytes());
    }

    #[test]
    fn test_frame_len() {
        assert_eq!(frame_len(0), 23);
        assert_eq!(frame_len(1), 26);
        assert_eq!(frame_len(15), 40);
    }

    #[test]
    fn test_roundtrip_with_payload() {
        let original = Packet::new(serial(), OP_REPORT, 0x0001, 3, &[1, 2, 3, 4, 5]).unwrap();
        let decoded = Packet::decode(&original.encode()).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_decode_rejects_short_input() {
        assert_eq!(Packet::decode(b"$R"), Err(PacketError::Truncated));
    }

    #[test]
    fn test_decode_rejects_bad_start() {
        let mut bytes = Packet::empty(serial(), 0x0000).encode();
        bytes[0] = b'#';
        assert_eq!(Packet::decode(&bytes), Err(PacketError::BadStartMarker));
    }

    #[test]
    fn test_decode_header_crc_checked_first() {
        // Corrupt both the header and payload; the header error must win
        let mut bytes = Packet::new(serial(), OP_REPORT, 0x0001, 0, &[9, 9]).unwrap().encode();
        bytes[5] ^= 0xFF;
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;

        let err = Packet::decode(&bytes).unwrap_err();
        assert!(matches!(err, PacketError::HeaderCrc { .. }));
        assert!(err.is_crc());
    }

    #[test]
    fn test_decode_payload_crc() {
        let mut bytes = Packet::new(serial(), OP_REPORT, 0x0001, 0, &[1, 2, 3]).unwrap().encode();
        bytes[24] ^= 0x01;
        assert!(matches!(
            Packet::decode(&bytes),
            Err(PacketError::PayloadCrc { .. })
        ));
    }

    #[test]
    fn test_decode_length_mismatch() {
        let mut bytes = Packet::new(serial(), OP_REPORT, 0x0001, 0, &[1, 2, 3]).unwrap().encode();
        bytes.pop();
        assert_eq!(
            Packet::decode(&bytes),
            Err(PacketError::LengthMismatch {
                declared: 3,
                carried: 2
            })
        );
    }

    #[test]
    fn test_peek_payload_len() {
        assert_eq!(Header::peek_payload_len(b"$R\x01"), None);
        assert_eq!(Header::peek_payload_len(b"$R\x01\x02"), Some(0x0102));
    }

    #[test]
    fn test_payload_too_large() {
        let big = alloc::vec![0u8; MAX_PAYLOAD_LEN + 1];
        assert_eq!(
            Packet::new(serial(), OP_REPORT, 0x1D09, 0, &big),
            Err(PacketError::PayloadTooLarge)
        );
    }

    #[test]
    fn test_serial_parse() {
        assert!(DeviceSerial::parse("000000065531").is_some());
        assert!(DeviceSerial::parse("short").is_none());
        assert!(DeviceSerial::parse("00000006553 ").is_none());
        assert_eq!(DeviceSerial::default().as_bytes(), b"000000065531");
    }
}
