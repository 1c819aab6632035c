//! CRC16/MODBUS checksum
//!
//! Reflected polynomial 0xA001 (0x8005 normal form), seed 0xFFFF, no final
//! XOR. The platform rejects anything that is not bit-exact.

use crc::{Crc, CRC_16_MODBUS};

const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_MODBUS);

/// Compute the CRC16/MODBUS checksum of `data`
pub fn crc16_modbus(data: &[u8]) -> u16 {
    CRC16.checksum(data)
}
