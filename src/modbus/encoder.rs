//! # Modbus Request Encoder
//!
//! Builds Read Holding Registers requests for 32-bit float values.

use super::crc::crc16_modbus;
use super::protocol::*;

/// Encode a request for the two registers holding one float
///
/// Layout: `[slave][0x03][addrHi][addrLo][0x00][0x02][crcLo][crcHi]`
///
/// # Examples
///
/// ```
/// use aquanode::modbus::encoder::encode_read_float_request;
///
/// let frame = encode_read_float_request(1, 2091);
/// assert_eq!(frame.as_bytes(), &[0x01, 0x03, 0x08, 0x2B, 0x00, 0x02, 0xB6, 0x63]);
/// ```
pub fn encode_read_float_request(slave_id: u8, start_address: u16) -> ModbusRequestFrame {
    let [addr_hi, addr_lo] = start_address.to_be_bytes();
    let [count_hi, count_lo] = MODBUS_FLOAT_REGISTER_COUNT.to_be_bytes();

    let mut frame = [
        slave_id,
        MODBUS_FUNC_READ_HOLDING_REGISTERS,
        addr_hi,
        addr_lo,
        count_hi,
        count_lo,
        0,
        0,
    ];

    let [crc_lo, crc_hi] = crc16_modbus(&frame[..6]).to_le_bytes();
    frame[6] = crc_lo;
    frame[7] = crc_hi;

    ModbusRequestFrame(frame)
}
