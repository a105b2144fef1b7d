//! # Modbus Response Decoder
//!
//! Validates Read Holding Registers responses and decodes float payloads.

use super::crc::frame_crc;
use super::protocol::*;

/// Validate a response against the request it answers
///
/// Checks run in a fixed order and the first failure wins:
/// length, slave id, function code, CRC, byte count.
///
/// # Returns
///
/// * `Result<[u8; 4], ReadError>` - The first four payload bytes in frame order
pub fn validate_response(
    response: &[u8],
    request: &ModbusRequestFrame,
) -> Result<[u8; 4], ReadError> {
    if response.len() < MODBUS_MIN_RESPONSE_SIZE {
        return Err(ReadError::FrameTooShort {
            len: response.len(),
            needed: MODBUS_MIN_RESPONSE_SIZE,
        });
    }

    if response[0] != request.slave_id() {
        return Err(ReadError::SlaveMismatch {
            expected: request.slave_id(),
            received: response[0],
        });
    }

    if response[1] != request.function() {
        return Err(ReadError::FunctionMismatch {
            expected: request.function(),
            received: response[1],
        });
    }

    // Length already checked, the trailer is present
    if let Some((calculated, received)) = frame_crc(response) {
        if calculated != received {
            return Err(ReadError::CrcMismatch {
                expected: calculated,
                received,
            });
        }
    }

    let byte_count = response[MODBUS_BYTE_COUNT_OFFSET];
    if byte_count < MODBUS_FLOAT_BYTE_COUNT {
        return Err(ReadError::InsufficientByteCount(byte_count));
    }

    // CRC can be valid over a frame that holds fewer data bytes than declared
    let needed = MODBUS_DATA_OFFSET + byte_count as usize + MODBUS_CRC_SIZE;
    if response.len() < needed {
        return Err(ReadError::FrameTooShort {
            len: response.len(),
            needed,
        });
    }

    let data_end = MODBUS_DATA_OFFSET + MODBUS_FLOAT_BYTE_COUNT as usize;

    let mut payload = [0u8; 4];
    payload.copy_from_slice(&response[MODBUS_DATA_OFFSET..data_end]);
    Ok(payload)
}

/// Decode a word-swapped (CDAB) IEEE-754 float
///
/// Payload bytes `p0 p1 p2 p3` form the word `p2 p3 p0 p1`.
///
/// # Examples
///
/// ```
/// use aquanode::modbus::decoder::decode_float_cdab;
///
/// assert_eq!(decode_float_cdab([0x00, 0x00, 0x41, 0xCC]), 25.5);
/// ```
pub fn decode_float_cdab(payload: [u8; 4]) -> f32 {
    let [p0, p1, p2, p3] = payload;
    let raw = (u32::from(p2) << 24) | (u32::from(p3) << 16) | (u32::from(p0) << 8) | u32::from(p1);
    f32::from_bits(raw)
}

/// Validate a response and decode its float in one step
pub fn decode_float_response(
    response: &[u8],
    request: &ModbusRequestFrame,
) -> Result<f32, ReadError> {
    validate_response(response, request).map(decode_float_cdab)
}
