//! # CRC-16/MODBUS Implementation
//!
//! CRC-16 checksum used to validate Modbus RTU frames.
//!
//! **Polynomial**: 0xA001 (reflected 0x8005, LSB-first)
//! **Initial Value**: 0xFFFF
//! **Wire order**: low byte first

/// Reflected CRC-16/MODBUS polynomial
const CRC16_POLY: u16 = 0xA001;

/// CRC-16/MODBUS initial register value
const CRC16_INIT: u16 = 0xFFFF;

/// Precomputed CRC16 lookup table for fast calculation
const CRC16_TABLE: [u16; 256] = generate_crc16_table();

/// Generate CRC16 lookup table at compile time
const fn generate_crc16_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;

    while i < 256 {
        let mut crc = i as u16;
        let mut j = 0;

        while j < 8 {
            if (crc & 0x0001) != 0 {
                crc = (crc >> 1) ^ CRC16_POLY;
            } else {
                crc >>= 1;
            }
            j += 1;
        }

        table[i] = crc;
        i += 1;
    }

    table
}

/// Calculate CRC-16/MODBUS checksum using lookup table
///
/// # Arguments
///
/// * `data` - Frame bytes preceding the CRC trailer
///
/// # Examples
///
/// ```
/// use aquanode::modbus::crc::crc16_modbus;
///
/// let request = [0x01, 0x03, 0x08, 0x2B, 0x00, 0x02];
/// assert_eq!(crc16_modbus(&request), 0x63B6);
/// ```
pub fn crc16_modbus(data: &[u8]) -> u16 {
    let mut crc = CRC16_INIT;

    for &byte in data {
        crc = (crc >> 8) ^ CRC16_TABLE[((crc ^ byte as u16) & 0x00FF) as usize];
    }

    crc
}

/// Check a complete frame whose last two bytes are a little-endian CRC
///
/// Returns `(calculated, received)` so callers can report both.
/// Frames shorter than the trailer yield `None`.
pub fn frame_crc(frame: &[u8]) -> Option<(u16, u16)> {
    if frame.len() < 2 {
        return None;
    }

    let split = frame.len() - 2;
    let received = u16::from_le_bytes([frame[split], frame[split + 1]]);
    Some((crc16_modbus(&frame[..split]), received))
}

/// Bitwise CRC-16/MODBUS, used to verify the lookup table
#[allow(dead_code)]
fn crc16_modbus_slow(data: &[u8]) -> u16 {
    let mut crc = CRC16_INIT;

    for &byte in data {
        crc ^= byte as u16;

        for _ in 0..8 {
            if (crc & 0x0001) != 0 {
                crc = (crc >> 1) ^ CRC16_POLY;
            } else {
                crc >>= 1;
            }
        }
    }

    crc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc16_empty() {
        assert_eq!(crc16_modbus(&[]), 0xFFFF);
    }

    #[test]
    fn test_crc16_known_vectors() {
        // Oxygen register request (2091 = 0x082B)
        assert_eq!(crc16_modbus(&[0x01, 0x03, 0x08, 0x2B, 0x00, 0x02]), 0x63B6);

        // Temperature register request (2411 = 0x096B)
        assert_eq!(crc16_modbus(&[0x01, 0x03, 0x09, 0x6B, 0x00, 0x02]), 0x4BB6);

        // Common reference: read one register at 0
        assert_eq!(crc16_modbus(&[0x01, 0x03, 0x00, 0x00, 0x00, 0x01]), 0x0A84);

        // CRC-16/MODBUS check value
        assert_eq!(crc16_modbus(b"123456789"), 0x4B37);
    }

    #[test]
    fn test_crc16_lookup_table_matches_slow() {
        let test_data = [
            vec![0x01, 0x03, 0x04, 0x00, 0x00, 0x41, 0xCC],
            vec![0xFF, 0xFE, 0xFD],
            vec![0x00; 16],
            vec![0xFF; 10],
            (0u8..=255).collect::<Vec<u8>>(),
        ];

        for data in test_data.iter() {
            assert_eq!(
                crc16_modbus(data),
                crc16_modbus_slow(data),
                "CRC mismatch for data: {:02X?}",
                data
            );
        }
    }

    #[test]
    fn test_frame_crc_valid_response() {
        // 25.5 in CDAB order with its trailer
        let frame = [0x01, 0x03, 0x04, 0x00, 0x00, 0x41, 0xCC, 0xCA, 0x36];
        let (calculated, received) = frame_crc(&frame).unwrap();
        assert_eq!(calculated, received);
    }

    #[test]
    fn test_frame_crc_too_short() {
        assert!(frame_crc(&[0x01]).is_none());
    }

    #[test]
    fn test_single_bit_flip_always_detected() {
        let frame = [0x01, 0x03, 0x04, 0x33, 0x33, 0x41, 0x03, 0x75, 0x29];

        for byte in 0..frame.len() {
            for bit in 0..8 {
                let mut corrupted = frame;
                corrupted[byte] ^= 1 << bit;

                let (calculated, received) = frame_crc(&corrupted).unwrap();
                assert_ne!(
                    calculated, received,
                    "flip of byte {} bit {} went undetected",
                    byte, bit
                );
            }
        }
    }
}
