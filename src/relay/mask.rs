//! Relay command bitmask
//!
//! Bit `i` drives relay `i` (1 = output HIGH). Only bits 0-3 map to a
//! physical output; bits 4-7 are carried but never acted upon.

/// Number of physical relay outputs
pub const RELAY_CHANNELS: usize = 4;

/// Eight-bit relay command as received on the downlink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RelayMask(u8);

impl RelayMask {
    /// Every output HIGH, the watchdog fallback
    pub const SAFE: RelayMask = RelayMask(0xFF);

    pub const fn new(bits: u8) -> Self {
        Self(bits)
    }

    /// Raw byte, unused bits included
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Desired level of one channel
    ///
    /// Channels past [`RELAY_CHANNELS`] always read LOW.
    pub const fn channel(self, index: usize) -> bool {
        index < RELAY_CHANNELS && self.0 & (1 << index) != 0
    }

    /// Copy of the mask with one channel's bit replaced
    pub const fn with_channel(self, index: usize, high: bool) -> Self {
        if index >= RELAY_CHANNELS {
            return self;
        }
        let bit = 1u8 << index;
        if high {
            Self(self.0 | bit)
        } else {
            Self(self.0 & !bit)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_bits() {
        let mask = RelayMask::new(0b0101);
        assert!(mask.channel(0));
        assert!(!mask.channel(1));
        assert!(mask.channel(2));
        assert!(!mask.channel(3));
    }

    #[test]
    fn test_upper_bits_are_not_channels() {
        let mask = RelayMask::new(0xF0);
        for i in 0..8 {
            assert!(!mask.channel(i), "channel {} should read LOW", i);
        }
    }

    #[test]
    fn test_with_channel() {
        let mask = RelayMask::SAFE.with_channel(1, false);
        assert_eq!(mask.bits(), 0xFD);
        assert_eq!(mask.with_channel(1, true), RelayMask::SAFE);

        // Out-of-range index leaves the byte alone
        assert_eq!(RelayMask::new(0x0F).with_channel(6, true).bits(), 0x0F);
    }
}
