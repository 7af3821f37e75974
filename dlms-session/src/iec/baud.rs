//! Baud rate indicator table of IEC 62056-21 protocol mode C/E

use dlms_core::{DlmsError, DlmsResult};
use std::fmt;

/// Line speed a device advertises in its identification message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BaudRate {
    B300,
    B600,
    B1200,
    B2400,
    B4800,
    B9600,
    B19200,
}

impl BaudRate {
    pub const ALL: [BaudRate; 7] = [
        BaudRate::B300,
        BaudRate::B600,
        BaudRate::B1200,
        BaudRate::B2400,
        BaudRate::B4800,
        BaudRate::B9600,
        BaudRate::B19200,
    ];

    /// Map the indicator character `'0'..='6'`
    pub fn from_indicator(indicator: char) -> DlmsResult<Self> {
        match indicator {
            '0'..='6' => Ok(Self::ALL[indicator as usize - '0' as usize]),
            other => Err(DlmsError::UnknownBaudRate(other)),
        }
    }

    pub fn indicator(&self) -> char {
        (b'0' + *self as u8) as char
    }

    pub fn bits_per_second(&self) -> u32 {
        300 << (*self as u32)
    }
}

impl TryFrom<char> for BaudRate {
    type Error = DlmsError;

    fn try_from(indicator: char) -> DlmsResult<Self> {
        Self::from_indicator(indicator)
    }
}

impl From<BaudRate> for u32 {
    fn from(baud: BaudRate) -> u32 {
        baud.bits_per_second()
    }
}

impl fmt::Display for BaudRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} baud", self.bits_per_second())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indicator_table() {
        let expected = [300, 600, 1200, 2400, 4800, 9600, 19200];
        for (c, bps) in ('0'..='6').zip(expected) {
            let baud = BaudRate::from_indicator(c).unwrap();
            assert_eq!(baud.bits_per_second(), bps);
            assert_eq!(baud.indicator(), c);
        }
    }

    #[test]
    fn test_unknown_indicators() {
        for c in ['7', '9', 'A', 'E', ' ', '\n'] {
            match BaudRate::from_indicator(c) {
                Err(DlmsError::UnknownBaudRate(got)) => assert_eq!(got, c),
                other => panic!("{:?} mapped to {:?}", c, other),
            }
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(BaudRate::B9600.to_string(), "9600 baud");
        assert_eq!(u32::from(BaudRate::B19200), 19200);
    }
}
