//! HDLC address types
//!
//! Each address byte carries 7 bits of address; the low bit is set only on
//! the last byte. Server addresses may be split into an upper (logical
//! device) and lower (physical device) part and take 1, 2 or 4 bytes;
//! client addresses always take one byte.

use dlms_core::{DlmsError, DlmsResult};
use std::fmt;

/// Reserved HDLC addresses
pub mod reserved {
    pub const NO_STATION: u16 = 0x00;
    pub const CLIENT_MANAGEMENT_PROCESS: u16 = 0x01;
    pub const CLIENT_PUBLIC_CLIENT: u16 = 0x10;
    pub const SERVER_UPPER_MANAGEMENT_LOGICAL_DEVICE: u16 = 0x01;
}

const ONE_BYTE_UPPER_BOUND: u16 = 0x7F;
const TWO_BYTE_UPPER_BOUND: u16 = 0x3FFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HdlcAddress {
    byte_length: usize,
    logical_id: u16,
    physical_id: u16,
}

impl HdlcAddress {
    /// One-byte address
    pub fn new(logical_id: u16) -> DlmsResult<Self> {
        if logical_id > ONE_BYTE_UPPER_BOUND {
            return Err(DlmsError::InvalidData(format!(
                "One byte address exceeded upper bound of 0x{:02X}",
                ONE_BYTE_UPPER_BOUND
            )));
        }
        Ok(Self {
            byte_length: 1,
            logical_id,
            physical_id: 0,
        })
    }

    /// Server address with upper and lower part
    ///
    /// Both parts use the same width: 2 bytes total when both fit in 7
    /// bits, 4 bytes otherwise.
    pub fn new_with_physical(logical_id: u16, physical_id: u16) -> DlmsResult<Self> {
        if physical_id == 0 {
            return Self::new(logical_id);
        }
        let width = Self::width_of(logical_id)?.max(Self::width_of(physical_id)?);
        Ok(Self {
            byte_length: width * 2,
            logical_id,
            physical_id,
        })
    }

    fn width_of(address: u16) -> DlmsResult<usize> {
        match address {
            0..=ONE_BYTE_UPPER_BOUND => Ok(1),
            0..=TWO_BYTE_UPPER_BOUND => Ok(2),
            _ => Err(DlmsError::InvalidData(format!(
                "Address 0x{:X} is out of upper bound 0x{:X}",
                address, TWO_BYTE_UPPER_BOUND
            ))),
        }
    }

    pub fn logical_id(&self) -> u16 {
        self.logical_id
    }

    pub fn physical_id(&self) -> u16 {
        self.physical_id
    }

    pub fn byte_length(&self) -> usize {
        self.byte_length
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.byte_length);
        match self.byte_length {
            1 => out.push((self.logical_id as u8) << 1),
            2 => {
                out.push((self.logical_id as u8) << 1);
                out.push((self.physical_id as u8) << 1);
            }
            _ => {
                for part in [self.logical_id, self.physical_id] {
                    out.push(((part >> 7) as u8 & 0x7F) << 1);
                    out.push((part as u8 & 0x7F) << 1);
                }
            }
        }
        if let Some(last) = out.last_mut() {
            *last |= 0x01;
        }
        out
    }

    /// Read an address from the start of `data`
    ///
    /// Returns the address and the number of bytes it took.
    pub fn read_from(data: &[u8]) -> DlmsResult<(Self, usize)> {
        let length = data
            .iter()
            .take(4)
            .position(|&b| b & 0x01 != 0)
            .map(|pos| pos + 1)
            .ok_or_else(|| DlmsError::FrameInvalid("HDLC address is illegal in frame".to_string()))?;

        let seven = |b: u8| (b >> 1) as u16;
        let address = match length {
            1 => Self::new(seven(data[0]))?,
            2 => Self::new_with_physical(seven(data[0]), seven(data[1]))?,
            4 => Self::new_with_physical(
                seven(data[0]) << 7 | seven(data[1]),
                seven(data[2]) << 7 | seven(data[3]),
            )?,
            _ => {
                return Err(DlmsError::FrameInvalid(format!(
                    "HDLC address has an invalid byte length of {}",
                    length
                )));
            }
        };
        // Keep the on-wire width even when the values would fit in fewer bytes
        Ok((Self { byte_length: length, ..address }, length))
    }
}

impl fmt::Display for HdlcAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.byte_length == 1 {
            write!(f, "{:02X}", self.logical_id)
        } else {
            write!(f, "{:X}-{:X}", self.logical_id, self.physical_id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_byte_address() {
        let addr = HdlcAddress::new(reserved::CLIENT_PUBLIC_CLIENT).unwrap();
        assert_eq!(addr.encode(), vec![0x21]);
        assert!(HdlcAddress::new(0x80).is_err());
    }

    #[test]
    fn test_read_two_byte_address() {
        let (addr, len) = HdlcAddress::read_from(&[0x02, 0x23, 0xFF]).unwrap();
        assert_eq!(len, 2);
        assert_eq!(addr.logical_id(), 0x01);
        assert_eq!(addr.physical_id(), 0x11);
        assert_eq!(addr.encode(), vec![0x02, 0x23]);
    }

    #[test]
    fn test_four_byte_address_round_trip() {
        let addr = HdlcAddress::new_with_physical(0x01, 0x3FF).unwrap();
        assert_eq!(addr.byte_length(), 4);
        let encoded = addr.encode();
        let (decoded, len) = HdlcAddress::read_from(&encoded).unwrap();
        assert_eq!(len, 4);
        assert_eq!(decoded, addr);
    }

    #[test]
    fn test_missing_stop_bit() {
        assert!(HdlcAddress::read_from(&[0x02, 0x04, 0x06, 0x08, 0x0A]).is_err());
        assert!(HdlcAddress::read_from(&[0x02, 0x04, 0x07]).is_err());
    }
}
