//! HDLC frame check sequence (CRC-16/X.25, as in RFC 1662)

use dlms_core::{DlmsError, DlmsResult};

const INITIAL_FCS: u16 = 0xFFFF;
/// Residue left after running the calculator over data plus its own FCS
const GOOD_FCS: u16 = 0xF0B8;
/// Bit-reversed 0x1021
const POLYNOMIAL: u16 = 0x8408;

static FCS_TABLE: once_cell::sync::Lazy<[u16; 256]> = once_cell::sync::Lazy::new(|| {
    let mut table = [0u16; 256];
    for (b, entry) in table.iter_mut().enumerate() {
        let mut v = b as u16;
        for _ in 0..8 {
            v = if v & 1 == 1 { (v >> 1) ^ POLYNOMIAL } else { v >> 1 };
        }
        *entry = v;
    }
    table
});

/// Running FCS over a byte sequence
#[derive(Debug, Clone)]
pub struct FcsCalc {
    value: u16,
}

impl FcsCalc {
    pub fn new() -> Self {
        Self { value: INITIAL_FCS }
    }

    pub fn update(&mut self, byte: u8) {
        self.value = (self.value >> 8) ^ FCS_TABLE[((self.value ^ byte as u16) & 0xFF) as usize];
    }

    pub fn update_bytes(&mut self, data: &[u8]) {
        for &byte in data {
            self.update(byte);
        }
    }

    /// FCS to append after the bytes seen so far, least significant byte first
    pub fn fcs_value_bytes(&self) -> [u8; 2] {
        (self.value ^ 0xFFFF).to_le_bytes()
    }

    /// Check a sequence that already ends with its FCS
    pub fn validate(&self) -> DlmsResult<()> {
        if self.value == GOOD_FCS {
            Ok(())
        } else {
            Err(DlmsError::FrameInvalid(format!(
                "FCS has wrong value: 0x{:04X}, expected 0x{:04X}",
                self.value, GOOD_FCS
            )))
        }
    }
}

impl Default for FcsCalc {
    fn default() -> Self {
        Self::new()
    }
}

/// FCS of `data`, ready to append
pub fn fcs16(data: &[u8]) -> [u8; 2] {
    let mut calc = FcsCalc::new();
    calc.update_bytes(data);
    calc.fcs_value_bytes()
}

/// Validate `data` whose last two bytes are its FCS
pub fn check_fcs16(data: &[u8]) -> DlmsResult<()> {
    let mut calc = FcsCalc::new();
    calc.update_bytes(data);
    calc.validate()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_snrm_fcs() {
        // SNRM from public client 0x10 to server 0x01
        assert_eq!(fcs16(&[0xA0, 0x07, 0x03, 0x21, 0x93]), [0x0F, 0x01]);
    }

    #[test]
    fn test_appended_fcs_validates() {
        let mut data = vec![0x01, 0x02, 0x03];
        data.extend_from_slice(&fcs16(&data));
        assert!(check_fcs16(&data).is_ok());
        data[1] ^= 0xFF;
        assert!(check_fcs16(&data).is_err());
    }
}
