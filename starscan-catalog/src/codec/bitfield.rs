//! Table-driven extraction of sub-byte bit-fields.
//!
//! Several binary catalogs pack coordinates, magnitudes, proper motion,
//! and epoch into fields that are not byte-aligned: a declination offset
//! may start three bits into byte 3 and run 21 bits across bytes 3..=5.
//! Rather than hand-inlining shift/mask sequences per use, each codec
//! declares its layout as a const table of [`FieldSpec`]s and this module
//! does the reconstruction. Bit numbering is big-endian MSB-first: bit 0
//! is the most significant bit of a byte, and a multi-byte field's first
//! bits are its most significant.

/// Location of one packed value inside a fixed-width record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackedField {
    /// Index of the first byte the field touches.
    pub byte: usize,
    /// Offset of the field's most significant bit within that byte,
    /// 0 = MSB, 7 = LSB.
    pub bit: u32,
    /// Field width in bits, 1..=32.
    pub width: u32,
}

impl PackedField {
    pub const fn new(byte: usize, bit: u32, width: u32) -> Self {
        Self { byte, bit, width }
    }

    /// Largest value the field can hold.
    pub const fn max_value(&self) -> u32 {
        if self.width >= 32 {
            u32::MAX
        } else {
            (1u32 << self.width) - 1
        }
    }

    /// Extracts the unsigned value, MSB-first across byte boundaries.
    /// `None` if the record is too short for the field.
    pub fn extract(&self, raw: &[u8]) -> Option<u32> {
        let total_bits = self.bit as usize + self.width as usize;
        let last_byte = self.byte + (total_bits - 1) / 8;
        if last_byte >= raw.len() {
            return None;
        }

        let mut value: u64 = 0;
        let mut remaining = self.width;
        let mut byte_idx = self.byte;
        let mut bit_idx = self.bit;

        while remaining > 0 {
            let avail = 8 - bit_idx;
            let take = avail.min(remaining);
            let bits = (raw[byte_idx] as u64 >> (avail - take)) & ((1u64 << take) - 1);
            value = (value << take) | bits;

            remaining -= take;
            bit_idx += take;
            if bit_idx == 8 {
                bit_idx = 0;
                byte_idx += 1;
            }
        }

        Some(value as u32)
    }
}

/// One numeric field of a bit-packed record: location, scale, and an
/// optional separate sign bit (set = negative).
///
/// Decoded value is `offset + sign * raw / divisor`, matching how the
/// catalogs document their scales (e.g. a magnitude stored as
/// `7.50 + value / 100.0`).
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub field: PackedField,
    pub offset: f64,
    pub divisor: f64,
    pub sign: Option<PackedField>,
}

impl FieldSpec {
    /// An unsigned field decoded as `raw / divisor`.
    pub const fn scaled(byte: usize, bit: u32, width: u32, divisor: f64) -> Self {
        Self {
            field: PackedField::new(byte, bit, width),
            offset: 0.0,
            divisor,
            sign: None,
        }
    }

    /// An unsigned field decoded as `offset + raw / divisor`.
    pub const fn offset_scaled(byte: usize, bit: u32, width: u32, offset: f64, divisor: f64) -> Self {
        Self {
            field: PackedField::new(byte, bit, width),
            offset,
            divisor,
            sign: None,
        }
    }

    /// A magnitude-and-sign pair: the value field plus a one-bit sign
    /// field elsewhere in the record, decoded as `±raw / divisor`.
    pub const fn signed(
        byte: usize,
        bit: u32,
        width: u32,
        divisor: f64,
        sign_byte: usize,
        sign_bit: u32,
    ) -> Self {
        Self {
            field: PackedField::new(byte, bit, width),
            offset: 0.0,
            divisor,
            sign: Some(PackedField::new(sign_byte, sign_bit, 1)),
        }
    }

    /// Raw unsigned field value, before scale and sign.
    pub fn read_raw(&self, raw: &[u8]) -> Option<u32> {
        self.field.extract(raw)
    }

    /// Fully decoded value.
    pub fn read(&self, raw: &[u8]) -> Option<f64> {
        let magnitude = self.field.extract(raw)? as f64;
        let signed = match &self.sign {
            Some(sign_field) if sign_field.extract(raw)? != 0 => -magnitude,
            _ => magnitude,
        };
        Some(self.offset + signed / self.divisor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_aligned_fields() {
        let raw = [0xAB, 0xCD, 0xEF];
        assert_eq!(PackedField::new(0, 0, 8).extract(&raw), Some(0xAB));
        assert_eq!(PackedField::new(1, 0, 16).extract(&raw), Some(0xCDEF));
        assert_eq!(PackedField::new(0, 0, 24).extract(&raw), Some(0xABCDEF));
    }

    #[test]
    fn test_sub_byte_fields() {
        // 0b1011_0110: bits 0..3 = 0b101, bits 3..8 = 0b10110
        let raw = [0b1011_0110];
        assert_eq!(PackedField::new(0, 0, 3).extract(&raw), Some(0b101));
        assert_eq!(PackedField::new(0, 3, 5).extract(&raw), Some(0b10110));
        assert_eq!(PackedField::new(0, 7, 1).extract(&raw), Some(0));
        assert_eq!(PackedField::new(0, 5, 1).extract(&raw), Some(1));
    }

    #[test]
    fn test_field_spanning_bytes_unaligned() {
        // 21-bit field starting at byte 3, bit 3: low 5 bits of byte 3,
        // all of bytes 4 and 5.
        let field = PackedField::new(3, 3, 21);

        let zeros = [0u8; 6];
        assert_eq!(field.extract(&zeros), Some(0));

        let mut raw = [0u8; 6];
        raw[3] = 0b0001_1111;
        raw[4] = 0xFF;
        raw[5] = 0xFF;
        assert_eq!(field.extract(&raw), Some(2_097_151));
        assert_eq!(field.max_value(), 2_097_151);

        // Neighboring bits must not leak in.
        raw[3] = 0b1111_1111;
        let mut with_neighbors = raw;
        with_neighbors[2] = 0xFF;
        assert_eq!(field.extract(&with_neighbors), Some(2_097_151));

        // Only the lowest-order bit set.
        let mut low = [0u8; 6];
        low[5] = 0x01;
        assert_eq!(field.extract(&low), Some(1));

        // Only the highest-order bit set.
        let mut high = [0u8; 6];
        high[3] = 0b0001_0000;
        assert_eq!(field.extract(&high), Some(1 << 20));
    }

    #[test]
    fn test_extract_short_record() {
        let raw = [0xFF; 4];
        assert_eq!(PackedField::new(3, 3, 21).extract(&raw), None);
        assert_eq!(PackedField::new(4, 0, 1).extract(&raw), None);
    }

    #[test]
    fn test_spec_offset_and_divisor() {
        // Magnitude stored as 7.50 + value/100.
        let mag = FieldSpec::offset_scaled(0, 0, 8, 7.50, 100.0);
        assert_eq!(mag.read(&[0]), Some(7.50));
        assert_eq!(mag.read(&[200]), Some(7.50 + 200.0 / 100.0));
    }

    #[test]
    fn test_spec_sign_bit() {
        // 14-bit value in bytes 1..3 (bits 0..14 of that span), sign at
        // byte 0 bit 7.
        let pm = FieldSpec::signed(1, 0, 14, 1.0, 0, 7);
        let positive = [0b0000_0000, 0b0000_0001, 0b0100_0000];
        assert_eq!(pm.read(&positive), Some(80.0));

        let negative = [0b0000_0001, 0b0000_0001, 0b0100_0000];
        assert_eq!(pm.read(&negative), Some(-80.0));
    }
}
