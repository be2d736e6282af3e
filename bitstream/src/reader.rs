//! Bounds-checked bit-level reader.

use crate::error::{BitError, BitResult};
use crate::writer::VARU32_MAX_BYTES;

/// A bit-level reader over a byte slice.
///
/// Every operation is bounds-checked; malformed input yields an error, never
/// a panic. Bits are consumed most-significant first, mirroring [`crate::BitWriter`].
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    cursor: usize,
}

impl<'a> BitReader<'a> {
    /// Creates a reader over `data`.
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, cursor: 0 }
    }

    /// Returns the number of bits left to read.
    #[must_use]
    pub const fn bits_remaining(&self) -> usize {
        self.data.len().saturating_mul(8).saturating_sub(self.cursor)
    }

    /// Returns the current bit position.
    #[must_use]
    pub const fn bit_position(&self) -> usize {
        self.cursor
    }

    /// Returns `true` when no bits remain.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bits_remaining() == 0
    }

    /// Reads a single bit.
    pub fn read_bit(&mut self) -> BitResult<bool> {
        if self.bits_remaining() == 0 {
            return Err(BitError::UnexpectedEof {
                requested: 1,
                available: 0,
            });
        }
        let bit = (self.data[self.cursor / 8] >> (7 - self.cursor % 8)) & 1;
        self.cursor += 1;
        Ok(bit == 1)
    }

    /// Reads `bits` bits as an unsigned integer, most-significant first.
    pub fn read_bits(&mut self, bits: usize) -> BitResult<u64> {
        if bits == 0 || bits > 64 {
            return Err(BitError::InvalidWidth { bits });
        }
        if bits > self.bits_remaining() {
            return Err(BitError::UnexpectedEof {
                requested: bits,
                available: self.bits_remaining(),
            });
        }
        let mut value = 0u64;
        for _ in 0..bits {
            value = (value << 1) | u64::from(self.read_bit()?);
        }
        Ok(value)
    }

    /// Reads a variable-length `u32` written by [`crate::BitWriter::write_varu32`].
    pub fn read_varu32(&mut self) -> BitResult<u32> {
        // Accumulate in 64 bits: a malformed final group can carry bits
        // beyond the 32-bit range and must error, not wrap.
        let mut value: u64 = 0;
        for group in 0..VARU32_MAX_BYTES {
            let more = self.read_bit()?;
            let chunk = self.read_bits(7)?;
            value |= chunk << (group * 7);
            if !more {
                return u32::try_from(value).map_err(|_| BitError::VarIntTooLong {
                    max_bytes: VARU32_MAX_BYTES,
                });
            }
        }
        Err(BitError::VarIntTooLong {
            max_bytes: VARU32_MAX_BYTES,
        })
    }

    /// Skips zero-padding up to the next byte boundary.
    pub fn align_to_byte(&mut self) -> BitResult<()> {
        let rem = self.cursor % 8;
        if rem == 0 {
            return Ok(());
        }
        let skip = 8 - rem;
        if skip > self.bits_remaining() {
            return Err(BitError::UnexpectedEof {
                requested: skip,
                available: self.bits_remaining(),
            });
        }
        self.cursor += skip;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BitWriter;

    #[test]
    fn read_single_bits() {
        let mut r = BitReader::new(&[0b1010_0000]);
        assert!(r.read_bit().unwrap());
        assert!(!r.read_bit().unwrap());
        assert!(r.read_bit().unwrap());
    }

    #[test]
    fn eof_on_empty() {
        let mut r = BitReader::new(&[]);
        assert!(matches!(r.read_bit(), Err(BitError::UnexpectedEof { .. })));
    }

    #[test]
    fn read_bits_roundtrip() {
        let mut w = BitWriter::new();
        w.write_bits(0b101_1001, 7).unwrap();
        w.write_bits(0x1234, 16).unwrap();
        let bytes = w.finish();

        let mut r = BitReader::new(&bytes);
        assert_eq!(r.read_bits(7).unwrap(), 0b101_1001);
        assert_eq!(r.read_bits(16).unwrap(), 0x1234);
    }

    #[test]
    fn read_bits_eof_reports_counts() {
        let mut r = BitReader::new(&[0xFF]);
        let err = r.read_bits(16).unwrap_err();
        assert_eq!(
            err,
            BitError::UnexpectedEof {
                requested: 16,
                available: 8
            }
        );
    }

    #[test]
    fn rejects_zero_width() {
        let mut r = BitReader::new(&[0xFF]);
        assert!(matches!(r.read_bits(0), Err(BitError::InvalidWidth { .. })));
    }

    #[test]
    fn varu32_roundtrip_edges() {
        for value in [0u32, 1, 127, 128, 16_383, 16_384, u32::MAX] {
            let mut w = BitWriter::new();
            w.write_varu32(value);
            let bytes = w.finish();
            let mut r = BitReader::new(&bytes);
            assert_eq!(r.read_varu32().unwrap(), value, "value {value}");
        }
    }

    #[test]
    fn varu32_too_long() {
        // Six continuation groups never terminate a u32.
        let bytes = [0xFF; 8];
        let mut r = BitReader::new(&bytes);
        assert!(matches!(
            r.read_varu32(),
            Err(BitError::VarIntTooLong { .. })
        ));
    }

    #[test]
    fn align_skips_padding() {
        let mut w = BitWriter::new();
        w.write_bit(true);
        w.align_to_byte();
        w.write_bits(0xAB, 8).unwrap();
        let bytes = w.finish();

        let mut r = BitReader::new(&bytes);
        assert!(r.read_bit().unwrap());
        r.align_to_byte().unwrap();
        assert_eq!(r.read_bits(8).unwrap(), 0xAB);
    }

    #[test]
    fn position_tracks_reads() {
        let mut r = BitReader::new(&[0x00, 0x00]);
        assert_eq!(r.bit_position(), 0);
        r.read_bits(5).unwrap();
        assert_eq!(r.bit_position(), 5);
        assert_eq!(r.bits_remaining(), 11);
    }
}
