//! Bit-level writer for building packed payloads and update streams.

use crate::error::{BitError, BitResult};

/// Maximum encoded length of a `varu32`, in bytes.
pub(crate) const VARU32_MAX_BYTES: usize = 5;

/// A bit-level writer accumulating into an owned buffer.
///
/// Bits are packed most-significant first. Call [`finish`](Self::finish) to
/// obtain the padded byte buffer, or [`finish_into`](Self::finish_into) to
/// append to an existing one.
#[derive(Debug, Default)]
pub struct BitWriter {
    buf: Vec<u8>,
    /// Bits used in the final byte of `buf` (0 means the buffer is whole bytes).
    tail_bits: u8,
}

impl BitWriter {
    /// Creates an empty writer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a writer with capacity for `bytes` bytes.
    #[must_use]
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            buf: Vec::with_capacity(bytes),
            tail_bits: 0,
        }
    }

    /// Returns the number of bits written so far.
    #[must_use]
    pub fn bits_written(&self) -> usize {
        if self.tail_bits == 0 {
            self.buf.len() * 8
        } else {
            (self.buf.len() - 1) * 8 + self.tail_bits as usize
        }
    }

    /// Writes a single bit.
    pub fn write_bit(&mut self, value: bool) {
        if self.tail_bits == 0 {
            self.buf.push(0);
        }
        if value {
            let last = self.buf.len() - 1;
            self.buf[last] |= 1 << (7 - self.tail_bits);
        }
        self.tail_bits = (self.tail_bits + 1) % 8;
    }

    /// Writes the low `bits` bits of `value`, most-significant first.
    ///
    /// # Errors
    ///
    /// Returns [`BitError::InvalidWidth`] if `bits` is zero or above 64, and
    /// [`BitError::ValueTooWide`] if `value` does not fit.
    pub fn write_bits(&mut self, value: u64, bits: usize) -> BitResult<()> {
        if bits == 0 || bits > 64 {
            return Err(BitError::InvalidWidth { bits });
        }
        if bits < 64 && value >= (1u64 << bits) {
            return Err(BitError::ValueTooWide { value, bits });
        }
        for i in (0..bits).rev() {
            self.write_bit((value >> i) & 1 == 1);
        }
        Ok(())
    }

    /// Writes a `u32` as a variable-length integer, 7 bits per byte.
    ///
    /// Small values (entity-index gaps, property counts) cost one byte.
    pub fn write_varu32(&mut self, mut value: u32) {
        loop {
            let chunk = (value & 0x7F) as u64;
            value >>= 7;
            let more = value != 0;
            // Continuation bit first, then the 7-bit chunk.
            self.write_bit(more);
            self.write_bits(chunk, 7).expect("7-bit chunk always fits");
            if !more {
                break;
            }
        }
    }

    /// Appends the first `bits` bits of `bytes`, most-significant first.
    ///
    /// Used to splice an already-packed payload into the stream without
    /// re-encoding it.
    ///
    /// # Errors
    ///
    /// Returns [`BitError::UnexpectedEof`] if `bytes` holds fewer than `bits` bits.
    pub fn append_bits(&mut self, bytes: &[u8], bits: usize) -> BitResult<()> {
        if bits > bytes.len() * 8 {
            return Err(BitError::UnexpectedEof {
                requested: bits,
                available: bytes.len() * 8,
            });
        }
        for i in 0..bits {
            let bit = (bytes[i / 8] >> (7 - i % 8)) & 1;
            self.write_bit(bit == 1);
        }
        Ok(())
    }

    /// Pads with zero bits to the next byte boundary.
    pub fn align_to_byte(&mut self) {
        while self.tail_bits != 0 {
            self.write_bit(false);
        }
    }

    /// Finishes writing and returns the buffer, zero-padded to a whole byte.
    #[must_use]
    pub fn finish(self) -> Vec<u8> {
        self.buf
    }

    /// Finishes writing and appends the padded buffer to `out`.
    pub fn finish_into(mut self, out: &mut Vec<u8>) {
        out.append(&mut self.buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty() {
        let w = BitWriter::new();
        assert_eq!(w.bits_written(), 0);
        assert!(w.finish().is_empty());
    }

    #[test]
    fn single_bits() {
        let mut w = BitWriter::new();
        w.write_bit(true);
        w.write_bit(false);
        w.write_bit(true);
        assert_eq!(w.bits_written(), 3);
        assert_eq!(w.finish(), vec![0b1010_0000]);
    }

    #[test]
    fn full_byte() {
        let mut w = BitWriter::new();
        w.write_bits(0b1100_0101, 8).unwrap();
        assert_eq!(w.finish(), vec![0b1100_0101]);
    }

    #[test]
    fn crosses_byte_boundary() {
        let mut w = BitWriter::new();
        w.write_bits(0b111, 3).unwrap();
        w.write_bits(0b1_0101_0101, 9).unwrap();
        // 111 101010101 -> 1111_0101 0101_0000
        assert_eq!(w.finish(), vec![0b1111_0101, 0b0101_0000]);
    }

    #[test]
    fn rejects_zero_width() {
        let mut w = BitWriter::new();
        assert!(matches!(
            w.write_bits(0, 0),
            Err(BitError::InvalidWidth { bits: 0 })
        ));
    }

    #[test]
    fn rejects_wide_value() {
        let mut w = BitWriter::new();
        assert!(matches!(
            w.write_bits(256, 8),
            Err(BitError::ValueTooWide { value: 256, bits: 8 })
        ));
    }

    #[test]
    fn max_width_value() {
        let mut w = BitWriter::new();
        w.write_bits(u64::MAX, 64).unwrap();
        assert_eq!(w.finish(), vec![0xFF; 8]);
    }

    #[test]
    fn varu32_small_is_one_byte() {
        let mut w = BitWriter::new();
        w.write_varu32(5);
        assert_eq!(w.bits_written(), 8);
    }

    #[test]
    fn varu32_large() {
        let mut w = BitWriter::new();
        w.write_varu32(u32::MAX);
        assert_eq!(w.bits_written(), VARU32_MAX_BYTES * 8);
    }

    #[test]
    fn align_pads_with_zeros() {
        let mut w = BitWriter::new();
        w.write_bit(true);
        w.align_to_byte();
        assert_eq!(w.bits_written(), 8);
        assert_eq!(w.finish(), vec![0b1000_0000]);
    }

    #[test]
    fn align_on_boundary_is_noop() {
        let mut w = BitWriter::new();
        w.write_bits(0xAB, 8).unwrap();
        w.align_to_byte();
        assert_eq!(w.bits_written(), 8);
    }

    #[test]
    fn append_bits_splices_payload() {
        let mut w = BitWriter::new();
        w.write_bit(true);
        w.append_bits(&[0b1100_1010, 0b1000_0000], 9).unwrap();
        // 1 + 110010101 -> 1110_0101 01 padding
        assert_eq!(w.bits_written(), 10);
        assert_eq!(w.finish(), vec![0b1110_0101, 0b0100_0000]);
    }

    #[test]
    fn append_bits_too_short() {
        let mut w = BitWriter::new();
        assert!(matches!(
            w.append_bits(&[0xFF], 9),
            Err(BitError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn finish_into_appends() {
        let mut w = BitWriter::new();
        w.write_bits(0xCD, 8).unwrap();
        let mut out = vec![0xAB];
        w.finish_into(&mut out);
        assert_eq!(out, vec![0xAB, 0xCD]);
    }
}
