//! Property tests: anything written comes back identical.

use bitstream::{BitReader, BitWriter};
use proptest::prelude::*;

proptest! {
    #[test]
    fn bits_roundtrip(values in prop::collection::vec((any::<u64>(), 1usize..=64), 0..64)) {
        let mut writer = BitWriter::new();
        let mut expected = Vec::new();
        for (value, bits) in values {
            let masked = if bits == 64 { value } else { value & ((1u64 << bits) - 1) };
            writer.write_bits(masked, bits).unwrap();
            expected.push((masked, bits));
        }
        let bytes = writer.finish();

        let mut reader = BitReader::new(&bytes);
        for (value, bits) in expected {
            prop_assert_eq!(reader.read_bits(bits).unwrap(), value);
        }
    }

    #[test]
    fn varu32_roundtrip(values in prop::collection::vec(any::<u32>(), 0..64)) {
        let mut writer = BitWriter::new();
        for &value in &values {
            writer.write_varu32(value);
        }
        let bytes = writer.finish();

        let mut reader = BitReader::new(&bytes);
        for &value in &values {
            prop_assert_eq!(reader.read_varu32().unwrap(), value);
        }
    }

    #[test]
    fn mixed_bits_and_varints(pairs in prop::collection::vec((any::<bool>(), any::<u32>()), 0..32)) {
        let mut writer = BitWriter::new();
        for &(bit, value) in &pairs {
            writer.write_bit(bit);
            writer.write_varu32(value);
        }
        let bytes = writer.finish();

        let mut reader = BitReader::new(&bytes);
        for &(bit, value) in &pairs {
            prop_assert_eq!(reader.read_bit().unwrap(), bit);
            prop_assert_eq!(reader.read_varu32().unwrap(), value);
        }
    }
}
