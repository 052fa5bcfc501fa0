//! Conversions from raw V area bytes to the two display projections.
//!
//! - [`to_words`] groups bytes into big-endian 16-bit words
//! - [`to_bits`] expands every byte into 8 booleans, most significant bit first
//! - [`from_bits`] is the inverse of [`to_bits`]
//!
//! # Example
//!
//! ```
//! use s7_bitview::codec::{to_bits, to_words};
//!
//! let data = [0x01, 0x02, 0x03];
//! assert_eq!(to_words(&data), vec![258, 3]);
//!
//! let bits = to_bits(&[0b1011_0000]);
//! assert_eq!(bits, vec![true, false, true, true, false, false, false, false]);
//! ```

/// Converts bytes into big-endian 16-bit words.
///
/// An odd trailing byte becomes a word of its own with the high byte zero,
/// so the result always has `ceil(bytes.len() / 2)` entries.
///
/// # Example
///
/// ```
/// use s7_bitview::codec::to_words;
///
/// assert_eq!(to_words(&[0x12, 0x34, 0xFF]), vec![0x1234, 0x00FF]);
/// assert!(to_words(&[]).is_empty());
/// ```
pub fn to_words(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks(2)
        .map(|pair| pair.iter().fold(0u16, |acc, &b| (acc << 8) | u16::from(b)))
        .collect()
}

/// Expands bytes into bits, most significant bit first within each byte.
///
/// # Example
///
/// ```
/// use s7_bitview::codec::to_bits;
///
/// let bits = to_bits(&[0x80, 0x01]);
/// assert_eq!(bits.len(), 16);
/// assert!(bits[0]);
/// assert!(bits[15]);
/// ```
pub fn to_bits(bytes: &[u8]) -> Vec<bool> {
    bytes
        .iter()
        .flat_map(|&byte| (0..8).rev().map(move |bit| (byte >> bit) & 1 == 1))
        .collect()
}

/// Packs bits back into bytes, 8 per byte, most significant bit first.
///
/// A trailing group shorter than 8 is padded with zero bits on the right.
///
/// # Example
///
/// ```
/// use s7_bitview::codec::{from_bits, to_bits};
///
/// let data = [0xA5, 0x3C];
/// assert_eq!(from_bits(&to_bits(&data)), data);
/// ```
pub fn from_bits(bits: &[bool]) -> Vec<u8> {
    bits.chunks(8)
        .map(|group| {
            group
                .iter()
                .enumerate()
                .fold(0u8, |acc, (i, &bit)| if bit { acc | (0x80 >> i) } else { acc })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_words_odd_length() {
        assert_eq!(to_words(&[0x01, 0x02, 0x03]), vec![258, 3]);
    }

    #[test]
    fn test_to_words_big_endian() {
        let data = hex::decode("beefcafe").unwrap();
        assert_eq!(to_words(&data), vec![0xBEEF, 0xCAFE]);
    }

    #[test]
    fn test_to_words_empty() {
        assert_eq!(to_words(&[]), Vec::<u16>::new());
    }

    #[test]
    fn test_to_bits_msb_first() {
        assert_eq!(
            to_bits(&[0b1011_0000]),
            vec![true, false, true, true, false, false, false, false]
        );
    }

    #[test]
    fn test_to_bits_empty() {
        assert!(to_bits(&[]).is_empty());
    }

    #[test]
    fn test_lengths() {
        for len in 0..=81usize {
            let data: Vec<u8> = (0..len).map(|i| (i * 37) as u8).collect();
            assert_eq!(to_bits(&data).len(), 8 * len);
            assert_eq!(to_words(&data).len(), len.div_ceil(2));
        }
    }

    #[test]
    fn test_bits_roundtrip_all_byte_values() {
        let data: Vec<u8> = (0..=255u8).collect();
        assert_eq!(from_bits(&to_bits(&data)), data);
    }

    #[test]
    fn test_from_bits_pads_partial_group() {
        assert_eq!(from_bits(&[true, true]), vec![0b1100_0000]);
        assert!(from_bits(&[]).is_empty());
    }
}
