//! Steim1 and Steim2 decompression.
//!
//! These are differential integer compression schemes used in seismological
//! data (SEED/miniSEED format). See Appendix B of the SEED Manual v2.4.

use tracing::warn;

use crate::types::ByteOrder;
use crate::{MseedError, Result};

const FRAME_SIZE: usize = 64; // 16 x 32-bit words
const WORDS_PER_FRAME: usize = 16;

/// Which Steim flavour a data section is packed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SteimLevel {
    One,
    Two,
}

/// Decode Steim1 compressed data into i32 samples.
pub fn decode_steim1(data: &[u8], num_samples: usize, byte_order: ByteOrder) -> Result<Vec<i32>> {
    decode_frames(data, num_samples, byte_order, SteimLevel::One)
}

/// Decode Steim2 compressed data into i32 samples.
pub fn decode_steim2(data: &[u8], num_samples: usize, byte_order: ByteOrder) -> Result<Vec<i32>> {
    decode_frames(data, num_samples, byte_order, SteimLevel::Two)
}

/// Walk the 64-byte frames of a Steim data section.
///
/// Frame 0 word 1 holds X₀ (the first sample), word 2 holds Xₙ (the last
/// sample), which is checked once all samples are integrated. Trailing bytes
/// that do not fill a whole frame are ignored.
fn decode_frames(
    data: &[u8],
    num_samples: usize,
    byte_order: ByteOrder,
    level: SteimLevel,
) -> Result<Vec<i32>> {
    let num_frames = data.len() / FRAME_SIZE;
    if num_frames == 0 {
        return Err(MseedError::SteimDecode("no frames in data".into()));
    }

    let first = read_u32(data, 4, byte_order) as i32;
    let last = read_u32(data, 8, byte_order) as i32;

    let mut diffs = Vec::with_capacity(num_samples);
    'frames: for (frame_idx, frame) in data.chunks_exact(FRAME_SIZE).enumerate() {
        let control = read_u32(frame, 0, byte_order);
        let first_word = if frame_idx == 0 { 3 } else { 1 };
        for word_idx in first_word..WORDS_PER_FRAME {
            if diffs.len() >= num_samples {
                break 'frames;
            }
            let nibble = ((control >> (30 - word_idx * 2)) & 0x03) as u8;
            let word = read_u32(frame, word_idx * 4, byte_order);
            match level {
                SteimLevel::One => unpack_steim1(word, nibble, &mut diffs),
                SteimLevel::Two => unpack_steim2(word, nibble, &mut diffs)?,
            }
        }
    }

    if diffs.len() < num_samples {
        return Err(MseedError::SampleCountMismatch {
            expected: num_samples,
            actual: diffs.len(),
        });
    }
    diffs.truncate(num_samples);

    // The first difference is relative to the previous record and is
    // replaced by X₀.
    let mut samples = Vec::with_capacity(num_samples);
    let mut acc = first;
    for (i, diff) in diffs.into_iter().enumerate() {
        if i > 0 {
            acc = acc.wrapping_add(diff);
        }
        samples.push(acc);
    }

    if let Some(&tail) = samples.last() {
        if tail != last {
            warn!(
                expected = last,
                actual = tail,
                "steim reverse integration constant mismatch"
            );
        }
    }

    Ok(samples)
}

fn unpack_steim1(word: u32, nibble: u8, out: &mut Vec<i32>) {
    match nibble {
        0b01 => push_fields(word, 8, 4, out),
        0b10 => push_fields(word, 16, 2, out),
        0b11 => out.push(word as i32),
        _ => {} // 00: header or empty word
    }
}

fn unpack_steim2(word: u32, nibble: u8, out: &mut Vec<i32>) -> Result<()> {
    let dnib = (word >> 30) & 0x03;
    match (nibble, dnib) {
        (0b00, _) => {}
        (0b01, _) => push_fields(word, 8, 4, out),
        (0b10, 0b01) => push_fields(word, 30, 1, out),
        (0b10, 0b10) => push_fields(word, 15, 2, out),
        (0b10, 0b11) => push_fields(word, 10, 3, out),
        (0b11, 0b00) => push_fields(word, 6, 5, out),
        (0b11, 0b01) => push_fields(word, 5, 6, out),
        (0b11, 0b10) => push_fields(word, 4, 7, out),
        _ => {
            return Err(MseedError::SteimDecode(format!(
                "steim2 nibble={nibble:02b} invalid dnib={dnib:02b}"
            )));
        }
    }
    Ok(())
}

/// Push `count` sign-extended fields of `bits` width, packed from the
/// low-order end of `word` with the first difference most significant.
fn push_fields(word: u32, bits: u32, count: u32, out: &mut Vec<i32>) {
    let mask = (1u32 << bits) - 1;
    for i in 0..count {
        let shift = bits * (count - 1 - i);
        out.push(sign_extend((word >> shift) & mask, bits));
    }
}

fn sign_extend(value: u32, bits: u32) -> i32 {
    let shift = 32 - bits;
    (value as i32).wrapping_shl(shift).wrapping_shr(shift)
}

fn read_u32(data: &[u8], offset: usize, byte_order: ByteOrder) -> u32 {
    let bytes = [
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ];
    match byte_order {
        ByteOrder::Big => u32::from_be_bytes(bytes),
        ByteOrder::Little => u32::from_le_bytes(bytes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(words: [u32; 16]) -> Vec<u8> {
        words.iter().flat_map(|w| w.to_be_bytes()).collect()
    }

    #[test]
    fn test_steim1_byte_diffs() {
        // Samples 10, 11, 13, 10, 14: diffs (x, 1, 2, -3, 4) with the first
        // diff ignored in favour of X0.
        let mut words = [0u32; 16];
        words[0] = (0b01 << (30 - 3 * 2)) | (0b01 << (30 - 4 * 2));
        words[1] = 10;
        words[2] = 14;
        words[3] = u32::from_be_bytes([0, 1, 2, (-3i8) as u8]);
        words[4] = u32::from_be_bytes([4, 0, 0, 0]);
        let data = frame(words);

        let samples = decode_steim1(&data, 5, ByteOrder::Big).unwrap();
        assert_eq!(samples, vec![10, 11, 13, 10, 14]);
    }

    #[test]
    fn test_steim1_halfword_and_full_word() {
        let mut words = [0u32; 16];
        words[0] = (0b10 << (30 - 3 * 2)) | (0b11 << (30 - 4 * 2));
        words[1] = 1000;
        words[2] = (1300i32 - 70_000) as u32;
        words[3] = 300;
        words[4] = (-70_000i32) as u32;
        let data = frame(words);

        let samples = decode_steim1(&data, 3, ByteOrder::Big).unwrap();
        assert_eq!(samples, vec![1000, 1300, 1300 - 70_000]);
    }

    #[test]
    fn test_steim2_mixed_widths() {
        // word 3: nibble 11 dnib 10 -> seven 4-bit diffs
        // word 4: nibble 10 dnib 01 -> one 30-bit diff
        let mut words = [0u32; 16];
        words[0] = (0b11 << (30 - 3 * 2)) | (0b10 << (30 - 4 * 2));
        words[1] = 5;
        let four_bit: [i32; 7] = [0, 1, -1, 2, -2, 7, -8];
        let mut w = 0b10u32 << 30;
        for (i, d) in four_bit.iter().enumerate() {
            w |= ((*d as u32) & 0x0F) << (24 - i * 4);
        }
        words[3] = w;
        words[4] = (0b01 << 30) | (100_000u32 & 0x3FFF_FFFF);

        let mut expected = vec![5];
        for d in &four_bit[1..] {
            let next = expected.last().unwrap() + d;
            expected.push(next);
        }
        expected.push(expected.last().unwrap() + 100_000);
        words[2] = *expected.last().unwrap() as u32;
        let data = frame(words);

        let samples = decode_steim2(&data, 8, ByteOrder::Big).unwrap();
        assert_eq!(samples, expected);
    }

    #[test]
    fn test_steim2_invalid_dnib() {
        let mut words = [0u32; 16];
        words[0] = 0b10 << (30 - 3 * 2);
        words[3] = 0; // dnib 00 is invalid under nibble 10
        let data = frame(words);
        assert!(matches!(
            decode_steim2(&data, 1, ByteOrder::Big),
            Err(MseedError::SteimDecode(_))
        ));
    }

    #[test]
    fn test_too_few_samples() {
        let mut words = [0u32; 16];
        words[0] = 0b01 << (30 - 3 * 2);
        let data = frame(words);
        assert!(matches!(
            decode_steim1(&data, 10, ByteOrder::Big),
            Err(MseedError::SampleCountMismatch {
                expected: 10,
                actual: 4
            })
        ));
    }

    #[test]
    fn test_empty_data_section() {
        assert!(decode_steim1(&[], 1, ByteOrder::Big).is_err());
    }
}
