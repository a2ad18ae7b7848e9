//! The DXBC container checksum.
//!
//! The checksum is MD5 with a non-standard finalization: instead of the usual
//! `0x80`-then-length padding, the bit count is folded into the trailing block
//! in a fixed pattern (leading bit count when the tail is short, a dedicated
//! final block when it is not, and `(bits >> 2) | 1` as the closing word). The
//! digest is the raw state after the last block; no standard MD5 finalize runs.
//! Because the variant replaces the final-block schedule, it cannot be
//! expressed through a one-shot MD5 crate API, so the core lives here.

const INIT: [u32; 4] = [0x6745_2301, 0xefcd_ab89, 0x98ba_dcfe, 0x1032_5476];

const S: [u32; 64] = [
    7, 12, 17, 22, 7, 12, 17, 22, 7, 12, 17, 22, 7, 12, 17, 22, //
    5, 9, 14, 20, 5, 9, 14, 20, 5, 9, 14, 20, 5, 9, 14, 20, //
    4, 11, 16, 23, 4, 11, 16, 23, 4, 11, 16, 23, 4, 11, 16, 23, //
    6, 10, 15, 21, 6, 10, 15, 21, 6, 10, 15, 21, 6, 10, 15, 21,
];

const K: [u32; 64] = [
    0xd76a_a478, 0xe8c7_b756, 0x2420_70db, 0xc1bd_ceee, 0xf57c_0faf, 0x4787_c62a, 0xa830_4613,
    0xfd46_9501, 0x6980_98d8, 0x8b44_f7af, 0xffff_5bb1, 0x895c_d7be, 0x6b90_1122, 0xfd98_7193,
    0xa679_438e, 0x49b4_0821, 0xf61e_2562, 0xc040_b340, 0x265e_5a51, 0xe9b6_c7aa, 0xd62f_105d,
    0x0244_1453, 0xd8a1_e681, 0xe7d3_fbc8, 0x21e1_cde6, 0xc337_07d6, 0xf4d5_0d87, 0x455a_14ed,
    0xa9e3_e905, 0xfcef_a3f8, 0x676f_02d9, 0x8d2a_4c8a, 0xfffa_3942, 0x8771_f681, 0x6d9d_6122,
    0xfde5_380c, 0xa4be_ea44, 0x4bde_cfa9, 0xf6bb_4b60, 0xbebf_bc70, 0x289b_7ec6, 0xeaa1_27fa,
    0xd4ef_3085, 0x0488_1d05, 0xd9d4_d039, 0xe6db_99e5, 0x1fa2_7cf8, 0xc4ac_5665, 0xf429_2244,
    0x432a_ff97, 0xab94_23a7, 0xfc93_a039, 0x655b_59c3, 0x8f0c_cc92, 0xffef_f47d, 0x8584_5dd1,
    0x6fa8_7e4f, 0xfe2c_e6e0, 0xa301_4314, 0x4e08_11a1, 0xf753_7e82, 0xbd3a_f235, 0x2ad7_d2bb,
    0xeb86_d391,
];

fn transform(state: &mut [u32; 4], block: &[u8; 64]) {
    let mut m = [0u32; 16];
    for (i, word) in m.iter_mut().enumerate() {
        *word = u32::from_le_bytes(block[i * 4..i * 4 + 4].try_into().unwrap());
    }

    let [mut a, mut b, mut c, mut d] = *state;
    for i in 0..64 {
        let (f, g) = match i / 16 {
            0 => ((b & c) | (!b & d), i),
            1 => ((d & b) | (!d & c), (5 * i + 1) % 16),
            2 => (b ^ c ^ d, (3 * i + 5) % 16),
            _ => (c ^ (b | !d), (7 * i) % 16),
        };
        let tmp = d;
        d = c;
        c = b;
        b = b.wrapping_add(
            a.wrapping_add(f)
                .wrapping_add(K[i])
                .wrapping_add(m[g])
                .rotate_left(S[i]),
        );
        a = tmp;
    }

    state[0] = state[0].wrapping_add(a);
    state[1] = state[1].wrapping_add(b);
    state[2] = state[2].wrapping_add(c);
    state[3] = state[3].wrapping_add(d);
}

struct Md5Core {
    state: [u32; 4],
    buffer: [u8; 64],
    buffered: usize,
}

impl Md5Core {
    fn new() -> Self {
        Md5Core {
            state: INIT,
            buffer: [0u8; 64],
            buffered: 0,
        }
    }

    fn update(&mut self, mut data: &[u8]) {
        if self.buffered > 0 {
            let take = (64 - self.buffered).min(data.len());
            self.buffer[self.buffered..self.buffered + take].copy_from_slice(&data[..take]);
            self.buffered += take;
            data = &data[take..];
            if self.buffered == 64 {
                let block = self.buffer;
                transform(&mut self.state, &block);
                self.buffered = 0;
            }
        }
        while data.len() >= 64 {
            transform(&mut self.state, data[..64].try_into().unwrap());
            data = &data[64..];
        }
        if !data.is_empty() {
            self.buffer[..data.len()].copy_from_slice(data);
            self.buffered = data.len();
        }
    }

    /// Raw state, little-endian. The DXBC variant never runs the standard
    /// MD5 length-padding finalize; callers must have fed whole blocks.
    fn raw_digest(&self) -> [u8; 16] {
        debug_assert_eq!(self.buffered, 0, "digest taken mid-block");
        let mut out = [0u8; 16];
        for (i, word) in self.state.iter().enumerate() {
            out[i * 4..i * 4 + 4].copy_from_slice(&word.to_le_bytes());
        }
        out
    }
}

/// Computes the DXBC checksum of `data`.
///
/// `data` must be the hashed range of the container: everything after the
/// 16-byte checksum field (byte 20 onward), through `total_size`.
pub fn dxbc_checksum(data: &[u8]) -> [u8; 16] {
    let num_bits = (data.len() as u32).wrapping_mul(8);
    let bits_part2 = (num_bits >> 2) | 1;

    let full = data.len() / 64 * 64;
    let tail = &data[full..];

    let mut md5 = Md5Core::new();
    md5.update(&data[..full]);

    let mut padding = [0u8; 64];
    padding[0] = 0x80;

    if tail.len() >= 56 {
        md5.update(tail);
        md5.update(&padding[..64 - tail.len()]);

        // Dedicated final block: leading bit count, closing marker word.
        let mut last = [0u8; 64];
        last[0..4].copy_from_slice(&num_bits.to_le_bytes());
        last[60..64].copy_from_slice(&bits_part2.to_le_bytes());
        md5.update(&last);
    } else {
        md5.update(&num_bits.to_le_bytes());
        md5.update(tail);
        md5.update(&padding[..64 - 4 - 4 - tail.len()]);
        md5.update(&bits_part2.to_le_bytes());
    }

    md5.raw_digest()
}

#[cfg(test)]
mod tests {
    use super::*;

    // Reference MD5 (standard finalization) to sanity-check the core.
    fn std_md5(data: &[u8]) -> [u8; 16] {
        let mut md5 = Md5Core::new();
        md5.update(data);
        let bit_len = (data.len() as u64).wrapping_mul(8);
        let mut padding = [0u8; 72];
        padding[0] = 0x80;
        let pad_len = 64 - ((data.len() + 8) % 64);
        md5.update(&padding[..pad_len]);
        md5.update(&bit_len.to_le_bytes());
        md5.raw_digest()
    }

    #[test]
    fn md5_core_matches_known_vectors() {
        // RFC 1321 test vectors.
        assert_eq!(
            std_md5(b""),
            [
                0xd4, 0x1d, 0x8c, 0xd9, 0x8f, 0x00, 0xb2, 0x04, 0xe9, 0x80, 0x09, 0x98, 0xec,
                0xf8, 0x42, 0x7e
            ]
        );
        assert_eq!(
            std_md5(b"abc"),
            [
                0x90, 0x01, 0x50, 0x98, 0x3c, 0xd2, 0x4f, 0xb0, 0xd6, 0x96, 0x3f, 0x7d, 0x28,
                0xe1, 0x7f, 0x72
            ]
        );
        assert_eq!(
            std_md5(b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789"),
            [
                0xd1, 0x74, 0xab, 0x98, 0xd2, 0x77, 0xd9, 0xf5, 0xa5, 0x61, 0x1c, 0x2c, 0x9f,
                0x41, 0x9d, 0x9f
            ]
        );
    }

    #[test]
    fn checksum_is_deterministic_and_length_sensitive() {
        let a = dxbc_checksum(&[0u8; 32]);
        let b = dxbc_checksum(&[0u8; 32]);
        let c = dxbc_checksum(&[0u8; 33]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn checksum_covers_both_tail_paths() {
        // Short tail (< 56 bytes in the last block) and long tail (>= 56).
        let short = vec![0xa5u8; 64 + 10];
        let long = vec![0xa5u8; 64 + 60];
        assert_ne!(dxbc_checksum(&short), dxbc_checksum(&long));
    }
}
