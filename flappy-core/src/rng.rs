//! Layout byte stream: ChaCha8 "rand" construction, version 1.
//!
//! Each refill runs four ChaCha blocks with 8 rounds, counters `c..c+3`,
//! zero nonce words, and adds only the key words back after the rounds. The
//! four blocks are interleaved word by word into 32 little-endian u64
//! outputs. Every 16 counters the last four u64 of the previous buffer
//! become the new key and are never handed out.
//!
//! This stream is part of the ruleset: clients that render the layout must
//! produce the same words bit for bit.

const BUF_WORDS: usize = 32;
const CTR_INC: u32 = 4;
const CTR_MAX: u32 = 16;
const RESEED_WORDS: usize = 4;

// "expand 32-byte k"
const SIGMA: [u32; 4] = [0x6170_7865, 0x3320_646e, 0x7962_2d32, 0x6b20_6574];

#[derive(Clone, Debug)]
pub struct ChaCha8Stream {
    buf: [u64; BUF_WORDS],
    key: [u64; 4],
    counter: u32,
    index: usize,
    available: usize,
}

impl ChaCha8Stream {
    pub fn new(seed: [u8; 32]) -> Self {
        let mut key = [0u64; 4];
        for (word, chunk) in key.iter_mut().zip(seed.chunks_exact(8)) {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(chunk);
            *word = u64::from_le_bytes(bytes);
        }

        let mut stream = Self {
            buf: [0; BUF_WORDS],
            key,
            counter: 0,
            index: 0,
            available: BUF_WORDS,
        };
        fill_blocks(&stream.key, 0, &mut stream.buf);
        stream
    }

    pub fn next_u64(&mut self) -> u64 {
        if self.index >= self.available {
            self.refill();
        }
        let value = self.buf[self.index];
        self.index += 1;
        value
    }

    /// Uniform value in `[0, n)`. `n` must be non-zero.
    pub fn next_below(&mut self, n: u64) -> u64 {
        debug_assert!(n > 0);
        if n & (n - 1) == 0 {
            return self.next_u64() & (n - 1);
        }

        let (mut hi, mut lo) = mul_hi_lo(self.next_u64(), n);
        if lo < n {
            let threshold = n.wrapping_neg() % n;
            while lo < threshold {
                (hi, lo) = mul_hi_lo(self.next_u64(), n);
            }
        }
        hi
    }

    pub fn next_range(&mut self, min: i32, span: u64) -> i32 {
        min + self.next_below(span) as i32
    }

    fn refill(&mut self) {
        self.counter += CTR_INC;
        if self.counter == CTR_MAX {
            self.key
                .copy_from_slice(&self.buf[BUF_WORDS - RESEED_WORDS..]);
            self.counter = 0;
        }
        fill_blocks(&self.key, self.counter, &mut self.buf);
        self.index = 0;
        self.available = if self.counter == CTR_MAX - CTR_INC {
            BUF_WORDS - RESEED_WORDS
        } else {
            BUF_WORDS
        };
    }
}

#[inline]
fn mul_hi_lo(a: u64, b: u64) -> (u64, u64) {
    let product = u128::from(a) * u128::from(b);
    ((product >> 64) as u64, product as u64)
}

#[inline]
fn quarter_round(s: &mut [u32; 16], a: usize, b: usize, c: usize, d: usize) {
    s[a] = s[a].wrapping_add(s[b]);
    s[d] = (s[d] ^ s[a]).rotate_left(16);
    s[c] = s[c].wrapping_add(s[d]);
    s[b] = (s[b] ^ s[c]).rotate_left(12);
    s[a] = s[a].wrapping_add(s[b]);
    s[d] = (s[d] ^ s[a]).rotate_left(8);
    s[c] = s[c].wrapping_add(s[d]);
    s[b] = (s[b] ^ s[c]).rotate_left(7);
}

fn fill_blocks(key: &[u64; 4], counter: u32, out: &mut [u64; BUF_WORDS]) {
    // words[row][lane]: row-major over the 16 state words, one lane per block.
    let mut words = [[0u32; 4]; 16];

    for (lane, block_counter) in (counter..counter + 4).enumerate() {
        let mut init = [0u32; 16];
        init[..4].copy_from_slice(&SIGMA);
        for (i, k) in key.iter().enumerate() {
            init[4 + 2 * i] = *k as u32;
            init[5 + 2 * i] = (*k >> 32) as u32;
        }
        init[12] = block_counter;

        let mut s = init;
        for _ in 0..4 {
            quarter_round(&mut s, 0, 4, 8, 12);
            quarter_round(&mut s, 1, 5, 9, 13);
            quarter_round(&mut s, 2, 6, 10, 14);
            quarter_round(&mut s, 3, 7, 11, 15);
            quarter_round(&mut s, 0, 5, 10, 15);
            quarter_round(&mut s, 1, 6, 11, 12);
            quarter_round(&mut s, 2, 7, 8, 13);
            quarter_round(&mut s, 3, 4, 9, 14);
        }

        // Only the key words carry entropy worth feeding forward.
        for i in 4..12 {
            s[i] = s[i].wrapping_add(init[i]);
        }

        for (row, value) in s.iter().enumerate() {
            words[row][lane] = *value;
        }
    }

    for (row, lanes) in words.iter().enumerate() {
        out[2 * row] = u64::from(lanes[0]) | (u64::from(lanes[1]) << 32);
        out[2 * row + 1] = u64::from(lanes[2]) | (u64::from(lanes[3]) << 32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CANONICAL_KEY: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ123456";

    #[test]
    fn zero_seed_vector() {
        let mut stream = ChaCha8Stream::new([0u8; 32]);
        assert_eq!(stream.next_u64(), 0xac8a_366d_ce7e_87d9);
        assert_eq!(stream.next_u64(), 0x6bc7_27c6_9e41_6f1a);
        assert_eq!(stream.next_u64(), 0x1ea1_417c_a31f_fb1b);
    }

    #[test]
    fn canonical_seed_vector_across_refills() {
        let mut stream = ChaCha8Stream::new(*CANONICAL_KEY);
        let words: [u64; 129] = core::array::from_fn(|_| stream.next_u64());
        assert_eq!(words[0], 0xb773_b606_3d46_16a5);
        // Last word of the first buffer, first word of the first refill.
        assert_eq!(words[31], 0x0f8f_9ff0_a65a_3d43);
        assert_eq!(words[32], 0xccf0_65f7_190f_f080);
        // Counter 12 buffer withholds 4 words; 128 is the first word after re-keying.
        assert_eq!(words[127], 0x65bf_58d4_8318_8546);
        assert_eq!(words[128], 0xd1b2_7cff_69db_13cc);
    }

    #[test]
    fn same_seed_same_stream() {
        let mut a = ChaCha8Stream::new(*CANONICAL_KEY);
        let mut b = ChaCha8Stream::new(*CANONICAL_KEY);
        for _ in 0..300 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn next_below_stays_in_range() {
        let mut stream = ChaCha8Stream::new([7u8; 32]);
        for n in [1u64, 2, 3, 6, 7, 64, 1000] {
            for _ in 0..200 {
                assert!(stream.next_below(n) < n);
            }
        }
    }

    #[test]
    fn next_range_offsets_minimum() {
        let mut stream = ChaCha8Stream::new([3u8; 32]);
        for _ in 0..500 {
            let v = stream.next_range(2, 6);
            assert!((2..=7).contains(&v));
        }
    }
}
