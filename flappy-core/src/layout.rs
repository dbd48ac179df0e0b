use crate::constants::{
    LAYOUT_LEN, PIPE_GAP_Y_MIN, PIPE_GAP_Y_SPAN, PIPE_INTERVAL_X, PIPE_START_OFFSET_X,
    SEED_BLOCK_BYTES,
};
use crate::error::VerifyError;
use crate::fixed_point::{floor_div, floor_mod};
use crate::rng::ChaCha8Stream;

/// Gap positions for one session, in tile units from the screen top.
///
/// Pipe `i` uses `gaps[i % LAYOUT_LEN]`, so the course repeats after
/// `LAYOUT_LEN` pipes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Layout {
    gaps: [u8; LAYOUT_LEN],
}

impl Layout {
    pub fn from_seed_block(seed: [u8; SEED_BLOCK_BYTES]) -> Self {
        let mut stream = ChaCha8Stream::new(seed);
        let mut gaps = [0u8; LAYOUT_LEN];
        for gap in gaps.iter_mut() {
            *gap = stream.next_range(PIPE_GAP_Y_MIN, PIPE_GAP_Y_SPAN) as u8;
        }
        Self { gaps }
    }

    /// Gap top (tiles) of the `index`-th pipe, wrapping cyclically.
    #[inline]
    pub fn gap_at(&self, index: usize) -> i32 {
        i32::from(self.gaps[index % LAYOUT_LEN])
    }

    pub fn gaps(&self) -> &[u8; LAYOUT_LEN] {
        &self.gaps
    }

    /// Gap top of the pipe standing in tile column `tile_x`, if there is one.
    pub fn pipe_at(&self, tile_x: i32) -> Option<i32> {
        let rel = tile_x - PIPE_START_OFFSET_X;
        if rel <= 0 || floor_mod(rel, PIPE_INTERVAL_X) != 0 {
            return None;
        }
        let index = floor_div(rel, PIPE_INTERVAL_X) as usize;
        Some(self.gap_at(index))
    }
}

/// Map a seed key onto the fixed-width seed block: UTF-8 bytes, truncated or
/// zero-padded to `SEED_BLOCK_BYTES`.
pub fn seed_block(seed_key: &str) -> Result<[u8; SEED_BLOCK_BYTES], VerifyError> {
    if seed_key.is_empty() {
        return Err(VerifyError::InvalidSeed);
    }
    let bytes = seed_key.as_bytes();
    let len = bytes.len().min(SEED_BLOCK_BYTES);
    let mut block = [0u8; SEED_BLOCK_BYTES];
    block[..len].copy_from_slice(&bytes[..len]);
    Ok(block)
}

pub fn generate_layout(seed_key: &str) -> Result<Layout, VerifyError> {
    seed_block(seed_key).map(Layout::from_seed_block)
}
