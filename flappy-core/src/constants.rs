//! Game constants shared by the client build and the verifier.
//!
//! Positions and velocities are fixed-point with `UNIT` sub-steps per pixel.
//! Changing any value here changes every replay outcome, so bump
//! `RULESET_VERSION` alongside.

pub const RULESET_VERSION: u32 = 1;
pub const RULESET_NAME: &str = "flappy-v1";

// Screen geometry (pixels)
pub const SCREEN_WIDTH: i32 = 640;
pub const SCREEN_HEIGHT: i32 = 480;
pub const TILE_SIZE: i32 = 32;

// Fixed-point
pub const UNIT: i32 = 16;

// Kinematics, all in fixed-point units per tick
pub const DELTA_X16: i32 = 32;
pub const DELTA_VY16: i32 = 4;
pub const VY_LIMIT: i32 = 96;

// Start position
pub const INITIAL_X16: i32 = 0;
pub const INITIAL_Y16: i32 = 100 * UNIT;
pub const INITIAL_VY16: i32 = 0;

// Sprite frame and the hit box centred inside it (pixels)
pub const SPRITE_WIDTH: i32 = 60;
pub const SPRITE_HEIGHT: i32 = 75;
pub const HITBOX_WIDTH: i32 = 30;
pub const HITBOX_HEIGHT: i32 = 60;

// The box may rise this far above the screen top before it counts as a hit.
pub const CEILING_Y: i32 = -TILE_SIZE * 4;
pub const GROUND_Y: i32 = SCREEN_HEIGHT - TILE_SIZE;

// Pipes (tile units unless noted)
pub const PIPE_WIDTH: i32 = TILE_SIZE * 2; // pixels
pub const PIPE_START_OFFSET_X: i32 = 8;
pub const PIPE_INTERVAL_X: i32 = 8;
pub const PIPE_GAP_Y: i32 = 5;
pub const PIPE_GAP_Y_MIN: i32 = 2;
pub const PIPE_GAP_Y_SPAN: u64 = 6; // gap top in [2, 7]

// Layout
pub const LAYOUT_LEN: usize = 256;
pub const SEED_BLOCK_BYTES: usize = 32;

// Timing
pub const TICKS_PER_SECOND: u32 = 60;
pub const TICKS_PER_TILE: i32 = TILE_SIZE * UNIT / DELTA_X16; // 16
pub const TICKS_PER_PIPE_INTERVAL: i32 = PIPE_INTERVAL_X * TICKS_PER_TILE; // 128
pub const TIMING_SLACK_MULTIPLIER_DEFAULT: u32 = 2;

// Replay budget: ticks to reach the first pipe plus one full layout cycle,
// allowed to wrap the layout this many times.
pub const REPLAY_LAYOUT_CYCLES: u32 = 4;
pub const TICKS_PER_LAYOUT_CYCLE: u32 = (PIPE_START_OFFSET_X * TICKS_PER_TILE) as u32
    + (LAYOUT_LEN as u32) * (TICKS_PER_PIPE_INTERVAL as u32);
pub const MAX_REPLAY_TICKS_DEFAULT: u32 = TICKS_PER_LAYOUT_CYCLE * REPLAY_LAYOUT_CYCLES;

// Marks an exhausted jump trace. Every simulated x is positive, so it never matches.
pub const TRACE_SENTINEL: i32 = -1;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_tick_constants() {
        assert_eq!(TICKS_PER_TILE, 16);
        assert_eq!(TICKS_PER_PIPE_INTERVAL, 128);
        assert_eq!(TICKS_PER_LAYOUT_CYCLE, 128 + 256 * 128);
        assert_eq!(MAX_REPLAY_TICKS_DEFAULT, 4 * 32_896);
    }

    #[test]
    fn replay_budget_fits_i32_positions() {
        let max_x = i64::from(MAX_REPLAY_TICKS_DEFAULT) * i64::from(DELTA_X16);
        assert!(max_x < i64::from(i32::MAX));
    }
}
