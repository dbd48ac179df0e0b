use alloc::vec::Vec;

use serde::{Deserialize, Serialize};

use crate::constants::{
    CEILING_Y, DELTA_VY16, DELTA_X16, GROUND_Y, HITBOX_HEIGHT, HITBOX_WIDTH, INITIAL_VY16,
    INITIAL_X16, INITIAL_Y16, PIPE_GAP_Y, PIPE_INTERVAL_X, PIPE_START_OFFSET_X, PIPE_WIDTH,
    SPRITE_HEIGHT, SPRITE_WIDTH, TILE_SIZE, TRACE_SENTINEL, VY_LIMIT,
};
use crate::error::VerifyError;
use crate::fixed_point::{floor_div, pixels_to_tiles, to_pixels, to_tiles};
use crate::layout::Layout;

/// Position and vertical velocity of the player, in fixed-point units.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KinematicState {
    pub x16: i32,
    pub y16: i32,
    pub vy16: i32,
}

impl Default for KinematicState {
    fn default() -> Self {
        Self::initial()
    }
}

impl KinematicState {
    pub const fn initial() -> Self {
        Self {
            x16: INITIAL_X16,
            y16: INITIAL_Y16,
            vy16: INITIAL_VY16,
        }
    }

    /// Advance one tick. A jump replaces the vertical velocity outright.
    #[must_use]
    pub fn step(self, jump: bool) -> Self {
        let x16 = self.x16 + DELTA_X16;
        let vy16 = if jump { -VY_LIMIT } else { self.vy16 };
        let y16 = self.y16 + vy16;
        Self {
            x16,
            y16,
            vy16: (vy16 + DELTA_VY16).min(VY_LIMIT),
        }
    }

    /// Hit box in pixels as `(left, top, right, bottom)`.
    pub fn hitbox(&self) -> (i32, i32, i32, i32) {
        let left = to_pixels(self.x16) + (SPRITE_WIDTH - HITBOX_WIDTH) / 2;
        let top = to_pixels(self.y16) + (SPRITE_HEIGHT - HITBOX_HEIGHT) / 2;
        (left, top, left + HITBOX_WIDTH, top + HITBOX_HEIGHT)
    }
}

pub fn collided(state: &KinematicState, layout: &Layout) -> bool {
    let (left, top, right, bottom) = state.hitbox();
    if top < CEILING_Y || bottom >= GROUND_Y {
        return true;
    }

    let first_column = pixels_to_tiles(left - PIPE_WIDTH);
    let last_column = pixels_to_tiles(left + HITBOX_WIDTH);
    for tile_x in first_column..=last_column {
        let Some(gap_y) = layout.pipe_at(tile_x) else {
            continue;
        };
        let pipe_left = tile_x * TILE_SIZE;
        if left >= pipe_left + PIPE_WIDTH || right < pipe_left {
            continue;
        }
        if top < gap_y * TILE_SIZE || bottom >= (gap_y + PIPE_GAP_Y) * TILE_SIZE {
            return true;
        }
    }
    false
}

/// Pipes fully passed at horizontal position `x16`.
pub fn score_at(x16: i32) -> u32 {
    let rel = to_tiles(x16) - PIPE_START_OFFSET_X;
    if rel <= 0 {
        return 0;
    }
    floor_div(rel, PIPE_INTERVAL_X) as u32
}

/// Walks the recorded jump positions in order. Once the trace is used up it
/// keeps yielding `TRACE_SENTINEL`, which no simulated x can equal.
#[derive(Clone, Debug)]
struct JumpCursor<'a> {
    trace: &'a [i32],
    next: usize,
}

impl<'a> JumpCursor<'a> {
    fn new(trace: &'a [i32]) -> Self {
        Self { trace, next: 0 }
    }

    fn peek(&self) -> i32 {
        self.trace.get(self.next).copied().unwrap_or(TRACE_SENTINEL)
    }

    /// Consume the next entry if it fires at `x16`.
    fn fire_at(&mut self, x16: i32) -> bool {
        if self.peek() == x16 {
            self.next += 1;
            true
        } else {
            false
        }
    }

    fn consumed(&self) -> u32 {
        self.next as u32
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayResult {
    pub final_state: KinematicState,
    pub ticks: u32,
    pub jumps_consumed: u32,
    pub score: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReplayCheckpoint {
    pub tick: u32,
    pub state: KinematicState,
    pub score: u32,
}

/// Replay `trace` against `layout` until the first collision.
///
/// Fails with `ReplayDivergence` if `max_ticks` ticks pass without one.
pub fn replay(layout: &Layout, trace: &[i32], max_ticks: u32) -> Result<ReplayResult, VerifyError> {
    run(layout, trace, max_ticks, |_, _| {})
}

/// Same as [`replay`], additionally sampling the state every `sample_every`
/// ticks and at termination.
pub fn replay_with_checkpoints(
    layout: &Layout,
    trace: &[i32],
    max_ticks: u32,
    sample_every: u32,
) -> Result<Vec<ReplayCheckpoint>, VerifyError> {
    let stride = if sample_every == 0 { 1 } else { sample_every };
    let mut checkpoints = Vec::new();
    let result = run(layout, trace, max_ticks, |tick, state| {
        if tick % stride == 0 {
            checkpoints.push(ReplayCheckpoint {
                tick,
                state: *state,
                score: score_at(state.x16),
            });
        }
    })?;

    if checkpoints.last().map(|c| c.tick) != Some(result.ticks) {
        checkpoints.push(ReplayCheckpoint {
            tick: result.ticks,
            state: result.final_state,
            score: result.score,
        });
    }
    Ok(checkpoints)
}

fn run<F>(
    layout: &Layout,
    trace: &[i32],
    max_ticks: u32,
    mut observe: F,
) -> Result<ReplayResult, VerifyError>
where
    F: FnMut(u32, &KinematicState),
{
    let mut state = KinematicState::initial();
    let mut jumps = JumpCursor::new(trace);
    let mut ticks = 0u32;
    observe(ticks, &state);

    while !collided(&state, layout) {
        if ticks >= max_ticks {
            return Err(VerifyError::ReplayDivergence { ticks, max_ticks });
        }
        let x16 = state.x16 + DELTA_X16;
        state = state.step(jumps.fire_at(x16));
        ticks += 1;
        observe(ticks, &state);
    }

    Ok(ReplayResult {
        final_state: state,
        ticks,
        jumps_consumed: jumps.consumed(),
        score: score_at(state.x16),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::generate_layout;

    fn layout() -> Layout {
        generate_layout("ABCDEFGHIJKLMNOPQRSTUVWXYZ123456").unwrap()
    }

    #[test]
    fn step_applies_gravity_and_clamps() {
        let mut state = KinematicState::initial();
        state = state.step(false);
        assert_eq!(state.x16, DELTA_X16);
        assert_eq!(state.y16, INITIAL_Y16);
        assert_eq!(state.vy16, DELTA_VY16);

        for _ in 0..100 {
            state = state.step(false);
        }
        assert_eq!(state.vy16, VY_LIMIT);
    }

    #[test]
    fn jump_is_an_instant_impulse() {
        let falling = KinematicState {
            x16: 0,
            y16: 1600,
            vy16: 80,
        };
        let next = falling.step(true);
        assert_eq!(next.y16, 1600 - VY_LIMIT);
        assert_eq!(next.vy16, -VY_LIMIT + DELTA_VY16);
    }

    #[test]
    fn initial_state_is_clear() {
        assert!(!collided(&KinematicState::initial(), &layout()));
    }

    #[test]
    fn ground_and_ceiling_collide() {
        let layout = layout();
        // bottom = y/16 + 7 + 60 must stay below 448
        let just_above_ground = KinematicState {
            x16: 0,
            y16: (GROUND_Y - 67 - 1) * 16,
            vy16: 0,
        };
        assert!(!collided(&just_above_ground, &layout));
        let on_ground = KinematicState {
            y16: (GROUND_Y - 67) * 16,
            ..just_above_ground
        };
        assert!(collided(&on_ground, &layout));

        // top = y/16 + 7 may reach -128
        let at_ceiling = KinematicState {
            x16: 0,
            y16: (CEILING_Y - 7) * 16,
            vy16: 0,
        };
        assert!(!collided(&at_ceiling, &layout));
        let above_ceiling = KinematicState {
            y16: (CEILING_Y - 8) * 16,
            ..at_ceiling
        };
        assert!(collided(&above_ceiling, &layout));
    }

    #[test]
    fn pipe_collision_depends_on_gap() {
        let layout = layout();
        let gap = layout.gap_at(1);
        // Put the hit box squarely inside the first pipe column (tile 16).
        let x16 = (16 * TILE_SIZE + 10 - 15) * 16;
        let inside_gap = KinematicState {
            x16,
            y16: (gap * TILE_SIZE + 10 - 7) * 16,
            vy16: 0,
        };
        assert!(!collided(&inside_gap, &layout));

        let above_gap = KinematicState {
            y16: (gap * TILE_SIZE - 1 - 7) * 16,
            ..inside_gap
        };
        assert!(collided(&above_gap, &layout));

        let below_gap = KinematicState {
            y16: ((gap + PIPE_GAP_Y) * TILE_SIZE - 60 - 7) * 16,
            ..inside_gap
        };
        assert!(collided(&below_gap, &layout));
    }

    #[test]
    fn score_counts_passed_intervals() {
        let tile = TILE_SIZE * 16;
        assert_eq!(score_at(0), 0);
        assert_eq!(score_at(-100), 0);
        assert_eq!(score_at(8 * tile), 0);
        assert_eq!(score_at(15 * tile), 0);
        assert_eq!(score_at(16 * tile), 1);
        assert_eq!(score_at(23 * tile), 1);
        assert_eq!(score_at(24 * tile), 2);
    }

    #[test]
    fn empty_trace_falls_to_the_ground() {
        let result = replay(&layout(), &[], 1_000).unwrap();
        assert_eq!(result.ticks, 60);
        assert_eq!(
            result.final_state,
            KinematicState {
                x16: 1920,
                y16: 6160,
                vy16: 96
            }
        );
        assert_eq!(result.score, 0);
        assert_eq!(result.jumps_consumed, 0);
    }

    #[test]
    fn budget_exhaustion_is_divergence() {
        let err = replay(&layout(), &[], 10).unwrap_err();
        assert_eq!(
            err,
            VerifyError::ReplayDivergence {
                ticks: 10,
                max_ticks: 10
            }
        );
    }

    #[test]
    fn budget_equal_to_collision_tick_is_enough() {
        assert!(replay(&layout(), &[], 60).is_ok());
        assert!(replay(&layout(), &[], 59).is_err());
    }

    #[test]
    fn unmatched_entry_blocks_the_rest_of_the_trace() {
        // 33 is not a multiple of DELTA_X16, so it never fires and 736 is never reached.
        let blocked = replay(&layout(), &[33, 736], 1_000).unwrap();
        let empty = replay(&layout(), &[], 1_000).unwrap();
        assert_eq!(blocked.final_state, empty.final_state);
        assert_eq!(blocked.jumps_consumed, 0);
    }

    #[test]
    fn spamming_jumps_does_not_help() {
        let spam: Vec<i32> = (1..=5_000).map(|i| i * 7).collect();
        let result = replay(&layout(), &spam, 10_000).unwrap();
        assert_eq!(result.score, 0);
    }

    #[test]
    fn checkpoints_cover_start_and_end() {
        let checkpoints = replay_with_checkpoints(&layout(), &[], 1_000, 16).unwrap();
        assert_eq!(checkpoints.first().unwrap().tick, 0);
        assert_eq!(checkpoints.last().unwrap().tick, 60);
        assert_eq!(checkpoints.len(), 5); // 0, 16, 32, 48, 60
    }
}
