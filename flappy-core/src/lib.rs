//! Flappy core - deterministic replay engine for server-side score verification.
//!
//! The client only submits the horizontal positions at which it jumped. This
//! crate regenerates the obstacle layout from the session's seed key, replays
//! the jumps with integer-only physics, and derives the score the server
//! records. Nothing here touches I/O or wall clocks.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod constants;
pub mod error;
pub mod fixed_point;
pub mod layout;
pub mod leaderboard;
pub mod rng;
pub mod sim;
pub mod timing;
pub mod verify;

pub use error::VerifyError;
pub use layout::{generate_layout, Layout};
pub use leaderboard::{rank_rows, RankedScore, ScoreRow};
pub use sim::{collided, replay, score_at, KinematicState, ReplayResult};
pub use timing::{is_plausible, TimingPolicy};
pub use verify::{
    verify_and_score, verify_session, verify_trace, SessionTimes, VerifiedScore, VerifyPolicy,
};
