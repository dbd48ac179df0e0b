use core::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VerifyError {
    /// The seed key is empty, so no layout can be derived from it.
    InvalidSeed,
    /// The replay ran out of tick budget without hitting anything.
    ReplayDivergence { ticks: u32, max_ticks: u32 },
    /// Wall-clock session length does not fit the simulated length. Carries
    /// the observed length and the accepted band, all in milliseconds.
    ImplausibleTiming {
        elapsed_ms: u64,
        min_ms: u64,
        max_ms: u64,
    },
}

impl VerifyError {
    /// Stable identifier for API responses and logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidSeed => "invalid_seed",
            Self::ReplayDivergence { .. } => "replay_divergence",
            Self::ImplausibleTiming { .. } => "implausible_timing",
        }
    }
}

impl fmt::Display for VerifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSeed => write!(f, "seed key is empty"),
            Self::ReplayDivergence { ticks, max_ticks } => write!(
                f,
                "replay did not terminate: {ticks} ticks without collision (budget {max_ticks})"
            ),
            Self::ImplausibleTiming {
                elapsed_ms,
                min_ms,
                max_ms,
            } => write!(
                f,
                "session lasted {elapsed_ms} ms, replay allows {min_ms}..={max_ms} ms"
            ),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for VerifyError {}
