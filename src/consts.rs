//! Project-wide constants.

/// Progress (0-100) at which the engine is considered confident enough to guess.
pub const PROGRESS_THRESHOLD: f64 = 80.0;

/// Hard cap on engine steps, independent of progress.
pub const STEP_CEILING: u32 = 78;

/// Theme id for "characters", used when the region carries no suffix.
pub const DEFAULT_THEME: u8 = 1;

/// Child mode filters adult content on the backend. Always off.
pub const CHILD_MODE: bool = false;

/// Candidates requested when concluding without a proposition.
pub const CANDIDATE_COUNT: usize = 2;

/// User agent sent with every backend request.
pub const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_agent_names_the_crate() {
        assert!(USER_AGENT.starts_with("akicli/"));
        assert!(USER_AGENT.ends_with(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn thresholds_match_session_limits() {
        assert_eq!(PROGRESS_THRESHOLD, 80.0);
        assert_eq!(STEP_CEILING, 78);
    }
}
