use std::time::Duration;
use tokio::time::Instant;

/// Discord's limit on guild nicknames.
pub const MAX_NICKNAME_CHARS: usize = 32;

/// Per-guild display-name bookkeeping, owned by the identity sync service.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdentityState {
    pub desired_label: String,
    pub last_applied_label: Option<String>,
    pub pending_retry_at: Option<Instant>,
    /// Set once the platform's current nickname has been read.
    pub seeded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Unchanged,
    Applied,
    /// A rate-limited retry for this guild is already scheduled.
    Pending,
    RetryScheduled(Duration),
}

/// Nickname shown while a station is playing.
pub fn station_label(station_name: &str) -> String {
    let label = format!("# {station_name}");
    label.chars().take(MAX_NICKNAME_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_station_label_truncates() {
        assert_eq!(station_label("Jazz FM"), "# Jazz FM");
        let long = station_label("An Extremely Long Station Name That Never Ends");
        assert_eq!(long.chars().count(), MAX_NICKNAME_CHARS);
        assert!(long.starts_with("# An Extremely"));
    }
}
