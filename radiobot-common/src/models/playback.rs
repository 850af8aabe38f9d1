use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;
use twilight_model::id::Id;
use twilight_model::id::marker::GuildMarker;

use crate::models::station::Station;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackState {
    Idle,
    Starting,
    Playing,
    /// The source ended on its own; the watchdog is expected to restart it.
    Stalled,
    /// Stopped on request. No restart will be attempted.
    Stopped,
}

/// Per-guild playback bookkeeping, owned by the playback supervisor.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSession {
    pub active_url: Option<String>,
    pub is_playing: bool,
    /// Bumped for every new source; completion events carry the value that
    /// was current when their source started.
    pub generation: u64,
    pub state: PlaybackState,
    /// Linear gain in `0.0..=1.0`, applied to every new source.
    pub volume: f32,
}

impl PlaybackSession {
    pub fn new(volume: f32) -> Self {
        Self {
            active_url: None,
            is_playing: false,
            generation: 0,
            state: PlaybackState::Idle,
            volume,
        }
    }

    /// True if a completion tagged with `generation` still refers to the
    /// source this session is supposed to be playing.
    pub fn is_current(&self, generation: u64) -> bool {
        self.active_url.is_some() && self.generation == generation
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlayOutcome {
    /// The requested URL is already the active, playing source.
    AlreadyPlaying(Station),
    Started { station: Station, generation: u64 },
}

/// Result of a watchdog restart attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestartOutcome {
    /// A newer `play`/`stop` replaced the generation that asked for this restart.
    Superseded,
    /// Something else already brought the sink back to playing.
    AlreadyPlaying,
    Restarted { generation: u64 },
}

/// The most recently selected stream, across all guilds. The presence
/// announcer probes this URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub guild_id: Id<GuildMarker>,
    pub url: String,
}

/// Emitted by a voice sink when a source stops producing audio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEnded {
    pub guild_id: Id<GuildMarker>,
    pub generation: u64,
    pub error: Option<String>,
}

/// Handed to the voice sink together with each new source. Fires at most
/// once, however many end/error notifications the sink produces.
#[derive(Debug, Clone)]
pub struct SourceEndSignal {
    guild_id: Id<GuildMarker>,
    generation: u64,
    tx: UnboundedSender<SourceEnded>,
    fired: Arc<AtomicBool>,
}

impl SourceEndSignal {
    pub fn new(guild_id: Id<GuildMarker>, generation: u64, tx: UnboundedSender<SourceEnded>) -> Self {
        Self {
            guild_id,
            generation,
            tx,
            fired: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn guild_id(&self) -> Id<GuildMarker> {
        self.guild_id
    }

    /// Returns false if the signal had already fired or the watchdog is gone.
    pub fn fire(&self, error: Option<String>) -> bool {
        if self.fired.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.tx
            .send(SourceEnded {
                guild_id: self.guild_id,
                generation: self.generation,
                error,
            })
            .is_ok()
    }

    /// Suppresses any later `fire`. Used when the source is stopped on purpose.
    pub fn disarm(&self) {
        self.fired.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::unbounded_channel;

    #[test]
    fn test_signal_fires_once() {
        let (tx, mut rx) = unbounded_channel();
        let signal = SourceEndSignal::new(Id::new(7), 3, tx);
        let twin = signal.clone();

        assert!(signal.fire(Some("decoder died".into())));
        assert!(!twin.fire(None));

        let ended = rx.try_recv().expect("one event");
        assert_eq!(ended.generation, 3);
        assert_eq!(ended.error.as_deref(), Some("decoder died"));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_disarmed_signal_stays_silent() {
        let (tx, mut rx) = unbounded_channel();
        let signal = SourceEndSignal::new(Id::new(7), 1, tx);
        signal.disarm();
        assert!(!signal.fire(None));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_session_is_current() {
        let mut session = PlaybackSession::new(0.5);
        assert!(!session.is_current(0));
        session.active_url = Some("http://a".into());
        session.generation = 2;
        assert!(session.is_current(2));
        assert!(!session.is_current(1));
    }
}
