// File: radiobot-core/tests/playback_supervisor_tests.rs

use std::sync::Arc;
use std::time::Duration;

use twilight_model::id::Id;
use twilight_model::id::marker::GuildMarker;

use radiobot_common::models::playback::{PlayOutcome, PlaybackState, RestartOutcome, SourceEnded};
use radiobot_common::models::station::Station;
use radiobot_core::{
    services::{ConfigService, PlaybackSupervisor},
    test_utils::fakes::*,
    Error,
};

fn setup() -> (Arc<FakeVoiceSink>, Arc<PlaybackSupervisor>) {
    let sink = Arc::new(FakeVoiceSink::new());
    let repo = Arc::new(InMemoryConfigRepository::new(sample_config()));
    let config = Arc::new(ConfigService::with_config(repo, sample_config()));
    let supervisor = Arc::new(PlaybackSupervisor::new(sink.clone(), config));
    (sink, supervisor)
}

fn guild() -> Id<GuildMarker> {
    Id::new(TEST_GUILD)
}

fn station(n: usize) -> Station {
    let config = sample_config();
    config.directory.resolve_by_index(n).cloned().unwrap()
}

async fn wait_for_starts(sink: &FakeVoiceSink, n: usize) -> bool {
    for _ in 0..100 {
        if sink.start_count() >= n {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

#[tokio::test]
async fn test_play_joins_default_channel_and_starts() -> Result<(), Error> {
    let (sink, supervisor) = setup();

    let outcome = supervisor.play(guild(), &station(1), None).await?;
    assert!(matches!(outcome, PlayOutcome::Started { generation: 1, .. }));
    assert_eq!(supervisor.current_channel(guild()).await, Some(Id::new(DEFAULT_VOICE_CHANNEL)));
    assert_eq!(sink.playing_url(guild()).as_deref(), Some("http://alpha.example/stream"));

    let session = supervisor.snapshot(guild()).await.unwrap();
    assert_eq!(session.state, PlaybackState::Playing);
    assert_eq!(supervisor.current_selection().unwrap().url, "http://alpha.example/stream");
    Ok(())
}

#[tokio::test]
async fn test_play_same_station_twice_is_noop() -> Result<(), Error> {
    let (sink, supervisor) = setup();
    supervisor.play(guild(), &station(2), None).await?;

    let outcome = supervisor.play(guild(), &station(2), None).await?;
    assert!(matches!(outcome, PlayOutcome::AlreadyPlaying(s) if s.name == "Bravo"));
    assert_eq!(sink.start_count(), 1);
    Ok(())
}

#[tokio::test]
async fn test_at_most_one_source_under_concurrent_plays() -> Result<(), Error> {
    let (sink, supervisor) = setup();
    let (s1, s2, s3) = (station(1), station(2), station(3));

    let (a, b, c) = tokio::join!(
        supervisor.play(guild(), &s1, None),
        supervisor.play(guild(), &s2, None),
        supervisor.play(guild(), &s3, None),
    );
    a?;
    b?;
    c?;

    assert_eq!(sink.max_concurrent_sources(), 1);
    assert_eq!(sink.start_count(), 3);
    assert_eq!(supervisor.snapshot(guild()).await.unwrap().generation, 3);
    Ok(())
}

#[tokio::test]
async fn test_end_event_restarts_same_url() -> Result<(), Error> {
    let (sink, supervisor) = setup();
    let rx = supervisor.take_end_receiver().expect("receiver");
    tokio::spawn(supervisor.clone().run_watchdog(rx));

    supervisor.play(guild(), &station(1), None).await?;
    assert!(sink.end_current(guild(), Some("connection reset")));

    assert!(wait_for_starts(&sink, 2).await, "watchdog never restarted the source");
    assert_eq!(sink.playing_url(guild()).as_deref(), Some("http://alpha.example/stream"));
    assert_eq!(supervisor.snapshot(guild()).await.unwrap().generation, 2);
    assert_eq!(sink.max_concurrent_sources(), 1);
    Ok(())
}

#[tokio::test]
async fn test_failed_watchdog_restart_keeps_retrying() -> Result<(), Error> {
    let (sink, supervisor) = setup();
    let rx = supervisor.take_end_receiver().expect("receiver");
    tokio::spawn(supervisor.clone().run_watchdog(rx));

    supervisor.play(guild(), &station(2), None).await?;
    sink.fail_next_starts(1);
    assert!(sink.end_current(guild(), Some("upstream gone")));

    assert!(wait_for_starts(&sink, 3).await, "watchdog gave up after a failed restart");
    assert_eq!(sink.playing_url(guild()).as_deref(), Some("http://bravo.example/stream"));
    let session = supervisor.snapshot(guild()).await.unwrap();
    assert_eq!(session.generation, 3);
    assert_eq!(session.state, PlaybackState::Playing);
    Ok(())
}

#[tokio::test]
async fn test_stale_generation_end_is_ignored() -> Result<(), Error> {
    let (sink, supervisor) = setup();
    supervisor.play(guild(), &station(1), None).await?;
    supervisor.play(guild(), &station(2), None).await?;

    let outcome = supervisor
        .handle_source_ended(SourceEnded {
            guild_id: guild(),
            generation: 1,
            error: None,
        })
        .await?;
    assert_eq!(outcome, RestartOutcome::Superseded);
    assert_eq!(sink.start_count(), 2);
    assert_eq!(sink.playing_url(guild()).as_deref(), Some("http://bravo.example/stream"));
    Ok(())
}

#[tokio::test]
async fn test_end_racing_stop_does_not_restart() -> Result<(), Error> {
    let (sink, supervisor) = setup();
    let mut rx = supervisor.take_end_receiver().expect("receiver");

    supervisor.play(guild(), &station(1), None).await?;
    sink.end_current(guild(), None);
    let ended = rx.recv().await.expect("end event");

    supervisor.stop(guild()).await?;
    let outcome = supervisor.handle_source_ended(ended).await?;

    assert_eq!(outcome, RestartOutcome::Superseded);
    assert_eq!(sink.start_count(), 1);
    assert_eq!(supervisor.snapshot(guild()).await.unwrap().state, PlaybackState::Stopped);
    assert!(supervisor.current_selection().is_none());
    Ok(())
}

#[tokio::test]
async fn test_end_signal_fires_once() -> Result<(), Error> {
    let (sink, supervisor) = setup();
    let mut rx = supervisor.take_end_receiver().expect("receiver");
    supervisor.play(guild(), &station(1), None).await?;

    let signal = sink.current_signal(guild()).unwrap();
    assert!(signal.fire(None));
    assert!(!signal.fire(Some("late error".into())));

    assert!(rx.recv().await.is_some());
    assert!(rx.try_recv().is_err());
    Ok(())
}

#[tokio::test]
async fn test_check_and_restart_skips_when_playing() -> Result<(), Error> {
    let (sink, supervisor) = setup();
    supervisor.play(guild(), &station(1), None).await?;

    let outcome = supervisor
        .check_and_restart(guild(), "http://alpha.example/stream", None)
        .await?;
    assert_eq!(outcome, RestartOutcome::AlreadyPlaying);

    let outcome = supervisor
        .check_and_restart(guild(), "http://bravo.example/stream", None)
        .await?;
    assert_eq!(outcome, RestartOutcome::Superseded);
    assert_eq!(sink.start_count(), 1);
    Ok(())
}

#[tokio::test]
async fn test_restart_without_stream_uses_default() -> Result<(), Error> {
    let (sink, supervisor) = setup();

    let outcome = supervisor.restart(guild()).await?;
    match outcome {
        PlayOutcome::Started { station, generation } => {
            assert_eq!(station.name, "Alpha");
            assert_eq!(generation, 1);
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(sink.playing_url(guild()).as_deref(), Some("http://alpha.example/stream"));
    Ok(())
}

#[tokio::test]
async fn test_failed_start_marks_stalled() -> Result<(), Error> {
    let (sink, supervisor) = setup();
    sink.fail_next_starts(1);

    let err = supervisor.play(guild(), &station(3), None).await.unwrap_err();
    assert!(matches!(err, Error::PlaybackStart(_)));
    assert_eq!(supervisor.snapshot(guild()).await.unwrap().state, PlaybackState::Stalled);

    supervisor.play(guild(), &station(3), None).await?;
    assert_eq!(sink.playing_url(guild()).as_deref(), Some("http://charlie.example/stream"));
    Ok(())
}

#[tokio::test]
async fn test_connect_failure_is_no_voice_channel() -> Result<(), Error> {
    let (sink, supervisor) = setup();
    sink.fail_connects(true);

    let err = supervisor.play(guild(), &station(1), None).await.unwrap_err();
    assert!(matches!(err, Error::NoVoiceChannel(_)));
    assert_eq!(sink.start_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_volume_bounds() -> Result<(), Error> {
    let (sink, supervisor) = setup();

    assert!(matches!(supervisor.set_volume(guild(), -1).await, Err(Error::InvalidArgument(_))));
    assert!(matches!(supervisor.set_volume(guild(), 101).await, Err(Error::InvalidArgument(_))));
    assert_eq!(supervisor.set_volume(guild(), 0).await?, 0);
    assert_eq!(supervisor.set_volume(guild(), 100).await?, 100);
    assert!(!sink.calls().iter().any(|c| matches!(c, SinkCall::SetVolume(..))));

    supervisor.play(guild(), &station(1), None).await?;
    supervisor.set_volume(guild(), 35).await?;
    assert!(sink.calls().contains(&SinkCall::SetVolume(guild(), 0.35)));
    Ok(())
}

#[tokio::test]
async fn test_leave_stops_and_disconnects() -> Result<(), Error> {
    let (sink, supervisor) = setup();
    supervisor.play(guild(), &station(1), None).await?;

    supervisor.leave(guild()).await?;
    assert!(supervisor.current_channel(guild()).await.is_none());
    assert!(sink.playing_url(guild()).is_none());
    assert!(supervisor.active_guilds().await.is_empty());
    Ok(())
}
