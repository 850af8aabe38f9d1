// File: radiobot-core/tests/identity_sync_tests.rs

use std::sync::Arc;
use std::time::Duration;

use twilight_model::id::Id;
use twilight_model::id::marker::GuildMarker;

use radiobot_common::models::identity::SyncOutcome;
use radiobot_core::{services::IdentitySync, test_utils::fakes::*, Error};

fn guild() -> Id<GuildMarker> {
    Id::new(TEST_GUILD)
}

fn rate_limited(ms: u64) -> Result<(), Error> {
    Err(Error::RateLimited {
        retry_after: Duration::from_millis(ms),
    })
}

async fn wait_for_nickname(chat: &FakeChat, expected: &str) -> bool {
    for _ in 0..100 {
        if chat.nickname(guild()).as_deref() == Some(expected) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

#[tokio::test]
async fn test_sync_applies_station_label() -> Result<(), Error> {
    let chat = Arc::new(FakeChat::new());
    let identity = IdentitySync::new(chat.clone());

    assert_eq!(identity.sync_station(guild(), "Jazz FM").await?, SyncOutcome::Applied);
    assert_eq!(chat.nickname(guild()).as_deref(), Some("# Jazz FM"));
    Ok(())
}

#[tokio::test]
async fn test_matching_nickname_is_not_reapplied() -> Result<(), Error> {
    let chat = Arc::new(FakeChat::new());
    chat.set_current_nickname(guild(), "# Jazz FM");
    let identity = IdentitySync::new(chat.clone());

    assert_eq!(identity.sync_station(guild(), "Jazz FM").await?, SyncOutcome::Unchanged);
    assert!(chat.nickname_attempts().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_rate_limit_schedules_one_retry() -> Result<(), Error> {
    let chat = Arc::new(FakeChat::new());
    chat.push_nickname_result(rate_limited(20));
    let identity = IdentitySync::new(chat.clone());

    let outcome = identity.sync_station(guild(), "Alpha").await?;
    assert_eq!(outcome, SyncOutcome::RetryScheduled(Duration::from_millis(20)));
    assert!(identity.snapshot(guild()).await.unwrap().pending_retry_at.is_some());

    assert!(wait_for_nickname(&chat, "# Alpha").await, "retry never applied the label");
    assert_eq!(chat.nickname_attempts().len(), 2);
    assert!(identity.snapshot(guild()).await.unwrap().pending_retry_at.is_none());
    Ok(())
}

#[tokio::test]
async fn test_changes_during_backoff_coalesce_into_retry() -> Result<(), Error> {
    let chat = Arc::new(FakeChat::new());
    chat.push_nickname_result(rate_limited(50));
    let identity = IdentitySync::new(chat.clone());

    identity.sync_station(guild(), "Alpha").await?;
    assert_eq!(identity.sync_station(guild(), "Bravo").await?, SyncOutcome::Pending);
    assert_eq!(identity.sync_station(guild(), "Charlie").await?, SyncOutcome::Pending);
    assert_eq!(chat.nickname_attempts().len(), 1);

    assert!(wait_for_nickname(&chat, "# Charlie").await);
    let attempts = chat.nickname_attempts();
    assert_eq!(attempts.len(), 2);
    assert_eq!(attempts[1].1, "# Charlie");
    Ok(())
}

#[tokio::test]
async fn test_concurrent_syncs_issue_one_update() -> Result<(), Error> {
    let chat = Arc::new(FakeChat::new());
    let identity = IdentitySync::new(chat.clone());

    let (a, b) = tokio::join!(
        identity.sync_station(guild(), "Alpha"),
        identity.sync_station(guild(), "Alpha"),
    );
    let mut outcomes = vec![a?, b?];
    outcomes.sort_by_key(|o| matches!(o, SyncOutcome::Unchanged));
    assert_eq!(outcomes, vec![SyncOutcome::Applied, SyncOutcome::Unchanged]);
    assert_eq!(chat.nickname_attempts().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_other_errors_propagate_without_retry() -> Result<(), Error> {
    let chat = Arc::new(FakeChat::new());
    chat.push_nickname_result(Err(Error::Permission("missing MANAGE_NICKNAMES".into())));
    let identity = IdentitySync::new(chat.clone());

    let err = identity.sync_station(guild(), "Alpha").await.unwrap_err();
    assert!(matches!(err, Error::Permission(_)));
    assert!(identity.snapshot(guild()).await.unwrap().pending_retry_at.is_none());

    assert_eq!(identity.sync_station(guild(), "Alpha").await?, SyncOutcome::Applied);
    Ok(())
}
