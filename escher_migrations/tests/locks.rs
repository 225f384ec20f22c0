mod support;

use std::sync::Arc;
use std::time::Duration;

use escher_db::SchemaStateCache;
use escher_migrations::{Error, MigrationLockManager};
use support::MockDb;

const TTL: Duration = Duration::from_secs(60);

fn lock_manager(db: &MockDb) -> MigrationLockManager {
    support::init_tracing();
    MigrationLockManager::new(Arc::new(db.clone()), Arc::new(SchemaStateCache::new()))
}

#[tokio::test]
async fn test_concurrent_acquires_have_exactly_one_winner() -> anyhow::Result<()> {
    let db = MockDb::postgres();
    let first = lock_manager(&db);
    let second = lock_manager(&db);

    let (a, b) = tokio::join!(first.acquire("schema1", TTL), second.acquire("schema1", TTL));
    let (a, b) = (a?, b?);
    assert!(a ^ b, "exactly one concurrent acquire may win: {a} {b}");

    let holder = db.lock_holder("schema1").expect("one lock row exists");
    let winner = if a { &first } else { &second };
    assert_eq!(holder, winner.holder_id());
    Ok(())
}

#[tokio::test]
async fn test_acquire_is_not_reentrant_until_release() -> anyhow::Result<()> {
    let db = MockDb::postgres();
    let locks = lock_manager(&db);

    assert!(locks.acquire("schema1", TTL).await?);
    assert!(
        !locks.acquire("schema1", TTL).await?,
        "a held lock is not granted again, even to its own holder"
    );

    locks.release("schema1").await?;
    assert!(locks.acquire("schema1", TTL).await?);
    Ok(())
}

#[tokio::test]
async fn test_stale_locks_are_reaped_on_acquire() -> anyhow::Result<()> {
    let db = MockDb::postgres();
    let crashed = lock_manager(&db);
    let successor = lock_manager(&db);

    assert!(crashed.acquire("schema1", TTL).await?);
    // The holder disappears and its lifetime runs out.
    db.age_lock("schema1", 3600);

    assert!(
        successor.acquire("schema1", TTL).await?,
        "an expired lock no longer blocks acquisition"
    );
    assert_eq!(
        db.lock_holder("schema1").as_deref(),
        Some(successor.holder_id())
    );
    Ok(())
}

#[tokio::test]
async fn test_is_locked_tracks_the_row_lifecycle() -> anyhow::Result<()> {
    let db = MockDb::postgres();
    let locks = lock_manager(&db);

    assert!(!locks.is_locked("schema1").await?);
    assert!(locks.acquire("schema1", TTL).await?);
    assert!(locks.is_locked("schema1").await?);

    let current = locks.current_lock("schema1").await?.expect("row is active");
    assert_eq!(current.schema_name, "schema1");
    assert_eq!(current.holder_id, locks.holder_id());
    assert!(current.expires_at > current.acquired_at);

    locks.release("schema1").await?;
    assert!(!locks.is_locked("schema1").await?);
    Ok(())
}

#[tokio::test]
async fn test_release_is_idempotent() -> anyhow::Result<()> {
    let db = MockDb::postgres();
    let locks = lock_manager(&db);

    locks.release("schema1").await?;
    assert!(locks.acquire("schema1", TTL).await?);
    locks.release("schema1").await?;
    locks.release("schema1").await?;
    assert!(!locks.is_locked("schema1").await?);
    Ok(())
}

#[tokio::test]
async fn test_with_lock_releases_on_success() -> anyhow::Result<()> {
    let db = MockDb::postgres();
    let locks = lock_manager(&db);

    let value = locks
        .with_lock("schema1", TTL, || async { Ok::<_, Error>(42) })
        .await?;
    assert_eq!(value, 42);
    assert!(!locks.is_locked("schema1").await?);
    Ok(())
}

#[tokio::test]
async fn test_with_lock_releases_when_the_operation_fails() -> anyhow::Result<()> {
    let db = MockDb::postgres();
    let locks = lock_manager(&db);

    let result: Result<(), Error> = locks
        .with_lock("schema1", TTL, || async {
            Err(Error::Generic("operation blew up".to_string()))
        })
        .await;
    assert!(matches!(result, Err(Error::Generic(_))));
    assert!(
        !locks.is_locked("schema1").await?,
        "the lock is released even when the guarded operation fails"
    );
    Ok(())
}

#[tokio::test]
async fn test_with_lock_surfaces_contention_without_releasing() -> anyhow::Result<()> {
    let db = MockDb::postgres();
    let owner = lock_manager(&db);
    let contender = lock_manager(&db);

    assert!(owner.acquire("schema1", TTL).await?);
    let result = contender
        .with_lock("schema1", TTL, || async { Ok::<_, Error>(()) })
        .await;
    match result {
        Err(Error::LockHeld(schema)) => assert_eq!(schema, "schema1"),
        other => panic!("expected LockHeld, got {other:?}"),
    }
    // The owner's lock is untouched by the failed attempt.
    assert_eq!(
        db.lock_holder("schema1").as_deref(),
        Some(owner.holder_id())
    );
    Ok(())
}
