// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn cluster() -> ClusterId {
    ClusterId::parse("00000000-0000-0000-0000-00000000abcd").unwrap()
}

#[tokio::test]
async fn acquire_creates_the_lock_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut lock = ClusterLock::new(dir.path(), &cluster());
    lock.acquire(LockWait::Once).await.unwrap();
    assert!(lock.held());
    assert!(lock.path().exists());
    assert!(lock.path().ends_with("00000000-0000-0000-0000-00000000abcd.lock"));
}

#[tokio::test]
async fn nested_acquire_counts_and_releases_at_zero() {
    let dir = tempfile::tempdir().unwrap();
    let mut lock = ClusterLock::new(dir.path(), &cluster());
    lock.acquire(LockWait::Once).await.unwrap();
    lock.acquire(LockWait::Once).await.unwrap();
    lock.release();
    assert!(lock.held(), "inner release must not drop the file lock");

    let mut other = ClusterLock::new(dir.path(), &cluster());
    assert!(matches!(
        other.acquire(LockWait::Once).await,
        Err(Error::LockTimeout { .. })
    ));

    lock.release();
    assert!(!lock.held());
    other.acquire(LockWait::Once).await.unwrap();
}

#[tokio::test]
async fn release_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let mut lock = ClusterLock::new(dir.path(), &cluster());
    lock.release();
    lock.acquire(LockWait::Once).await.unwrap();
    lock.release();
    lock.release();
    assert!(!lock.held());
}

#[tokio::test]
async fn timed_acquire_fails_while_held() {
    let dir = tempfile::tempdir().unwrap();
    let mut holder = ClusterLock::new(dir.path(), &cluster());
    holder.acquire(LockWait::Once).await.unwrap();

    let mut waiter = ClusterLock::new(dir.path(), &cluster());
    let started = std::time::Instant::now();
    let err = waiter.acquire(LockWait::For(Duration::from_millis(150))).await.unwrap_err();
    assert!(matches!(err, Error::LockTimeout { .. }));
    assert!(started.elapsed() >= Duration::from_millis(150));
}

#[tokio::test]
async fn timed_acquire_succeeds_once_released() {
    let dir = tempfile::tempdir().unwrap();
    let mut holder = ClusterLock::new(dir.path(), &cluster());
    holder.acquire(LockWait::Once).await.unwrap();

    let lock_dir = dir.path().to_path_buf();
    let waiter = tokio::spawn(async move {
        let mut waiter = ClusterLock::new(&lock_dir, &cluster());
        waiter.acquire(LockWait::For(Duration::from_secs(5))).await
    });
    tokio::time::sleep(Duration::from_millis(100)).await;
    holder.release();
    waiter.await.unwrap().unwrap();
}

#[tokio::test]
async fn drop_releases_unconditionally() {
    let dir = tempfile::tempdir().unwrap();
    {
        let mut lock = ClusterLock::new(dir.path(), &cluster());
        lock.acquire(LockWait::Once).await.unwrap();
        lock.acquire(LockWait::Once).await.unwrap();
        // Dropped while nominally held twice.
    }
    let mut lock = ClusterLock::new(dir.path(), &cluster());
    lock.acquire(LockWait::Once).await.unwrap();
}
