use std::{fs, path::PathBuf, time::Duration};

use dirwatch::{start_watching, ChangeEvent, EventKind, WatchError, WatchHandle, WorkerState};
use tokio::{
    sync::mpsc::{self, UnboundedReceiver},
    time::{sleep, timeout},
};

async fn next(rx: &mut UnboundedReceiver<ChangeEvent>) -> ChangeEvent {
    timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for an event")
        .expect("watcher stopped")
}

async fn assert_quiet(rx: &mut UnboundedReceiver<ChangeEvent>) {
    tokio::select! {
        event = rx.recv() => {
            panic!("The receiver channel should not receive any more events. Received event: {event:?}");
        },
        _ = sleep(Duration::from_millis(300)) => {}
    }
}

#[tokio::test]
async fn create_then_delete() -> anyhow::Result<()> {
    let dir = tempdir::TempDir::new("dirwatch")?;
    let (tx, mut rx) = mpsc::unbounded_channel();

    let watch = start_watching(dir.path(), EventKind::Created | EventKind::Deleted, tx)?;
    assert_eq!(watch.state(), WorkerState::Running);

    let file = dir.path().join("a.txt");

    fs::File::create(&file)?;
    assert_eq!(next(&mut rx).await, ChangeEvent::new(EventKind::Created, "a.txt"));
    assert_quiet(&mut rx).await;

    // Modified was not requested.
    fs::write(&file, b"Monty")?;
    assert_quiet(&mut rx).await;

    fs::remove_file(&file)?;
    assert_eq!(next(&mut rx).await, ChangeEvent::new(EventKind::Deleted, "a.txt"));

    watch.stop();
    timeout(Duration::from_secs(5), watch.join()).await??;

    Ok(())
}

#[tokio::test]
async fn modifications_are_reported_when_requested() -> anyhow::Result<()> {
    let dir = tempdir::TempDir::new("dirwatch")?;
    let file = dir.path().join("notes.txt");
    fs::write(&file, b"Monty")?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let watch = start_watching(dir.path(), EventKind::Modified, tx)?;

    fs::write(&file, b"Monty2")?;

    assert_eq!(
        next(&mut rx).await,
        ChangeEvent::new(EventKind::Modified, "notes.txt")
    );

    watch.stop();
    timeout(Duration::from_secs(5), watch.join()).await??;

    Ok(())
}

#[tokio::test]
async fn renames_within_the_directory() -> anyhow::Result<()> {
    let dir = tempdir::TempDir::new("dirwatch")?;
    let from = dir.path().join("from.txt");
    fs::write(&from, b"Monty")?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let watch = start_watching(dir.path(), EventKind::Created | EventKind::Deleted, tx)?;

    fs::rename(&from, dir.path().join("to.txt"))?;

    assert_eq!(
        next(&mut rx).await,
        ChangeEvent::new(EventKind::Deleted, "from.txt")
    );
    assert_eq!(next(&mut rx).await, ChangeEvent::new(EventKind::Created, "to.txt"));

    watch.stop();
    timeout(Duration::from_secs(5), watch.join()).await??;

    Ok(())
}

#[tokio::test]
async fn missing_directory_is_rejected() -> anyhow::Result<()> {
    let dir = tempdir::TempDir::new("dirwatch")?;
    let missing = dir.path().join("missing");
    let (tx, _rx) = mpsc::unbounded_channel::<ChangeEvent>();

    let err = start_watching(&missing, EventKind::Created, tx).unwrap_err();

    assert!(matches!(err, WatchError::DirectoryNotFound { path } if path == missing));

    Ok(())
}

#[tokio::test]
async fn no_events_after_stop() -> anyhow::Result<()> {
    let dir = tempdir::TempDir::new("dirwatch")?;
    let (tx, mut rx) = mpsc::unbounded_channel();

    let watch = start_watching(dir.path(), EventKind::Created, tx)?;

    watch.stop();
    watch.stop();
    timeout(Duration::from_secs(5), watch.join()).await??;

    fs::File::create(dir.path().join("late.txt"))?;

    assert!(rx.recv().await.is_none());

    Ok(())
}

#[tokio::test]
async fn removing_the_directory_ends_the_watch() -> anyhow::Result<()> {
    let parent = tempdir::TempDir::new("dirwatch")?;
    let dir = parent.path().join("watched");
    fs::create_dir(&dir)?;

    let (tx, _rx) = mpsc::unbounded_channel();
    let watch = start_watching(&dir, EventKind::Created, tx)?;
    let observer = watch.handle();

    fs::remove_dir(&dir)?;

    let result = timeout(Duration::from_secs(5), watch.join()).await?;

    assert!(matches!(result, Err(WatchError::Closed { .. })));
    assert_eq!(observer.state(), WorkerState::Stopped);

    Ok(())
}

#[tokio::test]
async fn stream_delivers_changes() -> anyhow::Result<()> {
    use tokio_stream::StreamExt;

    let dir = tempdir::TempDir::new("dirwatch")?;

    let (watch, mut changes) = WatchHandle::builder()
        .kinds(EventKind::Created)
        .with_buffer(8)
        .stream(dir.path())?;

    assert_eq!(watch.directory(), dir.path().canonicalize()?);

    fs::create_dir(dir.path().join("sub"))?;

    let change = timeout(Duration::from_secs(5), changes.next())
        .await?
        .expect("stream ended early");

    assert_eq!(change, ChangeEvent::new(EventKind::Created, PathBuf::from("sub")));

    watch.stop();
    assert!(changes.next().await.is_none());

    Ok(())
}

#[tokio::test]
async fn burst_larger_than_the_stream_buffer() -> anyhow::Result<()> {
    use std::collections::BTreeSet;

    let dir = tempdir::TempDir::new("dirwatch")?;

    let (watch, mut changes) = WatchHandle::builder()
        .kinds(EventKind::Created)
        .with_buffer(4)
        .stream(dir.path())?;

    let created: BTreeSet<PathBuf> = (0..100).map(|i| PathBuf::from(format!("{i}.txt"))).collect();

    for name in created.iter() {
        fs::File::create(dir.path().join(name))?;
    }

    // Let the worker run into the full buffer before anything is drained.
    sleep(Duration::from_millis(500)).await;

    let mut received = BTreeSet::new();

    while received.len() < created.len() {
        let change = timeout(Duration::from_secs(5), changes.recv())
            .await?
            .expect("stream ended early");

        assert_eq!(change.kind, EventKind::Created);
        assert!(received.insert(change.path), "duplicate event");
    }

    assert_eq!(received, created);

    watch.stop();
    timeout(Duration::from_secs(5), watch.join()).await??;

    Ok(())
}
