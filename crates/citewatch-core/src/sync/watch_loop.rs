use std::future::Future;
use std::path::Path;
use std::sync::mpsc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error, info};

use super::pending::PendingNotes;
use super::watcher::NoteEvent;

/// Handles one changed note. Implemented by the citation pipeline.
#[async_trait]
pub trait NoteProcessor: Send {
    async fn note_changed(&mut self, path: &Path) -> anyhow::Result<()>;
}

/// Drains note-change events on a fixed poll interval and hands each
/// debounced note to a [`NoteProcessor`], one at a time.
pub struct WatchLoop {
    events: mpsc::Receiver<NoteEvent>,
    pending: PendingNotes,
    poll_interval: Duration,
}

impl WatchLoop {
    pub fn new(events: mpsc::Receiver<NoteEvent>, debounce: Duration, poll_interval: Duration) -> Self {
        Self {
            events,
            pending: PendingNotes::new(debounce),
            poll_interval,
        }
    }

    /// Run until `shutdown` resolves. Shutdown is only observed between poll
    /// iterations, so a note being processed always runs to completion.
    pub async fn run<P, S>(mut self, processor: &mut P, shutdown: S)
    where
        P: NoteProcessor + ?Sized,
        S: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("stopping watch loop");
                    break;
                }
                _ = ticker.tick() => {
                    self.poll(processor).await;
                }
            }
        }
    }

    /// One iteration: collect queued notifications, then process every
    /// pending note sequentially.
    pub async fn poll<P>(&mut self, processor: &mut P) -> usize
    where
        P: NoteProcessor + ?Sized,
    {
        while let Ok(event) = self.events.try_recv() {
            if !self.pending.notify(event.path.clone(), event.at) {
                debug!(path = %event.path.display(), "change inside debounce window, dropped");
            }
        }

        let mut handled = 0;
        for path in self.pending.drain() {
            if !path.exists() {
                debug!(path = %path.display(), "pending note no longer exists");
                continue;
            }
            info!(path = %path.display(), "note changed");
            if let Err(e) = processor.note_changed(&path).await {
                error!(path = %path.display(), error = %format!("{e:#}"), "failed to process note");
            }
            handled += 1;
        }
        handled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Instant;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingProcessor {
        seen: Vec<PathBuf>,
        fail_on: Option<PathBuf>,
    }

    #[async_trait]
    impl NoteProcessor for RecordingProcessor {
        async fn note_changed(&mut self, path: &Path) -> anyhow::Result<()> {
            self.seen.push(path.to_path_buf());
            if self.fail_on.as_deref() == Some(path) {
                anyhow::bail!("boom");
            }
            Ok(())
        }
    }

    fn event(path: &Path, at: Instant) -> NoteEvent {
        NoteEvent {
            path: path.to_path_buf(),
            at,
        }
    }

    #[tokio::test]
    async fn test_burst_of_events_processes_note_once() {
        let dir = TempDir::new().unwrap();
        let note = dir.path().join("a.md");
        std::fs::write(&note, "x").unwrap();

        let (tx, rx) = mpsc::channel();
        let t0 = Instant::now();
        tx.send(event(&note, t0)).unwrap();
        tx.send(event(&note, t0 + Duration::from_millis(300))).unwrap();
        tx.send(event(&note, t0 + Duration::from_millis(1500))).unwrap();

        let mut lp = WatchLoop::new(rx, Duration::from_secs(2), Duration::from_millis(10));
        let mut processor = RecordingProcessor::default();
        assert_eq!(lp.poll(&mut processor).await, 1);
        assert_eq!(processor.seen, vec![note.clone()]);

        assert_eq!(lp.poll(&mut processor).await, 0);
    }

    #[tokio::test]
    async fn test_missing_note_is_discarded() {
        let dir = TempDir::new().unwrap();
        let (tx, rx) = mpsc::channel();
        tx.send(event(&dir.path().join("gone.md"), Instant::now()))
            .unwrap();

        let mut lp = WatchLoop::new(rx, Duration::from_secs(2), Duration::from_millis(10));
        let mut processor = RecordingProcessor::default();
        assert_eq!(lp.poll(&mut processor).await, 0);
        assert!(processor.seen.is_empty());
    }

    #[tokio::test]
    async fn test_failure_is_isolated_to_one_note() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.md");
        let b = dir.path().join("b.md");
        std::fs::write(&a, "x").unwrap();
        std::fs::write(&b, "y").unwrap();

        let (tx, rx) = mpsc::channel();
        let t0 = Instant::now();
        tx.send(event(&a, t0)).unwrap();
        tx.send(event(&b, t0)).unwrap();

        let mut lp = WatchLoop::new(rx, Duration::from_secs(2), Duration::from_millis(10));
        let mut processor = RecordingProcessor {
            fail_on: Some(a.clone()),
            ..Default::default()
        };
        assert_eq!(lp.poll(&mut processor).await, 2);
        assert_eq!(processor.seen, vec![a, b]);
        assert!(lp.pending.is_empty());
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let dir = TempDir::new().unwrap();
        let note = dir.path().join("a.md");
        std::fs::write(&note, "x").unwrap();

        let (tx, rx) = mpsc::channel();
        tx.send(event(&note, Instant::now())).unwrap();

        let lp = WatchLoop::new(rx, Duration::from_secs(2), Duration::from_millis(10));
        let mut processor = RecordingProcessor::default();
        lp.run(
            &mut processor,
            tokio::time::sleep(Duration::from_millis(200)),
        )
        .await;

        assert_eq!(processor.seen, vec![note]);
        drop(tx);
    }
}
