//! Polling folder watcher.
//!
//! Takes a snapshot of the folder's files and their modification times on
//! every tick and emits a `fileChange` event for each difference. Files
//! already present when the watcher starts are not reported.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::bus::EventBus;
use crate::error::TriggerError;
use crate::matcher::WORKFLOW_ID_FIELD;
use crate::producer::EventProducer;

pub const FILE_CHANGE_EVENT: &str = "fileChange";

/// Files in the watched folder and their modification times.
pub type Snapshot = BTreeMap<PathBuf, SystemTime>;

#[derive(Debug, Clone)]
pub struct FileWatcher {
  workflow_key: String,
  folder: PathBuf,
  interval: Duration,
}

impl FileWatcher {
  pub fn new(workflow_key: impl Into<String>, folder: impl Into<PathBuf>, interval: Duration) -> Self {
    Self {
      workflow_key: workflow_key.into(),
      folder: folder.into(),
      interval,
    }
  }

  /// Current state of the folder. A missing or unreadable folder is empty.
  pub async fn snapshot(&self) -> Snapshot {
    let mut snapshot = Snapshot::new();
    let mut entries = match tokio::fs::read_dir(&self.folder).await {
      Ok(entries) => entries,
      Err(e) => {
        debug!(folder = %self.folder.display(), error = %e, "folder not readable");
        return snapshot;
      }
    };

    while let Ok(Some(entry)) = entries.next_entry().await {
      let Ok(metadata) = entry.metadata().await else {
        continue;
      };
      if metadata.is_file() {
        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        snapshot.insert(entry.path(), modified);
      }
    }
    snapshot
  }

  /// Events describing how `current` differs from `previous`.
  pub fn diff(&self, previous: &Snapshot, current: &Snapshot) -> Vec<Value> {
    let mut events = Vec::new();

    for (path, modified) in current {
      match previous.get(path) {
        None => events.push(self.change("created", path)),
        Some(before) if before != modified => events.push(self.change("modified", path)),
        Some(_) => {}
      }
    }
    for path in previous.keys() {
      if !current.contains_key(path) {
        events.push(self.change("deleted", path));
      }
    }

    events
  }

  fn change(&self, kind: &str, path: &Path) -> Value {
    let name = path
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_default();

    json!({
      WORKFLOW_ID_FIELD: self.workflow_key,
      "changeType": kind,
      "file": {
        "path": path.display().to_string(),
        "folder": self.folder.display().to_string(),
        "name": name,
      }
    })
  }
}

#[async_trait]
impl EventProducer for FileWatcher {
  async fn run(&self, bus: EventBus, cancel: CancellationToken) -> Result<(), TriggerError> {
    info!(
      workflow = %self.workflow_key,
      folder = %self.folder.display(),
      "file watcher started"
    );

    let mut previous = self.snapshot().await;
    let mut ticker = tokio::time::interval(self.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
      tokio::select! {
        _ = cancel.cancelled() => break,
        _ = ticker.tick() => {
          let current = self.snapshot().await;
          for event in self.diff(&previous, &current) {
            bus.emit(FILE_CHANGE_EVENT, event).await;
          }
          previous = current;
        }
      }
    }

    info!(workflow = %self.workflow_key, "file watcher stopped");
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_diff_reports_changes() {
    let dir = tempfile::tempdir().unwrap();
    let watcher = FileWatcher::new("intake", dir.path(), Duration::from_millis(10));
    std::fs::write(dir.path().join("keep.pdf"), "1").unwrap();
    std::fs::write(dir.path().join("gone.pdf"), "1").unwrap();
    std::fs::create_dir(dir.path().join("nested")).unwrap();

    let before = watcher.snapshot().await;
    assert_eq!(before.len(), 2);

    std::fs::remove_file(dir.path().join("gone.pdf")).unwrap();
    std::fs::write(dir.path().join("new.pdf"), "1").unwrap();
    let mut after = watcher.snapshot().await;
    // Force a modification without depending on filesystem timestamp resolution.
    after.insert(dir.path().join("keep.pdf"), SystemTime::now() + Duration::from_secs(60));

    let events = watcher.diff(&before, &after);
    let kinds: Vec<(&str, &str)> = events
      .iter()
      .map(|e| {
        (
          e["changeType"].as_str().unwrap(),
          e["file"]["name"].as_str().unwrap(),
        )
      })
      .collect();

    assert_eq!(
      kinds,
      vec![("modified", "keep.pdf"), ("created", "new.pdf"), ("deleted", "gone.pdf")]
    );
    assert_eq!(events[0]["workflowId"], "intake");
    assert_eq!(events[1]["file"]["folder"], dir.path().display().to_string());
  }

  #[tokio::test]
  async fn test_missing_folder_is_empty() {
    let watcher = FileWatcher::new("intake", "/definitely/not/here", Duration::from_millis(10));
    assert!(watcher.snapshot().await.is_empty());
  }
}
