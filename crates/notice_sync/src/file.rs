use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use notice_domain::{RawDocument, RawNotice, SyncError};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use serde::Deserialize;

use crate::source::{NoticeSource, SnapshotSink, SubscriptionHandle};

/// On-disk snapshot layout: either a list of documents carrying their own
/// `id`, or an object keyed by id.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SnapshotFile {
    List(Vec<RawDocument>),
    Keyed(BTreeMap<String, RawNotice>),
}

impl SnapshotFile {
    fn into_documents(self) -> Vec<RawDocument> {
        match self {
            SnapshotFile::List(documents) => documents,
            SnapshotFile::Keyed(entries) => entries
                .into_iter()
                .map(|(id, fields)| RawDocument::new(id, fields))
                .collect(),
        }
    }
}

/// Serves each collection from `<root>/<collection>.json` and re-delivers the
/// whole file whenever it changes. A missing file is an empty collection.
#[derive(Debug, Clone)]
pub struct FileSource {
    root: PathBuf,
}

impl FileSource {
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let root = root
            .canonicalize()
            .with_context(|| format!("notice directory `{}` is not accessible", root.display()))?;
        anyhow::ensure!(root.is_dir(), "`{}` is not a directory", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn collection_path(&self, collection: &str) -> PathBuf {
        self.root.join(format!("{collection}.json"))
    }
}

impl NoticeSource for FileSource {
    fn subscribe(&self, collection: &str, sink: SnapshotSink) -> Result<Box<dyn SubscriptionHandle>> {
        let reloader = Arc::new(Reloader {
            path: self.collection_path(collection),
            sink,
            gate: Mutex::new(()),
        });
        let file_name = reloader.path.file_name().map(|name| name.to_os_string());
        let watch_reloader = Arc::clone(&reloader);
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) => {
                    let touches_collection = event
                        .paths
                        .iter()
                        .any(|changed| changed.file_name().map(|n| n.to_os_string()) == file_name);
                    if touches_collection && is_content_change(&event.kind) {
                        tracing::debug!(?event, "collection file changed");
                        watch_reloader.reload();
                    }
                }
                Err(err) => watch_reloader.fail(SyncError::Connectivity(err.to_string())),
            }
        })
        .context("creating collection file watcher")?;
        watcher
            .watch(&self.root, RecursiveMode::NonRecursive)
            .with_context(|| format!("watching `{}`", self.root.display()))?;

        reloader.reload();
        Ok(Box::new(FileSubscription {
            root: self.root.clone(),
            watcher: Some(watcher),
        }))
    }
}

/// Reads and delivers one collection file.
///
/// `gate` covers the whole read, parse and deliver step, so a read that
/// started earlier can never be delivered after a later one.
struct Reloader {
    path: PathBuf,
    sink: SnapshotSink,
    gate: Mutex<()>,
}

impl Reloader {
    fn reload(&self) {
        let _gate = self.gate.lock();
        match read_snapshot(&self.path) {
            Ok(documents) => {
                self.sink.deliver(documents);
            }
            Err(err) => {
                self.sink.fail(err);
            }
        }
    }

    fn fail(&self, error: SyncError) {
        let _gate = self.gate.lock();
        self.sink.fail(error);
    }
}

struct FileSubscription {
    root: PathBuf,
    watcher: Option<RecommendedWatcher>,
}

impl SubscriptionHandle for FileSubscription {
    fn unsubscribe(&mut self) -> Result<()> {
        if let Some(mut watcher) = self.watcher.take() {
            watcher
                .unwatch(&self.root)
                .with_context(|| format!("unwatching `{}`", self.root.display()))?;
        }
        Ok(())
    }
}

fn is_content_change(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

/// Reads a collection file into documents.
pub fn read_snapshot(path: &Path) -> Result<Vec<RawDocument>, SyncError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) if err.kind() == io::ErrorKind::PermissionDenied => {
            return Err(SyncError::AccessDenied(format!("{}: {err}", path.display())));
        }
        Err(err) => {
            return Err(SyncError::Connectivity(format!("{}: {err}", path.display())));
        }
    };
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str::<SnapshotFile>(&raw)
        .map(SnapshotFile::into_documents)
        .map_err(|err| SyncError::MalformedSnapshot(format!("{}: {err}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_list_and_keyed_layouts() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("list.json");
        fs::write(&list, r#"[{"id":"a","title":"A","endDate":"01/02/2024"}]"#).unwrap();
        let keyed = dir.path().join("keyed.json");
        fs::write(&keyed, r#"{"b":{"title":"B"},"a":{"title":"A","link":"https://x"}}"#).unwrap();

        let documents = read_snapshot(&list).unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].fields.end_date.as_deref(), Some("01/02/2024"));

        let documents = read_snapshot(&keyed).unwrap();
        let ids: Vec<_> = documents.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(documents[0].fields.link.as_deref(), Some("https://x"));
    }

    #[test]
    fn missing_or_blank_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_snapshot(&dir.path().join("absent.json")).unwrap().is_empty());
        let blank = dir.path().join("blank.json");
        fs::write(&blank, "\n").unwrap();
        assert!(read_snapshot(&blank).unwrap().is_empty());
    }

    #[test]
    fn malformed_json_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "[{\"id\": 4").unwrap();
        assert!(matches!(
            read_snapshot(&path),
            Err(SyncError::MalformedSnapshot(_))
        ));
    }

    #[test]
    fn unreadable_path_is_a_connectivity_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("circulars.json");
        fs::create_dir(&path).unwrap();
        assert!(matches!(
            read_snapshot(&path),
            Err(SyncError::Connectivity(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn permission_denied_is_access_denied() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.json");
        fs::write(&path, "[]").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o000)).unwrap();
        // Privileged users read through the mode bits.
        if fs::read(&path).is_ok() {
            return;
        }
        assert!(matches!(
            read_snapshot(&path),
            Err(SyncError::AccessDenied(_))
        ));
    }

    #[test]
    fn rejects_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        assert!(FileSource::new(dir.path().join("nope")).is_err());
        let source = FileSource::new(dir.path()).unwrap();
        assert!(source.collection_path("circulars").ends_with("circulars.json"));
    }
}
