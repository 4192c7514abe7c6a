use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use notice_domain::{NoticeKind, NoticeView, SyncPhase};
use notice_sync::{FileSource, SyncEngine};
use tempfile::tempdir;

// Write-then-rename so the watcher never observes a truncated file.
fn write_collection(dir: &Path, name: &str, contents: &str) {
    let staged = dir.join(format!("{name}.json.partial"));
    fs::write(&staged, contents).expect("write collection fixture");
    fs::rename(&staged, dir.join(format!("{name}.json"))).expect("publish collection fixture");
}

fn wait_for(engine: &SyncEngine, predicate: impl Fn(&NoticeView) -> bool) -> NoticeView {
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        let view = engine.view();
        if predicate(&view) || Instant::now() > deadline {
            return view;
        }
        thread::sleep(Duration::from_millis(25));
    }
}

#[test]
fn initial_snapshot_is_read_on_subscribe() {
    let temp = tempdir().expect("tempdir");
    write_collection(
        temp.path(),
        "circulars",
        r#"[
            {"id": "exam", "title": "Exam timetable", "startDate": "01/01/2020", "endDate": "05/01/2020"},
            {"id": "fees", "title": "Fee reminder"}
        ]"#,
    );

    let source = FileSource::new(temp.path()).expect("file source");
    let engine = SyncEngine::builder(Arc::new(source)).build();
    engine.subscribe();

    let view = engine.view();
    assert_eq!(view.phase, SyncPhase::Streaming);
    assert_eq!(view.records.len(), 2);
    let exam = view.find("exam").expect("exam notice present");
    assert_eq!(exam.formatted_date, "01/01/2020 to 05/01/2020");
    assert!(view.past().iter().any(|record| record.id == "exam"));
    assert!(view.current().iter().any(|record| record.id == "fees"));
}

#[test]
fn missing_collection_file_is_an_empty_collection() {
    let temp = tempdir().expect("tempdir");
    let source = FileSource::new(temp.path()).expect("file source");
    let engine = SyncEngine::builder(Arc::new(source))
        .kind(NoticeKind::Events)
        .build();
    engine.subscribe();

    let view = engine.view();
    assert_eq!(view.phase, SyncPhase::Streaming);
    assert_eq!(view.empty_message(), Some("No Events available."));
}

#[test]
fn malformed_file_reports_error_and_keeps_previous_records() {
    let temp = tempdir().expect("tempdir");
    write_collection(temp.path(), "circulars", r#"{"a": {"title": "First"}}"#);
    let source = FileSource::new(temp.path()).expect("file source");
    let engine = SyncEngine::builder(Arc::new(source)).build();
    engine.subscribe();
    assert_eq!(engine.view().records.len(), 1);

    write_collection(temp.path(), "circulars", "{ not json");
    let view = wait_for(&engine, |view| view.error.is_some());
    assert_eq!(
        view.error_text(),
        Some("Received circulars data that could not be read.")
    );
    assert_eq!(view.records.len(), 1);
}

#[test]
fn file_changes_are_streamed_until_unsubscribe() {
    let temp = tempdir().expect("tempdir");
    write_collection(temp.path(), "circulars", "[]");
    let source = FileSource::new(temp.path()).expect("file source");
    let engine = SyncEngine::builder(Arc::new(source)).build();
    engine.subscribe();
    assert!(engine.view().records.is_empty());

    write_collection(temp.path(), "circulars", r#"[{"id": "new", "title": "Holiday"}]"#);
    let view = wait_for(&engine, |view| view.records.len() == 1);
    assert_eq!(view.records[0].title, "Holiday");

    engine.unsubscribe();
    write_collection(
        temp.path(),
        "circulars",
        r#"[{"id": "new", "title": "Holiday"}, {"id": "later", "title": "Ignored"}]"#,
    );
    thread::sleep(Duration::from_millis(300));
    let view = engine.view();
    assert_eq!(view.phase, SyncPhase::Unsubscribed);
    assert_eq!(view.records.len(), 1);
}

#[test]
fn newest_file_wins_over_a_slow_initial_read() {
    let temp = tempdir().expect("tempdir");
    let bulk: Vec<String> = (0..100_000)
        .map(|n| format!(r#"{{"id": "n{n}", "title": "Notice {n}", "endDate": "01/01/2020"}}"#))
        .collect();
    write_collection(temp.path(), "circulars", &format!("[{}]", bulk.join(",")));

    let source = FileSource::new(temp.path()).expect("file source");
    let engine = Arc::new(SyncEngine::builder(Arc::new(source)).build());
    let subscriber = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || engine.subscribe())
    };

    thread::sleep(Duration::from_millis(60));
    write_collection(temp.path(), "circulars", r#"[{"id": "only", "title": "Replacement"}]"#);
    subscriber.join().expect("subscribe thread");

    let view = wait_for(&engine, |view| view.records.len() == 1);
    assert_eq!(view.records.len(), 1);
    thread::sleep(Duration::from_millis(500));
    let view = engine.view();
    assert_eq!(view.records.len(), 1, "file on disk holds one record");
    assert_eq!(view.records[0].id, "only");
}
