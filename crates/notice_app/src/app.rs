use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use notice_domain::{NoticeKind, NoticeRecord, NoticeView, Viewing};
use notice_sync::{FileSource, SyncEngine};
use tracing::{debug, info, warn};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub(crate) data_dir: PathBuf,
    pub(crate) kind: NoticeKind,
    pub(crate) viewing: Viewing,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            kind: NoticeKind::Circulars,
            viewing: Viewing::Current,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self::from_lookup(|key| std::env::var(key).ok()))
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(dir) = lookup("NOTICE_DATA_DIR") {
            if !dir.trim().is_empty() {
                config.data_dir = PathBuf::from(dir.trim());
            }
        }
        if let Some(collection) = lookup("NOTICE_COLLECTION") {
            match NoticeKind::from_collection(&collection) {
                Some(kind) => config.kind = kind,
                None => warn!(%collection, "unknown collection; keeping default"),
            }
        }
        if let Some(view) = lookup("NOTICE_VIEW") {
            match Viewing::parse(&view) {
                Some(viewing) => config.viewing = viewing,
                None => warn!(%view, "unknown view; keeping default"),
            }
        }
        config
    }
}

enum Command {
    Select(Viewing),
    Refresh,
    Reevaluate,
    Show(String),
    Quit,
    Unknown(String),
}

fn parse_command(line: &str) -> Command {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Command::Reevaluate;
    }
    if let Some(viewing) = Viewing::parse(trimmed) {
        return Command::Select(viewing);
    }
    let (verb, rest) = trimmed.split_once(' ').unwrap_or((trimmed, ""));
    match verb.to_ascii_lowercase().as_str() {
        "refresh" | "r" => Command::Refresh,
        "show" if !rest.trim().is_empty() => Command::Show(rest.trim().to_string()),
        "quit" | "exit" | "q" => Command::Quit,
        _ => Command::Unknown(trimmed.to_string()),
    }
}

/// Renders the selected bucket as plain text.
pub fn render_view(view: &NoticeView) -> String {
    let mut out = format!("== {} ==\n", view.viewing.label(view.kind));
    if view.loading && view.records.is_empty() {
        out.push_str(view.kind.loading_message());
        out.push('\n');
        return out;
    }
    if let Some(error) = view.error_text() {
        out.push_str(&format!("! {error}\n"));
    }
    if let Some(message) = view.empty_message() {
        out.push_str(message);
        out.push('\n');
        return out;
    }
    for record in view.visible() {
        let more = if record.has_long_description() {
            " [more]"
        } else {
            ""
        };
        out.push_str(&format!(
            "- [{}] {} ({}){}\n",
            record.id, record.title, record.formatted_date, more
        ));
    }
    out
}

pub fn render_detail(record: &NoticeRecord) -> String {
    let mut out = format!("{}\nDate: {}\n", record.title, record.formatted_date);
    if !record.description.is_empty() {
        out.push_str(&record.description);
        out.push('\n');
    }
    if let Some(image) = &record.image_url {
        out.push_str(&format!("Image: {image}\n"));
    }
    if let Some(link) = record.link() {
        out.push_str(&format!("Link: {link}\n"));
    }
    out
}

pub fn run(config: AppConfig) -> Result<()> {
    info!(dir = %config.data_dir.display(), collection = config.kind.collection(), "starting noticeboard");
    let source = FileSource::new(&config.data_dir).context("opening notice directory")?;
    let engine = SyncEngine::builder(Arc::new(source))
        .kind(config.kind)
        .viewing(config.viewing)
        .observer(|view: &NoticeView| {
            let mut stdout = io::stdout().lock();
            if let Err(err) = write!(stdout, "{}", render_view(view)).and_then(|_| stdout.flush()) {
                debug!(%err, "failed to write view");
            }
        })
        .build();
    engine.subscribe();

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("reading command")?;
        match parse_command(&line) {
            Command::Select(viewing) => engine.select(viewing),
            Command::Refresh => engine.refresh(),
            Command::Reevaluate => engine.reevaluate(),
            Command::Show(id) => match engine.view().find(&id) {
                Some(record) => print!("{}", render_detail(record)),
                None => println!("No notice with id `{id}`."),
            },
            Command::Quit => break,
            Command::Unknown(input) => {
                println!("Unknown command `{input}`. Try: current, past, refresh, show <id>, quit.");
            }
        }
    }

    engine.unsubscribe();
    info!("noticeboard stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use notice_domain::{reduce, RawDocument, RawNotice, ViewEvent};
    use std::collections::HashMap;

    fn view_with(records: Vec<NoticeRecord>, viewing: Viewing) -> NoticeView {
        let now = chrono::NaiveDate::from_ymd_opt(2024, 3, 11)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        reduce(
            NoticeView::new(NoticeKind::Circulars, viewing),
            ViewEvent::SnapshotReceived(records),
            now,
        )
    }

    fn record(id: &str, end: Option<&str>, description: &str) -> NoticeRecord {
        NoticeRecord::from_document(RawDocument::new(
            id,
            RawNotice {
                title: format!("Title {id}"),
                description: description.to_string(),
                end_date: end.map(str::to_string),
                link: Some("https://example.org".into()),
                ..RawNotice::default()
            },
        ))
    }

    #[test]
    fn config_reads_overrides_and_ignores_garbage() {
        let vars: HashMap<&str, &str> = [
            ("NOTICE_DATA_DIR", "/srv/notices"),
            ("NOTICE_COLLECTION", "events"),
            ("NOTICE_VIEW", "sideways"),
        ]
        .into_iter()
        .collect();
        let config = AppConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(config.data_dir, PathBuf::from("/srv/notices"));
        assert_eq!(config.kind, NoticeKind::Events);
        assert_eq!(config.viewing, Viewing::Current);
        assert_eq!(AppConfig::from_lookup(|_| None), AppConfig::default());
    }

    #[test]
    fn renders_visible_bucket() {
        let view = view_with(
            vec![
                record("a", Some("20/03/2024"), &"long ".repeat(30)),
                record("b", Some("01/03/2024"), ""),
            ],
            Viewing::Current,
        );
        let text = render_view(&view);
        assert!(text.starts_with("== Current Circulars =="));
        assert!(text.contains("- [a] Title a (20/03/2024) [more]"));
        assert!(!text.contains("[b]"));
    }

    #[test]
    fn renders_empty_bucket_message() {
        let view = view_with(vec![record("b", Some("01/03/2024"), "")], Viewing::Current);
        assert!(render_view(&view).contains("No current circulars."));
    }

    #[test]
    fn detail_includes_link() {
        let detail = render_detail(&record("a", None, "Bring ID cards."));
        assert!(detail.contains("Date: Date not available"));
        assert!(detail.contains("Link: https://example.org"));
    }

    #[test]
    fn parses_commands() {
        assert!(matches!(parse_command("past"), Command::Select(Viewing::Past)));
        assert!(matches!(parse_command("upcoming"), Command::Select(Viewing::Current)));
        assert!(matches!(parse_command(" refresh "), Command::Refresh));
        assert!(matches!(parse_command("show abc"), Command::Show(id) if id == "abc"));
        assert!(matches!(parse_command("show"), Command::Unknown(_)));
        assert!(matches!(parse_command(""), Command::Reevaluate));
        assert!(matches!(parse_command("q"), Command::Quit));
    }
}
