use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::date::{self, EffectiveDate};

const LONG_DESCRIPTION_CHARS: usize = 100;

/// Remote collection a notice list is synchronised from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Events,
    #[default]
    Circulars,
}

impl NoticeKind {
    pub fn collection(self) -> &'static str {
        match self {
            NoticeKind::Events => "events",
            NoticeKind::Circulars => "circulars",
        }
    }

    pub fn from_collection(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "events" => Some(NoticeKind::Events),
            "circulars" => Some(NoticeKind::Circulars),
            _ => None,
        }
    }

    pub fn empty_collection_message(self) -> &'static str {
        match self {
            NoticeKind::Events => "No Events available.",
            NoticeKind::Circulars => "No Circulars available.",
        }
    }

    pub fn loading_message(self) -> &'static str {
        match self {
            NoticeKind::Events => "Loading events...",
            NoticeKind::Circulars => "Loading circulars...",
        }
    }
}

/// Fields of a remote notice document as delivered by the source.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RawNotice {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

/// A remote document: its source-assigned id plus its fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawDocument {
    pub id: String,
    #[serde(flatten)]
    pub fields: RawNotice,
}

impl RawDocument {
    pub fn new(id: impl Into<String>, fields: RawNotice) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }
}

/// A normalised notice. `effective_date` and `formatted_date` are derived
/// from the two date texts every time a snapshot is mapped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NoticeRecord {
    pub id: String,
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub link: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub effective_date: EffectiveDate,
    pub formatted_date: String,
}

impl NoticeRecord {
    pub fn from_document(document: RawDocument) -> Self {
        let RawDocument { id, fields } = document;
        let start_date = non_blank(fields.start_date);
        let end_date = non_blank(fields.end_date);
        let effective_date = date::effective_date(start_date.as_deref(), end_date.as_deref());
        let formatted_date = date::formatted_date(start_date.as_deref(), end_date.as_deref());
        Self {
            id,
            title: fields.title,
            description: fields.description,
            image_url: non_blank(fields.image),
            link: non_blank(fields.link),
            start_date,
            end_date,
            effective_date,
            formatted_date,
        }
    }

    pub fn link(&self) -> Option<&str> {
        self.link.as_deref()
    }

    /// True when the description is long enough to be collapsed behind a
    /// "Read More" toggle.
    pub fn has_long_description(&self) -> bool {
        self.description.chars().count() > LONG_DESCRIPTION_CHARS
    }
}

/// Maps a full snapshot of documents into records, preserving delivery order.
///
/// Ids must be unique within a snapshot; later duplicates are dropped.
pub fn map_documents(documents: Vec<RawDocument>) -> Vec<NoticeRecord> {
    let mut seen = HashSet::with_capacity(documents.len());
    let mut records = Vec::with_capacity(documents.len());
    for document in documents {
        if !seen.insert(document.id.clone()) {
            tracing::warn!(id = %document.id, "dropping duplicate document id in snapshot");
            continue;
        }
        records.push(NoticeRecord::from_document(document));
    }
    records
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}
