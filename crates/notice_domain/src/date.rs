use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

const NOT_AVAILABLE: &str = "Date not available";

/// The single date a notice is ordered and bucketed by.
///
/// `Absent` orders after every dated value, so undated notices sort last.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EffectiveDate {
    Dated(NaiveDate),
    Absent,
}

impl EffectiveDate {
    pub fn date(self) -> Option<NaiveDate> {
        match self {
            EffectiveDate::Dated(date) => Some(date),
            EffectiveDate::Absent => None,
        }
    }

    pub fn is_absent(self) -> bool {
        matches!(self, EffectiveDate::Absent)
    }
}

impl From<Option<NaiveDate>> for EffectiveDate {
    fn from(value: Option<NaiveDate>) -> Self {
        value.map_or(EffectiveDate::Absent, EffectiveDate::Dated)
    }
}

/// Parses a `DD/MM/YYYY` text into a calendar date.
///
/// Components are not range checked. The date is built as 1 January of the
/// year, then `month - 1` months and `day - 1` days are added, so `31/04/2025`
/// lands on 1 May and `00/03/2024` on 29 February. Blank or unparsable input,
/// or a result outside chrono's range, yields `None`.
pub fn normalize_date(raw: Option<&str>) -> Option<NaiveDate> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() {
        return None;
    }

    let mut parts = trimmed.split('/');
    let day = parse_component(parts.next()?)?;
    let month = parse_component(parts.next()?)?;
    let year = parse_component(parts.next()?)?;

    let year = i32::try_from(year).ok()?;
    let base = NaiveDate::from_ymd_opt(year, 1, 1)?;
    let with_months = shift_months(base, month.checked_sub(1)?)?;
    shift_days(with_months, day.checked_sub(1)?)
}

/// Resolves the effective date: end date first, then start date.
///
/// Both ordering and partitioning go through this function.
pub fn effective_date(start: Option<&str>, end: Option<&str>) -> EffectiveDate {
    normalize_date(end)
        .or_else(|| normalize_date(start))
        .into()
}

/// Builds the display string for a notice's date range.
///
/// A text only counts as present when it parses; the texts themselves are
/// shown as supplied, minus surrounding whitespace.
pub fn formatted_date(start: Option<&str>, end: Option<&str>) -> String {
    let start = start.filter(|value| normalize_date(Some(value)).is_some());
    let end = end.filter(|value| normalize_date(Some(value)).is_some());
    match (start, end) {
        (Some(start), Some(end)) => format!("{} to {}", start.trim(), end.trim()),
        (Some(only), None) | (None, Some(only)) => only.trim().to_string(),
        (None, None) => NOT_AVAILABLE.to_string(),
    }
}

fn parse_component(segment: &str) -> Option<i64> {
    let segment = segment.trim();
    let digits = segment
        .strip_prefix('-')
        .or_else(|| segment.strip_prefix('+'))
        .unwrap_or(segment);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    segment.parse::<i64>().ok()
}

fn shift_months(date: NaiveDate, months: i64) -> Option<NaiveDate> {
    let amount = Months::new(u32::try_from(months.unsigned_abs()).ok()?);
    if months >= 0 {
        date.checked_add_months(amount)
    } else {
        date.checked_sub_months(amount)
    }
}

fn shift_days(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    let amount = Days::new(days.unsigned_abs());
    if days >= 0 {
        date.checked_add_days(amount)
    } else {
        date.checked_sub_days(amount)
    }
}
