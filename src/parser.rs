use std::collections::BTreeSet;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::error::HeatmapError;
use crate::models::{MessageRecord, SessionDate};

/// `[1/2/24, 10:00 AM] Sender: text`. The timestamp segment is not interpreted.
fn message_line() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\[(\d+/\d+/\d+),.*?\] (.*?):").expect("valid regex"))
}

/// Any line opening with a bracketed date, including system notices without a sender.
fn dated_line() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\[(\d+/\d+/\d+),").expect("valid regex"))
}

fn date_token_shape() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d{1,2}/\d{1,2}/\d{2}$").expect("valid regex"))
}

pub fn parse_line(line: &str) -> Option<MessageRecord> {
    let captures = message_line().captures(line)?;
    let sender = captures.get(2)?.as_str().trim();
    if sender.is_empty() {
        return None;
    }

    Some(MessageRecord {
        date: captures.get(1)?.as_str().to_string(),
        sender: sender.to_string(),
    })
}

/// Lazily extracts message records; continuation lines and notices are skipped.
pub fn parse_lines<'a, I>(lines: I) -> impl Iterator<Item = MessageRecord> + 'a
where
    I: IntoIterator<Item = &'a str>,
    I::IntoIter: 'a,
{
    lines.into_iter().filter_map(parse_line)
}

pub fn date_tokens<'a, I>(lines: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a str>,
{
    lines
        .into_iter()
        .filter_map(|line| dated_line().captures(line))
        .filter_map(|captures| captures.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

/// Parses `M/D/YY` (zero padding optional, two-digit year only).
pub fn parse_date_token(token: &str) -> Result<NaiveDate, HeatmapError> {
    if !date_token_shape().is_match(token) {
        return Err(HeatmapError::InvalidDate(token.to_string()));
    }
    NaiveDate::parse_from_str(token, "%m/%d/%y")
        .map_err(|_| HeatmapError::InvalidDate(token.to_string()))
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateDiscovery {
    /// Chronologically ascending, one entry per distinct token.
    pub dates: Vec<SessionDate>,
    pub rejected: Vec<String>,
}

impl DateDiscovery {
    pub fn labels(&self) -> Vec<String> {
        self.dates.iter().map(|d| d.label.clone()).collect()
    }

    /// The latest `last` dates, or every date when fewer exist.
    pub fn default_selection(&self, last: usize) -> Vec<String> {
        let skip = self.dates.len().saturating_sub(last);
        self.dates[skip..].iter().map(|d| d.label.clone()).collect()
    }

    /// Validates a caller-chosen subset and returns it in chronological order.
    pub fn select(&self, labels: &[String]) -> Result<Vec<String>, HeatmapError> {
        let mut chosen = BTreeSet::new();
        for label in labels {
            let found = self
                .dates
                .iter()
                .find(|d| &d.label == label)
                .ok_or_else(|| HeatmapError::UnknownDate(label.clone()))?;
            chosen.insert(found);
        }

        if chosen.is_empty() {
            return Err(HeatmapError::EmptySelection);
        }

        Ok(chosen.into_iter().map(|d| d.label.clone()).collect())
    }
}

pub fn discover_dates<'a, I>(lines: I) -> DateDiscovery
where
    I: IntoIterator<Item = &'a str>,
{
    let mut discovery = DateDiscovery::default();

    for token in date_tokens(lines) {
        match parse_date_token(&token) {
            Ok(date) => discovery.dates.push(SessionDate { date, label: token }),
            Err(err) => {
                tracing::warn!(event = "date_rejected", token = %token, error = %err);
                discovery.rejected.push(token);
            }
        }
    }

    discovery.dates.sort();
    discovery
}
