use std::collections::BTreeMap;

use crate::models::MessageRecord;

/// Message counts per raw sender, dense over the selected dates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityCounts {
    dates: Vec<String>,
    counts: BTreeMap<String, Vec<u32>>,
}

impl ActivityCounts {
    pub fn dates(&self) -> &[String] {
        &self.dates
    }

    pub fn count(&self, sender: &str, date: &str) -> u32 {
        let Some(column) = self.dates.iter().position(|d| d == date) else {
            return 0;
        };
        self.counts
            .get(sender)
            .map(|row| row[column])
            .unwrap_or(0)
    }

    /// Sum over several raw senders, used when more than one alias feeds a roster name.
    pub fn total(&self, senders: &[String], date: &str) -> u32 {
        senders.iter().map(|sender| self.count(sender, date)).sum()
    }
}

/// Counts messages on the selected dates. Every sender seen anywhere in the
/// records gets a row, zero-filled for dates they were silent on.
pub fn aggregate<I>(records: I, selected: &[String]) -> ActivityCounts
where
    I: IntoIterator<Item = MessageRecord>,
{
    let mut counts: BTreeMap<String, Vec<u32>> = BTreeMap::new();

    for record in records {
        let row = counts
            .entry(record.sender)
            .or_insert_with(|| vec![0; selected.len()]);
        if let Some(column) = selected.iter().position(|d| *d == record.date) {
            row[column] += 1;
        }
    }

    ActivityCounts {
        dates: selected.to_vec(),
        counts,
    }
}
