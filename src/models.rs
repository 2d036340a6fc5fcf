use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use crate::error::HeatmapError;

/// Date label (as written in the transcript) to the roster names excused that day.
pub type Overrides = BTreeMap<String, BTreeSet<String>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRecord {
    /// Date token exactly as it appeared in the bracket, e.g. `1/2/24`.
    pub date: String,
    pub sender: String,
}

/// A discovered transcript date. Ordering is chronological, ties broken by label.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionDate {
    pub date: NaiveDate,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityStatus {
    NonActive,
    Unavailable,
    Active,
}

impl ActivityStatus {
    /// Legend order, lowest tick first.
    pub const LEGEND: [ActivityStatus; 3] = [
        ActivityStatus::NonActive,
        ActivityStatus::Unavailable,
        ActivityStatus::Active,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ActivityStatus::NonActive => "Non-active",
            ActivityStatus::Unavailable => "Unavailable (Took Permission)",
            ActivityStatus::Active => "Active",
        }
    }

    /// Tick position on the color scale, also the persisted cell value.
    pub fn value(self) -> f64 {
        match self {
            ActivityStatus::NonActive => 0.0,
            ActivityStatus::Unavailable => 0.5,
            ActivityStatus::Active => 1.0,
        }
    }

    pub fn as_cell(self) -> &'static str {
        match self {
            ActivityStatus::NonActive => "0",
            ActivityStatus::Unavailable => "0.5",
            ActivityStatus::Active => "1",
        }
    }

    pub fn from_value(value: f64) -> Option<Self> {
        Self::LEGEND
            .into_iter()
            .find(|status| (status.value() - value).abs() < f64::EPSILON)
    }

    pub fn from_cell(raw: &str) -> Option<Self> {
        raw.trim().parse::<f64>().ok().and_then(Self::from_value)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusTally {
    pub active: usize,
    pub unavailable: usize,
    pub non_active: usize,
}

/// Roster name x selected date grid. Always rectangular.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityMatrix {
    names: Vec<String>,
    dates: Vec<String>,
    cells: Vec<Vec<ActivityStatus>>,
}

impl ActivityMatrix {
    pub fn new(
        names: Vec<String>,
        dates: Vec<String>,
        cells: Vec<Vec<ActivityStatus>>,
    ) -> Result<Self, HeatmapError> {
        if cells.len() != names.len() {
            return Err(HeatmapError::CorruptSnapshot(format!(
                "{} rows for {} names",
                cells.len(),
                names.len()
            )));
        }
        if let Some((name, row)) = names
            .iter()
            .zip(cells.iter())
            .find(|(_, row)| row.len() != dates.len())
        {
            return Err(HeatmapError::CorruptSnapshot(format!(
                "row {name:?} has {} cells for {} dates",
                row.len(),
                dates.len()
            )));
        }

        Ok(Self {
            names,
            dates,
            cells,
        })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn dates(&self) -> &[String] {
        &self.dates
    }

    pub fn rows(&self) -> impl Iterator<Item = (&str, &[ActivityStatus])> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.cells.iter().map(Vec::as_slice))
    }

    pub fn get(&self, name: &str, date: &str) -> Option<ActivityStatus> {
        let row = self.names.iter().position(|n| n == name)?;
        let column = self.dates.iter().position(|d| d == date)?;
        Some(self.cells[row][column])
    }

    pub fn tally(&self, name: &str) -> Option<StatusTally> {
        let row = self.names.iter().position(|n| n == name)?;
        let mut tally = StatusTally::default();
        for status in &self.cells[row] {
            match status {
                ActivityStatus::Active => tally.active += 1,
                ActivityStatus::Unavailable => tally.unavailable += 1,
                ActivityStatus::NonActive => tally.non_active += 1,
            }
        }
        Some(tally)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_values_follow_legend_ticks() {
        let values: Vec<f64> = ActivityStatus::LEGEND.iter().map(|s| s.value()).collect();
        assert_eq!(values, vec![0.0, 0.5, 1.0]);
        assert_eq!(ActivityStatus::from_cell("0.5"), Some(ActivityStatus::Unavailable));
        assert_eq!(ActivityStatus::from_cell("1.0"), Some(ActivityStatus::Active));
        assert_eq!(ActivityStatus::from_cell("0"), Some(ActivityStatus::NonActive));
        assert_eq!(ActivityStatus::from_cell("0.7"), None);
        assert_eq!(ActivityStatus::from_cell("yes"), None);
    }

    #[test]
    fn rejects_ragged_matrix() {
        let result = ActivityMatrix::new(
            vec!["Joy".to_string(), "Peace".to_string()],
            vec!["1/2/24".to_string()],
            vec![vec![ActivityStatus::Active], vec![]],
        );
        assert!(matches!(result, Err(HeatmapError::CorruptSnapshot(_))));
    }

    #[test]
    fn tallies_statuses_per_name() {
        let matrix = ActivityMatrix::new(
            vec!["Joy".to_string()],
            vec!["1/2/24".to_string(), "1/3/24".to_string(), "1/4/24".to_string()],
            vec![vec![
                ActivityStatus::Active,
                ActivityStatus::Unavailable,
                ActivityStatus::Active,
            ]],
        )
        .unwrap();

        let tally = matrix.tally("Joy").unwrap();
        assert_eq!(tally.active, 2);
        assert_eq!(tally.unavailable, 1);
        assert_eq!(tally.non_active, 0);
        assert_eq!(matrix.get("Joy", "1/3/24"), Some(ActivityStatus::Unavailable));
        assert_eq!(matrix.get("Joy", "2/3/24"), None);
        assert!(matrix.tally("Peace").is_none());
    }
}
