use crate::activity::ActivityCounts;
use crate::config::HeatmapConfig;
use crate::error::HeatmapError;
use crate::models::{ActivityMatrix, ActivityStatus, Overrides};
use crate::reconcile::NameResolution;

/// Parses `1/2/24=Moyin,Joy` into a date label and the excused names.
pub fn parse_override(raw: &str) -> Result<(String, Vec<String>), HeatmapError> {
    let malformed = || HeatmapError::MalformedOverride(raw.to_string());
    let (date, names) = raw.split_once('=').ok_or_else(malformed)?;
    let date = date.trim();
    let names: Vec<String> = names
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect();

    if date.is_empty() || names.is_empty() {
        return Err(malformed());
    }

    Ok((date.to_string(), names))
}

/// Merges override arguments per date, checking names against the roster and
/// dates against the selection.
pub fn build_overrides(
    config: &HeatmapConfig,
    raw_overrides: &[String],
    selected: &[String],
) -> Result<Overrides, HeatmapError> {
    let mut overrides = Overrides::new();

    for raw in raw_overrides {
        let (date, names) = parse_override(raw)?;
        if !selected.contains(&date) {
            return Err(HeatmapError::UnknownDate(date));
        }
        if let Some(unknown) = names.iter().find(|name| !config.is_on_roster(name)) {
            return Err(HeatmapError::UnknownParticipant(unknown.clone()));
        }
        overrides.entry(date).or_default().extend(names);
    }

    Ok(overrides)
}

pub fn resolve_status(excused: bool, count: u32) -> ActivityStatus {
    if excused {
        ActivityStatus::Unavailable
    } else if count > 0 {
        ActivityStatus::Active
    } else {
        ActivityStatus::NonActive
    }
}

/// One row per roster name in declared order, one column per selected date.
/// Counts from every raw sender attributed to a roster name are summed.
pub fn build_matrix(
    config: &HeatmapConfig,
    resolution: &NameResolution,
    counts: &ActivityCounts,
    overrides: &Overrides,
) -> Result<ActivityMatrix, HeatmapError> {
    let dates = counts.dates().to_vec();
    let mut cells = Vec::with_capacity(config.roster.len());

    for name in &config.roster {
        // A sender posting under the exact roster name always counts for that
        // row, even when fuzzy matching sent it to an earlier roster name.
        let mut raw_names = resolution.raw_names_for(name).to_vec();
        if !raw_names.contains(name) {
            raw_names.push(name.clone());
        }
        let row = dates
            .iter()
            .map(|date| {
                let excused = overrides
                    .get(date)
                    .is_some_and(|names| names.contains(name));
                resolve_status(excused, counts.total(&raw_names, date))
            })
            .collect();
        cells.push(row);
    }

    ActivityMatrix::new(config.roster.clone(), dates, cells)
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use super::*;
    use crate::activity::aggregate;
    use crate::models::MessageRecord;
    use crate::reconcile::Reconciler;

    fn record(date: &str, sender: &str) -> MessageRecord {
        MessageRecord {
            date: date.to_string(),
            sender: sender.to_string(),
        }
    }

    fn build(
        config: &HeatmapConfig,
        records: Vec<MessageRecord>,
        selected: &[String],
        overrides: &Overrides,
    ) -> ActivityMatrix {
        let resolution = Reconciler::new(config).reconcile(records.iter().map(|r| &r.sender));
        let counts = aggregate(records, selected);
        build_matrix(config, &resolution, &counts, overrides).unwrap()
    }

    #[test]
    fn alias_sender_marks_canonical_active() {
        let config = HeatmapConfig::default();
        let selected = vec!["1/2/24".to_string()];
        let matrix = build(
            &config,
            vec![record("1/2/24", "Dora")],
            &selected,
            &Overrides::new(),
        );
        assert_eq!(matrix.get("Dorathy", "1/2/24"), Some(ActivityStatus::Active));
        assert_eq!(matrix.get("Joy", "1/2/24"), Some(ActivityStatus::NonActive));
    }

    #[test]
    fn override_dominates_message_count() {
        let config = HeatmapConfig::default();
        let selected = vec!["1/2/24".to_string()];
        let overrides = BTreeMap::from([(
            "1/2/24".to_string(),
            BTreeSet::from(["Moyin".to_string()]),
        )]);
        let matrix = build(
            &config,
            vec![
                record("1/2/24", "Anu"),
                record("1/2/24", "Anu"),
                record("1/2/24", "Anu"),
            ],
            &selected,
            &overrides,
        );
        assert_eq!(
            matrix.get("Moyin", "1/2/24"),
            Some(ActivityStatus::Unavailable)
        );
    }

    #[test]
    fn unresolved_senders_never_reach_the_grid() {
        let config = HeatmapConfig::default();
        let selected = vec!["1/2/24".to_string()];
        let matrix = build(
            &config,
            vec![record("1/2/24", "RandomGuest99")],
            &selected,
            &Overrides::new(),
        );
        assert_eq!(matrix.names(), config.roster.as_slice());
        assert!(matrix
            .rows()
            .all(|(_, row)| row == [ActivityStatus::NonActive]));
        assert_eq!(matrix.get("RandomGuest99", "1/2/24"), None);
    }

    #[test]
    fn several_raw_names_share_one_row() {
        let config = HeatmapConfig::default();
        let selected = vec!["1/2/24".to_string(), "1/3/24".to_string()];
        // "Moyin" would sort after "Anu"; both days must still count.
        let matrix = build(
            &config,
            vec![record("1/2/24", "Anu"), record("1/3/24", "Moyin")],
            &selected,
            &Overrides::new(),
        );
        assert_eq!(matrix.get("Moyin", "1/2/24"), Some(ActivityStatus::Active));
        assert_eq!(matrix.get("Moyin", "1/3/24"), Some(ActivityStatus::Active));
    }

    #[test]
    fn exact_roster_name_counts_for_its_own_row() {
        let config = HeatmapConfig::default();
        let selected = vec!["1/2/24".to_string()];
        // "el" is inside "christabel", which comes first in the roster.
        let matrix = build(
            &config,
            vec![record("1/2/24", "El")],
            &selected,
            &Overrides::new(),
        );
        assert_eq!(matrix.get("El", "1/2/24"), Some(ActivityStatus::Active));
        assert_eq!(
            matrix.get("Christabel", "1/2/24"),
            Some(ActivityStatus::Active)
        );
    }

    #[test]
    fn exact_roster_name_is_not_counted_twice() {
        let config = HeatmapConfig::default();
        let selected = vec!["1/2/24".to_string()];
        let records = vec![record("1/2/24", "Joy")];
        let resolution = Reconciler::new(&config).reconcile(records.iter().map(|r| &r.sender));
        assert_eq!(resolution.raw_names_for("Joy"), ["Joy"]);

        let counts = aggregate(records, &selected);
        let matrix = build_matrix(&config, &resolution, &counts, &Overrides::new()).unwrap();
        assert_eq!(matrix.get("Joy", "1/2/24"), Some(ActivityStatus::Active));
        assert_eq!(counts.total(&["Joy".to_string()], "1/2/24"), 1);
    }

    #[test]
    fn letterless_senders_credit_their_fuzzy_match() {
        let config = HeatmapConfig::default();
        let selected = vec!["1/2/24".to_string()];
        let matrix = build(
            &config,
            vec![
                record("1/2/24", "\u{1f338}\u{1f338}"),
                record("1/2/24", "\u{1f338} \u{1f338}"),
            ],
            &selected,
            &Overrides::new(),
        );
        assert_eq!(matrix.get("Adeola", "1/2/24"), Some(ActivityStatus::Active));
        assert_eq!(
            matrix.get("Esther Chioma", "1/2/24"),
            Some(ActivityStatus::Active)
        );
    }

    #[test]
    fn grid_is_complete_in_roster_and_date_order() {
        let config = HeatmapConfig::default();
        let selected = vec!["12/1/23".to_string(), "1/5/24".to_string()];
        let matrix = build(
            &config,
            vec![record("1/5/24", "Joy")],
            &selected,
            &Overrides::new(),
        );
        assert_eq!(matrix.dates(), selected.as_slice());
        assert_eq!(matrix.rows().count(), config.roster.len());
        assert!(matrix.rows().all(|(_, row)| row.len() == 2));
        assert_eq!(matrix.get("Joy", "12/1/23"), Some(ActivityStatus::NonActive));
        assert_eq!(matrix.get("Joy", "1/5/24"), Some(ActivityStatus::Active));
    }

    #[test]
    fn parses_override_arguments() {
        assert_eq!(
            parse_override("1/2/24= Moyin , Joy").unwrap(),
            ("1/2/24".to_string(), vec!["Moyin".to_string(), "Joy".to_string()])
        );
        assert!(matches!(
            parse_override("1/2/24"),
            Err(HeatmapError::MalformedOverride(_))
        ));
        assert!(matches!(
            parse_override("1/2/24="),
            Err(HeatmapError::MalformedOverride(_))
        ));
    }

    #[test]
    fn overrides_merge_and_validate() {
        let config = HeatmapConfig::default();
        let selected = vec!["1/2/24".to_string()];
        let overrides = build_overrides(
            &config,
            &["1/2/24=Moyin".to_string(), "1/2/24=Joy,Moyin".to_string()],
            &selected,
        )
        .unwrap();
        assert_eq!(overrides["1/2/24"].len(), 2);

        assert_eq!(
            build_overrides(&config, &["1/3/24=Joy".to_string()], &selected),
            Err(HeatmapError::UnknownDate("1/3/24".to_string()))
        );
        assert_eq!(
            build_overrides(&config, &["1/2/24=Anu".to_string()], &selected),
            Err(HeatmapError::UnknownParticipant("Anu".to_string()))
        );
    }
}
