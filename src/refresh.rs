use crate::activity::aggregate;
use crate::config::HeatmapConfig;
use crate::error::HeatmapError;
use crate::matrix::{build_matrix, build_overrides};
use crate::models::{ActivityMatrix, MessageRecord};
use crate::parser::{discover_dates, parse_lines};
use crate::reconcile::{NameResolution, Reconciler};
use crate::store::SnapshotStore;

#[derive(Debug, Clone, Default)]
pub struct RefreshRequest {
    pub password: String,
    /// Date labels to show; empty means the default preselection.
    pub dates: Vec<String>,
    /// `<date>=<Name>[,<Name>...]` entries.
    pub unavailable: Vec<String>,
}

/// Resolves every sender observed in the transcript.
pub fn resolve_senders(config: &HeatmapConfig, transcript: &str) -> NameResolution {
    let records: Vec<MessageRecord> = parse_lines(transcript.lines()).collect();
    Reconciler::new(config).reconcile(records.iter().map(|record| record.sender.as_str()))
}

pub fn build_from_transcript(
    config: &HeatmapConfig,
    transcript: &str,
    dates: &[String],
    unavailable: &[String],
) -> Result<ActivityMatrix, HeatmapError> {
    let discovery = discover_dates(transcript.lines());
    let selected = if dates.is_empty() {
        discovery.default_selection(config.preselect_last)
    } else {
        discovery.select(dates)?
    };
    if selected.is_empty() {
        return Err(HeatmapError::EmptySelection);
    }

    let overrides = build_overrides(config, unavailable, &selected)?;
    let records: Vec<MessageRecord> = parse_lines(transcript.lines()).collect();
    let resolution =
        Reconciler::new(config).reconcile(records.iter().map(|record| record.sender.as_str()));
    let counts = aggregate(records, &selected);

    build_matrix(config, &resolution, &counts, &overrides)
}

/// Authorizes, rebuilds the matrix, then replaces the stored snapshot.
/// Nothing is written unless every earlier step succeeded.
pub async fn refresh<S: SnapshotStore>(
    config: &HeatmapConfig,
    store: &S,
    transcript: &str,
    request: &RefreshRequest,
) -> anyhow::Result<ActivityMatrix> {
    if let Err(err) = config.authorize(&request.password) {
        tracing::warn!(event = "refresh_rejected", reason = %err);
        return Err(err.into());
    }

    let matrix = build_from_transcript(config, transcript, &request.dates, &request.unavailable)?;
    store.save(&matrix).await?;

    tracing::info!(
        event = "refresh_complete",
        rows = matrix.names().len(),
        dates = matrix.dates().len()
    );
    Ok(matrix)
}
