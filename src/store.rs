use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::error::HeatmapError;
use crate::models::{ActivityMatrix, ActivityStatus};

pub const HEATMAP_FILE: &str = "latest_heatmap.csv";
pub const DATE_FILE: &str = "latest_dates.csv";

/// Persistence for the most recently built matrix. Saving replaces the previous snapshot.
#[allow(async_fn_in_trait)]
pub trait SnapshotStore {
    async fn load(&self) -> anyhow::Result<Option<ActivityMatrix>>;
    async fn save(&self, matrix: &ActivityMatrix) -> anyhow::Result<()>;
}

/// Matrix CSV plus a comma-joined date list, side by side in one directory.
#[derive(Debug, Clone)]
pub struct CsvSnapshotStore {
    dir: PathBuf,
}

impl CsvSnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn heatmap_path(&self) -> PathBuf {
        self.dir.join(HEATMAP_FILE)
    }

    pub fn dates_path(&self) -> PathBuf {
        self.dir.join(DATE_FILE)
    }
}

fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

fn temp_path(path: &Path) -> PathBuf {
    sibling_path(path, ".tmp")
}

/// Moves both staged files into place. If the date list cannot be moved, the
/// previous matrix is put back so the old pair stays loadable.
fn commit_pair(
    heatmap_tmp: &Path,
    heatmap: &Path,
    dates_tmp: &Path,
    dates: &Path,
) -> anyhow::Result<()> {
    let backup = sibling_path(heatmap, ".bak");
    let had_previous = heatmap.exists();
    if had_previous {
        fs::rename(heatmap, &backup)
            .with_context(|| format!("failed to back up {}", heatmap.display()))?;
    }

    let rollback = || {
        if had_previous {
            let _ = fs::rename(&backup, heatmap);
        } else {
            let _ = fs::remove_file(heatmap);
        }
        let _ = fs::remove_file(heatmap_tmp);
        let _ = fs::remove_file(dates_tmp);
    };

    if let Err(err) = fs::rename(heatmap_tmp, heatmap) {
        rollback();
        return Err(err).with_context(|| format!("failed to replace {}", heatmap.display()));
    }
    if let Err(err) = fs::rename(dates_tmp, dates) {
        rollback();
        tracing::warn!(event = "snapshot_rolled_back", store = "csv", error = %err);
        return Err(err).with_context(|| format!("failed to replace {}", dates.display()));
    }

    if had_previous {
        let _ = fs::remove_file(&backup);
    }
    Ok(())
}

fn write_matrix(path: &Path, matrix: &ActivityMatrix) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)?;

    let mut header = vec![String::new()];
    header.extend(matrix.dates().iter().cloned());
    writer.write_record(&header)?;

    for (name, row) in matrix.rows() {
        let mut record = vec![name];
        record.extend(row.iter().map(|status| status.as_cell()));
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

fn read_matrix(path: &Path) -> anyhow::Result<ActivityMatrix> {
    let mut reader = csv::Reader::from_path(path)?;
    let dates: Vec<String> = reader.headers()?.iter().skip(1).map(str::to_string).collect();

    let mut names = Vec::new();
    let mut cells = Vec::new();
    for result in reader.records() {
        let record = result?;
        let mut fields = record.iter();
        let name = fields
            .next()
            .ok_or_else(|| HeatmapError::CorruptSnapshot("empty row".to_string()))?;
        let row = fields
            .map(|raw| {
                ActivityStatus::from_cell(raw).ok_or_else(|| {
                    HeatmapError::CorruptSnapshot(format!("unknown cell value {raw:?} for {name:?}"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        names.push(name.to_string());
        cells.push(row);
    }

    Ok(ActivityMatrix::new(names, dates, cells)?)
}

fn parse_date_list(raw: &str) -> Vec<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Vec::new();
    }
    raw.split(',').map(str::to_string).collect()
}

impl SnapshotStore for CsvSnapshotStore {
    async fn load(&self) -> anyhow::Result<Option<ActivityMatrix>> {
        let heatmap = self.heatmap_path();
        let dates = self.dates_path();
        if !heatmap.exists() || !dates.exists() {
            return Ok(None);
        }

        let matrix = read_matrix(&heatmap)
            .with_context(|| format!("failed to read {}", heatmap.display()))?;
        let raw_dates = fs::read_to_string(&dates)
            .with_context(|| format!("failed to read {}", dates.display()))?;

        if parse_date_list(&raw_dates) != matrix.dates() {
            return Err(HeatmapError::CorruptSnapshot(format!(
                "{} does not match the columns of {}",
                dates.display(),
                heatmap.display()
            ))
            .into());
        }

        tracing::info!(
            event = "snapshot_loaded",
            store = "csv",
            rows = matrix.names().len(),
            dates = matrix.dates().len()
        );
        Ok(Some(matrix))
    }

    async fn save(&self, matrix: &ActivityMatrix) -> anyhow::Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create {}", self.dir.display()))?;

        let heatmap = self.heatmap_path();
        let dates = self.dates_path();
        let heatmap_tmp = temp_path(&heatmap);
        let dates_tmp = temp_path(&dates);

        write_matrix(&heatmap_tmp, matrix)
            .with_context(|| format!("failed to write {}", heatmap_tmp.display()))?;
        fs::write(&dates_tmp, matrix.dates().join(","))
            .with_context(|| format!("failed to write {}", dates_tmp.display()))?;

        commit_pair(&heatmap_tmp, &heatmap, &dates_tmp, &dates)?;

        tracing::info!(
            event = "snapshot_saved",
            store = "csv",
            path = %heatmap.display(),
            dates = matrix.dates().len()
        );
        Ok(())
    }
}
