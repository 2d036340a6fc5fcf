use anyhow::Context;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::HeatmapError;
use crate::models::{ActivityMatrix, ActivityStatus};
use crate::store::SnapshotStore;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Postgres-backed snapshot store. Only the newest snapshot is kept.
#[derive(Debug, Clone)]
pub struct PgSnapshotStore {
    pool: PgPool,
}

impl PgSnapshotStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn split_dates(raw: &str) -> Vec<String> {
    if raw.is_empty() {
        return Vec::new();
    }
    raw.split(',').map(str::to_string).collect()
}

/// Rebuilds a matrix from `(row_index, column_index, status)` rows. Every cell
/// must be present exactly once inside the grid.
fn assemble_grid<I>(
    names: Vec<String>,
    dates: Vec<String>,
    cells: I,
) -> Result<ActivityMatrix, HeatmapError>
where
    I: IntoIterator<Item = (i32, i32, f32)>,
{
    let mut grid: Vec<Vec<Option<ActivityStatus>>> = vec![vec![None; dates.len()]; names.len()];

    for (row_index, column_index, value) in cells {
        let status = ActivityStatus::from_value(f64::from(value)).ok_or_else(|| {
            HeatmapError::CorruptSnapshot(format!("unknown cell value {value}"))
        })?;
        let outside = || {
            HeatmapError::CorruptSnapshot(format!(
                "cell ({row_index}, {column_index}) is outside the grid"
            ))
        };
        let (Ok(r), Ok(c)) = (usize::try_from(row_index), usize::try_from(column_index)) else {
            return Err(outside());
        };
        let cell = grid
            .get_mut(r)
            .and_then(|row| row.get_mut(c))
            .ok_or_else(outside)?;
        if cell.replace(status).is_some() {
            return Err(HeatmapError::CorruptSnapshot(format!(
                "cell ({row_index}, {column_index}) stored twice"
            )));
        }
    }

    let cells = grid
        .into_iter()
        .map(|row| row.into_iter().collect::<Option<Vec<_>>>())
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| HeatmapError::CorruptSnapshot("missing cells".to_string()))?;

    ActivityMatrix::new(names, dates, cells)
}

impl SnapshotStore for PgSnapshotStore {
    async fn load(&self) -> anyhow::Result<Option<ActivityMatrix>> {
        let Some(row) = sqlx::query(
            r#"
            SELECT id, participants, dates
            FROM activity_heatmap.snapshots
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let snapshot_id: Uuid = row.get("id");
        let participants: String = row.get("participants");
        let names: Vec<String> = serde_json::from_str(&participants)
            .context("snapshot participants are not a JSON array of names")?;
        let dates = split_dates(row.get::<&str, _>("dates"));

        let records = sqlx::query(
            r#"
            SELECT row_index, column_index, status
            FROM activity_heatmap.snapshot_cells
            WHERE snapshot_id = $1
            "#,
        )
        .bind(snapshot_id)
        .fetch_all(&self.pool)
        .await?;

        let cells = records.iter().map(|record| {
            (
                record.get::<i32, _>("row_index"),
                record.get::<i32, _>("column_index"),
                record.get::<f32, _>("status"),
            )
        });
        let matrix = assemble_grid(names, dates, cells)?;

        tracing::info!(
            event = "snapshot_loaded",
            store = "postgres",
            snapshot_id = %snapshot_id,
            rows = matrix.names().len(),
            dates = matrix.dates().len()
        );
        Ok(Some(matrix))
    }

    async fn save(&self, matrix: &ActivityMatrix) -> anyhow::Result<()> {
        let snapshot_id = Uuid::new_v4();
        let participants = serde_json::to_string(matrix.names())?;
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM activity_heatmap.snapshots")
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO activity_heatmap.snapshots (id, participants, dates)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(snapshot_id)
        .bind(&participants)
        .bind(matrix.dates().join(","))
        .execute(&mut *tx)
        .await?;

        for (row_index, (name, row)) in matrix.rows().enumerate() {
            for (column_index, (date, status)) in matrix.dates().iter().zip(row).enumerate() {
                sqlx::query(
                    r#"
                    INSERT INTO activity_heatmap.snapshot_cells
                    (snapshot_id, row_index, participant, column_index, date_label, status)
                    VALUES ($1, $2, $3, $4, $5, $6)
                    "#,
                )
                .bind(snapshot_id)
                .bind(i32::try_from(row_index)?)
                .bind(name)
                .bind(i32::try_from(column_index)?)
                .bind(date)
                .bind(status.value() as f32)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await.context("failed to commit snapshot")?;

        tracing::info!(
            event = "snapshot_saved",
            store = "postgres",
            snapshot_id = %snapshot_id,
            dates = matrix.dates().len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> Vec<String> {
        vec!["Joy".to_string(), "Peace".to_string()]
    }

    fn dates() -> Vec<String> {
        vec!["12/1/23".to_string(), "1/5/24".to_string()]
    }

    #[test]
    fn assembles_cells_in_any_order() {
        let matrix = assemble_grid(
            names(),
            dates(),
            vec![(1, 1, 0.5), (0, 0, 1.0), (1, 0, 0.0), (0, 1, 0.0)],
        )
        .unwrap();

        assert_eq!(matrix.get("Joy", "12/1/23"), Some(ActivityStatus::Active));
        assert_eq!(matrix.get("Joy", "1/5/24"), Some(ActivityStatus::NonActive));
        assert_eq!(
            matrix.get("Peace", "1/5/24"),
            Some(ActivityStatus::Unavailable)
        );
    }

    #[test]
    fn rejects_missing_duplicate_or_stray_cells() {
        let missing = assemble_grid(names(), dates(), vec![(0, 0, 1.0)]);
        assert!(matches!(missing, Err(HeatmapError::CorruptSnapshot(_))));

        let duplicate = assemble_grid(
            names(),
            dates(),
            vec![(0, 0, 1.0), (0, 0, 0.0), (0, 1, 0.0), (1, 0, 0.0), (1, 1, 0.0)],
        );
        assert!(matches!(duplicate, Err(HeatmapError::CorruptSnapshot(_))));

        let stray = assemble_grid(names(), dates(), vec![(2, 0, 1.0)]);
        assert!(matches!(stray, Err(HeatmapError::CorruptSnapshot(_))));

        let negative = assemble_grid(names(), dates(), vec![(-1, 0, 1.0)]);
        assert!(matches!(negative, Err(HeatmapError::CorruptSnapshot(_))));

        let unknown = assemble_grid(names(), dates(), vec![(0, 0, 0.7)]);
        assert!(matches!(unknown, Err(HeatmapError::CorruptSnapshot(_))));
    }

    #[tokio::test]
    async fn postgres_round_trip_when_configured() {
        let Ok(database_url) = std::env::var("DATABASE_URL") else {
            return;
        };
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(1)
            .connect(&database_url)
            .await
            .unwrap();
        init_db(&pool).await.unwrap();
        let store = PgSnapshotStore::new(pool);

        let matrix = ActivityMatrix::new(
            names(),
            dates(),
            vec![
                vec![ActivityStatus::Active, ActivityStatus::Unavailable],
                vec![ActivityStatus::NonActive, ActivityStatus::Active],
            ],
        )
        .unwrap();
        store.save(&matrix).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(matrix));
    }

    #[test]
    fn split_dates_handles_empty_list() {
        assert!(split_dates("").is_empty());
        assert_eq!(split_dates("12/1/23,1/5/24"), vec!["12/1/23", "1/5/24"]);
    }
}
