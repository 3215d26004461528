//! Health Metric model
//!
//! Daily body measurements: weight, sleep, resting heart rate and
//! manually entered burned calories. One row per user per date.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::{DbError, DbResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthMetric {
    pub id: i64,
    pub user_id: i64,
    pub date: String,
    pub weight: Option<f64>,
    pub sleep_minutes: Option<i64>,
    pub resting_heart_rate: Option<i64>,
    pub burned_calories: Option<f64>,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Values to record for a date. `None` keeps whatever is already stored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealthMetricRecord {
    pub weight: Option<f64>,
    pub sleep_minutes: Option<i64>,
    pub resting_heart_rate: Option<i64>,
    pub burned_calories: Option<f64>,
    pub notes: Option<String>,
}

impl HealthMetric {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            date: row.get("date")?,
            weight: row.get("weight")?,
            sleep_minutes: row.get("sleep_minutes")?,
            resting_heart_rate: row.get("resting_heart_rate")?,
            burned_calories: row.get("burned_calories")?,
            notes: row.get("notes")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Insert the day's row or merge the given values into it
    pub fn record(
        conn: &Connection,
        user_id: i64,
        date: &str,
        data: &HealthMetricRecord,
    ) -> DbResult<Self> {
        conn.execute(
            r#"
            INSERT INTO health_metrics (
                user_id, date, weight, sleep_minutes, resting_heart_rate, burned_calories, notes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(user_id, date) DO UPDATE SET
                weight = COALESCE(excluded.weight, weight),
                sleep_minutes = COALESCE(excluded.sleep_minutes, sleep_minutes),
                resting_heart_rate = COALESCE(excluded.resting_heart_rate, resting_heart_rate),
                burned_calories = COALESCE(excluded.burned_calories, burned_calories),
                notes = COALESCE(excluded.notes, notes),
                updated_at = datetime('now')
            "#,
            params![
                user_id,
                date,
                data.weight,
                data.sleep_minutes,
                data.resting_heart_rate,
                data.burned_calories,
                data.notes,
            ],
        )?;

        Self::get_for_date(conn, user_id, date)?.ok_or_else(|| {
            DbError::Validation(format!("Health metric for {} was not stored", date))
        })
    }

    pub fn get_for_date(conn: &Connection, user_id: i64, date: &str) -> DbResult<Option<Self>> {
        let mut stmt =
            conn.prepare("SELECT * FROM health_metrics WHERE user_id = ?1 AND date = ?2")?;

        let result = stmt.query_row(params![user_id, date], Self::from_row);
        match result {
            Ok(metric) => Ok(Some(metric)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Metrics between two ISO dates, inclusive, oldest first
    pub fn list_range(conn: &Connection, user_id: i64, from: &str, to: &str) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM health_metrics
            WHERE user_id = ?1 AND date >= ?2 AND date <= ?3
            ORDER BY date ASC
            "#,
        )?;

        let metrics = stmt
            .query_map(params![user_id, from, to], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(metrics)
    }

    pub fn delete(conn: &Connection, user_id: i64, date: &str) -> DbResult<bool> {
        let rows = conn.execute(
            "DELETE FROM health_metrics WHERE user_id = ?1 AND date = ?2",
            params![user_id, date],
        )?;
        Ok(rows > 0)
    }
}
