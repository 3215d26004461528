//! Nutritrack Status Tool
//!
//! Runtime status, usage instructions for assistants, and full
//! recalculation.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use sysinfo::{Pid, ProcessesToUpdate, System};

use crate::build_info::BuildInfo;
use crate::db::{migrations, Database, DbResult};
use crate::nutrition::{self, CascadeReport};
use super::ToolResult;

/// Usage guide returned by the nutrition_instructions tool
pub const NUTRITION_INSTRUCTIONS: &str = r#"
# Nutritrack Instructions

## Data model

- **Ingredients** store nutrition per 100 g: calories, protein, carbs, fat
  and optional micronutrients. Every ingredient can be measured in grams.
- **Unit mappings** say how many grams one unit of an ingredient weighs
  ("1 cup of rice = 185 g"). Add one with `add_unit_mapping` before using a
  unit other than gram. Standard mass units (kg, mg, oz, lb) get their
  weight automatically.
- **Recipes** combine ingredients (unit + amount) and produce `portions`
  portions (at least 1). Their calories, protein, carbs and fat are computed;
  never try to set them.
- **Meals** belong to a date and hold recipe portions and/or ingredients
  eaten directly. Their calories are computed.
- **Health metrics** hold one row per date: weight (kg), sleep minutes,
  resting heart rate and burned calories.

## Typical flow

1. `create_user` once, then reuse the user id.
2. `add_ingredient` with per-100 g values; `add_unit_mapping` for cups,
   slices, pieces.
3. `create_recipe`, then `add_recipe_ingredient` for each line.
4. `create_meal` for a date, then `add_meal_recipe` (portion = how many of
   the recipe's portions were eaten) or `add_meal_ingredient`.
5. `get_day_summary` for eaten, burned and net calories.

## Recalculation

Totals update automatically whenever an ingredient, mapping, recipe or meal
changes. Responses include a `recalculated` report; entries under
`failures` point at recipes or meals whose lines could not be converted to
grams. Fix the line, then call `recalculate_recipe_nutrition` or
`recalculate_meal_calories`. A mapping that a recipe or meal line still
uses cannot be removed.

## Notes

- Dates use ISO format: YYYY-MM-DD
- A unit with no mapping for the ingredient is rejected, never guessed
- Lines without a unit or amount count as zero
- Recipes and meals only take ingredients and recipes of the same user
"#;

/// Row counts of the main tables
#[derive(Debug, Clone, Serialize)]
pub struct TableCounts {
    pub users: i64,
    pub ingredients: i64,
    pub recipes: i64,
    pub meals: i64,
    pub health_metrics: i64,
}

impl TableCounts {
    fn load(db: &Database) -> DbResult<Self> {
        db.with_conn(|conn| {
            let count = |table: &str| -> DbResult<i64> {
                let sql = format!("SELECT COUNT(*) FROM {}", table);
                Ok(conn.query_row(&sql, [], |row| row.get(0))?)
            };
            Ok(Self {
                users: count("users")?,
                ingredients: count("ingredients")?,
                recipes: count("recipes")?,
                meals: count("meals")?,
                health_metrics: count("health_metrics")?,
            })
        })
    }
}

/// Runtime status of the Nutritrack service
#[derive(Debug, Clone, Serialize)]
pub struct NutritrackStatus {
    /// Build information
    pub build_number: u64,
    pub build_timestamp: &'static str,
    pub version: &'static str,

    /// Database information
    pub database_path: String,
    pub database_size_bytes: Option<u64>,
    pub schema_version: Option<i32>,
    pub counts: Option<TableCounts>,

    /// Process information
    pub uptime_seconds: u64,
    pub process_id: u32,
    pub memory_usage_bytes: u64,
}

/// Status tracker for collecting runtime information
pub struct StatusTracker {
    start_time: Instant,
    database_path: PathBuf,
}

impl StatusTracker {
    pub fn new(database_path: PathBuf) -> Self {
        Self {
            start_time: Instant::now(),
            database_path,
        }
    }

    /// Get the current status. Database figures are omitted if unreadable.
    pub fn get_status(&self, db: &Database) -> NutritrackStatus {
        let build_info = BuildInfo::current();

        let database_size_bytes = std::fs::metadata(&self.database_path)
            .ok()
            .map(|m| m.len());

        let schema_version = match db.with_conn(migrations::get_schema_version) {
            Ok(version) => Some(version),
            Err(e) => {
                tracing::warn!(error = %e, "Could not read schema version");
                None
            }
        };
        let counts = TableCounts::load(db)
            .map_err(|e| tracing::warn!(error = %e, "Could not count rows"))
            .ok();

        let pid = std::process::id();
        let mut sys = System::new();
        sys.refresh_processes(ProcessesToUpdate::Some(&[Pid::from_u32(pid)]));

        let memory_usage_bytes = sys
            .process(Pid::from_u32(pid))
            .map(|p| p.memory())
            .unwrap_or(0);

        NutritrackStatus {
            build_number: build_info.build_number,
            build_timestamp: build_info.build_timestamp,
            version: build_info.version,
            database_path: self.database_path.display().to_string(),
            database_size_bytes,
            schema_version,
            counts,
            uptime_seconds: self.start_time.elapsed().as_secs(),
            process_id: pid,
            memory_usage_bytes,
        }
    }
}

/// Recompute every recipe and meal, optionally for one user
pub fn recalculate_all(db: &Database, user_id: Option<i64>) -> ToolResult<CascadeReport> {
    let report = db.with_transaction(|conn| nutrition::recalculate_all(conn, user_id))?;

    tracing::info!(
        recipes = report.recipes_recalculated.len(),
        meals = report.meals_recalculated.len(),
        failures = report.failures.len(),
        "Full recalculation finished"
    );
    Ok(report)
}
