//! Health Metric MCP Tools
//!
//! Daily body measurements and the per-day summary that sets eaten calories
//! against burned calories.

use serde::Serialize;

use crate::db::{Database, DbError};
use crate::models::{round2, HealthMetric, HealthMetricRecord, Meal, User};
use super::{parse_date, ToolResult};

/// Response for list_health_metrics
#[derive(Debug, Serialize)]
pub struct ListHealthMetricsResponse {
    pub user_id: i64,
    pub from: String,
    pub to: String,
    pub metrics: Vec<HealthMetric>,
}

/// Everything recorded for a user on one date
#[derive(Debug, Serialize)]
pub struct DaySummary {
    pub user_id: i64,
    pub date: String,
    pub meal_count: usize,
    pub calories_eaten: f64,
    pub calories_burned: Option<f64>,
    /// Eaten minus burned; equals eaten when nothing burned was recorded
    pub net_calories: f64,
    pub health: Option<HealthMetric>,
}

#[derive(Debug, Serialize)]
pub struct DeleteHealthMetricResponse {
    pub success: bool,
    pub user_id: i64,
    pub date: String,
}

fn validate_record(data: &HealthMetricRecord) -> Result<(), DbError> {
    if let Some(weight) = data.weight {
        if !weight.is_finite() || weight <= 0.0 {
            return Err(DbError::Validation("weight must be greater than 0".to_string()));
        }
    }
    if matches!(data.sleep_minutes, Some(m) if m < 0 || m > 24 * 60) {
        return Err(DbError::Validation("sleep_minutes must be between 0 and 1440".to_string()));
    }
    if matches!(data.resting_heart_rate, Some(bpm) if bpm <= 0) {
        return Err(DbError::Validation("resting_heart_rate must be greater than 0".to_string()));
    }
    if matches!(data.burned_calories, Some(kcal) if !kcal.is_finite() || kcal < 0.0) {
        return Err(DbError::Validation("burned_calories cannot be negative".to_string()));
    }
    Ok(())
}

/// Record metrics for a date, merging into anything already recorded
pub fn record_health_metric(
    db: &Database,
    user_id: i64,
    date: &str,
    data: HealthMetricRecord,
) -> ToolResult<HealthMetric> {
    Ok(db.with_transaction(|conn| {
        User::get_by_id(conn, user_id)?.ok_or_else(|| DbError::not_found("User", user_id))?;
        validate_record(&data)?;
        HealthMetric::record(conn, user_id, &parse_date(date)?, &data)
    })?)
}

pub fn get_health_metric(db: &Database, user_id: i64, date: &str) -> ToolResult<Option<HealthMetric>> {
    let date = parse_date(date)?;
    Ok(db.with_conn(|conn| HealthMetric::get_for_date(conn, user_id, &date))?)
}

/// Metrics between two dates, inclusive
pub fn list_health_metrics(
    db: &Database,
    user_id: i64,
    from: &str,
    to: &str,
) -> ToolResult<ListHealthMetricsResponse> {
    let from = parse_date(from)?;
    let to = parse_date(to)?;
    if from > to {
        return Err(DbError::Validation(format!("from ({}) is after to ({})", from, to)).into());
    }

    let metrics = db.with_conn(|conn| HealthMetric::list_range(conn, user_id, &from, &to))?;
    Ok(ListHealthMetricsResponse { user_id, from, to, metrics })
}

pub fn delete_health_metric(db: &Database, user_id: i64, date: &str) -> ToolResult<DeleteHealthMetricResponse> {
    let date = parse_date(date)?;
    db.with_transaction(|conn| {
        if !HealthMetric::delete(conn, user_id, &date)? {
            return Err(DbError::Validation(format!("No health metric recorded on {}", date)));
        }
        Ok(())
    })?;

    Ok(DeleteHealthMetricResponse { success: true, user_id, date })
}

/// Meals and health metrics for one date
pub fn day_summary(db: &Database, user_id: i64, date: &str) -> ToolResult<DaySummary> {
    let date = parse_date(date)?;

    Ok(db.with_conn(|conn| {
        User::get_by_id(conn, user_id)?.ok_or_else(|| DbError::not_found("User", user_id))?;
        let meals = Meal::list_for_date(conn, user_id, &date)?;
        let health = HealthMetric::get_for_date(conn, user_id, &date)?;

        let calories_eaten = round2(meals.iter().map(|m| m.calories).sum());
        let calories_burned = health.as_ref().and_then(|h| h.burned_calories);
        let net_calories = round2(calories_eaten - calories_burned.unwrap_or(0.0));

        Ok(DaySummary {
            user_id,
            date: date.clone(),
            meal_count: meals.len(),
            calories_eaten,
            calories_burned,
            net_calories,
            health,
        })
    })?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{IngredientCreate, MealCreate, MealIngredientCreate, Nutrients, Unit};
    use crate::tools::test_support::temp_database;
    use crate::tools::{ingredients, meals, users, ToolError};

    #[test]
    fn test_record_validates_values() {
        let (_dir, db) = temp_database();
        let user = users::create_user(&db, "anna").unwrap();

        let bad = HealthMetricRecord { weight: Some(-3.0), ..Default::default() };
        assert!(matches!(
            record_health_metric(&db, user.id, "2025-03-01", bad),
            Err(ToolError::Invalid(_))
        ));
        assert!(get_health_metric(&db, user.id, "2025-03-01").unwrap().is_none());
    }

    #[test]
    fn test_list_range_is_inclusive() {
        let (_dir, db) = temp_database();
        let user = users::create_user(&db, "anna").unwrap();
        for (date, weight) in [("2025-03-01", 70.0), ("2025-03-02", 69.8), ("2025-03-05", 69.5)] {
            record_health_metric(
                &db,
                user.id,
                date,
                HealthMetricRecord { weight: Some(weight), ..Default::default() },
            )
            .unwrap();
        }

        let listed = list_health_metrics(&db, user.id, "2025-03-01", "2025-03-02").unwrap();
        assert_eq!(listed.metrics.len(), 2);
        assert!(list_health_metrics(&db, user.id, "2025-03-05", "2025-03-01").is_err());

        delete_health_metric(&db, user.id, "2025-03-05").unwrap();
        assert!(delete_health_metric(&db, user.id, "2025-03-05").is_err());
    }

    #[test]
    fn test_day_summary_nets_burned_calories() {
        let (_dir, db) = temp_database();
        let user = users::create_user(&db, "anna").unwrap();
        let gram_id = db.with_conn(Unit::gram).unwrap().id;
        let bread = ingredients::add_ingredient(
            &db,
            IngredientCreate {
                user_id: user.id,
                name: "Bread".into(),
                ingredient_type: Default::default(),
                nutrients: Nutrients { calories: Some(250.0), ..Default::default() },
            },
        )
        .unwrap();
        let meal = meals::create_meal(
            &db,
            MealCreate { user_id: user.id, date: "2025-03-01".into(), category_id: None },
        )
        .unwrap();
        meals::add_meal_ingredient(
            &db,
            MealIngredientCreate {
                meal_id: meal.id,
                ingredient_id: bread.id,
                unit_id: Some(gram_id),
                amount: Some(200.0),
            },
        )
        .unwrap();
        record_health_metric(
            &db,
            user.id,
            "2025-03-01",
            HealthMetricRecord { burned_calories: Some(120.0), ..Default::default() },
        )
        .unwrap();

        let summary = day_summary(&db, user.id, "2025-03-01").unwrap();
        assert_eq!(summary.meal_count, 1);
        assert_eq!(summary.calories_eaten, 500.0);
        assert_eq!(summary.calories_burned, Some(120.0));
        assert_eq!(summary.net_calories, 380.0);

        let empty = day_summary(&db, user.id, "2025-03-02").unwrap();
        assert_eq!(empty.calories_eaten, 0.0);
        assert!(empty.health.is_none());
    }
}
