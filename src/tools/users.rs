//! User, Unit and Meal Category Tools
//!
//! The small lookup tables the rest of the tracker hangs off.

use serde::Serialize;

use crate::db::{Database, DbError};
use crate::models::{MealCategory, Unit, User};
use super::{require_name, ToolResult};

/// Response for list_users
#[derive(Debug, Serialize)]
pub struct ListUsersResponse {
    pub users: Vec<User>,
    pub count: usize,
}

/// Response for list_units
#[derive(Debug, Serialize)]
pub struct ListUnitsResponse {
    pub units: Vec<Unit>,
    pub count: usize,
}

/// Response for list_meal_categories
#[derive(Debug, Serialize)]
pub struct ListMealCategoriesResponse {
    pub user_id: i64,
    pub categories: Vec<MealCategory>,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub deleted_id: i64,
}

/// Create a user
pub fn create_user(db: &Database, username: &str) -> ToolResult<User> {
    let user = db.with_transaction(|conn| {
        require_name("username", username)?;
        let username = username.trim();
        if User::get_by_username(conn, username)?.is_some() {
            return Err(DbError::Validation(format!("User '{}' already exists", username)));
        }
        User::create(conn, username)
    })?;

    tracing::info!(user_id = user.id, "Created user");
    Ok(user)
}

pub fn list_users(db: &Database) -> ToolResult<ListUsersResponse> {
    let users = db.with_conn(User::list)?;
    Ok(ListUsersResponse { count: users.len(), users })
}

/// Create a unit, or return the existing one with the same name
pub fn create_unit(db: &Database, name: &str) -> ToolResult<Unit> {
    Ok(db.with_transaction(|conn| Unit::get_or_create(conn, name))?)
}

pub fn list_units(db: &Database) -> ToolResult<ListUnitsResponse> {
    let units = db.with_conn(Unit::list)?;
    Ok(ListUnitsResponse { count: units.len(), units })
}

/// Create a meal category for a user
pub fn create_meal_category(db: &Database, user_id: i64, name: &str) -> ToolResult<MealCategory> {
    Ok(db.with_transaction(|conn| {
        require_name("Category name", name)?;
        User::get_by_id(conn, user_id)?.ok_or_else(|| DbError::not_found("User", user_id))?;

        let exists = MealCategory::list_for_user(conn, user_id)?
            .iter()
            .any(|c| c.name.eq_ignore_ascii_case(name.trim()));
        if exists {
            return Err(DbError::Validation(format!(
                "Meal category '{}' already exists",
                name.trim()
            )));
        }

        MealCategory::create(conn, user_id, name)
    })?)
}

pub fn list_meal_categories(db: &Database, user_id: i64) -> ToolResult<ListMealCategoriesResponse> {
    let categories = db.with_conn(|conn| MealCategory::list_for_user(conn, user_id))?;
    Ok(ListMealCategoriesResponse { user_id, categories })
}

/// Delete a meal category. Meals in it are kept without a category.
pub fn delete_meal_category(db: &Database, id: i64) -> ToolResult<DeleteResponse> {
    db.with_transaction(|conn| {
        if !MealCategory::delete(conn, id)? {
            return Err(DbError::not_found("MealCategory", id));
        }
        Ok(())
    })?;

    Ok(DeleteResponse { success: true, deleted_id: id })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::temp_database;
    use crate::tools::ToolError;

    #[test]
    fn test_duplicate_user_is_rejected() {
        let (_dir, db) = temp_database();
        create_user(&db, "anna").unwrap();

        let err = create_user(&db, " anna ").unwrap_err();
        assert!(matches!(err, ToolError::Invalid(_)));
        assert_eq!(list_users(&db).unwrap().count, 1);
    }

    #[test]
    fn test_units_include_gram() {
        let (_dir, db) = temp_database();
        let cup = create_unit(&db, "Cup").unwrap();
        let again = create_unit(&db, "cup").unwrap();
        assert_eq!(cup, again);

        let names: Vec<String> = list_units(&db).unwrap().units.into_iter().map(|u| u.name).collect();
        assert_eq!(names, vec!["cup".to_string(), "gram".to_string()]);
    }

    #[test]
    fn test_meal_categories() {
        let (_dir, db) = temp_database();
        let user = create_user(&db, "anna").unwrap();
        let breakfast = create_meal_category(&db, user.id, "Breakfast").unwrap();

        assert!(create_meal_category(&db, user.id, "breakfast").is_err());
        assert!(create_meal_category(&db, 999, "Lunch").is_err());
        assert_eq!(list_meal_categories(&db, user.id).unwrap().categories.len(), 1);

        delete_meal_category(&db, breakfast.id).unwrap();
        assert!(list_meal_categories(&db, user.id).unwrap().categories.is_empty());
    }
}
