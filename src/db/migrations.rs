//! Database migrations
//!
//! Schema creation and migration logic.

use rusqlite::Connection;

use super::connection::DbResult;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Name of the canonical unit every ingredient is mapped to at 1:1
pub const GRAM_UNIT_NAME: &str = "gram";

/// Run all migrations to bring the database up to the current schema version
pub fn run_migrations(conn: &Connection) -> DbResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let current_version = get_schema_version(conn)?;

    if current_version < 1 {
        migrate_v1(conn)?;
        conn.execute("INSERT INTO schema_migrations (version) VALUES (1)", [])?;
        tracing::info!("Applied schema migration v1");
    }

    Ok(())
}

/// Migration v1: Initial schema
fn migrate_v1(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        r#"
        -- ============================================
        -- USERS
        -- Ownership key for all user-scoped data
        -- ============================================
        CREATE TABLE users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- ============================================
        -- UNITS
        -- Global measurement names ("gram", "spoon", ...)
        -- ============================================
        CREATE TABLE units (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        );

        INSERT INTO units (name) VALUES ('gram');

        -- ============================================
        -- INGREDIENTS
        -- Nutrition per 100 grams; NULL means unknown
        -- ============================================
        CREATE TABLE ingredients (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            ingredient_type TEXT NOT NULL DEFAULT 'solid'
                CHECK(ingredient_type IN ('solid', 'liquid')),

            calories REAL,
            protein REAL,       -- grams
            carbs REAL,         -- grams
            fat REAL,           -- grams
            fiber REAL,         -- grams
            sodium REAL,        -- milligrams
            potassium REAL,     -- milligrams
            calcium REAL,       -- milligrams
            iron REAL,          -- milligrams
            magnesium REAL,     -- milligrams
            selenium REAL,      -- micrograms
            zinc REAL,          -- milligrams

            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),

            UNIQUE(user_id, name)
        );

        CREATE INDEX idx_ingredients_user ON ingredients(user_id);

        -- ============================================
        -- INGREDIENT UNITS
        -- How many grams one unit of an ingredient weighs
        -- ============================================
        CREATE TABLE ingredient_units (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            ingredient_id INTEGER NOT NULL REFERENCES ingredients(id) ON DELETE CASCADE,
            unit_id INTEGER NOT NULL REFERENCES units(id) ON DELETE RESTRICT,
            grams_in_one_unit REAL NOT NULL CHECK(grams_in_one_unit > 0),

            UNIQUE(ingredient_id, unit_id)
        );

        CREATE INDEX idx_ingredient_units_ingredient ON ingredient_units(ingredient_id);

        -- ============================================
        -- RECIPES
        -- Aggregate nutrition is owned by the recalculation engine
        -- ============================================
        CREATE TABLE recipes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            portions INTEGER NOT NULL DEFAULT 1 CHECK(portions >= 1),
            prepare_time INTEGER,               -- minutes
            description TEXT,

            calories REAL NOT NULL DEFAULT 0,
            protein REAL NOT NULL DEFAULT 0,
            carbs REAL NOT NULL DEFAULT 0,
            fat REAL NOT NULL DEFAULT 0,

            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX idx_recipes_user ON recipes(user_id);

        -- ============================================
        -- RECIPE INGREDIENTS
        -- unit/amount may be NULL while a recipe is being drafted
        -- ============================================
        CREATE TABLE recipe_ingredients (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            recipe_id INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
            ingredient_id INTEGER NOT NULL REFERENCES ingredients(id) ON DELETE CASCADE,
            unit_id INTEGER REFERENCES units(id) ON DELETE RESTRICT,
            amount REAL
        );

        CREATE INDEX idx_recipe_ingredients_recipe ON recipe_ingredients(recipe_id);
        CREATE INDEX idx_recipe_ingredients_ingredient ON recipe_ingredients(ingredient_id);

        -- ============================================
        -- MEAL CATEGORIES
        -- ============================================
        CREATE TABLE meal_categories (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            name TEXT NOT NULL,

            UNIQUE(user_id, name)
        );

        -- ============================================
        -- MEALS
        -- ============================================
        CREATE TABLE meals (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            date TEXT NOT NULL,                 -- ISO date: "2025-01-09"
            category_id INTEGER REFERENCES meal_categories(id) ON DELETE SET NULL,
            calories REAL NOT NULL DEFAULT 0,

            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX idx_meals_user_date ON meals(user_id, date);

        CREATE TABLE meal_recipes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            meal_id INTEGER NOT NULL REFERENCES meals(id) ON DELETE CASCADE,
            recipe_id INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
            portion REAL NOT NULL CHECK(portion > 0)
        );

        CREATE INDEX idx_meal_recipes_meal ON meal_recipes(meal_id);
        CREATE INDEX idx_meal_recipes_recipe ON meal_recipes(recipe_id);

        CREATE TABLE meal_ingredients (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            meal_id INTEGER NOT NULL REFERENCES meals(id) ON DELETE CASCADE,
            ingredient_id INTEGER NOT NULL REFERENCES ingredients(id) ON DELETE CASCADE,
            unit_id INTEGER REFERENCES units(id) ON DELETE RESTRICT,
            amount REAL
        );

        CREATE INDEX idx_meal_ingredients_meal ON meal_ingredients(meal_id);
        CREATE INDEX idx_meal_ingredients_ingredient ON meal_ingredients(ingredient_id);

        -- ============================================
        -- HEALTH METRICS
        -- One row per user per day
        -- ============================================
        CREATE TABLE health_metrics (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            date TEXT NOT NULL,
            weight REAL,                        -- kilograms
            sleep_minutes INTEGER,
            resting_heart_rate INTEGER,         -- bpm
            burned_calories REAL,
            notes TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),

            UNIQUE(user_id, date)
        );
        "#,
    )?;

    Ok(())
}

/// Get the current schema version
pub fn get_schema_version(conn: &Connection) -> DbResult<i32> {
    let version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;
    Ok(version)
}

/// Check if the database needs migration
pub fn needs_migration(conn: &Connection) -> DbResult<bool> {
    let current = get_schema_version(conn)?;
    Ok(current < SCHEMA_VERSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
        assert!(!needs_migration(&conn).unwrap());
    }

    #[test]
    fn test_gram_unit_is_seeded() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM units WHERE name = ?1",
                [GRAM_UNIT_NAME],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }
}
