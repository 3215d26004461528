//! Unit model
//!
//! Global measurement names. The canonical "gram" unit is seeded by the
//! first migration and never removed.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::migrations::GRAM_UNIT_NAME;
use crate::db::{DbError, DbResult};

/// A named measurement unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub id: i64,
    pub name: String,
}

impl Unit {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
        })
    }

    /// Insert a unit; names are stored trimmed and lowercased
    pub fn create(conn: &Connection, name: &str) -> DbResult<Self> {
        let name = normalize_name(name);
        if name.is_empty() {
            return Err(DbError::Validation("Unit name cannot be empty".to_string()));
        }

        conn.execute("INSERT INTO units (name) VALUES (?1)", [&name])?;

        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?.ok_or_else(|| DbError::not_found("Unit", id))
    }

    /// Return the existing unit with this name or create it
    pub fn get_or_create(conn: &Connection, name: &str) -> DbResult<Self> {
        match Self::get_by_name(conn, name)? {
            Some(unit) => Ok(unit),
            None => Self::create(conn, name),
        }
    }

    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM units WHERE id = ?1")?;

        let result = stmt.query_row([id], Self::from_row);
        match result {
            Ok(unit) => Ok(Some(unit)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn get_by_name(conn: &Connection, name: &str) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM units WHERE name = ?1")?;

        let result = stmt.query_row([normalize_name(name)], Self::from_row);
        match result {
            Ok(unit) => Ok(Some(unit)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// The canonical gram unit
    pub fn gram(conn: &Connection) -> DbResult<Self> {
        Self::get_by_name(conn, GRAM_UNIT_NAME)?.ok_or_else(|| {
            DbError::Validation(format!("Canonical unit '{}' is missing", GRAM_UNIT_NAME))
        })
    }

    pub fn is_gram(&self) -> bool {
        self.name == GRAM_UNIT_NAME
    }

    pub fn list(conn: &Connection) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM units ORDER BY name ASC")?;

        let units = stmt
            .query_map([], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(units)
    }
}

fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_connection;

    #[test]
    fn test_gram_unit_lookup() {
        let conn = test_connection();
        let gram = Unit::gram(&conn).unwrap();
        assert!(gram.is_gram());
        assert_eq!(Unit::get_by_name(&conn, " Gram ").unwrap(), Some(gram));
    }

    #[test]
    fn test_get_or_create_reuses_existing() {
        let conn = test_connection();
        let spoon = Unit::get_or_create(&conn, "Spoon").unwrap();
        let again = Unit::get_or_create(&conn, "spoon").unwrap();
        assert_eq!(spoon.id, again.id);
        assert_eq!(spoon.name, "spoon");
    }

    #[test]
    fn test_empty_name_rejected() {
        let conn = test_connection();
        assert!(matches!(Unit::create(&conn, "  "), Err(DbError::Validation(_))));
    }
}
