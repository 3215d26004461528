//! Unit conversion
//!
//! Turns an (ingredient, unit, amount) triple into grams using the
//! ingredient's unit mappings. A unit the ingredient has no mapping for is
//! an input error; it never falls back to zero or to the raw amount.

use rusqlite::Connection;

use crate::db::{DbError, DbResult};
use crate::models::{IngredientUnit, Unit};
use super::units::UnitFactor;

/// Convert an amount using a resolved factor.
///
/// Returns `None` for an unmapped unit. No rounding happens here.
pub fn to_grams(amount: f64, factor: UnitFactor) -> Option<f64> {
    match factor {
        UnitFactor::Gram => Some(amount),
        UnitFactor::Mapped(grams_in_one_unit) => Some(amount * grams_in_one_unit),
        UnitFactor::Unmapped => None,
    }
}

/// Convert an amount, failing with `InvalidUnit` when the unit is unmapped
pub fn to_grams_checked(
    ingredient_id: i64,
    unit_id: i64,
    amount: f64,
    factor: UnitFactor,
) -> DbResult<f64> {
    to_grams(amount, factor).ok_or(DbError::InvalidUnit { ingredient_id, unit_id })
}

/// Look up how a unit converts for one ingredient
pub fn resolve_factor(conn: &Connection, ingredient_id: i64, unit_id: i64) -> DbResult<UnitFactor> {
    let unit = Unit::get_by_id(conn, unit_id)?.ok_or_else(|| DbError::not_found("Unit", unit_id))?;
    if unit.is_gram() {
        return Ok(UnitFactor::Gram);
    }

    Ok(match IngredientUnit::get(conn, ingredient_id, unit_id)? {
        Some(mapping) => UnitFactor::Mapped(mapping.grams_in_one_unit),
        None => UnitFactor::Unmapped,
    })
}

/// Equivalent mass in grams of `amount` of `unit_id` for an ingredient
pub fn grams_for(conn: &Connection, ingredient_id: i64, unit_id: i64, amount: f64) -> DbResult<f64> {
    let factor = resolve_factor(conn, ingredient_id, unit_id)?;
    to_grams_checked(ingredient_id, unit_id, amount, factor)
}

/// Fail unless the unit can be used with the ingredient
pub fn ensure_unit_valid(conn: &Connection, ingredient_id: i64, unit_id: i64) -> DbResult<()> {
    match resolve_factor(conn, ingredient_id, unit_id)? {
        UnitFactor::Unmapped => Err(DbError::InvalidUnit { ingredient_id, unit_id }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_connection;
    use crate::models::{Ingredient, IngredientCreate, User};

    fn setup(conn: &Connection) -> Ingredient {
        let user = User::create(conn, "anna").unwrap();
        Ingredient::create(
            conn,
            &IngredientCreate {
                user_id: user.id,
                name: "Rice".into(),
                ingredient_type: Default::default(),
                nutrients: Default::default(),
            },
        )
        .unwrap()
    }

    #[test]
    fn test_gram_unit_is_identity() {
        let conn = test_connection();
        let rice = setup(&conn);
        let gram = Unit::gram(&conn).unwrap();

        for amount in [0.0, 0.5, 1.0, 37.25, 100.0, 12345.678] {
            assert_eq!(grams_for(&conn, rice.id, gram.id, amount).unwrap(), amount);
        }
    }

    #[test]
    fn test_mapped_unit_scales_amount() {
        let conn = test_connection();
        let rice = setup(&conn);
        let spoon = Unit::create(&conn, "spoon").unwrap();
        IngredientUnit::create(&conn, rice.id, spoon.id, 12.5).unwrap();

        assert_eq!(grams_for(&conn, rice.id, spoon.id, 3.0).unwrap(), 37.5);
    }

    #[test]
    fn test_unmapped_unit_fails_closed() {
        let conn = test_connection();
        let rice = setup(&conn);
        let cup = Unit::create(&conn, "cup").unwrap();

        let err = grams_for(&conn, rice.id, cup.id, 2.0).unwrap_err();
        assert!(matches!(
            err,
            DbError::InvalidUnit { ingredient_id, unit_id } if ingredient_id == rice.id && unit_id == cup.id
        ));
        assert!(ensure_unit_valid(&conn, rice.id, cup.id).is_err());
    }

    #[test]
    fn test_to_grams_does_not_round() {
        assert_eq!(to_grams(1.0, UnitFactor::Mapped(1.0 / 3.0)), Some(1.0 / 3.0));
        assert_eq!(to_grams(5.0, UnitFactor::Unmapped), None);
    }
}
