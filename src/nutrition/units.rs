//! Unit conversion constants
//!
//! Standard gram factors for well-known mass units, used as defaults when a
//! mapping is created without an explicit factor.

use serde::{Deserialize, Serialize};

/// What is known about converting one unit of an ingredient into grams
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "grams")]
pub enum UnitFactor {
    /// The canonical gram unit
    Gram,
    /// A mapped unit weighing this many grams
    Mapped(f64),
    /// No mapping exists for the ingredient
    Unmapped,
}

// ============================================================================
// Weight Conversion Constants (to grams)
// ============================================================================

/// Grams per milligram
pub const G_PER_MG: f64 = 0.001;
/// Grams per kilogram
pub const G_PER_KG: f64 = 1000.0;
/// Grams per ounce
pub const G_PER_OZ: f64 = 28.3495;
/// Grams per pound
pub const G_PER_LB: f64 = 453.592;

/// Standard gram factor for a mass unit name, independent of ingredient
pub fn standard_grams_per_unit(unit: &str) -> Option<f64> {
    let lower = unit.to_lowercase();
    let trimmed = lower.trim();

    match trimmed {
        "g" | "gram" | "grams" => Some(1.0),
        "mg" | "milligram" | "milligrams" => Some(G_PER_MG),
        "kg" | "kilogram" | "kilograms" => Some(G_PER_KG),
        "oz" | "ounce" | "ounces" => Some(G_PER_OZ),
        "lb" | "lbs" | "pound" | "pounds" => Some(G_PER_LB),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_grams_per_unit() {
        assert_eq!(standard_grams_per_unit("g"), Some(1.0));
        assert_eq!(standard_grams_per_unit(" Kilogram "), Some(G_PER_KG));
        assert_eq!(standard_grams_per_unit("oz"), Some(G_PER_OZ));
        assert_eq!(standard_grams_per_unit("lbs"), Some(G_PER_LB));
        assert_eq!(standard_grams_per_unit("spoon"), None);
        assert_eq!(standard_grams_per_unit("cup"), None);
    }
}
