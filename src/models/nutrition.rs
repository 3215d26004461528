//! Shared nutrition data structures
//!
//! `Nutrition` is the aggregate carried by recipes; `Nutrients` is the full
//! per-100g profile stored on an ingredient.

use serde::{Deserialize, Serialize};

/// Aggregate nutrition stored on a recipe
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Nutrition {
    pub calories: f64,
    pub protein: f64, // grams
    pub carbs: f64,   // grams
    pub fat: f64,     // grams
}

impl Nutrition {
    /// Create a new Nutrition with all zeros
    pub fn zero() -> Self {
        Self::default()
    }

    /// Scale nutrition values by a multiplier
    pub fn scale(&self, multiplier: f64) -> Self {
        Self {
            calories: self.calories * multiplier,
            protein: self.protein * multiplier,
            carbs: self.carbs * multiplier,
            fat: self.fat * multiplier,
        }
    }

    /// Add another nutrition to this one
    pub fn add(&self, other: &Nutrition) -> Self {
        Self {
            calories: self.calories + other.calories,
            protein: self.protein + other.protein,
            carbs: self.carbs + other.carbs,
            fat: self.fat + other.fat,
        }
    }

    /// Round every field to two decimal places
    pub fn rounded(&self) -> Self {
        Self {
            calories: round2(self.calories),
            protein: round2(self.protein),
            carbs: round2(self.carbs),
            fat: round2(self.fat),
        }
    }
}

impl std::ops::Add for Nutrition {
    type Output = Nutrition;

    fn add(self, other: Nutrition) -> Nutrition {
        Nutrition::add(&self, &other)
    }
}

impl std::ops::Mul<f64> for Nutrition {
    type Output = Nutrition;

    fn mul(self, multiplier: f64) -> Nutrition {
        self.scale(multiplier)
    }
}

impl std::iter::Sum for Nutrition {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Nutrition::zero(), |acc, n| acc + n)
    }
}

/// Round to two decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Per-100g nutrient profile of an ingredient. `None` means unknown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Nutrients {
    pub calories: Option<f64>,
    pub protein: Option<f64>,   // g
    pub carbs: Option<f64>,     // g
    pub fat: Option<f64>,       // g
    pub fiber: Option<f64>,     // g
    pub sodium: Option<f64>,    // mg
    pub potassium: Option<f64>, // mg
    pub calcium: Option<f64>,   // mg
    pub iron: Option<f64>,      // mg
    pub magnesium: Option<f64>, // mg
    pub selenium: Option<f64>,  // µg
    pub zinc: Option<f64>,      // mg
}

impl Nutrients {
    /// The macro fields that feed recipe aggregates, unknowns read as zero
    pub fn macros(&self) -> Nutrition {
        Nutrition {
            calories: self.calories.unwrap_or(0.0),
            protein: self.protein.unwrap_or(0.0),
            carbs: self.carbs.unwrap_or(0.0),
            fat: self.fat.unwrap_or(0.0),
        }
    }
}
