//! Emission Factor Table: static kg CO₂e-per-unit factors keyed by category and subtype.
//!
//! The table is an immutable value built once at startup and shared through
//! `Arc`; nothing mutates it after construction.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Top-level emission category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Electricity,
    Transportation,
    Food,
    Home,
    Waste,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Electricity,
        Category::Transportation,
        Category::Food,
        Category::Home,
        Category::Waste,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Electricity => "electricity",
            Category::Transportation => "transportation",
            Category::Food => "food",
            Category::Home => "home",
            Category::Waste => "waste",
        }
    }

    /// Lenient parse used on user and model input. `None` for anything unrecognised.
    pub fn parse(raw: &str) -> Option<Category> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "electricity" => Some(Category::Electricity),
            "transportation" => Some(Category::Transportation),
            "food" => Some(Category::Food),
            "home" => Some(Category::Home),
            "waste" => Some(Category::Waste),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::parse(s).ok_or_else(|| format!("unknown emission category '{s}'"))
    }
}

/// A single factor row: kg CO₂e emitted per one `unit` of the resource.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmissionFactor {
    pub subtype: &'static str,
    pub factor: f64,
    pub unit: &'static str,
}

const fn row(subtype: &'static str, factor: f64, unit: &'static str) -> EmissionFactor {
    EmissionFactor {
        subtype,
        factor,
        unit,
    }
}

// First row of every category is its default subtype.
const ELECTRICITY: &[EmissionFactor] = &[
    row("grid_average", 0.385, "kWh"),
    row("coal", 0.96, "kWh"),
    row("natural_gas", 0.44, "kWh"),
    row("solar", 0.05, "kWh"),
    row("wind", 0.01, "kWh"),
    row("hydro", 0.01, "kWh"),
];

const TRANSPORTATION: &[EmissionFactor] = &[
    row("gas_vehicle", 0.24, "miles"),
    row("gasoline", 8.887, "gallons"),
    row("diesel", 10.16, "gallons"),
    row("jet_fuel", 9.75, "gallons"),
    row("electric_vehicle", 0.12, "miles"),
    row("public_transit", 0.05, "miles"),
    row("flight", 0.18, "miles"),
];

const FOOD: &[EmissionFactor] = &[
    row("beef", 27.0, "kg"),
    row("lamb", 24.0, "kg"),
    row("cheese", 13.0, "kg"),
    row("pork", 12.1, "kg"),
    row("turkey", 10.9, "kg"),
    row("chicken", 6.9, "kg"),
    row("tuna", 6.1, "kg"),
    row("eggs", 4.8, "kg"),
    row("potatoes", 2.9, "kg"),
    row("rice", 2.7, "kg"),
    row("nuts", 2.3, "kg"),
    row("beans", 2.0, "kg"),
    row("tofu", 2.0, "kg"),
    row("milk", 1.9, "kg"),
    row("lentils", 0.9, "kg"),
    row("vegetables", 0.4, "kg"),
    row("fruits", 0.4, "kg"),
];

const HOME: &[EmissionFactor] = &[
    row("natural_gas", 5.3, "therms"),
    row("heating_oil", 10.21, "gallons"),
    row("propane", 5.75, "gallons"),
    row("lpg", 5.75, "gallons"),
];

// Avoided-emission credits are not modelled; diverted waste counts as zero.
const WASTE: &[EmissionFactor] = &[
    row("landfill", 0.71, "kg"),
    row("recycled", 0.0, "kg"),
    row("composted", 0.0, "kg"),
];

/// Immutable category → subtype → factor mapping.
#[derive(Debug, Clone)]
pub struct EmissionFactorTable {
    electricity: &'static [EmissionFactor],
    transportation: &'static [EmissionFactor],
    food: &'static [EmissionFactor],
    home: &'static [EmissionFactor],
    waste: &'static [EmissionFactor],
}

impl Default for EmissionFactorTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl EmissionFactorTable {
    /// The IPCC/EPA-derived factor set the service ships with.
    pub fn standard() -> Self {
        Self {
            electricity: ELECTRICITY,
            transportation: TRANSPORTATION,
            food: FOOD,
            home: HOME,
            waste: WASTE,
        }
    }

    pub fn rows(&self, category: Category) -> &'static [EmissionFactor] {
        match category {
            Category::Electricity => self.electricity,
            Category::Transportation => self.transportation,
            Category::Food => self.food,
            Category::Home => self.home,
            Category::Waste => self.waste,
        }
    }

    pub fn default_subtype(&self, category: Category) -> &'static EmissionFactor {
        &self.rows(category)[0]
    }

    /// Exact subtype row, if the subtype is known for this category.
    pub fn find(&self, category: Category, subtype: &str) -> Option<&'static EmissionFactor> {
        let key = normalize_subtype(subtype);
        self.rows(category).iter().find(|r| r.subtype == key)
    }

    /// Resolves a subtype, degrading to the category default when absent or unknown.
    pub fn resolve(&self, category: Category, subtype: Option<&str>) -> &'static EmissionFactor {
        subtype
            .and_then(|s| self.find(category, s))
            .unwrap_or_else(|| self.default_subtype(category))
    }

    pub fn factor_for(&self, category: Category, subtype: Option<&str>) -> f64 {
        self.resolve(category, subtype).factor
    }

    pub fn unit_for(&self, category: Category, subtype: Option<&str>) -> &'static str {
        self.resolve(category, subtype).unit
    }
}

/// "Grid Average" / "grid-average" → "grid_average".
fn normalize_subtype(raw: &str) -> String {
    raw.trim()
        .to_ascii_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_category_has_default_and_non_negative_factors() {
        let table = EmissionFactorTable::standard();
        for category in Category::ALL {
            let rows = table.rows(category);
            assert!(!rows.is_empty(), "{category} has no subtypes");
            assert!(rows.iter().all(|r| r.factor >= 0.0), "{category} has a negative factor");
            assert_eq!(table.default_subtype(category).subtype, rows[0].subtype);
        }
    }

    #[test]
    fn test_unknown_subtype_falls_back_to_default() {
        let table = EmissionFactorTable::standard();
        assert_eq!(table.factor_for(Category::Electricity, Some("nuclear")), 0.385);
        assert_eq!(table.factor_for(Category::Food, None), 27.0);
        assert_eq!(table.factor_for(Category::Transportation, Some("")), 0.24);
    }

    #[test]
    fn test_subtype_lookup_is_lenient_about_spelling() {
        let table = EmissionFactorTable::standard();
        assert_eq!(table.factor_for(Category::Electricity, Some("Grid Average")), 0.385);
        assert_eq!(table.factor_for(Category::Home, Some("heating-oil")), 10.21);
    }

    #[test]
    fn test_units_follow_subtype() {
        let table = EmissionFactorTable::standard();
        assert_eq!(table.unit_for(Category::Transportation, Some("gasoline")), "gallons");
        assert_eq!(table.unit_for(Category::Transportation, Some("flight")), "miles");
        assert_eq!(table.unit_for(Category::Home, None), "therms");
    }

    #[test]
    fn test_category_parse() {
        assert_eq!(Category::parse(" Electricity "), Some(Category::Electricity));
        assert_eq!(Category::parse("plastics"), None);
        assert!("waste".parse::<Category>().is_ok());
    }
}
