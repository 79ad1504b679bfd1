//! Carbon Calculator: turns (category, quantity, subtype) into kg CO₂e,
//! plus rule-based advice and everyday equivalents.
//!
//! All operations are pure. The only soft failure is an unrecognised category,
//! which `calculate` reports as `0.0` and `try_calculate` as `None`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::carbon::factors::{Category, EmissionFactorTable};
use crate::carbon::emission;

pub const UNIT_EMISSION: &str = "kg CO2e";
const MAX_INSIGHTS: usize = 3;

// Advice thresholds, kg CO₂e.
const SIGNIFICANT_USAGE_KG: f64 = 100.0;
const ELECTRICITY_TIP_KG: f64 = 50.0;
const TRANSPORTATION_TIP_KG: f64 = 30.0;
const FOOD_TIP_KG: f64 = 20.0;

// Equivalence ratios, kg CO₂e per unit.
const KG_PER_TREE_YEAR: f64 = 21.77;
const KG_PER_CAR_MILE: f64 = 0.24;
const KG_PER_PHONE_CHARGE: f64 = 0.008;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CarbonEquivalents {
    pub trees_needed: i64,
    pub car_miles: i64,
    pub smartphones_charged: i64,
}

/// Derived figures attached to an analysis once the calculator has run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationResult {
    pub total_emission: f64,
    pub unit_emission: String,
    pub advice: Vec<String>,
    pub equivalents: CarbonEquivalents,
}

#[derive(Debug, Clone)]
pub struct CarbonCalculator {
    factors: Arc<EmissionFactorTable>,
}

impl CarbonCalculator {
    pub fn new(factors: Arc<EmissionFactorTable>) -> Self {
        Self { factors }
    }

    pub fn factors(&self) -> &EmissionFactorTable {
        &self.factors
    }

    /// `round(quantity × factor, 2)`, or `None` when the category is unknown
    /// or the quantity is too large for a finite result.
    pub fn try_calculate(&self, category: &str, quantity: f64, subtype: Option<&str>) -> Option<f64> {
        let category = Category::parse(category)?;
        emission(quantity, self.factors.factor_for(category, subtype))
    }

    /// Like `try_calculate`, but an unknown category yields `0.0`.
    /// A zero here does not mean zero emissions; it means nothing was calculated.
    #[cfg(test)]
    pub fn calculate(&self, category: &str, quantity: f64, subtype: Option<&str>) -> f64 {
        self.try_calculate(category, quantity, subtype)
            .unwrap_or(0.0)
    }

    /// Up to three advice lines: the magnitude warning first, then category tips.
    pub fn generate_insights(&self, category: &str, carbon_kg: f64) -> Vec<String> {
        let mut insights = Vec::new();
        let label = if category.trim().is_empty() {
            "general"
        } else {
            category
        };

        if carbon_kg > SIGNIFICANT_USAGE_KG {
            insights.push(format!(
                "Your {label} usage is significant. Consider reduction strategies."
            ));
        }

        match Category::parse(category) {
            Some(Category::Electricity) if carbon_kg > ELECTRICITY_TIP_KG => {
                insights.push("Switch to LED bulbs and unplug devices when not in use.".into());
                insights.push("Consider solar panels to reduce grid dependency.".into());
            }
            Some(Category::Transportation) if carbon_kg > TRANSPORTATION_TIP_KG => {
                insights
                    .push("Try carpooling or using public transportation 2 days a week.".into());
                insights.push("Consider biking for short distances.".into());
            }
            Some(Category::Food) if carbon_kg > FOOD_TIP_KG => {
                insights.push("Incorporate more plant-based meals into your diet.".into());
                insights
                    .push("Buy local and seasonal produce to reduce transport emissions.".into());
            }
            _ => {}
        }

        if insights.is_empty() {
            insights.push("Continue tracking to get personalized recommendations.".into());
            insights.push("Every small reduction contributes to a larger impact!".into());
        }

        insights.truncate(MAX_INSIGHTS);
        insights
    }

    pub fn carbon_equivalents(carbon_kg: f64) -> CarbonEquivalents {
        CarbonEquivalents {
            trees_needed: (carbon_kg / KG_PER_TREE_YEAR).round() as i64,
            car_miles: (carbon_kg / KG_PER_CAR_MILE).round() as i64,
            smartphones_charged: (carbon_kg / KG_PER_PHONE_CHARGE).round() as i64,
        }
    }

    /// Full calculation for one analysis; `None` for an unknown category.
    pub fn evaluate(
        &self,
        category: &str,
        quantity: f64,
        subtype: Option<&str>,
    ) -> Option<CalculationResult> {
        let total_emission = self.try_calculate(category, quantity, subtype)?;
        Some(CalculationResult {
            total_emission,
            unit_emission: UNIT_EMISSION.to_string(),
            advice: self.generate_insights(category, total_emission),
            equivalents: Self::carbon_equivalents(total_emission),
        })
    }
}
