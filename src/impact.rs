use serde::{Deserialize, Serialize};

use crate::quantity::energy::KilowattHours;

/// Per-kilowatt-hour conversion factors, one per metric.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnvironmentalFactors {
    pub co2_avoided_kg: f64,
    pub trees_planted: f64,
    pub households_powered: f64,
    pub km_driven_equivalent: f64,
    pub km_flown_equivalent: f64,
    pub coal_saved_kg: f64,
    pub water_saved_litres: f64,
}

/// Reference parameters the per-kilowatt-hour factors are derived from.
#[derive(Copy, Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReferenceParameters {
    pub kg_co2_per_kwh: f64,
    pub kg_co2_per_tree_per_year: f64,
    pub kwh_per_household_per_year: f64,
    pub kg_co2_per_km_driven: f64,
    pub kg_co2_per_km_flown: f64,
    pub kg_coal_per_kwh: f64,
    pub litres_water_per_kwh: f64,
}

impl From<ReferenceParameters> for EnvironmentalFactors {
    fn from(reference: ReferenceParameters) -> Self {
        Self {
            co2_avoided_kg: reference.kg_co2_per_kwh,
            trees_planted: ratio(reference.kg_co2_per_kwh, reference.kg_co2_per_tree_per_year),
            households_powered: ratio(1.0, reference.kwh_per_household_per_year),
            km_driven_equivalent: ratio(reference.kg_co2_per_kwh, reference.kg_co2_per_km_driven),
            km_flown_equivalent: ratio(reference.kg_co2_per_kwh, reference.kg_co2_per_km_flown),
            coal_saved_kg: reference.kg_coal_per_kwh,
            water_saved_litres: reference.litres_water_per_kwh,
        }
    }
}

/// Environmental table as written in the configuration file.
#[derive(Copy, Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum FactorTable {
    PerKilowattHour(EnvironmentalFactors),
    Reference(ReferenceParameters),
}

impl From<FactorTable> for EnvironmentalFactors {
    fn from(table: FactorTable) -> Self {
        match table {
            FactorTable::PerKilowattHour(factors) => factors,
            FactorTable::Reference(reference) => reference.into(),
        }
    }
}

#[must_use]
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentalImpact {
    pub co2_avoided_kg: f64,
    pub trees_planted: f64,
    pub households_powered: f64,
    pub km_driven_equivalent: f64,
    pub km_flown_equivalent: f64,
    pub coal_saved_kg: f64,
    pub water_saved_litres: f64,
}

impl EnvironmentalImpact {
    pub const ZERO: Self = Self {
        co2_avoided_kg: 0.0,
        trees_planted: 0.0,
        households_powered: 0.0,
        km_driven_equivalent: 0.0,
        km_flown_equivalent: 0.0,
        coal_saved_kg: 0.0,
        water_saved_litres: 0.0,
    };

    /// Scale each factor by the energy.
    ///
    /// Negative or non-finite inputs and outputs are clamped to zero.
    pub fn compute(energy: KilowattHours, factors: &EnvironmentalFactors) -> Self {
        let kwh = non_negative(energy.0);
        let scale = |factor: f64| non_negative(kwh * factor);
        Self {
            co2_avoided_kg: scale(factors.co2_avoided_kg),
            trees_planted: scale(factors.trees_planted),
            households_powered: scale(factors.households_powered),
            km_driven_equivalent: scale(factors.km_driven_equivalent),
            km_flown_equivalent: scale(factors.km_flown_equivalent),
            coal_saved_kg: scale(factors.coal_saved_kg),
            water_saved_litres: scale(factors.water_saved_litres),
        }
    }
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 { value } else { 0.0 }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    non_negative(numerator / denominator)
}
