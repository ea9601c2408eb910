pub mod energy;
pub mod power;

use std::ops::{Div, Mul};

use serde::{Deserialize, Serialize};

/// Physical quantity over `f64`, tagged with its power and time dimensions.
#[derive(
    Clone,
    Copy,
    Default,
    Deserialize,
    PartialEq,
    PartialOrd,
    Serialize,
    derive_more::Add,
    derive_more::AddAssign,
    derive_more::From,
    derive_more::FromStr,
    derive_more::Neg,
    derive_more::Sub,
    derive_more::SubAssign,
    derive_more::Sum,
)]
pub struct Quantity<const POWER: isize, const TIME: isize>(pub f64);

impl<const POWER: isize, const TIME: isize> Quantity<POWER, TIME> {
    pub const ZERO: Self = Self(0.0);

    #[must_use]
    pub const fn is_finite(self) -> bool {
        self.0.is_finite()
    }

    /// Round the bare value to the specified number of decimal places.
    #[must_use]
    pub fn round_to(self, decimals: i32) -> f64 {
        let scale = 10_f64.powi(decimals);
        (self.0 * scale).round() / scale
    }
}

impl<const POWER: isize, const TIME: isize> Mul<f64> for Quantity<POWER, TIME> {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl<const POWER: isize, const TIME: isize> Div<f64> for Quantity<POWER, TIME> {
    type Output = Self;

    fn div(self, rhs: f64) -> Self::Output {
        Self(self.0 / rhs)
    }
}
