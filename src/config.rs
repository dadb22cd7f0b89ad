use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{Result, SaleError};

/// engine configuration shared by the calculator, the ledger and the status engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// decimal places of stored money values (installments, payment splits)
    pub currency_scale: u32,
    /// a due date this many days away or closer counts as due soon
    pub due_soon_days: i64,
    /// how far the outstanding balance may dip below zero through rounding
    pub balance_tolerance: Money,
    /// longest financing term accepted
    pub max_term_months: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl EngineConfig {
    /// two decimal places, matching `decimal(15, 2)` storage columns
    pub fn standard() -> Self {
        Self {
            currency_scale: 2,
            due_soon_days: 7,
            balance_tolerance: Money::from_minor(1, 2),
            max_term_months: 600,
        }
    }

    /// whole currency units, for currencies quoted without minor units
    pub fn whole_units() -> Self {
        Self {
            currency_scale: 0,
            due_soon_days: 7,
            balance_tolerance: Money::ONE,
            max_term_months: 600,
        }
    }

    pub fn with_due_soon_days(mut self, days: i64) -> Self {
        self.due_soon_days = days;
        self
    }

    pub fn with_balance_tolerance(mut self, tolerance: Money) -> Self {
        self.balance_tolerance = tolerance;
        self
    }

    /// parse and validate a json configuration document
    pub fn from_json(json: &str) -> Result<Self> {
        let config: EngineConfig =
            serde_json::from_str(json).map_err(|e| SaleError::InvalidConfiguration {
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        // rust_decimal supports at most 28 fractional digits
        if self.currency_scale > 28 {
            return Err(SaleError::InvalidConfiguration {
                message: format!("currency scale {} exceeds 28", self.currency_scale),
            });
        }
        if self.due_soon_days < 0 {
            return Err(SaleError::InvalidConfiguration {
                message: format!("due-soon window of {} days is negative", self.due_soon_days),
            });
        }
        if self.balance_tolerance.is_negative() {
            return Err(SaleError::InvalidConfiguration {
                message: format!("balance tolerance {} is negative", self.balance_tolerance),
            });
        }
        if self.max_term_months == 0 {
            return Err(SaleError::InvalidConfiguration {
                message: "max term must allow at least one month".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        assert!(EngineConfig::standard().validate().is_ok());
        assert!(EngineConfig::whole_units().validate().is_ok());
        assert_eq!(EngineConfig::default(), EngineConfig::standard());
    }

    #[test]
    fn test_from_json() {
        let json = r#"{
            "currency_scale": 0,
            "due_soon_days": 5,
            "balance_tolerance": "1",
            "max_term_months": 360
        }"#;
        let config = EngineConfig::from_json(json).unwrap();
        assert_eq!(config.currency_scale, 0);
        assert_eq!(config.due_soon_days, 5);
        assert_eq!(config.balance_tolerance, Money::ONE);
    }

    #[test]
    fn test_rejects_invalid_values() {
        let negative_window = EngineConfig::standard().with_due_soon_days(-1);
        assert!(matches!(
            negative_window.validate(),
            Err(SaleError::InvalidConfiguration { .. })
        ));

        let negative_tolerance = EngineConfig::standard().with_balance_tolerance(Money::from_major(-1));
        assert!(negative_tolerance.validate().is_err());

        assert!(EngineConfig::from_json("{ not json").is_err());
    }
}
