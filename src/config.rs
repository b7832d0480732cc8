// 7.0 config.rs: all settings in one place. tier ceilings, leverage cap, simulator params.
// 7.1 presets per environment at the bottom.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::{Amount, KycLevel, Leverage, RiskTier};

// Per-trade notional ceilings by KYC tier. None means unlimited.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeLimits {
    pub tier_1: Option<Amount>,
    pub tier_2: Option<Amount>,
    pub tier_3: Option<Amount>,
}

impl Default for TradeLimits {
    fn default() -> Self {
        Self {
            tier_1: Some(Amount::new(dec!(5_000))),
            tier_2: Some(Amount::new(dec!(50_000))),
            tier_3: None,
        }
    }
}

impl TradeLimits {
    pub fn ceiling(&self, level: KycLevel) -> Option<Amount> {
        match level {
            KycLevel::Tier1 => self.tier_1,
            KycLevel::Tier2 => self.tier_2,
            KycLevel::Tier3 => self.tier_3,
        }
    }
}

/** 7.2: random walk settings. volatility is the max fractional move per tick. */
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorParams {
    pub low_volatility: Decimal,
    pub medium_volatility: Decimal,
    pub high_volatility: Decimal,
    // chance a tick moves up. slightly above 0.5 for a bullish drift
    pub up_probability: f64,
    // full bid/ask width as a fraction of price
    pub spread_fraction: Decimal,
    // price never drops below this
    pub price_floor: Decimal,
    // decimal places kept on simulated prices
    pub price_dp: u32,
}

impl Default for SimulatorParams {
    fn default() -> Self {
        Self {
            low_volatility: dec!(0.002),
            medium_volatility: dec!(0.008),
            high_volatility: dec!(0.015),
            up_probability: 0.52,
            spread_fraction: dec!(0.005),
            price_floor: dec!(0.01),
            price_dp: 8,
        }
    }
}

impl SimulatorParams {
    pub fn volatility(&self, tier: RiskTier) -> Decimal {
        match tier {
            RiskTier::Low => self.low_volatility,
            RiskTier::Medium => self.medium_volatility,
            RiskTier::High => self.high_volatility,
        }
    }
}

// The complete engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub limits: TradeLimits,
    pub max_leverage: Leverage,
    pub simulator: SimulatorParams,
    // cadence of the periodic ticker
    pub tick_interval_ms: u64,
    // audit events retained in memory
    pub max_events: usize,
    // seeds the simulator rng. None draws from OS entropy
    pub rng_seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            limits: TradeLimits::default(),
            max_leverage: Leverage::new(10).unwrap_or(Leverage::one()),
            simulator: SimulatorParams::default(),
            tick_interval_ms: 2_500,
            max_events: 100_000,
            rng_seed: None,
        }
    }
}

impl EngineConfig {
    // Seeded and fast-ticking, for reproducible sessions
    pub fn sandbox(seed: u64) -> Self {
        Self {
            tick_interval_ms: 250,
            rng_seed: Some(seed),
            ..Self::default()
        }
    }

    // Lower ceilings and leverage cap
    pub fn production() -> Self {
        let mut config = Self::default();
        config.max_leverage = Leverage::new(5).unwrap_or(Leverage::one());
        config.limits.tier_1 = Some(Amount::new(dec!(2_500)));
        config.limits.tier_2 = Some(Amount::new(dec!(25_000)));
        config
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    // Validate the configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        let sim = &self.simulator;
        for (tier, vol) in [
            (RiskTier::Low, sim.low_volatility),
            (RiskTier::Medium, sim.medium_volatility),
            (RiskTier::High, sim.high_volatility),
        ] {
            if vol <= Decimal::ZERO || vol >= Decimal::ONE {
                return Err(ConfigError::InvalidSimulator {
                    reason: format!("{:?} volatility must be in (0, 1), got {}", tier, vol),
                });
            }
        }

        if !(0.0..=1.0).contains(&sim.up_probability) {
            return Err(ConfigError::InvalidSimulator {
                reason: format!("up probability must be in [0, 1], got {}", sim.up_probability),
            });
        }

        if sim.spread_fraction < Decimal::ZERO || sim.spread_fraction >= Decimal::ONE {
            return Err(ConfigError::InvalidSimulator {
                reason: "spread fraction must be in [0, 1)".to_string(),
            });
        }

        if sim.price_floor <= Decimal::ZERO {
            return Err(ConfigError::InvalidSimulator {
                reason: "price floor must be positive".to_string(),
            });
        }

        if self.tick_interval_ms == 0 {
            return Err(ConfigError::InvalidTicker);
        }

        // ceilings must not shrink as the tier goes up
        let tiers = [KycLevel::Tier1, KycLevel::Tier2, KycLevel::Tier3];
        for pair in tiers.windows(2) {
            let lower = self.limits.ceiling(pair[0]);
            let higher = self.limits.ceiling(pair[1]);
            let shrinks = match (lower, higher) {
                (Some(lo), Some(hi)) => hi < lo,
                (None, Some(_)) => true,
                _ => false,
            };
            if shrinks {
                return Err(ConfigError::InvalidLimits {
                    reason: format!("{} ceiling is below {}", pair[1], pair[0]),
                });
            }
        }

        for ceiling in [self.limits.tier_1, self.limits.tier_2, self.limits.tier_3].into_iter().flatten() {
            if !ceiling.is_positive() {
                return Err(ConfigError::InvalidLimits {
                    reason: "ceilings must be positive".to_string(),
                });
            }
        }

        Ok(())
    }
}

// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid simulator settings: {reason}")]
    InvalidSimulator { reason: String },

    #[error("invalid trade limits: {reason}")]
    InvalidLimits { reason: String },

    #[error("tick interval must be non-zero")]
    InvalidTicker,
}

// Environment presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Demo,
    Sandbox,
    Production,
}

impl Environment {
    pub fn config(&self) -> EngineConfig {
        match self {
            Environment::Demo => EngineConfig::default(),
            Environment::Sandbox => EngineConfig::sandbox(42),
            Environment::Production => EngineConfig::production(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tick_interval_ms, 2_500);
        assert_eq!(config.max_leverage.value(), 10);
    }

    #[test]
    fn test_default_tier_ceilings() {
        let limits = TradeLimits::default();
        assert_eq!(limits.ceiling(KycLevel::Tier1), Some(Amount::new(dec!(5000))));
        assert_eq!(limits.ceiling(KycLevel::Tier2), Some(Amount::new(dec!(50000))));
        assert_eq!(limits.ceiling(KycLevel::Tier3), None);
    }

    #[test]
    fn test_volatility_by_tier() {
        let params = SimulatorParams::default();
        assert_eq!(params.volatility(RiskTier::High), dec!(0.015));
        assert_eq!(params.volatility(RiskTier::Medium), dec!(0.008));
        assert_eq!(params.volatility(RiskTier::Low), dec!(0.002));
    }

    #[test]
    fn test_invalid_volatility() {
        let mut config = EngineConfig::default();
        config.simulator.high_volatility = Decimal::ZERO;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidSimulator { .. })));
    }

    #[test]
    fn test_invalid_probability() {
        let mut config = EngineConfig::default();
        config.simulator.up_probability = 1.5;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidSimulator { .. })));
    }

    #[test]
    fn test_shrinking_ceilings_rejected() {
        let mut config = EngineConfig::default();
        config.limits.tier_2 = Some(Amount::new(dec!(1000)));
        assert!(matches!(config.validate(), Err(ConfigError::InvalidLimits { .. })));

        let mut config = EngineConfig::default();
        config.limits.tier_2 = None;
        config.limits.tier_3 = Some(Amount::new(dec!(1_000_000)));
        assert!(matches!(config.validate(), Err(ConfigError::InvalidLimits { .. })));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut config = EngineConfig::default();
        config.tick_interval_ms = 0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidTicker));
    }

    #[test]
    fn test_environment_presets() {
        assert!(Environment::Demo.config().validate().is_ok());
        assert!(Environment::Sandbox.config().validate().is_ok());
        assert!(Environment::Production.config().validate().is_ok());
        assert_eq!(Environment::Sandbox.config().rng_seed, Some(42));
        assert_eq!(Environment::Production.config().max_leverage.value(), 5);
    }

    #[test]
    fn test_config_serialization() {
        let config = EngineConfig::sandbox(7);
        let json = serde_json::to_string(&config).unwrap();
        let back: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.rng_seed, Some(7));
        assert_eq!(back.limits.tier_1, config.limits.tier_1);
    }
}
