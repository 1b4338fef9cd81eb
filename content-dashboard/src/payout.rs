use crate::aggregator::RateResolver;
use crate::types::{BoundaryError, DashboardError, Money, PreferenceStore, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::{debug, info, warn};

pub const DEFAULT_PAYOUT_RATE: Money = Money::from_minor(100_00);

/// Preference key the overrides are saved under.
pub const PAYOUT_RATES_KEY: &str = "payoutRates";

/// Global default rate plus per-author overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutRates {
    default_rate: Money,
    #[serde(default)]
    overrides: BTreeMap<String, Money>,
}

impl Default for PayoutRates {
    fn default() -> Self {
        Self::new(DEFAULT_PAYOUT_RATE)
    }
}

impl PayoutRates {
    pub fn new(default_rate: Money) -> Self {
        Self {
            default_rate,
            overrides: BTreeMap::new(),
        }
    }

    pub fn default_rate(&self) -> Money {
        self.default_rate
    }

    pub fn set_default_rate(&mut self, rate: Money) {
        debug!("Default payout rate {} -> {}", self.default_rate, rate);
        self.default_rate = rate;
    }

    pub fn set_override(&mut self, author: impl Into<String>, rate: Money) {
        let author = author.into();
        debug!("Payout override for {}: {}", author, rate);
        self.overrides.insert(author, rate);
    }

    pub fn clear_override(&mut self, author: &str) -> Option<Money> {
        self.overrides.remove(author)
    }

    pub fn override_for(&self, author: &str) -> Option<Money> {
        self.overrides.get(author).copied()
    }

    pub fn overrides(&self) -> &BTreeMap<String, Money> {
        &self.overrides
    }

    /// Drop every override and restore `default_rate`.
    pub fn reset(&mut self, default_rate: Money) {
        self.default_rate = default_rate;
        self.overrides.clear();
    }

    /// Load saved rates, falling back to `fallback_default` with no overrides
    /// when nothing usable is stored.
    pub fn load<P: PreferenceStore + ?Sized>(store: &P, fallback_default: Money) -> Result<Self> {
        let raw = match store.load(PAYOUT_RATES_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Ok(Self::new(fallback_default)),
            Err(BoundaryError::Storage(message)) => {
                warn!("Ignoring unreadable preference store for payout rates: {}", message);
                return Ok(Self::new(fallback_default));
            }
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str::<PayoutRates>(&raw) {
            Ok(rates) => {
                info!("Loaded payout rates with {} overrides", rates.overrides.len());
                Ok(rates)
            }
            Err(e) => {
                warn!("Ignoring unreadable saved payout rates: {}", e);
                Ok(Self::new(fallback_default))
            }
        }
    }

    pub fn save<P: PreferenceStore + ?Sized>(&self, store: &P) -> Result<()> {
        let raw = serde_json::to_string(self)?;
        store.save(PAYOUT_RATES_KEY, &raw)?;
        debug!("Saved payout rates ({} overrides)", self.overrides.len());
        Ok(())
    }
}

impl RateResolver for PayoutRates {
    fn effective_rate(&self, author: &str) -> Money {
        self.override_for(author).unwrap_or(self.default_rate)
    }
}

/// One action against the saved payout rates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateCommand {
    Show,
    Set { author: String, rate: Money },
    Clear { author: String },
    Default(Money),
}

impl RateCommand {
    /// Load the saved rates and apply the command. Only changes are written
    /// back, so showing never replaces what is stored.
    pub fn run<P: PreferenceStore + ?Sized>(self, store: &P, fallback_default: Money) -> Result<PayoutRates> {
        let mut rates = PayoutRates::load(store, fallback_default)?;
        match self {
            RateCommand::Show => return Ok(rates),
            RateCommand::Set { author, rate } => rates.set_override(author, rate),
            RateCommand::Clear { author } => {
                if rates.clear_override(&author).is_none() {
                    info!("No override set for {}", author);
                }
            }
            RateCommand::Default(rate) => rates.set_default_rate(rate),
        }
        rates.save(store)?;
        Ok(rates)
    }
}

/// Validation for rates typed by a user. Nothing negative or non-numeric
/// gets past here; accepted rates keep every digit that was typed.
pub struct RateInput;

impl RateInput {
    pub fn parse(raw: &str) -> Result<Money> {
        Money::from_decimal(Self::parse_number(raw)?).ok_or_else(|| invalid(raw))
    }

    /// Like [`RateInput::parse`] but negative amounts become zero.
    pub fn parse_clamped(raw: &str) -> Result<Money> {
        let amount = Self::parse_number(raw)?;
        Ok(Money::from_decimal(amount.max(Decimal::ZERO)).unwrap_or(Money::ZERO))
    }

    pub fn from_major(amount: f64) -> Result<Money> {
        Money::from_major(amount).ok_or_else(|| invalid(&amount.to_string()))
    }

    fn parse_number(raw: &str) -> Result<Decimal> {
        Decimal::from_str(raw.trim()).map_err(|_| invalid(raw))
    }
}

fn invalid(raw: &str) -> DashboardError {
    DashboardError::InvalidRate {
        input: raw.to_string(),
    }
}
