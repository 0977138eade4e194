//! Immutable calculation and formatting policy.
//!
//! A policy bundles rounding behavior, display preferences, and the strict
//! toggles consulted by value arithmetic. Policies are shared by handle
//! (`Arc<Policy>`) and compared by a stable signature string; the signature
//! also feeds provenance hashing.

use std::sync::{Arc, OnceLock};

use rust_decimal::{Decimal, RoundingStrategy};

/// Rounding mode applied by [`Policy::quantize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    HalfUp,
    HalfEven,
    Down,
    Up,
    Ceiling,
    Floor,
}

impl Rounding {
    pub(crate) fn strategy(self) -> RoundingStrategy {
        match self {
            Rounding::HalfUp => RoundingStrategy::MidpointAwayFromZero,
            Rounding::HalfEven => RoundingStrategy::MidpointNearestEven,
            Rounding::Down => RoundingStrategy::ToZero,
            Rounding::Up => RoundingStrategy::AwayFromZero,
            Rounding::Ceiling => RoundingStrategy::ToPositiveInfinity,
            Rounding::Floor => RoundingStrategy::ToNegativeInfinity,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Rounding::HalfUp => "half_up",
            Rounding::HalfEven => "half_even",
            Rounding::Down => "down",
            Rounding::Up => "up",
            Rounding::Ceiling => "ceiling",
            Rounding::Floor => "floor",
        }
    }
}

/// Whether percent-unit values are rendered scaled by 100 or as raw ratios.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PercentDisplay {
    Percent,
    Ratio,
}

impl PercentDisplay {
    pub fn as_str(self) -> &'static str {
        match self {
            PercentDisplay::Percent => "percent",
            PercentDisplay::Ratio => "ratio",
        }
    }
}

/// Currency rendering style for the formatter collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrencyStyle {
    Symbol,
    Code,
}

/// Locale-aware display options. The core never interprets these beyond
/// carrying them; they are consumed by a [`crate::format::Formatter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayPolicy {
    pub locale: String,
    pub currency: Option<String>,
    pub min_fraction: Option<u32>,
    pub max_fraction: Option<u32>,
    pub grouping: bool,
    pub currency_style: CurrencyStyle,
    pub negative_parens: bool,
}

impl Default for DisplayPolicy {
    fn default() -> Self {
        DisplayPolicy {
            locale: "en_US".to_string(),
            currency: None,
            min_fraction: None,
            max_fraction: None,
            grouping: true,
            currency_style: CurrencyStyle::Symbol,
            negative_parens: false,
        }
    }
}

/// Maps a decimal-place count to a quantum step, e.g. 2 -> 0.01.
pub type QuantizerFn = fn(u32) -> Decimal;

/// The standard power-of-ten quantizer.
pub fn default_quantizer(places: u32) -> Decimal {
    Decimal::new(1, places)
}

/// Immutable configuration for value arithmetic and formatting.
#[derive(Debug, Clone, PartialEq)]
pub struct Policy {
    pub decimal_places: u32,
    pub rounding: Rounding,
    pub none_text: String,
    pub thousands_sep: bool,
    pub negative_parens: bool,
    pub percent_display: PercentDisplay,
    pub arithmetic_strict: bool,
    pub cap_percentage_at: Option<Decimal>,
    pub quantizer: QuantizerFn,
    pub display: Option<DisplayPolicy>,
}

impl Default for Policy {
    fn default() -> Self {
        Policy {
            decimal_places: 2,
            rounding: Rounding::HalfUp,
            none_text: "\u{2014}".to_string(),
            thousands_sep: true,
            negative_parens: false,
            percent_display: PercentDisplay::Percent,
            arithmetic_strict: false,
            cap_percentage_at: Some(Decimal::new(9_999_999, 2)),
            quantizer: default_quantizer,
            display: None,
        }
    }
}

impl Policy {
    /// Wrap in a shared handle.
    pub fn into_shared(self) -> Arc<Policy> {
        Arc::new(self)
    }

    /// Quantize an amount to this policy's step and rounding.
    ///
    /// Power-of-ten quantizers use direct decimal-place rounding. Arbitrary
    /// steps (e.g. 0.5) round to the nearest step; on overflow the input is
    /// returned unchanged.
    pub fn quantize(&self, d: Decimal) -> Decimal {
        let q = (self.quantizer)(self.decimal_places);
        let power_of_ten = default_quantizer(self.decimal_places);
        if q == power_of_ten {
            return d.round_dp_with_strategy(self.decimal_places, self.rounding.strategy());
        }
        if q.is_zero() {
            return d;
        }
        match d.checked_div(q) {
            Some(steps) => {
                let n = steps.round_dp_with_strategy(0, self.rounding.strategy());
                match n.checked_mul(q) {
                    Some(stepped) => stepped
                        .round_dp_with_strategy(self.decimal_places, self.rounding.strategy()),
                    None => d,
                }
            }
            None => d,
        }
    }

    /// Stable fingerprint over the enumerated fields. Two policies behave
    /// identically for arithmetic iff their signatures are equal; the
    /// signature is also hashed into provenance ids.
    pub fn signature(&self) -> String {
        let cap = match &self.cap_percentage_at {
            Some(c) => c.normalize().to_string(),
            None => "none".to_string(),
        };
        let display = match &self.display {
            Some(d) => format!(
                "{}:{}:{}",
                d.locale,
                d.currency.as_deref().unwrap_or("-"),
                d.grouping
            ),
            None => "none".to_string(),
        };
        format!(
            "cap:{}|display:{}|dp:{}|negparens:{}|nonetext:{}|pctdisplay:{}|rounding:{}|strict:{}|thousands:{}",
            cap,
            display,
            self.decimal_places,
            self.negative_parens,
            self.none_text,
            self.percent_display.as_str(),
            self.rounding.as_str(),
            self.arithmetic_strict,
            self.thousands_sep,
        )
    }
}

/// The process-wide default policy handle.
pub fn default_policy() -> Arc<Policy> {
    static DEFAULT: OnceLock<Arc<Policy>> = OnceLock::new();
    DEFAULT.get_or_init(|| Arc::new(Policy::default())).clone()
}
