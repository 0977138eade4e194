//! Value rendering and the formatter collaborator seam.
//!
//! The core renders plain en-US-style output itself; locale-aware display
//! is delegated through the [`Formatter`] trait, driven by the policy's
//! optional [`DisplayPolicy`].

use rust_decimal::Decimal;

use crate::policy::{CurrencyStyle, DisplayPolicy, PercentDisplay};
use crate::units::Unit;
use crate::value::Value;

/// External display collaborator. Given an amount, unit, and display
/// policy, produce a rendered string.
pub trait Formatter {
    fn money(&self, amount: Decimal, unit: &Unit, display: &DisplayPolicy) -> String;
    fn number(&self, amount: Decimal, display: &DisplayPolicy) -> String;
    /// Receives the raw ratio; scaling by 100 is the formatter's job.
    fn percent(&self, ratio: Decimal, display: &DisplayPolicy) -> String;
}

/// Plain formatter with comma grouping and a small symbol table.
#[derive(Debug, Default, Clone, Copy)]
pub struct BasicFormatter;

impl BasicFormatter {
    fn fraction_digits(display: &DisplayPolicy) -> u32 {
        display.max_fraction.or(display.min_fraction).unwrap_or(2)
    }

    fn symbol(code: &str) -> Option<&'static str> {
        match code {
            "USD" => Some("$"),
            "EUR" => Some("\u{20ac}"),
            "GBP" => Some("\u{a3}"),
            "JPY" => Some("\u{a5}"),
            _ => None,
        }
    }
}

impl Formatter for BasicFormatter {
    fn money(&self, amount: Decimal, unit: &Unit, display: &DisplayPolicy) -> String {
        let digits = Self::fraction_digits(display);
        let body = fixed(amount.abs(), digits, display.grouping);
        let code = display
            .currency
            .as_deref()
            .or_else(|| unit.code())
            .unwrap_or("");
        let labelled = if code.is_empty() {
            body
        } else {
            match display.currency_style {
                CurrencyStyle::Symbol => match Self::symbol(code) {
                    Some(sym) => format!("{}{}", sym, body),
                    None => format!("{} {}", code, body),
                },
                CurrencyStyle::Code => format!("{} {}", code, body),
            }
        };
        signed(labelled, amount.is_sign_negative(), display.negative_parens)
    }

    fn number(&self, amount: Decimal, display: &DisplayPolicy) -> String {
        let digits = Self::fraction_digits(display);
        let body = fixed(amount.abs(), digits, display.grouping);
        signed(body, amount.is_sign_negative(), display.negative_parens)
    }

    fn percent(&self, ratio: Decimal, display: &DisplayPolicy) -> String {
        let digits = Self::fraction_digits(display);
        let scaled = ratio * Decimal::ONE_HUNDRED;
        let body = fixed(scaled.abs(), digits, false);
        format!(
            "{}%",
            signed(body, scaled.is_sign_negative(), display.negative_parens)
        )
    }
}

/// Render a value: through the formatter seam when the policy carries a
/// display policy, else in the plain policy-driven style. Used by the
/// `Display` impl on [`Value`].
pub fn render(value: &Value) -> String {
    match &value.policy().display {
        Some(_) => render_with(value, &BasicFormatter),
        None => render_plain(value),
    }
}

/// Render through an injected formatter, defaulting the display policy
/// when the value's policy carries none.
pub fn render_with(value: &Value, formatter: &dyn Formatter) -> String {
    let Some(raw) = value.amount() else {
        return value.policy().none_text.clone();
    };
    let default_display;
    let display = match &value.policy().display {
        Some(d) => d,
        None => {
            default_display = DisplayPolicy::default();
            &default_display
        }
    };
    match value.unit() {
        Unit::Money { .. } => formatter.money(quantized_or(value, raw), value.unit(), display),
        Unit::Percent => formatter.percent(raw, display),
        _ => formatter.number(quantized_or(value, raw), display),
    }
}

fn quantized_or(value: &Value, raw: Decimal) -> Decimal {
    match value.unit() {
        // The formatter scales percents itself; everything else gets the
        // policy-rounded amount.
        Unit::Percent => raw,
        _ => value.policy().quantize(raw),
    }
}

fn render_plain(value: &Value) -> String {
    let policy = value.policy();
    let Some(d) = value.amount_quantized() else {
        return policy.none_text.clone();
    };
    if value.unit() == &Unit::Percent && policy.percent_display == PercentDisplay::Percent {
        return format!("{}%", fixed(d, policy.decimal_places, false));
    }
    let body = fixed(d.abs(), policy.decimal_places, policy.thousands_sep);
    signed(body, d.is_sign_negative(), policy.negative_parens)
}

fn signed(body: String, negative: bool, parens: bool) -> String {
    if !negative {
        body
    } else if parens {
        format!("({})", body)
    } else {
        format!("-{}", body)
    }
}

/// Fixed-point rendering with optional comma grouping.
fn fixed(amount: Decimal, digits: u32, grouping: bool) -> String {
    let mut scaled = amount.round_dp(digits);
    // Ensure trailing zeros out to the requested digits.
    if scaled.scale() < digits {
        scaled.rescale(digits);
    }
    let text = scaled.to_string();
    if !grouping {
        return text;
    }
    let (int_part, frac_part) = match text.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (text.as_str(), None),
    };
    let grouped = group_thousands(int_part);
    match frac_part {
        Some(f) => format!("{}.{}", grouped, f),
        None => grouped,
    }
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    let chars: Vec<char> = digits.chars().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(*c);
    }
    out
}
