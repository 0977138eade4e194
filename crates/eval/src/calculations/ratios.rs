//! General ratio and percentage calculations.

use super::support::{none_of, policy_of, ratio_with};
use crate::error::EngineError;
use crate::registry::Collection;
use tally_core::{Unit, Value};

pub(crate) fn register_all() -> Result<(), EngineError> {
    let ratios = Collection::new("ratios");

    // ratio = numerator / denominator
    ratios.register("ratio", &["numerator", "denominator"], |args| {
        let pol = policy_of(args);
        let (numerator, denominator) = (&args[0], &args[1]);
        if numerator.is_none() || denominator.is_none() {
            return Ok(none_of(Unit::Ratio, &pol));
        }
        Ok(ratio_with(numerator.div(denominator)?, &pol))
    })?;

    // percentage_of_total = part / total, as Percent. A non-positive
    // total reports zero percent rather than none.
    ratios.register("percentage_of_total", &["part", "total"], |args| {
        let pol = policy_of(args);
        let (part, total) = (&args[0], &args[1]);
        if part.is_none() || total.is_none() {
            return Ok(none_of(Unit::Percent, &pol));
        }
        if total.is_negative() || total.is_zero() {
            return Ok(Value::zero(Unit::Ratio)
                .with_policy(pol)
                .as_percentage());
        }
        Ok(ratio_with(part.div(total)?, &pol).as_percentage())
    })?;

    ratios.register("ratio_to_percentage", &["ratio"], |args| {
        let pol = policy_of(args);
        if args[0].is_none() {
            return Ok(none_of(Unit::Percent, &pol));
        }
        Ok(args[0].as_percentage())
    })?;

    ratios.register("percentage_to_ratio", &["percentage"], |args| {
        let pol = policy_of(args);
        if args[0].is_none() {
            return Ok(none_of(Unit::Ratio, &pol));
        }
        Ok(ratio_with(args[0].clone(), &pol))
    })?;

    // cap_percentage = min(percentage, max_percentage)
    ratios.register("cap_percentage", &["percentage", "max_percentage"], |args| {
        let pol = policy_of(args);
        let (percentage, max_percentage) = (&args[0], &args[1]);
        if percentage.is_none() || max_percentage.is_none() {
            return Ok(none_of(Unit::Percent, &pol));
        }
        let capped = if percentage <= max_percentage {
            percentage.clone()
        } else {
            max_percentage.clone()
        };
        Ok(capped.with_policy(pol))
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::engine::{Context, Engine};
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use tally_core::{Raw, Unit, Value};

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn ctx(entries: &[(&str, &str)]) -> Context {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), Raw::Text(v.to_string())))
            .collect()
    }

    #[test]
    fn plain_ratio() {
        let engine = Engine::new();
        let c = ctx(&[("numerator", "3"), ("denominator", "4")]);
        let out = engine.calculate("ratios.ratio", &c).unwrap();
        assert_eq!(out.amount(), Some(dec("0.75")));
        assert_eq!(out.unit(), &Unit::Ratio);
    }

    #[test]
    fn percentage_of_total_zero_total_is_zero_percent() {
        let engine = Engine::new();
        let c = ctx(&[("part", "5"), ("total", "0")]);
        let out = engine.calculate("ratios.percentage_of_total", &c).unwrap();
        assert_eq!(out.unit(), &Unit::Percent);
        assert_eq!(out.amount(), Some(dec("0")));
    }

    #[test]
    fn percent_ratio_converters_round_trip() {
        let engine = Engine::new();
        let mut c = Context::new();
        c.insert(
            "ratio".to_string(),
            Raw::Value(Value::of("0.4", Unit::Ratio)),
        );
        let pct = engine.calculate("ratios.ratio_to_percentage", &c).unwrap();
        assert_eq!(pct.unit(), &Unit::Percent);

        let mut c2 = Context::new();
        c2.insert("percentage".to_string(), Raw::Value(pct));
        let back = engine.calculate("ratios.percentage_to_ratio", &c2).unwrap();
        assert_eq!(back.unit(), &Unit::Ratio);
        assert_eq!(back.amount(), Some(dec("0.4")));
    }

    #[test]
    fn cap_percentage_takes_the_smaller() {
        let engine = Engine::new();
        let mut c = Context::new();
        c.insert(
            "percentage".to_string(),
            Raw::Value(Value::of("1.5", Unit::Percent)),
        );
        c.insert(
            "max_percentage".to_string(),
            Raw::Value(Value::of("1.0", Unit::Percent)),
        );
        let out = engine.calculate("ratios.cap_percentage", &c).unwrap();
        assert_eq!(out.amount(), Some(dec("1.0")));
    }
}
