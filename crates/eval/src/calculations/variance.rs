//! Variance and period-over-period change calculations.

use super::support::{none_of, policy_of, ratio_with};
use crate::error::EngineError;
use crate::registry::Collection;
use tally_core::Unit;

pub(crate) fn register_all() -> Result<(), EngineError> {
    let variance = Collection::new("variance");

    // variance_amount = actual - expected
    variance.register("variance_amount", &["actual", "expected"], |args| {
        let pol = policy_of(args);
        let (actual, expected) = (&args[0], &args[1]);
        if actual.is_none() || expected.is_none() {
            let unit = if actual.is_none() {
                expected.unit().clone()
            } else {
                actual.unit().clone()
            };
            return Ok(none_of(unit, &pol));
        }
        actual.sub(expected)
    })?;

    // variance_ratio = (actual - expected) / expected
    variance.register("variance_ratio", &["actual", "expected"], |args| {
        let pol = policy_of(args);
        let (actual, expected) = (&args[0], &args[1]);
        if actual.is_none() || expected.is_none() {
            return Ok(none_of(Unit::Ratio, &pol));
        }
        Ok(ratio_with(actual.sub(expected)?.div(expected)?, &pol))
    })?;

    variance.register("variance_percentage", &["variance_ratio"], |args| {
        let pol = policy_of(args);
        if args[0].is_none() {
            return Ok(none_of(Unit::Percent, &pol));
        }
        Ok(args[0].as_percentage())
    })?;

    // percentage_change_ratio = (new - old) / old
    variance.register(
        "percentage_change_ratio",
        &["old_value", "new_value"],
        |args| {
            let pol = policy_of(args);
            let (old_value, new_value) = (&args[0], &args[1]);
            if old_value.is_none() || new_value.is_none() {
                return Ok(none_of(Unit::Ratio, &pol));
            }
            Ok(ratio_with(new_value.sub(old_value)?.div(old_value)?, &pol))
        },
    )?;

    variance.register("percentage_change", &["percentage_change_ratio"], |args| {
        let pol = policy_of(args);
        if args[0].is_none() {
            return Ok(none_of(Unit::Percent, &pol));
        }
        Ok(args[0].as_percentage())
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

    fn usd_ctx(entries: &[(&str, &str)]) -> Context {
        entries
            .iter()
            .map(|(k, v)| {
                (
                    k.to_string(),
                    Raw::Value(Value::of(*v, Unit::money("USD"))),
                )
            })
            .collect()
    }

    #[test]
    fn variance_amount_and_ratio() {
        let engine = Engine::new();
        let c = usd_ctx(&[("actual", "110"), ("expected", "100")]);
        let amount = engine.calculate("variance.variance_amount", &c).unwrap();
        assert_eq!(amount.amount(), Some(dec("10.00")));
        assert_eq!(amount.unit(), &Unit::money("USD"));

        let ratio = engine.calculate("variance.variance_ratio", &c).unwrap();
        assert_eq!(ratio.amount(), Some(dec("0.10")));
        assert_eq!(ratio.unit(), &Unit::Ratio);
    }

    #[test]
    fn zero_expected_is_none() {
        let engine = Engine::new();
        let c = usd_ctx(&[("actual", "110"), ("expected", "0")]);
        assert!(engine
            .calculate("variance.variance_ratio", &c)
            .unwrap()
            .is_none());
    }

    #[test]
    fn percentage_change_chain() {
        let engine = Engine::new();
        let c = usd_ctx(&[("old_value", "80"), ("new_value", "100")]);
        let pct = engine.calculate("variance.percentage_change", &c).unwrap();
        assert_eq!(pct.unit(), &Unit::Percent);
        assert_eq!(pct.amount_quantized(), Some(dec("25.00")));
    }

    #[test]
    fn none_actual_takes_expected_unit() {
        let engine = Engine::new();
        let mut c = usd_ctx(&[("expected", "100")]);
        c.insert(
            "actual".to_string(),
            Raw::Value(Value::none(Unit::money("USD"))),
        );
        let out = engine.calculate("variance.variance_amount", &c).unwrap();
        assert!(out.is_none());
        assert_eq!(out.unit(), &Unit::money("USD"));
    }
}
