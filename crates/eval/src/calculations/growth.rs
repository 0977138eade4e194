//! Growth-rate calculations.

use rust_decimal::{Decimal, MathematicalOps};

use super::support::{none_of, policy_of, ratio_with};
use crate::error::EngineError;
use crate::registry::Collection;
use tally_core::{Unit, Value, ValueError};

pub(crate) fn register_all() -> Result<(), EngineError> {
    let growth = Collection::new("growth");

    // simple_growth_rate = (final - initial) / initial
    growth.register(
        "simple_growth_rate",
        &["initial_value", "final_value"],
        |args| {
            let pol = policy_of(args);
            let (initial, final_value) = (&args[0], &args[1]);
            if initial.is_none() || final_value.is_none() {
                return Ok(none_of(Unit::Ratio, &pol));
            }
            Ok(ratio_with(final_value.sub(initial)?.div(initial)?, &pol))
        },
    )?;

    // compound_growth_rate = (final / initial)^(1/periods) - 1
    //
    // Defined for strictly positive initial, final, and periods. The root
    // is taken with decimal powd, never through binary floats.
    growth.register(
        "compound_growth_rate",
        &["initial_value", "final_value", "periods"],
        |args| {
            let pol = policy_of(args);
            let (initial, final_value, periods) = (&args[0], &args[1], &args[2]);
            if initial.is_none() || final_value.is_none() || periods.is_none() {
                return Ok(none_of(Unit::Ratio, &pol));
            }
            let (Some(i), Some(f), Some(n)) =
                (initial.amount(), final_value.amount(), periods.amount())
            else {
                return Ok(none_of(Unit::Ratio, &pol));
            };
            if i <= Decimal::ZERO || f <= Decimal::ZERO || n <= Decimal::ZERO {
                if pol.arithmetic_strict {
                    return Err(ValueError::Undefined {
                        message: "compound growth requires positive initial, final, and periods"
                            .to_string(),
                    });
                }
                return Ok(none_of(Unit::Ratio, &pol));
            }
            let factor = match (f.checked_div(i), Decimal::ONE.checked_div(n)) {
                (Some(quotient), Some(exponent)) => quotient.checked_powd(exponent),
                _ => None,
            };
            match factor {
                Some(factor) => {
                    let cagr = factor - Decimal::ONE;
                    Ok(Value::of_with(cagr, Unit::Ratio, pol))
                }
                None => {
                    if pol.arithmetic_strict {
                        return Err(ValueError::Undefined {
                            message: "compound growth computation overflowed".to_string(),
                        });
                    }
                    Ok(none_of(Unit::Ratio, &pol))
                }
            }
        },
    )?;

    growth.register(
        "compound_growth_rate_percent",
        &["compound_growth_rate"],
        |args| {
            let pol = policy_of(args);
            if args[0].is_none() {
                return Ok(none_of(Unit::Percent, &pol));
            }
            Ok(args[0].as_percentage())
        },
    )?;

    Ok(())
}
