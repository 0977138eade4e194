//! Profit, margin, and return calculations.

use super::support::{negative_sales, none_of, policy_of, ratio_with};
use crate::error::EngineError;
use crate::registry::Collection;
use tally_core::Unit;

pub(crate) fn register_all() -> Result<(), EngineError> {
    let profitability = Collection::new("profitability");

    // gross_profit = sales - cost
    profitability.register("gross_profit", &["sales", "cost"], |args| {
        let pol = policy_of(args);
        let (sales, cost) = (&args[0], &args[1]);
        if sales.is_none() || cost.is_none() || negative_sales(sales) {
            return Ok(none_of(sales.unit().clone(), &pol));
        }
        sales.sub(cost)
    })?;

    // gross_margin_ratio = gross_profit / sales
    profitability.register("gross_margin_ratio", &["gross_profit", "sales"], |args| {
        let pol = policy_of(args);
        let (gross_profit, sales) = (&args[0], &args[1]);
        if gross_profit.is_none() || sales.is_none() || negative_sales(sales) {
            return Ok(none_of(Unit::Ratio, &pol));
        }
        Ok(ratio_with(gross_profit.div(sales)?, &pol))
    })?;

    profitability.register("gross_margin_percentage", &["gross_margin_ratio"], |args| {
        let pol = policy_of(args);
        if args[0].is_none() {
            return Ok(none_of(Unit::Percent, &pol));
        }
        Ok(args[0].as_percentage())
    })?;

    // net_profit = revenue - total_costs
    profitability.register("net_profit", &["revenue", "total_costs"], |args| {
        let pol = policy_of(args);
        let (revenue, total_costs) = (&args[0], &args[1]);
        if revenue.is_none() || total_costs.is_none() {
            return Ok(none_of(revenue.unit().clone(), &pol));
        }
        revenue.sub(total_costs)
    })?;

    // net_margin_ratio = net_profit / revenue
    profitability.register("net_margin_ratio", &["net_profit", "revenue"], |args| {
        let pol = policy_of(args);
        let (net_profit, revenue) = (&args[0], &args[1]);
        if net_profit.is_none() || revenue.is_none() {
            return Ok(none_of(Unit::Ratio, &pol));
        }
        Ok(ratio_with(net_profit.div(revenue)?, &pol))
    })?;

    profitability.register("net_margin_percentage", &["net_margin_ratio"], |args| {
        let pol = policy_of(args);
        if args[0].is_none() {
            return Ok(none_of(Unit::Percent, &pol));
        }
        Ok(args[0].as_percentage())
    })?;

    // cost_ratio = cost / sales
    profitability.register("cost_ratio", &["cost", "sales"], |args| {
        let pol = policy_of(args);
        let (cost, sales) = (&args[0], &args[1]);
        if cost.is_none() || sales.is_none() || negative_sales(sales) {
            return Ok(none_of(Unit::Ratio, &pol));
        }
        Ok(ratio_with(cost.div(sales)?, &pol))
    })?;

    profitability.register("cost_percentage", &["cost_ratio"], |args| {
        let pol = policy_of(args);
        if args[0].is_none() {
            return Ok(none_of(Unit::Percent, &pol));
        }
        Ok(args[0].as_percentage())
    })?;

    // contribution_margin = revenue - variable_costs
    profitability.register(
        "contribution_margin",
        &["revenue", "variable_costs"],
        |args| {
            let pol = policy_of(args);
            let (revenue, variable_costs) = (&args[0], &args[1]);
            if revenue.is_none() || variable_costs.is_none() {
                return Ok(none_of(revenue.unit().clone(), &pol));
            }
            revenue.sub(variable_costs)
        },
    )?;

    // operating_margin_ratio = operating_income / revenue
    profitability.register(
        "operating_margin_ratio",
        &["operating_income", "revenue"],
        |args| {
            let pol = policy_of(args);
            let (operating_income, revenue) = (&args[0], &args[1]);
            if operating_income.is_none() || revenue.is_none() {
                return Ok(none_of(Unit::Ratio, &pol));
            }
            Ok(ratio_with(operating_income.div(revenue)?, &pol))
        },
    )?;

    // roi_ratio = (gain_from_investment - cost_of_investment) / cost_of_investment
    profitability.register(
        "roi_ratio",
        &["gain_from_investment", "cost_of_investment"],
        |args| {
            let pol = policy_of(args);
            let (gain, cost) = (&args[0], &args[1]);
            if gain.is_none() || cost.is_none() {
                return Ok(none_of(Unit::Ratio, &pol));
            }
            Ok(ratio_with(gain.sub(cost)?.div(cost)?, &pol))
        },
    )?;

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
    fn margin_chain_from_leaves() {
        let engine = Engine::new();
        let c = usd_ctx(&[("sales", "1000"), ("cost", "650")]);

        let gp = engine.calculate("profitability.gross_profit", &c).unwrap();
        assert_eq!(gp.amount(), Some(dec("350.00")));
        assert_eq!(gp.unit(), &Unit::money("USD"));

        let ratio = engine
            .calculate("profitability.gross_margin_ratio", &c)
            .unwrap();
        assert_eq!(ratio.amount(), Some(dec("0.35")));
        assert_eq!(ratio.unit(), &Unit::Ratio);

        let pct = engine
            .calculate("profitability.gross_margin_percentage", &c)
            .unwrap();
        assert_eq!(pct.unit(), &Unit::Percent);
        assert_eq!(pct.amount_quantized(), Some(dec("35.00")));
    }

    #[test]
    fn zero_sales_margin_is_none() {
        let engine = Engine::new();
        let c = usd_ctx(&[("sales", "0"), ("cost", "10")]);
        assert!(engine
            .calculate("profitability.gross_margin_ratio", &c)
            .unwrap()
            .is_none());
    }

    #[test]
    fn roi_ratio_formula() {
        let engine = Engine::new();
        let c = usd_ctx(&[("gain_from_investment", "1200"), ("cost_of_investment", "1000")]);
        let roi = engine.calculate("profitability.roi_ratio", &c).unwrap();
        assert_eq!(roi.amount(), Some(dec("0.20")));
    }

    #[test]
    fn none_inputs_give_ratio_unit_nones() {
        let engine = Engine::new();
        let mut c = usd_ctx(&[("net_profit", "10")]);
        c.insert(
            "revenue".to_string(),
            Raw::Value(Value::none(Unit::money("USD"))),
        );
        let out = engine
            .calculate("profitability.net_margin_ratio", &c)
            .unwrap();
        assert!(out.is_none());
        assert_eq!(out.unit(), &Unit::Ratio);
    }
}
