//! Pricing, tax, markup, and discount calculations.

use super::support::{negative_sales, none_of, one, policy_of, ratio_with};
use crate::error::EngineError;
use crate::registry::Collection;
use tally_core::Unit;

pub(crate) fn register_all() -> Result<(), EngineError> {
    let pricing = Collection::new("pricing");

    // total_cost = unit_cost * quantity
    pricing.register("total_cost", &["unit_cost", "quantity"], |args| {
        let pol = policy_of(args);
        let (unit_cost, quantity) = (&args[0], &args[1]);
        if unit_cost.is_none() || quantity.is_none() {
            return Ok(none_of(unit_cost.unit().clone(), &pol));
        }
        unit_cost.mul(quantity)
    })?;

    // sales_ex_tax = sales / (1 + tax_rate)
    pricing.register("sales_ex_tax", &["sales", "tax_rate"], |args| {
        let pol = policy_of(args);
        let (sales, tax_rate) = (&args[0], &args[1]);
        if sales.is_none() || tax_rate.is_none() || negative_sales(sales) {
            return Ok(none_of(sales.unit().clone(), &pol));
        }
        let denom = one(&pol).add(tax_rate)?;
        sales.div(&denom)
    })?;

    // sales_with_tax = sales_ex_tax * (1 + tax_rate)
    pricing.register("sales_with_tax", &["sales_ex_tax", "tax_rate"], |args| {
        let pol = policy_of(args);
        let (sales_ex_tax, tax_rate) = (&args[0], &args[1]);
        if sales_ex_tax.is_none() || tax_rate.is_none() || negative_sales(sales_ex_tax) {
            return Ok(none_of(sales_ex_tax.unit().clone(), &pol));
        }
        sales_ex_tax.mul(&one(&pol).add(tax_rate)?)
    })?;

    // tax_amount = sales - sales / (1 + tax_rate)
    pricing.register("tax_amount", &["sales", "tax_rate"], |args| {
        let pol = policy_of(args);
        let (sales, tax_rate) = (&args[0], &args[1]);
        if sales.is_none() || tax_rate.is_none() || negative_sales(sales) {
            return Ok(none_of(sales.unit().clone(), &pol));
        }
        let ex_tax = sales.div(&one(&pol).add(tax_rate)?)?;
        sales.sub(&ex_tax)
    })?;

    // price_ex_tax = price_inc_tax / (1 + tax_rate)
    pricing.register("price_ex_tax", &["price_inc_tax", "tax_rate"], |args| {
        let pol = policy_of(args);
        let (price_inc_tax, tax_rate) = (&args[0], &args[1]);
        if price_inc_tax.is_none() || tax_rate.is_none() {
            return Ok(none_of(price_inc_tax.unit().clone(), &pol));
        }
        price_inc_tax.div(&one(&pol).add(tax_rate)?)
    })?;

    // markup_ratio = (selling_price - cost) / cost
    pricing.register("markup_ratio", &["cost", "selling_price"], |args| {
        let pol = policy_of(args);
        let (cost, selling_price) = (&args[0], &args[1]);
        if cost.is_none() || selling_price.is_none() {
            return Ok(none_of(Unit::Ratio, &pol));
        }
        let markup = selling_price.sub(cost)?.div(cost)?;
        Ok(ratio_with(markup, &pol))
    })?;

    pricing.register("markup_percentage", &["markup_ratio"], |args| {
        let pol = policy_of(args);
        if args[0].is_none() {
            return Ok(none_of(Unit::Percent, &pol));
        }
        Ok(args[0].as_percentage())
    })?;

    // discount_ratio = (original_price - discounted_price) / original_price
    pricing.register(
        "discount_ratio",
        &["original_price", "discounted_price"],
        |args| {
            let pol = policy_of(args);
            let (original, discounted) = (&args[0], &args[1]);
            if original.is_none() || discounted.is_none() {
                return Ok(none_of(Unit::Ratio, &pol));
            }
            let discount = original.sub(discounted)?.div(original)?;
            Ok(ratio_with(discount, &pol))
        },
    )?;

    pricing.register("discount_percentage", &["discount_ratio"], |args| {
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

    fn ctx(entries: &[(&str, &str)]) -> Context {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), Raw::Text(v.to_string())))
            .collect()
    }

    #[test]
    fn total_cost_multiplies() {
        let engine = Engine::new();
        let mut c = Context::new();
        c.insert(
            "unit_cost".to_string(),
            Raw::Value(Value::of("2.50", Unit::money("USD"))),
        );
        c.insert("quantity".to_string(), Raw::Int(4));
        let out = engine.calculate("pricing.total_cost", &c).unwrap();
        assert_eq!(out.amount(), Some(dec("10.00")));
        assert_eq!(out.unit(), &Unit::money("USD"));
    }

    #[test]
    fn tax_chain() {
        let engine = Engine::new();
        let mut c = ctx(&[("sales", "110")]);
        c.insert(
            "tax_rate".to_string(),
            Raw::Value(Value::of("0.10", Unit::Percent)),
        );
        let ex = engine.calculate("pricing.sales_ex_tax", &c).unwrap();
        assert_eq!(ex.amount(), Some(dec("100.00")));
        let tax = engine.calculate("pricing.tax_amount", &c).unwrap();
        assert_eq!(tax.amount(), Some(dec("10.00")));
    }

    #[test]
    fn negative_sales_collapse_to_none() {
        let engine = Engine::new();
        let mut c = ctx(&[("sales", "-5")]);
        c.insert(
            "tax_rate".to_string(),
            Raw::Value(Value::of("0.10", Unit::Percent)),
        );
        assert!(engine.calculate("pricing.sales_ex_tax", &c).unwrap().is_none());
    }

    #[test]
    fn markup_and_discount() {
        let engine = Engine::new();
        let c = ctx(&[("cost", "80"), ("selling_price", "100")]);
        let markup = engine.calculate("pricing.markup_ratio", &c).unwrap();
        assert_eq!(markup.amount(), Some(dec("0.25")));
        assert_eq!(markup.unit(), &Unit::Ratio);
        let pct = engine.calculate("pricing.markup_percentage", &c).unwrap();
        assert_eq!(pct.unit(), &Unit::Percent);
        assert_eq!(pct.amount(), Some(dec("0.25")));

        let c2 = ctx(&[("original_price", "100"), ("discounted_price", "75")]);
        let discount = engine.calculate("pricing.discount_ratio", &c2).unwrap();
        assert_eq!(discount.amount(), Some(dec("0.25")));
    }

    #[test]
    fn zero_cost_markup_is_none() {
        let engine = Engine::new();
        let c = ctx(&[("cost", "0"), ("selling_price", "100")]);
        assert!(engine.calculate("pricing.markup_ratio", &c).unwrap().is_none());
    }
}
