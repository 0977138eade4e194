//! The immutable policy-aware value.
//!
//! A [`Value`] is a triple of decimal amount (or none), unit tag, and policy
//! handle, plus an optional provenance node. Instances never mutate;
//! arithmetic returns new values. A none amount is ordinary data, not an
//! error: in the default modes it propagates through arithmetic, and only
//! the strict modes surface [`ValueError`]s.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;

use crate::context::{active_nulls, active_policy, active_resolution, PolicyResolution};
use crate::conversion::{self, ConversionContext};
use crate::error::ValueError;
use crate::null::NullBinaryMode;
use crate::policy::{default_policy, PercentDisplay, Policy};
use crate::provenance::{self, ProvNode};
use crate::units::{add_sub_unit, div_unit, mul_unit, Unit};

// ── Raw inputs ───────────────────────────────────────────────────────

/// Caller-supplied raw input, lifted into a [`Value`] by constructors and
/// the calculation engine.
#[derive(Debug, Clone)]
pub enum Raw {
    Int(i64),
    Decimal(Decimal),
    Text(String),
    Value(Value),
    None,
}

impl Raw {
    /// Lenient coercion: unparseable text becomes a none amount.
    pub(crate) fn coerce_lenient(&self) -> Option<Decimal> {
        match self {
            Raw::None => None,
            Raw::Int(i) => Some(Decimal::from(*i)),
            Raw::Decimal(d) => Some(*d),
            Raw::Value(v) => v.amount(),
            Raw::Text(s) => Decimal::from_str(s.trim()).ok(),
        }
    }

    /// Mode-aware coercion: unparseable text is an error when the active
    /// binary null mode is raise.
    pub(crate) fn coerce(&self) -> Result<Option<Decimal>, ValueError> {
        match self {
            Raw::Text(s) => match Decimal::from_str(s.trim()) {
                Ok(d) => Ok(Some(d)),
                Err(_) => {
                    if active_nulls().binary == NullBinaryMode::Raise {
                        Err(ValueError::InvalidLiteral {
                            literal: s.clone(),
                        })
                    } else {
                        Ok(None)
                    }
                }
            },
            other => Ok(other.coerce_lenient()),
        }
    }

}

impl From<i64> for Raw {
    fn from(v: i64) -> Raw {
        Raw::Int(v)
    }
}

impl From<i32> for Raw {
    fn from(v: i32) -> Raw {
        Raw::Int(v as i64)
    }
}

impl From<Decimal> for Raw {
    fn from(v: Decimal) -> Raw {
        Raw::Decimal(v)
    }
}

impl From<&str> for Raw {
    fn from(v: &str) -> Raw {
        Raw::Text(v.to_string())
    }
}

impl From<String> for Raw {
    fn from(v: String) -> Raw {
        Raw::Text(v)
    }
}

impl From<Value> for Raw {
    fn from(v: Value) -> Raw {
        Raw::Value(v)
    }
}

impl From<Option<Decimal>> for Raw {
    fn from(v: Option<Decimal>) -> Raw {
        match v {
            Some(d) => Raw::Decimal(d),
            None => Raw::None,
        }
    }
}

// ── Value ────────────────────────────────────────────────────────────

/// Immutable (amount, unit, policy) triple with optional provenance.
#[derive(Debug, Clone)]
pub struct Value {
    amount: Option<Decimal>,
    unit: Unit,
    policy: Arc<Policy>,
    prov: Option<Arc<ProvNode>>,
}

impl Value {
    /// Construct from a raw input under the ambient policy. Unparseable
    /// text becomes a none-Value.
    pub fn of(raw: impl Into<Raw>, unit: Unit) -> Value {
        Value::of_with(raw, unit, active_policy())
    }

    /// Construct with an explicit policy handle.
    pub fn of_with(raw: impl Into<Raw>, unit: Unit, policy: Arc<Policy>) -> Value {
        let amount = raw.into().coerce_lenient();
        Value::literal(amount, unit, policy)
    }

    /// Strict-aware construction: unparseable text fails with
    /// [`ValueError::InvalidLiteral`] when the binary null mode is raise.
    pub fn new(raw: impl Into<Raw>, unit: Unit) -> Result<Value, ValueError> {
        let amount = raw.into().coerce()?;
        Ok(Value::literal(amount, unit, active_policy()))
    }

    /// A none-Value under the ambient policy.
    pub fn none(unit: Unit) -> Value {
        Value::literal(None, unit, active_policy())
    }

    /// A none-Value with an explicit policy handle.
    pub fn none_with_policy(unit: Unit, policy: Arc<Policy>) -> Value {
        Value::literal(None, unit, policy)
    }

    /// Zero under the ambient policy.
    pub fn zero(unit: Unit) -> Value {
        Value::literal(Some(Decimal::ZERO), unit, active_policy())
    }

    /// Lift a raw context input under a call policy, recording the input
    /// name in the literal's provenance meta. Values pass through with
    /// their own unit, policy, and lineage; bare numbers and text become
    /// dimensionless literals.
    pub fn from_input(name: &str, raw: &Raw, policy: Arc<Policy>) -> Value {
        match raw {
            Raw::Value(v) => v.clone(),
            other => {
                let amount = other.coerce_lenient();
                let prov =
                    provenance::literal_node_named(amount.as_ref(), &policy, Some(name));
                Value {
                    amount,
                    unit: Unit::Dimensionless,
                    policy,
                    prov,
                }
            }
        }
    }

    fn literal(amount: Option<Decimal>, unit: Unit, policy: Arc<Policy>) -> Value {
        let prov = provenance::literal_node(amount.as_ref(), &policy);
        Value {
            amount,
            unit,
            policy,
            prov,
        }
    }

    /// Internal constructor for results that already carry provenance.
    pub(crate) fn assemble(
        amount: Option<Decimal>,
        unit: Unit,
        policy: Arc<Policy>,
        prov: Option<Arc<ProvNode>>,
    ) -> Value {
        Value {
            amount,
            unit,
            policy,
            prov,
        }
    }

    // ── Accessors ────────────────────────────────────────────────────

    /// The stored amount, unquantized.
    pub fn amount(&self) -> Option<Decimal> {
        self.amount
    }

    /// The amount quantized per policy. Percent-unit values are scaled by
    /// 100 (and capped) first when the policy displays percents scaled.
    pub fn amount_quantized(&self) -> Option<Decimal> {
        let d = self.amount?;
        let scaled = if self.unit == Unit::Percent
            && self.policy.percent_display == PercentDisplay::Percent
        {
            let mut v = d * Decimal::ONE_HUNDRED;
            if let Some(cap) = self.policy.cap_percentage_at {
                if v > cap {
                    v = cap;
                }
            }
            v
        } else {
            d
        };
        Some(self.policy.quantize(scaled))
    }

    pub fn unit(&self) -> &Unit {
        &self.unit
    }

    pub fn policy(&self) -> &Arc<Policy> {
        &self.policy
    }

    pub fn provenance(&self) -> Option<&Arc<ProvNode>> {
        self.prov.as_ref()
    }

    pub fn provenance_id(&self) -> Option<&str> {
        self.prov.as_deref().map(|p| p.id())
    }

    pub fn is_none(&self) -> bool {
        self.amount.is_none()
    }

    pub fn is_negative(&self) -> bool {
        matches!(self.amount, Some(d) if d.is_sign_negative() && !d.is_zero())
    }

    pub fn is_zero(&self) -> bool {
        matches!(self.amount, Some(d) if d.is_zero())
    }

    /// Equality that additionally requires identical policy signatures.
    pub fn same_policy_equals(&self, other: &Value) -> bool {
        self == other && self.policy.signature() == other.policy.signature()
    }

    /// Same amount and unit under a different policy handle.
    pub fn with_policy(&self, policy: Arc<Policy>) -> Value {
        Value {
            amount: self.amount,
            unit: self.unit.clone(),
            policy,
            prov: self.prov.clone(),
        }
    }

    // ── Arithmetic ───────────────────────────────────────────────────

    pub fn add(&self, other: &Value) -> Result<Value, ValueError> {
        self.binary(other, "+", add_sub_unit, |a, b, _| Ok(a.checked_add(b)))
    }

    pub fn sub(&self, other: &Value) -> Result<Value, ValueError> {
        self.binary(other, "-", add_sub_unit, |a, b, _| Ok(a.checked_sub(b)))
    }

    pub fn mul(&self, other: &Value) -> Result<Value, ValueError> {
        self.binary(other, "*", mul_unit, |a, b, _| Ok(a.checked_mul(b)))
    }

    /// Division. A zero denominator is [`ValueError::DivisionByZero`] under
    /// strict arithmetic and a none-Value otherwise.
    pub fn div(&self, other: &Value) -> Result<Value, ValueError> {
        self.binary(other, "/", div_unit, |a, b, policy| {
            if b.is_zero() {
                if policy.arithmetic_strict {
                    return Err(ValueError::DivisionByZero);
                }
                return Ok(None);
            }
            Ok(a.checked_div(b))
        })
    }

    /// Integer power. The base must be ratioish or dimensionless; `0^0` is
    /// one; negative exponents invert (zero base follows the division
    /// rules).
    pub fn pow(&self, exp: i64) -> Result<Value, ValueError> {
        let policy = resolve_policy(self, self, "^")?;
        let Some(base) = self.amount else {
            if active_nulls().binary == NullBinaryMode::Raise {
                return Err(ValueError::InvalidOperand {
                    op: "^".to_string(),
                });
            }
            return Ok(self.unary_result("^", None, self.unit.clone(), policy, exp));
        };
        if !(self.unit.is_ratioish() || self.unit == Unit::Dimensionless) {
            if policy.arithmetic_strict {
                return Err(ValueError::IncompatibleUnits {
                    op: "^".to_string(),
                    left: self.unit.label(),
                    right: format!("{}", exp),
                });
            }
            return Ok(self.unary_result("^", None, self.unit.clone(), policy, exp));
        }
        let amount = if exp == 0 {
            Some(Decimal::ONE)
        } else if base.is_zero() && exp < 0 {
            if policy.arithmetic_strict {
                return Err(ValueError::DivisionByZero);
            }
            None
        } else {
            let mut acc = Decimal::ONE;
            let mut overflow = false;
            for _ in 0..exp.unsigned_abs() {
                match acc.checked_mul(base) {
                    Some(next) => acc = next,
                    None => {
                        overflow = true;
                        break;
                    }
                }
            }
            if overflow {
                None
            } else if exp < 0 {
                Decimal::ONE.checked_div(acc)
            } else {
                Some(acc)
            }
        };
        let amount = amount.map(|d| policy.quantize(d));
        Ok(self.unary_result("^", amount, self.unit.clone(), policy, exp))
    }

    pub fn neg(&self) -> Value {
        let policy = self.policy.clone();
        let amount = self.amount.map(|d| policy.quantize(-d));
        let prov = self.unary_node("neg", &policy, BTreeMap::new());
        Value {
            amount,
            unit: self.unit.clone(),
            policy,
            prov,
        }
    }

    pub fn abs(&self) -> Value {
        let policy = self.policy.clone();
        let amount = self.amount.map(|d| policy.quantize(d.abs()));
        let prov = self.unary_node("abs", &policy, BTreeMap::new());
        Value {
            amount,
            unit: self.unit.clone(),
            policy,
            prov,
        }
    }

    // ── Unit retagging and conversion ────────────────────────────────

    /// Retag as Percent. The stored amount stays the ratio; only display
    /// scales by 100.
    pub fn as_percentage(&self) -> Value {
        let prov = self.unary_node("as_percentage", &self.policy, BTreeMap::new());
        Value {
            amount: self.amount,
            unit: Unit::Percent,
            policy: self.policy.clone(),
            prov,
        }
    }

    /// Retag as Ratio. Exact inverse of [`Value::as_percentage`].
    pub fn as_ratio(&self) -> Value {
        let prov = self.unary_node("as_ratio", &self.policy, BTreeMap::new());
        Value {
            amount: self.amount,
            unit: Unit::Ratio,
            policy: self.policy.clone(),
            prov,
        }
    }

    /// Render this value: through the policy's display policy when one is
    /// set, else in the plain policy-driven style.
    pub fn format(&self) -> String {
        crate::format::render(self)
    }

    /// Render through an injected formatter. Falls back to the default
    /// display policy when the value's policy carries none.
    pub fn format_with(&self, formatter: &dyn crate::format::Formatter) -> String {
        crate::format::render_with(self, formatter)
    }

    /// Convert to another unit through the conversion registry.
    pub fn convert_to(
        &self,
        target: &Unit,
        ctx: &ConversionContext,
    ) -> Result<Value, ValueError> {
        conversion::convert(self, target, ctx)
    }

    // ── Internals ────────────────────────────────────────────────────

    fn binary<F>(
        &self,
        other: &Value,
        op: &str,
        unit_rule: fn(&Unit, &Unit) -> Option<Unit>,
        f: F,
    ) -> Result<Value, ValueError>
    where
        F: Fn(Decimal, Decimal, &Policy) -> Result<Option<Decimal>, ValueError>,
    {
        let policy = resolve_policy(self, other, op)?;
        let result_unit = unit_rule(&self.unit, &other.unit);
        let (a, b) = match (self.amount, other.amount) {
            (Some(a), Some(b)) => (a, b),
            _ => {
                if active_nulls().binary == NullBinaryMode::Raise {
                    return Err(ValueError::InvalidOperand { op: op.to_string() });
                }
                let unit = result_unit.unwrap_or_else(|| self.unit.clone());
                return Ok(self.binary_result(other, op, None, unit, policy));
            }
        };
        let Some(unit) = result_unit else {
            if policy.arithmetic_strict || active_resolution() == PolicyResolution::StrictMatch {
                return Err(ValueError::IncompatibleUnits {
                    op: op.to_string(),
                    left: self.unit.label(),
                    right: other.unit.label(),
                });
            }
            return Ok(self.binary_result(other, op, None, self.unit.clone(), policy));
        };
        let amount = f(a, b, &policy)?.map(|d| policy.quantize(d));
        Ok(self.binary_result(other, op, amount, unit, policy))
    }

    fn binary_result(
        &self,
        other: &Value,
        op: &str,
        amount: Option<Decimal>,
        unit: Unit,
        policy: Arc<Policy>,
    ) -> Value {
        let prov = provenance::op_node(
            op,
            &[
                (self.prov.as_ref(), self.amount.as_ref(), &self.policy),
                (other.prov.as_ref(), other.amount.as_ref(), &other.policy),
            ],
            &policy,
            BTreeMap::new(),
        );
        Value {
            amount,
            unit,
            policy,
            prov,
        }
    }

    fn unary_result(
        &self,
        op: &str,
        amount: Option<Decimal>,
        unit: Unit,
        policy: Arc<Policy>,
        exp: i64,
    ) -> Value {
        let mut meta = BTreeMap::new();
        meta.insert("exponent".to_string(), serde_json::json!(exp));
        let prov = self.unary_node(op, &policy, meta);
        Value {
            amount,
            unit,
            policy,
            prov,
        }
    }

    fn unary_node(
        &self,
        op: &str,
        policy: &Arc<Policy>,
        meta: BTreeMap<String, serde_json::Value>,
    ) -> Option<Arc<ProvNode>> {
        provenance::op_node(
            op,
            &[(self.prov.as_ref(), self.amount.as_ref(), &self.policy)],
            policy,
            meta,
        )
    }
}

/// Policy for a binary op per the active resolution mode.
fn resolve_policy(left: &Value, right: &Value, op: &str) -> Result<Arc<Policy>, ValueError> {
    match active_resolution() {
        PolicyResolution::Context => Ok(crate::context::ambient_policy().unwrap_or_else(default_policy)),
        PolicyResolution::LeftOperand => Ok(left.policy.clone()),
        PolicyResolution::StrictMatch => {
            if left.policy.signature() == right.policy.signature() {
                Ok(left.policy.clone())
            } else {
                Err(ValueError::PolicyConflict { op: op.to_string() })
            }
        }
    }
}

// ── Equality, ordering, hashing ──────────────────────────────────────

impl PartialEq for Value {
    /// Equal when the units are compatible and the amounts are equal.
    /// Policies are ignored; see [`Value::same_policy_equals`].
    fn eq(&self, other: &Value) -> bool {
        self.unit.compatible(&other.unit) && self.amount == other.amount
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    /// None sorts before any non-none amount. Values of incompatible
    /// units are unordered.
    fn partial_cmp(&self, other: &Value) -> Option<Ordering> {
        if !self.unit.compatible(&other.unit) {
            return None;
        }
        match (self.amount, other.amount) {
            (None, None) => Some(Ordering::Equal),
            (None, Some(_)) => Some(Ordering::Less),
            (Some(_), None) => Some(Ordering::Greater),
            (Some(a), Some(b)) => a.partial_cmp(&b),
        }
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.amount.hash(state);
        // Percent hashes as Ratio so hashing stays consistent with
        // ratioish equality.
        match &self.unit {
            Unit::Percent | Unit::Ratio => "ratio".hash(state),
            Unit::Dimensionless => "dimensionless".hash(state),
            Unit::Money { code } => {
                "money".hash(state);
                code.hash(state);
            }
            Unit::Quantity { tag } => {
                "quantity".hash(state);
                tag.hash(state);
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::format::render(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{use_nulls, use_policy, use_resolution};
    use crate::null::STRICT_RAISE;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn usd(amount: &str) -> Value {
        Value::of(amount, Unit::money("USD"))
    }

    #[test]
    fn literal_construction_keeps_raw_precision() {
        let v = Value::of("100.505", Unit::Dimensionless);
        assert_eq!(v.amount(), Some(dec("100.505")));
        assert_eq!(v.amount_quantized(), Some(dec("100.51")));
    }

    #[test]
    fn invalid_text_is_none_by_default() {
        let v = Value::of("not a number", Unit::money("USD"));
        assert!(v.is_none());
        assert_eq!(v.unit(), &Unit::money("USD"));
    }

    #[test]
    fn invalid_text_raises_in_strict_mode() {
        let _nulls = use_nulls(STRICT_RAISE);
        match Value::new("bogus", Unit::Dimensionless) {
            Err(ValueError::InvalidLiteral { literal }) => assert_eq!(literal, "bogus"),
            other => panic!("expected InvalidLiteral, got {:?}", other),
        }
    }

    #[test]
    fn add_same_currency() {
        let total = usd("100").add(&usd("23.5")).unwrap();
        assert_eq!(total.amount(), Some(dec("123.50")));
        assert_eq!(total.unit(), &Unit::money("USD"));
    }

    #[test]
    fn subtraction_quantizes_per_policy() {
        let gp = usd("1000").sub(&usd("600")).unwrap();
        assert_eq!(gp.amount(), Some(dec("400.00")));
    }

    #[test]
    fn operands_are_unchanged_by_operations() {
        let a = usd("100");
        let b = usd("60");
        let before = (a.amount(), a.unit().clone(), a.policy().signature());
        let _ = a.sub(&b).unwrap();
        let _ = a.mul(&Value::of("2", Unit::Dimensionless)).unwrap();
        let _ = a.neg();
        assert_eq!(a.amount(), before.0);
        assert_eq!(a.unit(), &before.1);
        assert_eq!(a.policy().signature(), before.2);
    }

    #[test]
    fn none_propagates_with_result_unit() {
        let a = usd("100");
        let b = Value::none(Unit::money("USD"));
        let sum = a.add(&b).unwrap();
        assert!(sum.is_none());
        assert_eq!(sum.unit(), &Unit::money("USD"));
    }

    #[test]
    fn none_propagation_falls_back_to_left_unit() {
        let a = usd("100");
        let b = Value::none(Unit::Percent);
        // Money + Percent has no algebra unit; the left unit is kept.
        let sum = a.add(&b).unwrap();
        assert!(sum.is_none());
        assert_eq!(sum.unit(), &Unit::money("USD"));
    }

    #[test]
    fn none_raises_in_raise_mode() {
        let _nulls = use_nulls(STRICT_RAISE);
        let a = usd("100");
        let b = Value::none(Unit::money("USD"));
        match a.add(&b) {
            Err(ValueError::InvalidOperand { op }) => assert_eq!(op, "+"),
            other => panic!("expected InvalidOperand, got {:?}", other),
        }
    }

    #[test]
    fn incompatible_units_default_to_none_with_left_unit() {
        let sum = usd("100").add(&Value::of("0.1", Unit::Percent)).unwrap();
        assert!(sum.is_none());
        assert_eq!(sum.unit(), &Unit::money("USD"));
    }

    #[test]
    fn incompatible_units_fail_under_strict_arithmetic() {
        let strict = Policy {
            arithmetic_strict: true,
            ..Policy::default()
        }
        .into_shared();
        let _scope = use_policy(strict);
        let a = usd("100");
        let b = Value::of("0.1", Unit::Percent);
        match a.add(&b) {
            Err(ValueError::IncompatibleUnits { left, right, .. }) => {
                assert_eq!(left, "Money[USD]");
                assert_eq!(right, "Percent");
            }
            other => panic!("expected IncompatibleUnits, got {:?}", other),
        }
    }

    #[test]
    fn division_by_zero_is_none_by_default() {
        let q = usd("100").div(&usd("0")).unwrap();
        assert!(q.is_none());
        assert_eq!(q.unit(), &Unit::Ratio);
    }

    #[test]
    fn division_by_zero_fails_under_strict_arithmetic() {
        let strict = Policy {
            arithmetic_strict: true,
            ..Policy::default()
        }
        .into_shared();
        let _scope = use_policy(strict);
        match usd("100").div(&usd("0")) {
            Err(ValueError::DivisionByZero) => {}
            other => panic!("expected DivisionByZero, got {:?}", other),
        }
    }

    #[test]
    fn money_over_money_is_ratio() {
        let margin = usd("400").div(&usd("1000")).unwrap();
        assert_eq!(margin.unit(), &Unit::Ratio);
        assert_eq!(margin.amount(), Some(dec("0.40")));
    }

    #[test]
    fn dimensionless_multiplication_is_identity() {
        let v = usd("123.45");
        let one = Value::of(1, Unit::Dimensionless);
        let out = v.mul(&one).unwrap();
        assert_eq!(out.amount(), v.amount_quantized());
        assert_eq!(out.unit(), v.unit());
    }

    #[test]
    fn percent_ratio_round_trip_is_exact() {
        let r = Value::of("0.1534", Unit::Ratio);
        let back = r.as_percentage().as_ratio();
        assert_eq!(back.amount(), r.amount());
        assert_eq!(back.unit(), &Unit::Ratio);
    }

    #[test]
    fn percent_quantized_amount_scales_by_100() {
        let pct = Value::of("0.40", Unit::Ratio).as_percentage();
        assert_eq!(pct.amount(), Some(dec("0.40")));
        assert_eq!(pct.amount_quantized(), Some(dec("40.00")));
    }

    #[test]
    fn percent_cap_applies() {
        let pct = Value::of("123456", Unit::Ratio).as_percentage();
        assert_eq!(pct.amount_quantized(), Some(dec("99999.99")));
    }

    #[test]
    fn pow_semantics() {
        let half = Value::of("0.5", Unit::Ratio);
        assert_eq!(half.pow(2).unwrap().amount(), Some(dec("0.25")));
        assert_eq!(Value::of(0, Unit::Dimensionless).pow(0).unwrap().amount(), Some(dec("1.00")));
        assert_eq!(
            Value::of(4, Unit::Dimensionless).pow(-1).unwrap().amount(),
            Some(dec("0.25"))
        );
        // Money bases are rejected into none.
        assert!(usd("4").pow(2).unwrap().is_none());
    }

    #[test]
    fn neg_and_abs() {
        let v = usd("12.34");
        assert_eq!(v.neg().amount(), Some(dec("-12.34")));
        assert_eq!(v.neg().abs().amount(), Some(dec("12.34")));
        assert!(Value::none(Unit::Ratio).neg().is_none());
    }

    #[test]
    fn policy_resolution_context_mode() {
        let p = Policy {
            decimal_places: 4,
            ..Policy::default()
        }
        .into_shared();
        let _scope = use_policy(p.clone());
        let out = usd("1").add(&usd("2")).unwrap();
        assert_eq!(out.policy().signature(), p.signature());
    }

    #[test]
    fn policy_resolution_left_operand_mode() {
        let left_policy = Policy {
            decimal_places: 6,
            ..Policy::default()
        }
        .into_shared();
        let a = Value::of_with("1", Unit::Dimensionless, left_policy.clone());
        let b = Value::of("2", Unit::Dimensionless);
        let _mode = use_resolution(PolicyResolution::LeftOperand);
        let out = a.add(&b).unwrap();
        assert_eq!(out.policy().signature(), left_policy.signature());
    }

    #[test]
    fn strict_match_rejects_mixed_policies() {
        let odd = Policy {
            decimal_places: 5,
            ..Policy::default()
        }
        .into_shared();
        let a = Value::of_with("1", Unit::Dimensionless, odd);
        let b = Value::of("2", Unit::Dimensionless);
        let _mode = use_resolution(PolicyResolution::StrictMatch);
        match a.add(&b) {
            Err(ValueError::PolicyConflict { op }) => assert_eq!(op, "+"),
            other => panic!("expected PolicyConflict, got {:?}", other),
        }
    }

    #[test]
    fn equality_ignores_policy_but_not_unit() {
        let odd = Policy {
            decimal_places: 8,
            ..Policy::default()
        }
        .into_shared();
        let a = Value::of("0.4", Unit::Ratio);
        let b = Value::of_with("0.4", Unit::Percent, odd);
        assert_eq!(a, b);
        assert!(!a.same_policy_equals(&b));
        let c = Value::of("0.4", Unit::Dimensionless);
        assert_ne!(a, c);
    }

    #[test]
    fn ordering_puts_none_first() {
        let none = Value::none(Unit::money("USD"));
        let small = usd("1");
        let big = usd("2");
        assert!(none < small);
        assert!(small < big);
        assert!(big > none);
        assert_eq!(none.partial_cmp(&Value::none(Unit::money("USD"))), Some(Ordering::Equal));
        // Incompatible units are unordered.
        assert_eq!(usd("1").partial_cmp(&Value::of(1, Unit::Ratio)), None);
    }

    #[test]
    fn hash_consistent_with_ratioish_equality() {
        use std::collections::hash_map::DefaultHasher;
        fn h(v: &Value) -> u64 {
            let mut s = DefaultHasher::new();
            v.hash(&mut s);
            s.finish()
        }
        let r = Value::of("0.4", Unit::Ratio);
        let p = Value::of("0.4", Unit::Percent);
        assert_eq!(h(&r), h(&p));
    }

    #[test]
    fn arithmetic_records_provenance() {
        let gp = usd("1000").sub(&usd("600")).unwrap();
        let node = gp.provenance().unwrap();
        assert_eq!(node.op(), "-");
        assert_eq!(node.input_ids().count(), 2);
    }
}
