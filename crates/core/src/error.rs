//! Value-level error type.
//!
//! In the default (non-strict) modes most invalid arithmetic degrades to a
//! none-Value rather than an error; the variants here surface only when a
//! strict mode (raise nulls, strict arithmetic, strict policy match, strict
//! conversion) is in effect, or when an export budget is exceeded.

use std::fmt;

/// Errors produced by value arithmetic, reductions, conversion, and
/// provenance export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// A raw string could not be interpreted as a decimal under raise mode.
    InvalidLiteral { literal: String },
    /// An operand was none and the binary null mode is raise.
    InvalidOperand { op: String },
    /// The unit algebra does not permit the operation.
    IncompatibleUnits {
        op: String,
        left: String,
        right: String,
    },
    /// Strict-match policy resolution saw two different policy signatures.
    PolicyConflict { op: String },
    /// Division by a zero denominator under strict arithmetic.
    DivisionByZero,
    /// A reduction in raise mode encountered a none element.
    NullInReduction { reduction: String },
    /// No conversion path exists between two units under strict conversion.
    MissingConversion { from: String, to: String },
    /// A registered conversion function failed.
    ConversionFailed {
        from: String,
        to: String,
        message: String,
    },
    /// A named reducer was never registered.
    UnknownReducer { name: String },
    /// A provenance export exceeded the configured node budget.
    GraphTooLarge { nodes: usize, limit: usize },
    /// An operation is mathematically undefined for its inputs under
    /// strict arithmetic.
    Undefined { message: String },
}

impl fmt::Display for ValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueError::InvalidLiteral { literal } => {
                write!(f, "invalid decimal literal: '{}'", literal)
            }
            ValueError::InvalidOperand { op } => {
                write!(f, "operation '{}' received a none operand in raise mode", op)
            }
            ValueError::IncompatibleUnits { op, left, right } => {
                write!(f, "incompatible units for '{}': {} vs {}", op, left, right)
            }
            ValueError::PolicyConflict { op } => {
                write!(f, "mixed policies for '{}' under strict-match resolution", op)
            }
            ValueError::DivisionByZero => {
                write!(f, "division by zero under strict arithmetic")
            }
            ValueError::NullInReduction { reduction } => {
                write!(f, "reduction '{}' encountered none in raise mode", reduction)
            }
            ValueError::MissingConversion { from, to } => {
                write!(f, "no conversion path from {} to {}", from, to)
            }
            ValueError::ConversionFailed { from, to, message } => {
                write!(f, "conversion {} -> {} failed: {}", from, to, message)
            }
            ValueError::UnknownReducer { name } => {
                write!(f, "unknown reducer: {}", name)
            }
            ValueError::GraphTooLarge { nodes, limit } => {
                write!(
                    f,
                    "provenance graph has {} nodes, export limit is {}",
                    nodes, limit
                )
            }
            ValueError::Undefined { message } => {
                write!(f, "operation undefined: {}", message)
            }
        }
    }
}

impl std::error::Error for ValueError {}
