use tally_core::ValueError;

/// Structural and evaluation errors from the calculation engine.
///
/// Registry and graph errors always surface; value-level errors inside a
/// calculation function are wrapped with the calculation's name so the
/// failure is actionable.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The target name is neither a registered calculation nor a context
    /// input.
    #[error("unknown calculation: {name}")]
    UnknownCalculation { name: String },

    /// A calculation with this fully-qualified name already exists.
    #[error("calculation already registered: {name}")]
    DuplicateCalculation { name: String },

    /// The name is empty, has empty segments, or depends on itself.
    #[error("invalid calculation name: {name} ({reason})")]
    InvalidName { name: String, reason: String },

    /// The dependency graph contains a cycle. The path ends with the node
    /// that closed the cycle.
    #[error("circular dependency: {}", path.join(" -> "))]
    CircularDependency { path: Vec<String> },

    /// A required leaf input is missing from the context.
    #[error("missing input: {name}")]
    MissingInput { name: String },

    /// A calculation function returned a value error.
    #[error("calculation '{name}' failed: {source}")]
    CalculationFailed {
        name: String,
        #[source]
        source: ValueError,
    },

    /// A value error outside any calculation function.
    #[error(transparent)]
    Value(#[from] ValueError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_display_lists_the_path() {
        let err = EngineError::CircularDependency {
            path: vec!["a".to_string(), "b".to_string(), "a".to_string()],
        };
        assert_eq!(err.to_string(), "circular dependency: a -> b -> a");
    }

    #[test]
    fn calculation_failure_names_the_calculation() {
        let err = EngineError::CalculationFailed {
            name: "pricing.total_cost".to_string(),
            source: ValueError::DivisionByZero,
        };
        assert!(err.to_string().contains("pricing.total_cost"));
    }
}
