//! Null-handling strategy for binary operations and reductions.

/// How none operands behave in binary ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullBinaryMode {
    /// Any none operand yields a none result.
    Propagate,
    /// Any none operand is an error.
    Raise,
}

/// How none elements behave in reductions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullReductionMode {
    /// Drop none elements.
    Skip,
    /// Any none element makes the result none.
    Propagate,
    /// Treat none amounts as zero; the element still counts.
    Zero,
    /// Any none element is an error.
    Raise,
}

/// Combined null-handling strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NullBehavior {
    pub binary: NullBinaryMode,
    pub reduction: NullReductionMode,
}

impl Default for NullBehavior {
    fn default() -> Self {
        DEFAULT_NULLS
    }
}

/// Propagate in binary ops, skip in reductions.
pub const DEFAULT_NULLS: NullBehavior = NullBehavior {
    binary: NullBinaryMode::Propagate,
    reduction: NullReductionMode::Skip,
};

/// Raise everywhere.
pub const STRICT_RAISE: NullBehavior = NullBehavior {
    binary: NullBinaryMode::Raise,
    reduction: NullReductionMode::Raise,
};

/// Reduction preset: none counts as zero.
pub const SUM_ZERO: NullBehavior = NullBehavior {
    binary: NullBinaryMode::Propagate,
    reduction: NullReductionMode::Zero,
};

/// Reduction preset: any none makes the result none.
pub const SUM_PROPAGATE: NullBehavior = NullBehavior {
    binary: NullBinaryMode::Propagate,
    reduction: NullReductionMode::Propagate,
};

/// Reduction preset: any none is an error.
pub const SUM_RAISE: NullBehavior = NullBehavior {
    binary: NullBinaryMode::Propagate,
    reduction: NullReductionMode::Raise,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_propagate_skip() {
        let d = NullBehavior::default();
        assert_eq!(d.binary, NullBinaryMode::Propagate);
        assert_eq!(d.reduction, NullReductionMode::Skip);
    }

    #[test]
    fn presets_override_the_right_half() {
        assert_eq!(SUM_ZERO.binary, NullBinaryMode::Propagate);
        assert_eq!(SUM_ZERO.reduction, NullReductionMode::Zero);
        assert_eq!(STRICT_RAISE.binary, NullBinaryMode::Raise);
        assert_eq!(STRICT_RAISE.reduction, NullReductionMode::Raise);
    }
}
