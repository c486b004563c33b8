use std::{fmt, str::FromStr};

use alloy::primitives::U256;

use super::IndexId;

/// Comparison between a live index value and a fixed threshold.
///
/// The order protocol only exposes strict comparators on chain, so
/// [`Operator::Gte`] and [`Operator::Lte`] are encoded as their strict
/// counterparts: an order whose condition lands exactly on the threshold
/// triggers one oracle tick later than local evaluation suggests. See
/// [`crate::predicate::encode`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operator {
    Gt,
    Lt,
    Gte,
    Lte,
    Eq,
    Neq,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Gt => "gt",
            Operator::Lt => "lt",
            Operator::Gte => "gte",
            Operator::Lte => "lte",
            Operator::Eq => "eq",
            Operator::Neq => "neq",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown operator: {0:?}")]
pub struct ParseOperatorError(String);

impl FromStr for Operator {
    type Err = ParseOperatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gt" | ">" => Ok(Operator::Gt),
            "lt" | "<" => Ok(Operator::Lt),
            "gte" | ">=" => Ok(Operator::Gte),
            "lte" | "<=" => Ok(Operator::Lte),
            "eq" | "==" | "=" => Ok(Operator::Eq),
            "neq" | "!=" => Ok(Operator::Neq),
            other => Err(ParseOperatorError(other.to_string())),
        }
    }
}

/// Trigger condition of a conditional order: fires once
/// `index value <operator> threshold` holds on chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OrderCondition {
    index_id: IndexId,
    operator: Operator,
    threshold: U256,
}

impl OrderCondition {
    pub fn new(index_id: IndexId, operator: Operator, threshold: U256) -> Self {
        Self {
            index_id,
            operator,
            threshold,
        }
    }

    pub fn index_id(&self) -> IndexId {
        self.index_id
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn threshold(&self) -> U256 {
        self.threshold
    }

    /// Evaluates the condition against a value read from the oracle.
    pub fn evaluate(&self, value: U256) -> bool {
        match self.operator {
            Operator::Gt => value > self.threshold,
            Operator::Lt => value < self.threshold,
            Operator::Gte => value >= self.threshold,
            Operator::Lte => value <= self.threshold,
            Operator::Eq => value == self.threshold,
            Operator::Neq => value != self.threshold,
        }
    }
}

impl fmt::Display for OrderCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "index #{} {} {}", self.index_id, self.operator, self.threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluate_all_operators() {
        let threshold = U256::from(18000);
        let below = U256::from(17999);
        let above = U256::from(18001);

        let cond = |op| OrderCondition::new(2, op, threshold);

        assert!(cond(Operator::Gt).evaluate(above));
        assert!(!cond(Operator::Gt).evaluate(threshold));

        assert!(cond(Operator::Lt).evaluate(below));
        assert!(!cond(Operator::Lt).evaluate(threshold));

        assert!(cond(Operator::Gte).evaluate(threshold));
        assert!(cond(Operator::Gte).evaluate(above));
        assert!(!cond(Operator::Gte).evaluate(below));

        assert!(cond(Operator::Lte).evaluate(threshold));
        assert!(cond(Operator::Lte).evaluate(below));
        assert!(!cond(Operator::Lte).evaluate(above));

        assert!(cond(Operator::Eq).evaluate(threshold));
        assert!(!cond(Operator::Eq).evaluate(above));

        assert!(cond(Operator::Neq).evaluate(above));
        assert!(!cond(Operator::Neq).evaluate(threshold));
    }

    #[test]
    fn test_operator_round_trip() {
        for op in [
            Operator::Gt,
            Operator::Lt,
            Operator::Gte,
            Operator::Lte,
            Operator::Eq,
            Operator::Neq,
        ] {
            assert_eq!(op.as_str().parse::<Operator>().unwrap(), op);
        }
        assert_eq!(">=".parse::<Operator>().unwrap(), Operator::Gte);
        assert_eq!("GT".parse::<Operator>().unwrap(), Operator::Gt);
        assert!("between".parse::<Operator>().is_err());
    }
}
