//! Transaction kinds and sign normalization.

use serde::{Deserialize, Serialize};

use franops_core::{OpsError, OpsResult, Quantity};

/// Kind of a ledger transaction.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    In,
    Out,
    Adjustment,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::In => "IN",
            TransactionKind::Out => "OUT",
            TransactionKind::Adjustment => "ADJUSTMENT",
        }
    }

    /// Parse a caller-supplied kind. Unknown kinds are well-formed input
    /// with no meaning here, hence `Unprocessable` rather than `BadRequest`.
    pub fn parse(raw: &str) -> OpsResult<Self> {
        match raw.to_ascii_uppercase().as_str() {
            "IN" => Ok(TransactionKind::In),
            "OUT" => Ok(TransactionKind::Out),
            "ADJUSTMENT" => Ok(TransactionKind::Adjustment),
            other => Err(OpsError::unprocessable(format!(
                "transaction kind must be one of IN, OUT, ADJUSTMENT; got '{other}'"
            ))),
        }
    }
}

impl core::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Force the delta's sign to match the kind's direction.
///
/// IN always adds, OUT always subtracts; ADJUSTMENT is the only kind that
/// may carry either sign (shrinkage or correction, no implied direction).
pub fn normalize(kind: TransactionKind, delta: Quantity) -> Quantity {
    match kind {
        TransactionKind::In => delta.abs(),
        TransactionKind::Out => -delta.abs(),
        TransactionKind::Adjustment => delta,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn parse_is_case_insensitive_and_closed() {
        assert_eq!(TransactionKind::parse("in").unwrap(), TransactionKind::In);
        assert_eq!(TransactionKind::parse("OUT").unwrap(), TransactionKind::Out);
        assert!(matches!(
            TransactionKind::parse("TRANSFER").unwrap_err(),
            OpsError::Unprocessable(_)
        ));
    }

    #[test]
    fn in_and_out_force_their_signs() {
        let four = Decimal::from(4);
        assert_eq!(normalize(TransactionKind::In, -four), four);
        assert_eq!(normalize(TransactionKind::In, four), four);
        assert_eq!(normalize(TransactionKind::Out, four), -four);
        assert_eq!(normalize(TransactionKind::Out, -four), -four);
    }

    #[test]
    fn adjustment_passes_through() {
        let q = Decimal::new(-25, 1);
        assert_eq!(normalize(TransactionKind::Adjustment, q), q);
    }
}
