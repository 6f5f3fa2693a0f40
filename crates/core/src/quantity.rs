//! Quantity type for stock levels and deltas.
//!
//! Quantities are exact decimals, so fractional units (kilograms, litres)
//! are first-class and sums never drift.

use rust_decimal::Decimal;

use crate::error::{OpsError, OpsResult};

/// Signed stock quantity (or quantity delta).
pub type Quantity = Decimal;

/// Parse a caller-supplied quantity string.
///
/// Any parse failure is a `BadRequest`, never an `Internal`.
pub fn parse_quantity(raw: &str) -> OpsResult<Quantity> {
    raw.trim()
        .parse::<Decimal>()
        .map_err(|_| OpsError::bad_request(format!("quantity must be numeric, got '{raw}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fractional_quantities() {
        assert_eq!(parse_quantity("12.5").unwrap(), Decimal::new(125, 1));
        assert_eq!(parse_quantity(" -3 ").unwrap(), Decimal::from(-3));
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            parse_quantity("twelve").unwrap_err(),
            OpsError::BadRequest(_)
        ));
    }
}
