//! Identifier types shared by every marketplace record
//!
//! Buyers, sellers, and ledger accounts share one identifier space: a buyer
//! `B1` owns the ledger account `B1`. Items and orders have their own spaces.

use super::error::MarketError;

/// Ledger account identifier (also the buyer/seller identifier)
pub type AccountId = String;

/// Catalog item identifier
pub type ItemId = String;

/// Order (transaction) identifier, generated by the marketplace
pub type OrderId = String;

/// Characters that would make a snapshot record ambiguous
const RESERVED: [char; 3] = ['|', ',', '"'];

/// Check that an identifier is safe to use as a record key
///
/// Identifiers must be non-empty and contain no whitespace and none of the
/// snapshot delimiters (`|`, `,`) or the quote character.
///
/// # Errors
///
/// Returns `MarketError::InvalidInput` naming the offending identifier.
pub fn validate_identifier(kind: &str, id: &str) -> Result<(), MarketError> {
    if id.is_empty() {
        return Err(MarketError::invalid_input(format!("{} id must not be empty", kind)));
    }

    if id
        .chars()
        .any(|c| c.is_whitespace() || RESERVED.contains(&c))
    {
        return Err(MarketError::invalid_input(format!(
            "{} id '{}' contains whitespace or a reserved character",
            kind, id
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("B1")]
    #[case("seller-42")]
    #[case("I_1.a")]
    fn test_valid_identifiers(#[case] id: &str) {
        assert!(validate_identifier("buyer", id).is_ok());
    }

    #[rstest]
    #[case::empty("")]
    #[case::space("B 1")]
    #[case::pipe("B|1")]
    #[case::comma("B,1")]
    #[case::quote("B\"1")]
    #[case::newline("B\n1")]
    fn test_invalid_identifiers(#[case] id: &str) {
        let err = validate_identifier("buyer", id).unwrap_err();
        assert!(matches!(err, MarketError::InvalidInput { .. }));
    }
}
