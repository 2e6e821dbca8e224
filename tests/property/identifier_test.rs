// tests/property/identifier_test.rs

//! Identifier guards reject anything that could break out of a quoted SQL literal.

use otu_sqlsync::core::store::identifier::{escape_literal, validate_host, validate_user};
use proptest::prelude::*;

proptest! {
    #[test]
    fn test_quotes_and_whitespace_never_pass(
        prefix in "[a-z]{0,10}",
        bad in prop::sample::select(vec!['\'', '"', '`', ' ', ';', '\\', '\n', '(', ')']),
        suffix in "[a-z]{0,10}",
    ) {
        let value = format!("{prefix}{bad}{suffix}");
        prop_assert!(validate_user(&value).is_err());
        prop_assert!(validate_host(&value).is_err());
    }

    #[test]
    fn test_well_formed_users_pass(user in "[A-Za-z0-9_.@-]{1,80}") {
        prop_assert_eq!(validate_user(&user).unwrap(), user.as_str());
    }

    #[test]
    fn test_escaped_literals_have_only_paired_quotes(raw in ".{0,64}") {
        let escaped = escape_literal(&raw);
        prop_assert!(!escaped.replace("''", "").contains('\''));
        prop_assert!(!escaped.contains('\0'));
        prop_assert!(!escaped.contains('\n'));
    }
}
