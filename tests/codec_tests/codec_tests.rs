//! Tests for the row codec
//!
//! These tests verify:
//! - Delimiter escaping and escape-aware splitting
//! - Row encode/decode for every field kind
//! - Schema growth (missing and extra trailing fields)
//! - MalformedRow on bad ids, bad field text and bad escapes

#[path = "../common/mod.rs"]
mod common;

use common::{Account, AccountStatus, Country, Named, Product};
use rust_decimal::Decimal;
use textdb::codec::{decode_row, encode_row, escape, split_unescaped, tokenize, unescape};
use textdb::TextDbError;

fn assert_malformed<T: std::fmt::Debug>(result: textdb::Result<T>) {
    match result {
        Err(TextDbError::MalformedRow(_)) => {}
        other => panic!("expected MalformedRow, got {:?}", other),
    }
}

// =============================================================================
// Escaping Tests
// =============================================================================

#[test]
fn test_escape_reserved_characters() {
    assert_eq!(escape("a|b"), "a\\|b");
    assert_eq!(escape("a;b"), "a\\;b");
    assert_eq!(escape("a\\b"), "a\\\\b");
    assert_eq!(escape("a\nb\rc"), "a\\nb\\rc");
    assert_eq!(escape("plain text"), "plain text");
}

#[test]
fn test_unescape_reverses_escape() {
    let original = "pipe | semi ; slash \\ newline \n return \r done";
    assert_eq!(unescape(&escape(original)).unwrap(), original);
}

#[test]
fn test_unescape_rejects_unknown_escape() {
    assert_malformed(unescape("bad \\x escape"));
}

#[test]
fn test_unescape_rejects_dangling_escape() {
    assert_malformed(unescape("ends with \\"));
}

#[test]
fn test_split_ignores_escaped_delimiters() {
    let parts = split_unescaped("1|a\\|b|c", '|').unwrap();
    assert_eq!(parts, vec!["1", "a\\|b", "c"]);
}

#[test]
fn test_split_keeps_empty_parts() {
    let parts = split_unescaped("1||", '|').unwrap();
    assert_eq!(parts, vec!["1", "", ""]);
}

#[test]
fn test_split_escaped_backslash_before_delimiter() {
    // "\\|" is an escaped backslash followed by a real delimiter
    let parts = split_unescaped("a\\\\|b", '|').unwrap();
    assert_eq!(parts, vec!["a\\\\", "b"]);
}

// =============================================================================
// Encode Tests
// =============================================================================

#[test]
fn test_encode_simple_row() {
    let row = Named::with_id(3, "hello");
    assert_eq!(encode_row(&row), "3|hello");
}

#[test]
fn test_encode_escapes_field_content() {
    let row = Named::with_id(3, "a|b\nc");
    assert_eq!(encode_row(&row), "3|a\\|b\\nc");
}

#[test]
fn test_encoded_row_is_single_line() {
    let mut account = Account::sample("one@example.com");
    account.id = 10;
    let line = encode_row(&account);
    assert!(!line.contains('\n'));
    assert!(!line.contains('\r'));
}

#[test]
fn test_encode_null_and_list() {
    let mut account = Account::sample("x@example.com");
    account.id = 1;
    account.referrer = None;
    account.tags = vec!["a".to_string(), "b;c".to_string()];

    let line = encode_row(&account);
    assert!(line.contains("|a;b\\;c|"));
    assert!(line.contains("|\\N|"));
}

// =============================================================================
// Round-trip Tests
// =============================================================================

#[test]
fn test_round_trip_account_with_every_field_kind() {
    let mut account = Account::sample("rt@example.com");
    account.id = 42;

    let decoded: Account = decode_row(&encode_row(&account)).unwrap();
    assert_eq!(decoded, account);
}

#[test]
fn test_round_trip_negative_id() {
    let row = Named::with_id(-15, "temporary cart");
    let decoded: Named = decode_row(&encode_row(&row)).unwrap();
    assert_eq!(decoded, row);
}

#[test]
fn test_round_trip_empty_strings_and_lists() {
    let mut account = Account::sample("");
    account.id = 7;
    account.display_name = String::new();
    account.tags = Vec::new();
    account.referrer = None;

    let decoded: Account = decode_row(&encode_row(&account)).unwrap();
    assert_eq!(decoded, account);
}

#[test]
fn test_round_trip_list_of_single_empty_item() {
    let mut account = Account::sample("e@example.com");
    account.id = 8;
    account.tags = vec![String::new()];

    let decoded: Account = decode_row(&encode_row(&account)).unwrap();
    assert_eq!(decoded.tags, vec![String::new()]);
}

#[test]
fn test_round_trip_unicode() {
    let row = Country {
        id: 5,
        code: "JP".to_string(),
        name: "日本 | Nippon; ✓".to_string(),
    };
    let decoded: Country = decode_row(&encode_row(&row)).unwrap();
    assert_eq!(decoded, row);
}

// =============================================================================
// Schema Growth Tests
// =============================================================================

#[test]
fn test_decode_missing_trailing_fields_default() {
    let account: Account = decode_row("5|x@y.z").unwrap();

    assert_eq!(account.id, 5);
    assert_eq!(account.email, "x@y.z");
    assert_eq!(account.display_name, "");
    assert_eq!(account.balance, Decimal::ZERO);
    assert!(!account.active);
    assert_eq!(account.status, AccountStatus::Pending);
    assert!(account.tags.is_empty());
    assert_eq!(account.referrer, None);
    assert_eq!(account.score, 0.0);
}

#[test]
fn test_decode_ignores_extra_trailing_fields() {
    let row: Named = decode_row("4|name|from|a newer layout").unwrap();
    assert_eq!(row, Named::with_id(4, "name"));
}

#[test]
fn test_decode_tolerates_padded_id() {
    let row: Named = decode_row(" 12 |x").unwrap();
    assert_eq!(row.id, 12);
}

// =============================================================================
// Malformed Row Tests
// =============================================================================

#[test]
fn test_decode_empty_line_is_malformed() {
    assert_malformed(decode_row::<Named>(""));
}

#[test]
fn test_decode_missing_id_is_malformed() {
    assert_malformed(decode_row::<Named>("|name"));
}

#[test]
fn test_decode_non_numeric_id_is_malformed() {
    assert_malformed(decode_row::<Named>("abc|name"));
}

#[test]
fn test_decode_bad_integer_field_is_malformed() {
    assert_malformed(decode_row::<Product>("1|SKU-1|lots"));
}

#[test]
fn test_decode_unknown_enum_value_is_malformed() {
    assert_malformed(decode_row::<Account>("1|e@x|name|1|1|0|9||\\N|0"));
}

#[test]
fn test_decode_dangling_escape_is_malformed() {
    assert_malformed(decode_row::<Named>("1|broken\\"));
}

// =============================================================================
// Tokenize Tests
// =============================================================================

#[test]
fn test_tokenize_unescapes_fields() {
    let fields = tokenize("9|a\\|b|\\N|x;y").unwrap();
    assert_eq!(fields, vec!["9", "a|b", "", "x;y"]);
}
