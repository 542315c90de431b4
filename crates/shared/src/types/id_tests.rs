use super::*;
use std::str::FromStr;

#[test]
fn test_typed_id_round_trips_raw_value() {
    let id = AccountId::new(42);
    assert_eq!(id.into_inner(), 42);
    assert_eq!(i64::from(id), 42);
    assert_eq!(AccountId::from(42), id);
}

#[test]
fn test_typed_id_display() {
    assert_eq!(format!("{}", TransferId::new(7)), "7");
}

#[test]
fn test_typed_id_from_str() {
    let id = EntryId::from_str("1234").unwrap();
    assert_eq!(id, EntryId::new(1234));
}

#[test]
fn test_typed_id_from_str_error() {
    assert!(AccountId::from_str("invalid").is_err());
    assert!(AccountId::from_str("").is_err());
}

#[test]
fn test_typed_id_ordering_follows_raw_value() {
    assert!(AccountId::new(1) < AccountId::new(2));
    assert!(AccountId::new(-5) < AccountId::new(0));
}

#[test]
fn test_typed_id_serializes_transparently() {
    let json = serde_json::to_string(&AccountId::new(9)).unwrap();
    assert_eq!(json, "9");
    let back: AccountId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, AccountId::new(9));
}
