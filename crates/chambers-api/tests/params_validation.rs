use chambers_api::{
    parse_bool_flag, parse_contact_status_filter, parse_id, parse_pagination,
    parse_storage_target, required_email_param, ApiErrorCode, StorageTarget,
};
use chambers_model::ContactStatus;
use std::collections::BTreeMap;

fn query(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

#[test]
fn pagination_defaults_and_bounds() {
    let page = parse_pagination(&query(&[])).expect("defaults");
    assert_eq!((page.limit, page.offset), (20, 0));

    let max = parse_pagination(&query(&[("limit", "100"), ("offset", "40")])).expect("max");
    assert_eq!((max.limit, max.offset), (100, 40));

    for bad in ["0", "101", "-1", "ten"] {
        assert_eq!(
            parse_pagination(&query(&[("limit", bad)]))
                .expect_err("bad limit")
                .code,
            ApiErrorCode::InvalidQueryParameter
        );
    }
    assert!(parse_pagination(&query(&[("offset", "x")])).is_err());
}

#[test]
fn bool_flags_accept_common_spellings() {
    assert!(parse_bool_flag(&query(&[("all", "1")]), "all").expect("1"));
    assert!(parse_bool_flag(&query(&[("all", "TRUE")]), "all").expect("TRUE"));
    assert!(!parse_bool_flag(&query(&[]), "all").expect("absent"));
    assert!(parse_bool_flag(&query(&[("all", "maybe")]), "all").is_err());
}

#[test]
fn contact_status_filter_is_strict() {
    assert_eq!(
        parse_contact_status_filter(&query(&[("status", "new")])).expect("new"),
        Some(ContactStatus::New)
    );
    assert_eq!(parse_contact_status_filter(&query(&[])).expect("none"), None);
    let err = parse_contact_status_filter(&query(&[("status", "spam")])).expect_err("spam");
    assert_eq!(err.details["parameter"], "status");
}

#[test]
fn storage_target_defaults_to_database() {
    assert_eq!(
        parse_storage_target(&query(&[])).expect("default"),
        StorageTarget::Database
    );
    assert_eq!(
        parse_storage_target(&query(&[("storage", "disk")])).expect("disk"),
        StorageTarget::Disk
    );
    assert!(parse_storage_target(&query(&[("storage", "s3")])).is_err());
}

#[test]
fn ids_must_be_positive_integers() {
    assert_eq!(parse_id("42").expect("42"), 42);
    assert!(parse_id("0").is_err());
    assert!(parse_id("-3").is_err());
    assert!(parse_id("abc").is_err());
}

#[test]
fn email_param_is_normalized() {
    assert_eq!(
        required_email_param(&query(&[("email", " A@Example.COM ")])).expect("email"),
        "a@example.com"
    );
    assert!(required_email_param(&query(&[])).is_err());
}
