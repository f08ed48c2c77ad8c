use chambers_core::text;
use proptest::prelude::*;

proptest! {
    #[test]
    fn slugs_only_contain_url_safe_characters(input in ".{0,120}") {
        let slug = text::slugify(&input);
        prop_assert!(!slug.is_empty());
        prop_assert!(slug.len() <= text::SLUG_MAX_LEN);
        prop_assert!(slug.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-'));
        prop_assert!(!slug.starts_with('-') && !slug.ends_with('-'));
        prop_assert!(!slug.contains("--"));
    }

    #[test]
    fn slugify_is_idempotent(input in "[A-Za-z0-9 ,.!-]{1,80}") {
        let once = text::slugify(&input);
        prop_assert_eq!(text::slugify(&once), once.clone());
    }

    #[test]
    fn truncation_respects_the_limit(input in "[a-z ]{0,400}", limit in 1_usize..200) {
        let out = text::truncate_words(&input, limit);
        let body = out.trim_end_matches('…');
        prop_assert!(body.chars().count() <= limit);
    }

    #[test]
    fn escaped_html_has_no_raw_markup(input in ".{0,200}") {
        let escaped = text::escape_html(&input);
        prop_assert!(!escaped.contains('<'));
        prop_assert!(!escaped.contains('>'));
        prop_assert!(!escaped.contains('"'));
    }
}
