use regex::Regex;
use std::sync::OnceLock;

/// Opaque image identifiers are simple-format UUID v4 strings.
pub const IMAGE_ID_PATTERN: &str = r"^[a-f0-9]{32}$";
pub const PLACEHOLDER_IMAGE_URL: &str = "/static/placeholder.svg";
pub const IMAGE_ROUTE_PREFIX: &str = "/api/images/";
pub const UPLOAD_ROUTE_PREFIX: &str = "/uploads/";
const DB_REFERENCE_PREFIX: &str = "db:";

fn image_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(IMAGE_ID_PATTERN).expect("image id pattern compiles"))
}

#[must_use]
pub fn is_valid_image_id(raw: &str) -> bool {
    image_id_regex().is_match(raw)
}

/// Turns whatever an editor stored in an `image_url` column into a URL a
/// browser can fetch.
///
/// - absolute (`http(s)://`) and root-relative (`/…`) values pass through;
/// - `db:<id>` and bare image ids point at the blob endpoint;
/// - any other bare value is treated as a file name under `/uploads/`;
/// - empty or missing values fall back to `placeholder`.
#[must_use]
pub fn resolve_image_url(raw: Option<&str>, placeholder: &str) -> String {
    let Some(value) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
        return placeholder.to_string();
    };
    if value.starts_with("http://") || value.starts_with("https://") || value.starts_with('/') {
        return value.to_string();
    }
    if let Some(id) = value.strip_prefix(DB_REFERENCE_PREFIX) {
        return if is_valid_image_id(id) {
            format!("{IMAGE_ROUTE_PREFIX}{id}")
        } else {
            placeholder.to_string()
        };
    }
    if is_valid_image_id(value) {
        return format!("{IMAGE_ROUTE_PREFIX}{value}");
    }
    if value.contains("..") || value.contains('\\') {
        return placeholder.to_string();
    }
    format!("{UPLOAD_ROUTE_PREFIX}{value}")
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn image_id_validation_is_strict() {
        assert!(is_valid_image_id(ID));
        assert!(!is_valid_image_id("0123456789ABCDEF0123456789ABCDEF"));
        assert!(!is_valid_image_id("../etc/passwd"));
        assert!(!is_valid_image_id(&format!("{ID}0")));
    }

    #[test]
    fn resolves_every_reference_shape() {
        let ph = PLACEHOLDER_IMAGE_URL;
        assert_eq!(resolve_image_url(None, ph), ph);
        assert_eq!(resolve_image_url(Some("  "), ph), ph);
        assert_eq!(
            resolve_image_url(Some("https://cdn.example.com/a.jpg"), ph),
            "https://cdn.example.com/a.jpg"
        );
        assert_eq!(resolve_image_url(Some("/images/team.jpg"), ph), "/images/team.jpg");
        assert_eq!(
            resolve_image_url(Some(&format!("db:{ID}")), ph),
            format!("/api/images/{ID}")
        );
        assert_eq!(resolve_image_url(Some(ID), ph), format!("/api/images/{ID}"));
        assert_eq!(resolve_image_url(Some("portrait.png"), ph), "/uploads/portrait.png");
    }

    #[test]
    fn rejects_traversal_and_bad_db_refs() {
        let ph = PLACEHOLDER_IMAGE_URL;
        assert_eq!(resolve_image_url(Some("../secret.png"), ph), ph);
        assert_eq!(resolve_image_url(Some("db:nope"), ph), ph);
    }
}
