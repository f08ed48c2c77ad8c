// SPDX-License-Identifier: Apache-2.0

use chambers_core::images::IMAGE_ROUTE_PREFIX;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub const ALLOWED_IMAGE_MIME_TYPES: [&str; 5] = [
    "image/jpeg",
    "image/png",
    "image/webp",
    "image/gif",
    "image/avif",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ImageMime {
    #[serde(rename = "image/jpeg")]
    Jpeg,
    #[serde(rename = "image/png")]
    Png,
    #[serde(rename = "image/webp")]
    Webp,
    #[serde(rename = "image/gif")]
    Gif,
    #[serde(rename = "image/avif")]
    Avif,
}

impl ImageMime {
    /// Accepts a `content-type` value; parameters after `;` are ignored.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let essence = raw.split(';').next().unwrap_or_default().trim();
        match essence.to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/webp" => Some(Self::Webp),
            "image/gif" => Some(Self::Gif),
            "image/avif" => Some(Self::Avif),
            _ => None,
        }
    }

    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "webp" => Some(Self::Webp),
            "gif" => Some(Self::Gif),
            "avif" => Some(Self::Avif),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
            Self::Gif => "image/gif",
            Self::Avif => "image/avif",
        }
    }

    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Webp => "webp",
            Self::Gif => "gif",
            Self::Avif => "avif",
        }
    }

    /// Checks the leading signature bytes of an encoded image.
    #[must_use]
    pub fn matches_magic(self, bytes: &[u8]) -> bool {
        match self {
            Self::Jpeg => bytes.starts_with(&[0xFF, 0xD8, 0xFF]),
            Self::Png => bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]),
            Self::Gif => bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a"),
            Self::Webp => bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP",
            Self::Avif => {
                bytes.len() >= 12
                    && &bytes[4..8] == b"ftyp"
                    && matches!(&bytes[8..12], b"avif" | b"avis")
            }
        }
    }

    /// Sniffs the format from the signature alone.
    #[must_use]
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        [Self::Jpeg, Self::Png, Self::Gif, Self::Webp, Self::Avif]
            .into_iter()
            .find(|mime| mime.matches_magic(bytes))
    }
}

impl Display for ImageMime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[must_use]
pub fn is_allowed_mime(raw: &str) -> bool {
    ALLOWED_IMAGE_MIME_TYPES.contains(&raw.trim())
}

/// Stored image without its payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageMeta {
    pub id: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub sha256: String,
    pub created_at: DateTime<Utc>,
}

impl ImageMeta {
    #[must_use]
    pub fn public_url(&self) -> String {
        format!("{IMAGE_ROUTE_PREFIX}{}", self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBlob {
    pub meta: ImageMeta,
    pub bytes: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn parse_ignores_parameters_and_case() {
        assert_eq!(ImageMime::parse("Image/PNG; charset=binary"), Some(ImageMime::Png));
        assert_eq!(ImageMime::parse("image/jpg"), Some(ImageMime::Jpeg));
        assert_eq!(ImageMime::parse("image/svg+xml"), None);
        assert_eq!(ImageMime::parse("text/html"), None);
    }

    #[test]
    fn magic_bytes_must_agree_with_declared_type() {
        assert!(ImageMime::Png.matches_magic(&PNG_HEADER));
        assert!(!ImageMime::Jpeg.matches_magic(&PNG_HEADER));
        assert!(ImageMime::Gif.matches_magic(b"GIF89a\x01\x00"));
        assert!(ImageMime::Webp.matches_magic(b"RIFF\x24\x00\x00\x00WEBPVP8 "));
        assert!(ImageMime::Avif.matches_magic(b"\x00\x00\x00\x1cftypavif\x00\x00"));
        assert!(!ImageMime::Avif.matches_magic(b"\x00\x00\x00\x1cftypmp42\x00\x00"));
        assert_eq!(ImageMime::sniff(&[0xFF, 0xD8, 0xFF, 0xE0]), Some(ImageMime::Jpeg));
        assert_eq!(ImageMime::sniff(b"<svg"), None);
    }

    #[test]
    fn allow_list_covers_every_variant() {
        for raw in ALLOWED_IMAGE_MIME_TYPES {
            let mime = ImageMime::parse(raw).expect("allowed type parses");
            assert_eq!(mime.as_str(), raw);
            assert_eq!(ImageMime::from_extension(mime.extension()), Some(mime));
        }
        assert!(!is_allowed_mime("image/svg+xml"));
    }
}
