//! Disk storage for uploaded images, one flat directory of opaque names.

use crate::{StoreError, StoreErrorCode};
use chambers_model::ImageMime;
use regex::Regex;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub const UPLOAD_NAME_PATTERN: &str = r"^[a-f0-9]{32}\.(jpg|png|webp|gif|avif)$";

fn upload_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(UPLOAD_NAME_PATTERN).expect("upload name pattern compiles"))
}

#[must_use]
pub fn is_valid_upload_name(name: &str) -> bool {
    upload_name_regex().is_match(name)
}

#[derive(Debug, Clone)]
pub struct UploadDir {
    root: PathBuf,
}

impl UploadDir {
    pub fn open(root: &Path) -> Result<Self, StoreError> {
        fs::create_dir_all(root).map_err(|e| StoreError::io(&e))?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes through a temp file and renames it into place; returns the
    /// generated file name.
    pub fn save(&self, mime: ImageMime, bytes: &[u8]) -> Result<String, StoreError> {
        if bytes.is_empty() {
            return Err(StoreError::validation("image payload is empty"));
        }
        if !mime.matches_magic(bytes) {
            return Err(StoreError::validation(format!(
                "image payload does not look like {mime}"
            )));
        }
        let name = format!(
            "{}.{}",
            uuid::Uuid::new_v4().simple(),
            mime.extension()
        );
        let tmp = self.root.join(format!(".{name}.tmp"));
        fs::write(&tmp, bytes).map_err(|e| StoreError::io(&e))?;
        if let Err(e) = fs::rename(&tmp, self.root.join(&name)) {
            let _ = fs::remove_file(&tmp);
            return Err(StoreError::io(&e));
        }
        Ok(name)
    }

    pub fn read(&self, name: &str) -> Result<Option<(ImageMime, Vec<u8>)>, StoreError> {
        let path = self.checked_path(name)?;
        let mime = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .and_then(ImageMime::from_extension)
            .ok_or_else(|| StoreError::validation(format!("invalid upload name: {name}")))?;
        match fs::read(path) {
            Ok(bytes) => Ok(Some((mime, bytes))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(&e)),
        }
    }

    pub fn delete(&self, name: &str) -> Result<bool, StoreError> {
        let path = self.checked_path(name)?;
        match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::io(&e)),
        }
    }

    /// Stored names, sorted.
    pub fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root).map_err(|e| StoreError::io(&e))? {
            let entry = entry.map_err(|e| StoreError::io(&e))?;
            if let Some(name) = entry.file_name().to_str() {
                if is_valid_upload_name(name) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn checked_path(&self, name: &str) -> Result<PathBuf, StoreError> {
        if !is_valid_upload_name(name) {
            return Err(StoreError::new(
                StoreErrorCode::Validation,
                format!("invalid upload name: {name}"),
            ));
        }
        Ok(self.root.join(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GIF: &[u8] = b"GIF89a\x01\x00\x01\x00";

    #[test]
    fn save_read_delete_cycle() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let dir = UploadDir::open(&tmp.path().join("uploads")).expect("open");
        let name = dir.save(ImageMime::Gif, GIF).expect("save");
        assert!(is_valid_upload_name(&name));
        assert!(name.ends_with(".gif"));
        assert_eq!(dir.list().expect("list"), vec![name.clone()]);

        let (mime, bytes) = dir.read(&name).expect("read").expect("present");
        assert_eq!(mime, ImageMime::Gif);
        assert_eq!(bytes, GIF);

        assert!(dir.delete(&name).expect("delete"));
        assert!(dir.read(&name).expect("read").is_none());
        assert!(!dir.delete(&name).expect("delete twice"));
    }

    #[test]
    fn traversal_names_are_rejected() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let dir = UploadDir::open(tmp.path()).expect("open");
        for bad in ["../secret.png", "0123456789abcdef0123456789abcdef.svg", "x.png"] {
            let err = dir.read(bad).expect_err("rejected");
            assert_eq!(err.code, StoreErrorCode::Validation);
        }
    }

    #[test]
    fn temp_files_do_not_leak_into_listing() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let dir = UploadDir::open(tmp.path()).expect("open");
        fs::write(tmp.path().join(".partial.tmp"), b"x").expect("write");
        assert!(dir.list().expect("list").is_empty());
    }
}
