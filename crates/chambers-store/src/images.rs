use crate::{now_utc, to_u64, ts_col, ts_to_sql, Store, StoreError};
use chambers_core::{is_valid_image_id, sha256_hex};
use chambers_model::{ImageBlob, ImageMeta, ImageMime};
use rusqlite::{params, OptionalExtension, Row};

const META_COLUMNS: &str = "id, mime_type, size_bytes, sha256, created_at";

fn meta_from_row(row: &Row<'_>) -> rusqlite::Result<ImageMeta> {
    let size: i64 = row.get(2)?;
    Ok(ImageMeta {
        id: row.get(0)?,
        mime_type: row.get(1)?,
        size_bytes: to_u64(size),
        sha256: row.get(3)?,
        created_at: ts_col(row, 4)?,
    })
}

impl Store {
    /// Stores an image blob under a fresh opaque id. The payload's signature
    /// must match `mime`.
    pub fn put_image(&self, mime: ImageMime, bytes: &[u8]) -> Result<ImageMeta, StoreError> {
        if bytes.is_empty() {
            return Err(StoreError::validation("image payload is empty"));
        }
        if !mime.matches_magic(bytes) {
            return Err(StoreError::validation(format!(
                "image payload does not look like {mime}"
            )));
        }
        let meta = ImageMeta {
            id: uuid::Uuid::new_v4().simple().to_string(),
            mime_type: mime.as_str().to_string(),
            size_bytes: bytes.len() as u64,
            sha256: sha256_hex(bytes),
            created_at: now_utc(),
        };
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO images (id, mime_type, size_bytes, sha256, bytes, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    meta.id,
                    meta.mime_type,
                    bytes.len() as i64,
                    meta.sha256,
                    bytes,
                    ts_to_sql(&meta.created_at),
                ],
            )?;
            Ok(())
        })?;
        tracing::debug!(id = %meta.id, mime = %meta.mime_type, size = meta.size_bytes, "image stored");
        Ok(meta)
    }

    pub fn get_image(&self, id: &str) -> Result<Option<ImageBlob>, StoreError> {
        if !is_valid_image_id(id) {
            return Err(StoreError::validation(format!("invalid image id: {id}")));
        }
        self.with_conn(|conn| {
            let sql = format!("SELECT {META_COLUMNS}, bytes FROM images WHERE id = ?1");
            Ok(conn
                .prepare_cached(&sql)?
                .query_row(params![id], |row| {
                    Ok(ImageBlob {
                        meta: meta_from_row(row)?,
                        bytes: row.get(5)?,
                    })
                })
                .optional()?)
        })
    }

    pub fn list_images(&self) -> Result<Vec<ImageMeta>, StoreError> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {META_COLUMNS} FROM images ORDER BY created_at DESC, id ASC");
            let mut stmt = conn.prepare_cached(&sql)?;
            let rows = stmt
                .query_map([], meta_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn delete_image(&self, id: &str) -> Result<bool, StoreError> {
        if !is_valid_image_id(id) {
            return Err(StoreError::validation(format!("invalid image id: {id}")));
        }
        self.with_conn(|conn| Ok(conn.execute("DELETE FROM images WHERE id = ?1", params![id])? > 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StoreErrorCode;

    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    #[test]
    fn put_then_get_returns_identical_bytes() {
        let store = Store::open_in_memory().expect("store");
        let meta = store.put_image(ImageMime::Png, PNG).expect("put");
        assert!(is_valid_image_id(&meta.id));
        assert_eq!(meta.sha256, sha256_hex(PNG));
        let blob = store.get_image(&meta.id).expect("get").expect("present");
        assert_eq!(blob.bytes, PNG);
        assert_eq!(blob.meta, meta);
        assert_eq!(store.list_images().expect("list"), vec![meta.clone()]);
        assert!(store.delete_image(&meta.id).expect("delete"));
        assert!(store.get_image(&meta.id).expect("get").is_none());
    }

    #[test]
    fn mismatched_signature_is_rejected() {
        let store = Store::open_in_memory().expect("store");
        let err = store.put_image(ImageMime::Jpeg, PNG).expect_err("mismatch");
        assert_eq!(err.code, StoreErrorCode::Validation);
    }

    #[test]
    fn malformed_id_is_rejected() {
        let store = Store::open_in_memory().expect("store");
        let err = store.get_image("../etc/passwd").expect_err("bad id");
        assert_eq!(err.code, StoreErrorCode::Validation);
    }
}
