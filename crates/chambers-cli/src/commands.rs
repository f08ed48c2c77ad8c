use crate::{CliError, ExportFormat, OutputMode, StorageCli};
use chambers_core::images::UPLOAD_ROUTE_PREFIX;
use chambers_core::sha256_hex;
use chambers_model::{ImageMime, NewsletterSubscription};
use chambers_store::{Store, UploadDir, SCHEMA_VERSION};
use chrono::SecondsFormat;
use rusqlite::{Connection, OpenFlags};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

const COUNTED_TABLES: [&str; 5] = [
    "news",
    "team_members",
    "contact_messages",
    "newsletter_subscriptions",
    "images",
];

pub(crate) struct ImportImageArgs {
    pub(crate) path: PathBuf,
    pub(crate) storage: StorageCli,
    pub(crate) upload_dir: PathBuf,
    pub(crate) mime: Option<String>,
    pub(crate) max_bytes: usize,
}

pub(crate) fn emit_ok(output_mode: OutputMode, payload: &Value) -> Result<(), CliError> {
    let text = if output_mode.json {
        serde_json::to_string(payload)
    } else {
        serde_json::to_string_pretty(payload)
    }
    .map_err(|e| CliError::internal(e.to_string()))?;
    println!("{text}");
    Ok(())
}

fn require_existing(db: &Path) -> Result<(), CliError> {
    if db.is_file() {
        Ok(())
    } else {
        Err(CliError::dependency(format!("database not found: {}", db.display()))
            .with_detail("db", &db.display().to_string()))
    }
}

pub(crate) fn init_db(db: &Path, output_mode: OutputMode) -> Result<(), CliError> {
    let existed = db.is_file();
    let store = Store::open(db)?;
    let schema_version = store.schema_version()?;
    let created_at = store.meta("created_at")?;
    tracing::info!(db = %db.display(), schema_version, existed, "database ready");
    emit_ok(
        output_mode,
        &json!({
            "command": "init-db",
            "status": "ok",
            "db": db,
            "created": !existed,
            "schema_version": schema_version,
            "created_at": created_at,
        }),
    )
}

/// Picks the image type from `declared` when given, otherwise from the
/// payload signature, and insists the two agree.
pub(crate) fn resolve_mime(declared: Option<&str>, bytes: &[u8]) -> Result<ImageMime, CliError> {
    let mime = match declared {
        Some(raw) => ImageMime::parse(raw)
            .ok_or_else(|| CliError::validation(&format!("unsupported image type: {raw}")))?,
        None => ImageMime::sniff(bytes).ok_or_else(|| {
            CliError::validation("file is not a recognised jpeg, png, webp, gif or avif image")
        })?,
    };
    if !mime.matches_magic(bytes) {
        return Err(CliError::validation(&format!(
            "file contents do not match {mime}"
        )));
    }
    Ok(mime)
}

pub(crate) fn import_image(
    db: &Path,
    args: ImportImageArgs,
    output_mode: OutputMode,
) -> Result<(), CliError> {
    let bytes = fs::read(&args.path).map_err(|e| {
        CliError::dependency(format!("failed to read {}: {e}", args.path.display()))
    })?;
    if bytes.is_empty() {
        return Err(CliError::validation("image file is empty"));
    }
    if bytes.len() > args.max_bytes {
        return Err(CliError::validation(&format!(
            "image is {} bytes; the limit is {}",
            bytes.len(),
            args.max_bytes
        )));
    }
    let mime = resolve_mime(args.mime.as_deref(), &bytes)?;

    let payload = match args.storage {
        StorageCli::Db => {
            let store = Store::open(db)?;
            let meta = store.put_image(mime, &bytes)?;
            tracing::info!(id = %meta.id, size_bytes = meta.size_bytes, "image stored in database");
            json!({
                "command": "import-image",
                "storage": "database",
                "id": meta.id,
                "url": meta.public_url(),
                "mime_type": meta.mime_type,
                "size_bytes": meta.size_bytes,
                "sha256": meta.sha256,
            })
        }
        StorageCli::Disk => {
            let uploads = UploadDir::open(&args.upload_dir)?;
            let name = uploads.save(mime, &bytes)?;
            tracing::info!(name = %name, dir = %args.upload_dir.display(), "image written to disk");
            json!({
                "command": "import-image",
                "storage": "disk",
                "id": name,
                "url": format!("{UPLOAD_ROUTE_PREFIX}{name}"),
                "mime_type": mime.as_str(),
                "size_bytes": bytes.len(),
                "sha256": sha256_hex(&bytes),
            })
        }
    };
    emit_ok(output_mode, &payload)
}

fn csv_field(raw: &str) -> String {
    if raw.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw.to_string()
    }
}

pub(crate) fn subscribers_csv(rows: &[NewsletterSubscription]) -> String {
    let mut out = String::from("email,active,subscribed_at,unsubscribed_at\n");
    for row in rows {
        let unsubscribed = row
            .unsubscribed_at
            .map(|ts| ts.to_rfc3339_opts(SecondsFormat::Secs, true))
            .unwrap_or_default();
        out.push_str(&format!(
            "{},{},{},{}\n",
            csv_field(&row.email),
            row.active,
            row.subscribed_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            unsubscribed
        ));
    }
    out
}

pub(crate) fn export_subscribers(
    db: &Path,
    format: ExportFormat,
    include_inactive: bool,
    out: Option<PathBuf>,
    output_mode: OutputMode,
) -> Result<(), CliError> {
    require_existing(db)?;
    let store = Store::open(db)?;
    let rows = store.list_subscriptions(!include_inactive)?;
    let rendered = match format {
        ExportFormat::Csv => subscribers_csv(&rows),
        ExportFormat::Json => {
            let mut text = serde_json::to_string_pretty(&rows)
                .map_err(|e| CliError::internal(e.to_string()))?;
            text.push('\n');
            text
        }
    };
    match out {
        Some(path) => {
            fs::write(&path, rendered.as_bytes()).map_err(|e| {
                CliError::dependency(format!("failed to write {}: {e}", path.display()))
            })?;
            tracing::info!(count = rows.len(), out = %path.display(), "subscribers exported");
            emit_ok(
                output_mode,
                &json!({
                    "command": "export-subscribers",
                    "status": "ok",
                    "format": match format {
                        ExportFormat::Csv => "csv",
                        ExportFormat::Json => "json",
                    },
                    "count": rows.len(),
                    "out": path,
                }),
            )
        }
        None => {
            print!("{rendered}");
            Ok(())
        }
    }
}

/// Read-only view of a database; never migrates.
pub(crate) fn inspect_db(
    db: &Path,
    sample_rows: usize,
    output_mode: OutputMode,
) -> Result<(), CliError> {
    require_existing(db)?;
    let conn = Connection::open_with_flags(
        db,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| CliError::dependency(e.to_string()))?;
    let sql_err = |e: rusqlite::Error| CliError::dependency(e.to_string());

    let schema_version: i64 = conn
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .map_err(sql_err)?;
    if schema_version == 0 {
        return Err(CliError::validation("database has no chambers schema; run init-db")
            .with_detail("db", &db.display().to_string()));
    }

    let mut meta_stmt = conn
        .prepare("SELECT k, v FROM chambers_meta ORDER BY k")
        .map_err(sql_err)?;
    let meta = meta_stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
        .map_err(sql_err)?
        .collect::<Result<BTreeMap<_, _>, _>>()
        .map_err(sql_err)?;

    let mut idx_stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type='index' AND name NOT LIKE 'sqlite_%' ORDER BY name")
        .map_err(sql_err)?;
    let indexes = idx_stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(sql_err)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(sql_err)?;

    let mut counts = BTreeMap::new();
    for table in COUNTED_TABLES {
        let n: i64 = conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
            .map_err(sql_err)?;
        counts.insert(table, n);
    }
    let unread: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM contact_messages WHERE status = 'new'",
            [],
            |row| row.get(0),
        )
        .map_err(sql_err)?;
    let image_bytes: i64 = conn
        .query_row("SELECT COALESCE(SUM(size_bytes), 0) FROM images", [], |row| {
            row.get(0)
        })
        .map_err(sql_err)?;

    let mut news_stmt = conn
        .prepare(
            "SELECT id, slug, title, published FROM news \
             ORDER BY COALESCE(published_at, created_at) DESC, id DESC LIMIT ?1",
        )
        .map_err(sql_err)?;
    let recent_news = news_stmt
        .query_map([sample_rows as i64], |row| {
            Ok(json!({
                "id": row.get::<_, i64>(0)?,
                "slug": row.get::<_, String>(1)?,
                "title": row.get::<_, String>(2)?,
                "published": row.get::<_, bool>(3)?,
            }))
        })
        .map_err(sql_err)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(sql_err)?;

    emit_ok(
        output_mode,
        &json!({
            "command": "inspect-db",
            "db": db,
            "schema_version": schema_version,
            "schema_current": schema_version == SCHEMA_VERSION,
            "meta": meta,
            "indexes": indexes,
            "counts": counts,
            "unread_messages": unread,
            "image_bytes": image_bytes,
            "recent_news": recent_news,
        }),
    )
}

pub(crate) fn write_openapi(out: Option<PathBuf>, output_mode: OutputMode) -> Result<(), CliError> {
    let spec = chambers_api::openapi_v1_spec();
    let text =
        serde_json::to_string_pretty(&spec).map_err(|e| CliError::internal(e.to_string()))?;
    match out {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).map_err(|e| CliError::dependency(e.to_string()))?;
            }
            fs::write(&path, format!("{text}\n")).map_err(|e| {
                CliError::dependency(format!("failed to write {}: {e}", path.display()))
            })?;
            emit_ok(
                output_mode,
                &json!({"command": "openapi", "status": "ok", "out": path}),
            )
        }
        None => {
            println!("{text}");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13];

    #[test]
    fn csv_quotes_only_when_needed() {
        assert_eq!(csv_field("a@example.com"), "a@example.com");
        assert_eq!(csv_field("odd,\"name\""), "\"odd,\"\"name\"\"\"");
    }

    #[test]
    fn csv_export_has_header_and_utc_timestamps() {
        let rows = vec![NewsletterSubscription {
            id: 1,
            email: "a@example.com".to_string(),
            active: false,
            subscribed_at: Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).single().expect("ts"),
            unsubscribed_at: Utc.with_ymd_and_hms(2026, 4, 2, 8, 0, 0).single(),
        }];
        let csv = subscribers_csv(&rows);
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(lines[0], "email,active,subscribed_at,unsubscribed_at");
        assert_eq!(
            lines[1],
            "a@example.com,false,2026-03-01T09:30:00Z,2026-04-02T08:00:00Z"
        );
    }

    #[test]
    fn mime_is_sniffed_and_cross_checked() {
        assert_eq!(resolve_mime(None, PNG).expect("sniff"), ImageMime::Png);
        assert_eq!(
            resolve_mime(Some("image/png"), PNG).expect("declared"),
            ImageMime::Png
        );
        assert!(resolve_mime(Some("image/jpeg"), PNG).is_err());
        assert!(resolve_mime(Some("image/svg+xml"), PNG).is_err());
        assert!(resolve_mime(None, b"plain text").is_err());
    }
}
