use crate::{now_utc, to_u64, ts_col, ts_to_sql, Store, StoreError};
use chambers_model::{non_empty, ContactMessage, ContactStatus, ContactSubmission, Page};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

const CONTACT_COLUMNS: &str = "id, name, email, phone, subject, message, status, created_at";

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<ContactMessage> {
    let raw_status: String = row.get(6)?;
    let status = ContactStatus::parse(&raw_status)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e)))?;
    Ok(ContactMessage {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        subject: row.get(4)?,
        message: row.get(5)?,
        status,
        created_at: ts_col(row, 7)?,
    })
}

fn load(conn: &Connection, id: i64) -> Result<Option<ContactMessage>, StoreError> {
    let sql = format!("SELECT {CONTACT_COLUMNS} FROM contact_messages WHERE id = ?1");
    Ok(conn
        .prepare_cached(&sql)?
        .query_row(params![id], message_from_row)
        .optional()?)
}

impl Store {
    pub fn create_contact_message(
        &self,
        submission: &ContactSubmission,
    ) -> Result<ContactMessage, StoreError> {
        submission.validate()?;
        let now = ts_to_sql(&now_utc());
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO contact_messages (name, email, phone, subject, message, status, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, 'new', ?6)",
                params![
                    submission.name.trim(),
                    submission.email.trim(),
                    non_empty(submission.phone.clone()),
                    non_empty(submission.subject.clone()),
                    submission.message.trim(),
                    now,
                ],
            )?;
            let id = conn.last_insert_rowid();
            load(conn, id)?.ok_or_else(|| StoreError::not_found("contact message"))
        })
    }

    /// Newest first, optionally narrowed to one status.
    pub fn list_contact_messages(
        &self,
        status: Option<ContactStatus>,
        limit: u32,
        offset: u32,
    ) -> Result<Page<ContactMessage>, StoreError> {
        let status = status.map(ContactStatus::as_str);
        self.with_conn(|conn| {
            let total: i64 = conn.query_row(
                "SELECT COUNT(*) FROM contact_messages WHERE (?1 IS NULL OR status = ?1)",
                params![status],
                |row| row.get(0),
            )?;
            let sql = format!(
                "SELECT {CONTACT_COLUMNS} FROM contact_messages WHERE (?1 IS NULL OR status = ?1) \
                 ORDER BY created_at DESC, id DESC LIMIT ?2 OFFSET ?3"
            );
            let mut stmt = conn.prepare_cached(&sql)?;
            let items = stmt
                .query_map(params![status, limit, offset], message_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Page {
                items,
                total: to_u64(total),
            })
        })
    }

    pub fn get_contact_message(&self, id: i64) -> Result<Option<ContactMessage>, StoreError> {
        self.with_conn(|conn| load(conn, id))
    }

    pub fn update_contact_status(
        &self,
        id: i64,
        status: ContactStatus,
    ) -> Result<ContactMessage, StoreError> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE contact_messages SET status = ?2 WHERE id = ?1",
                params![id, status.as_str()],
            )?;
            if changed == 0 {
                return Err(StoreError::not_found("contact message"));
            }
            load(conn, id)?.ok_or_else(|| StoreError::not_found("contact message"))
        })
    }

    pub fn delete_contact_message(&self, id: i64) -> Result<bool, StoreError> {
        self.with_conn(|conn| {
            Ok(conn.execute("DELETE FROM contact_messages WHERE id = ?1", params![id])? > 0)
        })
    }
}
