use crate::{now_utc, opt_ts_col, ts_col, ts_to_sql, Store, StoreError};
use chambers_model::{
    is_valid_email, normalize_email, NewsletterSubscription, SubscribeOutcome,
};
use rusqlite::{params, Connection, OptionalExtension, Row};

const SUBSCRIPTION_COLUMNS: &str = "id, email, active, subscribed_at, unsubscribed_at";

fn subscription_from_row(row: &Row<'_>) -> rusqlite::Result<NewsletterSubscription> {
    Ok(NewsletterSubscription {
        id: row.get(0)?,
        email: row.get(1)?,
        active: row.get(2)?,
        subscribed_at: ts_col(row, 3)?,
        unsubscribed_at: opt_ts_col(row, 4)?,
    })
}

fn load_by_email(
    conn: &Connection,
    email: &str,
) -> Result<Option<NewsletterSubscription>, StoreError> {
    let sql = format!("SELECT {SUBSCRIPTION_COLUMNS} FROM newsletter_subscriptions WHERE email = ?1");
    Ok(conn
        .prepare_cached(&sql)?
        .query_row(params![email], subscription_from_row)
        .optional()?)
}

impl Store {
    /// Idempotent: an active address is left alone, an inactive one is
    /// reactivated with a fresh `subscribed_at`.
    pub fn subscribe(
        &self,
        email: &str,
    ) -> Result<(NewsletterSubscription, SubscribeOutcome), StoreError> {
        if !is_valid_email(email) {
            return Err(StoreError::validation("email: must be a valid email address"));
        }
        let email = normalize_email(email);
        let now = ts_to_sql(&now_utc());
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            let outcome = match load_by_email(&tx, &email)? {
                Some(existing) if existing.active => SubscribeOutcome::AlreadyActive,
                Some(_) => {
                    tx.execute(
                        "UPDATE newsletter_subscriptions \
                         SET active = 1, subscribed_at = ?2, unsubscribed_at = NULL WHERE email = ?1",
                        params![email, now],
                    )?;
                    SubscribeOutcome::Reactivated
                }
                None => {
                    tx.execute(
                        "INSERT INTO newsletter_subscriptions (email, active, subscribed_at) \
                         VALUES (?1, 1, ?2)",
                        params![email, now],
                    )?;
                    SubscribeOutcome::Created
                }
            };
            let current = load_by_email(&tx, &email)?
                .ok_or_else(|| StoreError::not_found("subscription"))?;
            tx.commit()?;
            Ok((current, outcome))
        })
    }

    /// Returns `true` when an active subscription was switched off.
    pub fn unsubscribe(&self, email: &str) -> Result<bool, StoreError> {
        let email = normalize_email(email);
        let now = ts_to_sql(&now_utc());
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE newsletter_subscriptions SET active = 0, unsubscribed_at = ?2 \
                 WHERE email = ?1 AND active = 1",
                params![email, now],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn list_subscriptions(
        &self,
        active_only: bool,
    ) -> Result<Vec<NewsletterSubscription>, StoreError> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {SUBSCRIPTION_COLUMNS} FROM newsletter_subscriptions \
                 WHERE (?1 = 0 OR active = 1) ORDER BY subscribed_at DESC, id DESC"
            );
            let mut stmt = conn.prepare_cached(&sql)?;
            let rows = stmt
                .query_map(params![active_only], subscription_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn delete_subscription(&self, id: i64) -> Result<bool, StoreError> {
        self.with_conn(|conn| {
            Ok(conn.execute(
                "DELETE FROM newsletter_subscriptions WHERE id = ?1",
                params![id],
            )? > 0)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribe_cycle_reports_outcomes() {
        let store = Store::open_in_memory().expect("store");
        let (sub, outcome) = store.subscribe("Reader@Example.com").expect("subscribe");
        assert_eq!(outcome, SubscribeOutcome::Created);
        assert_eq!(sub.email, "reader@example.com");

        let (_, outcome) = store.subscribe("reader@example.com ").expect("again");
        assert_eq!(outcome, SubscribeOutcome::AlreadyActive);

        assert!(store.unsubscribe("READER@example.com").expect("unsubscribe"));
        assert!(!store.unsubscribe("reader@example.com").expect("second unsubscribe"));
        assert!(store.list_subscriptions(true).expect("active").is_empty());

        let (sub, outcome) = store.subscribe("reader@example.com").expect("back");
        assert_eq!(outcome, SubscribeOutcome::Reactivated);
        assert!(sub.active);
        assert!(sub.unsubscribed_at.is_none());
        assert_eq!(sub.id, store.list_subscriptions(false).expect("all")[0].id);
    }

    #[test]
    fn invalid_email_is_rejected() {
        let store = Store::open_in_memory().expect("store");
        let err = store.subscribe("not an email").expect_err("invalid");
        assert_eq!(err.code, crate::StoreErrorCode::Validation);
    }
}
