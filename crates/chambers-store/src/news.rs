use crate::{now_utc, opt_ts_col, to_u64, ts_col, ts_to_sql, unique_slug, Store, StoreError};
use chambers_core::text::{excerpt, slugify};
use chambers_model::news::DERIVED_EXCERPT_LEN;
use chambers_model::{non_empty, News, NewsDraft, NewsPatch, Page};
use rusqlite::{params, Connection, OptionalExtension, Row};

const NEWS_COLUMNS: &str = "id, slug, title, excerpt, content, image_url, author, category, \
     published, published_at, created_at, updated_at";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsQuery {
    pub published_only: bool,
    pub category: Option<String>,
    pub limit: u32,
    pub offset: u32,
}

impl Default for NewsQuery {
    fn default() -> Self {
        Self {
            published_only: true,
            category: None,
            limit: 20,
            offset: 0,
        }
    }
}

fn news_from_row(row: &Row<'_>) -> rusqlite::Result<News> {
    Ok(News {
        id: row.get(0)?,
        slug: row.get(1)?,
        title: row.get(2)?,
        excerpt: row.get(3)?,
        content: row.get(4)?,
        image_url: row.get(5)?,
        author: row.get(6)?,
        category: row.get(7)?,
        published: row.get(8)?,
        published_at: opt_ts_col(row, 9)?,
        created_at: ts_col(row, 10)?,
        updated_at: ts_col(row, 11)?,
    })
}

fn load(conn: &Connection, id: i64) -> Result<Option<News>, StoreError> {
    let sql = format!("SELECT {NEWS_COLUMNS} FROM news WHERE id = ?1");
    Ok(conn
        .prepare_cached(&sql)?
        .query_row(params![id], news_from_row)
        .optional()?)
}

fn slug_taken(conn: &Connection, slug: &str, exclude_id: i64) -> Result<bool, StoreError> {
    let hit: Option<i64> = conn
        .prepare_cached("SELECT id FROM news WHERE slug = ?1 AND id != ?2")?
        .query_row(params![slug, exclude_id], |row| row.get(0))
        .optional()?;
    Ok(hit.is_some())
}

impl Store {
    /// Newest first: by publication date (creation date for drafts), then id.
    pub fn list_news(&self, query: &NewsQuery) -> Result<Page<News>, StoreError> {
        let category = query
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty());
        self.with_conn(|conn| {
            let filter = "(?1 = 0 OR published = 1) AND (?2 IS NULL OR category = ?2)";
            let total: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM news WHERE {filter}"),
                params![query.published_only, category],
                |row| row.get(0),
            )?;
            let sql = format!(
                "SELECT {NEWS_COLUMNS} FROM news WHERE {filter} \
                 ORDER BY COALESCE(published_at, created_at) DESC, id DESC LIMIT ?3 OFFSET ?4"
            );
            let mut stmt = conn.prepare_cached(&sql)?;
            let items = stmt
                .query_map(
                    params![query.published_only, category, query.limit, query.offset],
                    news_from_row,
                )?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Page {
                items,
                total: to_u64(total),
            })
        })
    }

    pub fn list_news_categories(&self) -> Result<Vec<String>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT DISTINCT category FROM news \
                 WHERE published = 1 AND category IS NOT NULL ORDER BY category",
            )?;
            let rows = stmt
                .query_map([], |row| row.get(0))?
                .collect::<Result<Vec<String>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_news(&self, id: i64) -> Result<Option<News>, StoreError> {
        self.with_conn(|conn| load(conn, id))
    }

    pub fn get_news_by_slug(&self, slug: &str) -> Result<Option<News>, StoreError> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {NEWS_COLUMNS} FROM news WHERE slug = ?1");
            Ok(conn
                .prepare_cached(&sql)?
                .query_row(params![slug], news_from_row)
                .optional()?)
        })
    }

    pub fn create_news(&self, draft: &NewsDraft) -> Result<News, StoreError> {
        draft.validate()?;
        let now = now_utc();
        let title = draft.title.trim().to_string();
        let content = draft.content.trim().to_string();
        let summary = non_empty(draft.excerpt.clone())
            .unwrap_or_else(|| excerpt(&content, DERIVED_EXCERPT_LEN));
        let published_at = draft.published.then_some(now);
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            let slug = unique_slug(&slugify(&title), |s| slug_taken(&tx, s, -1))?;
            tx.execute(
                "INSERT INTO news (slug, title, excerpt, content, image_url, author, category, \
                 published, published_at, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
                params![
                    slug,
                    title,
                    summary,
                    content,
                    non_empty(draft.image_url.clone()),
                    non_empty(draft.author.clone()),
                    non_empty(draft.category.clone()),
                    draft.published,
                    published_at.as_ref().map(ts_to_sql),
                    ts_to_sql(&now),
                ],
            )?;
            let id = tx.last_insert_rowid();
            let created = load(&tx, id)?.ok_or_else(|| StoreError::not_found("news"))?;
            tx.commit()?;
            tracing::debug!(id, slug = %created.slug, "news created");
            Ok(created)
        })
    }

    /// Applies `patch`; a changed title moves the slug, and the first publish
    /// stamps `published_at`, which later unpublish/republish cycles keep.
    pub fn update_news(&self, id: i64, patch: &NewsPatch) -> Result<News, StoreError> {
        patch.validate()?;
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            let mut news = load(&tx, id)?.ok_or_else(|| StoreError::not_found("news"))?;
            let now = now_utc();
            if let Some(title) = patch.title.as_deref().map(str::trim) {
                if title != news.title {
                    news.slug = unique_slug(&slugify(title), |s| slug_taken(&tx, s, id))?;
                    news.title = title.to_string();
                }
            }
            if let Some(content) = &patch.content {
                let derived = news.excerpt == excerpt(&news.content, DERIVED_EXCERPT_LEN);
                news.content = content.trim().to_string();
                // A hand-written excerpt survives content edits.
                if derived && patch.excerpt.is_none() {
                    news.excerpt = excerpt(&news.content, DERIVED_EXCERPT_LEN);
                }
            }
            if patch.excerpt.is_some() {
                news.excerpt = non_empty(patch.excerpt.clone())
                    .unwrap_or_else(|| excerpt(&news.content, DERIVED_EXCERPT_LEN));
            }
            if patch.image_url.is_some() {
                news.image_url = non_empty(patch.image_url.clone());
            }
            if patch.author.is_some() {
                news.author = non_empty(patch.author.clone());
            }
            if patch.category.is_some() {
                news.category = non_empty(patch.category.clone());
            }
            if let Some(published) = patch.published {
                news.published = published;
                if published && news.published_at.is_none() {
                    news.published_at = Some(now);
                }
            }
            news.updated_at = now;
            tx.execute(
                "UPDATE news SET slug = ?2, title = ?3, excerpt = ?4, content = ?5, \
                 image_url = ?6, author = ?7, category = ?8, published = ?9, \
                 published_at = ?10, updated_at = ?11 WHERE id = ?1",
                params![
                    id,
                    news.slug,
                    news.title,
                    news.excerpt,
                    news.content,
                    news.image_url,
                    news.author,
                    news.category,
                    news.published,
                    news.published_at.as_ref().map(ts_to_sql),
                    ts_to_sql(&news.updated_at),
                ],
            )?;
            tx.commit()?;
            Ok(news)
        })
    }

    pub fn delete_news(&self, id: i64) -> Result<bool, StoreError> {
        self.with_conn(|conn| Ok(conn.execute("DELETE FROM news WHERE id = ?1", params![id])? > 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(title: &str, published: bool) -> NewsDraft {
        NewsDraft {
            title: title.to_string(),
            content: "<p>The court of appeal <b>upheld</b> the ruling in full.</p>".to_string(),
            excerpt: None,
            image_url: None,
            author: Some("Marie Laurent".to_string()),
            category: Some("litigation".to_string()),
            published,
        }
    }

    #[test]
    fn create_derives_excerpt_and_slug() {
        let store = Store::open_in_memory().expect("store");
        let news = store.create_news(&draft("Appeal Upheld!", true)).expect("create");
        assert_eq!(news.slug, "appeal-upheld");
        assert_eq!(news.excerpt, "The court of appeal upheld the ruling in full.");
        assert!(news.published_at.is_some());
        let again = store.create_news(&draft("Appeal upheld", false)).expect("create");
        assert_eq!(again.slug, "appeal-upheld-2");
        assert!(again.published_at.is_none());
    }

    #[test]
    fn first_publish_date_survives_unpublish() {
        let store = Store::open_in_memory().expect("store");
        let news = store.create_news(&draft("Draft", false)).expect("create");
        let publish = NewsPatch {
            published: Some(true),
            ..NewsPatch::default()
        };
        let published = store.update_news(news.id, &publish).expect("publish");
        let stamped = published.published_at.expect("stamped");
        let hidden = store
            .update_news(
                news.id,
                &NewsPatch {
                    published: Some(false),
                    ..NewsPatch::default()
                },
            )
            .expect("unpublish");
        assert!(!hidden.published);
        let again = store.update_news(news.id, &publish).expect("republish");
        assert_eq!(again.published_at, Some(stamped));
    }

    #[test]
    fn title_change_moves_slug_and_empty_strings_clear() {
        let store = Store::open_in_memory().expect("store");
        let news = store.create_news(&draft("Old title", true)).expect("create");
        let updated = store
            .update_news(
                news.id,
                &NewsPatch {
                    title: Some("New title".to_string()),
                    category: Some(String::new()),
                    ..NewsPatch::default()
                },
            )
            .expect("update");
        assert_eq!(updated.slug, "new-title");
        assert_eq!(updated.category, None);
        assert_eq!(store.get_news(news.id).expect("get"), Some(updated));
    }

    #[test]
    fn update_unknown_id_is_not_found() {
        let store = Store::open_in_memory().expect("store");
        let err = store
            .update_news(404, &NewsPatch::default())
            .expect_err("missing");
        assert_eq!(err.code, crate::StoreErrorCode::NotFound);
    }
}
