use crate::{now_utc, ts_col, ts_to_sql, unique_slug, Store, StoreError};
use chambers_core::text::slugify;
use chambers_model::team::normalize_specialties;
use chambers_model::{non_empty, normalize_email, TeamMember, TeamMemberDraft, TeamMemberPatch};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

const TEAM_COLUMNS: &str = "id, slug, name, role, bio, email, phone, image_url, linkedin_url, \
     specialties, display_order, active, created_at, updated_at";

fn member_from_row(row: &Row<'_>) -> rusqlite::Result<TeamMember> {
    let specialties_raw: String = row.get(9)?;
    let specialties: Vec<String> = serde_json::from_str(&specialties_raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(9, Type::Text, Box::new(e)))?;
    Ok(TeamMember {
        id: row.get(0)?,
        slug: row.get(1)?,
        name: row.get(2)?,
        role: row.get(3)?,
        bio: row.get(4)?,
        email: row.get(5)?,
        phone: row.get(6)?,
        image_url: row.get(7)?,
        linkedin_url: row.get(8)?,
        specialties,
        display_order: row.get(10)?,
        active: row.get(11)?,
        created_at: ts_col(row, 12)?,
        updated_at: ts_col(row, 13)?,
    })
}

fn load(conn: &Connection, id: i64) -> Result<Option<TeamMember>, StoreError> {
    let sql = format!("SELECT {TEAM_COLUMNS} FROM team_members WHERE id = ?1");
    Ok(conn
        .prepare_cached(&sql)?
        .query_row(params![id], member_from_row)
        .optional()?)
}

fn slug_taken(conn: &Connection, slug: &str, exclude_id: i64) -> Result<bool, StoreError> {
    let hit: Option<i64> = conn
        .prepare_cached("SELECT id FROM team_members WHERE slug = ?1 AND id != ?2")?
        .query_row(params![slug, exclude_id], |row| row.get(0))
        .optional()?;
    Ok(hit.is_some())
}

fn specialties_json(specialties: &[String]) -> Result<String, StoreError> {
    serde_json::to_string(&normalize_specialties(specialties))
        .map_err(|e| StoreError::validation(e.to_string()))
}

fn clean_email(raw: Option<String>) -> Option<String> {
    non_empty(raw).map(|e| normalize_email(&e))
}

impl Store {
    /// Ordered for display: `display_order`, then name.
    pub fn list_team(&self, active_only: bool) -> Result<Vec<TeamMember>, StoreError> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {TEAM_COLUMNS} FROM team_members WHERE (?1 = 0 OR active = 1) \
                 ORDER BY display_order ASC, name COLLATE NOCASE ASC, id ASC"
            );
            let mut stmt = conn.prepare_cached(&sql)?;
            let rows = stmt
                .query_map(params![active_only], member_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_team_member(&self, id: i64) -> Result<Option<TeamMember>, StoreError> {
        self.with_conn(|conn| load(conn, id))
    }

    pub fn get_team_member_by_slug(&self, slug: &str) -> Result<Option<TeamMember>, StoreError> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {TEAM_COLUMNS} FROM team_members WHERE slug = ?1");
            Ok(conn
                .prepare_cached(&sql)?
                .query_row(params![slug], member_from_row)
                .optional()?)
        })
    }

    pub fn create_team_member(&self, draft: &TeamMemberDraft) -> Result<TeamMember, StoreError> {
        draft.validate()?;
        let now = ts_to_sql(&now_utc());
        let name = draft.name.trim().to_string();
        let specialties = specialties_json(&draft.specialties)?;
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            let slug = unique_slug(&slugify(&name), |s| slug_taken(&tx, s, -1))?;
            tx.execute(
                "INSERT INTO team_members (slug, name, role, bio, email, phone, image_url, \
                 linkedin_url, specialties, display_order, active, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)",
                params![
                    slug,
                    name,
                    draft.role.trim(),
                    draft.bio.trim(),
                    clean_email(draft.email.clone()),
                    non_empty(draft.phone.clone()),
                    non_empty(draft.image_url.clone()),
                    non_empty(draft.linkedin_url.clone()),
                    specialties,
                    draft.display_order,
                    draft.active,
                    now,
                ],
            )?;
            let id = tx.last_insert_rowid();
            let created = load(&tx, id)?.ok_or_else(|| StoreError::not_found("team member"))?;
            tx.commit()?;
            Ok(created)
        })
    }

    pub fn update_team_member(
        &self,
        id: i64,
        patch: &TeamMemberPatch,
    ) -> Result<TeamMember, StoreError> {
        patch.validate()?;
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            let mut member =
                load(&tx, id)?.ok_or_else(|| StoreError::not_found("team member"))?;
            if let Some(name) = patch.name.as_deref().map(str::trim) {
                if name != member.name {
                    member.slug = unique_slug(&slugify(name), |s| slug_taken(&tx, s, id))?;
                    member.name = name.to_string();
                }
            }
            if let Some(role) = &patch.role {
                member.role = role.trim().to_string();
            }
            if let Some(bio) = &patch.bio {
                member.bio = bio.trim().to_string();
            }
            if patch.email.is_some() {
                member.email = clean_email(patch.email.clone());
            }
            if patch.phone.is_some() {
                member.phone = non_empty(patch.phone.clone());
            }
            if patch.image_url.is_some() {
                member.image_url = non_empty(patch.image_url.clone());
            }
            if patch.linkedin_url.is_some() {
                member.linkedin_url = non_empty(patch.linkedin_url.clone());
            }
            if let Some(specialties) = &patch.specialties {
                member.specialties = normalize_specialties(specialties);
            }
            if let Some(order) = patch.display_order {
                member.display_order = order;
            }
            if let Some(active) = patch.active {
                member.active = active;
            }
            member.updated_at = now_utc();
            tx.execute(
                "UPDATE team_members SET slug = ?2, name = ?3, role = ?4, bio = ?5, email = ?6, \
                 phone = ?7, image_url = ?8, linkedin_url = ?9, specialties = ?10, \
                 display_order = ?11, active = ?12, updated_at = ?13 WHERE id = ?1",
                params![
                    id,
                    member.slug,
                    member.name,
                    member.role,
                    member.bio,
                    member.email,
                    member.phone,
                    member.image_url,
                    member.linkedin_url,
                    specialties_json(&member.specialties)?,
                    member.display_order,
                    member.active,
                    ts_to_sql(&member.updated_at),
                ],
            )?;
            tx.commit()?;
            Ok(member)
        })
    }

    pub fn delete_team_member(&self, id: i64) -> Result<bool, StoreError> {
        self.with_conn(|conn| {
            Ok(conn.execute("DELETE FROM team_members WHERE id = ?1", params![id])? > 0)
        })
    }
}
