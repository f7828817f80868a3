//! Typed query helpers for every table in the commitcensus database.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::debug;

use super::Database;
use crate::aggregate::Summary;
use crate::errors::DatabaseError;
use crate::identity::RawCommitRecord;
use crate::models::Platform;

// ---------------------------------------------------------------------------
// Domain structs returned by queries
// ---------------------------------------------------------------------------

/// A row from the `repositories` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryEntry {
    pub platform: Platform,
    pub path: String,
    pub remote_id: Option<String>,
    pub selected: bool,
    pub listed_at: Option<String>,
    /// Set once commits were fetched for the repository.
    pub fetched_at: Option<String>,
    pub commit_count: i64,
}

/// A row from the `census_runs` table.
#[derive(Debug, Clone)]
pub struct CensusRunEntry {
    pub id: i64,
    pub started_at: String,
    pub completed_at: Option<String>,
    pub platforms: Vec<Platform>,
    pub summary: Option<Summary>,
}

/// A commit payload ready to be stored.
struct CommitRow {
    commit_id: String,
    committed_at: Option<String>,
    payload: String,
}

// ---------------------------------------------------------------------------
// Query implementations
// ---------------------------------------------------------------------------

impl Database {
    // -- repositories -------------------------------------------------------

    /// Record a listed repository. An existing row keeps its fetch state and
    /// has its remote id and selection flag refreshed.
    pub fn upsert_repository(
        &self,
        platform: Platform,
        path: &str,
        remote_id: Option<&str>,
        selected: bool,
    ) -> Result<(), DatabaseError> {
        let now = timestamp(Utc::now());
        let conn = self.conn();
        conn.execute(
            "INSERT INTO repositories (platform, path, remote_id, selected, listed_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(platform, path) DO UPDATE SET
                remote_id = COALESCE(excluded.remote_id, repositories.remote_id),
                selected = excluded.selected,
                listed_at = excluded.listed_at",
            params![platform.tag(), path, remote_id, selected, now],
        )?;
        debug!(platform = %platform, path, selected, "upserted repository");
        Ok(())
    }

    /// Change the selection flag of a known repository.
    pub fn set_repository_selected(
        &self,
        platform: Platform,
        path: &str,
        selected: bool,
    ) -> Result<(), DatabaseError> {
        let conn = self.conn();
        let changed = conn.execute(
            "UPDATE repositories SET selected = ?1 WHERE platform = ?2 AND path = ?3",
            params![selected, platform.tag(), path],
        )?;
        if changed == 0 {
            return Err(DatabaseError::NotFound {
                entity: "repository".into(),
                id: format!("{platform}:{path}"),
            });
        }
        Ok(())
    }

    pub fn get_repository(
        &self,
        platform: Platform,
        path: &str,
    ) -> Result<Option<RepositoryEntry>, DatabaseError> {
        let conn = self.conn();
        let entry = conn
            .query_row(
                "SELECT platform, path, remote_id, selected, listed_at, fetched_at, commit_count
                 FROM repositories WHERE platform = ?1 AND path = ?2",
                params![platform.tag(), path],
                repository_from_row,
            )
            .optional()?;
        Ok(entry)
    }

    /// Every known repository of `platform`, ordered by path.
    pub fn list_repositories(&self, platform: Platform) -> Result<Vec<RepositoryEntry>, DatabaseError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT platform, path, remote_id, selected, listed_at, fetched_at, commit_count
             FROM repositories WHERE platform = ?1 ORDER BY path",
        )?;
        let entries = stmt
            .query_map(params![platform.tag()], repository_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Selected repositories of `platform`, ordered by path.
    pub fn selected_repositories(
        &self,
        platform: Platform,
    ) -> Result<Vec<RepositoryEntry>, DatabaseError> {
        Ok(self
            .list_repositories(platform)?
            .into_iter()
            .filter(|r| r.selected)
            .collect())
    }

    /// `(selected, total)` repository counts for `platform`.
    pub fn repository_counts(&self, platform: Platform) -> Result<(u64, u64), DatabaseError> {
        let conn = self.conn();
        let (selected, total): (i64, i64) = conn.query_row(
            "SELECT COALESCE(SUM(selected), 0), COUNT(*) FROM repositories WHERE platform = ?1",
            params![platform.tag()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok((selected.max(0) as u64, total.max(0) as u64))
    }

    /// Stamp a repository as fetched and refresh its stored commit count.
    pub fn mark_fetched(&self, platform: Platform, path: &str) -> Result<(), DatabaseError> {
        let now = timestamp(Utc::now());
        let conn = self.conn();
        let changed = conn.execute(
            "UPDATE repositories SET
                fetched_at = ?1,
                commit_count = (SELECT COUNT(*) FROM commits
                                WHERE platform = ?2 AND repo_path = ?3)
             WHERE platform = ?2 AND path = ?3",
            params![now, platform.tag(), path],
        )?;
        if changed == 0 {
            return Err(DatabaseError::NotFound {
                entity: "repository".into(),
                id: format!("{platform}:{path}"),
            });
        }
        debug!(platform = %platform, path, "marked repository fetched");
        Ok(())
    }

    // -- commits ------------------------------------------------------------

    /// Store raw commit payloads for a repository. Commits already stored
    /// under the same id are left untouched. Returns how many were new.
    pub fn insert_commits(
        &self,
        platform: Platform,
        repo_path: &str,
        payloads: &[Value],
    ) -> Result<usize, DatabaseError> {
        let rows = commit_rows(platform, payloads)?;
        let inserted =
            self.transaction(|conn| insert_commit_rows(conn, platform, repo_path, &rows))?;
        debug!(platform = %platform, repo_path, inserted, offered = rows.len(), "stored commits");
        Ok(inserted)
    }

    /// Drop every stored commit of a repository and store `payloads` in
    /// their place, atomically.
    pub fn replace_commits(
        &self,
        platform: Platform,
        repo_path: &str,
        payloads: &[Value],
    ) -> Result<usize, DatabaseError> {
        let rows = commit_rows(platform, payloads)?;
        let inserted = self.transaction(|conn| {
            let removed = conn.execute(
                "DELETE FROM commits WHERE platform = ?1 AND repo_path = ?2",
                params![platform.tag(), repo_path],
            )?;
            debug!(platform = %platform, repo_path, removed, "cleared stored commits");
            insert_commit_rows(conn, platform, repo_path, &rows)
        })?;
        Ok(inserted)
    }

    /// Read back a repository's commits as typed records.
    ///
    /// With `since`, only commits at or after that instant are returned;
    /// commits without a timestamp are always kept. Payloads that no longer
    /// fit the platform's record shape are skipped.
    pub fn load_commit_records(
        &self,
        platform: Platform,
        repo_path: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<RawCommitRecord>, DatabaseError> {
        let since = since.map(timestamp);
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT commit_id, payload FROM commits
             WHERE platform = ?1 AND repo_path = ?2
               AND (?3 IS NULL OR committed_at IS NULL OR committed_at >= ?3)
             ORDER BY commit_id",
        )?;
        let rows = stmt
            .query_map(params![platform.tag(), repo_path, since], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut records = Vec::with_capacity(rows.len());
        for (commit_id, payload) in rows {
            match RawCommitRecord::from_payload(platform, &payload) {
                Ok(record) => records.push(record),
                Err(e) => debug!(
                    platform = %platform,
                    repo_path,
                    commit_id,
                    error = %e,
                    "skipping malformed stored commit"
                ),
            }
        }
        Ok(records)
    }

    /// Number of stored commits for `platform`.
    pub fn count_commits(&self, platform: Platform) -> Result<i64, DatabaseError> {
        let conn = self.conn();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM commits WHERE platform = ?1",
            params![platform.tag()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // -- census_runs --------------------------------------------------------

    /// Record the start of a census over `platforms`.
    pub fn start_census_run(&self, platforms: &[Platform]) -> Result<i64, DatabaseError> {
        let now = timestamp(Utc::now());
        let tags = platforms
            .iter()
            .map(Platform::tag)
            .collect::<Vec<_>>()
            .join(",");
        let conn = self.conn();
        conn.execute(
            "INSERT INTO census_runs (started_at, platforms) VALUES (?1, ?2)",
            params![now, tags],
        )?;
        let id = conn.last_insert_rowid();
        debug!(id, platforms = %tags, "started census run");
        Ok(id)
    }

    /// Complete a census run with its final summary.
    pub fn complete_census_run(&self, id: i64, summary: &Summary) -> Result<(), DatabaseError> {
        let now = timestamp(Utc::now());
        let summary = serde_json::to_string(summary)?;
        let conn = self.conn();
        let changed = conn.execute(
            "UPDATE census_runs SET completed_at = ?1, summary = ?2 WHERE id = ?3",
            params![now, summary, id],
        )?;
        if changed == 0 {
            return Err(DatabaseError::NotFound {
                entity: "census_run".into(),
                id: id.to_string(),
            });
        }
        debug!(id, "completed census run");
        Ok(())
    }

    /// The most recently started census run.
    pub fn last_census_run(&self) -> Result<Option<CensusRunEntry>, DatabaseError> {
        let conn = self.conn();
        let row = conn
            .query_row(
                "SELECT id, started_at, completed_at, platforms, summary
                 FROM census_runs ORDER BY id DESC LIMIT 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, Option<String>>(4)?,
                    ))
                },
            )
            .optional()?;

        let Some((id, started_at, completed_at, platforms, summary)) = row else {
            return Ok(None);
        };
        let summary = summary
            .map(|s| serde_json::from_str::<Summary>(&s))
            .transpose()?;
        let platforms = platforms
            .split(',')
            .filter_map(|tag| tag.parse().ok())
            .collect();

        Ok(Some(CensusRunEntry {
            id,
            started_at,
            completed_at,
            platforms,
            summary,
        }))
    }
}

/// Timestamps are stored as fixed-width UTC RFC 3339 so they compare as text.
fn timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn repository_from_row(row: &Row<'_>) -> rusqlite::Result<RepositoryEntry> {
    let tag: String = row.get(0)?;
    let platform = tag
        .parse::<Platform>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))?;
    Ok(RepositoryEntry {
        platform,
        path: row.get(1)?,
        remote_id: row.get(2)?,
        selected: row.get(3)?,
        listed_at: row.get(4)?,
        fetched_at: row.get(5)?,
        commit_count: row.get(6)?,
    })
}

/// Derive the stored columns of each payload. A payload without a commit id
/// is keyed by the digest of its JSON, so storing it again is a no-op.
fn commit_rows(platform: Platform, payloads: &[Value]) -> Result<Vec<CommitRow>, DatabaseError> {
    payloads
        .iter()
        .map(|payload| {
            let record = RawCommitRecord::from_value(platform, payload.clone()).ok();
            let serialized = serde_json::to_string(payload)?;
            let commit_id = record
                .as_ref()
                .and_then(|r| r.commit_id().map(str::to_string))
                .unwrap_or_else(|| payload_digest(&serialized));
            let committed_at = record.as_ref().and_then(|r| r.committed_at()).map(timestamp);
            Ok(CommitRow {
                commit_id,
                committed_at,
                payload: serialized,
            })
        })
        .collect()
}

fn payload_digest(serialized: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(serialized.as_bytes());
    format!("sha256:{}", hex::encode(hasher.finalize()))
}

fn insert_commit_rows(
    conn: &Connection,
    platform: Platform,
    repo_path: &str,
    rows: &[CommitRow],
) -> Result<usize, DatabaseError> {
    let now = timestamp(Utc::now());
    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO commits
            (platform, repo_path, commit_id, committed_at, payload, stored_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    let mut inserted = 0;
    for row in rows {
        inserted += stmt.execute(params![
            platform.tag(),
            repo_path,
            row.commit_id,
            row.committed_at,
            row.payload,
            now
        ])?;
    }
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn setup_db() -> Database {
        let db = Database::in_memory().unwrap();
        db.initialize().unwrap();
        db
    }

    fn gitlab_commit(id: &str, email: &str, date: &str) -> Value {
        json!({
            "id": id,
            "author_name": "Dev",
            "author_email": email,
            "authored_date": date,
        })
    }

    #[test]
    fn test_repository_upsert_and_selection() {
        let db = setup_db();
        db.upsert_repository(Platform::GitLab, "acme/api", Some("12"), true)
            .unwrap();
        db.upsert_repository(Platform::GitLab, "acme/web", None, false)
            .unwrap();
        db.upsert_repository(Platform::GitHub, "acme/api", None, true)
            .unwrap();

        assert_eq!(db.repository_counts(Platform::GitLab).unwrap(), (1, 2));
        assert_eq!(db.repository_counts(Platform::AzureDevOps).unwrap(), (0, 0));

        // Relisting without an id keeps the known one.
        db.upsert_repository(Platform::GitLab, "acme/api", None, false)
            .unwrap();
        let api = db.get_repository(Platform::GitLab, "acme/api").unwrap().unwrap();
        assert_eq!(api.remote_id.as_deref(), Some("12"));
        assert!(!api.selected);

        db.set_repository_selected(Platform::GitLab, "acme/web", true)
            .unwrap();
        let selected = db.selected_repositories(Platform::GitLab).unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].path, "acme/web");
    }

    #[test]
    fn test_set_selected_unknown_repository() {
        let db = setup_db();
        let result = db.set_repository_selected(Platform::GitHub, "nope", true);
        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
    }

    #[test]
    fn test_insert_commits_is_idempotent() {
        let db = setup_db();
        let payloads = vec![
            gitlab_commit("a1", "dev@co.com", "2025-03-01T10:00:00Z"),
            gitlab_commit("a2", "dev@co.com", "2025-03-02T10:00:00Z"),
        ];
        assert_eq!(db.insert_commits(Platform::GitLab, "acme/api", &payloads).unwrap(), 2);
        assert_eq!(db.insert_commits(Platform::GitLab, "acme/api", &payloads).unwrap(), 0);
        assert_eq!(db.count_commits(Platform::GitLab).unwrap(), 2);
    }

    #[test]
    fn test_commits_without_id_keyed_by_content() {
        let db = setup_db();
        let payloads = vec![
            json!({ "author_name": "Carol", "created_at": "2025-03-01T10:00:00Z" }),
            json!({ "author_name": "Carol", "created_at": "2025-03-02T10:00:00Z" }),
        ];
        assert_eq!(db.insert_commits(Platform::GitLab, "acme/api", &payloads).unwrap(), 2);
        // Storing the same payloads again adds nothing.
        assert_eq!(db.insert_commits(Platform::GitLab, "acme/api", &payloads).unwrap(), 0);
        assert_eq!(db.count_commits(Platform::GitLab).unwrap(), 2);
    }

    #[test]
    fn test_replace_commits() {
        let db = setup_db();
        db.insert_commits(
            Platform::GitLab,
            "acme/api",
            &[gitlab_commit("old", "dev@co.com", "2025-03-01T10:00:00Z")],
        )
        .unwrap();
        db.replace_commits(
            Platform::GitLab,
            "acme/api",
            &[gitlab_commit("new", "dev@co.com", "2025-03-05T10:00:00Z")],
        )
        .unwrap();

        let records = db.load_commit_records(Platform::GitLab, "acme/api", None).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].commit_id(), Some("new"));
    }

    #[test]
    fn test_load_commit_records_window() {
        let db = setup_db();
        db.insert_commits(
            Platform::GitLab,
            "acme/api",
            &[
                gitlab_commit("early", "dev@co.com", "2025-01-01T00:00:00Z"),
                gitlab_commit("late", "dev@co.com", "2025-06-01T00:00:00+02:00"),
                json!({ "id": "undated", "author_name": "Dev" }),
            ],
        )
        .unwrap();

        let since = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let records = db
            .load_commit_records(Platform::GitLab, "acme/api", Some(since))
            .unwrap();
        let mut ids: Vec<_> = records.iter().filter_map(|r| r.commit_id()).collect();
        ids.sort();
        assert_eq!(ids, vec!["late", "undated"]);

        let all = db.load_commit_records(Platform::GitLab, "acme/api", None).unwrap();
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_malformed_payload_skipped_on_load() {
        let db = setup_db();
        db.insert_commits(
            Platform::GitLab,
            "acme/api",
            &[json!({ "id": "ok", "author_name": "Dev" }), json!({ "author_name": 42 })],
        )
        .unwrap();
        let records = db.load_commit_records(Platform::GitLab, "acme/api", None).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_mark_fetched_counts_commits() {
        let db = setup_db();
        db.upsert_repository(Platform::GitLab, "acme/api", None, true)
            .unwrap();
        db.insert_commits(
            Platform::GitLab,
            "acme/api",
            &[
                gitlab_commit("a1", "dev@co.com", "2025-03-01T10:00:00Z"),
                gitlab_commit("a2", "dev@co.com", "2025-03-02T10:00:00Z"),
            ],
        )
        .unwrap();
        db.mark_fetched(Platform::GitLab, "acme/api").unwrap();

        let repo = db.get_repository(Platform::GitLab, "acme/api").unwrap().unwrap();
        assert!(repo.fetched_at.is_some());
        assert_eq!(repo.commit_count, 2);
    }

    #[test]
    fn test_census_run_roundtrip() {
        let db = setup_db();
        assert!(db.last_census_run().unwrap().is_none());

        let id = db
            .start_census_run(&[Platform::GitLab, Platform::GitHub])
            .unwrap();
        let mut summary = Summary::new();
        summary.fold_platform(Platform::GitLab, 5, 1, 1);
        db.complete_census_run(id, &summary).unwrap();

        let run = db.last_census_run().unwrap().unwrap();
        assert_eq!(run.id, id);
        assert_eq!(run.platforms, vec![Platform::GitLab, Platform::GitHub]);
        assert!(run.completed_at.is_some());
        assert_eq!(run.summary.unwrap().total_unique_contributors, 5);
    }
}
