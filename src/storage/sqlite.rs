//! SQLite storage backend

use super::traits::{
    EdgeKeys, GraphStore, IdAssignment, OpenStore, PaperRow, StorageError, StorageResult, WriteOp,
};
use crate::model::{GraphCounts, LedgerEntry, PaperColumn, Relationship};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Key of the singleton ledger row
const LEDGER_ID: &str = "main";

/// SQLite-backed graph store
///
/// Uses one table per node label and one per relationship type. Unique
/// constraints carry the key invariants: `arxiv_id`, `doi` and `openalex_id`
/// on papers, `name` on authors, `id` on categories, and the endpoint pair
/// on every relationship table. Edges cascade when a paper is deleted.
///
/// Thread-safe via internal mutex on the connection.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Initialize the database schema
    fn init_schema(conn: &Connection) -> StorageResult<()> {
        conn.execute_batch(
            r#"
            -- Papers: one row per arxiv_id, secondary keys unique when set
            CREATE TABLE IF NOT EXISTS papers (
                arxiv_id TEXT PRIMARY KEY,
                doi TEXT UNIQUE,
                openalex_id TEXT UNIQUE,
                title TEXT NOT NULL DEFAULT '',
                abstract TEXT NOT NULL DEFAULT '',
                submitter TEXT NOT NULL DEFAULT '',
                journal_ref TEXT,
                report_no TEXT,
                license TEXT,
                update_date TEXT,
                last_modified TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_papers_update_date
                ON papers(update_date);

            CREATE TABLE IF NOT EXISTS authors (
                name TEXT PRIMARY KEY
            );

            CREATE TABLE IF NOT EXISTS categories (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL
            );

            -- WROTE: Author -> Paper
            CREATE TABLE IF NOT EXISTS wrote (
                author_name TEXT NOT NULL,
                paper_id TEXT NOT NULL,
                PRIMARY KEY (author_name, paper_id),
                FOREIGN KEY (author_name) REFERENCES authors(name) ON DELETE CASCADE,
                FOREIGN KEY (paper_id) REFERENCES papers(arxiv_id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_wrote_paper
                ON wrote(paper_id);

            -- HAS_CATEGORY: Paper -> Category
            CREATE TABLE IF NOT EXISTS has_category (
                paper_id TEXT NOT NULL,
                category_id TEXT NOT NULL,
                PRIMARY KEY (paper_id, category_id),
                FOREIGN KEY (paper_id) REFERENCES papers(arxiv_id) ON DELETE CASCADE,
                FOREIGN KEY (category_id) REFERENCES categories(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_has_category_category
                ON has_category(category_id);

            -- CITES: Paper -> Paper (stored by arxiv_id, matched by openalex_id)
            CREATE TABLE IF NOT EXISTS cites (
                citing_id TEXT NOT NULL,
                cited_id TEXT NOT NULL,
                PRIMARY KEY (citing_id, cited_id),
                FOREIGN KEY (citing_id) REFERENCES papers(arxiv_id) ON DELETE CASCADE,
                FOREIGN KEY (cited_id) REFERENCES papers(arxiv_id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_cites_cited
                ON cites(cited_id);

            CREATE TABLE IF NOT EXISTS update_ledger (
                id TEXT PRIMARY KEY,
                last_update_time TEXT NOT NULL,
                update_count INTEGER NOT NULL
            );

            -- Enable foreign keys (edge cascade on paper delete)
            PRAGMA foreign_keys = ON;

            -- Enable WAL mode for concurrent reads during writes
            PRAGMA journal_mode = WAL;
            "#,
        )?;

        Ok(())
    }

    fn from_connection(conn: Connection) -> StorageResult<Self> {
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn apply_op(tx: &Transaction<'_>, op: &WriteOp) -> StorageResult<usize> {
        match op {
            WriteOp::MergePapers(rows) => Self::merge_papers(tx, rows),
            WriteOp::MergeAuthors(names) => {
                let mut stmt = tx.prepare_cached(
                    "INSERT INTO authors (name) VALUES (?1) ON CONFLICT(name) DO NOTHING",
                )?;
                for name in names {
                    stmt.execute(params![name])?;
                }
                Ok(names.len())
            }
            WriteOp::MergeCategories(codes) => {
                let mut stmt = tx.prepare_cached(
                    r#"
                    INSERT INTO categories (id, name) VALUES (?1, ?1)
                    ON CONFLICT(id) DO UPDATE SET name = excluded.name
                    "#,
                )?;
                for code in codes {
                    stmt.execute(params![code])?;
                }
                Ok(codes.len())
            }
            WriteOp::DeletePapers(ids) => {
                let mut stmt = tx.prepare_cached("DELETE FROM papers WHERE arxiv_id = ?1")?;
                let mut deleted = 0;
                for id in ids {
                    deleted += stmt.execute(params![id])?;
                }
                Ok(deleted)
            }
            WriteOp::ClearEdges { kind, arxiv_ids } => {
                let sql = match kind {
                    Relationship::Wrote => "DELETE FROM wrote WHERE paper_id = ?1",
                    Relationship::HasCategory => "DELETE FROM has_category WHERE paper_id = ?1",
                    Relationship::Cites => "DELETE FROM cites WHERE citing_id = ?1 OR cited_id = ?1",
                };
                let mut stmt = tx.prepare_cached(sql)?;
                let mut removed = 0;
                for id in arxiv_ids {
                    removed += stmt.execute(params![id])?;
                }
                Ok(removed)
            }
            WriteOp::MergeEdges { kind, pairs } => Self::merge_edges(tx, *kind, pairs),
            WriteOp::AssignOpenalexIds(rows) => Self::assign_openalex_ids(tx, rows),
        }
    }

    fn merge_papers(tx: &Transaction<'_>, rows: &[PaperRow]) -> StorageResult<usize> {
        let now = format_timestamp(&Utc::now());
        let mut doi_owner = tx.prepare_cached(
            "SELECT arxiv_id FROM papers WHERE doi = ?1 AND arxiv_id <> ?2 LIMIT 1",
        )?;
        // Optional fields missing from a source keep their stored value.
        let mut upsert = tx.prepare_cached(
            r#"
            INSERT INTO papers (arxiv_id, doi, title, abstract, submitter, journal_ref,
                                report_no, license, update_date, last_modified)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT(arxiv_id) DO UPDATE SET
                doi = COALESCE(excluded.doi, papers.doi),
                title = excluded.title,
                abstract = excluded.abstract,
                submitter = excluded.submitter,
                journal_ref = COALESCE(excluded.journal_ref, papers.journal_ref),
                report_no = COALESCE(excluded.report_no, papers.report_no),
                license = COALESCE(excluded.license, papers.license),
                update_date = COALESCE(excluded.update_date, papers.update_date),
                last_modified = excluded.last_modified
            "#,
        )?;

        for row in rows {
            // First claimant keeps a DOI; later papers leave it unset.
            let doi = match row.doi.as_deref().filter(|d| !d.is_empty()) {
                Some(doi) => {
                    let owner: Option<String> = doi_owner
                        .query_row(params![doi, row.arxiv_id], |r| r.get(0))
                        .optional()?;
                    if let Some(owner) = owner {
                        tracing::debug!(arxiv_id = %row.arxiv_id, %doi, %owner, "doi already claimed");
                        None
                    } else {
                        Some(doi)
                    }
                }
                None => None,
            };

            upsert.execute(params![
                row.arxiv_id,
                doi,
                row.title,
                row.abstract_text,
                row.submitter,
                non_empty(&row.journal_ref),
                non_empty(&row.report_no),
                non_empty(&row.license),
                row.update_date.as_ref().map(format_timestamp),
                now,
            ])?;
        }

        Ok(rows.len())
    }

    fn merge_edges(tx: &Transaction<'_>, kind: Relationship, pairs: &[EdgeKeys]) -> StorageResult<usize> {
        // Resolve both endpoint keys to stored row keys; unresolved pairs are skipped.
        let (resolve_sql, insert_sql) = match kind {
            Relationship::Wrote => (
                r#"
                SELECT a.name, p.arxiv_id FROM authors a, papers p
                WHERE a.name = ?1 AND p.arxiv_id = ?2
                "#,
                "INSERT OR IGNORE INTO wrote (author_name, paper_id) VALUES (?1, ?2)",
            ),
            Relationship::HasCategory => (
                r#"
                SELECT p.arxiv_id, c.id FROM papers p, categories c
                WHERE p.arxiv_id = ?1 AND c.id = ?2
                "#,
                "INSERT OR IGNORE INTO has_category (paper_id, category_id) VALUES (?1, ?2)",
            ),
            Relationship::Cites => (
                r#"
                SELECT citing.arxiv_id, cited.arxiv_id FROM papers citing, papers cited
                WHERE citing.openalex_id = ?1 AND cited.openalex_id = ?2
                "#,
                "INSERT OR IGNORE INTO cites (citing_id, cited_id) VALUES (?1, ?2)",
            ),
        };

        let mut resolve = tx.prepare_cached(resolve_sql)?;
        let mut insert = tx.prepare_cached(insert_sql)?;
        let mut matched = 0;
        for pair in pairs {
            let endpoints: Option<(String, String)> = resolve
                .query_row(params![pair.from, pair.to], |r| Ok((r.get(0)?, r.get(1)?)))
                .optional()?;
            if let Some((from, to)) = endpoints {
                insert.execute(params![from, to])?;
                matched += 1;
            }
        }
        Ok(matched)
    }

    fn assign_openalex_ids(tx: &Transaction<'_>, rows: &[IdAssignment]) -> StorageResult<usize> {
        let mut stmt = tx.prepare_cached(
            r#"
            UPDATE papers SET openalex_id = ?2
            WHERE doi = ?1
              AND openalex_id IS NULL
              AND NOT EXISTS (SELECT 1 FROM papers other WHERE other.openalex_id = ?2)
            "#,
        )?;
        let mut assigned = 0;
        for row in rows {
            assigned += stmt.execute(params![row.doi, row.openalex_id])?;
        }
        Ok(assigned)
    }

    fn count(conn: &Connection, sql: &str) -> StorageResult<usize> {
        let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
        Ok(n as usize)
    }

    fn string_column(conn: &Connection, sql: &str, key: &str) -> StorageResult<Vec<String>> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params![key], |row| row.get::<_, String>(0))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

/// Timestamps are stored as fixed-width UTC RFC 3339 so that text order
/// equals time order.
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_timestamp(s: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::DateParse(format!("{}: {}", s, e)))
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

impl OpenStore for SqliteStore {
    fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        Self::from_connection(Connection::open(path)?)
    }

    fn open_in_memory() -> StorageResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }
}

impl GraphStore for SqliteStore {
    fn write_batch(&self, ops: &[WriteOp]) -> StorageResult<Vec<usize>> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let mut affected = Vec::with_capacity(ops.len());
        for op in ops {
            affected.push(Self::apply_op(&tx, op)?);
        }
        tx.commit()?;
        Ok(affected)
    }

    fn project_paper_keys(&self, column: PaperColumn) -> StorageResult<HashSet<String>> {
        let conn = self.conn();
        let col = column.as_str();
        let mut stmt = conn.prepare(&format!(
            "SELECT {col} FROM papers WHERE {col} IS NOT NULL AND {col} <> ''"
        ))?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut keys = HashSet::new();
        for row in rows {
            keys.insert(row?);
        }
        Ok(keys)
    }

    fn max_paper_update_date(&self) -> StorageResult<Option<DateTime<Utc>>> {
        let conn = self.conn();
        let max: Option<String> = conn.query_row(
            "SELECT MAX(update_date) FROM papers WHERE update_date IS NOT NULL",
            [],
            |row| row.get(0),
        )?;
        max.as_deref().map(parse_timestamp).transpose()
    }

    fn counts(&self) -> StorageResult<GraphCounts> {
        let conn = self.conn();
        Ok(GraphCounts {
            papers: Self::count(&conn, "SELECT COUNT(*) FROM papers")?,
            papers_with_doi: Self::count(&conn, "SELECT COUNT(*) FROM papers WHERE doi IS NOT NULL")?,
            papers_with_openalex_id: Self::count(
                &conn,
                "SELECT COUNT(*) FROM papers WHERE openalex_id IS NOT NULL",
            )?,
            authors: Self::count(&conn, "SELECT COUNT(*) FROM authors")?,
            categories: Self::count(&conn, "SELECT COUNT(*) FROM categories")?,
            wrote: Self::count(&conn, "SELECT COUNT(*) FROM wrote")?,
            has_category: Self::count(&conn, "SELECT COUNT(*) FROM has_category")?,
            cites: Self::count(&conn, "SELECT COUNT(*) FROM cites")?,
        })
    }

    fn has_paper(&self, arxiv_id: &str) -> StorageResult<bool> {
        let conn = self.conn();
        let found = conn
            .query_row(
                "SELECT 1 FROM papers WHERE arxiv_id = ?1",
                params![arxiv_id],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn authors_of(&self, arxiv_id: &str) -> StorageResult<Vec<String>> {
        let conn = self.conn();
        Self::string_column(
            &conn,
            "SELECT author_name FROM wrote WHERE paper_id = ?1 ORDER BY author_name",
            arxiv_id,
        )
    }

    fn categories_of(&self, arxiv_id: &str) -> StorageResult<Vec<String>> {
        let conn = self.conn();
        Self::string_column(
            &conn,
            "SELECT category_id FROM has_category WHERE paper_id = ?1 ORDER BY category_id",
            arxiv_id,
        )
    }

    fn load_ledger(&self) -> StorageResult<Option<LedgerEntry>> {
        let conn = self.conn();
        let row: Option<(String, i64)> = conn
            .query_row(
                "SELECT last_update_time, update_count FROM update_ledger WHERE id = ?1",
                params![LEDGER_ID],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        row.map(|(ts, count)| {
            Ok(LedgerEntry {
                last_update_time: parse_timestamp(&ts)?,
                update_count: count.max(0) as u64,
            })
        })
        .transpose()
    }

    fn record_ledger(&self, timestamp: DateTime<Utc>) -> StorageResult<LedgerEntry> {
        {
            let conn = self.conn();
            conn.execute(
                r#"
                INSERT INTO update_ledger (id, last_update_time, update_count)
                VALUES (?1, ?2, 1)
                ON CONFLICT(id) DO UPDATE SET
                    last_update_time = excluded.last_update_time,
                    update_count = update_ledger.update_count + 1
                "#,
                params![LEDGER_ID, format_timestamp(&timestamp)],
            )?;
        }

        self.load_ledger()?.ok_or_else(|| {
            StorageError::Database(rusqlite::Error::QueryReturnedNoRows)
        })
    }
}
