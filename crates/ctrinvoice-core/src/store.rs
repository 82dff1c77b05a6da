//! SQLite tag store for the tokens of one document.
//!
//! Schema:
//! - tokens: id, sheet, x1, y1, x2, y2, word, tag, color_flag
//!
//! A store is created fresh for every processing run and discarded once the
//! template has been projected.

use crate::error::CtrError;
use crate::model::{BBox, Field, LabeledRow, StoredToken, Token};
use rusqlite::{params, Connection, Row, Transaction};
use std::path::Path;

const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS tokens (
    id INTEGER PRIMARY KEY,
    sheet INTEGER,
    x1 REAL,
    y1 REAL,
    x2 REAL,
    y2 REAL,
    word TEXT,
    tag TEXT,
    color_flag INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_tokens_sheet_y1 ON tokens(sheet, y1 DESC);
";

const TOKEN_COLUMNS: &str = "id, sheet, x1, y1, x2, y2, word, tag, color_flag";

/// Highlight code written by the quality filter for tokens a reviewer should check.
pub const REVIEW_FLAG: i64 = 2;

/// Tag store connection wrapper
pub struct TagStore {
    conn: Connection,
}

impl TagStore {
    /// Create a fresh store at `path`, replacing any store left by a previous run.
    pub fn create(path: &Path) -> Result<Self, CtrError> {
        if path.exists() {
            std::fs::remove_file(path)?;
            tracing::debug!("removed previous tag store {}", path.display());
        }
        Self::open(path)
    }

    /// Open or create a store at `path`, keeping existing rows.
    pub fn open(path: &Path) -> Result<Self, CtrError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// In-memory store, used by tests and one-shot runs.
    pub fn in_memory() -> Result<Self, CtrError> {
        Self::init(Connection::open_in_memory()?)
    }

    #[cfg(test)]
    pub(crate) fn execute_batch(&self, sql: &str) -> Result<(), CtrError> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    fn init(conn: Connection) -> Result<Self, CtrError> {
        conn.execute_batch(SCHEMA)?;
        Ok(TagStore { conn })
    }

    /// Insert tokens in one transaction; returns the new row ids in input order.
    pub fn insert_tokens(&mut self, tokens: &[Token]) -> Result<Vec<i64>, CtrError> {
        let tx = self.conn.transaction()?;
        let mut ids = Vec::with_capacity(tokens.len());
        {
            let mut stmt = tx.prepare(
                "INSERT INTO tokens (sheet, x1, y1, x2, y2, word) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for t in tokens {
                stmt.execute(params![
                    t.sheet,
                    t.bbox.x1,
                    t.bbox.y1,
                    t.bbox.x2,
                    t.bbox.y2,
                    t.text.trim()
                ])?;
                ids.push(tx.last_insert_rowid());
            }
        }
        tx.commit()?;
        tracing::debug!("ingested {} tokens", ids.len());
        Ok(ids)
    }

    /// Begin the write scope of a classification pass.
    pub fn transaction(&mut self) -> Result<TagTransaction<'_>, CtrError> {
        Ok(TagTransaction {
            tx: self.conn.transaction()?,
        })
    }

    /// All tokens in pass order: sheet ascending, then `y1` descending.
    pub fn tokens_in_pass_order(&self) -> Result<Vec<StoredToken>, CtrError> {
        query_pass_order(&self.conn)
    }

    /// All tokens in row id order.
    pub fn tokens(&self) -> Result<Vec<StoredToken>, CtrError> {
        let sql = format!("SELECT {TOKEN_COLUMNS} FROM tokens ORDER BY id");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], read_token)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn count(&self) -> Result<usize, CtrError> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM tokens", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    /// Set or clear the tag of a single row outside of a pass.
    pub fn set_tag(&self, id: i64, field: Option<Field>) -> Result<(), CtrError> {
        self.conn.execute(
            "UPDATE tokens SET tag = ?1 WHERE id = ?2",
            params![field.map(|f| f.as_str()), id],
        )?;
        Ok(())
    }

    /// Delete every token tagged with `field`; returns the number removed.
    pub fn delete_tagged(&self, field: Field) -> Result<usize, CtrError> {
        let n = self
            .conn
            .execute("DELETE FROM tokens WHERE tag = ?1", params![field.as_str()])?;
        Ok(n)
    }

    /// Set `color_flag` on tokens whose word is missing, empty or whitespace.
    ///
    /// Blankness is decided with `str::trim`, so Unicode spaces such as
    /// U+00A0 count as whitespace, the same as when tokens are read back.
    pub fn flag_blank_words(&self, flag: i64) -> Result<usize, CtrError> {
        let blank: Vec<i64> = {
            let mut stmt = self.conn.prepare("SELECT id, word FROM tokens ORDER BY id")?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, Option<String>>(1)?))
            })?;
            let mut ids = Vec::new();
            for row in rows {
                let (id, word) = row?;
                if word.as_deref().map_or(true, |w| w.trim().is_empty()) {
                    ids.push(id);
                }
            }
            ids
        };

        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare("UPDATE tokens SET color_flag = ?1 WHERE id = ?2")?;
            for id in &blank {
                stmt.execute(params![flag, id])?;
            }
        }
        tx.commit()?;
        Ok(blank.len())
    }

    /// Tagged tokens in row id order, the order projection writes them in.
    pub fn labeled_rows(&self) -> Result<Vec<LabeledRow>, CtrError> {
        let mut stmt = self
            .conn
            .prepare("SELECT word, tag, sheet FROM tokens WHERE tag IS NOT NULL ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            let word: Option<String> = row.get(0)?;
            let tag: String = row.get(1)?;
            let sheet: Option<i64> = row.get(2)?;
            Ok((word, tag, sheet))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (word, tag, sheet) = row?;
            match Field::from_tag(&tag) {
                Some(field) => out.push(LabeledRow {
                    text: word.unwrap_or_default().trim().to_string(),
                    field,
                    sheet: sheet_number(sheet),
                }),
                None if tag.trim().is_empty() => {}
                None => tracing::warn!("ignoring unknown tag '{tag}' in tag store"),
            }
        }
        Ok(out)
    }
}

/// Write scope of a classification pass. Dropping it without
/// [`TagTransaction::commit`] discards every tag set through it.
pub struct TagTransaction<'a> {
    tx: Transaction<'a>,
}

impl TagTransaction<'_> {
    pub fn tokens_in_pass_order(&self) -> Result<Vec<StoredToken>, CtrError> {
        query_pass_order(&self.tx)
    }

    pub fn set_tag(&self, id: i64, field: Field) -> Result<(), CtrError> {
        let mut stmt = self
            .tx
            .prepare_cached("UPDATE tokens SET tag = ?1 WHERE id = ?2")?;
        stmt.execute(params![field.as_str(), id])?;
        Ok(())
    }

    pub fn commit(self) -> Result<(), CtrError> {
        self.tx.commit()?;
        Ok(())
    }
}

fn query_pass_order(conn: &Connection) -> Result<Vec<StoredToken>, CtrError> {
    let sql = format!("SELECT {TOKEN_COLUMNS} FROM tokens ORDER BY sheet ASC, y1 DESC, id ASC");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], read_token)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

fn read_token(row: &Row) -> rusqlite::Result<StoredToken> {
    let coord = |i: usize| -> rusqlite::Result<f64> { Ok(row.get::<_, Option<f64>>(i)?.unwrap_or(0.0)) };

    let sheet: Option<i64> = row.get(1)?;
    let word: Option<String> = row.get(6)?;
    let tag: Option<String> = row.get(7)?;
    let color_flag: i64 = row.get(8)?;

    let tag = match tag.as_deref() {
        None => None,
        Some(t) if t.trim().is_empty() => None,
        Some(t) => {
            let field = Field::from_tag(t);
            if field.is_none() {
                tracing::warn!("ignoring unknown tag '{t}' in tag store");
            }
            field
        }
    };

    Ok(StoredToken {
        id: row.get(0)?,
        token: Token {
            sheet: sheet_number(sheet),
            text: word.unwrap_or_default().trim().to_string(),
            bbox: BBox::new(coord(2)?, coord(3)?, coord(4)?, coord(5)?),
        },
        tag,
        needs_review: color_flag == REVIEW_FLAG,
    })
}

fn sheet_number(sheet: Option<i64>) -> u32 {
    sheet.and_then(|s| u32::try_from(s).ok()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tok(sheet: u32, text: &str, x1: f64, y1: f64) -> Token {
        Token::new(sheet, text, BBox::new(x1, y1, x1 + 20.0, y1 + 8.0))
    }

    #[test]
    fn test_insert_and_read_back() {
        let mut store = TagStore::in_memory().unwrap();
        let ids = store
            .insert_tokens(&[tok(1, " INV-1 ", 10.0, 20.0), tok(2, "KY", 30.0, 40.0)])
            .unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(store.count().unwrap(), 2);

        let tokens = store.tokens().unwrap();
        assert_eq!(tokens[0].id, ids[0]);
        assert_eq!(tokens[0].token.text, "INV-1");
        assert_eq!(tokens[1].token.sheet, 2);
        assert!(tokens.iter().all(|t| t.tag.is_none() && !t.needs_review));
    }

    #[test]
    fn test_pass_order() {
        let mut store = TagStore::in_memory().unwrap();
        store
            .insert_tokens(&[
                tok(2, "a", 0.0, 900.0),
                tok(1, "b", 0.0, 100.0),
                tok(1, "c", 0.0, 700.0),
                tok(1, "d", 0.0, 400.0),
            ])
            .unwrap();
        let order: Vec<String> = store
            .tokens_in_pass_order()
            .unwrap()
            .into_iter()
            .map(|t| t.token.text)
            .collect();
        assert_eq!(order, vec!["c", "d", "b", "a"]);
    }

    #[test]
    fn test_null_columns_read_as_defaults() {
        let store = TagStore::in_memory().unwrap();
        store
            .conn
            .execute("INSERT INTO tokens (sheet, x1) VALUES (1, 5.5)", [])
            .unwrap();
        let t = &store.tokens().unwrap()[0];
        assert_eq!(t.token.bbox, BBox::new(5.5, 0.0, 0.0, 0.0));
        assert_eq!(t.token.text, "");
    }

    #[test]
    fn test_dropped_transaction_discards_tags() {
        let mut store = TagStore::in_memory().unwrap();
        let ids = store.insert_tokens(&[tok(1, "x", 0.0, 0.0)]).unwrap();
        {
            let tx = store.transaction().unwrap();
            tx.set_tag(ids[0], Field::State).unwrap();
        }
        assert_eq!(store.tokens().unwrap()[0].tag, None);

        let tx = store.transaction().unwrap();
        tx.set_tag(ids[0], Field::State).unwrap();
        tx.commit().unwrap();
        assert_eq!(store.tokens().unwrap()[0].tag, Some(Field::State));
    }

    #[test]
    fn test_unknown_tag_reads_as_untagged() {
        let mut store = TagStore::in_memory().unwrap();
        let ids = store.insert_tokens(&[tok(1, "x", 0.0, 0.0)]).unwrap();
        store
            .conn
            .execute("UPDATE tokens SET tag = 'zip' WHERE id = ?1", params![ids[0]])
            .unwrap();
        assert_eq!(store.tokens().unwrap()[0].tag, None);
        assert!(store.labeled_rows().unwrap().is_empty());
    }

    #[test]
    fn test_labeled_rows_in_id_order() {
        let mut store = TagStore::in_memory().unwrap();
        let ids = store
            .insert_tokens(&[tok(1, "OH", 0.0, 0.0), tok(1, "skip", 0.0, 0.0), tok(1, "INV", 0.0, 0.0)])
            .unwrap();
        store.set_tag(ids[2], Some(Field::InvoiceNumber)).unwrap();
        store.set_tag(ids[0], Some(Field::State)).unwrap();

        let rows = store.labeled_rows().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].field, Field::State);
        assert_eq!(rows[1].text, "INV");
    }

    #[test]
    fn test_unicode_whitespace_is_blank() {
        let mut store = TagStore::in_memory().unwrap();
        store
            .insert_tokens(&[tok(1, "\u{a0}", 0.0, 0.0), tok(1, "\u{2003}\t", 0.0, 0.0), tok(1, "OH", 0.0, 0.0)])
            .unwrap();
        store
            .conn
            .execute("INSERT INTO tokens (sheet) VALUES (1)", [])
            .unwrap();

        assert_eq!(store.flag_blank_words(REVIEW_FLAG).unwrap(), 3);
        let flagged: Vec<bool> = store.tokens().unwrap().iter().map(|t| t.needs_review).collect();
        assert_eq!(flagged, vec![true, true, false, true]);
    }

    #[test]
    fn test_text_trimmed_on_insert() {
        let mut store = TagStore::in_memory().unwrap();
        store.insert_tokens(&[tok(1, "\u{a0}KY ", 0.0, 0.0)]).unwrap();
        let word: String = store
            .conn
            .query_row("SELECT word FROM tokens", [], |row| row.get(0))
            .unwrap();
        assert_eq!(word, "KY");
    }

    #[test]
    fn test_create_replaces_previous_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.db");
        {
            let mut store = TagStore::create(&path).unwrap();
            store.insert_tokens(&[tok(1, "old", 0.0, 0.0)]).unwrap();
        }
        assert_eq!(TagStore::open(&path).unwrap().count().unwrap(), 1);
        assert_eq!(TagStore::create(&path).unwrap().count().unwrap(), 0);
    }
}
