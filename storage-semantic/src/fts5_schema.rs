//! FTS5 virtual table for the keyword half of the search contract (spec
//! §4.2 "per source runs both a semantic query ... and a keyword query
//! ... in parallel").
//!
//! The FTS5 table mirrors `items` and is kept in sync via triggers, the
//! same approach the teacher used to keep its own FTS5 shadow tables
//! current without the application needing to double-write.

pub const CREATE_ITEMS_FTS_TABLE: &str = r#"
CREATE VIRTUAL TABLE IF NOT EXISTS items_fts USING fts5(
    collection UNINDEXED,
    id UNINDEXED,
    document,
    tokenize='porter unicode61'
)
"#;

pub const CREATE_ITEMS_FTS_TRIGGERS: &str = r#"
CREATE TRIGGER IF NOT EXISTS items_ai AFTER INSERT ON items BEGIN
    INSERT INTO items_fts(collection, id, document)
    VALUES (new.collection, new.id, new.document);
END;

CREATE TRIGGER IF NOT EXISTS items_au AFTER UPDATE ON items BEGIN
    UPDATE items_fts SET document = new.document
    WHERE collection = new.collection AND id = new.id;
END;

CREATE TRIGGER IF NOT EXISTS items_ad AFTER DELETE ON items BEGIN
    DELETE FROM items_fts WHERE collection = old.collection AND id = old.id;
END;
"#;

/// Upserts in the `items` table are implemented as `INSERT ... ON CONFLICT
/// DO UPDATE`, which SQLite fires as an UPDATE (not a DELETE+INSERT) when
/// the row already exists — the `items_au` trigger above keeps the FTS
/// shadow row current for that path; `items_ai` covers first insert.
#[allow(dead_code)]
pub const DROP_FTS5_SCHEMA: &str = r#"
DROP TRIGGER IF EXISTS items_ai;
DROP TRIGGER IF EXISTS items_au;
DROP TRIGGER IF EXISTS items_ad;
DROP TABLE IF EXISTS items_fts;
"#;
