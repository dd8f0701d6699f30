use std::fs;
use std::path::Path;

use chrono::{NaiveDateTime, Utc};
use rusqlite::{Connection, Row, params};

use crate::model::{Clinic, FLAG_NO, NewClinic};

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("clinic {0} not found")]
    NotFound(i64),
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
    #[error("failed to prepare storage directory: {0}")]
    Io(#[from] std::io::Error),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Persistence boundary for clinic records.
///
/// Each call is atomic: a failed mutation leaves the previous state intact.
/// `list_all` returns records in ascending id order.
pub trait CatalogStore {
    fn create(&mut self, clinic: &NewClinic) -> CatalogResult<i64>;
    fn get(&self, id: i64) -> CatalogResult<Clinic>;
    fn update(&mut self, id: i64, clinic: &NewClinic) -> CatalogResult<()>;
    fn delete(&mut self, id: i64) -> CatalogResult<()>;
    fn list_all(&self) -> CatalogResult<Vec<Clinic>>;
    fn count(&self) -> CatalogResult<u64>;
    /// Inserts every record in one transaction, or none of them.
    fn insert_batch(&mut self, clinics: &[NewClinic]) -> CatalogResult<usize>;
}

const SCHEMA_SQL: &str = "
    CREATE TABLE IF NOT EXISTS clinic (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        region TEXT,
        district TEXT,
        name TEXT,
        health_mall TEXT DEFAULT '否',
        hundred_position TEXT DEFAULT '否',
        media_items TEXT,
        specialties TEXT,
        address TEXT,
        phone TEXT,
        contact_person TEXT,
        business_hours TEXT,
        note TEXT,
        created_at TEXT,
        updated_at TEXT
    );
";

// Columns absent from tables created by the narrower, earlier schema.
const LATE_COLUMNS: [(&str, &str); 4] = [
    ("health_mall", "TEXT DEFAULT '否'"),
    ("hundred_position", "TEXT DEFAULT '否'"),
    ("business_hours", "TEXT"),
    ("note", "TEXT"),
];

const SELECT_COLUMNS: &str = "id, region, district, name, health_mall, hundred_position, \
     media_items, specialties, address, phone, contact_person, business_hours, note, \
     created_at, updated_at";

pub struct SqliteCatalog {
    conn: Connection,
}

impl SqliteCatalog {
    pub fn open(path: &Path) -> CatalogResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> CatalogResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> CatalogResult<Self> {
        conn.execute_batch(SCHEMA_SQL)?;
        add_late_columns(&conn)?;
        Ok(Self { conn })
    }
}

fn add_late_columns(conn: &Connection) -> rusqlite::Result<()> {
    let existing = {
        let mut stmt = conn.prepare("PRAGMA table_info(clinic)")?;
        let names = stmt.query_map([], |row| row.get::<usize, String>(1))?;
        names.collect::<rusqlite::Result<Vec<_>>>()?
    };
    for (name, decl) in LATE_COLUMNS {
        if !existing.iter().any(|c| c == name) {
            tracing::info!("adding missing column clinic.{name}");
            conn.execute(&format!("ALTER TABLE clinic ADD COLUMN {name} {decl}"), [])?;
        }
    }
    Ok(())
}

fn insert(conn: &Connection, c: &NewClinic, now: NaiveDateTime) -> rusqlite::Result<i64> {
    conn.execute(
        "
        INSERT INTO clinic (
            region, district, name, health_mall, hundred_position, media_items,
            specialties, address, phone, contact_person, business_hours, note,
            created_at, updated_at
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)
        ",
        params![
            c.region,
            c.district,
            c.name,
            c.health_mall_or_default(),
            c.hundred_position_or_default(),
            c.media_items,
            c.specialties,
            c.address,
            c.phone,
            c.contact_person,
            c.business_hours,
            c.note,
            now,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn clinic_from_row(row: &Row<'_>) -> rusqlite::Result<Clinic> {
    Ok(Clinic {
        id: row.get(0)?,
        region: row.get(1)?,
        district: row.get(2)?,
        name: row.get::<usize, Option<String>>(3)?.unwrap_or_default(),
        health_mall: row
            .get::<usize, Option<String>>(4)?
            .unwrap_or_else(|| FLAG_NO.to_string()),
        hundred_position: row
            .get::<usize, Option<String>>(5)?
            .unwrap_or_else(|| FLAG_NO.to_string()),
        media_items: row.get(6)?,
        specialties: row.get(7)?,
        address: row.get(8)?,
        phone: row.get(9)?,
        contact_person: row.get(10)?,
        business_hours: row.get(11)?,
        note: row.get(12)?,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
    })
}

fn now_utc() -> NaiveDateTime {
    Utc::now().naive_utc()
}

impl CatalogStore for SqliteCatalog {
    fn create(&mut self, clinic: &NewClinic) -> CatalogResult<i64> {
        Ok(insert(&self.conn, clinic, now_utc())?)
    }

    fn get(&self, id: i64) -> CatalogResult<Clinic> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM clinic WHERE id = ?1");
        let mut stmt = self.conn.prepare(&sql)?;
        match stmt.query_row([id], clinic_from_row) {
            Ok(c) => Ok(c),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(CatalogError::NotFound(id)),
            Err(e) => Err(e.into()),
        }
    }

    fn update(&mut self, id: i64, c: &NewClinic) -> CatalogResult<()> {
        let changed = self.conn.execute(
            "
            UPDATE clinic SET
                region = ?2,
                district = ?3,
                name = ?4,
                health_mall = ?5,
                hundred_position = ?6,
                media_items = ?7,
                specialties = ?8,
                address = ?9,
                phone = ?10,
                contact_person = ?11,
                business_hours = ?12,
                note = ?13,
                updated_at = ?14
            WHERE id = ?1
            ",
            params![
                id,
                c.region,
                c.district,
                c.name,
                c.health_mall_or_default(),
                c.hundred_position_or_default(),
                c.media_items,
                c.specialties,
                c.address,
                c.phone,
                c.contact_person,
                c.business_hours,
                c.note,
                now_utc(),
            ],
        )?;
        if changed == 0 {
            return Err(CatalogError::NotFound(id));
        }
        Ok(())
    }

    fn delete(&mut self, id: i64) -> CatalogResult<()> {
        let changed = self.conn.execute("DELETE FROM clinic WHERE id = ?1", [id])?;
        if changed == 0 {
            return Err(CatalogError::NotFound(id));
        }
        Ok(())
    }

    fn list_all(&self) -> CatalogResult<Vec<Clinic>> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM clinic ORDER BY id ASC");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], clinic_from_row)?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    fn count(&self) -> CatalogResult<u64> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM clinic", [], |row| row.get(0))?;
        Ok(n.max(0) as u64)
    }

    fn insert_batch(&mut self, clinics: &[NewClinic]) -> CatalogResult<usize> {
        let now = now_utc();
        let tx = self.conn.transaction()?;
        for c in clinics {
            insert(&tx, c, now)?;
        }
        tx.commit()?;
        Ok(clinics.len())
    }
}
