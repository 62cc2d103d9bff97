// 🗄️ SQLite Store - Persistence adapter + catalog backend
// One database holds the static catalog (questions, equipment, links) and
// the append-only session history (patients, answers). Rows are only ever
// inserted; the engine never updates or deletes history.

use crate::catalog::{
    load_equipment_csv, load_links_csv, load_questions_csv, Catalog, EquipmentRecord, LinkRecord,
    Question, QuestionRecord,
};
use crate::eligibility::{AgeRange, EquipmentEntry};
use crate::error::EngineResult;
use crate::session::SessionStore;
use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use std::path::Path;

// ============================================================================
// SCHEMA
// ============================================================================

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // ==========================================================================
    // Session history (append-only)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS patients (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            birth_date TEXT NOT NULL,
            age INTEGER NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS answers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            patient_id INTEGER NOT NULL,
            question_id INTEGER NOT NULL,
            response TEXT NOT NULL,
            notes TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // ==========================================================================
    // Static catalog
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS questions (
            id INTEGER PRIMARY KEY,
            text TEXT NOT NULL,
            category TEXT NOT NULL,
            intensity TEXT NOT NULL,
            precision_required INTEGER NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS equipment (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            site TEXT NOT NULL,
            age_min INTEGER NOT NULL,
            age_max INTEGER NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS equipment_links (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            question_id INTEGER NOT NULL,
            equipment_id INTEGER NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_answers_patient ON answers(patient_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_questions_category ON questions(category)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_links_question ON equipment_links(question_id)",
        [],
    )?;

    Ok(())
}

// ============================================================================
// SQLITE STORE
// ============================================================================

/// Owns the connection and implements both engine-facing contracts:
/// `SessionStore` (writes) and `Catalog` (reads).
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {:?}", path))?;
        setup_database(&conn)?;
        Ok(SqliteStore { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        setup_database(&conn)?;
        Ok(SqliteStore { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// True when the questions table has no rows yet (fresh database)
    pub fn catalog_is_empty(&self) -> Result<bool> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM questions", [], |row| row.get(0))?;
        Ok(count == 0)
    }

    pub fn answer_count(&self, patient_id: i64) -> Result<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM answers WHERE patient_id = ?1",
            params![patient_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // ------------------------------------------------------------------
    // Catalog seeding
    // ------------------------------------------------------------------

    /// Replace the catalog tables with the given seed records.
    pub fn seed_catalog(
        &self,
        questions: &[QuestionRecord],
        equipment: &[EquipmentRecord],
        links: &[LinkRecord],
    ) -> Result<()> {
        self.conn.execute("DELETE FROM equipment_links", [])?;
        self.conn.execute("DELETE FROM equipment", [])?;
        self.conn.execute("DELETE FROM questions", [])?;

        for q in questions {
            self.conn.execute(
                "INSERT INTO questions (id, text, category, intensity, precision_required)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    q.id,
                    q.text,
                    q.category,
                    q.intensity,
                    q.precision_required.eq_ignore_ascii_case("yes"),
                ],
            )?;
        }

        for e in equipment {
            self.conn.execute(
                "INSERT INTO equipment (id, name, site, age_min, age_max)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![e.id, e.name, e.site, e.age_min, e.age_max],
            )?;
        }

        for l in links {
            self.conn.execute(
                "INSERT INTO equipment_links (question_id, equipment_id) VALUES (?1, ?2)",
                params![l.question_id, l.equipment_id],
            )?;
        }

        Ok(())
    }

    /// Seed from the three CSV files in `dir` (questions.csv,
    /// equipment.csv, links.csv). Returns (questions, equipment, links)
    /// row counts for operator feedback.
    pub fn seed_catalog_dir(&self, dir: &Path) -> Result<(usize, usize, usize)> {
        let questions = load_questions_csv(&dir.join("questions.csv"))?;
        let equipment = load_equipment_csv(&dir.join("equipment.csv"))?;
        let links = load_links_csv(&dir.join("links.csv"))?;

        self.seed_catalog(&questions, &equipment, &links)?;
        Ok((questions.len(), equipment.len(), links.len()))
    }
}

// ============================================================================
// ENGINE-FACING CONTRACTS
// ============================================================================

impl SessionStore for SqliteStore {
    fn create_patient(&self, birth_date: &str, age: i64) -> EngineResult<i64> {
        self.conn.execute(
            "INSERT INTO patients (birth_date, age) VALUES (?1, ?2)",
            params![birth_date, age],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn record_answer(
        &self,
        patient_id: i64,
        question_id: i64,
        response: &str,
        notes: &str,
    ) -> EngineResult<()> {
        self.conn.execute(
            "INSERT INTO answers (patient_id, question_id, response, notes)
             VALUES (?1, ?2, ?3, ?4)",
            params![patient_id, question_id, response, notes],
        )?;
        Ok(())
    }
}

impl Catalog for SqliteStore {
    fn list_categories(&self) -> EngineResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT category FROM questions
             WHERE category IS NOT NULL AND category != ''
             ORDER BY category",
        )?;
        let categories = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(categories)
    }

    fn list_questions(&self, category: Option<&str>) -> EngineResult<Vec<Question>> {
        let map_row = |row: &rusqlite::Row<'_>| {
            Ok(Question {
                id: row.get(0)?,
                text: row.get(1)?,
                category: row.get(2)?,
                intensity: row.get(3)?,
                precision_required: row.get(4)?,
            })
        };

        let questions = match category {
            Some(cat) => {
                let mut stmt = self.conn.prepare(
                    "SELECT id, text, category, intensity, precision_required
                     FROM questions WHERE category = ?1 ORDER BY id",
                )?;
                let rows = stmt
                    .query_map(params![cat], map_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            }
            None => {
                let mut stmt = self.conn.prepare(
                    "SELECT id, text, category, intensity, precision_required
                     FROM questions ORDER BY id",
                )?;
                let rows = stmt
                    .query_map([], map_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            }
        };
        Ok(questions)
    }

    fn equipment_for(&self, question_id: i64, age: i64) -> EngineResult<Vec<EquipmentEntry>> {
        // Inclusive age gate, same semantics as EligibilityMatcher
        let mut stmt = self.conn.prepare(
            "SELECT e.name, e.site, e.age_min, e.age_max
             FROM equipment e
             JOIN equipment_links l ON e.id = l.equipment_id
             WHERE l.question_id = ?1 AND e.age_min <= ?2 AND e.age_max >= ?2
             ORDER BY l.id",
        )?;
        let entries = stmt
            .query_map(params![question_id, age], |row| {
                Ok(EquipmentEntry {
                    name: row.get(0)?,
                    site: row.get(1)?,
                    age_range: AgeRange::new(row.get(2)?, row.get(3)?),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }
}

// ============================================================================
// TESTS
// ============================================================================
