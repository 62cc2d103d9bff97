// Sensory Diagnostic Session Engine - Core Library
// Exposes all modules for use in the console shell and tests

pub mod error;
pub mod catalog;      // Static reference data: categories, questions, CSV seeds
pub mod eligibility;  // Age-gated equipment matching
pub mod session;      // Session state machine: Intake → ModeSelection → Interview → Summary
pub mod report;       // Report aggregation and payload
pub mod db;           // SQLite-backed store (persistence adapter + catalog)

// Re-export commonly used types
pub use error::{EngineError, EngineResult};
pub use catalog::{
    load_catalog_dir, load_equipment_csv, load_links_csv, load_questions_csv, Catalog,
    InMemoryCatalog, Question,
};
pub use eligibility::{AgeRange, EligibilityMatcher, EquipmentEntry};
pub use session::{
    compute_age, ConfirmedItem, Patient, Phase, QuizMode, Response, SessionEngine, SessionState,
    SessionStore, BIRTH_DATE_FORMAT,
};
pub use report::{
    CategorySection, Equipment, PatientSummary, ReportAggregator, ReportItem, ReportPayload,
};
pub use db::{setup_database, SqliteStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
