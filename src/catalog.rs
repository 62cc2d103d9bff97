// 📋 Catalog Accessor - Static reference data
// Questions, categories, and age-gated equipment eligibility.
// The catalog is read-only from the engine's perspective; a session never
// mutates it.

use crate::eligibility::{EligibilityMatcher, EquipmentEntry};
use crate::error::EngineResult;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

// ============================================================================
// QUESTION
// ============================================================================

/// Static reference entity: one assertion of the questionnaire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,

    /// The assertion text shown to the clinician
    pub text: String,

    /// Category this question belongs to (e.g. "Tactile", "Auditory")
    pub category: String,

    /// Intensity label carried into the report verbatim
    pub intensity: String,

    /// When true, free-text notes are solicited for this question;
    /// when false, any supplied notes are normalized to empty.
    pub precision_required: bool,
}

// ============================================================================
// CATALOG TRAIT
// ============================================================================

/// Read-only queries against the static reference data.
///
/// Implemented by `db::SqliteStore` for production and by in-memory fakes
/// in tests so the state machine runs without any storage present.
pub trait Catalog {
    /// Distinct non-empty category names, sorted lexicographically.
    fn list_categories(&self) -> EngineResult<Vec<String>>;

    /// Questions in catalog-defined order; all questions when `category`
    /// is `None`.
    fn list_questions(&self, category: Option<&str>) -> EngineResult<Vec<Question>>;

    /// Equipment linked to `question_id` whose age range contains `age`,
    /// inclusive both ends. Empty when nothing matches.
    fn equipment_for(&self, question_id: i64, age: i64) -> EngineResult<Vec<EquipmentEntry>>;
}

// ============================================================================
// IN-MEMORY CATALOG
// ============================================================================

/// Catalog held entirely in memory, backed by the eligibility matcher.
/// Used by the CSV seeding path and by tests.
pub struct InMemoryCatalog {
    questions: Vec<Question>,
    matcher: EligibilityMatcher,
}

impl InMemoryCatalog {
    pub fn new(questions: Vec<Question>, matcher: EligibilityMatcher) -> Self {
        InMemoryCatalog { questions, matcher }
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }
}

impl Catalog for InMemoryCatalog {
    fn list_categories(&self) -> EngineResult<Vec<String>> {
        let set: BTreeSet<String> = self
            .questions
            .iter()
            .map(|q| q.category.clone())
            .filter(|c| !c.is_empty())
            .collect();
        Ok(set.into_iter().collect())
    }

    fn list_questions(&self, category: Option<&str>) -> EngineResult<Vec<Question>> {
        let questions = match category {
            Some(cat) => self
                .questions
                .iter()
                .filter(|q| q.category == cat)
                .cloned()
                .collect(),
            None => self.questions.clone(),
        };
        Ok(questions)
    }

    fn equipment_for(&self, question_id: i64, age: i64) -> EngineResult<Vec<EquipmentEntry>> {
        Ok(self.matcher.find_equipment(question_id, age))
    }
}

// ============================================================================
// CSV SEED RECORDS
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct QuestionRecord {
    #[serde(rename = "Id")]
    pub id: i64,

    #[serde(rename = "Text")]
    pub text: String,

    #[serde(rename = "Category")]
    pub category: String,

    #[serde(rename = "Intensity")]
    pub intensity: String,

    /// "yes" solicits notes, anything else does not
    #[serde(rename = "Precision_Required")]
    pub precision_required: String,
}

impl QuestionRecord {
    pub fn into_question(self) -> Question {
        Question {
            id: self.id,
            text: self.text,
            category: self.category,
            intensity: self.intensity,
            precision_required: self.precision_required.eq_ignore_ascii_case("yes"),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct EquipmentRecord {
    #[serde(rename = "Id")]
    pub id: i64,

    #[serde(rename = "Name")]
    pub name: String,

    #[serde(rename = "Site")]
    pub site: String,

    #[serde(rename = "Age_Min")]
    pub age_min: i64,

    #[serde(rename = "Age_Max")]
    pub age_max: i64,
}

#[derive(Debug, Deserialize)]
pub struct LinkRecord {
    #[serde(rename = "Question_Id")]
    pub question_id: i64,

    #[serde(rename = "Equipment_Id")]
    pub equipment_id: i64,
}

pub fn load_questions_csv(path: &Path) -> Result<Vec<QuestionRecord>> {
    let mut rdr = csv::Reader::from_path(path).context("Failed to open questions CSV")?;
    let mut records = Vec::new();
    for result in rdr.deserialize() {
        let record: QuestionRecord = result.context("Failed to deserialize question record")?;
        records.push(record);
    }
    Ok(records)
}

pub fn load_equipment_csv(path: &Path) -> Result<Vec<EquipmentRecord>> {
    let mut rdr = csv::Reader::from_path(path).context("Failed to open equipment CSV")?;
    let mut records = Vec::new();
    for result in rdr.deserialize() {
        let record: EquipmentRecord = result.context("Failed to deserialize equipment record")?;
        records.push(record);
    }
    Ok(records)
}

pub fn load_links_csv(path: &Path) -> Result<Vec<LinkRecord>> {
    let mut rdr = csv::Reader::from_path(path).context("Failed to open links CSV")?;
    let mut records = Vec::new();
    for result in rdr.deserialize() {
        let record: LinkRecord = result.context("Failed to deserialize link record")?;
        records.push(record);
    }
    Ok(records)
}

/// Build an in-memory catalog from the three seed files in `dir`:
/// questions.csv, equipment.csv, links.csv.
pub fn load_catalog_dir(dir: &Path) -> Result<InMemoryCatalog> {
    let questions: Vec<Question> = load_questions_csv(&dir.join("questions.csv"))?
        .into_iter()
        .map(QuestionRecord::into_question)
        .collect();

    let equipment = load_equipment_csv(&dir.join("equipment.csv"))?;
    let links = load_links_csv(&dir.join("links.csv"))?;

    let mut matcher = EligibilityMatcher::new();
    for link in &links {
        let entry = equipment
            .iter()
            .find(|e| e.id == link.equipment_id)
            .with_context(|| {
                format!(
                    "Link references unknown equipment id {}",
                    link.equipment_id
                )
            })?;
        matcher.add_link(
            link.question_id,
            EquipmentEntry::new(&entry.name, &entry.site, entry.age_min, entry.age_max),
        );
    }

    Ok(InMemoryCatalog::new(questions, matcher))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: i64, text: &str, category: &str) -> Question {
        Question {
            id,
            text: text.to_string(),
            category: category.to_string(),
            intensity: "Moderate".to_string(),
            precision_required: false,
        }
    }

    fn sample_catalog() -> InMemoryCatalog {
        let questions = vec![
            question(1, "Covers ears at loud sounds", "Auditory"),
            question(2, "Avoids certain clothing textures", "Tactile"),
            question(3, "Startled by background noise", "Auditory"),
        ];
        let mut matcher = EligibilityMatcher::new();
        matcher.add_link(1, EquipmentEntry::new("Ear Defenders", "RoomA", 3, 12));
        InMemoryCatalog::new(questions, matcher)
    }

    #[test]
    fn test_categories_distinct_and_sorted() {
        let catalog = sample_catalog();
        let cats = catalog.list_categories().unwrap();
        assert_eq!(cats, vec!["Auditory".to_string(), "Tactile".to_string()]);
    }

    #[test]
    fn test_empty_category_names_excluded() {
        let questions = vec![question(1, "Q1", ""), question(2, "Q2", "Tactile")];
        let catalog = InMemoryCatalog::new(questions, EligibilityMatcher::new());
        assert_eq!(catalog.list_categories().unwrap(), vec!["Tactile".to_string()]);
    }

    #[test]
    fn test_list_questions_filters_by_category() {
        let catalog = sample_catalog();

        let all = catalog.list_questions(None).unwrap();
        assert_eq!(all.len(), 3);

        let auditory = catalog.list_questions(Some("Auditory")).unwrap();
        assert_eq!(auditory.len(), 2);
        // Catalog order preserved
        assert_eq!(auditory[0].id, 1);
        assert_eq!(auditory[1].id, 3);

        let none = catalog.list_questions(Some("Gustatory")).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_equipment_for_applies_age_gate() {
        let catalog = sample_catalog();

        let found = catalog.equipment_for(1, 7).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Ear Defenders");

        assert!(catalog.equipment_for(1, 13).unwrap().is_empty());
        assert!(catalog.equipment_for(2, 7).unwrap().is_empty());
    }

    #[test]
    fn test_load_catalog_dir() {
        let dir = std::env::temp_dir().join(format!("sd-catalog-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir(&dir).unwrap();

        std::fs::write(
            dir.join("questions.csv"),
            "Id,Text,Category,Intensity,Precision_Required\n\
             1,Covers ears at loud sounds,Auditory,High,no\n",
        )
        .unwrap();
        std::fs::write(
            dir.join("equipment.csv"),
            "Id,Name,Site,Age_Min,Age_Max\n1,Ear Defenders,RoomA,3,12\n",
        )
        .unwrap();
        std::fs::write(dir.join("links.csv"), "Question_Id,Equipment_Id\n1,1\n").unwrap();

        let catalog = load_catalog_dir(&dir).unwrap();
        assert_eq!(catalog.question_count(), 1);
        assert_eq!(catalog.list_categories().unwrap(), vec!["Auditory".to_string()]);
        assert_eq!(catalog.equipment_for(1, 7).unwrap().len(), 1);
        assert!(catalog.equipment_for(1, 13).unwrap().is_empty());

        // A link pointing at a missing equipment row is a load error
        std::fs::write(dir.join("links.csv"), "Question_Id,Equipment_Id\n1,99\n").unwrap();
        assert!(load_catalog_dir(&dir).is_err());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_question_record_precision_flag() {
        let record = QuestionRecord {
            id: 1,
            text: "Q".to_string(),
            category: "Tactile".to_string(),
            intensity: "High".to_string(),
            precision_required: "Yes".to_string(),
        };
        assert!(record.into_question().precision_required);

        let record = QuestionRecord {
            id: 2,
            text: "Q".to_string(),
            category: "Tactile".to_string(),
            intensity: "High".to_string(),
            precision_required: "no".to_string(),
        };
        assert!(!record.into_question().precision_required);
    }
}
