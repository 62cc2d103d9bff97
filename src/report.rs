// 📊 Report Aggregator - Session summary payload
// Turns the ordered confirmed-item list into a categorized, deduplicated,
// serializable payload. Building is pure: same inputs, same payload.
// Rendering the payload into a document is an external concern; a plain
// text rendering is provided as a convenience.

use crate::catalog::Catalog;
use crate::error::EngineResult;
use crate::session::{ConfirmedItem, Patient};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// ============================================================================
// REPORT PAYLOAD
// ============================================================================

/// Equipment as it appears in the report (the age gate has already been
/// applied; the range itself is not part of the payload)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Equipment {
    pub name: String,
    pub site: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientSummary {
    pub id: i64,

    /// DD/MM/YYYY, the stored form
    pub birth_date: String,

    pub age_at_exam: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportItem {
    pub question_id: i64,
    pub text: String,
    pub intensity: String,
    pub notes: String,

    /// Equipment eligible for this item at the patient's age; empty is a
    /// normal, reportable outcome
    pub equipment: Vec<Equipment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySection {
    pub category: String,
    pub items: Vec<ReportItem>,
}

/// The structured summary of one completed session. Built once on demand,
/// never mutated after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportPayload {
    pub patient: PatientSummary,

    /// Categories in lexicographic order; items inside each category keep
    /// their interview order
    pub sections: Vec<CategorySection>,

    /// Every distinct equipment name seen across the session, first
    /// insertion order, one site per name
    pub global_equipment: Vec<Equipment>,
}

impl ReportPayload {
    /// True when the session produced no confirmed findings
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Plain-text rendering with the same logical layout the downstream
    /// document renderer is expected to produce.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        out.push_str("Sensory Diagnostic Report\n");
        out.push_str(&format!("Birth date: {}\n", self.patient.birth_date));
        out.push_str(&format!("Age at exam: {} years\n", self.patient.age_at_exam));
        out.push_str("\nConfirmed findings\n");

        if self.is_empty() {
            out.push_str("No confirmed findings recorded.\n");
            return out;
        }

        for section in &self.sections {
            out.push_str(&format!("\nCategory: {}\n", section.category));
            for item in &section.items {
                out.push_str(&format!("  - {} (intensity: {})\n", item.text, item.intensity));
                if !item.notes.is_empty() {
                    out.push_str(&format!("    Notes: {}\n", item.notes));
                }
                if !item.equipment.is_empty() {
                    let names: Vec<&str> =
                        item.equipment.iter().map(|e| e.name.as_str()).collect();
                    out.push_str(&format!("    Equipment: {}\n", names.join(", ")));
                }
            }
        }

        if !self.global_equipment.is_empty() {
            out.push_str("\nGlobal equipment list\n");
            for eq in &self.global_equipment {
                out.push_str(&format!("  {} (site: {})\n", eq.name, eq.site));
            }
        }

        out
    }
}

// ============================================================================
// REPORT AGGREGATOR
// ============================================================================

/// Stateless aggregation over the session's confirmed items. Never fails on
/// its own; catalog errors propagate unchanged.
pub struct ReportAggregator;

impl ReportAggregator {
    pub fn new() -> Self {
        ReportAggregator
    }

    pub fn build(
        &self,
        patient: &Patient,
        confirmed: &[ConfirmedItem],
        catalog: &dyn Catalog,
    ) -> EngineResult<ReportPayload> {
        let patient_summary = PatientSummary {
            id: patient.id,
            birth_date: patient.birth_date_display(),
            age_at_exam: patient.age_at_exam,
        };

        if confirmed.is_empty() {
            return Ok(ReportPayload {
                patient: patient_summary,
                sections: Vec::new(),
                global_equipment: Vec::new(),
            });
        }

        // Distinct categories, lexicographic
        let categories: BTreeSet<&str> =
            confirmed.iter().map(|item| item.category.as_str()).collect();

        let mut sections = Vec::with_capacity(categories.len());
        let mut global: Vec<Equipment> = Vec::new();

        for category in categories {
            // Stable partition: interview order preserved inside the category
            let mut items = Vec::new();
            for item in confirmed.iter().filter(|i| i.category == category) {
                let eligible =
                    catalog.equipment_for(item.question_id, patient.age_at_exam)?;

                for entry in &eligible {
                    match global.iter_mut().find(|g| g.name == entry.name) {
                        // Name collision across sites: last-seen site wins
                        Some(existing) => existing.site = entry.site.clone(),
                        None => global.push(Equipment {
                            name: entry.name.clone(),
                            site: entry.site.clone(),
                        }),
                    }
                }

                items.push(ReportItem {
                    question_id: item.question_id,
                    text: item.text.clone(),
                    intensity: item.intensity.clone(),
                    notes: item.notes.clone(),
                    equipment: eligible
                        .into_iter()
                        .map(|e| Equipment {
                            name: e.name,
                            site: e.site,
                        })
                        .collect(),
                });
            }

            sections.push(CategorySection {
                category: category.to_string(),
                items,
            });
        }

        Ok(ReportPayload {
            patient: patient_summary,
            sections,
            global_equipment: global,
        })
    }
}

impl Default for ReportAggregator {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{InMemoryCatalog, Question};
    use crate::eligibility::{EligibilityMatcher, EquipmentEntry};
    use crate::error::EngineError;
    use chrono::NaiveDate;

    fn patient(age: i64) -> Patient {
        Patient {
            id: 1,
            birth_date: NaiveDate::from_ymd_opt(2015, 6, 15).unwrap(),
            age_at_exam: age,
        }
    }

    fn confirmed(question_id: i64, category: &str) -> ConfirmedItem {
        ConfirmedItem {
            question_id,
            text: format!("Assertion {}", question_id),
            category: category.to_string(),
            intensity: "Moderate".to_string(),
            notes: String::new(),
        }
    }

    fn catalog_with_links(links: Vec<(i64, EquipmentEntry)>) -> InMemoryCatalog {
        InMemoryCatalog::new(Vec::new(), EligibilityMatcher::from_links(links))
    }

    #[test]
    fn test_empty_session_yields_well_formed_empty_payload() {
        let catalog = catalog_with_links(Vec::new());
        let payload = ReportAggregator::new()
            .build(&patient(8), &[], &catalog)
            .unwrap();

        assert!(payload.is_empty());
        assert!(payload.sections.is_empty());
        assert!(payload.global_equipment.is_empty());
        assert_eq!(payload.patient.age_at_exam, 8);
        assert!(payload.render_text().contains("No confirmed findings"));
    }

    #[test]
    fn test_categories_sorted_items_keep_interview_order() {
        let catalog = catalog_with_links(Vec::new());
        // Interview order: Tactile first, then Auditory
        let items = vec![
            confirmed(10, "Tactile"),
            confirmed(11, "Auditory"),
            confirmed(12, "Tactile"),
            confirmed(13, "Auditory"),
        ];

        let payload = ReportAggregator::new()
            .build(&patient(8), &items, &catalog)
            .unwrap();

        assert_eq!(payload.sections.len(), 2);
        assert_eq!(payload.sections[0].category, "Auditory");
        assert_eq!(payload.sections[1].category, "Tactile");

        let auditory_ids: Vec<i64> =
            payload.sections[0].items.iter().map(|i| i.question_id).collect();
        assert_eq!(auditory_ids, vec![11, 13]);

        let tactile_ids: Vec<i64> =
            payload.sections[1].items.iter().map(|i| i.question_id).collect();
        assert_eq!(tactile_ids, vec![10, 12]);
    }

    #[test]
    fn test_equipment_resolved_at_patient_age() {
        let catalog = catalog_with_links(vec![
            (10, EquipmentEntry::new("Splint", "RoomA", 5, 10)),
            (10, EquipmentEntry::new("Adult Brace", "RoomB", 16, 99)),
        ]);
        let items = vec![confirmed(10, "Tactile")];

        let payload = ReportAggregator::new()
            .build(&patient(8), &items, &catalog)
            .unwrap();

        let item = &payload.sections[0].items[0];
        assert_eq!(item.equipment.len(), 1);
        assert_eq!(item.equipment[0].name, "Splint");
    }

    #[test]
    fn test_item_with_no_equipment_is_normal() {
        let catalog = catalog_with_links(Vec::new());
        let items = vec![confirmed(10, "Tactile")];

        let payload = ReportAggregator::new()
            .build(&patient(8), &items, &catalog)
            .unwrap();

        assert!(payload.sections[0].items[0].equipment.is_empty());
        assert!(payload.global_equipment.is_empty());
    }

    #[test]
    fn test_global_equipment_deduplicated_across_categories() {
        let catalog = catalog_with_links(vec![
            (10, EquipmentEntry::new("Splint", "RoomA", 5, 10)),
            (11, EquipmentEntry::new("Splint", "RoomA", 5, 10)),
        ]);
        let items = vec![confirmed(10, "Tactile"), confirmed(11, "Auditory")];

        let payload = ReportAggregator::new()
            .build(&patient(8), &items, &catalog)
            .unwrap();

        assert_eq!(payload.global_equipment.len(), 1);
        assert_eq!(payload.global_equipment[0].name, "Splint");
        assert_eq!(payload.global_equipment[0].site, "RoomA");
    }

    #[test]
    fn test_name_collision_last_seen_site_wins() {
        let catalog = catalog_with_links(vec![
            (10, EquipmentEntry::new("Splint", "RoomA", 5, 10)),
            (11, EquipmentEntry::new("Splint", "RoomB", 5, 10)),
        ]);
        // Aggregation order is category order: Auditory (11) before
        // Tactile (10), so RoomA is the last site seen
        let items = vec![confirmed(10, "Tactile"), confirmed(11, "Auditory")];

        let payload = ReportAggregator::new()
            .build(&patient(8), &items, &catalog)
            .unwrap();

        assert_eq!(payload.global_equipment.len(), 1);
        assert_eq!(payload.global_equipment[0].site, "RoomA");
    }

    #[test]
    fn test_global_equipment_first_insertion_order() {
        let catalog = catalog_with_links(vec![
            (10, EquipmentEntry::new("Weighted Blanket", "RoomB", 5, 10)),
            (11, EquipmentEntry::new("Ear Defenders", "RoomA", 5, 10)),
        ]);
        // Auditory aggregates first, so its equipment is inserted first
        let items = vec![confirmed(10, "Tactile"), confirmed(11, "Auditory")];

        let payload = ReportAggregator::new()
            .build(&patient(8), &items, &catalog)
            .unwrap();

        let names: Vec<&str> =
            payload.global_equipment.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Ear Defenders", "Weighted Blanket"]);
    }

    #[test]
    fn test_build_is_idempotent() {
        let catalog = catalog_with_links(vec![(
            10,
            EquipmentEntry::new("Splint", "RoomA", 5, 10),
        )]);
        let items = vec![confirmed(10, "Tactile"), confirmed(11, "Auditory")];
        let aggregator = ReportAggregator::new();

        let first = aggregator.build(&patient(8), &items, &catalog).unwrap();
        let second = aggregator.build(&patient(8), &items, &catalog).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_catalog_errors_propagate_unchanged() {
        struct BrokenCatalog;

        impl Catalog for BrokenCatalog {
            fn list_categories(&self) -> EngineResult<Vec<String>> {
                Err(EngineError::storage("catalog offline"))
            }
            fn list_questions(&self, _category: Option<&str>) -> EngineResult<Vec<Question>> {
                Err(EngineError::storage("catalog offline"))
            }
            fn equipment_for(
                &self,
                _question_id: i64,
                _age: i64,
            ) -> EngineResult<Vec<EquipmentEntry>> {
                Err(EngineError::storage("catalog offline"))
            }
        }

        let items = vec![confirmed(10, "Tactile")];
        let err = ReportAggregator::new()
            .build(&patient(8), &items, &BrokenCatalog)
            .unwrap_err();
        assert!(err.is_storage());
    }

    #[test]
    fn test_render_text_layout() {
        let catalog = catalog_with_links(vec![(
            10,
            EquipmentEntry::new("Splint", "RoomA", 5, 10),
        )]);
        let mut item = confirmed(10, "Tactile");
        item.notes = "only at school".to_string();

        let payload = ReportAggregator::new()
            .build(&patient(8), &[item], &catalog)
            .unwrap();
        let text = payload.render_text();

        assert!(text.contains("Birth date: 15/06/2015"));
        assert!(text.contains("Age at exam: 8 years"));
        assert!(text.contains("Category: Tactile"));
        assert!(text.contains("Notes: only at school"));
        assert!(text.contains("Equipment: Splint"));
        assert!(text.contains("Splint (site: RoomA)"));
    }
}
