// 🎯 Eligibility Matcher - Age-gated equipment resolution
// A question maps to zero or more equipment entries; an entry applies to a
// patient only when the patient's age falls inside the entry's range,
// inclusive on both ends.

use serde::{Deserialize, Serialize};

// ============================================================================
// AGE RANGE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeRange {
    /// Minimum age in whole years (inclusive)
    pub min: i64,

    /// Maximum age in whole years (inclusive)
    pub max: i64,
}

impl AgeRange {
    pub fn new(min: i64, max: i64) -> Self {
        AgeRange { min, max }
    }

    /// Inclusive on both ends: min <= age <= max
    pub fn contains(&self, age: i64) -> bool {
        self.min <= age && age <= self.max
    }
}

// ============================================================================
// EQUIPMENT ENTRY
// ============================================================================

/// Static reference entity: a piece of equipment available at a site,
/// applicable to patients inside an age range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentEntry {
    pub name: String,
    pub site: String,
    pub age_range: AgeRange,
}

impl EquipmentEntry {
    pub fn new(name: &str, site: &str, min_age: i64, max_age: i64) -> Self {
        EquipmentEntry {
            name: name.to_string(),
            site: site.to_string(),
            age_range: AgeRange::new(min_age, max_age),
        }
    }
}

// ============================================================================
// ELIGIBILITY MATCHER
// ============================================================================

/// Pure matcher over the static question↔equipment association table.
///
/// No side effects, no ordering guarantee beyond catalog order of the
/// association rows. An empty result is a normal, reportable outcome,
/// never an error.
pub struct EligibilityMatcher {
    /// Association rows in catalog order: (question_id, entry)
    links: Vec<(i64, EquipmentEntry)>,
}

impl EligibilityMatcher {
    pub fn new() -> Self {
        EligibilityMatcher { links: Vec::new() }
    }

    pub fn from_links(links: Vec<(i64, EquipmentEntry)>) -> Self {
        EligibilityMatcher { links }
    }

    /// Associate an equipment entry with a question
    pub fn add_link(&mut self, question_id: i64, entry: EquipmentEntry) {
        self.links.push((question_id, entry));
    }

    /// Every entry linked to `question_id` whose age range contains `age`,
    /// in catalog order.
    pub fn find_equipment(&self, question_id: i64, age: i64) -> Vec<EquipmentEntry> {
        self.links
            .iter()
            .filter(|(qid, entry)| *qid == question_id && entry.age_range.contains(age))
            .map(|(_, entry)| entry.clone())
            .collect()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }
}

impl Default for EligibilityMatcher {
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

    #[test]
    fn test_age_range_inclusive_bounds() {
        let range = AgeRange::new(5, 10);

        assert!(range.contains(5));
        assert!(range.contains(10));
        assert!(range.contains(7));
        assert!(!range.contains(4));
        assert!(!range.contains(11));
    }

    #[test]
    fn test_find_equipment_filters_by_age() {
        let mut matcher = EligibilityMatcher::new();
        matcher.add_link(1, EquipmentEntry::new("Splint", "RoomA", 5, 10));
        matcher.add_link(1, EquipmentEntry::new("Weighted Blanket", "RoomB", 8, 15));
        matcher.add_link(2, EquipmentEntry::new("Ear Defenders", "RoomA", 3, 12));
        assert_eq!(matcher.link_count(), 3);

        // Age 6: only the splint applies to question 1
        let found = matcher.find_equipment(1, 6);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Splint");

        // Age 9: both question-1 entries apply, catalog order preserved
        let found = matcher.find_equipment(1, 9);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].name, "Splint");
        assert_eq!(found[1].name, "Weighted Blanket");

        // Question 2 entries never leak into question 1
        let found = matcher.find_equipment(1, 4);
        assert!(found.is_empty());
    }

    #[test]
    fn test_no_match_is_empty_not_error() {
        let matcher = EligibilityMatcher::new();
        assert!(matcher.find_equipment(99, 7).is_empty());
    }
}
