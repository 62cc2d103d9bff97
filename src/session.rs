// 🩺 Session State Machine - Intake → ModeSelection → Interview → Summary
// One running session per engine instance. The engine owns the mutable
// SessionState exclusively; collaborators (store, catalog) only ever see
// copies or projections of it.

use crate::catalog::{Catalog, Question};
use crate::error::{EngineError, EngineResult};
use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stored birth-date format, kept from the system this engine replaced
pub const BIRTH_DATE_FORMAT: &str = "%d/%m/%Y";

// ============================================================================
// RESPONSE
// ============================================================================

/// Closed set of clinician responses. Anything outside this set is a
/// contract violation at the parse boundary, not a representable value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Response {
    True,
    False,
    Unknown,
}

impl Response {
    /// Stored literal, written verbatim to the answers table
    pub fn as_str(&self) -> &'static str {
        match self {
            Response::True => "True",
            Response::False => "False",
            Response::Unknown => "Unknown",
        }
    }

    pub fn parse(s: &str) -> EngineResult<Response> {
        match s {
            "True" => Ok(Response::True),
            "False" => Ok(Response::False),
            "Unknown" => Ok(Response::Unknown),
            other => Err(EngineError::validation(format!(
                "invalid response literal: '{}'",
                other
            ))),
        }
    }

    /// Only confirmed ("True") answers reach the report
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Response::True)
    }
}

// ============================================================================
// PATIENT
// ============================================================================

/// Created once at intake, immutable afterward, owned by the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    /// Store-assigned identifier
    pub id: i64,

    pub birth_date: NaiveDate,

    /// Whole years at the moment of intake, per `compute_age`
    pub age_at_exam: i64,
}

impl Patient {
    /// Birth date in the stored DD/MM/YYYY form
    pub fn birth_date_display(&self) -> String {
        self.birth_date.format(BIRTH_DATE_FORMAT).to_string()
    }
}

/// Whole years between birth and exam date: calendar-year difference,
/// minus one if the birthday has not yet occurred in the exam year.
pub fn compute_age(birth_date: NaiveDate, exam_date: NaiveDate) -> i64 {
    let mut age = i64::from(exam_date.year()) - i64::from(birth_date.year());
    if (exam_date.month(), exam_date.day()) < (birth_date.month(), birth_date.day()) {
        age -= 1;
    }
    age
}

// ============================================================================
// CONFIRMED ITEM
// ============================================================================

/// Session-scoped projection of a "True" answer, denormalized for the
/// report. Append-only, in interview order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmedItem {
    pub question_id: i64,
    pub text: String,
    pub category: String,
    pub intensity: String,
    pub notes: String,
}

impl ConfirmedItem {
    fn from_question(question: &Question, notes: &str) -> Self {
        ConfirmedItem {
            question_id: question.id,
            text: question.text.clone(),
            category: question.category.clone(),
            intensity: question.intensity.clone(),
            notes: notes.to_string(),
        }
    }
}

// ============================================================================
// PHASE & MODE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Intake,
    ModeSelection,
    Interview,
    Summary,
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Intake => "Intake",
            Phase::ModeSelection => "ModeSelection",
            Phase::Interview => "Interview",
            Phase::Summary => "Summary",
        }
    }
}

/// Interview scope chosen at mode selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizMode {
    /// Every question in the catalog
    All,

    /// Only the questions of one named category
    Category(String),
}

impl QuizMode {
    pub fn label(&self) -> &str {
        match self {
            QuizMode::All => "Full",
            QuizMode::Category(name) => name,
        }
    }
}

// ============================================================================
// SESSION STORE
// ============================================================================

/// Persistence consumed by the engine: patient intake and each answer are
/// written immediately as they occur, append-only. The engine performs no
/// retries; retry policy, if any, belongs to the implementation.
pub trait SessionStore {
    fn create_patient(&self, birth_date: &str, age: i64) -> EngineResult<i64>;

    /// Called exactly once per answered question. `response` is one of
    /// the stored literals "True" / "False" / "Unknown".
    fn record_answer(
        &self,
        patient_id: i64,
        question_id: i64,
        response: &str,
        notes: &str,
    ) -> EngineResult<()>;
}

// ============================================================================
// SESSION STATE
// ============================================================================

/// The single mutable aggregate of the state machine.
///
/// `session_id` is identity (never changes within one run), the remaining
/// fields are the values accumulated along the way. `restart()` discards
/// everything and issues a fresh identity.
#[derive(Debug, Clone, Serialize)]
pub struct SessionState {
    pub session_id: Uuid,
    pub phase: Phase,
    pub patient: Option<Patient>,
    pub questions: Vec<Question>,
    pub cursor: usize,
    pub confirmed: Vec<ConfirmedItem>,
    pub mode_label: String,
}

impl SessionState {
    fn initial() -> Self {
        SessionState {
            session_id: Uuid::new_v4(),
            phase: Phase::Intake,
            patient: None,
            questions: Vec::new(),
            cursor: 0,
            confirmed: Vec::new(),
            mode_label: String::new(),
        }
    }

    /// Question the interview is currently pointing at, if any
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.cursor)
    }
}

// ============================================================================
// SESSION ENGINE
// ============================================================================

/// Drives one session through its lifecycle. Transitions mutate state only
/// after every collaborator call has succeeded, so a storage failure never
/// leaves the in-memory session ahead of persisted history.
pub struct SessionEngine<'a> {
    store: &'a dyn SessionStore,
    catalog: &'a dyn Catalog,
    state: SessionState,
}

impl<'a> SessionEngine<'a> {
    pub fn new(store: &'a dyn SessionStore, catalog: &'a dyn Catalog) -> Self {
        SessionEngine {
            store,
            catalog,
            state: SessionState::initial(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn patient(&self) -> Option<&Patient> {
        self.state.patient.as_ref()
    }

    pub fn confirmed(&self) -> &[ConfirmedItem] {
        &self.state.confirmed
    }

    /// Intake → ModeSelection. Computes the age as of today, persists the
    /// patient, and initializes the accumulation fields.
    pub fn submit_patient(&mut self, birth_date: NaiveDate) -> EngineResult<()> {
        self.submit_patient_at(birth_date, Local::now().date_naive())
    }

    /// Same transition with an explicit exam date. The public entry point
    /// passes "now"; tests pin the date.
    pub fn submit_patient_at(
        &mut self,
        birth_date: NaiveDate,
        exam_date: NaiveDate,
    ) -> EngineResult<()> {
        if self.state.phase != Phase::Intake {
            return Err(EngineError::validation(format!(
                "submit_patient is only valid in Intake (current phase: {})",
                self.state.phase.name()
            )));
        }
        if birth_date > exam_date {
            return Err(EngineError::validation(format!(
                "birth date {} is in the future",
                birth_date.format(BIRTH_DATE_FORMAT)
            )));
        }

        let age = compute_age(birth_date, exam_date);
        let birth_date_str = birth_date.format(BIRTH_DATE_FORMAT).to_string();

        // Persist first; on failure the session stays in Intake
        let patient_id = self.store.create_patient(&birth_date_str, age)?;

        self.state.patient = Some(Patient {
            id: patient_id,
            birth_date,
            age_at_exam: age,
        });
        self.state.confirmed = Vec::new();
        self.state.cursor = 0;
        self.state.phase = Phase::ModeSelection;
        Ok(())
    }

    /// ModeSelection → Interview. Fixes the question set for the rest of
    /// the session. A named category with zero questions is `NotFound` and
    /// leaves the session unchanged; an empty full catalog proceeds and
    /// completes immediately.
    pub fn start_quiz(&mut self, mode: QuizMode) -> EngineResult<()> {
        if self.state.phase != Phase::ModeSelection {
            return Err(EngineError::validation(format!(
                "start_quiz is only valid in ModeSelection (current phase: {})",
                self.state.phase.name()
            )));
        }

        let questions = match &mode {
            QuizMode::All => self.catalog.list_questions(None)?,
            QuizMode::Category(name) => {
                let questions = self.catalog.list_questions(Some(name))?;
                if questions.is_empty() {
                    return Err(EngineError::not_found(format!(
                        "category '{}' has no questions",
                        name
                    )));
                }
                questions
            }
        };

        self.state.mode_label = mode.label().to_string();
        self.state.questions = questions;
        self.state.cursor = 0;
        self.state.phase = Phase::Interview;
        self.apply_completion_guard();
        Ok(())
    }

    /// Interview → Interview (or Summary via the completion guard).
    ///
    /// Persists the answer, appends a ConfirmedItem iff the response is
    /// True, then advances the cursor. On a storage failure nothing is
    /// mutated and the same step may be retried.
    pub fn answer(&mut self, response: Response, notes: &str) -> EngineResult<()> {
        if self.state.phase != Phase::Interview {
            return Err(EngineError::validation(format!(
                "answer is only valid in Interview (current phase: {})",
                self.state.phase.name()
            )));
        }
        let question = match self.state.questions.get(self.state.cursor) {
            Some(q) => q.clone(),
            None => {
                return Err(EngineError::validation(
                    "answer called with no question pending",
                ))
            }
        };
        // Phase checks above guarantee a patient exists past Intake
        let patient_id = match &self.state.patient {
            Some(p) => p.id,
            None => return Err(EngineError::validation("no patient in session")),
        };

        // Notes are only solicited when the question asks for precision;
        // otherwise normalize so stored and reported forms are uniform.
        let notes = if question.precision_required { notes } else { "" };

        self.store
            .record_answer(patient_id, question.id, response.as_str(), notes)?;

        if response.is_confirmed() {
            self.state
                .confirmed
                .push(ConfirmedItem::from_question(&question, notes));
        }
        self.state.cursor += 1;
        self.apply_completion_guard();
        Ok(())
    }

    /// Summary → Intake. Clears all in-memory session state and issues a
    /// fresh session identity. Persisted patient/answer rows are untouched;
    /// history is append-only.
    pub fn restart(&mut self) {
        self.state = SessionState::initial();
    }

    /// Interview → Summary as soon as every selected question has been
    /// visited. No user action required.
    fn apply_completion_guard(&mut self) {
        if self.state.phase == Phase::Interview && self.state.cursor == self.state.questions.len()
        {
            self.state.phase = Phase::Summary;
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
