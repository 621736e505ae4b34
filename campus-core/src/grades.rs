//! Grade arithmetic, the bulk grade sheet used by teaching staff and the
//! student transcript.

use crate::api::types::decimal;
use crate::api::PortalBackend;
use crate::error::GradeError;
use crate::query::QueryClient;
use crate::resource::{Grade, RecordId};
use crate::screen::{matches_query, MutationDispatcher, Remote};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

pub const CONTROL_WEIGHT: f64 = 0.4;
pub const EXAM_WEIGHT: f64 = 0.6;
pub const PASS_MARK: f64 = 10.0;
pub const MIN_GRADE: f64 = 0.0;
pub const MAX_GRADE: f64 = 20.0;

pub const SAVE_OK: &str = "Grades saved successfully!";
pub const SAVE_FAILED: &str = "An error occurred while saving.";
pub const LOAD_FAILED: &str = "Unable to load the student list.";

pub fn final_grade(control: f64, exam: f64) -> f64 {
    CONTROL_WEIGHT * control + EXAM_WEIGHT * exam
}

pub fn is_passing(grade: f64) -> bool {
    grade >= PASS_MARK
}

pub fn format_grade(grade: f64) -> String {
    format!("{:.2}", grade)
}

/// Parses one cell of grade input. Empty clears the value.
pub fn parse_grade_input(raw: &str) -> Result<Option<f64>, GradeError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    let value: f64 = raw
        .parse()
        .map_err(|_| GradeError::NotANumber(raw.to_string()))?;
    if !value.is_finite() {
        return Err(GradeError::NotANumber(raw.to_string()));
    }
    if !(MIN_GRADE..=MAX_GRADE).contains(&value) {
        return Err(GradeError::OutOfRange(value));
    }
    Ok(Some(value))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradeField {
    Control,
    Exam,
}

impl GradeField {
    pub fn as_str(&self) -> &'static str {
        match self {
            GradeField::Control => "note_controle",
            GradeField::Exam => "note_examen",
        }
    }
}

impl fmt::Display for GradeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GradeField {
    type Err = GradeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "note_controle" | "controle" | "control" => Ok(GradeField::Control),
            "note_examen" | "examen" | "exam" => Ok(GradeField::Exam),
            other => Err(GradeError::UnknownField(other.to_string())),
        }
    }
}

// ---- wire shapes ----

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RosterModule {
    pub id: RecordId,
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RosterStudent {
    pub student_id: RecordId,
    pub student_name: String,
    #[serde(default)]
    pub cne: Option<String>,
    #[serde(default, with = "decimal")]
    pub note_controle: Option<f64>,
    #[serde(default, with = "decimal")]
    pub note_examen: Option<f64>,
}

/// Response of `notes/students_by_module/`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModuleRoster {
    pub module: RosterModule,
    #[serde(default)]
    pub students: Vec<RosterStudent>,
}

/// One row of the bulk update body; `None` goes out as `null` (ungraded).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeEntry {
    pub student_id: RecordId,
    pub note_controle: Option<f64>,
    pub note_examen: Option<f64>,
}

// ---- grade sheet ----

#[derive(Debug, Clone, PartialEq)]
pub struct GradeRow {
    pub student_id: RecordId,
    pub student_name: String,
    pub cne: Option<String>,
    pub note_controle: Option<f64>,
    pub note_examen: Option<f64>,
}

impl GradeRow {
    /// Weighted average, only once both parts are entered.
    pub fn average(&self) -> Option<f64> {
        Some(final_grade(self.note_controle?, self.note_examen?))
    }

    pub fn average_label(&self) -> String {
        self.average().map(format_grade).unwrap_or_else(|| "-".to_string())
    }

    pub fn is_passing(&self) -> Option<bool> {
        self.average().map(is_passing)
    }

    fn get(&self, field: GradeField) -> Option<f64> {
        match field {
            GradeField::Control => self.note_controle,
            GradeField::Exam => self.note_examen,
        }
    }

    fn slot(&mut self, field: GradeField) -> &mut Option<f64> {
        match field {
            GradeField::Control => &mut self.note_controle,
            GradeField::Exam => &mut self.note_examen,
        }
    }

    fn entry(&self) -> GradeEntry {
        GradeEntry {
            student_id: self.student_id,
            note_controle: self.note_controle,
            note_examen: self.note_examen,
        }
    }
}

impl From<RosterStudent> for GradeRow {
    fn from(s: RosterStudent) -> Self {
        Self {
            student_id: s.student_id,
            student_name: s.student_name,
            cne: s.cne,
            note_controle: s.note_controle,
            note_examen: s.note_examen,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusMessage {
    pub kind: StatusKind,
    pub text: String,
}

/// Editable grades of one module and academic year.
///
/// Edits stay local until [`GradeSheet::save`] sends the whole sheet in
/// one request. Rows survive a save either way.
#[derive(Debug)]
pub struct GradeSheet {
    module_id: RecordId,
    academic_year: String,
    module: Option<RosterModule>,
    rows: Remote<Vec<GradeRow>>,
    query: String,
    saving: bool,
    status: Option<StatusMessage>,
}

impl GradeSheet {
    pub fn new(module_id: RecordId, academic_year: impl Into<String>) -> Self {
        Self {
            module_id,
            academic_year: academic_year.into(),
            module: None,
            rows: Remote::Idle,
            query: String::new(),
            saving: false,
            status: None,
        }
    }

    pub fn module_id(&self) -> RecordId {
        self.module_id
    }

    pub fn academic_year(&self) -> &str {
        &self.academic_year
    }

    pub fn module(&self) -> Option<&RosterModule> {
        self.module.as_ref()
    }

    pub fn state(&self) -> &Remote<Vec<GradeRow>> {
        &self.rows
    }

    pub fn rows(&self) -> &[GradeRow] {
        self.rows.ready().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn status(&self) -> Option<&StatusMessage> {
        self.status.as_ref()
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    pub async fn load<B>(&mut self, backend: &B)
    where
        B: PortalBackend + ?Sized,
    {
        self.rows = Remote::Loading;
        match backend.students_by_module(self.module_id, &self.academic_year).await {
            Ok(roster) => {
                info!(
                    "📝 Grade sheet {} ({}) with {} students",
                    roster.module.name,
                    self.academic_year,
                    roster.students.len()
                );
                self.module = Some(roster.module);
                self.rows = Remote::Ready(roster.students.into_iter().map(GradeRow::from).collect());
            }
            Err(e) => {
                warn!("Failed to load grade sheet for module {}: {}", self.module_id, e);
                self.rows = Remote::Failed(LOAD_FAILED.to_string());
                self.status = Some(StatusMessage {
                    kind: StatusKind::Error,
                    text: LOAD_FAILED.to_string(),
                });
            }
        }
    }

    /// Switches year and reloads; pending edits for the old year are dropped.
    pub async fn set_academic_year<B>(&mut self, academic_year: &str, backend: &B)
    where
        B: PortalBackend + ?Sized,
    {
        if self.academic_year == academic_year && self.rows.ready().is_some() {
            return;
        }
        self.academic_year = academic_year.to_string();
        self.load(backend).await;
    }

    /// Applies one cell of input. Rejected input leaves the row unchanged.
    pub fn set_grade(&mut self, student_id: RecordId, field: GradeField, raw: &str) -> Result<(), GradeError> {
        let value = parse_grade_input(raw)?;
        let rows = match &mut self.rows {
            Remote::Ready(rows) => rows,
            _ => return Err(GradeError::NotLoaded),
        };
        let row = rows
            .iter_mut()
            .find(|r| r.student_id == student_id)
            .ok_or(GradeError::UnknownStudent(student_id))?;
        *row.slot(field) = value;
        Ok(())
    }

    pub fn grade(&self, student_id: RecordId, field: GradeField) -> Option<f64> {
        self.rows()
            .iter()
            .find(|r| r.student_id == student_id)
            .and_then(|r| r.get(field))
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    /// Rows whose student name or CNE contains the query.
    pub fn filtered(&self) -> Vec<&GradeRow> {
        self.rows()
            .iter()
            .filter(|r| matches_query(&[r.student_name.as_str(), r.cne.as_deref().unwrap_or("")], &self.query))
            .collect()
    }

    pub fn entries(&self) -> Vec<GradeEntry> {
        self.rows().iter().map(GradeRow::entry).collect()
    }

    /// Sends every row in one bulk request and invalidates cached grades.
    pub async fn save<B>(&mut self, backend: &B, cache: &QueryClient) -> Result<(), GradeError>
    where
        B: PortalBackend + ?Sized,
    {
        if self.saving {
            return Err(GradeError::SaveInFlight);
        }
        if self.rows.ready().is_none() {
            return Err(GradeError::NotLoaded);
        }

        self.saving = true;
        self.status = None;
        let entries = self.entries();
        let dispatcher = MutationDispatcher::new(backend, cache);
        let label = format!("Bulk grade update for module {}", self.module_id);
        let outcome = dispatcher
            .dispatch(
                &label,
                &["notes"],
                backend.bulk_update_grades(self.module_id, &self.academic_year, &entries),
            )
            .await;
        self.saving = false;

        match outcome {
            Ok(_) => {
                self.status = Some(StatusMessage {
                    kind: StatusKind::Success,
                    text: SAVE_OK.to_string(),
                });
                Ok(())
            }
            Err(message) => {
                self.status = Some(StatusMessage {
                    kind: StatusKind::Error,
                    text: SAVE_FAILED.to_string(),
                });
                Err(GradeError::Rejected(message))
            }
        }
    }
}

// ---- transcript ----

/// A student's own grades.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    grades: Vec<Grade>,
}

impl Transcript {
    pub fn new(grades: Vec<Grade>) -> Self {
        Self { grades }
    }

    pub fn grades(&self) -> &[Grade] {
        &self.grades
    }

    /// Mean of the final grades, counting a missing one as 0.
    pub fn average(&self) -> Option<f64> {
        if self.grades.is_empty() {
            return None;
        }
        let total: f64 = self.grades.iter().map(|g| g.note_finale.unwrap_or(0.0)).sum();
        Some(total / self.grades.len() as f64)
    }

    pub fn average_label(&self) -> String {
        format_grade(self.average().unwrap_or(0.0))
    }

    /// Modules validated with a final grade of at least the pass mark.
    pub fn passed_count(&self) -> usize {
        self.grades
            .iter()
            .filter(|g| g.note_finale.map(is_passing).unwrap_or(false))
            .count()
    }
}
