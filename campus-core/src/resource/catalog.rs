use super::{FieldKind, FieldSpec, Record, RecordId, ReferenceTarget, Resource};
use crate::api::types::decimal;
use crate::auth::Role;
use crate::grades::{self, format_grade};
use crate::screen::lookup::ForeignLookup;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

const DEPARTMENT_REF: ReferenceTarget = ReferenceTarget {
    endpoint: "departements",
    label_field: "name",
    filter: None,
};

const PROGRAM_REF: ReferenceTarget = ReferenceTarget {
    endpoint: "filieres",
    label_field: "name",
    filter: None,
};

const TEACHER_REF: ReferenceTarget = ReferenceTarget {
    endpoint: "users",
    label_field: "username",
    filter: Some(("role", "ENSEIGNANT")),
};

pub const SEMESTERS: &[&str] = &["S1", "S2", "S3", "S4", "S5", "S6"];

// ---- Departments ----

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Department {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl Record for Department {
    fn id(&self) -> Option<RecordId> {
        self.id
    }
}

pub struct Departments;

static DEPARTMENT_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("code", "Code", FieldKind::Text).required(),
    FieldSpec::new("name", "Name", FieldKind::Text).required(),
    FieldSpec::new("description", "Description", FieldKind::LongText),
];

impl Resource for Departments {
    type Record = Department;
    const ENDPOINT: &'static str = "departements";
    const SINGULAR: &'static str = "department";

    fn fields() -> &'static [FieldSpec] {
        DEPARTMENT_FIELDS
    }

    fn search_text(record: &Department) -> Vec<&str> {
        vec![record.name.as_str(), record.code.as_str()]
    }

    fn columns() -> &'static [&'static str] {
        &["ID", "Code", "Name", "Description"]
    }

    fn cells(record: &Department, _lookup: &ForeignLookup) -> Vec<String> {
        vec![
            id_cell(record.id),
            record.code.clone(),
            record.name.clone(),
            record
                .description
                .clone()
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| "No description".to_string()),
        ]
    }
}

// ---- Programs (filières) ----

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub departement: Option<RecordId>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Record for Program {
    fn id(&self) -> Option<RecordId> {
        self.id
    }
}

pub struct Programs;

static PROGRAM_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("code", "Code", FieldKind::Text).required(),
    FieldSpec::new("name", "Name", FieldKind::Text).required(),
    FieldSpec::new("departement", "Department", FieldKind::Reference(DEPARTMENT_REF)).required(),
    FieldSpec::new("description", "Description", FieldKind::LongText),
];

impl Resource for Programs {
    type Record = Program;
    const ENDPOINT: &'static str = "filieres";
    const SINGULAR: &'static str = "program";

    fn fields() -> &'static [FieldSpec] {
        PROGRAM_FIELDS
    }

    fn search_text(record: &Program) -> Vec<&str> {
        vec![record.name.as_str(), record.code.as_str()]
    }

    fn columns() -> &'static [&'static str] {
        &["ID", "Code", "Program", "Department"]
    }

    fn cells(record: &Program, lookup: &ForeignLookup) -> Vec<String> {
        vec![
            id_cell(record.id),
            record.code.clone(),
            record.name.clone(),
            lookup.label("departement", record.departement).to_string(),
        ]
    }
}

// ---- Modules ----

/// A module's program, sent as an id by the admin endpoints and as a name
/// by the teacher's own module list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProgramRef {
    Id(RecordId),
    Name(String),
}

impl ProgramRef {
    pub fn id(&self) -> Option<RecordId> {
        match self {
            ProgramRef::Id(id) => Some(*id),
            ProgramRef::Name(_) => None,
        }
    }
}

impl fmt::Display for ProgramRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgramRef::Id(id) => write!(f, "#{}", id),
            ProgramRef::Name(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub semestre: Option<String>,
    #[serde(default)]
    pub filiere: Option<ProgramRef>,
    #[serde(default)]
    pub enseignant: Option<RecordId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_count: Option<u32>,
}

impl Record for Module {
    fn id(&self) -> Option<RecordId> {
        self.id
    }
}

pub struct Modules;

static MODULE_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("code", "Code", FieldKind::Text).required(),
    FieldSpec::new("name", "Name", FieldKind::Text).required(),
    FieldSpec::new("semestre", "Semester", FieldKind::Choice(SEMESTERS)).required(),
    FieldSpec::new("filiere", "Program", FieldKind::Reference(PROGRAM_REF)).required(),
    FieldSpec::new("enseignant", "Teacher", FieldKind::Reference(TEACHER_REF)),
];

impl Resource for Modules {
    type Record = Module;
    const ENDPOINT: &'static str = "modules";
    const SINGULAR: &'static str = "module";

    fn fields() -> &'static [FieldSpec] {
        MODULE_FIELDS
    }

    fn search_text(record: &Module) -> Vec<&str> {
        vec![record.name.as_str(), record.code.as_str()]
    }

    fn columns() -> &'static [&'static str] {
        &["ID", "Code", "Module", "Semester", "Program", "Teacher"]
    }

    fn cells(record: &Module, lookup: &ForeignLookup) -> Vec<String> {
        let program = match &record.filiere {
            Some(ProgramRef::Id(id)) => lookup.label("filiere", Some(*id)).to_string(),
            Some(ProgramRef::Name(name)) => name.clone(),
            None => lookup.label("filiere", None).to_string(),
        };
        let teacher = match record.enseignant {
            Some(id) => lookup.label("enseignant", Some(id)).to_string(),
            None => "Unassigned".to_string(),
        };
        vec![
            id_cell(record.id),
            record.code.clone(),
            record.name.clone(),
            record.semestre.clone().unwrap_or_default(),
            program,
            teacher,
        ]
    }
}

// ---- Enrollments (inscriptions) ----

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnrollmentStatus {
    Pending,
    Validated,
    Rejected,
}

impl EnrollmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrollmentStatus::Pending => "PENDING",
            EnrollmentStatus::Validated => "VALIDATED",
            EnrollmentStatus::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramSummary {
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enrollment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    #[serde(default)]
    pub student: Option<RecordId>,
    #[serde(default)]
    pub student_name: Option<String>,
    pub filiere: RecordId,
    #[serde(default)]
    pub filiere_name: Option<String>,
    #[serde(default)]
    pub filiere_details: Option<ProgramSummary>,
    pub academic_year: String,
    #[serde(default = "pending")]
    pub status: EnrollmentStatus,
    #[serde(default)]
    pub rejection_reason: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

fn pending() -> EnrollmentStatus {
    EnrollmentStatus::Pending
}

impl Enrollment {
    pub fn student_label(&self) -> String {
        match (&self.student_name, self.student) {
            (Some(name), _) if !name.is_empty() => name.clone(),
            (_, Some(id)) => format!("Student #{}", id),
            _ => "Unknown".to_string(),
        }
    }

    pub fn program_label(&self) -> String {
        self.filiere_name
            .clone()
            .filter(|n| !n.is_empty())
            .or_else(|| self.filiere_details.as_ref().map(|d| d.name.clone()))
            .unwrap_or_else(|| format!("Program #{}", self.filiere))
    }

    pub fn is_pending(&self) -> bool {
        self.status == EnrollmentStatus::Pending
    }
}

impl Record for Enrollment {
    fn id(&self) -> Option<RecordId> {
        self.id
    }
}

pub struct Enrollments;

static ENROLLMENT_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("filiere", "Program", FieldKind::Reference(PROGRAM_REF)).required(),
    FieldSpec::new("academic_year", "Academic year", FieldKind::Text).required(),
];

impl Resource for Enrollments {
    type Record = Enrollment;
    const ENDPOINT: &'static str = "inscriptions";
    const SINGULAR: &'static str = "enrollment";

    fn fields() -> &'static [FieldSpec] {
        ENROLLMENT_FIELDS
    }

    fn search_text(record: &Enrollment) -> Vec<&str> {
        let program = record
            .filiere_name
            .as_deref()
            .or(record.filiere_details.as_ref().map(|d| d.name.as_str()))
            .unwrap_or("");
        vec![record.student_name.as_deref().unwrap_or(""), program]
    }

    fn columns() -> &'static [&'static str] {
        &["ID", "Student", "Program", "Year", "Date", "Status"]
    }

    fn cells(record: &Enrollment, _lookup: &ForeignLookup) -> Vec<String> {
        let mut status = record.status.to_string();
        if let (EnrollmentStatus::Rejected, Some(reason)) = (record.status, &record.rejection_reason) {
            status = format!("{} ({})", status, reason);
        }
        vec![
            id_cell(record.id),
            record.student_label(),
            record.program_label(),
            record.academic_year.clone(),
            record
                .created_at
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            status,
        ]
    }
}

// ---- Users ----

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    pub role: Role,
    #[serde(default = "active")]
    pub is_active: bool,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

fn active() -> bool {
    true
}

impl Record for User {
    fn id(&self) -> Option<RecordId> {
        self.id
    }
}

pub struct Users;

impl Resource for Users {
    type Record = User;
    const ENDPOINT: &'static str = "users";
    const SINGULAR: &'static str = "user";
    const WRITABLE: bool = false;

    fn fields() -> &'static [FieldSpec] {
        &[]
    }

    fn search_text(record: &User) -> Vec<&str> {
        vec![record.username.as_str(), record.email.as_deref().unwrap_or("")]
    }

    fn columns() -> &'static [&'static str] {
        &["ID", "Username", "Email", "Role", "Status"]
    }

    fn cells(record: &User, _lookup: &ForeignLookup) -> Vec<String> {
        vec![
            id_cell(record.id),
            record.username.clone(),
            record.email.clone().unwrap_or_else(|| "N/A".to_string()),
            record.role.to_string(),
            if record.is_active { "Active" } else { "Inactive" }.to_string(),
        ]
    }
}

// ---- Grades (notes) ----

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleSummary {
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grade {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    #[serde(default)]
    pub module: Option<RecordId>,
    #[serde(default)]
    pub module_details: Option<ModuleSummary>,
    #[serde(default)]
    pub academic_year: Option<String>,
    #[serde(default, with = "decimal")]
    pub note_controle: Option<f64>,
    #[serde(default, with = "decimal")]
    pub note_examen: Option<f64>,
    #[serde(default, with = "decimal")]
    pub note_finale: Option<f64>,
}

impl Grade {
    /// Server-computed final grade, else the weighted average when both parts exist.
    pub fn final_grade(&self) -> Option<f64> {
        self.note_finale.or_else(|| match (self.note_controle, self.note_examen) {
            (Some(c), Some(e)) => Some(grades::final_grade(c, e)),
            _ => None,
        })
    }

    pub fn module_name(&self) -> &str {
        self.module_details.as_ref().map(|m| m.name.as_str()).unwrap_or("")
    }

    pub fn module_code(&self) -> &str {
        self.module_details
            .as_ref()
            .and_then(|m| m.code.as_deref())
            .unwrap_or("")
    }
}

impl Record for Grade {
    fn id(&self) -> Option<RecordId> {
        self.id
    }
}

pub struct Grades;

impl Resource for Grades {
    type Record = Grade;
    const ENDPOINT: &'static str = "notes";
    const SINGULAR: &'static str = "grade";
    const WRITABLE: bool = false;

    fn fields() -> &'static [FieldSpec] {
        &[]
    }

    fn search_text(record: &Grade) -> Vec<&str> {
        vec![record.module_name(), record.module_code()]
    }

    fn columns() -> &'static [&'static str] {
        &["Module", "Code", "Year", "Control", "Exam", "Final"]
    }

    fn cells(record: &Grade, _lookup: &ForeignLookup) -> Vec<String> {
        let part = |g: Option<f64>| g.map(|v| v.to_string()).unwrap_or_else(|| "--".to_string());
        vec![
            record.module_name().to_string(),
            record.module_code().to_string(),
            record.academic_year.clone().unwrap_or_default(),
            part(record.note_controle),
            part(record.note_examen),
            record.final_grade().map(format_grade).unwrap_or_else(|| "-".to_string()),
        ]
    }
}

fn id_cell(id: Option<RecordId>) -> String {
    id.map(|i| i.to_string()).unwrap_or_default()
}
