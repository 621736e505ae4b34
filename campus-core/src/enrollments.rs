//! Enrollment workflows: the admin validation desk, the student's own
//! enrollments and the application form.

use crate::api::PortalBackend;
use crate::error::{ApiError, FormError};
use crate::grades::{StatusKind, StatusMessage};
use crate::query::QueryClient;
use crate::resource::{Enrollment, EnrollmentStatus, Enrollments, FieldValue, RecordId, Resource};
use crate::screen::list::load_lookup;
use crate::screen::{
    Confirm, ForeignLookup, MutationDispatcher, ResourceForm, ResourceListScreen, SelectOption, SubmitRequest,
};
use serde_json::Value;

pub const MY_ENROLLMENTS_PATH: &str = "inscriptions/my_inscriptions";

pub const SELECT_PROGRAM: &str = "Please select a program.";
pub const APPLICATION_SENT: &str = "Your application has been submitted successfully!";
pub const APPLICATION_FAILED: &str = "Submission failed. Check that you have not already applied.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Validate,
    Reject { reason: Option<String> },
}

impl Decision {
    pub fn status(&self) -> EnrollmentStatus {
        match self {
            Decision::Validate => EnrollmentStatus::Validated,
            Decision::Reject { .. } => EnrollmentStatus::Rejected,
        }
    }

    pub fn verb(&self) -> &'static str {
        match self {
            Decision::Validate => "Validate",
            Decision::Reject { .. } => "Reject",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecisionOutcome {
    Cancelled,
    Done,
    Failed(String),
}

/// Admin view over every enrollment, focused on the pending ones.
pub struct EnrollmentDesk {
    screen: ResourceListScreen<Enrollments>,
}

impl Default for EnrollmentDesk {
    fn default() -> Self {
        Self::new()
    }
}

impl EnrollmentDesk {
    pub fn new() -> Self {
        Self {
            screen: ResourceListScreen::new(),
        }
    }

    pub fn screen(&self) -> &ResourceListScreen<Enrollments> {
        &self.screen
    }

    pub fn screen_mut(&mut self) -> &mut ResourceListScreen<Enrollments> {
        &mut self.screen
    }

    pub async fn load<B>(&mut self, backend: &B, cache: &QueryClient)
    where
        B: PortalBackend + ?Sized,
    {
        self.screen.load(backend, cache).await;
    }

    pub fn pending(&self) -> Vec<&Enrollment> {
        self.screen
            .records()
            .map(|records| records.iter().filter(|e| e.is_pending()).collect())
            .unwrap_or_default()
    }

    pub fn pending_count(&self) -> usize {
        self.pending().len()
    }

    /// Confirms, posts the decision, then re-fetches on success.
    pub async fn decide<B>(
        &mut self,
        id: RecordId,
        decision: Decision,
        confirm: &dyn Confirm,
        backend: &B,
        cache: &QueryClient,
    ) -> DecisionOutcome
    where
        B: PortalBackend + ?Sized,
    {
        let prompt = format!("{} this enrollment?", decision.verb());
        if !confirm.confirm(&prompt) {
            return DecisionOutcome::Cancelled;
        }

        let reason = match &decision {
            Decision::Reject { reason } => reason.as_deref(),
            Decision::Validate => None,
        };
        let dispatcher = MutationDispatcher::new(backend, cache);
        let label = format!("{} enrollment {}", decision.status(), id);
        let outcome = dispatcher
            .dispatch(
                &label,
                &[Enrollments::ENDPOINT],
                backend.validate_enrollment(id, decision.status(), reason),
            )
            .await;

        match outcome {
            Ok(_) => {
                self.screen.load(backend, cache).await;
                DecisionOutcome::Done
            }
            Err(message) => DecisionOutcome::Failed(message),
        }
    }
}

/// The logged-in student's own enrollments.
pub fn my_enrollments() -> ResourceListScreen<Enrollments> {
    ResourceListScreen::from_path(MY_ENROLLMENTS_PATH)
}

/// Student application (candidature) for one program and year.
pub struct ApplicationForm {
    form: ResourceForm<Enrollments>,
    status: Option<StatusMessage>,
}

impl ApplicationForm {
    pub fn new(programs: &ForeignLookup, academic_year: &str) -> Result<Self, FormError> {
        let mut form = ResourceForm::create(programs);
        form.set_value("academic_year", FieldValue::Text(academic_year.to_string()))?;
        Ok(Self { form, status: None })
    }

    /// Fetches the program list, then opens a blank application.
    pub async fn open<B>(backend: &B, cache: &QueryClient, academic_year: &str) -> Result<Self, FormError>
    where
        B: PortalBackend + ?Sized,
    {
        let programs = load_lookup::<Enrollments, B>(backend, cache).await;
        Self::new(&programs, academic_year)
    }

    pub fn programs(&self) -> &[SelectOption] {
        self.form.options("filiere")
    }

    pub fn form(&self) -> &ResourceForm<Enrollments> {
        &self.form
    }

    pub fn status(&self) -> Option<&StatusMessage> {
        self.status.as_ref()
    }

    pub fn select_program(&mut self, program_id: RecordId) -> Result<(), FormError> {
        self.form.set_value("filiere", FieldValue::Reference(program_id))
    }

    pub fn set_academic_year(&mut self, academic_year: &str) -> Result<(), FormError> {
        self.form.set_input("academic_year", academic_year)
    }

    pub async fn submit<B>(&mut self, backend: &B, cache: &QueryClient) -> Result<Value, String>
    where
        B: PortalBackend + ?Sized,
    {
        if self.form.draft().get("filiere").map_or(true, FieldValue::is_empty) {
            return Err(self.fail(SELECT_PROGRAM.to_string()));
        }
        let data = match self.form.begin_submit() {
            Ok(SubmitRequest::Create { data }) | Ok(SubmitRequest::Update { data, .. }) => data,
            Err(e) => return Err(self.fail(e.to_string())),
        };

        let dispatcher = MutationDispatcher::new(backend, cache);
        let outcome = dispatcher
            .run(
                "Submit application",
                &[Enrollments::ENDPOINT],
                backend.create(Enrollments::ENDPOINT, &data),
            )
            .await
            .map_err(|e| application_error(&e));

        match self.form.finish_submit(outcome) {
            Ok(saved) => {
                self.status = Some(StatusMessage {
                    kind: StatusKind::Success,
                    text: APPLICATION_SENT.to_string(),
                });
                Ok(saved)
            }
            Err(e) => Err(self.fail(e.to_string())),
        }
    }

    fn fail(&mut self, message: String) -> String {
        self.status = Some(StatusMessage {
            kind: StatusKind::Error,
            text: message.clone(),
        });
        message
    }
}

/// `non_field_errors`, then `filiere`, else a hint that the student may
/// have applied already.
pub fn application_error(error: &ApiError) -> String {
    match error.field() {
        Some("non_field_errors") | Some("filiere") => error.user_message(),
        _ => APPLICATION_FAILED.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn application_errors_prefer_specific_fields() {
        let dup = ApiError::from_response(400, r#"{"non_field_errors": ["Already applied for this year."]}"#);
        assert_eq!(application_error(&dup), "Already applied for this year.");

        let program = ApiError::from_response(400, r#"{"filiere": ["Invalid pk \"99\"."]}"#);
        assert_eq!(application_error(&program), "Invalid pk \"99\".");

        let other = ApiError::from_response(400, r#"{"academic_year": ["Bad year."]}"#);
        assert_eq!(application_error(&other), APPLICATION_FAILED);

        let detail = ApiError::from_response(500, r#"{"detail": "boom"}"#);
        assert_eq!(application_error(&detail), APPLICATION_FAILED);
    }

    #[test]
    fn new_application_defaults_the_year() {
        let form = ApplicationForm::new(&ForeignLookup::default(), "2024-2025").unwrap();
        assert_eq!(
            form.form().draft().get("academic_year"),
            Some(&FieldValue::Text("2024-2025".into()))
        );
        assert_eq!(form.form().draft().get("filiere"), Some(&FieldValue::Empty));
        assert!(form.programs().is_empty());
    }

    #[test]
    fn decisions_map_to_statuses() {
        assert_eq!(Decision::Validate.status(), EnrollmentStatus::Validated);
        assert_eq!(Decision::Reject { reason: None }.status(), EnrollmentStatus::Rejected);
    }
}
