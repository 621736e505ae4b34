use super::lookup::{ForeignLookup, SelectOption};
use super::mutation::MutationDispatcher;
use crate::api::ResourceBackend;
use crate::error::FormError;
use crate::resource::{parse_number, Draft, FieldKind, FieldValue, Record, RecordId, Resource};
use serde_json::Value;
use std::marker::PhantomData;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit(RecordId),
}

/// What a submit sends, decided by whether the edited record has an id.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitRequest {
    Create { data: Value },
    Update { id: RecordId, data: Value },
}

/// Local draft of one record plus the submit lifecycle around it.
///
/// The draft is never visible to the owning list; it is thrown away on
/// cancel and on a successful submit, and kept intact when the server
/// rejects it.
pub struct ResourceForm<R: Resource> {
    mode: FormMode,
    draft: Draft,
    options: ForeignLookup,
    submitting: bool,
    open: bool,
    error: Option<String>,
    _resource: PhantomData<R>,
}

impl<R: Resource> ResourceForm<R> {
    pub fn create(lookup: &ForeignLookup) -> Self {
        Self::with_draft(FormMode::Create, Draft::defaults(R::fields()), lookup)
    }

    pub fn edit(record: &R::Record, lookup: &ForeignLookup) -> Self {
        let mode = match record.id() {
            Some(id) => FormMode::Edit(id),
            None => FormMode::Create,
        };
        Self::with_draft(mode, Draft::from_record(R::fields(), record), lookup)
    }

    fn with_draft(mode: FormMode, draft: Draft, lookup: &ForeignLookup) -> Self {
        Self {
            mode,
            draft,
            options: lookup.clone(),
            submitting: false,
            open: true,
            error: None,
            _resource: PhantomData,
        }
    }

    pub fn mode(&self) -> FormMode {
        self.mode
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn title(&self) -> String {
        match self.mode {
            FormMode::Create => format!("New {}", R::SINGULAR),
            FormMode::Edit(id) => format!("Edit {} #{}", R::SINGULAR, id),
        }
    }

    /// Select options for a reference field; empty while the sibling
    /// collection is loading or failed.
    pub fn options(&self, field: &str) -> &[SelectOption] {
        self.options.options(field)
    }

    pub fn is_field_disabled(&self, field: &str) -> bool {
        if self.submitting {
            return true;
        }
        match self.draft.spec(field).map(|s| s.kind) {
            Some(FieldKind::Reference(_)) => self.options(field).is_empty(),
            _ => false,
        }
    }

    /// Applies raw user input to exactly one draft key.
    pub fn set_input(&mut self, field: &str, raw: &str) -> Result<(), FormError> {
        let spec = self
            .draft
            .spec(field)
            .ok_or_else(|| FormError::UnknownField(field.to_string()))?;

        let value = match spec.kind {
            FieldKind::Text | FieldKind::LongText => FieldValue::Text(raw.to_string()),
            FieldKind::Number => parse_number(raw),
            FieldKind::Choice(options) => {
                let raw = raw.trim();
                if raw.is_empty() {
                    FieldValue::Empty
                } else if options.contains(&raw) {
                    FieldValue::Choice(raw.to_string())
                } else {
                    return Err(FormError::InvalidChoice {
                        field: field.to_string(),
                        value: raw.to_string(),
                    });
                }
            }
            FieldKind::Reference(_) => raw
                .trim()
                .parse::<RecordId>()
                .map(FieldValue::Reference)
                .unwrap_or(FieldValue::Empty),
        };
        self.set_value(field, value)
    }

    pub fn set_value(&mut self, field: &str, value: FieldValue) -> Result<(), FormError> {
        debug!("Draft {}.{} = {:?}", R::SINGULAR, field, value);
        self.draft.set(field, value)
    }

    /// Non-empty check on required fields.
    pub fn validate(&self) -> Result<(), FormError> {
        let missing = self.draft.missing_required();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(FormError::MissingRequired(missing))
        }
    }

    /// Starts a submission. Refused while one is already in flight.
    pub fn begin_submit(&mut self) -> Result<SubmitRequest, FormError> {
        if self.submitting {
            return Err(FormError::SubmissionInFlight);
        }
        if !self.open {
            return Err(FormError::NotOpen);
        }
        if let Err(e) = self.validate() {
            self.error = Some(e.to_string());
            return Err(e);
        }

        self.submitting = true;
        self.error = None;
        let data = self.draft.to_json();
        Ok(match self.mode {
            FormMode::Create => SubmitRequest::Create { data },
            FormMode::Edit(id) => SubmitRequest::Update { id, data },
        })
    }

    /// Settles a submission started with [`Self::begin_submit`].
    pub fn finish_submit(&mut self, outcome: Result<Value, String>) -> Result<Value, FormError> {
        self.submitting = false;
        match outcome {
            Ok(saved) => {
                self.open = false;
                self.draft = Draft::defaults(R::fields());
                Ok(saved)
            }
            Err(message) => {
                self.error = Some(message.clone());
                Err(FormError::Rejected(message))
            }
        }
    }

    pub async fn submit<B>(&mut self, dispatcher: &MutationDispatcher<'_, B>) -> Result<Value, FormError>
    where
        B: ResourceBackend + ?Sized,
    {
        let outcome = match self.begin_submit()? {
            SubmitRequest::Create { data } => dispatcher.create(R::ENDPOINT, &data).await,
            SubmitRequest::Update { id, data } => dispatcher.update(R::ENDPOINT, id, &data).await,
        };
        self.finish_submit(outcome)
    }

    /// Closes the form and discards the draft.
    pub fn cancel(&mut self) {
        self.open = false;
        self.draft = Draft::defaults(R::fields());
        self.error = None;
    }
}
