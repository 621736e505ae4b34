use super::form::ResourceForm;
use super::lookup::{ForeignLookup, SelectOption};
use super::mutation::MutationDispatcher;
use super::{matches_query, Confirm, Remote};
use crate::api::ResourceBackend;
use crate::error::{ApiError, FormError};
use crate::query::{QueryClient, QueryKey};
use crate::resource::{Record, RecordId, Resource};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

/// What a front-end should draw for the list right now.
#[derive(Debug, PartialEq)]
pub enum ListView<'a, T> {
    Loading,
    Failed(&'a str),
    /// Loaded, but nothing passes the current filter.
    NoMatches,
    Rows(Vec<&'a T>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Cancelled,
    Deleted,
    Failed(String),
}

/// Generic list screen: one collection, a client-side filter, sibling
/// collections for foreign labels, and at most one open form.
pub struct ResourceListScreen<R: Resource> {
    source: QueryKey,
    records: Remote<Vec<R::Record>>,
    lookup: ForeignLookup,
    query: String,
    form: Option<ResourceForm<R>>,
    mutation_error: Option<String>,
}

impl<R: Resource> Default for ResourceListScreen<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Resource> ResourceListScreen<R> {
    pub fn new() -> Self {
        Self::with_source(QueryKey::collection(R::ENDPOINT))
    }

    /// Same collection, narrowed server-side (`?role=ENSEIGNANT`).
    pub fn filtered_by(key: &str, value: &str) -> Self {
        Self::with_source(QueryKey::collection(R::ENDPOINT).with_param(key, value))
    }

    /// Reads from a custom path (`inscriptions/my_inscriptions`) that is
    /// still invalidated with the resource.
    pub fn from_path(path: &str) -> Self {
        Self::with_source(QueryKey::under(R::ENDPOINT, path))
    }

    fn with_source(source: QueryKey) -> Self {
        Self {
            source,
            records: Remote::Idle,
            lookup: ForeignLookup::default(),
            query: String::new(),
            form: None,
            mutation_error: None,
        }
    }

    pub fn source(&self) -> &QueryKey {
        &self.source
    }

    /// Fetches the collection, then the sibling collections.
    pub async fn load<B>(&mut self, backend: &B, cache: &QueryClient)
    where
        B: ResourceBackend + ?Sized,
    {
        self.records = Remote::Loading;
        self.records = match fetch_collection(backend, cache, &self.source).await {
            Ok(data) => match Vec::<R::Record>::deserialize(&data) {
                Ok(records) => {
                    info!("📋 Loaded {} {} records", records.len(), R::SINGULAR);
                    Remote::Ready(records)
                }
                Err(e) => Remote::Failed(ApiError::from(e).user_message()),
            },
            Err(e) => {
                warn!("Failed to load {}: {}", self.source, e);
                Remote::Failed(e.user_message())
            }
        };

        self.lookup = load_lookup::<R, B>(backend, cache).await;
    }

    pub fn records(&self) -> Option<&[R::Record]> {
        self.records.ready().map(Vec::as_slice)
    }

    pub fn state(&self) -> &Remote<Vec<R::Record>> {
        &self.records
    }

    pub fn lookup(&self) -> &ForeignLookup {
        &self.lookup
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Records passing the current query. Never touches the source.
    pub fn filtered(&self) -> Vec<&R::Record> {
        match self.records.ready() {
            Some(records) => records
                .iter()
                .filter(|r| matches_query(&R::search_text(r), &self.query))
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn view(&self) -> ListView<'_, R::Record> {
        match &self.records {
            Remote::Idle | Remote::Loading => ListView::Loading,
            Remote::Failed(message) => ListView::Failed(message),
            Remote::Ready(_) => {
                let rows = self.filtered();
                if rows.is_empty() {
                    ListView::NoMatches
                } else {
                    ListView::Rows(rows)
                }
            }
        }
    }

    pub fn columns(&self) -> &'static [&'static str] {
        R::columns()
    }

    pub fn row_cells(&self, record: &R::Record) -> Vec<String> {
        R::cells(record, &self.lookup)
    }

    pub fn find(&self, id: RecordId) -> Option<&R::Record> {
        self.records()?.iter().find(|r| r.id() == Some(id))
    }

    pub fn open_create(&mut self) -> Result<&mut ResourceForm<R>, FormError> {
        if !R::WRITABLE {
            return Err(FormError::ReadOnly(R::SINGULAR));
        }
        Ok(self.form.insert(ResourceForm::create(&self.lookup)))
    }

    /// Opens the form on the last fetched copy of the record.
    pub fn open_edit(&mut self, id: RecordId) -> Result<&mut ResourceForm<R>, FormError> {
        if !R::WRITABLE {
            return Err(FormError::ReadOnly(R::SINGULAR));
        }
        let form = match self.find(id) {
            Some(record) => ResourceForm::edit(record, &self.lookup),
            None => return Err(FormError::NotFound(id)),
        };
        Ok(self.form.insert(form))
    }

    pub fn form(&self) -> Option<&ResourceForm<R>> {
        self.form.as_ref()
    }

    pub fn form_mut(&mut self) -> Option<&mut ResourceForm<R>> {
        self.form.as_mut()
    }

    pub fn cancel_form(&mut self) {
        if let Some(mut form) = self.form.take() {
            form.cancel();
        }
    }

    /// Submits the open form. On success the form closes and the list is
    /// re-fetched; on failure the form stays open with its draft.
    pub async fn submit_form<B>(&mut self, backend: &B, cache: &QueryClient) -> Result<Value, FormError>
    where
        B: ResourceBackend + ?Sized,
    {
        let form = self.form.as_mut().ok_or(FormError::NotOpen)?;
        let dispatcher = MutationDispatcher::new(backend, cache);
        let saved = form.submit(&dispatcher).await?;
        self.form = None;
        self.load(backend, cache).await;
        Ok(saved)
    }

    /// Deletes after an explicit confirmation. A failure leaves the list as
    /// it was and records the message.
    pub async fn delete<B>(
        &mut self,
        id: RecordId,
        confirm: &dyn Confirm,
        backend: &B,
        cache: &QueryClient,
    ) -> DeleteOutcome
    where
        B: ResourceBackend + ?Sized,
    {
        if !R::WRITABLE {
            return DeleteOutcome::Failed(FormError::ReadOnly(R::SINGULAR).to_string());
        }
        if !confirm.confirm(&format!("Delete this {}?", R::SINGULAR)) {
            return DeleteOutcome::Cancelled;
        }

        let dispatcher = MutationDispatcher::new(backend, cache);
        match dispatcher.delete(R::ENDPOINT, id).await {
            Ok(()) => {
                self.mutation_error = None;
                self.load(backend, cache).await;
                DeleteOutcome::Deleted
            }
            Err(message) => {
                self.mutation_error = Some(message.clone());
                DeleteOutcome::Failed(message)
            }
        }
    }

    /// Last failed delete, shown inline next to the table.
    pub fn mutation_error(&self) -> Option<&str> {
        self.mutation_error.as_deref()
    }
}

/// Fetches every sibling collection `R` references. A failed sibling is
/// left out, so its labels stay at the placeholder.
pub async fn load_lookup<R, B>(backend: &B, cache: &QueryClient) -> ForeignLookup
where
    R: Resource,
    B: ResourceBackend + ?Sized,
{
    let mut lookup = ForeignLookup::default();
    for (field, target) in R::references() {
        match fetch_collection(backend, cache, &target.query_key()).await {
            Ok(Value::Array(items)) => {
                let options: Vec<SelectOption> = items.iter().filter_map(|v| target.option_from(v)).collect();
                lookup.insert(field, options);
            }
            Ok(_) => {}
            Err(e) => warn!("Lookup {} for {} unavailable: {}", target.endpoint, field, e),
        }
    }
    lookup
}

/// Reads a collection through the cache as a JSON array.
pub(crate) async fn fetch_collection<B>(
    backend: &B,
    cache: &QueryClient,
    key: &QueryKey,
) -> crate::error::Result<Value>
where
    B: ResourceBackend + ?Sized,
{
    let data = cache
        .fetch(key, || {
            let (path, params) = (key.path(), key.params());
            async move { backend.list(path, params).await.map(Value::Array) }
        })
        .await?;
    Ok(data.as_ref().clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{Department, Departments, Users};

    fn ready(records: Vec<Department>) -> ResourceListScreen<Departments> {
        let mut screen = ResourceListScreen::<Departments>::new();
        screen.records = Remote::Ready(records);
        screen
    }

    fn dept(id: i64, code: &str, name: &str) -> Department {
        Department {
            id: Some(id),
            code: code.into(),
            name: name.into(),
            description: None,
        }
    }

    #[test]
    fn filter_checks_name_and_code_case_insensitively() {
        let mut screen = ready(vec![
            dept(1, "INF", "Informatique"),
            dept(2, "MATH", "Mathématiques"),
            dept(3, "PHY", "Physique"),
        ]);
        screen.set_query("ma");
        let names: Vec<_> = screen.filtered().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Informatique", "Mathématiques"]);
        // source untouched
        assert_eq!(screen.records().map(<[_]>::len), Some(3));

        screen.set_query("zzz");
        assert_eq!(screen.view(), ListView::NoMatches);
        screen.set_query("");
        assert!(matches!(screen.view(), ListView::Rows(rows) if rows.len() == 3));
    }

    #[test]
    fn views_follow_load_state() {
        let mut screen = ResourceListScreen::<Departments>::new();
        assert_eq!(screen.view(), ListView::Loading);
        screen.records = Remote::Failed("Permission denied.".into());
        assert_eq!(screen.view(), ListView::Failed("Permission denied."));
        screen.records = Remote::Ready(Vec::new());
        assert_eq!(screen.view(), ListView::NoMatches);
    }

    #[test]
    fn edit_requires_a_loaded_record() {
        let mut screen = ready(vec![dept(1, "INF", "Informatique")]);
        assert!(screen.open_edit(1).is_ok());
        screen.cancel_form();
        assert!(screen.form().is_none());
        assert!(matches!(screen.open_edit(42), Err(FormError::NotFound(42))));
    }

    #[test]
    fn read_only_resources_have_no_form() {
        let mut screen = ResourceListScreen::<Users>::filtered_by("role", "ENSEIGNANT");
        assert!(matches!(screen.open_create(), Err(FormError::ReadOnly("user"))));
        assert_eq!(screen.source().to_string(), "users?role=ENSEIGNANT");
    }
}
