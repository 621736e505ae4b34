use crate::api::types::RefreshResponse;
use crate::auth::Credentials;
use crate::error::Result;
use crate::grades::{GradeEntry, ModuleRoster};
use crate::resource::{EnrollmentStatus, RecordId};
use async_trait::async_trait;
use serde_json::Value;

/// Generic record access. Paths are relative to the API root without
/// slashes, e.g. `departements` or `inscriptions/my_inscriptions`.
#[async_trait]
pub trait ResourceBackend: Send + Sync {
    /// Plain read of any endpoint.
    async fn get(&self, path: &str, params: &[(String, String)]) -> Result<Value>;

    /// Read a collection; both array and `{results}` payloads are accepted.
    async fn list(&self, path: &str, params: &[(String, String)]) -> Result<Vec<Value>>;

    async fn create(&self, endpoint: &str, data: &Value) -> Result<Value>;

    async fn update(&self, endpoint: &str, id: RecordId, data: &Value) -> Result<Value>;

    async fn delete(&self, endpoint: &str, id: RecordId) -> Result<()>;
}

/// Resource-specific calls that do not fit list/create/update/delete.
#[async_trait]
pub trait PortalBackend: ResourceBackend {
    async fn login(&self, email: &str, password: &str) -> Result<Credentials>;

    /// Exchange a refresh token for a new access token. Servers that rotate
    /// refresh tokens send the replacement along with it.
    async fn refresh_access(&self, refresh: &str) -> Result<RefreshResponse>;

    async fn validate_enrollment(
        &self,
        id: RecordId,
        status: EnrollmentStatus,
        rejection_reason: Option<&str>,
    ) -> Result<Value>;

    async fn students_by_module(&self, module_id: RecordId, academic_year: &str) -> Result<ModuleRoster>;

    async fn bulk_update_grades(
        &self,
        module_id: RecordId,
        academic_year: &str,
        grades: &[GradeEntry],
    ) -> Result<Value>;
}
