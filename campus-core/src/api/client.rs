use super::backend::{PortalBackend, ResourceBackend};
use super::types::{
    normalize_collection, BulkGradeRequest, LoginRequest, RefreshRequest, RefreshResponse,
    ValidateEnrollmentRequest,
};
use crate::auth::Credentials;
use crate::config::ApiConfig;
use crate::error::{ApiError, Result};
use crate::grades::{GradeEntry, ModuleRoster};
use crate::logging::ApiCallLog;
use crate::resource::{EnrollmentStatus, RecordId};
use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

/// REST client for the campus backend.
#[derive(Debug, Clone)]
pub struct CampusHttpClient {
    client: Client,
    base_url: String,
    access_token: Option<String>,
}

impl CampusHttpClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: None,
        }
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            client: builder.build()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            access_token: None,
        })
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn set_access_token(&mut self, token: Option<String>) {
        self.access_token = token;
    }

    pub fn has_access_token(&self) -> bool {
        self.access_token.is_some()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Django routes end with a slash.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}/", self.base_url, path.trim_matches('/'))
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        params: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<Value> {
        let url = self.url(path);
        let log = ApiCallLog::start(method.as_str(), path, params);

        let mut request = self.client.request(method, &url);
        if !params.is_empty() {
            request = request.query(params);
        }
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                log.finish(None);
                return Err(ApiError::Network(e));
            }
        };

        let status = response.status();
        log.finish(Some(status.as_u16()));
        let text = response.text().await?;

        if !status.is_success() {
            return Err(ApiError::from_response(status.as_u16(), &text));
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    async fn post_typed<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T> {
        let value = self.execute(Method::POST, path, &[], Some(body)).await?;
        Ok(serde_json::from_value(value)?)
    }
}

#[async_trait]
impl ResourceBackend for CampusHttpClient {
    async fn get(&self, path: &str, params: &[(String, String)]) -> Result<Value> {
        self.execute(Method::GET, path, params, None).await
    }

    async fn list(&self, path: &str, params: &[(String, String)]) -> Result<Vec<Value>> {
        let value = self.execute(Method::GET, path, params, None).await?;
        normalize_collection(value)
    }

    async fn create(&self, endpoint: &str, data: &Value) -> Result<Value> {
        self.execute(Method::POST, endpoint, &[], Some(data)).await
    }

    async fn update(&self, endpoint: &str, id: RecordId, data: &Value) -> Result<Value> {
        let path = format!("{}/{}", endpoint, id);
        self.execute(Method::PUT, &path, &[], Some(data)).await
    }

    async fn delete(&self, endpoint: &str, id: RecordId) -> Result<()> {
        let path = format!("{}/{}", endpoint, id);
        self.execute(Method::DELETE, &path, &[], None).await?;
        Ok(())
    }
}

#[async_trait]
impl PortalBackend for CampusHttpClient {
    async fn login(&self, email: &str, password: &str) -> Result<Credentials> {
        let body = serde_json::to_value(LoginRequest { email, password })?;
        self.post_typed("login", &body).await
    }

    async fn refresh_access(&self, refresh: &str) -> Result<RefreshResponse> {
        let body = serde_json::to_value(RefreshRequest { refresh })?;
        self.post_typed("token/refresh", &body).await
    }

    async fn validate_enrollment(
        &self,
        id: RecordId,
        status: EnrollmentStatus,
        rejection_reason: Option<&str>,
    ) -> Result<Value> {
        let body = serde_json::to_value(ValidateEnrollmentRequest {
            status,
            rejection_reason,
        })?;
        let path = format!("inscriptions/{}/validate", id);
        self.execute(Method::POST, &path, &[], Some(&body)).await
    }

    async fn students_by_module(&self, module_id: RecordId, academic_year: &str) -> Result<ModuleRoster> {
        let params = vec![
            ("module_id".to_string(), module_id.to_string()),
            ("academic_year".to_string(), academic_year.to_string()),
        ];
        let value = self
            .execute(Method::GET, "notes/students_by_module", &params, None)
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn bulk_update_grades(
        &self,
        module_id: RecordId,
        academic_year: &str,
        grades: &[GradeEntry],
    ) -> Result<Value> {
        let body = serde_json::to_value(BulkGradeRequest {
            module_id,
            academic_year,
            grades,
        })?;
        self.execute(Method::POST, "notes/bulk_update", &[], Some(&body)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_get_a_trailing_slash() {
        let client = CampusHttpClient::new("http://localhost:8000/api/");
        assert_eq!(client.url("departements"), "http://localhost:8000/api/departements/");
        assert_eq!(client.url("/modules/3"), "http://localhost:8000/api/modules/3/");
        assert!(!client.has_access_token());
    }
}
