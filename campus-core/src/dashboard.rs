//! Per-role overview screens and the direction reports.

use crate::api::ResourceBackend;
use crate::error::Result;
use crate::grades::Transcript;
use crate::query::{QueryClient, QueryKey};
use crate::resource::{Enrollment, Grade, Module, ProgramRef};
use crate::screen::list::fetch_collection;
use crate::screen::matches_query;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use tracing::info;

pub const STATS_PATH: &str = "admin/dashboard";
pub const PERFORMANCE_PATH: &str = "admin/performance";
pub const MY_MODULES_PATH: &str = "notes/my_modules";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kpi {
    pub label: String,
    pub value: Value,
    #[serde(default)]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slice {
    pub name: String,
    #[serde(default)]
    pub value: f64,
}

/// Admin and direction statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    #[serde(default)]
    pub kpi: Vec<Kpi>,
    #[serde(default)]
    pub enrollment_trends: Vec<Value>,
    #[serde(default)]
    pub department_dist: Vec<Slice>,
}

impl DashboardStats {
    pub async fn load<B>(backend: &B, cache: &QueryClient) -> Result<Self>
    where
        B: ResourceBackend + ?Sized,
    {
        let data = fetch_report(backend, cache, STATS_PATH).await?;
        Ok(serde_json::from_value(data)?)
    }

    pub fn department_total(&self) -> f64 {
        self.department_dist.iter().map(|s| s.value).sum()
    }
}

async fn fetch_report<B>(backend: &B, cache: &QueryClient, path: &str) -> Result<Value>
where
    B: ResourceBackend + ?Sized,
{
    let key = QueryKey::under("admin", path);
    let data = cache.fetch(&key, || backend.get(key.path(), key.params())).await?;
    Ok(data.as_ref().clone())
}

/// `admin/performance/` flattened to `(dotted.key, value)` rows in
/// server order.
pub async fn performance_report<B>(backend: &B, cache: &QueryClient) -> Result<Vec<(String, String)>>
where
    B: ResourceBackend + ?Sized,
{
    let data = fetch_report(backend, cache, PERFORMANCE_PATH).await?;
    let mut rows = Vec::new();
    flatten("", &data, &mut rows);
    Ok(rows)
}

fn flatten(prefix: &str, value: &Value, rows: &mut Vec<(String, String)>) {
    let join = |key: &str| {
        if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", prefix, key)
        }
    };
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                flatten(&join(k), v, rows);
            }
        }
        Value::Array(items) => {
            for (i, v) in items.iter().enumerate() {
                flatten(&join(&i.to_string()), v, rows);
            }
        }
        Value::String(s) => rows.push((prefix.to_string(), s.clone())),
        Value::Null => rows.push((prefix.to_string(), "-".to_string())),
        other => rows.push((prefix.to_string(), other.to_string())),
    }
}

/// Teacher home: the modules assigned to the logged-in teacher.
#[derive(Debug, Clone, Default)]
pub struct TeacherOverview {
    pub modules: Vec<Module>,
}

impl TeacherOverview {
    pub async fn load<B>(backend: &B, cache: &QueryClient) -> Result<Self>
    where
        B: ResourceBackend + ?Sized,
    {
        let key = QueryKey::under("notes", MY_MODULES_PATH);
        let data = fetch_collection(backend, cache, &key).await?;
        let modules: Vec<Module> = serde_json::from_value(data)?;
        info!("👩‍🏫 {} assigned modules", modules.len());
        Ok(Self { modules })
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    pub fn total_students(&self) -> u32 {
        self.modules.iter().map(|m| m.student_count.unwrap_or(0)).sum()
    }

    /// Assigned modules whose name or code contains `query`.
    pub fn filtered(&self, query: &str) -> Vec<&Module> {
        self.modules
            .iter()
            .filter(|m| matches_query(&[m.name.as_str(), m.code.as_str()], query))
            .collect()
    }

    pub fn program_count(&self) -> usize {
        self.modules
            .iter()
            .filter_map(|m| m.filiere.as_ref())
            .collect::<HashSet<&ProgramRef>>()
            .len()
    }
}

/// Student home: enrollments and grades fetched side by side.
#[derive(Debug, Clone, Default)]
pub struct StudentOverview {
    pub enrollments: Vec<Enrollment>,
    pub transcript: Transcript,
}

impl StudentOverview {
    pub async fn load<B>(backend: &B, cache: &QueryClient) -> Result<Self>
    where
        B: ResourceBackend + ?Sized,
    {
        let enrollments_key = QueryKey::under("inscriptions", crate::enrollments::MY_ENROLLMENTS_PATH);
        let grades_key = QueryKey::collection("notes");
        let (enrollments, grades) = tokio::join!(
            fetch_collection(backend, cache, &enrollments_key),
            fetch_collection(backend, cache, &grades_key)
        );
        let enrollments: Vec<Enrollment> = serde_json::from_value(enrollments?)?;
        let grades: Vec<Grade> = serde_json::from_value(grades?)?;
        Ok(Self {
            enrollments,
            transcript: Transcript::new(grades),
        })
    }

    /// The first enrollment the server lists.
    pub fn latest_enrollment(&self) -> Option<&Enrollment> {
        self.enrollments.first()
    }

    /// Average shown on the home screen; `-` until a grade exists.
    pub fn gpa_label(&self) -> String {
        if self.transcript.grades().is_empty() {
            return "-".to_string();
        }
        self.transcript.average_label()
    }

    pub fn passed_count(&self) -> usize {
        self.transcript.passed_count()
    }
}
