pub mod api;
pub mod error;
pub mod query;

// Resource descriptors and the generic screens built on them
pub mod resource;
pub mod screen;

// Role workflows
pub mod dashboard;
pub mod enrollments;
pub mod grades;

// Session and navigation
pub mod auth;
pub mod routes;

// Configuration
pub mod config;
pub mod logging;

pub use api::{CampusHttpClient, PortalBackend, ResourceBackend};
pub use auth::{AuthContext, Role, Session, SessionStore};
pub use config::CampusConfig;
pub use error::{ApiError, FormError, GradeError, SessionError};
pub use query::{QueryClient, QueryKey};
pub use resource::{Record, RecordId, Resource};
pub use routes::{guard, landing_route, Access, Route};
pub use screen::{ListView, MutationDispatcher, ResourceForm, ResourceListScreen};
