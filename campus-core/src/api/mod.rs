pub mod backend;
pub mod client;
pub mod types;

pub use backend::{PortalBackend, ResourceBackend};
pub use client::CampusHttpClient;
