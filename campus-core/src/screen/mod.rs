//! View-models for the portal screens. Each screen owns its local state
//! (loaded data, search query, open form) and talks to the backend only
//! through [`crate::api::ResourceBackend`] and the shared query cache.

pub mod form;
pub mod list;
pub mod lookup;
pub mod mutation;

pub use form::{FormMode, ResourceForm, SubmitRequest};
pub use list::{DeleteOutcome, ListView, ResourceListScreen};
pub use lookup::{ForeignLookup, SelectOption, UNKNOWN_LABEL};
pub use mutation::MutationDispatcher;

/// Remote data as a screen sees it.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Remote<T> {
    #[default]
    Idle,
    Loading,
    Ready(T),
    Failed(String),
}

impl<T> Remote<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, Remote::Loading)
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Remote::Ready(data) => Some(data),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Remote::Failed(message) => Some(message),
            _ => None,
        }
    }
}

/// Blocking yes/no prompt in front of destructive actions.
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Case-insensitive substring match against any of `haystacks`.
/// An empty needle matches everything.
pub fn matches_query(haystacks: &[&str], needle: &str) -> bool {
    let needle = needle.to_lowercase();
    if needle.is_empty() {
        return true;
    }
    haystacks.iter().any(|h| h.to_lowercase().contains(&needle))
}
