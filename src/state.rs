use crate::identity::IdentityResolver;
use crate::registry::SubmissionRegistry;
use crate::storage::DocumentStore;
use std::sync::Arc;

pub struct AppState {
    pub registry: SubmissionRegistry,
    pub documents: Arc<dyn DocumentStore>,
    pub identity: Arc<dyn IdentityResolver>,
}
