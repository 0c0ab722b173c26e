use serde::{Deserialize, Serialize};

/// An authenticated user as reported by the identity provider.
/// Read-only to this service; lives for the duration of a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}
