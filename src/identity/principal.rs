use serde::{Deserialize, Serialize};

/// A verified identity: the decoded claim behind a bearer token or session
/// cookie. `subject` is the opaque provider-assigned user id and doubles as
/// the `users.id` foreign key.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Principal {
    pub subject: String,
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
}
