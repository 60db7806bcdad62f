use serde::{Deserialize, Serialize};

/// The slice of a user profile the chat core resolves: a stable external id
/// and the names used for display-name derivation.
///
/// Profiles are provisioned by the identity stack; this layer only reads and
/// upserts them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
}

