use uuid::Uuid;

/// A resolved, logged-in caller. Attached to the request by the session
/// middleware and read-only for the rest of the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    pub username: String,
}

/// Who is making this request. The session middleware inserts exactly one
/// `Viewer` into every request's extensions; a missing, unknown, or expired
/// session cookie resolves to `Anonymous` rather than an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Viewer {
    User(Identity),
    Anonymous,
}

impl Viewer {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Viewer::User(id) => Some(id),
            Viewer::Anonymous => None,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Viewer::Anonymous)
    }

    /// The viewer's user id as a string key for vote lookups, or `None`
    /// when anonymous (no vote rows can exist for an anonymous viewer).
    pub fn user_key(&self) -> Option<String> {
        self.identity().map(|id| id.user_id.to_string())
    }
}
