/// Supplies the logged-in account and its posting key on demand.
///
/// Either value may be unavailable, in which case uploads are refused
/// before any work is done.
pub trait IdentityProvider: Send + Sync {
    fn current_user(&self) -> Option<String>;

    /// WIF-encoded posting key for the current user.
    fn posting_key(&self) -> Option<String>;
}

/// Identity with fixed values, e.g. taken from the command line.
#[derive(Clone, Default)]
pub struct StaticIdentity {
    user: Option<String>,
    posting_key: Option<String>,
}

impl StaticIdentity {
    pub fn new(user: impl Into<String>, posting_key: impl Into<String>) -> Self {
        Self {
            user: Some(user.into()),
            posting_key: Some(posting_key.into()),
        }
    }

    /// No one is logged in.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_posting_key(mut self, posting_key: impl Into<String>) -> Self {
        self.posting_key = Some(posting_key.into());
        self
    }
}

impl std::fmt::Debug for StaticIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticIdentity")
            .field("user", &self.user)
            .field("posting_key", &self.posting_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_user(&self) -> Option<String> {
        self.user.clone()
    }

    fn posting_key(&self) -> Option<String> {
        self.posting_key.clone()
    }
}

/// A user id and posting key, both present and non-empty.
pub(crate) struct Identity {
    pub user: String,
    pub posting_key: String,
}

impl Identity {
    /// Reads both values from `provider`, or `None` if either is missing.
    pub(crate) fn resolve(provider: &dyn IdentityProvider) -> Option<Self> {
        let user = provider.current_user().filter(|u| !u.trim().is_empty())?;
        let posting_key = provider.posting_key().filter(|k| !k.trim().is_empty())?;
        Some(Self { user, posting_key })
    }
}
