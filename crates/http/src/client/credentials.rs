//! Credential storage across the durable and session scopes

use super::storage::{KeyValueStore, MemoryStore};
use std::fmt;
use std::sync::Arc;

/// Storage key for the access token
pub const ACCESS_KEY: &str = "qs_access";
/// Storage key for the refresh token
pub const REFRESH_KEY: &str = "qs_refresh";
/// Storage key recording which scope credential writes go to
pub const PREFERENCE_KEY: &str = "qs_pref_storage";

const DURABLE_MARKER: &str = "local";
const SESSION_MARKER: &str = "session";

/// Where a credential pair is persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Survives restarts
    Durable,
    /// Lives for the current session only
    Session,
}

impl Scope {
    /// Scope selected by the "remember me" flag
    pub fn from_remember(remember: bool) -> Self {
        if remember {
            Self::Durable
        } else {
            Self::Session
        }
    }

    fn marker(self) -> &'static str {
        match self {
            Self::Durable => DURABLE_MARKER,
            Self::Session => SESSION_MARKER,
        }
    }

    fn other(self) -> Self {
        match self {
            Self::Durable => Self::Session,
            Self::Session => Self::Durable,
        }
    }
}

/// The caller's proof of identity for the remote API
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access: Option<String>,
    pub refresh: Option<String>,
}

// Tokens stay out of logs
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access", &self.access.as_ref().map(|_| "<redacted>"))
            .field("refresh", &self.refresh.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Credential pair storage over two scopes
///
/// Reads prefer the durable scope and fall back to the session scope.
/// Writes go to the scope chosen by the caller's `remember` flag, which is
/// recorded so later access-only updates land in the same place.
#[derive(Clone)]
pub struct CredentialStore {
    durable: Arc<dyn KeyValueStore>,
    session: Arc<dyn KeyValueStore>,
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialStore").finish_non_exhaustive()
    }
}

impl CredentialStore {
    pub fn new(durable: Arc<dyn KeyValueStore>, session: Arc<dyn KeyValueStore>) -> Self {
        Self { durable, session }
    }

    /// Store where both scopes are process-local
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), Arc::new(MemoryStore::new()))
    }

    fn scope(&self, scope: Scope) -> &dyn KeyValueStore {
        match scope {
            Scope::Durable => self.durable.as_ref(),
            Scope::Session => self.session.as_ref(),
        }
    }

    fn read(&self, key: &str) -> Option<String> {
        self.durable
            .get(key)
            .or_else(|| self.session.get(key))
            .filter(|value| !value.is_empty())
    }

    pub fn access_token(&self) -> Option<String> {
        self.read(ACCESS_KEY)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read(REFRESH_KEY)
    }

    /// Current credential pair
    pub fn load(&self) -> Credentials {
        Credentials {
            access: self.access_token(),
            refresh: self.refresh_token(),
        }
    }

    /// Scope that credential updates should be written to
    ///
    /// The recorded preference wins. Without one, the scope already holding
    /// a refresh token is used, and durable is the default.
    pub fn preferred_scope(&self) -> Scope {
        match self.durable.get(PREFERENCE_KEY).as_deref() {
            Some(SESSION_MARKER) => return Scope::Session,
            Some(DURABLE_MARKER) => return Scope::Durable,
            _ => {}
        }

        if self.durable.get(REFRESH_KEY).is_some() {
            Scope::Durable
        } else if self.session.get(REFRESH_KEY).is_some() {
            Scope::Session
        } else {
            Scope::Durable
        }
    }

    /// Persist credentials into the scope selected by `remember`
    ///
    /// With `refresh` set, the pair replaces whatever either scope held.
    /// Without it only the access token is overwritten and the stored
    /// refresh token stays as it is.
    pub fn save(&self, access: &str, refresh: Option<&str>, remember: bool) {
        let scope = Scope::from_remember(remember);
        let target = self.scope(scope);

        target.set(ACCESS_KEY, access);
        if let Some(refresh) = refresh {
            target.set(REFRESH_KEY, refresh);

            let stale = self.scope(scope.other());
            stale.remove(ACCESS_KEY);
            stale.remove(REFRESH_KEY);
        }
        self.durable.set(PREFERENCE_KEY, scope.marker());

        debug!(scope = ?scope, with_refresh = refresh.is_some(), "Saved credentials");
    }

    /// Remove both tokens from both scopes
    pub fn clear(&self) {
        for store in [self.durable.as_ref(), self.session.as_ref()] {
            store.remove(ACCESS_KEY);
            store.remove(REFRESH_KEY);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::storage::MockKeyValueStore;
    use mockall::predicate::eq;

    fn stores() -> (Arc<MemoryStore>, Arc<MemoryStore>, CredentialStore) {
        let durable = Arc::new(MemoryStore::new());
        let session = Arc::new(MemoryStore::new());
        let store = CredentialStore::new(durable.clone(), session.clone());
        (durable, session, store)
    }

    #[test]
    fn reads_prefer_durable_scope() {
        let (durable, session, store) = stores();
        session.set(ACCESS_KEY, "S1");
        assert_eq!(store.access_token().as_deref(), Some("S1"));

        durable.set(ACCESS_KEY, "D1");
        assert_eq!(store.access_token().as_deref(), Some("D1"));
    }

    #[test]
    fn empty_tokens_count_as_missing() {
        let (durable, _, store) = stores();
        durable.set(ACCESS_KEY, "");
        assert_eq!(store.access_token(), None);
    }

    #[test]
    fn remember_selects_scope_and_records_preference() {
        let (durable, session, store) = stores();

        store.save("A1", Some("R1"), false);
        assert_eq!(session.get(ACCESS_KEY).as_deref(), Some("A1"));
        assert_eq!(session.get(REFRESH_KEY).as_deref(), Some("R1"));
        assert_eq!(durable.get(ACCESS_KEY), None);
        assert_eq!(store.preferred_scope(), Scope::Session);

        store.save("A2", Some("R2"), true);
        assert_eq!(durable.get(ACCESS_KEY).as_deref(), Some("A2"));
        assert_eq!(store.preferred_scope(), Scope::Durable);
    }

    #[test]
    fn full_pair_replaces_other_scope() {
        let (durable, session, store) = stores();
        store.save("OLD", Some("OLD_R"), true);
        store.save("NEW", Some("NEW_R"), false);

        assert_eq!(durable.get(ACCESS_KEY), None);
        assert_eq!(durable.get(REFRESH_KEY), None);
        assert_eq!(session.get(ACCESS_KEY).as_deref(), Some("NEW"));
        assert_eq!(store.access_token().as_deref(), Some("NEW"));
    }

    #[test]
    fn access_only_update_keeps_refresh_token() {
        let (durable, _, store) = stores();
        store.save("A1", Some("R1"), true);
        store.save("A2", None, true);

        assert_eq!(durable.get(ACCESS_KEY).as_deref(), Some("A2"));
        assert_eq!(durable.get(REFRESH_KEY).as_deref(), Some("R1"));
    }

    #[test]
    fn preference_falls_back_to_scope_holding_refresh() {
        let (durable, session, store) = stores();
        assert_eq!(store.preferred_scope(), Scope::Durable);

        session.set(REFRESH_KEY, "R1");
        assert_eq!(store.preferred_scope(), Scope::Session);

        durable.set(REFRESH_KEY, "R2");
        assert_eq!(store.preferred_scope(), Scope::Durable);

        durable.set(PREFERENCE_KEY, "session");
        assert_eq!(store.preferred_scope(), Scope::Session);
    }

    #[test]
    fn clear_is_idempotent() {
        let (durable, session, store) = stores();
        store.save("A1", Some("R1"), true);
        session.set(ACCESS_KEY, "S1");

        store.clear();
        store.clear();

        assert_eq!(store.load(), Credentials { access: None, refresh: None });
        assert_eq!(durable.get(REFRESH_KEY), None);
        assert_eq!(session.get(ACCESS_KEY), None);
    }

    #[test]
    fn clear_removes_both_keys_from_both_scopes() {
        let mut durable = MockKeyValueStore::new();
        let mut session = MockKeyValueStore::new();
        for mock in [&mut durable, &mut session] {
            mock.expect_remove().with(eq(ACCESS_KEY)).times(1).return_const(());
            mock.expect_remove().with(eq(REFRESH_KEY)).times(1).return_const(());
        }

        CredentialStore::new(Arc::new(durable), Arc::new(session)).clear();
    }

    #[test]
    fn debug_output_redacts_tokens() {
        let creds = Credentials {
            access: Some("secret-access".into()),
            refresh: None,
        };
        let rendered = format!("{creds:?}");
        assert!(!rendered.contains("secret-access"));
        assert!(rendered.contains("<redacted>"));
    }
}
