//! Orchestrates login, name resolution and the read-modify-write cycle.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;
use url::Url;

use super::directory::{Profile, ProfileDirectory};
use super::error::Result;
use super::session::{Session, SessionManager};
use super::state::{ProfileFormState, ProfileStateStore, TimeWindow};
use super::transport::Transport;

/// One controller per device connection.
///
/// Session id and the resolved profile are instance-owned mutable state;
/// callers that need concurrency hold one instance each.
pub struct ProfileController {
    sessions: SessionManager,
    directory: ProfileDirectory,
    store: ProfileStateStore,
    session: Session,
    resolved: Option<Profile>,
}

impl std::fmt::Debug for ProfileController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileController")
            .field("session", &self.session)
            .field("resolved", &self.resolved)
            .finish_non_exhaustive()
    }
}

impl ProfileController {
    /// Log in to the device and wire up the collaborators over one shared
    /// transport.
    pub async fn connect(
        transport: Arc<dyn Transport>,
        base_url: Url,
        user: &str,
        password: &str,
    ) -> Result<Self> {
        let mut sessions =
            SessionManager::new(Arc::clone(&transport), base_url.clone(), user, password);
        let session = sessions.authenticate().await?;

        Ok(Self {
            directory: ProfileDirectory::new(Arc::clone(&transport), &base_url)?,
            store: ProfileStateStore::new(transport, &base_url)?,
            sessions,
            session,
            resolved: None,
        })
    }

    /// All profiles known to the device, as a name to id mapping.
    pub async fn list_profiles(&mut self) -> Result<BTreeMap<String, String>> {
        self.session = self.sessions.ensure_valid(&self.session).await?;
        self.directory.list_profiles(&self.session).await
    }

    /// Current form state of the named profile.
    pub async fn get_state(&mut self, name: &str) -> Result<ProfileFormState> {
        let id = self.resolve(name).await?;
        let (state, session) = self
            .store
            .read(&mut self.sessions, self.session.clone(), &id)
            .await?;
        self.session = session;

        Ok(state)
    }

    /// Switch the profile's time window.
    ///
    /// Reads the form first and carries the observed toggles into the
    /// write; a write without the preceding read would clear every toggle
    /// the request does not mention.
    pub async fn set_state(&mut self, name: &str, window: TimeWindow) -> Result<()> {
        let id = self.resolve(name).await?;
        let (carried, session) = self
            .store
            .read(&mut self.sessions, self.session.clone(), &id)
            .await?;
        self.session = self
            .store
            .write(&mut self.sessions, session, &id, window, &carried)
            .await?;

        Ok(())
    }

    /// Profile id for a display name, resolved once and cached for the
    /// lifetime of this controller.
    async fn resolve(&mut self, name: &str) -> Result<String> {
        if let Some(profile) = self.resolved.as_ref().filter(|p| p.name == name) {
            return Ok(profile.id.clone());
        }

        self.session = self.sessions.ensure_valid(&self.session).await?;
        let id = self.directory.resolve_id(&self.session, name).await?;
        debug!("resolved profile {name:?} to id {id}");
        self.resolved = Some(Profile {
            name: name.to_string(),
            id: id.clone(),
        });

        Ok(id)
    }
}
