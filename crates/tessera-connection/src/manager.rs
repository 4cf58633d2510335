//! Connection manager for handling active sessions

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tessera_core::{ConnectionConfig, Result, TesseraError};
use tessera_drivers::{DriverHandle, DriverRegistry};
use uuid::Uuid;

use crate::session::{DocumentSession, RelationalSession, Session};
use crate::{BackgroundProcess, ClientSettings, LifetimeToken, SavedConnection, run_setup_commands};

/// Opens sessions and owns them until disconnect or shutdown
pub struct ConnectionManager {
    drivers: DriverRegistry,
    settings: ClientSettings,
    /// Parent of every session's lifetime
    root: LifetimeToken,
    sessions: RwLock<HashMap<Uuid, Session>>,
}

impl ConnectionManager {
    pub fn new(settings: ClientSettings) -> Self {
        Self::with_registry(DriverRegistry::with_settings(settings.document), settings)
    }

    pub fn with_registry(drivers: DriverRegistry, settings: ClientSettings) -> Self {
        Self {
            drivers,
            settings,
            root: LifetimeToken::new(),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn drivers(&self) -> &DriverRegistry {
        &self.drivers
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// Run the record's setup commands, then connect.
    #[tracing::instrument(skip(self, saved), fields(connection_name = %saved.name))]
    pub async fn connect_saved(&self, saved: &SavedConnection) -> Result<Session> {
        let config = saved.to_config()?;
        let lifetime = self.root.child();

        let setup = match run_setup_commands(
            &saved.commands,
            &lifetime,
            self.settings.setup_port_timeout(),
        )
        .await
        {
            Ok(setup) => setup,
            Err(e) => {
                lifetime.cancel();
                tracing::error!(error = %e, "setup commands failed");
                return Err(e);
            }
        };

        self.open(config, lifetime, setup).await
    }

    /// Connect without setup commands
    pub async fn connect(&self, config: ConnectionConfig) -> Result<Session> {
        self.open(config, self.root.child(), Vec::new()).await
    }

    async fn open(
        &self,
        config: ConnectionConfig,
        lifetime: LifetimeToken,
        setup: Vec<BackgroundProcess>,
    ) -> Result<Session> {
        tracing::info!(provider = %config.provider, "connecting");
        let opened = match self.drivers.resolve(config.provider) {
            Ok(DriverHandle::Relational(driver)) => {
                let conn = lifetime.guard(driver.connect(&config)).await;
                conn.map(|conn| {
                    let session = RelationalSession::new(config, conn, lifetime.clone(), setup);
                    Session::Relational(Arc::new(session))
                })
            }
            Ok(DriverHandle::Document(driver)) => {
                let conn = lifetime.guard(driver.connect(&config)).await;
                conn.map(|conn| {
                    let session = DocumentSession::new(config, conn, lifetime.clone(), setup);
                    Session::Document(Arc::new(session))
                })
            }
            Err(e) => Err(e),
        };

        let session = match opened {
            Ok(session) => session,
            Err(e) => {
                lifetime.cancel();
                tracing::error!(error = %e, "failed to connect");
                return Err(e);
            }
        };

        self.sessions.write().insert(session.id(), session.clone());
        tracing::info!(session = %session.id(), "connection established");
        Ok(session)
    }

    /// Check reachability without keeping a session
    #[tracing::instrument(skip(self, saved), fields(connection_name = %saved.name))]
    pub async fn test_saved(&self, saved: &SavedConnection) -> Result<()> {
        let config = saved.to_config()?;
        let lifetime = self.root.child();
        let result = async {
            let _setup = run_setup_commands(
                &saved.commands,
                &lifetime,
                self.settings.setup_port_timeout(),
            )
            .await?;
            match self.drivers.resolve(config.provider)? {
                DriverHandle::Relational(driver) => lifetime.guard(driver.test_connection(&config)).await,
                DriverHandle::Document(driver) => lifetime.guard(driver.test_connection(&config)).await,
            }
        }
        .await;
        lifetime.cancel();
        result
    }

    pub fn get(&self, id: Uuid) -> Option<Session> {
        let session = self.sessions.read().get(&id).cloned();
        if session.is_none() {
            tracing::debug!(session = %id, "session not found");
        }
        session
    }

    pub fn relational(&self, id: Uuid) -> Result<Arc<RelationalSession>> {
        match self.get(id) {
            Some(Session::Relational(session)) => Ok(session),
            Some(Session::Document(_)) => Err(TesseraError::NotSupported(
                "session is a document store".into(),
            )),
            None => Err(TesseraError::NotFound(format!("session {}", id))),
        }
    }

    pub fn document(&self, id: Uuid) -> Result<Arc<DocumentSession>> {
        match self.get(id) {
            Some(Session::Document(session)) => Ok(session),
            Some(Session::Relational(_)) => Err(TesseraError::NotSupported(
                "session is not a document store".into(),
            )),
            None => Err(TesseraError::NotFound(format!("session {}", id))),
        }
    }

    pub fn is_connected(&self, id: Uuid) -> bool {
        self.sessions.read().contains_key(&id)
    }

    pub fn session_ids(&self) -> Vec<Uuid> {
        self.sessions.read().keys().copied().collect()
    }

    /// Cancel the session's lifetime and close it
    #[tracing::instrument(skip(self), fields(session = %id))]
    pub async fn disconnect(&self, id: Uuid) -> Result<()> {
        tracing::info!("disconnecting");
        let session = self.sessions.write().remove(&id);
        match session {
            Some(session) => session.close().await,
            None => Err(TesseraError::NotFound(format!("session {}", id))),
        }
    }

    /// Cancel every lifetime and close every session. Returns the first
    /// close error after attempting all of them.
    #[tracing::instrument(skip(self))]
    pub async fn shutdown(&self) -> Result<()> {
        self.root.cancel();
        let sessions: Vec<Session> = self.sessions.write().drain().map(|(_, s)| s).collect();
        tracing::info!(count = sessions.len(), "shutting down sessions");

        let mut first_error = None;
        for session in sessions {
            if let Err(e) = session.close().await {
                tracing::warn!(session = %session.id(), error = %e, "close failed during shutdown");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new(ClientSettings::default())
    }
}
