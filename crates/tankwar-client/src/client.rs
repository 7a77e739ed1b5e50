//! Control surface for one simulation connection

use crate::config::ClientConfig;
use crate::ingest::{self, LoopExit, LoopState, Shared};
use crate::{Error, Result};
use log::{info, warn};
use std::io::Read;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tankwar_core::{
    ComponentKind, ComponentValue, Controls, EntityId, EntityRecord, TankControls, TurretControls,
};
use tankwar_db::{Sample, SessionRecorder};
use tankwar_netcode::{
    encode_message, ClientMessage, Connection, FrameReader, ObservationKind, TcpConnection,
};

/// A connected client
///
/// Owns the sending half of the connection and the ingestion thread that
/// reads the other half. All methods take `&self`; the client can be shared
/// between threads behind an `Arc`.
///
/// Dropping the client closes it.
pub struct GameClient {
    config: ClientConfig,
    connection: Arc<dyn Connection>,
    shared: Arc<Shared>,
    ingest: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for GameClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameClient")
            .field("remote", &self.connection.remote_addr())
            .field("state", &self.loop_state())
            .finish_non_exhaustive()
    }
}

impl GameClient {
    /// Connect over TCP to `config.address` and start ingesting
    pub fn connect(config: ClientConfig) -> Result<Self> {
        let (connection, reader) =
            TcpConnection::connect(config.address.as_str(), config.connect_timeout())?;
        info!("Connected to {}", config.address);
        Self::with_connection(config, Arc::new(connection), reader)
    }

    /// Connect to `address` with default settings
    pub fn connect_to(address: impl Into<String>) -> Result<Self> {
        Self::connect(ClientConfig::with_address(address))
    }

    /// Start a client on an established connection
    ///
    /// `reader` is the receiving half. Closing `connection` must make reads
    /// on it return end-of-stream, or [`close`](Self::close) will block.
    pub fn with_connection<R>(
        config: ClientConfig,
        connection: Arc<dyn Connection>,
        reader: R,
    ) -> Result<Self>
    where
        R: Read + Send + 'static,
    {
        let recorder = if config.recorder.enabled {
            Some(SessionRecorder::from_config(&config.recorder)?)
        } else {
            None
        };
        let shared = Arc::new(Shared::new(recorder));

        let frames = FrameReader::new(reader).with_max_frame_len(config.max_frame_len);
        let handle = {
            let shared = shared.clone();
            thread::Builder::new()
                .name("tankwar-ingest".to_string())
                .spawn(move || ingest::run(&shared, frames))?
        };

        let client = Self {
            config,
            connection,
            shared,
            ingest: Mutex::new(Some(handle)),
        };
        if client.config.request_tank_list_on_connect {
            client.request_tank_list()?;
        }
        Ok(client)
    }

    /// Stop ingesting and release the connection
    ///
    /// Idempotent. Waits for the ingestion thread to finish.
    pub fn close(&self) -> Result<()> {
        self.shared.request_stop();
        let closed = self.connection.close();
        let handle = self.ingest.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!("Ingestion thread panicked");
            }
        }
        closed.map_err(Error::from)
    }

    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }

    pub fn loop_state(&self) -> LoopState {
        if self.is_running() {
            LoopState::Running
        } else {
            LoopState::Stopped
        }
    }

    /// Why ingestion stopped, `None` while running
    pub fn exit_reason(&self) -> Option<LoopExit> {
        self.shared.exit_reason()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.connection.remote_addr()
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    /// Claim a tank to control
    ///
    /// Takes an already assigned tank if one is queued. Otherwise asks the
    /// server for a new one and waits up to `timeout` for the assignment.
    /// `Ok(None)` means the wait timed out and can be retried.
    pub fn acquire_entity(&self, timeout: Duration) -> Result<Option<EntityId>> {
        if let Some(id) = self.shared.queue.try_pop() {
            return Ok(Some(id));
        }
        self.send(&ClientMessage::SpawnTankRequest)?;
        match self.shared.queue.pop_timeout(timeout) {
            Some(id) => Ok(Some(id)),
            None if !self.is_running() => Err(Error::NotRunning),
            None => Ok(None),
        }
    }

    /// [`acquire_entity`](Self::acquire_entity) with the configured timeout
    pub fn acquire_entity_default(&self) -> Result<Option<EntityId>> {
        self.acquire_entity(self.config.acquire_timeout())
    }

    pub fn send_tank_controls(&self, tank: EntityId, controls: TankControls) -> Result<()> {
        self.send(&ClientMessage::TankControlUpdate { tank, controls })
    }

    pub fn send_turret_controls(&self, turret: EntityId, controls: TurretControls) -> Result<()> {
        self.send(&ClientMessage::TurretControlUpdate { turret, controls })
    }

    /// Send controls to a tank or a turret
    pub fn send_controls(&self, entity: EntityId, controls: impl Into<Controls>) -> Result<()> {
        match controls.into() {
            Controls::Tank(controls) => self.send_tank_controls(entity, controls),
            Controls::Turret(controls) => self.send_turret_controls(entity, controls),
        }
    }

    /// Ask for one observation of `entity`
    pub fn request_observation(&self, entity: EntityId, kind: ObservationKind) -> Result<()> {
        self.send(&ClientMessage::ObservationRequest { entity, kind })
    }

    /// Stream observations of `entity`, at most once per `cooldown` if given
    pub fn subscribe(
        &self,
        entity: EntityId,
        kind: ObservationKind,
        cooldown: Option<Duration>,
    ) -> Result<()> {
        self.send(&ClientMessage::SubscriptionRequest {
            entity,
            kind,
            cooldown_secs: cooldown.map(|d| d.as_secs_f32()),
        })
    }

    /// Ask for the authoritative list of live tanks
    pub fn request_tank_list(&self) -> Result<()> {
        self.send(&ClientMessage::TankListRequest)
    }

    fn send(&self, msg: &ClientMessage) -> Result<()> {
        if !self.is_running() {
            return Err(Error::NotRunning);
        }
        let payload = encode_message(msg)?;
        match self.connection.send_frame(&payload) {
            Ok(()) => Ok(()),
            Err(e) if e.is_disconnect() => Err(Error::NotRunning),
            Err(e) => Err(e.into()),
        }
    }

    // ------------------------------------------------------------------
    // State
    // ------------------------------------------------------------------

    /// Snapshot of an entity's latest components
    pub fn get_record(&self, entity: EntityId) -> EntityRecord {
        self.shared.states.get(entity)
    }

    /// Latest value of one component
    pub fn component(&self, entity: EntityId, kind: ComponentKind) -> Result<ComponentValue> {
        Ok(self.shared.states.component(entity, kind)?)
    }

    /// Reward accumulated since the last call, resetting it to zero
    pub fn pop_reward(&self, entity: EntityId) -> f64 {
        self.shared.states.pop_reward(entity)
    }

    pub fn alive_tanks(&self) -> Vec<EntityId> {
        self.shared.lifecycle().alive()
    }

    pub fn dead_tanks(&self) -> Vec<EntityId> {
        self.shared.lifecycle().dead()
    }

    /// Tanks assigned to this client that have not died
    pub fn assigned_tanks(&self) -> Vec<EntityId> {
        self.shared.lifecycle().assigned()
    }

    /// Recorded samples of one component, oldest first
    pub fn recorded(&self, entity: EntityId, kind: ComponentKind) -> Result<Vec<Sample>> {
        match self.shared.recorder() {
            Some(recorder) => Ok(recorder.read(entity, kind)?.to_vec()),
            None => Err(tankwar_db::Error::TableNotFound {
                entity,
                component: kind,
            }
            .into()),
        }
    }

    /// Run `f` against the session recorder, `None` if recording is disabled
    pub fn with_recorder<T>(&self, f: impl FnOnce(&SessionRecorder) -> T) -> Option<T> {
        self.shared.recorder().map(|recorder| f(&recorder))
    }
}

impl Drop for GameClient {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Error closing client: {}", e);
        }
    }
}
