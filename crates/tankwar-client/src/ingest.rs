//! Ingestion loop - applies server messages to local state
//!
//! One background thread owns the receiving half of the connection. It
//! decodes frames one at a time and applies them to the state shared with
//! the caller: the entity store, the lifecycle sets, the assignment queue
//! and the session recorder.

use crate::assignment::AssignmentQueue;
use log::{debug, error, info, warn};
use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use tankwar_core::{ComponentValue, EntityId, EntityStates};
use tankwar_db::SessionRecorder;
use tankwar_netcode::{
    decode_message, decode_observation, EntityLifecycle, FrameReader, ObservationUpdate,
    ServerMessage, TankInfo,
};

/// Metadata key the turret list of a tank is recorded under
pub const TURRETS_KEY: &str = "turrets";

/// Ingestion loop state. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Stopped,
}

/// Why the ingestion loop stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopExit {
    /// `close()` was called on this client
    Closed,
    /// The server closed or reset the stream
    Disconnected,
    /// The stream carried data this client cannot decode
    Failed(String),
}

/// State shared between the caller and the ingestion thread
#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) states: EntityStates,
    pub(crate) lifecycle: Mutex<EntityLifecycle>,
    pub(crate) queue: AssignmentQueue,
    pub(crate) recorder: Option<Mutex<SessionRecorder>>,
    running: AtomicBool,
    exit: Mutex<Option<LoopExit>>,
}

impl Shared {
    pub(crate) fn new(recorder: Option<SessionRecorder>) -> Self {
        Self {
            states: EntityStates::new(),
            lifecycle: Mutex::new(EntityLifecycle::new()),
            queue: AssignmentQueue::new(),
            recorder: recorder.map(Mutex::new),
            running: AtomicBool::new(true),
            exit: Mutex::new(None),
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Ask the loop to stop at its next iteration
    pub(crate) fn request_stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    pub(crate) fn exit_reason(&self) -> Option<LoopExit> {
        self.exit.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub(crate) fn lifecycle(&self) -> MutexGuard<'_, EntityLifecycle> {
        self.lifecycle.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn recorder(&self) -> Option<MutexGuard<'_, SessionRecorder>> {
        self.recorder
            .as_ref()
            .map(|r| r.lock().unwrap_or_else(|e| e.into_inner()))
    }

    /// Move to `Stopped`. The first exit reason wins.
    fn stop(&self, reason: LoopExit) {
        self.running.store(false, Ordering::Release);
        {
            let mut exit = self.exit.lock().unwrap_or_else(|e| e.into_inner());
            if exit.is_none() {
                *exit = Some(reason);
            }
        }
        self.queue.close();
    }

    /// Apply one server message
    ///
    /// Errors are payloads this client cannot decode and end the loop.
    fn dispatch(&self, msg: ServerMessage) -> tankwar_netcode::Result<()> {
        match msg {
            ServerMessage::TankAssigned(id) => self.on_assigned(id),
            ServerMessage::TankDied(id) => {
                if self.lifecycle().kill(id) {
                    debug!("Tank {} died", id);
                }
            }
            ServerMessage::TankSpawned(tank) => self.on_spawned(tank),
            ServerMessage::TankList(tanks) => {
                let report = self.lifecycle().reconcile(tanks.iter().map(|t| t.tank_id));
                if !report.is_clean() {
                    info!(
                        "Tank list reconciled: {} presumed dead, {} new",
                        report.presumed_dead.len(),
                        report.spawned.len()
                    );
                }
                for tank in tanks {
                    self.on_spawned(tank);
                }
            }
            ServerMessage::ObservationUpdate(update) => self.on_observation(update)?,
            other => debug!("No handler for {} message, ignoring", other.name()),
        }
        Ok(())
    }

    fn on_assigned(&self, id: EntityId) {
        let accepted = {
            let mut lifecycle = self.lifecycle();
            lifecycle.spawn(id) && lifecycle.assign(id)
        };
        if accepted {
            debug!("Tank {} assigned", id);
            self.queue.push(id);
        } else {
            warn!("Dropping assignment of dead tank {}", id);
        }
    }

    fn on_spawned(&self, tank: TankInfo) {
        if !self.lifecycle().spawn(tank.tank_id) {
            return;
        }
        let turrets = ComponentValue::Turrets(tank.turrets);
        self.states.apply(tank.tank_id, turrets.clone());
        if let Some(mut recorder) = self.recorder() {
            if let Err(e) = recorder.set_metadata(tank.tank_id, TURRETS_KEY, turrets) {
                warn!("Failed to record turrets of tank {}: {}", tank.tank_id, e);
            }
        }
    }

    fn on_observation(&self, update: ObservationUpdate) -> tankwar_netcode::Result<()> {
        let ObservationUpdate {
            entity,
            timestamp,
            observation,
        } = update;
        let value = decode_observation(observation)?;
        let component = value.kind();

        match self.recorder() {
            Some(mut recorder) => {
                self.states.apply(entity, value.clone());
                if let Err(e) = recorder.append(entity, component, value, timestamp) {
                    warn!("Failed to record {} of entity {}: {}", component, entity, e);
                }
            }
            None => self.states.apply(entity, value),
        }
        Ok(())
    }
}

/// Marks the loop failed if the ingestion thread unwinds
struct StopOnPanic<'a>(&'a Shared);

impl Drop for StopOnPanic<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            error!("Ingestion thread panicked");
            self.0
                .stop(LoopExit::Failed("ingestion thread panicked".to_string()));
        }
    }
}

/// Run the ingestion loop until the stream ends, fails or a stop is requested
pub(crate) fn run<R: Read>(shared: &Shared, mut reader: FrameReader<R>) {
    let _guard = StopOnPanic(shared);
    info!("Ingestion loop started");
    while shared.is_running() {
        let payload = match reader.read_frame() {
            Ok(payload) => payload,
            Err(_) if !shared.is_running() => {
                shared.stop(LoopExit::Closed);
                break;
            }
            Err(e) if e.is_disconnect() => {
                info!("Server closed the connection: {}", e);
                shared.stop(LoopExit::Disconnected);
                break;
            }
            Err(e) => {
                error!("Failed to read frame: {}", e);
                shared.stop(LoopExit::Failed(e.to_string()));
                break;
            }
        };

        let result = decode_message::<ServerMessage>(&payload).and_then(|msg| shared.dispatch(msg));
        if let Err(e) = result {
            error!("Failed to process server message: {}", e);
            shared.stop(LoopExit::Failed(e.to_string()));
            break;
        }
    }
    // Stop requested between frames
    shared.stop(LoopExit::Closed);
    if let Some(mut recorder) = shared.recorder() {
        if let Err(e) = recorder.flush() {
            warn!("Failed to persist recorded samples: {}", e);
        }
    }
    info!("Ingestion loop stopped: {:?}", shared.exit_reason());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tankwar_core::ComponentKind;
    use tankwar_netcode::{encode_frame, encode_message, ImagePayload, Observation};

    const TANK: EntityId = EntityId::new(1, 0);
    const TURRET: EntityId = EntityId::new(2, 0);

    fn stream(messages: &[ServerMessage]) -> FrameReader<Cursor<Vec<u8>>> {
        let mut bytes = Vec::new();
        for msg in messages {
            bytes.extend(encode_frame(&encode_message(msg).unwrap()));
        }
        FrameReader::new(Cursor::new(bytes))
    }

    fn observation(entity: EntityId, timestamp: u64, observation: Observation) -> ServerMessage {
        ServerMessage::ObservationUpdate(ObservationUpdate {
            entity,
            timestamp,
            observation,
        })
    }

    #[test]
    fn test_end_of_stream_is_disconnect() {
        let shared = Shared::new(None);
        run(&shared, stream(&[]));
        assert!(!shared.is_running());
        assert_eq!(shared.exit_reason(), Some(LoopExit::Disconnected));
        assert!(shared.queue.is_closed());
    }

    #[test]
    fn test_messages_applied_in_order() {
        let shared = Shared::new(Some(SessionRecorder::new()));
        run(
            &shared,
            stream(&[
                ServerMessage::TankSpawned(TankInfo::new(TANK, vec![TURRET])),
                ServerMessage::TankAssigned(TANK),
                observation(TANK, 1, Observation::Reward(1.0)),
                observation(TANK, 2, Observation::Reward(2.5)),
                observation(TANK, 3, Observation::Reward(-0.5)),
                observation(TANK, 4, Observation::Position { x: 3.0, y: 4.0 }),
                ServerMessage::BallList(vec![EntityId::new(50, 0)]),
            ]),
        );

        assert_eq!(shared.exit_reason(), Some(LoopExit::Disconnected));
        assert_eq!(shared.queue.try_pop(), Some(TANK));
        assert!(shared.lifecycle().is_assigned(TANK));
        assert_eq!(shared.states.pop_reward(TANK), 3.0);
        assert_eq!(shared.states.get(TANK).turrets(), &[TURRET]);

        let recorder = shared.recorder().unwrap();
        let rewards = recorder.read(TANK, ComponentKind::Reward).unwrap();
        assert_eq!(rewards.iter().map(|s| s.timestamp).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert!(recorder.metadata(TANK).unwrap().contains_key(TURRETS_KEY));
    }

    #[test]
    fn test_death_and_late_assignment() {
        let shared = Shared::new(None);
        run(
            &shared,
            stream(&[
                ServerMessage::TankAssigned(TANK),
                ServerMessage::TankDied(TANK),
                ServerMessage::TankAssigned(TANK),
            ]),
        );

        let lifecycle = shared.lifecycle();
        assert!(lifecycle.is_dead(TANK));
        assert!(!lifecycle.is_assigned(TANK));
        // Only the first assignment was queued
        assert_eq!(shared.queue.len(), 1);
    }

    #[test]
    fn test_tank_list_reconciles() {
        let a = EntityId::new(1, 0);
        let b = EntityId::new(2, 0);
        let c = EntityId::new(3, 0);
        let shared = Shared::new(None);
        run(
            &shared,
            stream(&[
                ServerMessage::TankList(vec![
                    TankInfo::new(a, vec![]),
                    TankInfo::new(b, vec![]),
                    TankInfo::new(c, vec![]),
                ]),
                ServerMessage::TankList(vec![TankInfo::new(a, vec![]), TankInfo::new(c, vec![])]),
            ]),
        );

        let lifecycle = shared.lifecycle();
        assert_eq!(lifecycle.alive(), vec![a, c]);
        assert_eq!(lifecycle.dead(), vec![b]);
    }

    #[test]
    fn test_unsupported_image_is_fatal() {
        let shared = Shared::new(None);
        run(
            &shared,
            stream(&[
                observation(TANK, 1, Observation::Image(ImagePayload::Jpeg { data: vec![0xff, 0xd8] })),
                observation(TANK, 2, Observation::Rotation(1.0)),
            ]),
        );

        assert!(matches!(shared.exit_reason(), Some(LoopExit::Failed(_))));
        // Nothing after the bad frame is applied
        assert!(shared.states.component(TANK, ComponentKind::Rotation).is_err());
    }

    #[test]
    fn test_oversized_raw_image_is_fatal() {
        let shared = Shared::new(None);
        run(
            &shared,
            stream(&[observation(
                TANK,
                1,
                Observation::Image(ImagePayload::Raw {
                    width: u32::MAX,
                    height: u32::MAX,
                    data: vec![],
                }),
            )]),
        );
        assert!(matches!(shared.exit_reason(), Some(LoopExit::Failed(_))));
        assert!(shared.states.component(TANK, ComponentKind::Image).is_err());
    }

    struct ExplodingReader;

    impl Read for ExplodingReader {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            panic!("reader exploded")
        }
    }

    #[test]
    fn test_panic_marks_loop_failed() {
        let shared = Shared::new(None);
        let joined = std::thread::scope(|s| {
            s.spawn(|| run(&shared, FrameReader::new(ExplodingReader)))
                .join()
        });

        assert!(joined.is_err());
        assert!(!shared.is_running());
        assert!(matches!(shared.exit_reason(), Some(LoopExit::Failed(_))));
        assert!(shared.queue.is_closed());
    }

    #[test]
    fn test_recorder_flushed_when_loop_stops() {
        let store = tankwar_db::SessionStore::in_memory().unwrap();
        let shared = Shared::new(Some(SessionRecorder::new().with_store(store)));
        run(&shared, stream(&[observation(TANK, 1, Observation::Reward(2.0))]));

        let recorder = shared.recorder().unwrap();
        assert_eq!(recorder.pending(), 0);
        let persisted = recorder
            .store()
            .unwrap()
            .table_len(TANK, ComponentKind::Reward)
            .unwrap();
        assert_eq!(persisted, 1);
    }

    #[test]
    fn test_garbage_frame_is_fatal() {
        let shared = Shared::new(None);
        let bytes = encode_frame(&[0xff, 0xff, 0xff, 0xff, 0xff]);
        run(&shared, FrameReader::new(Cursor::new(bytes)));
        assert!(matches!(shared.exit_reason(), Some(LoopExit::Failed(_))));
    }

    #[test]
    fn test_stop_requested_before_start() {
        let shared = Shared::new(None);
        shared.request_stop();
        run(&shared, stream(&[ServerMessage::TankAssigned(TANK)]));
        assert_eq!(shared.exit_reason(), Some(LoopExit::Closed));
        assert!(shared.queue.is_empty());
    }
}
