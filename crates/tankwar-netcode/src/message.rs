//! Wire messages exchanged with the simulation
//!
//! Each frame carries one bincode-encoded message. Variants are matched by
//! position, so new variants must only ever be appended.

use crate::Result;
use serde::{Deserialize, Serialize};
use tankwar_core::{ComponentKind, EntityId, TankControls, TurretControls};

/// Observation streams a client can request or subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObservationKind {
    Image,
    Reward,
    Position,
    Rotation,
    TankControls,
    TurretControls,
}

impl ObservationKind {
    /// Component the decoded observation is stored under
    pub fn component(self) -> ComponentKind {
        match self {
            ObservationKind::Image => ComponentKind::Image,
            ObservationKind::Reward => ComponentKind::Reward,
            ObservationKind::Position => ComponentKind::Position,
            ObservationKind::Rotation => ComponentKind::Rotation,
            ObservationKind::TankControls => ComponentKind::TankControls,
            ObservationKind::TurretControls => ComponentKind::TurretControls,
        }
    }
}

/// Messages sent from the client to the simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClientMessage {
    /// Ask for a new tank; answered by `TankAssigned`
    SpawnTankRequest,
    TankControlUpdate {
        tank: EntityId,
        controls: TankControls,
    },
    TurretControlUpdate {
        turret: EntityId,
        controls: TurretControls,
    },
    /// One-shot observation
    ObservationRequest {
        entity: EntityId,
        kind: ObservationKind,
    },
    /// Stream observations, at most once per `cooldown_secs` when set
    SubscriptionRequest {
        entity: EntityId,
        kind: ObservationKind,
        cooldown_secs: Option<f32>,
    },
    /// Ask for the authoritative list of live tanks
    TankListRequest,
}

/// A tank as announced by the simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TankInfo {
    pub tank_id: EntityId,
    pub turrets: Vec<EntityId>,
}

impl TankInfo {
    pub fn new(tank_id: EntityId, turrets: Vec<EntityId>) -> Self {
        Self { tank_id, turrets }
    }
}

/// Image payload as sent on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ImagePayload {
    /// Uncompressed RGBA8, row-major
    Raw {
        width: u32,
        height: u32,
        data: Vec<u8>,
    },
    /// PNG file bytes
    Png { data: Vec<u8> },
    /// JPEG file bytes
    Jpeg { data: Vec<u8> },
}

impl ImagePayload {
    /// Encoding name for diagnostics
    pub fn encoding(&self) -> &'static str {
        match self {
            ImagePayload::Raw { .. } => "raw",
            ImagePayload::Png { .. } => "png",
            ImagePayload::Jpeg { .. } => "jpeg",
        }
    }
}

/// Observation payload, tagged by kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Observation {
    Image(ImagePayload),
    Reward(f32),
    Position { x: f32, y: f32 },
    /// Heading in radians
    Rotation(f32),
    TankControls(TankControls),
    TurretControls(TurretControls),
}

impl Observation {
    pub fn kind(&self) -> ObservationKind {
        match self {
            Observation::Image(_) => ObservationKind::Image,
            Observation::Reward(_) => ObservationKind::Reward,
            Observation::Position { .. } => ObservationKind::Position,
            Observation::Rotation(_) => ObservationKind::Rotation,
            Observation::TankControls(_) => ObservationKind::TankControls,
            Observation::TurretControls(_) => ObservationKind::TurretControls,
        }
    }
}

/// A timestamped observation of one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationUpdate {
    pub entity: EntityId,
    /// Server time of the sample
    pub timestamp: u64,
    pub observation: Observation,
}

/// Messages sent from the simulation to the client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ServerMessage {
    TankSpawned(TankInfo),
    TankDied(EntityId),
    /// A tank this client now controls
    TankAssigned(EntityId),
    /// Authoritative list of live tanks
    TankList(Vec<TankInfo>),
    BallList(Vec<EntityId>),
    ObservationUpdate(ObservationUpdate),
}

impl ServerMessage {
    /// Variant name for diagnostics
    pub fn name(&self) -> &'static str {
        match self {
            ServerMessage::TankSpawned(_) => "tank_spawned",
            ServerMessage::TankDied(_) => "tank_died",
            ServerMessage::TankAssigned(_) => "tank_assigned",
            ServerMessage::TankList(_) => "tank_list",
            ServerMessage::BallList(_) => "ball_list",
            ServerMessage::ObservationUpdate(_) => "observation_update",
        }
    }
}

/// Serialize a message into a frame payload
pub fn encode_message<T: Serialize>(msg: &T) -> Result<Vec<u8>> {
    Ok(bincode::serialize(msg)?)
}

/// Deserialize a frame payload
pub fn decode_message<T: for<'de> Deserialize<'de>>(payload: &[u8]) -> Result<T> {
    Ok(bincode::deserialize(payload)?)
}
