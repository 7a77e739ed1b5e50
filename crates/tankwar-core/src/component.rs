//! Component kinds and decoded component values

use crate::{EntityId, Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Name of a per-entity attribute the simulation reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    /// Last camera frame
    Image,
    /// Reward accumulated since the last harvest
    Reward,
    /// Last known (x, y) position
    Position,
    /// Last known heading in radians
    Rotation,
    /// Echo of the tank engine controls the server applied
    TankControls,
    /// Echo of the turret controls the server applied
    TurretControls,
    /// Turret entities mounted on a tank (static metadata)
    Turrets,
}

impl ComponentKind {
    /// Every component kind, in declaration order
    pub const ALL: [ComponentKind; 7] = [
        ComponentKind::Image,
        ComponentKind::Reward,
        ComponentKind::Position,
        ComponentKind::Rotation,
        ComponentKind::TankControls,
        ComponentKind::TurretControls,
        ComponentKind::Turrets,
    ];

    /// Stable name used in logs and storage keys
    pub fn name(self) -> &'static str {
        match self {
            ComponentKind::Image => "image",
            ComponentKind::Reward => "reward",
            ComponentKind::Position => "position",
            ComponentKind::Rotation => "rotation",
            ComponentKind::TankControls => "tank_controls",
            ComponentKind::TurretControls => "turret_controls",
            ComponentKind::Turrets => "turrets",
        }
    }

    /// Whether new samples add to the stored value instead of replacing it
    pub fn is_additive(self) -> bool {
        matches!(self, ComponentKind::Reward)
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ComponentKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ComponentKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| Error::UnknownComponent(s.to_string()))
    }
}

/// A decoded RGBA8 image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    width: u32,
    height: u32,
    /// Row-major RGBA bytes, `width * height * 4` long
    pixels: Vec<u8>,
}

impl Image {
    /// Wrap a raw RGBA buffer, checking it matches the dimensions
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(4))
            .ok_or(Error::ImageTooLarge { width, height })?;
        if pixels.len() != expected {
            return Err(Error::ImageSize {
                width,
                height,
                expected,
                got: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA bytes
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Consume the image and return its RGBA bytes
    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    /// RGBA value at (x, y), or `None` outside the image
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        let px = &self.pixels[offset..offset + 4];
        Some([px[0], px[1], px[2], px[3]])
    }
}

/// A 2D point in world coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Engine throttle for a tank, each side in `[-1, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TankControls {
    pub left_engine: f32,
    pub right_engine: f32,
}

impl TankControls {
    pub fn new(left_engine: f32, right_engine: f32) -> Self {
        Self {
            left_engine,
            right_engine,
        }
    }
}

/// Turret aim and trigger
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TurretControls {
    /// Rotation speed in `[-1, 1]`
    pub rotation: f32,
    pub fire: bool,
}

impl TurretControls {
    pub fn new(rotation: f32, fire: bool) -> Self {
        Self { rotation, fire }
    }
}

/// Controls for any controllable entity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Controls {
    Tank(TankControls),
    Turret(TurretControls),
}

impl From<TankControls> for Controls {
    fn from(controls: TankControls) -> Self {
        Controls::Tank(controls)
    }
}

impl From<TurretControls> for Controls {
    fn from(controls: TurretControls) -> Self {
        Controls::Turret(controls)
    }
}

/// The latest decoded value of a component
///
/// Each variant is the fixed value schema of one `ComponentKind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ComponentValue {
    Image(Image),
    Reward(f64),
    Position(Vec2),
    /// Heading in radians
    Rotation(f32),
    TankControls(TankControls),
    TurretControls(TurretControls),
    Turrets(Vec<EntityId>),
}

impl ComponentValue {
    /// The component kind this value belongs to
    pub fn kind(&self) -> ComponentKind {
        match self {
            ComponentValue::Image(_) => ComponentKind::Image,
            ComponentValue::Reward(_) => ComponentKind::Reward,
            ComponentValue::Position(_) => ComponentKind::Position,
            ComponentValue::Rotation(_) => ComponentKind::Rotation,
            ComponentValue::TankControls(_) => ComponentKind::TankControls,
            ComponentValue::TurretControls(_) => ComponentKind::TurretControls,
            ComponentValue::Turrets(_) => ComponentKind::Turrets,
        }
    }

    /// Get the type name of this value
    pub fn type_name(&self) -> &'static str {
        match self {
            ComponentValue::Image(_) => "image",
            ComponentValue::Reward(_) => "float",
            ComponentValue::Position(_) => "vec2",
            ComponentValue::Rotation(_) => "float",
            ComponentValue::TankControls(_) => "tank_controls",
            ComponentValue::TurretControls(_) => "turret_controls",
            ComponentValue::Turrets(_) => "entity_list",
        }
    }

    pub fn as_image(&self) -> Option<&Image> {
        match self {
            ComponentValue::Image(image) => Some(image),
            _ => None,
        }
    }

    pub fn as_reward(&self) -> Option<f64> {
        match self {
            ComponentValue::Reward(r) => Some(*r),
            _ => None,
        }
    }

    pub fn as_position(&self) -> Option<Vec2> {
        match self {
            ComponentValue::Position(p) => Some(*p),
            _ => None,
        }
    }

    pub fn as_rotation(&self) -> Option<f32> {
        match self {
            ComponentValue::Rotation(r) => Some(*r),
            _ => None,
        }
    }

    pub fn as_tank_controls(&self) -> Option<TankControls> {
        match self {
            ComponentValue::TankControls(c) => Some(*c),
            _ => None,
        }
    }

    pub fn as_turret_controls(&self) -> Option<TurretControls> {
        match self {
            ComponentValue::TurretControls(c) => Some(*c),
            _ => None,
        }
    }

    pub fn as_turrets(&self) -> Option<&[EntityId]> {
        match self {
            ComponentValue::Turrets(turrets) => Some(turrets),
            _ => None,
        }
    }
}

impl From<Image> for ComponentValue {
    fn from(image: Image) -> Self {
        ComponentValue::Image(image)
    }
}

impl From<Vec2> for ComponentValue {
    fn from(p: Vec2) -> Self {
        ComponentValue::Position(p)
    }
}

impl From<TankControls> for ComponentValue {
    fn from(c: TankControls) -> Self {
        ComponentValue::TankControls(c)
    }
}

impl From<TurretControls> for ComponentValue {
    fn from(c: TurretControls) -> Self {
        ComponentValue::TurretControls(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_roundtrip() {
        for kind in ComponentKind::ALL {
            assert_eq!(kind.name().parse::<ComponentKind>().unwrap(), kind);
        }
        assert_eq!(
            "sensors".parse::<ComponentKind>(),
            Err(Error::UnknownComponent("sensors".into()))
        );
    }

    #[test]
    fn test_only_reward_is_additive() {
        let additive: Vec<_> = ComponentKind::ALL
            .into_iter()
            .filter(|k| k.is_additive())
            .collect();
        assert_eq!(additive, vec![ComponentKind::Reward]);
    }

    #[test]
    fn test_image_size_checked() {
        let image = Image::from_rgba(2, 1, vec![1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        assert_eq!(image.pixel(1, 0), Some([5, 6, 7, 8]));
        assert_eq!(image.pixel(2, 0), None);

        let err = Image::from_rgba(2, 2, vec![0; 3]).unwrap_err();
        assert!(matches!(err, Error::ImageSize { expected: 16, got: 3, .. }));
    }

    #[test]
    fn test_image_dimensions_overflow() {
        let err = Image::from_rgba(u32::MAX, u32::MAX, Vec::new()).unwrap_err();
        assert_eq!(
            err,
            Error::ImageTooLarge {
                width: u32::MAX,
                height: u32::MAX
            }
        );

        // Product wraps to zero without the check
        let err = Image::from_rgba(1 << 31, 1 << 31, Vec::new()).unwrap_err();
        assert!(matches!(err, Error::ImageTooLarge { .. }));
    }

    #[test]
    fn test_value_kind() {
        assert_eq!(ComponentValue::Reward(1.0).kind(), ComponentKind::Reward);
        assert_eq!(
            ComponentValue::Turrets(vec![EntityId::new(1, 0)]).kind(),
            ComponentKind::Turrets
        );
        assert_eq!(
            ComponentValue::from(Vec2::new(1.0, 2.0)).as_position(),
            Some(Vec2::new(1.0, 2.0))
        );
        assert_eq!(ComponentValue::Rotation(0.5).as_reward(), None);
    }
}
