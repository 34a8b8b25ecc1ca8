//! Conversions between [PackedRotation] and signed angles.
//!
//! Angles use 4096 units for a full revolution.
//! Decoded angles are multiples of 4 in the range `-2048..=2044`.
use glam::Quat;
use mch_lib::formats::anim::PackedRotation;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The number of angle units in a full revolution.
pub const UNITS_PER_TURN: i32 = 4096;

/// Euler angles for a single bone in 1/4096 turns.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rotation {
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

impl Rotation {
    pub fn new(x: i16, y: i16, z: i16) -> Self {
        Self { x, y, z }
    }

    /// Creates a rotation from arbitrary angles by wrapping each angle to 12 bits
    /// and removing the 2 bits that can't be stored.
    pub fn wrapped(x: i32, y: i32, z: i32) -> Self {
        Self {
            x: wrap_angle(x),
            y: wrap_angle(y),
            z: wrap_angle(z),
        }
    }

    /// The angles for the X, Y, and Z axes in radians.
    pub fn to_radians(&self) -> [f32; 3] {
        [
            angle_to_radians(self.x),
            angle_to_radians(self.y),
            angle_to_radians(self.z),
        ]
    }

    /// The rotation using XYZ Euler angles.
    /// The X rotation is applied first.
    pub fn to_quat(&self) -> Quat {
        let [x, y, z] = self.to_radians();
        Quat::from_rotation_z(z) * Quat::from_rotation_y(y) * Quat::from_rotation_x(x)
    }
}

impl From<PackedRotation> for Rotation {
    fn from(r: PackedRotation) -> Self {
        Self {
            x: decode_angle(r.x_low(), r.x_high()),
            y: decode_angle(r.y_low(), r.y_high()),
            z: decode_angle(r.z_low(), r.z_high()),
        }
    }
}

impl From<Rotation> for PackedRotation {
    fn from(r: Rotation) -> Self {
        let (x_low, x_high) = encode_angle(r.x as i32);
        let (y_low, y_high) = encode_angle(r.y as i32);
        let (z_low, z_high) = encode_angle(r.z as i32);

        PackedRotation::new()
            .with_z_low(z_low)
            .with_x_low(x_low)
            .with_y_low(y_low)
            .with_z_high(z_high)
            .with_x_high(x_high)
            .with_y_high(y_high)
    }
}

/// Decodes the 4 bytes for a bone rotation.
pub fn decode_rotation(bytes: [u8; 4]) -> Rotation {
    PackedRotation::from_bytes(bytes).into()
}

/// Encodes a bone rotation. The unused bits are set to zero.
pub fn encode_rotation(rotation: Rotation) -> [u8; 4] {
    PackedRotation::from(rotation).into_bytes()
}

fn decode_angle(low: u8, high: u8) -> i16 {
    let angle = ((((high & 0x3) as i32) << 8) | low as i32) << 2;
    // Angles use 12 bit two's complement.
    if angle >= 0x800 {
        (angle - 0x1000) as i16
    } else {
        angle as i16
    }
}

fn encode_angle(angle: i32) -> (u8, u8) {
    let bits = (angle & 0xFFF) >> 2;
    ((bits & 0xFF) as u8, ((bits >> 8) & 0x3) as u8)
}

fn wrap_angle(angle: i32) -> i16 {
    let (low, high) = encode_angle(angle);
    decode_angle(low, high)
}

fn angle_to_radians(angle: i16) -> f32 {
    angle as f32 * std::f32::consts::TAU / UNITS_PER_TURN as f32
}
