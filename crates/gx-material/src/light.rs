//! Lights referenced by a channel's `light_mask`.
//!
//! Grounded in the original source's `GXLightObj`/`Light` record
//! (`LibCube/GX/Shader/GXMaterial.hpp`): position/direction in world
//! space, a distance-attenuation and angle-attenuation coefficient triple
//! each, and a color.

use glam::Vec3;
use ordered_float::OrderedFloat;

#[derive(Debug, Clone, Copy)]
pub struct Light {
    pub position: Vec3,
    pub direction: Vec3,
    pub dist_atten: Vec3,
    pub cos_atten: Vec3,
    pub color: color::Rgba8,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            direction: Vec3::Z,
            dist_atten: Vec3::ZERO,
            cos_atten: Vec3::ZERO,
            color: color::Rgba8::default(),
        }
    }
}

impl PartialEq for Light {
    fn eq(&self, other: &Self) -> bool {
        fn key(v: Vec3) -> [OrderedFloat<f32>; 3] {
            [OrderedFloat(v.x), OrderedFloat(v.y), OrderedFloat(v.z)]
        }
        key(self.position) == key(other.position)
            && key(self.direction) == key(other.direction)
            && key(self.dist_atten) == key(other.dist_atten)
            && key(self.cos_atten) == key(other.cos_atten)
            && self.color == other.color
    }
}

impl Eq for Light {}
