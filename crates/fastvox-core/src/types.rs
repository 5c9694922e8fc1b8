//! Flattened octree records and renderer materials.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::constants::CHILD_COUNT;

/// Orientation written into every record.
pub const IDENTITY_ROTATION: [[f32; 3]; 3] = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

/// Child index stored in every slot of a terminal record.
///
/// Equals the index of the first emitted record, so consumers must check
/// `is_leaf`/`is_none` before following child links.
pub const NULL_CHILD: u32 = 0;

/// Optical surface parameters consumed by the path tracer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// Emitted radiance (RGB). Serialized as `emmitance` for the renderer.
    #[serde(rename = "emmitance")]
    pub emittance: [f32; 3],
    /// Surface albedo (RGB)
    pub reflectance: [f32; 3],
    /// Roughness (0.0 = mirror)
    pub roughness: f32,
    /// Opacity
    pub opacity: f32,
}

impl Material {
    /// Material written for every internal node.
    pub const INTERNAL: Self = Self {
        emittance: [0.0, 0.0, 0.0],
        reflectance: [1.0, 1.0, 1.0],
        roughness: 0.0,
        opacity: 0.0,
    };

    /// Create a material with zero roughness and opacity.
    #[inline]
    pub const fn new(emittance: [f32; 3], reflectance: [f32; 3]) -> Self {
        Self {
            emittance,
            reflectance,
            roughness: 0.0,
            opacity: 0.0,
        }
    }

    /// Convert to GPU format.
    pub const fn to_gpu(&self) -> GpuMaterial {
        let [er, eg, eb] = self.emittance;
        let [rr, rg, rb] = self.reflectance;
        GpuMaterial {
            emittance: [er, eg, eb, 0.0],
            reflectance: [rr, rg, rb, 0.0],
            roughness: self.roughness,
            opacity: self.opacity,
        }
    }
}

/// One node of the flattened octree.
///
/// Records reference their children by index into the record sequence they
/// were emitted into. Field names on the wire follow the renderer's scene
/// format (`pos`, `rot`, `childs`, `is_none`).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompiledRecord {
    /// Node center in world space
    #[serde(rename = "pos")]
    pub position: [f32; 3],
    /// Node orientation (always identity)
    #[serde(rename = "rot")]
    pub orientation: [[f32; 3]; 3],
    /// Half-extent of the node
    pub size: f32,
    pub material: Material,
    /// Record indices of the eight children, or [`NULL_CHILD`] for terminals
    #[serde(rename = "childs")]
    pub child_indices: [u32; CHILD_COUNT],
    #[serde(with = "flag")]
    pub is_leaf: bool,
    #[serde(rename = "is_none", with = "flag")]
    pub is_empty: bool,
}

impl CompiledRecord {
    /// Create a record for a node without children.
    pub fn terminal(position: Vec3, size: u32, material: Material, is_leaf: bool) -> Self {
        Self {
            position: position.to_array(),
            orientation: IDENTITY_ROTATION,
            size: size as f32,
            material,
            child_indices: [NULL_CHILD; CHILD_COUNT],
            is_leaf,
            is_empty: !is_leaf,
        }
    }

    /// Create a record for an internal node whose children were already emitted.
    pub fn internal(position: Vec3, size: u32, child_indices: [u32; CHILD_COUNT]) -> Self {
        Self {
            position: position.to_array(),
            orientation: IDENTITY_ROTATION,
            size: size as f32,
            material: Material::INTERNAL,
            child_indices,
            is_leaf: false,
            is_empty: false,
        }
    }

    /// Node center as a vector.
    #[inline]
    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }

    /// Returns true if this record links to children.
    #[inline]
    pub const fn is_internal(&self) -> bool {
        !self.is_leaf && !self.is_empty
    }

    /// Shift every child link by `offset`.
    ///
    /// Terminal records keep their [`NULL_CHILD`] sentinels.
    pub fn rebase(&mut self, offset: u32) {
        if self.is_internal() {
            for index in &mut self.child_indices {
                *index += offset;
            }
        }
    }

    /// Convert to GPU format.
    pub fn to_gpu(&self) -> GpuNode {
        let mut rotation = [[0.0; 4]; 4];
        for (row, src) in rotation.iter_mut().zip(self.orientation) {
            row[..3].copy_from_slice(&src);
        }
        rotation[3][3] = 1.0;

        let [x, y, z] = self.position;
        GpuNode {
            position: [x, y, z, 0.0],
            rotation,
            size: self.size,
            material: self.material.to_gpu(),
            children: self.child_indices,
            is_leaf: u32::from(self.is_leaf),
            is_none: u32::from(self.is_empty),
            _padding: [0; 3],
        }
    }
}

/// Material as laid out in the renderer's storage buffer.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct GpuMaterial {
    pub emittance: [f32; 4],
    pub reflectance: [f32; 4],
    pub roughness: f32,
    pub opacity: f32,
}

/// GPU-friendly node representation (176 bytes).
///
/// The tail padding keeps the array stride a multiple of 16.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct GpuNode {
    /// Center (xyz, w unused)
    pub position: [f32; 4],
    /// Rotation as a homogeneous 4x4 matrix
    pub rotation: [[f32; 4]; 4],
    pub size: f32,
    pub material: GpuMaterial,
    pub children: [u32; CHILD_COUNT],
    pub is_leaf: u32,
    pub is_none: u32,
    pub _padding: [u32; 3],
}

/// Serializes flags as `0`/`1` integers.
mod flag {
    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(u32::from(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        Ok(u32::deserialize(deserializer)? != 0)
    }
}
