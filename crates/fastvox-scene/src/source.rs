//! `.vox` decoding via `dot_vox`.

use std::path::Path;

use dot_vox::DotVoxData;
use fastvox_core::{Error, Result, VoxelModel};
use glam::UVec3;
use tracing::debug;

/// Load model `model_index` from a `.vox` file.
pub fn load_vox(path: &Path, model_index: usize) -> Result<VoxelModel> {
    let name = path
        .to_str()
        .ok_or_else(|| Error::InputDecode(format!("non UTF-8 path {}", path.display())))?;
    let data = dot_vox::load(name)
        .map_err(|e| Error::InputDecode(format!("{}: {e}", path.display())))?;
    select_model(&data, model_index)
}

/// Decode model `model_index` from `.vox` bytes.
pub fn decode_vox(bytes: &[u8], model_index: usize) -> Result<VoxelModel> {
    let data = dot_vox::load_bytes(bytes).map_err(|e| Error::InputDecode(e.to_string()))?;
    select_model(&data, model_index)
}

/// Convert a decoded `dot_vox` model. Palette indices are discarded.
pub fn model_from_vox(model: &dot_vox::Model) -> VoxelModel {
    let size = UVec3::new(model.size.x, model.size.y, model.size.z);
    let points = model
        .voxels
        .iter()
        .map(|v| UVec3::new(v.x.into(), v.y.into(), v.z.into()))
        .collect();
    VoxelModel::new(size, points)
}

fn select_model(data: &DotVoxData, model_index: usize) -> Result<VoxelModel> {
    let model = data.models.get(model_index).ok_or_else(|| {
        Error::InputDecode(format!(
            "model {model_index} not found, file has {} models",
            data.models.len()
        ))
    })?;

    let model = model_from_vox(model);
    debug!(
        "Decoded model {model_index}: size {}, {} voxels",
        model.size,
        model.len()
    );
    Ok(model)
}

/// Build a minimal single-model `.vox` file.
#[cfg(test)]
pub(crate) fn vox_bytes(size: [u32; 3], voxels: &[[u8; 3]]) -> Vec<u8> {
    fn chunk(out: &mut Vec<u8>, id: &[u8; 4], content: &[u8], children: u32) {
        out.extend_from_slice(id);
        out.extend_from_slice(&(content.len() as u32).to_le_bytes());
        out.extend_from_slice(&children.to_le_bytes());
        out.extend_from_slice(content);
    }

    let mut size_content = Vec::new();
    for extent in size {
        size_content.extend_from_slice(&extent.to_le_bytes());
    }

    let mut xyzi_content = Vec::new();
    xyzi_content.extend_from_slice(&(voxels.len() as u32).to_le_bytes());
    for [x, y, z] in voxels {
        xyzi_content.extend_from_slice(&[*x, *y, *z, 1]);
    }

    let mut children = Vec::new();
    chunk(&mut children, b"SIZE", &size_content, 0);
    chunk(&mut children, b"XYZI", &xyzi_content, 0);

    let mut out = Vec::new();
    out.extend_from_slice(b"VOX ");
    out.extend_from_slice(&150u32.to_le_bytes());
    chunk(&mut out, b"MAIN", &[], children.len() as u32);
    out.extend_from_slice(&children);
    out
}
