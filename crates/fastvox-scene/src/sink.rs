//! Output encoding for the flattened octree.

use std::path::Path;

use fastvox_core::{CompiledRecord, Error, Result};
use fastvox_octree::CompiledTree;

/// Encoding of the output file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON array of records in the renderer's scene format
    #[default]
    Json,
    /// Raw little-endian `GpuNode` array, ready for a storage buffer upload
    Gpu,
}

/// Serialize records as a JSON array.
pub fn encode_json(records: &[CompiledRecord], pretty: bool) -> Result<Vec<u8>> {
    let encoded = if pretty {
        serde_json::to_vec_pretty(records)
    } else {
        serde_json::to_vec(records)
    };
    encoded.map_err(|e| Error::Serialization(e.to_string()))
}

/// Raw bytes of the GPU node buffer.
pub fn encode_gpu(tree: &CompiledTree) -> Vec<u8> {
    bytemuck::cast_slice(&tree.to_gpu_buffer()).to_vec()
}

/// Encode a compiled tree in the given format.
pub fn encode(tree: &CompiledTree, format: OutputFormat, pretty: bool) -> Result<Vec<u8>> {
    match format {
        OutputFormat::Json => encode_json(tree.records(), pretty),
        OutputFormat::Gpu => Ok(encode_gpu(tree)),
    }
}

/// Write fully encoded output in one go.
pub fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes).map_err(|source| Error::OutputWrite {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use fastvox_core::{GpuNode, Material};
    use fastvox_octree::{Compiler, Octree, UniformMaterials};
    use glam::UVec3;

    fn small_tree() -> CompiledTree {
        let mut octree = Octree::new(2).unwrap();
        octree.insert(UVec3::ZERO).unwrap();
        Compiler::new(&octree, &UniformMaterials(Material::default())).compile()
    }

    #[test]
    fn json_is_record_array() {
        let tree = small_tree();
        let bytes = encode(&tree, OutputFormat::Json, false).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        let array = value.as_array().unwrap();
        assert_eq!(array.len(), 9);
        assert_eq!(array[1]["is_leaf"], 1);
        assert_eq!(array[0]["is_none"], 1);
        assert_eq!(array[8]["childs"], serde_json::json!([0, 1, 2, 3, 4, 5, 6, 7]));
        assert_eq!(array[8]["size"], 2.0);
    }

    #[test]
    fn json_decodes_back_to_records() {
        let tree = small_tree();
        let bytes = encode_json(tree.records(), true).unwrap();
        let records: Vec<CompiledRecord> = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(records, tree.records());
    }

    #[test]
    fn gpu_bytes_are_node_sized() {
        let tree = small_tree();
        let bytes = encode(&tree, OutputFormat::Gpu, false).unwrap();
        assert_eq!(bytes.len(), 9 * std::mem::size_of::<GpuNode>());

        let stride = std::mem::size_of::<GpuNode>();
        let root: GpuNode = bytemuck::pod_read_unaligned(&bytes[8 * stride..]);
        assert_eq!(root.children, [0, 1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(root.is_none, 0);
    }

    #[test]
    fn unwritable_path_is_output_error() {
        let err = write_output(Path::new("/nonexistent-dir/fastvox/out.json"), b"[]").unwrap_err();
        assert!(matches!(err, Error::OutputWrite { .. }));
    }
}
