//! Scene I/O for the fastvox octree compiler.
//!
//! Reads MagicaVoxel `.vox` models through `dot_vox`, runs them through the
//! octree builder and compiler, and writes the flattened records for the
//! renderer.

pub mod pipeline;
pub mod sink;
pub mod source;

pub use pipeline::{
    compile_model, convert, ConvertConfig, ConvertReport, DEFAULT_INPUT, DEFAULT_OUTPUT,
};
pub use sink::{encode, encode_gpu, encode_json, write_output, OutputFormat};
pub use source::{decode_vox, load_vox, model_from_vox};
