//! End-to-end conversion of a `.vox` file into renderer records.

use std::path::PathBuf;

use fastvox_core::constants::DEFAULT_MAX_DEPTH;
use fastvox_core::{Result, VoxelModel};
use fastvox_octree::{
    CompileStats, CompiledTree, Compiler, InsertReport, MaterialResolver, Octree, RandomMaterials,
    SeededMaterials, MAX_NODES,
};
use glam::Vec3;
use tracing::info;

use crate::sink::{encode, write_output, OutputFormat};
use crate::source::load_vox;

/// Input file read when none is given.
pub const DEFAULT_INPUT: &str = "test.vox";
/// Output file written when none is given.
pub const DEFAULT_OUTPUT: &str = "scene_vox.json";

/// Conversion configuration.
#[derive(Debug, Clone)]
pub struct ConvertConfig {
    /// `.vox` file to read.
    pub input: PathBuf,
    /// File to write.
    pub output: PathBuf,
    /// Model to convert from a multi-model file.
    pub model_index: usize,
    /// Deepest octree accepted.
    pub max_depth: u32,
    /// Most octree nodes allocated before giving up.
    pub node_limit: usize,
    /// World-space center of the root node.
    pub anchor: Vec3,
    /// Seed for placeholder materials (None for thread-local randomness).
    pub seed: Option<u64>,
    /// Compile top-level octants on the rayon pool.
    pub parallel: bool,
    pub format: OutputFormat,
    /// Indent JSON output.
    pub pretty: bool,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from(DEFAULT_INPUT),
            output: PathBuf::from(DEFAULT_OUTPUT),
            model_index: 0,
            max_depth: DEFAULT_MAX_DEPTH,
            node_limit: MAX_NODES,
            anchor: Vec3::ZERO,
            seed: None,
            parallel: false,
            format: OutputFormat::Json,
            pretty: false,
        }
    }
}

impl ConvertConfig {
    /// Create a new config for the given input and output files.
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            ..Default::default()
        }
    }

    /// Select the model to convert.
    pub fn with_model(mut self, model_index: usize) -> Self {
        self.model_index = model_index;
        self
    }

    /// Set the depth limit.
    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Cap the octree arena.
    pub fn with_node_limit(mut self, node_limit: usize) -> Self {
        self.node_limit = node_limit;
        self
    }

    /// Set the root center.
    pub fn with_anchor(mut self, anchor: Vec3) -> Self {
        self.anchor = anchor;
        self
    }

    /// Use seeded placeholder materials.
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Enable or disable parallel compilation.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Set the output encoding.
    pub fn with_format(mut self, format: OutputFormat, pretty: bool) -> Self {
        self.format = format;
        self.pretty = pretty;
        self
    }
}

/// Summary of a finished conversion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConvertReport {
    /// Size of the octree root.
    pub root_size: u32,
    /// Points that reached a leaf.
    pub inserted: usize,
    /// Points dropped on a split plane.
    pub dropped: usize,
    pub stats: CompileStats,
    /// Size of the written file.
    pub bytes_written: usize,
}

/// Build and compile the octree for a decoded model.
pub fn compile_model(
    model: &VoxelModel,
    config: &ConvertConfig,
) -> Result<(CompiledTree, InsertReport)> {
    let mut octree = Octree::with_max_depth(model.root_size(), config.max_depth)?
        .with_node_limit(config.node_limit);
    let inserted = octree.insert_all(model.points.iter().copied())?;

    let tree = match config.seed {
        Some(seed) => run_compiler(&octree, &SeededMaterials::new(seed), config),
        None => run_compiler(&octree, &RandomMaterials, config),
    };
    Ok((tree, inserted))
}

fn run_compiler<R: MaterialResolver + Sync>(
    octree: &Octree,
    resolver: &R,
    config: &ConvertConfig,
) -> CompiledTree {
    let compiler = Compiler::new(octree, resolver).with_anchor(config.anchor);
    if config.parallel {
        compiler.compile_parallel()
    } else {
        compiler.compile()
    }
}

/// Read, build, compile and write.
///
/// The output is encoded in memory before the file is touched, so a failed
/// run never leaves a partial file behind.
pub fn convert(config: &ConvertConfig) -> Result<ConvertReport> {
    info!("Loading {}", config.input.display());
    let model = load_vox(&config.input, config.model_index)?;
    info!(
        "Model {}: {} voxels, extent {}, root size {}",
        config.model_index,
        model.len(),
        model.size,
        model.root_size()
    );

    let (tree, inserted) = compile_model(&model, config)?;
    let stats = tree.stats();
    info!(
        "Compiled {} records ({} internal, {} leaf, {} empty)",
        stats.total(),
        stats.internal,
        stats.leaf,
        stats.empty
    );

    let bytes = encode(&tree, config.format, config.pretty)?;
    write_output(&config.output, &bytes)?;
    info!("Wrote {} bytes to {}", bytes.len(), config.output.display());

    Ok(ConvertReport {
        root_size: model.root_size(),
        inserted: inserted.inserted,
        dropped: inserted.dropped.len(),
        stats,
        bytes_written: bytes.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::vox_bytes;
    use fastvox_core::{CompiledRecord, Error};
    use glam::UVec3;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("fastvox-{}-{name}", std::process::id()))
    }

    #[test]
    fn default_config_uses_fixed_names() {
        let config = ConvertConfig::default();
        assert_eq!(config.input, PathBuf::from("test.vox"));
        assert_eq!(config.output, PathBuf::from("scene_vox.json"));
        assert_eq!(config.format, OutputFormat::Json);
        assert!(!config.parallel);
    }

    #[test]
    fn seeded_compilation_is_reproducible() {
        let model = VoxelModel::new(
            UVec3::splat(8),
            vec![UVec3::ZERO, UVec3::new(7, 7, 7), UVec3::new(0, 7, 0)],
        );
        let config = ConvertConfig::default().with_seed(Some(42));

        let (a, report) = compile_model(&model, &config).unwrap();
        let (b, _) = compile_model(&model, &config).unwrap();
        assert_eq!(a, b);
        assert_eq!(report.inserted, 3);
        assert_eq!(a.stats().leaf, 3);
    }

    #[test]
    fn seeded_parallel_matches_seeded_serial() {
        let points: Vec<UVec3> = (0..16)
            .flat_map(|x| (0..16).map(move |y| UVec3::new(x, y, (x + 2 * y) % 16)))
            .collect();
        let model = VoxelModel::new(UVec3::splat(16), points);
        let serial = ConvertConfig::default().with_seed(Some(42));
        let parallel = serial.clone().with_parallel(true);

        let (expected, _) = compile_model(&model, &serial).unwrap();
        for _ in 0..4 {
            let (tree, _) = compile_model(&model, &parallel).unwrap();
            assert_eq!(tree, expected);
        }
    }

    #[test]
    fn node_limit_is_enforced() {
        let model = VoxelModel::new(UVec3::splat(8), vec![UVec3::ZERO]);
        let config = ConvertConfig::default().with_node_limit(16);
        let err = compile_model(&model, &config).unwrap_err();
        assert!(matches!(err, Error::ArenaFull { nodes: 9, limit: 16 }));
    }

    #[test]
    fn empty_model_compiles_to_root_only() {
        let model = VoxelModel::new(UVec3::splat(4), Vec::new());
        let (tree, report) = compile_model(&model, &ConvertConfig::default()).unwrap();

        assert_eq!(report.total(), 0);
        assert_eq!(tree.len(), 1);
        assert!(tree.root().is_empty);
        assert!(!tree.root().is_leaf);
    }

    #[test]
    fn depth_limit_is_enforced() {
        let model = VoxelModel::new(UVec3::new(200, 1, 1), vec![UVec3::ZERO]);
        let config = ConvertConfig::default().with_max_depth(4);
        let err = compile_model(&model, &config).unwrap_err();
        assert!(matches!(
            err,
            Error::DepthLimitExceeded {
                root_size: 256,
                depth: 8,
                max_depth: 4,
            }
        ));
    }

    #[test]
    fn converts_vox_file_to_json() {
        let input = scratch_path("scene.vox");
        let output = scratch_path("scene.json");
        std::fs::write(&input, vox_bytes([4, 4, 4], &[[0, 0, 0], [3, 3, 3], [2, 0, 0]])).unwrap();

        let config = ConvertConfig::new(&input, &output).with_parallel(true);
        let report = convert(&config).unwrap();

        assert_eq!(report.root_size, 4);
        assert_eq!(report.inserted, 2);
        assert_eq!(report.dropped, 1);
        assert_eq!(report.stats.leaf, 2);

        let written = std::fs::read(&output).unwrap();
        assert_eq!(written.len(), report.bytes_written);
        let records: Vec<CompiledRecord> = serde_json::from_slice(&written).unwrap();
        let root = records.last().unwrap();
        assert!(root.is_internal());
        assert_eq!(root.size, 4.0);
        assert_eq!(records.len(), report.stats.total());

        std::fs::remove_file(&input).ok();
        std::fs::remove_file(&output).ok();
    }

    #[test]
    fn missing_input_writes_nothing() {
        let output = scratch_path("never.json");
        let config = ConvertConfig::new(scratch_path("missing.vox"), &output);

        let err = convert(&config).unwrap_err();
        assert!(matches!(err, Error::InputDecode(_)));
        assert!(!output.exists());
    }
}
