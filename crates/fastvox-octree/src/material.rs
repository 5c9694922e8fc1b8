//! Material assignment for terminal records.
//!
//! Internal records always carry [`Material::INTERNAL`]; leaf and empty
//! records get whatever the injected [`MaterialResolver`] returns.

use fastvox_core::Material;
use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A leaf or empty node about to be emitted.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TerminalNode {
    /// Center in world space
    pub position: Vec3,
    /// Half-extent
    pub size: u32,
    /// False for empty nodes
    pub is_leaf: bool,
}

/// Chooses the material of each terminal record.
pub trait MaterialResolver {
    fn resolve(&self, node: &TerminalNode) -> Material;
}

impl<F> MaterialResolver for F
where
    F: Fn(&TerminalNode) -> Material,
{
    fn resolve(&self, node: &TerminalNode) -> Material {
        self(node)
    }
}

/// Placeholder materials drawn from the thread-local RNG.
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomMaterials;

impl MaterialResolver for RandomMaterials {
    fn resolve(&self, _node: &TerminalNode) -> Material {
        random_material(&mut rand::rng())
    }
}

/// Placeholder materials drawn from a seeded RNG.
///
/// Every terminal gets its own generator keyed by the seed and the node's
/// center, size and kind, so the result does not depend on the order in
/// which nodes are visited. Serial and parallel compilation agree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SeededMaterials {
    seed: u64,
}

impl SeededMaterials {
    pub const fn new(seed: u64) -> Self {
        Self { seed }
    }

    pub const fn seed(&self) -> u64 {
        self.seed
    }

    fn rng_for(&self, node: &TerminalNode) -> StdRng {
        let mut key = [0u8; 32];
        key[..8].copy_from_slice(&self.seed.to_le_bytes());
        for (chunk, bits) in key[8..20]
            .chunks_exact_mut(4)
            .zip(node.position.to_array().map(f32::to_bits))
        {
            chunk.copy_from_slice(&bits.to_le_bytes());
        }
        key[20..24].copy_from_slice(&node.size.to_le_bytes());
        key[24] = u8::from(node.is_leaf);
        StdRng::from_seed(key)
    }
}

impl MaterialResolver for SeededMaterials {
    fn resolve(&self, node: &TerminalNode) -> Material {
        random_material(&mut self.rng_for(node))
    }
}

/// The same material for every terminal record.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct UniformMaterials(pub Material);

impl MaterialResolver for UniformMaterials {
    fn resolve(&self, _node: &TerminalNode) -> Material {
        self.0
    }
}

/// Uniform random emittance and reflectance in `[0, 1)`, zero roughness and opacity.
fn random_material<R: Rng + ?Sized>(rng: &mut R) -> Material {
    let emittance = [rng.random(), rng.random(), rng.random()];
    let reflectance = [rng.random(), rng.random(), rng.random()];
    Material::new(emittance, reflectance)
}
