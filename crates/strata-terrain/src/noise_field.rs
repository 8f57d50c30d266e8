//! Multi-octave noise field synthesis.
//!
//! Each layer is sampled as fractal Brownian motion over one of the `noise`
//! crate's coherent bases, normalized by the total octave amplitude into
//! `[0, 1]` and then shaped with the layer's redistribution exponent.

use noise::{NoiseFn, OpenSimplex, Perlin, Simplex, SuperSimplex, Value};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use strata_config::{LayerSettings, NoiseKind};

use crate::chunk::NoiseOffset;
use crate::error::TerrainError;
use crate::grid::HeightMap;

/// Range of the per-octave domain shift. Keeps octaves decorrelated at the origin.
const OCTAVE_SHIFT_RANGE: f64 = 10_000.0;

/// Produces raw `[0, 1]` fields for single layers of a chunk.
///
/// Output depends only on `(seed, width, height, offset, layer)`, and is
/// bit-identical across calls and threads.
#[derive(Clone, Debug)]
pub struct NoiseFieldSynthesizer {
    seed: i32,
    width: usize,
    height: usize,
}

impl NoiseFieldSynthesizer {
    pub fn new(seed: i32, width: usize, height: usize) -> Result<Self, TerrainError> {
        // Validates dimensions once so `synthesize` cannot fail.
        HeightMap::new(width, height)?;
        Ok(Self {
            seed,
            width,
            height,
        })
    }

    pub fn seed(&self) -> i32 {
        self.seed
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Sample one layer over the chunk at `offset`.
    ///
    /// Cell `(x, z)` samples the noise domain at `(offset + (x, z)) / (width - 1)`,
    /// so `scale` counts features per chunk span and neighbouring chunks meet
    /// without seams.
    pub fn synthesize(&self, layer: &LayerSettings, offset: NoiseOffset) -> HeightMap {
        let source = noise_source(layer.noise_kind, self.seed as u32);
        let octaves = layer.octaves.max(1) as usize;
        let shifts = octave_shifts(self.seed, octaves);

        let persistence = layer.persistence as f64;
        let lacunarity = layer.lacunarity as f64;
        let redistribution = layer.redistribution as f64;

        let mut max_amplitude = 0.0;
        let mut amp = 1.0;
        for _ in 0..octaves {
            max_amplitude += amp;
            amp *= persistence;
        }

        let span = (self.width - 1) as f64;
        let mut cells = Vec::with_capacity(self.width * self.height);

        for x in 0..self.width {
            let u = (offset.x + x as i64) as f64 / span;
            for z in 0..self.height {
                let v = (offset.z + z as i64) as f64 / span;

                let mut total = 0.0;
                let mut frequency = layer.scale as f64;
                let mut amplitude = 1.0;
                for shift in &shifts {
                    let n = source.get([u * frequency + shift[0], v * frequency + shift[1]]);
                    total += (n * 0.5 + 0.5) * amplitude;
                    frequency *= lacunarity;
                    amplitude *= persistence;
                }

                let normalized = if max_amplitude > 0.0 {
                    (total / max_amplitude).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                let shaped = libm::pow(normalized, redistribution);
                cells.push(if shaped.is_finite() { shaped as f32 } else { 0.0 });
            }
        }

        HeightMap::from_cells_unchecked(self.width, self.height, cells)
    }
}

fn noise_source(kind: NoiseKind, seed: u32) -> Box<dyn NoiseFn<f64, 2>> {
    match kind {
        NoiseKind::Perlin => Box::new(Perlin::new(seed)),
        NoiseKind::Simplex => Box::new(Simplex::new(seed)),
        NoiseKind::OpenSimplex => Box::new(OpenSimplex::new(seed)),
        NoiseKind::SuperSimplex => Box::new(SuperSimplex::new(seed)),
        NoiseKind::Value => Box::new(Value::new(seed)),
    }
}

/// Seeded domain shift per octave, identical for every chunk of a world.
fn octave_shifts(seed: i32, octaves: usize) -> Vec<[f64; 2]> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed as u32 as u64);
    (0..octaves)
        .map(|_| {
            [
                rng.random_range(-OCTAVE_SHIFT_RANGE..OCTAVE_SHIFT_RANGE),
                rng.random_range(-OCTAVE_SHIFT_RANGE..OCTAVE_SHIFT_RANGE),
            ]
        })
        .collect()
}
