//! Droplet-based hydraulic erosion over a single chunk's noise field.
//!
//! Each droplet spawns at a random cell, follows the bilinear gradient
//! downhill with some inertia, erodes with a radial brush while it has spare
//! sediment capacity and deposits bilinearly when it slows down or climbs.
//!
//! The simulation is not seam-aware: droplets stop at the chunk border, so two
//! eroded chunks will not line up. Only single-chunk passes may use it.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use strata_config::ErosionConfig;

use crate::grid::HeightMap;

/// Totals gathered over one erosion run.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ErosionStats {
    /// Droplets simulated.
    pub droplets: u32,
    /// Total material removed.
    pub eroded: f64,
    /// Total material deposited.
    pub deposited: f64,
}

/// A water droplet carrying sediment.
struct Droplet {
    x: f32,
    z: f32,
    dir_x: f32,
    dir_z: f32,
    speed: f32,
    water: f32,
    sediment: f32,
}

/// Hydraulic erosion stage configured from [`ErosionConfig`].
#[derive(Clone, Debug)]
pub struct HydraulicErosion {
    config: ErosionConfig,
    brush: Vec<(i32, i32, f32)>,
}

impl HydraulicErosion {
    pub fn new(config: ErosionConfig) -> Self {
        let brush = erosion_brush(config.brush_radius);
        Self { config, brush }
    }

    /// Erode `map` in place. The same `(map, seed)` always yields the same result.
    ///
    /// The field is clamped back into `[0, 1]` afterwards.
    pub fn erode(&self, map: &mut HeightMap, seed: i32) -> ErosionStats {
        let mut rng = ChaCha8Rng::seed_from_u64(seed as u32 as u64);
        let mut stats = ErosionStats::default();
        let cfg = &self.config;

        let max_x = (map.width() - 1) as f32;
        let max_z = (map.height() - 1) as f32;

        for _ in 0..cfg.iterations {
            stats.droplets += 1;
            let mut droplet = Droplet {
                x: rng.random_range(0.0..max_x),
                z: rng.random_range(0.0..max_z),
                dir_x: 0.0,
                dir_z: 0.0,
                speed: cfg.initial_speed,
                water: cfg.initial_water,
                sediment: 0.0,
            };

            for _ in 0..cfg.max_lifetime {
                let node_x = droplet.x.floor() as usize;
                let node_z = droplet.z.floor() as usize;
                let (height, grad_x, grad_z) = height_and_gradient(map, droplet.x, droplet.z);

                droplet.dir_x = droplet.dir_x * cfg.inertia - grad_x * (1.0 - cfg.inertia);
                droplet.dir_z = droplet.dir_z * cfg.inertia - grad_z * (1.0 - cfg.inertia);
                let len = (droplet.dir_x * droplet.dir_x + droplet.dir_z * droplet.dir_z).sqrt();
                if len <= f32::EPSILON || !len.is_finite() {
                    // Flat spot or pit: the droplet is stuck.
                    break;
                }
                droplet.dir_x /= len;
                droplet.dir_z /= len;

                let cell_x = droplet.x - node_x as f32;
                let cell_z = droplet.z - node_z as f32;
                droplet.x += droplet.dir_x;
                droplet.z += droplet.dir_z;

                if droplet.x < 0.0 || droplet.z < 0.0 || droplet.x >= max_x || droplet.z >= max_z {
                    break;
                }

                let (new_height, _, _) = height_and_gradient(map, droplet.x, droplet.z);
                let delta = new_height - height;

                let capacity = (-delta * droplet.speed * droplet.water * cfg.sediment_capacity_factor)
                    .max(cfg.min_sediment_capacity);

                if droplet.sediment > capacity || delta > 0.0 {
                    // Uphill: fill the pit behind us. Otherwise drop the surplus.
                    let amount = if delta > 0.0 {
                        delta.min(droplet.sediment)
                    } else {
                        (droplet.sediment - capacity) * cfg.deposit_speed
                    };
                    droplet.sediment -= amount;
                    deposit_bilinear(map, node_x, node_z, cell_x, cell_z, amount);
                    stats.deposited += amount as f64;
                } else {
                    let amount = ((capacity - droplet.sediment) * cfg.erode_speed).min(-delta);
                    let removed = self.erode_brush(map, node_x, node_z, amount);
                    droplet.sediment += removed;
                    stats.eroded += removed as f64;
                }

                droplet.speed = (droplet.speed * droplet.speed - delta * cfg.gravity)
                    .max(0.0)
                    .sqrt();
                droplet.water *= 1.0 - cfg.evaporate_speed;
            }
        }

        map.clamp01();
        stats
    }

    /// Remove up to `amount` around a node, weighted by the in-bounds brush cells.
    fn erode_brush(&self, map: &mut HeightMap, node_x: usize, node_z: usize, amount: f32) -> f32 {
        let in_bounds = |dx: i32, dz: i32| map.contains(node_x as i64 + dx as i64, node_z as i64 + dz as i64);
        let total_weight: f32 = self
            .brush
            .iter()
            .filter(|(dx, dz, _)| in_bounds(*dx, *dz))
            .map(|(_, _, w)| w)
            .sum();
        if total_weight <= 0.0 || amount <= 0.0 {
            return 0.0;
        }

        let mut removed = 0.0;
        for &(dx, dz, weight) in &self.brush {
            let x = node_x as i64 + dx as i64;
            let z = node_z as i64 + dz as i64;
            if !map.contains(x, z) {
                continue;
            }
            let (x, z) = (x as usize, z as usize);
            let current = map.get(x, z);
            let take = (amount * weight / total_weight).min(current.max(0.0));
            map.set(x, z, current - take);
            removed += take;
        }
        removed
    }
}

/// Radial brush offsets with linearly decreasing weights.
fn erosion_brush(radius: u32) -> Vec<(i32, i32, f32)> {
    let r = radius.max(1) as i32;
    let r_f = r as f32;
    let mut brush = Vec::new();
    for dz in -r..=r {
        for dx in -r..=r {
            let dist = ((dx * dx + dz * dz) as f32).sqrt();
            if dist < r_f {
                brush.push((dx, dz, 1.0 - dist / r_f));
            }
        }
    }
    brush
}

/// Bilinear height and gradient at a fractional position.
fn height_and_gradient(map: &HeightMap, x: f32, z: f32) -> (f32, f32, f32) {
    let x0 = (x.floor() as usize).min(map.width() - 2);
    let z0 = (z.floor() as usize).min(map.height() - 2);
    let fx = x - x0 as f32;
    let fz = z - z0 as f32;

    let h00 = map.get(x0, z0);
    let h10 = map.get(x0 + 1, z0);
    let h01 = map.get(x0, z0 + 1);
    let h11 = map.get(x0 + 1, z0 + 1);

    let grad_x = (h10 - h00) * (1.0 - fz) + (h11 - h01) * fz;
    let grad_z = (h01 - h00) * (1.0 - fx) + (h11 - h10) * fx;
    let height = h00 * (1.0 - fx) * (1.0 - fz) + h10 * fx * (1.0 - fz) + h01 * (1.0 - fx) * fz + h11 * fx * fz;

    (height, grad_x, grad_z)
}

fn deposit_bilinear(map: &mut HeightMap, x: usize, z: usize, fx: f32, fz: f32, amount: f32) {
    let x1 = (x + 1).min(map.width() - 1);
    let z1 = (z + 1).min(map.height() - 1);
    let spread = [
        (x, z, (1.0 - fx) * (1.0 - fz)),
        (x1, z, fx * (1.0 - fz)),
        (x, z1, (1.0 - fx) * fz),
        (x1, z1, fx * fz),
    ];
    for (cx, cz, weight) in spread {
        let current = map.get(cx, cz);
        map.set(cx, cz, current + amount * weight);
    }
}
