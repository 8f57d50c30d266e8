//! Square falloff mask that rises from 0 in the chunk centre to 1 at its rim.

use crate::error::TerrainError;
use crate::grid::HeightMap;

/// Steepness of the falloff curve.
const FALLOFF_A: f32 = 3.0;
/// Shift of the falloff curve towards the rim.
const FALLOFF_B: f32 = 2.2;

/// Shape a linear distance `v` in `[0, 1]` into the falloff curve.
///
/// `f(v) = v^a / (v^a + (b - b·v)^a)`: flat near the centre, steep near the rim.
pub fn falloff_value(v: f32) -> f32 {
    let va = v.powf(FALLOFF_A);
    let denom = va + (FALLOFF_B - FALLOFF_B * v).powf(FALLOFF_A);
    if denom > 0.0 { va / denom } else { 1.0 }
}

/// Falloff mask for a `width × height` map, using the Chebyshev distance
/// from the centre in `[-1, 1]²`.
pub fn falloff_map(width: usize, height: usize) -> Result<HeightMap, TerrainError> {
    let mut map = HeightMap::new(width, height)?;
    for x in 0..width {
        let u = (x as f32 / (width - 1) as f32 * 2.0 - 1.0).abs();
        for z in 0..height {
            let w = (z as f32 / (height - 1) as f32 * 2.0 - 1.0).abs();
            map.set(x, z, falloff_value(u.max(w)));
        }
    }
    Ok(map)
}
