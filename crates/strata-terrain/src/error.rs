//! Terrain pipeline error types.

/// Errors raised while validating or running a terrain generation pass.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TerrainError {
    /// Map dimensions are too small or do not match the data supplied.
    #[error("invalid map dimensions {width}x{height}: {reason}")]
    InvalidDimensions {
        width: usize,
        height: usize,
        reason: &'static str,
    },

    /// Erosion was requested for a pass that generates more than one chunk.
    #[error("erosion requires a single-chunk pass, {chunks} chunks requested")]
    ErosionUnsupported { chunks: usize },

    /// A walkability index does not address a cell of the map.
    #[error("walkability index {index} out of range for {cells} cells")]
    MaskIndexOutOfRange { index: usize, cells: usize },

    /// A cell holds NaN or an infinity.
    #[error("non-finite depth {value} at cell {index}")]
    DivergentNoiseOutput { index: usize, value: f32 },

    /// Level of detail is outside the supported range.
    #[error("level of detail {lod} outside 0..={max}")]
    InvalidLevelOfDetail { lod: u8, max: u8 },

    /// The target average depth is NaN or infinite.
    #[error("average depth must be finite, got {0}")]
    NonFiniteAverageDepth(f32),

    /// A layer's numeric setting is NaN or infinite.
    #[error("layer {layer}: {setting} must be finite, got {value}")]
    NonFiniteLayerSetting {
        layer: usize,
        setting: &'static str,
        value: f32,
    },

    /// Chunk grid width is even or zero.
    #[error("chunk grid width must be odd and at least 1, got {0}")]
    InvalidGridWidth(u32),
}
