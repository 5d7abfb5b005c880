//! Sparse voxel map with weighted-color accumulation.

use std::fmt;
use std::str::FromStr;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::VoxelError;
use crate::math::{Real, Vec3, VoxelPos};

/// Rule by which two weighted colors at the same voxel combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColorStrategy {
    /// Keep the color with the greater accumulated area. Ties keep the
    /// existing color.
    #[default]
    Max,
    /// Blend colors using accumulated areas as weights.
    Blend,
}

impl ColorStrategy {
    /// Combine an existing weighted color with an incoming one.
    pub fn combine(self, existing: &WeightedColor, incoming: &WeightedColor) -> WeightedColor {
        match self {
            ColorStrategy::Max => {
                if incoming.weight > existing.weight {
                    *incoming
                } else {
                    *existing
                }
            }
            ColorStrategy::Blend => existing.blend(incoming),
        }
    }
}

impl fmt::Display for ColorStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorStrategy::Max => write!(f, "max"),
            ColorStrategy::Blend => write!(f, "blend"),
        }
    }
}

impl FromStr for ColorStrategy {
    type Err = VoxelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "max" => Ok(ColorStrategy::Max),
            "blend" => Ok(ColorStrategy::Blend),
            _ => Err(VoxelError::InvalidSettings(format!(
                "unknown color strategy \"{s}\", expected \"max\" or \"blend\""
            ))),
        }
    }
}

/// A color accumulated from triangle fragments, weighted by area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedColor {
    /// Sum of contributing fragment areas.
    pub weight: Real,
    /// Linear RGB value.
    pub value: Vec3,
}

impl WeightedColor {
    /// The identity element: zero weight, black.
    pub fn zero() -> Self {
        Self {
            weight: 0.0,
            value: Vec3::zeros(),
        }
    }

    /// Create a weighted color.
    pub fn new(weight: Real, value: Vec3) -> Self {
        Self { weight, value }
    }

    /// Area-weighted average with `other`.
    pub fn blend(&self, other: &WeightedColor) -> WeightedColor {
        let weight = self.weight + other.weight;
        if weight == 0.0 {
            return WeightedColor::zero();
        }
        WeightedColor {
            weight,
            value: (self.value * self.weight + other.value * other.weight) / weight,
        }
    }

    /// The color rounded to 8-bit RGBA channels, alpha fully opaque.
    pub fn to_rgba(&self) -> [u8; 4] {
        let channel = |v: Real| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        [
            channel(self.value.x),
            channel(self.value.y),
            channel(self.value.z),
            255,
        ]
    }
}

/// Sparse association from voxel coordinates to weighted colors.
#[derive(Debug, Clone, Default)]
pub struct VoxelMap {
    voxels: FxHashMap<VoxelPos, WeightedColor>,
}

impl VoxelMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of occupied voxels.
    pub fn len(&self) -> usize {
        self.voxels.len()
    }

    /// True when no voxel is occupied.
    pub fn is_empty(&self) -> bool {
        self.voxels.is_empty()
    }

    /// The weighted color at `pos`, if occupied.
    pub fn get(&self, pos: &VoxelPos) -> Option<&WeightedColor> {
        self.voxels.get(pos)
    }

    /// Insert `color` at `pos`, combining with any existing entry under
    /// `strategy`.
    pub fn insert(&mut self, pos: VoxelPos, color: WeightedColor, strategy: ColorStrategy) {
        self.voxels
            .entry(pos)
            .and_modify(|existing| *existing = strategy.combine(existing, &color))
            .or_insert(color);
    }

    /// Drain `source` into `self` under `strategy`. `source` ends up empty
    /// but keeps its capacity.
    pub fn merge(&mut self, source: &mut VoxelMap, strategy: ColorStrategy) {
        self.voxels.reserve(source.len());
        for (pos, color) in source.voxels.drain() {
            self.insert(pos, color, strategy);
        }
    }

    /// Iterate over occupied voxels in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&VoxelPos, &WeightedColor)> + '_ {
        self.voxels.iter()
    }

    /// Remove all voxels, keeping capacity.
    pub fn clear(&mut self) {
        self.voxels.clear();
    }
}

/// Box-filter `map` down to half resolution: every entry contributes to the
/// voxel at half its coordinates under `strategy`.
pub fn downscale(map: &VoxelMap, strategy: ColorStrategy) -> VoxelMap {
    let mut out = VoxelMap::new();
    for (pos, color) in map.iter() {
        out.insert(VoxelPos::new(pos.x / 2, pos.y / 2, pos.z / 2), *color, strategy);
    }
    out
}
