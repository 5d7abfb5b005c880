//! Qubicle Exchange Format writer.
//!
//! QEF is a line-based text format: a fixed three-line header, the canvas
//! dimensions, a color palette, then one `x y z color-index mask` line per
//! voxel. The palette must precede the voxels, so writes are buffered and
//! emitted on flush.

use std::collections::HashMap;
use std::io::{self, Write};

use nalgebra::Point3;

use meshvox_kernel::{Voxel32, VoxelSink};

/// Visibility mask marking all six faces visible.
const ALL_FACES_VISIBLE: u32 = 126;

/// Buffers voxels and writes them as a QEF document.
pub struct QefWriter<W: Write> {
    out: W,
    resolution: u32,
    palette: Vec<[u8; 3]>,
    palette_lookup: HashMap<[u8; 3], usize>,
    voxels: Vec<(Point3<i32>, usize)>,
}

impl<W: Write> QefWriter<W> {
    /// Create a writer for a cubic canvas of the given edge length.
    pub fn new(out: W, resolution: u32) -> Self {
        Self {
            out,
            resolution,
            palette: Vec::new(),
            palette_lookup: HashMap::new(),
            voxels: Vec::new(),
        }
    }

    fn palette_index(&mut self, rgb: [u8; 3]) -> usize {
        if let Some(&index) = self.palette_lookup.get(&rgb) {
            return index;
        }
        let index = self.palette.len();
        self.palette.push(rgb);
        self.palette_lookup.insert(rgb, index);
        index
    }
}

impl<W: Write> VoxelSink for QefWriter<W> {
    fn write(&mut self, voxel: Voxel32) -> io::Result<()> {
        let [_, r, g, b] = voxel.argb.to_be_bytes();
        let index = self.palette_index([r, g, b]);
        self.voxels.push((voxel.pos, index));
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        writeln!(self.out, "Qubicle Exchange Format")?;
        writeln!(self.out, "Version 0.2")?;
        writeln!(self.out, "www.minddesk.com")?;
        writeln!(
            self.out,
            "{} {} {}",
            self.resolution, self.resolution, self.resolution
        )?;
        writeln!(self.out, "{}", self.palette.len())?;
        for [r, g, b] in &self.palette {
            writeln!(
                self.out,
                "{} {} {}",
                *r as f32 / 255.0,
                *g as f32 / 255.0,
                *b as f32 / 255.0
            )?;
        }
        for (pos, index) in &self.voxels {
            writeln!(
                self.out,
                "{} {} {} {} {}",
                pos.x, pos.y, pos.z, index, ALL_FACES_VISIBLE
            )?;
        }
        self.out.flush()
    }
}
