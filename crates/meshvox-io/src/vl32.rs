//! VL32 voxel list writer.
//!
//! VL32 is a headerless binary format: one 16-byte record per voxel,
//! holding big-endian `i32 x`, `i32 y`, `i32 z` and `u32 argb`.

use std::io::{self, Write};

use meshvox_kernel::{Voxel32, VoxelSink};

/// Streams voxels as VL32 records.
pub struct Vl32Writer<W: Write> {
    out: W,
    healthy: bool,
}

impl<W: Write> Vl32Writer<W> {
    /// Wrap an output stream.
    pub fn new(out: W) -> Self {
        Self { out, healthy: true }
    }

    /// Unwrap the output stream.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> VoxelSink for Vl32Writer<W> {
    fn can_write(&self) -> bool {
        self.healthy
    }

    fn write(&mut self, voxel: Voxel32) -> io::Result<()> {
        let mut record = [0u8; 16];
        record[0..4].copy_from_slice(&voxel.pos.x.to_be_bytes());
        record[4..8].copy_from_slice(&voxel.pos.y.to_be_bytes());
        record[8..12].copy_from_slice(&voxel.pos.z.to_be_bytes());
        record[12..16].copy_from_slice(&voxel.argb.to_be_bytes());
        if let Err(error) = self.out.write_all(&record) {
            self.healthy = false;
            return Err(error);
        }
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}
