//! Debug STL dump of voxelized triangles.
//!
//! Collects every sub-triangle the workers process and writes them out as
//! a binary STL, so the geometry actually fed to per-voxel clipping can be
//! inspected in a mesh viewer.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use meshvox_kernel::{TexturedTriangle, TriangleObserver};

/// Accumulates triangles from the voxelizer workers.
#[derive(Default)]
pub struct StlDump {
    triangles: Arc<Mutex<Vec<TexturedTriangle>>>,
}

impl StlDump {
    /// Create an empty dump.
    pub fn new() -> Self {
        Self::default()
    }

    /// An observer that records every observed triangle into this dump.
    pub fn observer(&self) -> TriangleObserver {
        let triangles = Arc::clone(&self.triangles);
        Arc::new(move |triangle: &TexturedTriangle| {
            triangles.lock().unwrap().push(*triangle);
        })
    }

    /// Write the collected triangles as a binary STL file.
    pub fn write(&self, path: &Path) -> io::Result<()> {
        let triangles = self.triangles.lock().unwrap();
        let mut out = BufWriter::new(File::create(path)?);

        out.write_all(&[0u8; 80])?;
        out.write_all(&(triangles.len() as u32).to_le_bytes())?;

        for triangle in triangles.iter() {
            let normal = triangle.normal().normalize();
            for c in 0..3 {
                out.write_all(&normal[c].to_le_bytes())?;
            }
            for i in 0..3 {
                let vertex = triangle.vertex(i);
                for c in 0..3 {
                    out.write_all(&vertex[c].to_le_bytes())?;
                }
            }
            out.write_all(&0u16.to_le_bytes())?;
        }
        out.flush()
    }

    /// Number of triangles collected so far.
    pub fn len(&self) -> usize {
        self.triangles.lock().unwrap().len()
    }

    /// True when no triangle has been collected.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
