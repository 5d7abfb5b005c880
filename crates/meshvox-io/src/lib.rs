#![warn(missing_docs)]

//! Mesh loading, texture decoding and voxel-file writers for meshvox.
//!
//! This crate supplies the external collaborators of the voxelization
//! kernel: an OBJ/MTL triangle stream with up-front texture resolution,
//! and sinks for the VL32 and QEF voxel formats.

pub mod error;
pub mod qef;
pub mod texture;
pub mod vl32;
pub mod wavefront;

pub use error::{IoError, Result};
pub use wavefront::ObjStream;
pub use qef::QefWriter;
pub use texture::load_texture;
pub use vl32::Vl32Writer;

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use meshvox_kernel::VoxelSink;

/// Open the voxel writer matching the extension of `path`.
///
/// `resolution` is the edge length of the delivered grid; formats with a
/// canvas header need it up front.
pub fn writer_for_path(path: &Path, resolution: u32) -> Result<Box<dyn VoxelSink>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    if !matches!(extension.as_str(), "vl32" | "qef") {
        return Err(IoError::UnsupportedFormat(extension));
    }
    let out = BufWriter::new(File::create(path)?);
    match extension.as_str() {
        "vl32" => Ok(Box::new(Vl32Writer::new(out))),
        _ => Ok(Box::new(QefWriter::new(out, resolution))),
    }
}
