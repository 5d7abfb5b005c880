//! Error types for mesh and voxel-file I/O.

use thiserror::Error;

/// Errors that can occur while loading meshes or writing voxel files.
#[derive(Error, Debug)]
pub enum IoError {
    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The OBJ file could not be parsed.
    #[error("failed to parse OBJ: {0}")]
    Obj(#[from] obj::ObjError),

    /// One or more MTL libraries could not be loaded.
    #[error("failed to load material libraries: {0}")]
    Mtl(String),

    /// A face references a material that no loaded MTL library defines.
    #[error("material \"{0}\" is not defined in any loaded MTL library")]
    UnknownMaterial(String),

    /// A diffuse texture could not be opened or decoded.
    #[error("failed to load texture \"{name}\": {source}")]
    Texture {
        /// The texture path as referenced by the material.
        name: String,
        /// The decoder failure.
        source: image::ImageError,
    },

    /// The output path has an extension no writer supports.
    #[error("unsupported output format \"{0}\", expected .vl32 or .qef")]
    UnsupportedFormat(String),
}

/// Result type for I/O operations.
pub type Result<T> = std::result::Result<T, IoError>;
