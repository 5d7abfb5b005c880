//! Diffuse texture decoding.

use std::path::Path;

use meshvox_kernel::Texture;

use crate::error::{IoError, Result};

/// Decode the image at `path` into a kernel texture.
pub fn load_texture(path: &Path) -> Result<Texture> {
    let image = image::open(path)
        .map_err(|source| IoError::Texture {
            name: path.display().to_string(),
            source,
        })?
        .to_rgba8();
    let (width, height) = image.dimensions();
    log::info!("loaded texture \"{}\" ({width}x{height})", path.display());
    Ok(Texture::new(width, height, image.into_raw()))
}
