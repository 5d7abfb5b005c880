//! OBJ triangle-stream provider.
//!
//! Loads an OBJ model with its MTL libraries, resolves every face's
//! material up front and exposes the result as a kernel triangle stream.
//! Texture lookups happen here, before any triangle reaches a worker.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use obj::{Obj, ObjData, ObjMaterial};

use meshvox_kernel::math::{Point3, Vec2, Vec3};
use meshvox_kernel::{
    TexturedTriangle, Texture, TriangleKind, TriangleStream, VisualTriangle,
};

use crate::error::{IoError, Result};
use crate::texture::load_texture;

/// A fully resolved OBJ model, streamable as visual triangles.
pub struct ObjStream {
    vertices: Vec<f32>,
    triangles: Vec<VisualTriangle>,
    cursor: usize,
}

impl ObjStream {
    /// Load the OBJ file at `path` together with its MTL libraries and
    /// diffuse textures.
    pub fn load(path: &Path) -> Result<Self> {
        let mut model = Obj::load(path)?;
        model
            .load_mtls()
            .map_err(|errors| IoError::Mtl(format!("{errors:?}")))?;
        Self::from_data(model.data, &model.path)
    }

    /// Build a stream from parsed OBJ data. `base_dir` anchors relative
    /// texture paths.
    pub fn from_data(data: ObjData, base_dir: &Path) -> Result<Self> {
        let textures = load_textures(&data, base_dir)?;

        let mut vertices = Vec::with_capacity(data.position.len() * 3);
        for position in &data.position {
            vertices.extend_from_slice(position);
        }

        let mut triangles = Vec::new();
        for object in &data.objects {
            for group in &object.groups {
                let material = match &group.material {
                    None => None,
                    Some(ObjMaterial::Mtl(material)) => Some(Arc::clone(material)),
                    Some(ObjMaterial::Ref(name)) => {
                        return Err(IoError::UnknownMaterial(name.clone()));
                    }
                };

                for poly in &group.polys {
                    let corners = &poly.0;
                    if corners.len() < 3 {
                        continue;
                    }
                    // Fan-triangulate polygons with more than three corners.
                    for i in 1..corners.len() - 1 {
                        let triangle = build_triangle(
                            &data,
                            [corners[0], corners[i], corners[i + 1]],
                            material.as_deref(),
                            &textures,
                        );
                        triangles.push(triangle);
                    }
                }
            }
        }

        log::info!(
            "loaded OBJ model with {} vertices and {} triangles",
            data.position.len(),
            triangles.len()
        );

        Ok(Self {
            vertices,
            triangles,
            cursor: 0,
        })
    }

    /// Number of triangles the stream will yield.
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }
}

impl TriangleStream for ObjStream {
    fn vertex_count(&self) -> u64 {
        (self.vertices.len() / 3) as u64
    }

    fn vertices(&self) -> &[f32] {
        &self.vertices
    }

    fn next_triangle(&mut self) -> Option<VisualTriangle> {
        let triangle = self.triangles.get(self.cursor)?.clone();
        self.cursor += 1;
        Some(triangle)
    }
}

/// Decode every diffuse texture referenced by the model, once each.
fn load_textures(data: &ObjData, base_dir: &Path) -> Result<HashMap<String, Arc<Texture>>> {
    let mut textures = HashMap::new();
    for object in &data.objects {
        for group in &object.groups {
            let Some(ObjMaterial::Mtl(material)) = &group.material else {
                continue;
            };
            let Some(map_kd) = &material.map_kd else {
                continue;
            };
            if textures.contains_key(map_kd.as_str()) {
                continue;
            }
            let texture = load_texture(&base_dir.join(map_kd))?;
            textures.insert(map_kd.clone(), Arc::new(texture));
        }
    }
    if !textures.is_empty() {
        log::info!("loaded {} diffuse texture(s)", textures.len());
    }
    Ok(textures)
}

fn build_triangle(
    data: &ObjData,
    corners: [obj::IndexTuple; 3],
    material: Option<&obj::Material>,
    textures: &HashMap<String, Arc<Texture>>,
) -> VisualTriangle {
    let mut positions = [Point3::origin(); 3];
    let mut uvs = [Vec2::zeros(); 3];
    let mut has_uvs = true;

    for (i, corner) in corners.iter().enumerate() {
        let p = data.position[corner.0];
        positions[i] = Point3::new(p[0], p[1], p[2]);
        match corner.1 {
            Some(t) => {
                let uv = data.texture[t];
                uvs[i] = Vec2::new(uv[0], uv[1]);
            }
            None => has_uvs = false,
        }
    }

    let kind = match material {
        None => TriangleKind::Matte,
        Some(material) => match &material.map_kd {
            Some(map_kd) if has_uvs => {
                // load_textures decoded every referenced map_kd.
                TriangleKind::Textured(Arc::clone(&textures[map_kd.as_str()]))
            }
            _ => match material.kd {
                Some(kd) => TriangleKind::Colored(Vec3::new(kd[0], kd[1], kd[2])),
                None => TriangleKind::Matte,
            },
        },
    };

    VisualTriangle::new(TexturedTriangle::new(positions, uvs), kind)
}
