//! Shared resource cache. Immutable assets are keyed and handed out as
//! `Arc` handles backed by a weak map: the last handle dropping frees the
//! asset, and the next acquire reloads it from disk.

use std::collections::HashMap;
use std::hash::Hash;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use log::debug;

use crate::error::RenderResult;
use crate::mesh::Mesh;
use crate::skeleton::Skeleton;
use crate::texture::{Cubemap, IblData, Texture, Usage};

/// Cube face name suffixes in +X, -X, +Y, -Y, +Z, -Z order.
const FACE_NAMES: [&str; 6] = ["right", "left", "top", "bottom", "front", "back"];

/// An explicit cache instance rooted at an asset directory.
///
/// Skeletons are deliberately not cached: their pose state mutates per
/// model, so every model owns its own copy (see `load_skeleton`).
pub struct Resources {
    root: PathBuf,
    meshes: HashMap<PathBuf, Weak<Mesh>>,
    textures: HashMap<(PathBuf, Usage), Weak<Texture>>,
    skyboxes: HashMap<(String, usize), Weak<Cubemap>>,
    ibldata: HashMap<String, Weak<IblData>>,
}

impl Resources {
    pub fn new(root: impl Into<PathBuf>) -> Resources {
        Resources {
            root: root.into(),
            meshes: HashMap::new(),
            textures: HashMap::new(),
            skyboxes: HashMap::new(),
            ibldata: HashMap::new(),
        }
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Mesh handle for a path relative to the asset root.
    pub fn acquire_mesh(&mut self, path: impl AsRef<Path>) -> RenderResult<Arc<Mesh>> {
        let full_path = self.root.join(path.as_ref());
        acquire(&mut self.meshes, full_path.clone(), || Mesh::load(&full_path))
    }

    /// Texture handle for a path relative to the asset root; the usage is
    /// part of the key since it changes the decoded texels.
    pub fn acquire_texture(
        &mut self,
        path: impl AsRef<Path>,
        usage: Usage,
    ) -> RenderResult<Arc<Texture>> {
        let full_path = self.root.join(path.as_ref());
        acquire(&mut self.textures, (full_path.clone(), usage), || {
            Texture::from_file(&full_path, usage)
        })
    }

    /// Skybox cubemap for an environment name, taken from the prefiltered
    /// specular chain at the requested blur level.
    pub fn acquire_skybox(
        &mut self,
        env_name: &str,
        blur_level: usize,
    ) -> RenderResult<Arc<Cubemap>> {
        let root = &self.root;
        acquire(
            &mut self.skyboxes,
            (env_name.to_string(), blur_level),
            || {
                let paths = face_paths(root, env_name, "specular", blur_level);
                Cubemap::from_files(&paths, Usage::LdrColor)
            },
        )
    }

    /// Image-based lighting bundle for an environment name: the irradiance
    /// cubemap, `mip_levels` prefiltered specular cubemaps, and the shared
    /// BRDF lookup table.
    pub fn acquire_ibldata(
        &mut self,
        env_name: &str,
        mip_levels: usize,
    ) -> RenderResult<Arc<IblData>> {
        let root = &self.root;
        acquire(&mut self.ibldata, env_name.to_string(), || {
            let diffuse_paths = face_paths(root, env_name, "diffuse", 0);
            let diffuse = Cubemap::from_files(&diffuse_paths, Usage::HdrColor)?;
            let mut specular = Vec::with_capacity(mip_levels);
            for level in 0..mip_levels {
                let level_paths = face_paths(root, env_name, "specular", level);
                specular.push(Cubemap::from_files(&level_paths, Usage::HdrColor)?);
            }
            let brdf_lut = Texture::from_file(root.join("common/brdf_lut.tga"), Usage::LdrData)?;
            Ok(IblData {
                diffuse,
                specular,
                brdf_lut,
            })
        })
    }

    /// Loads a skeleton for exclusive ownership by one model.
    pub fn load_skeleton(&self, path: impl AsRef<Path>) -> RenderResult<Skeleton> {
        Skeleton::load(self.root.join(path.as_ref()))
    }
}

fn face_paths(root: &Path, env_name: &str, kind: &str, level: usize) -> [PathBuf; 6] {
    FACE_NAMES.map(|face| root.join(format!("{env_name}/{kind}_{face}_{level}.tga")))
}

fn acquire<K, T>(
    entries: &mut HashMap<K, Weak<T>>,
    key: K,
    load: impl FnOnce() -> RenderResult<T>,
) -> RenderResult<Arc<T>>
where
    K: Eq + Hash,
{
    if let Some(cached) = entries.get(&key).and_then(Weak::upgrade) {
        return Ok(cached);
    }
    debug!("cache miss, loading resource");
    let resource = Arc::new(load()?);
    entries.insert(key, Arc::downgrade(&resource));
    Ok(resource)
}
