//! Texture roles, opaque texture handles and the provider contract the scene builder and
//! renderer load and bind textures through, plus helpers for reading asset files.

pub mod texture;

use std::{
    collections::{HashMap, hash_map::Entry},
    path::{Path, PathBuf},
};

use crate::error::Result;

/// The purpose a texture serves on a shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureRole {
    Diffuse,
    Specular,
    /// Fully transparent stand-in bound when a layer is hidden or an asset is missing.
    Transparent,
}

impl TextureRole {
    /// The texture unit the role is bound to; `material.diffuse` samples unit 0 and
    /// `material.specular` unit 1.
    pub fn unit(&self) -> u32 {
        match self {
            TextureRole::Diffuse | TextureRole::Transparent => 0,
            TextureRole::Specular => 1,
        }
    }
}

/// Opaque handle to a texture owned by a [`TextureProvider`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub u32);

/// Loads textures and hands out bindable handles. Decoding is entirely the provider's job.
pub trait TextureProvider {
    /// Loads the texture at `path` for `role`.
    ///
    /// Fails with [`crate::error::ViewerError::AssetMissing`] if the path cannot be found or
    /// decoded.
    fn load(&mut self, path: &str, role: TextureRole) -> Result<TextureHandle>;

    /// A fully transparent 1x1 texture.
    fn transparent_placeholder(&mut self) -> Result<TextureHandle>;
}

/// One upload per asset path, and the handle issued for each path and role.
#[derive(Debug)]
pub struct TextureCache<T> {
    uploads: HashMap<String, T>,
    handles: HashMap<(String, TextureRole), TextureHandle>,
}

impl<T> Default for TextureCache<T> {
    fn default() -> Self {
        Self {
            uploads: HashMap::new(),
            handles: HashMap::new(),
        }
    }
}

impl<T> TextureCache<T> {
    pub fn handle(&self, path: &str, role: TextureRole) -> Option<TextureHandle> {
        self.handles.get(&(path.to_string(), role)).copied()
    }

    /// The upload for `path`, running `upload` only the first time the path is requested. A
    /// failed upload is not cached.
    pub fn upload_with(&mut self, path: &str, upload: impl FnOnce() -> Result<T>) -> Result<&T> {
        match self.uploads.entry(path.to_string()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => Ok(entry.insert(upload()?)),
        }
    }

    pub fn insert_handle(&mut self, path: &str, role: TextureRole, handle: TextureHandle) {
        self.handles.insert((path.to_string(), role), handle);
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.len()
    }
}

/// Resolves an asset name relative to `./assets`, or to the copy made at build time when the
/// working directory has none.
pub fn asset_path(file_name: &str) -> PathBuf {
    let local = Path::new("./").join("assets");
    match option_env!("GLOBE_ASSET_DIR") {
        Some(built) if !local.exists() => Path::new(built).join(file_name),
        _ => local.join(file_name),
    }
}

pub async fn load_binary(file_name: &str) -> anyhow::Result<Vec<u8>> {
    let path = asset_path(file_name);
    let data = std::fs::read(&path)
        .map_err(|e| anyhow::anyhow!("could not read {}: {}", path.display(), e))?;
    Ok(data)
}

/// Reads every file concurrently. Files that fail to load are logged and left out so the
/// texture provider reports them as missing when they are requested.
pub async fn load_assets(file_names: Vec<String>) -> HashMap<String, Vec<u8>> {
    let loads = file_names.into_iter().map(|file_name| async move {
        let data = load_binary(&file_name).await;
        (file_name, data)
    });
    futures::future::join_all(loads)
        .await
        .into_iter()
        .filter_map(|(file_name, data)| match data {
            Ok(data) => Some((file_name, data)),
            Err(e) => {
                log::warn!("Asset {} unavailable: {}", file_name, e);
                None
            }
        })
        .collect()
}
