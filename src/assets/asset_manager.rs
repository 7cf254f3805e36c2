// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use bevy_ecs::resource::Resource;
use image::ImageFormat;
use log::{debug, error, warn};
use rayon::prelude::*;

use crate::assets::image_asset::{AssetError, ImageAsset};
use crate::messaging::message::{MessagePayload, asset_loaded_topic};
use crate::messaging::message_bus::MessageBus;
use crate::settings::TextureSettings;

/// Synchronous lookup of image data that is already resident.
pub trait AssetSource {
    fn get_asset(&self, name: &str) -> Option<Arc<ImageAsset>>;
}

impl AssetSource for HashMap<String, Arc<ImageAsset>> {
    fn get_asset(&self, name: &str) -> Option<Arc<ImageAsset>> {
        self.get(name).cloned()
    }
}

struct PendingLoad {
    name: String,
    path: PathBuf,
}

/// Caches decoded images by name and announces each one on
/// `asset-loaded:<name>` as soon as it becomes resident.
#[derive(Resource)]
pub struct AssetManager {
    asset_root: PathBuf,
    assets: HashMap<String, Arc<ImageAsset>>,
    pending: Vec<PendingLoad>,
}

impl Default for AssetManager {
    fn default() -> Self {
        Self::new("assets")
    }
}

impl AssetSource for AssetManager {
    fn get_asset(&self, name: &str) -> Option<Arc<ImageAsset>> {
        self.assets.get(name).cloned()
    }
}

impl AssetManager {
    pub fn new(asset_root: impl Into<PathBuf>) -> Self {
        Self {
            asset_root: asset_root.into(),
            assets: HashMap::new(),
            pending: Vec::new(),
        }
    }

    pub fn from_settings(settings: &TextureSettings) -> Self {
        Self::new(settings.asset_root.clone())
    }

    pub fn asset_root(&self) -> &Path {
        &self.asset_root
    }

    /// Queues `asset_root/name` for decoding on the next `process_pending`.
    /// Returns `Ok(false)` if the name is already resident or queued.
    pub fn load_asset(&mut self, name: &str) -> Result<bool, AssetError> {
        if self.assets.contains_key(name) || self.pending.iter().any(|p| p.name == name) {
            debug!("Asset '{}' is already resident or queued", name);
            return Ok(false);
        }

        let path = self.asset_root.join(name);
        if ImageFormat::from_path(&path).is_err() {
            warn!("Unsupported image format: {}", name);
            return Err(AssetError::UnsupportedFormat(name.to_string()));
        }

        self.pending.push(PendingLoad {
            name: name.to_string(),
            path,
        });
        Ok(true)
    }

    /// Decodes every queued request (in parallel), then caches and publishes the results
    /// in request order. Failed loads are logged and dropped. Returns how many assets
    /// became resident.
    pub fn process_pending(&mut self, bus: &mut MessageBus) -> usize {
        if self.pending.is_empty() {
            return 0;
        }

        let start = Instant::now();
        let pending = std::mem::take(&mut self.pending);
        let requested = pending.len();
        let decoded: Vec<(String, Result<ImageAsset, AssetError>)> = pending
            .into_par_iter()
            .map(|load| {
                let result = ImageAsset::load_from_file(load.name.clone(), &load.path);
                (load.name, result)
            })
            .collect();

        let mut loaded = 0;
        for (name, result) in decoded {
            match result {
                Ok(asset) => {
                    self.add_asset(bus, asset);
                    loaded += 1;
                }
                Err(e) => error!("Failed to load image asset '{}': {}", name, e),
            }
        }

        debug!(
            "Decoded {}/{} image assets in {:.2?}",
            loaded,
            requested,
            start.elapsed()
        );
        loaded
    }

    /// Makes an already decoded image resident and announces it.
    pub fn add_asset(&mut self, bus: &mut MessageBus, asset: ImageAsset) -> Arc<ImageAsset> {
        let asset = Arc::new(asset);
        self.assets.insert(asset.name.clone(), Arc::clone(&asset));

        let topic = asset_loaded_topic(&asset.name);
        let delivered = bus.publish(&topic, MessagePayload::ImageAsset(Arc::clone(&asset)));
        debug!(
            "Asset '{}' ({}x{}) resident, announced to {} subscriber(s)",
            asset.name, asset.width, asset.height, delivered
        );
        asset
    }

    pub fn unload(&mut self, name: &str) -> bool {
        self.assets.remove(name).is_some()
    }

    pub fn is_resident(&self, name: &str) -> bool {
        self.assets.contains_key(name)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}
