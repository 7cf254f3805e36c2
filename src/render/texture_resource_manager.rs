// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.

use std::collections::HashMap;
use std::fmt::Debug;

use bevy_ecs::resource::Resource;
use log::debug;
use slotmap::SlotMap;

use crate::assets::asset_manager::AssetSource;
use crate::handles::TextureHandle;
use crate::messaging::message_bus::MessageBus;
use crate::render::graphics_device::{GraphicsDevice, TextureError};
use crate::render::texture::{DeferredTexture, TextureOptions};
use crate::settings::TextureSettings;

/// Every live texture, addressable by handle or by asset name.
#[derive(Resource)]
pub struct TextureResource<T: Copy + Debug + Send + Sync + 'static> {
    textures: SlotMap<TextureHandle, DeferredTexture<T>>,
    names: HashMap<String, TextureHandle>,
    options: TextureOptions,
}

impl<T: Copy + Debug + Send + Sync + 'static> Default for TextureResource<T> {
    fn default() -> Self {
        Self::new(TextureOptions::default())
    }
}

impl<T: Copy + Debug + Send + Sync + 'static> TextureResource<T> {
    pub fn new(options: TextureOptions) -> Self {
        Self {
            textures: SlotMap::with_key(),
            names: HashMap::new(),
            options,
        }
    }

    /// Sizes and placeholder color for new textures come from `settings`.
    pub fn from_settings(settings: &TextureSettings) -> Self {
        Self::new(settings.texture_options())
    }

    /// Returns the texture already registered under `name`, or creates one showing the
    /// placeholder until the asset arrives.
    pub fn get_or_load<D, A>(
        &mut self,
        device: &D,
        bus: &mut MessageBus,
        assets: &A,
        name: &str,
    ) -> Result<TextureHandle, TextureError>
    where
        D: GraphicsDevice<Texture = T>,
        A: AssetSource + ?Sized,
    {
        if let Some(handle) = self.names.get(name) {
            return Ok(*handle);
        }

        let texture = DeferredTexture::with_options(device, bus, assets, name, self.options)?;
        let handle = self.textures.insert(texture);
        self.names.insert(name.to_string(), handle);
        debug!("Registered texture '{}' as {:?}", name, handle);
        Ok(handle)
    }

    /// Lets every waiting texture take its delivered asset. Returns how many finished loading.
    pub fn dispatch_messages<D>(&mut self, device: &D, bus: &mut MessageBus) -> usize
    where
        D: GraphicsDevice<Texture = T>,
    {
        self.textures
            .values_mut()
            .filter(|texture| texture.is_waiting())
            .map(|texture| texture.poll_messages(device, bus))
            .filter(|loaded| *loaded)
            .count()
    }

    pub fn destroy_texture<D>(
        &mut self,
        device: &D,
        bus: &mut MessageBus,
        handle: TextureHandle,
    ) -> bool
    where
        D: GraphicsDevice<Texture = T>,
    {
        let Some(texture) = self.textures.remove(handle) else {
            return false;
        };
        self.names.remove(texture.name());
        texture.destroy(device, bus);
        true
    }

    pub fn destroy_all<D>(&mut self, device: &D, bus: &mut MessageBus)
    where
        D: GraphicsDevice<Texture = T>,
    {
        self.names.clear();
        for (_, texture) in self.textures.drain() {
            texture.destroy(device, bus);
        }
    }

    pub fn get_texture(&self, handle: TextureHandle) -> Option<&DeferredTexture<T>> {
        self.textures.get(handle)
    }

    pub fn get_texture_by_name(&self, name: &str) -> Option<&DeferredTexture<T>> {
        self.handle_for(name)
            .and_then(|handle| self.textures.get(handle))
    }

    pub fn handle_for(&self, name: &str) -> Option<TextureHandle> {
        self.names.get(name).copied()
    }

    pub fn waiting_count(&self) -> usize {
        self.textures
            .values()
            .filter(|texture| texture.is_waiting())
            .count()
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }
}
