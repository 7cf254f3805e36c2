// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.

use std::fmt::Debug;

use log::{debug, warn};

use crate::assets::asset_manager::AssetSource;
use crate::assets::image_asset::ImageAsset;
use crate::handles::SubscriptionHandle;
use crate::messaging::message::{Message, asset_loaded_topic};
use crate::messaging::message_bus::MessageBus;
use crate::render::graphics_device::{GraphicsDevice, TextureError};

pub const DEFAULT_TEXTURE_WIDTH: u32 = 10;
pub const DEFAULT_TEXTURE_HEIGHT: u32 = 10;
/// Opaque white.
pub const PLACEHOLDER_RGBA: [u8; 4] = [255, 255, 255, 255];

const LEVEL: i32 = 0;
const BORDER: i32 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureOptions {
    /// Size reported until real data arrives.
    pub width: u32,
    pub height: u32,
    pub placeholder: [u8; 4],
}

impl Default for TextureOptions {
    fn default() -> Self {
        Self {
            width: DEFAULT_TEXTURE_WIDTH,
            height: DEFAULT_TEXTURE_HEIGHT,
            placeholder: PLACEHOLDER_RGBA,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureState {
    Placeholder,
    Loaded,
}

/// A 2D texture that is drawable from the moment it exists. It starts as a 1x1
/// placeholder and swaps in the image named `name` once that asset is resident,
/// either at construction or when `asset-loaded:<name>` is delivered.
#[derive(Debug)]
pub struct DeferredTexture<T: Copy + Debug> {
    name: String,
    topic: String,
    handle: T,
    width: u32,
    height: u32,
    state: TextureState,
    subscription: Option<SubscriptionHandle>,
    destroyed: bool,
}

impl<T: Copy + Debug> DeferredTexture<T> {
    /// Creates a 10x10 texture showing the opaque white placeholder.
    pub fn new<D, A>(
        device: &D,
        bus: &mut MessageBus,
        assets: &A,
        name: impl Into<String>,
    ) -> Result<Self, TextureError>
    where
        D: GraphicsDevice<Texture = T>,
        A: AssetSource + ?Sized,
    {
        Self::with_options(device, bus, assets, name, TextureOptions::default())
    }

    /// Leaves `device` with this texture bound.
    pub fn with_options<D, A>(
        device: &D,
        bus: &mut MessageBus,
        assets: &A,
        name: impl Into<String>,
        options: TextureOptions,
    ) -> Result<Self, TextureError>
    where
        D: GraphicsDevice<Texture = T>,
        A: AssetSource + ?Sized,
    {
        let name = name.into();
        let handle = device.create_texture()?;
        let topic = asset_loaded_topic(&name);
        // Subscribe before anything can be uploaded so the placeholder always comes first.
        let subscription = bus.subscribe_once(topic.clone());

        let mut texture = Self {
            name,
            topic,
            handle,
            width: options.width,
            height: options.height,
            state: TextureState::Placeholder,
            subscription: Some(subscription),
            destroyed: false,
        };

        texture.bind(device);
        device.tex_image_2d(
            glow::TEXTURE_2D,
            LEVEL,
            glow::RGBA as i32,
            1,
            1,
            BORDER,
            glow::RGBA,
            glow::UNSIGNED_BYTE,
            &options.placeholder,
        );

        if let Some(asset) = assets.get_asset(&texture.name) {
            texture.load_from_asset(device, &asset);
            texture.release_subscription(bus);
        }

        Ok(texture)
    }

    /// Uploads `asset` and sets sampling state. Pixel data is handed to the device as is.
    pub fn load_from_asset<D>(&mut self, device: &D, asset: &ImageAsset)
    where
        D: GraphicsDevice<Texture = T>,
    {
        self.width = asset.width;
        self.height = asset.height;
        self.bind(device);
        device.tex_image_2d(
            glow::TEXTURE_2D,
            LEVEL,
            glow::RGBA as i32,
            self.width,
            self.height,
            BORDER,
            glow::RGBA,
            glow::UNSIGNED_BYTE,
            &asset.pixels,
        );
        self.state = TextureState::Loaded;

        if self.is_power_of_two() {
            device.generate_mipmap(glow::TEXTURE_2D);
        } else {
            // NPOT textures cannot mipmap or repeat on GLES2/WebGL1 class hardware.
            device.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_WRAP_S,
                glow::CLAMP_TO_EDGE as i32,
            );
            device.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_WRAP_T,
                glow::CLAMP_TO_EDGE as i32,
            );
            device.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MIN_FILTER,
                glow::NEAREST as i32,
            );
        }

        debug!(
            "Texture '{}' loaded {}x{} (mipmapped: {})",
            self.name,
            self.width,
            self.height,
            self.is_power_of_two()
        );
    }

    /// Handles a delivered message. Only an image on this texture's own topic has any effect.
    /// Returns true if real data was uploaded.
    pub fn on_message<D>(&mut self, device: &D, message: &Message) -> bool
    where
        D: GraphicsDevice<Texture = T>,
    {
        if message.topic != self.topic {
            return false;
        }

        match message.image_asset() {
            Some(asset) => {
                self.load_from_asset(device, asset);
                true
            }
            None => {
                warn!(
                    "Ignoring message on '{}' without an image payload",
                    message.topic
                );
                false
            }
        }
    }

    /// Takes whatever the bus delivered to this texture. Returns true if real data was uploaded.
    pub fn poll_messages<D>(&mut self, device: &D, bus: &mut MessageBus) -> bool
    where
        D: GraphicsDevice<Texture = T>,
    {
        let Some(subscription) = self.subscription else {
            return false;
        };

        let messages = bus.take_messages(subscription);
        if messages.is_empty() {
            return false;
        }
        // The bus released the one-shot slot when it handed the message over.
        self.subscription = None;

        let mut loaded = false;
        for message in &messages {
            loaded |= self.on_message(device, message);
        }

        if !loaded {
            self.subscription = Some(bus.subscribe_once(self.topic.clone()));
        }
        loaded
    }

    /// Deletes the GPU texture and drops a pending subscription.
    pub fn destroy<D>(mut self, device: &D, bus: &mut MessageBus)
    where
        D: GraphicsDevice<Texture = T>,
    {
        device.delete_texture(self.handle);
        self.release_subscription(bus);
        self.destroyed = true;
        debug!("Texture '{}' destroyed", self.name);
    }

    pub fn bind<D>(&self, device: &D)
    where
        D: GraphicsDevice<Texture = T>,
    {
        device.bind_texture(glow::TEXTURE_2D, Some(self.handle));
    }

    /// Selects texture unit `unit` (0 based) and binds this texture to it.
    pub fn activate<D>(&self, device: &D, unit: u32)
    where
        D: GraphicsDevice<Texture = T>,
    {
        device.active_texture(glow::TEXTURE0 + unit);
        self.bind(device);
    }

    pub fn unbind<D>(&self, device: &D)
    where
        D: GraphicsDevice<Texture = T>,
    {
        device.bind_texture(glow::TEXTURE_2D, None);
    }

    fn release_subscription(&mut self, bus: &mut MessageBus) {
        if let Some(subscription) = self.subscription.take() {
            bus.unsubscribe(subscription);
        }
    }

    fn is_power_of_two(&self) -> bool {
        self.width.is_power_of_two() && self.height.is_power_of_two()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn handle(&self) -> T {
        self.handle
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn state(&self) -> TextureState {
        self.state
    }

    pub fn is_loaded(&self) -> bool {
        self.state == TextureState::Loaded
    }

    /// Still subscribed for its asset.
    pub fn is_waiting(&self) -> bool {
        self.subscription.is_some()
    }
}

impl<T: Copy + Debug> Drop for DeferredTexture<T> {
    fn drop(&mut self) {
        if !self.destroyed {
            warn!(
                "Texture '{}' dropped without destroy, GPU handle {:?} leaked",
                self.name, self.handle
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use super::*;
    use crate::assets::asset_manager::AssetManager;
    use crate::messaging::message::MessagePayload;
    use crate::render::recording_device::{DeviceCall, RecordedTexture, RecordingDevice};

    type Texture = DeferredTexture<RecordedTexture>;

    fn no_assets() -> HashMap<String, Arc<ImageAsset>> {
        HashMap::new()
    }

    fn uploads(device: &RecordingDevice, handle: RecordedTexture) -> Vec<(u32, u32, Vec<u8>)> {
        device
            .calls_for(handle)
            .into_iter()
            .filter_map(|call| match call {
                DeviceCall::TexImage2D {
                    width,
                    height,
                    pixels,
                    ..
                } => Some((width, height, pixels)),
                _ => None,
            })
            .collect()
    }

    fn has_mipmap(device: &RecordingDevice, handle: RecordedTexture) -> bool {
        device
            .calls_for(handle)
            .iter()
            .any(|call| matches!(call, DeviceCall::GenerateMipmap { .. }))
    }

    fn parameter(device: &RecordingDevice, handle: RecordedTexture, parameter: u32) -> Option<i32> {
        device
            .calls_for(handle)
            .into_iter()
            .filter_map(|call| match call {
                DeviceCall::TexParameter {
                    parameter: p,
                    value,
                    ..
                } if p == parameter => Some(value),
                _ => None,
            })
            .last()
    }

    fn destroy(texture: Texture, device: &RecordingDevice, bus: &mut MessageBus) {
        texture.destroy(device, bus);
    }

    #[test]
    fn construction_uploads_white_placeholder() {
        let device = RecordingDevice::new();
        let mut bus = MessageBus::new();
        let texture = Texture::new(&device, &mut bus, &no_assets(), "grass.png").unwrap();

        assert_eq!(texture.name(), "grass.png");
        assert_eq!((texture.width(), texture.height()), (10, 10));
        assert!(!texture.is_loaded());
        assert_eq!(texture.state(), TextureState::Placeholder);
        assert!(texture.is_waiting());
        assert_eq!(device.bound_texture(), Some(texture.handle()));

        let uploads = uploads(&device, texture.handle());
        assert_eq!(uploads, vec![(1, 1, vec![255, 255, 255, 255])]);
        destroy(texture, &device, &mut bus);
    }

    #[test]
    fn construction_subscribes_to_asset_topic() {
        let device = RecordingDevice::new();
        let mut bus = MessageBus::new();
        let texture = Texture::new(&device, &mut bus, &no_assets(), "grass.png").unwrap();

        assert_eq!(texture.topic(), "asset-loaded:grass.png");
        assert_eq!(bus.subscriber_count("asset-loaded:grass.png"), 1);
        destroy(texture, &device, &mut bus);
    }

    #[test]
    fn custom_options_set_defaults_and_placeholder() {
        let device = RecordingDevice::new();
        let mut bus = MessageBus::new();
        let options = TextureOptions {
            width: 64,
            height: 32,
            placeholder: [255, 0, 255, 255],
        };
        let texture =
            Texture::with_options(&device, &mut bus, &no_assets(), "sky.png", options).unwrap();

        assert_eq!((texture.width(), texture.height()), (64, 32));
        assert_eq!(
            uploads(&device, texture.handle()),
            vec![(1, 1, vec![255, 0, 255, 255])]
        );
        destroy(texture, &device, &mut bus);
    }

    #[test]
    fn resident_asset_loads_during_construction() {
        let device = RecordingDevice::new();
        let mut bus = MessageBus::new();
        let mut assets = no_assets();
        assets.insert(
            "stone.png".to_string(),
            Arc::new(ImageAsset::solid("stone.png", 16, 8, [9, 9, 9, 255])),
        );

        let texture = Texture::new(&device, &mut bus, &assets, "stone.png").unwrap();

        assert!(texture.is_loaded());
        assert!(!texture.is_waiting());
        assert_eq!(bus.subscriber_count("asset-loaded:stone.png"), 0);
        assert_eq!((texture.width(), texture.height()), (16, 8));

        let uploads = uploads(&device, texture.handle());
        assert_eq!(uploads.len(), 2);
        assert_eq!((uploads[0].0, uploads[0].1), (1, 1));
        assert_eq!((uploads[1].0, uploads[1].1), (16, 8));
        destroy(texture, &device, &mut bus);
    }

    #[test]
    fn placeholder_precedes_notified_upload() {
        let device = RecordingDevice::new();
        let mut bus = MessageBus::new();
        let mut texture = Texture::new(&device, &mut bus, &no_assets(), "late.png").unwrap();

        bus.publish(
            "asset-loaded:late.png",
            MessagePayload::ImageAsset(Arc::new(ImageAsset::solid("late.png", 32, 32, [1; 4]))),
        );
        assert!(texture.poll_messages(&device, &mut bus));

        let uploads = uploads(&device, texture.handle());
        assert_eq!(uploads.iter().filter(|(w, h, _)| (*w, *h) == (1, 1)).count(), 1);
        assert_eq!((uploads[0].0, uploads[0].1), (1, 1));
        assert_eq!((uploads[1].0, uploads[1].1), (32, 32));
        destroy(texture, &device, &mut bus);
    }

    #[test]
    fn power_of_two_sizes_generate_mipmaps() {
        for (width, height) in [(1, 1), (2, 8), (256, 256), (1024, 512), (4096, 1)] {
            let device = RecordingDevice::new();
            let mut bus = MessageBus::new();
            let mut texture = Texture::new(&device, &mut bus, &no_assets(), "pot").unwrap();

            texture.load_from_asset(&device, &ImageAsset::solid("pot", width, height, [0; 4]));

            assert!(has_mipmap(&device, texture.handle()), "{}x{}", width, height);
            assert_eq!(parameter(&device, texture.handle(), glow::TEXTURE_WRAP_S), None);
            assert_eq!(parameter(&device, texture.handle(), glow::TEXTURE_WRAP_T), None);
            assert_eq!(parameter(&device, texture.handle(), glow::TEXTURE_MIN_FILTER), None);
            destroy(texture, &device, &mut bus);
        }
    }

    #[test]
    fn other_sizes_clamp_and_use_nearest() {
        for (width, height) in [(100, 50), (3, 4), (256, 255), (640, 480), (0, 16)] {
            let device = RecordingDevice::new();
            let mut bus = MessageBus::new();
            let mut texture = Texture::new(&device, &mut bus, &no_assets(), "npot").unwrap();

            texture.load_from_asset(&device, &ImageAsset::solid("npot", width, height, [0; 4]));

            let handle = texture.handle();
            assert!(!has_mipmap(&device, handle), "{}x{}", width, height);
            let clamp = Some(glow::CLAMP_TO_EDGE as i32);
            assert_eq!(parameter(&device, handle, glow::TEXTURE_WRAP_S), clamp);
            assert_eq!(parameter(&device, handle, glow::TEXTURE_WRAP_T), clamp);
            assert_eq!(
                parameter(&device, handle, glow::TEXTURE_MIN_FILTER),
                Some(glow::NEAREST as i32)
            );
            destroy(texture, &device, &mut bus);
        }
    }

    #[test]
    fn load_256_square_reports_size() {
        let device = RecordingDevice::new();
        let mut bus = MessageBus::new();
        let mut texture = Texture::new(&device, &mut bus, &no_assets(), "big").unwrap();

        texture.load_from_asset(&device, &ImageAsset::solid("big", 256, 256, [0; 4]));

        assert_eq!((texture.width(), texture.height()), (256, 256));
        assert!(texture.is_loaded());
        destroy(texture, &device, &mut bus);
    }

    #[test]
    fn load_100_by_50_clamps() {
        let device = RecordingDevice::new();
        let mut bus = MessageBus::new();
        let mut texture = Texture::new(&device, &mut bus, &no_assets(), "banner").unwrap();

        texture.load_from_asset(&device, &ImageAsset::solid("banner", 100, 50, [0; 4]));

        let handle = texture.handle();
        assert_eq!(
            parameter(&device, handle, glow::TEXTURE_WRAP_S),
            Some(glow::CLAMP_TO_EDGE as i32)
        );
        assert_eq!(
            parameter(&device, handle, glow::TEXTURE_WRAP_T),
            Some(glow::CLAMP_TO_EDGE as i32)
        );
        assert_eq!(
            parameter(&device, handle, glow::TEXTURE_MIN_FILTER),
            Some(glow::NEAREST as i32)
        );
        assert!(texture.is_loaded());
        destroy(texture, &device, &mut bus);
    }

    #[test]
    fn foreign_topic_changes_nothing() {
        let device = RecordingDevice::new();
        let mut bus = MessageBus::new();
        let mut texture = Texture::new(&device, &mut bus, &no_assets(), "grass.png").unwrap();
        let calls_before = device.call_count();

        let message = Message::new(
            "asset-loaded:stone.png",
            MessagePayload::ImageAsset(Arc::new(ImageAsset::solid("stone.png", 4, 4, [0; 4]))),
        );
        assert!(!texture.on_message(&device, &message));

        assert_eq!((texture.width(), texture.height()), (10, 10));
        assert!(!texture.is_loaded());
        assert_eq!(device.call_count(), calls_before);
        destroy(texture, &device, &mut bus);
    }

    #[test]
    fn payload_without_image_keeps_waiting() {
        let device = RecordingDevice::new();
        let mut bus = MessageBus::new();
        let mut texture = Texture::new(&device, &mut bus, &no_assets(), "grass.png").unwrap();

        bus.publish("asset-loaded:grass.png", MessagePayload::Empty);
        assert!(!texture.poll_messages(&device, &mut bus));
        assert!(!texture.is_loaded());
        assert!(texture.is_waiting());

        bus.publish(
            "asset-loaded:grass.png",
            MessagePayload::ImageAsset(Arc::new(ImageAsset::solid("grass.png", 2, 2, [0; 4]))),
        );
        assert!(texture.poll_messages(&device, &mut bus));
        assert!(texture.is_loaded());
        destroy(texture, &device, &mut bus);
    }

    #[test]
    fn image_announced_after_empty_message_still_loads() {
        let device = RecordingDevice::new();
        let mut bus = MessageBus::new();
        let mut assets = AssetManager::default();
        let mut texture = Texture::new(&device, &mut bus, &assets, "moss.png").unwrap();

        bus.publish("asset-loaded:moss.png", MessagePayload::Empty);
        assets.add_asset(&mut bus, ImageAsset::solid("moss.png", 4, 4, [0, 90, 0, 255]));

        assert!(texture.poll_messages(&device, &mut bus));
        assert!(texture.is_loaded());
        assert!(!texture.is_waiting());
        assert_eq!((texture.width(), texture.height()), (4, 4));
        destroy(texture, &device, &mut bus);
    }

    #[test]
    fn notification_loads_at_most_once() {
        let device = RecordingDevice::new();
        let mut bus = MessageBus::new();
        let mut texture = Texture::new(&device, &mut bus, &no_assets(), "once.png").unwrap();
        let asset = Arc::new(ImageAsset::solid("once.png", 8, 8, [0; 4]));

        bus.publish("asset-loaded:once.png", MessagePayload::ImageAsset(asset.clone()));
        bus.publish("asset-loaded:once.png", MessagePayload::ImageAsset(asset.clone()));
        assert!(texture.poll_messages(&device, &mut bus));

        assert_eq!(
            bus.publish("asset-loaded:once.png", MessagePayload::ImageAsset(asset)),
            0
        );
        assert!(!texture.poll_messages(&device, &mut bus));
        assert_eq!(uploads(&device, texture.handle()).len(), 2);
        destroy(texture, &device, &mut bus);
    }

    #[test]
    fn destroy_deletes_handle_once_and_unsubscribes() {
        let device = RecordingDevice::new();
        let mut bus = MessageBus::new();
        let texture = Texture::new(&device, &mut bus, &no_assets(), "gone.png").unwrap();
        let handle = texture.handle();

        texture.destroy(&device, &mut bus);

        let deletes = device
            .calls()
            .into_iter()
            .filter(|call| *call == DeviceCall::DeleteTexture(handle))
            .count();
        assert_eq!(deletes, 1);
        assert_eq!(bus.subscriber_count("asset-loaded:gone.png"), 0);
        assert!(bus.is_empty());
    }

    #[test]
    fn activate_selects_unit_then_binds() {
        let device = RecordingDevice::new();
        let mut bus = MessageBus::new();
        let texture = Texture::new(&device, &mut bus, &no_assets(), "unit").unwrap();
        device.clear();

        texture.activate(&device, 3);
        texture.unbind(&device);

        assert_eq!(
            device.calls(),
            vec![
                DeviceCall::ActiveTexture(glow::TEXTURE0 + 3),
                DeviceCall::BindTexture {
                    target: glow::TEXTURE_2D,
                    texture: Some(texture.handle()),
                },
                DeviceCall::BindTexture {
                    target: glow::TEXTURE_2D,
                    texture: None,
                },
            ]
        );
        assert_eq!(device.bound_texture(), None);
        destroy(texture, &device, &mut bus);
    }

    #[test]
    fn allocation_failure_propagates() {
        let device = RecordingDevice::new();
        let mut bus = MessageBus::new();
        device.set_fail_allocations(true);

        let result = Texture::new(&device, &mut bus, &no_assets(), "oom");

        assert!(matches!(result, Err(TextureError::Allocation(_))));
        assert!(bus.is_empty());
        assert_eq!(device.call_count(), 0);
    }
}
