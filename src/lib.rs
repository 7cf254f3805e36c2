// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.

pub mod assets;
pub mod handles;
pub mod messaging;
pub mod render;
pub mod settings;
pub mod texture_system;

pub use assets::asset_manager::{AssetManager, AssetSource};
pub use assets::image_asset::{AssetError, ImageAsset};
pub use handles::{SubscriptionHandle, TextureHandle};
pub use messaging::message::{
    ASSET_LOADED_TOPIC_PREFIX, Message, MessagePayload, asset_loaded_topic,
};
pub use messaging::message_bus::MessageBus;
pub use render::glow_device::GlowDevice;
pub use render::graphics_device::{GraphicsDevice, TextureError};
pub use render::recording_device::{DeviceCall, RecordedTexture, RecordingDevice};
pub use render::texture::{DeferredTexture, TextureOptions, TextureState};
pub use render::texture_resource_manager::TextureResource;
pub use settings::{SettingsError, TextureSettings};
pub use texture_system::TextureSystem;
