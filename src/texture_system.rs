// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.

use bevy_ecs::prelude::{Mut, ResMut, World};

use crate::assets::asset_manager::AssetManager;
use crate::messaging::message_bus::MessageBus;
use crate::render::graphics_device::GraphicsDevice;
use crate::render::texture_resource_manager::TextureResource;

pub struct TextureSystem;

impl TextureSystem {
    /// Decodes queued image loads and announces them on the bus.
    pub fn load_pending_assets(mut assets: ResMut<AssetManager>, mut bus: ResMut<MessageBus>) {
        assets.process_pending(&mut bus);
    }

    /// Hands announced assets to waiting textures. Runs outside the schedule because the
    /// device usually wraps a GL context that cannot leave the render thread.
    /// Returns how many textures finished loading.
    pub fn dispatch_asset_messages<D>(world: &mut World, device: &D) -> usize
    where
        D: GraphicsDevice,
    {
        world.resource_scope(|world, mut textures: Mut<TextureResource<D::Texture>>| {
            let mut bus = world.resource_mut::<MessageBus>();
            textures.dispatch_messages(device, &mut bus)
        })
    }
}
