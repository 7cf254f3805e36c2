// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.

pub mod glow_device;
pub mod graphics_device;
pub mod recording_device;
pub mod texture;
pub mod texture_resource_manager;
