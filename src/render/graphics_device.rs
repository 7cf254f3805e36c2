// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.

use std::fmt::Debug;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TextureError {
    #[error("Failed to allocate GPU texture: {0}")]
    Allocation(String),
}

/// The GPU-facing texture calls, taking the same `u32` enums as `glow`.
/// Every call mutates device state, so the device is passed explicitly wherever it is used.
pub trait GraphicsDevice {
    type Texture: Copy + Debug + PartialEq + Send + Sync + 'static;

    fn create_texture(&self) -> Result<Self::Texture, TextureError>;
    fn delete_texture(&self, texture: Self::Texture);
    fn bind_texture(&self, target: u32, texture: Option<Self::Texture>);
    /// `unit` is the full enum, i.e. `glow::TEXTURE0 + index`.
    fn active_texture(&self, unit: u32);
    #[allow(clippy::too_many_arguments)]
    fn tex_image_2d(
        &self,
        target: u32,
        level: i32,
        internal_format: i32,
        width: u32,
        height: u32,
        border: i32,
        format: u32,
        ty: u32,
        pixels: &[u8],
    );
    fn tex_parameter_i32(&self, target: u32, parameter: u32, value: i32);
    fn generate_mipmap(&self, target: u32);
}
