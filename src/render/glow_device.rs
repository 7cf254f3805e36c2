// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.

use std::rc::Rc;

use glow::{Context as GlowContext, HasContext};

use crate::render::graphics_device::{GraphicsDevice, TextureError};

/// `GraphicsDevice` over a live `glow` context. Must be used on the thread that owns the context.
pub struct GlowDevice {
    pub gl: Rc<GlowContext>,
}

impl GlowDevice {
    pub fn new(gl: Rc<GlowContext>) -> Self {
        Self { gl }
    }
}

impl GraphicsDevice for GlowDevice {
    type Texture = glow::Texture;

    fn create_texture(&self) -> Result<Self::Texture, TextureError> {
        unsafe { self.gl.create_texture().map_err(TextureError::Allocation) }
    }

    fn delete_texture(&self, texture: Self::Texture) {
        unsafe { self.gl.delete_texture(texture) }
    }

    fn bind_texture(&self, target: u32, texture: Option<Self::Texture>) {
        unsafe { self.gl.bind_texture(target, texture) }
    }

    fn active_texture(&self, unit: u32) {
        unsafe { self.gl.active_texture(unit) }
    }

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
    ) {
        unsafe {
            self.gl.tex_image_2d(
                target,
                level,
                internal_format,
                gl_size(width),
                gl_size(height),
                border,
                format,
                ty,
                glow::PixelUnpackData::Slice(Some(pixels)),
            );
        }
    }

    fn tex_parameter_i32(&self, target: u32, parameter: u32, value: i32) {
        unsafe { self.gl.tex_parameter_i32(target, parameter, value) }
    }

    fn generate_mipmap(&self, target: u32) {
        unsafe { self.gl.generate_mipmap(target) }
    }
}

/// GL takes sizes as `GLsizei`. Anything past `i32::MAX` saturates instead of wrapping negative.
fn gl_size(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}
