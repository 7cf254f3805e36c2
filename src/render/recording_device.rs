// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.

use std::cell::{Cell, RefCell};

use crate::render::graphics_device::{GraphicsDevice, TextureError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordedTexture(pub u32);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCall {
    CreateTexture(RecordedTexture),
    DeleteTexture(RecordedTexture),
    BindTexture {
        target: u32,
        texture: Option<RecordedTexture>,
    },
    ActiveTexture(u32),
    TexImage2D {
        /// Texture bound when the upload was issued.
        texture: Option<RecordedTexture>,
        target: u32,
        level: i32,
        internal_format: i32,
        width: u32,
        height: u32,
        border: i32,
        format: u32,
        ty: u32,
        pixels: Vec<u8>,
    },
    TexParameter {
        texture: Option<RecordedTexture>,
        target: u32,
        parameter: u32,
        value: i32,
    },
    GenerateMipmap {
        texture: Option<RecordedTexture>,
        target: u32,
    },
}

/// Headless device that records every call and tracks the bound texture, like a GL
/// driver would. Texture units are not tracked separately.
#[derive(Default)]
pub struct RecordingDevice {
    calls: RefCell<Vec<DeviceCall>>,
    next_id: Cell<u32>,
    bound: Cell<Option<RecordedTexture>>,
    fail_allocations: Cell<bool>,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following `create_texture` fail, as if the driver ran out of memory.
    pub fn set_fail_allocations(&self, fail: bool) {
        self.fail_allocations.set(fail);
    }

    pub fn calls(&self) -> Vec<DeviceCall> {
        self.calls.borrow().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    pub fn clear(&self) {
        self.calls.borrow_mut().clear();
    }

    pub fn bound_texture(&self) -> Option<RecordedTexture> {
        self.bound.get()
    }

    /// Calls issued while `texture` was bound, plus its create/delete/bind calls.
    pub fn calls_for(&self, texture: RecordedTexture) -> Vec<DeviceCall> {
        self.calls
            .borrow()
            .iter()
            .filter(|call| match call {
                DeviceCall::CreateTexture(t) | DeviceCall::DeleteTexture(t) => *t == texture,
                DeviceCall::BindTexture { texture: t, .. } => *t == Some(texture),
                DeviceCall::ActiveTexture(_) => false,
                DeviceCall::TexImage2D { texture: t, .. }
                | DeviceCall::TexParameter { texture: t, .. }
                | DeviceCall::GenerateMipmap { texture: t, .. } => *t == Some(texture),
            })
            .cloned()
            .collect()
    }

    fn record(&self, call: DeviceCall) {
        self.calls.borrow_mut().push(call);
    }
}

impl GraphicsDevice for RecordingDevice {
    type Texture = RecordedTexture;

    fn create_texture(&self) -> Result<Self::Texture, TextureError> {
        if self.fail_allocations.get() {
            return Err(TextureError::Allocation("out of memory".to_string()));
        }
        // GL never hands out name 0.
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        let texture = RecordedTexture(id);
        self.record(DeviceCall::CreateTexture(texture));
        Ok(texture)
    }

    fn delete_texture(&self, texture: Self::Texture) {
        if self.bound.get() == Some(texture) {
            self.bound.set(None);
        }
        self.record(DeviceCall::DeleteTexture(texture));
    }

    fn bind_texture(&self, target: u32, texture: Option<Self::Texture>) {
        self.bound.set(texture);
        self.record(DeviceCall::BindTexture { target, texture });
    }

    fn active_texture(&self, unit: u32) {
        self.record(DeviceCall::ActiveTexture(unit));
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
        self.record(DeviceCall::TexImage2D {
            texture: self.bound.get(),
            target,
            level,
            internal_format,
            width,
            height,
            border,
            format,
            ty,
            pixels: pixels.to_vec(),
        });
    }

    fn tex_parameter_i32(&self, target: u32, parameter: u32, value: i32) {
        self.record(DeviceCall::TexParameter {
            texture: self.bound.get(),
            target,
            parameter,
            value,
        });
    }

    fn generate_mipmap(&self, target: u32) {
        self.record(DeviceCall::GenerateMipmap {
            texture: self.bound.get(),
            target,
        });
    }
}
