// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.

use std::sync::Arc;

use crate::assets::image_asset::ImageAsset;

/// Prefix of the topic an asset is announced on once it is resident.
pub const ASSET_LOADED_TOPIC_PREFIX: &str = "asset-loaded:";

pub fn asset_loaded_topic(name: &str) -> String {
    format!("{}{}", ASSET_LOADED_TOPIC_PREFIX, name)
}

#[derive(Debug, Clone)]
pub enum MessagePayload {
    ImageAsset(Arc<ImageAsset>),
    Empty,
}

#[derive(Debug, Clone)]
pub struct Message {
    pub topic: String,
    pub payload: MessagePayload,
}

impl Message {
    pub fn new(topic: impl Into<String>, payload: MessagePayload) -> Self {
        Self {
            topic: topic.into(),
            payload,
        }
    }

    pub fn image_asset(&self) -> Option<&Arc<ImageAsset>> {
        match &self.payload {
            MessagePayload::ImageAsset(asset) => Some(asset),
            MessagePayload::Empty => None,
        }
    }
}
