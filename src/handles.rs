// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.

use slotmap::new_key_type;

new_key_type! {
    pub struct TextureHandle;
    pub struct SubscriptionHandle;
}
