/*! Defines binding types */

pub mod resource;
pub mod resource_tracking;
pub mod dirty_tracking;
pub mod bind_slot;
pub mod slot_group;
pub mod scalar_state;
pub mod visible_to;
pub mod buffer;
pub mod texture;
pub mod sampler;

pub use bind_slot::{BindSlot, BindStats};
pub use buffer::Buffer;
pub use resource::Bindable;
pub use sampler::{Sampler, SamplerCache};
pub use slot_group::{BindSlotGroup, RangePolicy};
pub use texture::Texture;
