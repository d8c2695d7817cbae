/*! binds_and_layouts is the resource-binding and state-diffing core of a GPU renderer.

Issuing a redundant bind call to a graphics driver costs throughput; missing one corrupts a
frame.  This crate sits between the code that decides *what* to draw and the code that talks
to the driver, and works out the minimum set of native bind calls for each draw or dispatch.

The pieces, leaves first:

| Piece | Module | Role |
|-------|--------|------|
| Resource tracking | [`bindings::resource_tracking`] | content versions and the slots a resource is attached to |
| Slot | [`bindings::bind_slot`] | requested vs. bound state of one attachment point |
| Slot group | [`bindings::slot_group`] | ranged binding of same-kind slots |
| Stages | [`images::pipeline_stage`] | input assembler, shader stages, output merger |
| Input layouts | [`images::input_layout`] | vertex buffers matched against shader inputs via composite keys |

# Flow

The renderer sets requested resources on a [`images::Pipeline`]'s stages whenever it likes.
Nothing reaches the driver until [`images::Pipeline::bind_draw`] (or `bind_dispatch`), which
diffs every slot and calls into a [`native::NativeBinder`] for the slots and ranges that
actually changed.

# Threads

Binding happens on the render thread and never blocks.  Resources are shared through `Arc` and
may be rewritten by loader threads, which publish each change by bumping the resource's
version last.  The next bind pass picks the change up; code that wants to sleep until then
can await [`bindings::resource_tracking::ResourceTracker::changed_since`] or a
[`bindings::dirty_tracking::ChangeAggregate`].

# Backends

The [`native::NativeBinder`] boundary is backend-neutral.  With the default `backend_wgpu`
feature, [`imp::wgpu`] converts input layouts, topologies and formats into
[wgpu](https://wgpu.rs) types and derives [`config::PipelineLimits`] from a device's limits.
*/

pub mod bindings;
pub mod config;
pub mod error;
pub mod images;
pub mod imp;
pub mod native;

pub use error::Error;
