// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Matching bound vertex buffers against a vertex shader's input signature.
//!
//! The native input layout object depends on two things: the vertex formats of the
//! occupied vertex-buffer slots, and the inputs the vertex shader expects.  Both are
//! reduced to one [`CompositeHashKey`] per slot:
//!
//! ```text
//! key = (vertex_format_uid << 32) | shader_input_hash      (0 for an empty slot)
//! ```
//!
//! An [`InputLayout`] remembers the keys it was built for, so deciding whether it still
//! applies is a short integer comparison.  [`InputLayoutCache`] keeps one layout per
//! distinct key sequence and only asks the native layer to create a layout on a miss.
//!
//! When the bound buffers cannot feed the shader, a warning lists what the shader expected
//! and what the buffers provide, and a placeholder layout is used so rendering continues.
//! The placeholder is cached under the offending keys, so the warning is emitted once per
//! combination.

use crate::bindings::buffer::Buffer;
use crate::bindings::slot_group::BindSlotGroup;
use crate::error::LayoutMismatch;
use crate::images::shader::InputSignature;
use crate::images::vertex_layout::{StepMode, VertexElementFormat, VertexFormat};
use crate::native::{NativeBinder, NativeHandle};
use rustc_hash::FxHashMap;
use std::fmt::Write;
use std::sync::Arc;

/// The per-slot key an input layout is matched on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompositeHashKey(u64);

impl CompositeHashKey {
    /// The key of an empty slot.
    pub const UNOCCUPIED: CompositeHashKey = CompositeHashKey(0);

    pub const fn new(format_uid: u32, input_hash: u32) -> Self {
        CompositeHashKey(((format_uid as u64) << 32) | input_hash as u64)
    }

    pub const fn format_uid(self) -> u32 {
        (self.0 >> 32) as u32
    }

    pub const fn input_hash(self) -> u32 {
        self.0 as u32
    }

    pub const fn is_occupied(self) -> bool {
        self.0 != 0
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Computes the composite key of every bound vertex-buffer slot into `out`.
///
/// Trailing unoccupied slots are dropped, so groups of different sizes with the same
/// occupied prefix produce the same sequence.
pub fn composite_keys(
    vertex_buffers: &BindSlotGroup<Buffer>,
    signature: &InputSignature,
    out: &mut Vec<CompositeHashKey>,
) {
    out.clear();
    out.extend(vertex_buffers.slots().iter().map(|slot| {
        slot.bound()
            .and_then(|buffer| buffer.vertex_format())
            .map_or(CompositeHashKey::UNOCCUPIED, |format| {
                CompositeHashKey::new(format.uid(), signature.hash())
            })
    }));
    while out.last() == Some(&CompositeHashKey::UNOCCUPIED) {
        out.pop();
    }
}

/// One element of a native input layout.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InputElementDescriptor {
    pub semantic_name: String,
    pub semantic_index: u32,
    pub format: VertexElementFormat,
    /// The vertex-buffer slot the element is read from.
    pub input_slot: u32,
    /// Byte offset within a vertex of that slot.
    pub offset: u32,
}

/// One vertex-buffer slot of a native input layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InputBufferDescriptor {
    pub input_slot: u32,
    pub stride: u32,
    pub step: StepMode,
}

/// Everything the native layer needs to create an input layout.
///
/// Elements are in the shader's declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InputLayoutDescriptor {
    pub elements: Vec<InputElementDescriptor>,
    /// The occupied slots, in slot order.
    pub buffers: Vec<InputBufferDescriptor>,
    pub placeholder: bool,
}

impl InputLayoutDescriptor {
    /// A single `POSITION0` element read from slot 0.
    ///
    /// Used for shaders without vertex input, and in place of a layout that cannot be built.
    pub fn placeholder() -> Self {
        let format = VertexElementFormat::F32x4;
        InputLayoutDescriptor {
            elements: vec![InputElementDescriptor {
                semantic_name: "POSITION".to_owned(),
                semantic_index: 0,
                format,
                input_slot: 0,
                offset: 0,
            }],
            buffers: vec![InputBufferDescriptor {
                input_slot: 0,
                stride: format.size(),
                step: StepMode::Vertex,
            }],
            placeholder: true,
        }
    }

    /// Builds a layout feeding `signature` from `formats`, the vertex format of each slot.
    ///
    /// Each shader input is taken from the first occupied slot, in slot order, that has an
    /// element with the same semantic name (case-insensitively) and index.
    pub fn build(signature: &InputSignature, formats: &[Option<&VertexFormat>]) -> Result<Self, LayoutMismatch> {
        if signature.is_empty() {
            return Ok(Self::placeholder());
        }
        let mut elements = Vec::with_capacity(signature.len());
        for expected in signature.elements() {
            let found = formats.iter().enumerate().find_map(|(slot, format)| {
                let element = (*format)?
                    .layout()
                    .element(&expected.semantic_name, expected.semantic_index)?;
                Some((slot as u32, element))
            });
            let Some((input_slot, element)) = found else {
                return Err(LayoutMismatch::MissingElement {
                    semantic: expected.semantic_name.clone(),
                    index: expected.semantic_index,
                });
            };
            elements.push(InputElementDescriptor {
                semantic_name: element.semantic_name.clone(),
                semantic_index: element.semantic_index,
                format: element.format,
                input_slot,
                offset: element.offset,
            });
        }
        let buffers = formats
            .iter()
            .enumerate()
            .filter_map(|(slot, format)| {
                let format = (*format)?;
                Some(InputBufferDescriptor {
                    input_slot: slot as u32,
                    stride: format.stride(),
                    step: format.layout().step(),
                })
            })
            .collect();
        Ok(InputLayoutDescriptor {
            elements,
            buffers,
            placeholder: false,
        })
    }
}

/// A native input layout and the keys it was created for.
#[derive(Debug)]
pub struct InputLayout {
    keys: Vec<CompositeHashKey>,
    descriptor: InputLayoutDescriptor,
    native: NativeHandle,
    mismatch: Option<LayoutMismatch>,
}

impl InputLayout {
    /// Whether this layout applies to the slots described by `keys`.
    ///
    /// Slots past the end of either sequence count as unoccupied.
    pub fn matches(&self, keys: &[CompositeHashKey]) -> bool {
        let len = self.keys.len().max(keys.len());
        (0..len).all(|slot| self.key(slot) == keys.get(slot).copied().unwrap_or(CompositeHashKey::UNOCCUPIED))
    }

    /// The key slot `slot` had when this layout was created.
    pub fn key(&self, slot: usize) -> CompositeHashKey {
        self.keys.get(slot).copied().unwrap_or(CompositeHashKey::UNOCCUPIED)
    }

    pub fn keys(&self) -> &[CompositeHashKey] {
        &self.keys
    }

    pub fn native(&self) -> NativeHandle {
        self.native
    }

    pub fn descriptor(&self) -> &InputLayoutDescriptor {
        &self.descriptor
    }

    pub fn is_placeholder(&self) -> bool {
        self.descriptor.placeholder
    }

    /// Why this placeholder stands in for a layout that could not be built.
    ///
    /// `None` for real layouts and for the placeholder of a shader without vertex input.
    pub fn mismatch(&self) -> Option<&LayoutMismatch> {
        self.mismatch.as_ref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LayoutStats {
    pub created: u64,
    pub reused: u64,
    pub mismatches: u64,
}

/// Input layouts by composite key sequence.
///
/// One cache is owned per device and passed to [`crate::images::Pipeline::bind_draw`].
#[derive(Debug, Default)]
pub struct InputLayoutCache {
    layouts: FxHashMap<Vec<CompositeHashKey>, Arc<InputLayout>>,
    current: Option<Arc<InputLayout>>,
    keys: Vec<CompositeHashKey>,
    stats: LayoutStats,
}

impl InputLayoutCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the most recently returned layout applies to the current bindings.
    pub fn matches(&mut self, vertex_buffers: &BindSlotGroup<Buffer>, signature: &InputSignature) -> bool {
        composite_keys(vertex_buffers, signature, &mut self.keys);
        self.current.as_ref().is_some_and(|layout| layout.matches(&self.keys))
    }

    /// Returns the layout for the bound vertex buffers and `signature`, creating it
    /// through `binder` if no cached layout has the same keys.
    pub fn get_or_create(
        &mut self,
        vertex_buffers: &BindSlotGroup<Buffer>,
        signature: &InputSignature,
        binder: &mut dyn NativeBinder,
    ) -> Arc<InputLayout> {
        if self.matches(vertex_buffers, signature) {
            if let Some(current) = &self.current {
                self.stats.reused += 1;
                return Arc::clone(current);
            }
        }
        if let Some(cached) = self.layouts.get(self.keys.as_slice()) {
            let cached = Arc::clone(cached);
            self.stats.reused += 1;
            self.current = Some(Arc::clone(&cached));
            return cached;
        }

        let build = logwise::perfwarn_begin!("InputLayoutCache build");
        let formats: Vec<Option<&VertexFormat>> = vertex_buffers
            .slots()
            .iter()
            .map(|slot| slot.bound().and_then(|buffer| buffer.vertex_format()).map(|format| &**format))
            .collect();
        let (descriptor, mismatch) = match InputLayoutDescriptor::build(signature, &formats) {
            Ok(descriptor) => (descriptor, None),
            Err(mismatch) => {
                self.stats.mismatches += 1;
                logwise::warn_sync!(
                    "{mismatch}; shader expects [{expected}], vertex buffers provide [{provided}]; using a placeholder layout",
                    mismatch = logwise::privacy::LogIt(&mismatch),
                    expected = logwise::privacy::LogIt(&describe_expected(signature)),
                    provided = logwise::privacy::LogIt(&describe_provided(&formats))
                );
                (InputLayoutDescriptor::placeholder(), Some(mismatch))
            }
        };
        let native = binder.create_input_layout(&descriptor);
        drop(build);

        let layout = Arc::new(InputLayout {
            keys: self.keys.clone(),
            descriptor,
            native,
            mismatch,
        });
        self.stats.created += 1;
        logwise::info_sync!(
            "Created input layout {native} for {slots} vertex slots",
            native = native.get(),
            slots = self.keys.len()
        );
        self.layouts.insert(self.keys.clone(), Arc::clone(&layout));
        self.current = Some(Arc::clone(&layout));
        layout
    }

    /// The most recently returned layout.
    pub fn current(&self) -> Option<&Arc<InputLayout>> {
        self.current.as_ref()
    }

    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }

    pub fn stats(&self) -> LayoutStats {
        self.stats
    }

    /// Drops every cached layout.  Layouts still held elsewhere stay alive.
    pub fn clear(&mut self) {
        self.layouts.clear();
        self.current = None;
    }
}

fn describe_expected(signature: &InputSignature) -> String {
    let mut out = String::new();
    for (i, element) in signature.elements().iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "{}{}", element.semantic_name, element.semantic_index);
    }
    out
}

fn describe_provided(formats: &[Option<&VertexFormat>]) -> String {
    let mut out = String::new();
    for (slot, format) in formats.iter().enumerate() {
        let Some(format) = format else { continue };
        if !out.is_empty() {
            out.push_str("; ");
        }
        let _ = write!(out, "slot {slot}:");
        for element in format.layout().elements() {
            let _ = write!(
                out,
                " {}{}@{}",
                element.semantic_name, element.semantic_index, element.offset
            );
        }
    }
    out
}
