// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Vertex buffer layout descriptions.
//!
//! A [`VertexLayout`] describes the elements of one vertex buffer: which semantic each
//! element carries, its format and its byte offset.  Before a layout can be used by a
//! buffer it is registered with a [`VertexFormatRegistry`], which assigns it a non-zero
//! UID.  Structurally equal layouts receive the same UID, which is what lets the input
//! layout cache compare vertex formats by a single integer.
//!
//! # Example
//!
//! ```
//! use binds_and_layouts::images::vertex_layout::{VertexLayout, VertexElementFormat, VertexFormatRegistry};
//!
//! let mut layout = VertexLayout::new();
//! layout.add_element("POSITION", 0, VertexElementFormat::F32x3);
//! layout.add_element("TEXCOORD", 0, VertexElementFormat::F32x2);
//! assert_eq!(layout.stride(), 20);
//!
//! let mut registry = VertexFormatRegistry::new();
//! let a = registry.register(layout.clone());
//! let b = registry.register(layout);
//! assert_eq!(a.uid(), b.uid());
//! ```

use rustc_hash::FxHashMap;
use std::sync::Arc;

/// The data type of one vertex element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum VertexElementFormat {
    F32,
    F32x2,
    F32x3,
    F32x4,
    U32,
    U32x2,
    U32x3,
    U32x4,
    I32,
    U8x4,
    Unorm8x4,
    U16x2,
    F16x2,
    F16x4,
}

impl VertexElementFormat {
    /// Size of one element in bytes.
    pub const fn size(self) -> u32 {
        match self {
            VertexElementFormat::F32
            | VertexElementFormat::U32
            | VertexElementFormat::I32
            | VertexElementFormat::U8x4
            | VertexElementFormat::Unorm8x4
            | VertexElementFormat::U16x2
            | VertexElementFormat::F16x2 => 4,
            VertexElementFormat::F32x2 | VertexElementFormat::U32x2 | VertexElementFormat::F16x4 => 8,
            VertexElementFormat::F32x3 | VertexElementFormat::U32x3 => 12,
            VertexElementFormat::F32x4 | VertexElementFormat::U32x4 => 16,
        }
    }
}

/// Whether a buffer advances per vertex or per instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StepMode {
    #[default]
    Vertex,
    Instance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexFormat {
    Uint16,
    Uint32,
}

impl IndexFormat {
    pub const fn size(self) -> u32 {
        match self {
            IndexFormat::Uint16 => 2,
            IndexFormat::Uint32 => 4,
        }
    }
}

/// One element of a vertex buffer.
///
/// Semantic names are compared case-insensitively, so they are stored uppercased.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexElement {
    pub semantic_name: String,
    pub semantic_index: u32,
    pub format: VertexElementFormat,
    pub offset: u32,
}

/// Describes the layout of a vertex buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct VertexLayout {
    elements: Vec<VertexElement>,
    stride: u32,
    step: StepMode,
}

impl VertexLayout {
    /// Creates a new, empty per-vertex layout.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn per_instance() -> Self {
        VertexLayout {
            step: StepMode::Instance,
            ..Self::default()
        }
    }

    /// Appends an element directly after the previous one.
    pub fn add_element(&mut self, semantic_name: &str, semantic_index: u32, format: VertexElementFormat) -> &mut Self {
        let offset = self.stride;
        self.add_element_at(semantic_name, semantic_index, format, offset)
    }

    /// Adds an element at an explicit byte offset, growing the stride to cover it.
    pub fn add_element_at(
        &mut self,
        semantic_name: &str,
        semantic_index: u32,
        format: VertexElementFormat,
        offset: u32,
    ) -> &mut Self {
        self.elements.push(VertexElement {
            semantic_name: semantic_name.to_ascii_uppercase(),
            semantic_index,
            format,
            offset,
        });
        self.stride = self.stride.max(offset + format.size());
        self
    }

    pub fn elements(&self) -> &[VertexElement] {
        &self.elements
    }

    /// Finds the element carrying `semantic_name` / `semantic_index`.
    pub fn element(&self, semantic_name: &str, semantic_index: u32) -> Option<&VertexElement> {
        self.elements.iter().find(|e| {
            e.semantic_index == semantic_index && e.semantic_name.eq_ignore_ascii_case(semantic_name)
        })
    }

    /// Bytes from one vertex to the next.
    pub fn stride(&self) -> u32 {
        self.stride
    }

    pub fn step(&self) -> StepMode {
        self.step
    }
}

/// A registered vertex layout.
#[derive(Debug, PartialEq, Eq)]
pub struct VertexFormat {
    uid: u32,
    layout: VertexLayout,
}

impl VertexFormat {
    /// The format's UID.  Never zero; zero marks an unoccupied slot in composite keys.
    pub fn uid(&self) -> u32 {
        self.uid
    }

    pub fn layout(&self) -> &VertexLayout {
        &self.layout
    }

    pub fn stride(&self) -> u32 {
        self.layout.stride()
    }
}

/// Interns vertex layouts, assigning structurally equal layouts the same UID.
///
/// One registry is owned per device; UIDs from different registries are unrelated.
#[derive(Debug)]
pub struct VertexFormatRegistry {
    formats: FxHashMap<VertexLayout, Arc<VertexFormat>>,
    next_uid: u32,
}

impl Default for VertexFormatRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl VertexFormatRegistry {
    pub fn new() -> Self {
        VertexFormatRegistry {
            formats: FxHashMap::default(),
            next_uid: 1,
        }
    }

    pub fn register(&mut self, layout: VertexLayout) -> Arc<VertexFormat> {
        if let Some(format) = self.formats.get(&layout) {
            return Arc::clone(format);
        }
        let uid = self.next_uid;
        self.next_uid = uid.checked_add(1).expect("vertex format UIDs exhausted");
        let format = Arc::new(VertexFormat {
            uid,
            layout: layout.clone(),
        });
        self.formats.insert(layout, Arc::clone(&format));
        format
    }

    pub fn len(&self) -> usize {
        self.formats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }
}
