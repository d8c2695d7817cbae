//! Resource usage and slot visibility declarations.
//!
//! Resources declare up front how they may be bound ([`BufferUsage`], [`TextureUsage`]).
//! Slots declare what kind of attachment point they are ([`SlotKind`]) and which stage
//! of the pipeline owns them ([`StageKind`]).  Attachment validation compares the two.
//!
//! # Examples
//!
//! ```
//! use binds_and_layouts::bindings::visible_to::{BufferUsage, SlotKind, SlotDirection};
//!
//! let usage = BufferUsage::VERTEX | BufferUsage::CONSTANT;
//! assert!(usage.permits(SlotKind::VertexBuffer));
//! assert!(!usage.permits(SlotKind::IndexBuffer));
//! assert_eq!(SlotKind::RenderTarget.direction(), SlotDirection::Output);
//! ```

bitflags::bitflags! {
    /// Declares the slot kinds a buffer may occupy.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u8 {
        /// The buffer contains vertex attribute data.
        const VERTEX = 1 << 0;
        /// The buffer contains index data for indexed drawing.
        const INDEX = 1 << 1;
        /// The buffer is read as constants by shader stages.
        const CONSTANT = 1 << 2;
    }
}

bitflags::bitflags! {
    /// Declares the slot kinds a texture may occupy.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUsage: u8 {
        /// The texture is sampled or read by shader stages.
        const SAMPLED = 1 << 0;
        /// The texture is written as a color attachment.
        const RENDER_TARGET = 1 << 1;
        /// The texture is used as the depth-stencil attachment.
        const DEPTH_STENCIL = 1 << 2;
    }
}

impl BufferUsage {
    /// Whether a buffer with this usage may occupy a slot of `kind`.
    pub fn permits(self, kind: SlotKind) -> bool {
        match kind {
            SlotKind::VertexBuffer => self.contains(BufferUsage::VERTEX),
            SlotKind::IndexBuffer => self.contains(BufferUsage::INDEX),
            SlotKind::ConstantBuffer => self.contains(BufferUsage::CONSTANT),
            _ => false,
        }
    }
}

impl TextureUsage {
    /// Whether a texture with this usage may occupy a slot of `kind`.
    pub fn permits(self, kind: SlotKind) -> bool {
        match kind {
            SlotKind::ShaderResource => self.contains(TextureUsage::SAMPLED),
            SlotKind::RenderTarget => self.contains(TextureUsage::RENDER_TARGET),
            SlotKind::DepthStencil => self.contains(TextureUsage::DEPTH_STENCIL),
            _ => false,
        }
    }
}

/// The kind of attachment point a slot is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKind {
    VertexBuffer,
    IndexBuffer,
    ConstantBuffer,
    ShaderResource,
    Sampler,
    Shader,
    RenderTarget,
    DepthStencil,
}

impl SlotKind {
    /// Whether the pipeline reads from or writes to resources in this slot.
    pub const fn direction(self) -> SlotDirection {
        match self {
            SlotKind::RenderTarget | SlotKind::DepthStencil => SlotDirection::Output,
            _ => SlotDirection::Input,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotDirection {
    Input,
    Output,
}

/// One logical stage of the graphics pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum StageKind {
    InputAssembler,
    Vertex,
    Fragment,
    Compute,
    OutputMerger,
}

impl StageKind {
    /// Whether this stage runs a shader program.
    pub const fn is_shader(self) -> bool {
        matches!(
            self,
            StageKind::Vertex | StageKind::Fragment | StageKind::Compute
        )
    }
}
