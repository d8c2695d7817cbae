// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Error types for the binding engine.
//!
//! Binding is designed to degrade rather than fail.  Of the three conditions here, only
//! [`SlotOverflow`] is a programming error; the others are recovered inside the engine
//! (the slot is left unbound, or a placeholder input layout is used) and are exposed
//! as values for diagnostics through [`crate::images::Pipeline::diagnose`].

use crate::bindings::resource_tracking::SlotRef;
use crate::bindings::visible_to::SlotKind;
use std::fmt::Display;

/// Why a resource refused to occupy a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum RejectReason {
    /// The resource category can never occupy this kind of slot (e.g. a sampler in a
    /// vertex-buffer slot).
    WrongKind,
    /// The resource was not created with a usage that permits this slot kind.
    MissingUsage,
    /// A shader was offered to the shader slot of a different stage.
    WrongStage,
    /// A vertex buffer without a registered vertex format.
    MissingVertexFormat,
    /// An index buffer without an index format.
    MissingIndexFormat,
}

impl Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::WrongKind => write!(f, "resource cannot occupy this kind of slot"),
            RejectReason::MissingUsage => write!(f, "resource usage does not permit this slot"),
            RejectReason::WrongStage => write!(f, "shader belongs to another stage"),
            RejectReason::MissingVertexFormat => write!(f, "buffer has no vertex format"),
            RejectReason::MissingIndexFormat => write!(f, "buffer has no index format"),
        }
    }
}

/// A resource refused attachment to a slot.
///
/// Non-fatal: the slot stays unbound and the pass continues.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{label} rejected by {slot}: {reason}")]
pub struct BindRejected {
    pub slot: SlotRef,
    pub label: String,
    pub reason: RejectReason,
}

/// The bound vertex buffers cannot feed the vertex shader's input signature.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum LayoutMismatch {
    #[error("shader input {semantic}{index} is not provided by any bound vertex buffer")]
    MissingElement { semantic: String, index: u32 },
}

/// A slot index or slot count beyond the hardware limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("slot {index} requested for {kind:?} but only {limit} slots exist")]
pub struct SlotOverflow {
    pub kind: SlotKind,
    pub index: u32,
    pub limit: u32,
}

/// Any error of the binding engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Reported by [`crate::images::Pipeline::diagnose`]; the pass itself continued.
    #[error(transparent)]
    BindRejected(#[from] BindRejected),
    /// Reported by [`crate::images::Pipeline::diagnose`]; a placeholder layout is bound.
    #[error(transparent)]
    LayoutMismatch(#[from] LayoutMismatch),
    /// Returned by the `try_*` constructors and accessors.
    #[error(transparent)]
    SlotOverflow(#[from] SlotOverflow),
}
