// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Shader objects and vertex-shader input signatures.
//!
//! Compilation and reflection happen elsewhere; this module only holds what binding
//! needs: which stage a shader belongs to and, for vertex shaders, the ordered list of
//! inputs the shader expects.

use crate::bindings::resource::Bindable;
use crate::bindings::resource_tracking::{ResourceTracker, SlotRef};
use crate::bindings::visible_to::{SlotKind, StageKind};
use crate::error::RejectReason;
use crate::native::NativeHandle;

/// One input the vertex shader expects, e.g. `TEXCOORD1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SignatureElement {
    pub semantic_name: String,
    pub semantic_index: u32,
}

impl SignatureElement {
    pub fn new(semantic_name: &str, semantic_index: u32) -> Self {
        SignatureElement {
            semantic_name: semantic_name.to_ascii_uppercase(),
            semantic_index,
        }
    }
}

/// The ordered inputs of a vertex shader, with a stable hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InputSignature {
    elements: Vec<SignatureElement>,
    hash: u32,
}

impl InputSignature {
    /// Builds a signature, hashing its elements.
    pub fn new(elements: Vec<SignatureElement>) -> Self {
        let hash = Self::hash_elements(&elements);
        InputSignature { elements, hash }
    }

    /// Builds a signature with a hash supplied by shader reflection.
    pub fn with_hash(elements: Vec<SignatureElement>, hash: u32) -> Self {
        InputSignature { elements, hash }
    }

    /// A signature for a shader that takes no vertex input.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn elements(&self) -> &[SignatureElement] {
        &self.elements
    }

    pub fn hash(&self) -> u32 {
        self.hash
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    fn hash_elements(elements: &[SignatureElement]) -> u32 {
        let mut bytes = Vec::with_capacity(elements.len() * 16);
        for element in elements {
            bytes.extend_from_slice(element.semantic_name.as_bytes());
            bytes.push(0);
            bytes.extend_from_slice(&element.semantic_index.to_le_bytes());
        }
        let wide = xxhash_rust::xxh3::xxh3_64(&bytes);
        (wide ^ (wide >> 32)) as u32
    }
}

#[derive(Debug)]
pub struct Shader {
    tracker: ResourceTracker,
    native: NativeHandle,
    stage: StageKind,
    signature: Option<InputSignature>,
}

impl Shader {
    pub fn vertex(label: &str, native: NativeHandle, signature: InputSignature) -> Self {
        Self::new(label, native, StageKind::Vertex, Some(signature))
    }

    pub fn fragment(label: &str, native: NativeHandle) -> Self {
        Self::new(label, native, StageKind::Fragment, None)
    }

    pub fn compute(label: &str, native: NativeHandle) -> Self {
        Self::new(label, native, StageKind::Compute, None)
    }

    fn new(label: &str, native: NativeHandle, stage: StageKind, signature: Option<InputSignature>) -> Self {
        Shader {
            tracker: ResourceTracker::new(label),
            native,
            stage,
            signature,
        }
    }

    pub fn stage(&self) -> StageKind {
        self.stage
    }

    /// The expected vertex inputs.  Only vertex shaders have one.
    pub fn input_signature(&self) -> Option<&InputSignature> {
        self.signature.as_ref()
    }
}

impl Bindable for Shader {
    fn tracker(&self) -> &ResourceTracker {
        &self.tracker
    }

    fn native(&self) -> NativeHandle {
        self.native
    }

    fn check_attach(&self, slot: SlotRef) -> Result<(), RejectReason> {
        if slot.kind != SlotKind::Shader {
            Err(RejectReason::WrongKind)
        } else if slot.stage != self.stage {
            Err(RejectReason::WrongStage)
        } else {
            Ok(())
        }
    }
}
