// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! A complete pipeline: every stage plus the input layout.
//!
//! The renderer sets requested values on the stages at any time.  Right before a draw it
//! calls [`Pipeline::bind_draw`], which runs the stages in this order:
//!
//! 1. input assembler
//! 2. vertex stage
//! 3. input layout, consulted when the vertex buffers or the vertex shader changed
//! 4. fragment stage
//! 5. output merger
//!
//! The input layout is resolved after the vertex stage because it depends on the bound
//! vertex shader's input signature.  [`Pipeline::bind_dispatch`] binds the compute stage
//! only.

use crate::bindings::bind_slot::BindStats;
use crate::bindings::resource_tracking::PipelineId;
use crate::bindings::visible_to::StageKind;
use crate::config::{BindConfig, PipelineLimits};
use crate::error::Error;
use crate::images::input_layout::{InputLayout, InputLayoutCache};
use crate::images::pipeline_stage::{InputAssemblerStage, OutputMergerStage, PipelineStage, ShaderStage};
use crate::native::NativeBinder;
use std::sync::Arc;

#[derive(Debug)]
pub struct Pipeline {
    id: PipelineId,
    input_assembler: InputAssemblerStage,
    vertex: ShaderStage,
    fragment: ShaderStage,
    compute: ShaderStage,
    output_merger: OutputMergerStage,
    input_layout: Option<Arc<InputLayout>>,
    layout_dirty: bool,
    stats: BindStats,
}

impl Pipeline {
    /// # Panics
    ///
    /// Panics if `limits` exceed [`PipelineLimits::MAX`].
    pub fn new(limits: &PipelineLimits, config: &BindConfig) -> Self {
        match Self::try_new(limits, config) {
            Ok(pipeline) => pipeline,
            Err(err) => panic!("{err}"),
        }
    }

    pub fn try_new(limits: &PipelineLimits, config: &BindConfig) -> Result<Self, Error> {
        limits.validate()?;
        let id = PipelineId::next();
        logwise::trace_sync!("Pipeline::new {id}", id = id.get());
        Ok(Pipeline {
            id,
            input_assembler: InputAssemblerStage::new(id, limits, config),
            vertex: ShaderStage::new(StageKind::Vertex, id, limits, config),
            fragment: ShaderStage::new(StageKind::Fragment, id, limits, config),
            compute: ShaderStage::new(StageKind::Compute, id, limits, config),
            output_merger: OutputMergerStage::new(id, limits, config),
            input_layout: None,
            layout_dirty: true,
            stats: BindStats::default(),
        })
    }

    pub fn id(&self) -> PipelineId {
        self.id
    }

    pub fn input_assembler(&self) -> &InputAssemblerStage {
        &self.input_assembler
    }

    pub fn input_assembler_mut(&mut self) -> &mut InputAssemblerStage {
        &mut self.input_assembler
    }

    pub fn vertex(&self) -> &ShaderStage {
        &self.vertex
    }

    pub fn vertex_mut(&mut self) -> &mut ShaderStage {
        &mut self.vertex
    }

    pub fn fragment(&self) -> &ShaderStage {
        &self.fragment
    }

    pub fn fragment_mut(&mut self) -> &mut ShaderStage {
        &mut self.fragment
    }

    pub fn compute(&self) -> &ShaderStage {
        &self.compute
    }

    pub fn compute_mut(&mut self) -> &mut ShaderStage {
        &mut self.compute
    }

    pub fn output_merger(&self) -> &OutputMergerStage {
        &self.output_merger
    }

    pub fn output_merger_mut(&mut self) -> &mut OutputMergerStage {
        &mut self.output_merger
    }

    /// The input layout set by the last draw bind.
    pub fn input_layout(&self) -> Option<&Arc<InputLayout>> {
        self.input_layout.as_ref()
    }

    /// Cumulative counters since construction.
    pub fn stats(&self) -> BindStats {
        self.stats
    }

    /// Binds everything a draw needs.  Returns true if any native call was issued.
    pub fn bind_draw(&mut self, binder: &mut dyn NativeBinder, layouts: &mut InputLayoutCache) -> bool {
        let mut issued = self.input_assembler.bind(binder, &mut self.stats);
        issued |= self.vertex.bind(binder, &mut self.stats);
        if self.layout_dirty || self.input_assembler.vertex_buffers_changed() || self.vertex.shader_changed() {
            issued |= self.bind_input_layout(binder, layouts);
        }
        issued |= self.fragment.bind(binder, &mut self.stats);
        issued |= self.output_merger.bind(binder, &mut self.stats);
        issued
    }

    /// Binds everything a compute dispatch needs.
    pub fn bind_dispatch(&mut self, binder: &mut dyn NativeBinder) -> bool {
        self.compute.bind(binder, &mut self.stats)
    }

    fn bind_input_layout(&mut self, binder: &mut dyn NativeBinder, layouts: &mut InputLayoutCache) -> bool {
        let Some(signature) = self.vertex.input_signature() else {
            // no vertex shader bound yet; resolve once one is
            self.layout_dirty = true;
            return false;
        };
        let created = layouts.stats().created;
        let layout = layouts.get_or_create(self.input_assembler.vertex_buffers(), signature, binder);
        if layouts.stats().created == created {
            self.stats.layouts_reused += 1;
        } else {
            self.stats.layouts_created += 1;
        }
        self.layout_dirty = false;
        if self
            .input_layout
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, &layout))
        {
            return false;
        }
        binder.set_input_layout(layout.native());
        self.stats.native_calls += 1;
        self.input_layout = Some(layout);
        true
    }

    /// Reports what degraded the most recent bind passes, as an error value.
    ///
    /// Binding never fails: refused resources leave their slots unbound and a mismatched
    /// input layout is replaced by a placeholder.  This surfaces the first outstanding
    /// refusal, in stage order, or else the mismatch behind the bound placeholder layout.
    pub fn diagnose(&self) -> Result<(), Error> {
        let stages: [&dyn PipelineStage; 5] = [
            &self.input_assembler,
            &self.vertex,
            &self.fragment,
            &self.compute,
            &self.output_merger,
        ];
        if let Some(rejection) = stages.iter().find_map(|stage| stage.first_rejection()) {
            return Err(rejection.clone().into());
        }
        if let Some(mismatch) = self.input_layout.as_ref().and_then(|layout| layout.mismatch()) {
            return Err(mismatch.clone().into());
        }
        Ok(())
    }

    /// Forgets all bound state and clears every request, detaching every resource.
    ///
    /// Use after the native device state was lost; the next bind resends everything
    /// that is requested again.
    pub fn reset(&mut self) {
        self.input_assembler.reset();
        self.vertex.reset();
        self.fragment.reset();
        self.compute.reset();
        self.output_merger.reset();
        self.input_layout = None;
        self.layout_dirty = true;
    }
}
