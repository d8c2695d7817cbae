/*! Pipeline stages, shaders and vertex input */

pub mod input_layout;
pub mod pipeline;
pub mod pipeline_stage;
pub mod shader;
pub mod vertex_layout;

pub use input_layout::InputLayoutCache;
pub use pipeline::Pipeline;
pub use pipeline_stage::PipelineStage;
pub use shader::Shader;
