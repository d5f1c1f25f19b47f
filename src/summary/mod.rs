//! Summary engine: prompt, single model call, reply repair and rendering.

pub mod engine;
pub mod parser;
pub mod prompt;
pub mod render;
pub mod types;

pub use engine::SummaryEngine;
pub use parser::parse_reply;
pub use prompt::build_prompt;
pub use render::render;
pub use types::*;
