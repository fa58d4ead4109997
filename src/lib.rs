pub mod color;
pub mod config;
pub mod engine;
pub mod environment;
pub mod segments;
pub mod template;
pub mod utils;

pub use config::Config;
pub use engine::Engine;
pub use environment::{Environment, Flags, Shell, ShellEnvironment};
pub use template::{Renderer, Template, TemplateError};
