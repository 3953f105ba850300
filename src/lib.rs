//! appsync-compiler
//!
//! Compiles an AppSync GraphQL API configuration into the CloudFormation
//! resources that deploy it.
//!
//! The pipeline is `parse` → [`validate`] → [`normalize`] → [`compile`]:
//!
//! ```no_run
//! use appsync_compiler::{compile::CompileContext, fs::LocalFs, compile_str};
//!
//! let content = std::fs::read_to_string("appsync.yml")?;
//! let fs = LocalFs;
//! let ctx = CompileContext::new(&fs, ".", chrono::Utc::now());
//! let compiled = compile_str(&content, &ctx)?;
//! println!("{}", serde_json::to_string_pretty(&compiled.resources)?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod compile;
pub mod config;
pub mod error;
pub mod fs;
pub mod model;
pub mod naming;
pub mod normalize;
pub mod resource;
pub mod sdl;
pub mod validate;

pub use compile::{compile, CompileContext, CompiledApi};
pub use error::{CompileError, Result};
pub use model::ApiConfiguration;
pub use resource::{Resource, ResourceGraph};

/// Parse, validate, normalize and compile a YAML or JSON configuration
pub fn compile_str(content: &str, ctx: &CompileContext) -> Result<CompiledApi> {
    let config = load_str(content)?;
    compile(&config, ctx)
}

/// Parse, validate and normalize a YAML or JSON configuration
pub fn load_str(content: &str) -> Result<ApiConfiguration> {
    let raw = validate::parse(content)?;
    validate::validate(&raw)?;
    normalize::normalize(raw)
}
