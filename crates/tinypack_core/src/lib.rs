//! tinypack core: bundles an ES module graph into one self-contained script.

pub mod bundler;
pub mod compiler;
pub mod config;
pub mod error;
pub mod graph;
pub mod parser;
pub mod resolver;
pub mod runtime;
pub mod transform;

pub use bundler::{build, BuildReport};
pub use config::{Config, OutputConfig};
pub use error::{BundleError, ErrorKind, Result};
pub use graph::{GraphBuilder, ModuleRecord, ModuleTable};
pub use resolver::{ModuleId, PathResolver};
pub use transform::{EsmTransform, Transform, Transformed};
