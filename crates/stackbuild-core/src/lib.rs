#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]

pub mod build;
pub mod config;
pub mod error;
pub mod resolver;
pub mod version;
pub mod vfs;

pub use build::{BuildRequest, BuildResult, BundleEngine, Orchestrator, Reporter};
pub use config::{Config, Target};
pub use error::Error;
pub use resolver::{Resolution, ResolveError, Resolver, ResolverConfig};
pub use version::VERSION;
pub use vfs::{FileSystem, FsError};
