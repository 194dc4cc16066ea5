#![forbid(unsafe_code)]

//! rvm public facade crate.
//!
//! Re-exports the engine and, with the `template` feature, the display-tree
//! binder.

pub use rvm_core::{EngineConfig, Path, ReactiveError, Result};
pub use rvm_runtime::{ReactiveRoot, ReactiveRootBuilder, Value, Watcher};

#[cfg(feature = "template")]
pub use rvm_template::{Element, Node, Text, bind, mount};

pub mod prelude {
    pub use rvm_core as core;
    pub use rvm_runtime as runtime;
    #[cfg(feature = "template")]
    pub use rvm_template as template;

    pub use rvm_core::{ReactiveError, Result};
    pub use rvm_runtime::{IntoObserved, ReactiveRoot, Value};
}
