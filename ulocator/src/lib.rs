//! Service registry with lazily constructed singletons
//!
//! Interfaces (usually `dyn Trait`) are bound to an existing instance, an
//! eagerly default-constructed implementation or a factory. Resolution looks
//! up the binding by type, runs the factory at most once and caches the
//! result for the lifetime of the registry. Factories receive the registry
//! itself so they can resolve their own dependencies, and related bindings
//! can be grouped into interface modules.
//!
//! ```
//! use std::sync::Arc;
//! use ulocator::prelude::*;
//!
//! trait Greeter: Send + Sync {
//!     fn greet(&self) -> String;
//! }
//!
//! #[derive(Default)]
//! struct English;
//!
//! impl Greeter for English {
//!     fn greet(&self) -> String {
//!         "hello".into()
//!     }
//! }
//!
//! ulocator::implements!(English => dyn Greeter);
//!
//! # fn main() -> DiResult<()> {
//! let registry = Registry::create();
//! registry.bind::<dyn Greeter>().to_default::<English>()?;
//!
//! let greeter = registry.resolve::<dyn Greeter>()?.expect("bound above");
//! assert_eq!(greeter.greet(), "hello");
//! # Ok(())
//! # }
//! ```

pub mod binding;
pub mod config;
pub mod error;
pub mod key;
pub mod module;
pub mod registry;
mod slot;

pub use binding::{Binding, Implements};
pub use config::{RebindPolicy, RegistryConfig};
pub use error::{DiError, DiResult};
pub use key::TypeKey;
pub use module::{InterfaceModule, Interfaces};
pub use registry::Registry;
pub use slot::Factory;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    pub use crate::{
        Binding, DiError, DiResult, Implements, InterfaceModule, Interfaces, RebindPolicy,
        Registry, RegistryConfig,
    };
}
