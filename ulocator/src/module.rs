//! Reusable bundles of bindings

use std::sync::{Arc, Weak};

use tracing::debug;

use crate::error::{DiError, DiResult};
use crate::registry::Registry;

/// A unit of registration logic.
///
/// `load` runs once against a registry and may bind interfaces or resolve
/// interfaces bound earlier.
pub trait InterfaceModule {
    /// Perform this module's bindings
    fn load(&self, registry: &Arc<Registry>) -> DiResult<()>;
}

impl<F> InterfaceModule for F
where
    F: Fn(&Arc<Registry>) -> DiResult<()>,
{
    fn load(&self, registry: &Arc<Registry>) -> DiResult<()> {
        self(registry)
    }
}

/// Loads interface modules into a registry, see [`Registry::interfaces`].
///
/// Modules load in call order, so a module can resolve anything bound by
/// the modules added before it.
#[derive(Debug)]
pub struct Interfaces {
    registry: Weak<Registry>,
}

impl Interfaces {
    pub(crate) fn new(registry: Weak<Registry>) -> Self {
        Self { registry }
    }

    /// Default-construct `M`, load it and discard it
    pub fn add<M>(&self) -> DiResult<&Self>
    where
        M: InterfaceModule + Default,
    {
        self.load(M::default())
    }

    /// Load an already constructed module
    pub fn load<M>(&self, module: M) -> DiResult<&Self>
    where
        M: InterfaceModule,
    {
        let registry = self.registry.upgrade().ok_or(DiError::RegistryReleased)?;
        debug!(
            "Loading interface module {} into '{}'",
            std::any::type_name::<M>(),
            registry.config().name
        );
        module.load(&registry)?;
        Ok(self)
    }
}
