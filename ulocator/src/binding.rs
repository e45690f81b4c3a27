//! Fluent binding of interfaces to implementations

use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::DiResult;
use crate::registry::Registry;
use crate::slot::{BindingSlot, Factory};

/// Conversion from an implementation handle to an interface handle.
///
/// Every type implements itself. Trait objects need an explicit impl, which
/// [`implements!`](crate::implements) generates:
///
/// ```
/// use ulocator::implements;
///
/// trait Clock: Send + Sync {
///     fn now(&self) -> u64;
/// }
///
/// #[derive(Default)]
/// struct FixedClock;
///
/// impl Clock for FixedClock {
///     fn now(&self) -> u64 {
///         42
///     }
/// }
///
/// implements!(FixedClock => dyn Clock);
/// ```
pub trait Implements<T: ?Sized>: Send + Sync + 'static {
    /// Upcast to the interface
    fn into_interface(self: Arc<Self>) -> Arc<T>;
}

impl<I: Send + Sync + 'static> Implements<I> for I {
    fn into_interface(self: Arc<Self>) -> Arc<I> {
        self
    }
}

/// Declare that an implementation type can be used for one or more
/// trait-object interfaces.
#[macro_export]
macro_rules! implements {
    ($implementation:ty => $($interface:ty),+ $(,)?) => {
        $(
            impl $crate::Implements<$interface> for $implementation {
                fn into_interface(
                    self: ::std::sync::Arc<Self>,
                ) -> ::std::sync::Arc<$interface> {
                    self
                }
            }
        )+
    };
}

/// Pending binding for interface `T`, returned by [`Registry::bind`].
///
/// Exactly one finalizer consumes it. If `T` is already bound, the
/// registry's [`RebindPolicy`](crate::RebindPolicy) decides the outcome.
#[must_use = "a binding does nothing until one of its `to_*` methods is called"]
pub struct Binding<'a, T: ?Sized> {
    registry: &'a Registry,
    _interface: PhantomData<fn(Arc<T>)>,
}

impl<'a, T> Binding<'a, T>
where
    T: ?Sized + Send + Sync + 'static,
{
    pub(crate) fn new(registry: &'a Registry) -> Self {
        Self {
            registry,
            _interface: PhantomData,
        }
    }

    /// Bind to an already constructed instance
    pub fn to_instance(self, instance: Arc<T>) -> DiResult<()> {
        self.registry.insert_slot(move || BindingSlot::instance(instance))
    }

    /// Bind to an implementation value, wrapping it in an `Arc`
    pub fn to_value<I>(self, value: I) -> DiResult<()>
    where
        I: Implements<T>,
    {
        self.to_instance(<I as Implements<T>>::into_interface(Arc::new(value)))
    }

    /// Bind to a factory that runs on first resolution.
    ///
    /// The factory receives the registry so it can resolve its own
    /// dependencies. Its result is cached for the lifetime of the registry.
    pub fn to_factory<F>(self, factory: F) -> DiResult<()>
    where
        F: Fn(&Arc<Registry>) -> DiResult<Arc<T>> + Send + Sync + 'static,
    {
        let factory: Factory<T> = Arc::new(factory);
        self.registry.insert_slot(move || BindingSlot::deferred(factory))
    }

    /// Bind to a default-constructed `I`, built immediately.
    ///
    /// Nothing is constructed when the binding is rejected.
    pub fn to_default<I>(self) -> DiResult<()>
    where
        I: Implements<T> + Default,
    {
        self.registry.insert_slot(|| {
            BindingSlot::instance(<I as Implements<T>>::into_interface(Arc::new(I::default())))
        })
    }

    /// Bind to a default-constructed `I`, built on first resolution
    pub fn to_constructor<I>(self) -> DiResult<()>
    where
        I: Implements<T> + Default,
    {
        self.to_factory(|_| Ok(<I as Implements<T>>::into_interface(Arc::new(I::default()))))
    }
}
