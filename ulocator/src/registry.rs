//! Type-indexed service registry with lazy singletons

use std::cell::RefCell;
use std::collections::hash_map::Entry;
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, OnceLock, Weak};
use std::thread;

use parking_lot::{Condvar, Mutex};
use rustc_hash::FxHashMap;
use tracing::{debug, error, trace, warn};

use crate::binding::Binding;
use crate::config::{RebindPolicy, RegistryConfig};
use crate::error::{DiError, DiResult};
use crate::key::TypeKey;
use crate::module::Interfaces;
use crate::slot::{BindingSlot, ErasedSlot, Step};

thread_local! {
    /// Factories running on this thread as (registry, interface), outermost first
    static RESOLVING: RefCell<Vec<(*const Registry, TypeKey)>> = const { RefCell::new(Vec::new()) };
}

/// Registry mapping interface types to their bindings.
///
/// Always handled through an `Arc`; see [`Registry::create`]. Factories
/// receive that `Arc` so they can resolve their own dependencies. The
/// registry only keeps a weak reference to itself, so dropping the last
/// external handle tears it down together with every cached instance.
pub struct Registry {
    this: Weak<Registry>,
    config: RegistryConfig,
    slots: Mutex<FxHashMap<TypeKey, Box<dyn ErasedSlot>>>,
    materialized: Condvar,
    interfaces: OnceLock<Interfaces>,
}

impl Registry {
    /// Create an empty registry with default settings
    pub fn create() -> Arc<Self> {
        Self::with_config(RegistryConfig::default())
    }

    /// Create an empty registry with the given settings
    pub fn with_config(config: RegistryConfig) -> Arc<Self> {
        debug!("Creating registry '{}'", config.name);
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            config,
            slots: Mutex::new(FxHashMap::default()),
            materialized: Condvar::new(),
            interfaces: OnceLock::new(),
        })
    }

    /// Settings this registry was created with
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Strong handle to this registry
    pub fn handle(&self) -> DiResult<Arc<Self>> {
        self.this.upgrade().ok_or(DiError::RegistryReleased)
    }

    /// Start a binding for interface `T`. Nothing is stored until the
    /// returned builder is finalized.
    pub fn bind<T>(&self) -> Binding<'_, T>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        Binding::new(self)
    }

    /// Resolve the implementation bound to `T`.
    ///
    /// Returns `Ok(None)` when `T` has no binding. A deferred factory runs at
    /// most once per registry; its result is cached and every later call
    /// returns the same `Arc`. Factory errors are returned unchanged and
    /// leave the binding unmaterialized, so a later call retries.
    pub fn resolve<T>(&self) -> DiResult<Option<Arc<T>>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let key = TypeKey::of::<T>();
        let current = thread::current().id();

        let factory = {
            let mut slots = self.slots.lock();
            loop {
                let step = match slots.get_mut(&key) {
                    None => {
                        trace!("No binding for {} in '{}'", key, self.config.name);
                        return Ok(None);
                    }
                    Some(erased) => match erased.downcast_mut::<BindingSlot<T>>() {
                        Some(slot) => slot.begin(current),
                        None => {
                            error!("Cannot cast binding slot {:?} to {}", erased.key(), key);
                            return Ok(None);
                        }
                    },
                };

                match step {
                    Step::Cached(instance) => {
                        trace!("Cache hit for {}", key);
                        return Ok(Some(instance));
                    }
                    Step::Construct(factory) => break factory,
                    Step::Reentered => {
                        return Err(DiError::CircularDependency {
                            path: self.cycle_path(key),
                        });
                    }
                    Step::Wait => {
                        trace!("Waiting for another thread to construct {}", key);
                        self.materialized.wait(&mut slots);
                    }
                }
            }
        };

        let mut guard = Materializing::<T>::new(self, key);
        let registry = self.handle()?;

        debug!("Materializing {} in '{}'", key, self.config.name);
        match factory(&registry) {
            Ok(instance) => {
                {
                    let mut slots = self.slots.lock();
                    if let Some(slot) = slots
                        .get_mut(&key)
                        .and_then(|erased| erased.downcast_mut::<BindingSlot<T>>())
                    {
                        slot.finish(&instance);
                    }
                    guard.disarm();
                }
                self.materialized.notify_all();
                Ok(Some(instance))
            }
            Err(err) => {
                error!("Factory for {} failed: {}", key, err);
                Err(err)
            }
        }
    }

    /// Like [`resolve`](Self::resolve), but an unbound interface is an error.
    pub fn require<T>(&self) -> DiResult<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.resolve::<T>()?.ok_or_else(DiError::not_found::<T>)
    }

    /// Whether `T` has a binding. Never constructs anything.
    pub fn can_resolve<T>(&self) -> bool
    where
        T: ?Sized + 'static,
    {
        self.slots.lock().contains_key(&TypeKey::of::<T>())
    }

    /// Whether `T` is bound and its instance already exists
    pub fn is_materialized<T>(&self) -> bool
    where
        T: ?Sized + 'static,
    {
        self.slots
            .lock()
            .get(&TypeKey::of::<T>())
            .is_some_and(|slot| slot.is_materialized())
    }

    /// Number of bound interfaces
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    /// Whether nothing has been bound yet
    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }

    /// Keys of all bound interfaces, sorted by type name
    pub fn bound_types(&self) -> Vec<TypeKey> {
        let mut keys: Vec<TypeKey> = self.slots.lock().keys().copied().collect();
        keys.sort_by_key(|key| key.name());
        keys
    }

    /// Loader for interface modules, created on first use
    pub fn interfaces(&self) -> &Interfaces {
        self.interfaces
            .get_or_init(|| Interfaces::new(self.this.clone()))
    }

    /// Store a slot for `T`, applying the configured rebind policy.
    ///
    /// `make` runs without the slot lock held, and only when the policy
    /// admits the binding.
    pub(crate) fn insert_slot<T>(&self, make: impl FnOnce() -> BindingSlot<T>) -> DiResult<()>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let key = TypeKey::of::<T>();
        {
            let slots = self.slots.lock();
            if let Some(existing) = slots.get(&key) {
                if !self.admits_rebind(key, &**existing)? {
                    return Ok(());
                }
            }
        }

        let slot: Box<dyn ErasedSlot> = Box::new(make());

        // Another binding may have landed while `make` ran.
        let mut slots = self.slots.lock();
        let replaced = match slots.entry(key) {
            Entry::Vacant(entry) => {
                entry.insert(slot);
                None
            }
            Entry::Occupied(mut entry) => {
                if !self.admits_rebind(key, &**entry.get())? {
                    return Ok(());
                }
                Some(entry.insert(slot))
            }
        };
        drop(slots);

        if replaced.is_some() {
            debug!("Replaced binding for {} in '{}'", key, self.config.name);
        } else {
            debug!("Bound {} in '{}'", key, self.config.name);
        }
        // Old instance is dropped here, outside the lock.
        drop(replaced);
        Ok(())
    }

    /// Apply the rebind policy to an occupied slot. `Ok(false)` keeps the
    /// existing binding.
    fn admits_rebind(&self, key: TypeKey, existing: &dyn ErasedSlot) -> DiResult<bool> {
        match self.config.rebind_policy {
            RebindPolicy::Reject => {
                warn!("Rejected duplicate binding for {}", key);
                Err(DiError::DuplicateBinding {
                    service_type: key.name(),
                })
            }
            RebindPolicy::KeepFirst => {
                warn!("Ignoring duplicate binding for {}; keeping the first", key);
                Ok(false)
            }
            RebindPolicy::Replace if existing.is_materializing() => {
                warn!("Cannot rebind {} while it is being constructed", key);
                Err(DiError::DuplicateBinding {
                    service_type: key.name(),
                })
            }
            RebindPolicy::Replace => Ok(true),
        }
    }

    /// Render the resolution stack from this registry's visit of `key`
    /// back to `key`.
    fn cycle_path(&self, key: TypeKey) -> String {
        let this: *const Registry = self;
        RESOLVING.with(|stack| {
            let stack = stack.borrow();
            let start = stack
                .iter()
                .rposition(|(owner, k)| *owner == this && *k == key)
                .unwrap_or(0);
            stack[start..]
                .iter()
                .map(|(_, k)| k)
                .chain(std::iter::once(&key))
                .map(|k| k.name())
                .collect::<Vec<_>>()
                .join(" -> ")
        })
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("name", &self.config.name)
            .field("rebind_policy", &self.config.rebind_policy)
            .field("bindings", &self.bound_types())
            .finish()
    }
}

/// Tracks one in-flight factory call.
///
/// Pushes `key` onto the thread's resolution stack. Unless disarmed, dropping
/// it (factory error or panic) returns the slot to its unmaterialized state
/// and wakes waiting threads.
struct Materializing<'a, T>
where
    T: ?Sized + Send + Sync + 'static,
{
    registry: &'a Registry,
    key: TypeKey,
    armed: bool,
    _interface: PhantomData<fn(Arc<T>)>,
}

impl<'a, T> Materializing<'a, T>
where
    T: ?Sized + Send + Sync + 'static,
{
    fn new(registry: &'a Registry, key: TypeKey) -> Self {
        RESOLVING.with(|stack| stack.borrow_mut().push((registry as *const Registry, key)));
        Self {
            registry,
            key,
            armed: true,
            _interface: PhantomData,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl<T> Drop for Materializing<'_, T>
where
    T: ?Sized + Send + Sync + 'static,
{
    fn drop(&mut self) {
        RESOLVING.with(|stack| {
            stack.borrow_mut().pop();
        });
        if !self.armed {
            return;
        }

        {
            let mut slots = self.registry.slots.lock();
            if let Some(slot) = slots.get_mut(&self.key) {
                if let Some(slot) = slot.downcast_mut::<BindingSlot<T>>() {
                    slot.abandon();
                }
            }
        }
        self.registry.materialized.notify_all();
    }
}
