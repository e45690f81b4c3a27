//! Per-interface binding storage

use std::sync::Arc;
use std::thread::ThreadId;

use downcast_rs::{impl_downcast, Downcast};

use crate::error::DiResult;
use crate::key::TypeKey;
use crate::registry::Registry;

/// Deferred constructor for an interface
pub type Factory<T> = Arc<dyn Fn(&Arc<Registry>) -> DiResult<Arc<T>> + Send + Sync>;

/// Type-erased view of a [`BindingSlot`], stored in the registry map.
pub(crate) trait ErasedSlot: Downcast + Send {
    fn key(&self) -> TypeKey;

    fn is_materialized(&self) -> bool;

    fn is_materializing(&self) -> bool;
}

impl_downcast!(ErasedSlot);

/// Progress of a deferred binding
pub(crate) enum Materialization<T: ?Sized> {
    Absent,
    InProgress(ThreadId),
    Present(Arc<T>),
}

/// Holds either a ready instance or a factory together with its cached result.
///
/// An `Instance` slot never runs anything. A `Deferred` slot moves from
/// `Absent` to `Present` at most once; `InProgress` only falls back to
/// `Absent` when the factory fails.
pub(crate) enum BindingSlot<T: ?Sized> {
    Instance(Arc<T>),
    Deferred {
        factory: Factory<T>,
        state: Materialization<T>,
    },
}

/// What the registry should do after inspecting a slot
pub(crate) enum Step<T: ?Sized> {
    Cached(Arc<T>),
    Construct(Factory<T>),
    Reentered,
    Wait,
}

impl<T: ?Sized + Send + Sync + 'static> BindingSlot<T> {
    pub(crate) fn instance(instance: Arc<T>) -> Self {
        BindingSlot::Instance(instance)
    }

    pub(crate) fn deferred(factory: Factory<T>) -> Self {
        BindingSlot::Deferred {
            factory,
            state: Materialization::Absent,
        }
    }

    /// Inspect the slot on behalf of `thread`, claiming construction if needed.
    pub(crate) fn begin(&mut self, thread: ThreadId) -> Step<T> {
        match self {
            BindingSlot::Instance(instance) => Step::Cached(Arc::clone(instance)),
            BindingSlot::Deferred { factory, state } => match state {
                Materialization::Present(instance) => Step::Cached(Arc::clone(instance)),
                Materialization::InProgress(owner) if *owner == thread => Step::Reentered,
                Materialization::InProgress(_) => Step::Wait,
                Materialization::Absent => {
                    *state = Materialization::InProgress(thread);
                    Step::Construct(Arc::clone(factory))
                }
            },
        }
    }

    /// Store the instance produced by a factory claimed through [`begin`](Self::begin).
    pub(crate) fn finish(&mut self, instance: &Arc<T>) {
        if let BindingSlot::Deferred { state, .. } = self {
            if matches!(state, Materialization::InProgress(_)) {
                *state = Materialization::Present(Arc::clone(instance));
            }
        }
    }

    /// Release a construction claim after the factory failed.
    pub(crate) fn abandon(&mut self) {
        if let BindingSlot::Deferred { state, .. } = self {
            if matches!(state, Materialization::InProgress(_)) {
                *state = Materialization::Absent;
            }
        }
    }
}

impl<T: ?Sized + Send + Sync + 'static> ErasedSlot for BindingSlot<T> {
    fn key(&self) -> TypeKey {
        TypeKey::of::<T>()
    }

    fn is_materialized(&self) -> bool {
        match self {
            BindingSlot::Instance(_) => true,
            BindingSlot::Deferred { state, .. } => matches!(state, Materialization::Present(_)),
        }
    }

    fn is_materializing(&self) -> bool {
        matches!(
            self,
            BindingSlot::Deferred {
                state: Materialization::InProgress(_),
                ..
            }
        )
    }
}
