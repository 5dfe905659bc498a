//! # Trajectory context
//!
//! A [`Trajectory`] pairs a native trajectory handle with the engine that owns
//! it and remembers which compute names have been registered on it. Computes
//! keep only a weak reference, so dropping the last `Trajectory` clone
//! detaches every compute bound to it.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use tracing::warn;

use crate::engine::{AccumulatorHandle, Engine, TrajectoryHandle};
use crate::error::{ComputeError, Result};
use crate::registry::CollisionPolicy;

pub(crate) struct TrajectoryInner {
    handle: TrajectoryHandle,
    engine: Rc<dyn Engine>,
    computes: RefCell<IndexMap<String, AccumulatorHandle>>,
}

/// Shared handle to a loaded trajectory context
#[derive(Clone)]
pub struct Trajectory {
    inner: Rc<TrajectoryInner>,
}

impl Trajectory {
    /// Wrap a native trajectory handle owned by `engine`
    pub fn new(engine: Rc<dyn Engine>, handle: TrajectoryHandle) -> Self {
        Self {
            inner: Rc::new(TrajectoryInner {
                handle,
                engine,
                computes: RefCell::new(IndexMap::new()),
            }),
        }
    }

    pub fn handle(&self) -> TrajectoryHandle {
        self.inner.handle
    }

    pub fn engine(&self) -> &Rc<dyn Engine> {
        &self.inner.engine
    }

    /// Names of the computes registered on this trajectory, in registration order
    pub fn compute_names(&self) -> Vec<String> {
        self.inner.computes.borrow().keys().cloned().collect()
    }

    pub fn has_compute(&self, name: &str) -> bool {
        self.inner.computes.borrow().contains_key(name)
    }

    /// Accumulator currently registered under `name`
    pub fn accumulator(&self, name: &str) -> Option<AccumulatorHandle> {
        self.inner.computes.borrow().get(name).copied()
    }

    /// Apply the collision policy to `name` before anything is created
    pub(crate) fn check_name(&self, name: &str, policy: CollisionPolicy) -> Result<()> {
        if !self.has_compute(name) {
            return Ok(());
        }
        match policy {
            CollisionPolicy::Reject => Err(ComputeError::NameCollision(name.to_string())),
            CollisionPolicy::Overwrite => {
                warn!(
                    compute = name,
                    trajectory = %self.inner.handle,
                    "compute name already registered, the new compute replaces it"
                );
                Ok(())
            }
        }
    }

    /// Register `accumulator` under `name` with the engine and mirror it here
    pub(crate) fn register(&self, name: &str, accumulator: AccumulatorHandle) -> Result<()> {
        self.inner
            .engine
            .register_compute(self.inner.handle, accumulator, name)?;
        self.inner
            .computes
            .borrow_mut()
            .insert(name.to_string(), accumulator);
        Ok(())
    }

    /// Drop the registration of `name` if it still points at `accumulator`
    pub(crate) fn forget(&self, name: &str, accumulator: AccumulatorHandle) -> Result<()> {
        // Another compute took the name over, leave its registration alone
        if self.accumulator(name) != Some(accumulator) {
            return Ok(());
        }
        self.inner
            .engine
            .unregister_compute(self.inner.handle, accumulator, name)?;
        self.inner.computes.borrow_mut().shift_remove(name);
        Ok(())
    }

    pub(crate) fn downgrade(&self) -> Weak<TrajectoryInner> {
        Rc::downgrade(&self.inner)
    }

    pub(crate) fn upgrade(weak: &Weak<TrajectoryInner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    /// Whether two values refer to the same trajectory context
    pub fn ptr_eq(&self, other: &Trajectory) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Trajectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trajectory")
            .field("handle", &self.inner.handle)
            .field("engine", &self.inner.engine.backend_name())
            .field("computes", &self.compute_names())
            .finish()
    }
}
