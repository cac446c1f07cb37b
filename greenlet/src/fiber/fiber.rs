//! Fiber handles and the builder that makes them.

use std::{fmt, marker::PhantomData};

use context::{stack::ProtectedFixedSizeStack, Context};

use crate::{
    config,
    error::SwitchError,
    runtime::{fiber_entry, runtime::Slot, switch_to, try_with_runtime, with_runtime},
};

/// Identity of a fiber within the thread that created it.
///
/// Table slots are reused once a fiber is unreachable; the generation keeps
/// ids of old and new occupants apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FiberId {
    pub(crate) index: usize,
    pub(crate) generation: u32,
}

impl FiberId {
    /// Reserved for the root context.
    pub const ROOT: FiberId = FiberId::new(0, 0);

    pub(crate) const fn new(index: usize, generation: u32) -> Self {
        Self { index, generation }
    }
}

impl fmt::Display for FiberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.generation {
            0 => write!(f, "#{}", self.index),
            generation => write!(f, "#{}.{}", self.index, generation),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Created, entry procedure not called yet.
    NotStarted,
    /// Running right now. Exactly one context per thread is active.
    Active,
    /// Switched away; resumes from the switch call.
    Suspended,
    /// The entry procedure returned or panicked. Final.
    Dead,
}

/// Handle to a fiber or to the root context.
///
/// Handles are reference counted and tied to the thread that created them.
/// Once the last handle to a fiber is gone and nothing will return into it,
/// its table slot is reused. A fiber dropped before it ever ran has its stack
/// and entry freed right away. A suspended fiber nobody can reach stays frozen:
/// its stack is kept, and its locals are never dropped.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct Fiber {
    id: FiberId,
    _not_send: PhantomData<*const ()>,
}

impl Fiber {
    /// Wrap a reference the runtime already counted.
    pub(crate) fn adopt(id: FiberId) -> Self {
        Self { id, _not_send: PhantomData }
    }

    /// Take a new reference to `id`.
    pub(crate) fn retain(id: FiberId) -> Self {
        if id != FiberId::ROOT {
            with_runtime(|rt| rt.retain(id));
        }
        Self::adopt(id)
    }

    /// Create a fiber with the default configuration. See [`Builder`].
    pub fn new<F>(entry: F) -> Result<Fiber, SwitchError>
    where
        F: FnOnce() + 'static,
    {
        Builder::new().create(entry)
    }

    /// The root context of the current thread.
    pub fn root() -> Fiber {
        Self::adopt(FiberId::ROOT)
    }

    pub fn id(&self) -> FiberId {
        self.id
    }

    pub fn is_root(&self) -> bool {
        self.id == FiberId::ROOT
    }

    pub fn status(&self) -> Status {
        with_runtime(|rt| rt.slot(self.id).status)
    }

    pub fn is_dead(&self) -> bool {
        self.status() == Status::Dead
    }

    pub fn is_current(&self) -> bool {
        with_runtime(|rt| rt.current() == self.id)
    }

    pub fn name(&self) -> Option<String> {
        with_runtime(|rt| rt.slot(self.id).name.clone())
    }

    /// The context that receives control when this fiber finishes.
    /// `None` until the fiber is started, and always for root.
    pub fn parent(&self) -> Option<Fiber> {
        with_runtime(|rt| rt.slot(self.id).parent).map(Fiber::retain)
    }

    /// Transfer control to this fiber. See [`switch`](crate::switch).
    pub fn switch(&self) -> Result<(), SwitchError> {
        switch_to(self.id)
    }
}

impl Clone for Fiber {
    fn clone(&self) -> Self {
        Self::retain(self.id)
    }
}

impl Drop for Fiber {
    fn drop(&mut self) {
        if self.is_root() {
            return;
        }
        // The runtime is gone already when handles die during thread teardown.
        let garbage = try_with_runtime(|rt| rt.release(self.id));
        // Dropped here, outside the runtime: entries may own handles themselves.
        drop(garbage);
    }
}

/// Fiber factory, which can be used in order to configure the properties of a new fiber.
#[derive(Debug, Default)]
pub struct Builder {
    name: Option<String>,
    stack_size: Option<usize>,
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name the fiber, for logs and failures.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Stack size in bytes. Raised to [`config::MIN_STACK_SIZE`] if smaller.
    pub fn stack_size(mut self, size: usize) -> Self {
        self.stack_size = Some(size);
        self
    }

    /// Allocate the fiber. It starts running on the first switch into it.
    pub fn create<F>(self, entry: F) -> Result<Fiber, SwitchError>
    where
        F: FnOnce() + 'static,
    {
        let size = match self.stack_size {
            Some(size) => size,
            None => with_runtime(|rt| rt.stack_size()),
        };
        let stack = ProtectedFixedSizeStack::new(config::clamp_stack_size(size))?;
        let cx = unsafe { Context::new(&stack, fiber_entry) };

        let slot = Slot::new(self.name, stack, cx, Box::new(entry));
        let id = with_runtime(|rt| rt.insert(slot));
        Ok(Fiber::adopt(id))
    }
}
