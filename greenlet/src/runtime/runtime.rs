use context::{stack::ProtectedFixedSizeStack, Context};
use tracing::{debug, trace};

use crate::{
    config,
    error::{Failure, SwitchError},
    fiber::{FiberId, Status, packet::Packet},
};

/// Per-fiber bookkeeping. Slot 0 is the root context,
/// which borrows the thread's own stack and has no entry.
pub(crate) struct Slot {
    pub(crate) generation: u32,
    /// Live handles, plus started fibers that still name this one as their return target.
    pub(crate) refs: usize,
    pub(crate) name: Option<String>,
    pub(crate) status: Status,
    /// Saved resumption point. Present exactly when the fiber is
    /// `NotStarted` or `Suspended`.
    pub(crate) cx: Option<Context>,
    pub(crate) stack: Option<ProtectedFixedSizeStack>,
    pub(crate) entry: Option<Box<dyn FnOnce() + 'static>>,
    /// Return target, bound by the switch that started the fiber.
    pub(crate) parent: Option<FiberId>,
}

impl Slot {
    fn root() -> Self {
        Self {
            generation: 0,
            refs: 0,
            name: None,
            status: Status::Active,
            cx: None,
            stack: None,
            entry: None,
            parent: None,
        }
    }

    pub(crate) fn new(
        name: Option<String>,
        stack: ProtectedFixedSizeStack,
        cx: Context,
        entry: Box<dyn FnOnce() + 'static>,
    ) -> Self {
        Self {
            generation: 0,
            refs: 1,
            name,
            status: Status::NotStarted,
            cx: Some(cx),
            stack: Some(stack),
            entry: Some(entry),
            parent: None,
        }
    }
}

/// What a collected fiber leaves behind. Entries can own fiber handles,
/// so this must be dropped after the runtime borrow is released.
#[derive(Default)]
pub(crate) struct Garbage {
    _entries: Vec<Box<dyn FnOnce() + 'static>>,
    _stacks: Vec<ProtectedFixedSizeStack>,
}

/// The fiber table of one thread.
///
/// Nothing here ever jumps. Callers take what they need out of the runtime,
/// release the borrow, and only then resume another context.
pub(crate) struct Runtime {
    slots: Vec<Slot>,
    free: Vec<usize>,
    current: FiberId,
    stack_size: usize,
}

impl Runtime {
    pub(crate) fn new() -> Self {
        Self {
            slots: vec![Slot::root()],
            free: vec![],
            current: FiberId::ROOT,
            stack_size: config::stack_size_from_env(),
        }
    }

    pub(crate) fn current(&self) -> FiberId {
        self.current
    }

    pub(crate) fn stack_size(&self) -> usize {
        self.stack_size
    }

    pub(crate) fn slot(&self, id: FiberId) -> &Slot {
        let slot = &self.slots[id.index];
        debug_assert_eq!(slot.generation, id.generation, "stale fiber id {}", id);
        slot
    }

    fn slot_mut(&mut self, id: FiberId) -> &mut Slot {
        let slot = &mut self.slots[id.index];
        debug_assert_eq!(slot.generation, id.generation, "stale fiber id {}", id);
        slot
    }

    pub(crate) fn insert(&mut self, mut slot: Slot) -> FiberId {
        let id = match self.free.pop() {
            Some(index) => {
                slot.generation = self.slots[index].generation.wrapping_add(1);
                self.slots[index] = slot;
                FiberId::new(index, self.slots[index].generation)
            },
            None => {
                self.slots.push(slot);
                FiberId::new(self.slots.len() - 1, 0)
            },
        };
        trace!(fiber = %id, name = ?self.slot(id).name, "fiber created");
        id
    }

    pub(crate) fn retain(&mut self, id: FiberId) {
        self.slot_mut(id).refs += 1;
    }

    /// Drop one reference to `id`, collecting it if it was the last.
    pub(crate) fn release(&mut self, id: FiberId) -> Garbage {
        let mut garbage = Garbage::default();
        if id != FiberId::ROOT {
            self.slot_mut(id).refs -= 1;
            self.collect(id, &mut garbage);
        }
        garbage
    }

    /// Free `id` if nothing refers to it and it will never run again,
    /// then do the same for its return target, which loses a reference.
    ///
    /// A running fiber is collected when it dies. A suspended one without
    /// references can never be resumed, but its frozen frames must stay mapped.
    fn collect(&mut self, mut id: FiberId, garbage: &mut Garbage) {
        loop {
            let slot = self.slot_mut(id);
            if slot.refs > 0 || !matches!(slot.status, Status::NotStarted | Status::Dead) {
                return;
            }
            garbage._entries.extend(slot.entry.take());
            garbage._stacks.extend(slot.stack.take());
            slot.cx = None;
            slot.name = None;
            slot.status = Status::Dead;
            let parent = slot.parent.take();
            self.free.push(id.index);
            trace!(fiber = %id, "fiber collected");

            match parent {
                Some(parent) if parent != FiberId::ROOT => {
                    self.slot_mut(parent).refs -= 1;
                    id = parent;
                },
                _ => return,
            }
        }
    }

    /// Validate a switch from the current context to `target` and commit the state change.
    /// Returns the context to jump to and the packet to hand it.
    pub(crate) fn prepare_switch(
        &mut self,
        target: FiberId,
    ) -> Result<(Context, Box<Packet>), SwitchError> {
        let from = self.current;
        let slot = self.slot_mut(target);
        match slot.status {
            Status::Dead => return Err(SwitchError::DeadTarget(target)),
            Status::Active => return Err(SwitchError::SelfOrActiveTarget(target)),
            Status::NotStarted => {
                debug!(fiber = %target, parent = %from, "fiber started");
                slot.parent = Some(from);
            },
            Status::Suspended => {},
        }
        let started = slot.status == Status::NotStarted;
        let cx = slot.cx.take().expect("resumable fiber without a saved context");
        slot.status = Status::Active;

        let caller = self.slot_mut(from);
        caller.status = Status::Suspended;
        if started && from != FiberId::ROOT {
            caller.refs += 1;
        }
        self.current = target;
        trace!(%from, to = %target, "switch");

        Ok((cx, Packet::switch(from)))
    }

    /// Book-keeping on the receiving side of a jump.
    /// `cx` is the context that just jumped here.
    /// A dead sender without references is collected; dead fibers hold no entry,
    /// so the garbage is dropped in place.
    pub(crate) fn land(&mut self, cx: Context, packet: Packet) -> Result<(), SwitchError> {
        match packet {
            Packet::Switch { from } => {
                let slot = self.slot_mut(from);
                assert!(slot.cx.is_none(), "fiber {} saved twice", from);
                slot.cx = Some(cx);
                Ok(())
            },
            Packet::Finish { from, panic } => {
                // The dead fiber's context points into its own stack; it must never be resumed.
                drop(cx);
                let slot = self.slot_mut(from);
                slot.stack = None;
                trace!(fiber = %from, "stack released");
                let result = match panic {
                    Some(payload) => Err(SwitchError::Panicked(Failure {
                        fiber: from,
                        name: slot.name.clone(),
                        payload,
                    })),
                    None => Ok(()),
                };
                let mut garbage = Garbage::default();
                self.collect(from, &mut garbage);
                result
            },
        }
    }

    /// Hand the entry procedure to the fiber that was just started.
    pub(crate) fn take_entry(&mut self) -> (FiberId, Box<dyn FnOnce() + 'static>) {
        let id = self.current;
        let entry = self.slot_mut(id).entry.take().expect("fiber started twice");
        (id, entry)
    }

    /// Mark the current fiber dead and pick the context that receives control:
    /// its return target, or the nearest live context above it.
    pub(crate) fn finish(
        &mut self,
        panic: Option<Box<dyn std::any::Any + Send + 'static>>,
    ) -> (Context, Box<Packet>) {
        let id = self.current;
        let dead = self.slot_mut(id);
        dead.status = Status::Dead;
        let mut to = dead.parent.unwrap_or(FiberId::ROOT);
        // Root never dies, so this stops.
        while self.slot(to).status == Status::Dead {
            to = self.slot(to).parent.unwrap_or(FiberId::ROOT);
        }
        debug!(fiber = %id, to = %to, panicked = panic.is_some(), "fiber finished");

        let target = self.slot_mut(to);
        let cx = target.cx.take().expect("return target without a saved context");
        target.status = Status::Active;
        self.current = to;

        (cx, Packet::finish(id, panic))
    }

    /// Exactly one context is active, and it is the current one.
    #[cfg(test)]
    pub(crate) fn check_single_active(&self) -> bool {
        let mut active = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.status == Status::Active);
        matches!((active.next(), active.next()), (Some((i, _)), None) if i == self.current.index)
    }

    #[cfg(test)]
    pub(crate) fn is_free(&self, id: FiberId) -> bool {
        self.free.contains(&id.index) && self.slots[id.index].generation == id.generation
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }
}
