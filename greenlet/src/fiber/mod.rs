//! Fiber management module

pub(crate) mod fiber;
pub(crate) mod packet;

pub use fiber::{Builder, Fiber, FiberId, Status};

use crate::{error::SwitchError, runtime::with_runtime};

/// Create a fiber running `entry`. Nothing runs until the first [`switch`] into it.
pub fn create<F>(entry: F) -> Result<Fiber, SwitchError>
where
    F: FnOnce() + 'static,
{
    Builder::new().create(entry)
}

/// Suspend the calling context and run `target`, from its start or from
/// wherever it last switched away.
///
/// Returns `Ok(())` when some context switches back here. If a fiber started
/// from here dies instead, this returns when it does, with
/// [`SwitchError::Panicked`] if it panicked.
///
/// Fails without switching if `target` is dead or is the caller itself.
pub fn switch(target: &Fiber) -> Result<(), SwitchError> {
    target.switch()
}

/// Handle to the context running right now: root or a fiber.
pub fn current() -> Fiber {
    Fiber::retain(with_runtime(|rt| rt.current()))
}

/// Handle to the root context of this thread. A valid target from any fiber.
pub fn root() -> Fiber {
    Fiber::root()
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use crate::config::{DEFAULT_STACK_SIZE, MIN_STACK_SIZE};

    use super::*;

    #[test]
    fn test_create_does_not_run() {
        let ran = Rc::new(RefCell::new(false));
        let r = ran.clone();
        let fiber = create(move || *r.borrow_mut() = true).unwrap();
        assert!(!*ran.borrow());
        assert_eq!(fiber.status(), Status::NotStarted);
        assert_eq!(fiber.parent(), None);
        assert!(!fiber.is_root());
    }

    #[test]
    fn test_ids_are_unique() {
        let a = create(|| {}).unwrap();
        let b = create(|| {}).unwrap();
        assert_ne!(a.id(), b.id());
        assert_ne!(a.id(), FiberId::ROOT);
        assert_ne!(a, b);
    }

    #[test]
    fn test_current_inside_fiber() {
        let seen = Rc::new(RefCell::new(None));
        let s = seen.clone();
        let fiber = create(move || {
            let me = current();
            let running = me.is_current();
            *s.borrow_mut() = Some((me, running, root().status()));
        }).unwrap();
        switch(&fiber).unwrap();

        assert_eq!(*seen.borrow(), Some((fiber, true, Status::Suspended)));
        assert_eq!(current(), root());
        assert!(root().is_current());
    }

    #[test]
    fn test_builder_name() {
        let fiber = Builder::new().name("worker").create(|| {}).unwrap();
        assert_eq!(fiber.name().as_deref(), Some("worker"));
        assert_eq!(create(|| {}).unwrap().name(), None);
    }

    #[test]
    fn test_builder_tiny_stack_is_clamped() {
        let fiber = Builder::new().stack_size(1).create(|| {
            let buf = [1_u8; 4096];
            assert_eq!(buf.iter().map(|b| *b as usize).sum::<usize>(), 4096);
        }).unwrap();
        switch(&fiber).unwrap();
        assert!(fiber.is_dead());
        assert!(MIN_STACK_SIZE <= DEFAULT_STACK_SIZE);
    }

    #[test]
    fn test_allocation_error() {
        let res = Builder::new().stack_size(1 << 50).create(|| {});
        assert!(matches!(res, Err(SwitchError::Allocation(_))));
    }

    #[test]
    fn test_switch_to_root_from_root() {
        assert!(matches!(
            switch(&root()),
            Err(SwitchError::SelfOrActiveTarget(FiberId::ROOT))
        ));
        assert!(root().parent().is_none());
    }
}
