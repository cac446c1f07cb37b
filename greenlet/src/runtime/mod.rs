// Runtime is the core of greenlet, holding every fiber of the thread and doing the jumps.

pub(crate) mod runtime;

use std::{
    cell::RefCell,
    panic::{self, AssertUnwindSafe},
};

use context::Transfer;
use tracing::warn;

use crate::{error::SwitchError, fiber::{FiberId, packet::Packet}, runtime::runtime::Runtime};

thread_local! {
    static RUNTIME: RefCell<Runtime> = RefCell::new(Runtime::new());
}

/// Run `f` against this thread's runtime.
/// `f` must not switch: the runtime stays borrowed for the duration of the call.
pub(crate) fn with_runtime<F, T>(f: F) -> T
where
    F: FnOnce(&mut Runtime) -> T,
{
    RUNTIME.with(|cell| f(&mut cell.borrow_mut()))
}

/// Like [`with_runtime`], but gives up instead of panicking when the runtime
/// is being torn down or is already borrowed.
pub(crate) fn try_with_runtime<F, T>(f: F) -> Option<T>
where
    F: FnOnce(&mut Runtime) -> T,
{
    RUNTIME
        .try_with(|cell| cell.try_borrow_mut().ok().map(|mut rt| f(&mut rt)))
        .ok()
        .flatten()
}

/// Suspend the current context and transfer control to `target`.
/// Returns once something switches back here, or once a fiber
/// whose return target is this context finishes.
pub(crate) fn switch_to(target: FiberId) -> Result<(), SwitchError> {
    let (cx, packet) = with_runtime(|rt| rt.prepare_switch(target))?;
    // SAFETY: `cx` was taken out of the runtime, so nobody else can resume it.
    let transfer = unsafe { cx.resume(packet.raw_ptr()) };
    land(transfer)
}

fn land(transfer: Transfer) -> Result<(), SwitchError> {
    // SAFETY: every jump in this crate hands over a fresh packet.
    let packet = unsafe { Packet::from_raw(transfer.data) };
    with_runtime(|rt| rt.land(transfer.context, *packet))
}

/// First frame of every fiber stack.
pub(crate) extern "C" fn fiber_entry(transfer: Transfer) -> ! {
    // Only a switch starts a fiber, never a finishing one.
    if let Err(err) = land(transfer) {
        warn!(%err, "fiber started by a dying context");
    }

    let (id, entry) = with_runtime(|rt| rt.take_entry());

    // Unwinding must not leave this stack.
    let panic = panic::catch_unwind(AssertUnwindSafe(entry)).err();
    if panic.is_some() {
        warn!(fiber = %id, "fiber panicked");
    }

    let (cx, packet) = with_runtime(|rt| rt.finish(panic));
    unsafe { cx.resume(packet.raw_ptr()) };

    unreachable!("dead fiber {} was resumed", id)
}
