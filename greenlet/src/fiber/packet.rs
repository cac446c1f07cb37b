//! Packet is what travels alongside every context jump,
//! telling the landing side who jumped and why.

use std::any::Any;

use crate::fiber::FiberId;

pub(crate) enum Packet {
    /// `from` suspended itself in a switch and must be saved.
    Switch { from: FiberId },
    /// `from` is dead and its stack can be released.
    Finish {
        from: FiberId,
        panic: Option<Box<dyn Any + Send + 'static>>,
    },
}

impl Packet {
    pub fn switch(from: FiberId) -> Box<Self> {
        Box::new(Packet::Switch { from })
    }

    pub fn finish(from: FiberId, panic: Option<Box<dyn Any + Send + 'static>>) -> Box<Self> {
        Box::new(Packet::Finish { from, panic })
    }

    pub fn raw_ptr(self: Box<Self>) -> usize {
        Box::into_raw(self) as usize
    }

    /// SAFETY: `data` must come from [`Packet::raw_ptr`] and be consumed only once.
    pub unsafe fn from_raw(data: usize) -> Box<Self> {
        unsafe { Box::from_raw(data as *mut Packet) }
    }
}
