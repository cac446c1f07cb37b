use std::{any::Any, fmt, panic};

use context::stack::StackError;
use thiserror::Error;

use crate::fiber::FiberId;

/// Returned by [`create`](crate::create) and [`switch`](crate::switch).
#[derive(Debug, Error)]
pub enum SwitchError {
    /// The stack for a new fiber could not be allocated.
    #[error("failed to allocate fiber stack: {0}")]
    Allocation(#[from] StackError),

    /// The target already ran to completion.
    #[error("cannot switch to fiber {0}: it is dead")]
    DeadTarget(FiberId),

    /// The target is the context that is running right now.
    #[error("cannot switch to fiber {0}: it is already active")]
    SelfOrActiveTarget(FiberId),

    /// A fiber panicked, and control came back here because this context was its return target.
    #[error("{0}")]
    Panicked(Failure),
}

/// The panic that ended a fiber.
pub struct Failure {
    pub(crate) fiber: FiberId,
    pub(crate) name: Option<String>,
    pub(crate) payload: Box<dyn Any + Send + 'static>,
}

impl Failure {
    /// The fiber that panicked. It is dead now.
    pub fn fiber(&self) -> FiberId {
        self.fiber
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The panic message, if the payload was a string.
    pub fn message(&self) -> Option<&str> {
        if let Some(s) = self.payload.downcast_ref::<&'static str>() {
            Some(s)
        } else {
            self.payload.downcast_ref::<String>().map(String::as_str)
        }
    }

    pub fn into_payload(self) -> Box<dyn Any + Send + 'static> {
        self.payload
    }

    /// Continue the panic in the current context.
    pub fn resume_unwind(self) -> ! {
        panic::resume_unwind(self.payload)
    }
}

impl fmt::Debug for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Failure")
            .field("fiber", &self.fiber)
            .field("name", &self.name)
            .field("message", &self.message())
            .finish()
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fiber {}", self.fiber)?;
        if let Some(name) = &self.name {
            write!(f, " ({})", name)?;
        }
        match self.message() {
            Some(msg) => write!(f, " panicked: {}", msg),
            None => write!(f, " panicked"),
        }
    }
}
