//! Greenlet is a tiny library for cooperative, explicit-transfer concurrency in Rust.
//! It provides stackful fibers that hand control to each other by name,
//! and resume exactly where they left off when switched back into.
//!
//! ```no_run
//! use std::{cell::OnceCell, rc::Rc};
//!
//! let peer = Rc::new(OnceCell::new());
//! let p = peer.clone();
//! let first = greenlet::create(move || {
//!     println!("12");
//!     greenlet::switch(p.get().unwrap()).unwrap();
//!     println!("34");
//! }).unwrap();
//! let f = first.clone();
//! let second = greenlet::create(move || {
//!     println!("56");
//!     greenlet::switch(&f).unwrap();
//!     println!("78"); // never printed
//! }).unwrap();
//! peer.set(second).unwrap();
//!
//! greenlet::switch(&first).unwrap();
//! ```

pub mod config;
mod error;
pub mod fiber;
pub(crate) mod runtime;

pub use error::{Failure, SwitchError};
pub use fiber::{create, current, root, switch, Builder, Fiber, FiberId, Status};
