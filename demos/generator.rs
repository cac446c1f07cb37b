//! A generator built on top of plain switching: the fiber hands values
//! to root through a shared cell and switches back after each one.

use std::{cell::Cell, rc::Rc};

use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let out = Rc::new(Cell::new(None));

    let o = out.clone();
    let fib = greenlet::create(move || {
        let (mut a, mut b) = (0u64, 1u64);
        loop {
            o.set(Some(a));
            greenlet::switch(&greenlet::root()).unwrap();
            (a, b) = (b, a + b);
        }
    }).unwrap();

    for _ in 0..10 {
        fib.switch().unwrap();
        if let Some(n) = out.take() {
            print!("{} ", n);
        }
    }
    println!();
}
