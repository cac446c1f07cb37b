use std::{
    cell::{Cell, OnceCell},
    rc::Rc,
};

use greenlet::{Builder, Fiber};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let pong_slot: Rc<OnceCell<Fiber>> = Rc::new(OnceCell::new());
    let hits = Rc::new(Cell::new(0));

    let (slot, h) = (pong_slot.clone(), hits.clone());
    let ping = Builder::new().name("ping").create(move || {
        let pong = slot.get().unwrap();
        for round in 0..5 {
            h.set(h.get() + 1);
            println!("ping {} (hits: {})", round, h.get());
            greenlet::switch(pong).unwrap();
        }
    }).unwrap();

    let (p, h) = (ping.clone(), hits.clone());
    let pong = Builder::new().name("pong").create(move || {
        loop {
            h.set(h.get() + 1);
            println!("    pong (hits: {})", h.get());
            greenlet::switch(&p).unwrap();
        }
    }).unwrap();
    pong_slot.set(pong.clone()).unwrap();

    greenlet::switch(&ping).unwrap();

    // pong is left suspended in its loop forever.
    println!("{} hits, ping {:?}, pong {:?}", hits.get(), ping.status(), pong.status());
}
