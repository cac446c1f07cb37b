//! The last switch jumps into gr1, which prints 12, jumps to gr2, prints 56,
//! jumps back into gr1 and prints 34. Then gr1 finishes and control comes back
//! to the root's switch. 78 is never printed.

use std::{cell::OnceCell, rc::Rc};

use greenlet::Fiber;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let gr2_slot: Rc<OnceCell<Fiber>> = Rc::new(OnceCell::new());

    let slot = gr2_slot.clone();
    let gr1 = greenlet::create(move || {
        println!("12");
        slot.get().unwrap().switch().unwrap();
        println!("34");
    }).unwrap();

    let g1 = gr1.clone();
    let gr2 = greenlet::create(move || {
        println!("56");
        g1.switch().unwrap();
        println!("78");
    }).unwrap();
    gr2_slot.set(gr2.clone()).unwrap();

    gr1.switch().unwrap();

    println!("gr1 is {:?}, gr2 is {:?}", gr1.status(), gr2.status());
}
