use greenlet::{Builder, SwitchError};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let fiber = Builder::new().name("fragile").create(|| {
        println!("about to fail");
        let v: Vec<u32> = vec![];
        println!("{}", v[3]);
    }).unwrap();

    match greenlet::switch(&fiber) {
        Err(SwitchError::Panicked(failure)) => println!("caught: {}", failure),
        other => println!("unexpected: {:?}", other),
    }

    match greenlet::switch(&fiber) {
        Err(err) => println!("switching again: {}", err),
        Ok(()) => unreachable!(),
    }
}
