//! Reading the stack size from the environment. Kept in its own test binary,
//! since it changes the process environment.

use std::{env, hint::black_box, thread};

use greenlet::config::{self, DEFAULT_STACK_SIZE, STACK_SIZE_ENV};

#[test]
fn stack_size_from_environment() {
    // SAFETY: nothing else in this binary touches the environment.
    unsafe { env::set_var(STACK_SIZE_ENV, "2097152") };
    let (size, finished) = thread::spawn(|| {
        // Needs more than the default stack.
        let fiber = greenlet::create(|| {
            let buf = black_box([7_u8; 320 * 1024]);
            assert_eq!(buf[buf.len() - 1], 7);
        }).unwrap();
        greenlet::switch(&fiber).unwrap();
        (config::stack_size(), fiber.is_dead())
    }).join().unwrap();
    assert_eq!(size, 2097152);
    assert!(finished);

    unsafe { env::set_var(STACK_SIZE_ENV, "abc") };
    let size = thread::spawn(config::stack_size).join().unwrap();
    assert_eq!(size, DEFAULT_STACK_SIZE);

    unsafe { env::remove_var(STACK_SIZE_ENV) };
    let size = thread::spawn(|| {
        let fiber = greenlet::create(|| {}).unwrap();
        greenlet::switch(&fiber).unwrap();
        config::stack_size()
    }).join().unwrap();
    assert_eq!(size, DEFAULT_STACK_SIZE);
}
