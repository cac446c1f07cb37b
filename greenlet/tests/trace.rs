//! Randomized switch scripts: the same script always produces the same trace,
//! one context is active at a time, and dead fibers stay dead.

use std::{cell::RefCell, rc::Rc};

use greenlet::{root, switch, Builder, Fiber, Status, SwitchError};
use proptest::prelude::*;

/// Index 0 is root; fiber `i` is index `i + 1`.
#[derive(Debug, Clone)]
struct Script {
    fibers: Vec<Vec<usize>>,
    root: Vec<usize>,
}

fn script() -> impl Strategy<Value = Script> {
    (1usize..5).prop_flat_map(|n| {
        (
            prop::collection::vec(prop::collection::vec(0..=n, 0..6), n),
            prop::collection::vec(0..=n, 1..8),
        )
            .prop_map(|(fibers, root)| Script { fibers, root })
    })
}

fn outcome(res: &Result<(), SwitchError>) -> &'static str {
    match res {
        Ok(()) => "ok",
        Err(SwitchError::DeadTarget(_)) => "dead",
        Err(SwitchError::SelfOrActiveTarget(_)) => "self",
        Err(SwitchError::Panicked(_)) => "panicked",
        Err(SwitchError::Allocation(_)) => "alloc",
    }
}

struct Recorder {
    handles: RefCell<Vec<Fiber>>,
    log: RefCell<Vec<String>>,
    /// Status of every context after every step.
    snapshots: RefCell<Vec<Vec<Status>>>,
}

impl Recorder {
    fn step(&self, who: &str, to: usize) {
        let target = self.handles.borrow()[to].clone();
        let res = switch(&target);
        self.log.borrow_mut().push(format!("{} -> {}: {}", who, to, outcome(&res)));

        let statuses = self.handles.borrow().iter().map(Fiber::status).collect();
        self.snapshots.borrow_mut().push(statuses);
    }
}

/// Run `script` and return its trace with every status snapshot taken along the way.
fn run(script: &Script) -> (Vec<String>, Vec<Vec<Status>>) {
    let rec = Rc::new(Recorder {
        handles: RefCell::new(vec![root()]),
        log: RefCell::new(vec![]),
        snapshots: RefCell::new(vec![]),
    });

    for (i, steps) in script.fibers.iter().enumerate() {
        let (r, steps) = (rec.clone(), steps.clone());
        let fiber = Builder::new()
            .stack_size(64 * 1024)
            .create(move || {
                let who = format!("f{}", i + 1);
                for to in steps {
                    r.step(&who, to);
                }
            })
            .unwrap();
        rec.handles.borrow_mut().push(fiber);
    }

    for to in &script.root {
        rec.step("root", *to);
    }

    let log = rec.log.borrow().clone();
    let snapshots = rec.snapshots.borrow().clone();
    (log, snapshots)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn same_script_same_trace(s in script()) {
        let (first, _) = run(&s);
        let (second, _) = run(&s);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn exactly_one_active(s in script()) {
        let (_, snapshots) = run(&s);
        for statuses in snapshots {
            let active = statuses.iter().filter(|s| **s == Status::Active).count();
            prop_assert_eq!(active, 1);
        }
        prop_assert!(root().is_current());
    }

    #[test]
    fn dead_stays_dead(s in script()) {
        let (_, snapshots) = run(&s);
        for pair in snapshots.windows(2) {
            for (before, after) in pair[0].iter().zip(&pair[1]) {
                if *before == Status::Dead {
                    prop_assert_eq!(*after, Status::Dead);
                }
            }
        }
    }
}
