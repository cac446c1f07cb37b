//! Runtime configuration.

use tracing::warn;

use crate::runtime::with_runtime;

/// Stack size given to fibers when neither the builder nor the environment asks for another one.
pub const DEFAULT_STACK_SIZE: usize = 256 * 1024;

/// Smallest stack a fiber will be created with. Smaller requests are raised to this.
pub const MIN_STACK_SIZE: usize = 16 * 1024;

/// Environment variable overriding [`DEFAULT_STACK_SIZE`] for every fiber of a thread.
/// Read once, when the thread first touches the runtime.
pub const STACK_SIZE_ENV: &str = "GREENLET_STACK_SIZE";

/// Stack size fibers created on this thread get unless their builder says otherwise.
pub fn stack_size() -> usize {
    with_runtime(|rt| rt.stack_size())
}

pub(crate) fn stack_size_from_env() -> usize {
    match std::env::var(STACK_SIZE_ENV) {
        Ok(raw) => parse_stack_size(&raw).unwrap_or_else(|| {
            warn!(value = %raw, "ignoring unparseable {}", STACK_SIZE_ENV);
            DEFAULT_STACK_SIZE
        }),
        Err(_) => DEFAULT_STACK_SIZE,
    }
}

pub(crate) fn parse_stack_size(raw: &str) -> Option<usize> {
    raw.trim().parse::<usize>().ok().filter(|size| *size > 0)
}

pub(crate) fn clamp_stack_size(size: usize) -> usize {
    size.max(MIN_STACK_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stack_size() {
        assert_eq!(parse_stack_size("65536"), Some(65536));
        assert_eq!(parse_stack_size(" 4096\n"), Some(4096));
        assert_eq!(parse_stack_size("0"), None);
        assert_eq!(parse_stack_size("64k"), None);
        assert_eq!(parse_stack_size(""), None);
    }

    #[test]
    fn test_clamp_stack_size() {
        assert_eq!(clamp_stack_size(1), MIN_STACK_SIZE);
        assert_eq!(clamp_stack_size(DEFAULT_STACK_SIZE), DEFAULT_STACK_SIZE);
    }
}
