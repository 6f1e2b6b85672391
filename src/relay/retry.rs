//! Bounded retry over operations whose outcomes split into ready,
//! transient and fatal. Shared by the encoder drain and the reconnect
//! path so the ceiling semantics stay identical.

pub enum Attempt<T, E> {
    Ready(T),
    Transient,
    Fatal(E),
}

#[derive(Debug, PartialEq, Eq)]
pub enum RetryError<E> {
    /// Every attempt up to the ceiling came back transient.
    Exhausted { attempts: u32 },
    Fatal(E),
}

/// Runs `op` until it is ready, fatal, or `ceiling` transient outcomes
/// have accumulated. A ceiling of zero fails immediately.
pub fn bounded<T, E>(
    ceiling: u32,
    mut op: impl FnMut() -> Attempt<T, E>,
) -> Result<T, RetryError<E>> {
    let mut attempts = 0u32;
    while attempts < ceiling {
        match op() {
            Attempt::Ready(value) => return Ok(value),
            Attempt::Fatal(err) => return Err(RetryError::Fatal(err)),
            Attempt::Transient => attempts += 1,
        }
    }
    Err(RetryError::Exhausted { attempts })
}

#[cfg(test)]
#[path = "retry_test.rs"]
mod retry_test;
