use super::{Attempt, RetryError, bounded};

#[test]
fn test_ready_on_first_attempt() {
    let mut calls = 0;
    let result = bounded::<_, ()>(5, || {
        calls += 1;
        Attempt::Ready(42)
    });
    assert_eq!(result, Ok(42));
    assert_eq!(calls, 1);
}

#[test]
fn test_transient_then_ready() {
    let mut calls = 0;
    let result = bounded::<_, ()>(5, || {
        calls += 1;
        if calls < 4 {
            Attempt::Transient
        } else {
            Attempt::Ready("done")
        }
    });
    assert_eq!(result, Ok("done"));
    assert_eq!(calls, 4);
}

#[test]
fn test_exhausted_after_exactly_ceiling_attempts() {
    let mut calls = 0u32;
    let result = bounded::<u8, ()>(4, || {
        calls += 1;
        Attempt::Transient
    });
    assert_eq!(result, Err(RetryError::Exhausted { attempts: 4 }));
    assert_eq!(calls, 4);
}

#[test]
fn test_fatal_stops_immediately() {
    let mut calls = 0;
    let result = bounded::<u8, &str>(10, || {
        calls += 1;
        Attempt::Fatal("broken")
    });
    assert_eq!(result, Err(RetryError::Fatal("broken")));
    assert_eq!(calls, 1);
}

#[test]
fn test_zero_ceiling_never_runs_the_operation() {
    let mut calls = 0;
    let result = bounded::<u8, ()>(0, || {
        calls += 1;
        Attempt::Ready(1)
    });
    assert_eq!(result, Err(RetryError::Exhausted { attempts: 0 }));
    assert_eq!(calls, 0);
}
