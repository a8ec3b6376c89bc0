use std::panic::Location;
use std::sync::{Mutex, MutexGuard};

/// Locks `mutex`, recovering the guard if a previous holder panicked.
#[track_caller]
pub(crate) fn lock<'a, T>(mutex: &'a Mutex<T>, context: &'static str) -> MutexGuard<'a, T> {
    let location = Location::caller();
    mutex.lock().unwrap_or_else(|err| {
        tracing::error!(
            target: "nova.jdi",
            context,
            %location,
            "mutex poisoned; continuing with recovered guard"
        );
        err.into_inner()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_poisoned_guard() {
        let mutex = Mutex::new(1);
        let _ = std::panic::catch_unwind(|| {
            let _guard = mutex.lock().unwrap();
            panic!("poison");
        });
        assert!(mutex.is_poisoned());
        *lock(&mutex, "test") += 1;
        assert_eq!(*lock(&mutex, "test"), 2);
    }
}
