use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Shared stop flag for bulk loops. Work already applied is kept.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Route Ctrl-C into `token`. A second interrupt exits immediately.
///
/// Returns `false` when the process already has a handler installed.
pub fn install_interrupt_handler(token: &CancelToken) -> bool {
    let token = token.clone();
    ctrlc::set_handler(move || {
        if on_interrupt(&token) {
            std::process::exit(130);
        }
    })
    .is_ok()
}

/// Cancel `token`; returns `true` if it was already cancelled.
fn on_interrupt(token: &CancelToken) -> bool {
    if token.is_cancelled() {
        return true;
    }
    token.cancel();
    tracing::warn!("interrupt received, stopping after the current item...");
    false
}

/// Run `f` over `items` on up to `workers` threads.
///
/// Results come back in input order. The first error stops workers from
/// picking up new items and is returned once running tasks finish.
pub fn parallel_map<T, R, E, F>(items: &[T], workers: usize, f: F) -> Result<Vec<R>, E>
where
    T: Sync,
    R: Send,
    E: Send,
    F: Fn(&T) -> Result<R, E> + Sync,
{
    if items.is_empty() {
        return Ok(Vec::new());
    }

    let workers = workers.clamp(1, items.len());
    let next = AtomicUsize::new(0);
    let failed = AtomicBool::new(false);
    let results: Mutex<Vec<Option<R>>> = Mutex::new((0..items.len()).map(|_| None).collect());
    let first_error: Mutex<Option<E>> = Mutex::new(None);

    std::thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| loop {
                if failed.load(Ordering::SeqCst) {
                    break;
                }
                let idx = next.fetch_add(1, Ordering::SeqCst);
                let Some(item) = items.get(idx) else { break };
                match f(item) {
                    Ok(value) => {
                        results.lock().unwrap_or_else(PoisonError::into_inner)[idx] = Some(value);
                    }
                    Err(e) => {
                        failed.store(true, Ordering::SeqCst);
                        let mut slot = first_error.lock().unwrap_or_else(PoisonError::into_inner);
                        if slot.is_none() {
                            *slot = Some(e);
                        }
                        break;
                    }
                }
            });
        }
    });

    if let Some(e) = first_error
        .into_inner()
        .unwrap_or_else(PoisonError::into_inner)
    {
        return Err(e);
    }
    Ok(results
        .into_inner()
        .unwrap_or_else(PoisonError::into_inner)
        .into_iter()
        .flatten()
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::time::Duration;

    #[test]
    fn first_interrupt_cancels_second_exits() {
        let token = CancelToken::new();
        assert!(!on_interrupt(&token));
        assert!(token.is_cancelled());
        assert!(on_interrupt(&token));
    }

    #[test]
    fn results_keep_input_order() {
        let items: Vec<u32> = (0..50).collect();
        let out: Result<Vec<u32>, ()> = parallel_map(&items, 4, |i| Ok(i * 2));
        assert_eq!(out.unwrap(), items.iter().map(|i| i * 2).collect::<Vec<_>>());
    }

    #[test]
    fn work_spreads_across_threads() {
        let items: Vec<u32> = (0..16).collect();
        let ids = Mutex::new(HashSet::new());
        parallel_map(&items, 4, |_| {
            std::thread::sleep(Duration::from_millis(10));
            ids.lock().unwrap().insert(std::thread::current().id());
            Ok::<_, ()>(())
        })
        .unwrap();
        assert!(ids.lock().unwrap().len() > 1);
    }

    #[test]
    fn first_error_returned_and_stops_new_work() {
        let items: Vec<u32> = (0..200).collect();
        let started = AtomicUsize::new(0);
        let out = parallel_map(&items, 2, |i| {
            started.fetch_add(1, Ordering::SeqCst);
            if *i == 3 {
                Err(format!("boom {i}"))
            } else {
                Ok(*i)
            }
        });
        assert_eq!(out.unwrap_err(), "boom 3");
        assert!(started.load(Ordering::SeqCst) < items.len());
    }

    #[test]
    fn empty_input_spawns_nothing() {
        let out: Result<Vec<()>, ()> = parallel_map(&Vec::<u8>::new(), 8, |_| Ok(()));
        assert!(out.unwrap().is_empty());
    }

    #[test]
    fn cancel_token_shared_between_clones() {
        let token = CancelToken::new();
        let other = token.clone();
        assert!(!other.is_cancelled());
        token.cancel();
        assert!(other.is_cancelled());
    }
}
