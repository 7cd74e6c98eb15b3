//! parking_lot deadlock reporting, enabled by the `deadlock_detection` feature

#[cfg(feature = "deadlock_detection")]
pub fn install() {
    use std::thread;
    use std::time::Duration;

    let spawned = thread::Builder::new()
        .name("deadlock-detector".to_string())
        .spawn(|| loop {
            thread::sleep(Duration::from_secs(1));
            let deadlocks = parking_lot::deadlock::check_deadlock();
            if deadlocks.is_empty() {
                continue;
            }
            log::error!("{} deadlock cycle(s) detected", deadlocks.len());
            for (i, threads) in deadlocks.iter().enumerate() {
                for thread in threads {
                    log::error!(
                        "cycle {i} thread {:?}:\n{:?}",
                        thread.thread_id(),
                        thread.backtrace()
                    );
                }
            }
        });
    if let Err(e) = spawned {
        log::warn!("Deadlock detector not started: {e}");
    }
}

#[cfg(not(feature = "deadlock_detection"))]
pub fn install() {}
