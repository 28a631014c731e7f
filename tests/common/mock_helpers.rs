//! Mock construction helpers

use datamon_rs::session::{Reading, SampleSource};
use datamon_rs::signal::FnListener;
use datamon_rs::{Sample, SignalHandle, Subscription};
use mockall::mock;
use std::sync::{Arc, Mutex};

mock! {
    /// Mocked sample source
    pub Source {}

    impl SampleSource for Source {
        fn read(&mut self) -> Option<Reading>;
    }
}

/// Mock source returning `readings` in order. Reading past the end fails
/// the test.
pub fn scripted_source(readings: Vec<Option<Reading>>) -> MockSource {
    let mut source = MockSource::new();
    let mut seq = mockall::Sequence::new();
    for reading in readings {
        source
            .expect_read()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(reading);
    }
    source
}

/// Listener that records every sample it receives
pub fn capture(handle: &SignalHandle) -> (Arc<Mutex<Vec<Sample>>>, Subscription) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let subscription = handle.subscribe(Arc::new(FnListener::new(
        "capture",
        move |samples: &[Sample]| {
            sink.lock().unwrap().extend_from_slice(samples);
            Ok(())
        },
    )));
    (seen, subscription)
}

/// Listener that appends `tag` to a shared log on every commit
pub fn tagged(handle: &SignalHandle, log: &Arc<Mutex<Vec<String>>>, tag: &str) -> Subscription {
    let log = log.clone();
    let tag = tag.to_string();
    handle.subscribe(Arc::new(FnListener::new(tag.clone(), move |_: &[Sample]| {
        log.lock().unwrap().push(tag.clone());
        Ok(())
    })))
}
