//! The reconnect loop driving one event source.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use backoff::backoff::{Backoff, Constant};
use log::{debug, error, info};

use crate::connection::EventSource;
use crate::dispatch::Dispatcher;
use crate::stream::EventStream;

/// Delay between a failed connection cycle and the next attempt. The
/// interval is constant, there is no backoff growth.
pub const RETRY_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Reconnect after every disconnect, indefinitely.
    Continuous,
    /// Run exactly one connect/stream/disconnect cycle.
    SingleShot,
}

enum State<R> {
    Disconnected,
    Connecting,
    Streaming(R),
    Disconnecting,
    BackoffWait,
    Terminated,
}

/// Owns the connect/stream/disconnect loop for a single event source.
///
/// One manager occupies one thread; independent sources each run their own
/// manager and share nothing. Spawning that thread is up to the caller.
pub struct Manager<S> {
    source: S,
    mode: Mode,
    retry_delay: Duration,
}

impl<S: EventSource> Manager<S> {
    pub fn new(source: S, mode: Mode) -> Manager<S> {
        Manager {
            source,
            mode,
            retry_delay: RETRY_DELAY,
        }
    }

    /// Overrides the fixed reconnect delay.
    pub fn retry_delay(mut self, delay: Duration) -> Manager<S> {
        self.retry_delay = delay;
        self
    }

    /// Runs the loop until it terminates, dispatching every decoded event.
    ///
    /// Errors during connecting or streaming are logged and lead to a
    /// reconnect (continuous mode) or to termination (single-shot mode);
    /// they are never fatal to the calling process. `stop` is polled between
    /// cycles; it cannot interrupt a blocking read.
    pub fn run(mut self, dispatcher: &mut Dispatcher, stop: &AtomicBool) {
        let mut backoff = Constant::new(self.retry_delay);
        let mut state = State::Disconnected;

        loop {
            state = match state {
                State::Disconnected => State::Connecting,
                State::Connecting => match self.source.connect() {
                    Ok(lines) => State::Streaming(lines),
                    Err(err) => {
                        error!("connecting failed: {}", err);
                        State::Disconnecting
                    }
                },
                State::Streaming(lines) => {
                    for event in EventStream::new(lines) {
                        match event {
                            Ok(event) => dispatcher.dispatch(&event),
                            Err(err) => {
                                error!("event stream failed: {}", err);
                                break;
                            }
                        }
                    }
                    info!("event stream ended");
                    State::Disconnecting
                }
                State::Disconnecting => {
                    self.source.disconnect();
                    if self.mode == Mode::Continuous && !stop.load(Ordering::SeqCst) {
                        State::BackoffWait
                    } else {
                        State::Terminated
                    }
                }
                State::BackoffWait => {
                    if let Some(delay) = backoff.next_backoff() {
                        debug!("sleeping {:?} before reconnecting", delay);
                        thread::sleep(delay);
                    }
                    State::Connecting
                }
                State::Terminated => {
                    info!("manager terminated");
                    return;
                }
            };
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use std::collections::VecDeque;
    use std::io::{self, Cursor};
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::time::Instant;

    use spectral::prelude::*;

    use crate::dispatch::Handler;
    use crate::error::ConnectionError;
    use crate::event::RefUpdatedEvent;

    const REF_UPDATED_LINE: &str =
        r#"{"type":"ref-updated","refUpdate":{"oldRev":"a","newRev":"b","refName":"refs/heads/x","project":"p"}}"#;

    #[derive(Default, Clone)]
    struct SourceStats {
        connects: Arc<AtomicUsize>,
        disconnects: Arc<AtomicUsize>,
    }

    struct ScriptedSource {
        sessions: VecDeque<Result<String, ConnectionError>>,
        stats: SourceStats,
        /// Raise the stop flag once this many connects happened.
        stop_after: Option<(usize, Arc<AtomicBool>)>,
    }

    impl ScriptedSource {
        fn new(
            sessions: Vec<Result<String, ConnectionError>>,
            stats: &SourceStats,
        ) -> ScriptedSource {
            ScriptedSource {
                sessions: sessions.into(),
                stats: stats.clone(),
                stop_after: None,
            }
        }

        fn stop_after(mut self, connects: usize, stop: &Arc<AtomicBool>) -> ScriptedSource {
            self.stop_after = Some((connects, stop.clone()));
            self
        }
    }

    impl EventSource for ScriptedSource {
        type Lines = Cursor<Vec<u8>>;

        fn connect(&mut self) -> Result<Self::Lines, ConnectionError> {
            let connects = self.stats.connects.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some((limit, stop)) = &self.stop_after {
                if connects >= *limit {
                    stop.store(true, Ordering::SeqCst);
                }
            }
            match self.sessions.pop_front() {
                Some(Ok(data)) => Ok(Cursor::new(data.into_bytes())),
                Some(Err(err)) => Err(err),
                None => Err(ConnectionError::Io(io::Error::new(
                    io::ErrorKind::NotConnected,
                    "no session scripted",
                ))),
            }
        }

        fn disconnect(&mut self) {
            self.stats.disconnects.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct CountingHandler {
        ref_updates: Arc<AtomicUsize>,
    }

    impl Handler for CountingHandler {
        fn ref_updated(&mut self, _event: &RefUpdatedEvent) {
            self.ref_updates.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn dispatcher_counting_into(ref_updates: &Arc<AtomicUsize>) -> Dispatcher {
        let mut dispatcher = Dispatcher::new();
        dispatcher.add_handler(Box::new(CountingHandler {
            ref_updates: ref_updates.clone(),
        }));
        dispatcher
    }

    #[test]
    fn test_single_shot_runs_one_cycle() {
        let stats = SourceStats::default();
        let source = ScriptedSource::new(
            vec![Ok(format!("{}\n{}\n", REF_UPDATED_LINE, REF_UPDATED_LINE))],
            &stats,
        );
        let ref_updates = Arc::new(AtomicUsize::new(0));
        let mut dispatcher = dispatcher_counting_into(&ref_updates);

        Manager::new(source, Mode::SingleShot).run(&mut dispatcher, &AtomicBool::new(false));

        assert_that!(stats.connects.load(Ordering::SeqCst)).is_equal_to(1);
        assert_that!(stats.disconnects.load(Ordering::SeqCst)).is_equal_to(1);
        assert_that!(ref_updates.load(Ordering::SeqCst)).is_equal_to(2);
    }

    #[test]
    fn test_single_shot_terminates_after_failed_connect() {
        let stats = SourceStats::default();
        let source = ScriptedSource::new(
            vec![Err(ConnectionError::Io(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "connection refused",
            )))],
            &stats,
        );
        let mut dispatcher = Dispatcher::new();

        Manager::new(source, Mode::SingleShot).run(&mut dispatcher, &AtomicBool::new(false));

        assert_that!(stats.connects.load(Ordering::SeqCst)).is_equal_to(1);
        assert_that!(stats.disconnects.load(Ordering::SeqCst)).is_equal_to(1);
    }

    #[test]
    fn test_continuous_retries_with_constant_delay() {
        let stats = SourceStats::default();
        let stop = Arc::new(AtomicBool::new(false));
        let source = ScriptedSource::new(Vec::new(), &stats).stop_after(3, &stop);
        let mut dispatcher = Dispatcher::new();
        let delay = Duration::from_millis(20);

        let started = Instant::now();
        Manager::new(source, Mode::Continuous)
            .retry_delay(delay)
            .run(&mut dispatcher, &stop);

        // three attempts, two waits in between
        assert_that!(stats.connects.load(Ordering::SeqCst)).is_equal_to(3);
        assert!(started.elapsed() >= delay * 2);
    }

    #[test]
    fn test_continuous_stops_after_cycle_when_signalled() {
        let stats = SourceStats::default();
        let stop = Arc::new(AtomicBool::new(false));
        let source = ScriptedSource::new(
            vec![Ok(format!("{}\n", REF_UPDATED_LINE))],
            &stats,
        )
        .stop_after(1, &stop);
        let ref_updates = Arc::new(AtomicUsize::new(0));
        let mut dispatcher = dispatcher_counting_into(&ref_updates);

        Manager::new(source, Mode::Continuous).run(&mut dispatcher, &stop);

        assert_that!(stats.connects.load(Ordering::SeqCst)).is_equal_to(1);
        assert_that!(ref_updates.load(Ordering::SeqCst)).is_equal_to(1);
    }
}
