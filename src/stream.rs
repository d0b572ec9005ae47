//! Turns a session's raw output channel into a sequence of events.

use std::io::{BufRead, Lines};

use log::debug;

use crate::error::ConnectionError;
use crate::event::Event;

/// Lazy sequence of events read line by line from an open channel.
///
/// Lines that fail to decode are dropped and reading continues; a single
/// malformed line never terminates the stream. The sequence ends when the
/// channel does and is not restartable. I/O errors are yielded to the caller.
pub struct EventStream<R> {
    lines: Lines<R>,
}

impl<R: BufRead> EventStream<R> {
    pub fn new(reader: R) -> EventStream<R> {
        EventStream {
            lines: reader.lines(),
        }
    }
}

impl<R: BufRead> Iterator for EventStream<R> {
    type Item = Result<Event, ConnectionError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(err) => return Some(Err(err.into())),
            };
            match Event::decode(&line) {
                Ok(event) => {
                    debug!("incoming gerrit event: {}", event.kind());
                    return Some(Ok(event));
                }
                // Skipping is policy: decode errors stay inside the reader.
                Err(err) => debug!("skipping line ({})", err),
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use std::io::{self, BufReader, Cursor, Read};

    use assert_matches::assert_matches;
    use spectral::prelude::*;

    const REF_UPDATED_LINE: &str =
        r#"{"type":"ref-updated","refUpdate":{"oldRev":"a","newRev":"b","refName":"refs/heads/x","project":"p"}}"#;

    #[test]
    fn test_malformed_line_does_not_interrupt_stream() {
        let input = format!(
            "{}\nthis is not json\n{{\"type\":\"bogus\"}}\n{}\n",
            REF_UPDATED_LINE, REF_UPDATED_LINE
        );
        let events: Vec<_> = EventStream::new(Cursor::new(input.into_bytes())).collect();
        assert_that!(events).has_length(2);
        for event in events {
            assert_matches!(event, Ok(Event::RefUpdated(_)));
        }
    }

    #[test]
    fn test_end_of_channel_ends_sequence() {
        let mut stream = EventStream::new(Cursor::new(Vec::new()));
        assert_that!(stream.next()).is_none();
    }

    /// Reads its buffered data, then fails like a dropped connection.
    struct DroppingReader(Cursor<Vec<u8>>);

    impl Read for DroppingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.0.read(buf)?;
            if n == 0 {
                Err(io::Error::new(
                    io::ErrorKind::ConnectionReset,
                    "connection dropped",
                ))
            } else {
                Ok(n)
            }
        }
    }

    #[test]
    fn test_transport_error_propagates() {
        let reader = DroppingReader(Cursor::new(format!("{}\n", REF_UPDATED_LINE).into_bytes()));
        let mut stream = EventStream::new(BufReader::new(reader));
        assert_matches!(stream.next(), Some(Ok(Event::RefUpdated(_))));
        assert_matches!(stream.next(), Some(Err(ConnectionError::Io(_))));
    }
}
