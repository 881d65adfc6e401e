//! Streaming row delivery: a single producer thread reads the cursor and
//! publishes coerced rows into a bounded channel, the consumer drains it
//! through an iterator. The channel is the backpressure mechanism; rows
//! are never reordered.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::error::TabulaError;
use crate::table::{Column, Row};

/// Rows buffered between the producer thread and the consumer.
pub(crate) const STREAM_BUFFER: usize = 500;

/// Producer half of a row stream. `send` returns false once the consumer
/// is gone or the stream was cancelled; the producer must stop reading
/// the cursor at that point.
pub struct RowSender {
    sender: Sender<Result<Row, TabulaError>>,
    stop: Arc<AtomicBool>,
}

impl RowSender {
    pub(crate) fn new(
        sender: Sender<Result<Row, TabulaError>>,
        stop: Arc<AtomicBool>,
    ) -> RowSender {
        RowSender { sender, stop }
    }

    pub fn send(&self, row: Row) -> bool {
        if self.stop.load(Ordering::Relaxed) {
            return false;
        }
        self.sender.send(Ok(row)).is_ok()
    }

    /// Deliver a fault to the consumer instead of panicking in the
    /// producer; the stream ends after the error is observed.
    pub fn fail(&self, error: TabulaError) {
        let _ = self.sender.send(Err(error));
    }
}

/// Consumer half: the lazy, single-pass row sequence. Dropping it sets the
/// cancellation flag and disconnects the channel, which unblocks and stops
/// the producer thread.
pub struct RowStream {
    columns: Vec<Column>,
    receiver: Receiver<Result<Row, TabulaError>>,
    stop: Arc<AtomicBool>,
}

impl RowStream {
    pub(crate) fn new(
        columns: Vec<Column>,
        receiver: Receiver<Result<Row, TabulaError>>,
        stop: Arc<AtomicBool>,
    ) -> RowStream {
        RowStream {
            columns,
            receiver,
            stop,
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn cancel(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    /// Build a stream over already materialized rows. Used where a caller
    /// needs the streaming interface for an in-memory result.
    pub fn from_rows(columns: Vec<Column>, rows: Vec<Row>) -> RowStream {
        let (sender, stream) = row_channel(columns, rows.len() + 1);
        for row in rows {
            sender.send(row);
        }
        stream
    }
}

impl Iterator for RowStream {
    type Item = Result<Row, TabulaError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.receiver.recv().ok()
    }
}

impl Drop for RowStream {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

/// Create a bounded producer/consumer pair for the given column set.
pub fn row_channel(
    columns: Vec<Column>,
    capacity: usize,
) -> (RowSender, RowStream) {
    let (sender, receiver) = bounded(capacity);
    let stop = Arc::new(AtomicBool::new(false));
    (
        RowSender::new(sender, stop.clone()),
        RowStream::new(columns, receiver, stop),
    )
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::Duration;

    use super::*;
    use crate::table::ColumnType;
    use crate::value::Value;

    fn int_row(n: i64) -> Row {
        Row::new(vec![("n".to_string(), Value::Int(n))])
    }

    #[test]
    fn test_rows_arrive_in_send_order() {
        let columns =
            vec![Column::new("n".to_string(), ColumnType::Int)];
        let stream = RowStream::from_rows(
            columns,
            (0..20).map(int_row).collect(),
        );

        let seen: Vec<i64> = stream
            .map(|row| match row.unwrap().get("n") {
                Some(Value::Int(n)) => *n,
                other => panic!("unexpected value: {:?}", other),
            })
            .collect();
        assert_eq!(seen, (0..20).collect::<Vec<i64>>());
    }

    #[test]
    fn test_error_is_delivered_then_stream_ends() {
        let columns =
            vec![Column::new("n".to_string(), ColumnType::Int)];
        let (sender, mut stream) = row_channel(columns, 4);
        sender.send(int_row(1));
        sender.fail(TabulaError::RowCoercion("bad cell".to_string()));
        drop(sender);

        assert!(stream.next().unwrap().is_ok());
        assert!(matches!(
            stream.next(),
            Some(Err(TabulaError::RowCoercion(_)))
        ));
        assert!(stream.next().is_none());
    }

    #[test]
    fn test_dropping_consumer_stops_producer() {
        let columns =
            vec![Column::new("n".to_string(), ColumnType::Int)];
        let (sender, stream) = row_channel(columns, 1);

        let producer = thread::spawn(move || {
            let mut sent = 0usize;
            loop {
                if !sender.send(int_row(sent as i64)) {
                    return sent;
                }
                sent += 1;
            }
        });

        // consume one row, then abandon the stream mid-way
        let mut stream = stream;
        let _ = stream.next();
        drop(stream);

        // the producer must unblock on its own rather than leak
        thread::sleep(Duration::from_millis(50));
        let sent = producer.join().unwrap();
        assert!(sent >= 1);
    }
}
