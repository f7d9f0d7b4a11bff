//! Connection contract between the engine and its drivers
//!
//! A connection is a pair of channels: statement text flows in through the
//! driver, result frames flow back out through one of these writers. The
//! engine only ever sees the writer half.

use std::sync::mpsc::{channel, Receiver, Sender};

use crate::error::{QuartzError, Result};

/// One frame of a statement's result stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Terminates a non-query statement.
    Result {
        last_insert_id: i64,
        rows_affected: i64,
    },
    /// Column names, sent once before the rows of a query.
    RowHeader(Vec<String>),
    /// One result row; `None` cells are NULL.
    Row(Vec<Option<String>>),
    /// Terminates a query.
    RowsEnd,
    /// Either path may end with an error instead.
    Error { kind: String, message: String },
}

/// Writer half of a connection, consumed by the statement executors.
pub trait EngineConn {
    fn write_result(&mut self, last_insert_id: i64, rows_affected: i64) -> Result<()>;
    fn write_row_header(&mut self, columns: Vec<String>) -> Result<()>;
    fn write_row(&mut self, cells: Vec<Option<String>>) -> Result<()>;
    fn write_rows_end(&mut self) -> Result<()>;
    fn write_error(&mut self, kind: &str, message: &str) -> Result<()>;
}

/// Channel-backed connection writer. The driver holds the receiver; a
/// closed receiver surfaces as a connection error on the next write, which
/// is the engine's only cancellation signal.
pub struct ChannelConn {
    tx: Sender<Frame>,
}

impl ChannelConn {
    /// Build the writer half plus the driver-side receiver.
    pub fn pair() -> (ChannelConn, Receiver<Frame>) {
        let (tx, rx) = channel();
        (ChannelConn { tx }, rx)
    }

    fn send(&self, frame: Frame) -> Result<()> {
        self.tx
            .send(frame)
            .map_err(|_| QuartzError::Connection("connection closed by peer".to_string()))
    }
}

impl EngineConn for ChannelConn {
    fn write_result(&mut self, last_insert_id: i64, rows_affected: i64) -> Result<()> {
        self.send(Frame::Result {
            last_insert_id,
            rows_affected,
        })
    }

    fn write_row_header(&mut self, columns: Vec<String>) -> Result<()> {
        self.send(Frame::RowHeader(columns))
    }

    fn write_row(&mut self, cells: Vec<Option<String>>) -> Result<()> {
        self.send(Frame::Row(cells))
    }

    fn write_rows_end(&mut self) -> Result<()> {
        self.send(Frame::RowsEnd)
    }

    fn write_error(&mut self, kind: &str, message: &str) -> Result<()> {
        self.send(Frame::Error {
            kind: kind.to_string(),
            message: message.to_string(),
        })
    }
}

/// In-memory connection writer that buffers every frame. Used by embedded
/// callers and throughout the tests.
#[derive(Debug, Default)]
pub struct MemoryConn {
    pub frames: Vec<Frame>,
}

impl MemoryConn {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last `(last_insert_id, rows_affected)` result frame, if any.
    pub fn result(&self) -> Option<(i64, i64)> {
        self.frames.iter().rev().find_map(|f| match f {
            Frame::Result {
                last_insert_id,
                rows_affected,
            } => Some((*last_insert_id, *rows_affected)),
            _ => None,
        })
    }

    /// Column names of the last query result.
    pub fn columns(&self) -> Option<&[String]> {
        self.frames.iter().rev().find_map(|f| match f {
            Frame::RowHeader(columns) => Some(columns.as_slice()),
            _ => None,
        })
    }

    /// Rows of the last query result, in emission order.
    pub fn rows(&self) -> Vec<&[Option<String>]> {
        let header = self
            .frames
            .iter()
            .rposition(|f| matches!(f, Frame::RowHeader(_)));
        match header {
            Some(at) => self.frames[at..]
                .iter()
                .filter_map(|f| match f {
                    Frame::Row(cells) => Some(cells.as_slice()),
                    _ => None,
                })
                .collect(),
            None => Vec::new(),
        }
    }
}

impl EngineConn for MemoryConn {
    fn write_result(&mut self, last_insert_id: i64, rows_affected: i64) -> Result<()> {
        self.frames.push(Frame::Result {
            last_insert_id,
            rows_affected,
        });
        Ok(())
    }

    fn write_row_header(&mut self, columns: Vec<String>) -> Result<()> {
        self.frames.push(Frame::RowHeader(columns));
        Ok(())
    }

    fn write_row(&mut self, cells: Vec<Option<String>>) -> Result<()> {
        self.frames.push(Frame::Row(cells));
        Ok(())
    }

    fn write_rows_end(&mut self) -> Result<()> {
        self.frames.push(Frame::RowsEnd);
        Ok(())
    }

    fn write_error(&mut self, kind: &str, message: &str) -> Result<()> {
        self.frames.push(Frame::Error {
            kind: kind.to_string(),
            message: message.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_conn_delivers_frames() {
        let (mut conn, rx) = ChannelConn::pair();
        conn.write_row_header(vec!["id".into()]).unwrap();
        conn.write_row(vec![Some("1".into())]).unwrap();
        conn.write_rows_end().unwrap();

        assert_eq!(rx.recv().unwrap(), Frame::RowHeader(vec!["id".into()]));
        assert_eq!(rx.recv().unwrap(), Frame::Row(vec![Some("1".into())]));
        assert_eq!(rx.recv().unwrap(), Frame::RowsEnd);
    }

    #[test]
    fn test_closed_receiver_is_connection_error() {
        let (mut conn, rx) = ChannelConn::pair();
        drop(rx);
        assert!(matches!(
            conn.write_rows_end(),
            Err(QuartzError::Connection(_))
        ));
    }

    #[test]
    fn test_memory_conn_accessors() {
        let mut conn = MemoryConn::new();
        conn.write_result(3, 1).unwrap();
        conn.write_row_header(vec!["a".into(), "b".into()]).unwrap();
        conn.write_row(vec![Some("1".into()), None]).unwrap();
        conn.write_rows_end().unwrap();

        assert_eq!(conn.result(), Some((3, 1)));
        assert_eq!(conn.columns().unwrap(), ["a", "b"]);
        assert_eq!(conn.rows().len(), 1);
        assert_eq!(conn.rows()[0][1], None);
    }
}
