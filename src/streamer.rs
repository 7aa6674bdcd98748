//! Streaming JSON output of a result set.
//!
//! Produces `{"results":[...],"total":N}` chunk by chunk: the header, one
//! chunk per row, then the footer carrying the row count. Only one row is
//! serialized at a time.

use std::io::Write;
use std::sync::Arc;

use aql_core::Domain;

use crate::capability::AuthorizationProvider;
use crate::error::EngineResult;
use crate::result::AqlResultSet;
use crate::row::Row;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamState {
    Header,
    Rows,
    Done,
}

pub struct AqlJsonStreamer<R: AqlResultSet> {
    rows: R,
    read_filter: Option<Arc<dyn AuthorizationProvider>>,
    state: StreamState,
    total: usize,
}

impl<R: AqlResultSet> AqlJsonStreamer<R> {
    pub fn new(rows: R) -> Self {
        Self {
            rows,
            read_filter: None,
            state: StreamState::Header,
            total: 0,
        }
    }

    /// Drop item rows the principal cannot read.
    pub fn with_read_filter(mut self, authorization: Arc<dyn AuthorizationProvider>) -> Self {
        self.read_filter = Some(authorization);
        self
    }

    /// Rows written so far.
    pub fn total(&self) -> usize {
        self.total
    }

    /// The next piece of the document, `None` once the footer was produced.
    ///
    /// The result set is closed when the last row is read or when reading fails.
    pub fn next_chunk(&mut self) -> EngineResult<Option<Vec<u8>>> {
        match self.state {
            StreamState::Header => {
                self.state = StreamState::Rows;
                Ok(Some(b"{\"results\":[".to_vec()))
            }
            StreamState::Rows => loop {
                let row = match self.rows.next() {
                    Some(Ok(row)) => row,
                    Some(Err(e)) => {
                        self.state = StreamState::Done;
                        let _ = self.rows.close();
                        return Err(e);
                    }
                    None => {
                        self.state = StreamState::Done;
                        self.rows.close()?;
                        let footer = format!("],\"total\":{}}}", self.total);
                        return Ok(Some(footer.into_bytes()));
                    }
                };
                let Some(row) = self.readable(row) else {
                    continue;
                };
                let mut chunk = Vec::new();
                if self.total > 0 {
                    chunk.push(b',');
                }
                serde_json::to_writer(&mut chunk, &row.to_json())?;
                self.total += 1;
                return Ok(Some(chunk));
            },
            StreamState::Done => Ok(None),
        }
    }

    /// Write the whole document and return the number of rows written.
    pub fn write_to<W: Write>(mut self, writer: &mut W) -> EngineResult<usize> {
        while let Some(chunk) = self.next_chunk()? {
            if let Err(e) = writer.write_all(&chunk) {
                let _ = self.rows.close();
                return Err(e.into());
            }
        }
        writer.flush()?;
        Ok(self.total)
    }

    pub fn into_string(self) -> EngineResult<String> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    fn readable(&self, mut row: Row) -> Option<Row> {
        let Some(authorization) = &self.read_filter else {
            return Some(row);
        };

        if row.domain() == Domain::Items {
            return match row.repo_path() {
                Some(path) if !authorization.can_read(&path) => None,
                _ => Some(row),
            };
        }

        let had_items = row.children_of(Domain::Items).next().is_some();
        row.retain_children(|child| match child.repo_path() {
            Some(path) => authorization.can_read(&path),
            None => true,
        });
        if had_items && row.children_of(Domain::Items).next().is_none() {
            return None;
        }
        Some(row)
    }
}
