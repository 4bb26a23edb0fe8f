//! Response sinks.

use std::io::{self, Write};

/// Destination of a response: status, headers, then body bytes.
///
/// Status and headers may be set any number of times before the first body
/// write; the last value wins.
pub trait ResponseSink: Write {
    fn set_status(&mut self, status: u16);

    fn set_header(&mut self, name: &str, value: &str);
}

/// In-memory [`ResponseSink`], for tests and for buffering whole responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Default for RecordedResponse {
    fn default() -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }
}

impl RecordedResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of a header, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Body as text, with invalid UTF-8 replaced.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

impl Write for RecordedResponse {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl ResponseSink for RecordedResponse {
    fn set_status(&mut self, status: u16) {
        self.status = status;
    }

    fn set_header(&mut self, name: &str, value: &str) {
        match self
            .headers
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
        {
            Some((_, existing)) => value.clone_into(existing),
            None => self.headers.push((name.to_owned(), value.to_owned())),
        }
    }
}
