//! Where serializers write to.
//!
//! A serializer needs more control than a handler: status, headers and a
//! raw body. [`ResponseSink`] is that control surface, kept free of any
//! HTTP library so the same serializer runs under axum and under tests.

use async_trait::async_trait;

/// Writable response, as handed to a [`Serializer`](crate::Serializer).
#[async_trait]
pub trait ResponseSink: Send {
    /// Sets the status code. The last call wins.
    fn set_status(&mut self, status: u16);

    /// Sets a header, replacing any earlier value for the same name
    /// (names compare case-insensitively).
    fn set_header(&mut self, name: &str, value: &str);

    /// Appends bytes to the body.
    async fn write(&mut self, bytes: &[u8]) -> anyhow::Result<()>;
}

/// A [`ResponseSink`] that collects everything in memory.
///
/// The HTTP front converts it to a real response once the dispatcher is
/// done; tests inspect it directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferedResponse {
    /// Status code, 200 unless set.
    pub status: u16,
    /// Headers in the order they were first set.
    pub headers: Vec<(String, String)>,
    /// Body bytes.
    pub body: Vec<u8>,
}

impl BufferedResponse {
    /// An empty `200` response.
    pub fn new() -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Returns the value of header `name`, if set.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Parses the body as JSON.
    pub fn json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::from_slice(&self.body)
    }
}

impl Default for BufferedResponse {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResponseSink for BufferedResponse {
    fn set_status(&mut self, status: u16) {
        self.status = status;
    }

    fn set_header(&mut self, name: &str, value: &str) {
        match self
            .headers
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
        {
            Some(slot) => slot.1 = value.to_string(),
            None => self.headers.push((name.to_string(), value.to_string())),
        }
    }

    async fn write(&mut self, bytes: &[u8]) -> anyhow::Result<()> {
        self.body.extend_from_slice(bytes);
        Ok(())
    }
}
