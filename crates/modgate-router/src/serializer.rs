//! Content serializers for tagged responses.
//!
//! A handler that cannot answer with JSON (a bundle file, an image, a
//! notifier stream) returns [`RouteResponse::Tagged`](modgate_protocol::RouteResponse)
//! with a short tag. The dispatcher then asks the [`SerializerRegistry`]
//! for the first serializer that claims the tag, and that serializer
//! writes the response itself.

use std::sync::Arc;

use async_trait::async_trait;
use modgate_protocol::{IncomingRequest, SessionId};

use crate::ResponseSink;

/// Writes a tagged response.
#[async_trait]
pub trait Serializer: Send + Sync {
    /// Whether this serializer handles responses tagged `tag`.
    fn can_handle(&self, tag: &str) -> bool;

    /// Writes the response for `request` into `sink`.
    ///
    /// `body` is the request body, already decoded by the dispatcher.
    async fn serialize(
        &self,
        session: &SessionId,
        request: &IncomingRequest,
        sink: &mut dyn ResponseSink,
        body: &serde_json::Value,
    ) -> anyhow::Result<()>;
}

/// Ordered list of serializers. The first one that claims a tag wins.
#[derive(Default)]
pub struct SerializerRegistry {
    serializers: Vec<Arc<dyn Serializer>>,
}

impl SerializerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a serializer.
    pub fn register(&mut self, serializer: impl Serializer + 'static) {
        self.register_arc(Arc::new(serializer));
    }

    /// Appends an already shared serializer.
    pub fn register_arc(&mut self, serializer: Arc<dyn Serializer>) {
        self.serializers.push(serializer);
    }

    /// Returns the first serializer that claims `tag`.
    pub fn resolve(&self, tag: &str) -> Option<&Arc<dyn Serializer>> {
        self.serializers.iter().find(|s| s.can_handle(tag))
    }

    /// Number of registered serializers.
    pub fn len(&self) -> usize {
        self.serializers.len()
    }

    /// Whether no serializer is registered.
    pub fn is_empty(&self) -> bool {
        self.serializers.is_empty()
    }
}
