//! Offset-ordered append-only in-process log, suitable for tests and single-node operation.

use crate::{LogEnvelope, LogTransport, TransportError, UnpositionedEnvelope};
use async_trait::async_trait;
use tokio::sync::Mutex;

/// An in-process [`LogTransport`]: a `Vec` guarded by a mutex, with offsets assigned by length.
///
/// This is not a networked bus. It exists so the dispatcher, CLI and tests can drive the full
/// ceremony tower without standing up an external log.
#[derive(Default)]
pub struct InMemoryLogTransport {
    messages: Mutex<Vec<LogEnvelope>>,
}

impl InMemoryLogTransport {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LogTransport for InMemoryLogTransport {
    async fn send(&self, envelope: UnpositionedEnvelope) -> Result<LogEnvelope, TransportError> {
        let mut messages = self.messages.lock().await;
        let offset = messages.len() as u64;
        let positioned = LogEnvelope { envelope, offset };
        messages.push(positioned.clone());
        Ok(positioned)
    }

    async fn send_batch(&self, envelopes: Vec<UnpositionedEnvelope>) -> Result<Vec<LogEnvelope>, TransportError> {
        let mut messages = self.messages.lock().await;
        let mut positioned = Vec::with_capacity(envelopes.len());
        for envelope in envelopes {
            let offset = messages.len() as u64;
            let entry = LogEnvelope { envelope, offset };
            messages.push(entry.clone());
            positioned.push(entry);
        }
        Ok(positioned)
    }

    async fn get_messages(&self, from_offset: u64) -> Result<Vec<LogEnvelope>, TransportError> {
        let messages = self.messages.lock().await;
        Ok(messages.iter().filter(|message| message.offset >= from_offset).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dkg_crypto::fingerprint;
    use dkg_types::CeremonyId;

    fn envelope(event_name: &str) -> UnpositionedEnvelope {
        UnpositionedEnvelope {
            ceremony_id: CeremonyId::new("abc123"),
            event_name: event_name.to_string(),
            payload_bytes: b"payload".to_vec(),
            sender_fingerprint: fingerprint(b"sender-key"),
            signature: vec![0u8; 64],
        }
    }

    #[tokio::test]
    async fn send_assigns_monotonic_offsets() {
        let transport = InMemoryLogTransport::new();
        let first = transport.send(envelope("a")).await.expect("send succeeds");
        let second = transport.send(envelope("b")).await.expect("send succeeds");
        assert_eq!(first.offset, 0);
        assert_eq!(second.offset, 1);
    }

    #[tokio::test]
    async fn send_batch_is_contiguous_and_in_order() {
        let transport = InMemoryLogTransport::new();
        transport.send(envelope("a")).await.expect("send succeeds");
        let batch = transport.send_batch(vec![envelope("b"), envelope("c")]).await.expect("batch succeeds");
        assert_eq!(batch.iter().map(|m| m.offset).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(batch[0].envelope.event_name, "b");
        assert_eq!(batch[1].envelope.event_name, "c");
    }

    #[tokio::test]
    async fn get_messages_returns_suffix_from_offset() {
        let transport = InMemoryLogTransport::new();
        for name in ["a", "b", "c"] {
            transport.send(envelope(name)).await.expect("send succeeds");
        }
        let suffix = transport.get_messages(1).await.expect("read succeeds");
        assert_eq!(suffix.iter().map(|m| m.envelope.event_name.as_str()).collect::<Vec<_>>(), vec!["b", "c"]);
    }
}
