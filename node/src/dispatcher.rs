//! The dispatcher/replayer: pulls events off the log in order and drives each ceremony's
//! composed machine, persisting a dump after every successfully applied message.

use dkg_fsm::{
    dkg_proposal::DkgProposalMessage, signature_proposal::SignatureProposalMessage,
    signing_proposal::SigningProposalMessage, CeremonyEvent, CeremonyMachine, CeremonyOutcome, Deadlines, MachineDump,
};
use dkg_store::DumpStore;
use dkg_transport::{LogEnvelope, LogTransport};
use dkg_types::{participant::Fingerprint, CeremonyId};
use encoding::codec::MessageCodec;
use serde::Serialize;
use std::{
    collections::HashMap,
    sync::{Arc, RwLock as StdRwLock},
};
use tokio::sync::{watch, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Resolves the long-term public key behind a fingerprint, so the dispatcher can verify envelope
/// signatures before admitting an event.
///
/// Distributing long-term public keys between participants' daemons is out of scope here (the
/// original system does it out of band, e.g. via QR codes); this trait only covers looking one up
/// once it's already known locally.
pub trait IdentityResolver: Send + Sync {
    /// Look up the public key for `fingerprint`, if known.
    fn resolve(&self, fingerprint: &Fingerprint) -> Option<dkg_crypto::LongTermPublicKey>;

    /// Record a newly observed public key, e.g. one read out of an admitted quorum.
    fn observe(&self, fingerprint: Fingerprint, public_key: dkg_crypto::LongTermPublicKey);
}

/// An in-memory [`IdentityResolver`] that accumulates public keys as ceremonies progress.
///
/// Uses a plain [`std::sync::RwLock`] rather than `tokio::sync::RwLock`: lookups are
/// non-suspending `HashMap` operations, so there's no benefit to an async-aware lock and every
/// benefit to a synchronous trait (callers never need to `.await` an identity lookup).
#[derive(Default)]
pub struct InMemoryIdentityDirectory {
    keys: StdRwLock<HashMap<Fingerprint, Vec<u8>>>,
}

impl InMemoryIdentityDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdentityResolver for InMemoryIdentityDirectory {
    fn resolve(&self, fingerprint: &Fingerprint) -> Option<dkg_crypto::LongTermPublicKey> {
        let keys = self.keys.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        keys.get(fingerprint).and_then(|bytes| dkg_crypto::LongTermPublicKey::from_bytes(bytes).ok())
    }

    fn observe(&self, fingerprint: Fingerprint, public_key: dkg_crypto::LongTermPublicKey) {
        let mut keys = self.keys.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        keys.insert(fingerprint, public_key.as_bytes());
    }
}

/// A point-in-time view of a ceremony, published for the HTTP control surface to read.
#[derive(Debug, Clone, Serialize)]
pub struct CeremonySnapshot {
    /// The ceremony's id.
    pub ceremony_id: String,
    /// Which inner machine is currently driving it.
    pub active_machine: &'static str,
    /// The last log offset applied to this ceremony.
    pub last_offset: u64,
}

/// A dispatch operation failed for reasons unrelated to the event's own validity.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The envelope's `event_name` doesn't match any known event.
    #[error("unknown event name: {0}")]
    UnknownEventName(String),

    /// The payload failed to decode into the type `event_name` selects.
    #[error("payload decode failure: {0}")]
    Decode(#[from] encoding::codec::DecodeError),

    /// The envelope's signature didn't verify, or no key is known for its fingerprint.
    #[error("signature verification failed")]
    InvalidSignature,

    /// Reading from the log failed.
    #[error("transport failure: {0}")]
    Transport(#[from] dkg_transport::TransportError),

    /// Reading or writing a dump failed.
    #[error("storage failure: {0}")]
    Storage(#[from] dkg_store::StoreError),
}

/// Decode an envelope's `payload_bytes` into the [`CeremonyEvent`] its `event_name` selects.
fn decode_event(event_name: &str, payload_bytes: &[u8]) -> Result<CeremonyEvent, DispatchError> {
    let codec = MessageCodec::default();
    let event = match event_name {
        "signature_proposal.init" => {
            CeremonyEvent::SignatureProposal(SignatureProposalMessage::InitProposal(codec.decode(payload_bytes)?))
        }
        "signature_proposal.confirm" => {
            CeremonyEvent::SignatureProposal(SignatureProposalMessage::Confirm(codec.decode(payload_bytes)?))
        }
        "dkg_proposal.confirm" => CeremonyEvent::DkgProposal(DkgProposalMessage::Confirm(codec.decode(payload_bytes)?)),
        "dkg_proposal.error" => CeremonyEvent::DkgProposal(DkgProposalMessage::Error(codec.decode(payload_bytes)?)),
        "signing_proposal.start" => CeremonyEvent::SigningProposal(SigningProposalMessage::Start(codec.decode(payload_bytes)?)),
        "signing_proposal.confirm" => {
            CeremonyEvent::SigningProposal(SigningProposalMessage::Confirm(codec.decode(payload_bytes)?))
        }
        "signing_proposal.partial_key" => {
            CeremonyEvent::SigningProposal(SigningProposalMessage::PartialKey(codec.decode(payload_bytes)?))
        }
        "signing_proposal.partial_key_error" => {
            CeremonyEvent::SigningProposal(SigningProposalMessage::PartialKeyError(codec.decode(payload_bytes)?))
        }
        "signing_proposal.restart" => CeremonyEvent::SigningProposal(SigningProposalMessage::Restart),
        other => return Err(DispatchError::UnknownEventName(other.to_string())),
    };
    Ok(event)
}

/// Drives every ceremony's composed machine from a single log, serially and in offset order.
pub struct Dispatcher<T, D> {
    transport: Arc<T>,
    dump_store: Arc<D>,
    identities: Arc<dyn IdentityResolver>,
    deadlines: Deadlines,
    participants_min_count: u32,
    ceremonies: RwLock<HashMap<CeremonyId, CeremonyMachine>>,
    next_offset: RwLock<u64>,
    snapshots: watch::Sender<HashMap<String, CeremonySnapshot>>,
}

impl<T: LogTransport + 'static, D: DumpStore + 'static> Dispatcher<T, D> {
    /// Build a dispatcher over `transport` and `dump_store`, starting replay from offset 0.
    pub fn new(
        transport: Arc<T>,
        dump_store: Arc<D>,
        identities: Arc<dyn IdentityResolver>,
        deadlines: Deadlines,
        participants_min_count: u32,
    ) -> Self {
        let (snapshots, _) = watch::channel(HashMap::new());
        Self {
            transport,
            dump_store,
            identities,
            deadlines,
            participants_min_count,
            ceremonies: RwLock::new(HashMap::new()),
            next_offset: RwLock::new(0),
            snapshots,
        }
    }

    /// Subscribe to ceremony snapshots, for the HTTP control surface.
    pub fn snapshots(&self) -> watch::Receiver<HashMap<String, CeremonySnapshot>> {
        self.snapshots.subscribe()
    }

    /// Run the replay loop until `cancel` fires.
    ///
    /// Messages that fail domain validation (a bad request, a participant in the wrong status, an
    /// event the active machine doesn't accept) are logged and skipped: the watermark advances
    /// past them, since re-applying the same message would deterministically fail again.
    /// Transport and storage failures halt the loop entirely and propagate to the caller, since
    /// skipping past them could silently diverge from what was actually persisted.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), DispatchError> {
        loop {
            if cancel.is_cancelled() {
                info!("dispatcher stopping on cancellation");
                return Ok(());
            }
            let from_offset = *self.next_offset.read().await;
            let messages = self.transport.get_messages(from_offset).await?;
            if messages.is_empty() {
                tokio::select! {
                    _ = cancel.cancelled() => return Ok(()),
                    _ = tokio::time::sleep(std::time::Duration::from_millis(50)) => continue,
                }
            }
            for message in messages {
                self.apply(message).await?;
            }
        }
    }

    async fn apply(&self, message: LogEnvelope) -> Result<(), DispatchError> {
        let offset = message.offset;
        let envelope = message.envelope;

        let Some(public_key) = self.identities.resolve(&envelope.sender_fingerprint) else {
            warn!(offset, fingerprint = %envelope.sender_fingerprint, "rejecting envelope from unknown sender");
            *self.next_offset.write().await = offset.saturating_add(1);
            return Ok(());
        };
        if public_key.verify(&envelope.signature, &envelope.signed_bytes()).is_err() {
            warn!(offset, fingerprint = %envelope.sender_fingerprint, "rejecting envelope with invalid signature");
            *self.next_offset.write().await = offset.saturating_add(1);
            return Ok(());
        }

        let event = match decode_event(&envelope.event_name, &envelope.payload_bytes) {
            Ok(event) => event,
            Err(error) => {
                warn!(offset, %error, "rejecting envelope with undecodable payload");
                *self.next_offset.write().await = offset.saturating_add(1);
                return Ok(());
            }
        };

        let ceremony_id = envelope.ceremony_id.clone();
        let mut ceremonies = self.ceremonies.write().await;
        if !ceremonies.contains_key(&ceremony_id) {
            let machine = match self.dump_store.get(&ceremony_id).await? {
                Some(dump) => {
                    let dump = MachineDump::decode(&dump.bytes).map_err(DispatchError::Decode)?;
                    CeremonyMachine::from_dump(dump)
                }
                None => CeremonyMachine::new(ceremony_id.clone(), self.participants_min_count, self.deadlines),
            };
            ceremonies.insert(ceremony_id.clone(), machine);
        }
        let machine = ceremonies.get_mut(&ceremony_id).expect("just inserted if missing");

        debug!(offset, ceremony_id = %ceremony_id, machine = machine.active_machine_name(), "applying event");
        match machine.handle_event(event) {
            Ok(outcome) => {
                if matches!(outcome, CeremonyOutcome::Invitations(_)) {
                    // Participants admitted into a quorum become resolvable senders for their
                    // own future confirmations.
                    if let Some(quorum) = machine.quorum().map_err(|error| {
                        DispatchError::Storage(dkg_store::StoreError::Io(std::io::Error::other(error.to_string())))
                    })? {
                        for participant in quorum.iter() {
                            if let Ok(key) = dkg_crypto::LongTermPublicKey::from_bytes(&participant.public_key) {
                                self.identities.observe(participant.fingerprint, key);
                            }
                        }
                    }
                }
                let dump = machine.dump().map_err(|error| {
                    error!(ceremony_id = %ceremony_id, %error, "failed to snapshot ceremony state");
                    DispatchError::Storage(dkg_store::StoreError::Io(std::io::Error::other(error.to_string())))
                })?;
                let encoded = dump.encode().map_err(|error| {
                    DispatchError::Storage(dkg_store::StoreError::Io(std::io::Error::other(error.to_string())))
                })?;
                let current_version = self.dump_store.get(&ceremony_id).await?.map(|dump| dump.version);
                self.dump_store.put(&ceremony_id, encoded, current_version).await?;
                info!(ceremony_id = %ceremony_id, machine = machine.active_machine_name(), "event applied");
                self.publish_snapshot(&ceremony_id, machine, offset);
            }
            Err(error) => {
                warn!(offset, ceremony_id = %ceremony_id, %error, "event rejected by ceremony machine");
            }
        }
        *self.next_offset.write().await = offset.saturating_add(1);
        Ok(())
    }

    fn publish_snapshot(&self, ceremony_id: &CeremonyId, machine: &CeremonyMachine, offset: u64) {
        self.snapshots.send_modify(|snapshots| {
            snapshots.insert(
                ceremony_id.as_str().to_string(),
                CeremonySnapshot {
                    ceremony_id: ceremony_id.as_str().to_string(),
                    active_machine: machine.active_machine_name(),
                    last_offset: offset,
                },
            );
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dkg_crypto::{generate_invitation_secret, DkgKeypair, LongTermKeypair};
    use dkg_fsm::requests::ParticipantInput;
    use dkg_store::FileDumpStore;
    use dkg_transport::{InMemoryLogTransport, UnpositionedEnvelope};

    fn participant_input(keypair: &LongTermKeypair, name: &str) -> ParticipantInput {
        let dkg_public_key = DkgKeypair::generate().public_key();
        let secret = generate_invitation_secret();
        let encrypted_invitation = dkg_public_key.seal(&secret).expect("seal succeeds");
        ParticipantInput {
            title: name.to_string(),
            addr: "127.0.0.1:9000".to_string(),
            public_key: keypair.public_key().as_bytes(),
            dkg_public_key: dkg_public_key.as_bytes(),
            invitation_secret: secret.to_vec(),
            encrypted_invitation,
        }
    }

    async fn send_signed(
        transport: &InMemoryLogTransport,
        keypair: &LongTermKeypair,
        ceremony_id: &CeremonyId,
        event_name: &str,
        payload: &impl serde::Serialize,
    ) {
        let payload_bytes = MessageCodec::default().encode(payload).expect("encode succeeds");
        let sender_fingerprint = dkg_crypto::fingerprint(&keypair.public_key().as_bytes());
        let mut envelope = UnpositionedEnvelope {
            ceremony_id: ceremony_id.clone(),
            event_name: event_name.to_string(),
            payload_bytes,
            sender_fingerprint,
            signature: vec![],
        };
        let signature: Vec<u8> = keypair.sign(&envelope.signed_bytes()).into();
        envelope.signature = signature;
        transport.send(envelope).await.expect("send succeeds");
    }

    #[tokio::test]
    async fn applies_an_init_proposal_and_persists_a_dump() {
        let transport = Arc::new(InMemoryLogTransport::new());
        let dir = tempfile::tempdir().expect("tempdir");
        let dump_store = Arc::new(FileDumpStore::new(dir.path()).expect("store opens"));
        let identities = Arc::new(InMemoryIdentityDirectory::new());

        let proposer = LongTermKeypair::generate();
        identities.observe(dkg_crypto::fingerprint(&proposer.public_key().as_bytes()), proposer.public_key());

        let ceremony_id = CeremonyId::new("abc123");
        let request = dkg_fsm::requests::ParticipantsListRequest {
            participants: vec![participant_input(&proposer, "john"), participant_input(&proposer, "billy")],
            created_at: chrono::Utc::now(),
        };
        send_signed(&transport, &proposer, &ceremony_id, "signature_proposal.init", &request).await;

        let dispatcher = Arc::new(Dispatcher::new(transport, dump_store.clone(), identities, Deadlines::default(), 2));
        let cancel = CancellationToken::new();
        let running = tokio::spawn({
            let dispatcher = dispatcher.clone();
            let cancel = cancel.clone();
            async move { dispatcher.run(cancel).await }
        });
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        cancel.cancel();
        running.await.expect("dispatcher task joins").expect("dispatcher run succeeds");

        let dump = dump_store.get(&ceremony_id).await.expect("get succeeds");
        assert!(dump.is_some());
    }
}
