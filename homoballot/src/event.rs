use crate::util::hash_parts;
use crate::*;
use chrono::{DateTime, Utc};
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;

/// Observable state transitions, emitted exactly once each, in order.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
pub enum Event {
    ElectionCreated {
        election_id: ElectionId,
        name: String,
        opens_at: DateTime<Utc>,
        closes_at: DateTime<Utc>,
        candidates: usize,
    },
    VoteAnchored {
        election_id: ElectionId,
        commitment: CommitmentHash,
    },
    ElectionClosed {
        election_id: ElectionId,
    },
    ResultPublished {
        election_id: ElectionId,
        slot: usize,
        count: u64,
        commitment: CommitmentHash,
    },
}

impl Event {
    pub fn election_id(&self) -> ElectionId {
        match self {
            Event::ElectionCreated { election_id, .. } => *election_id,
            Event::VoteAnchored { election_id, .. } => *election_id,
            Event::ElectionClosed { election_id } => *election_id,
            Event::ResultPublished { election_id, .. } => *election_id,
        }
    }
}

hash_newtype!(
    /// Hash of an audit entry, chaining it to every entry before it
    EntryHash
);

impl EntryHash {
    /// The `previous` hash of the first entry
    pub fn genesis() -> Self {
        EntryHash([0u8; 32])
    }
}

/// One link of the audit chain
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AuditEntry {
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub event: Event,
    pub previous: EntryHash,
    pub hash: EntryHash,
}

// The hashed part of an entry
#[derive(Serialize)]
struct EntryBody<'a> {
    sequence: u64,
    timestamp: &'a DateTime<Utc>,
    event: &'a Event,
}

impl AuditEntry {
    fn compute_hash(
        sequence: u64,
        timestamp: &DateTime<Utc>,
        event: &Event,
        previous: &EntryHash,
    ) -> Result<EntryHash, Error> {
        let body = serde_cbor::to_vec(&EntryBody {
            sequence,
            timestamp,
            event,
        })?;
        Ok(EntryHash(hash_parts(
            "homoballot/audit",
            &[previous.as_bytes(), &body],
        )))
    }
}

#[derive(Default)]
struct AuditInner {
    entries: Vec<AuditEntry>,
    subscribers: Vec<Sender<AuditEntry>>,
}

/// Append-only, hash-chained log of every event.
///
/// Anyone holding a copy of the entries can check them with `verify_chain`
/// without any key material.
#[derive(Default)]
pub struct AuditLog {
    inner: Mutex<AuditInner>,
}

impl AuditLog {
    pub fn new() -> Self {
        AuditLog::default()
    }

    /// Append an event and deliver it to subscribers
    pub fn append(&self, event: Event) -> Result<AuditEntry, Error> {
        let mut inner = self.inner.lock();

        let sequence = inner.entries.len() as u64;
        let previous = inner
            .entries
            .last()
            .map(|e| e.hash)
            .unwrap_or_else(EntryHash::genesis);
        let timestamp = Utc::now();
        let hash = AuditEntry::compute_hash(sequence, &timestamp, &event, &previous)?;

        let entry = AuditEntry {
            sequence,
            timestamp,
            event,
            previous,
            hash,
        };
        inner.entries.push(entry.clone());

        // Drop subscribers that went away
        inner
            .subscribers
            .retain(|subscriber| subscriber.send(entry.clone()).is_ok());

        Ok(entry)
    }

    /// Receive every entry appended from now on, in order
    pub fn subscribe(&self) -> Receiver<AuditEntry> {
        let (sender, receiver) = unbounded();
        self.inner.lock().subscribers.push(sender);
        receiver
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.inner.lock().entries.clone()
    }

    pub fn entries_for(&self, election_id: ElectionId) -> Vec<AuditEntry> {
        self.inner
            .lock()
            .entries
            .iter()
            .filter(|e| e.event.election_id() == election_id)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Hash of the latest entry
    pub fn head(&self) -> EntryHash {
        self.inner
            .lock()
            .entries
            .last()
            .map(|e| e.hash)
            .unwrap_or_else(EntryHash::genesis)
    }
}

/// Check sequence numbers, links and hashes of a full audit chain.
pub fn verify_chain(entries: &[AuditEntry]) -> Result<(), Error> {
    let mut previous = EntryHash::genesis();
    for (index, entry) in entries.iter().enumerate() {
        if entry.sequence != index as u64 || entry.previous != previous {
            return Err(Error::AuditChainBroken(index as u64));
        }

        let expected =
            AuditEntry::compute_hash(entry.sequence, &entry.timestamp, &entry.event, &previous)?;
        if entry.hash != expected {
            return Err(Error::AuditChainBroken(index as u64));
        }
        previous = entry.hash;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn closed(id: u64) -> Event {
        Event::ElectionClosed {
            election_id: ElectionId(id),
        }
    }

    #[test]
    fn entries_are_chained() {
        let log = AuditLog::new();
        assert!(log.is_empty());
        assert_eq!(log.head(), EntryHash::genesis());

        let first = log.append(closed(1)).unwrap();
        let second = log.append(closed(2)).unwrap();

        assert_eq!(first.sequence, 0);
        assert_eq!(first.previous, EntryHash::genesis());
        assert_eq!(second.previous, first.hash);
        assert_eq!(log.head(), second.hash);
        assert_eq!(log.entries_for(ElectionId(2)), vec![second]);

        verify_chain(&log.entries()).unwrap();
    }

    #[test]
    fn tampering_is_detected() {
        let log = AuditLog::new();
        for id in 0..4 {
            log.append(closed(id)).unwrap();
        }

        let mut entries = log.entries();
        entries[2].event = closed(42);
        assert!(matches!(
            verify_chain(&entries),
            Err(Error::AuditChainBroken(2))
        ));

        let mut entries = log.entries();
        entries.remove(1);
        assert!(matches!(
            verify_chain(&entries),
            Err(Error::AuditChainBroken(1))
        ));
    }

    #[test]
    fn chain_survives_serialization() {
        let log = AuditLog::new();
        log.append(Event::VoteAnchored {
            election_id: ElectionId(3),
            commitment: CommitmentHash::for_result(ElectionId(3), 0, 0),
        })
        .unwrap();
        log.append(closed(3)).unwrap();

        let json = serde_json::to_string(&log.entries()).unwrap();
        let entries: Vec<AuditEntry> = serde_json::from_str(&json).unwrap();
        verify_chain(&entries).unwrap();
    }

    #[test]
    fn subscribers_receive_in_order() {
        let log = AuditLog::new();
        log.append(closed(1)).unwrap();

        let receiver = log.subscribe();
        log.append(closed(2)).unwrap();
        log.append(closed(3)).unwrap();

        let received: Vec<u64> = receiver.try_iter().map(|e| e.sequence).collect();
        assert_eq!(received, vec![1, 2]);

        // A dropped subscriber doesn't break appends
        drop(receiver);
        log.append(closed(4)).unwrap();
    }
}
