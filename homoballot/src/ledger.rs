use crate::commitment::VoterFingerprint;
use crate::*;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// An anchored vote. Never updated or removed once appended.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct VoteCommitment {
    /// Position in the ledger, starting at 1
    pub sequence: u64,
    pub election_id: ElectionId,
    pub commitment: CommitmentHash,
    pub ballot: EncryptedBallot,
    pub submitted_at: DateTime<Utc>,
}

/// Proof of inclusion handed back to the voter
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Receipt {
    pub election_id: ElectionId,
    pub commitment: CommitmentHash,
    pub sequence: u64,
    pub anchored_at: DateTime<Utc>,
}

/// The votes of one election as of some ledger height
#[derive(Clone, Debug)]
pub struct LedgerSnapshot {
    pub election_id: ElectionId,
    pub height: u64,
    pub votes: Vec<Arc<VoteCommitment>>,
}

impl LedgerSnapshot {
    pub fn len(&self) -> usize {
        self.votes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.votes.is_empty()
    }
}

/// Append-only store of vote commitments, keyed by commitment hash.
///
/// Commitment hashes are unique across all elections. Voter tokens are kept only
/// as per-election fingerprints, in a set that is not linked to the votes.
pub struct VoteLedger {
    registry: Arc<Registry>,
    index: DashMap<CommitmentHash, Arc<VoteCommitment>>,
    by_election: DashMap<ElectionId, Vec<Arc<VoteCommitment>>>,
    voters: DashSet<VoterFingerprint>,
    height: AtomicU64,
}

impl VoteLedger {
    pub fn new(registry: Arc<Registry>) -> Self {
        VoteLedger {
            registry,
            index: DashMap::new(),
            by_election: DashMap::new(),
            voters: DashSet::new(),
            height: AtomicU64::new(0),
        }
    }

    /// Registry whose elections gate this ledger
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Submit a vote at the current time
    pub fn submit(
        &self,
        election_id: ElectionId,
        commitment: CommitmentHash,
        ballot: EncryptedBallot,
        voter_token: &[u8],
    ) -> Result<Receipt, Error> {
        self.submit_at(election_id, commitment, ballot, voter_token, Utc::now())
    }

    /// Submit a vote as if the current time were `now`.
    ///
    /// The election state, window, ballot shape and duplicate checks all run while
    /// holding the election's lock, and the insertion into the commitment index is a
    /// single atomic entry operation. The `VoteAnchored` event is appended before the
    /// vote is stored, so a failed append leaves the ledger untouched.
    pub fn submit_at(
        &self,
        election_id: ElectionId,
        commitment: CommitmentHash,
        ballot: EncryptedBallot,
        voter_token: &[u8],
        now: DateTime<Utc>,
    ) -> Result<Receipt, Error> {
        let result = self.registry.with_record(election_id, |record| {
            let election = &record.election;
            if election.state != ElectionState::Open {
                return Err(Error::NotOpen(election_id, election.state));
            }
            if !election.in_window(now) {
                return Err(Error::OutOfWindow(election_id));
            }
            ballot.validate(&election.public_key, election.candidate_count())?;

            let voter = VoterFingerprint::new(election_id, voter_token);
            if self.voters.contains(&voter) {
                return Err(Error::DuplicateVote(format!(
                    "voter has already voted in election {}",
                    election_id
                )));
            }

            let vote = match self.index.entry(commitment) {
                Entry::Occupied(_) => return Err(Error::DuplicateVote(commitment.to_string())),
                Entry::Vacant(slot) => {
                    // Nothing is stored unless the event made it into the audit log
                    self.registry.audit_log().append(Event::VoteAnchored {
                        election_id,
                        commitment,
                    })?;

                    let sequence = self.height.fetch_add(1, Ordering::SeqCst) + 1;
                    let vote = Arc::new(VoteCommitment {
                        sequence,
                        election_id,
                        commitment,
                        ballot,
                        submitted_at: now,
                    });
                    slot.insert(vote.clone());
                    vote
                }
            };
            self.voters.insert(voter);
            self.by_election
                .entry(election_id)
                .or_insert_with(Vec::new)
                .push(vote.clone());

            Ok(Receipt {
                election_id,
                commitment,
                sequence: vote.sequence,
                anchored_at: now,
            })
        });

        match &result {
            Ok(receipt) => debug!(
                "homoballot: anchored vote {} in election {} at height {}",
                receipt.commitment, election_id, receipt.sequence
            ),
            Err(e) => warn!(
                "homoballot: rejected vote for election {}: {}",
                election_id, e
            ),
        }
        result
    }

    pub fn exists(&self, commitment: &CommitmentHash) -> bool {
        self.index.contains_key(commitment)
    }

    pub fn get(&self, commitment: &CommitmentHash) -> Option<Arc<VoteCommitment>> {
        self.index.get(commitment).map(|vote| vote.value().clone())
    }

    /// Every vote anchored for an election, in submission order
    pub fn all_for_election(&self, election_id: ElectionId) -> Vec<Arc<VoteCommitment>> {
        self.by_election
            .get(&election_id)
            .map(|votes| votes.value().clone())
            .unwrap_or_default()
    }

    pub fn count_for_election(&self, election_id: ElectionId) -> usize {
        self.by_election
            .get(&election_id)
            .map(|votes| votes.len())
            .unwrap_or(0)
    }

    /// Whether the holder of `voter_token` has voted in the election
    pub fn has_voted(&self, election_id: ElectionId, voter_token: &[u8]) -> bool {
        self.voters
            .contains(&VoterFingerprint::new(election_id, voter_token))
    }

    /// Total number of votes anchored across all elections
    pub fn height(&self) -> u64 {
        self.height.load(Ordering::SeqCst)
    }

    /// Copy out an election's votes.
    ///
    /// Once the election is closed nothing more can be appended to it, so a snapshot
    /// taken after the close holds exactly the votes accepted before it.
    pub fn snapshot(&self, election_id: ElectionId) -> LedgerSnapshot {
        let height = self.height();
        LedgerSnapshot {
            election_id,
            height,
            votes: self.all_for_election(election_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    struct Fixture {
        registry: Arc<Registry>,
        ledger: VoteLedger,
        admin: AdminCapability,
        public: PublicKey,
        rng: ChaCha20Rng,
    }

    fn fixture() -> Fixture {
        let mut rng = ChaCha20Rng::seed_from_u64(21);
        let (public, _private) = keygen(256, &mut rng).unwrap();
        let admin = AdminCapability::generate();
        let registry = Arc::new(Registry::new(
            admin.public_key(),
            Arc::new(AuditLog::new()),
        ));

        let now = Utc::now();
        let mut election = Election::new(
            ElectionId(1),
            "Referendum",
            now - Duration::seconds(5),
            now + Duration::seconds(1000),
            public.clone(),
        );
        election.candidates = vec!["Yes".to_owned(), "No".to_owned()];
        registry.create(&admin, election).unwrap();

        Fixture {
            ledger: VoteLedger::new(registry.clone()),
            registry,
            admin,
            public,
            rng,
        }
    }

    fn ballot(f: &mut Fixture, choice: usize) -> EncryptedBallot {
        EncryptedBallot::encrypt_choice(&f.public, choice, 2, &mut f.rng).unwrap()
    }

    #[test]
    fn submit_and_read() {
        let mut f = fixture();
        let id = ElectionId(1);
        let ballot = ballot(&mut f, 0);
        let commitment = CommitmentHash::for_ballot(id, &ballot, b"nonce-1");

        let receipt = f.ledger.submit(id, commitment, ballot, b"alice").unwrap();
        assert_eq!(receipt.commitment, commitment);
        assert_eq!(receipt.sequence, 1);

        assert!(f.ledger.exists(&commitment));
        assert!(f.ledger.has_voted(id, b"alice"));
        assert!(!f.ledger.has_voted(id, b"bob"));
        assert_eq!(f.ledger.count_for_election(id), 1);
        assert_eq!(f.ledger.get(&commitment).unwrap().commitment, commitment);
        assert_eq!(f.ledger.snapshot(id).height, 1);
        assert!(f.ledger.all_for_election(ElectionId(2)).is_empty());
    }

    #[test]
    fn duplicate_commitment_rejected() {
        let mut f = fixture();
        let id = ElectionId(1);
        let first = ballot(&mut f, 0);
        let commitment = CommitmentHash::for_ballot(id, &first, b"nonce");
        f.ledger.submit(id, commitment, first, b"alice").unwrap();

        let second = ballot(&mut f, 1);
        assert!(matches!(
            f.ledger.submit(id, commitment, second, b"bob"),
            Err(Error::DuplicateVote(_))
        ));
        assert!(!f.ledger.has_voted(id, b"bob"));
        assert_eq!(f.ledger.count_for_election(id), 1);
    }

    #[test]
    fn one_vote_per_voter() {
        let mut f = fixture();
        let id = ElectionId(1);
        let first = ballot(&mut f, 0);
        let second = ballot(&mut f, 1);
        let c1 = CommitmentHash::for_ballot(id, &first, b"n1");
        let c2 = CommitmentHash::for_ballot(id, &second, b"n2");

        f.ledger.submit(id, c1, first, b"alice").unwrap();
        assert!(matches!(
            f.ledger.submit(id, c2, second, b"alice"),
            Err(Error::DuplicateVote(_))
        ));
        assert!(!f.ledger.exists(&c2));
    }

    #[test]
    fn window_and_state_are_enforced() {
        let mut f = fixture();
        let id = ElectionId(1);
        let election = f.registry.get(id).unwrap();

        let b = ballot(&mut f, 0);
        let c = CommitmentHash::for_ballot(id, &b, b"early");
        let early = election.opens_at - Duration::seconds(1);
        assert!(matches!(
            f.ledger.submit_at(id, c, b, b"alice", early),
            Err(Error::OutOfWindow(_))
        ));

        let b = ballot(&mut f, 0);
        let c = CommitmentHash::for_ballot(id, &b, b"late");
        assert!(matches!(
            f.ledger.submit_at(id, c, b, b"alice", election.closes_at),
            Err(Error::OutOfWindow(_))
        ));

        f.registry.close(&f.admin, id).unwrap();
        let b = ballot(&mut f, 0);
        let c = CommitmentHash::for_ballot(id, &b, b"closed");
        assert!(matches!(
            f.ledger.submit(id, c, b, b"alice"),
            Err(Error::NotOpen(_, ElectionState::Closed))
        ));

        let b = ballot(&mut f, 0);
        assert!(matches!(
            f.ledger.submit(ElectionId(9), c, b, b"alice"),
            Err(Error::ElectionNotFound(_))
        ));
        assert_eq!(f.ledger.count_for_election(id), 0);
        assert!(!f.ledger.has_voted(id, b"alice"));
    }

    #[test]
    fn malformed_ballots_rejected() {
        let mut f = fixture();
        let id = ElectionId(1);

        let short = EncryptedBallot::encrypt_values(&f.public, &[1], &mut f.rng).unwrap();
        let c = CommitmentHash::for_ballot(id, &short, b"short");
        assert!(matches!(
            f.ledger.submit(id, c, short, b"alice"),
            Err(Error::MalformedBallot {
                expected: 2,
                found: 1
            })
        ));

        let mut bad = ballot(&mut f, 0);
        bad.slots[1] = Ciphertext::from(f.public.n_squared().clone());
        let c = CommitmentHash::for_ballot(id, &bad, b"bad");
        assert!(matches!(
            f.ledger.submit(id, c, bad, b"alice"),
            Err(Error::MalformedCiphertext)
        ));
    }

    #[test]
    fn audit_events_match_stored_votes() {
        let mut f = fixture();
        let id = ElectionId(1);
        let log = f.registry.audit_log().clone();
        let anchored = |log: &AuditLog| {
            log.entries_for(id)
                .into_iter()
                .filter(|e| matches!(e.event, Event::VoteAnchored { .. }))
                .count()
        };

        let first = ballot(&mut f, 0);
        let c1 = CommitmentHash::for_ballot(id, &first, b"n1");
        f.ledger.submit(id, c1, first.clone(), b"alice").unwrap();

        // Rejected submissions leave neither a vote nor an event behind
        assert!(f.ledger.submit(id, c1, first, b"bob").is_err());
        let second = ballot(&mut f, 1);
        let c2 = CommitmentHash::for_ballot(id, &second, b"n2");
        assert!(f.ledger.submit(id, c2, second, b"alice").is_err());

        assert_eq!(anchored(&log), 1);
        assert_eq!(f.ledger.count_for_election(id), 1);
        assert_eq!(f.ledger.height(), 1);

        match &log.entries_for(id).last().unwrap().event {
            Event::VoteAnchored { commitment, .. } => assert_eq!(*commitment, c1),
            other => panic!("unexpected event {:?}", other),
        }
    }
}
