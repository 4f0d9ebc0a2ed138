use crate::*;
use indexmap::IndexMap;
use std::sync::Arc;

/// Published count for one candidate slot
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TallyResult {
    pub election_id: ElectionId,
    pub slot: usize,
    pub count: u64,

    /// Binds the count to its election and slot
    pub commitment: CommitmentHash,
}

impl TallyResult {
    pub fn new(election_id: ElectionId, slot: usize, count: u64) -> Self {
        TallyResult {
            election_id,
            slot,
            count,
            commitment: CommitmentHash::for_result(election_id, slot, count),
        }
    }

    /// Whether the commitment matches the rest of the result
    pub fn verify(&self) -> bool {
        self.commitment == CommitmentHash::for_result(self.election_id, self.slot, self.count)
    }
}

/// Outcome of tallying a closed election
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Tally {
    pub election_id: ElectionId,

    /// Number of ballots aggregated
    pub num_votes: u64,

    /// Ledger height when the votes were read
    pub ledger_height: u64,

    pub results: Vec<TallyResult>,
}

impl Tally {
    pub fn counts(&self) -> Vec<u64> {
        self.results.iter().map(|r| r.count).collect()
    }

    /// Counts keyed by candidate name, in ballot order
    pub fn totals(&self, candidates: &[String]) -> IndexMap<String, u64> {
        candidates
            .iter()
            .zip(self.results.iter())
            .map(|(name, result)| (name.clone(), result.count))
            .collect()
    }
}

/// Fold every ballot's slot-k ciphertext into one aggregate per slot.
///
/// Any ballot of the wrong shape, or with a ciphertext outside the group, fails the
/// whole aggregation. Skipping it would leave totals that disagree with the ledger.
pub fn aggregate(
    public: &PublicKey,
    candidates: usize,
    votes: &[Arc<VoteCommitment>],
) -> Result<Vec<Ciphertext>, Error> {
    let mut totals = vec![Ciphertext::identity(); candidates];

    for vote in votes {
        if vote.ballot.len() != candidates {
            return Err(Error::CorruptBallot {
                commitment: vote.commitment,
                slot: vote.ballot.len().min(candidates),
            });
        }
        for (slot, ciphertext) in vote.ballot.slots.iter().enumerate() {
            public
                .validate(ciphertext)
                .map_err(|_| Error::CorruptBallot {
                    commitment: vote.commitment,
                    slot,
                })?;
            totals[slot] = public.combine(&totals[slot], ciphertext);
        }
    }

    Ok(totals)
}

/// Computes the results of closed elections
pub struct TallyEngine {
    registry: Arc<Registry>,
    ledger: Arc<VoteLedger>,
    authority: Arc<KeyAuthority>,
}

impl TallyEngine {
    pub fn new(
        registry: Arc<Registry>,
        ledger: Arc<VoteLedger>,
        authority: Arc<KeyAuthority>,
    ) -> Self {
        TallyEngine {
            registry,
            ledger,
            authority,
        }
    }

    /// Tally a closed election.
    ///
    /// Only the K per-slot aggregates are sent to the key authority. The decrypted
    /// counts must add up to the number of anchored votes.
    pub fn tally(&self, election_id: ElectionId) -> Result<Tally, Error> {
        let election = self.registry.get(election_id)?;
        election.require(ElectionState::Closed)?;

        let snapshot = self.ledger.snapshot(election_id);
        let num_votes = snapshot.len() as u64;

        let aggregates = aggregate(
            &election.public_key,
            election.candidate_count(),
            &snapshot.votes,
        )?;
        let counts = self.authority.decrypt_tally(election_id, &aggregates)?;

        let sum: u64 = counts.iter().sum();
        if sum != num_votes {
            return Err(Error::TallyMismatch {
                expected: num_votes,
                found: sum,
            });
        }

        info!(
            "homoballot: tallied {} votes for election {}",
            num_votes, election_id
        );
        Ok(Tally {
            election_id,
            num_votes,
            ledger_height: snapshot.height,
            results: counts
                .into_iter()
                .enumerate()
                .map(|(slot, count)| TallyResult::new(election_id, slot, count))
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use num_bigint_dig::BigUint;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn vote(sequence: u64, ballot: EncryptedBallot) -> Arc<VoteCommitment> {
        Arc::new(VoteCommitment {
            sequence,
            election_id: ElectionId(1),
            commitment: CommitmentHash::for_ballot(ElectionId(1), &ballot, &sequence.to_be_bytes()),
            ballot,
            submitted_at: Utc::now(),
        })
    }

    #[test]
    fn aggregate_sums_slots() {
        let mut rng = ChaCha20Rng::seed_from_u64(41);
        let (public, private) = keygen(256, &mut rng).unwrap();

        let choices = [0, 2, 2, 1, 2];
        let votes: Vec<_> = choices
            .iter()
            .enumerate()
            .map(|(i, choice)| {
                vote(
                    i as u64,
                    EncryptedBallot::encrypt_choice(&public, *choice, 3, &mut rng).unwrap(),
                )
            })
            .collect();

        let totals = aggregate(&public, 3, &votes).unwrap();
        let counts: Vec<BigUint> = totals.iter().map(|c| private.decrypt(c).unwrap()).collect();
        assert_eq!(
            counts,
            vec![BigUint::from(1u64), BigUint::from(1u64), BigUint::from(3u64)]
        );

        // No votes: every slot is an encryption of zero
        let empty = aggregate(&public, 3, &[]).unwrap();
        assert!(empty.iter().all(|c| private.decrypt(c).unwrap() == BigUint::from(0u64)));
    }

    #[test]
    fn corrupt_ballot_fails_whole_aggregate() {
        let mut rng = ChaCha20Rng::seed_from_u64(42);
        let (public, _private) = keygen(256, &mut rng).unwrap();

        let good = vote(1, EncryptedBallot::encrypt_choice(&public, 0, 2, &mut rng).unwrap());
        let mut ballot = EncryptedBallot::encrypt_choice(&public, 1, 2, &mut rng).unwrap();
        ballot.slots[1] = Ciphertext::from(BigUint::from(0u64));
        let bad = vote(2, ballot);

        match aggregate(&public, 2, &[good.clone(), bad.clone()]) {
            Err(Error::CorruptBallot { commitment, slot }) => {
                assert_eq!(commitment, bad.commitment);
                assert_eq!(slot, 1);
            }
            _ => panic!("expected CorruptBallot"),
        }

        let short = vote(3, EncryptedBallot::encrypt_values(&public, &[1], &mut rng).unwrap());
        assert!(matches!(
            aggregate(&public, 2, &[good, short]),
            Err(Error::CorruptBallot { slot: 1, .. })
        ));
    }

    #[test]
    fn result_commitments_verify() {
        let result = TallyResult::new(ElectionId(4), 1, 10);
        assert!(result.verify());

        let mut forged = result.clone();
        forged.count = 11;
        assert!(!forged.verify());
    }
}
