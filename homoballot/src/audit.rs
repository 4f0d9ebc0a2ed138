use crate::*;
use std::collections::BTreeMap;

/// Public, key-free integrity check of one election.
///
/// Everything here is recomputed from the registry, the ledger and the audit log;
/// none of it needs the election's private key.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct IntegrityReport {
    pub election_id: ElectionId,
    pub state: ElectionState,
    pub total_votes: u64,
    pub candidates: usize,
    pub results_recorded: usize,
    pub results_complete: bool,

    /// Published commitment per slot
    pub result_commitments: BTreeMap<usize, CommitmentHash>,

    /// Every result matches its commitment and the counts add up to `total_votes`
    pub results_consistent: bool,

    /// The full audit log verifies
    pub chain_intact: bool,

    /// Number of `VoteAnchored` events for this election in the audit log
    pub anchored_events: u64,
}

impl IntegrityReport {
    pub fn build(
        registry: &Registry,
        ledger: &VoteLedger,
        election_id: ElectionId,
    ) -> Result<Self, Error> {
        let election = registry.get(election_id)?;
        let results = registry.results(election_id)?;
        let total_votes = ledger.count_for_election(election_id) as u64;
        let candidates = election.candidate_count();
        let results_complete = results.len() == candidates;

        let sum: u64 = results.iter().map(|r| r.count).sum();
        let results_consistent = results
            .iter()
            .all(|r| r.election_id == election_id && r.verify())
            && (!results_complete || sum == total_votes);

        let entries = registry.audit_log().entries();
        let chain_intact = match verify_chain(&entries) {
            Ok(()) => true,
            Err(e) => {
                error!("homoballot: audit chain check failed: {}", e);
                false
            }
        };
        let anchored_events = entries
            .iter()
            .filter(|entry| match &entry.event {
                Event::VoteAnchored {
                    election_id: id, ..
                } => *id == election_id,
                _ => false,
            })
            .count() as u64;

        Ok(IntegrityReport {
            election_id,
            state: election.state,
            total_votes,
            candidates,
            results_recorded: results.len(),
            results_complete,
            result_commitments: results.iter().map(|r| (r.slot, r.commitment)).collect(),
            results_consistent,
            chain_intact,
            anchored_events,
        })
    }

    /// Whether every check passed and all results are in
    pub fn is_valid(&self) -> bool {
        self.results_complete
            && self.results_consistent
            && self.chain_intact
            && self.anchored_events == self.total_votes
    }
}
