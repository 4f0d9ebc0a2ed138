use crate::util::hash_parts;
use crate::*;

hash_newtype!(
    /// Fingerprint of an encrypted ballot bound to a voter nonce.
    ///
    /// Reveals nothing about ballot content; the ledger rejects any hash it has
    /// already anchored.
    CommitmentHash
);

impl CommitmentHash {
    /// Derive the commitment for a ballot in an election.
    ///
    /// `voter_nonce` is a secret chosen by the voter so that they, and only they,
    /// can later show the receipt belongs to them.
    pub fn for_ballot(
        election_id: ElectionId,
        ballot: &EncryptedBallot,
        voter_nonce: &[u8],
    ) -> Self {
        let election = election_id.0.to_be_bytes();
        let slots: Vec<Vec<u8>> = ballot.slots.iter().map(|c| c.to_bytes_be()).collect();

        let mut parts: Vec<&[u8]> = Vec::with_capacity(slots.len() + 2);
        parts.push(&election);
        for slot in &slots {
            parts.push(slot);
        }
        parts.push(voter_nonce);

        CommitmentHash(hash_parts("homoballot/ballot", &parts))
    }

    /// Derive the commitment binding a published count to its election and slot.
    pub fn for_result(election_id: ElectionId, slot: usize, count: u64) -> Self {
        CommitmentHash(hash_parts(
            "homoballot/result",
            &[
                &election_id.0.to_be_bytes(),
                &(slot as u64).to_be_bytes(),
                &count.to_be_bytes(),
            ],
        ))
    }
}

/// Fingerprint of an opaque voter token, scoped to one election.
///
/// Stored apart from the vote records so that participation can be checked
/// without linking a voter to a ballot.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub(crate) struct VoterFingerprint([u8; 32]);

impl VoterFingerprint {
    pub(crate) fn new(election_id: ElectionId, voter_token: &[u8]) -> Self {
        VoterFingerprint(hash_parts(
            "homoballot/voter",
            &[&election_id.0.to_be_bytes(), voter_token],
        ))
    }
}
