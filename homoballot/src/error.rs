use crate::*;

use thiserror::Error;

/// Error types
#[derive(Debug, Error)]
pub enum Error {
    #[error("homoballot: {0} already exists")]
    AlreadyExists(String),

    #[error("homoballot: election must have at least one candidate")]
    NoCandidates,

    #[error("homoballot: invalid election window - close time must be after open time")]
    InvalidWindow,

    #[error("homoballot: election {0} not found")]
    ElectionNotFound(ElectionId),

    #[error("homoballot: election {0} is not open (state: {1})")]
    NotOpen(ElectionId, ElectionState),

    #[error("homoballot: election {id} is {actual}, operation requires {expected}")]
    InvalidState {
        id: ElectionId,
        expected: ElectionState,
        actual: ElectionState,
    },

    #[error("homoballot: tally for election {0} has already been decrypted")]
    TallyAlreadyDecrypted(ElectionId),

    #[error("homoballot: submission outside the voting window of election {0}")]
    OutOfWindow(ElectionId),

    #[error("homoballot: duplicate vote {0}")]
    DuplicateVote(String),

    #[error("homoballot: unauthorized")]
    Unauthorized,

    #[error("homoballot: ciphertext is not a member of the ciphertext group")]
    MalformedCiphertext,

    #[error("homoballot: ballot has {found} slots, election has {expected} candidates")]
    MalformedBallot { expected: usize, found: usize },

    #[error("homoballot: corrupt ballot {commitment} at slot {slot}")]
    CorruptBallot { commitment: CommitmentHash, slot: usize },

    #[error("homoballot: aggregates for election {0} do not match its anchored ballots")]
    AggregateMismatch(ElectionId),

    #[error("homoballot: decryption failure: {0}")]
    DecryptionFailure(String),

    #[error("homoballot: choice {choice} is invalid for {candidates} candidates")]
    InvalidChoice { choice: usize, candidates: usize },

    #[error("homoballot: candidate slot {slot} is invalid for {candidates} candidates")]
    InvalidSlot { slot: usize, candidates: usize },

    #[error("homoballot: encryption nonce must be a unit modulo n")]
    InvalidNonce,

    #[error("homoballot: plaintext is outside [0, n)")]
    PlaintextOutOfRange,

    #[error("homoballot: invalid key size {0} bits")]
    InvalidKeySize(usize),

    #[error("homoballot: result commitment for slot {0} does not match its count")]
    CommitmentMismatch(usize),

    #[error("homoballot: tally counts sum to {found}, but {expected} votes are anchored")]
    TallyMismatch { expected: u64, found: u64 },

    #[error("homoballot: audit chain broken at entry {0}")]
    AuditChainBroken(u64),

    #[error("homoballot: invalid identifier - invalid hexadecimal")]
    IdentifierBadHex,

    #[error("homoballot: invalid identifier - wrong length")]
    IdentifierBadLen,

    #[error("homoballot: CBOR serialization error: {0}")]
    CBORSerialization(#[from] serde_cbor::Error),
}
