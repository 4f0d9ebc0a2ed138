use crate::*;
use num_bigint_dig::BigUint;
use num_traits::ToPrimitive;
use parking_lot::Mutex;
use rand_core::{CryptoRng, RngCore};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Sole holder of the Paillier private key.
///
/// The authority is bound to one vote ledger. It decrypts only the per-slot
/// aggregates of a closed election on that ledger, recomputing them itself, and at
/// most once per election. Anything else, an individual ballot included, is refused.
pub struct KeyAuthority {
    private: PrivateKey,
    ledger: Arc<VoteLedger>,
    decrypted: Mutex<BTreeSet<ElectionId>>,
}

impl KeyAuthority {
    /// Generate a fresh key pair with a `bits`-bit modulus
    pub fn generate<R: RngCore + CryptoRng>(
        bits: usize,
        ledger: Arc<VoteLedger>,
        rng: &mut R,
    ) -> Result<Self, Error> {
        let (_public, private) = keygen(bits, rng)?;
        info!("homoballot: generated {}-bit election key", bits);
        Ok(KeyAuthority::from_private_key(private, ledger))
    }

    pub fn from_private_key(private: PrivateKey, ledger: Arc<VoteLedger>) -> Self {
        KeyAuthority {
            private,
            ledger,
            decrypted: Mutex::new(BTreeSet::new()),
        }
    }

    pub fn public_key(&self) -> &PublicKey {
        self.private.public()
    }

    /// Decrypt the per-slot aggregates of a closed election's tally.
    ///
    /// `aggregates` must be exactly what folding the election's anchored ballots
    /// gives; the authority recomputes them from its ledger and refuses anything
    /// else. The election is only marked as decrypted once decryption succeeds.
    pub fn decrypt_tally(
        &self,
        election_id: ElectionId,
        aggregates: &[Ciphertext],
    ) -> Result<Vec<u64>, Error> {
        let mut decrypted = self.decrypted.lock();
        if decrypted.contains(&election_id) {
            warn!(
                "homoballot: refused second tally decryption for election {}",
                election_id
            );
            return Err(Error::TallyAlreadyDecrypted(election_id));
        }

        let counts = self
            .check_request(election_id, aggregates)
            .and_then(|ballots| self.decrypt_counts(aggregates, ballots))
            .map_err(|e| {
                warn!(
                    "homoballot: refused tally decryption for election {}: {}",
                    election_id, e
                );
                e
            })?;

        decrypted.insert(election_id);
        info!(
            "homoballot: decrypted {} aggregates for election {}",
            counts.len(),
            election_id
        );
        Ok(counts)
    }

    // Returns the number of ballots folded into the aggregates
    fn check_request(
        &self,
        election_id: ElectionId,
        aggregates: &[Ciphertext],
    ) -> Result<u64, Error> {
        let election = self.ledger.registry().get(election_id)?;
        election.require(ElectionState::Closed)?;
        if election.public_key != *self.public_key() {
            return Err(Error::DecryptionFailure(format!(
                "election {} is not encrypted under this authority's key",
                election_id
            )));
        }

        let snapshot = self.ledger.snapshot(election_id);
        let expected = aggregate(
            &election.public_key,
            election.candidate_count(),
            &snapshot.votes,
        )?;
        if aggregates != expected.as_slice() {
            return Err(Error::AggregateMismatch(election_id));
        }
        Ok(snapshot.len() as u64)
    }

    fn decrypt_counts(
        &self,
        aggregates: &[Ciphertext],
        ballots: u64,
    ) -> Result<Vec<u64>, Error> {
        let limit = BigUint::from(ballots);
        let mut counts = Vec::with_capacity(aggregates.len());
        for (slot, aggregate) in aggregates.iter().enumerate() {
            let plaintext = self.private.decrypt(aggregate).map_err(|e| {
                Error::DecryptionFailure(format!("aggregate for slot {}: {}", slot, e))
            })?;
            if plaintext > limit {
                return Err(Error::DecryptionFailure(format!(
                    "slot {} decrypts to more than the {} ballots cast",
                    slot, ballots
                )));
            }
            let count = plaintext.to_u64().ok_or_else(|| {
                Error::DecryptionFailure(format!("slot {} count does not fit in u64", slot))
            })?;
            counts.push(count);
        }
        Ok(counts)
    }
}
