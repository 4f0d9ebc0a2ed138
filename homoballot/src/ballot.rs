use crate::*;
use num_bigint_dig::BigUint;
use num_traits::{One, Zero};
use rand_core::{CryptoRng, RngCore};

/// An encrypted ballot: one ciphertext per candidate slot.
///
/// A well-formed ballot encrypts a one-hot vector (a single 1, the rest 0). Nothing
/// here proves that; the ledger only checks the shape and group membership.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct EncryptedBallot {
    pub slots: Vec<Ciphertext>,
}

impl EncryptedBallot {
    /// Encrypt a vote for candidate `choice` out of `candidates`.
    pub fn encrypt_choice<R: RngCore + CryptoRng>(
        public: &PublicKey,
        choice: usize,
        candidates: usize,
        rng: &mut R,
    ) -> Result<Self, Error> {
        if choice >= candidates {
            return Err(Error::InvalidChoice { choice, candidates });
        }

        let mut slots = Vec::with_capacity(candidates);
        for slot in 0..candidates {
            let m = if slot == choice {
                BigUint::one()
            } else {
                BigUint::zero()
            };
            slots.push(public.encrypt_with_rng(&m, rng)?);
        }

        Ok(EncryptedBallot { slots })
    }

    /// Encrypt an arbitrary vector of slot values.
    ///
    /// No one-hot check is made.
    pub fn encrypt_values<R: RngCore + CryptoRng>(
        public: &PublicKey,
        values: &[u64],
        rng: &mut R,
    ) -> Result<Self, Error> {
        let slots = values
            .iter()
            .map(|v| public.encrypt_with_rng(&BigUint::from(*v), rng))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(EncryptedBallot { slots })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Check the slot count and that every slot is a valid ciphertext.
    pub fn validate(&self, public: &PublicKey, candidates: usize) -> Result<(), Error> {
        if self.slots.len() != candidates {
            return Err(Error::MalformedBallot {
                expected: candidates,
                found: self.slots.len(),
            });
        }
        for slot in &self.slots {
            public.validate(slot)?;
        }
        Ok(())
    }
}
