use ed25519_dalek::SecretKey;
use homoballot::{DEFAULT_KEY_BITS, MIN_KEY_BITS};
use std::env::var;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("HOMOBALLOT_KEY_BITS must be a number: {0}")]
    KeyBitsNotNumber(String),

    #[error("HOMOBALLOT_KEY_BITS must be at least {min}, got {0}", min = MIN_KEY_BITS)]
    KeyBitsTooSmall(usize),

    #[error("HOMOBALLOT_AUTHORITY_SECRET_KEY is not valid hex")]
    SecretKeyBadHex,

    #[error("HOMOBALLOT_AUTHORITY_SECRET_KEY is not a valid ed25519 secret key")]
    SecretKeyInvalid,
}

pub struct Config {
    /// Paillier modulus size for new elections
    pub key_bits: usize,

    /// Administrator key. A fresh one is generated when unset.
    pub authority_secret_key: Option<SecretKey>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let key_bits = match var("HOMOBALLOT_KEY_BITS") {
            Ok(val) => {
                let bits: usize = val
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::KeyBitsNotNumber(val.clone()))?;
                if bits < MIN_KEY_BITS {
                    return Err(ConfigError::KeyBitsTooSmall(bits));
                }
                bits
            }
            Err(_e) => DEFAULT_KEY_BITS,
        };

        let authority_secret_key = match var("HOMOBALLOT_AUTHORITY_SECRET_KEY") {
            Ok(val) => {
                let bytes = hex::decode(val.trim()).map_err(|_| ConfigError::SecretKeyBadHex)?;
                Some(SecretKey::from_bytes(&bytes).map_err(|_| ConfigError::SecretKeyInvalid)?)
            }
            Err(_e) => None,
        };

        Ok(Config {
            key_bits,
            authority_secret_key,
        })
    }

    /// Override the key size, e.g. from a command-line flag
    pub fn with_key_bits(mut self, bits: usize) -> Result<Self, ConfigError> {
        if bits < MIN_KEY_BITS {
            return Err(ConfigError::KeyBitsTooSmall(bits));
        }
        self.key_bits = bits;
        Ok(self)
    }
}
