use crate::*;
use num_bigint_dig::{BigUint, ModInverse, RandBigInt, RandPrime};
use num_integer::Integer;
use num_traits::{One, Zero};
use rand_core::{CryptoRng, RngCore};
use std::convert::TryFrom;
use std::fmt;

/// Modulus size used when nothing else is configured.
pub const DEFAULT_KEY_BITS: usize = 2048;

/// Smallest modulus accepted by `keygen`. Only useful for tests.
pub const MIN_KEY_BITS: usize = 128;

/// Paillier public key, using the simplified generator g = n + 1.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(try_from = "PublicKeyEncoding", into = "PublicKeyEncoding")]
pub struct PublicKey {
    n: BigUint,
    g: BigUint,
    n_squared: BigUint,
}

/// Wire form of a public key: modulus and generator as decimal strings.
#[derive(Serialize, Deserialize)]
struct PublicKeyEncoding {
    #[serde(with = "biguint_decimal")]
    n: BigUint,
    #[serde(with = "biguint_decimal")]
    g: BigUint,
}

impl TryFrom<PublicKeyEncoding> for PublicKey {
    type Error = String;

    fn try_from(encoding: PublicKeyEncoding) -> Result<Self, Self::Error> {
        if encoding.n <= BigUint::one() {
            return Err("modulus must be greater than one".to_owned());
        }
        let public = PublicKey::from_modulus(encoding.n);
        if public.g != encoding.g {
            return Err("generator must be n + 1".to_owned());
        }
        Ok(public)
    }
}

impl From<PublicKey> for PublicKeyEncoding {
    fn from(public: PublicKey) -> Self {
        PublicKeyEncoding {
            n: public.n,
            g: public.g,
        }
    }
}

impl PublicKey {
    /// Build a public key from its modulus.
    pub fn from_modulus(n: BigUint) -> Self {
        let g = &n + BigUint::one();
        let n_squared = &n * &n;
        PublicKey { n, g, n_squared }
    }

    pub fn n(&self) -> &BigUint {
        &self.n
    }

    pub fn g(&self) -> &BigUint {
        &self.g
    }

    pub fn n_squared(&self) -> &BigUint {
        &self.n_squared
    }

    /// Size of the modulus in bits
    pub fn bits(&self) -> usize {
        self.n.bits()
    }

    /// Draw a fresh encryption nonce: uniform in [1, n) and coprime to n.
    pub fn random_nonce<R: RngCore + CryptoRng>(&self, rng: &mut R) -> Nonce {
        loop {
            let r = rng.gen_biguint_below(&self.n);
            if !r.is_zero() && r.gcd(&self.n).is_one() {
                return Nonce(r);
            }
        }
    }

    /// Encrypt `m` with an explicit nonce.
    ///
    /// This is a pure function: the same message and nonce always give the same
    /// ciphertext. Callers must never reuse a nonce.
    pub fn encrypt(&self, m: &BigUint, nonce: &Nonce) -> Result<Ciphertext, Error> {
        if m >= &self.n {
            return Err(Error::PlaintextOutOfRange);
        }

        // g^m = (1 + n)^m = 1 + m*n (mod n^2)
        let gm = (BigUint::one() + m * &self.n) % &self.n_squared;
        let rn = nonce.0.modpow(&self.n, &self.n_squared);

        Ok(Ciphertext((gm * rn) % &self.n_squared))
    }

    /// Encrypt `m` with a nonce drawn from `rng`.
    pub fn encrypt_with_rng<R: RngCore + CryptoRng>(
        &self,
        m: &BigUint,
        rng: &mut R,
    ) -> Result<Ciphertext, Error> {
        let nonce = self.random_nonce(rng);
        self.encrypt(m, &nonce)
    }

    /// Check that a ciphertext is a unit of Z*_{n^2}.
    pub fn validate(&self, c: &Ciphertext) -> Result<(), Error> {
        if c.0.is_zero() || c.0 >= self.n_squared || !c.0.gcd(&self.n).is_one() {
            return Err(Error::MalformedCiphertext);
        }
        Ok(())
    }

    /// Homomorphic addition: the result decrypts to (m1 + m2) mod n.
    pub fn combine(&self, c1: &Ciphertext, c2: &Ciphertext) -> Ciphertext {
        Ciphertext((&c1.0 * &c2.0) % &self.n_squared)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("PublicKey")
            .field("n", &self.n.to_str_radix(10))
            .field("g", &self.g.to_str_radix(10))
            .finish()
    }
}

/// Paillier private key: lambda = lcm(p-1, q-1) and mu = lambda^-1 mod n.
///
/// Deliberately not serializable. Only the `KeyAuthority` should ever hold one.
#[derive(Clone)]
pub struct PrivateKey {
    lambda: BigUint,
    mu: BigUint,
    public: PublicKey,
}

impl PrivateKey {
    pub fn public(&self) -> &PublicKey {
        &self.public
    }

    /// Decrypt a ciphertext: m = L(c^lambda mod n^2) * mu mod n
    pub fn decrypt(&self, c: &Ciphertext) -> Result<BigUint, Error> {
        self.public.validate(c)?;

        let n = &self.public.n;
        let u = c.0.modpow(&self.lambda, &self.public.n_squared);
        let l = (u - BigUint::one()) / n;

        Ok((l * &self.mu) % n)
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("public", &self.public)
            .finish()
    }
}

/// Generate a key pair whose modulus has exactly `bits` bits.
pub fn keygen<R: RngCore + CryptoRng>(
    bits: usize,
    rng: &mut R,
) -> Result<(PublicKey, PrivateKey), Error> {
    if bits < MIN_KEY_BITS || bits % 2 != 0 {
        return Err(Error::InvalidKeySize(bits));
    }

    let one = BigUint::one();
    loop {
        let p = rng.gen_prime(bits / 2);
        let q = rng.gen_prime(bits / 2);
        if p == q {
            continue;
        }

        let n = &p * &q;
        if n.bits() != bits {
            continue;
        }

        let p1 = &p - &one;
        let q1 = &q - &one;
        if !n.gcd(&(&p1 * &q1)).is_one() {
            continue;
        }

        let lambda = p1.lcm(&q1);
        let mu = match lambda.clone().mod_inverse(&n).and_then(|mu| mu.to_biguint()) {
            Some(mu) => mu,
            None => continue,
        };

        let public = PublicKey::from_modulus(n);
        let private = PrivateKey {
            lambda,
            mu,
            public: public.clone(),
        };
        return Ok((public, private));
    }
}

/// Encryption randomness r, with 0 < r < n and gcd(r, n) = 1.
#[derive(Clone)]
pub struct Nonce(BigUint);

impl Nonce {
    /// Wrap caller-supplied randomness, rejecting values outside Z*_n.
    pub fn new(public: &PublicKey, r: BigUint) -> Result<Self, Error> {
        if r.is_zero() || &r >= public.n() || !r.gcd(public.n()).is_one() {
            return Err(Error::InvalidNonce);
        }
        Ok(Nonce(r))
    }
}

/// An element of the ciphertext group Z*_{n^2}.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Ciphertext(#[serde(with = "biguint_decimal")] BigUint);

impl Ciphertext {
    /// The encryption of zero with r = 1, neutral for `combine`.
    pub fn identity() -> Self {
        Ciphertext(BigUint::one())
    }

    pub fn as_biguint(&self) -> &BigUint {
        &self.0
    }

    pub fn to_bytes_be(&self) -> Vec<u8> {
        self.0.to_bytes_be()
    }
}

impl From<BigUint> for Ciphertext {
    fn from(value: BigUint) -> Self {
        Ciphertext(value)
    }
}
