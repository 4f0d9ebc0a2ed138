use crate::*;
use ed25519_dalek::ExpandedSecretKey;
use ed25519_dalek::PublicKey;
use ed25519_dalek::SecretKey;
use ed25519_dalek::Signature;

/// An administrative operation that must be authorized.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "action")]
#[serde(rename_all = "snake_case")]
pub enum AdminAction {
    CreateElection { election_id: ElectionId },
    CloseElection { election_id: ElectionId },
    PublishResults { election_id: ElectionId, slots: Vec<usize> },
}

impl AdminAction {
    /// Canonical bytes that get signed
    pub fn as_bytes(&self) -> Result<Vec<u8>, Error> {
        Ok(serde_cbor::to_vec(self)?)
    }
}

/// Proof that the holder of an administrator key approved an action
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Authorization {
    pub public_key: PublicKey,
    pub signature: Signature,
}

/// Something that can vouch for an administrative action.
///
/// The registry only sees the resulting `Authorization`, so any authentication
/// backend can sit behind this trait.
pub trait Capability {
    fn authorize(&self, action: &AdminAction) -> Result<Authorization, Error>;
}

/// The administrator capability: an ed25519 key that signs each action.
pub struct AdminCapability {
    secret: SecretKey,
    public: PublicKey,
}

impl AdminCapability {
    pub fn new(secret: SecretKey) -> Self {
        let public = PublicKey::from(&secret);
        AdminCapability { secret, public }
    }

    /// Create a capability with a fresh random key
    pub fn generate() -> Self {
        let (secret, public) = generate_keypair();
        AdminCapability { secret, public }
    }

    pub fn public_key(&self) -> PublicKey {
        self.public
    }
}

impl Capability for AdminCapability {
    fn authorize(&self, action: &AdminAction) -> Result<Authorization, Error> {
        let serialized = action.as_bytes()?;

        let expanded: ExpandedSecretKey = (&self.secret).into();
        let signature = expanded.sign(&serialized, &self.public);

        Ok(Authorization {
            public_key: self.public,
            signature,
        })
    }
}

/// A caller with no administrative rights
pub struct NoCapability;

impl Capability for NoCapability {
    fn authorize(&self, _action: &AdminAction) -> Result<Authorization, Error> {
        Err(Error::Unauthorized)
    }
}

/// Check that `capability` authorizes `action` under the administrator key `authority`.
pub fn check_capability<C: Capability + ?Sized>(
    authority: &PublicKey,
    capability: &C,
    action: &AdminAction,
) -> Result<(), Error> {
    let authorization = capability.authorize(action)?;
    if authorization.public_key != *authority {
        return Err(Error::Unauthorized);
    }

    let serialized = action.as_bytes()?;
    authority
        .verify_strict(&serialized, &authorization.signature)
        .map_err(|_| Error::Unauthorized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_capability_authorizes() {
        let admin = AdminCapability::generate();
        let action = AdminAction::CloseElection {
            election_id: ElectionId(1),
        };

        check_capability(&admin.public_key(), &admin, &action).unwrap();
    }

    #[test]
    fn other_keys_and_no_capability_are_rejected() {
        let admin = AdminCapability::generate();
        let impostor = AdminCapability::generate();
        let action = AdminAction::CreateElection {
            election_id: ElectionId(7),
        };

        assert!(matches!(
            check_capability(&admin.public_key(), &impostor, &action),
            Err(Error::Unauthorized)
        ));
        assert!(matches!(
            check_capability(&admin.public_key(), &NoCapability, &action),
            Err(Error::Unauthorized)
        ));
    }

    /// A capability that claims the right key but signs something else
    struct Forger {
        inner: AdminCapability,
    }

    impl Capability for Forger {
        fn authorize(&self, _action: &AdminAction) -> Result<Authorization, Error> {
            self.inner.authorize(&AdminAction::CloseElection {
                election_id: ElectionId(99),
            })
        }
    }

    #[test]
    fn signature_must_cover_the_action() {
        let admin = AdminCapability::generate();
        let public = admin.public_key();
        let forger = Forger { inner: admin };

        let action = AdminAction::CloseElection {
            election_id: ElectionId(1),
        };
        assert!(matches!(
            check_capability(&public, &forger, &action),
            Err(Error::Unauthorized)
        ));
    }
}
