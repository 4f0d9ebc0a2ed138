use crate::*;
use chrono::{DateTime, Utc};
use std::fmt;

/// Election identifier, assigned by the administrator when the election is created.
#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElectionId(pub u64);

impl fmt::Display for ElectionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// States in the election lifecycle.
///
/// Transitions only move forward: Created -> Open -> Closed -> ResultsPublished.
#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ElectionState {
    /// Built but not yet registered.
    Created,
    /// Registered and accepting votes within its window.
    Open,
    /// No longer accepting votes; ready to be tallied.
    Closed,
    /// Every candidate slot has a published result. Terminal.
    ResultsPublished,
}

impl fmt::Display for ElectionState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ElectionState::Created => "created",
            ElectionState::Open => "open",
            ElectionState::Closed => "closed",
            ElectionState::ResultsPublished => "results_published",
        };
        write!(f, "{}", name)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Election {
    pub id: ElectionId,
    pub name: String,

    /// Votes are accepted from this instant (inclusive)
    pub opens_at: DateTime<Utc>,

    /// Votes are rejected from this instant (exclusive end of the window)
    pub closes_at: DateTime<Utc>,

    /// Ordered candidate names. Candidate `k` is ballot slot `k`.
    pub candidates: Vec<String>,

    /// Encryption key voters use for this election's ballots
    pub public_key: PublicKey,

    pub state: ElectionState,
}

impl Election {
    /// Create a new election in the `Created` state.
    ///
    /// Candidates are added by the caller before registering the election.
    pub fn new(
        id: ElectionId,
        name: impl Into<String>,
        opens_at: DateTime<Utc>,
        closes_at: DateTime<Utc>,
        public_key: PublicKey,
    ) -> Self {
        Election {
            id,
            name: name.into(),
            opens_at,
            closes_at,
            candidates: vec![],
            public_key,
            state: ElectionState::Created,
        }
    }

    /// Number of candidate slots in every ballot
    pub fn candidate_count(&self) -> usize {
        self.candidates.len()
    }

    /// Whether `now` lies in [opens_at, closes_at)
    pub fn in_window(&self, now: DateTime<Utc>) -> bool {
        self.opens_at <= now && now < self.closes_at
    }

    /// Make sure the election settings are sane
    pub fn validate(&self) -> Result<(), Error> {
        if self.closes_at <= self.opens_at {
            return Err(Error::InvalidWindow);
        }
        if self.candidates.is_empty() {
            return Err(Error::NoCandidates);
        }
        Ok(())
    }

    /// Move from `expected` to `next`, failing if the election is anywhere else.
    pub(crate) fn transition(
        &mut self,
        expected: ElectionState,
        next: ElectionState,
    ) -> Result<(), Error> {
        self.require(expected)?;
        self.state = next;
        Ok(())
    }

    pub(crate) fn require(&self, expected: ElectionState) -> Result<(), Error> {
        if self.state != expected {
            return Err(Error::InvalidState {
                id: self.id,
                expected,
                actual: self.state,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use num_bigint_dig::BigUint;

    fn election() -> Election {
        let now = Utc::now();
        let mut election = Election::new(
            ElectionId(1),
            "Student council",
            now - Duration::seconds(5),
            now + Duration::seconds(1000),
            PublicKey::from_modulus(BigUint::from(3233u32)),
        );
        election.candidates = vec!["Ana".to_owned(), "Luis".to_owned(), "Marta".to_owned()];
        election
    }

    #[test]
    fn create_new_election() {
        let mut election = election();
        assert_eq!(election.state, ElectionState::Created);
        assert_eq!(election.candidate_count(), 3);
        election.validate().unwrap();

        // Window must be non-empty
        election.closes_at = election.opens_at;
        assert!(matches!(election.validate(), Err(Error::InvalidWindow)));

        // Candidates are required
        let mut election = self::election();
        election.candidates.clear();
        assert!(matches!(election.validate(), Err(Error::NoCandidates)));
    }

    #[test]
    fn voting_window_is_half_open() {
        let election = election();
        assert!(election.in_window(election.opens_at));
        assert!(election.in_window(election.closes_at - Duration::milliseconds(1)));
        assert!(!election.in_window(election.closes_at));
        assert!(!election.in_window(election.opens_at - Duration::milliseconds(1)));
    }

    #[test]
    fn transitions_only_from_expected_state() {
        let mut election = election();
        election
            .transition(ElectionState::Created, ElectionState::Open)
            .unwrap();

        match election.transition(ElectionState::Closed, ElectionState::ResultsPublished) {
            Err(Error::InvalidState {
                expected, actual, ..
            }) => {
                assert_eq!(expected, ElectionState::Closed);
                assert_eq!(actual, ElectionState::Open);
            }
            _ => panic!("expected InvalidState"),
        }
        assert_eq!(election.state, ElectionState::Open);
        assert_eq!(format!("{}", ElectionState::ResultsPublished), "results_published");
    }
}
