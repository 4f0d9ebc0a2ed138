use crate::*;
use chrono::{DateTime, Utc};
use ed25519_dalek::PublicKey as AdminPublicKey;
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::sync::Arc;

/// An election together with the results published for it
pub(crate) struct ElectionRecord {
    pub(crate) election: Election,
    pub(crate) results: BTreeMap<usize, TallyResult>,
}

/// Owns every election and its lifecycle.
///
/// Each election sits behind its own mutex. Every transition, and every vote
/// submission, holds that mutex for its whole check-then-write, so a vote racing
/// a `close` is either anchored before the close or rejected after it.
pub struct Registry {
    authority: AdminPublicKey,
    elections: RwLock<BTreeMap<ElectionId, Arc<Mutex<ElectionRecord>>>>,
    log: Arc<AuditLog>,
}

impl Registry {
    /// Create a registry administered by the holder of `authority`
    pub fn new(authority: AdminPublicKey, log: Arc<AuditLog>) -> Self {
        Registry {
            authority,
            elections: RwLock::new(BTreeMap::new()),
            log,
        }
    }

    pub fn audit_log(&self) -> &Arc<AuditLog> {
        &self.log
    }

    fn authorize<C: Capability + ?Sized>(
        &self,
        capability: &C,
        action: &AdminAction,
    ) -> Result<(), Error> {
        check_capability(&self.authority, capability, action).map_err(|e| {
            warn!("homoballot: rejected administrative action {:?}: {}", action, e);
            e
        })
    }

    fn record(&self, id: ElectionId) -> Result<Arc<Mutex<ElectionRecord>>, Error> {
        self.elections
            .read()
            .get(&id)
            .cloned()
            .ok_or(Error::ElectionNotFound(id))
    }

    /// Run `f` while holding the election's lock
    pub(crate) fn with_record<T, F>(&self, id: ElectionId, f: F) -> Result<T, Error>
    where
        F: FnOnce(&mut ElectionRecord) -> Result<T, Error>,
    {
        let record = self.record(id)?;
        let mut record = record.lock();
        f(&mut record)
    }

    /// Register a new election. It is open as soon as it is created.
    pub fn create<C: Capability + ?Sized>(
        &self,
        capability: &C,
        mut election: Election,
    ) -> Result<Election, Error> {
        self.authorize(
            capability,
            &AdminAction::CreateElection {
                election_id: election.id,
            },
        )?;
        election.validate()?;
        election.transition(ElectionState::Created, ElectionState::Open)?;

        let mut elections = self.elections.write();
        if elections.contains_key(&election.id) {
            return Err(Error::AlreadyExists(format!("election {}", election.id)));
        }

        self.log.append(Event::ElectionCreated {
            election_id: election.id,
            name: election.name.clone(),
            opens_at: election.opens_at,
            closes_at: election.closes_at,
            candidates: election.candidate_count(),
        })?;
        elections.insert(
            election.id,
            Arc::new(Mutex::new(ElectionRecord {
                election: election.clone(),
                results: BTreeMap::new(),
            })),
        );

        info!(
            "homoballot: created election {} ({:?}) with {} candidates",
            election.id,
            election.name,
            election.candidate_count()
        );
        Ok(election)
    }

    /// Stop accepting votes. Only legal while open, so a second close fails.
    pub fn close<C: Capability + ?Sized>(
        &self,
        capability: &C,
        id: ElectionId,
    ) -> Result<(), Error> {
        self.authorize(capability, &AdminAction::CloseElection { election_id: id })?;

        self.with_record(id, |record| {
            record.election.require(ElectionState::Open)?;
            self.log.append(Event::ElectionClosed { election_id: id })?;
            record
                .election
                .transition(ElectionState::Open, ElectionState::Closed)?;

            info!("homoballot: closed election {}", id);
            Ok(())
        })
    }

    /// Publish the result for a single candidate slot
    pub fn publish_result<C: Capability + ?Sized>(
        &self,
        capability: &C,
        result: TallyResult,
    ) -> Result<(), Error> {
        let id = result.election_id;
        self.publish_results(capability, id, &[result])
    }

    /// Publish results for several slots at once.
    ///
    /// Either every result is recorded or none is. Once every slot has a result the
    /// election moves to `ResultsPublished`. Publishing a slot twice fails with
    /// `AlreadyExists`.
    pub fn publish_results<C: Capability + ?Sized>(
        &self,
        capability: &C,
        id: ElectionId,
        results: &[TallyResult],
    ) -> Result<(), Error> {
        self.authorize(
            capability,
            &AdminAction::PublishResults {
                election_id: id,
                slots: results.iter().map(|r| r.slot).collect(),
            },
        )?;

        self.with_record(id, |record| {
            if record.election.state != ElectionState::ResultsPublished {
                record.election.require(ElectionState::Closed)?;
            }

            let candidates = record.election.candidate_count();
            let mut seen = Vec::with_capacity(results.len());
            for result in results {
                if result.slot >= candidates {
                    return Err(Error::InvalidSlot {
                        slot: result.slot,
                        candidates,
                    });
                }
                if record.results.contains_key(&result.slot) || seen.contains(&result.slot) {
                    return Err(Error::AlreadyExists(format!(
                        "result for election {} slot {}",
                        id, result.slot
                    )));
                }
                if result.election_id != id || !result.verify() {
                    return Err(Error::CommitmentMismatch(result.slot));
                }
                seen.push(result.slot);
            }

            for result in results {
                self.log.append(Event::ResultPublished {
                    election_id: id,
                    slot: result.slot,
                    count: result.count,
                    commitment: result.commitment,
                })?;
                record.results.insert(result.slot, result.clone());
            }

            if record.results.len() == candidates {
                record
                    .election
                    .transition(ElectionState::Closed, ElectionState::ResultsPublished)?;
                info!("homoballot: published all results for election {}", id);
            }
            Ok(())
        })
    }

    pub fn get(&self, id: ElectionId) -> Result<Election, Error> {
        self.with_record(id, |record| Ok(record.election.clone()))
    }

    pub fn state(&self, id: ElectionId) -> Result<ElectionState, Error> {
        self.with_record(id, |record| Ok(record.election.state))
    }

    /// Public key voters encrypt with, for the given election
    pub fn public_key(&self, id: ElectionId) -> Result<PublicKey, Error> {
        self.with_record(id, |record| Ok(record.election.public_key.clone()))
    }

    /// All elections, ordered by id
    pub fn list(&self) -> Vec<Election> {
        let records: Vec<_> = self.elections.read().values().cloned().collect();
        records
            .iter()
            .map(|record| record.lock().election.clone())
            .collect()
    }

    /// Elections currently accepting votes
    pub fn open_elections(&self, now: DateTime<Utc>) -> Vec<Election> {
        self.list()
            .into_iter()
            .filter(|e| e.state == ElectionState::Open && e.in_window(now))
            .collect()
    }

    /// Published results, ordered by slot
    pub fn results(&self, id: ElectionId) -> Result<Vec<TallyResult>, Error> {
        self.with_record(id, |record| Ok(record.results.values().cloned().collect()))
    }
}
