use crate::*;
use std::sync::Arc;

/// Commits a tally's results to the registry
pub struct ResultPublisher {
    registry: Arc<Registry>,
}

impl ResultPublisher {
    pub fn new(registry: Arc<Registry>) -> Self {
        ResultPublisher { registry }
    }

    /// Publish every slot of a tally in one registry transition.
    ///
    /// If the registry rejects any slot, none are recorded.
    pub fn publish<C: Capability + ?Sized>(
        &self,
        capability: &C,
        tally: &Tally,
    ) -> Result<Vec<TallyResult>, Error> {
        self.registry
            .publish_results(capability, tally.election_id, &tally.results)?;
        Ok(tally.results.clone())
    }
}
