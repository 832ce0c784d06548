use rapport_types::{Ledger, SnapshotId};

use crate::engine::LedgerEngine;
use crate::error::EngineError;

/// Result of replaying a transcript of replies.
#[derive(Clone, Debug, PartialEq)]
pub struct ReplayResult {
    pub ledger: Ledger,
    pub turns: u64,
    pub rules_fired: u64,
    pub fingerprint: SnapshotId,
}

impl LedgerEngine {
    /// Fold [`LedgerEngine::step`] over `replies`, starting from `prior`
    /// (or the seed).
    ///
    /// Replaying the same transcript from the same snapshot always lands on
    /// the same fingerprint.
    pub fn replay<I, S>(&self, prior: Option<&Ledger>, replies: I) -> Result<ReplayResult, EngineError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut ledger = match prior {
            Some(ledger) => ledger.clone(),
            None => self.initialize(),
        };
        let mut turns = 0u64;
        let mut rules_fired = 0u64;

        for reply in replies {
            let (next, fired) = self.advance(Some(&ledger), reply.as_ref());
            ledger = next;
            turns += 1;
            rules_fired += fired.len() as u64;
        }

        let fingerprint = ledger.fingerprint()?;
        Ok(ReplayResult {
            ledger,
            turns,
            rules_fired,
            fingerprint,
        })
    }
}
