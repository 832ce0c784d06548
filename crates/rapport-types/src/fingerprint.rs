use std::fmt;

/// Domain tag prepended to every fingerprinted document.
const LEDGER_DOMAIN: &[u8] = b"rapport-ledger-v1:";

/// Content fingerprint of a ledger snapshot.
///
/// BLAKE3 over the domain tag and the ledger's canonical JSON bytes. Equal
/// ledgers always produce equal ids, so a host can tell a retried turn from
/// a new one without comparing documents.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SnapshotId([u8; 32]);

impl SnapshotId {
    pub(crate) fn of_ledger_json(json: &[u8]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(LEDGER_DOMAIN);
        hasher.update(json);
        Self(*hasher.finalize().as_bytes())
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// First four bytes, for display.
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Debug for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SnapshotId").field(&self.short_hex()).finish()
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
