use anyhow::Result;

use super::classifier::{GameStatus, StatusResult};

/// Store key holding the last notified signature.
pub const LAST_SCORE_KEY: &str = "last_score";

/// Signature used while the game has not started.
pub const NOT_STARTED_SIGNATURE: &str = "Game not started";

/// Shared key/value store backing the dedup slot. Values never expire.
pub trait DedupStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    fn set(&self, key: &str, value: &[u8]) -> Result<()>;
}

/// The one process-wide "last notified score".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DedupState {
    pub last_signature: Option<String>,
}

impl DedupState {
    pub fn load(store: &dyn DedupStore) -> Result<Self> {
        let last_signature = store
            .get(LAST_SCORE_KEY)?
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned());
        Ok(DedupState { last_signature })
    }

    /// Record a sent signature; returns the state to carry forward.
    pub fn commit(store: &dyn DedupStore, signature: &str) -> Result<Self> {
        store.set(LAST_SCORE_KEY, signature.as_bytes())?;
        Ok(DedupState {
            last_signature: Some(signature.to_string()),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub send: bool,
    pub signature: String,
}

/// Signature of a classified game, or `None` when there is no game.
pub fn signature(result: &StatusResult) -> Option<String> {
    match result.status {
        GameStatus::NoGameFound => None,
        GameStatus::NotStarted => Some(NOT_STARTED_SIGNATURE.to_string()),
        _ => Some(format!("{}-{}", result.home_score, result.away_score)),
    }
}

/// Send iff the signature differs from the last one notified. An absent
/// prior signature differs from everything. `None` for `NoGameFound`.
pub fn should_notify(result: &StatusResult, state: &DedupState) -> Option<Decision> {
    let signature = signature(result)?;
    let send = state.last_signature.as_deref() != Some(signature.as_str());
    Some(Decision { send, signature })
}
