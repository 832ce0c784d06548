use serde_json::Value;

use rapport_types::Ledger;

use crate::error::StageResult;
use crate::state::InitState;

/// What a hook hands back to the host.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StageResponse {
    /// New opaque per-message state, if the hook produced one.
    pub message_state: Option<Value>,
    /// Hidden system message to inject ahead of the next prompt.
    pub system_message: Option<String>,
    /// Diagnostic for the host. Never shown to the end user.
    pub error: Option<String>,
}

/// Lifecycle hooks a chat host calls on a stage.
///
/// Every per-chat input arrives as an argument; implementations keep no
/// per-chat state between calls. The trait is object-safe and
/// `Send + Sync` so hosts can hold a `Box<dyn StageHooks>`.
pub trait StageHooks: Send + Sync {
    /// Called once when the stage is constructed for a chat.
    fn load(&self) -> StageResult<InitState>;

    /// Called before the user's message is sent to the model.
    fn before_prompt(&self, state: Option<&Value>) -> StageResponse;

    /// Called after each assistant reply with the latest persisted state.
    fn after_response(&self, state: Option<&Value>, reply: &str) -> StageResponse;

    /// Called when the host restores state, e.g. after a swipe.
    fn set_state(&self, state: Option<&Value>) -> Ledger;

    /// Visible output. Headless stages draw nothing.
    fn render(&self) -> Option<String> {
        None
    }
}
