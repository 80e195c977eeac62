//! The trait every stage engine implements.
//!
//! ## Implementation Notes
//!
//! - `apply` must validate fully before its first mutation. A rejected
//!   action leaves the stage exactly as it was, RNG included.
//! - `is_complete` is polled by the manager after every accepted action.
//! - `current_actor` is `None` once the stage is complete.

use crate::core::{ActionError, GameRng, GameSettings, PlayerAction, PlayerId, Roster};
use crate::stages::StageKind;

/// Room data an engine may read while handling an action.
pub struct StageContext<'a> {
    /// Seated players.
    pub roster: &'a Roster,
    /// Host-chosen settings.
    pub settings: &'a GameSettings,
    /// Random stream owned by the current stage.
    pub rng: &'a mut GameRng,
}

impl<'a> StageContext<'a> {
    /// Bundle the pieces of a room an engine needs.
    pub fn new(roster: &'a Roster, settings: &'a GameSettings, rng: &'a mut GameRng) -> Self {
        Self { roster, settings, rng }
    }
}

/// Rules engine for one stage.
pub trait StageRules {
    /// Which stage this engine runs.
    fn kind(&self) -> StageKind;

    /// Validate and apply an action from `player`.
    fn apply(
        &mut self,
        ctx: &mut StageContext<'_>,
        player: PlayerId,
        action: &PlayerAction,
    ) -> Result<(), ActionError>;

    /// True once the stage has nothing left to do.
    fn is_complete(&self) -> bool;

    /// Player expected to act next.
    fn current_actor(&self) -> Option<PlayerId>;

    /// Rejection for an action this stage does not handle.
    fn wrong_stage(&self, action: &PlayerAction) -> ActionError {
        ActionError::WrongStage {
            action: action.name(),
            expected: StageKind::for_action(action),
            actual: self.kind(),
        }
    }
}
