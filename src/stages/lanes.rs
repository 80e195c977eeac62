//! Lane selection: players claim starting lanes in Storm finishing order.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::{ActionError, PlayerAction, PlayerId, PlayerMap};
use crate::rules::{StageContext, StageRules};
use crate::stages::StageKind;
use crate::track::Lane;

/// State of the lane-selection stage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneSelectionState {
    /// Storm finishing order; the winner picks first.
    pub order: Vec<PlayerId>,
    pub available_lanes: Vec<Lane>,
    pub selected_lanes: PlayerMap<Lane>,
    pub current_selector: Option<PlayerId>,
    pub all_lanes_selected: bool,
}

impl LaneSelectionState {
    /// Open all four lanes for players in `order`.
    #[must_use]
    pub fn new(order: Vec<PlayerId>) -> Self {
        Self {
            current_selector: order.first().copied(),
            order,
            available_lanes: Lane::ALL.to_vec(),
            selected_lanes: PlayerMap::empty(),
            all_lanes_selected: false,
        }
    }

    /// Claim `lane` for `player`.
    pub fn select_lane(&mut self, player: PlayerId, lane: Lane) -> Result<(), ActionError> {
        if self.all_lanes_selected {
            return Err(ActionError::StageComplete);
        }
        if self.current_selector != Some(player) {
            return Err(ActionError::NotYourTurn(player));
        }
        let idx = self
            .available_lanes
            .iter()
            .position(|l| *l == lane)
            .ok_or(ActionError::LaneUnavailable(lane))?;

        self.available_lanes.remove(idx);
        self.selected_lanes.insert(player, lane);
        debug!(player = %player, lane = lane.number(), "lane selected");

        self.current_selector = self
            .order
            .iter()
            .copied()
            .find(|p| !self.selected_lanes.contains(*p));
        if self.current_selector.is_none() {
            self.all_lanes_selected = true;
            info!(lanes = ?self.selected_lanes, "all lanes selected");
        }
        Ok(())
    }
}

impl StageRules for LaneSelectionState {
    fn kind(&self) -> StageKind {
        StageKind::LaneSelection
    }

    fn apply(
        &mut self,
        _ctx: &mut StageContext<'_>,
        player: PlayerId,
        action: &PlayerAction,
    ) -> Result<(), ActionError> {
        match action {
            PlayerAction::SelectLane { lane } => self.select_lane(player, *lane),
            other => Err(self.wrong_stage(other)),
        }
    }

    fn is_complete(&self) -> bool {
        self.all_lanes_selected
    }

    fn current_actor(&self) -> Option<PlayerId> {
        self.current_selector
    }
}
