//! Turn resolution animation phases.

use std::collections::VecDeque;
use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Combatant {
    Player,
    Monster,
}

impl Combatant {
    pub fn opponent(self) -> Self {
        match self {
            Combatant::Player => Combatant::Monster,
            Combatant::Monster => Combatant::Player,
        }
    }
}

/// One step of the resolution sequence. HP changes land when an `Impact`
/// finishes; a `Fade` plays when a combatant drops to zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum AnimationPhase {
    WindUp { attacker: Combatant },
    Impact { target: Combatant },
    Fade { target: Combatant },
}

impl AnimationPhase {
    pub fn duration(&self, pacing: &Pacing) -> Duration {
        let millis = match self {
            AnimationPhase::WindUp { .. } => pacing.wind_up_ms,
            AnimationPhase::Impact { .. } => pacing.impact_ms,
            AnimationPhase::Fade { .. } => pacing.fade_ms,
        };
        Duration::from_millis(millis)
    }

    pub fn label(&self) -> &'static str {
        match self {
            AnimationPhase::WindUp { .. } => "charging",
            AnimationPhase::Impact { .. } => "hit!",
            AnimationPhase::Fade { .. } => "fading",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pacing {
    pub wind_up_ms: u64,
    pub impact_ms: u64,
    pub fade_ms: u64,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            wind_up_ms: 300,
            impact_ms: 400,
            fade_ms: 800,
        }
    }
}

impl Pacing {
    pub fn instant() -> Self {
        Self {
            wind_up_ms: 0,
            impact_ms: 0,
            fade_ms: 0,
        }
    }
}

/// Remaining phases of the turn currently resolving, plus what the server
/// reported for it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ResolutionPlan {
    pub correct: bool,
    pub coins: u32,
    pub is_last: bool,
    pub insight: Option<String>,
    pub monster_defeated: bool,
    pub phases: VecDeque<AnimationPhase>,
}

impl ResolutionPlan {
    pub fn new(correct: bool, coins: u32, is_last: bool, insight: Option<String>) -> Self {
        let attacker = if correct {
            Combatant::Player
        } else {
            Combatant::Monster
        };
        let phases = VecDeque::from([
            AnimationPhase::WindUp { attacker },
            AnimationPhase::Impact {
                target: attacker.opponent(),
            },
        ]);
        Self {
            correct,
            coins,
            is_last,
            insight,
            monster_defeated: false,
            phases,
        }
    }

    pub fn current(&self) -> Option<AnimationPhase> {
        self.phases.front().copied()
    }
}
