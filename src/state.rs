use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tui_dispatch_debug::debug::{DebugSection, DebugState};

use crate::animation::{AnimationPhase, ResolutionPlan};
use crate::session::{BattleSession, Challenge, Rewards};

pub const PLAYER_MAX_HP: u8 = 5;
pub const MONSTER_MAX_HP: u8 = 3;
pub const DEFAULT_COINS_PER_HIT: u32 = 10;

pub const LOADING_MESSAGES: [&str; 4] = [
    "Monsters are gathering in the fog...",
    "Xiaoju is sharpening her thinking...",
    "Mapping the thought traps...",
    "Almost there, the forest is waking up...",
];

pub const COMPANION_LINES: [&str; 5] = [
    "Take a breath. Which thought holds up to the facts?",
    "We've seen this trap before. Look closely!",
    "Facts first, feelings second. You've got this.",
    "What would you tell a friend who thought this?",
    "One careful step at a time.",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Destination {
    Postcards,
    Postcard(u64),
    DiaryResult(u64),
}

impl Destination {
    pub fn path(&self) -> String {
        match self {
            Destination::Postcards => "/postcards".to_string(),
            Destination::Postcard(id) => format!("/postcard/{id}"),
            Destination::DiaryResult(diary_id) => format!("/diary/{diary_id}/result"),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Screen {
    SignedOut,
    #[default]
    Loading,
    Intro,
    Battling,
    Completing,
    Victory,
    GameOver,
    Left(Destination),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum NextStep {
    Advance,
    Complete,
    GameOver,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum TurnPhase {
    #[default]
    AwaitingSelection,
    Submitting,
    Resolving,
    Resolved(NextStep),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum OptionMark {
    #[default]
    Unmarked,
    Correct,
    WronglySelected,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum PendingRequest {
    Session,
    Start,
    Submit,
    Complete,
    Skip,
    Postcard,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Tone {
    Success,
    Failure,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct BattleMessage {
    pub tone: Tone,
    pub text: String,
}

/// Blocking message shown over the current screen until dismissed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Notice {
    pub title: String,
    pub message: String,
    pub then: Option<Destination>,
}

impl Notice {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            then: None,
        }
    }

    pub fn then(mut self, destination: Destination) -> Self {
        self.then = Some(destination);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct BattleState {
    pub player_hp: u8,
    pub player_max_hp: u8,
    pub monster_hp: u8,
    pub monster_max_hp: u8,
    pub current_monster_index: usize,
    pub current_question_index: usize,
    pub selected_option_ids: Vec<String>,
    pub marks: Vec<OptionMark>,
    pub phase: TurnPhase,
    pub resolution: Option<ResolutionPlan>,
    pub coins_earned: u32,
    pub monsters_defeated: u32,
    pub message: Option<BattleMessage>,
    pub insight: Option<String>,
    pub speech: String,
    pub cursor: usize,
}

impl Default for BattleState {
    fn default() -> Self {
        Self {
            player_hp: PLAYER_MAX_HP,
            player_max_hp: PLAYER_MAX_HP,
            monster_hp: MONSTER_MAX_HP,
            monster_max_hp: MONSTER_MAX_HP,
            current_monster_index: 0,
            current_question_index: 0,
            selected_option_ids: Vec::new(),
            marks: Vec::new(),
            phase: TurnPhase::AwaitingSelection,
            resolution: None,
            coins_earned: 0,
            monsters_defeated: 0,
            message: None,
            insight: None,
            speech: COMPANION_LINES[0].to_string(),
            cursor: 0,
        }
    }
}

impl BattleState {
    /// Rebuilds local progress from what the server remembers about an
    /// interrupted session. A missing or zero HP snapshot restores full HP.
    pub fn resumed(session: &BattleSession) -> Self {
        let snapshot = session.battle_state.clone().unwrap_or_default();
        Self {
            player_hp: snapshot
                .xiaoju_hp
                .filter(|hp| *hp > 0)
                .map(|hp| hp.min(PLAYER_MAX_HP))
                .unwrap_or(PLAYER_MAX_HP),
            current_monster_index: snapshot.current_monster.unwrap_or(0),
            monsters_defeated: snapshot.monsters_defeated.unwrap_or(0),
            current_question_index: session.current_challenge.unwrap_or(0),
            ..Self::default()
        }
    }

    pub fn turn_resolved(&self) -> bool {
        matches!(self.phase, TurnPhase::Resolving | TurnPhase::Resolved(_))
    }

    pub fn animation_in_flight(&self) -> bool {
        self.phase == TurnPhase::Resolving
    }

    pub fn input_locked(&self) -> bool {
        matches!(self.phase, TurnPhase::Submitting | TurnPhase::Resolving)
    }

    pub fn current_animation(&self) -> Option<AnimationPhase> {
        self.resolution.as_ref().and_then(ResolutionPlan::current)
    }

    pub fn is_selected(&self, option_id: &str) -> bool {
        self.selected_option_ids.iter().any(|id| id == option_id)
    }

    pub fn mark(&self, index: usize) -> OptionMark {
        self.marks.get(index).copied().unwrap_or_default()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AppState {
    pub terminal_size: (u16, u16),
    pub diary_id: u64,
    pub authenticated: bool,
    pub screen: Screen,
    pub session: Option<BattleSession>,
    pub battle: BattleState,
    pub rewards: Option<Rewards>,
    pub pending: Option<PendingRequest>,
    pub notice: Option<Notice>,
    pub confirm_skip: bool,
    pub loading_index: usize,
    pub tick_count: u64,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(0, true)
    }
}

impl AppState {
    pub fn new(diary_id: u64, authenticated: bool) -> Self {
        Self {
            terminal_size: (80, 24),
            diary_id,
            authenticated,
            screen: if authenticated {
                Screen::Loading
            } else {
                Screen::SignedOut
            },
            session: None,
            battle: BattleState::default(),
            rewards: None,
            pending: None,
            notice: None,
            confirm_skip: false,
            loading_index: 0,
            tick_count: 0,
        }
    }

    pub fn current_challenge(&self) -> Option<&Challenge> {
        self.session
            .as_ref()
            .and_then(|session| session.challenge(self.battle.current_question_index))
    }

    pub fn challenge_count(&self) -> usize {
        self.session
            .as_ref()
            .map(|session| session.challenges.len())
            .unwrap_or(0)
    }

    pub fn required_selections(&self) -> usize {
        self.current_challenge()
            .map(Challenge::required_selections)
            .unwrap_or(1)
    }

    /// The submit control is live only while a turn awaits its answer and the
    /// selection size matches what the challenge asks for.
    pub fn submit_enabled(&self) -> bool {
        self.screen == Screen::Battling
            && self.pending.is_none()
            && self.battle.phase == TurnPhase::AwaitingSelection
            && self.current_challenge().is_some()
            && self.battle.selected_option_ids.len() == self.required_selections()
    }

    pub fn loading_message(&self) -> &'static str {
        LOADING_MESSAGES[self.loading_index % LOADING_MESSAGES.len()]
    }

    /// Consolation coins shown on the Game Over summary.
    pub fn consolation_coins(&self) -> u32 {
        self.battle.coins_earned / 2
    }

    pub fn monsters_defeated_total(&self) -> u32 {
        self.rewards
            .as_ref()
            .and_then(|rewards| rewards.monsters_defeated)
            .unwrap_or(self.battle.monsters_defeated)
    }
}

impl DebugState for AppState {
    fn debug_sections(&self) -> Vec<DebugSection> {
        vec![
            DebugSection::new("Screen")
                .entry("screen", format!("{:?}", self.screen))
                .entry("pending", format!("{:?}", self.pending))
                .entry("notice", format!("{:?}", self.notice.as_ref().map(|n| &n.title)))
                .entry("confirm_skip", self.confirm_skip.to_string()),
            DebugSection::new("Session")
                .entry("diary", self.diary_id.to_string())
                .entry(
                    "id",
                    self.session
                        .as_ref()
                        .map(|s| s.id.to_string())
                        .unwrap_or_else(|| "-".into()),
                )
                .entry(
                    "status",
                    format!("{:?}", self.session.as_ref().map(|s| s.status)),
                )
                .entry("challenges", self.challenge_count().to_string()),
            DebugSection::new("Battle")
                .entry("phase", format!("{:?}", self.battle.phase))
                .entry(
                    "player_hp",
                    format!("{}/{}", self.battle.player_hp, self.battle.player_max_hp),
                )
                .entry(
                    "monster_hp",
                    format!("{}/{}", self.battle.monster_hp, self.battle.monster_max_hp),
                )
                .entry("question", self.battle.current_question_index.to_string())
                .entry("monster", self.battle.current_monster_index.to_string())
                .entry("selected", self.battle.selected_option_ids.join(","))
                .entry("coins", self.battle.coins_earned.to_string())
                .entry("defeated", self.battle.monsters_defeated.to_string())
                .entry(
                    "animation",
                    format!("{:?}", self.battle.current_animation()),
                ),
        ]
    }
}
