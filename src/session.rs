//! Server-issued adventure data. The client caches these values and never
//! mutates the challenge or monster lists.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Pending,
    Generating,
    InProgress,
    Completed,
    Skipped,
    Failed,
    #[serde(other)]
    Unknown,
}

impl SessionStatus {
    pub fn is_finished(self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Skipped)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeKind {
    #[default]
    Evidence,
    Reframe,
    #[serde(other)]
    Other,
}

impl ChallengeKind {
    pub fn badge(self) -> &'static str {
        match self {
            ChallengeKind::Evidence => "Evidence hunt",
            ChallengeKind::Reframe => "Reframe",
            ChallengeKind::Other => "Challenge",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Monster {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub name_zh: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ChallengeOption {
    pub id: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Challenge {
    #[serde(rename = "type", default)]
    pub kind: ChallengeKind,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub distortion_thought: Option<String>,
    #[serde(default)]
    pub instruction: Option<String>,
    #[serde(default)]
    pub options: Vec<ChallengeOption>,
    #[serde(default)]
    pub correct_count: Option<u32>,
}

impl Challenge {
    /// Number of options the player must select before submitting.
    pub fn required_selections(&self) -> usize {
        match self.kind {
            ChallengeKind::Evidence => self
                .correct_count
                .filter(|count| *count > 0)
                .map(|count| count as usize)
                .unwrap_or(1),
            ChallengeKind::Reframe | ChallengeKind::Other => 1,
        }
    }

    pub fn is_multi_select(&self) -> bool {
        self.required_selections() > 1
    }

    pub fn distortion(&self) -> Option<&str> {
        self.distortion_thought
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }

    pub fn instruction_text(&self) -> String {
        if let Some(text) = self.instruction.as_deref().filter(|t| !t.trim().is_empty()) {
            return text.to_string();
        }
        match self.kind {
            ChallengeKind::Evidence => {
                format!("Pick {} correct options", self.required_selections())
            }
            _ => "Pick the more balanced thought".to_string(),
        }
    }
}

/// Coarse progress snapshot some servers attach to a resumed session.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct BattleSnapshot {
    #[serde(default)]
    pub xiaoju_hp: Option<u8>,
    #[serde(default)]
    pub current_monster: Option<usize>,
    #[serde(default)]
    pub monsters_defeated: Option<u32>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct BattleSession {
    pub id: u64,
    #[serde(default)]
    pub status: SessionStatus,
    #[serde(default)]
    pub scene_name: Option<String>,
    #[serde(default)]
    pub monsters: Vec<Monster>,
    #[serde(default)]
    pub challenges: Vec<Challenge>,
    #[serde(default)]
    pub current_challenge: Option<usize>,
    #[serde(default)]
    pub battle_state: Option<BattleSnapshot>,
}

impl BattleSession {
    pub fn challenge(&self, index: usize) -> Option<&Challenge> {
        self.challenges.get(index)
    }

    pub fn monster(&self, index: usize) -> Option<&Monster> {
        self.monsters.get(index)
    }

    pub fn scene_title(&self) -> &str {
        self.scene_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or("Inner Forest")
    }
}

/// Server verdict for one submitted answer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TurnResult {
    pub correct: bool,
    #[serde(default)]
    pub correct_ids: Vec<String>,
    #[serde(default)]
    pub coins_earned: Option<u32>,
    #[serde(default)]
    pub cbt_insight: Option<String>,
    #[serde(default)]
    pub is_last: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RewardItem {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub name_zh: String,
    #[serde(default)]
    pub effect_type: Option<String>,
    #[serde(default)]
    pub effect_value: Option<i32>,
}

impl RewardItem {
    pub fn display_name(&self) -> &str {
        if self.name_zh.is_empty() {
            &self.name
        } else {
            &self.name_zh
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Rewards {
    #[serde(default)]
    pub postcard_id: Option<u64>,
    #[serde(default)]
    pub monsters_defeated: Option<u32>,
    #[serde(default)]
    pub coins_earned: u32,
    #[serde(default)]
    pub items_earned: Vec<RewardItem>,
    #[serde(default)]
    pub stat_changes: BTreeMap<String, i32>,
}

impl Rewards {
    /// Non-zero stat deltas with a label and whether the change is good for
    /// the player. Lower stress counts as an improvement.
    pub fn visible_stat_changes(&self) -> Vec<(&'static str, i32, bool)> {
        self.stat_changes
            .iter()
            .filter(|(_, delta)| **delta != 0)
            .map(|(key, delta)| {
                let improved = if key == "stress" { *delta < 0 } else { *delta > 0 };
                (stat_label(key), *delta, improved)
            })
            .collect()
    }
}

pub fn stat_label(key: &str) -> &'static str {
    match key {
        "mental_health" => "Mental health",
        "stress" => "Stress",
        "growth" => "Growth",
        _ => "Other",
    }
}
