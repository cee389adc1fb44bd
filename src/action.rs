use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::animation::AnimationPhase;
use crate::session::{BattleSession, Rewards, TurnResult};

#[derive(tui_dispatch::Action, Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[action(infer_categories)]
pub enum Action {
    UiTerminalResize(u16, u16),
    Tick,
    Quit,

    SessionAcquire,
    SessionDidLoad(BattleSession),
    SessionDidError(String),
    AuthDidExpire,

    BattleStart,
    BattleDidReset(BattleSession),
    BattleDidStart(BattleSession),
    BattleStartDidError(String),

    TurnPresent,
    TurnAdvance,
    TurnContinue,

    OptionFocus(usize),
    OptionToggle(usize),
    AnswerSubmit,
    AnswerDidResolve(TurnResult),
    AnswerDidError(String),
    AnimationDidFinish(AnimationPhase),

    AdventureComplete,
    AdventureDidComplete(Rewards),
    AdventureDidError(String),

    AdventureSkip,
    AdventureSkipConfirm,
    AdventureSkipCancel,
    AdventureDidSkip,
    SkipDidError(String),

    PostcardView,
    PostcardDidResolve(Option<u64>),

    GameOverLeave,
    NoticeDismiss,
}
