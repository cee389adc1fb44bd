use crate::animation::AnimationPhase;

#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    AcquireSession {
        diary_id: u64,
    },
    StartSession {
        session_id: u64,
    },
    RetrySession {
        session_id: u64,
    },
    SubmitAnswer {
        session_id: u64,
        challenge_index: usize,
        selected_ids: Vec<String>,
    },
    CompleteSession {
        session_id: u64,
        xiaoju_hp: u8,
        monsters_defeated: u32,
    },
    SkipSession {
        session_id: u64,
    },
    LookupPostcard {
        diary_id: u64,
    },
    Animate {
        phase: AnimationPhase,
    },
}

impl Effect {
    /// Task key used when spawning the effect; one task per key at a time.
    pub fn task_key(&self) -> &'static str {
        match self {
            Effect::AcquireSession { .. } => "session",
            Effect::StartSession { .. } | Effect::RetrySession { .. } => "start",
            Effect::SubmitAnswer { .. } => "submit",
            Effect::CompleteSession { .. } => "complete",
            Effect::SkipSession { .. } => "skip",
            Effect::LookupPostcard { .. } => "postcard",
            Effect::Animate { .. } => "animation",
        }
    }
}
