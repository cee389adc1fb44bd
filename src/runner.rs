//! Executes effects outside the reducer and reports back with an action.

use std::sync::Arc;

use crate::action::Action;
use crate::animation::Pacing;
use crate::api::{AdventureApi, AdventureError, AnswerSubmission, CompletionReport};
use crate::effect::Effect;

pub async fn perform(api: Arc<dyn AdventureApi>, effect: Effect, pacing: Pacing) -> Action {
    match effect {
        Effect::AcquireSession { diary_id } => match api.acquire_session(diary_id).await {
            Ok(session) => Action::SessionDidLoad(session),
            Err(err) => failure(err, Action::SessionDidError),
        },
        Effect::StartSession { session_id } => match api.start_session(session_id).await {
            Ok(session) => Action::BattleDidStart(session),
            Err(err) => failure(err, Action::BattleStartDidError),
        },
        Effect::RetrySession { session_id } => match api.retry_session(session_id).await {
            Ok(session) => Action::BattleDidReset(session),
            Err(err) => failure(err, Action::BattleStartDidError),
        },
        Effect::SubmitAnswer {
            session_id,
            challenge_index,
            selected_ids,
        } => {
            let submission = AnswerSubmission {
                challenge_index,
                selected_ids,
            };
            match api.submit_answer(session_id, &submission).await {
                Ok(result) => Action::AnswerDidResolve(result),
                Err(err) => failure(err, Action::AnswerDidError),
            }
        }
        Effect::CompleteSession {
            session_id,
            xiaoju_hp,
            monsters_defeated,
        } => {
            let report = CompletionReport {
                xiaoju_hp,
                monsters_defeated,
            };
            match api.complete_session(session_id, &report).await {
                Ok(rewards) => Action::AdventureDidComplete(rewards),
                Err(err) => failure(err, Action::AdventureDidError),
            }
        }
        Effect::SkipSession { session_id } => match api.skip_session(session_id).await {
            Ok(()) => Action::AdventureDidSkip,
            Err(err) => failure(err, Action::SkipDidError),
        },
        Effect::LookupPostcard { diary_id } => match api.postcard_for_diary(diary_id).await {
            Ok(postcard_id) => Action::PostcardDidResolve(postcard_id),
            Err(err) if err.is_unauthorized() => Action::AuthDidExpire,
            Err(err) => {
                log::warn!("postcard lookup failed, falling back to list: {err}");
                Action::PostcardDidResolve(None)
            }
        },
        Effect::Animate { phase } => {
            let duration = phase.duration(&pacing);
            if !duration.is_zero() {
                tokio::time::sleep(duration).await;
            }
            Action::AnimationDidFinish(phase)
        }
    }
}

fn failure(err: AdventureError, to_action: fn(String) -> Action) -> Action {
    if err.is_unauthorized() {
        log::warn!("request rejected as unauthorized: {err:?}");
        return Action::AuthDidExpire;
    }
    log::warn!("request failed: {err:?}");
    to_action(err.to_string())
}
