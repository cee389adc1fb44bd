use tui_dispatch::DispatchResult;

use crate::action::Action;
use crate::animation::{AnimationPhase, Combatant, ResolutionPlan};
use crate::effect::Effect;
use crate::session::{SessionStatus, TurnResult};
use crate::state::{
    AppState, BattleMessage, BattleState, Destination, NextStep, Notice, OptionMark,
    PendingRequest, Screen, Tone, TurnPhase, COMPANION_LINES, DEFAULT_COINS_PER_HIT,
    MONSTER_MAX_HP,
};

pub fn reducer(state: &mut AppState, action: Action) -> DispatchResult<Effect> {
    match action {
        Action::UiTerminalResize(width, height) => {
            state.terminal_size = (width, height);
            DispatchResult::changed()
        }
        Action::Tick => {
            state.tick_count = state.tick_count.wrapping_add(1);
            let generating = matches!(
                state.pending,
                Some(PendingRequest::Session | PendingRequest::Start)
            );
            if generating {
                state.loading_index = state.loading_index.wrapping_add(1);
                DispatchResult::changed()
            } else {
                DispatchResult::unchanged()
            }
        }

        // ===== Session =====
        Action::SessionAcquire => {
            if !state.authenticated {
                state.screen = Screen::SignedOut;
                return DispatchResult::changed();
            }
            if state.pending.is_some() {
                return DispatchResult::unchanged();
            }
            state.screen = Screen::Loading;
            state.pending = Some(PendingRequest::Session);
            state.loading_index = 0;
            DispatchResult::changed_with(Effect::AcquireSession {
                diary_id: state.diary_id,
            })
        }
        Action::SessionDidLoad(session) => {
            if state.pending != Some(PendingRequest::Session) {
                return DispatchResult::unchanged();
            }
            state.pending = None;
            log::info!(
                "session {} loaded with status {:?} ({} challenges)",
                session.id,
                session.status,
                session.challenges.len()
            );
            match session.status {
                status if status.is_finished() => {
                    state.session = Some(session);
                    state.screen = Screen::Left(Destination::Postcards);
                    DispatchResult::changed()
                }
                SessionStatus::InProgress => {
                    state.battle = BattleState::resumed(&session);
                    state.session = Some(session);
                    present_turn(state)
                }
                _ => {
                    state.battle = BattleState::default();
                    state.session = Some(session);
                    state.screen = Screen::Intro;
                    DispatchResult::changed()
                }
            }
        }
        Action::SessionDidError(message) => {
            state.pending = None;
            state.notice = Some(
                Notice::new("Could not load the adventure", message)
                    .then(Destination::DiaryResult(state.diary_id)),
            );
            DispatchResult::changed()
        }
        Action::AuthDidExpire => {
            log::warn!("credential rejected, signing out");
            state.authenticated = false;
            state.pending = None;
            state.confirm_skip = false;
            if state.battle.phase == TurnPhase::Submitting {
                state.battle.phase = TurnPhase::AwaitingSelection;
            }
            state.screen = Screen::SignedOut;
            DispatchResult::changed()
        }

        // ===== Start =====
        Action::BattleStart => {
            if state.screen != Screen::Intro || state.pending.is_some() {
                return DispatchResult::unchanged();
            }
            let Some(session) = state.session.as_ref() else {
                return DispatchResult::unchanged();
            };
            let effect = if session.status == SessionStatus::Failed {
                Effect::RetrySession {
                    session_id: session.id,
                }
            } else {
                Effect::StartSession {
                    session_id: session.id,
                }
            };
            state.pending = Some(PendingRequest::Start);
            state.loading_index = 0;
            DispatchResult::changed_with(effect)
        }
        Action::BattleDidReset(session) => {
            if state.pending != Some(PendingRequest::Start) {
                return DispatchResult::unchanged();
            }
            let session_id = session.id;
            state.session = Some(session);
            DispatchResult::changed_with(Effect::StartSession { session_id })
        }
        Action::BattleDidStart(session) => {
            if state.pending != Some(PendingRequest::Start) {
                return DispatchResult::unchanged();
            }
            state.pending = None;
            state.battle = BattleState::default();
            state.session = Some(session);
            present_turn(state)
        }
        Action::BattleStartDidError(message) => {
            state.pending = None;
            state.notice = Some(Notice::new("Could not start the battle", message));
            DispatchResult::changed()
        }

        // ===== Turn =====
        Action::TurnPresent => {
            if state.screen != Screen::Battling
                || state.pending.is_some()
                || state.battle.phase != TurnPhase::AwaitingSelection
            {
                return DispatchResult::unchanged();
            }
            present_turn(state)
        }
        Action::TurnAdvance => {
            if state.screen != Screen::Battling
                || state.battle.phase != TurnPhase::Resolved(NextStep::Advance)
            {
                return DispatchResult::unchanged();
            }
            state.battle.current_question_index += 1;
            present_turn(state)
        }
        Action::TurnContinue => match state.battle.phase {
            TurnPhase::Resolved(NextStep::Advance) => reducer(state, Action::TurnAdvance),
            TurnPhase::Resolved(NextStep::Complete) => reducer(state, Action::AdventureComplete),
            _ => DispatchResult::unchanged(),
        },
        Action::OptionFocus(index) => {
            let Some(count) = state.current_challenge().map(|c| c.options.len()) else {
                return DispatchResult::unchanged();
            };
            let cursor = index.min(count.saturating_sub(1));
            if cursor == state.battle.cursor {
                return DispatchResult::unchanged();
            }
            state.battle.cursor = cursor;
            DispatchResult::changed()
        }
        Action::OptionToggle(index) => toggle_option(state, index),
        Action::AnswerSubmit => {
            if !state.submit_enabled() {
                return DispatchResult::unchanged();
            }
            let Some(session_id) = state.session.as_ref().map(|s| s.id) else {
                return DispatchResult::unchanged();
            };
            state.battle.phase = TurnPhase::Submitting;
            state.battle.message = None;
            state.pending = Some(PendingRequest::Submit);
            DispatchResult::changed_with(Effect::SubmitAnswer {
                session_id,
                challenge_index: state.battle.current_question_index,
                selected_ids: state.battle.selected_option_ids.clone(),
            })
        }
        Action::AnswerDidResolve(result) => resolve_answer(state, result),
        Action::AnswerDidError(message) => {
            if state.battle.phase != TurnPhase::Submitting {
                return DispatchResult::unchanged();
            }
            state.pending = None;
            state.battle.phase = TurnPhase::AwaitingSelection;
            state.battle.resolution = None;
            state.notice = Some(Notice::new("Answer not sent", message));
            DispatchResult::changed()
        }
        Action::AnimationDidFinish(phase) => finish_animation(state, phase),

        // ===== Completion =====
        Action::AdventureComplete => {
            if state.screen != Screen::Battling
                || state.battle.phase != TurnPhase::Resolved(NextStep::Complete)
            {
                return DispatchResult::unchanged();
            }
            begin_completion(state)
        }
        Action::AdventureDidComplete(rewards) => {
            if state.pending != Some(PendingRequest::Complete) {
                return DispatchResult::unchanged();
            }
            log::info!(
                "adventure complete: {} coins, {} items",
                rewards.coins_earned,
                rewards.items_earned.len()
            );
            state.pending = None;
            state.rewards = Some(rewards);
            state.screen = Screen::Victory;
            DispatchResult::changed()
        }
        Action::AdventureDidError(message) => {
            if state.pending != Some(PendingRequest::Complete) {
                return DispatchResult::unchanged();
            }
            state.pending = None;
            state.screen = Screen::Battling;
            state.notice = Some(Notice::new("Could not finish the adventure", message));
            DispatchResult::changed()
        }

        // ===== Skip =====
        Action::AdventureSkip => {
            let skippable = match state.screen {
                Screen::Intro => true,
                Screen::Battling => !state.battle.input_locked(),
                _ => false,
            };
            if !skippable || state.session.is_none() || state.pending.is_some() {
                return DispatchResult::unchanged();
            }
            state.confirm_skip = true;
            DispatchResult::changed()
        }
        Action::AdventureSkipCancel => {
            if !state.confirm_skip {
                return DispatchResult::unchanged();
            }
            state.confirm_skip = false;
            DispatchResult::changed()
        }
        Action::AdventureSkipConfirm => {
            if !state.confirm_skip {
                return DispatchResult::unchanged();
            }
            state.confirm_skip = false;
            let Some(session_id) = state.session.as_ref().map(|s| s.id) else {
                return DispatchResult::changed();
            };
            state.pending = Some(PendingRequest::Skip);
            DispatchResult::changed_with(Effect::SkipSession { session_id })
        }
        Action::AdventureDidSkip => {
            if state.pending != Some(PendingRequest::Skip) {
                return DispatchResult::unchanged();
            }
            state.pending = None;
            state.screen = Screen::Left(Destination::DiaryResult(state.diary_id));
            DispatchResult::changed()
        }
        Action::SkipDidError(message) => {
            if state.pending != Some(PendingRequest::Skip) {
                return DispatchResult::unchanged();
            }
            state.pending = None;
            state.notice = Some(Notice::new("Could not skip the adventure", message));
            DispatchResult::changed()
        }

        // ===== Leaving =====
        Action::PostcardView => {
            if state.screen != Screen::Victory || state.pending.is_some() {
                return DispatchResult::unchanged();
            }
            if let Some(id) = state.rewards.as_ref().and_then(|r| r.postcard_id) {
                state.screen = Screen::Left(Destination::Postcard(id));
                return DispatchResult::changed();
            }
            state.pending = Some(PendingRequest::Postcard);
            DispatchResult::changed_with(Effect::LookupPostcard {
                diary_id: state.diary_id,
            })
        }
        Action::PostcardDidResolve(postcard_id) => {
            if state.pending != Some(PendingRequest::Postcard) {
                return DispatchResult::unchanged();
            }
            state.pending = None;
            state.screen = Screen::Left(
                postcard_id
                    .map(Destination::Postcard)
                    .unwrap_or(Destination::Postcards),
            );
            DispatchResult::changed()
        }
        Action::GameOverLeave => {
            if state.screen != Screen::GameOver {
                return DispatchResult::unchanged();
            }
            state.screen = Screen::Left(Destination::DiaryResult(state.diary_id));
            DispatchResult::changed()
        }
        Action::NoticeDismiss => {
            let Some(notice) = state.notice.take() else {
                return DispatchResult::unchanged();
            };
            if let Some(destination) = notice.then {
                state.screen = Screen::Left(destination);
            }
            DispatchResult::changed()
        }

        Action::Quit => DispatchResult::unchanged(),
    }
}

/// Monster HP shown for a question. Every question is assumed to face the
/// same monster, so HP counts down with the question index and refills once
/// it would reach zero.
fn monster_hp_for_question(index: usize) -> u8 {
    let max = MONSTER_MAX_HP as usize;
    if index >= max {
        MONSTER_MAX_HP
    } else {
        (max - index) as u8
    }
}

fn present_turn(state: &mut AppState) -> DispatchResult<Effect> {
    let index = state.battle.current_question_index;
    let Some(option_count) = state.current_challenge().map(|c| c.options.len()) else {
        if state.session.is_none() {
            return DispatchResult::unchanged();
        }
        state.screen = Screen::Battling;
        state.battle.phase = TurnPhase::Resolved(NextStep::Complete);
        return begin_completion(state);
    };

    let battle = &mut state.battle;
    battle.monster_max_hp = MONSTER_MAX_HP;
    battle.monster_hp = monster_hp_for_question(index);
    battle.selected_option_ids.clear();
    battle.marks = vec![OptionMark::Unmarked; option_count];
    battle.phase = TurnPhase::AwaitingSelection;
    battle.resolution = None;
    battle.message = None;
    battle.insight = None;
    battle.cursor = 0;
    battle.speech = COMPANION_LINES[index % COMPANION_LINES.len()].to_string();
    state.screen = Screen::Battling;
    DispatchResult::changed()
}

fn toggle_option(state: &mut AppState, index: usize) -> DispatchResult<Effect> {
    if state.screen != Screen::Battling
        || state.pending.is_some()
        || state.battle.phase != TurnPhase::AwaitingSelection
    {
        return DispatchResult::unchanged();
    }
    let Some(challenge) = state.current_challenge() else {
        return DispatchResult::unchanged();
    };
    let Some(option) = challenge.options.get(index) else {
        return DispatchResult::unchanged();
    };
    let option_id = option.id.clone();
    let multi = challenge.is_multi_select();

    let selected = &mut state.battle.selected_option_ids;
    if multi {
        match selected.iter().position(|id| *id == option_id) {
            Some(pos) => {
                selected.remove(pos);
            }
            None => selected.push(option_id),
        }
    } else {
        selected.clear();
        selected.push(option_id);
    }
    state.battle.cursor = index;
    DispatchResult::changed()
}

fn resolve_answer(state: &mut AppState, result: TurnResult) -> DispatchResult<Effect> {
    if state.battle.phase != TurnPhase::Submitting {
        return DispatchResult::unchanged();
    }
    state.pending = None;

    let marks = state
        .current_challenge()
        .map(|challenge| {
            challenge
                .options
                .iter()
                .map(|option| {
                    if result.correct_ids.contains(&option.id) {
                        OptionMark::Correct
                    } else if state.battle.is_selected(&option.id) {
                        OptionMark::WronglySelected
                    } else {
                        OptionMark::Unmarked
                    }
                })
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    let coins = if result.correct {
        result.coins_earned.unwrap_or(DEFAULT_COINS_PER_HIT)
    } else {
        0
    };
    let insight = result.cbt_insight.filter(|text| !text.trim().is_empty());
    let plan = ResolutionPlan::new(result.correct, coins, result.is_last, insight);
    log::debug!(
        "question {} resolved: correct={}",
        state.battle.current_question_index,
        result.correct
    );

    let first = plan.current();
    state.battle.marks = marks;
    state.battle.phase = TurnPhase::Resolving;
    state.battle.resolution = Some(plan);
    match first {
        Some(phase) => DispatchResult::changed_with(Effect::Animate { phase }),
        None => settle_turn(state),
    }
}

fn finish_animation(state: &mut AppState, phase: AnimationPhase) -> DispatchResult<Effect> {
    if state.battle.phase != TurnPhase::Resolving || state.battle.current_animation() != Some(phase)
    {
        return DispatchResult::unchanged();
    }
    let battle = &mut state.battle;
    let Some(plan) = battle.resolution.as_mut() else {
        return DispatchResult::unchanged();
    };
    plan.phases.pop_front();

    match phase {
        AnimationPhase::WindUp { .. } => {}
        AnimationPhase::Impact {
            target: Combatant::Monster,
        } => {
            battle.monster_hp = battle.monster_hp.saturating_sub(1);
            battle.coins_earned = battle.coins_earned.saturating_add(plan.coins);
            if battle.monster_hp == 0 {
                plan.phases.push_back(AnimationPhase::Fade {
                    target: Combatant::Monster,
                });
            }
        }
        AnimationPhase::Impact {
            target: Combatant::Player,
        } => {
            battle.player_hp = battle.player_hp.saturating_sub(1);
            if battle.player_hp == 0 {
                plan.phases.push_back(AnimationPhase::Fade {
                    target: Combatant::Player,
                });
            }
        }
        AnimationPhase::Fade {
            target: Combatant::Monster,
        } => {
            plan.monster_defeated = true;
            battle.monsters_defeated += 1;
            battle.current_monster_index += 1;
        }
        AnimationPhase::Fade {
            target: Combatant::Player,
        } => {}
    }

    match plan.current() {
        Some(next) => DispatchResult::changed_with(Effect::Animate { phase: next }),
        None => settle_turn(state),
    }
}

fn settle_turn(state: &mut AppState) -> DispatchResult<Effect> {
    let Some(plan) = state.battle.resolution.take() else {
        return DispatchResult::unchanged();
    };
    let defeated_name = state
        .session
        .as_ref()
        .and_then(|s| s.monster(state.battle.current_monster_index.saturating_sub(1)))
        .map(|m| m.name_zh.clone())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "The monster".to_string());
    let last_index = state.challenge_count().saturating_sub(1);

    let battle = &mut state.battle;
    battle.insight = plan.insight;

    if battle.player_hp == 0 {
        log::info!(
            "game over at question {} with {} coins",
            battle.current_question_index,
            battle.coins_earned
        );
        battle.phase = TurnPhase::Resolved(NextStep::GameOver);
        battle.message = Some(BattleMessage {
            tone: Tone::Failure,
            text: "Xiaoju ran out of strength...".to_string(),
        });
        battle.speech = "Let's rest and try again another day.".to_string();
        state.screen = Screen::GameOver;
        return DispatchResult::changed();
    }

    let (tone, text, speech) = match (plan.correct, plan.monster_defeated) {
        (true, true) => (
            Tone::Success,
            format!("{defeated_name} was defeated!"),
            "We did it! That thought has lost its grip.",
        ),
        (true, false) => (
            Tone::Success,
            format!("Direct hit! {} HP left", battle.monster_hp),
            "Nice! Keep looking at the facts.",
        ),
        (false, _) => (
            Tone::Failure,
            format!("The thought trap hit back. Xiaoju has {} HP", battle.player_hp),
            "It's okay. Let's look at it again together.",
        ),
    };
    battle.message = Some(BattleMessage { tone, text });
    battle.speech = speech.to_string();

    let next = if plan.monster_defeated
        || plan.is_last
        || battle.current_question_index >= last_index
    {
        NextStep::Complete
    } else {
        NextStep::Advance
    };
    battle.phase = TurnPhase::Resolved(next);
    DispatchResult::changed()
}

fn begin_completion(state: &mut AppState) -> DispatchResult<Effect> {
    if state.pending.is_some() {
        return DispatchResult::unchanged();
    }
    let Some(session_id) = state.session.as_ref().map(|s| s.id) else {
        return DispatchResult::unchanged();
    };
    state.screen = Screen::Completing;
    state.pending = Some(PendingRequest::Complete);
    DispatchResult::changed_with(Effect::CompleteSession {
        session_id,
        xiaoju_hp: state.battle.player_hp,
        monsters_defeated: state.battle.monsters_defeated,
    })
}

#[cfg(test)]
mod tests {
    use super::reducer;
    use crate::action::Action;
    use crate::animation::{AnimationPhase, Combatant};
    use crate::effect::Effect;
    use crate::session::{
        BattleSession, BattleSnapshot, Challenge, ChallengeKind, ChallengeOption, Monster,
        Rewards, SessionStatus, TurnResult,
    };
    use crate::state::{
        AppState, Destination, NextStep, OptionMark, PendingRequest, Screen, TurnPhase,
        PLAYER_MAX_HP,
    };
    use pretty_assertions::assert_eq;
    use tui_dispatch::DispatchResult;

    fn challenge(kind: ChallengeKind, correct_count: u32) -> Challenge {
        Challenge {
            kind,
            question: "Is the thought fair?".into(),
            options: ["a", "b", "c", "d"]
                .iter()
                .map(|id| ChallengeOption {
                    id: id.to_string(),
                    text: format!("option {id}"),
                })
                .collect(),
            correct_count: Some(correct_count),
            ..Default::default()
        }
    }

    fn session(challenges: Vec<Challenge>) -> BattleSession {
        BattleSession {
            id: 42,
            status: SessionStatus::Pending,
            monsters: vec![Monster {
                kind: "dark_cloud".into(),
                name_zh: "Dark Cloud".into(),
                description: String::new(),
            }],
            challenges,
            ..Default::default()
        }
    }

    fn reframes(count: usize) -> Vec<Challenge> {
        (0..count)
            .map(|_| challenge(ChallengeKind::Reframe, 1))
            .collect()
    }

    fn battling(challenges: Vec<Challenge>) -> AppState {
        let mut state = AppState::new(7, true);
        state.pending = Some(PendingRequest::Start);
        let _ = reducer(&mut state, Action::BattleDidStart(session(challenges)));
        assert_eq!(state.screen, Screen::Battling);
        state
    }

    fn verdict(correct: bool) -> TurnResult {
        TurnResult {
            correct,
            correct_ids: vec!["a".into()],
            coins_earned: Some(if correct { 15 } else { 0 }),
            cbt_insight: Some("Thoughts are not facts.".into()),
            is_last: false,
        }
    }

    fn run_animations(state: &mut AppState, mut result: DispatchResult<Effect>) {
        while let Some(Effect::Animate { phase }) = result.effects.first().cloned() {
            result = reducer(state, Action::AnimationDidFinish(phase));
        }
    }

    fn play_turn(state: &mut AppState, correct: bool) {
        let _ = reducer(state, Action::OptionToggle(0));
        let submitted = reducer(state, Action::AnswerSubmit);
        assert_eq!(submitted.effects.len(), 1);
        let result = reducer(state, Action::AnswerDidResolve(verdict(correct)));
        run_animations(state, result);
    }

    #[test]
    fn acquire_without_credentials_signs_out() {
        let mut state = AppState::new(7, false);
        let result = reducer(&mut state, Action::SessionAcquire);
        assert!(result.effects.is_empty());
        assert_eq!(state.screen, Screen::SignedOut);
    }

    #[test]
    fn acquire_routes_finished_sessions_to_postcards() {
        let mut state = AppState::new(7, true);
        let result = reducer(&mut state, Action::SessionAcquire);
        assert_eq!(result.effects, vec![Effect::AcquireSession { diary_id: 7 }]);

        let mut done = session(reframes(3));
        done.status = SessionStatus::Skipped;
        let _ = reducer(&mut state, Action::SessionDidLoad(done));
        assert_eq!(state.screen, Screen::Left(Destination::Postcards));
    }

    #[test]
    fn acquire_fresh_session_shows_intro() {
        let mut state = AppState::new(7, true);
        let _ = reducer(&mut state, Action::SessionAcquire);
        let _ = reducer(&mut state, Action::SessionDidLoad(session(reframes(3))));
        assert_eq!(state.screen, Screen::Intro);
        assert_eq!(state.pending, None);
    }

    #[test]
    fn acquire_in_progress_session_resumes_turn() {
        let mut state = AppState::new(7, true);
        let _ = reducer(&mut state, Action::SessionAcquire);
        let mut resumed = session(reframes(4));
        resumed.status = SessionStatus::InProgress;
        resumed.current_challenge = Some(2);
        resumed.battle_state = Some(BattleSnapshot {
            xiaoju_hp: Some(2),
            current_monster: Some(0),
            monsters_defeated: Some(0),
        });
        let _ = reducer(&mut state, Action::SessionDidLoad(resumed));

        assert_eq!(state.screen, Screen::Battling);
        assert_eq!(state.battle.current_question_index, 2);
        assert_eq!(state.battle.player_hp, 2);
        assert_eq!(state.battle.monster_hp, 1);
    }

    #[test]
    fn resume_past_third_question_refills_monster_and_caps_hp() {
        let mut state = AppState::new(7, true);
        let _ = reducer(&mut state, Action::SessionAcquire);
        let mut resumed = session(reframes(5));
        resumed.status = SessionStatus::InProgress;
        resumed.current_challenge = Some(3);
        resumed.battle_state = Some(BattleSnapshot {
            xiaoju_hp: Some(9),
            ..Default::default()
        });
        let _ = reducer(&mut state, Action::SessionDidLoad(resumed));

        assert_eq!(state.screen, Screen::Battling);
        assert_eq!(state.battle.current_question_index, 3);
        assert_eq!(state.battle.monster_hp, 3);
        assert_eq!(state.battle.player_hp, PLAYER_MAX_HP);
    }

    #[test]
    fn acquire_error_leaves_to_diary_result_after_dismiss() {
        let mut state = AppState::new(7, true);
        let _ = reducer(&mut state, Action::SessionAcquire);
        let _ = reducer(&mut state, Action::SessionDidError("boom".into()));
        assert!(state.session.is_none());
        assert_eq!(state.notice.as_ref().map(|n| n.message.as_str()), Some("boom"));

        let _ = reducer(&mut state, Action::NoticeDismiss);
        assert_eq!(state.screen, Screen::Left(Destination::DiaryResult(7)));
    }

    #[test]
    fn start_on_failed_session_retries_first() {
        let mut state = AppState::new(7, true);
        let mut failed = session(reframes(3));
        failed.status = SessionStatus::Failed;
        state.session = Some(failed.clone());
        state.screen = Screen::Intro;

        let result = reducer(&mut state, Action::BattleStart);
        assert_eq!(result.effects, vec![Effect::RetrySession { session_id: 42 }]);

        failed.status = SessionStatus::Pending;
        let result = reducer(&mut state, Action::BattleDidReset(failed));
        assert_eq!(result.effects, vec![Effect::StartSession { session_id: 42 }]);
    }

    #[test]
    fn start_resets_battle_state() {
        let mut state = AppState::new(7, true);
        state.battle.player_hp = 1;
        state.battle.current_question_index = 2;
        state.pending = Some(PendingRequest::Start);
        let _ = reducer(&mut state, Action::BattleDidStart(session(reframes(3))));

        assert_eq!(state.battle.player_hp, PLAYER_MAX_HP);
        assert_eq!(state.battle.current_question_index, 0);
        assert_eq!(state.battle.monsters_defeated, 0);
        assert_eq!(state.battle.monster_hp, 3);
    }

    #[test]
    fn single_select_replaces_previous_choice() {
        let mut state = battling(reframes(3));
        let _ = reducer(&mut state, Action::OptionToggle(0));
        let _ = reducer(&mut state, Action::OptionToggle(2));
        assert_eq!(state.battle.selected_option_ids, vec!["c".to_string()]);
    }

    #[test]
    fn toggle_out_of_range_is_ignored() {
        let mut state = battling(reframes(3));
        let result = reducer(&mut state, Action::OptionToggle(9));
        assert!(!result.changed);
        assert!(state.battle.selected_option_ids.is_empty());
    }

    #[test]
    fn submit_enabled_only_with_exact_selection_count() {
        let mut state = battling(vec![challenge(ChallengeKind::Evidence, 2)]);
        assert!(!state.submit_enabled());

        let _ = reducer(&mut state, Action::OptionToggle(0));
        assert!(!state.submit_enabled());
        let _ = reducer(&mut state, Action::OptionToggle(1));
        assert!(state.submit_enabled());
        let _ = reducer(&mut state, Action::OptionToggle(2));
        assert!(!state.submit_enabled());
        let _ = reducer(&mut state, Action::OptionToggle(2));
        assert!(state.submit_enabled());

        let _ = reducer(&mut state, Action::OptionToggle(0));
        let result = reducer(&mut state, Action::AnswerSubmit);
        assert!(!result.changed);
        assert!(result.effects.is_empty());
    }

    #[test]
    fn toggle_is_ignored_while_submitting_animating_and_resolved() {
        let mut state = battling(reframes(3));
        let _ = reducer(&mut state, Action::OptionToggle(0));
        let _ = reducer(&mut state, Action::AnswerSubmit);

        let result = reducer(&mut state, Action::OptionToggle(1));
        assert!(!result.changed);
        assert_eq!(state.battle.selected_option_ids, vec!["a".to_string()]);

        let result = reducer(&mut state, Action::AnswerDidResolve(verdict(true)));
        assert!(state.battle.animation_in_flight());
        let toggled = reducer(&mut state, Action::OptionToggle(1));
        assert!(!toggled.changed);
        assert_eq!(state.battle.selected_option_ids, vec!["a".to_string()]);

        run_animations(&mut state, result);
        assert!(state.battle.turn_resolved());
        let result = reducer(&mut state, Action::OptionToggle(1));
        assert!(!result.changed);
    }

    #[test]
    fn submit_emits_request_with_selection() {
        let mut state = battling(vec![challenge(ChallengeKind::Evidence, 2)]);
        let _ = reducer(&mut state, Action::OptionToggle(3));
        let _ = reducer(&mut state, Action::OptionToggle(1));
        let result = reducer(&mut state, Action::AnswerSubmit);
        assert_eq!(
            result.effects,
            vec![Effect::SubmitAnswer {
                session_id: 42,
                challenge_index: 0,
                selected_ids: vec!["d".into(), "b".into()],
            }]
        );
        assert!(state.battle.input_locked());
    }

    #[test]
    fn resolution_marks_options() {
        let mut state = battling(reframes(3));
        let _ = reducer(&mut state, Action::OptionToggle(1));
        let _ = reducer(&mut state, Action::AnswerSubmit);
        let _ = reducer(&mut state, Action::AnswerDidResolve(verdict(false)));
        assert_eq!(
            state.battle.marks,
            vec![
                OptionMark::Correct,
                OptionMark::WronglySelected,
                OptionMark::Unmarked,
                OptionMark::Unmarked
            ]
        );
    }

    #[test]
    fn correct_answer_hits_monster_only() {
        let mut state = battling(reframes(3));
        play_turn(&mut state, true);
        assert_eq!(state.battle.player_hp, PLAYER_MAX_HP);
        assert_eq!(state.battle.monster_hp, 2);
        assert_eq!(state.battle.coins_earned, 15);
        assert_eq!(state.battle.phase, TurnPhase::Resolved(NextStep::Advance));
        assert_eq!(
            state.battle.insight.as_deref(),
            Some("Thoughts are not facts.")
        );
    }

    #[test]
    fn incorrect_answer_hits_player_only() {
        let mut state = battling(reframes(3));
        play_turn(&mut state, false);
        assert_eq!(state.battle.player_hp, PLAYER_MAX_HP - 1);
        assert_eq!(state.battle.monster_hp, 3);
        assert_eq!(state.battle.coins_earned, 0);
    }

    #[test]
    fn missing_coin_report_awards_default() {
        let mut state = battling(reframes(3));
        let _ = reducer(&mut state, Action::OptionToggle(0));
        let _ = reducer(&mut state, Action::AnswerSubmit);
        let result = reducer(
            &mut state,
            Action::AnswerDidResolve(TurnResult {
                correct: true,
                ..Default::default()
            }),
        );
        run_animations(&mut state, result);
        assert_eq!(state.battle.coins_earned, 10);
    }

    #[test]
    fn hp_changes_land_on_impact() {
        let mut state = battling(reframes(3));
        let _ = reducer(&mut state, Action::OptionToggle(0));
        let _ = reducer(&mut state, Action::AnswerSubmit);
        let result = reducer(&mut state, Action::AnswerDidResolve(verdict(false)));
        assert_eq!(
            result.effects,
            vec![Effect::Animate {
                phase: AnimationPhase::WindUp {
                    attacker: Combatant::Monster
                }
            }]
        );
        assert!(state.battle.animation_in_flight());
        assert_eq!(state.battle.player_hp, PLAYER_MAX_HP);

        let result = reducer(
            &mut state,
            Action::AnimationDidFinish(AnimationPhase::WindUp {
                attacker: Combatant::Monster,
            }),
        );
        assert_eq!(state.battle.player_hp, PLAYER_MAX_HP);
        run_animations(&mut state, result);
        assert_eq!(state.battle.player_hp, PLAYER_MAX_HP - 1);
        assert!(!state.battle.animation_in_flight());
    }

    #[test]
    fn stale_animation_completion_is_ignored() {
        let mut state = battling(reframes(3));
        let _ = reducer(&mut state, Action::OptionToggle(0));
        let _ = reducer(&mut state, Action::AnswerSubmit);
        let _ = reducer(&mut state, Action::AnswerDidResolve(verdict(true)));

        let result = reducer(
            &mut state,
            Action::AnimationDidFinish(AnimationPhase::Impact {
                target: Combatant::Monster,
            }),
        );
        assert!(!result.changed);
        assert_eq!(state.battle.monster_hp, 3);
    }

    #[test]
    fn submit_is_rejected_while_animating() {
        let mut state = battling(reframes(3));
        let _ = reducer(&mut state, Action::OptionToggle(0));
        let _ = reducer(&mut state, Action::AnswerSubmit);
        let _ = reducer(&mut state, Action::AnswerDidResolve(verdict(true)));
        assert!(state.battle.animation_in_flight());

        let result = reducer(&mut state, Action::AnswerSubmit);
        assert!(!result.changed);
        assert!(result.effects.is_empty());
    }

    #[test]
    fn failed_submit_preserves_selection() {
        let mut state = battling(vec![challenge(ChallengeKind::Evidence, 2)]);
        let _ = reducer(&mut state, Action::OptionToggle(0));
        let _ = reducer(&mut state, Action::OptionToggle(2));
        let _ = reducer(&mut state, Action::AnswerSubmit);
        let _ = reducer(&mut state, Action::AnswerDidError("timed out".into()));

        assert_eq!(
            state.battle.selected_option_ids,
            vec!["a".to_string(), "c".to_string()]
        );
        assert!(!state.battle.turn_resolved());
        assert!(!state.battle.input_locked());
        assert!(state.submit_enabled());
        assert!(state.notice.is_some());
    }

    #[test]
    fn present_turn_is_idempotent() {
        let mut state = battling(reframes(3));
        let _ = reducer(&mut state, Action::TurnPresent);
        let first = state.clone();
        let _ = reducer(&mut state, Action::TurnPresent);
        assert_eq!(state, first);
    }

    #[test]
    fn three_correct_answers_defeat_the_monster() {
        let mut state = battling(reframes(3));
        for round in 0..3 {
            play_turn(&mut state, true);
            if round < 2 {
                assert_eq!(state.battle.phase, TurnPhase::Resolved(NextStep::Advance));
                let _ = reducer(&mut state, Action::TurnContinue);
            }
        }

        assert_eq!(state.battle.monster_hp, 0);
        assert_eq!(state.battle.monsters_defeated, 1);
        assert_eq!(state.battle.current_monster_index, 1);
        assert_eq!(state.battle.player_hp, PLAYER_MAX_HP);
        assert_eq!(state.battle.coins_earned, 45);
        assert_eq!(state.battle.phase, TurnPhase::Resolved(NextStep::Complete));

        let result = reducer(&mut state, Action::TurnContinue);
        assert_eq!(
            result.effects,
            vec![Effect::CompleteSession {
                session_id: 42,
                xiaoju_hp: PLAYER_MAX_HP,
                monsters_defeated: 1,
            }]
        );
        assert_eq!(state.screen, Screen::Completing);
    }

    #[test]
    fn five_incorrect_answers_end_the_game() {
        let mut state = battling(reframes(6));
        for round in 0..5 {
            play_turn(&mut state, false);
            if round < 4 {
                let _ = reducer(&mut state, Action::TurnContinue);
            }
        }

        assert_eq!(state.battle.player_hp, 0);
        assert_eq!(state.screen, Screen::GameOver);
        assert_eq!(state.battle.phase, TurnPhase::Resolved(NextStep::GameOver));

        let result = reducer(&mut state, Action::TurnContinue);
        assert!(!result.changed);
        let result = reducer(&mut state, Action::TurnAdvance);
        assert!(!result.changed);
        assert_eq!(state.battle.current_question_index, 4);

        let _ = reducer(&mut state, Action::GameOverLeave);
        assert_eq!(state.screen, Screen::Left(Destination::DiaryResult(7)));
    }

    #[test]
    fn is_last_flag_completes_early() {
        let mut state = battling(reframes(3));
        let _ = reducer(&mut state, Action::OptionToggle(0));
        let _ = reducer(&mut state, Action::AnswerSubmit);
        let mut last = verdict(false);
        last.is_last = true;
        let result = reducer(&mut state, Action::AnswerDidResolve(last));
        run_animations(&mut state, result);
        assert_eq!(state.battle.phase, TurnPhase::Resolved(NextStep::Complete));
    }

    #[test]
    fn completion_error_keeps_battle_retryable() {
        let mut state = battling(reframes(1));
        play_turn(&mut state, true);
        let _ = reducer(&mut state, Action::AdventureComplete);
        let _ = reducer(&mut state, Action::AdventureDidError("server down".into()));

        assert_eq!(state.screen, Screen::Battling);
        assert_eq!(state.battle.phase, TurnPhase::Resolved(NextStep::Complete));
        let _ = reducer(&mut state, Action::NoticeDismiss);
        let result = reducer(&mut state, Action::AdventureComplete);
        assert_eq!(result.effects.len(), 1);
    }

    #[test]
    fn victory_then_postcard_lookup_falls_back_to_list() {
        let mut state = battling(reframes(1));
        play_turn(&mut state, true);
        let _ = reducer(&mut state, Action::AdventureComplete);
        let _ = reducer(&mut state, Action::AdventureDidComplete(Rewards::default()));
        assert_eq!(state.screen, Screen::Victory);

        let result = reducer(&mut state, Action::PostcardView);
        assert_eq!(result.effects, vec![Effect::LookupPostcard { diary_id: 7 }]);
        let _ = reducer(&mut state, Action::PostcardDidResolve(None));
        assert_eq!(state.screen, Screen::Left(Destination::Postcards));
    }

    #[test]
    fn victory_with_postcard_id_leaves_directly() {
        let mut state = battling(reframes(1));
        play_turn(&mut state, true);
        let _ = reducer(&mut state, Action::AdventureComplete);
        let rewards = Rewards {
            postcard_id: Some(5),
            ..Default::default()
        };
        let _ = reducer(&mut state, Action::AdventureDidComplete(rewards));
        let result = reducer(&mut state, Action::PostcardView);
        assert!(result.effects.is_empty());
        assert_eq!(state.screen, Screen::Left(Destination::Postcard(5)));
    }

    #[test]
    fn skip_requires_confirmation() {
        let mut state = battling(reframes(3));
        let result = reducer(&mut state, Action::AdventureSkip);
        assert!(result.effects.is_empty());
        assert!(state.confirm_skip);

        let _ = reducer(&mut state, Action::AdventureSkipCancel);
        assert!(!state.confirm_skip);

        let _ = reducer(&mut state, Action::AdventureSkip);
        let result = reducer(&mut state, Action::AdventureSkipConfirm);
        assert_eq!(result.effects, vec![Effect::SkipSession { session_id: 42 }]);
        let _ = reducer(&mut state, Action::AdventureDidSkip);
        assert_eq!(state.screen, Screen::Left(Destination::DiaryResult(7)));
    }

    #[test]
    fn skip_error_keeps_battle() {
        let mut state = battling(reframes(3));
        let _ = reducer(&mut state, Action::AdventureSkip);
        let _ = reducer(&mut state, Action::AdventureSkipConfirm);
        let _ = reducer(&mut state, Action::SkipDidError("nope".into()));
        assert_eq!(state.screen, Screen::Battling);
        assert_eq!(state.pending, None);
        assert!(state.notice.is_some());
    }

    #[test]
    fn expired_credential_unlocks_and_signs_out() {
        let mut state = battling(reframes(3));
        let _ = reducer(&mut state, Action::OptionToggle(0));
        let _ = reducer(&mut state, Action::AnswerSubmit);
        let _ = reducer(&mut state, Action::AuthDidExpire);
        assert_eq!(state.screen, Screen::SignedOut);
        assert!(!state.battle.input_locked());
        assert_eq!(state.pending, None);
    }

    #[test]
    fn tick_rotates_loading_text_only_while_generating() {
        let mut state = AppState::new(7, true);
        let result = reducer(&mut state, Action::Tick);
        assert!(!result.changed);

        let _ = reducer(&mut state, Action::SessionAcquire);
        let before = state.loading_message();
        let _ = reducer(&mut state, Action::Tick);
        assert_ne!(state.loading_message(), before);
    }
}
