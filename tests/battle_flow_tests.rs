//! Store-level battle flows driven through EffectStoreTestHarness

use cbtquest::{
    action::Action,
    animation::{AnimationPhase, Combatant},
    effect::Effect,
    reducer::reducer,
    session::{
        BattleSession, Challenge, ChallengeKind, ChallengeOption, Rewards, SessionStatus,
        TurnResult,
    },
    state::{AppState, Destination, NextStep, PendingRequest, Screen, TurnPhase},
};
use tui_dispatch::testing::*;

fn evidence_challenge() -> Challenge {
    Challenge {
        kind: ChallengeKind::Evidence,
        question: "Which facts support \"I always fail\"?".into(),
        distortion_thought: Some("I always fail".into()),
        options: vec![
            ChallengeOption {
                id: "e1".into(),
                text: "I passed last week's exam".into(),
            },
            ChallengeOption {
                id: "e2".into(),
                text: "My friend asked for my help".into(),
            },
            ChallengeOption {
                id: "e3".into(),
                text: "I feel bad".into(),
            },
        ],
        correct_count: Some(2),
        ..Default::default()
    }
}

fn pending_session() -> BattleSession {
    BattleSession {
        id: 11,
        status: SessionStatus::Pending,
        challenges: vec![evidence_challenge()],
        ..Default::default()
    }
}

fn loaded_state() -> AppState {
    let mut state = AppState::new(3, true);
    state.screen = Screen::Intro;
    state.session = Some(pending_session());
    state
}

#[test]
fn acquire_flow_reaches_intro() {
    let mut harness = EffectStoreTestHarness::new(AppState::new(3, true), reducer);

    harness.dispatch_collect(Action::SessionAcquire);
    harness.assert_state(|s| s.pending == Some(PendingRequest::Session));
    let effects = harness.drain_effects();
    effects.effects_count(1);
    effects.effects_first_matches(|e| matches!(e, Effect::AcquireSession { diary_id: 3 }));

    harness.complete_action(Action::SessionDidLoad(pending_session()));
    let (changed, total) = harness.process_emitted();
    assert_eq!(total, 1);
    assert_eq!(changed, 1);

    harness.assert_state(|s| s.screen == Screen::Intro);
    harness.assert_state(|s| s.pending.is_none());
}

#[test]
fn correct_evidence_answer_resolves_turn() {
    let mut harness = EffectStoreTestHarness::new(loaded_state(), reducer);

    harness.dispatch_collect(Action::BattleStart);
    harness
        .drain_effects()
        .effects_first_matches(|e| matches!(e, Effect::StartSession { session_id: 11 }));
    harness.dispatch_collect(Action::BattleDidStart(pending_session()));
    harness.assert_state(|s| s.screen == Screen::Battling);

    harness.dispatch_collect(Action::OptionToggle(0));
    harness.assert_state(|s| !s.submit_enabled());
    harness.dispatch_collect(Action::OptionToggle(1));
    harness.assert_state(|s| s.submit_enabled());

    harness.dispatch_collect(Action::AnswerSubmit);
    harness.drain_effects().effects_first_matches(|e| {
        matches!(
            e,
            Effect::SubmitAnswer {
                challenge_index: 0,
                selected_ids,
                ..
            } if selected_ids.len() == 2
        )
    });

    harness.dispatch_collect(Action::AnswerDidResolve(TurnResult {
        correct: true,
        correct_ids: vec!["e1".into(), "e2".into()],
        coins_earned: Some(15),
        cbt_insight: Some("Look for evidence on both sides.".into()),
        is_last: true,
    }));
    harness.assert_state(|s| s.battle.animation_in_flight());

    for phase in [
        AnimationPhase::WindUp {
            attacker: Combatant::Player,
        },
        AnimationPhase::Impact {
            target: Combatant::Monster,
        },
    ] {
        harness.dispatch_collect(Action::AnimationDidFinish(phase));
    }

    harness.assert_state(|s| s.battle.monster_hp == 2);
    harness.assert_state(|s| s.battle.coins_earned == 15);
    harness.assert_state(|s| s.battle.phase == TurnPhase::Resolved(NextStep::Complete));

    harness.drain_effects();
    harness.dispatch_collect(Action::TurnContinue);
    let effects = harness.drain_effects();
    effects.effects_count(1);
    effects.effects_first_matches(|e| {
        matches!(
            e,
            Effect::CompleteSession {
                session_id: 11,
                xiaoju_hp: 5,
                monsters_defeated: 0
            }
        )
    });

    harness.dispatch_collect(Action::AdventureDidComplete(Rewards {
        coins_earned: 15,
        postcard_id: Some(4),
        ..Default::default()
    }));
    harness.assert_state(|s| s.screen == Screen::Victory);
    harness.dispatch_collect(Action::PostcardView);
    harness.assert_state(|s| s.screen == Screen::Left(Destination::Postcard(4)));
}

#[test]
fn animations_emit_one_effect_per_phase() {
    let mut harness = EffectStoreTestHarness::new(loaded_state(), reducer);
    harness.dispatch_collect(Action::BattleStart);
    harness.dispatch_collect(Action::BattleDidStart(pending_session()));
    harness.dispatch_collect(Action::OptionToggle(0));
    harness.dispatch_collect(Action::OptionToggle(2));
    harness.dispatch_collect(Action::AnswerSubmit);
    harness.drain_effects();

    harness.dispatch_collect(Action::AnswerDidResolve(TurnResult {
        correct: false,
        correct_ids: vec!["e1".into(), "e2".into()],
        ..Default::default()
    }));
    let effects = harness.drain_effects();
    effects.effects_count(1);
    effects.effects_all_match(|e| matches!(e, Effect::Animate { .. }));

    harness.dispatch_collect(Action::AnimationDidFinish(AnimationPhase::WindUp {
        attacker: Combatant::Monster,
    }));
    let effects = harness.drain_effects();
    effects.effects_first_matches(|e| {
        matches!(
            e,
            Effect::Animate {
                phase: AnimationPhase::Impact {
                    target: Combatant::Player
                }
            }
        )
    });

    harness.dispatch_collect(Action::AnimationDidFinish(AnimationPhase::Impact {
        target: Combatant::Player,
    }));
    harness.drain_effects().effects_empty();
    harness.assert_state(|s| s.battle.player_hp == 4);
    harness.assert_state(|s| !s.battle.input_locked());
}

#[test]
fn start_error_keeps_intro() {
    let mut harness = EffectStoreTestHarness::new(loaded_state(), reducer);
    harness.dispatch_collect(Action::BattleStart);
    harness.dispatch_collect(Action::BattleStartDidError(
        "Adventure is still generating".into(),
    ));

    harness.assert_state(|s| s.screen == Screen::Intro);
    harness.assert_state(|s| s.pending.is_none());
    harness.assert_state(|s| {
        s.notice.as_ref().map(|n| n.message.as_str()) == Some("Adventure is still generating")
    });
}
