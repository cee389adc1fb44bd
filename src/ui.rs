use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{block::Title, Block, BorderType, Borders, Clear, Paragraph, Wrap},
    Frame,
};
use tui_dispatch::{EventKind, EventOutcome, RenderContext};
use tui_dispatch_components::centered_rect;

use crate::action::Action;
use crate::animation::{AnimationPhase, Combatant};
use crate::session::Monster;
use crate::state::{AppState, NextStep, OptionMark, PendingRequest, Screen, Tone, TurnPhase};

const BG_BASE: Color = Color::Rgb(20, 22, 30);
const BG_PANEL: Color = Color::Rgb(30, 33, 46);
const BG_PANEL_ALT: Color = Color::Rgb(26, 29, 40);
const TEXT_MAIN: Color = Color::Rgb(230, 230, 238);
const TEXT_DIM: Color = Color::Rgb(150, 152, 170);
const ACCENT: Color = Color::Rgb(255, 170, 90);
const ACCENT_GOLD: Color = Color::Rgb(232, 200, 110);
const ACCENT_GREEN: Color = Color::Rgb(110, 200, 130);
const ACCENT_RED: Color = Color::Rgb(220, 96, 96);
const BORDER_ACCENT: Color = Color::Rgb(80, 84, 110);

pub fn monster_icon(kind: &str) -> &'static str {
    match kind {
        "dark_cloud" => "🌑",
        "checkerboard" => "♟️",
        "crystal_ball" => "🔮",
        "rule_stone" => "📜",
        "label_monster" => "🏷️",
        "magnifier" => "🔍",
        "blame_magnet" => "🧲",
        "emotion_heart" => "💔",
        "gratitude_thief" => "🦹",
        "achievement_eraser" => "📝",
        "joy_fog" => "🌫️",
        "confidence_shadow" => "👤",
        _ => "👻",
    }
}

pub fn render(frame: &mut Frame, area: Rect, state: &AppState, _ctx: RenderContext) {
    draw(frame, area, state);
}

/// Draws the whole screen for `state`; `render` delegates here.
pub fn draw(frame: &mut Frame, area: Rect, state: &AppState) {
    frame.render_widget(Block::default().style(Style::default().bg(BG_BASE)), area);
    match state.screen {
        Screen::SignedOut => render_signed_out(frame, area),
        Screen::Loading => render_loading(frame, area, state, "Preparing your adventure"),
        Screen::Intro => render_intro(frame, area, state),
        Screen::Battling => render_battle(frame, area, state),
        Screen::Completing => render_loading(frame, area, state, "Counting your rewards"),
        Screen::Victory => render_victory(frame, area, state),
        Screen::GameOver => render_game_over(frame, area, state),
        Screen::Left(destination) => render_message(
            frame,
            area,
            " ADVENTURE CLOSED ",
            vec![
                Line::from(format!("Continue at {}", destination.path())),
                Line::from(""),
                hint_line("q: Quit"),
            ],
        ),
    }
    if state.confirm_skip {
        render_modal(
            frame,
            area,
            " SKIP ADVENTURE? ",
            vec![
                Line::from("Skip the battle and go to the analysis result?"),
                Line::from(""),
                hint_line("y/Enter: Skip  |  n/Esc: Keep playing"),
            ],
        );
    }
    if let Some(notice) = state.notice.as_ref() {
        let title = format!(" {} ", notice.title.to_ascii_uppercase());
        render_modal(
            frame,
            area,
            &title,
            vec![
                Line::from(Span::styled(
                    notice.message.clone(),
                    Style::default().fg(ACCENT_RED),
                )),
                Line::from(""),
                hint_line("Any key: Dismiss"),
            ],
        );
    }
}

pub fn handle_event(event: &EventKind, state: &AppState) -> EventOutcome<Action> {
    match event {
        EventKind::Resize(width, height) => {
            EventOutcome::action(Action::UiTerminalResize(*width, *height)).with_render()
        }
        EventKind::Key(key) => handle_key(*key, state),
        _ => EventOutcome::ignored(),
    }
}

fn handle_key(key: KeyEvent, state: &AppState) -> EventOutcome<Action> {
    if key.kind != KeyEventKind::Press {
        return EventOutcome::ignored();
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return EventOutcome::action(Action::Quit);
    }
    if state.notice.is_some() {
        return EventOutcome::action(Action::NoticeDismiss);
    }
    if state.confirm_skip {
        let action = match key.code {
            KeyCode::Char('y') | KeyCode::Enter => Some(Action::AdventureSkipConfirm),
            KeyCode::Char('n') | KeyCode::Esc => Some(Action::AdventureSkipCancel),
            _ => None,
        };
        return EventOutcome::from(action);
    }
    if key.code == KeyCode::Char('q') {
        return EventOutcome::action(Action::Quit);
    }

    match state.screen {
        Screen::Intro => handle_intro_key(key),
        Screen::Battling => handle_battle_key(key, state),
        Screen::Victory => match key.code {
            KeyCode::Enter | KeyCode::Char('p') => EventOutcome::action(Action::PostcardView),
            _ => EventOutcome::ignored(),
        },
        Screen::GameOver => match key.code {
            KeyCode::Enter => EventOutcome::action(Action::GameOverLeave),
            _ => EventOutcome::ignored(),
        },
        Screen::SignedOut | Screen::Left(_) => match key.code {
            KeyCode::Esc | KeyCode::Enter => EventOutcome::action(Action::Quit),
            _ => EventOutcome::ignored(),
        },
        Screen::Loading | Screen::Completing => EventOutcome::ignored(),
    }
}

fn handle_intro_key(key: KeyEvent) -> EventOutcome<Action> {
    let action = match key.code {
        KeyCode::Enter | KeyCode::Char('z') => Some(Action::BattleStart),
        KeyCode::Char('s') => Some(Action::AdventureSkip),
        _ => None,
    };
    EventOutcome::from(action)
}

fn handle_battle_key(key: KeyEvent, state: &AppState) -> EventOutcome<Action> {
    let battle = &state.battle;
    if let TurnPhase::Resolved(_) = battle.phase {
        return match key.code {
            KeyCode::Enter | KeyCode::Char('z') => EventOutcome::action(Action::TurnContinue),
            KeyCode::Char('s') => EventOutcome::action(Action::AdventureSkip),
            _ => EventOutcome::ignored(),
        };
    }
    if battle.input_locked() {
        return EventOutcome::ignored();
    }

    let count = state
        .current_challenge()
        .map(|c| c.options.len())
        .unwrap_or(0);
    let action = match key.code {
        KeyCode::Up | KeyCode::Char('k') if count > 0 => {
            Some(Action::OptionFocus((battle.cursor + count - 1) % count))
        }
        KeyCode::Down | KeyCode::Char('j') if count > 0 => {
            Some(Action::OptionFocus((battle.cursor + 1) % count))
        }
        KeyCode::Char(' ') => Some(Action::OptionToggle(battle.cursor)),
        KeyCode::Char(c @ '1'..='9') => c
            .to_digit(10)
            .map(|digit| Action::OptionToggle(digit as usize - 1)),
        KeyCode::Enter | KeyCode::Char('z') => {
            if state.submit_enabled() {
                Some(Action::AnswerSubmit)
            } else {
                Some(Action::OptionToggle(battle.cursor))
            }
        }
        KeyCode::Char('s') => Some(Action::AdventureSkip),
        _ => None,
    };
    EventOutcome::from(action)
}

fn render_signed_out(frame: &mut Frame, area: Rect) {
    render_message(
        frame,
        area,
        " NOT SIGNED IN ",
        vec![
            Line::from("No valid sign-in token was found."),
            Line::from("Run again with --token <TOKEN> --remember-token"),
            Line::from("or set CBTQUEST_TOKEN."),
            Line::from(""),
            hint_line("q: Quit"),
        ],
    );
}

fn render_loading(frame: &mut Frame, area: Rect, state: &AppState, title: &str) {
    let spinner = ["◐", "◓", "◑", "◒"][(state.tick_count % 4) as usize];
    render_message(
        frame,
        area,
        " LOADING ",
        vec![
            Line::from(Span::styled(
                format!("{spinner} {title}"),
                Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(Span::styled(
                state.loading_message(),
                Style::default().fg(TEXT_DIM),
            )),
        ],
    );
}

fn render_intro(frame: &mut Frame, area: Rect, state: &AppState) {
    let Some(session) = state.session.as_ref() else {
        return;
    };
    let mut lines = vec![
        Line::from(Span::styled(
            session.scene_title().to_string(),
            Style::default().fg(ACCENT_GOLD).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];
    if let Some(monster) = session.monster(0) {
        lines.push(Line::from(format!(
            "{}  {}",
            monster_icon(&monster.kind),
            monster_name(monster)
        )));
        if !monster.description.is_empty() {
            lines.push(Line::from(Span::styled(
                monster.description.clone(),
                Style::default().fg(TEXT_DIM),
            )));
        }
        lines.push(Line::from(""));
    }
    lines.push(Line::from(
        "A thought monster blocks the path. Answer its challenges with Xiaoju!",
    ));
    lines.push(Line::from(format!(
        "{} challenges await.",
        session.challenges.len()
    )));
    lines.push(Line::from(""));
    if state.pending == Some(PendingRequest::Start) {
        lines.push(Line::from(Span::styled(
            state.loading_message(),
            Style::default().fg(ACCENT),
        )));
    } else {
        lines.push(hint_line("Enter: Start battle  |  s: Skip  |  q: Quit"));
    }
    render_message(frame, area, " ADVENTURE ", lines);
}

fn render_battle(frame: &mut Frame, area: Rect, state: &AppState) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(5),
            Constraint::Min(8),
            Constraint::Length(5),
        ])
        .split(area);

    render_battle_header(frame, layout[0], state);

    let fighters = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(layout[1]);
    render_monster_panel(frame, fighters[0], state);
    render_player_panel(frame, fighters[1], state);
    render_challenge(frame, layout[2], state);
    render_battle_text(frame, layout[3], state);
}

fn render_battle_header(frame: &mut Frame, area: Rect, state: &AppState) {
    let total = state.challenge_count();
    let current = (state.battle.current_question_index + 1).min(total.max(1));
    let line = Line::from(vec![
        Span::styled(
            format!(" Question {current}/{total}"),
            Style::default().fg(TEXT_MAIN).add_modifier(Modifier::BOLD),
        ),
        Span::raw("   "),
        Span::styled(
            format!("Coins {}", state.battle.coins_earned),
            Style::default().fg(ACCENT_GOLD),
        ),
    ]);
    frame.render_widget(
        Paragraph::new(line).style(Style::default().bg(BG_PANEL_ALT)),
        area,
    );
}

fn render_monster_panel(frame: &mut Frame, area: Rect, state: &AppState) {
    let battle = &state.battle;
    let monster = state
        .session
        .as_ref()
        .and_then(|s| s.monster(battle.current_monster_index))
        .or_else(|| state.session.as_ref().and_then(|s| s.monsters.last()));
    let (icon, name) = monster
        .map(|m| (monster_icon(&m.kind), monster_name(m)))
        .unwrap_or(("👻", "Monster".to_string()));

    let block = fighter_block(format!(" {} ", name.to_uppercase()), state, Combatant::Monster);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let lines = vec![
        Line::from(format!("{icon}  {}", status_tag(state, Combatant::Monster))),
        hp_line(battle.monster_hp, battle.monster_max_hp),
    ];
    frame.render_widget(
        Paragraph::new(Text::from(lines)).style(Style::default().fg(TEXT_MAIN)),
        inner,
    );
}

fn render_player_panel(frame: &mut Frame, area: Rect, state: &AppState) {
    let battle = &state.battle;
    let block = fighter_block(" XIAOJU ".to_string(), state, Combatant::Player);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let lines = vec![
        Line::from(format!("🍊  {}", status_tag(state, Combatant::Player))),
        hp_line(battle.player_hp, battle.player_max_hp),
        Line::from(Span::styled(
            format!("\"{}\"", battle.speech),
            Style::default().fg(TEXT_DIM).add_modifier(Modifier::ITALIC),
        )),
    ];
    frame.render_widget(
        Paragraph::new(Text::from(lines))
            .style(Style::default().fg(TEXT_MAIN))
            .wrap(Wrap { trim: true }),
        inner,
    );
}

/// Short description of what the combatant is doing in the current
/// animation phase.
fn status_tag(state: &AppState, who: Combatant) -> &'static str {
    match state.battle.current_animation() {
        Some(AnimationPhase::WindUp { attacker }) if attacker == who => "attacks!",
        Some(AnimationPhase::Impact { target }) if target == who => "hit!",
        Some(AnimationPhase::Fade { target }) if target == who => "defeated...",
        _ => "",
    }
}

fn fighter_block<'a>(title: String, state: &AppState, who: Combatant) -> Block<'a> {
    let shaking = matches!(
        state.battle.current_animation(),
        Some(AnimationPhase::Impact { target }) if target == who
    );
    let block = panel_block(title, BG_PANEL);
    if shaking {
        block.border_style(Style::default().fg(ACCENT_RED))
    } else {
        block
    }
}

fn render_challenge(frame: &mut Frame, area: Rect, state: &AppState) {
    let battle = &state.battle;
    let Some(challenge) = state.current_challenge() else {
        render_message(
            frame,
            area,
            " CHALLENGE ",
            vec![Line::from("All challenges answered.")],
        );
        return;
    };

    let title = format!(" {} ", challenge.kind.badge().to_uppercase());
    let block = panel_block(title, BG_PANEL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut lines = vec![Line::from(Span::styled(
        challenge.question.clone(),
        Style::default().fg(TEXT_MAIN).add_modifier(Modifier::BOLD),
    ))];
    if let Some(thought) = challenge.distortion() {
        lines.push(Line::from(Span::styled(
            format!("\"{thought}\""),
            Style::default().fg(ACCENT).add_modifier(Modifier::ITALIC),
        )));
    }
    lines.push(Line::from(Span::styled(
        challenge.instruction_text(),
        Style::default().fg(TEXT_DIM),
    )));
    lines.push(Line::from(""));

    let multi = challenge.is_multi_select();
    for (idx, option) in challenge.options.iter().enumerate() {
        let selected = battle.is_selected(&option.id);
        let marker = match (multi, selected) {
            (true, true) => "[x]",
            (true, false) => "[ ]",
            (false, true) => "(•)",
            (false, false) => "( )",
        };
        let cursor = if idx == battle.cursor && !battle.turn_resolved() {
            "▸"
        } else {
            " "
        };
        let (suffix, color) = match battle.mark(idx) {
            OptionMark::Correct => (" ✓", ACCENT_GREEN),
            OptionMark::WronglySelected => (" ✗", ACCENT_RED),
            OptionMark::Unmarked if selected => ("", ACCENT),
            OptionMark::Unmarked => ("", TEXT_MAIN),
        };
        let mut style = Style::default().fg(color);
        if idx == battle.cursor && !battle.turn_resolved() {
            style = style.add_modifier(Modifier::BOLD);
        }
        lines.push(Line::from(Span::styled(
            format!("{cursor} {} {marker} {}{suffix}", idx + 1, option.text),
            style,
        )));
    }

    frame.render_widget(
        Paragraph::new(Text::from(lines)).wrap(Wrap { trim: false }),
        inner,
    );
}

fn render_battle_text(frame: &mut Frame, area: Rect, state: &AppState) {
    let battle = &state.battle;
    let block = panel_block(" BATTLE ", BG_PANEL_ALT);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut lines = Vec::new();
    if let Some(message) = battle.message.as_ref() {
        let color = match message.tone {
            Tone::Success => ACCENT_GREEN,
            Tone::Failure => ACCENT_RED,
        };
        lines.push(Line::from(Span::styled(
            message.text.clone(),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )));
    }
    if let Some(insight) = battle.insight.as_ref() {
        lines.push(Line::from(Span::styled(
            format!("💡 {insight}"),
            Style::default().fg(ACCENT_GOLD),
        )));
    }

    let hint = match battle.phase {
        TurnPhase::AwaitingSelection => {
            let required = state.required_selections();
            let picked = battle.selected_option_ids.len();
            if state.submit_enabled() {
                "Enter: Submit  |  Space/1-9: Change  |  s: Skip".to_string()
            } else {
                format!("Selected {picked}/{required}  |  ↑↓ Move  Space/1-9: Pick  |  s: Skip")
            }
        }
        TurnPhase::Submitting => "Checking your answer...".to_string(),
        TurnPhase::Resolving => "...".to_string(),
        TurnPhase::Resolved(NextStep::Advance) => "Enter: Next question".to_string(),
        TurnPhase::Resolved(NextStep::Complete) => "Enter: Finish adventure".to_string(),
        TurnPhase::Resolved(NextStep::GameOver) => String::new(),
    };
    lines.push(hint_line(&hint));

    frame.render_widget(
        Paragraph::new(Text::from(lines)).wrap(Wrap { trim: true }),
        inner,
    );
}

fn render_victory(frame: &mut Frame, area: Rect, state: &AppState) {
    let battle = &state.battle;
    let mut lines = vec![
        Line::from(Span::styled(
            "Victory! The thought monsters retreat.",
            Style::default().fg(ACCENT_GREEN).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(format!(
            "HP left: {}/{}",
            battle.player_hp, battle.player_max_hp
        )),
        Line::from(format!(
            "Monsters defeated: {}",
            state.monsters_defeated_total()
        )),
    ];
    if let Some(rewards) = state.rewards.as_ref() {
        lines.push(Line::from(Span::styled(
            format!("Coins: +{}", rewards.coins_earned),
            Style::default().fg(ACCENT_GOLD),
        )));
        for item in &rewards.items_earned {
            lines.push(Line::from(format!("Item: {}", item.display_name())));
        }
        for (label, delta, improved) in rewards.visible_stat_changes() {
            let color = if improved { ACCENT_GREEN } else { ACCENT_RED };
            lines.push(Line::from(Span::styled(
                format!("{label} {delta:+}"),
                Style::default().fg(color),
            )));
        }
    }
    lines.push(Line::from(""));
    if state.pending == Some(PendingRequest::Postcard) {
        lines.push(hint_line("Looking for your postcard..."));
    } else {
        lines.push(hint_line("Enter: View postcard  |  q: Quit"));
    }
    render_message(frame, area, " VICTORY ", lines);
}

fn render_game_over(frame: &mut Frame, area: Rect, state: &AppState) {
    let lines = vec![
        Line::from(Span::styled(
            "Game Over",
            Style::default().fg(ACCENT_RED).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(format!(
            "Monsters defeated: {}",
            state.battle.monsters_defeated
        )),
        Line::from(format!("Coins kept: {}", state.consolation_coins())),
        Line::from(Span::styled(
            format!("\"{}\"", state.battle.speech),
            Style::default().fg(TEXT_DIM),
        )),
        Line::from(""),
        hint_line("Enter: Back to the analysis  |  q: Quit"),
    ];
    render_message(frame, area, " GAME OVER ", lines);
}

fn render_message(frame: &mut Frame, area: Rect, title: &str, lines: Vec<Line<'static>>) {
    let block = panel_block(title.to_string(), BG_PANEL);
    let inner = block.inner(area);
    frame.render_widget(block, area);
    let paragraph = Paragraph::new(Text::from(lines))
        .style(Style::default().fg(TEXT_MAIN))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, inner);
}

fn render_modal(frame: &mut Frame, area: Rect, title: &str, lines: Vec<Line<'static>>) {
    let width = area.width.min(60);
    let height = area.height.min(8);
    let modal_area = centered_rect(width, height, area);
    frame.render_widget(Clear, modal_area);
    render_message(frame, modal_area, title, lines);
}

fn monster_name(monster: &Monster) -> String {
    if monster.name_zh.is_empty() {
        monster.kind.replace('_', " ")
    } else {
        monster.name_zh.clone()
    }
}

fn hint_line(text: &str) -> Line<'static> {
    Line::from(Span::styled(text.to_string(), Style::default().fg(TEXT_DIM)))
}

fn hp_line(current: u8, max: u8) -> Line<'static> {
    let width: usize = 10;
    let ratio = if max == 0 {
        0.0
    } else {
        current as f32 / max as f32
    };
    let filled = ((ratio * width as f32).round() as usize).min(width);
    let color = if ratio > 0.5 {
        ACCENT_GREEN
    } else if ratio > 0.2 {
        ACCENT_GOLD
    } else {
        ACCENT_RED
    };
    Line::from(vec![
        Span::raw("HP "),
        Span::styled(
            "█".repeat(filled),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            "░".repeat(width - filled),
            Style::default().fg(TEXT_DIM),
        ),
        Span::raw(format!(" {current}/{max}")),
    ])
}

fn panel_block<'a, T>(title: T, bg: Color) -> Block<'a>
where
    T: Into<Title<'a>>,
{
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title(title)
        .style(Style::default().bg(bg).fg(TEXT_MAIN))
        .border_style(Style::default().fg(BORDER_ACCENT))
}
