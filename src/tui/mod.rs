mod effects;
mod guard;
mod help;
mod state;

use crate::cli::{build_config, Cli};
use crate::model::{InfoEvent, Variant, WorkflowEvent, WorkflowStatus};
use crate::orchestrator::{self, UiCommand};
use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers, MouseEventKind};
use effects::Effects;
use guard::TerminalGuard;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Terminal,
};
use state::UiState;
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

const SPINNER: &[char] = &['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

pub async fn run(args: Cli) -> Result<()> {
    // Unbounded channels avoid backpressure between the UI thread and the
    // controller task.
    let (event_tx, event_rx) = mpsc::unbounded_channel::<WorkflowEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    let cfg = build_config(&args);

    // TUI runs in a dedicated thread to keep all blocking I/O out of the
    // Tokio runtime.
    let ui_args = args.clone();
    let ui_handle = std::thread::spawn(move || run_threaded(ui_args, event_rx, cmd_tx));

    let res = orchestrator::run_controller(cfg, event_tx, cmd_rx).await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    res.map(|_| ())
}

/// Run the TUI loop on a dedicated thread.
fn run_threaded(
    args: Cli,
    mut event_rx: UnboundedReceiver<WorkflowEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    guard::install_panic_hook();
    // Raw mode, alternate screen, and mouse capture are all released by the
    // guard on every exit path, including the error returns below.
    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    // UiState is owned by the UI thread only; no cross-thread mutation.
    let mut state = UiState::new(&args);
    let mut fx = Effects::new();

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    'ui: loop {
        // Drain events without blocking to keep the UI responsive.
        loop {
            match event_rx.try_recv() {
                Ok(ev) => apply_event(&mut state, &mut fx, &terminal, ev),
                Err(mpsc::error::TryRecvError::Empty) => break,
                // Controller is gone; nothing more will ever arrive.
                Err(mpsc::error::TryRecvError::Disconnected) => break 'ui,
            }
        }

        if last_tick.elapsed() >= tick_rate {
            if let Ok(size) = terminal.size() {
                fx.tick(Rect::new(0, 0, size.width, size.height));
            }
            terminal.draw(|f| draw(f.area(), f, &state, &fx)).ok();
            last_tick = Instant::now();
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            match event::read() {
                Ok(Event::Key(k)) => {
                    if k.kind != KeyEventKind::Press {
                        continue;
                    }
                    match (k.modifiers, k.code) {
                        (KeyModifiers::CONTROL, KeyCode::Char('c')) => {
                            let _ = cmd_tx.send(UiCommand::Quit);
                            break;
                        }
                        (_, KeyCode::Esc) => {
                            state.show_help = !state.show_help;
                        }
                        (_, KeyCode::Tab) => state.focus_next(),
                        (_, KeyCode::BackTab) => state.focus_prev(),
                        (_, KeyCode::Enter) => {
                            if state.status == WorkflowStatus::Success {
                                let _ = cmd_tx.send(UiCommand::Quit);
                                break;
                            }
                            // Submit is disabled while a request is in flight.
                            if !state.form_visible() || state.status == WorkflowStatus::Sending {
                                continue;
                            }
                            if !state.form_complete() {
                                state.info = "All fields are required".to_string();
                                continue;
                            }
                            state.alert = None;
                            let _ = cmd_tx.send(UiCommand::Submit);
                        }
                        (_, KeyCode::Left) => {
                            if let Some(input) = state.focused_mut() {
                                input.move_left();
                            }
                        }
                        (_, KeyCode::Right) => {
                            if let Some(input) = state.focused_mut() {
                                input.move_right();
                            }
                        }
                        (_, KeyCode::Backspace) => {
                            if state.form_visible() {
                                if let Some(input) = state.focused_mut() {
                                    input.backspace();
                                    let (field, value) = (input.field, input.value.clone());
                                    let _ = cmd_tx.send(UiCommand::SetField { field, value });
                                }
                            }
                        }
                        (_, KeyCode::Char(c)) => {
                            if state.form_visible() {
                                if let Some(input) = state.focused_mut() {
                                    input.insert(c);
                                    let (field, value) = (input.field, input.value.clone());
                                    let _ = cmd_tx.send(UiCommand::SetField { field, value });
                                }
                            }
                        }
                        _ => {}
                    }
                }
                Ok(Event::Mouse(m)) => {
                    if matches!(m.kind, MouseEventKind::Moved) {
                        fx.pointer_moved(m.column, m.row);
                    }
                }
                _ => {}
            }
        }
    }

    Ok(())
}

fn apply_event(
    state: &mut UiState,
    fx: &mut Effects,
    terminal: &Terminal<CrosstermBackend<io::Stdout>>,
    ev: WorkflowEvent,
) {
    match ev {
        WorkflowEvent::StatusChanged { status } => {
            state.status = status;
            if status == WorkflowStatus::Sending {
                state.info.clear();
            }
        }
        WorkflowEvent::Celebrate(kind) => {
            if let Ok(size) = terminal.size() {
                fx.burst(Rect::new(0, 0, size.width, size.height), kind);
            }
        }
        WorkflowEvent::Info(info) => match info {
            InfoEvent::GateDenied => state.alert = Some(info.to_message()),
            // The error banner in the form already covers this one.
            InfoEvent::SubmissionFailed => {}
            other => state.info = other.to_message(),
        },
    }
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState, fx: &Effects) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(1),
        ])
        .split(area);

    draw_header(rows[0], f, state);

    let card = centered_card(rows[1]);
    match state.status {
        WorkflowStatus::Validating => draw_validating(card, f, state),
        WorkflowStatus::Success => draw_success(card, f, state),
        _ => draw_form(card, f, state),
    }

    draw_footer(rows[2], f, state);

    // Decorative overlay goes on top of everything except the help panel.
    fx.render(f.buffer_mut(), area);

    if state.show_help {
        help::draw_help(centered_card(area), f);
    }
}

/// Fixed-width card centered in the available space, like the page's main
/// panel.
fn centered_card(area: Rect) -> Rect {
    let width = area.width.min(62);
    let height = area.height.min(14);
    Rect::new(
        area.x + (area.width.saturating_sub(width)) / 2,
        area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    )
}

fn status_tag(status: WorkflowStatus) -> Span<'static> {
    let (text, color) = match status {
        WorkflowStatus::Validating => ("AUTHENTIFICATION", Color::Yellow),
        WorkflowStatus::Idle => ("EN LIGNE", Color::Green),
        WorkflowStatus::Sending => ("SYNCHRONISATION", Color::Cyan),
        WorkflowStatus::Success => ("VALIDÉ", Color::Green),
        WorkflowStatus::Error => ("ERREUR", Color::Red),
    };
    Span::styled(
        format!(" {text} "),
        Style::default().fg(Color::Black).bg(color),
    )
}

fn draw_header(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let title = Line::from(vec![
        Span::styled(
            state.variant.title(),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        status_tag(state.status),
    ]);
    let p = Paragraph::new(vec![title])
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Chasse au Trésor"),
        );
    f.render_widget(p, area);
}

fn draw_validating(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let frame = SPINNER[(state.run_start.elapsed().as_millis() / 100) as usize % SPINNER.len()];
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            format!("{frame} Authentification…"),
            Style::default().fg(Color::Yellow),
        )),
        Line::from(Span::styled(
            "Vérification de la signature du ticket",
            Style::default().fg(Color::DarkGray),
        )),
    ];
    let p = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(p, area);
}

fn draw_form(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let mut lines = vec![Line::from("")];

    for (idx, input) in state.inputs.iter().enumerate() {
        let focused = idx == state.focus;
        let label_style = if focused {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };

        let mut spans = vec![
            Span::styled(format!("  {:<8}", input.field.label()), label_style),
            Span::raw(" "),
        ];
        if input.value.is_empty() && !focused {
            spans.push(Span::styled(
                input.field.placeholder(),
                Style::default().fg(Color::DarkGray),
            ));
        } else {
            // Split at the cursor so it renders as a block in the value.
            let before: String = input.value.chars().take(input.cursor).collect();
            let at: String = input.value.chars().skip(input.cursor).take(1).collect();
            let after: String = input.value.chars().skip(input.cursor + 1).collect();
            spans.push(Span::raw(before));
            if focused {
                spans.push(Span::styled(
                    if at.is_empty() { " ".to_string() } else { at },
                    Style::default().bg(Color::Yellow).fg(Color::Black),
                ));
                spans.push(Span::raw(after));
            } else {
                spans.push(Span::raw(at));
                spans.push(Span::raw(after));
            }
        }
        lines.push(Line::from(spans));
        lines.push(Line::from(""));
    }

    if let Some(alert) = state.alert.as_deref() {
        lines.push(Line::from(Span::styled(
            format!("  {alert}"),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )));
    } else if state.status == WorkflowStatus::Error {
        lines.push(Line::from(Span::styled(
            "  Erreur de connexion au serveur. Réessayez.",
            Style::default().fg(Color::Red),
        )));
    } else {
        lines.push(Line::from(""));
    }
    lines.push(Line::from(""));

    let button = if state.status == WorkflowStatus::Sending {
        Span::styled(
            "  ⟳ SYNCHRONISATION…",
            Style::default().fg(Color::DarkGray),
        )
    } else {
        Span::styled(
            match state.variant {
                Variant::Signup => "  [ Enter ] Activer le Radar",
                Variant::Claim | Variant::GatedClaim => "  [ Enter ] Revendiquer le Trésor",
            },
            Style::default()
                .fg(Color::Black)
                .bg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    };
    lines.push(Line::from(button));

    let p = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title(match state.variant {
                Variant::Signup => "Rejoindre le radar",
                Variant::Claim | Variant::GatedClaim => "Félicitations Agent",
            }),
    );
    f.render_widget(p, area);
}

fn draw_success(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "✔ VALIDÉ !",
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(match state.variant {
            Variant::Signup => "Soyez prêt le samedi 28 février à 05h00.",
            Variant::Claim | Variant::GatedClaim => {
                "Votre revendication a été transmise. Gardez le ticket précieusement."
            }
        }),
        Line::from(""),
        Line::from(Span::styled(
            "Enter pour quitter",
            Style::default().fg(Color::DarkGray),
        )),
    ];
    let p = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Green)),
        );
    f.render_widget(p, area);
}

fn draw_footer(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let hint = if state.info.is_empty() {
        "Tab champs · Enter envoyer · Esc aide · Ctrl-C quitter".to_string()
    } else {
        state.info.clone()
    };
    let p = Paragraph::new(Line::from(Span::styled(
        hint,
        Style::default().fg(Color::DarkGray),
    )));
    f.render_widget(p, area);
}
