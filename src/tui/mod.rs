//! TUI front-end for the bulk run dialog.
//!
//! Renders the `DialogFlow` pages (preview and installation) and forwards
//! key presses as advance/dismiss. All blocking terminal I/O runs on a
//! dedicated thread; the async side only spawns the engine via the
//! controller.

use crate::cli::{build_config, Cli};
use crate::model::{DesiredAction, RunEvent, StatusState};
use crate::orchestrator::{self, Advance, DialogFlow, Page, UiCommand};
use crate::registry::RegistryClient;
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Terminal,
};
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

pub async fn run(args: Cli) -> Result<()> {
    let cfg = build_config(&args);
    let client = RegistryClient::new(&cfg).context("build registry client")?;
    let pipelines = client
        .fetch_pipelines()
        .await
        .context("fetch pipeline collection")?;
    let dialog = DialogFlow::new(&pipelines, cfg.action, &cfg.category);
    let selection = dialog.selection().to_vec();

    // Unbounded channels avoid backpressure between engine and UI.
    let (event_tx, event_rx) = mpsc::unbounded_channel::<RunEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    // TUI runs in a dedicated thread to keep all blocking I/O out of the
    // Tokio runtime.
    let ui_handle = std::thread::spawn(move || run_threaded(dialog, event_rx, cmd_tx));

    let res = orchestrator::run_controller(&cfg, selection, event_tx, cmd_rx).await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    res
}

/// Run the TUI loop on a dedicated thread. `DialogFlow` is owned by this
/// thread only; engine events arrive over the channel.
fn run_threaded(
    mut dialog: DialogFlow,
    mut event_rx: UnboundedReceiver<RunEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    let res = loop {
        // Drain events without blocking to keep the UI responsive.
        while let Ok(ev) = event_rx.try_recv() {
            dialog.apply(&ev);
        }

        if last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &dialog)).ok();
            last_tick = Instant::now();
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match key.code {
                    KeyCode::Enter => match dialog.advance() {
                        Advance::StartRun => {
                            let _ = cmd_tx.send(UiCommand::StartRun);
                        }
                        Advance::Dismiss => {
                            let _ = cmd_tx.send(UiCommand::Quit);
                            break Ok(());
                        }
                    },
                    KeyCode::Esc | KeyCode::Char('q') => {
                        let _ = cmd_tx.send(UiCommand::Quit);
                        break Ok(());
                    }
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        let _ = cmd_tx.send(UiCommand::Quit);
                        break Ok(());
                    }
                    _ => {}
                }
            }
        }
    };

    disable_raw_mode().ok();
    execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
    terminal.show_cursor().ok();

    res
}

fn title(dialog: &DialogFlow) -> &'static str {
    match dialog.action() {
        DesiredAction::Start => "Start pipelines",
        DesiredAction::Stop => "Stop pipelines",
    }
}

fn draw(area: Rect, f: &mut ratatui::Frame, dialog: &DialogFlow) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(area);

    match dialog.page() {
        Page::Preview => draw_preview(chunks[0], f, dialog),
        Page::Installation => draw_installation(chunks[0], f, dialog),
    }
    draw_footer(chunks[1], f, dialog);
}

fn draw_preview(area: Rect, f: &mut ratatui::Frame, dialog: &DialogFlow) {
    let items: Vec<ListItem> = dialog
        .selection()
        .iter()
        .map(|p| ListItem::new(Line::from(p.name.clone())))
        .collect();
    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("{} - preview", title(dialog))),
    );
    f.render_widget(list, area);
}

fn status_span(status: StatusState) -> Span<'static> {
    let style = match status {
        StatusState::Waiting => Style::default().fg(Color::Yellow),
        StatusState::Success => Style::default().fg(Color::Green),
        StatusState::Error => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
    };
    Span::styled(status.label(), style)
}

fn draw_installation(area: Rect, f: &mut ratatui::Frame, dialog: &DialogFlow) {
    if dialog.selection().is_empty() {
        let msg = Paragraph::new("Nothing to do: all pipelines already in the desired state.")
            .block(Block::default().borders(Borders::ALL).title(title(dialog)));
        f.render_widget(msg, area);
        return;
    }

    let items: Vec<ListItem> = dialog
        .status_log()
        .iter()
        .map(|e| {
            ListItem::new(Line::from(vec![
                Span::raw(format!("{:<40} ", e.name)),
                status_span(e.status),
            ]))
        })
        .collect();
    let suffix = if dialog.is_running() {
        " (working)"
    } else {
        " (done)"
    };
    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("{}{}", title(dialog), suffix)),
    );
    f.render_widget(list, area);
}

fn draw_footer(area: Rect, f: &mut ratatui::Frame, dialog: &DialogFlow) {
    let footer = Paragraph::new(Line::from(vec![
        Span::styled(
            format!("[Enter] {}", dialog.next_label()),
            Style::default().fg(Color::Cyan),
        ),
        Span::raw("   "),
        Span::styled("[q/Esc] Cancel", Style::default().fg(Color::DarkGray)),
    ]));
    f.render_widget(footer, area);
}
