// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod delegate;
pub mod paint;
pub mod view;

use anyhow::{Context, Result};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyModifiers,
    MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use laborgrid_app::{
    AppCommand, AppState, GridSettings, GroupBy, ModelEvent, Passthrough, RosterModel,
    RosterSource, ViewMapping,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use std::io;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub use delegate::CellRenderer;
pub use view::{GridHit, GridOptions, GridView};

const STATUS_TTL: Duration = Duration::from_secs(4);
const POLL_INTERVAL: Duration = Duration::from_millis(120);
const PAGE_ROWS: isize = 10;

/// What the terminal front end needs beyond loading and saving dwarves.
pub trait AppRuntime: RosterSource {
    fn load_grid_settings(&mut self) -> Result<GridSettings>;
    fn save_group_by(&mut self, group_by: GroupBy) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq)]
struct ViewData {
    grid: GridView,
    renderer: CellRenderer,
    status_deadline: Option<Instant>,
    quit_armed: bool,
}

impl ViewData {
    fn new(options: GridOptions) -> Self {
        Self {
            grid: GridView::new(options),
            renderer: CellRenderer::default(),
            status_deadline: None,
            quit_armed: false,
        }
    }
}

pub fn run_app<R: AppRuntime>(
    state: &mut AppState,
    model: &mut RosterModel,
    runtime: &mut R,
    options: GridOptions,
) -> Result<()> {
    let mut view_data = ViewData::new(options);
    load_settings(state, runtime, &mut view_data);
    if !model.is_loaded() {
        model.set_group_by(state.group_by);
        reload(state, model, runtime, &mut view_data);
    }

    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen, EnableMouseCapture)
        .context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut result = Ok(());
    loop {
        expire_status(state, &mut view_data, Instant::now());

        if let Err(error) = terminal.draw(|frame| {
            let areas = main_areas(frame.area());
            view_data
                .grid
                .ensure_cursor_visible(model, &Passthrough, areas.grid);
            render(frame, state, model, &view_data);
        }) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = match event::poll(POLL_INTERVAL).context("poll event") {
            Ok(has_event) => has_event,
            Err(error) => {
                result = Err(error);
                break;
            }
        };
        if !has_event {
            continue;
        }
        match event::read().context("read event") {
            Ok(Event::Key(key)) => {
                if handle_key_event(state, model, runtime, &mut view_data, key) {
                    break;
                }
            }
            Ok(Event::Mouse(mouse)) => {
                handle_mouse_event(state, model, &mut view_data, mouse);
            }
            Ok(_) => {}
            Err(error) => {
                result = Err(error);
                break;
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), DisableMouseCapture, terminal::LeaveAlternateScreen)
        .context("leave alternate screen")?;
    result
}

fn emit_status(state: &mut AppState, view_data: &mut ViewData, message: impl Into<String>) {
    state.dispatch(AppCommand::SetStatus(message.into()));
    view_data.status_deadline = Some(Instant::now() + STATUS_TTL);
}

fn expire_status(state: &mut AppState, view_data: &mut ViewData, now: Instant) {
    if view_data.status_deadline.is_some_and(|deadline| now >= deadline) {
        view_data.status_deadline = None;
        state.dispatch(AppCommand::ClearStatus);
    }
}

fn apply_model_events(
    state: &mut AppState,
    model: &RosterModel,
    view_data: &mut ViewData,
    events: Vec<ModelEvent>,
) {
    for event in events {
        match event {
            ModelEvent::PendingChanged(count) => {
                state.dispatch(AppCommand::SetPending(count));
            }
            ModelEvent::RowsRebuilt { top_level, leaves } => {
                debug!(top_level, leaves, "grid rows rebuilt");
                let area = view_data.grid.area();
                view_data
                    .grid
                    .ensure_cursor_visible(model, &Passthrough, area);
            }
            ModelEvent::GuideChanged(column) => {
                let message = match column.and_then(|column| model.header(column)) {
                    Some(header) => format!("guide on {}", header.title),
                    None => "guide cleared".to_owned(),
                };
                emit_status(state, view_data, message);
            }
            ModelEvent::Reset
            | ModelEvent::CellsChanged(_)
            | ModelEvent::HeadersRebuilt { .. } => {}
        }
    }
}

fn load_settings<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
) -> bool {
    match runtime.load_grid_settings() {
        Ok(settings) => {
            view_data.renderer.read_settings(&settings);
            true
        }
        Err(error) => {
            warn!(error = %format!("{error:#}"), "settings load failed");
            emit_status(state, view_data, format!("settings load failed: {error:#}"));
            false
        }
    }
}

fn reload<R: AppRuntime>(
    state: &mut AppState,
    model: &mut RosterModel,
    runtime: &mut R,
    view_data: &mut ViewData,
) {
    let discarded = model.pending_change_count();
    match model.reload(runtime) {
        Ok(events) => {
            apply_model_events(state, model, view_data, events);
            let mut message = format!("loaded {} dwarves", model.dwarf_count());
            if discarded > 0 {
                message.push_str(&format!("; dropped {discarded} pending changes"));
            }
            info!(dwarves = model.dwarf_count(), discarded, "roster loaded");
            emit_status(state, view_data, message);
        }
        Err(error) => {
            warn!(error = %format!("{error:#}"), "roster load failed");
            emit_status(state, view_data, format!("load failed: {error:#}"));
        }
    }
}

fn commit<R: AppRuntime>(
    state: &mut AppState,
    model: &mut RosterModel,
    runtime: &mut R,
    view_data: &mut ViewData,
) {
    let pending = model.pending_change_count();
    if pending == 0 {
        emit_status(state, view_data, "nothing to commit");
        return;
    }
    match model.commit(runtime) {
        Ok(events) => {
            apply_model_events(state, model, view_data, events);
            emit_status(state, view_data, format!("committed {pending} changes"));
        }
        Err(error) => {
            warn!(error = %format!("{error:#}"), "commit failed");
            emit_status(state, view_data, format!("commit failed: {error:#}"));
        }
    }
}

fn regroup<R: AppRuntime>(
    state: &mut AppState,
    model: &mut RosterModel,
    runtime: &mut R,
    view_data: &mut ViewData,
    command: AppCommand,
) {
    let focused = view_data.grid.cursor_dwarf(model, &Passthrough);
    if state.dispatch(command).is_empty() {
        return;
    }
    let events = model.set_group_by(state.group_by);
    apply_model_events(state, model, view_data, events);
    if let Some(dwarf) = focused {
        view_data.grid.focus_dwarf(model, &Passthrough, dwarf);
    }
    view_data.status_deadline = Some(Instant::now() + STATUS_TTL);

    if let Err(error) = runtime.save_group_by(state.group_by) {
        warn!(error = %format!("{error:#}"), "group_by save failed");
        emit_status(state, view_data, format!("grouping not saved: {error:#}"));
    }
}

fn activate_cursor<V: ViewMapping + ?Sized>(
    state: &mut AppState,
    model: &mut RosterModel,
    view_data: &mut ViewData,
    view: &V,
) {
    let Some(index) = view_data
        .grid
        .cursor_index(model, view)
        .and_then(|index| view.to_origin(model, index))
    else {
        return;
    };
    let events = model.toggle_cell(index);
    apply_model_events(state, model, view_data, events);
}

fn handle_key_event<R: AppRuntime>(
    state: &mut AppState,
    model: &mut RosterModel,
    runtime: &mut R,
    view_data: &mut ViewData,
    key: KeyEvent,
) -> bool {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    if state.help_visible {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('?')) {
            state.dispatch(AppCommand::ToggleHelp);
            emit_status(state, view_data, "help hidden");
        }
        return false;
    }

    let quit = matches!(key.code, KeyCode::Char('q') | KeyCode::Esc);
    if quit {
        let pending = model.pending_change_count();
        if pending == 0 || view_data.quit_armed {
            return true;
        }
        view_data.quit_armed = true;
        emit_status(
            state,
            view_data,
            format!("{pending} uncommitted changes; c commits, q again quits without saving"),
        );
        return false;
    }
    view_data.quit_armed = false;

    match key.code {
        KeyCode::Down | KeyCode::Char('j') => {
            view_data.grid.move_rows(model, &Passthrough, 1);
        }
        KeyCode::Up | KeyCode::Char('k') => {
            view_data.grid.move_rows(model, &Passthrough, -1);
        }
        KeyCode::PageDown => view_data.grid.move_rows(model, &Passthrough, PAGE_ROWS),
        KeyCode::PageUp => view_data.grid.move_rows(model, &Passthrough, -PAGE_ROWS),
        KeyCode::Right | KeyCode::Char('l') => view_data.grid.move_columns(model, 1),
        KeyCode::Left | KeyCode::Char('h') => view_data.grid.move_columns(model, -1),
        KeyCode::Char(' ') | KeyCode::Enter => {
            activate_cursor(state, model, view_data, &Passthrough);
        }
        KeyCode::Char('g') => regroup(state, model, runtime, view_data, AppCommand::NextGrouping),
        KeyCode::Char('G') => regroup(state, model, runtime, view_data, AppCommand::PrevGrouping),
        KeyCode::Char('c') => commit(state, model, runtime, view_data),
        KeyCode::Char('x') => {
            let pending = model.pending_change_count();
            let events = model.discard();
            apply_model_events(state, model, view_data, events);
            emit_status(state, view_data, format!("discarded {pending} changes"));
        }
        KeyCode::Char('r') => reload(state, model, runtime, view_data),
        KeyCode::Char('v') => {
            let column = view_data.grid.cursor().1;
            let events = model.section_right_clicked(column);
            apply_model_events(state, model, view_data, events);
        }
        KeyCode::Char('s') => {
            if load_settings(state, runtime, view_data) {
                emit_status(state, view_data, "settings reloaded");
            }
        }
        KeyCode::Char('?') => {
            state.dispatch(AppCommand::ToggleHelp);
            emit_status(state, view_data, "help open");
        }
        _ => {}
    }
    false
}

fn handle_mouse_event(
    state: &mut AppState,
    model: &mut RosterModel,
    view_data: &mut ViewData,
    mouse: MouseEvent,
) {
    if state.help_visible {
        return;
    }
    let hit = view_data
        .grid
        .hit_test(model, &Passthrough, mouse.column, mouse.row);
    match (mouse.kind, hit) {
        (MouseEventKind::Down(MouseButton::Left), Some(GridHit::Cell { row, column })) => {
            view_data.grid.set_cursor(row, column);
            activate_cursor(state, model, view_data, &Passthrough);
        }
        (MouseEventKind::Down(MouseButton::Left), Some(GridHit::Name(row))) => {
            let column = view_data.grid.cursor().1;
            view_data.grid.set_cursor(row, column);
        }
        (MouseEventKind::Down(MouseButton::Right), Some(GridHit::Header(column))) => {
            let events = model.section_right_clicked(column);
            apply_model_events(state, model, view_data, events);
        }
        (MouseEventKind::ScrollDown, _) => view_data.grid.move_rows(model, &Passthrough, 1),
        (MouseEventKind::ScrollUp, _) => view_data.grid.move_rows(model, &Passthrough, -1),
        _ => {}
    }
}

struct MainAreas {
    frame: Rect,
    grid: Rect,
    status: Rect,
}

fn main_areas(area: Rect) -> MainAreas {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(3)])
        .split(area);
    MainAreas {
        frame: layout[0],
        grid: Block::default().borders(Borders::ALL).inner(layout[0]),
        status: layout[1],
    }
}

fn render(
    frame: &mut ratatui::Frame<'_>,
    state: &AppState,
    model: &RosterModel,
    view_data: &ViewData,
) {
    let areas = main_areas(frame.area());

    let title = format!("laborgrid | by {}", state.group_by.label());
    frame.render_widget(
        Block::default().title(title).borders(Borders::ALL),
        areas.frame,
    );
    view_data
        .grid
        .render(model, &Passthrough, &view_data.renderer, frame.buffer_mut());

    let status_widget = Paragraph::new(status_text(state, model))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status_widget, areas.status);

    if state.help_visible {
        let area = centered_rect(70, 60, frame.area());
        frame.render_widget(Clear, area);
        let help = Paragraph::new(help_overlay_text())
            .block(Block::default().title("help").borders(Borders::ALL));
        frame.render_widget(help, area);
    }
}

fn status_text(state: &AppState, model: &RosterModel) -> String {
    let summary = format!(
        "{} dwarves | {} pending",
        model.dwarf_count(),
        state.pending_changes
    );
    let hints = "space toggle | g/G group | c commit | x discard | ? help | q quit";
    match &state.status_line {
        Some(status) => format!("{summary} | {status} | {hints}"),
        None => format!("{summary} | {hints}"),
    }
}

fn help_overlay_text() -> &'static str {
    "move: arrows or h/j/k/l | pgup/pgdn\n\
labors: space/enter toggle cell (group cells toggle every member)\n\
grouping: g next | G previous\n\
changes: c commit | x discard | r reload from storage\n\
view: v guide on cursor column | s re-read settings\n\
mouse: left click toggles | right click header toggles guide\n\
global: ? help | q/esc quit | ctrl+c quit now"
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::{
        AppRuntime, GridOptions, ViewData, activate_cursor, expire_status, handle_key_event,
        handle_mouse_event, help_overlay_text, main_areas, render, status_text,
    };
    use anyhow::{Result, bail};
    use crossterm::event::{
        KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    };
    use laborgrid_app::{
        AppState, CellIndex, Dwarf, DwarfId, GridLayout, GridSettings, GroupBy, LaborId,
        Passthrough, Rgb, RosterModel, RosterSource, Sex, Skill, SkillId, ViewMapping,
    };
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use ratatui::layout::Rect;
    use std::time::Duration;

    #[derive(Debug, Default)]
    struct TestRuntime {
        dwarves: Vec<Dwarf>,
        loads: usize,
        persisted: Vec<Vec<DwarfId>>,
        fail_commit: bool,
        fail_settings: bool,
        settings: GridSettings,
        settings_loads: usize,
        saved_group_by: Option<GroupBy>,
    }

    impl RosterSource for TestRuntime {
        fn load_dwarves(&mut self) -> Result<Vec<Dwarf>> {
            self.loads += 1;
            Ok(self.dwarves.clone())
        }

        fn persist_labors(&mut self, dwarves: &[&Dwarf]) -> Result<()> {
            if self.fail_commit {
                bail!("database is locked");
            }
            self.persisted
                .push(dwarves.iter().map(|dwarf| dwarf.id).collect());
            Ok(())
        }
    }

    impl AppRuntime for TestRuntime {
        fn load_grid_settings(&mut self) -> Result<GridSettings> {
            self.settings_loads += 1;
            if self.fail_settings {
                bail!("bad value for `colors.cursor`");
            }
            Ok(self.settings)
        }

        fn save_group_by(&mut self, group_by: GroupBy) -> Result<()> {
            self.saved_group_by = Some(group_by);
            Ok(())
        }
    }

    fn roster() -> Vec<Dwarf> {
        vec![
            Dwarf::new(DwarfId::new(1), "Urist", Sex::Male, "Miner", 60)
                .with_skill(Skill::new(SkillId::new(0), "Miner", 15))
                .with_labor(LaborId::new(0), true),
            Dwarf::new(DwarfId::new(2), "Kib", Sex::Female, "Cook", 30)
                .with_skill(Skill::new(SkillId::new(21), "Cook", 9)),
            Dwarf::new(DwarfId::new(3), "Domas", Sex::Male, "Miner", 40),
        ]
    }

    struct Fixture {
        state: AppState,
        model: RosterModel,
        runtime: TestRuntime,
        view_data: ViewData,
    }

    impl Fixture {
        fn new() -> Self {
            let mut runtime = TestRuntime {
                dwarves: roster(),
                ..TestRuntime::default()
            };
            let mut model = RosterModel::new(GridLayout::default());
            model.reload(&mut runtime).expect("test roster loads");
            let mut view_data = ViewData::new(GridOptions::default());
            view_data
                .grid
                .ensure_cursor_visible(&model, &Passthrough, Rect::new(0, 0, 80, 20));
            Self {
                state: AppState::default(),
                model,
                runtime,
                view_data,
            }
        }

        fn key(&mut self, code: KeyCode) -> bool {
            handle_key_event(
                &mut self.state,
                &mut self.model,
                &mut self.runtime,
                &mut self.view_data,
                KeyEvent::new(code, KeyModifiers::NONE),
            )
        }

        fn click(&mut self, button: MouseButton, column: u16, row: u16) {
            handle_mouse_event(
                &mut self.state,
                &mut self.model,
                &mut self.view_data,
                MouseEvent {
                    kind: MouseEventKind::Down(button),
                    column,
                    row,
                    modifiers: KeyModifiers::NONE,
                },
            );
        }

        fn status(&self) -> &str {
            self.state.status_line.as_deref().unwrap_or_default()
        }
    }

    #[test]
    fn space_toggles_cursor_cell_and_tracks_pending() {
        let mut fx = Fixture::new();
        assert_eq!(fx.view_data.grid.cursor(), (0, 1));

        assert!(!fx.key(KeyCode::Char(' ')));
        assert_eq!(fx.state.pending_changes, 1);
        let urist = fx.model.dwarf(DwarfId::new(1)).expect("urist loaded");
        assert!(!urist.is_labor_enabled(LaborId::new(0)));

        fx.key(KeyCode::Enter);
        assert_eq!(fx.state.pending_changes, 0);
    }

    /// Shows top-level rows bottom-up.
    struct Reversed;

    impl ViewMapping for Reversed {
        fn to_origin(&self, model: &RosterModel, index: CellIndex) -> Option<CellIndex> {
            if index.parent.is_some() {
                return None;
            }
            let row = model.row_count(None).checked_sub(index.row + 1)?;
            let origin = CellIndex::top(row, index.column);
            model.cell(origin).map(|_| origin)
        }

        fn row_count(&self, model: &RosterModel, parent: Option<usize>) -> usize {
            match parent {
                None => model.row_count(None),
                Some(_) => 0,
            }
        }
    }

    #[test]
    fn activation_toggles_the_origin_row_of_a_reordered_view() {
        let mut fx = Fixture::new();
        assert_eq!(fx.view_data.grid.cursor(), (0, 1));

        activate_cursor(&mut fx.state, &mut fx.model, &mut fx.view_data, &Reversed);

        assert_eq!(fx.state.pending_changes, 1);
        let urist = fx.model.dwarf(DwarfId::new(1)).expect("urist loaded");
        assert!(urist.is_labor_enabled(LaborId::new(0)));
        let domas = fx.model.dwarf(DwarfId::new(3)).expect("domas loaded");
        assert!(domas.is_labor_enabled(LaborId::new(0)));
    }

    #[test]
    fn movement_keys_move_the_cursor() {
        let mut fx = Fixture::new();
        fx.key(KeyCode::Char('j'));
        fx.key(KeyCode::Down);
        fx.key(KeyCode::Char('l'));
        assert_eq!(fx.view_data.grid.cursor(), (2, 2));
        fx.key(KeyCode::Up);
        fx.key(KeyCode::Char('h'));
        assert_eq!(fx.view_data.grid.cursor(), (1, 1));
    }

    #[test]
    fn grouping_keys_regroup_and_save_preference() {
        let mut fx = Fixture::new();
        fx.key(KeyCode::Char('j'));
        fx.key(KeyCode::Char('g'));

        assert_eq!(fx.state.group_by, GroupBy::Profession);
        assert_eq!(fx.model.group_by(), GroupBy::Profession);
        assert_eq!(fx.runtime.saved_group_by, Some(GroupBy::Profession));
        assert_eq!(fx.status(), "grouped by profession");
        assert_eq!(
            fx.view_data.grid.cursor_dwarf(&fx.model, &Passthrough),
            Some(DwarfId::new(2))
        );

        fx.key(KeyCode::Char('G'));
        assert_eq!(fx.model.group_by(), GroupBy::Nothing);
        assert_eq!(fx.runtime.saved_group_by, Some(GroupBy::Nothing));
    }

    #[test]
    fn commit_persists_dirty_dwarves() {
        let mut fx = Fixture::new();
        fx.key(KeyCode::Char(' '));
        fx.key(KeyCode::Char('c'));

        assert_eq!(fx.runtime.persisted, vec![vec![DwarfId::new(1)]]);
        assert_eq!(fx.state.pending_changes, 0);
        assert_eq!(fx.status(), "committed 1 changes");
    }

    #[test]
    fn commit_without_changes_is_a_no_op() {
        let mut fx = Fixture::new();
        fx.key(KeyCode::Char('c'));
        assert!(fx.runtime.persisted.is_empty());
        assert_eq!(fx.status(), "nothing to commit");
    }

    #[test]
    fn failed_commit_keeps_changes_and_reports() {
        let mut fx = Fixture::new();
        fx.runtime.fail_commit = true;
        fx.key(KeyCode::Char(' '));
        fx.key(KeyCode::Char('c'));

        assert_eq!(fx.state.pending_changes, 1);
        assert!(fx.status().starts_with("commit failed"));
        assert!(fx.status().contains("database is locked"));
    }

    #[test]
    fn discard_reverts_pending_changes() {
        let mut fx = Fixture::new();
        fx.key(KeyCode::Char(' '));
        fx.key(KeyCode::Char('x'));

        assert_eq!(fx.state.pending_changes, 0);
        assert_eq!(fx.status(), "discarded 1 changes");
        let urist = fx.model.dwarf(DwarfId::new(1)).expect("urist loaded");
        assert!(urist.is_labor_enabled(LaborId::new(0)));
    }

    #[test]
    fn reload_reads_source_and_reports_dropped_changes() {
        let mut fx = Fixture::new();
        fx.key(KeyCode::Char(' '));
        fx.key(KeyCode::Char('r'));

        assert_eq!(fx.runtime.loads, 2);
        assert_eq!(fx.state.pending_changes, 0);
        assert_eq!(fx.status(), "loaded 3 dwarves; dropped 1 pending changes");
    }

    #[test]
    fn guide_key_toggles_cursor_column() {
        let mut fx = Fixture::new();
        fx.key(KeyCode::Char('v'));
        assert_eq!(fx.model.selected_col(), Some(1));
        assert_eq!(fx.status(), "guide on Mining");
        fx.key(KeyCode::Char('v'));
        assert_eq!(fx.model.selected_col(), None);
        assert_eq!(fx.status(), "guide cleared");
    }

    #[test]
    fn settings_key_rereads_colors() {
        let mut fx = Fixture::new();
        fx.runtime.settings.colors.cursor = Rgb::new(1, 2, 3);
        fx.key(KeyCode::Char('s'));

        assert_eq!(fx.runtime.settings_loads, 1);
        assert_eq!(fx.view_data.renderer.colors().cursor, Rgb::new(1, 2, 3));
        assert_eq!(fx.status(), "settings reloaded");

        fx.runtime.fail_settings = true;
        fx.key(KeyCode::Char('s'));
        assert!(fx.status().starts_with("settings load failed"));
        assert_eq!(fx.view_data.renderer.colors().cursor, Rgb::new(1, 2, 3));
    }

    #[test]
    fn quit_with_pending_changes_needs_confirmation() {
        let mut fx = Fixture::new();
        assert!(fx.key(KeyCode::Char('q')));

        fx.key(KeyCode::Char(' '));
        assert!(!fx.key(KeyCode::Char('q')));
        assert!(fx.status().contains("1 uncommitted changes"));
        assert!(fx.key(KeyCode::Esc));
    }

    #[test]
    fn other_keys_disarm_quit() {
        let mut fx = Fixture::new();
        fx.key(KeyCode::Char(' '));
        assert!(!fx.key(KeyCode::Char('q')));
        fx.key(KeyCode::Char('j'));
        assert!(!fx.key(KeyCode::Char('q')));
    }

    #[test]
    fn ctrl_c_quits_immediately() {
        let mut fx = Fixture::new();
        fx.key(KeyCode::Char(' '));
        let quit = handle_key_event(
            &mut fx.state,
            &mut fx.model,
            &mut fx.runtime,
            &mut fx.view_data,
            KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL),
        );
        assert!(quit);
        assert!(fx.runtime.persisted.is_empty());
    }

    #[test]
    fn help_overlay_round_trip_absorbs_keys() {
        let mut fx = Fixture::new();
        fx.key(KeyCode::Char('?'));
        assert!(fx.state.help_visible);
        assert_eq!(fx.status(), "help open");

        assert!(!fx.key(KeyCode::Char('q')));
        fx.key(KeyCode::Char(' '));
        assert_eq!(fx.state.pending_changes, 0);

        fx.key(KeyCode::Esc);
        assert!(!fx.state.help_visible);
        assert_eq!(fx.status(), "help hidden");
    }

    #[test]
    fn left_click_toggles_the_cell_under_the_mouse() {
        let mut fx = Fixture::new();
        fx.click(MouseButton::Left, 28, 5);

        assert_eq!(fx.view_data.grid.cursor(), (1, 2));
        assert_eq!(fx.state.pending_changes, 1);
        let kib = fx.model.dwarf(DwarfId::new(2)).expect("kib loaded");
        assert!(kib.is_labor_enabled(LaborId::new(12)));
    }

    #[test]
    fn right_click_on_header_toggles_guide() {
        let mut fx = Fixture::new();
        fx.click(MouseButton::Right, 22, 0);
        assert_eq!(fx.model.selected_col(), Some(1));
        fx.click(MouseButton::Right, 22, 0);
        assert_eq!(fx.model.selected_col(), None);

        fx.click(MouseButton::Right, 22, 2);
        assert_eq!(fx.model.selected_col(), None);
        assert_eq!(fx.state.pending_changes, 0);
    }

    #[test]
    fn status_expires_after_deadline() {
        let mut fx = Fixture::new();
        fx.key(KeyCode::Char('v'));
        let deadline = fx.view_data.status_deadline.expect("status scheduled");

        expire_status(&mut fx.state, &mut fx.view_data, deadline - Duration::from_millis(1));
        assert!(fx.state.status_line.is_some());
        expire_status(&mut fx.state, &mut fx.view_data, deadline);
        assert!(fx.state.status_line.is_none());
        assert!(fx.view_data.status_deadline.is_none());
    }

    #[test]
    fn status_text_summarises_roster_and_hints() {
        let mut fx = Fixture::new();
        fx.state.status_line = None;
        assert_eq!(
            status_text(&fx.state, &fx.model),
            "3 dwarves | 0 pending | space toggle | g/G group | c commit | x discard | ? help | q quit"
        );
        fx.key(KeyCode::Char(' '));
        fx.state.status_line = Some("hello".to_owned());
        assert!(status_text(&fx.state, &fx.model).starts_with("3 dwarves | 1 pending | hello | "));
    }

    #[test]
    fn help_text_lists_every_binding() {
        let help = help_overlay_text();
        for binding in ["g next", "c commit", "x discard", "r reload", "v guide", "s re-read"] {
            assert!(help.contains(binding), "missing {binding}");
        }
    }

    #[test]
    fn render_draws_grid_and_status() {
        let fx = Fixture::new();
        let backend = TestBackend::new(80, 16);
        let mut terminal = Terminal::new(backend).expect("test terminal");
        let mut view_data = fx.view_data.clone();
        terminal
            .draw(|frame| {
                let areas = main_areas(frame.area());
                view_data
                    .grid
                    .ensure_cursor_visible(&fx.model, &Passthrough, areas.grid);
                render(frame, &fx.state, &fx.model, &view_data);
            })
            .expect("draw");

        let buffer = terminal.backend().buffer();
        let line = |y: u16| {
            (0..buffer.area.width)
                .map(|x| buffer[(x, y)].symbol().to_owned())
                .collect::<String>()
        };
        assert!(line(0).contains("laborgrid | by no grouping"));
        assert!(line(1).contains("dwarf"));
        assert!(line(1).contains("Mining"));
        assert!(line(3).contains("Urist"));
        assert!(line(14).contains("3 dwarves | 0 pending"));
    }
}
