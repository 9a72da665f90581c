use std::io::stdout;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use irrigation_client_rs::{
    ConnectionStatus, DeviceSwitch, Settings, SettingsStore, StatusPoller, StatusUpdate,
    SwitchController,
};
use ratatui::{
    DefaultTerminal,
    buffer::Buffer,
    crossterm::{
        event::{
            self, DisableFocusChange, EnableFocusChange, Event, KeyCode, KeyEvent, KeyEventKind,
            KeyModifiers,
        },
        execute,
    },
    layout::{Constraint, Layout, Rect},
    style::{
        Color, Modifier, Style, Stylize,
        palette::tailwind::{BLUE, GREEN, RED, SLATE},
    },
    symbols,
    text::Line,
    widgets::{
        Block, Borders, HighlightSpacing, List, ListItem, ListState, Padding, Paragraph,
        StatefulWidget, Widget, Wrap,
    },
};
use tracing::{error, info};

use crate::settings_form::{FormOutcome, SettingsForm};

pub(crate) const HEADER_STYLE: Style = Style::new().fg(SLATE.c100).bg(BLUE.c800);
pub(crate) const NORMAL_ROW_BG: Color = SLATE.c950;
const ALT_ROW_BG_COLOR: Color = SLATE.c900;
pub(crate) const SELECTED_STYLE: Style = Style::new().bg(SLATE.c800).add_modifier(Modifier::BOLD);
pub(crate) const TEXT_FG_COLOR: Color = SLATE.c200;
const ON_TEXT_FG_COLOR: Color = GREEN.c500;
const ERROR_FG_COLOR: Color = RED.c400;

const INPUT_POLL: Duration = Duration::from_millis(100);

/// Marks the screen stale whenever the board changes.
struct RedrawFlag(Arc<AtomicBool>);

#[async_trait]
impl StatusUpdate for RedrawFlag {
    async fn status_update(&self, _switch: &DeviceSwitch) {
        self.0.store(true, Ordering::Release);
    }

    async fn connection_update(&self, _status: ConnectionStatus) {
        self.0.store(true, Ordering::Release);
    }
}

pub struct App {
    should_exit: bool,
    controller: SwitchController,
    store: SettingsStore,
    settings: Settings,
    list_state: ListState,
    form: Option<SettingsForm>,
    dirty: Arc<AtomicBool>,
}

impl App {
    pub fn new(controller: SwitchController, store: SettingsStore, settings: Settings) -> Self {
        let dirty = Arc::new(AtomicBool::new(true));
        controller
            .board()
            .subscribe(Arc::new(RedrawFlag(dirty.clone())));
        let form = (!settings.has_configured).then(|| SettingsForm::new(&settings));
        let mut list_state = ListState::default();
        list_state.select_first();
        Self {
            should_exit: false,
            controller,
            store,
            settings,
            list_state,
            form,
            dirty,
        }
    }

    pub async fn run(mut self, mut terminal: DefaultTerminal, refresh: Duration) -> Result<()> {
        execute!(stdout(), EnableFocusChange)?;
        let poller = StatusPoller::spawn(self.controller.clone(), refresh);

        let mut redraw = true;
        while !self.should_exit {
            if self.dirty.swap(false, Ordering::AcqRel) || redraw {
                terminal.draw(|frame| frame.render_widget(&mut self, frame.area()))?;
            }
            redraw = false;
            if event::poll(INPUT_POLL)? {
                match event::read()? {
                    Event::Key(key) => {
                        self.handle_key(key).await;
                        redraw = true;
                    }
                    Event::FocusGained => {
                        info!("Terminal focused, refreshing");
                        poller.foreground();
                    }
                    Event::Resize(..) => redraw = true,
                    _ => {}
                }
            }
        }

        poller.stop().await;
        execute!(stdout(), DisableFocusChange)?;
        Ok(())
    }

    async fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if let Some(form) = self.form.as_mut() {
            match form.handle_key(key) {
                FormOutcome::Pending => {}
                FormOutcome::Done => self.complete_settings().await,
                FormOutcome::Cancel => self.cancel_settings(),
                FormOutcome::Quit => self.should_exit = true,
            }
            return;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_exit = true;
            return;
        }
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_exit = true,
            KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
            KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
            KeyCode::Char('g') | KeyCode::Home => self.list_state.select_first(),
            KeyCode::Char('G') | KeyCode::End => self.list_state.select_last(),
            KeyCode::Char('l') | KeyCode::Char(' ') | KeyCode::Right | KeyCode::Enter => {
                self.toggle_selected().await;
            }
            KeyCode::Char('r') => {
                self.controller.refresh_all_statuses();
            }
            KeyCode::Char('s') => self.form = Some(SettingsForm::new(&self.settings)),
            _ => {}
        }
    }

    fn selected_switch(&self) -> Option<DeviceSwitch> {
        let index = self.list_state.selected()?;
        self.controller.board().switch_at(index)
    }

    async fn toggle_selected(&mut self) {
        if let Some(switch) = self.selected_switch() {
            self.controller.toggle(switch.id, !switch.is_on).await;
        }
    }

    /// "Done" on the settings form: names are always kept, the form only
    /// closes once host, username and password are all filled in.
    async fn complete_settings(&mut self) {
        let Some(form) = self.form.as_mut() else {
            return;
        };
        let mut settings = self.settings.clone();
        form.apply_to(&mut settings);
        let complete = settings.is_complete();
        if complete {
            settings.has_configured = true;
        }
        if let Err(e) = self.store.save(&settings) {
            error!("Failed to save settings: {e}");
            form.set_message(format!("Could not save settings: {e}"));
            return;
        }
        if !complete {
            form.set_message("Web host, username and password are required");
            for (index, name) in settings.names().into_iter().enumerate() {
                self.controller.rename_switch(index, name).await;
            }
            self.settings = settings;
            return;
        }
        self.controller.apply_settings(&settings).await;
        self.settings = settings;
        self.form = None;
        self.controller.refresh_all_statuses();
    }

    fn cancel_settings(&mut self) {
        if self.settings.has_configured {
            self.form = None;
        } else if let Some(form) = self.form.as_mut() {
            form.set_message("Configuration is required, Ctrl-C to quit");
        }
    }
}

impl Widget for &mut App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if let Some(form) = &self.form {
            form.render(area, buf);
            return;
        }

        let [header_area, main_area, status_area, footer_area] = Layout::vertical([
            Constraint::Length(2),
            Constraint::Fill(1),
            Constraint::Length(2),
            Constraint::Length(1),
        ])
        .areas(area);

        let [list_area, item_area] =
            Layout::vertical([Constraint::Fill(1), Constraint::Fill(1)]).areas(main_area);

        App::render_header(header_area, buf);
        App::render_footer(footer_area, buf);
        self.render_list(list_area, buf);
        self.render_selected_item(item_area, buf);
        self.render_status(status_area, buf);
    }
}

impl App {
    fn render_header(area: Rect, buf: &mut Buffer) {
        Paragraph::new("Water Controller")
            .bold()
            .centered()
            .render(area, buf);
    }

    fn render_footer(area: Rect, buf: &mut Buffer) {
        Paragraph::new("↓↑ to move, space to switch, r to refresh, s for settings, q to quit.")
            .centered()
            .render(area, buf);
    }

    fn render_list(&mut self, area: Rect, buf: &mut Buffer) {
        let block = Block::new()
            .title(Line::raw("Switches").centered())
            .borders(Borders::TOP)
            .border_set(symbols::border::EMPTY)
            .border_style(HEADER_STYLE)
            .bg(NORMAL_ROW_BG);

        let items: Vec<ListItem> = self
            .controller
            .board()
            .switches()
            .iter()
            .enumerate()
            .map(|(i, switch)| switch_item(switch).bg(alternate_colors(i)))
            .collect();

        let list = List::new(items)
            .block(block)
            .highlight_style(SELECTED_STYLE)
            .highlight_symbol(">")
            .highlight_spacing(HighlightSpacing::Always);

        StatefulWidget::render(list, area, buf, &mut self.list_state);
    }

    fn render_selected_item(&self, area: Rect, buf: &mut Buffer) {
        let (info, error) = match self.selected_switch() {
            Some(switch) => (
                format!(
                    "{}: {}",
                    if switch.is_on { "● ON" } else { "○ OFF" },
                    switch.name
                ),
                switch.error_message,
            ),
            None => ("Nothing selected...".to_string(), None),
        };

        let block = Block::new()
            .title(Line::raw("Details").centered())
            .borders(Borders::TOP)
            .border_set(symbols::border::EMPTY)
            .border_style(HEADER_STYLE)
            .bg(NORMAL_ROW_BG)
            .padding(Padding::horizontal(1));

        let mut lines = vec![Line::raw(info).fg(TEXT_FG_COLOR)];
        if let Some(error) = error {
            lines.push(Line::raw(error).fg(ERROR_FG_COLOR));
        }

        Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: false })
            .render(area, buf);
    }

    fn render_status(&self, area: Rect, buf: &mut Buffer) {
        let [status_area, version_area] =
            Layout::vertical([Constraint::Length(1), Constraint::Length(1)]).areas(area);
        Paragraph::new(self.controller.board().connection_status().as_str())
            .italic()
            .centered()
            .render(status_area, buf);
        Paragraph::new(format!("Version {}", env!("CARGO_PKG_VERSION")))
            .dim()
            .centered()
            .render(version_area, buf);
    }
}

const fn alternate_colors(i: usize) -> Color {
    if i.is_multiple_of(2) {
        NORMAL_ROW_BG
    } else {
        ALT_ROW_BG_COLOR
    }
}

fn switch_item(switch: &DeviceSwitch) -> ListItem<'static> {
    let line = if switch.is_on {
        Line::styled(format!(" ● {}", switch.name), ON_TEXT_FG_COLOR)
    } else {
        Line::styled(format!(" ○ {}", switch.name), TEXT_FG_COLOR)
    };
    ListItem::new(line)
}
