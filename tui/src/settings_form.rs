use irrigation_client_rs::Settings;
use ratatui::{
    buffer::Buffer,
    crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style, Stylize},
    symbols,
    text::{Line, Span},
    widgets::{Block, Borders, Padding, Paragraph, Widget},
};

use crate::app::{HEADER_STYLE, NORMAL_ROW_BG, SELECTED_STYLE, TEXT_FG_COLOR};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Host,
    Username,
    Password,
    SwitchName(usize),
}

#[derive(Debug, Clone)]
struct FormField {
    kind: FieldKind,
    label: String,
    value: String,
}

impl FormField {
    fn display_value(&self) -> String {
        match self.kind {
            FieldKind::Password => "•".repeat(self.value.chars().count()),
            _ => self.value.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormOutcome {
    Pending,
    Done,
    Cancel,
    Quit,
}

/// Editable copy of the settings. Nothing is stored until "Done".
#[derive(Debug, Clone)]
pub struct SettingsForm {
    fields: Vec<FormField>,
    focus: usize,
    message: Option<String>,
}

impl SettingsForm {
    pub fn new(settings: &Settings) -> Self {
        let mut fields = vec![
            FormField {
                kind: FieldKind::Host,
                label: "Web Host".to_string(),
                value: settings.web_host.clone(),
            },
            FormField {
                kind: FieldKind::Username,
                label: "Username".to_string(),
                value: settings.username.clone(),
            },
            FormField {
                kind: FieldKind::Password,
                label: "Password".to_string(),
                value: settings.password.clone(),
            },
        ];
        fields.extend(
            settings
                .names()
                .into_iter()
                .enumerate()
                .map(|(index, name)| FormField {
                    kind: FieldKind::SwitchName(index),
                    label: format!("Switch {}", index + 1),
                    value: name,
                }),
        );
        Self {
            fields,
            focus: 0,
            message: None,
        }
    }

    #[cfg(test)]
    pub fn focused(&self) -> FieldKind {
        self.fields[self.focus].kind
    }

    #[cfg(test)]
    pub fn value(&self, kind: FieldKind) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.kind == kind)
            .map(|f| f.value.as_str())
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> FormOutcome {
        if key.kind != KeyEventKind::Press {
            return FormOutcome::Pending;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return match key.code {
                KeyCode::Char('s') => FormOutcome::Done,
                KeyCode::Char('c') => FormOutcome::Quit,
                _ => FormOutcome::Pending,
            };
        }
        match key.code {
            KeyCode::Esc => return FormOutcome::Cancel,
            KeyCode::Tab | KeyCode::Down => self.focus_next(),
            KeyCode::BackTab | KeyCode::Up => self.focus_previous(),
            KeyCode::Enter => {
                if self.focus + 1 == self.fields.len() {
                    return FormOutcome::Done;
                }
                self.focus_next();
            }
            KeyCode::Backspace => {
                self.fields[self.focus].value.pop();
            }
            KeyCode::Char(c) => {
                self.fields[self.focus].value.push(c);
                self.message = None;
            }
            _ => {}
        }
        FormOutcome::Pending
    }

    fn focus_next(&mut self) {
        self.focus = (self.focus + 1) % self.fields.len();
    }

    fn focus_previous(&mut self) {
        self.focus = (self.focus + self.fields.len() - 1) % self.fields.len();
    }

    /// Copies every field into `settings`. Does not touch `has_configured`.
    pub fn apply_to(&self, settings: &mut Settings) {
        for field in &self.fields {
            match field.kind {
                FieldKind::Host => settings.web_host = field.value.clone(),
                FieldKind::Username => settings.username = field.value.clone(),
                FieldKind::Password => settings.password = field.value.clone(),
                FieldKind::SwitchName(index) => {
                    settings.set_switch_name(index, field.value.clone())
                }
            }
        }
    }
}

impl Widget for &SettingsForm {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let [header_area, server_area, names_area, message_area, footer_area] =
            Layout::vertical([
                Constraint::Length(2),
                Constraint::Length(5),
                Constraint::Fill(1),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .areas(area);

        Paragraph::new("Configuration")
            .bold()
            .centered()
            .render(header_area, buf);

        let (server, names): (Vec<_>, Vec<_>) = self
            .fields
            .iter()
            .enumerate()
            .partition(|(_, f)| !matches!(f.kind, FieldKind::SwitchName(_)));
        self.render_section("Server Settings", &server, server_area, buf);
        self.render_section("Switch Names", &names, names_area, buf);

        if let Some(message) = &self.message {
            Paragraph::new(message.as_str())
                .fg(ratatui::style::Color::LightRed)
                .centered()
                .render(message_area, buf);
        }

        Paragraph::new("Tab/↓↑ to move, type to edit, Ctrl-S or Enter on the last field when done, Esc to cancel.")
            .centered()
            .render(footer_area, buf);
    }
}

impl SettingsForm {
    fn render_section(
        &self,
        title: &str,
        fields: &[(usize, &FormField)],
        area: Rect,
        buf: &mut Buffer,
    ) {
        let block = Block::new()
            .title(Line::raw(title.to_string()).centered())
            .borders(Borders::TOP)
            .border_set(symbols::border::EMPTY)
            .border_style(HEADER_STYLE)
            .bg(NORMAL_ROW_BG)
            .padding(Padding::horizontal(1));

        let lines: Vec<Line> = fields
            .iter()
            .map(|(index, field)| {
                let focused = *index == self.focus;
                let mut spans = vec![
                    Span::styled(
                        format!("{:<10} ", field.label),
                        Style::new().add_modifier(Modifier::BOLD),
                    ),
                    Span::raw(field.display_value()),
                ];
                if focused {
                    spans.push(Span::raw("▏"));
                    Line::from(spans).style(SELECTED_STYLE)
                } else {
                    Line::from(spans).fg(TEXT_FG_COLOR)
                }
            })
            .collect();

        Paragraph::new(lines).block(block).render(area, buf);
    }
}
