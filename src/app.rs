use crate::calendar::{leg_for_day, MonthCursor, MonthGrid, GRID_HEIGHT, GRID_WIDTH};
use crate::form::{LegForm, LegFormPopup, PasscodePopup, PasscodePrompt};
use crate::help::Help;
use crate::leg::Leg;
use crate::manager::{LegManager, ManagerError};
use crate::store::DocumentStore;
use crate::theme::{
    status::{ERROR_STYLE, INFO_STYLE, LOCKED_STYLE, UNLOCKED_STYLE},
    BASE_STYLE, DETAIL_STYLE,
};
use crate::timeline::Timeline;
use crossterm::event::{poll, read, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    backend::Backend,
    buffer::Buffer,
    layout::{Constraint, Layout, Margin, Rect},
    text::{Line, Span},
    widgets::{StatefulWidget, Widget},
    Terminal,
};
use std::io::{self, Write};
use std::time::Duration;
use time::Date;

/// How long to wait for a key before checking the store for changes
const TICK: Duration = Duration::from_millis(250);

#[derive(Debug)]
pub(crate) struct App<'a, St: ?Sized> {
    manager: LegManager<'a, St>,
    cursor: MonthCursor,
    today: Date,
    selected: Option<usize>,
    status: Option<Status>,
    /// Set when signing in fails; stays on screen for the rest of the session
    banner: Option<String>,
    state: AppState,
}

impl<'a, St: DocumentStore + ?Sized> App<'a, St> {
    pub(crate) fn new(manager: LegManager<'a, St>, today: Date) -> Self {
        App {
            manager,
            cursor: MonthCursor::containing(today),
            today,
            selected: None,
            status: None,
            banner: None,
            state: AppState::Browsing,
        }
    }

    pub(crate) fn start_month(mut self, cursor: MonthCursor) -> Self {
        self.cursor = cursor;
        self
    }

    pub(crate) fn connect(&mut self, token: Option<&str>) {
        if let Err(e) = self.manager.connect(token) {
            tracing::error!(error = %e, "Could not connect to the leg store");
            self.banner = Some(e.to_string());
        }
    }

    pub(crate) fn run<B: Backend>(mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        while !self.quitting() {
            self.sync();
            terminal.draw(|frame| frame.render_widget(&mut self, frame.area()))?;
            if poll(TICK)? {
                self.handle_input()?;
            }
        }
        Ok(())
    }

    fn sync(&mut self) {
        match self.manager.sync() {
            Ok(true) => self.clamp_selection(),
            Ok(false) => (),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to apply store changes");
                self.error(&e);
            }
        }
    }

    fn handle_input(&mut self) -> io::Result<()> {
        let normal_modifiers = KeyModifiers::NONE | KeyModifiers::SHIFT;
        if let Event::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            ..
        }) = read()?
        {
            if modifiers == KeyModifiers::CONTROL && code == KeyCode::Char('c') {
                self.state = AppState::Quitting;
            } else if !normal_modifiers.contains(modifiers) || !self.handle_key(code) {
                self.beep()?;
            }
        }
        // else: Redraw on resize and anything else
        Ok(())
    }

    // Returns `false` if the user pressed an invalid key
    fn handle_key(&mut self, key: KeyCode) -> bool {
        match &mut self.state {
            AppState::Browsing => {
                self.status = None;
                match key {
                    KeyCode::Char('h') | KeyCode::Left => self.prev_month(),
                    KeyCode::Char('l') | KeyCode::Right => self.next_month(),
                    KeyCode::Char('0') | KeyCode::Home => {
                        self.cursor = MonthCursor::containing(self.today);
                        true
                    }
                    KeyCode::Char('j') | KeyCode::Down => self.select_next(),
                    KeyCode::Char('k') | KeyCode::Up => self.select_prev(),
                    KeyCode::Enter => match self.selected_leg() {
                        Some(leg) => {
                            self.cursor = MonthCursor::containing(leg.start_date);
                            true
                        }
                        None => false,
                    },
                    KeyCode::Char('p') => {
                        if self.manager.is_unlocked() {
                            self.info("Editing is already unlocked.");
                        } else {
                            self.state = AppState::Unlocking(PasscodePrompt::new());
                        }
                        true
                    }
                    KeyCode::Char('a') => {
                        if self.manager.is_unlocked() {
                            self.state = AppState::Editing(LegForm::new());
                        } else {
                            self.error(&ManagerError::Locked);
                        }
                        true
                    }
                    KeyCode::Char('e') => {
                        let Some(form) = self.selected_leg().map(LegForm::editing) else {
                            return false;
                        };
                        if self.manager.is_unlocked() {
                            self.state = AppState::Editing(form);
                        } else {
                            self.error(&ManagerError::Locked);
                        }
                        true
                    }
                    KeyCode::Char('d') => self.delete_selected(),
                    KeyCode::Char('?') => {
                        self.state = AppState::Helping;
                        true
                    }
                    KeyCode::Char('q') | KeyCode::Esc => {
                        self.state = AppState::Quitting;
                        true
                    }
                    _ => false,
                }
            }
            AppState::Helping => {
                self.state = AppState::Browsing;
                true
            }
            AppState::Unlocking(prompt) => match key {
                KeyCode::Esc => {
                    self.state = AppState::Browsing;
                    true
                }
                KeyCode::Enter => {
                    match self.manager.unlock(prompt.input_mut()) {
                        Ok(()) => {
                            self.state = AppState::Browsing;
                            self.info("Editing unlocked.");
                        }
                        Err(e) => self.error(&e),
                    }
                    true
                }
                KeyCode::Backspace | KeyCode::Delete => prompt.pop(),
                KeyCode::Char(ch) => prompt.push(ch),
                _ => false,
            },
            AppState::Editing(form) => match key {
                KeyCode::Esc => {
                    self.state = AppState::Browsing;
                    true
                }
                KeyCode::Tab | KeyCode::Down => {
                    form.next_field();
                    true
                }
                KeyCode::BackTab | KeyCode::Up => {
                    form.prev_field();
                    true
                }
                KeyCode::Enter => {
                    let r = match form.target() {
                        Some(id) => self
                            .manager
                            .update_leg(id, form.name(), form.start_date(), form.duration_days())
                            .map(|()| "Leg updated."),
                        None => self
                            .manager
                            .add_leg(form.name(), form.start_date(), form.duration_days())
                            .map(|_| "Leg added."),
                    };
                    match r {
                        Ok(msg) => {
                            self.state = AppState::Browsing;
                            self.info(msg);
                        }
                        Err(e) => self.error(&e),
                    }
                    true
                }
                KeyCode::Backspace | KeyCode::Delete => form.pop(),
                KeyCode::Char(ch) => form.push(ch),
                _ => false,
            },
            AppState::Quitting => false,
        }
    }

    fn beep(&self) -> io::Result<()> {
        io::stdout().write_all(b"\x07")
    }

    fn quitting(&self) -> bool {
        self.state == AppState::Quitting
    }

    fn prev_month(&mut self) -> bool {
        match self.cursor.prev_month() {
            Ok(cursor) => {
                self.cursor = cursor;
                true
            }
            Err(_) => false,
        }
    }

    fn next_month(&mut self) -> bool {
        match self.cursor.next_month() {
            Ok(cursor) => {
                self.cursor = cursor;
                true
            }
            Err(_) => false,
        }
    }

    fn selected_leg(&self) -> Option<&Leg> {
        self.selected.and_then(|i| self.manager.legs().get(i))
    }

    fn select_next(&mut self) -> bool {
        let qty = self.manager.legs().len();
        match self.selected {
            None if qty > 0 => self.selected = Some(0),
            Some(i) if i + 1 < qty => self.selected = Some(i + 1),
            _ => return false,
        }
        true
    }

    fn select_prev(&mut self) -> bool {
        match self.selected {
            Some(i) if i > 0 => self.selected = Some(i - 1),
            _ => return false,
        }
        true
    }

    // Called whenever the leg list is replaced
    fn clamp_selection(&mut self) {
        let qty = self.manager.legs().len();
        self.selected = self
            .selected
            .filter(|_| qty > 0)
            .map(|i| i.min(qty - 1));
    }

    fn delete_selected(&mut self) -> bool {
        let Some(leg) = self.selected_leg() else {
            return false;
        };
        match self.manager.delete_leg(&leg.id) {
            Ok(()) => self.info("Leg deleted."),
            Err(e) => self.error(&e),
        }
        true
    }

    fn info(&mut self, text: &str) {
        self.status = Some(Status {
            text: text.to_owned(),
            is_error: false,
        });
    }

    fn error<E: std::error::Error>(&mut self, e: &E) {
        self.status = Some(Status {
            text: e.to_string(),
            is_error: true,
        });
    }

    fn status_line(&self) -> Line<'_> {
        let lock = if self.manager.is_unlocked() {
            Span::styled(" EDITING ", UNLOCKED_STYLE)
        } else {
            Span::styled(" LOCKED ", LOCKED_STYLE)
        };
        let message = if let Some(banner) = &self.banner {
            Span::styled(banner.as_str(), ERROR_STYLE)
        } else {
            match &self.status {
                Some(Status {
                    text,
                    is_error: true,
                }) => Span::styled(text.as_str(), ERROR_STYLE),
                Some(Status {
                    text,
                    is_error: false,
                }) => Span::styled(text.as_str(), INFO_STYLE),
                None if self.manager.session().is_none() => {
                    Span::styled("Not signed in.", DETAIL_STYLE)
                }
                None => match leg_for_day(self.manager.legs(), self.today) {
                    Some(leg) => {
                        Span::styled(format!("Underway today: {}", leg.name), DETAIL_STYLE)
                    }
                    None => Span::styled("Press ? for help", DETAIL_STYLE),
                },
            }
        };
        Line::from_iter([lock, Span::styled(" ", BASE_STYLE), message])
    }
}

impl<St: DocumentStore + ?Sized> Widget for &mut App<'_, St> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        buf.set_style(area, BASE_STYLE);
        let [main_area, status_area] =
            Layout::vertical([Constraint::Min(0), Constraint::Length(1)]).areas(area);
        let [cal_area, timeline_area] =
            Layout::horizontal([Constraint::Length(GRID_WIDTH + 4), Constraint::Min(0)])
                .areas(main_area);
        let [grid_area] = Layout::vertical([Constraint::Length(GRID_HEIGHT)])
            .areas(cal_area.inner(Margin::new(2, 1)));
        MonthGrid::new(self.cursor, self.today, self.manager.legs()).render(grid_area, buf);
        Timeline::new(self.manager.legs(), self.selected).render(timeline_area, buf);
        self.status_line().render(status_area, buf);
        match &mut self.state {
            AppState::Helping => Help.render(area, buf),
            AppState::Unlocking(prompt) => PasscodePopup.render(area, buf, prompt),
            AppState::Editing(form) => LegFormPopup.render(area, buf, form),
            AppState::Browsing | AppState::Quitting => (),
        }
    }
}

/// The single message slot at the bottom of the screen; the last message wins
#[derive(Clone, Debug, Eq, PartialEq)]
struct Status {
    text: String,
    is_error: bool,
}

#[derive(Clone, Debug, Eq, PartialEq)]
enum AppState {
    Browsing,
    Helping,
    Unlocking(PasscodePrompt),
    Editing(LegForm),
    Quitting,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendConfig;
    use crate::gate::PasscodeGate;
    use crate::store::MemoryStore;
    use time::macros::date;
    use time::Month;

    const SECRET: &str = "mainsail";

    fn store() -> MemoryStore {
        MemoryStore::connect(&BackendConfig::default()).unwrap()
    }

    fn app(store: &MemoryStore) -> App<'_, MemoryStore> {
        let manager = LegManager::new(store, String::from("app"), PasscodeGate::new(SECRET));
        let mut app = App::new(manager, date!(2025 - 01 - 22));
        app.connect(Some("skipper"));
        app
    }

    fn type_str<St: DocumentStore + ?Sized>(app: &mut App<'_, St>, s: &str) {
        for ch in s.chars() {
            assert!(app.handle_key(KeyCode::Char(ch)));
        }
    }

    fn unlock<St: DocumentStore + ?Sized>(app: &mut App<'_, St>) {
        app.handle_key(KeyCode::Char('p'));
        type_str(app, SECRET);
        assert!(app.handle_key(KeyCode::Enter));
        assert_eq!(app.state, AppState::Browsing);
    }

    fn add<St: DocumentStore + ?Sized>(app: &mut App<'_, St>, name: &str, start: &str, days: &str) {
        assert!(app.handle_key(KeyCode::Char('a')));
        type_str(app, name);
        app.handle_key(KeyCode::Tab);
        type_str(app, start);
        app.handle_key(KeyCode::Tab);
        type_str(app, days);
        app.handle_key(KeyCode::Enter);
        app.sync();
    }

    fn status<'b, St: ?Sized>(app: &'b App<'_, St>) -> Option<(&'b str, bool)> {
        app.status.as_ref().map(|s| (s.text.as_str(), s.is_error))
    }

    #[test]
    fn test_month_navigation() {
        let store = store();
        let mut app = app(&store);
        assert!(app.handle_key(KeyCode::Char('h')));
        assert_eq!(app.cursor, MonthCursor::new(2024, Month::December).unwrap());
        assert!(app.handle_key(KeyCode::Right));
        assert!(app.handle_key(KeyCode::Right));
        assert_eq!(app.cursor, MonthCursor::new(2025, Month::February).unwrap());
        assert!(app.handle_key(KeyCode::Home));
        assert_eq!(app.cursor, MonthCursor::new(2025, Month::January).unwrap());
    }

    #[test]
    fn test_locked_add_reports_error() {
        let store = store();
        let mut app = app(&store);
        assert!(app.handle_key(KeyCode::Char('a')));
        assert_eq!(app.state, AppState::Browsing);
        assert_eq!(
            status(&app),
            Some(("Enter the passcode to make changes.", true))
        );
    }

    #[test]
    fn test_wrong_passcode() {
        let store = store();
        let mut app = app(&store);
        app.handle_key(KeyCode::Char('p'));
        type_str(&mut app, "jib");
        assert!(app.handle_key(KeyCode::Enter));
        assert_eq!(status(&app), Some(("Incorrect passcode.", true)));
        assert_eq!(app.state, AppState::Unlocking(PasscodePrompt::new()));
        assert!(app.handle_key(KeyCode::Esc));
        assert!(!app.manager.is_unlocked());
    }

    #[test]
    fn test_add_select_and_jump() {
        let store = store();
        let mut app = app(&store);
        unlock(&mut app);
        add(&mut app, "Azores", "2025-06-10", "5");
        assert_eq!(status(&app), Some(("Leg added.", false)));
        add(&mut app, "Biscay", "2025-05-01", "4");
        assert_eq!(app.manager.legs().len(), 2);
        assert!(app.handle_key(KeyCode::Char('j')));
        assert_eq!(app.selected_leg().map(|l| l.name.as_str()), Some("Biscay"));
        assert!(app.handle_key(KeyCode::Enter));
        assert_eq!(app.cursor, MonthCursor::new(2025, Month::May).unwrap());
        assert!(app.handle_key(KeyCode::Down));
        assert!(!app.handle_key(KeyCode::Down));
        assert!(app.handle_key(KeyCode::Up));
        assert!(!app.handle_key(KeyCode::Up));
    }

    #[test]
    fn test_invalid_form_stays_open() {
        let store = store();
        let mut app = app(&store);
        unlock(&mut app);
        add(&mut app, "Azores", "2025-06-10", "0");
        assert!(matches!(app.state, AppState::Editing(_)));
        assert!(status(&app).is_some_and(|(_, is_error)| is_error));
        assert!(app.manager.legs().is_empty());
        app.handle_key(KeyCode::Backspace);
        type_str(&mut app, "3");
        app.handle_key(KeyCode::Enter);
        app.sync();
        assert_eq!(app.state, AppState::Browsing);
        assert_eq!(app.manager.legs()[0].duration_days, 3);
    }

    #[test]
    fn test_edit_and_delete() {
        let store = store();
        let mut app = app(&store);
        unlock(&mut app);
        add(&mut app, "Azores", "2025-06-10", "5");
        assert!(!app.handle_key(KeyCode::Char('e')));
        app.handle_key(KeyCode::Char('j'));
        assert!(app.handle_key(KeyCode::Char('e')));
        type_str(&mut app, " run");
        app.handle_key(KeyCode::Enter);
        app.sync();
        assert_eq!(status(&app), Some(("Leg updated.", false)));
        assert_eq!(app.manager.legs()[0].name, "Azores run");
        assert!(app.handle_key(KeyCode::Char('d')));
        app.sync();
        assert!(app.manager.legs().is_empty());
        assert_eq!(app.selected, None);
        assert!(!app.handle_key(KeyCode::Char('d')));
    }

    #[test]
    fn test_help_and_quit() {
        let store = store();
        let mut app = app(&store);
        app.handle_key(KeyCode::Char('?'));
        assert_eq!(app.state, AppState::Helping);
        app.handle_key(KeyCode::Char('x'));
        assert_eq!(app.state, AppState::Browsing);
        assert!(!app.handle_key(KeyCode::Char('x')));
        app.handle_key(KeyCode::Char('q'));
        assert!(app.quitting());
    }

    #[test]
    fn test_sign_in_failure_banner() {
        let store = store();
        let manager = LegManager::new(&store, String::from("app"), PasscodeGate::new(SECRET));
        let mut app = App::new(manager, date!(2025 - 01 - 22));
        app.connect(Some("not a token"));
        assert!(app.banner.is_some());
        app.handle_key(KeyCode::Char('l'));
        let line = app.status_line();
        assert!(line.spans[2].content.starts_with("Sign-in failed"));
    }

    #[test]
    fn test_status_without_session() {
        let store = store();
        let manager = LegManager::new(&store, String::from("app"), PasscodeGate::new(SECRET));
        let app = App::new(manager, date!(2025 - 01 - 22));
        assert_eq!(app.status_line().spans[2].content, "Not signed in.");
    }

    #[test]
    fn test_render() {
        let store = store();
        let mut app = app(&store);
        unlock(&mut app);
        add(&mut app, "Biscay", "2025-01-05", "7");
        app.handle_key(KeyCode::Char('j'));
        let area = Rect::new(0, 0, 80, 24);
        let mut buffer = Buffer::empty(area);
        app.render(area, &mut buffer);
        let rows = (0..24)
            .map(|y| {
                (0..80)
                    .map(|x| buffer.cell((x, y)).map_or(" ", |c| c.symbol()))
                    .collect::<String>()
            })
            .collect::<Vec<_>>();
        assert!(rows.iter().any(|r| r.contains("January 2025")));
        assert!(rows.iter().any(|r| r.contains("[22]")));
        assert!(rows.iter().any(|r| r.contains(" Timeline ")));
        assert!(rows.iter().any(|r| r.contains("Jan 5, 2025 – Jan 12, 2025 · 7 days")));
        assert!(rows[23].starts_with(" EDITING  Press ? for help"));
        add(&mut app, "Gulf Stream", "2025-01-20", "3");
        app.handle_key(KeyCode::Char('l'));
        assert_eq!(
            app.status_line().spans[2].content,
            "Underway today: Gulf Stream"
        );
    }
}
