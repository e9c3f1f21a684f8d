use crate::config::Config;
use crate::models::Marker;
use crate::pipeline::{PipelineState, PipelineUpdate, Ranking, RankingSession};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::info;

#[derive(Debug, PartialEq, Clone, Copy, Default)]
pub enum ViewMode {
    #[default]
    Bubbles,
    Map,
}

impl ViewMode {
    /// Parses the `ui.default_view` setting; anything unknown means bubbles.
    pub fn from_name(name: &str) -> Self {
        if name.eq_ignore_ascii_case("map") {
            ViewMode::Map
        } else {
            ViewMode::Bubbles
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            ViewMode::Bubbles => ViewMode::Map,
            ViewMode::Map => ViewMode::Bubbles,
        }
    }
}

pub struct App {
    pub config: Config,
    pub view_mode: ViewMode,
    pub session: RankingSession,
    pub selected_index: usize,
    pub tick_count: usize,
    pub should_quit: bool,
    reload_requested: bool,
    next_session: u64,
}

impl App {
    pub fn new(config: Config) -> Self {
        let view_mode = ViewMode::from_name(&config.ui.default_view);
        let session = RankingSession::new(0, config.ranking.clone());
        Self {
            config,
            view_mode,
            session,
            selected_index: 0,
            tick_count: 0,
            should_quit: false,
            reload_requested: false,
            next_session: 1,
        }
    }

    /// Starts a fresh session and returns its id. Whatever the previous
    /// session still delivers is ignored from now on.
    pub fn begin_session(&mut self) -> u64 {
        let id = self.next_session;
        self.next_session += 1;
        self.session = RankingSession::new(id, self.config.ranking.clone());
        self.selected_index = 0;
        info!(session = id, "Began pipeline session.");
        id
    }

    /// Whether the user asked for a reload since the last call.
    pub fn take_reload_request(&mut self) -> bool {
        std::mem::take(&mut self.reload_requested)
    }

    pub fn state(&self) -> &PipelineState {
        self.session.state()
    }

    pub fn ranking(&self) -> Option<&Ranking> {
        match self.session.state() {
            PipelineState::Ready(ranking) => Some(ranking),
            _ => None,
        }
    }

    pub fn markers(&self) -> &[Marker] {
        match self.ranking() {
            Some(ranking) => &ranking.markers,
            None => &[],
        }
    }

    pub fn on_tick(&mut self) {
        self.tick_count = self.tick_count.wrapping_add(1);
    }

    pub fn on_pipeline(&mut self, update: PipelineUpdate) {
        if self.session.apply(update) {
            let count = self.markers().len();
            if self.selected_index >= count {
                self.selected_index = 0;
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('r') => self.reload_requested = true,
            KeyCode::Tab | KeyCode::Char('m') => self.view_mode = self.view_mode.toggled(),
            KeyCode::Down | KeyCode::Char('j') => {
                let count = self.markers().len();
                if count > 0 {
                    self.selected_index = (self.selected_index + 1) % count;
                }
            }
            KeyCode::Up | KeyCode::Char('k') => {
                let count = self.markers().len();
                if count > 0 {
                    self.selected_index = self
                        .selected_index
                        .checked_sub(1)
                        .unwrap_or(count - 1);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AuthToken, Coordinates, ShopRecord};
    use crate::pipeline::PipelineInput;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn feed_ready_session(app: &mut App, session: u64) {
        let shops: Vec<ShopRecord> = serde_json::from_value(serde_json::json!([
            {"name": "Blue Bottle A", "x": 1.0, "y": 0.0},
            {"name": "Blue Bottle B", "x": 2.0, "y": 0.0}
        ]))
        .unwrap();
        for input in [
            PipelineInput::Token(AuthToken::new("t")),
            PipelineInput::Coordinates(Coordinates::new(0.0, 0.0)),
            PipelineInput::Shops(shops),
        ] {
            app.on_pipeline(PipelineUpdate { session, input });
        }
    }

    #[test]
    fn default_view_comes_from_config() {
        let mut config = Config::default();
        config.ui.default_view = "map".to_string();
        assert_eq!(App::new(config).view_mode, ViewMode::Map);
        assert_eq!(App::new(Config::default()).view_mode, ViewMode::Bubbles);
    }

    #[test]
    fn tab_toggles_view() {
        let mut app = App::new(Config::default());
        app.handle_key(key(KeyCode::Tab));
        assert_eq!(app.view_mode, ViewMode::Map);
        app.handle_key(key(KeyCode::Char('m')));
        assert_eq!(app.view_mode, ViewMode::Bubbles);
    }

    #[test]
    fn selection_wraps_over_markers() {
        let mut app = App::new(Config::default());
        let id = app.begin_session();
        feed_ready_session(&mut app, id);
        assert_eq!(app.markers().len(), 3);

        app.handle_key(key(KeyCode::Up));
        assert_eq!(app.selected_index, 2);
        app.handle_key(key(KeyCode::Char('j')));
        assert_eq!(app.selected_index, 0);
    }

    #[test]
    fn navigation_is_a_no_op_while_loading() {
        let mut app = App::new(Config::default());
        app.begin_session();
        app.handle_key(key(KeyCode::Down));
        assert_eq!(app.selected_index, 0);
        assert!(app.state().is_loading());
    }

    #[test]
    fn reload_discards_late_results_of_old_session() {
        let mut app = App::new(Config::default());
        let old = app.begin_session();
        app.handle_key(key(KeyCode::Char('r')));
        assert!(app.take_reload_request());
        assert!(!app.take_reload_request());

        let new = app.begin_session();
        assert_ne!(old, new);
        feed_ready_session(&mut app, old);
        assert!(app.state().is_loading());

        feed_ready_session(&mut app, new);
        assert!(app.state().is_ready());
    }

    #[test]
    fn quit_keys() {
        let mut app = App::new(Config::default());
        app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_quit);

        let mut app = App::new(Config::default());
        app.handle_key(key(KeyCode::Char('q')));
        assert!(app.should_quit);
    }
}
