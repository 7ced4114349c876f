use ratatui::layout::Rect;
use ratatui::text::Text;
use ratatui::widgets::ListState;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::client::QueryClient;
use crate::config::Settings;
use crate::error::QueryError;
use crate::input::InputBuffer;
use crate::markdown::{render_plain, MarkdownRenderer};
use crate::models::ModelSelector;
use crate::session::{ChatRole, Session};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,

    // Conversation
    pub session: Session,
    pub input: InputBuffer,
    pub client: QueryClient,
    pub query_task: Option<JoinHandle<Result<String, QueryError>>>,

    // Chat view; height and width are the inner size, updated during render
    pub chat_scroll: u16,
    pub chat_max_scroll: u16,
    pub chat_height: u16,
    pub follow_tail: bool,
    pub chat_area: Option<Rect>,

    // Model picker state
    pub models: ModelSelector,
    pub show_model_picker: bool,
    pub model_picker_state: ListState,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Rendered message cache, index-aligned with session.messages()
    renderer: MarkdownRenderer,
    rendered: Vec<Text<'static>>,
}

impl App {
    pub fn new(settings: &Settings) -> Self {
        let mut models = ModelSelector::new();
        models.select_index(settings.model_index);

        Self {
            should_quit: false,
            input_mode: InputMode::Editing,

            session: Session::new(),
            input: InputBuffer::new(),
            client: QueryClient::new(&settings.base_url),
            query_task: None,

            chat_scroll: 0,
            chat_max_scroll: 0,
            chat_height: 0,
            follow_tail: true,
            chat_area: None,

            models,
            show_model_picker: false,
            model_picker_state: ListState::default(),

            animation_frame: 0,

            renderer: MarkdownRenderer::new(),
            rendered: Vec::new(),
        }
    }

    /// Sends whatever is in the input box.
    ///
    /// Returns `false` when nothing was dispatched: blank input, or a query
    /// is already in flight. Neither case changes any state.
    pub fn submit(&mut self) -> bool {
        let model = self.models.selected().id;
        let Some(request) = self.session.begin(self.input.text(), Some(model)) else {
            return false;
        };

        self.input.clear();
        self.follow_tail = true;
        self.animation_frame = 0;

        let client = self.client.clone();
        self.query_task = Some(tokio::spawn(async move { client.query(&request).await }));
        true
    }

    /// Resolves the in-flight query if its task has finished.
    pub async fn poll_query_task(&mut self) {
        let finished = self
            .query_task
            .as_ref()
            .is_some_and(|task| task.is_finished());
        if !finished {
            return;
        }

        if let Some(task) = self.query_task.take() {
            let outcome = match task.await {
                Ok(result) => result,
                Err(e) => Err(QueryError::TaskFailed(e.to_string())),
            };
            self.session.finish(outcome);
        }
    }

    /// Drops any in-flight query; its result will never touch the session.
    pub fn shutdown(&mut self) {
        if let Some(task) = self.query_task.take() {
            info!("aborting in-flight query on exit");
            task.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.session.is_pending()
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.session.is_pending() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    /// Renders any messages appended since the last call.
    ///
    /// Messages never change once appended, so earlier entries are reused.
    pub fn rendered_messages(&mut self) -> &[Text<'static>] {
        let messages = self.session.messages();
        for msg in &messages[self.rendered.len()..] {
            let text = match msg.role {
                ChatRole::User => render_plain(&msg.content),
                ChatRole::Assistant => self.renderer.render(&msg.content),
            };
            self.rendered.push(text);
        }
        &self.rendered
    }

    // Chat scrolling
    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.min(self.chat_max_scroll).saturating_sub(lines);
        self.follow_tail = false;
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(self.chat_max_scroll);
        self.follow_tail = self.chat_scroll >= self.chat_max_scroll;
    }

    pub fn scroll_half_page_up(&mut self) {
        self.scroll_up((self.chat_height / 2).max(1));
    }

    pub fn scroll_half_page_down(&mut self) {
        self.scroll_down((self.chat_height / 2).max(1));
    }

    pub fn scroll_to_top(&mut self) {
        self.chat_scroll = 0;
        self.follow_tail = self.chat_max_scroll == 0;
    }

    pub fn scroll_to_bottom(&mut self) {
        self.chat_scroll = self.chat_max_scroll;
        self.follow_tail = true;
    }

    // Model picker methods
    pub fn open_model_picker(&mut self) {
        self.model_picker_state.select(Some(self.models.selected_index()));
        self.show_model_picker = true;
    }

    pub fn model_picker_nav_down(&mut self) {
        let len = self.models.all().len();
        let i = self.model_picker_state.selected().unwrap_or(0);
        self.model_picker_state.select(Some((i + 1).min(len - 1)));
    }

    pub fn model_picker_nav_up(&mut self) {
        let i = self.model_picker_state.selected().unwrap_or(0);
        self.model_picker_state.select(Some(i.saturating_sub(1)));
    }

    pub fn select_model(&mut self) {
        if let Some(i) = self.model_picker_state.selected() {
            if self.models.select_index(i) {
                debug!(model = self.models.selected().id, "model selected");
            }
        }
        self.show_model_picker = false;
    }

    pub fn next_model(&mut self) {
        self.models.next();
        debug!(model = self.models.selected().id, "model selected");
    }

    pub fn prev_model(&mut self) {
        self.models.prev();
        debug!(model = self.models.selected().id, "model selected");
    }
}
