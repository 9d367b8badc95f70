use ratatui::widgets::ListState;

use crate::gemini::GeminiClient;
use crate::session::{ChatMessage, LessonSession};
use crate::topic::Topic;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Topics,
    Lesson,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

pub struct App {
    pub should_quit: bool,
    pub screen: Screen,
    pub input_mode: InputMode,

    // Topic list state
    pub topics: Vec<Topic>,
    pub topic_state: ListState,

    // Active lesson, if any. Dropped on return to the topic list.
    pub session: Option<LessonSession>,

    pub gemini: GeminiClient,

    // 0-2 for the ellipsis animation
    pub animation_frame: u8,
}

impl App {
    pub fn new(gemini: GeminiClient) -> Self {
        let topics = Topic::catalog();
        let mut topic_state = ListState::default();
        topic_state.select(Some(0));

        Self {
            should_quit: false,
            screen: Screen::Topics,
            input_mode: InputMode::Normal,
            topics,
            topic_state,
            session: None,
            gemini,
            animation_frame: 0,
        }
    }

    pub fn selected_topic(&self) -> Option<&Topic> {
        self.topic_state.selected().and_then(|i| self.topics.get(i))
    }

    pub fn topics_nav_down(&mut self) {
        let len = self.topics.len();
        if len > 0 {
            let i = self.topic_state.selected().unwrap_or(0);
            self.topic_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn topics_nav_up(&mut self) {
        let i = self.topic_state.selected().unwrap_or(0);
        self.topic_state.select(Some(i.saturating_sub(1)));
    }

    /// Open the lesson screen for the highlighted topic and fire the one-time
    /// initialization request.
    pub fn activate_selected_topic(&mut self) {
        let Some(topic) = self.selected_topic().cloned() else {
            return;
        };

        let mut session = LessonSession::new(topic);
        if let Some(prompt) = session.begin_start() {
            session.task = Some(self.spawn_generation(prompt, Vec::new()));
        }

        self.session = Some(session);
        self.screen = Screen::Lesson;
        self.input_mode = InputMode::Editing;
    }

    /// Send the pending input as the next turn. The session gate decides
    /// whether anything happens.
    pub fn submit_input(&mut self) {
        let Some(session) = &mut self.session else {
            return;
        };
        if let Some((text, history)) = session.begin_submit() {
            let client = self.gemini.clone();
            session.task = Some(tokio::spawn(async move {
                client.generate(&text, &history).await
            }));
        }
    }

    /// Back to the topic list. The transcript is not persisted.
    pub fn leave_lesson(&mut self) {
        self.session = None;
        self.screen = Screen::Topics;
        self.input_mode = InputMode::Normal;
    }

    pub async fn poll_generation(&mut self) {
        if let Some(session) = &mut self.session {
            session.poll_generation().await;
        }
    }

    pub fn tick_animation(&mut self) {
        let loading = self.session.as_ref().is_some_and(|s| s.loading);
        if loading {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    fn spawn_generation(
        &self,
        message: String,
        history: Vec<ChatMessage>,
    ) -> tokio::task::JoinHandle<anyhow::Result<String>> {
        let client = self.gemini.clone();
        tokio::spawn(async move { client.generate(&message, &history).await })
    }
}
