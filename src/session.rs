use anyhow::Result;
use tokio::task::JoinHandle;

use crate::topic::Topic;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Model,
}

/// One transcript entry. Never mutated after it is appended.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
    pub is_error: bool,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
            is_error: false,
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Model,
            text: text.into(),
            is_error: false,
        }
    }

    /// Locally synthesized failure notice. Excluded from request history.
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Model,
            text: text.into(),
            is_error: true,
        }
    }
}

pub const INIT_FAILURE_NOTICE: &str =
    "Connection to training environment failed. Please check credentials.";
pub const TURN_FAILURE_NOTICE: &str = "Error executing command.";

/// Which request the outstanding task belongs to. Picks the failure notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingRequest {
    Init,
    Turn,
}

/// State for one lesson's conversation. Created when a topic is activated,
/// dropped when the user returns to the topic list.
pub struct LessonSession {
    pub topic: Topic,
    pub messages: Vec<ChatMessage>,
    pub loading: bool,

    // Input box state
    pub input: String,
    pub input_cursor: usize,

    // Chat scroll state (dimensions written back by the renderer each frame)
    pub scroll: u16,
    pub follow_bottom: bool,
    pub chat_height: u16,
    pub total_chat_lines: u16,

    initialized: bool,
    pending: Option<PendingRequest>,
    pub task: Option<JoinHandle<Result<String>>>,
}

impl LessonSession {
    pub fn new(topic: Topic) -> Self {
        Self {
            topic,
            messages: Vec::new(),
            loading: false,
            input: String::new(),
            input_cursor: 0,
            scroll: 0,
            follow_bottom: true,
            chat_height: 0,
            total_chat_lines: 0,
            initialized: false,
            pending: None,
            task: None,
        }
    }

    /// Begin the one-time lesson initialization. Returns the intro prompt to
    /// send (with empty history), or None if this session already started one.
    pub fn begin_start(&mut self) -> Option<String> {
        if self.initialized {
            return None;
        }
        self.initialized = true;
        self.loading = true;
        self.pending = Some(PendingRequest::Init);
        Some(intro_prompt(&self.topic))
    }

    /// Accept the pending input as a new turn. Returns the message text and the
    /// history snapshot to send, or None if the input is blank or a request is
    /// already outstanding. The user message is appended optimistically; the
    /// snapshot is taken before the append so the in-flight message is not
    /// replayed as history.
    pub fn begin_submit(&mut self) -> Option<(String, Vec<ChatMessage>)> {
        if self.input.trim().is_empty() || self.loading {
            return None;
        }

        let text = std::mem::take(&mut self.input);
        self.input_cursor = 0;

        let history = self.messages.clone();
        self.messages.push(ChatMessage::user(text.clone()));

        self.loading = true;
        self.pending = Some(PendingRequest::Turn);
        self.follow_bottom = true;

        Some((text, history))
    }

    /// Fold a finished generation request into the transcript. Runs for both
    /// outcomes, so the loading gate always reopens.
    pub fn complete(&mut self, result: Result<String>) {
        let pending = self.pending.take();
        match result {
            Ok(text) => self.messages.push(ChatMessage::model(text)),
            Err(_) => {
                let notice = match pending {
                    Some(PendingRequest::Init) => INIT_FAILURE_NOTICE,
                    _ => TURN_FAILURE_NOTICE,
                };
                self.messages.push(ChatMessage::error(notice));
            }
        }
        self.loading = false;
        self.follow_bottom = true;
    }

    /// Await the spawned request if it has finished, without blocking the
    /// event loop while it is still running.
    pub async fn poll_generation(&mut self) {
        let finished = self.task.as_ref().is_some_and(|t| t.is_finished());
        if !finished {
            return;
        }
        if let Some(task) = self.task.take() {
            let result = match task.await {
                Ok(result) => result,
                Err(e) => Err(anyhow::Error::from(e)),
            };
            self.complete(result);
        }
    }

    // Chat scrolling. The renderer clamps against total_chat_lines.
    pub fn scroll_up(&mut self) {
        self.scroll = self.scroll.saturating_sub(1);
        self.follow_bottom = false;
    }

    pub fn scroll_down(&mut self) {
        let max = self.max_scroll();
        self.scroll = self.scroll.saturating_add(1).min(max);
        if self.scroll == max {
            self.follow_bottom = true;
        }
    }

    pub fn scroll_to_top(&mut self) {
        self.scroll = 0;
        self.follow_bottom = false;
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll = self.max_scroll();
        self.follow_bottom = true;
    }

    pub fn max_scroll(&self) -> u16 {
        self.total_chat_lines.saturating_sub(self.chat_height)
    }
}

/// The fixed lesson-opening prompt: technical brief, scenario, first challenge.
fn intro_prompt(topic: &Topic) -> String {
    format!(
        "Initialize the training module for: {}.\n\
         Level: {}.\n\n\
         1. Give a brief, high-level technical brief of the vulnerability.\n\
         2. Set up a realistic scenario (e.g., \"Target is a microservice architecture on AWS...\").\n\
         3. Present the first challenge or command for the user to try.",
        topic.title,
        topic.difficulty.as_str()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topic::Topic;
    use anyhow::anyhow;

    fn session() -> LessonSession {
        let topic = Topic::catalog().remove(0);
        LessonSession::new(topic)
    }

    #[test]
    fn test_start_fires_once() {
        let mut s = session();
        let prompt = s.begin_start();
        assert!(prompt.is_some());
        assert!(s.loading);
        // Re-activation of the same session must not issue another request
        assert!(s.begin_start().is_none());
    }

    #[test]
    fn test_intro_prompt_embeds_topic_and_difficulty() {
        let mut s = session();
        let prompt = s.begin_start().unwrap();
        assert!(prompt.contains("Blind SSRF"));
        assert!(prompt.contains("Level: Hard"));
        assert!(prompt.contains("first challenge"));
    }

    #[test]
    fn test_init_success_sets_single_model_message() {
        let mut s = session();
        s.begin_start();
        s.complete(Ok("Welcome to the lab.".to_string()));
        assert!(!s.loading);
        assert_eq!(s.messages.len(), 1);
        assert_eq!(s.messages[0].role, ChatRole::Model);
        assert!(!s.messages[0].is_error);
    }

    #[test]
    fn test_init_failure_uses_connection_notice() {
        let mut s = session();
        s.begin_start();
        s.complete(Err(anyhow!("boom")));
        assert!(!s.loading);
        assert_eq!(s.messages.len(), 1);
        assert!(s.messages[0].is_error);
        assert_eq!(s.messages[0].text, INIT_FAILURE_NOTICE);
    }

    #[test]
    fn test_blank_input_is_a_noop() {
        let mut s = session();
        s.input = "   \n  ".to_string();
        assert!(s.begin_submit().is_none());
        assert_eq!(s.input, "   \n  ");
        assert!(s.messages.is_empty());
        assert!(!s.loading);
    }

    #[test]
    fn test_submit_rejected_while_loading() {
        let mut s = session();
        s.begin_start();
        s.input = "curl http://169.254.169.254/".to_string();
        assert!(s.begin_submit().is_none());
        assert_eq!(s.input, "curl http://169.254.169.254/");
        assert!(s.messages.is_empty());
    }

    #[test]
    fn test_submit_appends_optimistically_and_snapshots_history() {
        let mut s = session();
        s.begin_start();
        s.complete(Ok("intro".to_string()));

        s.input = "whois target.lab".to_string();
        let (text, history) = s.begin_submit().unwrap();

        assert_eq!(text, "whois target.lab");
        // Snapshot excludes the message being sent
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].role, ChatRole::Model);
        // But the transcript shows it immediately
        assert_eq!(s.messages.len(), 2);
        assert_eq!(s.messages[1].role, ChatRole::User);
        assert_eq!(s.messages[1].text, "whois target.lab");
        assert!(s.input.is_empty());
        assert_eq!(s.input_cursor, 0);
        assert!(s.loading);
    }

    #[test]
    fn test_transcript_alternates_over_turns() {
        let mut s = session();
        s.begin_start();
        s.complete(Ok("intro".to_string()));

        for i in 0..3 {
            s.input = format!("command {}", i);
            assert!(s.begin_submit().is_some());
            s.complete(Ok(format!("output {}", i)));
        }

        assert_eq!(s.messages.len(), 7);
        for (i, msg) in s.messages.iter().enumerate() {
            let expected = if i % 2 == 0 { ChatRole::Model } else { ChatRole::User };
            assert_eq!(msg.role, expected, "message {} out of order", i);
        }
    }

    #[test]
    fn test_turn_failure_keeps_user_message_and_clears_loading() {
        let mut s = session();
        s.begin_start();
        s.complete(Ok("intro".to_string()));

        s.input = "nc -v 10.0.0.1 80".to_string();
        s.begin_submit();
        s.complete(Err(anyhow!("timeout")));

        assert!(!s.loading);
        assert_eq!(s.messages.len(), 3);
        // User message is not rolled back
        assert_eq!(s.messages[1].role, ChatRole::User);
        assert!(s.messages[2].is_error);
        assert_eq!(s.messages[2].text, TURN_FAILURE_NOTICE);

        // Session stays usable after a failure
        s.input = "retry".to_string();
        assert!(s.begin_submit().is_some());
    }

    #[test]
    fn test_scroll_clamps_and_tracks_bottom() {
        let mut s = session();
        s.total_chat_lines = 30;
        s.chat_height = 10;

        s.scroll_to_bottom();
        assert_eq!(s.scroll, 20);
        assert!(s.follow_bottom);

        s.scroll_up();
        assert_eq!(s.scroll, 19);
        assert!(!s.follow_bottom);

        s.scroll = 20;
        s.scroll_down();
        assert_eq!(s.scroll, 20);
        assert!(s.follow_bottom);
    }
}
