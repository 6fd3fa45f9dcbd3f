//! The music assistant conversation
//!
//! A `ConversationClient` owns the message history. Only one request may be
//! in flight at a time: the HTTP exchange runs on a spawned task, and its
//! result is applied to the history by whoever owns the client when they call
//! [`ConversationClient::complete`].

use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::ai::{ChatRequest, ChatTransport};
use crate::catalog::{catalog_prompt_listing, Track, TrackCatalog};
use crate::error::ChatError;
use crate::extractor::{RecommendationExtractor, TieBreak};
use crate::playback::PlaybackSink;
use crate::state::{ChatMessage, Conversation};

pub const DEFAULT_PERSONA: &str = "你是一个专业的音乐助手，你的工作是帮助用户了解音乐知识、推荐音乐、提供音乐背景信息等。如果用户要求推荐音乐，请根据他们的喜好和情绪推荐具体的歌曲。回答中请明确标出歌曲名，格式为【歌曲名】，以便系统识别并播放。";

pub const CATALOG_HEADER: &str = "\n可用的音乐列表: ";

pub const WELCOME_MESSAGE: &str = "你好！我是你的音乐管家。我可以帮你了解音乐知识、推荐音乐，或者帮你找到符合心情的歌曲。有什么我可以帮你的吗？";

pub const SUGGESTED_QUESTIONS: [&str; 6] = [
    "今天推荐我听什么歌？",
    "今天是下雨天，有什么歌曲推荐？",
    "有什么适合工作时听的歌？",
    "推荐一首舒缓的歌曲",
    "推荐一首适合运动的歌曲",
    "最近有什么流行的新歌？",
];

#[derive(Debug, Clone)]
pub struct AssistantSettings {
    pub model: String,
    pub temperature: f64,
    pub persona: String,
    /// Cap on stored messages; `None` keeps everything
    pub max_history: Option<usize>,
    pub tie_break: TieBreak,
}

impl Default for AssistantSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            temperature: 0.7,
            persona: DEFAULT_PERSONA.to_string(),
            max_history: None,
            tie_break: TieBreak::default(),
        }
    }
}

/// A successful exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantReply {
    pub content: String,
    /// Resolved file names in the order the reply mentions them
    pub recommendations: Vec<String>,
    /// The track handed to the player, if any
    pub played: Option<String>,
}

pub struct ConversationClient {
    transport: Arc<dyn ChatTransport>,
    catalog: Arc<dyn TrackCatalog>,
    player: Option<Arc<dyn PlaybackSink>>,
    settings: AssistantSettings,
    extractor: RecommendationExtractor,
    history: Conversation,
    pending: Option<JoinHandle<Result<String, ChatError>>>,
}

impl ConversationClient {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        catalog: Arc<dyn TrackCatalog>,
        settings: AssistantSettings,
    ) -> Self {
        Self {
            transport,
            catalog,
            player: None,
            extractor: RecommendationExtractor::new(settings.tie_break),
            history: Conversation::with_cap(settings.max_history),
            settings,
            pending: None,
        }
    }

    pub fn with_player(mut self, player: Arc<dyn PlaybackSink>) -> Self {
        self.player = Some(player);
        self
    }

    pub fn history(&self) -> &Conversation {
        &self.history
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    /// True once the in-flight request has finished and `complete` will not wait
    pub fn reply_ready(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| h.is_finished())
    }

    /// Current catalog snapshot. A failing catalog counts as empty.
    pub fn available_tracks(&self) -> Vec<Track> {
        match self.catalog.list_tracks() {
            Ok(tracks) => tracks,
            Err(e) => {
                warn!("Failed to list music files: {}", e);
                Vec::new()
            }
        }
    }

    pub fn system_message(&self, tracks: &[Track]) -> ChatMessage {
        ChatMessage::system(format!(
            "{}{}{}",
            self.settings.persona,
            CATALOG_HEADER,
            catalog_prompt_listing(tracks)
        ))
    }

    /// System message followed by the full history
    pub fn build_request(&self) -> ChatRequest {
        let tracks = self.available_tracks();
        let mut messages = Vec::with_capacity(self.history.len() + 1);
        messages.push(self.system_message(&tracks));
        messages.extend(self.history.iter().cloned());

        ChatRequest {
            model: self.settings.model.clone(),
            temperature: self.settings.temperature,
            messages,
        }
    }

    /// Record the user message and dispatch the request on a background task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn begin_send(&mut self, user_text: &str) -> Result<(), ChatError> {
        let text = user_text.trim();
        if text.is_empty() {
            return Err(ChatError::Validation);
        }
        if self.pending.is_some() {
            return Err(ChatError::Busy);
        }

        self.history.push(ChatMessage::user(text));
        let request = self.build_request();
        debug!(history = self.history.len(), "Dispatching assistant request");

        let transport = Arc::clone(&self.transport);
        self.pending = Some(tokio::spawn(async move {
            transport.complete(&request).await
        }));
        Ok(())
    }

    /// Wait for the in-flight request and apply its outcome.
    ///
    /// Returns `None` when nothing is pending. Cancel safe: if this future is
    /// dropped before the request finishes, the request stays pending and a
    /// later call picks it up.
    pub async fn complete(&mut self) -> Option<Result<AssistantReply, ChatError>> {
        let handle = self.pending.as_mut()?;
        let joined = handle.await;
        self.pending = None;

        let outcome = match joined {
            Ok(result) => result,
            Err(e) => Err(ChatError::Transport(format!("request task failed: {}", e))),
        };

        Some(match outcome {
            Ok(content) => Ok(self.apply_reply(content)),
            Err(e) => {
                warn!("Assistant request failed: {}", e);
                Err(e)
            }
        })
    }

    pub async fn send(&mut self, user_text: &str) -> Result<AssistantReply, ChatError> {
        self.begin_send(user_text)?;
        match self.complete().await {
            Some(result) => result,
            None => Err(ChatError::Transport("request was not dispatched".to_string())),
        }
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }

    fn apply_reply(&mut self, content: String) -> AssistantReply {
        self.history.push(ChatMessage::assistant(content.clone()));

        let tracks = self.available_tracks();
        let recommendations = self.extractor.extract(&content, &tracks);
        let played = recommendations
            .first()
            .and_then(|file_name| self.try_play(file_name));

        AssistantReply {
            content,
            recommendations,
            played,
        }
    }

    fn try_play(&self, file_name: &str) -> Option<String> {
        let player = self.player.as_ref()?;
        match player.play_track(file_name) {
            Ok(()) => {
                info!(track = file_name, "Playing recommended song");
                Some(file_name.to_string())
            }
            Err(e) => {
                warn!("Failed to play recommended song {}: {:#}", file_name, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StaticCatalog;
    use crate::state::ChatRole;
    use async_trait::async_trait;

    struct Echo;

    #[async_trait]
    impl ChatTransport for Echo {
        async fn complete(&self, request: &ChatRequest) -> Result<String, ChatError> {
            Ok(format!("echo {}", request.messages.len()))
        }
    }

    struct Slow;

    #[async_trait]
    impl ChatTransport for Slow {
        async fn complete(&self, _request: &ChatRequest) -> Result<String, ChatError> {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            Ok("late".to_string())
        }
    }

    fn client(tracks: &[&str]) -> ConversationClient {
        ConversationClient::new(
            Arc::new(Echo),
            Arc::new(StaticCatalog::new(tracks.iter().copied())),
            AssistantSettings::default(),
        )
    }

    #[test]
    fn test_system_message_lists_tracks() {
        let client = client(&["晴天.mp3", "夜曲-周杰伦.mp3"]);
        let request = client.build_request();
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.messages[0].role, ChatRole::System);
        assert_eq!(
            request.messages[0].content,
            format!("{}\n可用的音乐列表: 晴天, 夜曲-周杰伦", DEFAULT_PERSONA)
        );
        assert_eq!(request.model, "gpt-4o");
        assert_eq!(request.temperature, 0.7);
    }

    #[test]
    fn test_blank_input_rejected_without_append() {
        let mut client = client(&[]);
        assert!(matches!(client.begin_send("   "), Err(ChatError::Validation)));
        assert!(client.history().is_empty());
    }

    #[tokio::test]
    async fn test_second_send_while_pending_is_busy() {
        let mut client = client(&[]);
        client.begin_send("first").unwrap();
        assert!(client.is_busy());
        assert!(matches!(client.begin_send("second"), Err(ChatError::Busy)));
        assert_eq!(client.history().len(), 1);

        let reply = client.complete().await.unwrap().unwrap();
        assert_eq!(reply.content, "echo 2");
        assert!(!client.is_busy());
        assert_eq!(client.history().len(), 2);
    }

    #[tokio::test]
    async fn test_complete_without_pending_is_none() {
        let mut client = client(&[]);
        assert!(client.complete().await.is_none());
    }

    #[tokio::test]
    async fn test_input_is_trimmed() {
        let mut client = client(&[]);
        client.send("  hello \n").await.unwrap();
        assert_eq!(client.history().iter().next().unwrap().content, "hello");
    }

    #[tokio::test]
    async fn test_abandoned_complete_keeps_request_pending() {
        let mut client = ConversationClient::new(
            Arc::new(Slow),
            Arc::new(StaticCatalog::default()),
            AssistantSettings::default(),
        );
        client.begin_send("hi").unwrap();

        let waited =
            tokio::time::timeout(std::time::Duration::from_millis(1), client.complete()).await;
        assert!(waited.is_err());
        assert!(client.is_busy());
        assert!(matches!(client.begin_send("again"), Err(ChatError::Busy)));

        let reply = client.complete().await.unwrap().unwrap();
        assert_eq!(reply.content, "late");
        assert!(!client.is_busy());
        assert_eq!(client.history().len(), 2);
    }
}
