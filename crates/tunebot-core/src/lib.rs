pub mod ai;
pub mod assistant;
pub mod catalog;
pub mod config;
pub mod error;
pub mod extractor;
pub mod playback;
pub mod provider;
pub mod recognition;
pub mod recognizer;
pub mod state;

// Re-export main types for convenience
pub use ai::{ChatRequest, ChatTransport, OpenAIClient};
pub use assistant::{AssistantReply, AssistantSettings, ConversationClient};
pub use catalog::{DirCatalog, StaticCatalog, Track, TrackCatalog};
pub use config::Config;
pub use error::{CatalogError, ChatError, RecognizerError};
pub use extractor::{RecommendationExtractor, TieBreak};
pub use playback::{CommandPlayer, NullPlayer, PlaybackSink};
pub use provider::Provider;
pub use recognition::{reduce, RecognitionCandidate, RecognitionOutcome, RecognitionSummary};
pub use recognizer::{RecognitionEngine, RecognitionSession, RecognizerConfig, RecognizerState};
pub use state::{ChatMessage, ChatRole, Conversation};
