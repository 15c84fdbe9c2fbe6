pub mod config;
pub mod figures;
pub mod llm;
pub mod pipeline;
pub mod ranking;
pub mod retry;
pub mod sources;
pub mod store;
pub mod twitter;
pub mod types;
pub mod utils;

pub use config::{AlphaXivConfig, ArxivConfig, BotConfig, HuggingFaceConfig, LlmConfig, TwitterConfig};
pub use figures::{FigureExtractor, NoFigures, PdfFigureExtractor};
pub use llm::{ChatSummarizer, ScriptedSummarizer, Summarizer};
pub use pipeline::{Bot, RunReport};
pub use ranking::RankedFeedSource;
pub use sources::alphaxiv::AlphaXivFeed;
pub use sources::arxiv::ArxivApiSource;
pub use sources::huggingface::HuggingFaceFeed;
pub use sources::{AbstractSource, StaticSource};
pub use store::{History, MemoryHistory, PostgresHistory};
pub use twitter::{Publisher, RecordingPublisher, TwitterClient};
pub use types::*;
