//! ASO keyword consolidation and title/subtitle generation.
//!
//! Keyword exports are merged ([`ingest`]), narrowed by volume and difficulty
//! ([`filter`]), reduced to a ranked word list ([`words`]) and handed to a chat
//! model that proposes App Store titles and subtitles ([`generate`]). Each
//! proposal is then scored by how much of the keyword universe it covers
//! ([`score`]). [`pipeline`] ties the stages together.

pub mod error;
pub mod export;
pub mod filter;
pub mod generate;
pub mod ingest;
pub mod llm;
pub mod model;
pub mod pipeline;
pub mod score;
pub mod settings;
pub mod utils;
pub mod words;
