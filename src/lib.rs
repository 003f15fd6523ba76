//! # comicbot
//!
//! Fetches webcomics from xkcd, turnoff.us and monkeyuser.com and explains
//! them with a vision LLM.
//!
//! ## Features
//!
//! - **One contract, three sites**: every site scraper answers random, latest and search requests
//! - **Animated page escape**: gif placeholder pages are skipped, with a bounded number of hops
//! - **Search**: Google Custom Search or DuckDuckGo, scoped to the comic's domain
//! - **Explanations**: structured `ComicAnalysis` from a Groq-hosted Llama 4 vision model
//! - **Daily posts**: a random comic per site delivered to a chat webhook

pub mod agent;
pub mod analysis;
pub mod comic;
pub mod config;
pub mod http;
pub mod post;
pub mod schedule;
pub mod scraper;
pub mod search;

pub use analysis::Description;
pub use comic::{ComicRecord, ComicSource};
pub use config::{Config, Settings};
pub use scraper::{Scraper, SearchOutcome};
