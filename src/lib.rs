//! # askdocs
//!
//! Retrieval-augmented question answering over a scraped documentation
//! corpus, with a Telegram chat front end.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────────┐   ┌──────────────┐
//! │  Corpus  │──▶│ Chunk + Embed │──▶│    SQLite    │
//! │ text/*.txt│  │  (index)      │   │ chunks+meta  │
//! └──────────┘   └───────────────┘   └──────┬───────┘
//!                                           │
//!                      ┌────────────────────┤
//!                      ▼                    ▼
//!                ┌───────────┐       ┌────────────┐
//!                │ askdocs   │       │  Telegram  │
//!                │ ask (RAG) │       │  /chat bot │
//!                └───────────┘       └────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! askdocs init                         # create database
//! askdocs scrape                       # load text files into the scraped table
//! askdocs index                        # chunk + embed into the retrieval table
//! askdocs ask "What is the DOM?"       # answer from retrieved context
//! askdocs bot                          # run the Telegram front end
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`logging`] | tracing subscriber setup |
//! | [`loader`] | Corpus directory loader |
//! | [`tokenizer`] | cl100k token counter |
//! | [`embedding`] | OpenAI embedding client |
//! | [`completion`] | OpenAI chat completion client |
//! | [`index`] | Scrape and index pipeline |
//! | [`table`] | Scraped and retrieval table persistence |
//! | [`ask`] | Question answering commands |
//! | [`bot`] | Chat command handling and per-session history |
//! | [`telegram`] | Telegram Bot API transport |
//! | [`stats`] | Database summary |
//! | [`export`] | JSON export of the retrieval table |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod ask;
pub mod bot;
pub mod completion;
pub mod config;
pub mod db;
pub mod embedding;
pub mod export;
pub mod index;
pub mod loader;
pub mod logging;
pub mod migrate;
pub mod stats;
pub mod table;
pub mod telegram;
pub mod tokenizer;
