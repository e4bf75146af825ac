//! Market feeds and trade journals for the ORB strategy.
//!
//! This crate provides:
//! - CSV replay and channel-backed market feeds
//! - CSV, in-memory and `PostgreSQL` trade recorders

pub mod channel_feed;
pub mod csv_feed;
pub mod fanout;
pub mod memory;
pub mod trade_journal;
pub mod trade_repo;

pub use channel_feed::ChannelFeed;
pub use csv_feed::CsvReplayFeed;
pub use fanout::FanoutRecorder;
pub use memory::MemoryTradeJournal;
pub use trade_journal::CsvTradeJournal;
pub use trade_repo::PgTradeRepository;
