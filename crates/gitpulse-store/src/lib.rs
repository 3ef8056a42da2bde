// SQLite-backed sink for committed activity collections
// Keeps fetched data around between runs without a separate process

pub mod store;

pub use store::SqliteSink;
