// Sniffer components
pub mod decoder; // jsonParsed transaction detail -> ParsedTransaction
pub mod fetcher; // signature listing, detail lookup, oldest-first ordering

// Re-export commonly used types
pub use decoder::{decode_transaction, DecodeError};
pub use fetcher::{pending_signatures, TransactionFetcher};
