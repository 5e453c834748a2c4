//! cardwise-catalog: card catalog loading, the merchant category directory,
//! and purchase statement ingestion.

pub mod cards;
pub mod mcc;
pub mod statement;

pub use cards::CardCatalog;
pub use mcc::{MccDirectory, MccEntry};
pub use statement::{parse_purchases, parse_purchases_csv, summarize, StatementReport};
