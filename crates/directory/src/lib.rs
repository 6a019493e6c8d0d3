//! Recipient directory — CRUD store and CSV import/export for the three
//! addressable recipient kinds (students, guests, professors).

pub mod csv_io;
pub mod store;

pub use csv_io::{ImportOutcome, ImportReport, RowError};
pub use store::{DirectoryStore, RecipientDraft, RecipientSelection};
