pub mod cli;
pub mod csv_codec;
pub mod error;
pub mod front;
pub mod migration;
pub mod models;
pub mod settings;
pub mod store;

pub use error::{EntryError, Result};
pub use models::{Entry, EntryPayload};
pub use store::EntryStore;
