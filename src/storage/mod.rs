// Storage module for the extension's local key-value storage.
// Provides the store adapters and the persisted layout of the session.

pub mod layout;
pub mod paths;
pub mod store;

pub use layout::{
    Credential, SESSION_KEYS, load_session, load_token, record_selection, save_session,
    session_from_record, session_record,
};
pub use store::{FileStore, KeyValueStore, MemoryStore, Record};
