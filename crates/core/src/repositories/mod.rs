//! Repository management modules.
//!
//! Repositories own an in-memory collection and write it through to a [`KeyValueStore`] on every
//! mutation.
//!
//! [`KeyValueStore`]: crate::storage::KeyValueStore

pub mod workspaces;
