//! Request types for every tool. Field docs double as the JSON schema shown to clients.

pub(crate) mod clear;
pub(crate) mod delete;
pub(crate) mod edit;
pub(crate) mod list;
pub(crate) mod multi_edit;
pub(crate) mod multi_read;
pub(crate) mod read;
pub(crate) mod search;
pub(crate) mod write;
