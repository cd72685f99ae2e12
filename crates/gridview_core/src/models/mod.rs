//! Data models shared by the buffer, the matching engine and record sources.

pub mod field;
pub mod record;
pub mod view;
