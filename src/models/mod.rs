//! Command and response models for the command shell
//!
//! Commands are parsed from text lines; responses are serialized as JSON.

pub mod commands;
pub mod responses;

// Re-export commonly used types
pub use commands::{Command, MAX_KEY_LENGTH};
pub use responses::{
    DeleteResponse, ErrorResponse, ExpireResponse, GetResponse, HasResponse, KeysResponse,
    MessageResponse, Response, SetResponse, StatsResponse, TtlResponse,
};
