pub mod domain;
pub mod error;
pub mod prompts;
pub mod protocol;
