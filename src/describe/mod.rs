//! Frame descriptions from a remote vision-language model.

pub mod chat;
pub mod prompt;
pub mod service;

pub use chat::ChatCompletionsDescriber;
pub use service::{
    DescriptionFailure, DescriptionMode, DescriptionRequest, DescriptionResult,
    DescriptionService, RecordedRequest, ScriptedDescriber,
};
