//! MailMind: prioritized summaries of the most recent inbox messages.

pub mod auth;
pub mod config;
pub mod error;
pub mod llm;
pub mod mail;
pub mod pipeline;
pub mod retry;
pub mod sink;
pub mod summary;
