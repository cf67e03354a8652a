//! EAIsy Mail: visitor questionnaire to bilingual email, delivered to one owner.

pub mod api;
pub mod config;
pub mod delivery;
pub mod error;
pub mod generation;
pub mod llm;
pub mod template;
