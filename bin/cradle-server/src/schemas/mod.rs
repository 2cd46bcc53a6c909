//! Request / response types for the public API, grouped by route module.

pub mod auth;
pub mod babies;
pub mod chat;
pub mod questionnaire;
pub mod settings;
