pub mod baby;
pub mod chat;
pub mod questionnaire;
pub mod user;

pub use baby::{BabyRecord, LifeStage};
pub use chat::ChatMessageRecord;
pub use questionnaire::{QuestionnaireOverviewRecord, QuestionnaireRecord};
pub use user::{Role, UserRecord};
