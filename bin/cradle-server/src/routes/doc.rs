use crate::routes::{auth, babies, chat, health, questionnaire, settings};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(info(
    title = "cradle-server",
    description = "cradle-server API",
    version = "0.1.0",
))]
pub struct ApiDoc;

pub fn get_docs() -> utoipa::openapi::OpenApi {
    let mut root = ApiDoc::openapi();
    root.merge(health::HealthApi::openapi());
    root.merge(auth::AuthApi::openapi());
    root.merge(babies::BabiesApi::openapi());
    root.merge(questionnaire::QuestionnaireApi::openapi());
    root.merge(chat::ChatApi::openapi());
    root.merge(settings::SettingsApi::openapi());
    root
}
