use serde::Deserialize;
use validator::Validate;

/// Query string the provider sends back to `/callback`.
#[derive(Debug, Deserialize, Validate)]
pub struct CallbackQuery {
    #[validate(length(min = 1, max = 2048))]
    pub code: Option<String>,
    #[validate(length(max = 256))]
    pub state: Option<String>,
    pub error: Option<String>,
}
