use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QuickplayRequest {
    pub tc: String,
    #[serde(default)]
    pub rated: bool,
}
