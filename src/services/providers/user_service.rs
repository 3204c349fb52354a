/// User directory provider backed by the user service
use std::time::Duration;

use reqwest::Client as HttpClient;

use crate::{
    error::{AppError, AppResult},
    services::{
        normalize::{extract_list, value_to_string},
        providers::UserDirectory,
    },
};

const USERS_PATH: &str = "/api/users";
const USER_ID_KEYS: &[&str] = &["id", "user_id", "userId"];

#[derive(Clone)]
pub struct UserServiceClient {
    http_client: HttpClient,
    base_url: String,
}

impl UserServiceClient {
    pub fn new(base_url: String, timeout: Duration) -> AppResult<Self> {
        let http_client = HttpClient::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait::async_trait]
impl UserDirectory for UserServiceClient {
    async fn fetch_user_ids(&self) -> AppResult<Vec<String>> {
        let url = format!("{}{}", self.base_url, USERS_PATH);
        let response = self.http_client.get(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::warn!(status = %status, "User service returned non-success status");
            return Err(AppError::ExternalApi(format!(
                "User service returned status {}",
                status
            )));
        }

        let payload: serde_json::Value = response.json().await?;
        let user_ids: Vec<String> = extract_list(&payload)
            .map(|users| {
                users
                    .iter()
                    .filter_map(|user| {
                        let record = user.as_object()?;
                        USER_ID_KEYS
                            .iter()
                            .filter_map(|key| record.get(*key))
                            .find_map(value_to_string)
                    })
                    .collect()
            })
            .unwrap_or_default();

        tracing::info!(count = user_ids.len(), "Fetched users from user service");

        Ok(user_ids)
    }
}
