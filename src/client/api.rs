use std::time::Duration;

use anyhow::Context;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

use crate::auth::dto::{
    LoginRequest, MessageResponse, PublicUser, RegisterRequest, RegisteredResponse, TokenResponse,
};
use crate::tasks::dto::{CreateTaskRequest, TaskResponse, UpdateTaskRequest};

/// Thin typed wrapper over the HTTP API.
pub struct ApiClient {
    http: Client,
    base: String,
}

impl ApiClient {
    pub fn new(base: &str) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .context("build http client")?;
        Ok(Self {
            http,
            base: base.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> anyhow::Result<T> {
        let resp = req.send().await.context("Failed to connect to server")?;
        let status = resp.status();
        let text = resp.text().await.context("Failed to read response")?;
        if !status.is_success() {
            return Err(server_error(status, &text));
        }
        serde_json::from_str(&text).context("Failed to parse response")
    }

    pub async fn register(&self, body: &RegisterRequest) -> anyhow::Result<RegisteredResponse> {
        self.send(self.http.post(self.url("/user/register")).json(body)).await
    }

    pub async fn login(&self, body: &LoginRequest) -> anyhow::Result<TokenResponse> {
        self.send(self.http.post(self.url("/user/login")).json(body)).await
    }

    pub async fn logout(&self, token: &str) -> anyhow::Result<MessageResponse> {
        self.send(self.http.post(self.url("/user/logout")).bearer_auth(token))
            .await
    }

    pub async fn me(&self, token: &str) -> anyhow::Result<PublicUser> {
        self.send(self.http.get(self.url("/user/me")).bearer_auth(token))
            .await
    }

    pub async fn user(&self, id: Uuid) -> anyhow::Result<PublicUser> {
        self.send(self.http.get(self.url(&format!("/user/details/{id}"))))
            .await
    }

    pub async fn list_tasks(&self, token: &str) -> anyhow::Result<Vec<TaskResponse>> {
        self.send(self.http.get(self.url("/todos")).bearer_auth(token))
            .await
    }

    pub async fn get_task(&self, token: &str, id: Uuid) -> anyhow::Result<TaskResponse> {
        self.send(self.http.get(self.url(&format!("/todos/{id}"))).bearer_auth(token))
            .await
    }

    pub async fn create_task(&self, token: &str, title: &str) -> anyhow::Result<TaskResponse> {
        let body = CreateTaskRequest {
            title: Some(title.to_string()),
        };
        self.send(
            self.http
                .post(self.url("/todos"))
                .bearer_auth(token)
                .json(&body),
        )
        .await
    }

    pub async fn update_task(
        &self,
        token: &str,
        id: Uuid,
        body: &UpdateTaskRequest,
    ) -> anyhow::Result<TaskResponse> {
        self.send(
            self.http
                .put(self.url(&format!("/todos/{id}")))
                .bearer_auth(token)
                .json(body),
        )
        .await
    }

    pub async fn delete_task(&self, token: &str, id: Uuid) -> anyhow::Result<MessageResponse> {
        self.send(self.http.delete(self.url(&format!("/todos/{id}"))).bearer_auth(token))
            .await
    }
}

/// Builds `server returned <status>: <error>` from an error response.
fn server_error(status: StatusCode, body: &str) -> anyhow::Error {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_owned))
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                "Unknown error".to_string()
            } else {
                trimmed.to_string()
            }
        });
    anyhow::anyhow!("server returned {}: {}", status, message)
}
