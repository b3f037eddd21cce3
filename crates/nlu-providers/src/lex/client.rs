//! Thin REST client for the Lex model-building and runtime APIs.
//!
//! Each method performs exactly one signed HTTP request; retries and polling
//! belong to the training orchestrators.

use super::settings::LexSettings;
use super::sigv4::{CanonicalParts, Signer};
use crate::http::{check_status, network_error, read_json};
use base64::Engine;
use chrono::Utc;
use nlu_abstraction::{RemoteError, RemoteErrorKind};
use reqwest::{Client, Method, Response, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

pub(crate) const SERVICE: &str = "lex";

/// Version qualifier of the working copy of a bot.
pub const LATEST: &str = "$LATEST";

#[derive(Debug, Clone, Deserialize)]
pub struct NamedResource {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResponse {
    #[serde(default)]
    pub import_id: Option<String>,
    #[serde(default)]
    pub import_status: String,
    #[serde(default)]
    pub failure_reason: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostTextResponse {
    #[serde(default)]
    pub intent_name: Option<String>,
    #[serde(default)]
    pub slots: Option<HashMap<String, Option<String>>>,
}

#[derive(Debug, Deserialize)]
struct BotsPage {
    #[serde(default)]
    bots: Vec<NamedResource>,
}

#[derive(Debug, Deserialize)]
struct AliasesPage {
    #[serde(default, rename = "BotAliases")]
    bot_aliases: Vec<NamedResource>,
}

enum Api {
    Models,
    Runtime,
}

#[derive(Debug, Clone)]
pub struct LexClient {
    settings: LexSettings,
    http: Client,
}

impl LexClient {
    pub fn new(settings: LexSettings) -> Self {
        let http = Client::builder().timeout(Duration::from_secs(60)).build().unwrap_or_else(|_| Client::new());
        Self { settings, http }
    }

    pub fn settings(&self) -> &LexSettings {
        &self.settings
    }

    /// Bots whose name contains `name_contains`.
    pub async fn get_bots(&self, name_contains: &str) -> Result<Vec<NamedResource>, RemoteError> {
        let response = self.send(Method::GET, Api::Models, "/bots/", &[("nameContains", name_contains)], None).await?;
        Ok(read_json::<BotsPage>(SERVICE, response).await?.bots)
    }

    pub async fn get_bot(&self, bot_name: &str, version: &str) -> Result<Value, RemoteError> {
        let path = format!("/bots/{}/versions/{}", encode(bot_name), encode(version));
        let response = self.send(Method::GET, Api::Models, &path, &[], None).await?;
        read_json(SERVICE, response).await
    }

    /// Creates or updates the `$LATEST` version of a bot.
    pub async fn put_bot(&self, bot_name: &str, body: &Value) -> Result<Value, RemoteError> {
        let path = format!("/bots/{}/versions/{}", encode(bot_name), encode(LATEST));
        let response = self.send(Method::PUT, Api::Models, &path, &[], Some(body)).await?;
        read_json(SERVICE, response).await
    }

    pub async fn delete_bot(&self, bot_name: &str) -> Result<(), RemoteError> {
        let path = format!("/bots/{}", encode(bot_name));
        self.send(Method::DELETE, Api::Models, &path, &[], None).await?;
        Ok(())
    }

    /// Starts a bot import that overwrites `$LATEST` with the zipped archive.
    pub async fn start_import(&self, archive: &[u8]) -> Result<ImportResponse, RemoteError> {
        let body = json!({
            "payload": base64::engine::general_purpose::STANDARD.encode(archive),
            "resourceType": "BOT",
            "mergeStrategy": "OVERWRITE_LATEST",
        });
        let response = self.send(Method::POST, Api::Models, "/imports/", &[], Some(&body)).await?;
        read_json(SERVICE, response).await
    }

    pub async fn get_import(&self, import_id: &str) -> Result<ImportResponse, RemoteError> {
        let path = format!("/imports/{}", encode(import_id));
        let response = self.send(Method::GET, Api::Models, &path, &[], None).await?;
        read_json(SERVICE, response).await
    }

    pub async fn get_bot_aliases(&self, bot_name: &str, name_contains: &str) -> Result<Vec<NamedResource>, RemoteError> {
        let path = format!("/bots/{}/aliases/", encode(bot_name));
        let response = self.send(Method::GET, Api::Models, &path, &[("nameContains", name_contains)], None).await?;
        Ok(read_json::<AliasesPage>(SERVICE, response).await?.bot_aliases)
    }

    pub async fn put_bot_alias(&self, bot_name: &str, alias: &str, bot_version: &str) -> Result<(), RemoteError> {
        let path = format!("/bots/{}/aliases/{}", encode(bot_name), encode(alias));
        let body = json!({ "botVersion": bot_version });
        self.send(Method::PUT, Api::Models, &path, &[], Some(&body)).await?;
        Ok(())
    }

    pub async fn delete_bot_alias(&self, bot_name: &str, alias: &str) -> Result<(), RemoteError> {
        let path = format!("/bots/{}/aliases/{}", encode(bot_name), encode(alias));
        self.send(Method::DELETE, Api::Models, &path, &[], None).await?;
        Ok(())
    }

    /// Sends one text utterance to the published alias.
    pub async fn post_text(&self, user_id: &str, text: &str) -> Result<PostTextResponse, RemoteError> {
        let path = format!(
            "/bot/{}/alias/{}/user/{}/text",
            encode(&self.settings.bot_name),
            encode(&self.settings.bot_alias),
            encode(user_id)
        );
        let body = json!({ "inputText": text });
        let response = self.send(Method::POST, Api::Runtime, &path, &[], Some(&body)).await?;
        read_json(SERVICE, response).await
    }

    async fn send(
        &self,
        method: Method,
        api: Api,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> Result<Response, RemoteError> {
        let base = match api {
            Api::Models => self.settings.models_endpoint(),
            Api::Runtime => self.settings.runtime_endpoint(),
        };
        let mut url = Url::parse(&format!("{}{path}", base.trim_end_matches('/')))
            .map_err(|e| RemoteError::new(SERVICE, RemoteErrorKind::Other, format!("Invalid endpoint: {e}")))?;
        if !query.is_empty() {
            let query = query.iter().map(|(k, v)| format!("{}={}", encode(k), encode(v))).collect::<Vec<_>>().join("&");
            url.set_query(Some(&query));
        }

        let payload = match body {
            Some(body) => serde_json::to_vec(body)
                .map_err(|e| RemoteError::new(SERVICE, RemoteErrorKind::Other, format!("Failed to encode request: {e}")))?,
            None => Vec::new(),
        };

        let content_type = [("content-type", "application/json")];
        let parts = CanonicalParts { method: method.as_str(), url: &url, headers: &content_type, body: &payload };
        let signed = Signer::new(&self.settings.credentials, &self.settings.region, SERVICE)
            .sign(&parts, Utc::now())
            .map_err(|e| RemoteError::new(SERVICE, RemoteErrorKind::Other, e))?;

        debug!(method = %method, url = %url, "Sending Lex request");

        let mut request = self.http.request(method, url).header("content-type", "application/json").body(payload);
        for (name, value) in signed {
            request = request.header(name, value);
        }

        let response = request.send().await.map_err(|e| network_error(SERVICE, &e))?;
        check_status(SERVICE, response).await
    }
}

fn encode(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}
