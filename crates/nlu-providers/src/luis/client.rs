//! REST client for the LUIS v2 authoring and prediction APIs.

use super::settings::LuisSettings;
use crate::http::{check_status, network_error, read_json};
use nlu_abstraction::{RemoteError, RemoteErrorKind};
use reqwest::{Client, Method, RequestBuilder};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

pub(crate) const SERVICE: &str = "luis";

const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";
const AUTHORING_PATH: &str = "/luis/api/v2.0/apps";
const PREDICTION_PATH: &str = "/luis/v2.0/apps";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrainResponse {
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelTrainingInfo {
    #[serde(default)]
    pub model_id: String,
    pub details: ModelTrainingDetails,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelTrainingDetails {
    pub status: String,
    #[serde(default)]
    pub failure_reason: Option<String>,
}

/// Prediction response. Only the fields that are mapped back are typed.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LuisResult {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub top_scoring_intent: Option<IntentModel>,
    #[serde(default)]
    pub entities: Vec<EntityModel>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IntentModel {
    pub intent: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityModel {
    pub entity: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub start_index: usize,
    #[serde(default)]
    pub end_index: usize,
    #[serde(default)]
    pub resolution: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct LuisClient {
    settings: LuisSettings,
    http: Client,
}

impl LuisClient {
    pub fn new(settings: LuisSettings) -> Self {
        let http = Client::builder().timeout(Duration::from_secs(60)).build().unwrap_or_else(|_| Client::new());
        Self { settings, http }
    }

    pub fn settings(&self) -> &LuisSettings {
        &self.settings
    }

    /// Creates an app and returns its id.
    pub async fn create_app(&self, name: &str) -> Result<String, RemoteError> {
        let body = json!({ "name": name, "culture": "en-us" });
        let response = self.authoring(Method::POST, "/")?.json(&body).send().await;
        read_json(SERVICE, response.map_err(|e| network_error(SERVICE, &e))?).await
    }

    pub async fn get_version(&self, app_id: &str, version_id: &str) -> Result<Value, RemoteError> {
        let path = format!("/{app_id}/versions/{}/", encode(version_id));
        let response = self.authoring(Method::GET, &path)?.send().await;
        read_json(SERVICE, response.map_err(|e| network_error(SERVICE, &e))?).await
    }

    pub async fn import_version(&self, app_id: &str, version_id: &str, app: &Value) -> Result<(), RemoteError> {
        let path = format!("/{app_id}/versions/import");
        let response = self.authoring(Method::POST, &path)?.query(&[("versionId", version_id)]).json(app).send().await;
        check_status(SERVICE, response.map_err(|e| network_error(SERVICE, &e))?).await?;
        Ok(())
    }

    pub async fn train(&self, app_id: &str, version_id: &str) -> Result<TrainResponse, RemoteError> {
        let path = format!("/{app_id}/versions/{}/train", encode(version_id));
        let response = self.authoring(Method::POST, &path)?.send().await;
        read_json(SERVICE, response.map_err(|e| network_error(SERVICE, &e))?).await
    }

    pub async fn training_status(&self, app_id: &str, version_id: &str) -> Result<Vec<ModelTrainingInfo>, RemoteError> {
        let path = format!("/{app_id}/versions/{}/train", encode(version_id));
        let response = self.authoring(Method::GET, &path)?.send().await;
        read_json(SERVICE, response.map_err(|e| network_error(SERVICE, &e))?).await
    }

    pub async fn publish(&self, app_id: &str, version_id: &str) -> Result<(), RemoteError> {
        let body = json!({
            "versionId": version_id,
            "isStaging": self.settings.is_staging,
            "region": self.settings.endpoint_region,
        });
        let path = format!("/{app_id}/publish");
        let response = self.authoring(Method::POST, &path)?.json(&body).send().await;
        check_status(SERVICE, response.map_err(|e| network_error(SERVICE, &e))?).await?;
        Ok(())
    }

    pub async fn delete_app(&self, app_id: &str) -> Result<(), RemoteError> {
        let response = self.authoring(Method::DELETE, &format!("/{app_id}"))?.send().await;
        check_status(SERVICE, response.map_err(|e| network_error(SERVICE, &e))?).await?;
        Ok(())
    }

    /// Queries the published app.
    pub async fn query(&self, app_id: &str, text: &str) -> Result<LuisResult, RemoteError> {
        let url = format!("{}{PREDICTION_PATH}/{app_id}", self.settings.prediction_endpoint().trim_end_matches('/'));
        let mut request = self.http.get(&url).header(SUBSCRIPTION_KEY_HEADER, self.settings.endpoint_key()).query(&[("q", text)]);
        if self.settings.is_staging {
            request = request.query(&[("staging", "true")]);
        }

        debug!(%url, "Querying LUIS");
        let response = request.send().await.map_err(|e| network_error(SERVICE, &e))?;
        read_json(SERVICE, response).await
    }

    fn authoring(&self, method: Method, path: &str) -> Result<RequestBuilder, RemoteError> {
        let (key, endpoint) = self
            .settings
            .authoring()
            .map_err(|e| RemoteError::new(SERVICE, RemoteErrorKind::Unauthorized, e.to_string()))?;
        let url = format!("{}{AUTHORING_PATH}{path}", endpoint.trim_end_matches('/'));
        debug!(method = %method, %url, "Sending LUIS authoring request");
        Ok(self.http.request(method, url).header(SUBSCRIPTION_KEY_HEADER, key))
    }
}

fn encode(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}
