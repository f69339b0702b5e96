use std::future::Future;

use serde::Serialize;
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Error)]
pub enum RegistryError {
    #[error("registry request failed: {0}")]
    Request(String),

    #[error("registry rejected record: {0}")]
    Rejected(String),
}

/// Off-chain record of a launched token, stored by the content backend
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRecord {
    pub token_mint: String,
    pub creator: String,
    pub name: String,
    pub symbol: String,
    pub metadata_uri: String,
    pub description: Option<String>,
    pub curve_state: String,
    pub token_vault: String,
    pub create_signature: String,
    pub mint_signature: String,
    pub initialize_signature: String,
}

/// Persistence collaborator called once after the curve is live
pub trait ProjectRegistry: Send + Sync + 'static {
    fn create_project_record(
        &self,
        record: &ProjectRecord,
    ) -> impl Future<Output = Result<(), RegistryError>> + Send;
}

/// JSON-over-HTTP registry
#[derive(Clone, Debug)]
pub struct HttpProjectRegistry {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpProjectRegistry {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

impl ProjectRegistry for HttpProjectRegistry {
    async fn create_project_record(&self, record: &ProjectRecord) -> Result<(), RegistryError> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(record)
            .send()
            .await
            .map_err(|e| RegistryError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RegistryError::Rejected(format!("{}: {}", status, body)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_serializes_camel_case() {
        let record = ProjectRecord {
            token_mint: "mint".into(),
            creator: "creator".into(),
            name: "Doge".into(),
            symbol: "DOGE".into(),
            metadata_uri: "ipfs://meta".into(),
            description: None,
            curve_state: "curve".into(),
            token_vault: "vault".into(),
            create_signature: "a".into(),
            mint_signature: "b".into(),
            initialize_signature: "c".into(),
        };
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["tokenMint"], "mint");
        assert_eq!(json["metadataUri"], "ipfs://meta");
        assert!(json["description"].is_null());
    }
}
