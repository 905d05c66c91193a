// API client module: the three calls of an upload.
//
// 1. `create_upload_slot` asks the GraphQL API for a signed URL.
// 2. `transfer_file` PUTs the raw bytes to that URL.
// 3. `confirm_upload` tells the API the bytes are there and gets the size.
//
// The client is blocking, like the rest of the CLI. Each call builds its
// own short-lived HTTP client, so nothing is shared between calls.

use crate::config::CredentialProvider;
use crate::error::{Result, UploadError};
use crate::format::bytes_to_size;
use crate::graphql::{create_authenticated_client, GraphQlClient, GRAPHQL_PATH};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::io::Write;
use tracing::{debug, info};

/// Host used when `TAPE_HOST` is not set.
pub const DEFAULT_HOST: &str = "https://tape.sh";

const CREATE_TAPE_MUTATION: &str = r#"
    mutation createTape($fileName: String!, $contentType: String, $metadata: TapeMetadataInput) {
      createTape(input: {
        fileName: $fileName
        contentType: $contentType
        metadata: $metadata
      }) {
        id
        url
        tapeUrl
      }
    }
"#;

const CONFIRM_TAPE_MUTATION: &str = r#"
    mutation confirmTape($id: String!) {
      confirmTape(id: $id) {
        fileSize
      }
    }
"#;

/// Where the bytes go and how to refer to them afterwards. Passed on
/// untouched: `url` is the PUT target and `id` the confirm argument.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UploadSlot {
    pub id: String,
    pub url: String,
    pub tape_url: String,
}

/// Reply of `confirmTape`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationResult {
    pub file_size: u64,
}

impl ConfirmationResult {
    /// Write the `File Size: ...` line shown after an upload.
    pub fn report<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        writeln!(out, "File Size: {}", bytes_to_size(self.file_size))
    }
}

/// Result of a successful PUT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferOutcome {
    pub status: StatusCode,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateTapeVariables<'a> {
    file_name: &'a str,
    content_type: &'a str,
    metadata: &'a Map<String, Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateTapeData {
    create_tape: UploadSlot,
}

#[derive(Serialize)]
struct ConfirmTapeVariables<'a> {
    id: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfirmTapeData {
    confirm_tape: ConfirmationResult,
}

/// Entry point for the upload protocol. Holds the GraphQL endpoint and
/// the credential source; the token itself is read again on every call.
pub struct ApiClient<C> {
    endpoint: Url,
    credentials: C,
}

impl<C: CredentialProvider> ApiClient<C> {
    /// Create an ApiClient for the API at `host` (e.g. `https://tape.sh`).
    /// The GraphQL path is appended to whatever path `host` carries.
    pub fn new(host: &str, credentials: C) -> anyhow::Result<Self> {
        let endpoint = graphql_endpoint(host)?;
        Ok(ApiClient {
            endpoint,
            credentials,
        })
    }

    /// Create an ApiClient configured from the environment variable
    /// `TAPE_HOST`, or fall back to `DEFAULT_HOST`.
    pub fn from_env(credentials: C) -> anyhow::Result<Self> {
        let host = std::env::var("TAPE_HOST").unwrap_or_else(|_| DEFAULT_HOST.into());
        Self::new(&host, credentials)
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn credentials(&self) -> &C {
        &self.credentials
    }

    /// Build a GraphQL client carrying the current token. Every call
    /// re-reads the credential store.
    pub fn authenticated_client(&self) -> Result<GraphQlClient> {
        create_authenticated_client(&self.endpoint, &self.credentials)
    }

    /// Run `createTape` and return the slot exactly as the server sent it.
    /// Inputs are not validated here; the server owns that.
    pub fn create_upload_slot(
        &self,
        file_name: &str,
        content_type: &str,
        metadata: &Map<String, Value>,
    ) -> Result<UploadSlot> {
        let client = self.authenticated_client()?;
        let variables = CreateTapeVariables {
            file_name,
            content_type,
            metadata,
        };
        let data: CreateTapeData = client.request(CREATE_TAPE_MUTATION, &variables)?;
        info!(id = %data.create_tape.id, "upload slot created");
        Ok(data.create_tape)
    }

    /// Run `confirmTape` for the slot `id` and return the stored size.
    /// Nothing is printed; see `ConfirmationResult::report`.
    pub fn confirm_upload(&self, id: &str) -> Result<ConfirmationResult> {
        let client = self.authenticated_client()?;
        let variables = ConfirmTapeVariables { id };
        let data: ConfirmTapeData = client.request(CONFIRM_TAPE_MUTATION, &variables)?;
        info!(id, file_size = data.confirm_tape.file_size, "upload confirmed");
        Ok(data.confirm_tape)
    }
}

/// PUT the whole of `content` to the signed `target_url` in one request.
///
/// No body size cap, no timeout and no retry: a transport failure or a
/// non-2xx status is returned as is.
pub fn transfer_file(
    content: Vec<u8>,
    target_url: &str,
    headers: &HashMap<String, String>,
) -> Result<TransferOutcome> {
    let headers = header_map(headers)?;
    let http = Client::builder().timeout(None).build()?;
    let len = content.len();
    debug!(bytes = len, "starting transfer");

    let res = http.put(target_url).headers(headers).body(content).send()?;
    let status = res.status();
    if !status.is_success() {
        let body = res.text().unwrap_or_default();
        return Err(UploadError::Transport { status, body });
    }
    info!(bytes = len, %status, "transfer complete");
    Ok(TransferOutcome { status })
}

fn header_map(headers: &HashMap<String, String>) -> Result<HeaderMap> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let invalid = |reason: String| UploadError::InvalidHeader {
            name: name.clone(),
            reason,
        };
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|e| invalid(e.to_string()))?;
        let header_value = HeaderValue::from_str(value).map_err(|e| invalid(e.to_string()))?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}

// Plain concatenation so a host with a path prefix keeps it.
fn graphql_endpoint(host: &str) -> anyhow::Result<Url> {
    let host = host.strip_suffix('/').unwrap_or(host);
    Url::parse(&format!("{}{}", host, GRAPHQL_PATH))
        .map_err(|e| anyhow::anyhow!("invalid API host {}: {}", host, e))
}
