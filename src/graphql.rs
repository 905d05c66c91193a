// GraphQL plumbing: building an authenticated client per call and
// decoding the reply envelope into either data or a classified error.

use crate::config::{CredentialProvider, TOKEN_KEY};
use crate::error::{Result, UploadError};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Path of the GraphQL function on the API host.
pub const GRAPHQL_PATH: &str = "/.netlify/functions/graphql";

/// Header telling the server which surface issued the call.
pub const AUTH_PROVIDER_HEADER: &str = "auth-provider";

/// Value of `auth-provider` for this client.
pub const CLIENT_TAG: &str = "cli";

const UNAUTHENTICATED_CODE: &str = "UNAUTHENTICATED";

/// Credentials for exactly one request. Built fresh from the provider
/// every time and dropped with the client that carries it.
#[derive(Debug, Clone)]
pub struct AuthenticatedSession {
    access_token: String,
    client_tag: &'static str,
}

impl AuthenticatedSession {
    /// Read the token from `credentials`. Absent and empty tokens both
    /// fail with `MissingCredentials`.
    pub fn from_provider<C: CredentialProvider>(credentials: &C) -> Result<Self> {
        match credentials.get(TOKEN_KEY) {
            Some(token) if !token.is_empty() => Ok(AuthenticatedSession {
                access_token: token,
                client_tag: CLIENT_TAG,
            }),
            _ => Err(UploadError::MissingCredentials),
        }
    }

    /// The two headers every GraphQL call sends, and nothing else.
    pub fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.access_token)).map_err(
            |err| UploadError::InvalidHeader {
                name: AUTHORIZATION.to_string(),
                reason: err.to_string(),
            },
        )?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(
            HeaderName::from_static(AUTH_PROVIDER_HEADER),
            HeaderValue::from_static(self.client_tag),
        );
        Ok(headers)
    }
}

/// Build a client for `endpoint` carrying a session freshly read from
/// `credentials`. Fails before any network I/O when no token is stored.
pub fn create_authenticated_client<C: CredentialProvider>(
    endpoint: &Url,
    credentials: &C,
) -> Result<GraphQlClient> {
    let session = AuthenticatedSession::from_provider(credentials)?;
    GraphQlClient::new(endpoint.clone(), session.headers()?)
}

/// Short-lived GraphQL client bound to one endpoint and one session.
pub struct GraphQlClient {
    http: Client,
    endpoint: Url,
    headers: HeaderMap,
}

#[derive(Serialize)]
struct GraphQlRequest<'a, V: Serialize> {
    query: &'a str,
    variables: &'a V,
}

#[derive(Deserialize)]
struct GraphQlEnvelope {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Option<Vec<GraphQlError>>,
}

/// One entry of the `errors` array of a GraphQL reply.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct GraphQlError {
    pub message: String,
    #[serde(default)]
    pub extensions: Option<GraphQlErrorExtensions>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct GraphQlErrorExtensions {
    #[serde(default)]
    pub code: Option<String>,
}

impl GraphQlError {
    fn code(&self) -> Option<&str> {
        self.extensions.as_ref()?.code.as_deref()
    }
}

/// Map a non-empty GraphQL error list to an `UploadError`. Only the first
/// entry decides whether the failure is an authentication one.
pub fn classify(errors: Vec<GraphQlError>) -> UploadError {
    if errors.first().and_then(GraphQlError::code) == Some(UNAUTHENTICATED_CODE) {
        return UploadError::Unauthenticated;
    }
    UploadError::Api {
        messages: errors.into_iter().map(|e| e.message).collect(),
    }
}

impl GraphQlClient {
    pub fn new(endpoint: Url, headers: HeaderMap) -> Result<Self> {
        let http = Client::builder()
            .default_headers(headers.clone())
            .timeout(None)
            .build()?;
        Ok(GraphQlClient {
            http,
            endpoint,
            headers,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Headers attached to every request made through this client.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// POST `query` with `variables` and decode the `data` object as `T`.
    pub fn request<V, T>(&self, query: &str, variables: &V) -> Result<T>
    where
        V: Serialize,
        T: DeserializeOwned,
    {
        let res = self
            .http
            .post(self.endpoint.clone())
            .json(&GraphQlRequest { query, variables })
            .send()?;
        let status = res.status();
        let body = res.text()?;
        debug!(%status, "graphql reply received");

        let envelope: GraphQlEnvelope = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(UploadError::Transport { status, body });
            }
            Err(err) => {
                return Err(UploadError::InvalidResponse(format!(
                    "malformed GraphQL reply: {}",
                    err
                )));
            }
        };

        if let Some(errors) = envelope.errors.filter(|errors| !errors.is_empty()) {
            return Err(classify(errors));
        }
        if !status.is_success() {
            return Err(UploadError::Transport { status, body });
        }

        let data = envelope
            .data
            .filter(|data| !data.is_null())
            .ok_or_else(|| UploadError::InvalidResponse("reply carried no data".into()))?;
        serde_json::from_value(data)
            .map_err(|err| UploadError::InvalidResponse(format!("unexpected data shape: {}", err)))
    }
}
