//! HTTP implementation of the gateway contract
//!
//! Talks to the remote service's JSON API with reqwest. Three endpoints:
//! credential sign-in, user lookup by id, and nickname set for the
//! signed-in session. Status codes map onto the gateway error taxonomy;
//! the lookup path goes through `classify_lookup` so transient failures
//! stay retriable.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classify::{LookupOutcome, classify_lookup};
use crate::error::{Error, Result};
use crate::{Gateway, Session, UserSnapshot};

/// Request body for `POST /v1/auth/sign_in`.
#[derive(Debug, Serialize)]
struct SignInRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// Response body for a successful sign-in.
#[derive(Debug, Deserialize)]
struct SignInResponse {
    token: String,
    user_id: String,
}

/// Response body for a successful user lookup.
#[derive(Debug, Deserialize)]
struct UserResponse {
    user: UserSnapshot,
}

/// Request body for `POST /v1/profile/username`.
#[derive(Debug, Serialize)]
struct SetUsernameRequest<'a> {
    username: &'a str,
}

/// Gateway backed by the remote service's HTTP API.
pub struct HttpGateway {
    base_url: String,
    client: reqwest::Client,
}

impl HttpGateway {
    /// Create a gateway for the given API base URL.
    pub fn new(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into(),
            client,
        }
    }

    /// Build a full endpoint URL from a path.
    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

impl Gateway for HttpGateway {
    fn id(&self) -> &str {
        "http"
    }

    fn authenticate<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Session>> + Send + 'a>> {
        Box::pin(async move {
            let response = self
                .client
                .post(self.endpoint("v1/auth/sign_in"))
                .json(&SignInRequest { email, password })
                .send()
                .await
                .map_err(|e| Error::Http(format!("sign-in request failed: {e}")))?;

            let status = response.status();
            if !status.is_success() {
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| String::from("<no body>"));

                // 401/403 means the credential itself is rejected
                if status.as_u16() == 401 || status.as_u16() == 403 {
                    return Err(Error::Auth(format!(
                        "sign-in rejected ({status}): {body}"
                    )));
                }

                return Err(Error::Http(format!(
                    "sign-in returned {status}: {body}"
                )));
            }

            let signed_in = response
                .json::<SignInResponse>()
                .await
                .map_err(|e| Error::Http(format!("invalid sign-in response: {e}")))?;

            debug!(account_id = %signed_in.user_id, "signed in");
            Ok(Session {
                account_id: signed_in.user_id,
                token: signed_in.token,
            })
        })
    }

    fn lookup_user<'a>(
        &'a self,
        user_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<UserSnapshot>>> + Send + 'a>> {
        Box::pin(async move {
            let response = self
                .client
                .get(self.endpoint(&format!("v1/users/{user_id}")))
                .send()
                .await
                .map_err(|e| Error::Http(format!("lookup request failed: {e}")))?;

            let status = response.status().as_u16();
            match classify_lookup(status) {
                LookupOutcome::Found => {
                    let found = response
                        .json::<UserResponse>()
                        .await
                        .map_err(|e| Error::Lookup(format!("invalid user response: {e}")))?;
                    Ok(Some(found.user))
                }
                LookupOutcome::NotFound => Ok(None),
                LookupOutcome::Denied => {
                    let body = response
                        .text()
                        .await
                        .unwrap_or_else(|_| String::from("<no body>"));
                    Err(Error::Denied(format!("lookup denied ({status}): {body}")))
                }
                LookupOutcome::Retriable => {
                    let body = response
                        .text()
                        .await
                        .unwrap_or_else(|_| String::from("<no body>"));
                    Err(Error::Lookup(format!("lookup returned {status}: {body}")))
                }
            }
        })
    }

    fn set_nickname<'a>(
        &'a self,
        session: &'a Session,
        nickname: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let response = self
                .client
                .post(self.endpoint("v1/profile/username"))
                .bearer_auth(&session.token)
                .json(&SetUsernameRequest { username: nickname })
                .send()
                .await
                .map_err(|e| Error::Http(format!("nickname request failed: {e}")))?;

            let status = response.status();
            if status.is_success() {
                return Ok(());
            }

            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<no body>"));

            match status.as_u16() {
                // taken or invalid name
                409 | 422 => Err(Error::NicknameRejected(format!(
                    "nickname set returned {status}: {body}"
                ))),
                401 | 403 => Err(Error::Denied(format!(
                    "nickname set denied ({status}): {body}"
                ))),
                _ => Err(Error::Http(format!(
                    "nickname set returned {status}: {body}"
                ))),
            }
        })
    }
}
