#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Url;
use tsheets::auth::{AuthorizationFlow, AuthorizationOutcome, Token, TokenStore};
use tsheets::config::ConnectionInfo;
use tsheets::error::Result;
use wiremock::MockServer;

pub const CLIENT_ID: &str = "client-abc";
pub const CLIENT_SECRET: &str = "secret-xyz";
pub const REDIRECT_URI: &str = "https://example.com/callback";

pub const DAY: i64 = 86_400;

/// Connection pointing at `{server}/api/v1`.
pub fn connection(server: &MockServer) -> Arc<ConnectionInfo> {
    Arc::new(
        ConnectionInfo::new(
            format!("{}/api/v1/", server.uri()),
            CLIENT_ID,
            REDIRECT_URI,
            CLIENT_SECRET,
        )
        .expect("valid connection info"),
    )
}

pub fn token(access: &str, refresh: &str, expires_in: i64) -> Token {
    Token {
        access_token: access.to_string(),
        expires_in,
        token_type: "bearer".to_string(),
        scope: String::new(),
        refresh_token: refresh.to_string(),
        user_id: "1234".to_string(),
        client_url: "acme".to_string(),
        issued: Utc::now(),
    }
}

pub fn fresh_token(access: &str) -> Token {
    token(access, "refresh-1", 60 * DAY)
}

pub fn stale_token(access: &str, refresh: &str) -> Token {
    token(access, refresh, 3 * DAY)
}

/// Body of a successful grant response.
pub fn grant_response(access: &str, refresh: &str) -> serde_json::Value {
    serde_json::json!({
        "access_token": access,
        "expires_in": 60 * DAY,
        "token_type": "bearer",
        "scope": "",
        "refresh_token": refresh,
        "user_id": "1234",
        "client_url": "acme"
    })
}

#[derive(Default)]
pub struct InMemoryTokenStore {
    tokens: Mutex<HashMap<String, Token>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, profile: &str) -> Option<Token> {
        self.tokens
            .lock()
            .expect("store lock poisoned")
            .get(profile)
            .cloned()
    }
}

impl TokenStore for InMemoryTokenStore {
    fn load(&self, profile: &str) -> Result<Option<Token>> {
        Ok(self.get(profile))
    }

    fn save(&self, profile: &str, token: &Token) -> Result<()> {
        self.tokens
            .lock()
            .expect("store lock poisoned")
            .insert(profile.to_string(), token.clone());
        Ok(())
    }

    fn clear(&self, profile: &str) -> Result<()> {
        self.tokens
            .lock()
            .expect("store lock poisoned")
            .remove(profile);
        Ok(())
    }
}

/// How a [`ScriptedFlow`] answers the consent page.
#[derive(Debug, Clone)]
pub enum Script {
    /// Grant `code`, echoing the state from the authorization URL.
    Grant(String),
    /// Grant `code` with a forged state.
    GrantWithState(String, String),
    Deny(String),
    Abandon,
}

/// Headless stand-in for the consent dialog.
pub struct ScriptedFlow {
    script: Script,
    seen: Mutex<Vec<(String, String)>>,
}

impl ScriptedFlow {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            seen: Mutex::new(Vec::new()),
        }
    }

    /// `(authorization_url, redirect_uri)` pairs the flow was driven with.
    pub fn seen(&self) -> Vec<(String, String)> {
        self.seen.lock().expect("flow lock poisoned").clone()
    }
}

#[async_trait]
impl AuthorizationFlow for ScriptedFlow {
    async fn authorize(
        &self,
        authorization_url: &str,
        redirect_uri: &str,
    ) -> Result<AuthorizationOutcome> {
        self.seen
            .lock()
            .expect("flow lock poisoned")
            .push((authorization_url.to_string(), redirect_uri.to_string()));
        Ok(match &self.script {
            Script::Grant(code) => {
                let url = Url::parse(authorization_url).expect("absolute authorization URL");
                let state = url
                    .query_pairs()
                    .find(|(k, _)| k == "state")
                    .map(|(_, v)| v.into_owned());
                AuthorizationOutcome::Granted {
                    code: code.clone(),
                    state,
                }
            }
            Script::GrantWithState(code, state) => AuthorizationOutcome::Granted {
                code: code.clone(),
                state: Some(state.clone()),
            },
            Script::Deny(error) => AuthorizationOutcome::Denied {
                error: error.clone(),
                description: None,
            },
            Script::Abandon => AuthorizationOutcome::Abandoned,
        })
    }
}
