//! Server configuration.
//!
//! Every setting can be passed as a flag or through the environment variable
//! named alongside it. Secrets have no defaults; the server refuses to start
//! without them.

use crate::integration::adapters::http::{GitHubClientConfig, TrelloClientConfig};
use crate::reconciler::{ReconcilerSettings, render_accepted_description};
use crate::reconciler::{DEFAULT_ACCEPTED_TEMPLATE, DEFAULT_STATUS_CONTEXT};
use crate::webhook::{TRELLO_CALLBACK_PATH, WebhookSecrets};
use clap::Parser;
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// Raw command-line and environment settings.
#[derive(Clone, Parser)]
#[command(
    name = "signoff-server",
    about = "Gates code changes on product sign-off from a task board",
    version
)]
pub struct ServerArgs {
    /// `PostgreSQL` connection URL.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Maximum number of pooled database connections.
    #[arg(long, env = "DATABASE_POOL_SIZE", default_value_t = 8)]
    pub database_pool_size: u32,

    /// Externally reachable base URL of this service.
    #[arg(long, env = "PUBLIC_BASE_URL")]
    pub public_base_url: String,

    /// Socket address the webhook listener binds to.
    #[arg(long, env = "BIND_ADDRESS", default_value = "0.0.0.0:8080")]
    pub bind_address: String,

    /// GitHub API root.
    #[arg(long, env = "GITHUB_API_BASE", default_value = "https://api.github.com")]
    pub github_api_base: String,

    /// GitHub OAuth application client id.
    #[arg(long, env = "GITHUB_CLIENT_ID")]
    pub github_client_id: String,

    /// GitHub OAuth application client secret.
    #[arg(long, env = "GITHUB_CLIENT_SECRET", hide_env_values = true)]
    pub github_client_secret: String,

    /// Secret configured on the GitHub webhook.
    #[arg(long, env = "GITHUB_WEBHOOK_SECRET", hide_env_values = true)]
    pub github_webhook_secret: String,

    /// Trello API root.
    #[arg(long, env = "TRELLO_API_BASE", default_value = "https://api.trello.com/1")]
    pub trello_api_base: String,

    /// Trello application key.
    #[arg(long, env = "TRELLO_API_KEY")]
    pub trello_api_key: String,

    /// Trello application secret, used to verify webhook signatures.
    #[arg(long, env = "TRELLO_API_SECRET", hide_env_values = true)]
    pub trello_api_secret: String,

    /// Upper bound on each outbound API call, in milliseconds.
    #[arg(long, env = "OUTBOUND_TIMEOUT_MS", default_value_t = 5_000)]
    pub outbound_timeout_ms: u64,

    /// Context label attached to commit statuses.
    #[arg(long, env = "STATUS_CONTEXT", default_value = DEFAULT_STATUS_CONTEXT)]
    pub status_context: String,

    /// Template for the acceptance description; receives `user`.
    #[arg(
        long,
        env = "ACCEPTED_DESCRIPTION_TEMPLATE",
        default_value = DEFAULT_ACCEPTED_TEMPLATE
    )]
    pub accepted_template: String,

    /// Seconds an acceptance claim is held before another delivery may
    /// take it over.
    #[arg(long, env = "CLAIM_LEASE_SECS", default_value_t = 30)]
    pub claim_lease_secs: u64,
}

/// Errors raised while validating configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required setting is empty.
    #[error("{0} must not be empty")]
    Blank(&'static str),

    /// A URL setting is not an absolute http(s) URL.
    #[error("{name} must be an absolute http(s) URL, got '{value}'")]
    InvalidUrl {
        /// Setting name.
        name: &'static str,
        /// Rejected value.
        value: String,
    },

    /// The bind address cannot be parsed.
    #[error("BIND_ADDRESS is not a socket address: {0}")]
    InvalidBindAddress(String),

    /// A duration or size setting is zero.
    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    /// The acceptance claim lease cannot guard an outbound call.
    #[error("CLAIM_LEASE_SECS is invalid: {0}")]
    InvalidClaimLease(String),

    /// The acceptance template does not render.
    #[error("ACCEPTED_DESCRIPTION_TEMPLATE is invalid: {0}")]
    InvalidTemplate(String),
}

/// Validated server configuration.
#[derive(Clone)]
pub struct AppConfig {
    /// `PostgreSQL` connection URL.
    pub database_url: String,
    /// Maximum number of pooled database connections.
    pub database_pool_size: u32,
    /// Socket address the webhook listener binds to.
    pub bind_address: SocketAddr,
    /// Externally reachable base URL, without a trailing slash.
    pub public_base_url: String,
    /// GitHub client settings.
    pub github: GitHubClientConfig,
    /// Trello client settings.
    pub trello: TrelloClientConfig,
    /// Webhook signature secrets.
    pub webhook: WebhookSecrets,
    /// Reconciler tunables.
    pub reconciler: ReconcilerSettings,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("database_pool_size", &self.database_pool_size)
            .field("bind_address", &self.bind_address)
            .field("public_base_url", &self.public_base_url)
            .field("github_api_base", &self.github.api_base)
            .field("trello_api_base", &self.trello.api_base)
            .field("webhook", &self.webhook)
            .field("reconciler", &self.reconciler)
            .finish_non_exhaustive()
    }
}

impl AppConfig {
    /// Parses flags and environment variables, then validates them.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a value fails validation. Missing
    /// required settings are reported by the argument parser, which exits.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_args(ServerArgs::parse())
    }

    /// Validates parsed settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for blank secrets, malformed URLs or bind
    /// addresses, zero durations, a claim lease that does not outlast the
    /// outbound timeout, and templates that do not render.
    pub fn from_args(args: ServerArgs) -> Result<Self, ConfigError> {
        let database_url = required("DATABASE_URL", args.database_url)?;
        let public_base_url = absolute_url("PUBLIC_BASE_URL", &args.public_base_url)?;
        let github_api_base = absolute_url("GITHUB_API_BASE", &args.github_api_base)?;
        let trello_api_base = absolute_url("TRELLO_API_BASE", &args.trello_api_base)?;
        let bind_address = args
            .bind_address
            .trim()
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidBindAddress(args.bind_address.clone()))?;

        if args.database_pool_size == 0 {
            return Err(ConfigError::Zero("DATABASE_POOL_SIZE"));
        }
        if args.outbound_timeout_ms == 0 {
            return Err(ConfigError::Zero("OUTBOUND_TIMEOUT_MS"));
        }
        if args.claim_lease_secs == 0 {
            return Err(ConfigError::Zero("CLAIM_LEASE_SECS"));
        }
        render_accepted_description(&args.accepted_template, "someone")
            .map_err(|err| ConfigError::InvalidTemplate(err.to_string()))?;

        let timeout = Duration::from_millis(args.outbound_timeout_ms);
        let reconciler = ReconcilerSettings {
            status_context: required("STATUS_CONTEXT", args.status_context)?,
            outbound_timeout: timeout,
            claim_lease: Duration::from_secs(args.claim_lease_secs),
            accepted_template: args.accepted_template,
        };
        reconciler
            .validated_claim_lease()
            .map_err(|err| ConfigError::InvalidClaimLease(err.to_string()))?;
        let trello_callback_url = format!("{public_base_url}{TRELLO_CALLBACK_PATH}");
        Ok(Self {
            database_url,
            database_pool_size: args.database_pool_size,
            bind_address,
            github: GitHubClientConfig {
                api_base: github_api_base,
                client_id: required("GITHUB_CLIENT_ID", args.github_client_id)?,
                client_secret: required("GITHUB_CLIENT_SECRET", args.github_client_secret)?,
                timeout,
            },
            trello: TrelloClientConfig {
                api_base: trello_api_base,
                api_key: required("TRELLO_API_KEY", args.trello_api_key)?,
                timeout,
            },
            webhook: WebhookSecrets {
                github_webhook_secret: required(
                    "GITHUB_WEBHOOK_SECRET",
                    args.github_webhook_secret,
                )?,
                trello_api_secret: required("TRELLO_API_SECRET", args.trello_api_secret)?,
                trello_callback_url,
            },
            reconciler,
            public_base_url,
        })
    }

    /// Callback URL registered with the task board for watched columns.
    #[must_use]
    pub fn trello_callback_url(&self) -> &str {
        &self.webhook.trello_callback_url
    }
}

fn required(name: &'static str, value: String) -> Result<String, ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Blank(name));
    }
    Ok(trimmed.to_owned())
}

fn absolute_url(name: &'static str, value: &str) -> Result<String, ConfigError> {
    let trimmed = value.trim().trim_end_matches('/');
    let host = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"));
    match host {
        Some(rest) if !rest.is_empty() && !rest.contains(char::is_whitespace) => {
            Ok(trimmed.to_owned())
        }
        _ => Err(ConfigError::InvalidUrl {
            name,
            value: value.to_owned(),
        }),
    }
}
