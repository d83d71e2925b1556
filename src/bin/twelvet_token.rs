// ABOUTME: Command-line driver for the token pipeline over in-memory collaborators
// ABOUTME: Seeds a demo client, user and SMS code, runs one token request and prints the JSON response
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use anyhow::{anyhow, Context, Result};
use chrono::Duration;
use clap::Parser;
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use twelvet_auth::config::ServerConfig;
use twelvet_auth::identity::{InMemoryIdentityStore, InMemorySmsCodeStore};
use twelvet_auth::logging::LoggingConfig;
use twelvet_auth::models::{GrantType, Principal};
use twelvet_auth::oauth2_server::{
    ClientCredentials, ClientRegistrationRequest, Collaborators, InMemoryClientRepository,
    OAuth2AuthorizationServer, RawTokenRequest,
};
use twelvet_auth::store::InMemoryAuthorizationService;

const DEMO_REDIRECT_URI: &str = "http://localhost:8080/callback";

#[derive(Parser)]
#[command(name = "twelvet-token")]
#[command(about = "Run a token request against an in-memory twelvet authorization server")]
struct Cli {
    /// Token request parameter as key=value; repeat for each parameter
    #[arg(long = "param", short = 'p', value_parser = parse_param)]
    params: Vec<(String, String)>,

    /// Demo client id
    #[arg(long, default_value = "twelvet-demo")]
    client_id: String,

    /// Demo client secret
    #[arg(long, default_value = "demo-secret")]
    client_secret: String,

    /// Send the demo client credentials as pre-decoded HTTP Basic instead of form parameters
    #[arg(long)]
    basic: bool,

    /// Demo user login name
    #[arg(long, default_value = "admin")]
    username: String,

    /// Demo user password
    #[arg(long, default_value = "twelvet-password")]
    password: String,

    /// Demo user phone number
    #[arg(long, default_value = "13800000000")]
    phone: String,

    /// SMS code seeded for the demo phone
    #[arg(long, default_value = "246810")]
    sms_code: String,

    /// Introspect the issued access token afterwards
    #[arg(long)]
    introspect: bool,
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.trim().to_owned(), value.to_owned()))
        .filter(|(key, _)| !key.is_empty())
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))
}

#[tokio::main]
async fn main() -> Result<()> {
    LoggingConfig::from_env().init()?;

    let cli = Cli::parse();
    let config = ServerConfig::from_env().context("Failed to load configuration")?;

    let identities = Arc::new(InMemoryIdentityStore::new());
    let sms = Arc::new(InMemorySmsCodeStore::new(Duration::minutes(5)));
    let server = OAuth2AuthorizationServer::from_config(
        &config,
        Collaborators {
            store: Arc::new(InMemoryAuthorizationService::new()),
            clients: Arc::new(InMemoryClientRepository::new()),
            identities: identities.clone(),
            sms: sms.clone(),
        },
    )?;

    seed(&server, &identities, &sms, &cli).await?;

    let mut request = RawTokenRequest::from_params(cli.params.iter().cloned());
    let credentials = ClientCredentials::new(cli.client_id.as_str(), cli.client_secret.as_str());
    request = if cli.basic {
        request.with_client_credentials(credentials.clone())
    } else {
        request
            .with_param("client_id", cli.client_id.as_str())
            .with_param("client_secret", cli.client_secret.as_str())
    };

    let output = match server.token(request).await {
        Ok(response) => {
            let introspection = if cli.introspect {
                let result = server
                    .introspect(&credentials, &response.access_token)
                    .await
                    .map_err(|e| anyhow!("Introspection failed: {e}"))?;
                Some(result)
            } else {
                None
            };
            json!({ "token": response, "introspection": introspection })
        }
        Err(error) => json!({ "status": error.status, "error": error.body }),
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn seed(
    server: &OAuth2AuthorizationServer,
    identities: &InMemoryIdentityStore,
    sms: &InMemorySmsCodeStore,
    cli: &Cli,
) -> Result<()> {
    server
        .clients()
        .register_client_with_credentials(
            &cli.client_id,
            &cli.client_secret,
            ClientRegistrationRequest {
                redirect_uris: vec![DEMO_REDIRECT_URI.to_owned()],
                client_name: Some("twelvet demo".to_owned()),
                grant_types: Some(GrantType::ALL.iter().map(|g| g.as_str().to_owned()).collect()),
                scope: Some("server read write".to_owned()),
                ..ClientRegistrationRequest::default()
            },
        )
        .await
        .map_err(|e| anyhow!("Failed to register demo client: {e}"))?;

    identities
        .register_user(
            Principal::new("1", cli.username.as_str())
                .with_tenant("1")
                .with_authority("ROLE_ADMIN"),
            &cli.password,
            Some(&cli.phone),
        )
        .map_err(|e| anyhow!("Failed to register demo user: {e}"))?;

    sms.insert(&cli.phone, &cli.sms_code);

    info!(
        client_id = %cli.client_id,
        username = %cli.username,
        "Seeded demo client, user and SMS code"
    );
    Ok(())
}
