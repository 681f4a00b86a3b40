use crate::platform::LoadedPlatform;
use age::secrecy::ExposeSecret;
use aplctl_esc::secret;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use colored::Colorize;
use rand::RngCore;
use serde_json::{Map, Value, json};
use std::path::Path;
use std::time::Duration;

const CREATE_TIMEOUT: Duration = Duration::from_secs(60);

/// Generated passwords stored under `aplSecrets`
const GENERATED_SECRETS: [&str; 3] = ["developTeamPass", "lokiAdminPass", "otomiAdminPass"];

pub async fn handle(config: Option<&Path>, name: &str) -> anyhow::Result<()> {
    let platform = LoadedPlatform::load(config, name)?;
    let environment = platform.environment()?;
    let token = std::env::var("LINODE_TOKEN").unwrap_or_default();

    println!("{}", "Creating esc environment...".yellow());
    let (config, values) = initial_definition(&token);

    let created = tokio::time::timeout(CREATE_TIMEOUT, environment.initialize(config, values))
        .await
        .map_err(|_| anyhow::anyhow!("create timed out after {}s", CREATE_TIMEOUT.as_secs()))??;

    if created {
        println!(
            "{} esc environment {} created",
            "✓".green(),
            environment.id().to_string().cyan()
        );
    } else {
        println!(
            "{} esc environment {} already exists, left unchanged",
            "ℹ".blue(),
            environment.id().to_string().cyan()
        );
    }
    Ok(())
}

/// Provider config and values written to a new environment
fn initial_definition(linode_token: &str) -> (Map<String, Value>, Map<String, Value>) {
    let mut config = Map::new();
    config.insert("linode:token".into(), json!("${linode.token}"));
    config.insert("apl:age".into(), json!("${age}"));
    config.insert("apl:secrets".into(), json!("${aplSecrets}"));

    let mut secrets = Map::new();
    for key in GENERATED_SECRETS {
        secrets.insert(key.into(), secret(passgen()));
    }

    let mut values = Map::new();
    values.insert("linode".into(), json!({ "token": secret(linode_token) }));
    values.insert("age".into(), age_keys());
    values.insert("aplSecrets".into(), Value::Object(secrets));

    (config, values)
}

/// Fresh x25519 keypair for SOPS on the apl stack
fn age_keys() -> Value {
    let identity = age::x25519::Identity::generate();
    json!({
        "publicKey": identity.to_public().to_string(),
        "privateKey": secret(identity.to_string().expose_secret()),
    })
}

/// 32 random bytes, URL-safe base64
fn passgen() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE.encode(bytes)
}
