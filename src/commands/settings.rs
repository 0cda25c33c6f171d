use crate::error::{ApiError, ScoreError};
use crate::models::record::StorageBackend;
use crate::models::session::{lock_session, GatewaySession};
use crate::scoring::address::WalletAddress;
use serde_json::{json, Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const SETTINGS_SCHEMA_VERSION: i64 = 2;

pub const DEFAULT_REGISTRY_ADDRESS: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";
const DEFAULT_CHAIN_ID: u64 = 31337;
const DEFAULT_NAMESPACE: &str = "credit-scores";

#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub registry_address: String,
    pub chain_id: u64,
    pub record_store_namespace: String,
    pub default_backend: StorageBackend,
    pub confirmation_poll: Duration,
    pub confirmation_attempts: u32,
}

#[tauri::command]
pub async fn get_settings(session: tauri::State<'_, Arc<Mutex<GatewaySession>>>) -> Result<Value, ApiError> {
    let data_dir = session_data_dir(session.inner())?;
    load_settings_from_disk(&data_dir).map_err(ApiError::from)
}

#[tauri::command]
pub async fn save_settings(
    settings: Value,
    session: tauri::State<'_, Arc<Mutex<GatewaySession>>>,
) -> Result<Value, ApiError> {
    let data_dir = session_data_dir(session.inner())?;
    save_settings_to_disk(&data_dir, settings).map_err(ApiError::from)
}

pub(crate) fn session_data_dir(session: &Arc<Mutex<GatewaySession>>) -> Result<PathBuf, ScoreError> {
    lock_session(session)?.data_dir()
}

pub fn load_gateway_settings(data_dir: &Path) -> Result<GatewaySettings, ScoreError> {
    let settings = load_settings_from_disk(data_dir)?;

    let registry_address = settings
        .get("registryAddress")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_REGISTRY_ADDRESS);
    let registry_address = WalletAddress::parse(registry_address)?.to_string();

    let default_backend = settings
        .get("defaultBackend")
        .and_then(Value::as_str)
        .and_then(StorageBackend::parse)
        .unwrap_or(StorageBackend::Registry);

    Ok(GatewaySettings {
        registry_address,
        chain_id: settings
            .get("chainId")
            .and_then(Value::as_u64)
            .unwrap_or(DEFAULT_CHAIN_ID),
        record_store_namespace: settings
            .get("recordStoreNamespace")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_NAMESPACE)
            .to_string(),
        default_backend,
        confirmation_poll: Duration::from_millis(
            settings
                .get("confirmationPollMs")
                .and_then(Value::as_u64)
                .unwrap_or(250),
        ),
        confirmation_attempts: settings
            .get("confirmationAttempts")
            .and_then(Value::as_u64)
            .unwrap_or(20) as u32,
    })
}

pub fn load_settings_from_disk(data_dir: &Path) -> Result<Value, ScoreError> {
    let path = settings_path(data_dir);
    ensure_data_dir(data_dir)?;

    let original = if path.exists() {
        let raw = fs::read_to_string(&path)
            .map_err(|e| ScoreError::BackendUnavailable(format!("Failed to read settings.json: {e}")))?;
        serde_json::from_str::<Value>(&raw).unwrap_or_else(|e| {
            log::warn!("settings.json is not valid JSON, using defaults: {e}");
            json!({})
        })
    } else {
        json!({})
    };

    let migrated = migrate_settings(original.clone());
    if migrated != original || !path.exists() {
        write_settings_file(&path, &migrated)?;
    }

    Ok(migrated)
}

pub fn save_settings_to_disk(data_dir: &Path, settings: Value) -> Result<Value, ScoreError> {
    if !settings.is_object() {
        return Err(ScoreError::InvalidInput("settings must be a JSON object".to_string()));
    }

    let path = settings_path(data_dir);
    ensure_data_dir(data_dir)?;

    let mut merged = load_settings_from_disk(data_dir).unwrap_or_else(|_| default_settings());
    merge_settings(&mut merged, &settings);

    let migrated = migrate_settings(merged);
    write_settings_file(&path, &migrated)?;
    log::info!("settings saved to {}", path.display());
    Ok(migrated)
}

fn settings_path(data_dir: &Path) -> PathBuf {
    data_dir.join("settings.json")
}

pub(crate) fn ensure_data_dir(data_dir: &Path) -> Result<(), ScoreError> {
    fs::create_dir_all(data_dir)
        .map_err(|e| ScoreError::BackendUnavailable(format!("Failed to create data directory: {e}")))
}

fn write_settings_file(path: &Path, settings: &Value) -> Result<(), ScoreError> {
    let raw = serde_json::to_string_pretty(settings)
        .map_err(|e| ScoreError::BackendUnavailable(format!("Failed to serialize settings: {e}")))?;
    fs::write(path, raw)
        .map_err(|e| ScoreError::BackendUnavailable(format!("Failed to write settings.json: {e}")))
}

fn migrate_settings(input: Value) -> Value {
    let mut out = match input {
        Value::Object(map) => Value::Object(map),
        _ => Value::Object(Map::new()),
    };

    let version = out
        .get("schema_version")
        .and_then(Value::as_i64)
        .unwrap_or(0);

    if version < 1 {
        rename_key(&mut out, "contractAddress", "registryAddress");
    }

    if version < 2 {
        // V2 splits record-store entities into namespaces.
        ensure_key(&mut out, "recordStoreNamespace", json!(DEFAULT_NAMESPACE));
    }

    deep_merge_defaults(&mut out, &default_settings());
    sanitize_settings(&mut out);
    if let Some(obj) = out.as_object_mut() {
        obj.insert("schema_version".to_string(), json!(SETTINGS_SCHEMA_VERSION));
    }

    out
}

fn default_settings() -> Value {
    json!({
        "schema_version": SETTINGS_SCHEMA_VERSION,
        "registryAddress": DEFAULT_REGISTRY_ADDRESS,
        "chainId": DEFAULT_CHAIN_ID,
        "recordStoreNamespace": DEFAULT_NAMESPACE,
        "defaultBackend": "registry",
        "confirmationPollMs": 250,
        "confirmationAttempts": 20
    })
}

fn deep_merge_defaults(target: &mut Value, defaults: &Value) {
    let (Some(target_obj), Some(default_obj)) = (target.as_object_mut(), defaults.as_object()) else {
        return;
    };

    for (key, default_value) in default_obj {
        match target_obj.get_mut(key) {
            Some(existing) => {
                if existing.is_object() && default_value.is_object() {
                    deep_merge_defaults(existing, default_value);
                }
            }
            None => {
                target_obj.insert(key.clone(), default_value.clone());
            }
        }
    }
}

fn ensure_key(target: &mut Value, key: &str, value: Value) {
    if let Some(obj) = target.as_object_mut() {
        obj.entry(key.to_string()).or_insert(value);
    }
}

fn rename_key(target: &mut Value, from: &str, to: &str) {
    let Some(obj) = target.as_object_mut() else {
        return;
    };
    if let Some(value) = obj.remove(from) {
        obj.entry(to.to_string()).or_insert(value);
    }
}

fn merge_settings(target: &mut Value, incoming: &Value) {
    match (target, incoming) {
        (Value::Object(target_obj), Value::Object(incoming_obj)) => {
            for (key, value) in incoming_obj {
                if let Some(existing) = target_obj.get_mut(key) {
                    merge_settings(existing, value);
                } else {
                    target_obj.insert(key.clone(), value.clone());
                }
            }
        }
        (target_slot, incoming_value) => {
            *target_slot = incoming_value.clone();
        }
    }
}

fn sanitize_settings(settings: &mut Value) {
    let Some(obj) = settings.as_object_mut() else {
        return;
    };

    clamp_u64(obj, "confirmationPollMs", 10, 5000, 250);
    clamp_u64(obj, "confirmationAttempts", 1, 120, 20);

    let chain_id = obj.get("chainId").and_then(Value::as_u64).unwrap_or(DEFAULT_CHAIN_ID);
    obj.insert("chainId".to_string(), json!(chain_id));

    sanitize_enum(obj, "defaultBackend", &["registry", "recordStore"], "registry");

    let registry_ok = obj
        .get("registryAddress")
        .and_then(Value::as_str)
        .is_some_and(|raw| WalletAddress::parse(raw).is_ok());
    if !registry_ok {
        obj.insert("registryAddress".to_string(), json!(DEFAULT_REGISTRY_ADDRESS));
    }

    let namespace = obj
        .get("recordStoreNamespace")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|ns| !ns.is_empty())
        .unwrap_or(DEFAULT_NAMESPACE)
        .to_string();
    obj.insert("recordStoreNamespace".to_string(), json!(namespace));
}

fn clamp_u64(map: &mut Map<String, Value>, key: &str, min: u64, max: u64, default: u64) {
    let raw = map.get(key).and_then(Value::as_u64).unwrap_or(default);
    map.insert(key.to_string(), json!(raw.clamp(min, max)));
}

fn sanitize_enum(map: &mut Map<String, Value>, key: &str, allowed: &[&str], default: &str) {
    let valid = map
        .get(key)
        .and_then(Value::as_str)
        .filter(|value| allowed.contains(value))
        .unwrap_or(default);
    map.insert(key.to_string(), json!(valid));
}
