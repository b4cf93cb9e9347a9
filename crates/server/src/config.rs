use std::fs;

use anyhow::Context;
use frame_sync::SetBroadcast;
use serde::Deserialize;
use shared::domain::Layout;
use tracing::warn;

const CONFIG_PATH_VAR: &str = "LED_SERVER_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "server.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(alias = "bind_addr")]
    pub server_bind: String,
    pub max_command_bytes: usize,
    pub frame_channel_capacity: usize,
    pub render_interval_ms: u64,
    pub set_broadcast: SetBroadcast,
    pub initial_brightness: u8,
    pub initial_power: bool,
    pub layout: Layout,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "0.0.0.0:8080".into(),
            max_command_bytes: 2048,
            frame_channel_capacity: 16,
            render_interval_ms: 100,
            set_broadcast: SetBroadcast::Always,
            initial_brightness: 128,
            initial_power: true,
            layout: default_layout(),
        }
    }
}

fn default_layout() -> Layout {
    Layout {
        trunk_len: 50,
        branch_len: 6,
        left_anchors: [12, 24, 36],
        right_anchors: [18, 30, 42],
        left_reversed: [false, true, false],
        right_reversed: [true, false, true],
    }
}

pub fn load_settings() -> Settings {
    let path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
    let mut settings = match fs::read_to_string(&path) {
        Ok(raw) => parse_settings(&raw).unwrap_or_else(|error| {
            warn!(%path, error = %format!("{error:#}"), "ignoring invalid config file");
            Settings::default()
        }),
        Err(_) => Settings::default(),
    };
    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    settings
}

pub fn parse_settings(raw: &str) -> anyhow::Result<Settings> {
    toml::from_str(raw).context("failed to parse server config")
}

pub fn apply_env_overrides(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("SERVER_BIND") {
        settings.server_bind = v;
    }
    if let Some(v) = var("APP__BIND_ADDR") {
        settings.server_bind = v;
    }

    if let Some(v) = var("APP__RENDER_INTERVAL_MS") {
        override_parsed(&mut settings.render_interval_ms, "APP__RENDER_INTERVAL_MS", &v);
    }
    if let Some(v) = var("APP__MAX_COMMAND_BYTES") {
        override_parsed(&mut settings.max_command_bytes, "APP__MAX_COMMAND_BYTES", &v);
    }
    if let Some(v) = var("APP__FRAME_CHANNEL_CAPACITY") {
        override_parsed(
            &mut settings.frame_channel_capacity,
            "APP__FRAME_CHANNEL_CAPACITY",
            &v,
        );
    }

    if let Some(v) = var("APP__SET_BROADCAST") {
        match v.trim() {
            "always" => settings.set_broadcast = SetBroadcast::Always,
            "when_applied" => settings.set_broadcast = SetBroadcast::WhenApplied,
            other => warn!(value = other, "APP__SET_BROADCAST must be always or when_applied"),
        }
    }
}

fn override_parsed<T: std::str::FromStr>(slot: &mut T, key: &str, raw: &str) {
    match raw.trim().parse() {
        Ok(parsed) => *slot = parsed,
        Err(_) => warn!(key, value = raw, "ignoring unparsable environment override"),
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
