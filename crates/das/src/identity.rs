// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::env;
use std::fs;
use tracing::debug;

const HOSTNAME_PATH: &str = "/proc/sys/kernel/hostname";
const BOOT_ID_PATH: &str = "/proc/sys/kernel/random/boot_id";
const UNKNOWN: &str = "unknown";

/// Device identity attached to every uploaded event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub robot_id: String,
    pub robot_version: String,
    pub boot_id: String,
}

impl Identity {
    /// Resolves the identity from the environment, falling back to procfs.
    pub fn resolve() -> Self {
        let robot_id = env::var("DAS_ROBOT_ID")
            .ok()
            .filter(|id| !id.trim().is_empty())
            .or_else(|| read_trimmed(HOSTNAME_PATH))
            .unwrap_or_else(|| UNKNOWN.to_string());
        let robot_version = env::var("DAS_ROBOT_VERSION")
            .ok()
            .filter(|version| !version.trim().is_empty())
            .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());
        let boot_id = read_trimmed(BOOT_ID_PATH).unwrap_or_else(|| UNKNOWN.to_string());

        Identity {
            robot_id,
            robot_version,
            boot_id,
        }
    }
}

fn read_trimmed(path: &str) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(contents) => Some(contents.trim().to_string()).filter(|s| !s.is_empty()),
        Err(e) => {
            debug!("Could not read {path}: {e}");
            None
        }
    }
}
