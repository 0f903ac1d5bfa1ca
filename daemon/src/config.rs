use std::env;
use std::path::PathBuf;

use common::protocol::SocketData;

use crate::cache::DEFAULT_CACHE_CAPACITY;

/// Daemon settings, overridable through the environment.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub socket_path: PathBuf,
    pub cache_capacity: usize,
}

impl DaemonConfig {
    pub fn from_env() -> Self {
        let socket_path = env::var("SHADE_SOCKET")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(SocketData::SOCKET_ADDR));

        let cache_capacity = env::var("SHADE_CACHE_CAPACITY")
            .ok()
            .and_then(|raw| raw.parse::<usize>().ok())
            .unwrap_or(DEFAULT_CACHE_CAPACITY);

        Self {
            socket_path,
            cache_capacity,
        }
    }
}
