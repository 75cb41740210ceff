use std::sync::Arc;

use dashmap::DashSet;
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::transport::{HttpTransport, ReqwestTransport};

#[derive(Clone)]
pub struct ClientState {
    pub config: Arc<ClientConfig>,
    pub transport: Arc<dyn HttpTransport>,
    pub in_flight: InFlight,
}

impl ClientState {
    pub fn init() -> anyhow::Result<Self> {
        let config = Arc::new(ClientConfig::from_env()?);
        let transport = Arc::new(ReqwestTransport::new(&config.api_url)?) as Arc<dyn HttpTransport>;
        Ok(Self::from_parts(config, transport))
    }

    pub fn from_parts(config: Arc<ClientConfig>, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            config,
            transport,
            in_flight: InFlight::default(),
        }
    }
}

/// Keys with a request currently running.
#[derive(Clone, Default)]
pub struct InFlight {
    keys: Arc<DashSet<Uuid>>,
}

impl InFlight {
    /// Claims `key`; `None` when it is already taken.
    pub fn try_claim(&self, key: Uuid) -> Option<InFlightGuard> {
        self.keys.insert(key).then(|| InFlightGuard {
            keys: Arc::clone(&self.keys),
            key,
        })
    }

    pub fn contains(&self, key: &Uuid) -> bool {
        self.keys.contains(key)
    }
}

/// Releases its key on drop, including when the owning future is cancelled.
pub struct InFlightGuard {
    keys: Arc<DashSet<Uuid>>,
    key: Uuid,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.keys.remove(&self.key);
    }
}
