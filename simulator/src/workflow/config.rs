use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use trackcore::prelude::Publisher;
use trackcore::target::IdentityPolicy;
use trackcore::transport::{FilePublisher, LogPublisher};
use trackcore::wire::Compression;
use trackcore::AssemblerConfig;

pub type BoxedPublisher = Box<dyn Publisher + Send>;

/// Where encoded batches go.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SinkConfig {
    #[default]
    Log,
    File {
        path: PathBuf,
    },
}

impl SinkConfig {
    pub fn open(&self) -> anyhow::Result<BoxedPublisher> {
        match self {
            Self::Log => Ok(Box::new(LogPublisher::new())),
            Self::File { path } => {
                let publisher = FilePublisher::open(path)
                    .with_context(|| format!("opening file sink {}", path.display()))?;
                Ok(Box::new(publisher))
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SenderConfig {
    pub topic: String,
    pub publish_interval_ms: u64,
    pub identity: IdentityPolicy,
    pub assembler: AssemblerConfig,
    pub bind: SocketAddr,
    pub sink: SinkConfig,
    pub compression: Compression,
    /// Answer given when a terminated track offers association.
    pub confirm_association: bool,
    pub log_history: usize,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            topic: "fusion_target_topic".to_string(),
            publish_interval_ms: 3000,
            identity: IdentityPolicy::default(),
            assembler: AssemblerConfig::default(),
            bind: SocketAddr::from(([127, 0, 0, 1], 9000)),
            sink: SinkConfig::default(),
            compression: Compression::None,
            confirm_association: true,
            log_history: 200,
        }
    }
}

impl SenderConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading sender config {}", path_ref.display()))?;
        let config: SenderConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing sender config {}", path_ref.display()))?;
        config
            .identity
            .validate()
            .with_context(|| format!("identity templates in {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn load_or_default(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Initial text of the form's publish-interval field, in seconds.
    pub fn interval_text(&self) -> String {
        Duration::from_millis(self.publish_interval_ms)
            .as_secs_f64()
            .to_string()
    }
}
