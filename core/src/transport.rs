//! Publisher sinks for encoded wire batches.

use crate::prelude::{PublishAck, Publisher, TransportError};
use crate::wire::codec::hex_dump;
use chrono::Utc;
use log::info;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Logs each payload as hex. Stand-in for a broker during local runs.
#[derive(Debug, Default)]
pub struct LogPublisher {
    sent: u64,
}

impl LogPublisher {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Publisher for LogPublisher {
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<PublishAck, TransportError> {
        info!("{} <- {} bytes: {}", topic, payload.len(), hex_dump(payload));
        let offset = self.sent;
        self.sent += 1;
        Ok(PublishAck {
            topic: topic.to_string(),
            bytes: payload.len(),
            offset: Some(offset),
        })
    }
}

/// Appends one `timestamp topic hex` line per payload.
pub struct FilePublisher {
    path: PathBuf,
    file: File,
    lines: u64,
}

impl FilePublisher {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, TransportError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file,
            lines: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Publisher for FilePublisher {
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<PublishAck, TransportError> {
        writeln!(
            self.file,
            "{} {} {}",
            Utc::now().to_rfc3339(),
            topic,
            hex_dump(payload)
        )?;
        self.file.flush()?;
        let offset = self.lines;
        self.lines += 1;
        Ok(PublishAck {
            topic: topic.to_string(),
            bytes: payload.len(),
            offset: Some(offset),
        })
    }
}

/// Keeps every payload in memory. Can be switched to refuse publishes.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    pub sent: Vec<(String, Vec<u8>)>,
    pub reject: bool,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Publisher for RecordingPublisher {
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<PublishAck, TransportError> {
        if self.reject {
            return Err(TransportError::Rejected {
                topic: topic.to_string(),
                reason: "broker unavailable".to_string(),
            });
        }
        self.sent.push((topic.to_string(), payload.to_vec()));
        Ok(PublishAck {
            topic: topic.to_string(),
            bytes: payload.len(),
            offset: Some(self.sent.len() as u64 - 1),
        })
    }
}

impl<P: Publisher + ?Sized> Publisher for Box<P> {
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<PublishAck, TransportError> {
        (**self).publish(topic, payload)
    }
}
