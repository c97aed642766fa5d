#[cfg(test)]
#[path = "attachments_test.rs"]
mod tests;

use std::path::Path;
use std::path::PathBuf;

use anyhow::Result;
use tokio::fs;
use tokio::io::AsyncReadExt;

use crate::domain::models::Attachment;

pub const DEFAULT_MAX_FILE_BYTES: usize = 512 * 1024;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttachmentOutcome {
    Attached(Attachment),
    Truncated(Attachment),
    /// The file holds NUL bytes and was left out.
    Skipped(String),
    Failed { name: String, error: String },
}

impl AttachmentOutcome {
    pub fn attachment(&self) -> Option<&Attachment> {
        return match self {
            AttachmentOutcome::Attached(attachment) => Some(attachment),
            AttachmentOutcome::Truncated(attachment) => Some(attachment),
            _ => None,
        };
    }

    pub fn message(&self) -> String {
        return match self {
            AttachmentOutcome::Attached(attachment) => format!("Attached: {}", attachment.name),
            AttachmentOutcome::Truncated(attachment) => {
                format!("File truncated: {}", attachment.name)
            }
            AttachmentOutcome::Skipped(name) => format!("Skipped binary file: {name}"),
            AttachmentOutcome::Failed { name, error } => {
                format!("Failed to read file {name}: {error}")
            }
        };
    }
}

fn file_name(path: &Path) -> String {
    return path
        .file_name()
        .map(|name| return name.to_string_lossy().to_string())
        .unwrap_or_else(|| return path.to_string_lossy().to_string());
}

/// Cuts `data` to at most `max_bytes` without leaving a partial UTF-8
/// sequence at the end.
pub fn truncate_utf8(data: &[u8], max_bytes: usize) -> &[u8] {
    if data.len() <= max_bytes {
        return data;
    }

    // Step back over continuation bytes so the cut lands on a char start.
    let mut end = max_bytes;
    while end > 0 && max_bytes - end < 3 && (data[end] & 0b1100_0000) == 0b1000_0000 {
        end -= 1;
    }

    return &data[..end];
}

pub struct AttachmentReader {
    max_bytes: usize,
}

impl Default for AttachmentReader {
    fn default() -> AttachmentReader {
        return AttachmentReader::new(DEFAULT_MAX_FILE_BYTES);
    }
}

impl AttachmentReader {
    pub fn new(max_bytes: usize) -> AttachmentReader {
        return AttachmentReader { max_bytes };
    }

    async fn read_one(&self, path: &Path) -> Result<AttachmentOutcome> {
        let name = file_name(path);
        let file = fs::File::open(path).await?;

        // One byte past the cap tells a file at the cap from a longer one.
        let mut data = vec![];
        file.take(self.max_bytes as u64 + 1)
            .read_to_end(&mut data)
            .await?;
        let truncated = data.len() > self.max_bytes;
        let head = truncate_utf8(&data, self.max_bytes);

        if head.contains(&0) {
            return Ok(AttachmentOutcome::Skipped(name));
        }

        let attachment = Attachment::new(&name, &String::from_utf8_lossy(head), truncated);
        if truncated {
            return Ok(AttachmentOutcome::Truncated(attachment));
        }

        return Ok(AttachmentOutcome::Attached(attachment));
    }

    /// Reads every path. A failure only affects the file it happened on.
    pub async fn read_all(&self, paths: &[PathBuf]) -> Vec<AttachmentOutcome> {
        let mut res = vec![];
        for path in paths {
            let outcome = match self.read_one(path).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    tracing::warn!(path = ?path, error = ?err, "Failed to read attachment");
                    AttachmentOutcome::Failed {
                        name: file_name(path),
                        error: err.to_string(),
                    }
                }
            };
            res.push(outcome);
        }

        return res;
    }
}
