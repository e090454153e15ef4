//! Line-oriented host: every input line is offered to the plugin on its own task.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::task::JoinSet;
use tracing::{debug, error};

use crate::error::{RelayError, RelayResult};
use crate::plugin::ChatPlugin;
use crate::session::{OutgoingMessage, Session};

/// Stdout-backed session; rendered images land in `image_dir`.
pub struct ConsoleSession {
    id: String,
    image_dir: PathBuf,
}

impl ConsoleSession {
    pub fn new(id: impl Into<String>, image_dir: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            image_dir: image_dir.into(),
        }
    }
}

#[async_trait]
impl Session for ConsoleSession {
    fn id(&self) -> &str {
        &self.id
    }

    async fn send(&self, message: OutgoingMessage) -> RelayResult<()> {
        let now = chrono::Local::now().format("%H:%M:%S");
        match message {
            OutgoingMessage::Text(text) => println!("[{now}] {text}"),
            OutgoingMessage::Image { data, mime } => {
                let ext = mime.strip_prefix("image/").unwrap_or("png");
                let path = self.image_dir.join(format!("{}.{ext}", uuid::Uuid::new_v4()));
                tokio::fs::write(&path, &data)
                    .await
                    .map_err(|e| RelayError::Session(format!("{}: {e}", path.display())))?;
                println!("[{now}] image: {}", path.display());
            }
        }
        Ok(())
    }
}

/// Dispatch each line of `reader` concurrently until EOF.
///
/// Finished tasks are reaped while input is still arriving. Returns how many
/// lines were addressed to the command.
pub async fn serve_lines<R>(plugin: Arc<ChatPlugin>, session: Arc<dyn Session>, reader: R) -> RelayResult<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut tasks = JoinSet::new();
    let mut handled = 0;
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let plugin = plugin.clone();
                let session = session.clone();
                tasks.spawn(async move {
                    match plugin.handle(session.as_ref(), &line).await {
                        Ok(matched) => {
                            if !matched {
                                debug!(%line, "ignored input without trigger word");
                            }
                            matched
                        }
                        Err(e) => {
                            error!(error = %e, "reply could not be delivered");
                            true
                        }
                    }
                });
            }
            Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                handled += usize::from(joined?);
            }
        }
    }
    while let Some(joined) = tasks.join_next().await {
        handled += usize::from(joined?);
    }
    Ok(handled)
}
