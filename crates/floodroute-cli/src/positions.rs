//! Line-oriented position feed.
//!
//! Each line is `lat,lon`. Blank lines and `#` comments are skipped, malformed lines
//! are logged and skipped. `!denied` and `!unavailable` emit the matching location
//! error, which lets a recorded feed replay a failed fix.

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use floodroute_core::{Coordinate, LocationProvider, PlannerError};
use futures_util::stream::{self, Stream};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::{mpsc, Mutex};

type PositionUpdate = Result<Coordinate, PlannerError>;

/// Parse one feed line. `None` means the line carries no update.
pub fn parse_position_line(line: &str) -> Option<PositionUpdate> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    match line {
        "!denied" => return Some(Err(PlannerError::LocationDenied)),
        "!unavailable" => return Some(Err(PlannerError::LocationUnavailable)),
        _ => {}
    }
    match line.parse::<Coordinate>() {
        Ok(position) => Some(Ok(position)),
        Err(err) => {
            tracing::warn!("Skipping position line: {}", err);
            None
        }
    }
}

/// Positions read in the background from a file or stdin.
///
/// The first update can be taken as a one-shot fix through [`LocationProvider`];
/// the remainder is consumed with [`PositionFeed::into_stream`].
pub struct PositionFeed {
    updates: Mutex<mpsc::Receiver<PositionUpdate>>,
}

impl PositionFeed {
    pub fn from_reader<R>(reader: R) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(async move {
            let mut lines = BufReader::new(reader).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if let Some(update) = parse_position_line(&line) {
                            if tx.send(update).await.is_err() {
                                break;
                            }
                        }
                    }
                    Ok(None) => break,
                    Err(err) => {
                        tracing::warn!("Position feed read failed: {}", err);
                        let _ = tx.send(Err(PlannerError::LocationUnavailable)).await;
                        break;
                    }
                }
            }
        });
        Self {
            updates: Mutex::new(rx),
        }
    }

    /// Open a feed file, or stdin for `-`.
    pub async fn open(path: &str) -> Result<Self> {
        if path == "-" {
            return Ok(Self::from_reader(tokio::io::stdin()));
        }
        let file = tokio::fs::File::open(Path::new(path))
            .await
            .with_context(|| format!("Failed to open position feed {}", path))?;
        Ok(Self::from_reader(file))
    }

    pub fn into_stream(self) -> impl Stream<Item = PositionUpdate> + Unpin {
        let rx = self.updates.into_inner();
        Box::pin(stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|update| (update, rx))
        }))
    }
}

impl LocationProvider for PositionFeed {
    fn current_position(
        &self,
        timeout: Duration,
    ) -> impl Future<Output = Result<Coordinate, PlannerError>> + Send {
        async move {
            let mut updates = self.updates.lock().await;
            match tokio::time::timeout(timeout, updates.recv()).await {
                Ok(Some(update)) => update,
                Ok(None) => Err(PlannerError::LocationUnavailable),
                Err(_) => Err(PlannerError::LocationTimeout),
            }
        }
    }
}
