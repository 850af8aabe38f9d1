// File: radiobot-core/src/services/title_prober.rs
//
// Reads the current track title of a stream by running ffmpeg against it
// and scraping the metadata dump on stderr.

use std::process::Stdio;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, trace, warn};

use radiobot_common::traits::media_traits::{TitleSource, UNKNOWN_TITLE};
use crate::Error;

static TITLE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Title\s*:\s*(.*)").expect("static regex"));

/// First title found in an ffmpeg stderr line, trimmed. Empty values count as no match.
pub fn parse_stream_title(line: &str) -> Option<String> {
    let caps = TITLE_LINE.captures(line)?;
    let title = caps.get(1)?.as_str().trim();
    (!title.is_empty()).then(|| title.to_string())
}

pub struct FfmpegTitleProber {
    program: String,
}

impl FfmpegTitleProber {
    pub fn new() -> Self {
        Self::with_program("ffmpeg")
    }

    /// Uses a different executable, e.g. an absolute path to ffmpeg.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn run(&self, url: &str, timeout: Duration) -> Result<String, Error> {
        let mut child = Command::new(&self.program)
            .args(["-hide_banner", "-re", "-i", url, "-f", "ffmetadata", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::ProbeFailure(format!("cannot spawn {}: {e}", self.program)))?;

        let result = tokio::time::timeout(timeout, scan_stderr(&mut child)).await;
        reap(&mut child).await;

        match result {
            Ok(Ok(Some(title))) => Ok(title),
            Ok(Ok(None)) => Err(Error::ProbeFailure("no title in stream metadata".into())),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(Error::ProbeTimeout(timeout)),
        }
    }
}

impl Default for FfmpegTitleProber {
    fn default() -> Self {
        Self::new()
    }
}

async fn scan_stderr(child: &mut Child) -> Result<Option<String>, Error> {
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| Error::ProbeFailure("ffmpeg stderr not captured".into()))?;
    let mut lines = BufReader::new(stderr).lines();

    while let Some(line) = lines.next_line().await? {
        trace!("ffmpeg: {line}");
        if let Some(title) = parse_stream_title(&line) {
            return Ok(Some(title));
        }
    }
    Ok(None)
}

async fn reap(child: &mut Child) {
    if let Ok(Some(_)) = child.try_wait() {
        return;
    }
    if let Err(e) = child.kill().await {
        debug!("ffmpeg probe already gone: {e}");
    }
}

#[async_trait]
impl TitleSource for FfmpegTitleProber {
    async fn probe(&self, url: &str, timeout: Duration) -> String {
        match self.run(url, timeout).await {
            Ok(title) => {
                debug!("Probed title '{title}' from {url}");
                title
            }
            Err(e) => {
                warn!("Title probe for {url} failed: {e}");
                UNKNOWN_TITLE.to_string()
            }
        }
    }
}
