//! EDID Identity Decoding
//!
//! Turns the hex EDID text reported by xrandr into the monitor's serial
//! number. Interpretation of the EDID is delegated to `edid-decode`; this
//! module only feeds it the block and picks the `Serial Number:` token out of
//! its report.
//!
//! The block is written to the decoder's stdin on a separate task while the
//! caller reads stdout, so a decoder that emits a large report before it has
//! consumed its whole input cannot deadlock the two pipes.

use std::process::Stdio;
use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, warn};

use crate::tools::{ToolError, ToolRunner};

/// Identity decoding errors
///
/// These mean the decoder could not be run at all. A block that simply carries
/// no serial decodes to an empty string instead.
#[derive(Error, Debug)]
pub enum IdentityDecodeError {
    /// Decoder process could not be started or talked to
    #[error("Identity decoder failed: {0}")]
    Tool(#[from] ToolError),

    /// Task feeding the decoder's stdin died
    #[error("Identity decoder input task failed: {0}")]
    Writer(String),
}

/// Decodes an identity block into a serial number
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityDecoder: Send + Sync {
    /// Decode `identity_block` (hex text) into a serial, possibly empty.
    async fn decode(&self, identity_block: &str) -> Result<String, IdentityDecodeError>;
}

fn serial_regex() -> &'static Regex {
    static SERIAL: OnceLock<Regex> = OnceLock::new();
    SERIAL.get_or_init(|| Regex::new(r"Serial Number: (\w+)").expect("serial pattern is valid"))
}

fn serial_in_line(line: &str) -> Option<&str> {
    serial_regex()
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Extract the serial token from a decoder report.
///
/// Returns the token after the last `Serial Number: ` label, or an empty
/// string if the label never appears.
pub fn extract_serial(report: &str) -> String {
    report
        .lines()
        .filter_map(serial_in_line)
        .last()
        .unwrap_or_default()
        .to_string()
}

/// [`IdentityDecoder`] backed by the `edid-decode` program
#[derive(Debug, Clone)]
pub struct EdidDecodeTool {
    program: String,
    args: Vec<String>,
    runner: ToolRunner,
}

impl EdidDecodeTool {
    /// Create a decoder that runs `program` with no arguments
    pub fn new(program: impl Into<String>, runner: ToolRunner) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            runner,
        }
    }

    /// Arguments passed to the decoder program
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    fn io_error(&self, source: std::io::Error) -> IdentityDecodeError {
        ToolError::Io {
            program: self.program.clone(),
            source,
        }
        .into()
    }

    async fn run(&self, identity_block: &str) -> Result<String, IdentityDecodeError> {
        let mut child = self
            .runner
            .command(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| ToolError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let mut stdin = child.stdin.take().ok_or_else(|| ToolError::MissingPipe {
            program: self.program.clone(),
            stream: "stdin",
        })?;
        let stdout = child.stdout.take().ok_or_else(|| ToolError::MissingPipe {
            program: self.program.clone(),
            stream: "stdout",
        })?;

        let payload = identity_block.to_string();
        let writer = tokio::spawn(async move {
            stdin.write_all(payload.as_bytes()).await?;
            // Dropping stdin after shutdown closes the pipe so the decoder sees EOF
            stdin.shutdown().await
        });

        let mut serial = String::new();
        let mut lines = BufReader::new(stdout).lines();
        while let Some(line) = lines.next_line().await.map_err(|e| self.io_error(e))? {
            if let Some(token) = serial_in_line(&line) {
                serial = token.to_string();
            }
        }

        match writer.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                debug!("{} closed its input early", self.program);
            }
            Ok(Err(e)) => return Err(self.io_error(e)),
            Err(e) => return Err(IdentityDecodeError::Writer(e.to_string())),
        }

        let status = child.wait().await.map_err(|e| self.io_error(e))?;
        if !status.success() {
            // edid-decode exits non-zero on blocks it considers malformed;
            // that is a missing serial, not a tooling failure.
            warn!("{} exited with {} (serial: {:?})", self.program, status, serial);
        }

        Ok(serial)
    }
}

#[async_trait]
impl IdentityDecoder for EdidDecodeTool {
    async fn decode(&self, identity_block: &str) -> Result<String, IdentityDecodeError> {
        let after = self.runner.timeout();
        let serial = tokio::time::timeout(after, self.run(identity_block))
            .await
            .map_err(|_| ToolError::Timeout {
                program: self.program.clone(),
                after,
            })??;

        debug!("Decoded serial {:?} from {} hex chars", serial, identity_block.len());
        Ok(serial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = "\
edid-decode (hex):

00 ff ff ff ff ff ff 00 4c 2d 0e 0c 4c 4e 42 42

Block 0, Base EDID:
  EDID Structure Version & Revision: 1.3
  Vendor & Product Identification:
    Manufacturer: SAM
    Model: 3086
    Serial Number: 1111575116
    Made in: week 1 of 2016
  Display Descriptors:
    Display Product Name: 'S24D300'
    Display Product Serial Number: 'H4ZH100000'
";

    #[test]
    fn test_extract_serial_from_report() {
        assert_eq!(extract_serial(REPORT), "1111575116");
    }

    #[test]
    fn test_extract_serial_missing_label_is_empty() {
        assert_eq!(extract_serial("Block 0, Base EDID:\n  Manufacturer: SAM\n"), "");
        assert_eq!(extract_serial(""), "");
    }

    #[test]
    fn test_extract_serial_last_label_wins() {
        let report = "Serial Number: 111\nother line\nSerial Number: 222\n";
        assert_eq!(extract_serial(report), "222");
    }

    #[test]
    fn test_quoted_product_serial_is_not_a_serial() {
        assert_eq!(extract_serial("Display Product Serial Number: 'H4ZH'\n"), "");
    }

    #[cfg(unix)]
    mod process {
        use super::super::*;
        use std::time::Duration;

        fn sh(script: &str) -> EdidDecodeTool {
            EdidDecodeTool::new("sh", ToolRunner::default()).with_args(["-c", script])
        }

        #[tokio::test]
        async fn test_decode_reads_serial_from_child() {
            let decoder = sh("cat >/dev/null; echo '    Serial Number: 1111838796'");
            let serial = decoder.decode("00ffffffffffff00").await.unwrap();
            assert_eq!(serial, "1111838796");
        }

        #[tokio::test]
        async fn test_decode_feeds_block_on_stdin() {
            let decoder = sh(r#"printf 'Serial Number: %s\n' "$(cat)""#);
            let serial = decoder.decode("abc123").await.unwrap();
            assert_eq!(serial, "abc123");
        }

        #[tokio::test]
        async fn test_decode_without_label_is_empty() {
            let decoder = sh("cat >/dev/null; echo 'EDID checksum mismatch'");
            let serial = decoder.decode("00ff").await.unwrap();
            assert_eq!(serial, "");
        }

        #[tokio::test]
        async fn test_decode_nonzero_exit_still_returns_serial() {
            let decoder = sh("cat >/dev/null; echo 'Serial Number: 42'; exit 1");
            let serial = decoder.decode("00ff").await.unwrap();
            assert_eq!(serial, "42");
        }

        #[tokio::test]
        async fn test_decode_large_report_before_input_does_not_deadlock() {
            // Writes far more than a pipe buffer before reading its input
            let decoder = sh(
                "head -c 16 >/dev/null; yes 'filler line' | head -n 50000; \
                 cat >/dev/null; echo 'Serial Number: 99'",
            );
            let block = "0123456789abcdef".repeat(16 * 1024);
            let serial = decoder.decode(&block).await.unwrap();
            assert_eq!(serial, "99");
        }

        #[tokio::test]
        async fn test_decode_missing_program_is_error() {
            let decoder = EdidDecodeTool::new("/nonexistent/edid-decode", ToolRunner::default());
            let err = decoder.decode("00ff").await.unwrap_err();
            assert!(matches!(err, IdentityDecodeError::Tool(ToolError::Spawn { .. })));
        }

        #[tokio::test]
        async fn test_decode_times_out() {
            let decoder = EdidDecodeTool::new("sh", ToolRunner::new(Duration::from_millis(100)))
                .with_args(["-c", "sleep 5"]);
            let err = decoder.decode("00ff").await.unwrap_err();
            assert!(matches!(err, IdentityDecodeError::Tool(ToolError::Timeout { .. })));
        }
    }
}
