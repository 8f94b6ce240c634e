//! Live output scanning via xrandr

use std::process::Stdio;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use super::{Output, ReportParser, ScanError};
use crate::identity::IdentityDecoder;
use crate::tools::{collect_stderr, ToolError, ToolRunner};

/// Parse a properties report from `reader`, decoding identity blocks as they
/// complete.
///
/// Each connected output with a non-empty block is decoded exactly once,
/// before the line after its block is processed (or at end of stream).
///
/// # Errors
///
/// [`ScanError::Report`] if reading fails, [`ScanError::IdentityDecode`] if
/// the decoder cannot be run.
pub async fn scan_report<R, D>(reader: R, decoder: &D) -> Result<Vec<Output>, ScanError>
where
    R: AsyncBufRead + Unpin,
    D: IdentityDecoder + ?Sized,
{
    let mut parser = ReportParser::new();
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await.map_err(ScanError::Report)? {
        if let Some(index) = parser.feed_line(&line) {
            decode_output(&mut parser, index, decoder).await?;
        }
    }

    if let Some(index) = parser.finish() {
        decode_output(&mut parser, index, decoder).await?;
    }

    Ok(parser.into_outputs())
}

async fn decode_output<D>(parser: &mut ReportParser, index: usize, decoder: &D) -> Result<(), ScanError>
where
    D: IdentityDecoder + ?Sized,
{
    let Some(output) = parser.output_mut(index) else {
        return Ok(());
    };

    if !output.has_identity_block() {
        return Ok(());
    }

    let serial = decoder
        .decode(&output.identity_block)
        .await
        .map_err(|source| ScanError::IdentityDecode {
            output: output.name.clone(),
            source,
        })?;
    output.serial = serial;

    debug!("Output {} has serial {:?}", output.name, output.serial);
    Ok(())
}

/// Scans outputs by running `xrandr --properties`
pub struct XrandrScanner<D> {
    program: String,
    args: Vec<String>,
    runner: ToolRunner,
    decoder: D,
}

impl<D: IdentityDecoder> XrandrScanner<D> {
    /// Create a scanner running `program --properties`
    pub fn new(program: impl Into<String>, runner: ToolRunner, decoder: D) -> Self {
        Self {
            program: program.into(),
            args: vec!["--properties".to_string()],
            runner,
            decoder,
        }
    }

    /// Replace the enumeration arguments
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Enumerate outputs in report order.
    ///
    /// The timeout of the runner bounds the whole scan, identity decoding
    /// included.
    ///
    /// # Errors
    ///
    /// [`ScanError::Enumeration`] if xrandr cannot be started, times out or
    /// exits unsuccessfully; [`ScanError::IdentityDecode`] if the decoder
    /// cannot be run.
    pub async fn scan(&self) -> Result<Vec<Output>, ScanError> {
        let after = self.runner.timeout();
        let outputs = tokio::time::timeout(after, self.scan_inner())
            .await
            .map_err(|_| ToolError::Timeout {
                program: self.program.clone(),
                after,
            })??;

        info!(
            "Discovered {} outputs ({} connected)",
            outputs.len(),
            outputs.iter().filter(|o| o.connected).count()
        );
        Ok(outputs)
    }

    async fn scan_inner(&self) -> Result<Vec<Output>, ScanError> {
        debug!("Running: {} {}", self.program, self.args.join(" "));

        let mut child = self
            .runner
            .command(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ToolError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let stdout = child.stdout.take().ok_or_else(|| ToolError::MissingPipe {
            program: self.program.clone(),
            stream: "stdout",
        })?;
        let stderr = collect_stderr(&mut child);

        let outputs = scan_report(BufReader::new(stdout), &self.decoder).await?;

        let status = child.wait().await.map_err(|source| ToolError::Io {
            program: self.program.clone(),
            source,
        })?;

        if !status.success() {
            let stderr = match stderr {
                Some(handle) => handle.await.unwrap_or_default(),
                None => String::new(),
            };
            return Err(ToolError::Failed {
                program: self.program.clone(),
                status,
                stderr,
            }
            .into());
        }

        Ok(outputs)
    }
}
