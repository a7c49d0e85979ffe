//! Corrector collaborator.
//!
//! Model hosting and inference live outside this crate. The engine talks to
//! a [`Corrector`] that takes a batch of sentences and returns the corrected
//! batch, same length and order. [`IdentityCorrector`] makes the pipeline
//! runnable without a model; [`CommandCorrector`] bridges to an external
//! model process over JSON on stdin/stdout.

use std::process::Stdio;

use anyhow::{bail, Context};
use futures::future::BoxFuture;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// External corrector contract: one call per batch, outputs aligned by
/// position with the inputs. A mismatched output length is a batch-level
/// failure handled by the dispatcher.
pub trait Corrector: Send + Sync {
    fn correct_batch<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, anyhow::Result<Vec<String>>>;
}

/// Pass-through corrector: every sentence comes back unchanged
pub struct IdentityCorrector;

impl Corrector for IdentityCorrector {
    fn correct_batch<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, anyhow::Result<Vec<String>>> {
        Box::pin(async move { Ok(texts.to_vec()) })
    }
}

/// Corrector backed by an external process.
///
/// Each batch spawns the configured command, writes the batch as a JSON
/// array of strings to its stdin, and reads the corrected JSON array from
/// its stdout. A non-zero exit status or malformed output fails the batch.
pub struct CommandCorrector {
    program: String,
    args: Vec<String>,
}

impl CommandCorrector {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self { program: program.into(), args }
    }

    /// Build from a whitespace-separated command line
    pub fn from_command_line(line: &str) -> anyhow::Result<Self> {
        let mut parts = line.split_whitespace().map(str::to_string);
        let program = parts.next().context("corrector command is empty")?;
        Ok(Self { program, args: parts.collect() })
    }
}

impl Corrector for CommandCorrector {
    fn correct_batch<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, anyhow::Result<Vec<String>>> {
        Box::pin(async move {
            debug!(batch_len = texts.len(), program = %self.program, "spawning corrector process");

            let mut child = Command::new(&self.program)
                .args(&self.args)
                .stdin(Stdio::piped())
                .stdout(Stdio::piped())
                .stderr(Stdio::null())
                .spawn()
                .with_context(|| format!("failed to spawn corrector {:?}", self.program))?;

            let payload = serde_json::to_vec(texts).context("failed to encode batch")?;
            let mut stdin = child.stdin.take().context("corrector stdin unavailable")?;
            stdin.write_all(&payload).await.context("failed to write batch")?;
            drop(stdin);

            let output = child.wait_with_output().await.context("corrector did not finish")?;
            if !output.status.success() {
                bail!("corrector process exited with {}", output.status);
            }

            let corrected: Vec<String> = serde_json::from_slice(&output.stdout)
                .context("corrector output is not a JSON array of strings")?;
            Ok(corrected)
        })
    }
}
