use std::io;
use std::path::PathBuf;
use std::process::{Output, Stdio};
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

/// Lines of process output kept for error details.
const OUTPUT_TAIL_LINES: usize = 20;

/// Why an external tool did not produce its output.
#[derive(Debug, Error)]
pub enum ProcessFailure {
    #[error("failed to run '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("'{program}' exited with {status}: {output}")]
    Exited {
        program: String,
        status: String,
        output: String,
    },

    #[error("'{program}' timed out after {}s", .limit.as_secs_f32())]
    TimedOut { program: String, limit: Duration },

    #[error("'{program}' finished but did not produce {}", .path.display())]
    MissingOutput { program: String, path: PathBuf },
}

impl ProcessFailure {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ProcessFailure::TimedOut { .. })
    }
}

/// Runs `command` to completion under a wall-clock limit.
///
/// The child is killed if the limit elapses (`kill_on_drop`), so a hung tool
/// never outlives the request that started it.
pub async fn run_bounded(mut command: Command, limit: Duration) -> Result<Output, ProcessFailure> {
    let program = command
        .as_std()
        .get_program()
        .to_string_lossy()
        .into_owned();

    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!(program = %program, "Spawning external process");
    let child = command.spawn().map_err(|source| ProcessFailure::Spawn {
        program: program.clone(),
        source,
    })?;

    match tokio::time::timeout(limit, child.wait_with_output()).await {
        Err(_) => {
            warn!(program = %program, limit_secs = limit.as_secs_f32(), "External process timed out");
            Err(ProcessFailure::TimedOut { program, limit })
        }
        Ok(Err(source)) => Err(ProcessFailure::Spawn { program, source }),
        Ok(Ok(output)) if output.status.success() => Ok(output),
        Ok(Ok(output)) => Err(ProcessFailure::Exited {
            program,
            status: output.status.to_string(),
            output: summarize_output(&output),
        }),
    }
}

/// Picks the useful part of a tool's output. TeX marks errors with a leading
/// `!`; when one is present the report starts there, otherwise it is the tail.
pub fn summarize_output(output: &Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let lines: Vec<&str> = stdout
        .lines()
        .chain(stderr.lines())
        .filter(|l| !l.trim().is_empty())
        .collect();

    let start = lines
        .iter()
        .position(|l| l.starts_with('!'))
        .unwrap_or_else(|| lines.len().saturating_sub(OUTPUT_TAIL_LINES));
    let end = (start + OUTPUT_TAIL_LINES).min(lines.len());
    lines[start..end].join("\n")
}
