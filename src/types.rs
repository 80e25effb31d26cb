// src/types.rs

//! Plain data types shared by the runner and the runnable units.

use std::collections::BTreeMap;
use std::fmt;

/// Variable substitution map applied to commands before they are spawned.
///
/// Keys are placeholder names (`NAME` for `$NAME` / `${NAME}`).
pub type Variables = BTreeMap<String, String>;

/// Which pipe a piece of output came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKind::Stdout => f.write_str("stdout"),
            StreamKind::Stderr => f.write_str("stderr"),
        }
    }
}

/// A partial piece of a process's output, delivered as soon as it is read.
///
/// Chunk boundaries follow pipe reads, not lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputChunk {
    pub text: String,
    pub stream: StreamKind,
}

impl OutputChunk {
    pub fn stdout(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            stream: StreamKind::Stdout,
        }
    }

    pub fn stderr(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            stream: StreamKind::Stderr,
        }
    }
}

/// Final outcome of one process invocation.
///
/// `stdout` / `stderr` are the concatenation of every chunk delivered for the
/// respective stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionResult {
    pub exit_status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecutionResult {
    pub fn success(&self) -> bool {
        self.exit_status == 0
    }

    /// Append a chunk to the buffer of its stream.
    pub fn push_chunk(&mut self, chunk: &OutputChunk) {
        match chunk.stream {
            StreamKind::Stdout => self.stdout.push_str(&chunk.text),
            StreamKind::Stderr => self.stderr.push_str(&chunk.text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_chunk_routes_by_stream() {
        let mut result = ExecutionResult::default();
        result.push_chunk(&OutputChunk::stdout("a"));
        result.push_chunk(&OutputChunk::stderr("x"));
        result.push_chunk(&OutputChunk::stdout("b\n"));

        assert_eq!(result.stdout, "ab\n");
        assert_eq!(result.stderr, "x");
        assert!(result.success());
    }
}
