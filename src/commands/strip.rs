//! Strip command: copy everything after the header sentinel.
//!
//! Front-end over [`Pipeline`] for files and standard streams. The input
//! is opened by the source stage and the output by the sink stage, so a
//! missing input file leaves no output file behind.

use crate::config::{MatchMode, OverflowPolicy, PipelineConfig};
use crate::endpoint::{Input, Output};
use crate::error::Result;
use crate::pipeline::{Pipeline, PipelineStats};
use std::io::{Read, Write};
use std::path::Path;

/// Strip command configuration.
#[derive(Debug, Clone, Default)]
pub struct StripCommand {
    pub config: PipelineConfig,
}

impl StripCommand {
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::new(),
        }
    }

    /// Set the sentinel line.
    pub fn with_sentinel(mut self, sentinel: impl Into<Vec<u8>>) -> Self {
        self.config = self.config.with_sentinel(sentinel);
        self
    }

    /// Match the sentinel as a substring instead of the whole line.
    pub fn with_contains(mut self, contains: bool) -> Self {
        let mode = if contains {
            MatchMode::Contains
        } else {
            MatchMode::Exact
        };
        self.config = self.config.with_match_mode(mode);
        self
    }

    /// Set the maximum Line size in bytes.
    pub fn with_max_line_len(mut self, len: usize) -> Self {
        self.config = self.config.with_max_line_len(len);
        self
    }

    /// Fail on over-long lines instead of splitting them.
    pub fn with_reject_long_lines(mut self, reject: bool) -> Self {
        let policy = if reject {
            OverflowPolicy::Reject
        } else {
            OverflowPolicy::Split
        };
        self.config = self.config.with_overflow(policy);
        self
    }

    pub fn with_low_memory(mut self, low_memory: bool) -> Self {
        self.config = self.config.with_low_memory(low_memory);
        self
    }

    /// Execute on files. `None` or `-` select stdin/stdout.
    pub fn run(&self, input: Option<&Path>, output: Option<&Path>) -> Result<PipelineStats> {
        self.run_endpoints(Input::from_arg(input), Output::from_arg(output))
    }

    /// Execute on arbitrary streams.
    pub fn run_streams<R, W>(&self, input: R, output: W) -> Result<PipelineStats>
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        self.run_endpoints(Input::reader(input), Output::writer(output))
    }

    pub fn run_endpoints(&self, input: Input, output: Output) -> Result<PipelineStats> {
        Pipeline::new(self.config.clone())?.run(input, output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_strip_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.txt");
        let output = dir.path().join("out.txt");
        fs::write(&input, "meta: x\nmeta: y\nend_header\nhello\nworld\n").unwrap();

        let stats = StripCommand::new()
            .run(Some(input.as_path()), Some(output.as_path()))
            .unwrap();

        assert_eq!(fs::read_to_string(&output).unwrap(), "hello\nworld\n");
        assert_eq!(stats.lines_read, 5);
        assert_eq!(stats.header_lines_skipped, 2);
        assert_eq!(stats.sentinel_line, Some(3));
        assert_eq!(stats.lines_written, 2);
    }

    #[test]
    fn test_strip_streams() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.txt");
        let file = fs::File::create(&output).unwrap();
        let input = std::io::Cursor::new(b"# header\n---\nkept\n".to_vec());

        let stats = StripCommand::new()
            .with_sentinel("---")
            .run_streams(input, file)
            .unwrap();

        assert_eq!(fs::read_to_string(&output).unwrap(), "kept\n");
        assert_eq!(stats.sentinel_line, Some(2));
        assert_eq!(stats.lines_written, 1);
    }

    #[test]
    fn test_builder_options() {
        let cmd = StripCommand::new()
            .with_sentinel("---")
            .with_contains(true)
            .with_max_line_len(64)
            .with_reject_long_lines(true)
            .with_low_memory(true);
        assert_eq!(cmd.config.sentinel, b"---");
        assert_eq!(cmd.config.match_mode, MatchMode::Contains);
        assert_eq!(cmd.config.max_line_len, 64);
        assert_eq!(cmd.config.overflow, OverflowPolicy::Reject);
        assert!(cmd.config.low_memory);
    }

    #[test]
    fn test_output_is_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.txt");
        let output = dir.path().join("out.txt");
        fs::write(&input, "end_header\nnew\n").unwrap();
        fs::write(&output, "stale contents that are longer\n").unwrap();

        StripCommand::new()
            .run(Some(input.as_path()), Some(output.as_path()))
            .unwrap();
        assert_eq!(fs::read_to_string(&output).unwrap(), "new\n");
    }
}
