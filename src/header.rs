//! Header-skip state machine owned by the sink stage.
//!
//! ```text
//!   InHeader --(sentinel line)--> InBody
//!   InHeader | InBody --(end of stream)--> Terminated
//! ```
//!
//! The sentinel line itself is consumed. Only its first occurrence
//! matters: once in the body, identical lines are ordinary content.

use crate::config::{MatchMode, PipelineConfig};
use crate::error::{PipelineError, Result};
use crate::line::Line;
use memchr::memmem;

/// Position of the sink in its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderState {
    InHeader,
    InBody,
    Terminated,
}

/// What the sink should do with a Line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Header line, discard.
    Skip,
    /// The sentinel line, discard and switch to the body.
    Sentinel,
    /// Body line, write to output.
    Emit,
}

/// Decides whether a Line is the sentinel marker.
#[derive(Debug, Clone)]
pub struct SentinelMatcher {
    sentinel: Vec<u8>,
    mode: MatchMode,
}

impl SentinelMatcher {
    pub fn new(sentinel: impl Into<Vec<u8>>, mode: MatchMode) -> Self {
        Self {
            sentinel: sentinel.into(),
            mode,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.sentinel.clone(), config.match_mode)
    }

    /// In exact mode only a whole input line can match; the tail chunk of
    /// a split line never does.
    #[inline]
    pub fn is_sentinel(&self, line: &Line) -> bool {
        match self.mode {
            MatchMode::Exact => {
                !line.is_continuation() && line.content() == self.sentinel.as_slice()
            }
            MatchMode::Contains => memmem::find(line.as_bytes(), &self.sentinel).is_some(),
        }
    }
}

/// The sink's header/body classifier.
#[derive(Debug, Clone)]
pub struct HeaderFilter {
    state: HeaderState,
    matcher: SentinelMatcher,
}

impl HeaderFilter {
    pub fn new(matcher: SentinelMatcher) -> Self {
        Self {
            state: HeaderState::InHeader,
            matcher,
        }
    }

    pub fn state(&self) -> HeaderState {
        self.state
    }

    /// Classify the next Line and advance the state.
    pub fn classify(&mut self, line: &Line) -> Result<Verdict> {
        match self.state {
            HeaderState::InHeader if self.matcher.is_sentinel(line) => {
                self.state = HeaderState::InBody;
                Ok(Verdict::Sentinel)
            }
            HeaderState::InHeader => Ok(Verdict::Skip),
            HeaderState::InBody => Ok(Verdict::Emit),
            HeaderState::Terminated => Err(PipelineError::ProtocolViolation(
                "line delivered to the sink after termination".to_string(),
            )),
        }
    }

    /// Enter the absorbing terminal state. Returns the state it left.
    pub fn terminate(&mut self) -> HeaderState {
        std::mem::replace(&mut self.state, HeaderState::Terminated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(mode: MatchMode) -> HeaderFilter {
        HeaderFilter::new(SentinelMatcher::new("end_header", mode))
    }

    fn run(filter: &mut HeaderFilter, lines: &[&str]) -> Vec<String> {
        let mut out = Vec::new();
        for &text in lines {
            let line = Line::from(text);
            if filter.classify(&line).unwrap() == Verdict::Emit {
                out.push(text.to_string());
            }
        }
        out
    }

    #[test]
    fn test_body_after_sentinel() {
        let mut f = filter(MatchMode::Exact);
        let out = run(
            &mut f,
            &["meta: x\n", "meta: y\n", "end_header\n", "hello\n", "world\n"],
        );
        assert_eq!(out, vec!["hello\n", "world\n"]);
        assert_eq!(f.state(), HeaderState::InBody);
    }

    #[test]
    fn test_no_sentinel_means_no_output() {
        let mut f = filter(MatchMode::Exact);
        assert!(run(&mut f, &["a\n", "b\n", "c\n"]).is_empty());
        assert_eq!(f.state(), HeaderState::InHeader);
    }

    #[test]
    fn test_recurring_sentinel_passes_through() {
        let mut f = filter(MatchMode::Exact);
        let out = run(&mut f, &["end_header\n", "x\n", "end_header\n", "y\n"]);
        assert_eq!(out, vec!["x\n", "end_header\n", "y\n"]);
    }

    #[test]
    fn test_exact_match_ignores_terminator_only() {
        let m = SentinelMatcher::new("end_header", MatchMode::Exact);
        assert!(m.is_sentinel(&Line::from("end_header")));
        assert!(m.is_sentinel(&Line::from("end_header\n")));
        assert!(m.is_sentinel(&Line::from("end_header\r\n")));
        assert!(!m.is_sentinel(&Line::from("end_header \n")));
        assert!(!m.is_sentinel(&Line::from(" end_header\n")));
        assert!(!m.is_sentinel(&Line::from("xend_headerx\n")));
    }

    #[test]
    fn test_split_tail_is_not_the_sentinel() {
        let m = SentinelMatcher::new("end_header", MatchMode::Exact);
        assert!(!m.is_sentinel(&Line::continuation(b"end_header\n".to_vec())));

        let mut f = filter(MatchMode::Exact);
        let tail = Line::continuation(b"end_header\n".to_vec());
        assert_eq!(f.classify(&tail).unwrap(), Verdict::Skip);
        assert_eq!(f.state(), HeaderState::InHeader);
    }

    #[test]
    fn test_contains_match() {
        let m = SentinelMatcher::new("end_header", MatchMode::Contains);
        assert!(m.is_sentinel(&Line::from("-- end_header --\n")));
        assert!(!m.is_sentinel(&Line::from("end_head\n")));
    }

    #[test]
    fn test_terminated_is_absorbing() {
        let mut f = filter(MatchMode::Exact);
        assert_eq!(f.terminate(), HeaderState::InHeader);
        assert_eq!(f.terminate(), HeaderState::Terminated);
        assert!(matches!(
            f.classify(&Line::from("late\n")),
            Err(PipelineError::ProtocolViolation(_))
        ));
    }
}
