//! Two-state line parser for the xrandr properties report

use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, trace};

use super::Output;

struct Patterns {
    header: Regex,
    identity_start: Regex,
    identity_line: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        header: Regex::new(r"^([0-9A-Za-z_-]+) (disconnected|connected)")
            .expect("header pattern is valid"),
        identity_start: Regex::new(r"^\s+EDID:").expect("EDID marker pattern is valid"),
        // Whole-line hex only; property lines such as "\taudio: auto" start
        // with hex letters too.
        identity_line: Regex::new(r"^\s+[0-9a-fA-F]+\s*$").expect("EDID line pattern is valid"),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    SeekingHeader,
    AccumulatingIdentity { index: usize },
}

/// Line classifier for the `xrandr --properties` report.
///
/// Feed it lines in report order. Whenever a line closes an identity block,
/// [`feed_line`](Self::feed_line) returns the index of the output that owns
/// it so the caller can decode it before feeding the next line.
#[derive(Debug)]
pub struct ReportParser {
    outputs: Vec<Output>,
    state: State,
}

impl ReportParser {
    /// Create a parser in the header-seeking state
    pub fn new() -> Self {
        Self {
            outputs: Vec::new(),
            state: State::SeekingHeader,
        }
    }

    /// Feed one report line.
    ///
    /// # Returns
    ///
    /// `Some(index)` if this line ended accumulation of the identity block of
    /// output `index`. The line has already been re-classified in that case,
    /// so it may have started the next output.
    pub fn feed_line(&mut self, line: &str) -> Option<usize> {
        let mut completed = None;

        if let State::AccumulatingIdentity { index } = self.state {
            if patterns().identity_line.is_match(line) {
                self.outputs[index].identity_block.push_str(line.trim());
                return None;
            }
            self.state = State::SeekingHeader;
            completed = Some(index);
        }

        self.classify(line);
        completed
    }

    /// Close the stream.
    ///
    /// Returns the index of the output whose block was still open, if any.
    pub fn finish(&mut self) -> Option<usize> {
        match std::mem::replace(&mut self.state, State::SeekingHeader) {
            State::AccumulatingIdentity { index } => Some(index),
            State::SeekingHeader => None,
        }
    }

    fn classify(&mut self, line: &str) {
        let patterns = patterns();

        if let Some(caps) = patterns.header.captures(line) {
            let output = Output::new(&caps[1], &caps[2] == "connected");
            debug!(
                "Found output {} ({})",
                output.name,
                if output.connected { "connected" } else { "disconnected" }
            );
            self.outputs.push(output);
            return;
        }

        if patterns.identity_start.is_match(line) {
            match self.outputs.len().checked_sub(1) {
                Some(index) if !self.outputs[index].connected => {
                    debug!("Ignoring EDID of disconnected output {}", self.outputs[index].name);
                }
                // A second EDID property on the same output would decode it twice
                Some(index) if self.outputs[index].identity_block.is_empty() => {
                    self.state = State::AccumulatingIdentity { index };
                }
                Some(index) => {
                    debug!("Ignoring repeated EDID for {}", self.outputs[index].name);
                }
                None => debug!("Ignoring EDID before any output header"),
            }
            return;
        }

        trace!("Ignoring line: {}", line);
    }

    /// Output at `index`, if any
    pub fn output_mut(&mut self, index: usize) -> Option<&mut Output> {
        self.outputs.get_mut(index)
    }

    /// Outputs seen so far, in header order
    pub fn outputs(&self) -> &[Output] {
        &self.outputs
    }

    /// Consume the parser and return the outputs in header order
    pub fn into_outputs(self) -> Vec<Output> {
        self.outputs
    }
}

impl Default for ReportParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_all(parser: &mut ReportParser, report: &str) -> Vec<usize> {
        let mut completed: Vec<usize> = report.lines().filter_map(|l| parser.feed_line(l)).collect();
        completed.extend(parser.finish());
        completed
    }

    #[test]
    fn test_headers_create_outputs_in_order() {
        let mut parser = ReportParser::new();
        let report = "\
Screen 0: minimum 8 x 8, current 1920 x 1080, maximum 32767 x 32767
eDP1 connected primary 1920x1080+0+0 (normal left inverted right x axis y axis) 309mm x 174mm
   1920x1080     60.02*+
DP1 disconnected (normal left inverted right x axis y axis)
HDMI-2 connected (normal left inverted right x axis y axis)
VIRTUAL_1 disconnected (normal left inverted right x axis y axis)
";
        feed_all(&mut parser, report);

        let outputs = parser.into_outputs();
        let summary: Vec<(&str, bool)> = outputs.iter().map(|o| (o.name.as_str(), o.connected)).collect();
        assert_eq!(
            summary,
            vec![("eDP1", true), ("DP1", false), ("HDMI-2", true), ("VIRTUAL_1", false)]
        );
    }

    #[test]
    fn test_identity_lines_are_trimmed_and_concatenated() {
        let mut parser = ReportParser::new();
        let report = "\
HDMI1 connected 1920x1080+0+0
\tEDID:
\t\t00ffffffffffff00
\t\t4c2d0e0c4c4e4242
\tBACKLIGHT: 400
";
        let completed = feed_all(&mut parser, report);

        assert_eq!(completed, vec![0]);
        assert_eq!(parser.outputs()[0].identity_block, "00ffffffffffff004c2d0e0c4c4e4242");
    }

    #[test]
    fn test_completion_reported_on_first_non_hex_line() {
        let mut parser = ReportParser::new();
        assert_eq!(parser.feed_line("DP1 connected 2560x1440+0+0"), None);
        assert_eq!(parser.feed_line("\tEDID:"), None);
        assert_eq!(parser.feed_line("\t\t00ff"), None);
        assert_eq!(parser.feed_line("\t\tabcd"), None);
        assert_eq!(parser.feed_line("\taudio: auto"), Some(0));
        assert_eq!(parser.feed_line("\t\tsupported: force-dvi, off, auto, on"), None);
        assert_eq!(parser.finish(), None);
        assert_eq!(parser.outputs()[0].identity_block, "00ffabcd");
    }

    #[test]
    fn test_header_ends_accumulation_and_starts_next_output() {
        let mut parser = ReportParser::new();
        parser.feed_line("DP1 connected 2560x1440+0+0");
        parser.feed_line("\tEDID:");
        parser.feed_line("\t\t00ff");

        assert_eq!(parser.feed_line("HDMI1 disconnected"), Some(0));
        assert_eq!(parser.outputs().len(), 2);
        assert_eq!(parser.outputs()[1].name, "HDMI1");
        assert_eq!(parser.outputs()[1].identity_block, "");
    }

    #[test]
    fn test_finish_closes_open_block() {
        let mut parser = ReportParser::new();
        parser.feed_line("eDP1 connected");
        parser.feed_line("\tEDID:");
        parser.feed_line("\t\t00ff");
        assert_eq!(parser.finish(), Some(0));
        assert_eq!(parser.finish(), None);
    }

    #[test]
    fn test_mode_lines_are_not_identity_lines() {
        let mut parser = ReportParser::new();
        parser.feed_line("eDP1 connected");
        parser.feed_line("\tEDID:");
        parser.feed_line("\t\t00ff");
        assert_eq!(parser.feed_line("   1920x1080     60.02*+  59.93"), Some(0));
        assert_eq!(parser.outputs()[0].identity_block, "00ff");
    }

    #[test]
    fn test_edid_before_header_is_ignored() {
        let mut parser = ReportParser::new();
        assert_eq!(parser.feed_line("\tEDID:"), None);
        assert_eq!(parser.feed_line("\t\t00ff"), None);
        assert_eq!(parser.finish(), None);
        assert!(parser.outputs().is_empty());
    }

    #[test]
    fn test_repeated_edid_is_not_accumulated_twice() {
        let mut parser = ReportParser::new();
        let report = "\
eDP1 connected
\tEDID:
\t\t00ff
\tEDID:
\t\tabcd
";
        let completed = feed_all(&mut parser, report);
        assert_eq!(completed, vec![0]);
        assert_eq!(parser.outputs()[0].identity_block, "00ff");
    }

    #[test]
    fn test_edid_of_disconnected_output_is_not_kept() {
        let mut parser = ReportParser::new();
        let report = "\
DP1 disconnected (normal left inverted right x axis y axis)
\tEDID:
\t\t00ff
HDMI1 connected
\tEDID:
\t\tabcd
";
        let completed = feed_all(&mut parser, report);

        assert_eq!(completed, vec![1]);
        assert_eq!(parser.outputs()[0].identity_block, "");
        assert!(!parser.outputs()[0].has_identity_block());
        assert_eq!(parser.outputs()[1].identity_block, "abcd");
    }

    #[test]
    fn test_unknown_connection_state_is_not_a_header() {
        let mut parser = ReportParser::new();
        parser.feed_line("VGA1 unknown connection (normal left inverted right x axis y axis)");
        assert!(parser.outputs().is_empty());
    }
}
