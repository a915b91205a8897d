//! In-document search with incremental highlighting.
//!
//! Matches are case-insensitive literal occurrences of the query inside a
//! single text run. Each match becomes its own marker run so the view can
//! paint it and scroll to it. Every query change recomputes everything from
//! the un-highlighted baseline.

use crate::document::{Document, Mark, Run};
use regex::RegexBuilder;
use std::time::{Duration, Instant};

/// Quiet period after the last keystroke before the document is rescanned.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(200);

/// Position of a marker run inside a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchLocation {
    pub block: usize,
    pub run: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

impl Direction {
    fn offset(self) -> i64 {
        match self {
            Direction::Next => 1,
            Direction::Previous => -1,
        }
    }
}

/// Query, match list and focused match.
///
/// `current` is `None` exactly when there are no matches.
#[derive(Debug, Default)]
pub struct SearchState {
    query: String,
    matches: Vec<MatchLocation>,
    current: Option<usize>,
    scroll_requested: bool,
}

impl SearchState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn match_count(&self) -> usize {
        self.matches.len()
    }

    pub fn current(&self) -> Option<usize> {
        self.current
    }

    pub fn current_location(&self) -> Option<MatchLocation> {
        self.current.and_then(|index| self.matches.get(index).copied())
    }

    /// "2 of 5", or empty when there is nothing to show.
    pub fn count_label(&self) -> String {
        match self.current {
            Some(index) if !self.matches.is_empty() => {
                format!("{} of {}", index + 1, self.matches.len())
            }
            _ => String::new(),
        }
    }

    /// Highlight every occurrence of `query` in `doc`. Returns the match count.
    pub fn highlight(&mut self, doc: &mut Document, query: &str) -> usize {
        self.reset(doc);
        self.query = query.to_string();
        if query.is_empty() {
            return 0;
        }

        let pattern = match RegexBuilder::new(&regex::escape(query))
            .case_insensitive(true)
            .build()
        {
            Ok(pattern) => pattern,
            Err(err) => {
                log::warn!("Search query could not be compiled: {err}");
                return 0;
            }
        };

        for (block_index, block) in doc.blocks.iter_mut().enumerate() {
            let has_match = block
                .runs
                .iter()
                .any(|run| run.is_visible_text() && pattern.is_match(&run.text));
            if !has_match {
                continue;
            }

            let runs = std::mem::take(&mut block.runs);
            for run in runs {
                if !run.is_visible_text() {
                    block.runs.push(run);
                    continue;
                }
                let mut last = 0;
                for found in pattern.find_iter(&run.text) {
                    if found.start() > last {
                        block
                            .runs
                            .push(Run::plain(&run.text[last..found.start()], run.style.clone()));
                    }
                    self.matches.push(MatchLocation {
                        block: block_index,
                        run: block.runs.len(),
                    });
                    block
                        .runs
                        .push(Run::marker(found.as_str(), run.style.clone()));
                    last = found.end();
                }
                if last == 0 {
                    block.runs.push(run);
                } else if last < run.text.len() {
                    block
                        .runs
                        .push(Run::plain(&run.text[last..], run.style.clone()));
                }
            }
        }

        if !self.matches.is_empty() {
            self.current = Some(0);
            self.focus_current(doc);
        }
        self.matches.len()
    }

    /// Drop the query and every highlight.
    pub fn clear(&mut self, doc: &mut Document) {
        self.reset(doc);
        self.query.clear();
    }

    /// Forget matches that pointed into a document that has been replaced.
    pub fn detach(&mut self) {
        self.matches.clear();
        self.current = None;
        self.scroll_requested = false;
    }

    /// Move to the next or previous match, wrapping at both ends.
    pub fn advance(&mut self, doc: &mut Document, direction: Direction) -> Option<usize> {
        if self.matches.is_empty() {
            return None;
        }
        let total = self.matches.len() as i64;
        let index = self.current.unwrap_or(0) as i64;
        let next = (index + direction.offset() + total) % total;
        self.current = Some(next as usize);
        self.focus_current(doc);
        self.current
    }

    /// The match the view should scroll to, once per focus change.
    pub fn take_scroll_request(&mut self) -> Option<MatchLocation> {
        if !self.scroll_requested {
            return None;
        }
        self.scroll_requested = false;
        self.current_location()
    }

    fn reset(&mut self, doc: &mut Document) {
        for block in &mut doc.blocks {
            if block.runs.iter().any(|run| run.mark.is_some()) {
                for run in &mut block.runs {
                    run.mark = None;
                }
                block.normalize();
            }
        }
        self.detach();
    }

    fn focus_current(&mut self, doc: &mut Document) {
        for location in &self.matches {
            if let Some(run) = doc.run_mut(location.block, location.run) {
                run.mark = Some(Mark::Hit);
            }
        }
        let Some(location) = self.current_location() else {
            return;
        };
        if let Some(run) = doc.run_mut(location.block, location.run) {
            run.mark = Some(Mark::Active);
            self.scroll_requested = true;
        }
    }
}

/// Trailing-edge debounce for the search box.
#[derive(Debug)]
pub struct SearchDebounce {
    quiet: Duration,
    pending: Option<(String, Instant)>,
}

impl Default for SearchDebounce {
    fn default() -> Self {
        Self::new(SEARCH_DEBOUNCE)
    }
}

impl SearchDebounce {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            pending: None,
        }
    }

    /// Record an edit; restarts the quiet period.
    pub fn input(&mut self, text: &str, now: Instant) {
        self.pending = Some((text.trim().to_string(), now));
    }

    /// The settled query, once the quiet period has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<String> {
        let (_, edited_at) = self.pending.as_ref()?;
        if now.saturating_duration_since(*edited_at) < self.quiet {
            return None;
        }
        self.pending.take().map(|(query, _)| query)
    }

    /// Time left before `poll` fires, for scheduling a repaint.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        let (_, edited_at) = self.pending.as_ref()?;
        Some(self.quiet.saturating_sub(now.saturating_duration_since(*edited_at)))
    }

    /// Take the pending query without waiting for the quiet period.
    pub fn flush(&mut self) -> Option<String> {
        self.pending.take().map(|(query, _)| query)
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Block, BlockKind, InlineStyle};
    use crate::renderer::{MarkdownEngine, PulldownEngine};

    fn doc(md: &str) -> Document {
        PulldownEngine::new().render(md)
    }

    fn marked_texts(doc: &Document) -> Vec<String> {
        doc.blocks
            .iter()
            .flat_map(|b| b.runs.iter())
            .filter(|r| r.mark.is_some())
            .map(|r| r.text.clone())
            .collect()
    }

    /// Non-overlapping occurrences per run, ASCII case folded.
    fn reference_count(doc: &Document, query: &str) -> usize {
        let needle = query.to_ascii_lowercase();
        doc.blocks
            .iter()
            .flat_map(|b| b.runs.iter())
            .filter(|r| r.is_visible_text())
            .map(|r| r.text.to_ascii_lowercase().matches(needle.as_str()).count())
            .sum()
    }

    #[test]
    fn test_scenario_the_cat_sat() {
        let mut document = doc("The cat sat. The dog ran.");
        let mut search = SearchState::new();

        assert_eq!(search.highlight(&mut document, "the"), 2);
        assert_eq!(search.current(), Some(0));
        let first = search.current_location().expect("first match");
        let run = document.run(first.block, first.run).expect("run");
        assert_eq!(run.text, "The");
        assert_eq!(run.mark, Some(Mark::Active));
        assert_eq!(search.count_label(), "1 of 2");

        assert_eq!(search.advance(&mut document, Direction::Next), Some(1));
        assert_eq!(search.count_label(), "2 of 2");
        assert_eq!(search.advance(&mut document, Direction::Next), Some(0));
    }

    #[test]
    fn test_count_matches_reference_scan() {
        let source = "# Alpha beta\n\nalpha ALPHA alp\n\n- list alpha\n- beta\n\n```\nalphaalpha\n```\n\n| alpha | x |\n|---|---|\n| y | Alpha |\n";
        for query in ["alpha", "a", "beta", "lph", "zzz", "alphaalpha"] {
            let mut document = doc(source);
            let expected = reference_count(&document, query);
            let mut search = SearchState::new();
            assert_eq!(search.highlight(&mut document, query), expected, "{query}");
            assert_eq!(document.marker_count(), expected, "{query}");
        }
    }

    #[test]
    fn test_matches_are_non_overlapping() {
        let mut document = doc("aaaa aaa");
        let mut search = SearchState::new();
        assert_eq!(search.highlight(&mut document, "aa"), 3);
        assert_eq!(marked_texts(&document), vec!["aa", "aa", "aa"]);
    }

    #[test]
    fn test_query_is_literal() {
        let mut document = doc("a.b axb a+b (a)");
        let mut search = SearchState::new();
        assert_eq!(search.highlight(&mut document, "a.b"), 1);
        assert_eq!(search.highlight(&mut document, "a+b"), 1);
        assert_eq!(search.highlight(&mut document, "(a)"), 1);
    }

    #[test]
    fn test_case_insensitive_preserves_original_text() {
        let mut document = doc("Été ÉTÉ été");
        let mut search = SearchState::new();
        assert_eq!(search.highlight(&mut document, "été"), 3);
        assert_eq!(marked_texts(&document), vec!["Été", "ÉTÉ", "été"]);
    }

    #[test]
    fn test_matches_do_not_span_runs() {
        let mut document = doc("a**bc**d");
        let mut search = SearchState::new();
        assert_eq!(search.highlight(&mut document, "ab"), 0);
        assert_eq!(search.current(), None);
        assert_eq!(search.highlight(&mut document, "bc"), 1);
    }

    #[test]
    fn test_whitespace_only_runs_are_skipped() {
        let mut block = Block::new(BlockKind::Paragraph, 0);
        block.runs = vec![
            Run::plain("   ", InlineStyle::default()),
            Run::plain("x", InlineStyle {
                strong: true,
                ..Default::default()
            }),
        ];
        let mut document = Document {
            blocks: vec![block],
        };
        let mut search = SearchState::new();
        assert_eq!(search.highlight(&mut document, " "), 0);
        assert_eq!(document.blocks[0].runs[0].text, "   ");
    }

    #[test]
    fn test_clear_restores_baseline() {
        let original = doc("The **theme** of the day\n\n> the quote");
        let mut document = original.clone();
        let mut search = SearchState::new();

        assert!(search.highlight(&mut document, "the") > 0);
        assert_ne!(document, original);

        search.clear(&mut document);
        assert_eq!(document, original);
        assert_eq!(search.match_count(), 0);
        assert_eq!(search.current(), None);
        assert_eq!(search.query(), "");
        assert_eq!(search.count_label(), "");
    }

    #[test]
    fn test_rerunning_same_query_is_idempotent() {
        let mut document = doc("one two one two one");
        let mut search = SearchState::new();
        let first = search.highlight(&mut document, "one");
        let snapshot = document.clone();
        let second = search.highlight(&mut document, "one");
        assert_eq!(first, 3);
        assert_eq!(first, second);
        assert_eq!(document, snapshot);
    }

    #[test]
    fn test_empty_query_clears() {
        let mut document = doc("hello hello");
        let mut search = SearchState::new();
        search.highlight(&mut document, "hello");
        assert_eq!(search.highlight(&mut document, ""), 0);
        assert_eq!(search.current(), None);
        assert_eq!(document.marker_count(), 0);
    }

    #[test]
    fn test_advance_on_empty_is_noop() {
        let mut document = doc("nothing here");
        let mut search = SearchState::new();
        search.highlight(&mut document, "absent");
        assert_eq!(search.advance(&mut document, Direction::Next), None);
        assert_eq!(search.advance(&mut document, Direction::Previous), None);
        assert_eq!(search.current(), None);
    }

    #[test]
    fn test_advance_wraps_both_ways() {
        let mut document = doc("x x x");
        let mut search = SearchState::new();
        assert_eq!(search.highlight(&mut document, "x"), 3);
        assert_eq!(search.advance(&mut document, Direction::Previous), Some(2));
        assert_eq!(search.advance(&mut document, Direction::Next), Some(0));
        assert_eq!(search.advance(&mut document, Direction::Next), Some(1));
        assert_eq!(search.advance(&mut document, Direction::Next), Some(2));
        assert_eq!(search.advance(&mut document, Direction::Next), Some(0));
    }

    #[test]
    fn test_only_current_match_is_active() {
        let mut document = doc("x x x");
        let mut search = SearchState::new();
        search.highlight(&mut document, "x");
        search.advance(&mut document, Direction::Next);
        let marks: Vec<Mark> = document.blocks[0]
            .runs
            .iter()
            .filter_map(|r| r.mark)
            .collect();
        assert_eq!(marks, vec![Mark::Hit, Mark::Active, Mark::Hit]);
    }

    #[test]
    fn test_scroll_request_is_taken_once() {
        let mut document = doc("x x");
        let mut search = SearchState::new();
        search.highlight(&mut document, "x");
        assert!(search.take_scroll_request().is_some());
        assert!(search.take_scroll_request().is_none());
        search.advance(&mut document, Direction::Next);
        assert_eq!(
            search.take_scroll_request(),
            search.current_location()
        );
    }

    #[test]
    fn test_debounce_waits_for_quiet_period() {
        let start = Instant::now();
        let mut debounce = SearchDebounce::new(Duration::from_millis(200));
        debounce.input("th", start);
        debounce.input("  the ", start + Duration::from_millis(100));
        assert_eq!(debounce.poll(start + Duration::from_millis(250)), None);
        assert_eq!(
            debounce.remaining(start + Duration::from_millis(250)),
            Some(Duration::from_millis(50))
        );
        assert_eq!(
            debounce.poll(start + Duration::from_millis(300)),
            Some("the".to_string())
        );
        assert_eq!(debounce.poll(start + Duration::from_millis(900)), None);
    }

    #[test]
    fn test_debounce_cancel() {
        let start = Instant::now();
        let mut debounce = SearchDebounce::default();
        debounce.input("abc", start);
        debounce.cancel();
        assert_eq!(debounce.poll(start + Duration::from_secs(1)), None);
        assert_eq!(debounce.remaining(start), None);
    }

    #[test]
    fn test_debounce_flush_skips_the_wait() {
        let start = Instant::now();
        let mut debounce = SearchDebounce::default();
        debounce.input(" cat ", start);
        assert_eq!(debounce.flush(), Some("cat".to_string()));
        assert_eq!(debounce.flush(), None);
        assert_eq!(debounce.poll(start + Duration::from_secs(1)), None);
    }
}
