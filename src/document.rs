//! Rendered document model.
//!
//! A rendered markdown file is a flat list of [`Block`]s, each holding a
//! sequence of styled text [`Run`]s. Runs are the leaf text nodes of the
//! document: search scans them, splits them into marker runs, and merges them
//! back together when highlights are cleared.

/// Inline formatting shared by every character of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlineStyle {
    pub strong: bool,
    pub emphasis: bool,
    pub strike: bool,
    pub code: bool,
    pub link: Option<String>,
}

/// Search highlight state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mark {
    /// One search match.
    Hit,
    /// The match the user is currently focused on.
    Active,
}

/// A contiguous piece of text with a single style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    pub text: String,
    pub style: InlineStyle,
    pub mark: Option<Mark>,
}

impl Run {
    pub fn plain(text: impl Into<String>, style: InlineStyle) -> Self {
        Self {
            text: text.into(),
            style,
            mark: None,
        }
    }

    pub fn marker(text: impl Into<String>, style: InlineStyle) -> Self {
        Self {
            text: text.into(),
            style,
            mark: Some(Mark::Hit),
        }
    }

    /// True when the run carries something a reader can see.
    pub fn is_visible_text(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockKind {
    Paragraph,
    Heading(u8),
    CodeBlock {
        language: Option<String>,
    },
    ListItem {
        /// `Some(n)` for ordered items, `None` for bullets.
        number: Option<u64>,
        depth: u8,
    },
    TableCell {
        table: usize,
        row: usize,
        column: usize,
        header: bool,
    },
    Rule,
    /// Raw text shown verbatim when no markdown engine is available.
    Plain,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub kind: BlockKind,
    /// Number of enclosing blockquotes.
    pub quote_depth: u8,
    pub runs: Vec<Run>,
}

impl Block {
    pub fn new(kind: BlockKind, quote_depth: u8) -> Self {
        Self {
            kind,
            quote_depth,
            runs: Vec::new(),
        }
    }

    /// Append text, extending the last run when it has the same style.
    pub fn push_text(&mut self, text: &str, style: &InlineStyle) {
        if text.is_empty() {
            return;
        }
        if let Some(last) = self.runs.last_mut() {
            if last.mark.is_none() && last.style == *style {
                last.text.push_str(text);
                return;
            }
        }
        self.runs.push(Run::plain(text, style.clone()));
    }

    /// Merge adjacent unmarked runs that share a style.
    pub fn normalize(&mut self) {
        let runs = std::mem::take(&mut self.runs);
        for run in runs {
            if run.text.is_empty() {
                continue;
            }
            match self.runs.last_mut() {
                Some(last)
                    if last.mark.is_none() && run.mark.is_none() && last.style == run.style =>
                {
                    last.text.push_str(&run.text);
                }
                _ => self.runs.push(run),
            }
        }
    }

    pub fn text(&self) -> String {
        self.runs.iter().map(|run| run.text.as_str()).collect()
    }
}

/// A rendered markdown document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub blocks: Vec<Block>,
}

impl Document {
    /// Wrap raw text verbatim in a single block.
    pub fn plain(text: &str) -> Self {
        let mut block = Block::new(BlockKind::Plain, 0);
        block.push_text(text, &InlineStyle::default());
        Self {
            blocks: vec![block],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn run(&self, block: usize, run: usize) -> Option<&Run> {
        self.blocks.get(block)?.runs.get(run)
    }

    pub fn run_mut(&mut self, block: usize, run: usize) -> Option<&mut Run> {
        self.blocks.get_mut(block)?.runs.get_mut(run)
    }

    /// Concatenated text of every block, one block per line.
    pub fn text(&self) -> String {
        self.blocks
            .iter()
            .map(Block::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn marker_count(&self) -> usize {
        self.blocks
            .iter()
            .flat_map(|block| block.runs.iter())
            .filter(|run| run.mark.is_some())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bold() -> InlineStyle {
        InlineStyle {
            strong: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_push_text_extends_same_style() {
        let mut block = Block::new(BlockKind::Paragraph, 0);
        block.push_text("Hello", &InlineStyle::default());
        block.push_text(", world", &InlineStyle::default());
        block.push_text("!", &bold());
        assert_eq!(block.runs.len(), 2);
        assert_eq!(block.runs[0].text, "Hello, world");
        assert_eq!(block.text(), "Hello, world!");
    }

    #[test]
    fn test_push_text_ignores_empty() {
        let mut block = Block::new(BlockKind::Paragraph, 0);
        block.push_text("", &InlineStyle::default());
        assert!(block.runs.is_empty());
    }

    #[test]
    fn test_normalize_merges_only_unmarked_same_style() {
        let mut block = Block::new(BlockKind::Paragraph, 0);
        block.runs = vec![
            Run::plain("a", InlineStyle::default()),
            Run::plain("b", InlineStyle::default()),
            Run::marker("c", InlineStyle::default()),
            Run::plain("d", InlineStyle::default()),
            Run::plain("e", bold()),
            Run::plain("", InlineStyle::default()),
            Run::plain("f", bold()),
        ];
        block.normalize();
        let texts: Vec<&str> = block.runs.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["ab", "c", "d", "ef"]);
    }

    #[test]
    fn test_plain_document_keeps_text_verbatim() {
        let doc = Document::plain("# not a heading\n*raw*");
        assert_eq!(doc.blocks.len(), 1);
        assert_eq!(doc.blocks[0].kind, BlockKind::Plain);
        assert_eq!(doc.text(), "# not a heading\n*raw*");
    }

    #[test]
    fn test_visible_text_rejects_whitespace() {
        assert!(!Run::plain("  \n\t", InlineStyle::default()).is_visible_text());
        assert!(Run::plain(" x ", InlineStyle::default()).is_visible_text());
    }
}
