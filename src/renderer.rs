//! Markdown to [`Document`] conversion.
//!
//! The markdown engine is loaded lazily through [`LazyRenderer`]: the first
//! render attempts the load exactly once and caches the outcome. When the
//! engine is unavailable the raw text is shown verbatim instead of failing.

use crate::document::{Block, BlockKind, Document, InlineStyle};
use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag};
use std::sync::OnceLock;

/// Converts markdown source into a rendered document.
pub trait MarkdownEngine: Send + Sync {
    fn render(&self, markdown: &str) -> Document;
}

type EngineLoader = Box<dyn Fn() -> anyhow::Result<Box<dyn MarkdownEngine>> + Send + Sync>;

/// One-shot, memoized loader around a [`MarkdownEngine`].
pub struct LazyRenderer {
    loader: EngineLoader,
    engine: OnceLock<Result<Box<dyn MarkdownEngine>, String>>,
}

impl Default for LazyRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl LazyRenderer {
    /// Renderer backed by pulldown-cmark.
    pub fn new() -> Self {
        Self::with_loader(|| Ok(Box::new(PulldownEngine::new()) as Box<dyn MarkdownEngine>))
    }

    pub fn with_loader<F>(loader: F) -> Self
    where
        F: Fn() -> anyhow::Result<Box<dyn MarkdownEngine>> + Send + Sync + 'static,
    {
        Self {
            loader: Box::new(loader),
            engine: OnceLock::new(),
        }
    }

    fn engine(&self) -> Option<&dyn MarkdownEngine> {
        let outcome = self.engine.get_or_init(|| {
            (self.loader)().map_err(|err| {
                log::warn!("Markdown engine unavailable, showing raw text: {err:#}");
                err.to_string()
            })
        });
        outcome.as_ref().ok().map(|engine| engine.as_ref())
    }

    /// Whether the engine loaded. Triggers the load on first call.
    pub fn is_available(&self) -> bool {
        self.engine().is_some()
    }

    /// Render markdown, falling back to verbatim text.
    pub fn render(&self, markdown: &str) -> Document {
        match self.engine() {
            Some(engine) => engine.render(markdown),
            None => Document::plain(markdown),
        }
    }
}

/// CommonMark + GFM extensions via pulldown-cmark.
pub struct PulldownEngine {
    options: Options,
}

impl Default for PulldownEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PulldownEngine {
    pub fn new() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_TASKLISTS);
        Self { options }
    }
}

impl MarkdownEngine for PulldownEngine {
    fn render(&self, markdown: &str) -> Document {
        let mut builder = DocumentBuilder::default();
        for event in Parser::new_ext(markdown, self.options) {
            builder.event(event);
        }
        builder.finish()
    }
}

/// Folds the pulldown-cmark event stream into blocks of styled runs.
#[derive(Default)]
struct DocumentBuilder {
    blocks: Vec<Block>,
    current: Option<Block>,
    strong: u32,
    emphasis: u32,
    strike: u32,
    link: Option<String>,
    quote_depth: u8,
    /// Next item number for each open list; `None` for bullet lists.
    lists: Vec<Option<u64>>,
    tables: usize,
    table: usize,
    row: usize,
    column: usize,
    in_table_head: bool,
}

impl DocumentBuilder {
    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => {
                let style = self.inline_style();
                self.push(&text, &style);
            }
            Event::Code(code) => {
                let style = InlineStyle {
                    code: true,
                    ..self.inline_style()
                };
                self.push(&code, &style);
            }
            Event::Html(html) => {
                let style = self.inline_style();
                self.push(html.trim_end_matches('\n'), &style);
            }
            Event::FootnoteReference(label) => {
                let style = self.inline_style();
                self.push(&format!("[{label}]"), &style);
            }
            Event::SoftBreak => {
                let style = self.inline_style();
                self.push(" ", &style);
            }
            Event::HardBreak => {
                let style = self.inline_style();
                self.push("\n", &style);
            }
            Event::Rule => {
                self.flush();
                self.blocks
                    .push(Block::new(BlockKind::Rule, self.quote_depth));
            }
            Event::TaskListMarker(checked) => {
                let marker = if checked { "[x] " } else { "[ ] " };
                self.push(marker, &InlineStyle::default());
            }
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => {
                // Loose list items wrap their text in a paragraph; keep the item block.
                let item_waiting = matches!(
                    &self.current,
                    Some(block) if matches!(block.kind, BlockKind::ListItem { .. }) && block.runs.is_empty()
                );
                if !item_waiting {
                    self.open(BlockKind::Paragraph);
                }
            }
            Tag::Heading(level, _, _) => self.open(BlockKind::Heading(level as u8)),
            Tag::BlockQuote => {
                self.flush();
                self.quote_depth = self.quote_depth.saturating_add(1);
            }
            Tag::CodeBlock(kind) => {
                let language = match kind {
                    CodeBlockKind::Fenced(info) => info
                        .split_whitespace()
                        .next()
                        .map(|lang| lang.to_string()),
                    CodeBlockKind::Indented => None,
                };
                self.open(BlockKind::CodeBlock { language });
            }
            Tag::List(start) => {
                self.flush();
                self.lists.push(start);
            }
            Tag::Item => {
                let depth = self.lists.len().saturating_sub(1).min(u8::MAX as usize) as u8;
                let number = match self.lists.last_mut() {
                    Some(Some(next)) => {
                        let current = *next;
                        *next += 1;
                        Some(current)
                    }
                    _ => None,
                };
                self.open(BlockKind::ListItem { number, depth });
            }
            Tag::FootnoteDefinition(label) => {
                self.open(BlockKind::Paragraph);
                self.push(&format!("[{label}]: "), &InlineStyle::default());
            }
            Tag::Table(_) => {
                self.flush();
                self.table = self.tables;
                self.tables += 1;
                self.row = 0;
                self.column = 0;
            }
            Tag::TableHead => {
                self.in_table_head = true;
                self.column = 0;
            }
            Tag::TableRow => self.column = 0,
            Tag::TableCell => self.open(BlockKind::TableCell {
                table: self.table,
                row: self.row,
                column: self.column,
                header: self.in_table_head,
            }),
            Tag::Emphasis => self.emphasis += 1,
            Tag::Strong => self.strong += 1,
            Tag::Strikethrough => self.strike += 1,
            Tag::Link(_, dest, _) => self.link = Some(dest.to_string()),
            Tag::Image(..) => {}
        }
    }

    fn end(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph
            | Tag::Heading(..)
            | Tag::CodeBlock(_)
            | Tag::Item
            | Tag::FootnoteDefinition(_)
            | Tag::Table(_) => self.flush(),
            Tag::BlockQuote => {
                self.flush();
                self.quote_depth = self.quote_depth.saturating_sub(1);
            }
            Tag::List(_) => {
                self.flush();
                self.lists.pop();
            }
            Tag::TableHead => {
                self.in_table_head = false;
                self.row += 1;
            }
            Tag::TableRow => self.row += 1,
            Tag::TableCell => {
                self.flush();
                self.column += 1;
            }
            Tag::Emphasis => self.emphasis = self.emphasis.saturating_sub(1),
            Tag::Strong => self.strong = self.strong.saturating_sub(1),
            Tag::Strikethrough => self.strike = self.strike.saturating_sub(1),
            Tag::Link(..) => self.link = None,
            Tag::Image(..) => {}
        }
    }

    fn inline_style(&self) -> InlineStyle {
        let in_code_block = matches!(
            &self.current,
            Some(block) if matches!(block.kind, BlockKind::CodeBlock { .. })
        );
        InlineStyle {
            strong: self.strong > 0,
            emphasis: self.emphasis > 0,
            strike: self.strike > 0,
            code: in_code_block,
            link: self.link.clone(),
        }
    }

    fn open(&mut self, kind: BlockKind) {
        self.flush();
        self.current = Some(Block::new(kind, self.quote_depth));
    }

    fn push(&mut self, text: &str, style: &InlineStyle) {
        if self.current.is_none() {
            self.current = Some(Block::new(BlockKind::Paragraph, self.quote_depth));
        }
        if let Some(block) = self.current.as_mut() {
            block.push_text(text, style);
        }
    }

    fn flush(&mut self) {
        let Some(mut block) = self.current.take() else {
            return;
        };
        if matches!(block.kind, BlockKind::CodeBlock { .. }) {
            if let Some(last) = block.runs.last_mut() {
                let trimmed = last.text.trim_end_matches('\n').len();
                last.text.truncate(trimmed);
            }
        }
        block.normalize();
        // Empty table cells still occupy a grid slot.
        if !block.runs.is_empty() || matches!(block.kind, BlockKind::TableCell { .. }) {
            self.blocks.push(block);
        }
    }

    fn finish(mut self) -> Document {
        self.flush();
        Document {
            blocks: self.blocks,
        }
    }
}
