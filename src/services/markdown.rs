//! 教程 Markdown 渲染
//! 使用 pulldown-cmark 的 Pull 模式，输出 HTML 或适合终端阅读的纯文本

use pulldown_cmark::{html, CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};

/// 教程使用 GFM 扩展
pub fn gfm_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);
    options
}

pub fn render_html(content: &str) -> String {
    let parser = Parser::new_ext(content, gfm_options());
    let mut html_output = String::new();
    html::push_html(&mut html_output, parser);
    html_output
}

/// 提取所有图片地址
pub fn image_urls(content: &str) -> Vec<String> {
    Parser::new_ext(content, gfm_options())
        .filter_map(|event| match event {
            Event::Start(Tag::Image { dest_url, .. }) => Some(dest_url.to_string()),
            _ => None,
        })
        .collect()
}

/// 终端渲染器
#[derive(Debug, Default)]
pub struct TerminalRenderer {
    output: String,
    line: String,
    list_stack: Vec<Option<u64>>,
    in_code_block: bool,
    heading: Option<HeadingLevel>,
    link_stack: Vec<String>,
    table_row: Vec<String>,
    in_table_cell: bool,
}

impl TerminalRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(mut self, content: &str) -> String {
        for event in Parser::new_ext(content, gfm_options()) {
            self.process_event(event);
        }
        self.flush_line();
        self.output.trim_end().to_string()
    }

    fn process_event(&mut self, event: Event) {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                self.blank_line();
                self.heading = Some(level);
            }
            Event::End(TagEnd::Heading(_)) => {
                let width = self.line.chars().count();
                let underline = match self.heading.take() {
                    Some(HeadingLevel::H1) => Some('='),
                    Some(HeadingLevel::H2) => Some('-'),
                    _ => None,
                };
                self.flush_line();
                if let Some(ch) = underline {
                    self.output.push_str(&ch.to_string().repeat(width.max(3)));
                    self.output.push('\n');
                }
            }
            Event::Start(Tag::Paragraph) => {
                if self.list_stack.is_empty() {
                    self.blank_line();
                }
            }
            Event::End(TagEnd::Paragraph) => {
                self.flush_line();
            }
            Event::Start(Tag::BlockQuote) => {
                self.blank_line();
                self.line.push_str("> ");
            }
            Event::End(TagEnd::BlockQuote) => {
                self.flush_line();
            }
            Event::Start(Tag::CodeBlock(kind)) => {
                self.blank_line();
                self.in_code_block = true;
                if let CodeBlockKind::Fenced(lang) = kind {
                    if !lang.is_empty() {
                        self.output.push_str(&format!("    [{}]\n", lang));
                    }
                }
            }
            Event::End(TagEnd::CodeBlock) => {
                self.in_code_block = false;
                self.flush_line();
            }
            Event::Start(Tag::List(start)) => {
                self.flush_line();
                self.list_stack.push(start);
            }
            Event::End(TagEnd::List(_)) => {
                self.flush_line();
                self.list_stack.pop();
            }
            Event::Start(Tag::Item) => {
                self.flush_line();
                let depth = self.list_stack.len().saturating_sub(1);
                let marker = match self.list_stack.last_mut() {
                    Some(Some(n)) => {
                        let marker = format!("{}.", n);
                        *n += 1;
                        marker
                    }
                    _ => "•".to_string(),
                };
                self.line.push_str(&"  ".repeat(depth));
                self.line.push_str(&marker);
                self.line.push(' ');
            }
            Event::End(TagEnd::Item) => {
                self.flush_line();
            }
            Event::TaskListMarker(done) => {
                self.line.push_str(if done { "[x] " } else { "[ ] " });
            }
            Event::Start(Tag::Link { dest_url, .. }) => {
                self.link_stack.push(dest_url.to_string());
            }
            Event::End(TagEnd::Link) => {
                if let Some(url) = self.link_stack.pop() {
                    self.line.push_str(&format!(" <{}>", url));
                }
            }
            Event::Start(Tag::Image { dest_url, .. }) => {
                self.line.push_str(&format!("[imagen: {}] ", dest_url));
            }
            Event::Start(Tag::Table(_)) => {
                self.blank_line();
            }
            Event::End(TagEnd::Table) => {
                self.flush_line();
            }
            Event::Start(Tag::TableHead) | Event::Start(Tag::TableRow) => {
                self.table_row.clear();
            }
            Event::End(TagEnd::TableHead) | Event::End(TagEnd::TableRow) => {
                let row = format!("| {} |", self.table_row.join(" | "));
                self.table_row.clear();
                self.output.push_str(&row);
                self.output.push('\n');
            }
            Event::Start(Tag::TableCell) => {
                self.in_table_cell = true;
                self.table_row.push(String::new());
            }
            Event::End(TagEnd::TableCell) => {
                self.in_table_cell = false;
            }
            Event::Start(Tag::Strikethrough) | Event::End(TagEnd::Strikethrough) => {
                self.line.push('~');
            }
            Event::Text(text) => {
                if self.in_code_block {
                    for line in text.lines() {
                        self.output.push_str("    ");
                        self.output.push_str(line);
                        self.output.push('\n');
                    }
                } else {
                    self.push_inline(&text);
                }
            }
            Event::Code(code) => {
                self.push_inline(&format!("`{}`", code));
            }
            Event::Html(raw) | Event::InlineHtml(raw) => {
                self.push_inline(raw.trim());
            }
            Event::SoftBreak => {
                self.push_inline(" ");
            }
            Event::HardBreak => {
                self.flush_line();
            }
            Event::Rule => {
                self.blank_line();
                self.output.push_str(&"-".repeat(40));
                self.output.push('\n');
            }
            _ => {}
        }
    }

    fn push_inline(&mut self, text: &str) {
        if self.in_table_cell {
            if let Some(cell) = self.table_row.last_mut() {
                cell.push_str(text);
            }
        } else {
            self.line.push_str(text);
        }
    }

    fn flush_line(&mut self) {
        if !self.line.trim().is_empty() {
            self.output.push_str(self.line.trim_end());
            self.output.push('\n');
        }
        self.line.clear();
    }

    /// 段落之间留一个空行
    fn blank_line(&mut self) {
        self.flush_line();
        if !self.output.is_empty() && !self.output.ends_with("\n\n") {
            self.output.push('\n');
        }
    }
}

pub fn render_terminal(content: &str) -> String {
    TerminalRenderer::new().render(content)
}
