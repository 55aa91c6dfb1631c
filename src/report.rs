use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Point, Rgb,
};
use pulldown_cmark::{Event, Parser, Tag, TagEnd};
use thiserror::Error;

use crate::data_models::BatchSearchReport;

// Letter pages with 1-inch margins.
const PAGE_WIDTH: f64 = 215.9;
const PAGE_HEIGHT: f64 = 279.4;
const MARGIN: f64 = 25.4;
const PT_TO_MM: f64 = 0.352_778;

const HEADING_COLOR: (f64, f64, f64) = (0.173, 0.243, 0.314); // #2C3E50
const SUBHEADING_COLOR: (f64, f64, f64) = (0.906, 0.298, 0.235); // #E74C3C
const TOC_HEADER_COLOR: (f64, f64, f64) = (0.204, 0.596, 0.859); // #3498DB
const SEPARATOR_COLOR: (f64, f64, f64) = (0.902, 0.494, 0.133); // #E67E22
const BODY_COLOR: (f64, f64, f64) = (0.0, 0.0, 0.0);

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to render report: {0}")]
    Render(String),
}

/// A fragment of rendered answer text. Bold covers markdown strong text
/// and headings; everything else renders in the regular face.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub bold: bool,
}

impl Span {
    fn plain(text: impl Into<String>) -> Span {
        Span {
            text: text.into(),
            bold: false,
        }
    }
}

pub type RichLine = Vec<Span>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    pub category: String,
    pub subcategory: String,
    pub page: usize,
}

#[derive(Debug, Clone)]
pub struct ReportSection {
    pub heading: String,
    pub preamble: String,
    pub query: String,
    pub answer: Vec<RichLine>,
}

/// The document structure before any PDF bytes exist: title, one TOC row
/// per batch result, one body section per successful result. Every result
/// keeps its TOC row and sequential page number even when its section is
/// dropped for lacking a well-formed answer.
#[derive(Debug, Clone)]
pub struct ReportLayout {
    pub title: String,
    pub toc: Vec<TocEntry>,
    pub sections: Vec<ReportSection>,
}

impl ReportLayout {
    pub fn from_report(report: &BatchSearchReport) -> ReportLayout {
        let title = format!("{} Recipes and Techniques", report.original_input);

        let toc = report
            .results
            .iter()
            .enumerate()
            .map(|(index, entry)| TocEntry {
                category: capitalize(&entry.category),
                subcategory: capitalize(&entry.subcategory),
                page: index + 1,
            })
            .collect();

        let sections = report
            .results
            .iter()
            .filter_map(|entry| {
                let result = entry.response.as_success()?;
                Some(ReportSection {
                    heading: format!(
                        "{} - {}",
                        capitalize(&entry.category),
                        capitalize(&entry.subcategory)
                    ),
                    preamble: entry.preamble.clone(),
                    query: entry.search_query.clone(),
                    answer: render_markdown(&result.answer),
                })
            })
            .collect();

        ReportLayout {
            title,
            toc,
            sections,
        }
    }
}

/// Convert a batch report into a complete paginated PDF.
pub fn generate(report: &BatchSearchReport) -> Result<Vec<u8>, ReportError> {
    render_pdf(&ReportLayout::from_report(report))
}

/// First character uppercased, the rest lowercased.
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(|c| c.to_lowercase()))
            .collect(),
        None => String::new(),
    }
}

/// Walk the markdown event stream into lines of bold/plain spans. Soft
/// breaks become line breaks so the answer's newlines survive into the
/// document, and list items get a bullet prefix.
fn render_markdown(text: &str) -> Vec<RichLine> {
    fn flush(current: &mut RichLine, lines: &mut Vec<RichLine>) {
        if !current.is_empty() {
            lines.push(std::mem::take(current));
        }
    }

    let mut lines: Vec<RichLine> = Vec::new();
    let mut current: RichLine = Vec::new();
    let mut bold_depth = 0usize;
    let mut in_heading = false;

    for event in Parser::new(text) {
        match event {
            Event::Start(Tag::Strong) => bold_depth += 1,
            Event::End(TagEnd::Strong) => bold_depth = bold_depth.saturating_sub(1),
            Event::Start(Tag::Heading { .. }) => {
                flush(&mut current, &mut lines);
                in_heading = true;
            }
            Event::End(TagEnd::Heading(_)) => {
                flush(&mut current, &mut lines);
                in_heading = false;
            }
            Event::Start(Tag::Item) => {
                flush(&mut current, &mut lines);
                current.push(Span::plain("\u{2022} "));
            }
            Event::End(TagEnd::Item) => flush(&mut current, &mut lines),
            Event::End(TagEnd::Paragraph) => flush(&mut current, &mut lines),
            Event::Text(t) | Event::Code(t) => current.push(Span {
                text: t.to_string(),
                bold: bold_depth > 0 || in_heading,
            }),
            Event::SoftBreak | Event::HardBreak => flush(&mut current, &mut lines),
            _ => {}
        }
    }
    flush(&mut current, &mut lines);

    lines
}

// ─── PDF rendering ───────────────────────────────────────

fn rgb(color: (f64, f64, f64)) -> Color {
    Color::Rgb(Rgb::new(color.0 as f32, color.1 as f32, color.2 as f32, None))
}

/// Width estimate for the builtin Helvetica faces; close enough to wrap
/// and position text without embedding font metrics.
fn text_width_mm(text: &str, size_pt: f64) -> f64 {
    text.chars().count() as f64 * size_pt * 0.5 * PT_TO_MM
}

fn line_height_mm(size_pt: f64) -> f64 {
    size_pt * 1.4 * PT_TO_MM
}

struct PageWriter {
    doc: PdfDocumentReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    layer: PdfLayerReference,
    cursor: f64,
}

impl PageWriter {
    fn new(title: &str) -> Result<PageWriter, ReportError> {
        let (doc, page, layer) =
            PdfDocument::new(title, Mm(PAGE_WIDTH as f32), Mm(PAGE_HEIGHT as f32), "Layer 1");
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| ReportError::Render(e.to_string()))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| ReportError::Render(e.to_string()))?;
        let layer = doc.get_page(page).get_layer(layer);

        Ok(PageWriter {
            doc,
            regular,
            bold,
            layer,
            cursor: PAGE_HEIGHT - MARGIN,
        })
    }

    fn new_page(&mut self) {
        let (page, layer) = self.doc.add_page(Mm(PAGE_WIDTH as f32), Mm(PAGE_HEIGHT as f32), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.cursor = PAGE_HEIGHT - MARGIN;
    }

    fn ensure_room(&mut self, height: f64) {
        if self.cursor - height < MARGIN {
            self.new_page();
        }
    }

    fn advance(&mut self, height: f64) {
        self.cursor -= height;
    }

    fn font(&self, bold: bool) -> &IndirectFontRef {
        if bold { &self.bold } else { &self.regular }
    }

    /// One visual line of mixed spans at the given x offset, no wrapping.
    fn put_spans(&mut self, spans: &[Span], size: f64, x: f64, color: (f64, f64, f64)) {
        let mut x = x;
        self.layer.set_fill_color(rgb(color));
        for span in spans {
            self.layer.use_text(
                span.text.clone(),
                size as f32,
                Mm(x as f32),
                Mm(self.cursor as f32),
                self.font(span.bold),
            );
            x += text_width_mm(&span.text, size);
        }
    }

    /// Word-wrapped rich line within the page margins.
    fn write_line(&mut self, line: &[Span], size: f64, color: (f64, f64, f64)) {
        let max_width = PAGE_WIDTH - 2.0 * MARGIN;
        for visual in wrap_spans(line, size, max_width) {
            self.ensure_room(line_height_mm(size));
            self.advance(line_height_mm(size));
            self.put_spans(&visual, size, MARGIN, color);
        }
    }

    fn write_text(&mut self, text: &str, size: f64, bold: bool, color: (f64, f64, f64)) {
        self.write_line(
            &[Span {
                text: text.to_string(),
                bold,
            }],
            size,
            color,
        );
    }

    /// A "Label: value" line with the label in bold.
    fn write_labeled(&mut self, label: &str, value: &str, size: f64) {
        let mut spans = vec![Span {
            text: format!("{label} "),
            bold: true,
        }];
        spans.push(Span::plain(value));
        self.write_line(&spans, size, BODY_COLOR);
    }

    fn write_centered(&mut self, text: &str, size: f64, color: (f64, f64, f64)) {
        self.ensure_room(line_height_mm(size));
        self.advance(line_height_mm(size));
        let x = ((PAGE_WIDTH - text_width_mm(text, size)) / 2.0).max(MARGIN);
        let spans = [Span {
            text: text.to_string(),
            bold: true,
        }];
        self.put_spans(&spans, size, x, color);
    }

    fn rule(&mut self, color: (f64, f64, f64)) {
        self.ensure_room(4.0);
        self.advance(4.0);
        self.layer.set_outline_color(rgb(color));
        self.layer.set_outline_thickness(1.0);
        self.layer.add_line(Line {
            points: vec![
                (Point::new(Mm(MARGIN as f32), Mm(self.cursor as f32)), false),
                (Point::new(Mm((PAGE_WIDTH - MARGIN) as f32), Mm(self.cursor as f32)), false),
            ],
            is_closed: false,
        });
    }
}

/// Greedy word wrap over mixed bold/plain spans, estimating widths.
fn wrap_spans(line: &[Span], size: f64, max_width: f64) -> Vec<Vec<Span>> {
    let space_width = text_width_mm(" ", size);
    let mut wrapped: Vec<Vec<Span>> = Vec::new();
    let mut current: Vec<Span> = Vec::new();
    let mut width = 0.0f64;

    for span in line {
        for word in span.text.split_whitespace() {
            let word_width = text_width_mm(word, size);
            if width > 0.0 && width + space_width + word_width > max_width {
                wrapped.push(std::mem::take(&mut current));
                width = 0.0;
            }

            let text = if width > 0.0 {
                width += space_width;
                format!(" {word}")
            } else {
                word.to_string()
            };
            width += word_width;

            match current.last_mut() {
                Some(last) if last.bold == span.bold => last.text.push_str(&text),
                _ => current.push(Span {
                    text,
                    bold: span.bold,
                }),
            }
        }
    }
    if !current.is_empty() {
        wrapped.push(current);
    }
    if wrapped.is_empty() {
        // Preserve blank lines as vertical space.
        wrapped.push(vec![Span::plain("")]);
    }

    wrapped
}

const TOC_COLUMNS: [f64; 3] = [MARGIN, MARGIN + 75.0, MARGIN + 150.0];

fn render_toc(writer: &mut PageWriter, toc: &[TocEntry]) {
    writer.ensure_room(line_height_mm(14.0));
    writer.advance(line_height_mm(14.0));
    for (text, x) in ["Category", "Subcategory", "Page"].iter().zip(TOC_COLUMNS) {
        let spans = [Span {
            text: text.to_string(),
            bold: true,
        }];
        writer.put_spans(&spans, 14.0, x, TOC_HEADER_COLOR);
    }

    for entry in toc {
        writer.ensure_room(line_height_mm(12.0));
        writer.advance(line_height_mm(12.0));
        let cells = [
            entry.category.as_str(),
            entry.subcategory.as_str(),
            &entry.page.to_string(),
        ];
        for (text, x) in cells.iter().zip(TOC_COLUMNS) {
            writer.put_spans(&[Span::plain(*text)], 12.0, x, BODY_COLOR);
        }
    }
}

fn render_pdf(layout: &ReportLayout) -> Result<Vec<u8>, ReportError> {
    let mut writer = PageWriter::new(&layout.title)?;

    writer.write_centered(&layout.title, 24.0, HEADING_COLOR);
    writer.advance(12.0);
    render_toc(&mut writer, &layout.toc);

    for section in &layout.sections {
        writer.new_page();
        writer.write_text(&section.heading, 18.0, true, SUBHEADING_COLOR);
        writer.advance(4.0);
        writer.write_labeled("Preamble:", &section.preamble, 12.0);
        writer.write_labeled("Search Query:", &section.query, 12.0);
        writer.advance(2.0);
        writer.write_text("Answer:", 12.0, true, BODY_COLOR);
        for line in &section.answer {
            writer.write_line(line, 12.0, BODY_COLOR);
        }
        writer.rule(SEPARATOR_COLOR);
    }
    // Every section ends with a page break, the last one included.
    writer.new_page();

    writer
        .doc
        .save_to_bytes()
        .map_err(|e| ReportError::Render(e.to_string()))
}
