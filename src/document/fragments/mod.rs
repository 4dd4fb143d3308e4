//! Builders for body fragments: paragraphs, headings, page breaks, tables
//! and inline pictures. Each returns a detached element ready for
//! [`Document::add`](crate::Document::add).

mod picture;
mod table;

pub use picture::{picture, PictureOptions, EMU_PER_PIXEL};
pub use table::{Border, BorderSide, CellItem, TableBuilder, WidthUnit};

use std::str::FromStr;

use crate::error::{Error, Result};
use crate::xml::{ElementFactory, XmlElement};

/// Character formatting of a text span
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextStyle {
    pub bold: bool,
    pub underline: bool,
    pub italic: bool,
}

impl TextStyle {
    /// Parse a combination of `b`, `u` and `i` flags; other characters are
    /// ignored
    pub fn parse(flags: &str) -> Self {
        Self {
            bold: flags.contains('b'),
            underline: flags.contains('u'),
            italic: flags.contains('i'),
        }
    }
}

/// Builder for a `w:p` with one run per text span
#[derive(Clone, Debug)]
pub struct ParagraphBuilder {
    spans: Vec<(String, TextStyle)>,
    style: String,
    justification: String,
    break_before: bool,
}

impl Default for ParagraphBuilder {
    fn default() -> Self {
        Self {
            spans: Vec::new(),
            style: "BodyText".into(),
            justification: "left".into(),
            break_before: false,
        }
    }
}

impl ParagraphBuilder {
    /// Paragraph with a single unformatted span
    pub fn new(text: impl Into<String>) -> Self {
        Self::default().span(text, TextStyle::default())
    }

    /// Paragraph without spans
    pub fn empty() -> Self {
        Self::default()
    }

    /// Append a formatted span
    pub fn span(mut self, text: impl Into<String>, style: TextStyle) -> Self {
        self.spans.push((text.into(), style));
        self
    }

    /// Paragraph style id (default `BodyText`)
    pub fn style(mut self, style: impl Into<String>) -> Self {
        self.style = style.into();
        self
    }

    /// Justification value such as `left`, `center`, `right` or `both`
    pub fn justification(mut self, jc: impl Into<String>) -> Self {
        self.justification = jc.into();
        self
    }

    /// Mark every run with `w:lastRenderedPageBreak`
    pub fn break_before(mut self, on: bool) -> Self {
        self.break_before = on;
        self
    }

    pub fn build(&self, factory: &ElementFactory<'_>) -> Result<XmlElement> {
        let mut p = factory.element("w:p")?;
        p.push_child(
            factory
                .element("w:pPr")?
                .with_child(factory.val("w:pStyle", &self.style)?)
                .with_child(factory.val("w:jc", &self.justification)?),
        );

        for (text, style) in &self.spans {
            let mut rpr = factory.element("w:rPr")?;
            if style.bold {
                rpr.push_child(factory.element("w:b")?);
            }
            if style.underline {
                rpr.push_child(factory.val("w:u", "single")?);
            }
            if style.italic {
                rpr.push_child(factory.element("w:i")?);
            }

            let mut run = factory.element("w:r")?.with_child(rpr);
            if self.break_before {
                run.push_child(factory.element("w:lastRenderedPageBreak")?);
            }
            run.push_child(text_leaf(factory, text)?);
            p.push_child(run);
        }
        Ok(p)
    }
}

/// A `w:t` carrying `text`, preserving edge whitespace
pub fn text_leaf(factory: &ElementFactory<'_>, text: &str) -> Result<XmlElement> {
    let mut t = factory.text_element("w:t", text)?;
    if text.starts_with(char::is_whitespace) || text.ends_with(char::is_whitespace) {
        t.set_attr(factory.name("xml:space")?, "preserve");
    }
    Ok(t)
}

/// Language of the built-in heading style names
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HeadingLang {
    #[default]
    En,
    It,
}

impl HeadingLang {
    fn style_prefix(self) -> &'static str {
        match self {
            HeadingLang::En => "Heading",
            HeadingLang::It => "Titolo",
        }
    }
}

/// Heading paragraph using the `Heading<level>` style (`Titolo<level>` for
/// Italian templates)
pub fn heading(
    factory: &ElementFactory<'_>,
    text: &str,
    level: u8,
    lang: HeadingLang,
) -> Result<XmlElement> {
    let style = format!("{}{}", lang.style_prefix(), level);
    Ok(factory
        .element("w:p")?
        .with_child(factory.element("w:pPr")?.with_child(factory.val("w:pStyle", &style)?))
        .with_child(factory.element("w:r")?.with_child(text_leaf(factory, text)?)))
}

/// Kind of break produced by [`page_break`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BreakStyle {
    Page,
    Section,
}

impl FromStr for BreakStyle {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "page" => Ok(BreakStyle::Page),
            "section" => Ok(BreakStyle::Section),
            other => Err(Error::UnknownPageBreakStyle(other.to_string())),
        }
    }
}

/// Page orientation of a section break
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

/// Letter size in twentieths of a point
const PAGE_SHORT_EDGE: &str = "12240";
const PAGE_LONG_EDGE: &str = "15840";

/// Paragraph holding a page break (`"page"`) or a section break
/// (`"section"`) with the given orientation
pub fn page_break(
    factory: &ElementFactory<'_>,
    style: &str,
    orientation: Orientation,
) -> Result<XmlElement> {
    let style: BreakStyle = style.parse()?;
    let mut p = factory.element("w:p")?;

    match style {
        BreakStyle::Page => {
            let br = factory.element_with_attrs("w:br", &[("type", "page")])?;
            p.push_child(factory.element("w:r")?.with_child(br));
        }
        BreakStyle::Section => {
            let size = match orientation {
                Orientation::Portrait => factory.element_with_attrs(
                    "w:pgSz",
                    &[("w", PAGE_SHORT_EDGE), ("h", PAGE_LONG_EDGE)],
                )?,
                Orientation::Landscape => factory.element_with_attrs(
                    "w:pgSz",
                    &[("h", PAGE_SHORT_EDGE), ("w", PAGE_LONG_EDGE), ("orient", "landscape")],
                )?,
            };
            let sect = factory.element("w:sectPr")?.with_child(size);
            p.push_child(factory.element("w:pPr")?.with_child(sect));
        }
    }
    Ok(p)
}
