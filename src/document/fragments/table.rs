//! Table builder for fluent `w:tbl` construction

use super::ParagraphBuilder;
use crate::error::{Error, Result};
use crate::xml::{ElementFactory, XmlElement};

/// Grid column width used when no widths are given
const DEFAULT_GRID_WIDTH: &str = "2390";

/// Unit of a table or column width
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WidthUnit {
    /// Twentieths of a point
    #[default]
    Dxa,
    /// Fiftieths of a percent
    Pct,
    /// No width
    Nil,
    /// Determined by the consumer
    Auto,
}

impl WidthUnit {
    /// Convert to OOXML string value
    pub fn as_str(&self) -> &'static str {
        match self {
            WidthUnit::Dxa => "dxa",
            WidthUnit::Pct => "pct",
            WidthUnit::Nil => "nil",
            WidthUnit::Auto => "auto",
        }
    }
}

/// Table border edge. `All` takes precedence over every other side.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BorderSide {
    Top,
    Left,
    Bottom,
    Right,
    InsideH,
    InsideV,
    All,
}

impl BorderSide {
    const EDGES: [BorderSide; 6] = [
        BorderSide::Top,
        BorderSide::Left,
        BorderSide::Bottom,
        BorderSide::Right,
        BorderSide::InsideH,
        BorderSide::InsideV,
    ];

    fn tag(&self) -> &'static str {
        match self {
            BorderSide::Top => "w:top",
            BorderSide::Left => "w:left",
            BorderSide::Bottom => "w:bottom",
            BorderSide::Right => "w:right",
            BorderSide::InsideH => "w:insideH",
            BorderSide::InsideV => "w:insideV",
            BorderSide::All => "w:all",
        }
    }
}

/// Border line definition
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Border {
    /// Line style (`single`, `double`, `dashed`, ...)
    pub val: String,
    /// Width in eighths of a point
    pub size: Option<u32>,
    /// Spacing in points
    pub space: Option<u32>,
    /// Hex color or `auto`
    pub color: Option<String>,
}

impl Border {
    pub fn new(val: impl Into<String>) -> Self {
        Self {
            val: val.into(),
            size: None,
            space: None,
            color: None,
        }
    }

    pub fn size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    pub fn space(mut self, space: u32) -> Self {
        self.space = Some(space);
        self
    }

    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    fn to_element(&self, factory: &ElementFactory<'_>, side: BorderSide) -> Result<XmlElement> {
        let size = self.size.map(|v| v.to_string());
        let space = self.space.map(|v| v.to_string());
        let mut attrs = vec![("val", self.val.as_str())];
        if let Some(size) = &size {
            attrs.push(("sz", size.as_str()));
        }
        if let Some(space) = &space {
            attrs.push(("space", space.as_str()));
        }
        if let Some(color) = &self.color {
            attrs.push(("color", color.as_str()));
        }
        factory.element_with_attrs(side.tag(), &attrs)
    }
}

/// One item of a cell: text becomes a paragraph, elements are inserted as-is
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CellItem {
    Text(String),
    Element(XmlElement),
}

impl From<&str> for CellItem {
    fn from(text: &str) -> Self {
        CellItem::Text(text.to_string())
    }
}

impl From<String> for CellItem {
    fn from(text: String) -> Self {
        CellItem::Text(text)
    }
}

impl From<XmlElement> for CellItem {
    fn from(element: XmlElement) -> Self {
        CellItem::Element(element)
    }
}

/// Builder for creating tables with a fluent API
#[derive(Clone, Debug)]
pub struct TableBuilder {
    rows: Vec<Vec<Vec<CellItem>>>,
    heading: bool,
    column_widths: Option<Vec<u32>>,
    column_unit: WidthUnit,
    width: u32,
    width_unit: WidthUnit,
    borders: Vec<(BorderSide, Border)>,
    alignments: Vec<String>,
}

impl Default for TableBuilder {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            heading: true,
            column_widths: None,
            column_unit: WidthUnit::Dxa,
            width: 0,
            width_unit: WidthUnit::Auto,
            borders: Vec::new(),
            alignments: Vec::new(),
        }
    }
}

impl TableBuilder {
    /// Create a new table builder; the first row is a heading row
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row with one item per cell
    pub fn row<I, C>(mut self, cells: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<CellItem>,
    {
        self.rows
            .push(cells.into_iter().map(|c| vec![c.into()]).collect());
        self
    }

    /// Append a row whose cells hold several items each
    pub fn row_items(mut self, cells: Vec<Vec<CellItem>>) -> Self {
        self.rows.push(cells);
        self
    }

    /// Treat the first row as a shaded heading row (default `true`)
    pub fn heading(mut self, heading: bool) -> Self {
        self.heading = heading;
        self
    }

    /// Set column widths; must match the column count
    pub fn column_widths(mut self, widths: &[u32], unit: WidthUnit) -> Self {
        self.column_widths = Some(widths.to_vec());
        self.column_unit = unit;
        self
    }

    /// Set table width (default `0` / `auto`)
    pub fn width(mut self, width: u32, unit: WidthUnit) -> Self {
        self.width = width;
        self.width_unit = unit;
        self
    }

    /// Set a border; a later call for the same side replaces the earlier one
    pub fn border(mut self, side: BorderSide, border: Border) -> Self {
        self.borders.retain(|(s, _)| *s != side);
        self.borders.push((side, border));
        self
    }

    /// Paragraph justification of body cells, per column
    pub fn column_alignments<S: AsRef<str>>(mut self, alignments: &[S]) -> Self {
        self.alignments = alignments.iter().map(|a| a.as_ref().to_string()).collect();
        self
    }

    /// Build the table
    pub fn build(&self, factory: &ElementFactory<'_>) -> Result<XmlElement> {
        let columns = self
            .rows
            .first()
            .map(Vec::len)
            .ok_or_else(|| Error::InvalidDocument("table has no rows".into()))?;
        if let Some(widths) = &self.column_widths {
            if widths.len() != columns {
                return Err(Error::AmbiguousColumnWidth {
                    columns,
                    widths: widths.len(),
                });
            }
        }

        let mut table = factory.element("w:tbl")?;
        table.push_child(self.properties(factory)?);

        let mut grid = factory.element("w:tblGrid")?;
        for i in 0..columns {
            let width = self.column_width(i).map(|w| w.to_string());
            let width = width.as_deref().unwrap_or(DEFAULT_GRID_WIDTH);
            grid.push_child(factory.element_with_attrs("w:gridCol", &[("w", width)])?);
        }
        table.push_child(grid);

        let mut body_rows = self.rows.iter();
        if self.heading {
            if let Some(first) = body_rows.next() {
                table.push_child(self.heading_row(factory, first)?);
            }
        }
        for row in body_rows {
            let mut tr = factory.element("w:tr")?;
            for (i, items) in row.iter().enumerate() {
                let tc_pr = factory
                    .element("w:tcPr")?
                    .with_child(self.cell_width(factory, i)?);
                let align = self.alignments.get(i).map_or("left", String::as_str);
                tr.push_child(cell(factory, tc_pr, items, align)?);
            }
            table.push_child(tr);
        }

        Ok(table)
    }

    fn properties(&self, factory: &ElementFactory<'_>) -> Result<XmlElement> {
        let width = self.width.to_string();
        let mut props = factory
            .element("w:tblPr")?
            .with_child(factory.val("w:tblStyle", "ColorfulGrid-Accent1")?)
            .with_child(factory.element_with_attrs(
                "w:tblW",
                &[("w", width.as_str()), ("type", self.width_unit.as_str())],
            )?);

        if !self.borders.is_empty() {
            let all = self.border_for(BorderSide::All);
            let mut borders = factory.element("w:tblBorders")?;
            for side in BorderSide::EDGES {
                if let Some(border) = all.or_else(|| self.border_for(side)) {
                    borders.push_child(border.to_element(factory, side)?);
                }
            }
            props.push_child(borders);
        }

        props.push_child(factory.val("w:tblLook", "0400")?);
        Ok(props)
    }

    fn heading_row(&self, factory: &ElementFactory<'_>, cells: &[Vec<CellItem>]) -> Result<XmlElement> {
        let mut tr = factory.element("w:tr")?.with_child(
            factory
                .element("w:trPr")?
                .with_child(factory.val("w:cnfStyle", "000000100000")?),
        );
        for (i, items) in cells.iter().enumerate() {
            let shading = factory.element_with_attrs(
                "w:shd",
                &[
                    ("val", "clear"),
                    ("color", "auto"),
                    ("fill", "548DD4"),
                    ("themeFill", "text2"),
                    ("themeFillTint", "99"),
                ],
            )?;
            let tc_pr = factory
                .element("w:tcPr")?
                .with_child(self.cell_width(factory, i)?)
                .with_child(shading);
            tr.push_child(cell(factory, tc_pr, items, "center")?);
        }
        Ok(tr)
    }

    fn border_for(&self, side: BorderSide) -> Option<&Border> {
        self.borders
            .iter()
            .find(|(s, _)| *s == side)
            .map(|(_, border)| border)
    }

    fn column_width(&self, index: usize) -> Option<u32> {
        self.column_widths
            .as_ref()
            .and_then(|widths| widths.get(index).copied())
    }

    fn cell_width(&self, factory: &ElementFactory<'_>, index: usize) -> Result<XmlElement> {
        match self.column_width(index) {
            Some(width) => factory.element_with_attrs(
                "w:tcW",
                &[("w", width.to_string().as_str()), ("type", self.column_unit.as_str())],
            ),
            None => factory.element_with_attrs("w:tcW", &[("w", "0"), ("type", "auto")]),
        }
    }
}

fn cell(
    factory: &ElementFactory<'_>,
    properties: XmlElement,
    items: &[CellItem],
    align: &str,
) -> Result<XmlElement> {
    let mut tc = factory.element("w:tc")?.with_child(properties);
    for item in items {
        match item {
            CellItem::Element(element) => tc.push_child(element.clone()),
            CellItem::Text(text) => tc.push_child(
                ParagraphBuilder::new(text.as_str())
                    .justification(align)
                    .build(factory)?,
            ),
        }
    }
    Ok(tc)
}
