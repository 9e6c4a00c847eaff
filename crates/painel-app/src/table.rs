// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Walks the server-rendered indicator table.
//!
//! The server sends a pandas `to_html` table. Body cells (`td` in a row that
//! is not inside `thead`/`tfoot`) whose text starts with a number get
//! `valor-positivo` or `valor-negativo`; everything else passes through
//! byte-for-byte. Markup the reader cannot follow is returned unchanged.

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::attributes::Attribute;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesRef, BytesStart, Event};

use crate::numeric::parse_float_prefix;

pub const POSITIVE_CLASS: &str = "valor-positivo";
pub const NEGATIVE_CLASS: &str = "valor-negativo";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellTone {
    Positive,
    Negative,
    Neutral,
}

impl CellTone {
    pub fn of(text: &str) -> Self {
        match parse_float_prefix(text) {
            Some(value) if value > 0.0 => Self::Positive,
            Some(value) if value < 0.0 => Self::Negative,
            _ => Self::Neutral,
        }
    }

    pub const fn css_class(self) -> Option<&'static str> {
        match self {
            Self::Positive => Some(POSITIVE_CLASS),
            Self::Negative => Some(NEGATIVE_CLASS),
            Self::Neutral => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridCell {
    pub text: String,
    pub tone: CellTone,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableRow {
    pub cells: Vec<GridCell>,
}

/// Plain-text view of the table for front-ends that cannot show HTML.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableGrid {
    pub header: Vec<String>,
    pub rows: Vec<TableRow>,
}

impl TableGrid {
    pub fn column_count(&self) -> usize {
        self.rows
            .iter()
            .map(|row| row.cells.len())
            .chain(std::iter::once(self.header.len()))
            .max()
            .unwrap_or(0)
    }
}

fn reader_for(markup: &str) -> Reader<&[u8]> {
    let mut reader = Reader::from_str(markup);
    let config = reader.config_mut();
    config.check_end_names = false;
    config.allow_unmatched_ends = true;
    reader
}

fn lower_name(raw: &[u8]) -> Vec<u8> {
    raw.to_ascii_lowercase()
}

/// HTML elements that never get an end tag.
fn is_void(name: &[u8]) -> bool {
    matches!(
        name,
        b"area"
            | b"base"
            | b"br"
            | b"col"
            | b"embed"
            | b"hr"
            | b"img"
            | b"input"
            | b"link"
            | b"meta"
            | b"param"
            | b"source"
            | b"track"
            | b"wbr"
    )
}

/// Text a browser shows for an entity or character reference. Unknown
/// entities keep a bare `&`, which ends any numeric prefix.
fn reference_text(reference: &BytesRef<'_>) -> String {
    if let Ok(Some(ch)) = reference.resolve_char_ref() {
        return ch.to_string();
    }
    match reference.decode() {
        Ok(name) if name == "nbsp" => '\u{a0}'.to_string(),
        Ok(name) => resolve_predefined_entity(&name).unwrap_or("&").to_owned(),
        Err(_) => "&".to_owned(),
    }
}

fn in_body_row(stack: &[Vec<u8>]) -> bool {
    stack.last().is_some_and(|name| name == b"tr")
        && stack.iter().any(|name| name == b"table")
        && !stack
            .iter()
            .any(|name| name == b"thead" || name == b"tfoot")
}

struct PendingCell {
    start: BytesStart<'static>,
    inner: Vec<Event<'static>>,
    /// Elements opened inside the cell and not yet closed.
    open: Vec<Vec<u8>>,
    text: String,
}

/// Adds the positive/negative class to numeric body cells.
pub fn tag_numeric_cells(markup: &str) -> String {
    match try_tag_numeric_cells(markup) {
        Ok(tagged) => tagged,
        Err(error) => {
            tracing::warn!(%error, "table markup left untagged");
            markup.to_owned()
        }
    }
}

fn try_tag_numeric_cells(markup: &str) -> Result<String, String> {
    let mut reader = reader_for(markup);
    let mut writer = Writer::new(Vec::new());
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut pending: Option<PendingCell> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|error| format!("read table markup: {error}"))?;
        match event {
            Event::Eof => break,
            Event::Start(start) => {
                let name = lower_name(start.name().as_ref());
                if let Some(cell) = pending.as_mut() {
                    if !is_void(&name) {
                        cell.open.push(name);
                    }
                    cell.inner.push(Event::Start(start.into_owned()));
                    continue;
                }
                if is_void(&name) {
                    write(&mut writer, Event::Start(start))?;
                    continue;
                }
                if name == b"td" && in_body_row(&stack) {
                    pending = Some(PendingCell {
                        start: start.into_owned(),
                        inner: Vec::new(),
                        open: Vec::new(),
                        text: String::new(),
                    });
                } else {
                    write(&mut writer, Event::Start(start))?;
                }
                stack.push(name);
            }
            Event::End(end) => {
                let name = lower_name(end.name().as_ref());
                if let Some(cell) = pending.as_mut() {
                    if let Some(at) = cell.open.iter().rposition(|open| *open == name) {
                        cell.open.truncate(at);
                        cell.inner.push(Event::End(end.into_owned()));
                        continue;
                    }
                    if name != b"td" {
                        cell.inner.push(Event::End(end.into_owned()));
                        continue;
                    }
                    let cell = pending.take().ok_or("cell state lost")?;
                    let start = with_tone_class(&cell.start, CellTone::of(&cell.text))?;
                    write(&mut writer, Event::Start(start))?;
                    for inner in cell.inner {
                        write(&mut writer, inner)?;
                    }
                    write(&mut writer, Event::End(end))?;
                    stack.pop();
                    continue;
                }
                if stack.last() == Some(&name) {
                    stack.pop();
                }
                write(&mut writer, Event::End(end))?;
            }
            Event::Text(text) => {
                if let Some(cell) = pending.as_mut() {
                    cell.text.push_str(&String::from_utf8_lossy(&text));
                    cell.inner.push(Event::Text(text.into_owned()));
                } else {
                    write(&mut writer, Event::Text(text))?;
                }
            }
            Event::GeneralRef(reference) => {
                if let Some(cell) = pending.as_mut() {
                    cell.text.push_str(&reference_text(&reference));
                    cell.inner.push(Event::GeneralRef(reference.into_owned()));
                } else {
                    write(&mut writer, Event::GeneralRef(reference))?;
                }
            }
            other => {
                if let Some(cell) = pending.as_mut() {
                    cell.inner.push(other.into_owned());
                } else {
                    write(&mut writer, other)?;
                }
            }
        }
    }

    if pending.is_some() {
        return Err("unterminated table cell".to_owned());
    }

    String::from_utf8(writer.into_inner()).map_err(|error| error.to_string())
}

fn write(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), String> {
    writer
        .write_event(event)
        .map_err(|error| format!("write table markup: {error}"))
}

fn with_tone_class(start: &BytesStart<'_>, tone: CellTone) -> Result<BytesStart<'static>, String> {
    let Some(class) = tone.css_class() else {
        return Ok(start.clone().into_owned());
    };

    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut tagged = BytesStart::new(name);
    let mut existing_class: Option<Vec<u8>> = None;
    for attribute in start.html_attributes() {
        let attribute = attribute.map_err(|error| format!("cell attribute: {error}"))?;
        if attribute.key.as_ref().eq_ignore_ascii_case(b"class") {
            existing_class = Some(attribute.value.into_owned());
        } else {
            tagged.push_attribute(attribute);
        }
    }

    let mut value = existing_class.unwrap_or_default();
    if !value.is_empty() {
        value.push(b' ');
    }
    value.extend_from_slice(class.as_bytes());
    tagged.push_attribute(Attribute::from((b"class".as_slice(), value.as_slice())));
    Ok(tagged.into_owned())
}

/// Reads header labels and body cells, with the same tone rule as
/// [`tag_numeric_cells`].
pub fn parse_grid(markup: &str) -> Option<TableGrid> {
    let mut reader = reader_for(markup);
    let mut grid = TableGrid::default();
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut row: Option<(bool, Vec<GridCell>)> = None;
    let mut cell: Option<(bool, String)> = None;
    let mut header_rows: Vec<Vec<String>> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Eof) => break,
            Ok(Event::Start(start)) => {
                let name = lower_name(start.name().as_ref());
                if name == b"tr" {
                    let in_head = stack
                        .iter()
                        .any(|name| name == b"thead" || name == b"tfoot");
                    row = Some((in_head, Vec::new()));
                } else if (name == b"td" || name == b"th") && row.is_some() {
                    cell = Some((name == b"td", String::new()));
                }
                if !is_void(&name) {
                    stack.push(name);
                }
            }
            Ok(Event::End(end)) => {
                let name = lower_name(end.name().as_ref());
                if stack.last() == Some(&name) {
                    stack.pop();
                }
                if (name == b"td" || name == b"th")
                    && let Some((is_data, text)) = cell.take()
                    && let Some((in_head, cells)) = row.as_mut()
                {
                    let text = text.trim().to_owned();
                    let tone = if is_data && !*in_head {
                        CellTone::of(&text)
                    } else {
                        CellTone::Neutral
                    };
                    cells.push(GridCell { text, tone });
                } else if name == b"tr"
                    && let Some((in_head, cells)) = row.take()
                {
                    if in_head {
                        header_rows.push(cells.into_iter().map(|cell| cell.text).collect());
                    } else {
                        grid.rows.push(TableRow { cells });
                    }
                }
            }
            Ok(Event::Text(text)) => {
                if let Some((_, buffer)) = cell.as_mut() {
                    buffer.push_str(&String::from_utf8_lossy(&text));
                }
            }
            Ok(Event::GeneralRef(reference)) => {
                if let Some((_, buffer)) = cell.as_mut() {
                    buffer.push_str(&reference_text(&reference));
                }
            }
            Ok(_) => {}
            Err(error) => {
                tracing::warn!(%error, "table markup could not be read");
                return None;
            }
        }
    }

    grid.header = header_rows
        .into_iter()
        .find(|labels| labels.iter().any(|label| !label.is_empty()))
        .unwrap_or_default();
    Some(grid)
}

#[cfg(test)]
mod tests {
    use super::{CellTone, parse_grid, tag_numeric_cells};

    const PANDAS_TABLE: &str = concat!(
        "<table border=\"1\" class=\"dataframe table table-striped\">",
        "<thead><tr style=\"text-align: right;\"><th></th><th>Mes</th><th>Valor</th></tr></thead>",
        "<tbody>",
        "<tr><th>0</th><td>Jan</td><td>12.5</td></tr>",
        "<tr><th>1</th><td>Fev</td><td>-3</td></tr>",
        "<tr><th>2</th><td>Mar</td><td>0</td></tr>",
        "</tbody></table>"
    );

    #[test]
    fn positive_and_negative_body_cells_are_tagged() {
        let tagged = tag_numeric_cells(PANDAS_TABLE);
        assert!(tagged.contains("<td class=\"valor-positivo\">12.5</td>"));
        assert!(tagged.contains("<td class=\"valor-negativo\">-3</td>"));
        assert!(tagged.contains("<td>0</td>"));
        assert!(tagged.contains("<td>Jan</td>"));
    }

    #[test]
    fn header_and_index_cells_are_untouched() {
        let tagged = tag_numeric_cells(PANDAS_TABLE);
        assert!(tagged.contains("<th>0</th>"));
        assert!(tagged.contains("<th>Valor</th>"));
        assert!(tagged.starts_with("<table border=\"1\" class=\"dataframe table table-striped\">"));
    }

    #[test]
    fn existing_cell_class_is_extended() {
        let markup = "<table><tbody><tr><td class=\"num\" data-x=\"1\">7</td></tr></tbody></table>";
        let tagged = tag_numeric_cells(markup);
        assert!(tagged.contains("<td data-x=\"1\" class=\"num valor-positivo\">7</td>"));
    }

    #[test]
    fn rows_without_tbody_count_as_body_rows() {
        let markup = "<table><tr><td>-1.5</td></tr></table>";
        assert!(tag_numeric_cells(markup).contains("valor-negativo"));
    }

    #[test]
    fn nested_markup_inside_a_cell_is_preserved() {
        let markup = "<table><tbody><tr><td><b>42</b> units</td></tr></tbody></table>";
        let tagged = tag_numeric_cells(markup);
        assert_eq!(
            tagged,
            "<table><tbody><tr><td class=\"valor-positivo\"><b>42</b> units</td></tr></tbody></table>"
        );
    }

    #[test]
    fn line_break_inside_a_cell_does_not_hide_later_cells() {
        let tagged =
            tag_numeric_cells("<table><tbody><tr><td>5<br></td><td>-2</td></tr></tbody></table>");
        assert_eq!(
            tagged,
            "<table><tbody><tr><td class=\"valor-positivo\">5<br></td><td class=\"valor-negativo\">-2</td></tr></tbody></table>"
        );

        let tagged = tag_numeric_cells("<table><tr><td>a<br>b</td><td>3</td></tr></table>");
        assert!(tagged.contains("<td>a<br>b</td>"));
        assert!(tagged.contains("<td class=\"valor-positivo\">3</td>"));
    }

    #[test]
    fn unclosed_inline_markup_ends_with_its_cell() {
        let tagged = tag_numeric_cells("<table><tr><td><p>-4</td><td>8</td></tr></table>");
        assert!(tagged.contains("<td class=\"valor-negativo\"><p>-4</td>"));
        assert!(tagged.contains("<td class=\"valor-positivo\">8</td>"));
    }

    #[test]
    fn nested_table_cells_stay_inside_their_parent_cell() {
        let markup = "<table><tr><td>1<table><tr><td>x</td></tr></table></td><td>-1</td></tr></table>";
        let tagged = tag_numeric_cells(markup);
        assert!(tagged.starts_with("<table><tr><td class=\"valor-positivo\">1<table>"));
        assert!(tagged.contains("<td class=\"valor-negativo\">-1</td>"));
    }

    #[test]
    fn character_references_count_toward_the_number() {
        let tagged = tag_numeric_cells(
            "<table><tr><td>&#45;5</td><td>&#x2D;1</td><td>&nbsp;7</td><td>&amp;2</td></tr></table>",
        );
        assert!(tagged.contains("<td class=\"valor-negativo\">&#45;5</td>"));
        assert!(tagged.contains("<td class=\"valor-negativo\">&#x2D;1</td>"));
        assert!(tagged.contains("<td class=\"valor-positivo\">&nbsp;7</td>"));
        assert!(tagged.contains("<td>&amp;2</td>"));
    }

    #[test]
    fn markup_without_tables_passes_through() {
        let markup = "<div class=\"alert\">nothing here</div>";
        assert_eq!(tag_numeric_cells(markup), markup);
    }

    #[test]
    fn grid_reads_header_and_tones() {
        let grid = parse_grid(PANDAS_TABLE).expect("grid");
        assert_eq!(grid.header, vec!["", "Mes", "Valor"]);
        assert_eq!(grid.rows.len(), 3);
        assert_eq!(grid.rows[0].cells[2].tone, CellTone::Positive);
        assert_eq!(grid.rows[1].cells[2].tone, CellTone::Negative);
        assert_eq!(grid.rows[2].cells[2].tone, CellTone::Neutral);
        assert_eq!(grid.rows[0].cells[0].tone, CellTone::Neutral);
        assert_eq!(grid.column_count(), 3);
    }

    #[test]
    fn grid_keeps_body_rows_after_a_header_line_break() {
        let markup = concat!(
            "<table><thead><tr><th>Valor<br>R$</th></tr></thead>",
            "<tbody><tr><td>&#45;3<br></td></tr><tr><td>2</td></tr></tbody></table>"
        );
        let grid = parse_grid(markup).expect("grid");
        assert_eq!(grid.header, vec!["ValorR$"]);
        assert_eq!(grid.rows.len(), 2);
        assert_eq!(grid.rows[0].cells[0].text, "-3");
        assert_eq!(grid.rows[0].cells[0].tone, CellTone::Negative);
        assert_eq!(grid.rows[1].cells[0].tone, CellTone::Positive);
    }
}
