//! Structured XML serialization (the worksheet's native cell markup)
//!
//! Tag vocabulary: `t` text run, `fn` function application, `a` absolute
//! value, `lm` limit, `d` derivative, `r` an inner cell list, `hl` a
//! highlighted region.

use std::io::Cursor;

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::error::{CellError, CellResult};
use crate::model::{CellId, CellKind, CellTree};

/// Serialize a logical chain to worksheet XML.
pub fn list_to_xml(tree: &CellTree, head: CellId) -> CellResult<String> {
    let mut writer = XmlCellWriter::new(Cursor::new(Vec::new()));
    writer.write_list(tree, head)?;
    let bytes = writer.into_inner().into_inner();
    Ok(String::from_utf8(bytes)?)
}

/// Serialize one cell to worksheet XML.
pub fn cell_to_xml(tree: &CellTree, id: CellId) -> CellResult<String> {
    let mut writer = XmlCellWriter::new(Cursor::new(Vec::new()));
    writer.write_cell(tree, id)?;
    let bytes = writer.into_inner().into_inner();
    Ok(String::from_utf8(bytes)?)
}

struct XmlCellWriter<W: std::io::Write> {
    writer: Writer<W>,
}

impl<W: std::io::Write> XmlCellWriter<W> {
    fn new(inner: W) -> Self {
        Self {
            writer: Writer::new(inner),
        }
    }

    fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    fn start(&mut self, elem: BytesStart) -> CellResult<()> {
        self.writer
            .write_event(Event::Start(elem))
            .map_err(|e| CellError::XmlWrite(e.to_string()))
    }

    fn end(&mut self, name: &str) -> CellResult<()> {
        self.writer
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(|e| CellError::XmlWrite(e.to_string()))
    }

    fn text(&mut self, text: &str) -> CellResult<()> {
        self.writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(|e| CellError::XmlWrite(e.to_string()))
    }

    fn write_list(&mut self, tree: &CellTree, head: CellId) -> CellResult<()> {
        for id in tree.logical_iter(head) {
            self.write_cell(tree, id)?;
        }
        Ok(())
    }

    fn write_cell(&mut self, tree: &CellTree, id: CellId) -> CellResult<()> {
        let cell = &tree[id];
        if cell.flags.highlight {
            self.start(BytesStart::new("hl"))?;
        }
        match &cell.kind {
            CellKind::Text { text } => {
                let mut elem = BytesStart::new("t");
                if cell.flags.force_break_line {
                    elem.push_attribute(("breakline", "true"));
                }
                self.start(elem)?;
                self.text(text)?;
                self.end("t")?;
            }
            CellKind::Invalid => {
                self.start(BytesStart::new("t"))?;
                self.text("?")?;
                self.end("t")?;
            }
            CellKind::Fun { name, arg } => {
                self.start(BytesStart::new("fn"))?;
                self.wrapped_list(tree, *name)?;
                self.wrapped_list(tree, *arg)?;
                self.end("fn")?;
            }
            CellKind::Abs { inner, .. } => {
                self.start(BytesStart::new("a"))?;
                self.wrapped_list(tree, *inner)?;
                self.end("a")?;
            }
            CellKind::Limit {
                name, under, base, ..
            } => {
                self.start(BytesStart::new("lm"))?;
                self.wrapped_list(tree, *name)?;
                self.wrapped_list(tree, *under)?;
                self.wrapped_list(tree, *base)?;
                self.end("lm")?;
            }
            CellKind::Diff { diff, base } => {
                self.start(BytesStart::new("d"))?;
                self.wrapped_list(tree, *diff)?;
                self.wrapped_list(tree, *base)?;
                self.end("d")?;
            }
        }
        if cell.flags.highlight {
            self.end("hl")?;
        }
        Ok(())
    }

    /// An inner list wrapped in its `<r>` region element.
    fn wrapped_list(&mut self, tree: &CellTree, head: CellId) -> CellResult<()> {
        self.start(BytesStart::new("r"))?;
        self.write_list(tree, head)?;
        self.end("r")
    }
}
