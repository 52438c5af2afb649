//! Rich-text serialization and markup recovery
//!
//! RTF is 7-bit: control characters are escaped with a backslash and
//! anything outside ASCII is emitted as a signed 16-bit `\uN?` escape.
//! The markup conversion never fails; malformed input yields an empty
//! string so a bad clipboard fragment cannot break a copy operation.

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::model::{CellId, CellTree};
use crate::string_writer::cell_to_string;

/// Escape arbitrary text for inclusion in an RTF document.
pub fn rtf_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '{' => out.push_str("\\{"),
            '}' => out.push_str("\\}"),
            '\n' => out.push_str("\\line "),
            c if c.is_ascii() => out.push(c),
            c => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    out.push_str(&format!("\\u{}?", *unit as i16));
                }
            }
        }
    }
    out
}

/// Serialize one cell to RTF text. Empty for a cell currently broken into
/// lines; its parts on the draw chain carry the text instead.
pub fn cell_to_rtf(tree: &CellTree, id: CellId) -> String {
    rtf_escape(&cell_to_string(tree, id))
}

/// Serialize a draw chain to RTF, breaking the line at forced breaks.
pub fn list_to_rtf(tree: &CellTree, head: CellId) -> String {
    let mut out = String::new();
    for id in tree.draw_iter(head) {
        if id != head && tree[id].flags.force_break_line {
            out.push_str("\\line ");
        }
        out.push_str(&cell_to_rtf(tree, id));
    }
    out
}

/// Convert structured cell markup to RTF text by flattening its text
/// content. Recovers locally from malformed input by returning an empty
/// string.
pub fn markup_to_rtf(markup: &str) -> String {
    let mut reader = Reader::from_reader(markup.as_bytes());
    reader.config_mut().trim_text(true);
    reader.config_mut().check_end_names = true;
    let mut out = String::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Text(text)) => match text.unescape() {
                Ok(text) => out.push_str(&rtf_escape(&text)),
                Err(_) => return String::new(),
            },
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(_) => return String::new(),
        }
        buf.clear();
    }
    out
}
