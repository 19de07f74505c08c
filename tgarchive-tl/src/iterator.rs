//! Iterator that drives [`crate::parse_tl_file`].

use crate::errors::ParseError;
use crate::tl::{Category, Definition};

pub(crate) struct TlIterator<'a> {
    lines: std::iter::Enumerate<std::str::Lines<'a>>,
    category: Category,
    /// Multi-line definitions accumulate here until their `;`.
    pending: String,
    pending_start: usize,
}

impl<'a> TlIterator<'a> {
    pub(crate) fn new(src: &'a str) -> Self {
        Self {
            lines: src.lines().enumerate(),
            category: Category::Types,
            pending: String::new(),
            pending_start: 0,
        }
    }
}

impl Iterator for TlIterator<'_> {
    /// The 1-based line the definition starts on, and its parse result.
    type Item = (usize, Result<Definition, ParseError>);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (idx, line) = self.lines.next()?;
            let line = match line.split_once("//") {
                Some((code, _)) => code.trim(),
                None => line.trim(),
            };
            if line.is_empty() {
                continue;
            }

            match line {
                "---functions---" => { self.category = Category::Functions; continue; }
                "---types---"     => { self.category = Category::Types;     continue; }
                _ => {}
            }

            if self.pending.is_empty() {
                self.pending_start = idx + 1;
            } else {
                self.pending.push(' ');
            }
            self.pending.push_str(line);

            if !line.ends_with(';') {
                continue;
            }

            let raw = std::mem::take(&mut self.pending);
            let result = raw.parse::<Definition>().map(|mut def| {
                def.category = self.category;
                def.line = self.pending_start;
                def
            });
            return Some((self.pending_start, result));
        }
    }
}
