//! Message entities ↔ inline-delimited markup.
//!
//! # Delimiters
//! `**bold**`, `__italic__`, `--underline--`, `~~strike~~`, `||spoiler||`,
//! `` `code` ``, ` ```pre``` `, `>quote` and `**>collapsed quote` at the start
//! of every quoted line, `[text](url)`, `[text](tg://user?id=123)` and
//! `![emoji](tg://emoji?id=456)`.
//!
//! Entity offsets and lengths count UTF-16 code units, so all position
//! arithmetic here happens on a UTF-16 view of the text.

use tgarchive_tl::{Object, Value};

pub const BOLD: &str = "**";
pub const ITALIC: &str = "__";
pub const UNDERLINE: &str = "--";
pub const STRIKE: &str = "~~";
pub const SPOILER: &str = "||";
pub const CODE: &str = "`";
pub const PRE: &str = "```";
pub const QUOTE: &str = ">";
pub const COLLAPSED_QUOTE: &str = "**>";

const MENTION_PREFIX: &str = "tg://user?id=";
const EMOJI_PREFIX: &str = "tg://emoji?id=";

// ─── Entities ────────────────────────────────────────────────────────────────

/// What a [`EntitySpan`] marks up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EntityKind {
    Bold,
    Italic,
    Underline,
    Strike,
    Spoiler,
    Code,
    Pre { language: String },
    Blockquote { collapsed: bool },
    TextUrl { url: String },
    MentionName { user_id: i64 },
    CustomEmoji { document_id: i64 },
    /// Mentions, hashtags, urls and the like: detected by clients from the
    /// text itself, so they carry no markup.
    Other,
}

/// One `messageEntity*` annotation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntitySpan {
    pub kind:   EntityKind,
    pub offset: i32,
    pub length: i32,
}

impl EntitySpan {
    pub fn new(kind: EntityKind, offset: i32, length: i32) -> Self {
        Self { kind, offset, length }
    }

    /// Read a decoded `messageEntity*` object. `None` if `obj` is not one.
    pub fn from_object(obj: &Object) -> Option<Self> {
        let kind_name = obj.name.strip_prefix("messageEntity")?;
        let int = |name: &str| obj.get(name).and_then(Value::as_i64);
        let offset = int("offset")? as i32;
        let length = int("length")? as i32;

        let kind = match kind_name {
            "Bold" => EntityKind::Bold,
            "Italic" => EntityKind::Italic,
            "Underline" => EntityKind::Underline,
            "Strike" => EntityKind::Strike,
            "Spoiler" => EntityKind::Spoiler,
            "Code" => EntityKind::Code,
            "Pre" => EntityKind::Pre {
                language: obj.get("language").and_then(Value::as_str).unwrap_or_default().to_owned(),
            },
            "Blockquote" => EntityKind::Blockquote { collapsed: obj.flag("collapsed") },
            "TextUrl" => EntityKind::TextUrl {
                url: obj.get("url").and_then(Value::as_str).unwrap_or_default().to_owned(),
            },
            "MentionName" => EntityKind::MentionName { user_id: int("user_id")? },
            "CustomEmoji" => EntityKind::CustomEmoji { document_id: int("document_id")? },
            _ => EntityKind::Other,
        };
        Some(Self { kind, offset, length })
    }

    fn start(&self) -> i64 { i64::from(self.offset) }

    fn end(&self) -> i64 { i64::from(self.offset) + i64::from(self.length) }

    /// Whether `[start, end)` opens and closes inside this span.
    fn encloses(&self, start: i64, end: i64) -> bool {
        self.start() <= start && start < self.end() && self.start() < end && end <= self.end()
    }
}

impl EntityKind {
    /// The symmetric delimiter of the simple paired kinds.
    fn delimiter(&self) -> Option<&'static str> {
        Some(match self {
            Self::Bold => BOLD,
            Self::Italic => ITALIC,
            Self::Underline => UNDERLINE,
            Self::Strike => STRIKE,
            Self::Spoiler => SPOILER,
            Self::Code => CODE,
            _ => return None,
        })
    }
}

// ─── Reconstruction ──────────────────────────────────────────────────────────

/// Re-insert the markup described by `spans` into `text`.
///
/// Every delimiter becomes a `(position, priority, text)` insertion. Openers
/// get the span's index as priority and closers its negation, so at one
/// position closers come before openers and a later span closes before an
/// earlier one. Insertions are applied from the end of the text backwards and
/// never land between the halves of a surrogate pair.
pub fn reconstruct(text: &str, spans: &[EntitySpan]) -> String {
    let mut units: Vec<u16> = text.encode_utf16().collect();
    let mut inserts: Vec<(i64, i64, String)> = Vec::new();

    for (i, span) in spans.iter().enumerate() {
        let prio = i as i64;
        let (s, e) = (span.start(), span.end());

        match &span.kind {
            EntityKind::Pre { language } => {
                let quotes: Vec<bool> = spans
                    .iter()
                    .filter_map(|q| match q.kind {
                        EntityKind::Blockquote { collapsed } if q.encloses(s, e) => Some(collapsed),
                        _ => None,
                    })
                    .collect();
                let (open, close) = if quotes.is_empty() {
                    (PRE.to_owned(), PRE.to_owned())
                } else {
                    let marker = if quotes.contains(&true) { COLLAPSED_QUOTE } else { QUOTE };
                    (format!("{PRE}{language}\n{marker}"), format!("\n{marker}{PRE}"))
                };
                inserts.push((s, prio, open));
                inserts.push((e, -prio, close));
            }
            EntityKind::Blockquote { collapsed } => {
                let marker = if *collapsed { COLLAPSED_QUOTE } else { QUOTE };
                let from = clamp(s, units.len());
                let quoted = &units[from..clamp(e, units.len()).max(from)];
                let mut line_start = s;
                for len in line_lengths(quoted) {
                    inserts.push((line_start, prio, marker.to_owned()));
                    line_start += len as i64 + 1;
                }
            }
            EntityKind::TextUrl { url } => link(&mut inserts, s, e, prio, "[", url),
            EntityKind::MentionName { user_id } => {
                link(&mut inserts, s, e, prio, "[", &format!("{MENTION_PREFIX}{user_id}"))
            }
            EntityKind::CustomEmoji { document_id } => {
                link(&mut inserts, s, e, prio, "![", &format!("{EMOJI_PREFIX}{document_id}"))
            }
            kind => {
                if let Some(delim) = kind.delimiter() {
                    inserts.push((s, prio, delim.to_owned()));
                    inserts.push((e, -prio, delim.to_owned()));
                }
            }
        }
    }

    inserts.sort_by_key(|&(at, prio, _)| (at, prio));
    for (at, _, what) in inserts.into_iter().rev() {
        let mut at = clamp(at, units.len());
        while within_surrogate(&units, at) {
            at += 1;
        }
        units.splice(at..at, what.encode_utf16());
    }

    String::from_utf16_lossy(&units)
}

fn link(inserts: &mut Vec<(i64, i64, String)>, s: i64, e: i64, prio: i64, open: &str, url: &str) {
    inserts.push((s, prio, open.to_owned()));
    inserts.push((e, -prio, format!("]({url})")));
}

fn clamp(at: i64, len: usize) -> usize {
    at.clamp(0, len as i64) as usize
}

/// `at` sits between a high surrogate and the unit after it.
fn within_surrogate(units: &[u16], at: usize) -> bool {
    at > 0
        && at < units.len()
        && (0xD800..=0xDBFF).contains(&units[at - 1])
        && (0xD800..=0xDFFF).contains(&units[at])
}

/// Lengths of the lines of `units`, split on every Unicode line boundary with
/// `\r\n` counting once. A trailing boundary does not start another line.
fn line_lengths(units: &[u16]) -> Vec<usize> {
    const BREAKS: [u16; 10] = [0x0A, 0x0B, 0x0C, 0x0D, 0x1C, 0x1D, 0x1E, 0x85, 0x2028, 0x2029];

    let mut lens = Vec::new();
    let (mut start, mut i) = (0, 0);
    while i < units.len() {
        if BREAKS.contains(&units[i]) {
            lens.push(i - start);
            if units[i] == 0x0D && units.get(i + 1) == Some(&0x0A) {
                i += 1;
            }
            start = i + 1;
        }
        i += 1;
    }
    if start < units.len() {
        lens.push(units.len() - start);
    }
    lens
}

// ─── Parsing ─────────────────────────────────────────────────────────────────

/// Parse delimited markup back into `(plain_text, spans)`.
///
/// Understands the paired delimiters and links; quote markers are left as
/// text. Spans come back ordered by offset, outer spans first.
pub fn parse_markup(text: &str) -> (String, Vec<EntitySpan>) {
    let mut out   = String::with_capacity(text.len());
    let mut spans = Vec::new();
    let chars: Vec<char> = text.chars().collect();
    let n = chars.len();
    let mut i = 0;

    let mut open_stack: Vec<(EntityKind, i32)> = Vec::new();
    let mut utf16_off: i32 = 0;

    macro_rules! push_str {
        ($s:expr) => {{
            for c in $s {
                out.push(c);
                utf16_off += c.len_utf16() as i32;
            }
        }};
    }

    let find = |from: usize, pat: &[char]| {
        (from..n.saturating_sub(pat.len() - 1)).find(|&j| chars[j..j + pat.len()] == *pat)
    };

    while i < n {
        // ```pre```
        if chars[i..].starts_with(&['`', '`', '`']) {
            if let Some(j) = find(i + 3, &['`', '`', '`']) {
                let start = utf16_off;
                push_str!(chars[i + 3..j].iter().copied());
                spans.push(EntitySpan::new(EntityKind::Pre { language: String::new() }, start, utf16_off - start));
                i = j + 3;
                continue;
            }
        }

        // `code`
        if chars[i] == '`' {
            if let Some(j) = find(i + 1, &['`']) {
                let start = utf16_off;
                push_str!(chars[i + 1..j].iter().copied());
                spans.push(EntitySpan::new(EntityKind::Code, start, utf16_off - start));
                i = j + 1;
                continue;
            }
        }

        // [text](url) and ![emoji](tg://emoji?id=…)
        let bang = chars[i] == '!' && chars.get(i + 1) == Some(&'[');
        if chars[i] == '[' || bang {
            let text_start = i + 1 + usize::from(bang);
            if let Some(j) = find(text_start, &[']', '(']) {
                if let Some(k) = find(j + 2, &[')']) {
                    let url: String = chars[j + 2..k].iter().collect();
                    let start = utf16_off;
                    push_str!(chars[text_start..j].iter().copied());
                    let length = utf16_off - start;

                    let kind = if let Some(id) = url.strip_prefix(EMOJI_PREFIX).filter(|_| bang) {
                        id.parse().ok().map(|document_id| EntityKind::CustomEmoji { document_id })
                    } else if let Some(id) = url.strip_prefix(MENTION_PREFIX) {
                        id.parse().ok().map(|user_id| EntityKind::MentionName { user_id })
                    } else {
                        Some(EntityKind::TextUrl { url })
                    };
                    if let Some(kind) = kind {
                        spans.push(EntitySpan::new(kind, start, length));
                    }
                    i = k + 1;
                    continue;
                }
            }
        }

        // two-char delimiters
        let tag = match chars.get(i..i + 2) {
            Some(['*', '*']) => Some(EntityKind::Bold),
            Some(['_', '_']) => Some(EntityKind::Italic),
            Some(['-', '-']) => Some(EntityKind::Underline),
            Some(['~', '~']) => Some(EntityKind::Strike),
            Some(['|', '|']) => Some(EntityKind::Spoiler),
            _ => None,
        };
        if let Some(tag) = tag {
            if let Some(pos) = open_stack.iter().rposition(|(t, _)| *t == tag) {
                let (kind, start) = open_stack.remove(pos);
                if utf16_off > start {
                    spans.push(EntitySpan::new(kind, start, utf16_off - start));
                }
            } else {
                open_stack.push((tag, utf16_off));
            }
            i += 2;
            continue;
        }

        push_str!(std::iter::once(chars[i]));
        i += 1;
    }

    spans.sort_by_key(|s| (s.offset, std::cmp::Reverse(s.length)));
    (out, spans)
}

// ─── Tests ───────────────────────────────────────────────────────────────────
