//! G-code line handling: comment stripping, blocking classification,
//! header time estimates and printer reply parsing.
//!
//! Numbers on the printer link are read with leading-integer semantics:
//! `"210.5"` reads as 210, `"-3x"` as -3. A field with no digits is absent.

/// Longest G-code line sent in one piece. Longer file lines are split.
pub const MAX_GCODE_LINE: usize = 128;

/// Bytes at the start of a file searched for the print-time comment.
pub const HEADER_SCAN: usize = 256;

const PRINT_TIME_TAG: &str = ";Print time: ";
const CURA_TIME_TAG: &str = ";TIME:";

/// Commands that keep the printer busy long before acknowledging.
const BLOCKING: [&str; 5] = ["G28", "G29", "M109", "M190", "M400"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Homing, probing, heat-and-wait, wait-for-moves.
    Blocking,
    Standard,
}

/// Remove a `;` comment and surrounding whitespace. An empty result means
/// the line is blank and is not sent.
pub fn strip_comment(line: &str) -> &str {
    let code = match line.find(';') {
        Some(i) => &line[..i],
        None => line,
    };
    code.trim()
}

/// Classify a stripped line by its command word. A leading `N<n>` line
/// number is skipped.
pub fn classify(line: &str) -> LineKind {
    let mut words = line.split_ascii_whitespace();
    let mut word = words.next().unwrap_or("");
    let line_number = word.len() > 1
        && word.starts_with(['N', 'n'])
        && word[1..].bytes().all(|b| b.is_ascii_digit());
    if line_number {
        word = words.next().unwrap_or("");
    }
    if BLOCKING.iter().any(|b| b.eq_ignore_ascii_case(word)) {
        LineKind::Blocking
    } else {
        LineKind::Standard
    }
}

/// Leading integer of `s` after optional whitespace and sign.
pub fn atoi(s: &str) -> Option<i32> {
    let s = s.trim_start();
    let (neg, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = digits
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    let mut value: i64 = 0;
    for b in digits[..end].bytes() {
        value = (value * 10 + i64::from(b - b'0')).min(i64::from(u32::MAX));
    }
    let value = if neg { -value } else { value };
    Some(value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32)
}

/// Estimated print time in seconds from a file header.
///
/// `;Print time: H:M:S`, `;Print time: M:S`, `;Print time: <s>`, or the
/// Cura form `;TIME:<s>`.
pub fn parse_print_time(header: &[u8]) -> Option<u32> {
    let text = match core::str::from_utf8(header) {
        Ok(t) => t,
        // A scan window can cut a multi-byte sequence; keep the valid prefix.
        Err(e) => core::str::from_utf8(&header[..e.valid_up_to()]).ok()?,
    };

    if let Some(at) = text.find(PRINT_TIME_TAG) {
        let value = &text[at + PRINT_TIME_TAG.len()..];
        let fields = scan_colon_fields(value);
        let secs = match fields {
            [Some(h), Some(m), Some(s)] => h
                .saturating_mul(3600)
                .saturating_add(m.saturating_mul(60))
                .saturating_add(s),
            [Some(m), Some(s), None] => m.saturating_mul(60).saturating_add(s),
            _ => atoi(value)?,
        };
        return u32::try_from(secs).ok();
    }

    let at = text.find(CURA_TIME_TAG)?;
    atoi(&text[at + CURA_TIME_TAG.len()..]).and_then(|s| u32::try_from(s).ok())
}

/// Up to three `:`-separated leading integers, `scanf("%d:%d:%d")` style.
fn scan_colon_fields(mut s: &str) -> [Option<i32>; 3] {
    let mut out = [None; 3];
    for (i, slot) in out.iter_mut().enumerate() {
        if i > 0 {
            match s.strip_prefix(':') {
                Some(rest) => s = rest,
                None => break,
            }
        }
        let Some(v) = atoi(s) else { break };
        *slot = Some(v);
        let trimmed = s.trim_start();
        let sign = usize::from(trimmed.starts_with(['-', '+']));
        let digits = trimmed[sign..]
            .bytes()
            .take_while(u8::is_ascii_digit)
            .count();
        s = &trimmed[sign + digits..];
    }
    out
}

/// Temperatures carried by one reply line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TempReading {
    pub nozzle: Option<i32>,
    pub bed: Option<i32>,
}

impl TempReading {
    pub fn is_empty(&self) -> bool {
        self.nozzle.is_none() && self.bed.is_none()
    }
}

/// Parse `T:` / `B:` fields, e.g. `ok T:210.5 /210.0 B:60.2 /60.0`.
pub fn parse_temperatures(line: &str) -> Option<TempReading> {
    let field = |tag: &str| line.find(tag).and_then(|i| atoi(&line[i + tag.len()..]));
    let reading = TempReading {
        nozzle: field("T:"),
        bed: field("B:"),
    };
    (!reading.is_empty()).then_some(reading)
}

/// `true` for an acknowledgment line (`ok`, optionally followed by fields).
pub fn is_ack(line: &str) -> bool {
    let line = line.trim_start();
    line.strip_prefix("ok")
        .is_some_and(|rest| rest.is_empty() || rest.starts_with(|c: char| c.is_ascii_whitespace()))
}
