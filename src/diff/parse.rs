//! Unified diff parsing and line bounding - pure functions
//!
//! No I/O happens here; the effectful side feeds `git diff` output in line
//! by line, so the parser and the truncation policy can be unit tested on
//! literal strings.

use super::{ChangeKind, DiffFile, DiffHunk, DiffLine, DiffResult, LineKind};
use regex::Regex;
use std::sync::LazyLock;

static HUNK_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@(.*)$").expect("valid hunk regex")
});

/// Hunk currently being read, with the body lines still expected
struct OpenHunk {
    hunk: DiffHunk,
    old_remaining: u32,
    new_remaining: u32,
    old_line: u32,
    new_line: u32,
}

impl OpenHunk {
    fn from_header(line: &str, caps: &regex::Captures<'_>) -> Self {
        let num = |i: usize, default: u32| {
            caps.get(i)
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(default)
        };
        let (old_start, old_lines) = (num(1, 0), num(2, 1));
        let (new_start, new_lines) = (num(3, 0), num(4, 1));
        Self {
            hunk: DiffHunk {
                header: line.to_string(),
                old_start,
                old_lines,
                new_start,
                new_lines,
                lines: Vec::new(),
            },
            old_remaining: old_lines,
            new_remaining: new_lines,
            old_line: old_start,
            new_line: new_start,
        }
    }

    const fn is_done(&self) -> bool {
        self.old_remaining == 0 && self.new_remaining == 0
    }
}

/// What a line means to the hunk being read
enum HunkInput {
    Line(DiffLine),
    /// "\ No newline at end of file"
    Marker,
    Outside,
}

/// Incremental `git diff` parser fed one line at a time
///
/// With a line budget the parser stops keeping hunk bodies at the first
/// hunk that would push the stored total past it. That file is marked
/// incomplete, its remaining lines are still counted, and the next file
/// header ends the parse: [`DiffParser::push_line`] returns `false` and the
/// caller can stop producing input. Everything dropped here is what
/// [`bound_diff`] would drop for path-ordered input.
#[derive(Default)]
pub struct DiffParser {
    files: Vec<DiffFile>,
    current: Option<DiffFile>,
    open: Option<OpenHunk>,
    max_lines: usize,
    stored_lines: usize,
    saturated: bool,
}

impl DiffParser {
    /// Parser keeping at most `max_lines` hunk body lines (0 = unbounded)
    pub fn new(max_lines: usize) -> Self {
        Self {
            max_lines,
            ..Self::default()
        }
    }

    /// Feed one line; `false` once further input cannot change the result
    pub fn push_line(&mut self, raw: &str) -> bool {
        let line = raw.strip_suffix('\r').unwrap_or(raw);

        if let Some(open) = self.open.as_mut() {
            match read_hunk_line(open, line) {
                HunkInput::Line(diff_line) => {
                    let done = open.is_done();
                    self.accept(diff_line);
                    if done {
                        self.close_hunk();
                    }
                    return true;
                }
                HunkInput::Marker => return true,
                HunkInput::Outside => self.close_hunk(),
            }
        }

        if let Some(rest) = line.strip_prefix("diff --git ") {
            if self.saturated {
                return false;
            }
            self.files.extend(self.current.take());
            self.current = Some(DiffFile::new(header_path(rest)));
            return true;
        }

        let Some(file) = self.current.as_mut() else {
            return true;
        };

        if line.starts_with("new file mode") {
            file.kind = ChangeKind::Added;
        } else if line.starts_with("deleted file mode") {
            file.kind = ChangeKind::Deleted;
        } else if line.starts_with("Binary files ") || line == "GIT binary patch" {
            file.is_binary = true;
        } else if let Some(name) = line.strip_prefix("+++ ") {
            if let Some(path) = side_path(name, "b/") {
                file.path = path;
            }
        } else if let Some(name) = line.strip_prefix("--- ") {
            if let Some(path) = side_path(name, "a/") {
                file.path = path;
            }
        } else if let Some(caps) = HUNK_HEADER.captures(line) {
            let open = OpenHunk::from_header(line, &caps);
            let empty = open.is_done();
            self.open = Some(open);
            if empty {
                self.close_hunk();
            }
        }
        true
    }

    /// Whether the line budget has been exceeded
    pub const fn is_saturated(&self) -> bool {
        self.saturated
    }

    /// Files in input order
    pub fn finish(mut self) -> Vec<DiffFile> {
        self.close_hunk();
        self.files.extend(self.current.take());
        self.files
    }

    fn accept(&mut self, line: DiffLine) {
        let (Some(file), Some(open)) = (self.current.as_mut(), self.open.as_mut()) else {
            return;
        };
        match line.kind {
            LineKind::Added => file.additions += 1,
            LineKind::Removed => file.deletions += 1,
            LineKind::Context => {}
        }
        if self.saturated {
            return;
        }
        self.stored_lines += 1;
        if self.max_lines > 0 && self.stored_lines > self.max_lines {
            self.saturated = true;
            file.is_incomplete = true;
            return;
        }
        open.hunk.lines.push(line);
    }

    fn close_hunk(&mut self) {
        let (Some(done), Some(file)) = (self.open.take(), self.current.as_mut()) else {
            return;
        };
        if !self.saturated {
            file.hunks.push(done.hunk);
        }
    }
}

/// Parse `git diff` output into per-file records in output order
pub fn parse_unified_diff(text: &str) -> Vec<DiffFile> {
    let mut parser = DiffParser::new(0);
    for line in text.split('\n') {
        parser.push_line(line);
    }
    parser.finish()
}

/// Classify one line against an open hunk and advance its counters
fn read_hunk_line(open: &mut OpenHunk, line: &str) -> HunkInput {
    let (kind, content) = match line.as_bytes().first() {
        Some(b' ') => (LineKind::Context, &line[1..]),
        Some(b'+') => (LineKind::Added, &line[1..]),
        Some(b'-') => (LineKind::Removed, &line[1..]),
        Some(b'\\') => return HunkInput::Marker,
        // some tools strip the trailing space of empty context lines
        None if open.old_remaining > 0 && open.new_remaining > 0 => (LineKind::Context, ""),
        _ => return HunkInput::Outside,
    };

    let (old_lineno, new_lineno) = match kind {
        LineKind::Context => {
            if open.old_remaining == 0 || open.new_remaining == 0 {
                return HunkInput::Outside;
            }
            open.old_remaining -= 1;
            open.new_remaining -= 1;
            open.old_line += 1;
            open.new_line += 1;
            (Some(open.old_line - 1), Some(open.new_line - 1))
        }
        LineKind::Added => {
            if open.new_remaining == 0 {
                return HunkInput::Outside;
            }
            open.new_remaining -= 1;
            open.new_line += 1;
            (None, Some(open.new_line - 1))
        }
        LineKind::Removed => {
            if open.old_remaining == 0 {
                return HunkInput::Outside;
            }
            open.old_remaining -= 1;
            open.old_line += 1;
            (Some(open.old_line - 1), None)
        }
    };

    HunkInput::Line(DiffLine {
        kind,
        content: content.to_string(),
        old_lineno,
        new_lineno,
    })
}

/// Path from the `a/X b/X` part of a `diff --git` header
///
/// Without rename detection both sides name the same path, so an unquoted
/// header splits evenly.
fn header_path(rest: &str) -> String {
    if rest.starts_with('"') {
        if let Some((quoted, _)) = take_quoted(rest) {
            return quoted.strip_prefix("a/").unwrap_or(&quoted).to_string();
        }
    }
    let len = rest.len();
    if len >= 5 && (len - 5) % 2 == 0 {
        let path_len = (len - 5) / 2;
        if rest.is_char_boundary(2) && rest.is_char_boundary(2 + path_len) {
            return rest[2..2 + path_len].to_string();
        }
    }
    rest.strip_prefix("a/").unwrap_or(rest).to_string()
}

/// Path from a `---` / `+++` line, `None` for `/dev/null`
fn side_path(name: &str, prefix: &str) -> Option<String> {
    let name = name.strip_suffix('\t').unwrap_or(name);
    if name == "/dev/null" {
        return None;
    }
    let unquoted = if name.starts_with('"') {
        take_quoted(name).map_or_else(|| name.to_string(), |(s, _)| s)
    } else {
        name.to_string()
    };
    Some(
        unquoted
            .strip_prefix(prefix)
            .map_or_else(|| unquoted.clone(), str::to_string),
    )
}

/// Decode a C-style quoted string at the start of `s`
///
/// Returns the decoded string and the remainder after the closing quote.
fn take_quoted(s: &str) -> Option<(String, &str)> {
    let body = s.strip_prefix('"')?;
    let mut bytes = Vec::new();
    let mut iter = body.char_indices();
    while let Some((i, c)) = iter.next() {
        match c {
            '"' => {
                let decoded = String::from_utf8_lossy(&bytes).into_owned();
                return Some((decoded, &body[i + 1..]));
            }
            '\\' => {
                let (_, esc) = iter.next()?;
                match esc {
                    'n' => bytes.push(b'\n'),
                    't' => bytes.push(b'\t'),
                    '"' => bytes.push(b'"'),
                    '\\' => bytes.push(b'\\'),
                    '0'..='7' => {
                        let mut value = esc.to_digit(8)?;
                        for _ in 0..2 {
                            let (_, d) = iter.next()?;
                            value = value * 8 + d.to_digit(8)?;
                        }
                        bytes.push(u8::try_from(value).ok()?);
                    }
                    other => {
                        let mut buf = [0u8; 4];
                        bytes.extend_from_slice(other.encode_utf8(&mut buf).as_bytes());
                    }
                }
            }
            other => {
                let mut buf = [0u8; 4];
                bytes.extend_from_slice(other.encode_utf8(&mut buf).as_bytes());
            }
        }
    }
    None
}

/// Order files by path and apply the line budget
///
/// Hunks are never split. Hunks are emitted in order while the running line
/// total stays within `max_lines`; the first hunk that would exceed it stops
/// emission, marks its file incomplete (the file is kept even with no
/// emitted hunks) and drops every later file. A file that [`DiffParser`]
/// already marked incomplete ends the result the same way. `max_lines == 0`
/// disables the bound.
pub fn bound_diff(mut files: Vec<DiffFile>, max_lines: usize) -> DiffResult {
    files.sort_by(|a, b| a.path.cmp(&b.path));

    let mut result = DiffResult::default();
    for mut file in files {
        let hunks = std::mem::take(&mut file.hunks);
        for hunk in hunks {
            let n = hunk.lines.len();
            if max_lines > 0 && result.emitted_lines + n > max_lines {
                file.is_incomplete = true;
                break;
            }
            result.emitted_lines += n;
            file.hunks.push(hunk);
        }
        if file.is_incomplete {
            result.truncated = true;
            result.push_file(file);
            break;
        }
        result.push_file(file);
    }
    result
}
