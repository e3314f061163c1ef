/// how a status line names its file(s)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Regular,
    Renamed,
    Copied,
}

/// one line of `git status --porcelain`
///
/// `old_filename` is set exactly when the kind is `Renamed` or `Copied`; the
/// constructors are the only way to build one so that can't drift
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    status: String,
    filename: String,
    old_filename: Option<String>,
    kind: ChangeKind,
}

const RENAME_ARROW: &str = " -> ";

impl FileChange {
    pub fn regular(status: &str, filename: &str) -> Self {
        Self {
            status: status.to_string(),
            filename: filename.to_string(),
            old_filename: None,
            kind: ChangeKind::Regular,
        }
    }

    pub fn renamed(status: &str, old_filename: &str, filename: &str) -> Self {
        Self {
            status: status.to_string(),
            filename: filename.to_string(),
            old_filename: Some(old_filename.to_string()),
            kind: ChangeKind::Renamed,
        }
    }

    pub fn copied(status: &str, old_filename: &str, filename: &str) -> Self {
        Self {
            status: status.to_string(),
            filename: filename.to_string(),
            old_filename: Some(old_filename.to_string()),
            kind: ChangeKind::Copied,
        }
    }

    /// raw two-character code, e.g. `" M"`, `"??"`, `"R "`
    pub fn status(&self) -> &str {
        &self.status
    }

    /// current (new) path, relative to the repository root
    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn old_filename(&self) -> Option<&str> {
        self.old_filename.as_deref()
    }

    pub fn kind(&self) -> ChangeKind {
        self.kind
    }

    pub fn is_deletion(&self) -> bool {
        self.status.contains('D')
    }

    pub fn is_untracked(&self) -> bool {
        self.status == "??"
    }

    /// short human label for listings
    pub fn label(&self) -> &'static str {
        match self.kind {
            ChangeKind::Renamed => "renamed",
            ChangeKind::Copied => "copied",
            ChangeKind::Regular if self.is_untracked() => "new",
            ChangeKind::Regular if self.status.contains('A') => "added",
            ChangeKind::Regular if self.is_deletion() => "deleted",
            ChangeKind::Regular if self.status.contains('U') => "conflict",
            ChangeKind::Regular if self.status.contains('M') => "modified",
            ChangeKind::Regular => "changed",
        }
    }

    /// rebuild the porcelain line this record was parsed from
    pub fn to_porcelain_line(&self) -> String {
        match &self.old_filename {
            Some(old) => format!(
                "{} {}{}{}",
                self.status,
                quote_path(old),
                RENAME_ARROW,
                quote_path(&self.filename)
            ),
            None => format!("{} {}", self.status, quote_path(&self.filename)),
        }
    }
}

/// parse `git status --porcelain` output
///
/// blank lines and lines too short to hold a code and a path are dropped; every
/// other line yields exactly one record, in input order. callers index into the
/// returned list with selection indices, so the order must never change.
pub fn parse_status(output: &str) -> Vec<FileChange> {
    output.lines().filter_map(parse_line).collect()
}

fn parse_line(line: &str) -> Option<FileChange> {
    if line.trim().is_empty() {
        return None;
    }
    let status = line.get(..2)?;
    let path = line.get(2..)?.trim();
    if path.is_empty() {
        return None;
    }

    if let Some((old, new)) = path.split_once(RENAME_ARROW) {
        let (old, new) = (unquote_path(old.trim()), unquote_path(new.trim()));
        if status.contains('R') {
            return Some(FileChange::renamed(status, &old, &new));
        }
        if status.contains('C') {
            return Some(FileChange::copied(status, &old, &new));
        }
    }

    Some(FileChange::regular(status, &unquote_path(path)))
}

/// git wraps paths containing spaces or special characters in double quotes,
/// C-style; with the default `core.quotePath` every byte outside printable
/// ascii is written as a three-digit octal escape (`caf\303\251.txt`)
fn unquote_path(path: &str) -> String {
    let Some(inner) = path.strip_prefix('"').and_then(|p| p.strip_suffix('"')) else {
        return path.to_string();
    };

    let bytes = inner.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        i += 1;
        if b != b'\\' {
            out.push(b);
            continue;
        }
        let Some(&escaped) = bytes.get(i) else {
            out.push(b'\\');
            break;
        };
        i += 1;
        match escaped {
            b'a' => out.push(0x07),
            b'b' => out.push(0x08),
            b't' => out.push(b'\t'),
            b'n' => out.push(b'\n'),
            b'v' => out.push(0x0b),
            b'f' => out.push(0x0c),
            b'r' => out.push(b'\r'),
            b'0'..=b'3' => match octal_byte(escaped, bytes.get(i..i + 2)) {
                Some(value) => {
                    out.push(value);
                    i += 2;
                }
                None => out.push(escaped),
            },
            other => out.push(other),
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// value of `\NNN` given its first digit and the two that follow
fn octal_byte(first: u8, rest: Option<&[u8]>) -> Option<u8> {
    let rest = rest?;
    let digits = [first, *rest.first()?, *rest.get(1)?];
    if !digits.iter().all(|d| (b'0'..=b'7').contains(d)) {
        return None;
    }
    Some(digits.iter().fold(0u8, |acc, d| (acc << 3) | (d - b'0')))
}

/// inverse of `unquote_path`, in git's own quoting style
fn quote_path(path: &str) -> String {
    let needs_quotes = path
        .bytes()
        .any(|b| b == b' ' || b == b'"' || b == b'\\' || !(0x20..0x7f).contains(&b));
    if !needs_quotes {
        return path.to_string();
    }

    let mut out = String::with_capacity(path.len() + 2);
    out.push('"');
    for b in path.bytes() {
        match b {
            b'"' => out.push_str("\\\""),
            b'\\' => out.push_str("\\\\"),
            0x07 => out.push_str("\\a"),
            0x08 => out.push_str("\\b"),
            b'\t' => out.push_str("\\t"),
            b'\n' => out.push_str("\\n"),
            0x0b => out.push_str("\\v"),
            0x0c => out.push_str("\\f"),
            b'\r' => out.push_str("\\r"),
            0x20..=0x7e => out.push(char::from(b)),
            _ => out.push_str(&format!("\\{b:03o}")),
        }
    }
    out.push('"');
    out
}
