use anyhow::{Context, Result, anyhow, bail};
use colored::{ColoredString, Colorize};
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

/// shared body of the output macros: format, colour, write, ignore io errors
#[doc(hidden)]
#[macro_export]
macro_rules! __emit {
    ($stream:ident, $colour:ident, $($arg:tt)*) => {{
        use colored::Colorize;
        use std::io::{self, Write};
        let _ = writeln!(io::$stream(), "{}", format!($($arg)*).$colour());
    }};
}

#[macro_export]
macro_rules! warning {
    ($fmt:literal $(, $($arg:tt)*)?) => { $crate::__emit!(stderr, yellow, $fmt $(, $($arg)*)?) };
    ($expr:expr) => { $crate::__emit!(stderr, yellow, "{}", $expr) };
}

#[macro_export]
macro_rules! error {
    ($fmt:literal $(, $($arg:tt)*)?) => { $crate::__emit!(stderr, red, $fmt $(, $($arg)*)?) };
    ($expr:expr) => { $crate::__emit!(stderr, red, "{}", $expr) };
}

#[macro_export]
macro_rules! status {
    ($fmt:literal $(, $($arg:tt)*)?) => { $crate::__emit!(stdout, green, $fmt $(, $($arg)*)?) };
    ($expr:expr) => { $crate::__emit!(stdout, green, "{}", $expr) };
}

#[macro_export]
macro_rules! info {
    () => {{
        use std::io::{self, Write};
        let _ = writeln!(io::stdout());
    }};
    ($fmt:literal $(, $($arg:tt)*)?) => {{
        use std::io::{self, Write};
        let _ = writeln!(io::stdout(), $fmt $(, $($arg)*)?);
    }};
    ($expr:expr) => {{
        use std::io::{self, Write};
        let _ = writeln!(io::stdout(), "{}", $expr);
    }};
}

/// command tracing, shown when `AI_COMMIT_DEBUG` is set
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {
        if $crate::ui::debug_enabled() {
            $crate::__emit!(stderr, dimmed, $($arg)*)
        }
    };
}

pub fn debug_enabled() -> bool {
    static ENABLED: OnceLock<bool> = OnceLock::new();
    *ENABLED.get_or_init(|| std::env::var_os("AI_COMMIT_DEBUG").is_some_and(|v| !v.is_empty()))
}

static DARK_MODE: AtomicBool = AtomicBool::new(false);

pub fn set_dark_mode(enabled: bool) {
    DARK_MODE.store(enabled, Ordering::Relaxed);
}

/// styling for secondary text (paths, hints); dimmed text is unreadable on
/// most dark themes so those get plain white
pub fn secondary(text: &str) -> ColoredString {
    if DARK_MODE.load(Ordering::Relaxed) {
        text.white()
    } else {
        text.dimmed()
    }
}

/// single-key choice, e.g. `[Y]ES/[n]o/[e]dit`; enter picks the first option
///
/// returns the lowercased first character of the chosen option. esc and
/// ctrl-c abort with an error.
pub fn prompt(options: &[&str]) -> Result<char> {
    use crossterm::{
        event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
        terminal::{disable_raw_mode, enable_raw_mode},
    };
    use std::io::{self, Write};

    debug_assert!(!options.is_empty(), "prompt requires at least one option");

    let keys: Vec<char> = options
        .iter()
        .map(|opt| first_char(opt).to_ascii_lowercase())
        .collect();
    let labels: Vec<String> = options
        .iter()
        .map(|opt| {
            let first = first_char(opt);
            format!("[{first}]{}", &opt[first.len_utf8()..])
        })
        .collect();

    print!("{} ? ", labels.join("/"));
    let _ = io::stdout().flush();

    enable_raw_mode().context("this command requires an interactive terminal")?;
    let chosen = loop {
        let Ok(Event::Key(KeyEvent {
            code, modifiers, ..
        })) = event::read()
        else {
            continue;
        };
        match code {
            KeyCode::Esc => break None,
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => break None,
            KeyCode::Enter => break Some(0),
            KeyCode::Char(c) => {
                let lower = c.to_ascii_lowercase();
                if let Some(idx) = keys.iter().position(|&k| k == lower) {
                    break Some(idx);
                }
            }
            _ => {}
        }
    };
    disable_raw_mode().ok();

    match chosen {
        Some(idx) => {
            info!(options[idx]);
            Ok(keys[idx])
        }
        None => {
            info!("^C");
            Err(anyhow!("aborted"))
        }
    }
}

fn first_char(option: &str) -> char {
    option.chars().next().unwrap_or('?')
}

/// read a line of input with the given prompt; ctrl-c/ctrl-d abort
pub fn read_line(prompt: &str) -> Result<String> {
    edit_line(prompt, "")
}

/// edit `line` in place
pub fn edit_one_line(line: &str) -> Result<String> {
    edit_line("? ", line)
}

fn edit_line(prompt: &str, initial: &str) -> Result<String> {
    use rustyline::DefaultEditor;

    let mut editor = DefaultEditor::new().context("failed to initialise line editor")?;
    match editor.readline_with_initial(prompt, (initial, "")) {
        Ok(edited) => Ok(edited.trim().to_string()),
        Err(_) => {
            info!("^C");
            Err(anyhow!("aborted"))
        }
    }
}

/// edit `text` in `$EDITOR`; an empty result aborts
pub fn edit_multi_line(text: &str) -> Result<String> {
    use std::fs;
    use std::io::Write;
    use std::process::Command;
    use tempfile::Builder;

    let editor = std::env::var("EDITOR").context("EDITOR not set")?;

    let mut temp_file = Builder::new()
        .prefix("COMMIT_EDITMSG")
        .suffix(".txt")
        .tempfile()
        .context("failed to create temporary file")?;
    temp_file
        .write_all(text.as_bytes())
        .and_then(|()| temp_file.flush())
        .context("failed to write to temporary file")?;
    let temp_path = temp_file.path().to_owned();

    // run via the shell so arguments inside EDITOR ("code --wait") work
    let quoted = shlex::try_quote(&temp_path.to_string_lossy())
        .map_err(|e| anyhow!("failed to quote editor path: {e}"))?
        .into_owned();
    let status = Command::new("sh")
        .arg("-c")
        .arg(format!("{editor} {quoted}"))
        .status()
        .with_context(|| format!("failed to run editor: {editor}"))?;
    if !status.success() {
        bail!("editor exited with {}", status);
    }

    let edited = fs::read_to_string(&temp_path)
        .context("failed to read edited message")?
        .trim()
        .to_string();
    if edited.is_empty() {
        bail!("empty commit message");
    }
    Ok(edited)
}

/// parse a selection like `1,3,5-7` (1-based) into 0-based indices
///
/// numbers beyond the list are kept; whoever consumes the indices decides what
/// an out-of-range entry means
pub fn parse_selection(input: &str) -> Result<Vec<usize>> {
    let mut indices = Vec::new();
    for token in input.split([',', ' ']).map(str::trim).filter(|t| !t.is_empty()) {
        let (start, end) = match token.split_once('-') {
            Some((a, b)) => (parse_number(a)?, parse_number(b)?),
            None => {
                let n = parse_number(token)?;
                (n, n)
            }
        };
        if end < start {
            bail!("invalid range '{}'", token);
        }
        indices.extend((start..=end).map(|n| n - 1));
    }
    if indices.is_empty() {
        bail!("nothing selected");
    }
    Ok(indices)
}

fn parse_number(token: &str) -> Result<usize> {
    match token.trim().parse::<usize>() {
        Ok(0) => bail!("selection numbers start at 1"),
        Ok(n) => Ok(n),
        Err(_) => bail!("'{}' is not a number", token.trim()),
    }
}
