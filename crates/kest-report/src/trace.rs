//! Stack trace rendering.
//!
//! A raw stack string is parsed into frames, the first frame pointing at
//! user code is selected, and (when its file is readable) a few lines of
//! source context are rendered above the frame list. Unreadable files and
//! unparseable stacks degrade to frame-only or empty output; rendering
//! never fails.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

/// Lines of source context rendered above the caret, frame line included.
const CONTEXT_LINES: usize = 6;

/// Workspace-relative prefix of the engine's own source tree. Frames under
/// it are never "user" frames. Deliberately scoped to `src/` so the
/// engine's own `tests/` directory still counts as user code.
const ENGINE_SOURCE_PREFIX: &str = "crates/kest/src";

// ============================================================================
// Frames
// ============================================================================

/// One parsed stack frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame {
    pub func: Option<String>,
    pub file: String,
    pub line: u32,
    pub col: u32,
}

impl StackFrame {
    /// Renders the frame as `at [func ]file:line:col`.
    fn render(&self) -> String {
        match &self.func {
            Some(func) => format!("at {func} {}:{}:{}", self.file, self.line, self.col),
            None => format!("at {}:{}:{}", self.file, self.line, self.col),
        }
    }
}

fn frame_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Three accepted forms:
    //   at func (file:line:col)
    //   at (file:line:col)
    //   at file:line:col
    RE.get_or_init(|| {
        Regex::new(
            r"^\s*at\s+(?:async\s+)?(?:(?P<func>[^()]+?)\s+)?\((?P<pfile>[^()]+):(?P<pline>\d+):(?P<pcol>\d+)\)\s*$|^\s*at\s+(?:async\s+)?(?P<file>[^()\s]+):(?P<line>\d+):(?P<col>\d+)\s*$",
        )
        .expect("frame regex is valid")
    })
}

/// Parses every recognizable frame out of a raw stack string. Lines that
/// match none of the frame forms (code snippets, carets, diff output,
/// blanks) are skipped.
pub fn parse_frames(stack: &str) -> Vec<StackFrame> {
    let re = frame_regex();
    stack
        .lines()
        .filter_map(|line| {
            let caps = re.captures(line)?;
            if let Some(file) = caps.name("pfile") {
                Some(StackFrame {
                    func: caps.name("func").map(|m| m.as_str().to_string()),
                    file: file.as_str().to_string(),
                    line: caps.name("pline")?.as_str().parse().ok()?,
                    col: caps.name("pcol")?.as_str().parse().ok()?,
                })
            } else {
                Some(StackFrame {
                    func: None,
                    file: caps.name("file")?.as_str().to_string(),
                    line: caps.name("line")?.as_str().parse().ok()?,
                    col: caps.name("col")?.as_str().parse().ok()?,
                })
            }
        })
        .collect()
}

// ============================================================================
// User frame selection
// ============================================================================

/// Whether a frame points at user code rather than runtime internals or the
/// engine itself.
fn is_user_frame(frame: &StackFrame, workspace_root: Option<&Path>) -> bool {
    let file = frame.file.as_str();
    if file == "unknown" || file.starts_with('<') || file.starts_with("native:") {
        return false;
    }
    if file.contains("/node_modules/") {
        return false;
    }
    if let Some(root) = workspace_root {
        let relative = Path::new(file)
            .strip_prefix(root)
            .map_or_else(|_| PathBuf::from(file), Path::to_path_buf);
        if relative.starts_with(ENGINE_SOURCE_PREFIX) {
            return false;
        }
    }
    true
}

/// Picks the first frame pointing at user code.
pub fn select_user_frame<'a>(
    frames: &'a [StackFrame],
    workspace_root: Option<&Path>,
) -> Option<&'a StackFrame> {
    frames.iter().find(|f| is_user_frame(f, workspace_root))
}

// ============================================================================
// Workspace root
// ============================================================================

/// Finds the workspace root once per process: the nearest ancestor with a
/// `kest.toml`, else the outermost ancestor with a `Cargo.toml`, else the
/// working directory itself.
pub fn workspace_root() -> &'static Path {
    static ROOT: OnceLock<PathBuf> = OnceLock::new();
    ROOT.get_or_init(|| {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        discover_workspace_root(&cwd)
    })
}

fn discover_workspace_root(start: &Path) -> PathBuf {
    for dir in start.ancestors() {
        if dir.join("kest.toml").is_file() {
            return dir.to_path_buf();
        }
    }
    let mut outermost = None;
    for dir in start.ancestors() {
        if dir.join("Cargo.toml").is_file() {
            outermost = Some(dir.to_path_buf());
        }
    }
    outermost.unwrap_or_else(|| start.to_path_buf())
}

// ============================================================================
// Rendering
// ============================================================================

/// Renders a raw stack: optional source context for the first user frame,
/// then one line per parsed frame.
pub fn render_trace(stack: &str) -> String {
    render_trace_with_root(stack, Some(workspace_root()))
}

/// As [`render_trace`], with an explicit (or absent) workspace root.
pub fn render_trace_with_root(stack: &str, workspace_root: Option<&Path>) -> String {
    let frames = parse_frames(stack);
    let mut out = String::new();

    if let Some(frame) = select_user_frame(&frames, workspace_root) {
        if let Some(context) = render_context(frame, workspace_root) {
            out.push_str(&context);
            out.push('\n');
        }
    }

    for frame in &frames {
        out.push_str(&frame.render());
        out.push('\n');
    }
    out.truncate(out.trim_end().len());
    out
}

/// Up to [`CONTEXT_LINES`] source lines ending at the frame line, with a
/// line-number gutter and a caret under the target column.
fn render_context(frame: &StackFrame, workspace_root: Option<&Path>) -> Option<String> {
    let path = Path::new(&frame.file);
    let resolved = if path.is_absolute() {
        path.to_path_buf()
    } else {
        workspace_root?.join(path)
    };
    let source = fs::read_to_string(resolved).ok()?;

    let target = frame.line as usize;
    if target == 0 {
        return None;
    }
    let lines: Vec<&str> = source.lines().collect();
    if target > lines.len() {
        return None;
    }
    let first = target.saturating_sub(CONTEXT_LINES - 1).max(1);
    let gutter = target.to_string().len();

    let mut out = String::new();
    for num in first..=target {
        out.push_str(&format!("{num:>gutter$} | {}\n", lines[num - 1]));
    }
    let caret_col = (frame.col as usize).saturating_sub(1);
    out.push_str(&format!(
        "{:>gutter$} | {}^",
        "",
        " ".repeat(caret_col)
    ));
    Some(out)
}
