//! Enrichment of raw Lua diagnostics into source-annotated, actionable
//! error messages.
//!
//! A raw diagnostic (load error, runtime error, or a runtime-synthesized
//! contract violation) is parsed for a line/column location, the surrounding
//! source lines are spliced into a `[CODE]…[/CODE]` block with the faulting
//! line marked, the message is classified against an ordered pattern table,
//! and a `[TIP]` paragraph keyed to the classification is appended.
//!
//! The `[CODE]` / `[/CODE]` / `[TIP]` markers and the pattern order are part
//! of the observable contract; downstream renderers parse them.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use regex::Regex;
use std::fmt::Write as _;
use std::sync::LazyLock;

/// Wrapper prefixes attached by the orchestrator before enrichment.
const KNOWN_PREFIXES: &[&str] = &[
    "failed to execute handler: ",
    "failed to load Lua code: ",
    "runtime error: ",
    "syntax error: ",
];

/// `<string>:4:` and mlua's `[string "chunk"]:4:` chunk forms.
static LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:<string>|\[string "[^"]*"\]):(\d+):"#).expect("line regex")
});

/// Parse-error grammar: `<string> line:4(column:12)`.
static LINE_COLUMN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"line:(\d+)\(column:(\d+)\)").expect("line/column regex"));

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Known failure shapes, in match order. First match wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// Indexing into a nil value.
    NilIndex,
    /// Indexing into a non-table value.
    NonTableIndex,
    /// Calling a nil value.
    NilCall,
    /// A builtin rejected an argument type.
    BadArgument,
    /// The source failed to parse.
    SyntaxError,
    /// A block is missing its closing `end`.
    MissingEnd,
    /// Arithmetic on a non-number.
    Arithmetic,
    /// Concatenation of an incompatible value.
    Concat,
    /// Comparison of incompatible values.
    Compare,
    /// No global `handler` function after load.
    NoHandler,
    /// The handler returned a non-table value.
    BadReturn,
    /// No known shape matched.
    Unknown,
}

/// Ordered pattern table; the order is contractual.
static PATTERNS: LazyLock<Vec<(Regex, DiagnosticKind)>> = LazyLock::new(|| {
    let table: &[(&str, DiagnosticKind)] = &[
        (r"attempt to index.*nil", DiagnosticKind::NilIndex),
        (r"attempt to index a non-table", DiagnosticKind::NonTableIndex),
        (r"attempt to call.*nil", DiagnosticKind::NilCall),
        (r"bad argument.*expected.*got", DiagnosticKind::BadArgument),
        (r"unexpected symbol|syntax error", DiagnosticKind::SyntaxError),
        (r"'end' expected", DiagnosticKind::MissingEnd),
        (r"attempt to perform arithmetic", DiagnosticKind::Arithmetic),
        (r"attempt to concatenate", DiagnosticKind::Concat),
        (r"attempt to compare", DiagnosticKind::Compare),
        (r"handler function not found", DiagnosticKind::NoHandler),
        (r"handler did not return a table", DiagnosticKind::BadReturn),
    ];
    table
        .iter()
        .map(|(pattern, kind)| (Regex::new(pattern).expect("diagnostic pattern"), *kind))
        .collect()
});

impl DiagnosticKind {
    /// Classify a stripped diagnostic message.
    pub fn classify(message: &str) -> Self {
        for (pattern, kind) in PATTERNS.iter() {
            if pattern.is_match(message) {
                return *kind;
            }
        }
        Self::Unknown
    }

    /// Advice paragraph for this shape, or `None` for [`Self::Unknown`].
    pub fn tip(&self) -> Option<&'static str> {
        match self {
            Self::NilIndex => Some(
                "A nil value was indexed with a key. Make sure the table is created before \
                 you read or write its fields, and guard optional values with `if value ~= nil then ... end`. \
                 Functions that can fail, like json.decode and http.get, return nil plus an error \
                 as their second value; check the error before using the result.",
            ),
            Self::NonTableIndex => Some(
                "Only tables can be indexed with keys. The value here is a string, number, or \
                 boolean; check what the expression evaluates to, or convert it with json.decode \
                 if it is a JSON string.",
            ),
            Self::NilCall => Some(
                "A nil value was called like a function. Check the spelling of the function \
                 name and make sure it is defined before the call. Capability modules are \
                 lower-case globals: log, kv, env, http, ai, email, json, base64, crypto, time, \
                 url, strings, random, router.",
            ),
            Self::BadArgument => Some(
                "A builtin received an argument of the wrong type. Compare the expected type \
                 in the message with the value you passed; tostring() and tonumber() convert \
                 between strings and numbers.",
            ),
            Self::SyntaxError => Some(
                "The source could not be parsed at this point. Look for an unbalanced \
                 parenthesis or brace, a missing `then` after `if`, a missing `do` after \
                 `for`/`while`, or a stray character just before the reported location.",
            ),
            Self::MissingEnd => Some(
                "A block was opened but never closed. Every `function`, `if`, `for`, and \
                 `while` needs a matching `end`; indent blocks consistently to spot the one \
                 that is missing.",
            ),
            Self::Arithmetic => Some(
                "Arithmetic was attempted on a value that is not a number. Use tonumber() to \
                 convert strings first, and remember that absent table fields are nil.",
            ),
            Self::Concat => Some(
                "Only strings and numbers can be concatenated with `..`. Wrap other values in \
                 tostring(), or build tables into text with json.encode.",
            ),
            Self::Compare => Some(
                "The two sides of this comparison have incompatible types. Convert one side \
                 first, for example `tonumber(value) > 10` instead of `value > 10` when value \
                 is a string.",
            ),
            Self::NoHandler => Some(
                "Every function must define a global function named `handler` taking \
                 `(ctx, event)` and returning a response table. Define it at the top level of \
                 the script: `function handler(ctx, event) return {statusCode = 200, body = \"ok\"} end`. \
                 A local function or a differently named one is not visible to the runtime.",
            ),
            Self::BadReturn => Some(
                "The handler must return a table describing the HTTP response, for example \
                 `return {statusCode = 200, body = \"ok\"}`. Returning a string, number, or \
                 nothing at all cannot be converted into a response.",
            ),
            Self::Unknown => None,
        }
    }

    /// Stable snake_case name, for logs and tests.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NilIndex => "nil_index",
            Self::NonTableIndex => "non_table_index",
            Self::NilCall => "nil_call",
            Self::BadArgument => "bad_argument",
            Self::SyntaxError => "syntax_error",
            Self::MissingEnd => "missing_end",
            Self::Arithmetic => "arithmetic_error",
            Self::Concat => "concat_error",
            Self::Compare => "compare_error",
            Self::NoHandler => "no_handler",
            Self::BadReturn => "bad_return",
            Self::Unknown => "unknown",
        }
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// A raw diagnostic reduced to message, location, and classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Message with wrapper prefixes, location token, and traceback removed.
    pub message: String,
    /// 1-based source line, when the diagnostic carried one.
    pub line: Option<usize>,
    /// 1-based column, only present in the parse-error grammar.
    pub column: Option<usize>,
    /// Matched failure shape.
    pub kind: DiagnosticKind,
}

/// Parse a raw interpreter diagnostic.
pub fn parse(raw: &str) -> Diagnostic {
    // Tracebacks are noise for end users; the first line carries the fault.
    let mut message = match raw.find("\nstack traceback") {
        Some(at) => &raw[..at],
        None => raw,
    }
    .to_string();

    // Wrapper prefixes can stack (orchestrator prefix over interpreter
    // prefix), so strip until none applies.
    loop {
        let mut stripped = false;
        for prefix in KNOWN_PREFIXES {
            if let Some(rest) = message.strip_prefix(prefix) {
                message = rest.to_string();
                stripped = true;
            }
        }
        if !stripped {
            break;
        }
    }

    let mut line = None;
    let mut column = None;
    let mut location_span = None;
    if let Some(caps) = LINE_COLUMN_RE.captures(&message) {
        line = caps[1].parse().ok();
        column = caps[2].parse().ok();
        location_span = caps.get(0).map(|m| m.range());
    } else if let Some(caps) = LINE_RE.captures(&message) {
        line = caps[1].parse().ok();
        location_span = caps.get(0).map(|m| m.range());
    }
    if let Some(span) = location_span {
        message.replace_range(span, "");
    }
    // The chunk name may survive in front of a removed line:column token.
    let message = message
        .trim()
        .trim_start_matches("<string>")
        .trim()
        .to_string();

    let kind = DiagnosticKind::classify(&message);
    Diagnostic { message, line, column, kind }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Render ±2 source lines around `line`, the faulting line marked with `> `
/// and an optional caret row under the faulting column.
fn code_frame(source: &str, line: usize, column: Option<usize>) -> Option<String> {
    let lines: Vec<&str> = source.lines().collect();
    if line == 0 || line > lines.len() {
        return None;
    }
    let first = line.saturating_sub(2).max(1);
    let last = (line + 2).min(lines.len());

    let mut out = String::new();
    for number in first..=last {
        let text = lines[number - 1];
        if number == line {
            let _ = writeln!(out, "> {number:3} | {text}");
            if let Some(column) = column {
                // "> " + 3-digit gutter + " | " puts column 1 at offset 8.
                let _ = writeln!(out, "{}^", " ".repeat(2 + 3 + 3 + column - 1));
            }
        } else {
            let _ = writeln!(out, "  {number:3} | {text}");
        }
    }
    // Drop the trailing newline so callers control spacing.
    out.truncate(out.trim_end_matches('\n').len());
    Some(out)
}

/// Enrich a raw diagnostic against the source it came from.
///
/// Output sections: a header (`Error at line N: …` when a line is known,
/// `Error: …` otherwise), a `[CODE]…[/CODE]` block when source context could
/// be produced, and a `[TIP]` paragraph for recognized failure shapes.
pub fn enrich(raw: &str, source: &str) -> String {
    let diagnostic = parse(raw);

    let mut out = match diagnostic.line {
        Some(line) => format!("Error at line {line}: {}", diagnostic.message),
        None => format!("Error: {}", diagnostic.message),
    };

    if let Some(frame) = diagnostic
        .line
        .and_then(|line| code_frame(source, line, diagnostic.column))
    {
        let _ = write!(out, "\n\n[CODE]\n{frame}\n[/CODE]");
    }

    if let Some(tip) = diagnostic.kind.tip() {
        let _ = write!(out, "\n\n[TIP] {tip}");
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "function handler(ctx, event)\n  local data = nil\n  local out = {}\n  out.statusCode = data.statusCode\n  return out\nend\n";

    // -- Parsing ---------------------------------------------------------

    #[test]
    fn parses_runtime_grammar() {
        let d = parse("<string>:4: attempt to index a non-table object(nil) with key 'statusCode'");
        assert_eq!(d.line, Some(4));
        assert_eq!(d.column, None);
        assert_eq!(d.kind, DiagnosticKind::NilIndex);
        assert!(d.message.starts_with("attempt to index"));
    }

    #[test]
    fn parses_mlua_chunk_grammar() {
        let d = parse(r#"runtime error: [string "handler"]:2: attempt to call a nil value (global 'oops')"#);
        assert_eq!(d.line, Some(2));
        assert_eq!(d.kind, DiagnosticKind::NilCall);
    }

    #[test]
    fn parses_parse_error_grammar_with_column() {
        let d = parse("<string> line:3(column:7) near 'then'");
        assert_eq!(d.line, Some(3));
        assert_eq!(d.column, Some(7));
    }

    #[test]
    fn strips_stacked_prefixes() {
        let d = parse("failed to execute handler: runtime error: <string>:4: attempt to index a nil value");
        assert_eq!(d.line, Some(4));
        assert_eq!(d.message, "attempt to index a nil value");
    }

    #[test]
    fn strips_traceback() {
        let d = parse("<string>:1: boom\nstack traceback:\n\t[C]: in ?");
        assert_eq!(d.message, "boom");
        assert_eq!(d.line, Some(1));
    }

    #[test]
    fn no_location_leaves_line_none() {
        let d = parse("handler function not found in Lua code");
        assert_eq!(d.line, None);
        assert_eq!(d.kind, DiagnosticKind::NoHandler);
    }

    // -- Classification order -------------------------------------------

    #[test]
    fn nil_index_wins_over_non_table_index() {
        // GopherLua phrases nil indexing as a non-table diagnostic; the nil
        // pattern is ordered first and must take it.
        let kind = DiagnosticKind::classify("attempt to index a non-table object(nil) with key 'x'");
        assert_eq!(kind, DiagnosticKind::NilIndex);
    }

    #[test]
    fn non_table_index_without_nil() {
        let kind = DiagnosticKind::classify("attempt to index a non-table object(string) with key 'x'");
        assert_eq!(kind, DiagnosticKind::NonTableIndex);
    }

    #[test]
    fn classifies_each_shape() {
        let cases = [
            ("attempt to call a nil value (global 'f')", DiagnosticKind::NilCall),
            ("bad argument #1 to 'sub' (string expected, got table)", DiagnosticKind::BadArgument),
            ("unexpected symbol near ')'", DiagnosticKind::SyntaxError),
            ("'end' expected (to close 'function' at line 1) near <eof>", DiagnosticKind::MissingEnd),
            ("attempt to perform arithmetic on a string value", DiagnosticKind::Arithmetic),
            ("attempt to concatenate a table value", DiagnosticKind::Concat),
            ("attempt to compare number with string", DiagnosticKind::Compare),
            ("handler function not found in Lua code", DiagnosticKind::NoHandler),
            ("handler did not return a table", DiagnosticKind::BadReturn),
            ("something entirely novel", DiagnosticKind::Unknown),
        ];
        for (message, expected) in cases {
            assert_eq!(DiagnosticKind::classify(message), expected, "for {message:?}");
        }
    }

    #[test]
    fn kind_names_are_unique() {
        let all = [
            DiagnosticKind::NilIndex,
            DiagnosticKind::NonTableIndex,
            DiagnosticKind::NilCall,
            DiagnosticKind::BadArgument,
            DiagnosticKind::SyntaxError,
            DiagnosticKind::MissingEnd,
            DiagnosticKind::Arithmetic,
            DiagnosticKind::Concat,
            DiagnosticKind::Compare,
            DiagnosticKind::NoHandler,
            DiagnosticKind::BadReturn,
            DiagnosticKind::Unknown,
        ];
        let mut seen = std::collections::HashSet::new();
        for kind in all {
            assert!(seen.insert(kind.as_str()), "duplicate name {}", kind.as_str());
        }
    }

    // -- Code frame ------------------------------------------------------

    #[test]
    fn frame_marks_faulting_line() {
        let frame = code_frame(SOURCE, 4, None).unwrap();
        assert!(frame.contains(">   4 | "));
        assert!(frame.contains("    2 | "));
        assert!(frame.contains("    6 | "));
        assert!(!frame.contains("  1 |"), "line 1 is outside the ±2 window: {frame}");
    }

    #[test]
    fn frame_clamps_at_start_of_source() {
        let frame = code_frame(SOURCE, 1, None).unwrap();
        assert!(frame.starts_with(">   1 | "));
        assert!(frame.contains("    3 | "));
    }

    #[test]
    fn frame_out_of_range_is_none() {
        assert!(code_frame(SOURCE, 0, None).is_none());
        assert!(code_frame(SOURCE, 99, None).is_none());
    }

    #[test]
    fn frame_caret_alignment() {
        let frame = code_frame("local x = 1\nlocal y =\n", 2, Some(9)).unwrap();
        let caret_row = frame.lines().find(|l| l.trim_end() == format!("{}^", " ".repeat(16))).unwrap_or("");
        // 2 (marker) + 3 (gutter) + 3 (separator) + col 9 − 1 = 16 spaces.
        assert_eq!(caret_row.len(), 17, "frame was: {frame:?}");
    }

    // -- Enrichment ------------------------------------------------------

    #[test]
    fn enrich_produces_all_sections() {
        let raw = "<string>:4: attempt to index a non-table object(nil) with key 'statusCode'";
        let out = enrich(raw, SOURCE);
        assert!(out.starts_with("Error at line 4: attempt to index"));
        assert!(out.contains("[CODE]"));
        assert!(out.contains("[/CODE]"));
        assert!(out.contains(">   4 | "));
        assert!(out.contains("out.statusCode = data.statusCode"));
        assert!(out.contains("[TIP]"));
    }

    #[test]
    fn enrich_without_location_skips_code_block() {
        let out = enrich("handler function not found in Lua code", SOURCE);
        assert!(out.starts_with("Error: handler function not found"));
        assert!(!out.contains("[CODE]"));
        assert!(out.contains("[TIP]"));
        assert!(out.contains("handler"));
    }

    #[test]
    fn enrich_unknown_has_no_tip() {
        let out = enrich("<string>:2: some novel failure", SOURCE);
        assert!(out.starts_with("Error at line 2: some novel failure"));
        assert!(out.contains("[CODE]"));
        assert!(!out.contains("[TIP]"));
    }

    #[test]
    fn enrich_line_beyond_source_skips_code_block() {
        let out = enrich("<string>:42: boom", "x = 1\n");
        assert!(out.starts_with("Error at line 42: boom"));
        assert!(!out.contains("[CODE]"));
    }

    #[test]
    fn tips_exist_for_all_known_kinds() {
        for kind in [
            DiagnosticKind::NilIndex,
            DiagnosticKind::NonTableIndex,
            DiagnosticKind::NilCall,
            DiagnosticKind::BadArgument,
            DiagnosticKind::SyntaxError,
            DiagnosticKind::MissingEnd,
            DiagnosticKind::Arithmetic,
            DiagnosticKind::Concat,
            DiagnosticKind::Compare,
            DiagnosticKind::NoHandler,
            DiagnosticKind::BadReturn,
        ] {
            assert!(kind.tip().is_some(), "{} has no tip", kind.as_str());
        }
        assert!(DiagnosticKind::Unknown.tip().is_none());
    }
}
