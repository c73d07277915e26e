//! `Debugger.setBreakpointByUrl` regex re-anchoring.
//!
//! Debugging clients compute `urlRegex` from the local file the user set a
//! breakpoint in, so the regex matches an on-disk path like
//! `/proj/www/js/index.js`. The application, however, reports scripts under
//! its own addressing scheme (`http://<dev-server>/js/index.js`,
//! `file://<bundle>/www/js/index.js`, or a custom scheme). The fix-up decodes
//! the escaped local-path regex, locates the `/www/` fragment, and re-anchors
//! the remainder onto the root the application actually serves from.

use serde_json::Value;
use tether_cdp::ProtocolMessage;

/// Command that sets a breakpoint by URL pattern.
pub const SET_BREAKPOINT_BY_URL: &str = "Debugger.setBreakpointByUrl";

/// Rewrite the `urlRegex` of a `setBreakpointByUrl` command in place.
///
/// Regexes without a recognizable local-path fragment are left untouched.
pub fn apply_breakpoint_fix(msg: &mut ProtocolMessage, new_root: &str) {
    let Some(params) = msg.params_mut() else {
        return;
    };
    let Some(url_regex) = params.get("urlRegex").and_then(Value::as_str) else {
        return;
    };
    if let Some(fixed) = rewrite_breakpoint_regex(url_regex, new_root) {
        params["urlRegex"] = Value::String(fixed);
    }
}

/// Rewrite a breakpoint `urlRegex` so it matches URLs rooted at `new_root`.
///
/// Returns `None` when the regex carries no recognizable `/www/` fragment, in
/// which case the caller leaves the original regex untouched.
pub fn rewrite_breakpoint_regex(url_regex: &str, new_root: &str) -> Option<String> {
    let decoded = decode_escaped_regex(url_regex).replace('\\', "/");
    let pos = decoded.find("/www/")?;
    let tail = &decoded[pos + "/www/".len()..];
    if tail.is_empty() {
        return None;
    }
    Some(format!(
        "{}/{}",
        regex::escape(new_root),
        regex::escape(tail)
    ))
}

/// Decode an escaped `urlRegex` back to the literal path it was built from.
///
/// Clients escape metacharacters (`\.`, `\/`) and may emit case-insensitive
/// character classes (`[fF]`) for drive letters and schemes; both collapse to
/// their literal character here. Character classes that are not a simple
/// case pair are kept verbatim.
fn decode_escaped_regex(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            '[' => {
                let mut class = String::new();
                let mut closed = false;
                while let Some(&next) = chars.peek() {
                    let _ = chars.next();
                    if next == ']' {
                        closed = true;
                        break;
                    }
                    class.push(next);
                }
                let mut pair = class.chars();
                match (pair.next(), pair.next(), pair.next(), closed) {
                    (Some(a), Some(b), None, true) if a.eq_ignore_ascii_case(&b) => {
                        out.push(a.to_ascii_lowercase());
                    }
                    _ => {
                        out.push('[');
                        out.push_str(&class);
                        if closed {
                            out.push(']');
                        }
                    }
                }
            }
            _ => out.push(c),
        }
    }
    out
}
