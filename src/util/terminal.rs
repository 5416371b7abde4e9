use std::borrow::Cow;

const ESC: char = '\u{1b}';
const BEL: char = '\u{07}';

/// Removes terminal control characters and escape sequences from text.
///
/// Feed titles and descriptions are attacker-controlled; printed verbatim they
/// could move the cursor, retitle the terminal or hide output. Stripped:
///
/// - C0 controls except tab, newline and carriage return, plus DEL
/// - CSI sequences (`ESC [` ... final byte `@`..`~`)
/// - OSC sequences (`ESC ]` ... `BEL` or `ESC \`)
/// - any other `ESC` together with the character following it
///
/// Returns `Cow::Borrowed` when nothing needs stripping.
///
/// # Examples
///
/// ```
/// use rssreader::util::strip_control_chars;
///
/// assert_eq!(strip_control_chars("plain"), "plain");
/// assert_eq!(strip_control_chars("\u{1b}[31mred\u{1b}[0m"), "red");
/// assert_eq!(strip_control_chars("a\tb\nc"), "a\tb\nc");
/// ```
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    if !s.chars().any(is_stripped) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != ESC {
            if !is_stripped(c) {
                out.push(c);
            }
            continue;
        }

        match chars.next() {
            Some('[') => {
                // Parameter and intermediate bytes up to and including the final byte
                for c in chars.by_ref() {
                    if ('@'..='~').contains(&c) {
                        break;
                    }
                }
            }
            Some(']') => {
                while let Some(c) = chars.next() {
                    if c == BEL {
                        break;
                    }
                    if c == ESC && chars.peek() == Some(&'\\') {
                        chars.next();
                        break;
                    }
                }
            }
            _ => {}
        }
    }

    Cow::Owned(out)
}

fn is_stripped(c: char) -> bool {
    c == ESC || c == '\u{7f}' || (c.is_ascii_control() && !matches!(c, '\t' | '\n' | '\r'))
}
