// src/filter/basic.rs

//! Translation of POSIX basic regular expressions into `regex` syntax.
//!
//! Filters are basic expressions unless flagged as extended. In basic syntax
//! `\(`, `\)`, `\{`, `\}`, `\|`, `\+` and `\?` are operators while their bare
//! forms match literally, and a `*` with nothing to repeat is a literal.

use std::iter::Peekable;
use std::str::Chars;

pub fn to_extended(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    let mut chars = pattern.chars().peekable();
    // A `*` seen while this is set has nothing to repeat.
    let mut at_start = true;

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(op @ ('(' | ')' | '{' | '}' | '|' | '+' | '?')) => {
                    out.push(op);
                    at_start = op == '(' || op == '|';
                    continue;
                }
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push_str(r"\\"),
            },
            '(' | ')' | '{' | '}' | '|' | '+' | '?' => {
                out.push('\\');
                out.push(c);
            }
            '*' if at_start => out.push_str(r"\*"),
            '^' if at_start => {
                out.push('^');
                continue;
            }
            '[' => copy_bracket(&mut chars, &mut out),
            _ => out.push(c),
        }
        at_start = false;
    }

    out
}

/// Copy a bracket expression. Backslash is literal inside POSIX brackets, so
/// it is escaped along with the characters `regex` gives class meaning to.
fn copy_bracket(chars: &mut Peekable<Chars<'_>>, out: &mut String) {
    out.push('[');
    if chars.peek() == Some(&'^') {
        chars.next();
        out.push('^');
    }
    if chars.peek() == Some(&']') {
        chars.next();
        out.push_str(r"\]");
    }

    while let Some(c) = chars.next() {
        match c {
            ']' => {
                out.push(']');
                return;
            }
            '[' if chars.peek() == Some(&':') => {
                out.push('[');
                for n in chars.by_ref() {
                    out.push(n);
                    if n == ']' {
                        break;
                    }
                }
            }
            '\\' | '[' | '&' | '~' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
}
