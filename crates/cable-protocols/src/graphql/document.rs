//! Top-level definition scanning for executable GraphQL documents.
//!
//! Only the keyword that opens each top-level definition matters for routing,
//! so this is a lexer over punctuation and names, not a parser. Strings,
//! block strings and comments are skipped so braces inside them do not count.

use std::iter::Peekable;
use std::str::Chars;

#[cfg(test)]
#[path = "document_tests.rs"]
mod tests;

/// Kind of an executable operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

/// Kind of one top-level definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionKind {
    Operation(OperationKind),
    Fragment,
    /// Type-system definitions and anything else not executable.
    Other,
}

impl DefinitionKind {
    fn from_keyword(keyword: &str) -> Self {
        match keyword {
            "query" => Self::Operation(OperationKind::Query),
            "mutation" => Self::Operation(OperationKind::Mutation),
            "subscription" => Self::Operation(OperationKind::Subscription),
            "fragment" => Self::Fragment,
            _ => Self::Other,
        }
    }
}

/// List the kinds of all top-level definitions, in document order.
pub fn definitions(source: &str) -> Vec<DefinitionKind> {
    let mut kinds = Vec::new();
    let mut chars = source.chars().peekable();
    let mut depth: usize = 0;
    let mut at_definition_start = true;

    while let Some(c) = chars.next() {
        match c {
            '#' => skip_comment(&mut chars),
            '"' => skip_string(&mut chars),
            '{' => {
                if depth == 0 && at_definition_start {
                    // Anonymous query shorthand.
                    kinds.push(DefinitionKind::Operation(OperationKind::Query));
                    at_definition_start = false;
                }
                depth += 1;
            }
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    at_definition_start = true;
                }
            }
            c if is_name_start(c) => {
                let mut name = String::from(c);
                while let Some(&next) = chars.peek() {
                    if is_name_continue(next) {
                        name.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if depth == 0 && at_definition_start {
                    kinds.push(DefinitionKind::from_keyword(&name));
                    at_definition_start = false;
                }
            }
            _ => {}
        }
    }

    kinds
}

/// Whether any top-level definition is a subscription operation.
pub fn has_subscription(source: &str) -> bool {
    definitions(source)
        .iter()
        .any(|kind| *kind == DefinitionKind::Operation(OperationKind::Subscription))
}

fn is_name_start(c: char) -> bool {
    c == '_' || c.is_ascii_alphabetic()
}

fn is_name_continue(c: char) -> bool {
    c == '_' || c.is_ascii_alphanumeric()
}

fn skip_comment(chars: &mut Peekable<Chars<'_>>) {
    for c in chars.by_ref() {
        if c == '\n' || c == '\r' {
            break;
        }
    }
}

/// Called after the opening quote has been consumed.
fn skip_string(chars: &mut Peekable<Chars<'_>>) {
    if chars.peek() == Some(&'"') {
        chars.next();
        if chars.peek() == Some(&'"') {
            chars.next();
            skip_block_string(chars);
        }
        // Otherwise it was the empty string `""`.
        return;
    }

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '"' | '\n' => return,
            _ => {}
        }
    }
}

fn skip_block_string(chars: &mut Peekable<Chars<'_>>) {
    let mut quotes = 0;
    while let Some(c) = chars.next() {
        match c {
            '"' => {
                quotes += 1;
                if quotes == 3 {
                    return;
                }
            }
            '\\' if quotes == 0 => {
                // `\"""` escapes a triple quote inside block strings.
                let mut lookahead = chars.clone();
                if lookahead.next() == Some('"')
                    && lookahead.next() == Some('"')
                    && lookahead.next() == Some('"')
                {
                    chars.nth(2);
                }
            }
            _ => quotes = 0,
        }
    }
}
