//! Read-only guard for caller-supplied statements

use crate::error::{FbscopeError, Result};

/// Accept a single `SELECT` statement, returning it without surrounding
/// whitespace or a trailing semicolon.
///
/// Leading comments are skipped when looking for the first keyword. A
/// semicolon followed by anything but whitespace or comments is rejected as a
/// second statement; semicolons inside quoted strings and identifiers do not
/// count.
///
/// Generator calls (`GEN_ID`, `NEXT VALUE FOR`) and `WITH LOCK` are rejected
/// too: they have side effects even inside a read-only transaction or take
/// row locks.
pub fn ensure_select(statement: &str) -> Result<&str> {
    let trimmed = statement.trim();
    if trimmed.is_empty() {
        return Err(FbscopeError::invalid_request("query is required"));
    }

    let keyword = first_keyword(trimmed);
    if !keyword.eq_ignore_ascii_case("SELECT") {
        return Err(FbscopeError::invalid_request(
            "only SELECT statements are allowed",
        ));
    }

    let statement = match statement_end(trimmed) {
        Some(end) => {
            if !is_blank(&trimmed[end + 1..]) {
                return Err(FbscopeError::invalid_request(
                    "only a single statement is allowed",
                ));
            }
            trimmed[..end].trim_end()
        }
        None => trimmed,
    };

    let words = code_words(statement);
    let has = |phrase: &[&str]| words.windows(phrase.len()).any(|w| w == phrase);
    if has(&["GEN_ID"]) || has(&["NEXT", "VALUE", "FOR"]) {
        return Err(FbscopeError::invalid_request(
            "generator calls are not allowed",
        ));
    }
    if has(&["WITH", "LOCK"]) {
        return Err(FbscopeError::invalid_request("row locks are not allowed"));
    }
    Ok(statement)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Lex {
    Code,
    Single,
    Double,
    LineComment,
    BlockComment,
}

/// Byte offset of the first semicolon outside quotes and comments.
fn statement_end(sql: &str) -> Option<usize> {
    let bytes = sql.as_bytes();
    let mut state = Lex::Code;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        let next = bytes.get(i + 1).copied();
        match state {
            Lex::Code => match b {
                b';' => return Some(i),
                b'\'' => state = Lex::Single,
                b'"' => state = Lex::Double,
                b'-' if next == Some(b'-') => {
                    state = Lex::LineComment;
                    i += 1;
                }
                b'/' if next == Some(b'*') => {
                    state = Lex::BlockComment;
                    i += 1;
                }
                _ => {}
            },
            // doubled quotes re-enter the same state on the next byte
            Lex::Single if b == b'\'' => state = Lex::Code,
            Lex::Double if b == b'"' => state = Lex::Code,
            Lex::LineComment if b == b'\n' => state = Lex::Code,
            Lex::BlockComment if b == b'*' && next == Some(b'/') => {
                state = Lex::Code;
                i += 1;
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Uppercased words outside quotes and comments.
fn code_words(sql: &str) -> Vec<String> {
    let bytes = sql.as_bytes();
    let mut words = Vec::new();
    let mut word = String::new();
    let mut state = Lex::Code;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        let next = bytes.get(i + 1).copied();
        if state == Lex::Code && (b.is_ascii_alphanumeric() || b == b'_' || b == b'$') {
            word.push(char::from(b.to_ascii_uppercase()));
            i += 1;
            continue;
        }
        if !word.is_empty() {
            words.push(std::mem::take(&mut word));
        }
        match state {
            Lex::Code => match b {
                b'\'' => state = Lex::Single,
                b'"' => state = Lex::Double,
                b'-' if next == Some(b'-') => {
                    state = Lex::LineComment;
                    i += 1;
                }
                b'/' if next == Some(b'*') => {
                    state = Lex::BlockComment;
                    i += 1;
                }
                _ => {}
            },
            Lex::Single if b == b'\'' => state = Lex::Code,
            Lex::Double if b == b'"' => state = Lex::Code,
            Lex::LineComment if b == b'\n' => state = Lex::Code,
            Lex::BlockComment if b == b'*' && next == Some(b'/') => {
                state = Lex::Code;
                i += 1;
            }
            _ => {}
        }
        i += 1;
    }
    if !word.is_empty() {
        words.push(word);
    }
    words
}

fn skip_comments(mut sql: &str) -> &str {
    loop {
        sql = sql.trim_start();
        if let Some(rest) = sql.strip_prefix("--") {
            sql = rest.split_once('\n').map_or("", |(_, tail)| tail);
        } else if let Some(rest) = sql.strip_prefix("/*") {
            sql = rest.split_once("*/").map_or("", |(_, tail)| tail);
        } else {
            return sql;
        }
    }
}

fn first_keyword(sql: &str) -> &str {
    let sql = skip_comments(sql);
    let end = sql
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(sql.len());
    &sql[..end]
}

fn is_blank(rest: &str) -> bool {
    skip_comments(rest).is_empty()
}
