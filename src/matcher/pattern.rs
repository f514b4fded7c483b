//! Lua-style string patterns over bytes, used by `=~` and `!~`.
//!
//! Supported items: `.`, the `%a %c %d %g %l %p %s %u %w %x %z` classes (upper
//! case for the complement), `%` escapes for any other byte, `[...]` sets with
//! ranges, classes and `^` negation, the `^` and `$` anchors, the `* + - ?`
//! quantifiers, `%bxy` balanced runs and `%f[set]` frontiers.
//!
//! Captures are not supported: `(` and `)` are ordinary bytes, and a `%1`
//! style back reference makes the pattern invalid. A pattern matches if it
//! matches anywhere in the subject unless anchored with `^`.

use thiserror::Error;

/// Recursion budget for a single match attempt.
const MAX_DEPTH: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("malformed pattern (ends with '%')")]
    TrailingEscape,
    #[error("malformed pattern (missing ']')")]
    MissingBracket,
    #[error("missing arguments to '%b'")]
    MissingBalanceArgs,
    #[error("missing '[' after '%f' in pattern")]
    MissingFrontierSet,
    #[error("back references are not supported")]
    BackReference,
}

/// Check a pattern for syntax errors.
pub fn validate(pattern: &[u8]) -> Result<(), PatternError> {
    let mut p = usize::from(pattern.first() == Some(&b'^'));
    while p < pattern.len() {
        if pattern[p] == b'%' {
            match pattern.get(p + 1) {
                None => return Err(PatternError::TrailingEscape),
                Some(b'b') => {
                    if p + 3 >= pattern.len() {
                        return Err(PatternError::MissingBalanceArgs);
                    }
                    p += 4;
                    continue;
                }
                Some(b'f') => {
                    p += 2;
                    if pattern.get(p) != Some(&b'[') {
                        return Err(PatternError::MissingFrontierSet);
                    }
                    p = class_end(pattern, p)?;
                    continue;
                }
                Some(c) if c.is_ascii_digit() => return Err(PatternError::BackReference),
                Some(_) => {}
            }
        }
        if pattern[p] == b'$' && p + 1 == pattern.len() {
            break;
        }
        p = class_end(pattern, p)?;
        if matches!(pattern.get(p), Some(b'*' | b'+' | b'-' | b'?')) {
            p += 1;
        }
    }
    Ok(())
}

/// True if `pattern` matches somewhere in `text`. Invalid patterns never match.
pub fn is_match(text: &[u8], pattern: &[u8]) -> bool {
    validate(pattern).is_ok() && match_validated(text, pattern)
}

/// [`is_match`] for a pattern that already passed [`validate`].
pub(crate) fn match_validated(text: &[u8], pattern: &[u8]) -> bool {
    let (anchored, pattern) = match pattern.split_first() {
        Some((b'^', rest)) => (true, rest),
        _ => (false, pattern),
    };
    let mut state = MatchState {
        src: text,
        pat: pattern,
        depth: 0,
    };
    let mut start = 0;
    loop {
        if state.do_match(start, 0).is_some() {
            return true;
        }
        start += 1;
        if anchored || start > text.len() {
            return false;
        }
    }
}

/// Index just past the single item starting at `p`.
fn class_end(pat: &[u8], p: usize) -> Result<usize, PatternError> {
    let c = pat[p];
    let mut p = p + 1;
    match c {
        b'%' => {
            if p >= pat.len() {
                return Err(PatternError::TrailingEscape);
            }
            Ok(p + 1)
        }
        b'[' => {
            if pat.get(p) == Some(&b'^') {
                p += 1;
            }
            // the first byte of a set is never its terminator, so "[]]" is valid
            loop {
                if p >= pat.len() {
                    return Err(PatternError::MissingBracket);
                }
                let c = pat[p];
                p += 1;
                if c == b'%' && p < pat.len() {
                    p += 1;
                }
                if p >= pat.len() {
                    return Err(PatternError::MissingBracket);
                }
                if pat[p] == b']' {
                    return Ok(p + 1);
                }
            }
        }
        _ => Ok(p),
    }
}

fn is_space(c: u8) -> bool {
    matches!(c, b' ' | b'\t'..=b'\r')
}

fn match_class(c: u8, class: u8) -> bool {
    let found = match class.to_ascii_lowercase() {
        b'a' => c.is_ascii_alphabetic(),
        b'c' => c.is_ascii_control(),
        b'd' => c.is_ascii_digit(),
        b'g' => c.is_ascii_graphic(),
        b'l' => c.is_ascii_lowercase(),
        b'p' => c.is_ascii_punctuation(),
        b's' => is_space(c),
        b'u' => c.is_ascii_uppercase(),
        b'w' => c.is_ascii_alphanumeric(),
        b'x' => c.is_ascii_hexdigit(),
        b'z' => c == 0,
        _ => return class == c,
    };
    if class.is_ascii_uppercase() {
        !found
    } else {
        found
    }
}

/// `pat[p]` is the opening `[` and `pat[ec]` the closing `]`.
fn match_bracket_class(c: u8, pat: &[u8], p: usize, ec: usize) -> bool {
    let mut p = p;
    let mut matched = true;
    if pat[p + 1] == b'^' {
        matched = false;
        p += 1;
    }
    loop {
        p += 1;
        if p >= ec {
            break;
        }
        if pat[p] == b'%' {
            p += 1;
            if match_class(c, pat[p]) {
                return matched;
            }
        } else if pat[p + 1] == b'-' && p + 2 < ec {
            p += 2;
            if pat[p - 2] <= c && c <= pat[p] {
                return matched;
            }
        } else if pat[p] == c {
            return matched;
        }
    }
    !matched
}

struct MatchState<'a> {
    src: &'a [u8],
    pat: &'a [u8],
    depth: usize,
}

impl MatchState<'_> {
    fn single_match(&self, s: usize, p: usize, ep: usize) -> bool {
        let Some(&c) = self.src.get(s) else {
            return false;
        };
        match self.pat[p] {
            b'.' => true,
            b'%' => match_class(c, self.pat[p + 1]),
            b'[' => match_bracket_class(c, self.pat, p, ep - 1),
            literal => literal == c,
        }
    }

    fn do_match(&mut self, s: usize, p: usize) -> Option<usize> {
        if self.depth >= MAX_DEPTH {
            return None;
        }
        self.depth += 1;
        let result = self.match_here(s, p);
        self.depth -= 1;
        result
    }

    fn match_here(&mut self, mut s: usize, mut p: usize) -> Option<usize> {
        loop {
            if p == self.pat.len() {
                return Some(s);
            }
            match (self.pat[p], self.pat.get(p + 1)) {
                (b'%', Some(b'b')) => {
                    s = self.match_balance(s, p + 2)?;
                    p += 4;
                    continue;
                }
                (b'%', Some(b'f')) => {
                    p += 2;
                    let ep = class_end(self.pat, p).ok()?;
                    let prev = if s == 0 { 0 } else { self.src[s - 1] };
                    let current = self.src.get(s).copied().unwrap_or(0);
                    if !match_bracket_class(prev, self.pat, p, ep - 1)
                        && match_bracket_class(current, self.pat, p, ep - 1)
                    {
                        p = ep;
                        continue;
                    }
                    return None;
                }
                (b'$', None) => {
                    return (s == self.src.len()).then_some(s);
                }
                _ => {}
            }

            let ep = class_end(self.pat, p).ok()?;
            let matched = self.single_match(s, p, ep);
            match self.pat.get(ep) {
                Some(b'?') => {
                    if matched {
                        if let Some(end) = self.do_match(s + 1, ep + 1) {
                            return Some(end);
                        }
                    }
                    p = ep + 1;
                }
                Some(b'*') => return self.max_expand(s, p, ep),
                Some(b'+') => return if matched { self.max_expand(s + 1, p, ep) } else { None },
                Some(b'-') => return self.min_expand(s, p, ep),
                _ => {
                    if !matched {
                        return None;
                    }
                    s += 1;
                    p = ep;
                }
            }
        }
    }

    fn max_expand(&mut self, s: usize, p: usize, ep: usize) -> Option<usize> {
        let mut count = 0;
        while self.single_match(s + count, p, ep) {
            count += 1;
        }
        loop {
            if let Some(end) = self.do_match(s + count, ep + 1) {
                return Some(end);
            }
            if count == 0 {
                return None;
            }
            count -= 1;
        }
    }

    fn min_expand(&mut self, mut s: usize, p: usize, ep: usize) -> Option<usize> {
        loop {
            if let Some(end) = self.do_match(s, ep + 1) {
                return Some(end);
            }
            if self.single_match(s, p, ep) {
                s += 1;
            } else {
                return None;
            }
        }
    }

    fn match_balance(&self, s: usize, p: usize) -> Option<usize> {
        let (open, close) = (self.pat[p], self.pat[p + 1]);
        if self.src.get(s) != Some(&open) {
            return None;
        }
        let mut depth = 1;
        for (i, &c) in self.src.iter().enumerate().skip(s + 1) {
            if c == close {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            } else if c == open {
                depth += 1;
            }
        }
        None
    }
}
