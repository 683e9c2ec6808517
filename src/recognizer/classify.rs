//! Per-line pattern classification
//!
//! The grammar is a fixed, finite set of line shapes recognized by
//! case-insensitive keyword spotting, tried in a fixed priority order with
//! an unconditional passthrough at the end. Inner expressions (conditions,
//! iterables, assignment right-hand sides) are captured verbatim, never
//! parsed.

use super::ident::{canonicalize_expr, to_snake};

/// Default multiplier for RETRY when no backoff= is given
pub const DEFAULT_BACKOFF: f64 = 1.5;

/// Classification of a single trimmed pseudocode line.
///
/// Captures hold the raw source spellings; canonicalization happens when the
/// match is rendered by [`LineClass::emission`].
#[derive(Debug, Clone, PartialEq)]
pub enum LineClass {
    /// `TIMEOUT: <n>s` - wrap the next FUNCTION with a wall-clock timeout
    Timeout(u64),
    /// `RETRY: <n> [backoff=<f>]` - wrap the next FUNCTION with bounded retry
    Retry { attempts: u64, backoff: f64 },
    /// `REQUIRES TYPE: <var>: <T1>[|<T2>...]` - runtime isinstance check
    RequiresType { var: String, types: Vec<String> },
    /// `REQUIRES: <expr>` - runtime precondition assertion
    Requires(String),
    /// `ENSURES: <expr>` - postcondition, buffered until END FUNCTION
    Ensures(String),
    /// `FUNCTION <Name>(<args>) -> <Ret>` (also `RETURNS <Ret>`, or bare)
    Function {
        name: String,
        params: Vec<String>,
        ret: Option<String>,
    },
    /// `END FUNCTION`
    EndFunction,
    /// `IF <cond> THEN`
    If(String),
    /// `ELSE`
    Else,
    /// `ENDIF`
    EndIf,
    /// `FOR EACH <var> IN <iterable>`
    ForEach { var: String, iterable: String },
    /// `ENDFOR`
    EndFor,
    /// `PARALLEL FOR EACH <var> IN <iterable>`
    ParallelForEach { var: String, iterable: String },
    /// `ENDPARALLEL`
    EndParallel,
    /// `WHILE <cond> DO`
    While(String),
    /// `ENDWHILE`
    EndWhile,
    /// `TRY`
    Try,
    /// `CATCH <ExceptionName>`
    Catch(String),
    /// `ENDTRY`
    EndTry,
    /// `RETURN [<expr>]`
    Return(Option<String>),
    /// `CONTINUE`
    Continue,
    /// `SET <var> := <expr>` / `SET <var> = <expr>`
    Set { var: String, expr: String },
    /// Unrecognized line, emitted unchanged
    Passthrough(String),
}

/// What a classified line contributes to the output.
#[derive(Debug, Clone, PartialEq)]
pub enum Emission {
    /// A single translated line
    Line(String),
    /// A multi-line expansion; each entry carries an extra indent level
    /// relative to the surrounding scope
    Block(Vec<(usize, String)>),
    /// Nothing - closers, directives, and buffered contracts
    Nothing,
}

/// Classify one trimmed line of pseudocode.
///
/// Pure function: first matching pattern wins, anything unmatched falls
/// through to [`LineClass::Passthrough`].
pub fn classify(line: &str) -> LineClass {
    parse_timeout(line)
        .or_else(|| parse_retry(line))
        .or_else(|| parse_requires_type(line))
        .or_else(|| parse_requires(line))
        .or_else(|| parse_ensures(line))
        .or_else(|| parse_function(line))
        .or_else(|| parse_end_function(line))
        .or_else(|| parse_if(line))
        .or_else(|| parse_parallel_for_each(line))
        .or_else(|| parse_for_each(line))
        .or_else(|| parse_while(line))
        .or_else(|| parse_try_catch(line))
        .or_else(|| parse_return(line))
        .or_else(|| parse_set(line))
        .or_else(|| parse_bare_keyword(line))
        .unwrap_or_else(|| LineClass::Passthrough(line.to_string()))
}

impl LineClass {
    /// Render the Python payload for this line.
    pub fn emission(&self) -> Emission {
        match self {
            LineClass::RequiresType { var, types } => {
                let tuple = types.join(",");
                Emission::Line(format!(
                    "assert isinstance({}, ({},)), 'TYPE check failed for {}: expected {}'",
                    to_snake(var),
                    tuple,
                    var,
                    tuple
                ))
            }
            LineClass::Requires(expr) => {
                Emission::Line(format!("assert {}, 'REQUIRES failed: {}'", expr, expr))
            }
            LineClass::Function { name, params, ret } => {
                let args: Vec<String> = params.iter().map(|p| to_snake(p)).collect();
                let header = match ret {
                    Some(ret) => format!("def {}({}) -> {}:", to_snake(name), args.join(", "), ret),
                    None => format!("def {}({}):", to_snake(name), args.join(", ")),
                };
                Emission::Line(header)
            }
            LineClass::If(cond) => Emission::Line(format!("if {}:", cond)),
            LineClass::Else => Emission::Line("else:".to_string()),
            LineClass::ForEach { var, iterable } => {
                Emission::Line(format!("for {} in {}:", to_snake(var), iterable))
            }
            LineClass::ParallelForEach { var, iterable } => Emission::Block(vec![
                (0, format!("# PARALLEL FOR EACH {} IN {}", to_snake(var), iterable)),
                (0, "with ThreadPoolExecutor() as __exec:".to_string()),
                (
                    1,
                    format!(
                        "list(__exec.map(lambda __item: __parallel_body(__item), {}))",
                        iterable
                    ),
                ),
            ]),
            LineClass::While(cond) => Emission::Line(format!("while {}:", cond)),
            LineClass::Try => Emission::Line("try:".to_string()),
            LineClass::Catch(name) => Emission::Line(format!("except {}:", name)),
            LineClass::Return(Some(expr)) => {
                Emission::Line(format!("return {}", canonicalize_expr(expr)))
            }
            LineClass::Return(None) => Emission::Line("return".to_string()),
            LineClass::Continue => Emission::Line("continue".to_string()),
            LineClass::Set { var, expr } => {
                Emission::Line(format!("{} = {}", to_snake(var), expr))
            }
            LineClass::Passthrough(text) => Emission::Line(text.clone()),
            LineClass::Timeout(_)
            | LineClass::Retry { .. }
            | LineClass::Ensures(_)
            | LineClass::EndFunction
            | LineClass::EndIf
            | LineClass::EndFor
            | LineClass::EndParallel
            | LineClass::EndWhile
            | LineClass::EndTry => Emission::Nothing,
        }
    }
}

/// Strip a case-insensitive prefix.
fn strip_prefix_ci<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        Some(&s[prefix.len()..])
    } else {
        None
    }
}

/// Strip a case-insensitive suffix preceded by whitespace (`... THEN`).
fn strip_suffix_word_ci<'a>(s: &'a str, suffix: &str) -> Option<&'a str> {
    if s.len() <= suffix.len() {
        return None;
    }
    let split = s.len() - suffix.len();
    let tail = s.get(split..)?;
    if !tail.eq_ignore_ascii_case(suffix) {
        return None;
    }
    let head = &s[..split];
    if !head.ends_with(char::is_whitespace) {
        return None;
    }
    Some(head.trim_end())
}

/// Strip a case-insensitive leading keyword that must be followed by
/// whitespace; returns the rest with leading whitespace removed.
fn strip_keyword_ci<'a>(s: &'a str, keyword: &str) -> Option<&'a str> {
    let rest = strip_prefix_ci(s, keyword)?;
    if rest.starts_with(char::is_whitespace) {
        Some(rest.trim_start())
    } else {
        None
    }
}

/// Split a leading `[A-Za-z0-9_]+` identifier off the front of `s`.
fn split_ident(s: &str) -> Option<(&str, &str)> {
    let end = s
        .char_indices()
        .find(|(_, c)| !c.is_ascii_alphanumeric() && *c != '_')
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    if end == 0 {
        return None;
    }
    Some((&s[..end], &s[end..]))
}

fn parse_timeout(line: &str) -> Option<LineClass> {
    let rest = strip_prefix_ci(line, "TIMEOUT:")?.trim();
    let digits = rest.strip_suffix(['s', 'S'])?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(LineClass::Timeout(digits.parse().ok()?))
}

fn parse_retry(line: &str) -> Option<LineClass> {
    let rest = strip_prefix_ci(line, "RETRY:")?.trim();
    let mut words = rest.split_whitespace();
    let count = words.next()?;
    if !count.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let attempts: u64 = count.parse().ok()?;

    let backoff = match words.next() {
        None => DEFAULT_BACKOFF,
        Some(word) => {
            let value = strip_prefix_ci(word, "backoff=")?;
            if value.is_empty() || !value.chars().all(|c| c.is_ascii_digit() || c == '.') {
                return None;
            }
            value.parse().ok()?
        }
    };
    if words.next().is_some() {
        return None;
    }
    Some(LineClass::Retry { attempts, backoff })
}

fn parse_requires_type(line: &str) -> Option<LineClass> {
    let rest = strip_keyword_ci(line, "REQUIRES")?;
    let rest = strip_prefix_ci(rest, "TYPE:")?.trim_start();
    let (var, rest) = split_ident(rest)?;
    let rest = rest.trim_start().strip_prefix(':')?;
    let types_src = rest.trim();
    if types_src.is_empty()
        || !types_src
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '|' | '[' | ']'))
    {
        return None;
    }
    let types: Vec<String> = types_src.split('|').map(str::to_string).collect();
    if types.iter().any(|t| t.is_empty()) {
        return None;
    }
    Some(LineClass::RequiresType {
        var: var.to_string(),
        types,
    })
}

fn parse_requires(line: &str) -> Option<LineClass> {
    let expr = strip_prefix_ci(line, "REQUIRES:")?.trim();
    if expr.is_empty() {
        return None;
    }
    Some(LineClass::Requires(expr.to_string()))
}

fn parse_ensures(line: &str) -> Option<LineClass> {
    let expr = strip_prefix_ci(line, "ENSURES:")?.trim();
    if expr.is_empty() {
        return None;
    }
    Some(LineClass::Ensures(expr.to_string()))
}

fn parse_function(line: &str) -> Option<LineClass> {
    let rest = strip_keyword_ci(line, "FUNCTION")?;
    let (name, rest) = split_ident(rest)?;
    let rest = rest.strip_prefix('(')?;
    let close = rest.find(')')?;
    let args = &rest[..close];
    let after = rest[close + 1..].trim_start();

    let ret = if after.is_empty() {
        None
    } else if let Some(ret) = after.strip_prefix("->") {
        Some(ret.trim().to_string()).filter(|r| !r.is_empty())
    } else if let Some(ret) = strip_keyword_ci(after, "RETURNS") {
        Some(ret.trim().to_string()).filter(|r| !r.is_empty())
    } else {
        return None;
    };

    let params: Vec<String> = args
        .split(',')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .collect();

    Some(LineClass::Function {
        name: name.to_string(),
        params,
        ret,
    })
}

fn parse_end_function(line: &str) -> Option<LineClass> {
    let rest = strip_prefix_ci(line, "END")?;
    if rest.trim_start().eq_ignore_ascii_case("FUNCTION") {
        Some(LineClass::EndFunction)
    } else {
        None
    }
}

fn parse_if(line: &str) -> Option<LineClass> {
    let rest = strip_keyword_ci(line, "IF")?;
    let cond = strip_suffix_word_ci(rest, "THEN")?;
    if cond.is_empty() {
        return None;
    }
    Some(LineClass::If(cond.to_string()))
}

/// `<var> IN <iterable>` tail shared by both FOR EACH forms.
fn parse_each_tail(rest: &str) -> Option<(String, String)> {
    let (var, rest) = split_ident(rest)?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let iterable = strip_keyword_ci(rest.trim_start(), "IN")?;
    if iterable.is_empty() {
        return None;
    }
    Some((var.to_string(), iterable.trim_end().to_string()))
}

fn parse_for_each(line: &str) -> Option<LineClass> {
    let rest = strip_keyword_ci(line, "FOR")?;
    let rest = strip_keyword_ci(rest, "EACH")?;
    let (var, iterable) = parse_each_tail(rest)?;
    Some(LineClass::ForEach { var, iterable })
}

fn parse_parallel_for_each(line: &str) -> Option<LineClass> {
    let rest = strip_keyword_ci(line, "PARALLEL")?;
    let rest = strip_keyword_ci(rest, "FOR")?;
    let rest = strip_keyword_ci(rest, "EACH")?;
    let (var, iterable) = parse_each_tail(rest)?;
    Some(LineClass::ParallelForEach { var, iterable })
}

fn parse_while(line: &str) -> Option<LineClass> {
    let rest = strip_keyword_ci(line, "WHILE")?;
    let cond = strip_suffix_word_ci(rest, "DO")?;
    if cond.is_empty() {
        return None;
    }
    Some(LineClass::While(cond.to_string()))
}

fn parse_try_catch(line: &str) -> Option<LineClass> {
    if line.eq_ignore_ascii_case("TRY") {
        return Some(LineClass::Try);
    }
    let rest = strip_keyword_ci(line, "CATCH")?;
    let (name, tail) = split_ident(rest)?;
    if !tail.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    Some(LineClass::Catch(name.to_string()))
}

fn parse_return(line: &str) -> Option<LineClass> {
    if line.eq_ignore_ascii_case("RETURN") {
        return Some(LineClass::Return(None));
    }
    let expr = strip_keyword_ci(line, "RETURN")?;
    Some(LineClass::Return(Some(expr.trim_end().to_string())))
}

fn parse_set(line: &str) -> Option<LineClass> {
    let rest = strip_keyword_ci(line, "SET")?;
    let (var, rest) = split_ident(rest)?;
    let rest = rest.trim_start();
    let expr = rest
        .strip_prefix(":=")
        .or_else(|| rest.strip_prefix('='))?
        .trim();
    if expr.is_empty() || expr.starts_with('=') {
        return None;
    }
    Some(LineClass::Set {
        var: var.to_string(),
        expr: expr.to_string(),
    })
}

fn parse_bare_keyword(line: &str) -> Option<LineClass> {
    if line.eq_ignore_ascii_case("ELSE") {
        Some(LineClass::Else)
    } else if line.eq_ignore_ascii_case("ENDIF") {
        Some(LineClass::EndIf)
    } else if line.eq_ignore_ascii_case("ENDFOR") {
        Some(LineClass::EndFor)
    } else if line.eq_ignore_ascii_case("ENDPARALLEL") {
        Some(LineClass::EndParallel)
    } else if line.eq_ignore_ascii_case("ENDWHILE") {
        Some(LineClass::EndWhile)
    } else if line.eq_ignore_ascii_case("ENDTRY") {
        Some(LineClass::EndTry)
    } else if line.eq_ignore_ascii_case("CONTINUE") {
        Some(LineClass::Continue)
    } else {
        None
    }
}
