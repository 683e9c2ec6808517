//! Single-pass translation driver
//!
//! Feeds each raw line to the recognizer and turns the classification into
//! output: openers push a nesting marker, closers pop one, directives and
//! ENSURES clauses are parked until their attachment point. Indentation of
//! every emitted line is one indent unit per open block.

use crate::errors::{PseudocError, PseudocResult, SourceSpan};
use crate::recognizer::{classify, Emission, LineClass};

/// One indentation unit in the emitted Python
const INDENT: &str = "    ";

/// The kind of an open block construct
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Function,
    If,
    ForEach,
    Parallel,
    While,
    Try,
}

impl BlockKind {
    /// The pseudocode keyword that opens this block
    fn keyword(self) -> &'static str {
        match self {
            BlockKind::Function => "FUNCTION",
            BlockKind::If => "IF",
            BlockKind::ForEach => "FOR EACH",
            BlockKind::Parallel => "PARALLEL FOR EACH",
            BlockKind::While => "WHILE",
            BlockKind::Try => "TRY",
        }
    }

    /// The pseudocode keyword that closes this block
    fn closer(self) -> &'static str {
        match self {
            BlockKind::Function => "END FUNCTION",
            BlockKind::If => "ENDIF",
            BlockKind::ForEach => "ENDFOR",
            BlockKind::Parallel => "ENDPARALLEL",
            BlockKind::While => "ENDWHILE",
            BlockKind::Try => "ENDTRY",
        }
    }
}

/// One open block on the nesting stack
#[derive(Debug, Clone, Copy)]
struct BlockMarker {
    kind: BlockKind,
    span: SourceSpan,
}

/// A captured TIMEOUT directive waiting for its function
#[derive(Debug, Clone, Copy)]
struct PendingTimeout {
    secs: u64,
    span: SourceSpan,
}

/// A captured RETRY directive waiting for its function
#[derive(Debug, Clone, Copy)]
struct PendingRetry {
    attempts: u64,
    backoff: f64,
    span: SourceSpan,
}

/// The pseudocode-to-Python translator.
///
/// Each [`translate`](Translator::translate) call owns an independent
/// nesting stack, ensures buffer, and directive slots, so separate
/// translations never share state.
pub struct Translator {
    /// Output buffer
    output: String,
    /// Open blocks; the depth is the current indentation level
    stack: Vec<BlockMarker>,
    /// ENSURES expressions buffered until the enclosing END FUNCTION
    ensures: Vec<String>,
    /// TIMEOUT directive waiting for the next FUNCTION header
    pending_timeout: Option<PendingTimeout>,
    /// RETRY directive waiting for the next FUNCTION header
    pending_retry: Option<PendingRetry>,
    /// Whether to prefix the output with the Python runtime helpers
    include_runtime: bool,
}

/// Translate a full pseudocode source to Python.
pub fn translate(source: &str) -> PseudocResult<String> {
    Translator::new().translate(source)
}

impl Translator {
    pub fn new() -> Self {
        Self {
            output: String::new(),
            stack: Vec::new(),
            ensures: Vec::new(),
            pending_timeout: None,
            pending_retry: None,
            include_runtime: false,
        }
    }

    /// Set whether to emit the runtime helper prelude (`with_timeout`,
    /// `with_retry`, the worker-pool import) ahead of the translation,
    /// making the output self-contained.
    pub fn with_runtime(mut self, include: bool) -> Self {
        self.include_runtime = include;
        self
    }

    /// Translate a full pseudocode source to Python.
    ///
    /// Single pass, strictly in line order. Fails with a descriptive error
    /// on unbalanced blocks, on an ENSURES outside any function, and on a
    /// TIMEOUT/RETRY directive left dangling at end-of-input.
    pub fn translate(&mut self, source: &str) -> PseudocResult<String> {
        self.output.clear();
        self.stack.clear();
        self.ensures.clear();
        self.pending_timeout = None;
        self.pending_retry = None;

        if self.include_runtime {
            self.emit_runtime();
        }

        let segments: Vec<&str> = source.split('\n').collect();
        let mut offset = 0;
        for (idx, &segment) in segments.iter().enumerate() {
            // A trailing newline yields one final empty segment, not a line.
            let is_trailing_empty = idx + 1 == segments.len() && segment.is_empty();
            if !is_trailing_empty {
                let raw = segment.strip_suffix('\r').unwrap_or(segment);
                let span = SourceSpan::new(offset, offset + raw.len());
                self.process_line(raw, span)?;
            }
            offset += segment.len() + 1;
        }

        if let Some(marker) = self.stack.last() {
            return Err(PseudocError::structure(
                format!(
                    "unclosed {} block: missing {} before end of input",
                    marker.kind.keyword(),
                    marker.kind.closer()
                ),
                marker.span,
            ));
        }
        if let Some(timeout) = &self.pending_timeout {
            return Err(PseudocError::directive(
                "TIMEOUT directive with no following FUNCTION",
                timeout.span,
            ));
        }
        if let Some(retry) = &self.pending_retry {
            return Err(PseudocError::directive(
                "RETRY directive with no following FUNCTION",
                retry.span,
            ));
        }

        Ok(self.output.clone())
    }

    fn process_line(&mut self, raw: &str, span: SourceSpan) -> PseudocResult<()> {
        let class = classify(raw.trim());

        match &class {
            // Directives fill their slot; a repeated directive overwrites
            // the previous one (last one wins).
            LineClass::Timeout(secs) => {
                self.pending_timeout = Some(PendingTimeout { secs: *secs, span });
            }
            LineClass::Retry { attempts, backoff } => {
                self.pending_retry = Some(PendingRetry {
                    attempts: *attempts,
                    backoff: *backoff,
                    span,
                });
            }

            LineClass::Ensures(expr) => {
                if !self.in_function() {
                    return Err(PseudocError::structure(
                        "ENSURES outside of any FUNCTION body",
                        span,
                    ));
                }
                self.ensures.push(expr.clone());
            }

            LineClass::Function { .. } => {
                if let Some(timeout) = self.pending_timeout.take() {
                    self.emit(&format!("@with_timeout({})", timeout.secs));
                }
                if let Some(retry) = self.pending_retry.take() {
                    self.emit(&format!("@with_retry({}, {})", retry.attempts, retry.backoff));
                }
                self.emit_single(&class);
                self.stack.push(BlockMarker {
                    kind: BlockKind::Function,
                    span,
                });
            }

            LineClass::If(_) => self.open_block(&class, BlockKind::If, span),
            LineClass::ForEach { .. } => self.open_block(&class, BlockKind::ForEach, span),
            LineClass::While(_) => self.open_block(&class, BlockKind::While, span),
            LineClass::Try => self.open_block(&class, BlockKind::Try, span),

            LineClass::ParallelForEach { .. } => {
                let Emission::Block(lines) = class.emission() else {
                    unreachable!("parallel loop always expands to a block");
                };
                for (extra, line) in &lines {
                    self.emit_at(self.stack.len() + extra, line);
                }
                self.stack.push(BlockMarker {
                    kind: BlockKind::Parallel,
                    span,
                });
            }

            // ELSE/CATCH continue the block they live in: the keyword lines
            // up with its opener, one level left of the block body.
            LineClass::Else => {
                self.check_branch(BlockKind::If, "ELSE", span)?;
                self.emit_at(self.stack.len() - 1, "else:");
            }
            LineClass::Catch(_) => {
                self.check_branch(BlockKind::Try, "CATCH", span)?;
                let Emission::Line(line) = class.emission() else {
                    unreachable!("catch renders a single line");
                };
                self.emit_at(self.stack.len() - 1, &line);
            }

            LineClass::EndFunction => {
                self.check_close(BlockKind::Function, "END FUNCTION", span)?;
                // Postconditions land inside the body, at pre-pop depth.
                let pending = std::mem::take(&mut self.ensures);
                for expr in &pending {
                    self.emit(&format!("assert {}, 'ENSURES failed: {}'", expr, expr));
                }
                self.stack.pop();
            }
            LineClass::EndIf => self.close_block(BlockKind::If, "ENDIF", span)?,
            LineClass::EndFor => self.close_block(BlockKind::ForEach, "ENDFOR", span)?,
            LineClass::EndParallel => self.close_block(BlockKind::Parallel, "ENDPARALLEL", span)?,
            LineClass::EndWhile => self.close_block(BlockKind::While, "ENDWHILE", span)?,
            LineClass::EndTry => self.close_block(BlockKind::Try, "ENDTRY", span)?,

            LineClass::RequiresType { .. }
            | LineClass::Requires(_)
            | LineClass::Return(_)
            | LineClass::Continue
            | LineClass::Set { .. }
            | LineClass::Passthrough(_) => self.emit_single(&class),
        }

        Ok(())
    }

    /// Emit a one-line opener and push its marker.
    fn open_block(&mut self, class: &LineClass, kind: BlockKind, span: SourceSpan) {
        self.emit_single(class);
        self.stack.push(BlockMarker { kind, span });
    }

    /// Pop a closer after checking it matches the innermost open block.
    fn close_block(
        &mut self,
        kind: BlockKind,
        closer: &str,
        span: SourceSpan,
    ) -> PseudocResult<()> {
        self.check_close(kind, closer, span)?;
        self.stack.pop();
        Ok(())
    }

    fn check_close(&self, kind: BlockKind, closer: &str, span: SourceSpan) -> PseudocResult<()> {
        match self.stack.last() {
            None => Err(PseudocError::structure(
                format!("{} with no matching {}", closer, kind.keyword()),
                span,
            )),
            Some(marker) if marker.kind != kind => Err(PseudocError::structure(
                format!(
                    "{} cannot close the {} block still open",
                    closer,
                    marker.kind.keyword()
                ),
                span,
            )),
            Some(_) => Ok(()),
        }
    }

    fn check_branch(&self, kind: BlockKind, branch: &str, span: SourceSpan) -> PseudocResult<()> {
        match self.stack.last() {
            Some(marker) if marker.kind == kind => Ok(()),
            _ => Err(PseudocError::structure(
                format!("{} is only valid directly inside a {} block", branch, kind.keyword()),
                span,
            )),
        }
    }

    fn in_function(&self) -> bool {
        self.stack.iter().any(|m| m.kind == BlockKind::Function)
    }

    /// Emit the single-line rendering of a classified line.
    fn emit_single(&mut self, class: &LineClass) {
        match class.emission() {
            Emission::Line(line) => self.emit(&line),
            Emission::Nothing => {}
            Emission::Block(_) => unreachable!("block expansions are handled by the caller"),
        }
    }

    /// Emit one line at the current nesting depth.
    fn emit(&mut self, line: &str) {
        self.emit_at(self.stack.len(), line);
    }

    /// Emit one line at an explicit depth. Blank lines carry no indentation.
    fn emit_at(&mut self, depth: usize, line: &str) {
        if !line.is_empty() {
            for _ in 0..depth {
                self.output.push_str(INDENT);
            }
            self.output.push_str(line);
        }
        self.output.push('\n');
    }

    /// Emit the Python runtime helpers the translated constructs rely on:
    /// the timeout and retry wrappers and the worker-pool import.
    fn emit_runtime(&mut self) {
        self.emit("# pseudoc runtime helpers");
        self.emit("import functools");
        self.emit("import threading");
        self.emit("import time");
        self.emit("from concurrent.futures import ThreadPoolExecutor");
        self.emit("");

        self.emit("def with_timeout(seconds):");
        self.emit_at(1, "def deco(fn):");
        self.emit_at(2, "@functools.wraps(fn)");
        self.emit_at(2, "def wrapper(*args, **kwargs):");
        self.emit_at(3, "result = {}");
        self.emit_at(3, "error = {}");
        self.emit_at(3, "def run():");
        self.emit_at(4, "try:");
        self.emit_at(5, "result['r'] = fn(*args, **kwargs)");
        self.emit_at(4, "except Exception as e:");
        self.emit_at(5, "error['e'] = e");
        self.emit_at(3, "t = threading.Thread(target=run, daemon=True)");
        self.emit_at(3, "t.start()");
        self.emit_at(3, "t.join(timeout=seconds)");
        self.emit_at(3, "if t.is_alive():");
        self.emit_at(4, "raise TimeoutError(f\"Function timed out after {seconds}s\")");
        self.emit_at(3, "if 'e' in error:");
        self.emit_at(4, "raise error['e']");
        self.emit_at(3, "return result.get('r')");
        self.emit_at(2, "return wrapper");
        self.emit_at(1, "return deco");
        self.emit("");

        self.emit("def with_retry(retries, backoff=1.5):");
        self.emit_at(1, "def deco(fn):");
        self.emit_at(2, "@functools.wraps(fn)");
        self.emit_at(2, "def wrapper(*args, **kwargs):");
        self.emit_at(3, "delay = 0.0");
        self.emit_at(3, "for attempt in range(retries + 1):");
        self.emit_at(4, "try:");
        self.emit_at(5, "return fn(*args, **kwargs)");
        self.emit_at(4, "except Exception:");
        self.emit_at(5, "if attempt == retries:");
        self.emit_at(6, "raise");
        self.emit_at(5, "delay = delay * backoff if delay > 0 else 0.2");
        self.emit_at(5, "time.sleep(delay)");
        self.emit_at(2, "return wrapper");
        self.emit_at(1, "return deco");
        self.emit("");
    }
}

impl Default for Translator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn convert(source: &str) -> String {
        translate(source).expect("translation should succeed")
    }

    fn convert_err(source: &str) -> PseudocError {
        translate(source).expect_err("translation should fail")
    }

    #[test]
    fn test_simple_function() {
        let out = convert("FUNCTION Add(A, B) -> Int\nRETURN A + B\nEND FUNCTION\n");
        assert_eq!(out, "def add(a, b) -> Int:\n    return a + b\n");
    }

    #[test]
    fn test_requires_before_function_at_depth_zero() {
        let out = convert("REQUIRES: x > 0\nFUNCTION F(X) -> Int\nRETURN X\nEND FUNCTION\n");
        assert_eq!(
            out,
            "assert x > 0, 'REQUIRES failed: x > 0'\n\
             def f(x) -> Int:\n    return x\n"
        );
    }

    #[test]
    fn test_ensures_outside_function_is_rejected() {
        let err = convert_err("ENSURES: result >= 0\nFUNCTION F(X) -> Int\nRETURN X\nEND FUNCTION\n");
        assert!(matches!(err, PseudocError::Structure { .. }));
        assert!(err.to_string().contains("ENSURES"));
    }

    #[test]
    fn test_ensures_flushed_at_end_function() {
        let out = convert(
            "FUNCTION F(X) -> Int\n\
             ENSURES: result >= 0\n\
             SET Result := X\n\
             RETURN Result\n\
             END FUNCTION\n",
        );
        assert_eq!(
            out,
            "def f(x) -> Int:\n\
             \x20   result = X\n\
             \x20   return result\n\
             \x20   assert result >= 0, 'ENSURES failed: result >= 0'\n"
        );
    }

    #[test]
    fn test_ensures_buffer_cleared_between_functions() {
        let out = convert(
            "FUNCTION F() -> Int\n\
             ENSURES: a > 0\n\
             RETURN 1\n\
             END FUNCTION\n\
             FUNCTION G() -> Int\n\
             RETURN 2\n\
             END FUNCTION\n",
        );
        assert_eq!(out.matches("ENSURES failed").count(), 1);
    }

    #[test]
    fn test_timeout_and_retry_decoration_order() {
        let out = convert(
            "TIMEOUT: 5s\nRETRY: 2 backoff=1.2\nFUNCTION F() -> Int\nRETURN 1\nEND FUNCTION\n",
        );
        assert_eq!(
            out,
            "@with_timeout(5)\n@with_retry(2, 1.2)\ndef f() -> Int:\n    return 1\n"
        );
    }

    #[test]
    fn test_repeated_timeout_last_one_wins() {
        let out = convert("TIMEOUT: 5s\nTIMEOUT: 9s\nFUNCTION F() -> Int\nRETURN 1\nEND FUNCTION\n");
        assert!(out.starts_with("@with_timeout(9)\n"));
        assert!(!out.contains("@with_timeout(5)"));
    }

    #[test]
    fn test_dangling_timeout_is_rejected() {
        let err = convert_err("TIMEOUT: 5s\n");
        assert!(matches!(err, PseudocError::Directive { .. }));
        assert!(err.to_string().contains("TIMEOUT"));
    }

    #[test]
    fn test_dangling_retry_is_rejected() {
        let err = convert_err("FUNCTION F() -> Int\nRETURN 1\nEND FUNCTION\nRETRY: 3\n");
        assert!(matches!(err, PseudocError::Directive { .. }));
        assert!(err.to_string().contains("RETRY"));
    }

    #[test]
    fn test_parallel_expansion_indentation() {
        let out = convert("PARALLEL FOR EACH Item IN Items\nENDPARALLEL\n");
        assert_eq!(
            out,
            "# PARALLEL FOR EACH item IN Items\n\
             with ThreadPoolExecutor() as __exec:\n\
             \x20   list(__exec.map(lambda __item: __parallel_body(__item), Items))\n"
        );
    }

    #[test]
    fn test_parallel_body_lines_indented_one_level() {
        let out = convert(
            "FUNCTION Run(Items) -> None\n\
             PARALLEL FOR EACH Item IN Items\n\
             log(item)\n\
             ENDPARALLEL\n\
             END FUNCTION\n",
        );
        assert!(out.contains("\n    # PARALLEL FOR EACH item IN Items\n"));
        assert!(out.contains("\n        list(__exec.map("));
        assert!(out.contains("\n        log(item)\n"));
    }

    #[test]
    fn test_unmatched_endif_is_rejected() {
        let err = convert_err("ENDIF\n");
        assert!(matches!(err, PseudocError::Structure { .. }));
        assert!(err.to_string().contains("ENDIF"));
    }

    #[test]
    fn test_unclosed_block_is_rejected() {
        let err = convert_err("FUNCTION F() -> Int\nIF x THEN\nRETURN 1\nEND FUNCTION\n");
        assert!(matches!(err, PseudocError::Structure { .. }));
        assert!(err.to_string().contains("END FUNCTION"));
    }

    #[test]
    fn test_unclosed_at_end_of_input_is_rejected() {
        let err = convert_err("FUNCTION F() -> Int\nRETURN 1\n");
        assert!(matches!(err, PseudocError::Structure { .. }));
        assert!(err.to_string().contains("unclosed FUNCTION"));
    }

    #[test]
    fn test_mismatched_closer_is_rejected() {
        let err = convert_err("WHILE x DO\nENDFOR\n");
        assert!(err.to_string().contains("ENDFOR"));
        assert!(err.to_string().contains("WHILE"));
    }

    #[test]
    fn test_if_else_alignment() {
        let out = convert(
            "FUNCTION F(X) -> Int\n\
             IF X > 0 THEN\n\
             RETURN 1\n\
             ELSE\n\
             RETURN 0\n\
             ENDIF\n\
             END FUNCTION\n",
        );
        assert_eq!(
            out,
            "def f(x) -> Int:\n\
             \x20   if X > 0:\n\
             \x20       return 1\n\
             \x20   else:\n\
             \x20       return 0\n"
        );
    }

    #[test]
    fn test_else_without_if_is_rejected() {
        let err = convert_err("ELSE\n");
        assert!(err.to_string().contains("ELSE"));
    }

    #[test]
    fn test_try_catch_alignment() {
        let out = convert(
            "TRY\n\
             SET X := risky()\n\
             CATCH ValueError\n\
             SET X := 0\n\
             ENDTRY\n",
        );
        assert_eq!(
            out,
            "try:\n\
             \x20   x = risky()\n\
             except ValueError:\n\
             \x20   x = 0\n"
        );
    }

    #[test]
    fn test_nested_loops_indent() {
        let out = convert(
            "FUNCTION Scan(Rows) -> Int\n\
             FOR EACH Row IN Rows\n\
             WHILE pending(row) DO\n\
             CONTINUE\n\
             ENDWHILE\n\
             ENDFOR\n\
             RETURN 0\n\
             END FUNCTION\n",
        );
        assert_eq!(
            out,
            "def scan(rows) -> Int:\n\
             \x20   for row in Rows:\n\
             \x20       while pending(row):\n\
             \x20           continue\n\
             \x20   return 0\n"
        );
    }

    #[test]
    fn test_passthrough_and_blank_lines() {
        let out = convert("FUNCTION F() -> None\nprint('hi')\n\nRETURN\nEND FUNCTION\n");
        assert_eq!(out, "def f() -> None:\n    print('hi')\n\n    return\n");
    }

    #[test]
    fn test_set_both_spellings() {
        let out = convert("SET A := 1\nSET B = 2\n");
        assert_eq!(out, "a = 1\nb = 2\n");
    }

    #[test]
    fn test_crlf_input() {
        let out = convert("FUNCTION F() -> Int\r\nRETURN 1\r\nEND FUNCTION\r\n");
        assert_eq!(out, "def f() -> Int:\n    return 1\n");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(convert(""), "");
    }

    #[test]
    fn test_fresh_state_per_call() {
        let mut translator = Translator::new();
        assert!(translator.translate("IF x THEN\n").is_err());
        let out = translator
            .translate("FUNCTION F() -> Int\nRETURN 1\nEND FUNCTION\n")
            .expect("second call starts from clean state");
        assert_eq!(out, "def f() -> Int:\n    return 1\n");
    }

    #[test]
    fn test_runtime_prelude() {
        let out = Translator::new()
            .with_runtime(true)
            .translate("FUNCTION F() -> Int\nRETURN 1\nEND FUNCTION\n")
            .expect("translation should succeed");
        assert!(out.starts_with("# pseudoc runtime helpers\n"));
        assert!(out.contains("def with_timeout(seconds):"));
        assert!(out.contains("def with_retry(retries, backoff=1.5):"));
        assert!(out.contains("from concurrent.futures import ThreadPoolExecutor"));
        assert!(out.ends_with("def f() -> Int:\n    return 1\n"));
    }

    #[test]
    fn test_error_span_points_at_offending_line() {
        let source = "FUNCTION F() -> Int\nRETURN 1\nEND FUNCTION\nENDIF\n";
        let err = convert_err(source);
        let span = err.span().expect("structural errors carry a span");
        assert_eq!(&source[span.start..span.end], "ENDIF");
    }
}
