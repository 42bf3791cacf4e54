//! Built-in plugin implementations.
//!
//! These ship with the engine and are registered into the default
//! [`PluginSet`]; whether any of them actually loads still depends on the
//! allowlist and on a matching file being present in the trusted plugin
//! directory.

use serde_json::{json, Value};

use super::registry::PluginSet;
use super::traits::{ClassPlugin, Context, PluginError, PluginMetadata};

/// Default set: every built-in registered under its canonical name.
pub fn default_set() -> PluginSet {
    let mut set = PluginSet::new();
    set.register_fn("echo", |args| Ok(args.to_string()));
    set.register_fn("hello", |_args| Ok("Hello from Zona Plugin!".to_string()));
    set.register_fn("time", |_args| {
        let now = chrono::Local::now();
        Ok(format!("Current server time is {}", now.format("%Y-%m-%d %H:%M:%S")))
    });
    set.register_class("math", MathPlugin);
    set
}

/// Arithmetic evaluator plugin.
///
/// Evaluates `+ - * / %` with parentheses and unary minus over f64. Invalid
/// expressions answer with a `Math error: ...` result rather than failing the
/// dispatch, matching how operators expect a calculator to misbehave.
pub struct MathPlugin;

impl ClassPlugin for MathPlugin {
    fn run(&self, args: &str, _context: &Context) -> Result<Value, PluginError> {
        let reply = match evaluate(args) {
            Ok(value) => format!("Result: {}", format_number(value)),
            Err(why) => format!("Math error: {why}"),
        };
        Ok(json!({ "result": reply }))
    }

    fn metadata(&self) -> PluginMetadata {
        PluginMetadata {
            name: "math".into(),
            version: "1.0".into(),
            description: Some("Evaluates arithmetic expressions".into()),
        }
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

fn evaluate(expression: &str) -> Result<f64, String> {
    let mut parser = Parser {
        bytes: expression.as_bytes(),
        pos: 0,
    };
    let value = parser.expr()?;
    parser.skip_whitespace();
    if parser.pos != parser.bytes.len() {
        return Err(format!("unexpected input at position {}", parser.pos));
    }
    Ok(value)
}

/// Recursive-descent parser over the expression bytes. No names, no calls,
/// no indexing: arithmetic only, so plugin input can never reach anything
/// beyond this grammar.
struct Parser<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl Parser<'_> {
    fn expr(&mut self) -> Result<f64, String> {
        let mut value = self.term()?;
        loop {
            match self.peek_op() {
                Some(b'+') => {
                    self.pos += 1;
                    value += self.term()?;
                }
                Some(b'-') => {
                    self.pos += 1;
                    value -= self.term()?;
                }
                _ => return Ok(value),
            }
        }
    }

    fn term(&mut self) -> Result<f64, String> {
        let mut value = self.factor()?;
        loop {
            match self.peek_op() {
                Some(b'*') => {
                    self.pos += 1;
                    value *= self.factor()?;
                }
                Some(op @ (b'/' | b'%')) => {
                    self.pos += 1;
                    let rhs = self.factor()?;
                    if rhs == 0.0 {
                        return Err("division by zero".into());
                    }
                    value = if op == b'/' { value / rhs } else { value % rhs };
                }
                _ => return Ok(value),
            }
        }
    }

    fn factor(&mut self) -> Result<f64, String> {
        self.skip_whitespace();
        match self.bytes.get(self.pos) {
            Some(b'-') => {
                self.pos += 1;
                Ok(-self.factor()?)
            }
            Some(b'(') => {
                self.pos += 1;
                let value = self.expr()?;
                self.skip_whitespace();
                if self.bytes.get(self.pos) == Some(&b')') {
                    self.pos += 1;
                    Ok(value)
                } else {
                    Err("missing closing parenthesis".into())
                }
            }
            Some(c) if c.is_ascii_digit() || *c == b'.' => self.number(),
            Some(c) => Err(format!("unexpected character `{}`", *c as char)),
            None => Err("unexpected end of expression".into()),
        }
    }

    fn number(&mut self) -> Result<f64, String> {
        let start = self.pos;
        let mut seen_dot = false;
        while let Some(&c) = self.bytes.get(self.pos) {
            if c.is_ascii_digit() {
                self.pos += 1;
            } else if c == b'.' && !seen_dot {
                seen_dot = true;
                self.pos += 1;
            } else {
                break;
            }
        }
        let text = std::str::from_utf8(&self.bytes[start..self.pos])
            .map_err(|_| "invalid number".to_string())?;
        text.parse::<f64>()
            .map_err(|_| format!("invalid number `{text}`"))
    }

    fn peek_op(&mut self) -> Option<u8> {
        self.skip_whitespace();
        self.bytes.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.bytes.get(self.pos).is_some_and(|c| c.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn math_result(args: &str) -> String {
        let value = MathPlugin.run(args, &Context::new()).unwrap();
        value["result"].as_str().unwrap().to_string()
    }

    #[test]
    fn math_evaluates_simple_expression() {
        assert_eq!(math_result("2+2"), "Result: 4");
    }

    #[test]
    fn math_respects_precedence_and_parens() {
        assert_eq!(math_result("2+3*4"), "Result: 14");
        assert_eq!(math_result("(2+3)*4"), "Result: 20");
        assert_eq!(math_result("-3 + 5"), "Result: 2");
        assert_eq!(math_result("7 % 4"), "Result: 3");
    }

    #[test]
    fn math_keeps_fractional_results() {
        assert_eq!(math_result("7/2"), "Result: 3.5");
    }

    #[test]
    fn math_reports_errors_as_results() {
        assert_eq!(math_result("1/0"), "Math error: division by zero");
        assert!(math_result("2+").starts_with("Math error:"));
        assert!(math_result("(1+2").starts_with("Math error:"));
        assert!(math_result("import os").starts_with("Math error:"));
    }

    #[test]
    fn default_set_registers_all_builtins() {
        let set = default_set();
        for name in ["echo", "hello", "time", "math"] {
            assert!(set.contains(name), "missing builtin {name}");
        }
    }
}
