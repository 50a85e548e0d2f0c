//! Arithmetic calculator tool.
//!
//! Input is checked against a character whitelist before anything else, then
//! parsed by a small recursive-descent evaluator. Nothing is ever executed.
//!
//! ```text
//! expr   := term (('+' | '-') term)*
//! term   := factor (('*' | '/') factor)*
//! factor := ('+' | '-') factor | number | '(' expr ')'
//! ```

use thiserror::Error;

/// Maximum parenthesis / unary nesting depth.
const MAX_DEPTH: usize = 64;

/// Reasons an expression could not be evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalcError {
    /// Input contains characters outside the arithmetic whitelist.
    #[error("Only basic math allowed.")]
    Disallowed,
    /// Input is empty or whitespace.
    #[error("empty expression")]
    Empty,
    /// Malformed expression.
    #[error("{0}")]
    Syntax(String),
    /// Division by zero.
    #[error("division by zero")]
    DivisionByZero,
    /// Result overflowed to infinity or NaN.
    #[error("result is not a finite number")]
    NonFinite,
}

/// Returns `true` if every character is a digit, `+ - * / ( ) .`, or whitespace.
#[must_use]
pub fn is_whitelisted(expression: &str) -> bool {
    expression
        .chars()
        .all(|c| c.is_ascii_digit() || "+-*/().".contains(c) || c.is_whitespace())
}

/// Evaluates an arithmetic expression.
///
/// # Errors
///
/// Returns [`CalcError`] for disallowed characters, malformed input,
/// division by zero, or a non-finite result.
pub fn evaluate(expression: &str) -> Result<f64, CalcError> {
    if !is_whitelisted(expression) {
        return Err(CalcError::Disallowed);
    }
    if expression.trim().is_empty() {
        return Err(CalcError::Empty);
    }

    let mut parser = Parser {
        input: expression.as_bytes(),
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;
    parser.skip_ws();
    if parser.pos < parser.input.len() {
        return Err(CalcError::Syntax(format!(
            "unexpected '{}' at position {}",
            char::from(parser.input[parser.pos]),
            parser.pos
        )));
    }
    if value.is_finite() {
        Ok(value)
    } else {
        Err(CalcError::NonFinite)
    }
}

/// Formats a value the way the tool reports it: integral values without a
/// fractional part.
#[must_use]
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        // Normalise -0 to 0.
        format!("{}", value + 0.0)
    } else {
        value.to_string()
    }
}

/// Runs the calculator tool and returns the text fed back to the model.
#[must_use]
pub fn calculate(expression: &str) -> String {
    match evaluate(expression) {
        Ok(value) => format!("Calculated Result: {}", format_number(value)),
        Err(CalcError::Disallowed) => "Error: Only basic math allowed.".to_string(),
        Err(e) => format!("Math error: {e}"),
    }
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn skip_ws(&mut self) {
        while self.pos < self.input.len() && self.input[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn peek(&mut self) -> Option<u8> {
        self.skip_ws();
        self.input.get(self.pos).copied()
    }

    fn expr(&mut self) -> Result<f64, CalcError> {
        let mut value = self.term()?;
        while let Some(op @ (b'+' | b'-')) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            if op == b'+' {
                value += rhs;
            } else {
                value -= rhs;
            }
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<f64, CalcError> {
        let mut value = self.factor()?;
        while let Some(op @ (b'*' | b'/')) = self.peek() {
            self.pos += 1;
            let rhs = self.factor()?;
            if op == b'*' {
                value *= rhs;
            } else {
                if rhs == 0.0 {
                    return Err(CalcError::DivisionByZero);
                }
                value /= rhs;
            }
        }
        Ok(value)
    }

    fn factor(&mut self) -> Result<f64, CalcError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(CalcError::Syntax("expression nested too deeply".to_string()));
        }
        let result = self.factor_inner();
        self.depth -= 1;
        result
    }

    fn factor_inner(&mut self) -> Result<f64, CalcError> {
        match self.peek() {
            Some(b'+') => {
                self.pos += 1;
                self.factor()
            }
            Some(b'-') => {
                self.pos += 1;
                Ok(-self.factor()?)
            }
            Some(b'(') => {
                self.pos += 1;
                let value = self.expr()?;
                if self.peek() == Some(b')') {
                    self.pos += 1;
                    Ok(value)
                } else {
                    Err(CalcError::Syntax("missing closing parenthesis".to_string()))
                }
            }
            Some(c) if c.is_ascii_digit() || c == b'.' => self.number(),
            Some(c) => Err(CalcError::Syntax(format!(
                "unexpected '{}' at position {}",
                char::from(c),
                self.pos
            ))),
            None => Err(CalcError::Syntax("unexpected end of expression".to_string())),
        }
    }

    fn number(&mut self) -> Result<f64, CalcError> {
        let start = self.pos;
        while self.pos < self.input.len()
            && (self.input[self.pos].is_ascii_digit() || self.input[self.pos] == b'.')
        {
            self.pos += 1;
        }
        // The slice holds only ASCII digits and dots.
        let literal = std::str::from_utf8(&self.input[start..self.pos])
            .map_err(|e| CalcError::Syntax(e.to_string()))?;
        literal
            .parse::<f64>()
            .map_err(|_| CalcError::Syntax(format!("invalid number '{literal}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("2+2", 4.0 ; "addition")]
    #[test_case("2 + 3 * 4", 14.0 ; "precedence")]
    #[test_case("(2 + 3) * 4", 20.0 ; "parentheses")]
    #[test_case("(23+45)/2", 34.0 ; "average")]
    #[test_case("-3 + 5", 2.0 ; "unary minus")]
    #[test_case("--3", 3.0 ; "double negation")]
    #[test_case("+7", 7.0 ; "unary plus")]
    #[test_case("10 / 4", 2.5 ; "fractional division")]
    #[test_case(".5 * 4", 2.0 ; "leading dot")]
    #[test_case("8 - 2 - 1", 5.0 ; "left associative subtraction")]
    #[test_case("  1.25  ", 1.25 ; "surrounding whitespace")]
    fn test_evaluate(expr: &str, expected: f64) {
        let value = evaluate(expr).unwrap_or(f64::NAN);
        assert!((value - expected).abs() < 1e-9, "{expr} = {value}");
    }

    #[test_case("2+2; DROP TABLE" ; "sql injection")]
    #[test_case("alert(1)" ; "identifier")]
    #[test_case("2**3" ; "allowed chars but malformed")]
    #[test_case("2^3" ; "caret")]
    #[test_case("1e3" ; "exponent letter")]
    fn test_rejected(expr: &str) {
        assert!(evaluate(expr).is_err());
    }

    #[test]
    fn test_whitelist_checked_first() {
        assert_eq!(evaluate("2+2; DROP TABLE"), Err(CalcError::Disallowed));
        assert_eq!(calculate("2+2; DROP TABLE"), "Error: Only basic math allowed.");
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(evaluate("1/0"), Err(CalcError::DivisionByZero));
        assert_eq!(evaluate("1/(2-2)"), Err(CalcError::DivisionByZero));
        assert!(calculate("1/0").starts_with("Math error"));
    }

    #[test]
    fn test_malformed() {
        assert!(matches!(evaluate("2+"), Err(CalcError::Syntax(_))));
        assert!(matches!(evaluate("(2+3"), Err(CalcError::Syntax(_))));
        assert!(matches!(evaluate("2 3"), Err(CalcError::Syntax(_))));
        assert!(matches!(evaluate("1.2.3"), Err(CalcError::Syntax(_))));
        assert!(matches!(evaluate("()"), Err(CalcError::Syntax(_))));
        assert_eq!(evaluate("   "), Err(CalcError::Empty));
    }

    #[test]
    fn test_deep_nesting_rejected() {
        let expr = format!("{}1{}", "(".repeat(200), ")".repeat(200));
        assert!(matches!(evaluate(&expr), Err(CalcError::Syntax(_))));
    }

    #[test]
    fn test_calculate_formats_integers() {
        assert_eq!(calculate("2+2"), "Calculated Result: 4");
        assert_eq!(calculate("7/2"), "Calculated Result: 3.5");
        assert_eq!(calculate("0 * -1"), "Calculated Result: 0");
    }
}
