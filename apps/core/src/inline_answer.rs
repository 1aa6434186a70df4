use std::sync::OnceLock;

use regex::Regex;

const MAX_FRACTION_DIGITS: i32 = 3;
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// A computed answer shown in place of the result list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum InlineAnswer {
    #[default]
    None,
    Calculator(String),
}

impl InlineAnswer {
    pub fn is_some(&self) -> bool {
        !matches!(self, Self::None)
    }

    pub fn calculator_value(&self) -> Option<&str> {
        match self {
            Self::Calculator(value) => Some(value),
            Self::None => None,
        }
    }
}

/// Recomputed on every query change; cheap and free of I/O.
pub fn evaluate(text: &str) -> InlineAnswer {
    let trimmed = text.trim();
    if trimmed.is_empty() || !trimmed.chars().all(is_calculator_char) {
        return InlineAnswer::None;
    }

    match evaluate_expression(trimmed) {
        Some(value) => InlineAnswer::Calculator(format_grouped(value)),
        None => InlineAnswer::None,
    }
}

/// Evaluates `text` as arithmetic. `None` for malformed input or a
/// non-finite result.
pub fn evaluate_expression(text: &str) -> Option<f64> {
    let tokens = tokenize(text)?;
    let mut parser = Parser {
        tokens: &tokens,
        position: 0,
    };
    let value = parser.expression()?;
    if parser.position != tokens.len() {
        return None;
    }
    value.is_finite().then_some(value)
}

/// Submit-time fallback for a query that looks like a web address. Bare
/// hosts get an `https://` scheme.
pub fn resolve_url_shortcut(text: &str) -> Option<String> {
    let trimmed = text.trim();
    let captures = url_pattern()?.captures(trimmed)?;
    if captures.name("scheme").is_some() {
        Some(trimmed.to_string())
    } else {
        Some(format!("https://{trimmed}"))
    }
}

fn url_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(
                r"(?i)^(?:(?P<scheme>https?)://)?(?:(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)+[a-z]{2,}|localhost)(?::\d{1,5})?(?:[/?#]\S*)?$",
            )
            .ok()
        })
        .as_ref()
}

fn is_calculator_char(c: char) -> bool {
    c.is_ascii_digit()
        || c.is_whitespace()
        || matches!(c, '+' | '-' | '*' | '/' | '(' | ')' | '.' | '^' | '%')
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Number(f64),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    Open,
    Close,
}

fn tokenize(text: &str) -> Option<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        let token = match c {
            c if c.is_whitespace() => continue,
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '%' => Token::Percent,
            '^' => Token::Caret,
            '(' => Token::Open,
            ')' => Token::Close,
            '0'..='9' | '.' => {
                let mut end = start + c.len_utf8();
                while let Some(&(index, next)) = chars.peek() {
                    if next.is_ascii_digit() || next == '.' {
                        end = index + next.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let literal = &text[start..end];
                if literal == "." || literal.matches('.').count() > 1 {
                    return None;
                }
                Token::Number(literal.parse().ok()?)
            }
            _ => return None,
        };
        tokens.push(token);
    }

    Some(tokens)
}

struct Parser<'a> {
    tokens: &'a [Token],
    position: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.position).copied()
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.peek()?;
        self.position += 1;
        Some(token)
    }

    fn expression(&mut self) -> Option<f64> {
        let mut value = self.term()?;
        while let Some(token @ (Token::Plus | Token::Minus)) = self.peek() {
            self.position += 1;
            let rhs = self.term()?;
            value = if token == Token::Plus {
                value + rhs
            } else {
                value - rhs
            };
        }
        Some(value)
    }

    fn term(&mut self) -> Option<f64> {
        let mut value = self.unary()?;
        while let Some(token @ (Token::Star | Token::Slash | Token::Percent)) = self.peek() {
            self.position += 1;
            let rhs = self.unary()?;
            value = match token {
                Token::Star => value * rhs,
                Token::Slash => value / rhs,
                _ => value % rhs,
            };
        }
        Some(value)
    }

    fn unary(&mut self) -> Option<f64> {
        match self.peek()? {
            Token::Minus => {
                self.position += 1;
                Some(-self.unary()?)
            }
            Token::Plus => {
                self.position += 1;
                self.unary()
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Option<f64> {
        let base = self.atom()?;
        if self.peek() == Some(Token::Caret) {
            self.position += 1;
            let exponent = self.unary()?;
            return Some(base.powf(exponent));
        }
        Some(base)
    }

    fn atom(&mut self) -> Option<f64> {
        match self.advance()? {
            Token::Number(value) => Some(value),
            Token::Open => {
                let value = self.expression()?;
                (self.advance()? == Token::Close).then_some(value)
            }
            _ => None,
        }
    }
}

/// en-US style: comma thousands separators, at most three fraction digits.
pub fn format_grouped(value: f64) -> String {
    let scale = 10_f64.powi(MAX_FRACTION_DIGITS);
    let scaled = value * scale;
    // Past 2^53 there are no fraction digits left to round away.
    let rounded = if value.abs() < MAX_EXACT_INTEGER && scaled.is_finite() {
        scaled.round() / scale
    } else {
        value
    };
    if rounded == 0.0 {
        return "0".to_string();
    }

    let fixed = format!("{:.*}", MAX_FRACTION_DIGITS as usize, rounded.abs());
    let (integer, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let fraction = fraction.trim_end_matches('0');

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3 + 2);
    if rounded < 0.0 {
        grouped.push('-');
    }
    for (index, digit) in integer.chars().enumerate() {
        if index > 0 && (integer.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    if !fraction.is_empty() {
        grouped.push('.');
        grouped.push_str(fraction);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::{evaluate, evaluate_expression, format_grouped, resolve_url_shortcut, InlineAnswer};

    #[test]
    fn evaluates_with_standard_precedence() {
        assert_eq!(evaluate("2 + 2*2"), InlineAnswer::Calculator("6".to_string()));
        assert_eq!(evaluate("(2 + 2) * 2"), InlineAnswer::Calculator("8".to_string()));
        assert_eq!(evaluate("2^3^2"), InlineAnswer::Calculator("512".to_string()));
        assert_eq!(evaluate("-2^2"), InlineAnswer::Calculator("-4".to_string()));
        assert_eq!(evaluate("10 % 4"), InlineAnswer::Calculator("2".to_string()));
        assert_eq!(evaluate("1 / 3"), InlineAnswer::Calculator("0.333".to_string()));
    }

    #[test]
    fn incomplete_or_foreign_input_yields_none() {
        assert_eq!(evaluate("2 + "), InlineAnswer::None);
        assert_eq!(evaluate("(1 + 2"), InlineAnswer::None);
        assert_eq!(evaluate("1..2 + 1"), InlineAnswer::None);
        assert_eq!(evaluate("report 2024"), InlineAnswer::None);
        assert_eq!(evaluate(""), InlineAnswer::None);
    }

    #[test]
    fn lone_numbers_are_answers_too() {
        assert_eq!(evaluate("2024"), InlineAnswer::Calculator("2,024".to_string()));
        assert_eq!(evaluate("-5"), InlineAnswer::Calculator("-5".to_string()));
        assert_eq!(evaluate("(7)"), InlineAnswer::Calculator("7".to_string()));
    }

    #[test]
    fn huge_finite_results_are_not_shown_as_infinity() {
        assert_eq!(evaluate_expression("10^306"), Some(1e306));
        let answer = evaluate("10^306");
        let value = answer.calculator_value().unwrap();
        assert!(value.starts_with("1,000,"));
        assert!(!value.contains("inf"));
        assert_eq!(format_grouped(1e16), "10,000,000,000,000,000");
    }

    #[test]
    fn non_finite_results_yield_none() {
        assert_eq!(evaluate_expression("1 / 0"), None);
        assert_eq!(evaluate_expression("0 / 0"), None);
        assert_eq!(evaluate("5 % 0"), InlineAnswer::None);
    }

    #[test]
    fn formats_with_grouping() {
        assert_eq!(format_grouped(1234567.0), "1,234,567");
        assert_eq!(format_grouped(-1234.5), "-1,234.5");
        assert_eq!(format_grouped(999.9996), "1,000");
        assert_eq!(format_grouped(-0.0001), "0");
        assert_eq!(evaluate("1000 * 1000"), InlineAnswer::Calculator("1,000,000".to_string()));
    }

    #[test]
    fn url_shortcut_adds_https_to_bare_hosts() {
        assert_eq!(
            resolve_url_shortcut("github.com/rust-lang"),
            Some("https://github.com/rust-lang".to_string())
        );
        assert_eq!(
            resolve_url_shortcut(" http://localhost:8080/health "),
            Some("http://localhost:8080/health".to_string())
        );
        assert_eq!(resolve_url_shortcut("quarterly report"), None);
        assert_eq!(resolve_url_shortcut("notes"), None);
    }
}
