//! Restricted literal parser for `eval` bodies and call arguments.
//!
//! Accepts Python-style literals only: numbers, quoted strings, `True`,
//! `False`, `None`, lists, tuples, sets and dicts, with unary `+`/`-` on
//! numbers. Tuples and sets become arrays; dict keys become strings. There is
//! no name lookup and no operator evaluation.

use crate::{Error, Result};
use serde_json::{Map, Number, Value};

/// Parse a complete literal expression.
///
/// A top-level comma list (`1, 2`) is a tuple, as in Python.
pub fn parse(src: &str) -> Result<Value> {
    let mut parser = Parser::new(src);
    parser.skip_ws();
    if parser.at_end() {
        return Err(parser.error("empty expression"));
    }
    let first = parser.value()?;
    parser.skip_ws();
    let value = if parser.peek() == Some(',') {
        let mut items = vec![first];
        while parser.eat(',') {
            parser.skip_ws();
            if parser.at_end() {
                break;
            }
            items.push(parser.value()?);
            parser.skip_ws();
        }
        Value::Array(items)
    } else {
        first
    };
    parser.skip_ws();
    if !parser.at_end() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(value)
}

/// Coerce a raw argument: a literal if it parses, the trimmed text otherwise.
pub fn coerce(raw: &str) -> Value {
    let trimmed = raw.trim();
    parse(trimmed).unwrap_or_else(|_| Value::String(trimmed.to_string()))
}

struct Parser<'a> {
    src: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            chars: src.chars().collect(),
            pos: 0,
        }
    }

    fn error(&self, msg: &str) -> Error {
        Error::Expression(format!("{} at offset {} in '{}'", msg, self.pos, self.src))
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn value(&mut self) -> Result<Value> {
        self.skip_ws();
        match self.peek() {
            None => Err(self.error("unexpected end of expression")),
            Some('[') => {
                self.bump();
                Ok(Value::Array(self.sequence(']')?))
            }
            Some('(') => self.tuple(),
            Some('{') => self.dict_or_set(),
            Some('\'') | Some('"') => self.strings(),
            Some(c) if c.is_ascii_digit() || c == '.' => self.number(false),
            Some('-') | Some('+') => {
                let negative = self.bump() == Some('-');
                self.skip_ws();
                match self.peek() {
                    Some(c) if c.is_ascii_digit() || c == '.' => self.number(negative),
                    _ => Err(self.error("sign must precede a number")),
                }
            }
            Some(c) if c.is_alphabetic() || c == '_' => self.name_or_prefixed_string(),
            Some(c) => Err(self.error(&format!("unexpected character '{}'", c))),
        }
    }

    /// Comma-separated values up to `close`, trailing comma allowed.
    fn sequence(&mut self, close: char) -> Result<Vec<Value>> {
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.eat(close) {
                return Ok(items);
            }
            items.push(self.value()?);
            self.skip_ws();
            if self.eat(close) {
                return Ok(items);
            }
            if !self.eat(',') {
                return Err(self.error(&format!("expected ',' or '{}'", close)));
            }
        }
    }

    fn tuple(&mut self) -> Result<Value> {
        self.bump();
        self.skip_ws();
        if self.eat(')') {
            return Ok(Value::Array(Vec::new()));
        }
        let first = self.value()?;
        self.skip_ws();
        if self.eat(')') {
            // Parenthesized expression, not a tuple.
            return Ok(first);
        }
        if !self.eat(',') {
            return Err(self.error("expected ',' or ')'"));
        }
        let mut items = vec![first];
        items.extend(self.sequence(')')?);
        Ok(Value::Array(items))
    }

    fn dict_or_set(&mut self) -> Result<Value> {
        self.bump();
        self.skip_ws();
        if self.eat('}') {
            return Ok(Value::Object(Map::new()));
        }
        let first = self.value()?;
        self.skip_ws();
        if !self.eat(':') {
            // Set literal.
            let mut items = vec![first];
            if !self.eat('}') {
                if !self.eat(',') {
                    return Err(self.error("expected ',' or '}'"));
                }
                items.extend(self.sequence('}')?);
            }
            let mut unique: Vec<Value> = Vec::with_capacity(items.len());
            for item in items {
                if !unique.contains(&item) {
                    unique.push(item);
                }
            }
            return Ok(Value::Array(unique));
        }

        let mut map = Map::new();
        let mut key = first;
        loop {
            let value = self.value()?;
            map.insert(key_string(&key)?, value);
            self.skip_ws();
            if self.eat('}') {
                return Ok(Value::Object(map));
            }
            if !self.eat(',') {
                return Err(self.error("expected ',' or '}'"));
            }
            self.skip_ws();
            if self.eat('}') {
                return Ok(Value::Object(map));
            }
            key = self.value()?;
            self.skip_ws();
            if !self.eat(':') {
                return Err(self.error("expected ':' in dict"));
            }
        }
    }

    /// One or more adjacent string literals, concatenated.
    fn strings(&mut self) -> Result<Value> {
        let mut out = self.string(false)?;
        loop {
            let save = self.pos;
            self.skip_ws();
            match self.peek() {
                Some('\'') | Some('"') => out.push_str(&self.string(false)?),
                _ => {
                    self.pos = save;
                    return Ok(Value::String(out));
                }
            }
        }
    }

    fn string(&mut self, raw: bool) -> Result<String> {
        let quote = self
            .bump()
            .ok_or_else(|| self.error("expected string"))?;
        let mut out = String::new();
        loop {
            let c = self
                .bump()
                .ok_or_else(|| self.error("unterminated string"))?;
            if c == quote {
                return Ok(out);
            }
            if c != '\\' {
                out.push(c);
                continue;
            }
            let escaped = self
                .bump()
                .ok_or_else(|| self.error("unterminated escape"))?;
            if raw {
                out.push('\\');
                out.push(escaped);
                continue;
            }
            match escaped {
                'n' => out.push('\n'),
                't' => out.push('\t'),
                'r' => out.push('\r'),
                '0' => out.push('\0'),
                '\\' => out.push('\\'),
                '\'' => out.push('\''),
                '"' => out.push('"'),
                '\n' => {}
                'x' => out.push(self.hex_escape(2)?),
                'u' => out.push(self.hex_escape(4)?),
                'U' => out.push(self.hex_escape(8)?),
                other => {
                    out.push('\\');
                    out.push(other);
                }
            }
        }
    }

    fn hex_escape(&mut self, digits: usize) -> Result<char> {
        let mut code = 0u32;
        for _ in 0..digits {
            let d = self
                .bump()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| self.error("invalid hex escape"))?;
            code = code * 16 + d;
        }
        char::from_u32(code).ok_or_else(|| self.error("invalid unicode escape"))
    }

    fn number(&mut self, negative: bool) -> Result<Value> {
        if self.peek() == Some('0') && matches!(self.peek_at(1), Some('x') | Some('X')) {
            self.pos += 2;
            let start = self.pos;
            while matches!(self.peek(), Some(c) if c.is_ascii_hexdigit() || c == '_') {
                self.pos += 1;
            }
            let digits: String = self.chars[start..self.pos]
                .iter()
                .filter(|c| **c != '_')
                .collect();
            let n = i64::from_str_radix(&digits, 16)
                .map_err(|_| self.error("invalid hex literal"))?;
            return Ok(Value::from(if negative { -n } else { n }));
        }

        let start = self.pos;
        let mut is_float = false;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || c == '_' {
                self.pos += 1;
            } else if c == '.' && !is_float {
                is_float = true;
                self.pos += 1;
            } else if c == 'e' || c == 'E' {
                is_float = true;
                self.pos += 1;
                if matches!(self.peek(), Some('+') | Some('-')) {
                    self.pos += 1;
                }
            } else {
                break;
            }
        }
        let text: String = self.chars[start..self.pos]
            .iter()
            .filter(|c| **c != '_')
            .collect();
        if text == "." {
            return Err(self.error("invalid number"));
        }

        if !is_float {
            if let Ok(n) = text.parse::<i64>() {
                return Ok(Value::from(if negative { -n } else { n }));
            }
        }
        let f = text
            .parse::<f64>()
            .map_err(|_| self.error(&format!("invalid number '{}'", text)))?;
        let f = if negative { -f } else { f };
        Number::from_f64(f)
            .map(Value::Number)
            .ok_or_else(|| self.error("number is not finite"))
    }

    fn name_or_prefixed_string(&mut self) -> Result<Value> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
            self.pos += 1;
        }
        let name: String = self.chars[start..self.pos].iter().collect();

        if matches!(self.peek(), Some('\'') | Some('"')) {
            let lower = name.to_ascii_lowercase();
            if matches!(lower.as_str(), "r" | "u" | "b" | "br" | "rb") {
                let raw = lower.contains('r');
                return Ok(Value::String(self.string(raw)?));
            }
        }

        match name.as_str() {
            "True" => Ok(Value::Bool(true)),
            "False" => Ok(Value::Bool(false)),
            "None" => Ok(Value::Null),
            _ => {
                self.pos = start;
                Err(self.error(&format!("'{}' is not a literal", name)))
            }
        }
    }
}

fn key_string(key: &Value) -> Result<String> {
    match key {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(true) => Ok("True".into()),
        Value::Bool(false) => Ok("False".into()),
        Value::Null => Ok("None".into()),
        _ => Err(Error::Expression(format!("unhashable dict key: {}", key))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalars() {
        assert_eq!(parse("42").unwrap(), json!(42));
        assert_eq!(parse("-7").unwrap(), json!(-7));
        assert_eq!(parse("3.5").unwrap(), json!(3.5));
        assert_eq!(parse(".5").unwrap(), json!(0.5));
        assert_eq!(parse("1e3").unwrap(), json!(1000.0));
        assert_eq!(parse("1_000").unwrap(), json!(1000));
        assert_eq!(parse("0xff").unwrap(), json!(255));
        assert_eq!(parse("True").unwrap(), json!(true));
        assert_eq!(parse("False").unwrap(), json!(false));
        assert_eq!(parse("None").unwrap(), Value::Null);
    }

    #[test]
    fn test_strings() {
        assert_eq!(parse("'hello'").unwrap(), json!("hello"));
        assert_eq!(parse("\"it's\"").unwrap(), json!("it's"));
        assert_eq!(parse(r"'a\nb'").unwrap(), json!("a\nb"));
        assert_eq!(parse(r"'\x41é'").unwrap(), json!("Aé"));
        assert_eq!(parse(r"r'\d+'").unwrap(), json!(r"\d+"));
        assert_eq!(parse("'con' 'cat'").unwrap(), json!("concat"));
        assert_eq!(parse("u'text'").unwrap(), json!("text"));
    }

    #[test]
    fn test_containers() {
        assert_eq!(parse("[1, 2, 3]").unwrap(), json!([1, 2, 3]));
        assert_eq!(parse("[1, [2, 'x'],]").unwrap(), json!([1, [2, "x"]]));
        assert_eq!(parse("(1, 2)").unwrap(), json!([1, 2]));
        assert_eq!(parse("(1,)").unwrap(), json!([1]));
        assert_eq!(parse("(1)").unwrap(), json!(1));
        assert_eq!(parse("()").unwrap(), json!([]));
        assert_eq!(parse("{}").unwrap(), json!({}));
        assert_eq!(
            parse("{'a': 1, 2: [True, None]}").unwrap(),
            json!({"a": 1, "2": [true, null]})
        );
        assert_eq!(parse("{1, 2, 2}").unwrap(), json!([1, 2]));
    }

    #[test]
    fn test_top_level_tuple() {
        assert_eq!(parse("1, 'two'").unwrap(), json!([1, "two"]));
    }

    #[test]
    fn test_rejects_code() {
        assert!(parse("__import__('os')").is_err());
        assert!(parse("1 + 2").is_err());
        assert!(parse("open").is_err());
        assert!(parse("").is_err());
        assert!(parse("[1, 2").is_err());
        assert!(parse("'unterminated").is_err());
        assert!(parse("-'x'").is_err());
    }

    #[test]
    fn test_error_kind() {
        let err = parse("[1,,]").unwrap_err();
        assert!(matches!(err, Error::Expression(_)));
    }

    #[test]
    fn test_coerce_falls_back_to_raw() {
        assert_eq!(coerce(" 12 "), json!(12));
        assert_eq!(coerce(" hello world "), json!("hello world"));
        assert_eq!(coerce("'quoted'"), json!("quoted"));
        assert_eq!(coerce("user@example.com"), json!("user@example.com"));
    }
}
