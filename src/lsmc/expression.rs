//! Basis-function expression parser.
//!
//! Grammar (whitespace is ignored):
//!
//! ```text
//! expr   := term ('+' term)*
//! term   := factor ('*' factor)*
//! factor := atom ('**' INT)?
//! atom   := 's' | 'x' INT | '1' | '(' term ')'
//! ```
//!
//! `s` is the spot price and `xN` the N-th Markov factor. Parsed expressions and individual
//! monomials are memoized for the life of the process, keyed by their text.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use crate::core::{StorageError, StorageResult};
use crate::lsmc::basis::{MAX_POWER, PowerMonomial};

static EXPRESSION_CACHE: OnceLock<Mutex<HashMap<String, Arc<[PowerMonomial]>>>> = OnceLock::new();
static MONOMIAL_CACHE: OnceLock<Mutex<HashMap<String, PowerMonomial>>> = OnceLock::new();

/// Parses `expression` into one monomial per `+`-separated term.
pub fn parse_basis_functions(expression: &str) -> StorageResult<Arc<[PowerMonomial]>> {
    let cache = EXPRESSION_CACHE.get_or_init(|| Mutex::new(HashMap::new()));
    if let Some(hit) = cache
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get(expression)
    {
        return Ok(Arc::clone(hit));
    }

    let parsed: Arc<[PowerMonomial]> = parse_sum(expression)?.into();
    cache
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(expression.to_string(), Arc::clone(&parsed));
    Ok(parsed)
}

fn parse_sum(expression: &str) -> StorageResult<Vec<PowerMonomial>> {
    if expression.trim().is_empty() {
        return Err(StorageError::Expression {
            message: "expression is empty".to_string(),
            position: 0,
        });
    }
    let mut monomials = Vec::new();
    let mut offset = 0;
    for piece in expression.split('+') {
        let leading = piece.len() - piece.trim_start().len();
        let text = piece.trim();
        if text.is_empty() {
            return Err(StorageError::Expression {
                message: "expected a term".to_string(),
                position: offset + leading,
            });
        }
        monomials.push(parse_monomial(text, offset + leading)?);
        offset += piece.len() + 1;
    }
    Ok(monomials)
}

fn parse_monomial(text: &str, offset: usize) -> StorageResult<PowerMonomial> {
    let cache = MONOMIAL_CACHE.get_or_init(|| Mutex::new(HashMap::new()));
    if let Some(hit) = cache
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get(text)
    {
        return Ok(hit.clone());
    }

    let mut parser = Parser {
        text,
        pos: 0,
        offset,
    };
    let monomial = parser.term()?;
    parser.skip_whitespace();
    if let Some(c) = parser.peek_char() {
        return Err(parser.error(format!("unexpected character '{c}'")));
    }
    cache
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(text.to_string(), monomial.clone());
    Ok(monomial)
}

struct Parser<'a> {
    text: &'a str,
    pos: usize,
    offset: usize,
}

impl Parser<'_> {
    fn error(&self, message: String) -> StorageError {
        StorageError::Expression {
            message,
            position: self.offset + self.pos,
        }
    }

    fn rest(&self) -> &str {
        &self.text[self.pos..]
    }

    fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn term(&mut self) -> StorageResult<PowerMonomial> {
        let mut monomial = self.factor()?;
        loop {
            self.skip_whitespace();
            if self.rest().starts_with("**") {
                return Err(self.error("unexpected '**'".to_string()));
            }
            if !self.rest().starts_with('*') {
                return Ok(monomial);
            }
            self.pos += 1;
            self.skip_whitespace();
            let start = self.pos;
            let factor = self.factor()?;
            monomial = monomial.checked_mul(&factor).ok_or_else(|| {
                self.pos = start;
                self.error(format!("exponent of product exceeds {MAX_POWER}"))
            })?;
        }
    }

    fn factor(&mut self) -> StorageResult<PowerMonomial> {
        let base = self.atom()?;
        self.skip_whitespace();
        if !self.rest().starts_with("**") {
            return Ok(base);
        }
        self.pos += 2;
        self.skip_whitespace();
        let start = self.pos;
        let power = self.integer("exponent")?;
        base.checked_pow(power).ok_or_else(|| {
            self.pos = start;
            self.error(format!("exponent {power} raises a power above {MAX_POWER}"))
        })
    }

    fn atom(&mut self) -> StorageResult<PowerMonomial> {
        self.skip_whitespace();
        match self.peek_char() {
            Some('s') => {
                self.pos += 1;
                Ok(PowerMonomial::spot())
            }
            Some('x') => {
                self.pos += 1;
                let index = self.integer("factor index")?;
                Ok(PowerMonomial::factor(index as usize))
            }
            Some('(') => {
                self.pos += 1;
                let inner = self.term()?;
                self.skip_whitespace();
                if self.peek_char() != Some(')') {
                    return Err(self.error("expected ')'".to_string()));
                }
                self.pos += 1;
                Ok(inner)
            }
            Some(c) if c.is_ascii_digit() => {
                let start = self.pos;
                let value = self.integer("constant")?;
                if value != 1 {
                    self.pos = start;
                    return Err(self.error(format!(
                        "only the constant 1 is allowed, found {value}"
                    )));
                }
                Ok(PowerMonomial::one())
            }
            Some(c) => Err(self.error(format!("unexpected character '{c}'"))),
            None => Err(self.error("unexpected end of expression".to_string())),
        }
    }

    fn integer(&mut self, what: &str) -> StorageResult<u32> {
        let digits = self
            .rest()
            .bytes()
            .take_while(u8::is_ascii_digit)
            .count();
        if digits == 0 {
            return Err(self.error(format!("expected {what}")));
        }
        let literal = &self.rest()[..digits];
        let value = literal
            .parse::<u32>()
            .map_err(|_| self.error(format!("{what} {literal} is too large")))?;
        self.pos += digits;
        Ok(value)
    }
}
