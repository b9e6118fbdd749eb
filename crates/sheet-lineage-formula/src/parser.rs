//! Formula parser
//!
//! The text is first cut into tokens, then read by precedence climbing.
//! Only the subset the evaluator understands is accepted: literals, cell
//! and range references (optionally sheet-qualified), arithmetic,
//! comparison, `&` and function calls. Unary minus binds tighter than `^`,
//! so `-2^2` is 4.

use std::iter::Peekable;
use std::str::CharIndices;

use lazy_regex::{lazy_regex, Lazy, Regex};

use crate::ast::{BinaryOperator, CellReference, FormulaExpr, RangeReference};
use crate::error::{FormulaError, FormulaResult};
use sheet_lineage_core::{CellAddress, CellError, CellRange};

/// `A1`, `$A$1`, `xfd1048576`; bounds are checked when the address is parsed
static CELL_TOKEN: Lazy<Regex> = lazy_regex!(r"^\$?[A-Za-z]+\$?[0-9]+$");

/// Parse a formula string into an AST.
///
/// The leading `=` is optional so that bare sub-expressions such as
/// `ROW()+1` taken out of a larger formula parse the same way.
///
/// ```rust
/// use sheet_lineage_formula::parse_formula;
///
/// assert!(parse_formula("=1+2").is_ok());
/// assert!(parse_formula("=SUM(A1:A10)").is_ok());
/// assert!(parse_formula("VLOOKUP(B2,'Rates 2024'!A1:C9,3,FALSE)").is_ok());
/// assert!(parse_formula("=SUM(A1").is_err());
/// ```
pub fn parse_formula(formula: &str) -> FormulaResult<FormulaExpr> {
    let formula = formula.trim();
    let body = formula.strip_prefix('=').unwrap_or(formula);

    let mut parser = Parser {
        tokens: tokenize(body)?,
        pos: 0,
    };
    let expr = parser.expression(0)?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(parse_error(format!(
            "unexpected {:?} after expression in '{}'",
            token, formula
        ))),
    }
}

fn parse_error(message: impl Into<String>) -> FormulaError {
    FormulaError::Parse(message.into())
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Text(String),
    Error(CellError),
    /// Function name, cell, boolean or defined name; told apart by the parser
    Word(String),
    /// Sheet prefix with any `[book]` part, quotes removed, `!` consumed
    Sheet(String),
    Op(BinaryOperator),
    Percent,
    Colon,
    Comma,
    Open,
    Close,
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '.')
}

fn is_error_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '!' | '/' | '?' | '_')
}

struct Lexer<'a> {
    text: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> Lexer<'a> {
    /// Consume the next char if it is `want`
    fn eat(&mut self, want: char) -> bool {
        self.chars.next_if(|&(_, c)| c == want).is_some()
    }

    /// Consume chars while `pred` holds, returning the end offset
    fn eat_while(&mut self, pred: impl Fn(char) -> bool) -> usize {
        while self.chars.next_if(|&(_, c)| pred(c)).is_some() {}
        self.offset()
    }

    fn offset(&mut self) -> usize {
        self.chars.peek().map_or(self.text.len(), |&(i, _)| i)
    }

    /// Body of a `q`-quoted run whose opening quote is consumed; a doubled
    /// quote stands for one
    fn quoted(&mut self, q: char) -> FormulaResult<String> {
        let mut out = String::new();
        loop {
            match self.chars.next() {
                Some((_, c)) if c == q => {
                    if !self.eat(q) {
                        return Ok(out);
                    }
                    out.push(q);
                }
                Some((_, c)) => out.push(c),
                None => return Err(parse_error(format!("unterminated {} quote", q))),
            }
        }
    }

    fn number(&mut self, start: usize) -> FormulaResult<Token> {
        self.eat_while(|c| c.is_ascii_digit());
        if self.eat('.') {
            self.eat_while(|c| c.is_ascii_digit());
        }
        if self.eat('e') || self.eat('E') {
            let _ = self.eat('+') || self.eat('-');
            self.eat_while(|c| c.is_ascii_digit());
        }
        let end = self.offset();
        let source = self.text;
        let text = &source[start..end];
        text.parse()
            .map(Token::Number)
            .map_err(|_| parse_error(format!("bad number '{}'", text)))
    }

    fn word(&mut self, start: usize) -> FormulaResult<Token> {
        if self.text[start..].starts_with('[') {
            self.eat_while(|c| c != ']');
            if !self.eat(']') {
                return Err(parse_error("unterminated workbook prefix"));
            }
        }
        let end = self.eat_while(is_word_char);
        let source = self.text;
        let text = &source[start..end];
        if self.eat('!') {
            Ok(Token::Sheet(text.to_string()))
        } else if text.starts_with('[') {
            let message = format!("workbook prefix '{}' without a sheet", text);
            Err(parse_error(message))
        } else {
            Ok(Token::Word(text.to_string()))
        }
    }

    fn error_constant(&mut self, start: usize) -> FormulaResult<Token> {
        let end = self.eat_while(is_error_char);
        let source = self.text;
        let text = &source[start..end];
        CellError::parse(text)
            .map(Token::Error)
            .ok_or_else(|| parse_error(format!("unknown error constant '{}'", text)))
    }

    fn next_token(&mut self) -> Option<FormulaResult<Token>> {
        self.eat_while(char::is_whitespace);
        let (start, c) = self.chars.next()?;

        let op = |op| -> FormulaResult<Token> { Ok(Token::Op(op)) };
        let token = match c {
            '+' => op(BinaryOperator::Add),
            '-' => op(BinaryOperator::Sub),
            '*' => op(BinaryOperator::Mul),
            '/' => op(BinaryOperator::Div),
            '^' => op(BinaryOperator::Pow),
            '&' => op(BinaryOperator::Concat),
            '=' => op(BinaryOperator::Eq),
            '<' if self.eat('=') => op(BinaryOperator::Le),
            '<' if self.eat('>') => op(BinaryOperator::Ne),
            '<' => op(BinaryOperator::Lt),
            '>' if self.eat('=') => op(BinaryOperator::Ge),
            '>' => op(BinaryOperator::Gt),
            '%' => Ok(Token::Percent),
            ':' => Ok(Token::Colon),
            ',' => Ok(Token::Comma),
            '(' => Ok(Token::Open),
            ')' => Ok(Token::Close),
            '"' => self.quoted('"').map(Token::Text),
            '\'' => self.quoted('\'').and_then(|sheet| {
                if self.eat('!') {
                    Ok(Token::Sheet(sheet))
                } else {
                    let message = format!("quoted name '{}' is not a sheet", sheet);
                    Err(parse_error(message))
                }
            }),
            '#' => self.error_constant(start),
            c if c.is_ascii_digit() || c == '.' => self.number(start),
            c if c.is_ascii_alphabetic() || matches!(c, '_' | '$' | '[') => self.word(start),
            other => Err(parse_error(format!("unexpected character '{}'", other))),
        };
        Some(token)
    }
}

fn tokenize(text: &str) -> FormulaResult<Vec<Token>> {
    let mut lexer = Lexer {
        text,
        chars: text.char_indices().peekable(),
    };
    std::iter::from_fn(|| lexer.next_token()).collect()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn eat(&mut self, want: &Token) -> bool {
        if self.peek() == Some(want) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, want: Token) -> FormulaResult<()> {
        if self.eat(&want) {
            Ok(())
        } else {
            let message = format!("expected {:?}, found {:?}", want, self.peek());
            Err(parse_error(message))
        }
    }

    /// Binary operators binding at least as tight as `min_precedence`
    fn expression(&mut self, min_precedence: u8) -> FormulaResult<FormulaExpr> {
        let mut left = self.prefix()?;

        while let Some(&Token::Op(op)) = self.peek() {
            if op.precedence() < min_precedence {
                break;
            }
            self.pos += 1;
            let next = if op.is_right_associative() {
                op.precedence()
            } else {
                op.precedence() + 1
            };
            let right = self.expression(next)?;
            left = FormulaExpr::binary(op, left, right);
        }

        Ok(left)
    }

    /// Unary `-`/`+`, then the operand with any trailing `%`
    fn prefix(&mut self) -> FormulaResult<FormulaExpr> {
        if self.eat(&Token::Op(BinaryOperator::Sub)) {
            return Ok(FormulaExpr::Negate(Box::new(self.prefix()?)));
        }
        if self.eat(&Token::Op(BinaryOperator::Add)) {
            return self.prefix();
        }

        let mut expr = self.range()?;
        while self.eat(&Token::Percent) {
            expr = FormulaExpr::Percent(Box::new(expr));
        }
        Ok(expr)
    }

    /// A primary, or two cell references joined by `:`
    fn range(&mut self) -> FormulaResult<FormulaExpr> {
        let first = self.primary()?;
        if !self.eat(&Token::Colon) {
            return Ok(first);
        }

        match (first, self.primary()?) {
            (FormulaExpr::Cell(start), FormulaExpr::Cell(end)) => {
                // Sheet2!A1:B3 - the end inherits the start's sheet
                let sheet = match (start.sheet, end.sheet) {
                    (sheet, None) => sheet,
                    (a, b) if a == b => a,
                    _ => return Err(parse_error("range ends on different sheets")),
                };
                Ok(FormulaExpr::Range(RangeReference {
                    sheet,
                    range: CellRange::new(start.address, end.address),
                }))
            }
            _ => Err(parse_error("':' needs a cell reference on both sides")),
        }
    }

    fn primary(&mut self) -> FormulaResult<FormulaExpr> {
        match self.bump() {
            Some(Token::Number(n)) => Ok(FormulaExpr::Number(n)),
            Some(Token::Text(s)) => Ok(FormulaExpr::Text(s)),
            Some(Token::Error(e)) => Ok(FormulaExpr::Error(e)),
            Some(Token::Open) => {
                let inner = self.expression(0)?;
                self.expect(Token::Close)?;
                Ok(inner)
            }
            Some(Token::Sheet(sheet)) => match self.bump() {
                Some(Token::Word(word)) if CELL_TOKEN.is_match(&word) => cell(Some(sheet), &word),
                other => Err(parse_error(format!(
                    "expected a cell after '{}!', found {:?}",
                    sheet, other
                ))),
            },
            Some(Token::Word(word)) => {
                if self.peek() == Some(&Token::Open) {
                    self.call(word)
                } else if word.eq_ignore_ascii_case("TRUE") {
                    Ok(FormulaExpr::Boolean(true))
                } else if word.eq_ignore_ascii_case("FALSE") {
                    Ok(FormulaExpr::Boolean(false))
                } else if CELL_TOKEN.is_match(&word) {
                    cell(None, &word)
                } else {
                    Ok(FormulaExpr::Name(word))
                }
            }
            other => Err(parse_error(format!("expected a value, found {:?}", other))),
        }
    }

    fn call(&mut self, name: String) -> FormulaResult<FormulaExpr> {
        self.expect(Token::Open)?;
        let mut args = Vec::new();
        if !self.eat(&Token::Close) {
            loop {
                args.push(self.expression(0)?);
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
            self.expect(Token::Close)?;
        }
        Ok(FormulaExpr::Call {
            name: name.to_uppercase(),
            args,
        })
    }
}

fn cell(sheet: Option<String>, text: &str) -> FormulaResult<FormulaExpr> {
    let address = CellAddress::parse(text)
        .map_err(|e| parse_error(format!("bad cell reference '{}': {}", text, e)))?;
    Ok(FormulaExpr::Cell(CellReference { sheet, address }))
}
