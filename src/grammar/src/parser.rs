//! Pratt parser from tokens to [`Expression`].
//!
//! Lowest to highest precedence: `let`, `or`, `and`, comparisons and tag
//! operators, `+ -`, `* /`, prefix `- ! not`, primaries. All binary
//! operators are left-associative. `let` may only start an expression in a
//! position that accepts any expression (top level, inside brackets, a let
//! value or body); elsewhere it must be parenthesized.

use crate::ast::{BinaryOp, Expression, ExpressionKind, Literal, TagOp, UnaryOp, precedence};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::lexer::tokenize;
use crate::token::{Token, TokenKind};

/// Words that never parse as references
pub const RESERVED: [&str; 6] = ["let", "and", "or", "not", "true", "false"];

pub fn is_reserved(name: &str) -> bool {
    RESERVED.contains(&name)
}

/// Whether `name` lexes as a single non-reserved identifier
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let leading = chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    leading
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
        && !is_reserved(name)
}

/// Input bounds enforced while parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Longest accepted query, in bytes
    pub max_query_length: usize,
    /// Deepest accepted tree; chained operators count one level each
    pub max_nesting_depth: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_query_length: 16 * 1024,
            max_nesting_depth: 128,
        }
    }
}

/// Parse `text` with the default [`Limits`]
pub fn parse(text: &str) -> Result<Expression> {
    parse_with_limits(text, &Limits::default())
}

pub fn parse_with_limits(text: &str, limits: &Limits) -> Result<Expression> {
    if text.len() > limits.max_query_length {
        return Err(Error::parse(
            Context::new(limits.max_query_length, text.len()),
            format!("a query of at most {} bytes", limits.max_query_length),
            format!("{} bytes", text.len()),
        ));
    }

    let expr = Parser::new(tokenize(text)).with_limits(*limits).parse()?;
    log::debug!("Parsed query of {} bytes", text.len());
    Ok(expr)
}

// Binding powers: left is compared against the caller's minimum, right is
// the minimum for the operand that follows.
fn binding_power(level: u8) -> (u8, u8) {
    (level * 2 - 1, level * 2)
}

const PREFIX_BINDING_POWER: u8 = precedence::PREFIX * 2 - 1;

enum Infix {
    Binary(BinaryOp),
    Tag(TagOp),
}

impl Infix {
    fn from_token(kind: &TokenKind) -> Option<Infix> {
        let infix = match kind {
            TokenKind::Plus => Infix::Binary(BinaryOp::Add),
            TokenKind::Minus => Infix::Binary(BinaryOp::Sub),
            TokenKind::Star => Infix::Binary(BinaryOp::Mul),
            TokenKind::Slash => Infix::Binary(BinaryOp::Div),
            TokenKind::EqualEqual => Infix::Binary(BinaryOp::Eq),
            TokenKind::BangEqual => Infix::Binary(BinaryOp::NotEq),
            TokenKind::Less => Infix::Binary(BinaryOp::Less),
            TokenKind::LessEqual => Infix::Binary(BinaryOp::LessEq),
            TokenKind::Greater => Infix::Binary(BinaryOp::Greater),
            TokenKind::GreaterEqual => Infix::Binary(BinaryOp::GreaterEq),
            TokenKind::Identifier(name) if name == "and" => Infix::Binary(BinaryOp::And),
            TokenKind::Identifier(name) if name == "or" => Infix::Binary(BinaryOp::Or),
            TokenKind::Assign => Infix::Tag(TagOp::Equal),
            TokenKind::Match => Infix::Tag(TagOp::Match),
            TokenKind::Caret => Infix::Tag(TagOp::Prefix),
            _ => return None,
        };
        Some(infix)
    }

    fn binding_power(&self) -> (u8, u8) {
        match self {
            Infix::Binary(op) => binding_power(op.precedence()),
            Infix::Tag(_) => binding_power(precedence::COMPARISON),
        }
    }
}

pub struct Parser<I> {
    tokens: I,
    peeked: Option<Token>,
    // End offset of the last consumed token
    end: usize,
    depth: usize,
    limits: Limits,
}

impl<I> Parser<I>
where
    I: Iterator<Item = Result<Token>>,
{
    pub fn new(tokens: I) -> Self {
        Self {
            tokens,
            peeked: None,
            end: 0,
            depth: 0,
            limits: Limits::default(),
        }
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Parse a single expression covering all input
    pub fn parse(mut self) -> Result<Expression> {
        let expr = self.expression(0)?;
        let token = self.next()?;
        if token.kind != TokenKind::Eof {
            return Err(Error::parse(token.context, "end of input", token.kind.to_string()));
        }
        Ok(expr)
    }

    fn fetch(&mut self) -> Result<Token> {
        match self.tokens.next() {
            Some(token) => token,
            None => Ok(Token::new(TokenKind::Eof, Context::at(self.end))),
        }
    }

    fn peek(&mut self) -> Result<&Token> {
        let token = match self.peeked.take() {
            Some(token) => token,
            None => self.fetch()?,
        };
        Ok(self.peeked.insert(token))
    }

    fn next(&mut self) -> Result<Token> {
        let token = match self.peeked.take() {
            Some(token) => token,
            None => self.fetch()?,
        };
        self.end = token.context.end;
        Ok(token)
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token> {
        let token = self.next()?;
        if token.kind != kind {
            return Err(Error::parse(token.context, kind.to_string(), token.kind.to_string()));
        }
        Ok(token)
    }

    /// A non-reserved identifier
    fn name(&mut self, expected: &str) -> Result<(String, Context)> {
        let token = self.next()?;
        match token.kind {
            TokenKind::Identifier(name) if !is_reserved(&name) => Ok((name, token.context)),
            TokenKind::Identifier(name) => Err(Error::parse(
                token.context,
                expected,
                format!("reserved word `{name}`"),
            )),
            other => Err(Error::parse(token.context, expected, other.to_string())),
        }
    }

    /// Count one level of tree height against the nesting limit
    fn descend(&mut self, context: Context) -> Result<()> {
        if self.depth >= self.limits.max_nesting_depth {
            return Err(Error::parse(
                context,
                format!("nesting depth of at most {}", self.limits.max_nesting_depth),
                "deeper nesting",
            ));
        }
        self.depth += 1;
        Ok(())
    }

    fn expression(&mut self, min_bp: u8) -> Result<Expression> {
        let depth = self.depth;
        let context = self.peek()?.context;
        let result = self
            .descend(context)
            .and_then(|()| self.expression_inner(min_bp));
        self.depth = depth;
        result
    }

    fn expression_inner(&mut self, min_bp: u8) -> Result<Expression> {
        let mut left = self.prefix(min_bp)?;

        loop {
            let Some(infix) = Infix::from_token(&self.peek()?.kind) else {
                break;
            };
            let (left_bp, right_bp) = infix.binding_power();
            if left_bp < min_bp {
                break;
            }
            let operator = self.next()?;
            // Each fold deepens the left spine of the tree
            self.descend(operator.context)?;

            left = match infix {
                Infix::Binary(op) => {
                    let right = self.expression(right_bp)?;
                    Expression::binary(op, operator.context, left, right)
                }
                Infix::Tag(op) => {
                    let ExpressionKind::Reference { name } = left.kind else {
                        return Err(Error::parse(
                            left.context,
                            "tag name",
                            format!("`{}`", left.to_repr()),
                        ));
                    };
                    let value = self.expression(right_bp)?;
                    Expression::new(
                        left.context.join(&value.context),
                        ExpressionKind::TagFilter {
                            tag: name,
                            op,
                            value: Box::new(value),
                        },
                    )
                }
            };
        }

        Ok(left)
    }

    fn prefix(&mut self, min_bp: u8) -> Result<Expression> {
        let token = self.next()?;
        let context = token.context;

        let literal = match token.kind {
            TokenKind::Integer(value) => Literal::Integer(value),
            TokenKind::Double(value) => Literal::Double(value),
            TokenKind::Duration(value) => Literal::Duration(value),
            TokenKind::String(value) => Literal::String(value),
            TokenKind::Regex(pattern) => Literal::Regex(pattern),
            TokenKind::Identifier(name) => match name.as_str() {
                "true" => Literal::Boolean(true),
                "false" => Literal::Boolean(false),
                "not" => return self.unary(UnaryOp::Not, context),
                "let" if min_bp == 0 => return self.let_expression(context),
                "let" => {
                    return Err(Error::parse(
                        context,
                        "expression",
                        "`let` (wrap it in parentheses)",
                    ));
                }
                "and" | "or" => {
                    return Err(Error::parse(
                        context,
                        "expression",
                        format!("reserved word `{name}`"),
                    ));
                }
                _ => return self.identifier(name, context),
            },
            TokenKind::Minus => return self.unary(UnaryOp::Negate, context),
            TokenKind::Bang => return self.unary(UnaryOp::Not, context),
            TokenKind::Plus => {
                let (tag, tag_context) = self.name("tag name")?;
                return Ok(Expression::new(
                    context.join(&tag_context),
                    ExpressionKind::HasTag { tag },
                ));
            }
            TokenKind::LParen => {
                let inner = self.expression(0)?;
                let close = self.expect(TokenKind::RParen)?;
                return Ok(Expression::new(
                    context.join(&close.context),
                    ExpressionKind::Group {
                        inner: Box::new(inner),
                    },
                ));
            }
            TokenKind::LBracket => {
                let (items, close) = self.sequence(TokenKind::RBracket)?;
                return Ok(Expression::new(
                    context.join(&close),
                    ExpressionKind::List { items },
                ));
            }
            TokenKind::LBrace => {
                let (filters, close) = self.sequence(TokenKind::RBrace)?;
                return Ok(Expression::new(
                    context.join(&close),
                    ExpressionKind::Selector { key: None, filters },
                ));
            }
            other => return Err(Error::parse(context, "expression", other.to_string())),
        };

        Ok(Expression::literal(context, literal))
    }

    fn unary(&mut self, op: UnaryOp, operator_context: Context) -> Result<Expression> {
        let operand = self.expression(PREFIX_BINDING_POWER)?;
        Ok(Expression::unary(op, operator_context, operand))
    }

    // Reference, call or keyed selector, decided by the next token
    fn identifier(&mut self, name: String, context: Context) -> Result<Expression> {
        let next = &self.peek()?.kind;
        let (is_call, is_selector) = (*next == TokenKind::LParen, *next == TokenKind::LBrace);

        if is_call {
            self.next()?;
            let (args, close) = self.sequence(TokenKind::RParen)?;
            return Ok(Expression::new(
                context.join(&close),
                ExpressionKind::Call { name, args },
            ));
        }

        if is_selector {
            self.next()?;
            let (filters, close) = self.sequence(TokenKind::RBrace)?;
            return Ok(Expression::new(
                context.join(&close),
                ExpressionKind::Selector {
                    key: Some(name),
                    filters,
                },
            ));
        }

        Ok(Expression::reference(context, name))
    }

    fn let_expression(&mut self, context: Context) -> Result<Expression> {
        let (name, _) = self.name("binding name")?;
        self.expect(TokenKind::Assign)?;
        let value = self.expression(0)?;
        self.expect(TokenKind::Semicolon)?;
        let body = self.expression(0)?;

        Ok(Expression::new(
            context.join(&body.context),
            ExpressionKind::Let {
                name,
                value: Box::new(value),
                body: Box::new(body),
            },
        ))
    }

    /// Comma separated expressions up to and including `close`
    fn sequence(&mut self, close: TokenKind) -> Result<(Vec<Expression>, Context)> {
        let mut items = Vec::new();

        if self.peek()?.kind == close {
            let token = self.next()?;
            return Ok((items, token.context));
        }

        loop {
            items.push(self.expression(0)?);

            let token = self.next()?;
            match token.kind {
                TokenKind::Comma => continue,
                kind if kind == close => return Ok((items, token.context)),
                other => {
                    return Err(Error::parse(
                        token.context,
                        format!("`,` or {close}"),
                        other.to_string(),
                    ));
                }
            }
        }
    }
}
