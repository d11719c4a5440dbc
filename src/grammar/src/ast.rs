//! Syntax tree produced by the parser.
//!
//! Nodes own their children and are never mutated after parsing. Consumers
//! walk the tree through [`Visitor`] rather than matching on
//! [`ExpressionKind`] themselves.

use std::fmt;

use serde::Serialize;

use crate::context::Context;
use crate::duration::Duration;
use crate::error::Result;
use crate::eval::Evaluator;
use crate::render::Renderer;
use crate::scope::Scope;
use crate::value::Value;
use crate::visitor::Visitor;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Literal {
    Integer(i64),
    Double(f64),
    Duration(Duration),
    String(String),
    /// Pattern of an `r"..."` literal, validated by the lexer
    Regex(String),
    Boolean(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    NotEq,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::Less => "<",
            Self::LessEq => "<=",
            Self::Greater => ">",
            Self::GreaterEq => ">=",
            Self::And => "and",
            Self::Or => "or",
        }
    }

    /// Binding strength, higher binds tighter
    pub fn precedence(&self) -> u8 {
        match self {
            Self::Or => precedence::OR,
            Self::And => precedence::AND,
            Self::Eq
            | Self::NotEq
            | Self::Less
            | Self::LessEq
            | Self::Greater
            | Self::GreaterEq => precedence::COMPARISON,
            Self::Add | Self::Sub => precedence::ADDITIVE,
            Self::Mul | Self::Div => precedence::MULTIPLICATIVE,
        }
    }

    pub fn is_comparison(&self) -> bool {
        self.precedence() == precedence::COMPARISON
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    /// `-`
    Negate,
    /// `!` or `not`
    Not,
}

impl UnaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Negate => "-",
            Self::Not => "!",
        }
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Operators that filter on a tag value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TagOp {
    /// `tag = value`
    Equal,
    /// `tag =~ pattern`
    Match,
    /// `tag ^ prefix`
    Prefix,
}

impl TagOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Equal => "=",
            Self::Match => "=~",
            Self::Prefix => "^",
        }
    }
}

impl fmt::Display for TagOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Precedence levels shared by the parser and the renderer
pub mod precedence {
    pub const LET: u8 = 0;
    pub const OR: u8 = 1;
    pub const AND: u8 = 2;
    /// Comparisons and tag operators
    pub const COMPARISON: u8 = 3;
    pub const ADDITIVE: u8 = 4;
    pub const MULTIPLICATIVE: u8 = 5;
    pub const PREFIX: u8 = 6;
    pub const PRIMARY: u8 = 7;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Expression {
    pub context: Context,
    pub kind: ExpressionKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum ExpressionKind {
    Literal(Literal),
    Reference {
        name: String,
    },
    List {
        items: Vec<Expression>,
    },
    Binary {
        op: BinaryOp,
        operator_context: Context,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Unary {
        op: UnaryOp,
        operator_context: Context,
        operand: Box<Expression>,
    },
    /// Explicit parentheses
    Group {
        inner: Box<Expression>,
    },
    Call {
        name: String,
        args: Vec<Expression>,
    },
    /// `let name = value; body`
    Let {
        name: String,
        value: Box<Expression>,
        body: Box<Expression>,
    },
    TagFilter {
        tag: String,
        op: TagOp,
        value: Box<Expression>,
    },
    /// `+tag`
    HasTag {
        tag: String,
    },
    /// `key{f, ...}` or `{f, ...}`
    Selector {
        key: Option<String>,
        filters: Vec<Expression>,
    },
}

impl Expression {
    pub fn new(context: Context, kind: ExpressionKind) -> Self {
        Self { context, kind }
    }

    pub fn literal(context: Context, literal: Literal) -> Self {
        Self::new(context, ExpressionKind::Literal(literal))
    }

    pub fn reference(context: Context, name: impl Into<String>) -> Self {
        Self::new(context, ExpressionKind::Reference { name: name.into() })
    }

    /// Binary node spanning both operands
    pub fn binary(op: BinaryOp, operator_context: Context, left: Expression, right: Expression) -> Self {
        Self::new(
            left.context.join(&right.context),
            ExpressionKind::Binary {
                op,
                operator_context,
                left: Box::new(left),
                right: Box::new(right),
            },
        )
    }

    /// Unary node spanning the operator and its operand
    pub fn unary(op: UnaryOp, operator_context: Context, operand: Expression) -> Self {
        Self::new(
            operator_context.join(&operand.context),
            ExpressionKind::Unary {
                op,
                operator_context,
                operand: Box::new(operand),
            },
        )
    }

    pub fn context(&self) -> Context {
        self.context
    }

    /// Dispatch to the visitor method for this node
    pub fn visit<V: Visitor + ?Sized>(&self, visitor: &mut V) -> V::Output {
        match &self.kind {
            ExpressionKind::Literal(literal) => visitor.visit_literal(self, literal),
            ExpressionKind::Reference { name } => visitor.visit_reference(self, name),
            ExpressionKind::List { items } => visitor.visit_list(self, items),
            ExpressionKind::Binary {
                op,
                operator_context,
                left,
                right,
            } => visitor.visit_binary(self, *op, *operator_context, left, right),
            ExpressionKind::Unary {
                op,
                operator_context,
                operand,
            } => visitor.visit_unary(self, *op, *operator_context, operand),
            ExpressionKind::Group { inner } => visitor.visit_group(self, inner),
            ExpressionKind::Call { name, args } => visitor.visit_call(self, name, args),
            ExpressionKind::Let { name, value, body } => visitor.visit_let(self, name, value, body),
            ExpressionKind::TagFilter { tag, op, value } => {
                visitor.visit_tag_filter(self, tag, *op, value)
            }
            ExpressionKind::HasTag { tag } => visitor.visit_has_tag(self, tag),
            ExpressionKind::Selector { key, filters } => {
                visitor.visit_selector(self, key.as_deref(), filters)
            }
        }
    }

    /// Evaluate against `scope`
    pub fn eval(&self, scope: &Scope<'_>) -> Result<Value> {
        self.visit(&mut Evaluator::new(scope))
    }

    /// Query text that parses back to an equivalent tree
    pub fn to_repr(&self) -> String {
        self.visit(&mut Renderer)
    }

    /// Precedence of the node as seen by an enclosing operator
    pub fn precedence(&self) -> u8 {
        match &self.kind {
            ExpressionKind::Let { .. } => precedence::LET,
            ExpressionKind::Binary { op, .. } => op.precedence(),
            ExpressionKind::TagFilter { .. } => precedence::COMPARISON,
            ExpressionKind::Unary { .. } => precedence::PREFIX,
            _ => precedence::PRIMARY,
        }
    }

    /// Structural equality, ignoring every context
    pub fn same_shape(&self, other: &Expression) -> bool {
        use ExpressionKind::*;

        match (&self.kind, &other.kind) {
            (Literal(a), Literal(b)) => a == b,
            (Reference { name: a }, Reference { name: b }) => a == b,
            (List { items: a }, List { items: b }) => all_same_shape(a, b),
            (
                Binary {
                    op: op_a,
                    left: left_a,
                    right: right_a,
                    ..
                },
                Binary {
                    op: op_b,
                    left: left_b,
                    right: right_b,
                    ..
                },
            ) => op_a == op_b && left_a.same_shape(left_b) && right_a.same_shape(right_b),
            (
                Unary {
                    op: op_a,
                    operand: a,
                    ..
                },
                Unary {
                    op: op_b,
                    operand: b,
                    ..
                },
            ) => op_a == op_b && a.same_shape(b),
            (Group { inner: a }, Group { inner: b }) => a.same_shape(b),
            (Call { name: name_a, args: a }, Call { name: name_b, args: b }) => {
                name_a == name_b && all_same_shape(a, b)
            }
            (
                Let {
                    name: name_a,
                    value: value_a,
                    body: body_a,
                },
                Let {
                    name: name_b,
                    value: value_b,
                    body: body_b,
                },
            ) => name_a == name_b && value_a.same_shape(value_b) && body_a.same_shape(body_b),
            (
                TagFilter {
                    tag: tag_a,
                    op: op_a,
                    value: a,
                },
                TagFilter {
                    tag: tag_b,
                    op: op_b,
                    value: b,
                },
            ) => tag_a == tag_b && op_a == op_b && a.same_shape(b),
            (HasTag { tag: a }, HasTag { tag: b }) => a == b,
            (
                Selector {
                    key: key_a,
                    filters: a,
                },
                Selector {
                    key: key_b,
                    filters: b,
                },
            ) => key_a == key_b && all_same_shape(a, b),
            _ => false,
        }
    }
}

fn all_same_shape(a: &[Expression], b: &[Expression]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(a, b)| a.same_shape(b))
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_repr())
    }
}
