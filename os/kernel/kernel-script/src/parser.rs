//! Recursive-descent parser producing [`ast`](crate::ast) trees.

use crate::ast::{BinaryOp, Expr, ExprKind, FunctionDecl, Ident, LogicalOp, Program, Stmt, UnaryOp};
use crate::lexer::{LexError, Tok, Token, tokenize};
use crate::source::{Source, Span};
use alloc::boxed::Box;
use alloc::format;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;

pub type ParseError = LexError;

const RESERVED: &[&str] = &[
    "var", "let", "const", "function", "return", "if", "else", "while", "for", "break",
    "continue", "throw", "true", "false", "null", "typeof", "new", "do", "switch", "case",
    "default", "try", "catch", "finally", "class", "this", "delete", "in", "instanceof",
];

/// Nesting bound for expressions and statements, so hostile input cannot
/// exhaust the kernel stack while parsing.
const MAX_NESTING: usize = 100;

pub fn parse(source: Rc<Source>) -> Result<Program, ParseError> {
    let tokens = tokenize(&source.text)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        source: Rc::clone(&source),
        depth: 0,
    };
    let mut body = Vec::new();
    while !parser.at_eof() {
        body.push(parser.statement()?);
    }
    Ok(Program { body, source })
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    source: Rc<Source>,
    depth: usize,
}

impl Parser {
    fn token(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn span(&self) -> Span {
        self.token().span
    }

    fn prev_span(&self) -> Span {
        self.tokens[self.pos.saturating_sub(1)].span
    }

    fn at_eof(&self) -> bool {
        self.token().tok == Tok::Eof
    }

    fn advance(&mut self) -> Token {
        let token = self.token().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn is_punct(&self, p: &str) -> bool {
        matches!(self.token().tok, Tok::Punct(q) if q == p)
    }

    fn is_keyword(&self, kw: &str) -> bool {
        matches!(&self.token().tok, Tok::Ident(name) if &**name == kw)
    }

    fn eat(&mut self, p: &str) -> bool {
        if self.is_punct(p) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, kw: &str) -> bool {
        if self.is_keyword(kw) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            message: message.into(),
            span: self.span(),
        }
    }

    fn unexpected(&self) -> ParseError {
        let found = match &self.token().tok {
            Tok::Number(_) => String::from("number"),
            Tok::Str(_) => String::from("string"),
            Tok::Ident(name) => format!("'{name}'"),
            Tok::Punct(p) => format!("'{p}'"),
            Tok::Eof => String::from("end of input"),
        };
        self.error(format!("unexpected {found}"))
    }

    fn expect(&mut self, p: &str) -> Result<Span, ParseError> {
        if self.is_punct(p) {
            Ok(self.advance().span)
        } else {
            Err(self.unexpected())
        }
    }

    fn ident(&mut self) -> Result<Ident, ParseError> {
        match &self.token().tok {
            Tok::Ident(name) if !RESERVED.contains(&&**name) => {
                let name = Rc::clone(name);
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected()),
        }
    }

    /// Optional statement terminator.
    fn semicolon(&mut self) {
        self.eat(";");
    }

    fn nest(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(self.error("nesting too deep"));
        }
        Ok(())
    }

    fn statement(&mut self) -> Result<Stmt, ParseError> {
        self.nest()?;
        let stmt = self.statement_inner();
        self.depth -= 1;
        stmt
    }

    fn statement_inner(&mut self) -> Result<Stmt, ParseError> {
        let start = self.span();
        if self.is_punct("{") {
            let (body, span) = self.block()?;
            return Ok(Stmt::Block(body, span));
        }
        if self.eat(";") {
            return Ok(Stmt::Empty(start));
        }
        if self.is_keyword("var") || self.is_keyword("let") || self.is_keyword("const") {
            let stmt = self.var_declaration()?;
            self.semicolon();
            return Ok(stmt);
        }
        if self.is_keyword("function") {
            self.advance();
            let decl = self.function_rest(start, true)?;
            return Ok(Stmt::Function(decl));
        }
        if self.eat_keyword("if") {
            self.expect("(")?;
            let test = self.expression()?;
            self.expect(")")?;
            let then = Box::new(self.statement()?);
            let otherwise = if self.eat_keyword("else") {
                Some(Box::new(self.statement()?))
            } else {
                None
            };
            return Ok(Stmt::If {
                test,
                then,
                otherwise,
                span: start.to(self.prev_span()),
            });
        }
        if self.eat_keyword("while") {
            self.expect("(")?;
            let test = self.expression()?;
            self.expect(")")?;
            let body = Box::new(self.statement()?);
            return Ok(Stmt::While {
                test,
                body,
                span: start.to(self.prev_span()),
            });
        }
        if self.eat_keyword("for") {
            return self.for_statement(start);
        }
        if self.eat_keyword("return") {
            let value = if self.ends_statement() {
                None
            } else {
                Some(self.expression()?)
            };
            self.semicolon();
            return Ok(Stmt::Return(value, start.to(self.prev_span())));
        }
        if self.eat_keyword("break") {
            self.semicolon();
            return Ok(Stmt::Break(start));
        }
        if self.eat_keyword("continue") {
            self.semicolon();
            return Ok(Stmt::Continue(start));
        }
        if self.eat_keyword("throw") {
            if self.token().newline_before {
                return Err(self.error("illegal newline after throw"));
            }
            let value = self.expression()?;
            self.semicolon();
            return Ok(Stmt::Throw(value, start.to(self.prev_span())));
        }
        for unsupported in ["try", "switch", "class", "do", "new"] {
            if self.is_keyword(unsupported) {
                return Err(self.error(format!("'{unsupported}' is not supported")));
            }
        }
        let expr = self.expression()?;
        if !self.ends_statement() {
            return Err(self.unexpected());
        }
        self.semicolon();
        Ok(Stmt::Expr(expr))
    }

    fn ends_statement(&self) -> bool {
        self.is_punct(";") || self.is_punct("}") || self.at_eof() || self.token().newline_before
    }

    fn block(&mut self) -> Result<(Vec<Stmt>, Span), ParseError> {
        let start = self.expect("{")?;
        let mut body = Vec::new();
        while !self.is_punct("}") {
            if self.at_eof() {
                return Err(self.error("missing '}' before end of input"));
            }
            body.push(self.statement()?);
        }
        let end = self.expect("}")?;
        Ok((body, start.to(end)))
    }

    fn var_declaration(&mut self) -> Result<Stmt, ParseError> {
        let start = self.advance().span;
        let mut decls = Vec::new();
        loop {
            let name = self.ident()?;
            let init = if self.eat("=") {
                Some(self.assignment()?)
            } else {
                None
            };
            decls.push((name, init));
            if !self.eat(",") {
                break;
            }
        }
        Ok(Stmt::Var(decls, start.to(self.prev_span())))
    }

    fn for_statement(&mut self, start: Span) -> Result<Stmt, ParseError> {
        self.expect("(")?;
        let init = if self.is_punct(";") {
            None
        } else if self.is_keyword("var") || self.is_keyword("let") || self.is_keyword("const") {
            Some(Box::new(self.var_declaration()?))
        } else {
            Some(Box::new(Stmt::Expr(self.expression()?)))
        };
        self.expect(";")?;
        let test = if self.is_punct(";") {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect(";")?;
        let update = if self.is_punct(")") {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect(")")?;
        let body = Box::new(self.statement()?);
        Ok(Stmt::For {
            init,
            test,
            update,
            body,
            span: start.to(self.prev_span()),
        })
    }

    /// Parses everything after the `function` keyword.
    fn function_rest(&mut self, start: Span, require_name: bool) -> Result<Rc<FunctionDecl>, ParseError> {
        let name = if require_name || matches!(self.token().tok, Tok::Ident(_)) {
            Some(self.ident()?)
        } else {
            None
        };
        self.expect("(")?;
        let mut params = Vec::new();
        while !self.is_punct(")") {
            params.push(self.ident()?);
            if !self.eat(",") {
                break;
            }
        }
        self.expect(")")?;
        let (body, end) = self.block()?;
        Ok(Rc::new(FunctionDecl {
            name,
            params,
            body,
            span: start.to(end),
            source: Rc::clone(&self.source),
        }))
    }

    pub(crate) fn expression(&mut self) -> Result<Expr, ParseError> {
        self.nest()?;
        let expr = self.assignment();
        self.depth -= 1;
        expr
    }

    fn assignment(&mut self) -> Result<Expr, ParseError> {
        let target = self.conditional()?;
        let op = match self.token().tok {
            Tok::Punct("=") => None,
            Tok::Punct(p) => match compound_op(p) {
                Some(op) => Some(op),
                None => return Ok(target),
            },
            _ => return Ok(target),
        };
        if !matches!(
            target.kind,
            ExprKind::Ident(_) | ExprKind::Member(..) | ExprKind::Index(..)
        ) {
            return Err(self.error("invalid assignment target"));
        }
        self.advance();
        let value = self.expression()?;
        let span = target.span.to(value.span);
        Ok(Expr {
            kind: ExprKind::Assign(op, Box::new(target), Box::new(value)),
            span,
        })
    }

    fn conditional(&mut self) -> Result<Expr, ParseError> {
        let test = self.binary(0)?;
        if !self.eat("?") {
            return Ok(test);
        }
        let then = self.expression()?;
        self.expect(":")?;
        let otherwise = self.expression()?;
        let span = test.span.to(otherwise.span);
        Ok(Expr {
            kind: ExprKind::Conditional(Box::new(test), Box::new(then), Box::new(otherwise)),
            span,
        })
    }

    /// Each folded operator deepens the tree by one, so it counts against
    /// the nesting limit until the whole chain is built.
    fn binary(&mut self, min_precedence: u8) -> Result<Expr, ParseError> {
        let depth = self.depth;
        let expr = self.binary_chain(min_precedence);
        self.depth = depth;
        expr
    }

    fn binary_chain(&mut self, min_precedence: u8) -> Result<Expr, ParseError> {
        let mut left = self.unary()?;
        loop {
            let Tok::Punct(p) = self.token().tok else {
                return Ok(left);
            };
            let Some((precedence, op)) = binary_op(p) else {
                return Ok(left);
            };
            if precedence <= min_precedence {
                return Ok(left);
            }
            self.nest()?;
            self.advance();
            let right = self.binary(precedence)?;
            let span = left.span.to(right.span);
            let kind = match op {
                Operator::Logical(op) => ExprKind::Logical(op, Box::new(left), Box::new(right)),
                Operator::Binary(op) => ExprKind::Binary(op, Box::new(left), Box::new(right)),
            };
            left = Expr { kind, span };
        }
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        let start = self.span();
        let op = match &self.token().tok {
            Tok::Punct("-") => Some(UnaryOp::Neg),
            Tok::Punct("+") => Some(UnaryOp::Plus),
            Tok::Punct("!") => Some(UnaryOp::Not),
            Tok::Punct("~") => Some(UnaryOp::BitNot),
            Tok::Ident(kw) if &**kw == "typeof" => Some(UnaryOp::Typeof),
            Tok::Punct(p @ ("++" | "--")) => {
                let increment = *p == "++";
                self.advance();
                self.nest()?;
                let target = self.unary();
                self.depth -= 1;
                let target = self.update_target(target?)?;
                let span = start.to(target.span);
                return Ok(Expr {
                    kind: ExprKind::Update {
                        increment,
                        prefix: true,
                        target: Box::new(target),
                    },
                    span,
                });
            }
            _ => None,
        };
        let Some(op) = op else {
            return self.postfix();
        };
        self.advance();
        self.nest()?;
        let operand = self.unary();
        self.depth -= 1;
        let operand = operand?;
        let span = start.to(operand.span);
        Ok(Expr {
            kind: ExprKind::Unary(op, Box::new(operand)),
            span,
        })
    }

    fn update_target(&self, target: Expr) -> Result<Expr, ParseError> {
        if matches!(
            target.kind,
            ExprKind::Ident(_) | ExprKind::Member(..) | ExprKind::Index(..)
        ) {
            Ok(target)
        } else {
            Err(ParseError {
                message: String::from("invalid increment/decrement operand"),
                span: target.span,
            })
        }
    }

    fn postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.call()?;
        if !self.token().newline_before && (self.is_punct("++") || self.is_punct("--")) {
            let increment = self.is_punct("++");
            let end = self.advance().span;
            let target = self.update_target(expr)?;
            let span = target.span.to(end);
            expr = Expr {
                kind: ExprKind::Update {
                    increment,
                    prefix: false,
                    target: Box::new(target),
                },
                span,
            };
        }
        Ok(expr)
    }

    /// Member, index and call links nest like binary operators.
    fn call(&mut self) -> Result<Expr, ParseError> {
        let depth = self.depth;
        let expr = self.call_chain();
        self.depth = depth;
        expr
    }

    fn call_chain(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.primary()?;
        loop {
            if self.is_punct(".") || self.is_punct("[") || self.is_punct("(") {
                self.nest()?;
            }
            if self.eat(".") {
                let name = match &self.token().tok {
                    Tok::Ident(name) => Rc::clone(name),
                    _ => return Err(self.unexpected()),
                };
                let end = self.advance().span;
                let span = expr.span.to(end);
                expr = Expr {
                    kind: ExprKind::Member(Box::new(expr), name),
                    span,
                };
            } else if self.eat("[") {
                let index = self.expression()?;
                let end = self.expect("]")?;
                let span = expr.span.to(end);
                expr = Expr {
                    kind: ExprKind::Index(Box::new(expr), Box::new(index)),
                    span,
                };
            } else if self.is_punct("(") {
                self.advance();
                let mut args = Vec::new();
                while !self.is_punct(")") {
                    args.push(self.expression()?);
                    if !self.eat(",") {
                        break;
                    }
                }
                let end = self.expect(")")?;
                let span = expr.span.to(end);
                expr = Expr {
                    kind: ExprKind::Call(Box::new(expr), args),
                    span,
                };
            } else {
                return Ok(expr);
            }
        }
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        let token = self.token().clone();
        let span = token.span;
        let kind = match token.tok {
            Tok::Number(n) => {
                self.advance();
                ExprKind::Number(n)
            }
            Tok::Str(s) => {
                self.advance();
                ExprKind::Str(s)
            }
            Tok::Punct("(") => {
                self.advance();
                let inner = self.expression()?;
                self.expect(")")?;
                return Ok(inner);
            }
            Tok::Punct("[") => return self.array_literal(),
            Tok::Punct("{") => return self.object_literal(),
            Tok::Ident(name) => match &*name {
                "true" | "false" => {
                    self.advance();
                    ExprKind::Bool(&*name == "true")
                }
                "null" => {
                    self.advance();
                    ExprKind::Null
                }
                "undefined" => {
                    self.advance();
                    ExprKind::Undefined
                }
                "function" => {
                    self.advance();
                    let decl = self.function_rest(span, false)?;
                    return Ok(Expr {
                        span: decl.span,
                        kind: ExprKind::Function(decl),
                    });
                }
                _ => ExprKind::Ident(self.ident()?),
            },
            Tok::Punct(_) | Tok::Eof => return Err(self.unexpected()),
        };
        Ok(Expr { kind, span })
    }

    fn array_literal(&mut self) -> Result<Expr, ParseError> {
        let start = self.expect("[")?;
        let mut items = Vec::new();
        while !self.is_punct("]") {
            items.push(self.expression()?);
            if !self.eat(",") {
                break;
            }
        }
        let end = self.expect("]")?;
        Ok(Expr {
            kind: ExprKind::Array(items),
            span: start.to(end),
        })
    }

    fn object_literal(&mut self) -> Result<Expr, ParseError> {
        let start = self.expect("{")?;
        let mut props = Vec::new();
        while !self.is_punct("}") {
            let key_span = self.span();
            let key: Ident = match self.advance().tok {
                Tok::Ident(name) | Tok::Str(name) => name,
                Tok::Number(n) => Rc::from(crate::value::number_to_string(n)),
                _ => {
                    return Err(ParseError {
                        message: String::from("invalid property name"),
                        span: key_span,
                    });
                }
            };
            let value = if self.eat(":") {
                self.expression()?
            } else {
                // `{ name }` shorthand
                Expr {
                    kind: ExprKind::Ident(Rc::clone(&key)),
                    span: key_span,
                }
            };
            props.push((key, value));
            if !self.eat(",") {
                break;
            }
        }
        let end = self.expect("}")?;
        Ok(Expr {
            kind: ExprKind::Object(props),
            span: start.to(end),
        })
    }
}

enum Operator {
    Binary(BinaryOp),
    Logical(LogicalOp),
}

fn binary_op(p: &str) -> Option<(u8, Operator)> {
    use BinaryOp as B;
    let entry = match p {
        "||" => (1, Operator::Logical(LogicalOp::Or)),
        "&&" => (2, Operator::Logical(LogicalOp::And)),
        "|" => (3, Operator::Binary(B::BitOr)),
        "^" => (4, Operator::Binary(B::BitXor)),
        "&" => (5, Operator::Binary(B::BitAnd)),
        "==" => (6, Operator::Binary(B::Eq)),
        "!=" => (6, Operator::Binary(B::NotEq)),
        "===" => (6, Operator::Binary(B::StrictEq)),
        "!==" => (6, Operator::Binary(B::StrictNotEq)),
        "<" => (7, Operator::Binary(B::Lt)),
        ">" => (7, Operator::Binary(B::Gt)),
        "<=" => (7, Operator::Binary(B::LtEq)),
        ">=" => (7, Operator::Binary(B::GtEq)),
        "<<" => (8, Operator::Binary(B::Shl)),
        ">>" => (8, Operator::Binary(B::Shr)),
        ">>>" => (8, Operator::Binary(B::UShr)),
        "+" => (9, Operator::Binary(B::Add)),
        "-" => (9, Operator::Binary(B::Sub)),
        "*" => (10, Operator::Binary(B::Mul)),
        "/" => (10, Operator::Binary(B::Div)),
        "%" => (10, Operator::Binary(B::Rem)),
        _ => return None,
    };
    Some(entry)
}

fn compound_op(p: &str) -> Option<BinaryOp> {
    Some(match p {
        "+=" => BinaryOp::Add,
        "-=" => BinaryOp::Sub,
        "*=" => BinaryOp::Mul,
        "/=" => BinaryOp::Div,
        "%=" => BinaryOp::Rem,
        "&=" => BinaryOp::BitAnd,
        "|=" => BinaryOp::BitOr,
        "^=" => BinaryOp::BitXor,
        "<<=" => BinaryOp::Shl,
        ">>=" => BinaryOp::Shr,
        ">>>=" => BinaryOp::UShr,
        _ => return None,
    })
}
