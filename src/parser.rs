//! The Pratt/precedence-climbing parser. Takes the
//! token stream from [`crate::lexer`] and produces a [`Program`]
//! (`Vec<Stmt>`). The grammar is infix with explicit operator
//! precedence and significant-newline statement termination, a shape that
//! doesn't fit a PEG whitespace model well, so this module is a
//! hand-written recursive-descent/precedence-climbing parser instead (see
//! DESIGN.md for the dependency-drop rationale).
//!
//! Parser failures are the one place the core raises (`ParseError`)
//! instead of returning an error value; the caller (`host.rs`) converts
//! them at the boundary.

use crate::ast::{Arg, BinOp, Expr, IntentField, ListItem, Param, PipelineNode, Program, Span, Stmt, UnOp};
use crate::error::ParseError;
use crate::lexer::{tokenize, Token, TokenKind};

pub fn parse(src: &str) -> Result<Program, ParseError> {
    let tokens = tokenize(src)?;
    Parser::new(tokens).parse_program()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

type PResult<T> = Result<T, ParseError>;

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn kind_at(&self, offset: usize) -> &TokenKind {
        self.tokens
            .get(self.pos + offset)
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    fn kind(&self) -> &TokenKind {
        self.kind_at(0)
    }

    fn span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .map(|t| t.span)
            .unwrap_or_else(|| self.tokens.last().map(|t| t.span).unwrap_or_default())
    }

    fn advance(&mut self) -> Token {
        let tok = self
            .tokens
            .get(self.pos)
            .cloned()
            .unwrap_or(Token {
                kind: TokenKind::Eof,
                span: self.span(),
            });
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.kind() == kind
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> PResult<Token> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            Err(ParseError::new(
                format!("expected {kind:?}, found {:?}", self.kind()),
                self.span(),
            ))
        }
    }

    fn expect_ident(&mut self) -> PResult<String> {
        match self.kind().clone() {
            TokenKind::Ident(name) => {
                self.advance();
                Ok(name)
            }
            TokenKind::BacktickIdent(name) => {
                self.advance();
                Ok(name)
            }
            other => Err(ParseError::new(
                format!("expected identifier, found {other:?}"),
                self.span(),
            )),
        }
    }

    fn is_sep(&self) -> bool {
        matches!(self.kind(), TokenKind::Newline | TokenKind::Semicolon)
    }

    fn skip_seps(&mut self) {
        while self.is_sep() {
            self.advance();
        }
    }

    // ---------------------------------------------------------------
    // Program / statements
    // ---------------------------------------------------------------

    fn parse_program(mut self) -> PResult<Program> {
        let mut stmts = Vec::new();
        self.skip_seps();
        while !self.check(&TokenKind::Eof) {
            stmts.push(self.parse_stmt()?);
            if !self.check(&TokenKind::Eof) && !self.is_sep() {
                return Err(ParseError::new(
                    format!("expected statement separator, found {:?}", self.kind()),
                    self.span(),
                ));
            }
            self.skip_seps();
        }
        Ok(stmts)
    }

    /// Parses statements up to (but not consuming) a closing `}`, for
    /// blocks and pipeline bodies.
    fn parse_block_stmts(&mut self) -> PResult<Vec<Stmt>> {
        let mut stmts = Vec::new();
        self.skip_seps();
        while !self.check(&TokenKind::RBrace) && !self.check(&TokenKind::Eof) {
            stmts.push(self.parse_stmt()?);
            if !self.check(&TokenKind::RBrace) && !self.is_sep() {
                return Err(ParseError::new(
                    format!("expected statement separator, found {:?}", self.kind()),
                    self.span(),
                ));
            }
            self.skip_seps();
        }
        Ok(stmts)
    }

    fn parse_stmt(&mut self) -> PResult<Stmt> {
        if matches!(self.kind(), TokenKind::Ident(name) if name == "import") {
            let start = self.span();
            self.advance();
            let mut path = self.expect_ident()?;
            while self.eat(&TokenKind::Dot) {
                path.push('.');
                path.push_str(&self.expect_ident()?);
            }
            return Ok(Stmt::Import(path, start));
        }

        if let TokenKind::Ident(name) = self.kind().clone() {
            // `name = expr` (optional `: Type`) or `name := expr`.
            if matches!(self.kind_at(1), TokenKind::ColonEq) {
                let start = self.span();
                self.advance();
                self.advance();
                let value = self.parse_expr()?;
                return Ok(Stmt::Overwrite {
                    name,
                    value,
                    span: start,
                });
            }
            if matches!(self.kind_at(1), TokenKind::Eq) {
                let start = self.span();
                self.advance();
                self.advance();
                let value = self.parse_expr()?;
                return Ok(Stmt::FirstAssign {
                    name,
                    type_ann: None,
                    value,
                    span: start,
                });
            }
            if matches!(self.kind_at(1), TokenKind::Colon) {
                // Could be `name : Type = expr` or just an expression
                // statement that happens to start with `ident :` — the
                // only place a bare `ident :` is legal at statement head
                // is the typed first-assignment, so commit to it here.
                let start = self.span();
                self.advance();
                self.advance();
                let type_ann = self.expect_ident()?;
                self.expect(TokenKind::Eq)?;
                let value = self.parse_expr()?;
                return Ok(Stmt::FirstAssign {
                    name,
                    type_ann: Some(type_ann),
                    value,
                    span: start,
                });
            }
        }

        Ok(Stmt::Expr(self.parse_expr()?))
    }

    // ---------------------------------------------------------------
    // Expressions: precedence climbing, lowest to highest
    // 1. |> ?|>   2. ~   3. or   4. and   5. | .|   6. & .&
    // 7. comparisons/in   8. + -   9. * /  %   10. unary   11. postfix
    // ---------------------------------------------------------------

    fn parse_expr(&mut self) -> PResult<Expr> {
        self.parse_pipe()
    }

    fn parse_pipe(&mut self) -> PResult<Expr> {
        let mut left = self.parse_formula()?;
        loop {
            let unconditional = match self.kind() {
                TokenKind::Pipe => false,
                TokenKind::PipeUnconditional => true,
                _ => break,
            };
            self.advance();
            let right = self.parse_formula()?;
            let span = left.span().cover(right.span());
            left = Expr::Pipe {
                unconditional,
                left: Box::new(left),
                right: Box::new(right),
                span,
            };
        }
        Ok(left)
    }

    fn parse_formula(&mut self) -> PResult<Expr> {
        let left = self.parse_or()?;
        if self.check(&TokenKind::Tilde) {
            self.advance();
            let right = self.parse_or()?;
            let span = left.span().cover(right.span());
            return Ok(Expr::Formula {
                lhs: Box::new(left),
                rhs: Box::new(right),
                span,
            });
        }
        Ok(left)
    }

    fn parse_or(&mut self) -> PResult<Expr> {
        let mut left = self.parse_and()?;
        while self.check(&TokenKind::Or) {
            self.advance();
            let right = self.parse_and()?;
            left = self.bin(BinOp::Or, false, left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> PResult<Expr> {
        let mut left = self.parse_bitor()?;
        while self.check(&TokenKind::And) {
            self.advance();
            let right = self.parse_bitor()?;
            left = self.bin(BinOp::And, false, left, right);
        }
        Ok(left)
    }

    fn parse_bitor(&mut self) -> PResult<Expr> {
        let mut left = self.parse_bitand()?;
        loop {
            let broadcast = match self.kind() {
                TokenKind::Bar => false,
                TokenKind::DotBar => true,
                _ => break,
            };
            self.advance();
            let right = self.parse_bitand()?;
            left = self.bin(BinOp::BitOr, broadcast, left, right);
        }
        Ok(left)
    }

    fn parse_bitand(&mut self) -> PResult<Expr> {
        let mut left = self.parse_compare()?;
        loop {
            let broadcast = match self.kind() {
                TokenKind::Amp => false,
                TokenKind::DotAmp => true,
                _ => break,
            };
            self.advance();
            let right = self.parse_compare()?;
            left = self.bin(BinOp::BitAnd, broadcast, left, right);
        }
        Ok(left)
    }

    /// Comparisons and `in` are non-associative: at most one
    /// applies per level.
    fn parse_compare(&mut self) -> PResult<Expr> {
        let left = self.parse_additive()?;
        let (op, broadcast) = match self.kind() {
            TokenKind::EqEq => (BinOp::Eq, false),
            TokenKind::DotEqEq => (BinOp::Eq, true),
            TokenKind::Ne => (BinOp::Ne, false),
            TokenKind::DotNe => (BinOp::Ne, true),
            TokenKind::Lt => (BinOp::Lt, false),
            TokenKind::DotLt => (BinOp::Lt, true),
            TokenKind::Gt => (BinOp::Gt, false),
            TokenKind::DotGt => (BinOp::Gt, true),
            TokenKind::Le => (BinOp::Le, false),
            TokenKind::DotLe => (BinOp::Le, true),
            TokenKind::Ge => (BinOp::Ge, false),
            TokenKind::DotGe => (BinOp::Ge, true),
            TokenKind::In => (BinOp::In, false),
            _ => return Ok(left),
        };
        self.advance();
        let right = self.parse_additive()?;
        Ok(self.bin(op, broadcast, left, right))
    }

    fn parse_additive(&mut self) -> PResult<Expr> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let (op, broadcast) = match self.kind() {
                TokenKind::Plus => (BinOp::Add, false),
                TokenKind::DotPlus => (BinOp::Add, true),
                TokenKind::Minus => (BinOp::Sub, false),
                TokenKind::DotMinus => (BinOp::Sub, true),
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = self.bin(op, broadcast, left, right);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> PResult<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let (op, broadcast) = match self.kind() {
                TokenKind::Star => (BinOp::Mul, false),
                TokenKind::DotStar => (BinOp::Mul, true),
                TokenKind::Slash => (BinOp::Div, false),
                TokenKind::DotSlash => (BinOp::Div, true),
                TokenKind::Percent => (BinOp::Mod, false),
                TokenKind::DotPercent => (BinOp::Mod, true),
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = self.bin(op, broadcast, left, right);
        }
        Ok(left)
    }

    fn bin(&self, op: BinOp, broadcast: bool, lhs: Expr, rhs: Expr) -> Expr {
        let span = lhs.span().cover(rhs.span());
        Expr::Binary {
            op,
            broadcast,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            span,
        }
    }

    fn parse_unary(&mut self) -> PResult<Expr> {
        let start = self.span();
        match self.kind() {
            TokenKind::Minus => {
                self.advance();
                let operand = self.parse_unary()?;
                let span = start.cover(operand.span());
                Ok(Expr::Unary {
                    op: UnOp::Neg,
                    operand: Box::new(operand),
                    span,
                })
            }
            TokenKind::Bang => {
                self.advance();
                let operand = self.parse_unary()?;
                let span = start.cover(operand.span());
                Ok(Expr::Unary {
                    op: UnOp::Not,
                    operand: Box::new(operand),
                    span,
                })
            }
            _ => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> PResult<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.kind() {
                TokenKind::LParen => {
                    self.advance();
                    let args = self.parse_args()?;
                    let end = self.expect(TokenKind::RParen)?;
                    let span = expr.span().cover(end.span);
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                        span,
                    };
                }
                TokenKind::Dot => {
                    self.advance();
                    let field_span = self.span();
                    let field = self.expect_ident()?;
                    let span = expr.span().cover(field_span);
                    expr = Expr::Dot {
                        target: Box::new(expr),
                        field,
                        span,
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_args(&mut self) -> PResult<Vec<Arg>> {
        let mut args = Vec::new();
        if self.check(&TokenKind::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.parse_one_arg()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
            // Trailing comma before `)`.
            if self.check(&TokenKind::RParen) {
                break;
            }
        }
        Ok(args)
    }

    fn parse_one_arg(&mut self) -> PResult<Arg> {
        // `.ident = expr` — verb-option dot-named argument.
        if self.check(&TokenKind::Dot) {
            if let TokenKind::Ident(_) = self.kind_at(1) {
                if matches!(self.kind_at(2), TokenKind::Eq) {
                    self.advance();
                    let name = self.expect_ident()?;
                    self.advance(); // `=`
                    let value = self.parse_expr()?;
                    return Ok(Arg::DotNamed(name, value));
                }
            }
        }
        // `$col = expr` — column-named argument.
        if let TokenKind::Column(name) = self.kind().clone() {
            if matches!(self.kind_at(1), TokenKind::Eq) {
                self.advance();
                self.advance();
                let value = self.parse_expr()?;
                return Ok(Arg::ColumnNamed(name, value));
            }
        }
        // `ident: expr` / `ident = expr` — the core treats both forms
        // identically.
        if let TokenKind::Ident(name) = self.kind().clone() {
            if matches!(self.kind_at(1), TokenKind::Colon | TokenKind::Eq) {
                self.advance();
                self.advance();
                let value = self.parse_expr()?;
                return Ok(Arg::Named(name, value));
            }
        }
        Ok(Arg::Positional(self.parse_expr()?))
    }

    fn parse_primary(&mut self) -> PResult<Expr> {
        let start = self.span();
        match self.kind().clone() {
            TokenKind::Int(n) => {
                self.advance();
                Ok(Expr::Int(n, start))
            }
            TokenKind::Float(n) => {
                self.advance();
                Ok(Expr::Float(n, start))
            }
            TokenKind::Str(s) => {
                self.advance();
                Ok(Expr::Str(s, start))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::Bool(true, start))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::Bool(false, start))
            }
            TokenKind::Null => {
                self.advance();
                Ok(Expr::Null(start))
            }
            TokenKind::Na => {
                self.advance();
                Ok(Expr::Na(start))
            }
            TokenKind::Column(name) => {
                self.advance();
                Ok(Expr::Column(name, start))
            }
            TokenKind::Ident(name) => {
                self.advance();
                Ok(Expr::Var(name, start))
            }
            TokenKind::BacktickIdent(name) => {
                self.advance();
                Ok(Expr::Var(name, start))
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::LBracket => self.parse_bracket_literal(),
            TokenKind::LBrace => self.parse_brace_expr(),
            TokenKind::If => self.parse_if(),
            TokenKind::Backslash | TokenKind::Function => self.parse_lambda(),
            TokenKind::Pipeline => self.parse_pipeline(),
            TokenKind::Intent => self.parse_intent(),
            other => Err(ParseError::new(
                format!("unexpected token {other:?} in expression position"),
                start,
            )),
        }
    }

    fn parse_if(&mut self) -> PResult<Expr> {
        let start = self.span();
        self.expect(TokenKind::If)?;
        let cond = self.parse_expr()?;
        let then_branch = self.parse_expr()?;
        self.expect(TokenKind::Else)?;
        let else_branch = self.parse_expr()?;
        let span = start.cover(else_branch.span());
        Ok(Expr::If {
            cond: Box::new(cond),
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
            span,
        })
    }

    /// `\(params) body`, `\<T>(params) -> T body`, `function(params) body`.
    /// `->`, when present, is always followed by the return-type identifier
    /// and then `body` directly, so it doubles as both the return-type
    /// marker and the separator before the body.
    fn parse_lambda(&mut self) -> PResult<Expr> {
        let start = self.span();
        self.advance(); // `\` or `function`

        let mut generics = Vec::new();
        if self.eat(&TokenKind::Lt) {
            loop {
                generics.push(self.expect_ident()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::Gt)?;
        }

        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        let mut variadic = false;
        if !self.check(&TokenKind::RParen) {
            loop {
                if self.eat(&TokenKind::Ellipsis) {
                    variadic = true;
                    let name = self.expect_ident()?;
                    params.push(Param {
                        name,
                        type_ann: None,
                    });
                    break;
                }
                let name = self.expect_ident()?;
                let type_ann = if self.eat(&TokenKind::Colon) {
                    Some(self.expect_ident()?)
                } else {
                    None
                };
                params.push(Param { name, type_ann });
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen)?;

        let return_type = if self.eat(&TokenKind::Arrow) {
            Some(self.expect_ident()?)
        } else {
            None
        };

        let body = self.parse_expr()?;
        let span = start.cover(body.span());
        Ok(Expr::Lambda {
            params,
            return_type,
            generics,
            variadic,
            body: Box::new(body),
            span,
        })
    }

    /// `pipeline { name = expr (sep name = expr)* }`.
    fn parse_pipeline(&mut self) -> PResult<Expr> {
        let start = self.span();
        self.expect(TokenKind::Pipeline)?;
        self.expect(TokenKind::LBrace)?;
        let mut nodes = Vec::new();
        self.skip_seps();
        while !self.check(&TokenKind::RBrace) {
            let name = self.expect_ident()?;
            self.expect(TokenKind::Eq)?;
            let expr = self.parse_expr()?;
            nodes.push(PipelineNode { name, expr });
            if !self.check(&TokenKind::RBrace) && !self.is_sep() {
                return Err(ParseError::new(
                    "expected statement separator between pipeline nodes",
                    self.span(),
                ));
            }
            self.skip_seps();
        }
        let end = self.expect(TokenKind::RBrace)?;
        Ok(Expr::Pipeline(nodes, start.cover(end.span)))
    }

    /// `intent { ident: expr (, ident: expr)* }`.
    fn parse_intent(&mut self) -> PResult<Expr> {
        let start = self.span();
        self.expect(TokenKind::Intent)?;
        self.expect(TokenKind::LBrace)?;
        let mut fields = Vec::new();
        self.skip_seps();
        while !self.check(&TokenKind::RBrace) {
            let key = self.expect_ident()?;
            if !self.eat(&TokenKind::Colon) {
                self.expect(TokenKind::Eq)?;
            }
            let value = self.parse_expr()?;
            fields.push(IntentField { key, value });
            if self.eat(&TokenKind::Comma) {
                self.skip_seps();
                continue;
            }
            self.skip_seps();
        }
        let end = self.expect(TokenKind::RBrace)?;
        Ok(Expr::Intent(fields, start.cover(end.span)))
    }

    /// Disambiguates `{` as block vs dict literal: a dict
    /// begins with an identifier immediately followed by `:`.
    fn parse_brace_expr(&mut self) -> PResult<Expr> {
        let start = self.span();
        self.expect(TokenKind::LBrace)?;
        let looks_like_dict = matches!(self.kind(), TokenKind::Ident(_) | TokenKind::BacktickIdent(_))
            && matches!(self.kind_at(1), TokenKind::Colon);
        if looks_like_dict || self.check(&TokenKind::RBrace) {
            let mut entries = Vec::new();
            self.skip_seps();
            while !self.check(&TokenKind::RBrace) {
                let key = self.expect_ident()?;
                self.expect(TokenKind::Colon)?;
                let value = self.parse_expr()?;
                entries.push((key, value));
                if self.eat(&TokenKind::Comma) {
                    self.skip_seps();
                    continue;
                }
                self.skip_seps();
            }
            let end = self.expect(TokenKind::RBrace)?;
            return Ok(Expr::Dict(entries, start.cover(end.span)));
        }

        let stmts = self.parse_block_stmts()?;
        let end = self.expect(TokenKind::RBrace)?;
        Ok(Expr::Block(stmts, start.cover(end.span)))
    }

    /// List literal, list comprehension, or a dict when
    /// every comma-separated item is a `key: value` pair. Mixing bare and
    /// keyed entries is a parse error.
    fn parse_bracket_literal(&mut self) -> PResult<Expr> {
        let start = self.span();
        self.expect(TokenKind::LBracket)?;
        if self.check(&TokenKind::RBracket) {
            let end = self.advance();
            return Ok(Expr::List(Vec::new(), start.cover(end.span)));
        }

        // `ident: expr` as the first item commits to a list/dict literal,
        // never a comprehension (`for` cannot appear there).
        let first_is_named = matches!(self.kind(), TokenKind::Ident(_))
            && matches!(self.kind_at(1), TokenKind::Colon);

        let mut items = if first_is_named {
            vec![self.parse_list_item()?]
        } else {
            // Try list-comprehension shape: `[ expr for ident in expr (if expr)? ]`.
            let first = self.parse_expr()?;
            if matches!(self.kind(), TokenKind::Ident(name) if name == "for") {
                self.advance();
                let var = self.expect_ident()?;
                self.expect(TokenKind::In)?;
                let source = self.parse_expr()?;
                let cond = if self.check(&TokenKind::If) {
                    self.advance();
                    Some(Box::new(self.parse_expr()?))
                } else {
                    None
                };
                let end = self.expect(TokenKind::RBracket)?;
                return Ok(Expr::Comprehension {
                    element: Box::new(first),
                    var,
                    source: Box::new(source),
                    cond,
                    span: start.cover(end.span),
                });
            }
            vec![ListItem { name: None, value: first }]
        };

        while self.eat(&TokenKind::Comma) {
            if self.check(&TokenKind::RBracket) {
                break;
            }
            items.push(self.parse_list_item()?);
        }
        let end = self.expect(TokenKind::RBracket)?;
        let span = start.cover(end.span);

        let named_count = items.iter().filter(|i| i.name.is_some()).count();
        if named_count == items.len() {
            let dict_entries = items.into_iter().map(|i| (i.name.unwrap(), i.value)).collect();
            return Ok(Expr::Dict(dict_entries, span));
        }
        if named_count > 0 {
            return Err(ParseError::new(
                "cannot mix bare and keyed entries in a list literal",
                span,
            ));
        }
        Ok(Expr::List(items, span))
    }

    /// Parses one `[...]` element after the first, with lookahead for
    /// `ident: expr`.
    fn parse_list_item(&mut self) -> PResult<ListItem> {
        if let TokenKind::Ident(name) = self.kind().clone() {
            if matches!(self.kind_at(1), TokenKind::Colon) {
                self.advance();
                self.advance();
                let value = self.parse_expr()?;
                return Ok(ListItem {
                    name: Some(name),
                    value,
                });
            }
        }
        let value = self.parse_expr()?;
        Ok(ListItem { name: None, value })
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Stmt;

    fn parse_ok(src: &str) -> Program {
        parse(src).unwrap_or_else(|e| panic!("parse failed: {} ({e})", src))
    }

    #[test]
    fn simple_pipe() {
        let prog = parse_ok("5 |> \\(x) x * 2");
        assert_eq!(prog.len(), 1);
        match &prog[0] {
            Stmt::Expr(Expr::Pipe { .. }) => {}
            other => panic!("expected pipe expr, got {other:?}"),
        }
    }

    #[test]
    fn first_assign_then_second_fails_to_parse_as_overwrite() {
        let prog = parse_ok("x = 1\nx := 2\nx");
        assert_eq!(prog.len(), 3);
        assert!(matches!(prog[0], Stmt::FirstAssign { .. }));
        assert!(matches!(prog[1], Stmt::Overwrite { .. }));
    }

    #[test]
    fn typed_first_assign() {
        let prog = parse_ok("x: Int = 1");
        match &prog[0] {
            Stmt::FirstAssign { type_ann, .. } => assert_eq!(type_ann.as_deref(), Some("Int")),
            other => panic!("expected typed first-assign, got {other:?}"),
        }
    }

    #[test]
    fn pipeline_literal_parses_nodes() {
        let prog = parse_ok("p = pipeline { a = 1; c = a + b; b = 2 }");
        match &prog[0] {
            Stmt::FirstAssign {
                value: Expr::Pipeline(nodes, _),
                ..
            } => assert_eq!(nodes.len(), 3),
            other => panic!("expected pipeline literal, got {other:?}"),
        }
    }

    #[test]
    fn dict_literal_via_all_named_brackets() {
        let prog = parse_ok("[a: 1, b: 2]");
        match &prog[0] {
            Stmt::Expr(Expr::Dict(entries, _)) => assert_eq!(entries.len(), 2),
            other => panic!("expected dict, got {other:?}"),
        }
    }

    #[test]
    fn list_literal_with_bare_items() {
        let prog = parse_ok("[1, 2, 3]");
        match &prog[0] {
            Stmt::Expr(Expr::List(items, _)) => assert_eq!(items.len(), 3),
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn brace_dict_distinguished_from_block() {
        let prog = parse_ok("{ x = 1; x + 2 }");
        assert!(matches!(&prog[0], Stmt::Expr(Expr::Block(..))));
        let prog = parse_ok("{a: 1, b: 2}");
        assert!(matches!(&prog[0], Stmt::Expr(Expr::Dict(..))));
    }

    #[test]
    fn if_else_both_branches_required() {
        let prog = parse_ok("if true 1 else 2");
        assert!(matches!(&prog[0], Stmt::Expr(Expr::If { .. })));
    }

    #[test]
    fn call_with_named_and_column_named_args() {
        let prog = parse_ok("filter(df, $age > 30, .keep = true)");
        match &prog[0] {
            Stmt::Expr(Expr::Call { args, .. }) => {
                assert_eq!(args.len(), 3);
                assert!(matches!(args[2], Arg::DotNamed(..)));
            }
            other => panic!("expected call, got {other:?}"),
        }
    }

    #[test]
    fn formula_operator() {
        let prog = parse_ok("y ~ x1 + x2");
        assert!(matches!(&prog[0], Stmt::Expr(Expr::Formula { .. })));
    }

    #[test]
    fn lambda_with_return_type_and_generics() {
        let prog = parse_ok("\\<T>(x: T) -> T x");
        match &prog[0] {
            Stmt::Expr(Expr::Lambda {
                generics,
                return_type,
                params,
                ..
            }) => {
                assert_eq!(generics, &vec!["T".to_string()]);
                assert_eq!(return_type.as_deref(), Some("T"));
                assert_eq!(params[0].type_ann.as_deref(), Some("T"));
            }
            other => panic!("expected lambda, got {other:?}"),
        }
    }

    #[test]
    fn list_comprehension() {
        let prog = parse_ok("[x * 2 for x in xs if x > 0]");
        assert!(matches!(&prog[0], Stmt::Expr(Expr::Comprehension { .. })));
    }
}
