use crate::syntax::ast::*;
use crate::error::{Error, ErrorCode};
use crate::syntax::token::{Token, TokenKind};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    next_id: NodeId,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0, next_id: 0 }
    }

    pub fn parse(mut self) -> Result<Program, Vec<Error>> {
        let mut errors = Vec::new();
        let program_id = self.node_id();
        let block_id = self.node_id();
        let span = self.span();
        let mut stmts = Vec::new();

        while !self.is_at_end() {
            let pos_before = self.pos;

            match self.parse_stmt() {
                Ok(s) => stmts.push(s),
                Err(e) => { errors.push(e); self.recover(); }
            }

            // guarantee progress: a stray `end`/`else` is reported once, then skipped
            if self.pos == pos_before {
                self.advance();
            }
        }

        if errors.is_empty() {
            Ok(Program { id: program_id, body: Block { id: block_id, stmts, span } })
        } else {
            Err(errors)
        }
    }

    // ─── Statements ──────────────────────────────────────────────────────────

    /// Statements up to (not including) `end`, `elsif`, `else` or end of input.
    fn parse_block(&mut self) -> Result<Block, Error> {
        let id = self.node_id();
        let span = self.span();
        let mut stmts = Vec::new();
        while !self.peek_kind().ends_block() {
            stmts.push(self.parse_stmt()?);
        }
        Ok(Block { id, stmts, span })
    }

    fn parse_stmt(&mut self) -> Result<Stmt, Error> {
        match self.peek_kind() {
            TokenKind::Def    => self.parse_fn_def(),
            TokenKind::If     => self.parse_if(),
            TokenKind::While  => self.parse_while(),
            TokenKind::For    => self.parse_for(),
            TokenKind::Return => self.parse_return(),
            TokenKind::Final  => self.parse_final(),
            _ => self.parse_assign_or_expr(),
        }
    }

    fn parse_fn_def(&mut self) -> Result<Stmt, Error> {
        let span = self.span();
        self.expect(TokenKind::Def)?;
        let id = self.node_id();
        let name = self.expect_ident()?;
        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        while !self.check(TokenKind::RParen) && !self.is_at_end() {
            params.push(self.expect_ident()?);
            if !self.matches(TokenKind::Comma) { break; }
        }
        self.expect(TokenKind::RParen)?;
        self.expect(TokenKind::Colon)?;
        let body = self.parse_block()?;
        self.expect(TokenKind::End)?;
        Ok(Stmt::FnDef(FnDef { id, name, params, body, span }))
    }

    fn parse_if(&mut self) -> Result<Stmt, Error> {
        let span = self.span();
        self.expect(TokenKind::If)?;
        let condition = self.parse_expr()?;
        self.expect(TokenKind::Colon)?;
        let then_block = self.parse_block()?;

        // clause order is checked by the analyzer, not here
        let mut branches = Vec::new();
        loop {
            let branch_span = self.span();
            let condition = match self.peek_kind() {
                TokenKind::Elsif => { self.advance(); Some(self.parse_expr()?) }
                TokenKind::Else  => { self.advance(); None }
                _ => break,
            };
            self.expect(TokenKind::Colon)?;
            let block = self.parse_block()?;
            branches.push(ElseBranch { condition, block, span: branch_span });
        }

        self.expect(TokenKind::End)?;
        Ok(Stmt::If(IfStmt { condition, then_block, branches, span }))
    }

    fn parse_while(&mut self) -> Result<Stmt, Error> {
        let span = self.span();
        self.expect(TokenKind::While)?;
        let condition = self.parse_expr()?;
        self.expect(TokenKind::Colon)?;
        let body = self.parse_block()?;
        self.expect(TokenKind::End)?;
        Ok(Stmt::While(WhileStmt { condition, body, span }))
    }

    fn parse_for(&mut self) -> Result<Stmt, Error> {
        let span = self.span();
        self.expect(TokenKind::For)?;
        let id = self.node_id();
        let var = self.expect_ident()?;
        self.expect(TokenKind::In)?;
        let iterable = self.parse_expr()?;
        self.expect(TokenKind::Colon)?;
        let body = self.parse_block()?;
        self.expect(TokenKind::End)?;
        Ok(Stmt::For(ForStmt { id, var, iterable, body, span }))
    }

    fn parse_return(&mut self) -> Result<Stmt, Error> {
        let span = self.span();
        self.expect(TokenKind::Return)?;
        let value = if self.peek_kind().starts_expr() {
            Some(self.parse_expr()?)
        } else {
            None
        };
        Ok(Stmt::Return(ReturnStmt { value, span }))
    }

    /// `final name = expr`; only plain names can be final.
    fn parse_final(&mut self) -> Result<Stmt, Error> {
        let span = self.span();
        self.expect(TokenKind::Final)?;
        let name = self.expect_ident()?;
        self.expect(TokenKind::Eq)?;
        let value = self.parse_expr()?;
        let id = self.node_id();
        Ok(Stmt::Assign(Assign { id, target: Target::Name(name), value, is_final: true, span }))
    }

    /// `lvalue = expr` when an `=` follows, otherwise an expression statement.
    fn parse_assign_or_expr(&mut self) -> Result<Stmt, Error> {
        let span = self.span();
        let expr = self.parse_expr()?;
        if !self.check(TokenKind::Eq) {
            return Ok(Stmt::Expr(expr));
        }

        let target = match expr.kind {
            ExprKind::Ident(name) => Target::Name(Ident { id: expr.id, name, span: expr.span }),
            ExprKind::Index { base, index } => Target::Index { id: expr.id, base, index, span: expr.span },
            _ => {
                let tok = self.peek();
                return Err(Error::new(ErrorCode::P003, tok.line, tok.column,
                    "only a name or an indexed element can be assigned to"));
            }
        };
        self.advance(); // consume `=`
        let value = self.parse_expr()?;
        let id = self.node_id();
        Ok(Stmt::Assign(Assign { id, target, value, is_final: false, span }))
    }

    // ─── Expressions (precedence climbing) ───────────────────────────────────

    fn parse_expr(&mut self) -> Result<Expr, Error> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_and()?;
        while self.check(TokenKind::Or) {
            self.advance();
            let right = self.parse_and()?;
            left = self.binary(BinOp::Or, left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_not()?;
        while self.check(TokenKind::And) {
            self.advance();
            let right = self.parse_not()?;
            left = self.binary(BinOp::And, left, right);
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, Error> {
        let span = self.span();
        if self.matches(TokenKind::Not) {
            let operand = self.parse_not()?;
            return Ok(self.expr(ExprKind::Unary { op: UnOp::Not, operand: Box::new(operand) }, span));
        }
        self.parse_equality()
    }

    fn parse_equality(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_comparison()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::EqEq   => BinOp::Eq,
                TokenKind::BangEq => BinOp::NotEq,
                _ => break,
            };
            self.advance();
            let right = self.parse_comparison()?;
            left = self.binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_addition()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Lt   => BinOp::Lt,
                TokenKind::LtEq => BinOp::LtEq,
                TokenKind::Gt   => BinOp::Gt,
                TokenKind::GtEq => BinOp::GtEq,
                _ => break,
            };
            self.advance();
            let right = self.parse_addition()?;
            left = self.binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_addition(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_multiplication()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus  => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplication()?;
            left = self.binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_multiplication(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star    => BinOp::Mul,
                TokenKind::Slash   => BinOp::Div,
                TokenKind::Percent => BinOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = self.binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, Error> {
        let span = self.span();
        if self.matches(TokenKind::Minus) {
            let operand = self.parse_unary()?;
            return Ok(self.expr(ExprKind::Unary { op: UnOp::Neg, operand: Box::new(operand) }, span));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, Error> {
        let mut expr = self.parse_primary()?;

        // index: expr[i], chained for nested arrays
        while self.check(TokenKind::LBracket) {
            let span = expr.span;
            self.advance();
            let index = self.parse_expr()?;
            self.expect(TokenKind::RBracket)?;
            expr = self.expr(ExprKind::Index { base: Box::new(expr), index: Box::new(index) }, span);
        }

        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, Error> {
        let tok = self.peek().clone();
        let span = Span::new(tok.line, tok.column);

        match tok.kind {
            TokenKind::Int(v)       => { self.advance(); Ok(self.expr(ExprKind::Int(v), span)) }
            TokenKind::StringLit(s) => { self.advance(); Ok(self.expr(ExprKind::Str(s), span)) }
            TokenKind::True         => { self.advance(); Ok(self.expr(ExprKind::Bool(true), span)) }
            TokenKind::False        => { self.advance(); Ok(self.expr(ExprKind::Bool(false), span)) }
            TokenKind::None         => { self.advance(); Ok(self.expr(ExprKind::None, span)) }

            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(expr)
            }

            TokenKind::LBracket => self.parse_array(span),
            TokenKind::LBrace   => self.parse_map(span),
            TokenKind::Ident(_) => self.parse_call_or_ident(),

            _ => Err(self.unexpected("expression")),
        }
    }

    fn parse_call_or_ident(&mut self) -> Result<Expr, Error> {
        let callee = self.expect_ident()?;
        let span = callee.span;

        if self.check(TokenKind::LParen) {
            self.advance();
            let args = self.parse_arg_list()?;
            self.expect(TokenKind::RParen)?;
            Ok(self.expr(ExprKind::Call { callee, args }, span))
        } else {
            // the ident node id doubles as the expression id
            Ok(Expr { id: callee.id, kind: ExprKind::Ident(callee.name), span })
        }
    }

    /// `[]`, `[:n]`, `[a, b]` or `[e for x in xs if c]`.
    fn parse_array(&mut self, span: Span) -> Result<Expr, Error> {
        self.expect(TokenKind::LBracket)?;

        if self.matches(TokenKind::RBracket) {
            return Ok(self.expr(ExprKind::Array(Vec::new()), span));
        }

        if self.matches(TokenKind::Colon) {
            let size = self.parse_expr()?;
            self.expect(TokenKind::RBracket)?;
            return Ok(self.expr(ExprKind::SizedArray(Box::new(size)), span));
        }

        let first = self.parse_expr()?;

        if self.matches(TokenKind::For) {
            let var = self.expect_ident()?;
            self.expect(TokenKind::In)?;
            let iterable = self.parse_expr()?;
            let filter = if self.matches(TokenKind::If) { Some(self.parse_expr()?) } else { None };
            self.expect(TokenKind::RBracket)?;
            let comp = Comprehension { element: first, var, iterable, filter };
            return Ok(self.expr(ExprKind::Comprehension(Box::new(comp)), span));
        }

        let mut items = vec![first];
        while self.matches(TokenKind::Comma) {
            if self.check(TokenKind::RBracket) { break; }
            items.push(self.parse_expr()?);
        }
        self.expect(TokenKind::RBracket)?;
        Ok(self.expr(ExprKind::Array(items), span))
    }

    fn parse_map(&mut self, span: Span) -> Result<Expr, Error> {
        self.expect(TokenKind::LBrace)?;
        let mut entries = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            let key = self.parse_expr()?;
            self.expect(TokenKind::Colon)?;
            let value = self.parse_expr()?;
            entries.push((key, value));
            if !self.matches(TokenKind::Comma) { break; }
        }
        self.expect(TokenKind::RBrace)?;
        Ok(self.expr(ExprKind::Map(entries), span))
    }

    // ─── Argument lists ──────────────────────────────────────────────────────

    fn parse_arg_list(&mut self) -> Result<Vec<Expr>, Error> {
        let mut args = Vec::new();
        while !self.check(TokenKind::RParen) && !self.is_at_end() {
            args.push(self.parse_expr()?);
            if !self.matches(TokenKind::Comma) { break; }
        }
        Ok(args)
    }

    // ─── Node construction ───────────────────────────────────────────────────

    fn node_id(&mut self) -> NodeId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn expr(&mut self, kind: ExprKind, span: Span) -> Expr {
        Expr { id: self.node_id(), kind, span }
    }

    fn binary(&mut self, op: BinOp, left: Expr, right: Expr) -> Expr {
        let span = left.span;
        self.expr(ExprKind::Binary { op, left: Box::new(left), right: Box::new(right) }, span)
    }

    // ─── Token primitives ────────────────────────────────────────────────────

    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn peek_kind(&self) -> TokenKind {
        self.tokens[self.pos].kind.clone()
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() { self.pos += 1; }
        tok
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) { self.advance(); true } else { false }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, Error> {
        if self.check(kind.clone()) {
            Ok(self.advance())
        } else {
            let tok = self.peek();
            Err(Error::new(
                ErrorCode::P002,
                tok.line,
                tok.column,
                format!("expected {:?}, found {:?}", kind, tok.kind),
            ))
        }
    }

    fn expect_ident(&mut self) -> Result<Ident, Error> {
        let tok = self.peek().clone();
        match tok.kind {
            TokenKind::Ident(name) => {
                self.advance();
                let id = self.node_id();
                Ok(Ident { id, name, span: Span::new(tok.line, tok.column) })
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    fn span(&self) -> Span {
        let tok = self.peek();
        Span::new(tok.line, tok.column)
    }

    fn unexpected(&self, expected: &str) -> Error {
        let tok = self.peek();
        Error::new(
            ErrorCode::P001,
            tok.line,
            tok.column,
            format!("expected {}, found {:?}", expected, tok.kind),
        )
    }

    /// Skip tokens until we find something that looks like a new statement.
    /// Used after a parse error to attempt recovery.
    fn recover(&mut self) {
        loop {
            match self.peek_kind() {
                TokenKind::Eof
                | TokenKind::Def
                | TokenKind::If
                | TokenKind::While
                | TokenKind::For
                | TokenKind::Return
                | TokenKind::Final => break,
                _ => { self.advance(); }
            }
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::lexer::Lexer;

    fn parse(src: &str) -> Program {
        let tokens = Lexer::new(src).tokenize().expect("lex failed");
        Parser::new(tokens).parse().expect("parse failed")
    }

    fn parse_expr_src(src: &str) -> Expr {
        let tokens = Lexer::new(src).tokenize().expect("lex failed");
        let mut p = Parser::new(tokens);
        p.parse_expr().expect("parse_expr failed")
    }

    fn parse_err(src: &str) -> Vec<Error> {
        let tokens = Lexer::new(src).tokenize().expect("lex failed");
        Parser::new(tokens).parse().expect_err("expected parse error")
    }

    fn stmts(src: &str) -> Vec<Stmt> {
        parse(src).body.stmts
    }

    // ── statements ───────────────────────────────────────────────────────────

    #[test]
    fn assignment() {
        let s = stmts("x = 1");
        let Stmt::Assign(a) = &s[0] else { panic!("expected Assign") };
        assert!(matches!(&a.target, Target::Name(n) if n.name == "x"));
        assert!(matches!(a.value.kind, ExprKind::Int(1)));
        assert!(!a.is_final);
    }

    #[test]
    fn final_assignment() {
        let s = stmts("final a = 1");
        let Stmt::Assign(a) = &s[0] else { panic!("expected Assign") };
        assert!(a.is_final);
    }

    #[test]
    fn final_index_is_error() {
        let errs = parse_err("final a[3] = 1");
        assert_eq!(errs[0].code, ErrorCode::P002);
    }

    #[test]
    fn final_def_is_error() {
        parse_err("final def f(x):\n return x\n end");
    }

    #[test]
    fn indexed_assignment() {
        let s = stmts("a[1][2] = 3");
        let Stmt::Assign(a) = &s[0] else { panic!("expected Assign") };
        let Target::Index { base, index, .. } = &a.target else { panic!("expected index target") };
        assert!(matches!(index.kind, ExprKind::Int(2)));
        assert!(matches!(base.kind, ExprKind::Index { .. }));
    }

    #[test]
    fn invalid_assignment_target() {
        let errs = parse_err("f(1) = 2");
        assert_eq!(errs[0].code, ErrorCode::P003);
    }

    #[test]
    fn statements_need_no_separator() {
        let s = stmts("a = read(f)while a != \"\": a = read(f) end");
        assert_eq!(s.len(), 2);
        assert!(matches!(s[1], Stmt::While(_)));
    }

    #[test]
    fn fn_def() {
        let s = stmts("def add(a, b):\n return a + b\n end");
        let Stmt::FnDef(f) = &s[0] else { panic!("expected FnDef") };
        assert_eq!(f.name.name, "add");
        let names: Vec<_> = f.params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
        assert!(matches!(f.body.stmts[0], Stmt::Return(ReturnStmt { value: Some(_), .. })));
    }

    #[test]
    fn fn_def_without_params() {
        let s = stmts("def f(): end");
        let Stmt::FnDef(f) = &s[0] else { panic!("expected FnDef") };
        assert!(f.params.is_empty());
        assert!(f.body.stmts.is_empty());
    }

    #[test]
    fn bare_return() {
        let s = stmts("def f(): return end");
        let Stmt::FnDef(f) = &s[0] else { panic!("expected FnDef") };
        assert!(matches!(f.body.stmts[0], Stmt::Return(ReturnStmt { value: None, .. })));
    }

    #[test]
    fn if_elsif_else() {
        let s = stmts("if a: 1 elsif b: 2 elsif c: 3 else: 4 end");
        let Stmt::If(i) = &s[0] else { panic!("expected If") };
        assert_eq!(i.branches.len(), 3);
        assert!(i.branches[0].condition.is_some());
        assert!(i.branches[2].condition.is_none());
    }

    #[test]
    fn else_before_elsif_still_parses() {
        let s = stmts("if a: 1 else: 2 elsif b: 3 end");
        let Stmt::If(i) = &s[0] else { panic!("expected If") };
        assert_eq!(i.branches.len(), 2);
    }

    #[test]
    fn while_loop() {
        let s = stmts("while i < 3: i = i + 1 end");
        let Stmt::While(w) = &s[0] else { panic!("expected While") };
        assert_eq!(w.body.stmts.len(), 1);
    }

    #[test]
    fn for_loop() {
        let s = stmts("for x in range(3): print(x) end");
        let Stmt::For(f) = &s[0] else { panic!("expected For") };
        assert_eq!(f.var.name, "x");
        assert!(matches!(&f.iterable.kind, ExprKind::Call { callee, .. } if callee.name == "range"));
    }

    #[test]
    fn for_final_is_error() {
        parse_err("for final x in [1, 2]:\n print(x)\n end");
    }

    #[test]
    fn missing_end_is_error() {
        let errs = parse_err("while True: x = 1");
        assert_eq!(errs[0].code, ErrorCode::P002);
    }

    #[test]
    fn stray_end_is_error() {
        let errs = parse_err("x = 1 end");
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].code, ErrorCode::P001);
    }

    #[test]
    fn recovers_after_error() {
        let errs = parse_err("x = ) def f(: end");
        assert_eq!(errs.len(), 2);
    }

    // ── expressions ──────────────────────────────────────────────────────────

    #[test]
    fn binary_precedence() {
        let e = parse_expr_src("1 + 90 * 85");
        let ExprKind::Binary { op, right, .. } = e.kind else { panic!("expected Binary") };
        assert_eq!(op, BinOp::Add);
        assert!(matches!(right.kind, ExprKind::Binary { op: BinOp::Mul, .. }));
    }

    #[test]
    fn left_associative() {
        let e = parse_expr_src("5 + 4 % 2 - 6");
        let ExprKind::Binary { op, left, .. } = e.kind else { panic!("expected Binary") };
        assert_eq!(op, BinOp::Sub);
        assert!(matches!(left.kind, ExprKind::Binary { op: BinOp::Add, .. }));
    }

    #[test]
    fn double_plus_is_error() {
        let tokens = Lexer::new("5 + +1").tokenize().unwrap();
        assert!(Parser::new(tokens).parse().is_err());
    }

    #[test]
    fn not_binds_looser_than_comparison() {
        let e = parse_expr_src("not a == b");
        let ExprKind::Unary { op, operand } = e.kind else { panic!("expected Unary") };
        assert_eq!(op, UnOp::Not);
        assert!(matches!(operand.kind, ExprKind::Binary { op: BinOp::Eq, .. }));
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let e = parse_expr_src("a or b and c");
        let ExprKind::Binary { op, right, .. } = e.kind else { panic!("expected Binary") };
        assert_eq!(op, BinOp::Or);
        assert!(matches!(right.kind, ExprKind::Binary { op: BinOp::And, .. }));
    }

    #[test]
    fn negation() {
        let e = parse_expr_src("-x");
        assert!(matches!(e.kind, ExprKind::Unary { op: UnOp::Neg, .. }));
    }

    #[test]
    fn array_literal() {
        let e = parse_expr_src("[1, \"a\", None]");
        let ExprKind::Array(items) = e.kind else { panic!("expected Array") };
        assert_eq!(items.len(), 3);
    }

    #[test]
    fn empty_array_and_map() {
        assert!(matches!(parse_expr_src("[]").kind, ExprKind::Array(ref v) if v.is_empty()));
        assert!(matches!(parse_expr_src("{}").kind, ExprKind::Map(ref v) if v.is_empty()));
    }

    #[test]
    fn sized_array() {
        let e = parse_expr_src("[:n + 1]");
        assert!(matches!(e.kind, ExprKind::SizedArray(_)));
    }

    #[test]
    fn map_literal() {
        let e = parse_expr_src("{1: 2, \"yo\": [1], True: None}");
        let ExprKind::Map(entries) = e.kind else { panic!("expected Map") };
        assert_eq!(entries.len(), 3);
        assert!(matches!(entries[2].0.kind, ExprKind::Bool(true)));
    }

    #[test]
    fn comprehension() {
        let e = parse_expr_src("[f(x) for x in [1, 2] if x < 2]");
        let ExprKind::Comprehension(c) = e.kind else { panic!("expected Comprehension") };
        assert_eq!(c.var.name, "x");
        assert!(matches!(c.element.kind, ExprKind::Call { .. }));
        assert!(c.filter.is_some());
    }

    #[test]
    fn comprehension_without_filter() {
        let e = parse_expr_src("[x for x in a]");
        let ExprKind::Comprehension(c) = e.kind else { panic!("expected Comprehension") };
        assert!(c.filter.is_none());
    }

    #[test]
    fn malformed_comprehension_is_error() {
        parse_err("[for x in [1, 2] x if x != 0]");
    }

    #[test]
    fn call_with_args() {
        let e = parse_expr_src("open(\"f.txt\", \"r\")");
        let ExprKind::Call { callee, args } = e.kind else { panic!("expected Call") };
        assert_eq!(callee.name, "open");
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn index_after_call() {
        let e = parse_expr_src("range(3)[0]");
        let ExprKind::Index { base, .. } = e.kind else { panic!("expected Index") };
        assert!(matches!(base.kind, ExprKind::Call { .. }));
    }

    #[test]
    fn node_ids_are_unique() {
        fn collect(e: &Expr, out: &mut Vec<NodeId>) {
            out.push(e.id);
            match &e.kind {
                ExprKind::Binary { left, right, .. } => { collect(left, out); collect(right, out); }
                ExprKind::Array(items) => items.iter().for_each(|i| collect(i, out)),
                ExprKind::Index { base, index } => { collect(base, out); collect(index, out); }
                _ => {}
            }
        }
        let e = parse_expr_src("[a + b, c[d]]");
        let mut ids = Vec::new();
        collect(&e, &mut ids);
        let len = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), len);
    }

    #[test]
    fn spans_point_at_source() {
        let s = stmts("x = 1\n  y = 2");
        assert_eq!(s[1].span(), Span::new(2, 3));
    }
}
