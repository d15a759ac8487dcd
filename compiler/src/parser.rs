// Parser for OpenACC-annotated C sources.
//
// Parses a token stream (from the lexer) into the AST. The C subset covers
// functions, declarations, structs and the usual statements; `#pragma acc`
// directive lines are parsed into typed clauses and attached to the
// following statement. Uses chumsky combinators.
//
// Preconditions: input is a valid token stream from `lexer::lex()`.
// Postconditions: returns an AST plus any parse errors (non-fatal).
// Failure modes: syntax errors produce `Rich` diagnostics.
// Side effects: none.

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;
use chumsky::span::SimpleSpan;

use crate::ast::*;
use crate::clause::{
    Clause, ClauseKind, DataClause, DirectiveKind, GangStatic, MotionClause, ReductionOp, TileSize,
};
use crate::lexer::Token;

type Extra<'tokens> = extra::Err<Rich<'tokens, Token, SimpleSpan>>;

/// Result of parsing: AST plus any errors.
#[derive(Debug)]
pub struct ParseResult {
    pub unit: Option<TranslationUnit>,
    pub errors: Vec<Rich<'static, Token, SimpleSpan>>,
}

/// Parse a source string. Lexes then parses.
///
/// Returns an AST (if parsing succeeded) plus any errors.
pub fn parse(source: &str) -> ParseResult {
    let lex_result = crate::lexer::lex(source);
    let len = source.len();

    let token_iter = lex_result.tokens.into_iter().map(|(tok, span)| {
        let cspan: SimpleSpan = (span.start..span.end).into();
        (tok, cspan)
    });
    let eoi: SimpleSpan = (len..len).into();
    let stream = Stream::from_iter(token_iter).map(eoi, |(t, s): (_, _)| (t, s));

    let parser = unit_parser(source);
    let (unit, parse_errors) = parser.parse(stream).into_output_errors();

    let mut all_errors: Vec<Rich<'static, Token, SimpleSpan>> = lex_result
        .errors
        .into_iter()
        .map(|e| {
            let span: SimpleSpan = (e.span.start..e.span.end).into();
            Rich::custom(span, e.message)
        })
        .collect();
    all_errors.extend(parse_errors.into_iter().map(|e| e.into_owned()));

    ParseResult {
        unit,
        errors: all_errors,
    }
}

fn join(a: SimpleSpan, b: SimpleSpan) -> SimpleSpan {
    (a.start..b.end).into()
}

/// One left-associative binary precedence level.
fn fold_binary<'tokens, I>(
    next: impl Parser<'tokens, I, Expr, Extra<'tokens>> + Clone,
    ops: impl Parser<'tokens, I, BinOp, Extra<'tokens>> + Clone,
) -> impl Parser<'tokens, I, Expr, Extra<'tokens>> + Clone
where
    I: ValueInput<'tokens, Token = Token, Span = SimpleSpan>,
{
    next.clone()
        .foldl(ops.then(next).repeated(), |lhs, (op, rhs)| {
            let span = join(lhs.span, rhs.span);
            Expr {
                kind: ExprKind::Binary(op, Box::new(lhs), Box::new(rhs)),
                span,
            }
        })
}

/// Trailing pieces of a postfix expression.
#[derive(Clone)]
enum Suffix {
    Call(Vec<Expr>),
    Index(Expr),
    Section(Option<Expr>, Option<Expr>),
    Member(Ident, bool),
    Postfix(PostfixOp),
}

fn apply_suffix(lhs: Expr, (suffix, span): (Suffix, SimpleSpan)) -> Expr {
    let span = join(lhs.span, span);
    let base = Box::new(lhs);
    let kind = match suffix {
        Suffix::Call(args) => ExprKind::Call(base, args),
        Suffix::Index(i) => ExprKind::Index(base, Box::new(i)),
        Suffix::Section(start, len) => ExprKind::Section {
            base,
            start: start.map(Box::new),
            len: len.map(Box::new),
        },
        Suffix::Member(field, arrow) => ExprKind::Member { base, field, arrow },
        Suffix::Postfix(op) => ExprKind::Postfix(op, base),
    };
    Expr { kind, span }
}

/// Declaration specifier words before folding into a `TypeSpec`.
#[derive(Clone)]
enum SpecWord {
    Storage(StorageClass),
    Const,
    Signed(bool),
    Long,
    Base(BaseType),
}

fn fold_spec<'a>(words: Vec<SpecWord>, span: SimpleSpan) -> Result<TypeSpec, Rich<'a, Token, SimpleSpan>> {
    let mut spec = TypeSpec {
        storage: None,
        is_const: false,
        unsigned: None,
        base: BaseType::Int,
        span,
    };
    let mut base: Option<BaseType> = None;
    let mut longs = 0;
    for w in words {
        match w {
            SpecWord::Storage(s) => spec.storage = Some(s),
            SpecWord::Const => spec.is_const = true,
            SpecWord::Signed(u) => spec.unsigned = Some(u),
            SpecWord::Long => longs += 1,
            SpecWord::Base(b) => {
                if base.is_some() {
                    return Err(Rich::custom(span, "two or more data types in declaration specifiers"));
                }
                base = Some(b);
            }
        }
    }
    spec.base = match (base, longs) {
        (None, 0) if spec.unsigned.is_some() => BaseType::Int,
        (None, 0) => {
            return Err(Rich::custom(span, "expected a type specifier"));
        }
        (None | Some(BaseType::Int), 1) => BaseType::Long,
        (None | Some(BaseType::Int), 2) => BaseType::LongLong,
        (Some(BaseType::Double), 1) => BaseType::Double,
        (Some(b), 0) => b,
        _ => return Err(Rich::custom(span, "invalid combination of type specifiers")),
    };
    Ok(spec)
}

// ── Main parser builder ──
//
// All grammar rules are built inside `unit_parser` so that the `source`
// reference is captured once and shared by all combinators.

fn unit_parser<'tokens, 'src: 'tokens, I>(
    source: &'src str,
) -> impl Parser<'tokens, I, TranslationUnit, Extra<'tokens>> + 'src
where
    'tokens: 'src,
    I: ValueInput<'tokens, Token = Token, Span = SimpleSpan>,
{
    let text = move |span: SimpleSpan| &source[span.start..span.end];

    // ── Identifier ──

    let ident = just(Token::Ident).map_with(move |_, e| {
        let span: SimpleSpan = e.span();
        Ident {
            name: text(span).to_string(),
            span,
        }
    });

    // Clause and directive names are plain identifiers matched by spelling.
    let kw = move |name: &'static str| {
        just(Token::Ident).try_map(move |_, span: SimpleSpan| {
            if text(span) == name {
                Ok(())
            } else {
                Err(Rich::custom(span, format!("expected '{name}'")))
            }
        })
    };

    // ── Expressions ──

    let expr = recursive(|expr| {
        let primary = choice((
            ident.clone().map_with(|id, e| Expr {
                kind: ExprKind::Ident(id),
                span: e.span(),
            }),
            select! {
                Token::IntLit(v) => ExprKind::Int(v),
                Token::StrLit(s) => ExprKind::Str(s),
                Token::CharLit(s) => ExprKind::Char(s),
            }
            .map_with(|kind, e| Expr { kind, span: e.span() }),
            just(Token::FloatLit).map_with(move |_, e| {
                let span: SimpleSpan = e.span();
                Expr {
                    kind: ExprKind::Float(text(span).to_string()),
                    span,
                }
            }),
            expr.clone()
                .delimited_by(just(Token::LParen), just(Token::RParen))
                .map_with(|inner, e| Expr {
                    kind: ExprKind::Paren(Box::new(inner)),
                    span: e.span(),
                }),
        ))
        .boxed();

        let suffix = choice((
            expr.clone()
                .separated_by(just(Token::Comma))
                .collect::<Vec<_>>()
                .delimited_by(just(Token::LParen), just(Token::RParen))
                .map(Suffix::Call),
            expr.clone()
                .delimited_by(just(Token::LBracket), just(Token::RBracket))
                .map(Suffix::Index),
            just(Token::Dot)
                .ignore_then(ident.clone())
                .map(|f| Suffix::Member(f, false)),
            just(Token::Arrow)
                .ignore_then(ident.clone())
                .map(|f| Suffix::Member(f, true)),
            just(Token::PlusPlus).to(Suffix::Postfix(PostfixOp::Inc)),
            just(Token::MinusMinus).to(Suffix::Postfix(PostfixOp::Dec)),
        ))
        .map_with(|s, e| (s, e.span()));

        let postfix = primary.foldl(suffix.repeated(), apply_suffix).boxed();

        let prefix_op = select! {
            Token::Minus => UnaryOp::Neg,
            Token::Plus => UnaryOp::Plus,
            Token::Bang => UnaryOp::Not,
            Token::Tilde => UnaryOp::BitNot,
            Token::Star => UnaryOp::Deref,
            Token::Amp => UnaryOp::AddrOf,
            Token::PlusPlus => UnaryOp::PreInc,
            Token::MinusMinus => UnaryOp::PreDec,
        }
        .map_with(|op, e| (op, e.span()));

        let unary = prefix_op
            .repeated()
            .foldr(postfix, |(op, span), rhs: Expr| {
                let span = join(span, rhs.span);
                Expr {
                    kind: ExprKind::Unary(op, Box::new(rhs)),
                    span,
                }
            })
            .boxed();

        let mul = fold_binary(
            unary,
            select! { Token::Star => BinOp::Mul, Token::Slash => BinOp::Div, Token::Percent => BinOp::Rem },
        )
        .boxed();
        let add = fold_binary(mul, select! { Token::Plus => BinOp::Add, Token::Minus => BinOp::Sub }).boxed();
        let shift = fold_binary(add, select! { Token::Shl => BinOp::Shl, Token::Shr => BinOp::Shr }).boxed();
        let rel = fold_binary(
            shift,
            select! {
                Token::Lt => BinOp::Lt,
                Token::Gt => BinOp::Gt,
                Token::Le => BinOp::Le,
                Token::Ge => BinOp::Ge,
            },
        )
        .boxed();
        let eq = fold_binary(rel, select! { Token::EqEq => BinOp::Eq, Token::NotEq => BinOp::Ne }).boxed();
        let bitand = fold_binary(eq, select! { Token::Amp => BinOp::BitAnd }).boxed();
        let bitxor = fold_binary(bitand, select! { Token::Caret => BinOp::BitXor }).boxed();
        let bitor = fold_binary(bitxor, select! { Token::Pipe => BinOp::BitOr }).boxed();
        let and = fold_binary(bitor, select! { Token::AmpAmp => BinOp::And }).boxed();
        let or = fold_binary(and, select! { Token::PipePipe => BinOp::Or }).boxed();

        let conditional = or
            .clone()
            .then(
                just(Token::Question)
                    .ignore_then(expr.clone())
                    .then_ignore(just(Token::Colon))
                    .then(expr.clone())
                    .or_not(),
            )
            .map(|(cond, rest)| match rest {
                None => cond,
                Some((a, b)) => {
                    let span = join(cond.span, b.span);
                    Expr {
                        kind: ExprKind::Ternary(Box::new(cond), Box::new(a), Box::new(b)),
                        span,
                    }
                }
            })
            .boxed();

        let assign_op = select! {
            Token::Assign => AssignOp::Assign,
            Token::PlusAssign => AssignOp::Add,
            Token::MinusAssign => AssignOp::Sub,
            Token::StarAssign => AssignOp::Mul,
            Token::SlashAssign => AssignOp::Div,
            Token::PercentAssign => AssignOp::Rem,
            Token::AmpAssign => AssignOp::BitAnd,
            Token::PipeAssign => AssignOp::BitOr,
            Token::CaretAssign => AssignOp::BitXor,
            Token::ShlAssign => AssignOp::Shl,
            Token::ShrAssign => AssignOp::Shr,
        };

        conditional
            .then(assign_op.then(expr.clone()).or_not())
            .map(|(lhs, rhs)| match rhs {
                None => lhs,
                Some((op, rhs)) => {
                    let span = join(lhs.span, rhs.span);
                    Expr {
                        kind: ExprKind::Assign(op, Box::new(lhs), Box::new(rhs)),
                        span,
                    }
                }
            })
    })
    .boxed();

    let paren_expr = expr
        .clone()
        .delimited_by(just(Token::LParen), just(Token::RParen));

    // ── Clause variable references: a, a.f, p->f, a[i], a[lb:len] ──

    let var_suffix = choice((
        just(Token::LBracket)
            .ignore_then(expr.clone().or_not())
            .then_ignore(just(Token::Colon))
            .then(expr.clone().or_not())
            .then_ignore(just(Token::RBracket))
            .map(|(start, len)| Suffix::Section(start, len)),
        expr.clone()
            .delimited_by(just(Token::LBracket), just(Token::RBracket))
            .map(Suffix::Index),
        just(Token::Dot)
            .ignore_then(ident.clone())
            .map(|f| Suffix::Member(f, false)),
        just(Token::Arrow)
            .ignore_then(ident.clone())
            .map(|f| Suffix::Member(f, true)),
    ))
    .map_with(|s, e| (s, e.span()));

    let var_ref = ident
        .clone()
        .map_with(|id, e| Expr {
            kind: ExprKind::Ident(id),
            span: e.span(),
        })
        .foldl(var_suffix.repeated(), apply_suffix)
        .boxed();

    let var_list = var_ref
        .separated_by(just(Token::Comma))
        .at_least(1)
        .collect::<Vec<_>>()
        .boxed();

    // ── Clauses ──

    let data_clause = just(Token::Ident)
        .try_map(move |_, span: SimpleSpan| {
            DataClause::from_name(text(span))
                .ok_or_else(|| Rich::custom(span, format!("unknown OpenACC clause '{}'", text(span))))
        })
        .then(
            var_list
                .clone()
                .delimited_by(just(Token::LParen), just(Token::RParen)),
        )
        .map(|(dc, vars)| ClauseKind::Data(dc, vars));

    let reduction_op = select! {
        Token::Plus => ReductionOp::Add,
        Token::Star => ReductionOp::Mul,
        Token::Amp => ReductionOp::BitAnd,
        Token::Pipe => ReductionOp::BitOr,
        Token::Caret => ReductionOp::BitXor,
        Token::AmpAmp => ReductionOp::And,
        Token::PipePipe => ReductionOp::Or,
    }
    .or(kw("max").to(ReductionOp::Max))
    .or(kw("min").to(ReductionOp::Min));

    let star_span = just(Token::Star).map_with(|_, e| e.span());

    let gang_static = just(Token::Static)
        .ignore_then(just(Token::Colon))
        .ignore_then(
            star_span
                .clone()
                .map(GangStatic::Star)
                .or(expr.clone().map(GangStatic::Expr)),
        )
        .delimited_by(just(Token::LParen), just(Token::RParen));

    let tile_size = star_span
        .clone()
        .map(TileSize::Star)
        .or(expr.clone().map(TileSize::Expr));

    let motion = choice((
        kw("self").to(MotionClause::Self_),
        kw("host").to(MotionClause::Host),
        kw("device").to(MotionClause::Device),
    ));

    let clause = choice((
        kw("private")
            .ignore_then(var_list.clone().delimited_by(just(Token::LParen), just(Token::RParen)))
            .map(ClauseKind::Private),
        kw("firstprivate")
            .ignore_then(var_list.clone().delimited_by(just(Token::LParen), just(Token::RParen)))
            .map(ClauseKind::Firstprivate),
        kw("reduction")
            .ignore_then(
                reduction_op
                    .then_ignore(just(Token::Colon))
                    .then(var_list.clone())
                    .delimited_by(just(Token::LParen), just(Token::RParen)),
            )
            .map(|(op, vars)| ClauseKind::Reduction(op, vars)),
        just(Token::If)
            .ignore_then(paren_expr.clone())
            .map(ClauseKind::If),
        kw("num_gangs")
            .ignore_then(paren_expr.clone())
            .map(ClauseKind::NumGangs),
        kw("num_workers")
            .ignore_then(paren_expr.clone())
            .map(ClauseKind::NumWorkers),
        kw("vector_length")
            .ignore_then(paren_expr.clone())
            .map(ClauseKind::VectorLength),
        kw("gang")
            .ignore_then(gang_static.or_not())
            .map(ClauseKind::Gang),
        kw("worker").to(ClauseKind::Worker),
        kw("vector").to(ClauseKind::Vector),
        kw("seq").to(ClauseKind::Seq),
        kw("auto").to(ClauseKind::Auto),
        kw("independent").to(ClauseKind::Independent),
        kw("collapse")
            .ignore_then(paren_expr.clone())
            .map(ClauseKind::Collapse),
        kw("tile")
            .ignore_then(
                tile_size
                    .separated_by(just(Token::Comma))
                    .at_least(1)
                    .collect::<Vec<_>>()
                    .delimited_by(just(Token::LParen), just(Token::RParen)),
            )
            .map(ClauseKind::Tile),
        motion
            .then(var_list.clone().delimited_by(just(Token::LParen), just(Token::RParen)))
            .map(|(m, vars)| ClauseKind::Motion(m, vars)),
        kw("if_present").to(ClauseKind::IfPresent),
        data_clause,
    ))
    .map_with(|kind, e| Clause {
        kind,
        span: e.span(),
    });

    // ── Directive line ──

    let directive_kind = choice((
        kw("parallel")
            .ignore_then(kw("loop").or_not())
            .map(|l| {
                if l.is_some() {
                    DirectiveKind::ParallelLoop
                } else {
                    DirectiveKind::Parallel
                }
            }),
        kw("data").to(DirectiveKind::Data),
        kw("loop").to(DirectiveKind::Loop),
        kw("update").to(DirectiveKind::Update),
        kw("enter")
            .ignore_then(kw("data"))
            .to(DirectiveKind::EnterData),
        kw("exit")
            .ignore_then(kw("data"))
            .to(DirectiveKind::ExitData),
        kw("routine").to(DirectiveKind::Routine),
    ));

    let directive = just(Token::PragmaAcc)
        .ignore_then(directive_kind)
        .then(
            clause
                .then_ignore(just(Token::Comma).or_not())
                .repeated()
                .collect::<Vec<_>>(),
        )
        .map_with(|(kind, clauses), e| AccDirective {
            kind,
            clauses,
            span: e.span(),
        })
        .then_ignore(just(Token::Newline))
        .boxed();

    // ── Type specifiers and declarators ──

    let spec_word = choice((
        just(Token::Static).to(SpecWord::Storage(StorageClass::Static)),
        just(Token::Extern).to(SpecWord::Storage(StorageClass::Extern)),
        just(Token::Const).to(SpecWord::Const),
        just(Token::Unsigned).to(SpecWord::Signed(true)),
        just(Token::Signed).to(SpecWord::Signed(false)),
        just(Token::Long).to(SpecWord::Long),
        just(Token::Void).to(SpecWord::Base(BaseType::Void)),
        just(Token::Char).to(SpecWord::Base(BaseType::Char)),
        just(Token::Short).to(SpecWord::Base(BaseType::Short)),
        just(Token::Int).to(SpecWord::Base(BaseType::Int)),
        just(Token::Float).to(SpecWord::Base(BaseType::Float)),
        just(Token::Double).to(SpecWord::Base(BaseType::Double)),
        just(Token::Struct)
            .ignore_then(ident.clone())
            .map(|id| SpecWord::Base(BaseType::Struct(id.name))),
    ));

    let type_spec = spec_word
        .repeated()
        .at_least(1)
        .collect::<Vec<_>>()
        .try_map(fold_spec)
        .boxed();

    let initializer = recursive(|init| {
        init.separated_by(just(Token::Comma))
            .allow_trailing()
            .collect::<Vec<_>>()
            .delimited_by(just(Token::LBrace), just(Token::RBrace))
            .map_with(|items, e| Initializer::List(items, e.span()))
            .or(expr.clone().map(Initializer::Expr))
    });

    let pointers = just(Token::Star).repeated().count().map(|n| n as u32);

    let dims = expr
        .clone()
        .or_not()
        .delimited_by(just(Token::LBracket), just(Token::RBracket))
        .repeated()
        .collect::<Vec<_>>();

    let declarator = pointers
        .clone()
        .then(ident.clone())
        .then(dims.clone())
        .then(just(Token::Assign).ignore_then(initializer).or_not())
        .map_with(|(((pointers, name), dims), init), e| Declarator {
            name,
            pointers,
            dims,
            init,
            span: e.span(),
        });

    let declaration = type_spec
        .clone()
        .then(
            declarator
                .separated_by(just(Token::Comma))
                .at_least(1)
                .collect::<Vec<_>>(),
        )
        .then_ignore(just(Token::Semi))
        .map_with(|(spec, declarators), e| Declaration {
            spec,
            declarators,
            span: e.span(),
        })
        .boxed();

    // ── Statements ──

    let stmt = recursive(|stmt| {
        let block = stmt
            .clone()
            .repeated()
            .collect::<Vec<_>>()
            .delimited_by(just(Token::LBrace), just(Token::RBrace))
            .map_with(|stmts, e| Block {
                stmts,
                span: e.span(),
            });

        let boxed_stmt = stmt.clone().map(Box::new);

        let if_stmt = just(Token::If)
            .ignore_then(paren_expr.clone())
            .then(boxed_stmt.clone())
            .then(just(Token::Else).ignore_then(boxed_stmt.clone()).or_not())
            .map(|((cond, then), els)| StmtKind::If { cond, then, els });

        let for_init = declaration
            .clone()
            .map(|d| Some(ForInit::Decl(d)))
            .or(expr
                .clone()
                .or_not()
                .then_ignore(just(Token::Semi))
                .map(|e| e.map(ForInit::Expr)));

        let for_stmt = just(Token::For)
            .ignore_then(
                for_init
                    .then(expr.clone().or_not())
                    .then_ignore(just(Token::Semi))
                    .then(expr.clone().or_not())
                    .delimited_by(just(Token::LParen), just(Token::RParen)),
            )
            .then(boxed_stmt.clone())
            .map(|(((init, cond), step), body)| {
                StmtKind::For(ForStmt {
                    init,
                    cond,
                    step,
                    body,
                })
            });

        let while_stmt = just(Token::While)
            .ignore_then(paren_expr.clone())
            .then(boxed_stmt.clone())
            .map(|(cond, body)| StmtKind::While { cond, body });

        let switch_stmt = just(Token::Switch)
            .ignore_then(paren_expr.clone())
            .then(boxed_stmt.clone())
            .map(|(cond, body)| StmtKind::Switch { cond, body });

        let acc_stmt = directive
            .clone()
            .filter(|d: &AccDirective| d.kind.is_construct())
            .then(boxed_stmt)
            .map(|(directive, body)| StmtKind::Acc(AccConstruct { directive, body }));

        // A misplaced `routine` lands here too and is reported by the checker.
        let acc_exec = directive
            .clone()
            .filter(|d: &AccDirective| !d.kind.is_construct())
            .map(StmtKind::AccExec);

        choice((
            block.map(StmtKind::Block),
            declaration.clone().map(StmtKind::Decl),
            if_stmt,
            for_stmt,
            while_stmt,
            switch_stmt,
            just(Token::Case)
                .ignore_then(expr.clone())
                .then_ignore(just(Token::Colon))
                .map(StmtKind::Case),
            just(Token::Default)
                .then_ignore(just(Token::Colon))
                .to(StmtKind::Default),
            just(Token::Break)
                .then_ignore(just(Token::Semi))
                .to(StmtKind::Break),
            just(Token::Continue)
                .then_ignore(just(Token::Semi))
                .to(StmtKind::Continue),
            just(Token::Return)
                .ignore_then(expr.clone().or_not())
                .then_ignore(just(Token::Semi))
                .map(StmtKind::Return),
            just(Token::Semi).to(StmtKind::Empty),
            acc_stmt,
            acc_exec,
            expr.clone().then_ignore(just(Token::Semi)).map(StmtKind::Expr),
        ))
        .map_with(|kind, e| Stmt {
            kind,
            span: e.span(),
        })
    })
    .boxed();

    let block = stmt
        .repeated()
        .collect::<Vec<_>>()
        .delimited_by(just(Token::LBrace), just(Token::RBrace))
        .map_with(|stmts, e| Block {
            stmts,
            span: e.span(),
        });

    // ── Top-level items ──

    let record = just(Token::Struct)
        .ignore_then(ident.clone())
        .then(
            declaration
                .clone()
                .repeated()
                .collect::<Vec<_>>()
                .delimited_by(just(Token::LBrace), just(Token::RBrace)),
        )
        .then_ignore(just(Token::Semi))
        .map_with(|(name, fields), e| {
            Item::Record(RecordDef {
                name,
                fields,
                span: e.span(),
            })
        });

    let param = type_spec
        .clone()
        .then(pointers.clone())
        .then(ident.clone())
        .then(dims)
        .map_with(|(((spec, pointers), name), dims), e| Param {
            spec,
            declarator: Declarator {
                name,
                pointers,
                dims,
                init: None,
                span: e.span(),
            },
        });

    let params = choice((
        just(Token::Void)
            .then(just(Token::RParen).rewind())
            .to((Vec::new(), true)),
        param
            .separated_by(just(Token::Comma))
            .collect::<Vec<_>>()
            .map(|p| (p, false)),
    ))
    .delimited_by(just(Token::LParen), just(Token::RParen));

    let function = type_spec
        .clone()
        .then(pointers)
        .then(ident.clone())
        .then(params)
        .then(block.map(Some).or(just(Token::Semi).to(None)))
        .map_with(|((((ret, ret_pointers), name), (params, void_params)), body), e| FunctionDef {
            ret,
            ret_pointers,
            name,
            params,
            void_params,
            body,
            routine: None,
            span: e.span(),
        });

    let routine = directive.filter(|d: &AccDirective| d.kind == DirectiveKind::Routine);

    let function = routine
        .or_not()
        .then(function)
        .map(|(routine, f)| Item::Function(FunctionDef { routine, ..f }));

    let pp_line = just(Token::PpLine).map_with(move |_, e| {
        let span: SimpleSpan = e.span();
        Item::Preprocessor(text(span).trim_end().to_string(), span)
    });

    choice((pp_line, record, function, declaration.map(Item::Decl)))
        .repeated()
        .collect::<Vec<_>>()
        .map_with(|items, e| TranslationUnit {
            items,
            span: e.span(),
        })
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(source: &str) -> TranslationUnit {
        let result = parse(source);
        assert!(
            result.errors.is_empty(),
            "unexpected parse errors: {:?}",
            result.errors
        );
        result.unit.expect("expected a translation unit")
    }

    /// Parse `body` as the statements of `void f() { ... }` and return them.
    fn parse_body(body: &str) -> Vec<Stmt> {
        let src = format!("void f() {{\n{body}\n}}\n");
        let unit = parse_ok(&src);
        let Item::Function(f) = &unit.items[0] else {
            panic!("expected function")
        };
        f.body.clone().expect("expected body").stmts
    }

    fn parse_one_stmt(body: &str) -> Stmt {
        let mut stmts = parse_body(body);
        assert_eq!(stmts.len(), 1, "expected one statement");
        stmts.remove(0)
    }

    fn one_expr(body: &str) -> Expr {
        let s = parse_one_stmt(&format!("{body};"));
        let StmtKind::Expr(e) = s.kind else {
            panic!("expected expression statement")
        };
        e
    }

    // ── Top level ──

    #[test]
    fn empty_unit() {
        assert!(parse_ok("").items.is_empty());
    }

    #[test]
    fn include_and_function() {
        let unit = parse_ok("#include <stdio.h>\nint main() { return 0; }\n");
        assert!(matches!(&unit.items[0], Item::Preprocessor(s, _) if s == "#include <stdio.h>"));
        let Item::Function(f) = &unit.items[1] else {
            panic!("expected function")
        };
        assert_eq!(f.name.name, "main");
        assert!(f.params.is_empty());
        assert!(!f.void_params);
    }

    #[test]
    fn void_params_and_prototype() {
        let unit = parse_ok("int g(void);\nvoid h(int *p, int n, double a[]);");
        let Item::Function(g) = &unit.items[0] else {
            panic!("expected function")
        };
        assert!(g.void_params);
        assert!(g.body.is_none());
        let Item::Function(h) = &unit.items[1] else {
            panic!("expected function")
        };
        assert_eq!(h.params.len(), 3);
        assert_eq!(h.params[0].declarator.pointers, 1);
        assert_eq!(h.params[2].declarator.dims.len(), 1);
    }

    #[test]
    fn struct_definition_and_globals() {
        let unit = parse_ok("struct S { int i; float *p; };\nstruct S s, *ps;\nstatic int g = 3;");
        let Item::Record(r) = &unit.items[0] else {
            panic!("expected struct")
        };
        assert_eq!(r.name.name, "S");
        assert_eq!(r.fields.len(), 2);
        let Item::Decl(d) = &unit.items[1] else {
            panic!("expected declaration")
        };
        assert_eq!(d.spec.base, BaseType::Struct("S".into()));
        assert_eq!(d.declarators[1].pointers, 1);
        let Item::Decl(g) = &unit.items[2] else {
            panic!("expected declaration")
        };
        assert_eq!(g.spec.storage, Some(StorageClass::Static));
    }

    #[test]
    fn type_specifier_combinations() {
        let unit = parse_ok("unsigned long long a; const double b; long int c; unsigned u;");
        let bases: Vec<_> = unit
            .items
            .iter()
            .map(|i| match i {
                Item::Decl(d) => d.spec.base.clone(),
                _ => panic!("expected declaration"),
            })
            .collect();
        assert_eq!(
            bases,
            vec![BaseType::LongLong, BaseType::Double, BaseType::Long, BaseType::Int]
        );
    }

    #[test]
    fn array_initializer_list() {
        let s = parse_one_stmt("int a[2][3] = {{1, 2, 3}, {4, 5, 6}};");
        let StmtKind::Decl(d) = &s.kind else {
            panic!("expected Decl")
        };
        assert_eq!(d.declarators[0].dims.len(), 2);
        assert!(matches!(&d.declarators[0].init, Some(Initializer::List(v, _)) if v.len() == 2));
    }

    // ── Statements ──

    #[test]
    fn for_with_declaration() {
        let s = parse_one_stmt("for (int i = 0; i < n; ++i) x += i;");
        let StmtKind::For(f) = &s.kind else {
            panic!("expected For")
        };
        assert!(matches!(f.init, Some(ForInit::Decl(_))));
        assert!(f.cond.is_some());
        assert!(f.step.is_some());
    }

    #[test]
    fn for_with_assignment_and_empty_parts() {
        let s = parse_one_stmt("for (i = 0; ; ) break;");
        let StmtKind::For(f) = &s.kind else {
            panic!("expected For")
        };
        assert!(matches!(f.init, Some(ForInit::Expr(_))));
        assert!(f.cond.is_none());
        assert!(matches!(f.body.kind, StmtKind::Break));
    }

    #[test]
    fn if_else_switch_while() {
        let stmts = parse_body(
            "if (a) b = 1; else b = 2;\nswitch (a) { case 1: break; default: ; }\nwhile (a) --a;",
        );
        assert!(matches!(stmts[0].kind, StmtKind::If { els: Some(_), .. }));
        let StmtKind::Switch { body, .. } = &stmts[1].kind else {
            panic!("expected Switch")
        };
        let StmtKind::Block(b) = &body.kind else {
            panic!("expected Block")
        };
        assert!(matches!(b.stmts[0].kind, StmtKind::Case(_)));
        assert!(matches!(b.stmts[2].kind, StmtKind::Default));
        assert!(matches!(stmts[2].kind, StmtKind::While { .. }));
    }

    // ── Expressions ──

    #[test]
    fn precedence() {
        let e = one_expr("a + b * c");
        let ExprKind::Binary(BinOp::Add, _, rhs) = &e.kind else {
            panic!("expected Add")
        };
        assert!(matches!(rhs.kind, ExprKind::Binary(BinOp::Mul, _, _)));
    }

    #[test]
    fn assignment_is_right_associative() {
        let e = one_expr("a = b = c");
        let ExprKind::Assign(AssignOp::Assign, _, rhs) = &e.kind else {
            panic!("expected Assign")
        };
        assert!(matches!(rhs.kind, ExprKind::Assign(..)));
    }

    #[test]
    fn postfix_chain_and_spans() {
        let e = one_expr("s.a[i]->b++");
        assert!(matches!(e.kind, ExprKind::Postfix(PostfixOp::Inc, _)));
        assert_eq!(e.span.end - e.span.start, "s.a[i]->b++".len());
    }

    #[test]
    fn call_with_args() {
        let e = one_expr("printf(\"%d\\n\", x ? 1 : -2)");
        let ExprKind::Call(_, args) = &e.kind else {
            panic!("expected Call")
        };
        assert_eq!(args.len(), 2);
        assert!(matches!(args[1].kind, ExprKind::Ternary(..)));
    }

    #[test]
    fn unary_prefix_ops() {
        let e = one_expr("-*&x");
        let ExprKind::Unary(UnaryOp::Neg, inner) = &e.kind else {
            panic!("expected Neg")
        };
        assert!(matches!(inner.kind, ExprKind::Unary(UnaryOp::Deref, _)));
    }

    // ── OpenACC ──

    fn acc(body: &str) -> AccConstruct {
        let s = parse_one_stmt(body);
        let StmtKind::Acc(c) = s.kind else {
            panic!("expected Acc")
        };
        c
    }

    #[test]
    fn parallel_with_data_clauses() {
        let c = acc("#pragma acc parallel copy(a, b) pcopyin(c) num_gangs(2)\n{ a = 1; }");
        assert_eq!(c.directive.kind, DirectiveKind::Parallel);
        assert_eq!(c.directive.clauses.len(), 3);
        assert!(matches!(
            &c.directive.clauses[0].kind,
            ClauseKind::Data(DataClause::Copy, v) if v.len() == 2
        ));
        assert!(matches!(
            &c.directive.clauses[1].kind,
            ClauseKind::Data(DataClause::Copyin, _)
        ));
        assert!(matches!(c.body.kind, StmtKind::Block(_)));
    }

    #[test]
    fn combined_loop_with_partitioning() {
        let c = acc("#pragma acc parallel loop gang worker, vector collapse(2)\nfor (i = 0; i < 2; ++i) for (j = 0; j < 2; ++j) ;");
        assert_eq!(c.directive.kind, DirectiveKind::ParallelLoop);
        let names: Vec<_> = c.directive.clauses.iter().map(|c| c.name().as_str()).collect();
        assert_eq!(names, vec!["gang", "worker", "vector", "collapse"]);
    }

    #[test]
    fn reduction_operators() {
        let c = acc("#pragma acc loop reduction(max: m) reduction(&&: l) reduction(+:s,t)\nfor (;;) ;");
        let ops: Vec<_> = c
            .directive
            .clauses
            .iter()
            .map(|c| match &c.kind {
                ClauseKind::Reduction(op, _) => *op,
                _ => panic!("expected reduction"),
            })
            .collect();
        assert_eq!(ops, vec![ReductionOp::Max, ReductionOp::And, ReductionOp::Add]);
    }

    #[test]
    fn subarray_and_member_refs() {
        let c = acc("#pragma acc data copy(a[1:n], p[:3], s.i, ps->x[0:1])\n;");
        let ClauseKind::Data(_, vars) = &c.directive.clauses[0].kind else {
            panic!("expected data clause")
        };
        assert!(matches!(vars[0].kind, ExprKind::Section { start: Some(_), len: Some(_), .. }));
        assert!(matches!(vars[1].kind, ExprKind::Section { start: None, .. }));
        assert!(matches!(vars[2].kind, ExprKind::Member { arrow: false, .. }));
        assert!(matches!(vars[3].kind, ExprKind::Section { .. }));
    }

    #[test]
    fn gang_static_and_tile_star() {
        let c = acc("#pragma acc loop gang(static: *) tile(2, *)\nfor (;;) ;");
        assert!(matches!(
            c.directive.clauses[0].kind,
            ClauseKind::Gang(Some(GangStatic::Star(_)))
        ));
        let ClauseKind::Tile(sizes) = &c.directive.clauses[1].kind else {
            panic!("expected tile")
        };
        assert!(matches!(sizes[0], TileSize::Expr(_)));
        assert!(matches!(sizes[1], TileSize::Star(_)));
    }

    #[test]
    fn if_clause_and_nested_directives() {
        let c = acc("#pragma acc data if(x) create(y)\n#pragma acc parallel\n#pragma acc loop seq\nfor (;;) ;");
        assert_eq!(c.directive.kind, DirectiveKind::Data);
        assert!(matches!(c.directive.clauses[0].kind, ClauseKind::If(_)));
        let StmtKind::Acc(inner) = &c.body.kind else {
            panic!("expected nested Acc")
        };
        assert_eq!(inner.directive.kind, DirectiveKind::Parallel);
    }

    #[test]
    fn unknown_clause_is_error() {
        let result = parse("void f() {\n#pragma acc parallel bogus(x)\n;\n}\n");
        assert!(!result.errors.is_empty());
    }

    #[test]
    fn directive_requires_statement() {
        let result = parse("void f() {\n#pragma acc parallel\n}\n");
        assert!(!result.errors.is_empty());
    }

    #[test]
    fn executable_directives_stand_alone() {
        let stmts = parse_body(
            "#pragma acc enter data copyin(a[0:n]) create(b)\n\
             #pragma acc update self(a) device(b) if_present\n\
             #pragma acc exit data copyout(a[0:n]) delete(b) if(n)\n\
             n = 0;",
        );
        assert_eq!(stmts.len(), 4);
        let kinds: Vec<_> = stmts
            .iter()
            .filter_map(|s| match &s.kind {
                StmtKind::AccExec(d) => Some(d.kind),
                _ => None,
            })
            .collect();
        assert_eq!(
            kinds,
            vec![DirectiveKind::EnterData, DirectiveKind::Update, DirectiveKind::ExitData]
        );
        let StmtKind::AccExec(update) = &stmts[1].kind else {
            panic!("expected update")
        };
        assert!(matches!(
            update.clauses[0].kind,
            ClauseKind::Motion(MotionClause::Self_, _)
        ));
        assert!(matches!(update.clauses[2].kind, ClauseKind::IfPresent));
        let StmtKind::AccExec(exit) = &stmts[2].kind else {
            panic!("expected exit data")
        };
        assert!(matches!(
            exit.clauses[1].kind,
            ClauseKind::Data(DataClause::Delete, _)
        ));
    }

    #[test]
    fn routine_precedes_function() {
        let unit = parse_ok("#pragma acc routine worker\nvoid g(int *a);\nvoid f() { }\n");
        let Item::Function(g) = &unit.items[0] else {
            panic!("expected function")
        };
        let routine = g.routine.as_ref().expect("expected routine");
        assert_eq!(routine.kind, DirectiveKind::Routine);
        assert!(matches!(routine.clauses[0].kind, ClauseKind::Worker));
        assert!(g.body.is_none());
        let Item::Function(f) = &unit.items[1] else {
            panic!("expected function")
        };
        assert!(f.routine.is_none());
    }

    #[test]
    fn routine_inside_function_is_kept_for_checking() {
        let s = parse_one_stmt("#pragma acc routine seq");
        assert!(matches!(s.kind, StmtKind::AccExec(AccDirective { kind: DirectiveKind::Routine, .. })));
    }
}
