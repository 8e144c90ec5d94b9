use std::{cell::RefCell, fmt::Display};

use crate::{
    ast::{Expression, InfixOperator, Literal, Program, Statement, UnaryOperator},
    tokenizer::{Token, TokenType},
};

#[derive(Debug)]
pub struct ParseErrors(pub Vec<ParseError>);

impl ParseErrors {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParseError> {
        self.0.iter()
    }
}

impl std::error::Error for ParseErrors {}

impl Display for ParseErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub token: Token,
    pub message: String,
}

impl ParseError {
    pub fn new(token: Token, message: impl Into<String>) -> Self {
        Self {
            token,
            message: message.into(),
        }
    }
}

impl std::error::Error for ParseError {}

impl Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.token.token_type == TokenType::Eof {
            write!(f, "[line {}] Error at end: {}", self.token.line, self.message)
        } else {
            write!(
                f,
                "[line {}] Error at '{}': {}",
                self.token.line, self.token.lexeme, self.message
            )
        }
    }
}

/// A syntax error together with the tokens left at the point it was raised,
/// so the caller can resynchronize from there.
struct Failure<'a> {
    error: ParseError,
    at: &'a [Token],
}

type Parsed<'a, T> = Result<(T, &'a [Token]), Failure<'a>>;

#[derive(Debug)]
struct ParseContext {
    stack: RefCell<Vec<&'static str>>,
    reported: RefCell<Vec<ParseError>>,
    repl: bool,
}

impl ParseContext {
    fn new(repl: bool) -> Self {
        Self {
            stack: RefCell::new(Vec::new()),
            reported: RefCell::new(Vec::new()),
            repl,
        }
    }

    fn push(&self, name: &'static str) -> ParseContextGuard {
        self.stack.borrow_mut().push(name);
        ParseContextGuard::new(self)
    }

    fn pop(&self) {
        self.stack.borrow_mut().pop();
    }

    fn fail<'a>(&self, tokens: &'a [Token], message: &str) -> Failure<'a> {
        let error = ParseError::new(current(tokens), message);
        tracing::trace!(
            rules = %self.stack.borrow().join(" > "),
            %error,
            "syntax error"
        );
        Failure { error, at: tokens }
    }

    fn report(&self, error: ParseError) {
        self.reported.borrow_mut().push(error);
    }

    fn take_reported(&self) -> Vec<ParseError> {
        self.reported.take()
    }
}

struct ParseContextGuard<'a> {
    context: &'a ParseContext,
}

impl<'a> ParseContextGuard<'a> {
    fn new(context: &'a ParseContext) -> Self {
        Self { context }
    }
}

impl<'a> Drop for ParseContextGuard<'a> {
    fn drop(&mut self) {
        self.context.pop();
    }
}

/// Parses every declaration up to `Eof`. A declaration that fails to parse is
/// reported and skipped via [`synchronize`], so one call can report several
/// independent syntax errors.
///
/// With `repl` set, the `;` closing a trailing expression statement may be
/// omitted.
pub fn program(tokens: &[Token], repl: bool) -> Result<Program, ParseErrors> {
    let context = ParseContext::new(repl);
    let _guard = context.push("program");
    let mut statements = Vec::new();
    let mut tokens = tokens;

    while !at_end(tokens) {
        match declaration(&context, tokens) {
            Ok((stmt, rest)) => {
                statements.push(stmt);
                tokens = rest;
            }
            Err(failure) => {
                context.report(failure.error);
                tokens = synchronize(failure.at);
            }
        }
    }

    let errors = context.take_reported();
    if !errors.is_empty() {
        return Err(ParseErrors(errors));
    }

    Ok(Program(statements))
}

/// Skips the offending token, then stops right after a `;` or right before a
/// token that starts a statement.
fn synchronize(tokens: &[Token]) -> &[Token] {
    let mut previous = peek(tokens);
    let mut tokens = advance(tokens);

    while !at_end(tokens) {
        if previous == TokenType::Semicolon {
            return tokens;
        }

        match peek(tokens) {
            TokenType::Fun
            | TokenType::Var
            | TokenType::For
            | TokenType::If
            | TokenType::While
            | TokenType::Print
            | TokenType::Return => return tokens,
            _ => {}
        }

        previous = peek(tokens);
        tokens = advance(tokens);
    }

    tokens
}

fn declaration<'a>(context: &ParseContext, tokens: &'a [Token]) -> Parsed<'a, Statement> {
    let _guard = context.push("declaration");
    match peek(tokens) {
        TokenType::Var => var_declaration(context, advance(tokens)),
        _ => statement(context, tokens),
    }
}

fn var_declaration<'a>(context: &ParseContext, tokens: &'a [Token]) -> Parsed<'a, Statement> {
    let _guard = context.push("var_declaration");
    let (name, tokens) = consume(context, tokens, TokenType::Identifier, "Expect variable name")?;
    let (initializer, tokens) = match peek(tokens) {
        TokenType::Equal => {
            let (expr, rest) = expression(context, advance(tokens))?;
            (Some(expr), rest)
        }
        _ => (None, tokens),
    };
    let (_, tokens) = consume(
        context,
        tokens,
        TokenType::Semicolon,
        "Expect ';' after variable declaration",
    )?;
    Ok((Statement::VarDeclaration(name.clone(), initializer), tokens))
}

fn statement<'a>(context: &ParseContext, tokens: &'a [Token]) -> Parsed<'a, Statement> {
    let _guard = context.push("statement");
    match peek(tokens) {
        TokenType::If => if_statement(context, advance(tokens)),
        TokenType::Print => print_statement(context, advance(tokens)),
        TokenType::LeftBrace => block(context, advance(tokens)),
        _ => expression_statement(context, tokens),
    }
}

fn if_statement<'a>(context: &ParseContext, tokens: &'a [Token]) -> Parsed<'a, Statement> {
    let _guard = context.push("if_statement");
    let (_, tokens) = consume(context, tokens, TokenType::LeftParen, "Expect '(' after 'if'.")?;
    let (condition, tokens) = expression(context, tokens)?;
    let (_, tokens) = consume(
        context,
        tokens,
        TokenType::RightParen,
        "Expect ')' after if condition.",
    )?;
    let (then_branch, tokens) = statement(context, tokens)?;
    if peek(tokens) == TokenType::Else {
        let (else_branch, tokens) = statement(context, advance(tokens))?;
        Ok((
            Statement::If(
                condition,
                Box::new(then_branch),
                Some(Box::new(else_branch)),
            ),
            tokens,
        ))
    } else {
        Ok((
            Statement::If(condition, Box::new(then_branch), None),
            tokens,
        ))
    }
}

fn print_statement<'a>(context: &ParseContext, tokens: &'a [Token]) -> Parsed<'a, Statement> {
    let _guard = context.push("print_statement");
    let (expr, tokens) = expression(context, tokens)?;
    let (_, tokens) = consume(context, tokens, TokenType::Semicolon, "Expect ';' after value.")?;
    Ok((Statement::Print(expr), tokens))
}

fn block<'a>(context: &ParseContext, tokens: &'a [Token]) -> Parsed<'a, Statement> {
    let _guard = context.push("block");
    let mut statements = Vec::new();
    let mut tokens = tokens;

    while peek(tokens) != TokenType::RightBrace && !at_end(tokens) {
        match declaration(context, tokens) {
            Ok((stmt, rest)) => {
                statements.push(stmt);
                tokens = rest;
            }
            Err(failure) => {
                context.report(failure.error);
                tokens = synchronize(failure.at);
            }
        }
    }

    let (_, tokens) = consume(context, tokens, TokenType::RightBrace, "Expect '}' after block.")?;
    Ok((Statement::Block(statements), tokens))
}

fn expression_statement<'a>(context: &ParseContext, tokens: &'a [Token]) -> Parsed<'a, Statement> {
    let _guard = context.push("expression_statement");
    let (expr, tokens) = expression(context, tokens)?;
    if context.repl && at_end(tokens) {
        return Ok((Statement::Expression(expr), tokens));
    }
    let (_, tokens) = consume(
        context,
        tokens,
        TokenType::Semicolon,
        "Expect ';' after value.",
    )?;
    Ok((Statement::Expression(expr), tokens))
}

fn expression<'a>(context: &ParseContext, tokens: &'a [Token]) -> Parsed<'a, Expression> {
    let _guard = context.push("expression");
    assignment(context, tokens)
}

fn assignment<'a>(context: &ParseContext, tokens: &'a [Token]) -> Parsed<'a, Expression> {
    let _guard = context.push("assignment");
    let (expr, rest) = equality(context, tokens)?;

    if peek(rest) != TokenType::Equal {
        return Ok((expr, rest));
    }

    let equals = current(rest);
    let (value, rest) = assignment(context, advance(rest))?;
    match expr {
        Expression::Variable(name) => Ok((
            Expression::Assign {
                name,
                value: Box::new(value),
            },
            rest,
        )),
        // Reported without unwinding: the statement still parses.
        expr => {
            context.report(ParseError::new(equals, "Invalid assignment target"));
            Ok((expr, rest))
        }
    }
}

fn binary<'a>(
    context: &ParseContext,
    precedence: impl Fn(&ParseContext, &'a [Token]) -> Parsed<'a, Expression>,
    operator: impl Fn(TokenType) -> Option<InfixOperator>,
    tokens: &'a [Token],
) -> Parsed<'a, Expression> {
    let (mut expr, mut tokens) = precedence(context, tokens)?;

    while let Some(op) = operator(peek(tokens)) {
        let token = current(tokens);
        let (right, rest) = precedence(context, advance(tokens))?;
        expr = Expression::Binary {
            left: Box::new(expr),
            operator: op,
            token,
            right: Box::new(right),
        };
        tokens = rest;
    }

    Ok((expr, tokens))
}

fn equality<'a>(context: &ParseContext, tokens: &'a [Token]) -> Parsed<'a, Expression> {
    let _guard = context.push("equality");
    binary(
        context,
        comparison,
        |token_type| match token_type {
            TokenType::EqualEqual => Some(InfixOperator::Equal),
            TokenType::BangEqual => Some(InfixOperator::NotEqual),
            _ => None,
        },
        tokens,
    )
}

fn comparison<'a>(context: &ParseContext, tokens: &'a [Token]) -> Parsed<'a, Expression> {
    let _guard = context.push("comparison");
    binary(
        context,
        term,
        |token_type| match token_type {
            TokenType::Less => Some(InfixOperator::LessThan),
            TokenType::LessEqual => Some(InfixOperator::LessThanOrEqual),
            TokenType::Greater => Some(InfixOperator::GreaterThan),
            TokenType::GreaterEqual => Some(InfixOperator::GreaterThanOrEqual),
            _ => None,
        },
        tokens,
    )
}

fn term<'a>(context: &ParseContext, tokens: &'a [Token]) -> Parsed<'a, Expression> {
    let _guard = context.push("term");
    binary(
        context,
        factor,
        |token_type| match token_type {
            TokenType::Plus => Some(InfixOperator::Plus),
            TokenType::Minus => Some(InfixOperator::Minus),
            _ => None,
        },
        tokens,
    )
}

fn factor<'a>(context: &ParseContext, tokens: &'a [Token]) -> Parsed<'a, Expression> {
    let _guard = context.push("factor");
    binary(
        context,
        unary,
        |token_type| match token_type {
            TokenType::Star => Some(InfixOperator::Multiply),
            TokenType::Slash => Some(InfixOperator::Divide),
            _ => None,
        },
        tokens,
    )
}

fn unary<'a>(context: &ParseContext, tokens: &'a [Token]) -> Parsed<'a, Expression> {
    let _guard = context.push("unary");

    let operator = match peek(tokens) {
        TokenType::Minus => UnaryOperator::Negate,
        TokenType::Bang => UnaryOperator::Not,
        _ => return primary(context, tokens),
    };

    let token = current(tokens);
    let (right, rest) = unary(context, advance(tokens))?;
    Ok((
        Expression::Unary {
            operator,
            token,
            right: Box::new(right),
        },
        rest,
    ))
}

fn primary<'a>(context: &ParseContext, tokens: &'a [Token]) -> Parsed<'a, Expression> {
    let _guard = context.push("primary");
    let Some(token) = tokens.first() else {
        return Err(context.fail(tokens, "Expect expression."));
    };

    let rest = advance(tokens);
    match (token.token_type, &token.literal) {
        (TokenType::Number | TokenType::String, Some(literal)) => {
            Ok((Expression::Literal(literal.clone()), rest))
        }
        (TokenType::True, _) => Ok((Expression::Literal(Literal::Boolean(true)), rest)),
        (TokenType::False, _) => Ok((Expression::Literal(Literal::Boolean(false)), rest)),
        (TokenType::Nil, _) => Ok((Expression::Literal(Literal::Nil), rest)),
        (TokenType::Identifier, _) => Ok((Expression::Variable(token.clone()), rest)),
        (TokenType::LeftParen, _) => {
            let (expr, rest) = expression(context, rest)?;
            let (_, rest) = consume(
                context,
                rest,
                TokenType::RightParen,
                "Expect ')' after expression.",
            )?;
            Ok((Expression::Grouping(Box::new(expr)), rest))
        }
        _ => Err(context.fail(tokens, "Expect expression.")),
    }
}

fn consume<'a>(
    context: &ParseContext,
    tokens: &'a [Token],
    token_type: TokenType,
    message: &str,
) -> Parsed<'a, &'a Token> {
    match tokens.first() {
        Some(token) if token.token_type == token_type => Ok((token, &tokens[1..])),
        _ => Err(context.fail(tokens, message)),
    }
}

fn peek(tokens: &[Token]) -> TokenType {
    tokens
        .first()
        .map_or(TokenType::Eof, |token| token.token_type)
}

fn at_end(tokens: &[Token]) -> bool {
    peek(tokens) == TokenType::Eof
}

/// Steps past the current token; never steps past `Eof`.
fn advance(tokens: &[Token]) -> &[Token] {
    if at_end(tokens) {
        tokens
    } else {
        &tokens[1..]
    }
}

fn current(tokens: &[Token]) -> Token {
    tokens
        .first()
        .cloned()
        .unwrap_or_else(|| Token::new(TokenType::Eof, "", None, 0))
}
