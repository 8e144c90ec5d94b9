//! Debug rendering of syntax trees.
//!
//! [`Notation::Parenthesized`] writes every node as `(name operands...)`,
//! e.g. `-123 * (45.67)` becomes `(* (- 123) (group 45.67))`.
//! [`Notation::ReversePolish`] writes operands before their operator and drops
//! groupings, e.g. `(1 + 2) * (4 - 3)` becomes `1 2 + 4 3 - *`.

use crate::ast::{Expression, Program, Statement};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Notation {
    #[default]
    Parenthesized,
    ReversePolish,
}

pub fn print_program(program: &Program, notation: Notation) -> String {
    program
        .0
        .iter()
        .map(|statement| print_statement(statement, notation))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn print_statement(statement: &Statement, notation: Notation) -> String {
    let mut printer = Printer::new(notation);
    printer.statement(statement);
    printer.out
}

pub fn print_expression(expression: &Expression, notation: Notation) -> String {
    let mut printer = Printer::new(notation);
    printer.expression(expression);
    printer.out
}

/// Either a nested node or a bare word, so both notations can share one
/// traversal.
enum Part<'a> {
    Expression(&'a Expression),
    Statement(&'a Statement),
    Word(&'a str),
}

struct Printer {
    notation: Notation,
    out: String,
}

impl Printer {
    fn new(notation: Notation) -> Self {
        Self {
            notation,
            out: String::new(),
        }
    }

    fn statement(&mut self, statement: &Statement) {
        match statement {
            Statement::Expression(expr) => self.node(";", &[Part::Expression(expr)]),
            Statement::Print(expr) => self.node("print", &[Part::Expression(expr)]),
            Statement::VarDeclaration(name, None) => self.node("var", &[Part::Word(&name.lexeme)]),
            Statement::VarDeclaration(name, Some(initializer)) => self.node(
                "var",
                &[Part::Word(&name.lexeme), Part::Expression(initializer)],
            ),
            Statement::Block(statements) => {
                let parts: Vec<_> = statements.iter().map(Part::Statement).collect();
                self.node("block", &parts)
            }
            Statement::If(condition, then_branch, else_branch) => {
                let mut parts = vec![Part::Expression(condition), Part::Statement(then_branch)];
                if let Some(else_branch) = else_branch {
                    parts.push(Part::Statement(else_branch));
                }
                self.node("if", &parts)
            }
        }
    }

    fn expression(&mut self, expression: &Expression) {
        match expression {
            Expression::Literal(literal) => self.out.push_str(&literal.to_string()),
            Expression::Variable(name) => self.out.push_str(&name.lexeme),
            Expression::Grouping(inner) => match self.notation {
                Notation::Parenthesized => self.node("group", &[Part::Expression(inner)]),
                Notation::ReversePolish => self.expression(inner),
            },
            Expression::Unary {
                operator, right, ..
            } => self.node(&operator.to_string(), &[Part::Expression(right)]),
            Expression::Binary {
                left,
                operator,
                right,
                ..
            } => self.node(
                &operator.to_string(),
                &[Part::Expression(left), Part::Expression(right)],
            ),
            Expression::Assign { name, value } => match self.notation {
                Notation::Parenthesized => self.node(
                    "=",
                    &[Part::Word(&name.lexeme), Part::Expression(value)],
                ),
                Notation::ReversePolish => self.node(
                    "=",
                    &[Part::Expression(value), Part::Word(&name.lexeme)],
                ),
            },
        }
    }

    fn node(&mut self, name: &str, parts: &[Part]) {
        match self.notation {
            Notation::Parenthesized => {
                self.out.push('(');
                self.out.push_str(name);
                for part in parts {
                    self.out.push(' ');
                    self.part(part);
                }
                self.out.push(')');
            }
            Notation::ReversePolish => {
                for part in parts {
                    self.part(part);
                    self.out.push(' ');
                }
                self.out.push_str(name);
            }
        }
    }

    fn part(&mut self, part: &Part) {
        match part {
            Part::Expression(expr) => self.expression(expr),
            Part::Statement(statement) => self.statement(statement),
            Part::Word(word) => self.out.push_str(word),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        ast::{InfixOperator, Literal, UnaryOperator},
        parser,
        tokenizer::{tokens, Token, TokenType},
    };

    fn parse_expression(source: &str) -> Expression {
        let tokens = tokens(&format!("{source};")).unwrap();
        let program = parser::program(&tokens, false).unwrap();
        match program.0.into_iter().next() {
            Some(Statement::Expression(expr)) => expr,
            other => panic!("expected an expression statement, got {other:?}"),
        }
    }

    #[test]
    fn test_hand_built_tree() {
        let expression = Expression::Binary {
            left: Box::new(Expression::Unary {
                operator: UnaryOperator::Negate,
                token: Token::new(TokenType::Minus, "-", None, 1),
                right: Box::new(Expression::Literal(Literal::Number(123.0))),
            }),
            operator: InfixOperator::Multiply,
            token: Token::new(TokenType::Star, "*", None, 1),
            right: Box::new(Expression::Grouping(Box::new(Expression::Literal(
                Literal::Number(45.67),
            )))),
        };

        assert_eq!(
            print_expression(&expression, Notation::Parenthesized),
            "(* (- 123) (group 45.67))"
        );
        assert_eq!(
            print_expression(&expression, Notation::ReversePolish),
            "123 - 45.67 *"
        );
    }

    #[test]
    fn test_parsed_expression() {
        let expression = parse_expression("-123 * (45.67)");
        assert_eq!(
            print_expression(&expression, Notation::Parenthesized),
            "(* (- 123) (group 45.67))"
        );
    }

    #[test]
    fn test_reverse_polish() {
        let expression = parse_expression("(1 + 2) * (4 - 3)");
        assert_eq!(
            print_expression(&expression, Notation::ReversePolish),
            "1 2 + 4 3 - *"
        );
        let expression = parse_expression("a = !b == nil");
        assert_eq!(
            print_expression(&expression, Notation::ReversePolish),
            "b ! nil == a ="
        );
    }

    #[test]
    fn test_statements() {
        let tokens = tokens("var a = 1; if (a) { print a; } else a = 2;").unwrap();
        let program = parser::program(&tokens, false).unwrap();
        assert_eq!(
            print_program(&program, Notation::Parenthesized),
            "(var a 1)\n(if a (block (print a)) (; (= a 2)))"
        );
        assert_eq!(
            print_program(&program, Notation::ReversePolish),
            "a 1 var\na a print block 2 a = ; if"
        );
    }
}
