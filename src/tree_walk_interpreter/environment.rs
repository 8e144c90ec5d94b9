use std::fmt::Debug;

use rustc_hash::FxHashMap;

use super::Value;
use crate::tokenizer::Token;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EnvironmentError {
    #[error("Undefined variable '{}'.", .0.lexeme)]
    Undefined(Token),
    #[error("Uninitialized variable '{}'", .0.lexeme)]
    Uninitialized(Token),
}

impl EnvironmentError {
    pub fn token(&self) -> &Token {
        match self {
            EnvironmentError::Undefined(token) | EnvironmentError::Uninitialized(token) => token,
        }
    }
}

/// `None` marks a variable declared without an initializer.
type Scope = FxHashMap<String, Option<Value>>;

/// The scope chain as a stack: the global scope at the bottom, one scope per
/// block being executed above it. Lookups walk from the top down.
#[derive(Clone)]
pub struct Environment {
    scopes: Vec<Scope>,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::default()],
        }
    }

    pub fn push(&mut self) {
        self.scopes.push(Scope::default());
    }

    /// Drops the innermost scope. The global scope is never popped.
    pub fn pop(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Binds `name` in the innermost scope, replacing any binding of the same
    /// name in that scope.
    pub fn define(&mut self, name: &str, value: Value) {
        self.current().insert(name.to_string(), Some(value));
    }

    /// Like [`Environment::define`], but the variable has no value until it is
    /// assigned.
    pub fn declare(&mut self, name: &str) {
        self.current().insert(name.to_string(), None);
    }

    pub fn get(&self, name: &Token) -> Result<Value, EnvironmentError> {
        let binding = self
            .scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(&name.lexeme))
            .ok_or_else(|| EnvironmentError::Undefined(name.clone()))?;

        binding
            .clone()
            .ok_or_else(|| EnvironmentError::Uninitialized(name.clone()))
    }

    /// Overwrites the nearest existing binding of `name`. Never creates one.
    pub fn assign(&mut self, name: &Token, value: Value) -> Result<(), EnvironmentError> {
        let binding = self
            .scopes
            .iter_mut()
            .rev()
            .find_map(|scope| scope.get_mut(&name.lexeme))
            .ok_or_else(|| EnvironmentError::Undefined(name.clone()))?;

        *binding = Some(value);
        Ok(())
    }

    fn current(&mut self) -> &mut Scope {
        self.scopes
            .last_mut()
            .expect("the global scope is never popped")
    }
}

impl Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.scopes.iter().map(|scope| {
                scope
                    .iter()
                    .map(|(name, value)| match value {
                        Some(value) => format!("{name} = {value}"),
                        None => format!("{name} = <uninitialized>"),
                    })
                    .collect::<Vec<_>>()
            }))
            .finish()
    }
}
