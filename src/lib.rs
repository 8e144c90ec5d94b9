pub mod ast;
pub mod ast_printer;
pub mod config;
pub mod lox;
pub mod parser;
pub mod tokenizer;
pub mod tree_walk_interpreter;
