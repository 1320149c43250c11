//! Property-based tests for parser and dispatch guarantees

mod dispatch_properties;
mod parser_properties;
