//! CLI domain: parse, route, and presentation only.
//! Page generation itself lives in the pipeline; the CLI wires config to it and renders.

mod parse;
mod presentation;
mod route;

pub use parse::{Cli, Commands};
pub use presentation::{format_page_json, format_page_text, format_parse_json, PageSnapshot};
pub use route::RunContext;
