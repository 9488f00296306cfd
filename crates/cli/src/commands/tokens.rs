use std::path::Path;

use codecraft_core::pipeline::read_ritual;
use codecraft_core::source::FileSystemProvider;
use codecraft_core::tokenize;

use crate::{print_json, report_ritual_error, OutputFormat};

/// Print the token stream of a ritual on stdout.
pub(crate) fn cmd_tokens(ritual: &Path, output: OutputFormat) -> i32 {
    let source = match read_ritual(ritual, &FileSystemProvider) {
        Ok(source) => source,
        Err(e) => {
            report_ritual_error(&e, output);
            return 1;
        }
    };

    let tokens = tokenize(&source);
    match output {
        OutputFormat::Json => print_json(&tokens),
        OutputFormat::Text => {
            for token in &tokens {
                println!("{}", token);
            }
            println!("TOTAL TOKENS: {}", tokens.len());
            0
        }
    }
}
