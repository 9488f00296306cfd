use std::path::{Path, PathBuf};

use codecraft_core::source::FileSystemProvider;
use codecraft_core::{pipeline, tokenize, PipelineOptions, Reconstruction};

use crate::{print_json, report_ritual_error, OutputFormat};

pub(crate) struct CompileArgs {
    pub canon: Option<PathBuf>,
    pub debug_tokens: bool,
    pub reconstruction: Reconstruction,
}

/// Compile a ritual and print the soul schema JSON on stdout.
pub(crate) fn cmd_compile(
    ritual: &Path,
    args: &CompileArgs,
    output: OutputFormat,
) -> i32 {
    if args.debug_tokens {
        match pipeline::read_ritual(ritual, &FileSystemProvider) {
            Ok(source) => dump_tokens(&source),
            Err(e) => {
                report_ritual_error(&e, output);
                return 1;
            }
        }
    }

    let options = PipelineOptions {
        canon_path: args.canon.clone(),
        reconstruction: args.reconstruction,
    };
    match codecraft_core::parse_ritual(ritual, &options) {
        Ok(schema) => {
            tracing::info!(blocks = schema.blocks.len(), "ritual compiled");
            print_json(&schema)
        }
        Err(e) => {
            report_ritual_error(&e, output);
            1
        }
    }
}

fn dump_tokens(source: &str) {
    let tokens = tokenize(source);
    eprintln!("=== TOKENS ===");
    for token in &tokens {
        eprintln!("{}", token);
    }
    eprintln!("TOTAL TOKENS: {}", tokens.len());
}
