use std::path::Path;

use codecraft_core::locate_canon;
use codecraft_core::source::FileSystemProvider;

use crate::{print_json, report_error, report_ritual_error, OutputFormat};

/// Print a summary of the canon the compiler would load.
pub(crate) fn cmd_canon(explicit: Option<&Path>, output: OutputFormat, quiet: bool) -> i32 {
    let location = locate_canon(explicit);
    let rules = match location.load(&FileSystemProvider) {
        Ok(Some(rules)) => rules,
        Ok(None) => {
            report_error(
                &format!("error: canon rules not found: {}", location),
                output,
                quiet,
            );
            return 1;
        }
        Err(e) => {
            report_ritual_error(&e, output);
            return 1;
        }
    };

    match output {
        OutputFormat::Json => print_json(&serde_json::json!({
            "path": location.to_string(),
            "schools": rules.schools(),
            "operations": rules.operations(),
            "block_types": rules.block_types(),
        })),
        OutputFormat::Text => {
            println!("canon: {}", location);
            println!(
                "{} schools, {} operations",
                rules.schools().len(),
                rules.operations().len()
            );
            for school in rules.schools() {
                match rules.operations_for(school) {
                    Some(ops) => println!(
                        "  {:<16} {}",
                        school,
                        ops.iter().cloned().collect::<Vec<_>>().join(", ")
                    ),
                    None => println!("  {:<16} (any operation)", school),
                }
            }
            println!(
                "block types: {}",
                rules
                    .block_types()
                    .iter()
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            0
        }
    }
}
