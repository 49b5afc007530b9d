use crate::analyzer::scclint::{OutputFormat, catalog};
use serde::Serialize;

#[derive(Serialize)]
struct RuleEntry {
    code: &'static str,
    description: &'static str,
}

pub fn handle_rules(format: OutputFormat) -> crate::Result<i32> {
    let entries: Vec<RuleEntry> = catalog()
        .iter()
        .map(|rule| RuleEntry {
            code: rule.code(),
            description: rule.description(),
        })
        .collect();

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&entries).unwrap_or_else(|_| "[]".to_string());
            println!("{}", json);
        }
        OutputFormat::Text => {
            let width = entries.iter().map(|e| e.code.len()).max().unwrap_or(0);
            for entry in &entries {
                println!("{:<width$}  {}", entry.code, entry.description);
            }
        }
    }
    Ok(0)
}
