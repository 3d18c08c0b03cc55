use anyhow::Result;
use comfy_table::Table;
use serde::Serialize;
use serde_json::Value;

use crate::cli;

/// Concrete rendering after `auto` has been decided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
    Table,
}

impl OutputFormat {
    /// Resolve the CLI choice; `auto` picks a table only for list-like results
    pub fn resolve(format: cli::OutputFormat, list_like: bool) -> Self {
        match format {
            cli::OutputFormat::Json => Self::Json,
            cli::OutputFormat::Yaml => Self::Yaml,
            cli::OutputFormat::Table => Self::Table,
            cli::OutputFormat::Auto if list_like => Self::Table,
            cli::OutputFormat::Auto => Self::Json,
        }
    }
}

pub fn print_output<T: Serialize>(data: T, format: OutputFormat) -> Result<()> {
    let json_value = serde_json::to_value(data)?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json_value)?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yaml::to_string(&json_value)?);
        }
        OutputFormat::Table => {
            print_as_table(&json_value);
        }
    }

    Ok(())
}

/// Print rows under fixed headers
pub fn print_rows(headers: &[&str], rows: Vec<Vec<String>>) {
    println!("{}", build_table(headers, rows));
}

pub fn build_table(headers: &[&str], rows: Vec<Vec<String>>) -> Table {
    let mut table = Table::new();
    table.set_header(headers.to_vec());
    for row in rows {
        table.add_row(row);
    }
    table
}

fn print_as_table(value: &Value) {
    match value {
        Value::Array(arr) if !arr.is_empty() => {
            let mut table = Table::new();

            if let Value::Object(first) = &arr[0] {
                let headers: Vec<String> = first.keys().cloned().collect();
                table.set_header(&headers);

                for item in arr {
                    if let Value::Object(obj) = item {
                        let row: Vec<String> = headers
                            .iter()
                            .map(|h| format_value(obj.get(h).unwrap_or(&Value::Null)))
                            .collect();
                        table.add_row(row);
                    }
                }
            } else {
                table.set_header(vec!["Value"]);
                for item in arr {
                    table.add_row(vec![format_value(item)]);
                }
            }

            println!("{}", table);
        }
        Value::Object(obj) => {
            let mut table = Table::new();
            table.set_header(vec!["Key", "Value"]);

            for (key, val) in obj {
                table.add_row(vec![key.clone(), format_value(val)]);
            }

            println!("{}", table);
        }
        _ => {
            println!("{}", format_value(value));
        }
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(arr) => format!("[{} items]", arr.len()),
        Value::Object(obj) => format!("{{{} fields}}", obj.len()),
    }
}

/// Format a dollar amount the way pricing is shown in the Astra console
pub fn dollars(amount: f64) -> String {
    format!("${:.2}", amount)
}
