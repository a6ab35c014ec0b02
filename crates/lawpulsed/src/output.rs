use std::io::Write;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;

use crate::cli::OutputFormat;

pub fn write_output<T: Serialize>(
    value: &T,
    format: OutputFormat,
    out: &mut dyn Write,
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, value).context("failed to write json")?;
            writeln!(out)?;
        }
        OutputFormat::Table => {
            let value = serde_json::to_value(value).context("failed to serialize result")?;
            write_table(&value, out).context("failed to write table")?;
        }
    }
    Ok(())
}

/// Tab-separated rendering. A list of objects becomes a header plus one row
/// per object; an object becomes `field<TAB>value` lines, with nested lists
/// of objects rendered as their own titled tables.
pub fn write_table(value: &Value, out: &mut dyn Write) -> std::io::Result<()> {
    match value {
        Value::Array(items) if is_record_list(items) => write_records(items, out),
        Value::Object(fields) => {
            let mut nested = Vec::new();
            for (name, field) in fields {
                match field {
                    Value::Array(items) if !items.is_empty() && is_record_list(items) => {
                        nested.push((name, items));
                    }
                    _ => writeln!(out, "{}\t{}", normalize_field(name), cell(field))?,
                }
            }
            for (name, items) in nested {
                writeln!(out)?;
                writeln!(out, "# {name}")?;
                write_records(items, out)?;
            }
            Ok(())
        }
        Value::Array(items) => {
            for item in items {
                writeln!(out, "{}", cell(item))?;
            }
            Ok(())
        }
        scalar => writeln!(out, "{}", cell(scalar)),
    }
}

fn is_record_list(items: &[Value]) -> bool {
    items.iter().all(Value::is_object)
}

fn write_records(items: &[Value], out: &mut dyn Write) -> std::io::Result<()> {
    let mut columns: Vec<&str> = Vec::new();
    for item in items {
        if let Value::Object(fields) = item {
            for name in fields.keys() {
                if !columns.contains(&name.as_str()) {
                    columns.push(name);
                }
            }
        }
    }
    writeln!(out, "{}", columns.join("\t"))?;

    for item in items {
        let row = columns
            .iter()
            .map(|column| item.get(*column).map(cell).unwrap_or_default())
            .collect::<Vec<_>>();
        writeln!(out, "{}", row.join("\t"))?;
    }
    Ok(())
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => normalize_field(text),
        Value::Number(_) | Value::Bool(_) => value.to_string(),
        Value::Array(_) | Value::Object(_) => normalize_field(&value.to_string()),
    }
}

fn normalize_field(value: &str) -> String {
    value.replace(['\t', '\n', '\r'], " ")
}
