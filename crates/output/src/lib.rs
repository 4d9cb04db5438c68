use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use serde_json::Value;
use tabled::builder::Builder;
use tabled::settings::Style;

const HEADERS: [&str; 4] = ["KEY", "STATUS", "SUMMARY", "ERROR"];

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Yaml,
    Quiet,
}

/// Renders batch lookup results for the terminal.
///
/// Accepts either a wrapped batch (`{"issues": [...]}`) or a bare array of
/// issue entries. Anything else falls back to pretty JSON.
pub struct OutputRenderer {
    format: OutputFormat,
}

impl OutputRenderer {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn render<T: Serialize>(&self, value: &T) -> Result<()> {
        let rendered = self.render_to_string(value)?;
        if !rendered.is_empty() {
            println!("{rendered}");
        }
        Ok(())
    }

    pub fn render_to_string<T: Serialize>(&self, value: &T) -> Result<String> {
        let json_value = serde_json::to_value(value)?;

        let rendered = match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&json_value)?,
            OutputFormat::Yaml => serde_yaml::to_string(&json_value)?,
            OutputFormat::Table => match Self::issue_rows(&json_value) {
                Some(rows) => Self::render_table(&rows),
                None => serde_json::to_string_pretty(&json_value)?,
            },
            OutputFormat::Quiet => match Self::issue_rows(&json_value) {
                Some(rows) => Self::render_quiet(&rows),
                None => serde_json::to_string_pretty(&json_value)?,
            },
        };

        Ok(rendered)
    }

    fn render_table(rows: &[IssueRow]) -> String {
        if rows.is_empty() {
            return "No issues requested".dimmed().to_string();
        }

        let mut builder = Builder::default();
        builder.push_record(HEADERS);
        for row in rows {
            builder.push_record([
                row.key.clone(),
                row.status.clone(),
                row.summary.clone(),
                row.error.clone(),
            ]);
        }

        let table = builder.build().with(Style::rounded()).to_string();
        let failures = rows.iter().filter(|r| !r.error.is_empty()).count();
        if failures == 0 {
            table
        } else {
            let note = format!("{failures} of {} issues could not be resolved", rows.len());
            format!("{table}\n{}", note.red())
        }
    }

    fn render_quiet(rows: &[IssueRow]) -> String {
        rows.iter()
            .map(|row| {
                if row.error.is_empty() {
                    row.key.clone()
                } else {
                    format!("{}\t{}", row.key, row.error)
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn issue_rows(value: &Value) -> Option<Vec<IssueRow>> {
        let entries = match value {
            Value::Object(obj) => obj.get("issues")?.as_array()?,
            Value::Array(entries) => entries,
            _ => return None,
        };

        entries
            .iter()
            .map(|entry| entry.is_object().then(|| IssueRow::from_entry(entry)))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct IssueRow {
    key: String,
    status: String,
    summary: String,
    error: String,
}

impl IssueRow {
    fn from_entry(entry: &Value) -> Self {
        let text = |value: Option<&Value>| value.map(value_to_string).unwrap_or_default();

        Self {
            key: text(entry.get("key").or_else(|| entry.get("issueKey"))),
            status: text(entry.pointer("/fields/status/name")),
            summary: text(entry.pointer("/fields/summary")),
            error: text(entry.get("error")),
        }
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}
