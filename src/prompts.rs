//! Prompt builders for SQL generation, repair, answer narration and CSV fixing.

use crate::annotation::TableAnnotation;
use crate::catalog::Catalog;
use crate::execution::Record;
use crate::llm::ChatMessage;
use itertools::Itertools;

/// Sample values shown per column in schema text.
const SCHEMA_SAMPLE_VALUES: usize = 3;

/// Result rows shown to the narration prompt.
const NARRATION_ROWS: usize = 10;

const SQL_RULES: &str = r#"CRITICAL - JOIN Type Matching:
- Joined columns must have compatible types; check both sides in the schema
- Join INTEGER to INTEGER and VARCHAR to VARCHAR
- When the types differ, convert one side explicitly with CAST(), e.g. CAST(client_code AS BIGINT)

CRITICAL - Column Name Quoting:
- Wrap every column name containing spaces in double quotes, e.g. "Order Date", "Brand Name", "2024 Q4 Participation"
- Table names need quotes only when they contain spaces too

IMPORTANT - Temporal Queries:
- For "latest", "most recent" or "last quarter" questions never hardcode a period such as "2024 Q4"
- Find the period from the data with MAX(), ORDER BY ... DESC LIMIT n, or a subquery
- Time filters must keep working when newer data is loaded

IMPORTANT - Yearly Aggregations:
- For questions about a year, use an existing yearly column ("2024", "year", "Year 2024") when there is one
- Only when no yearly column exists, combine the quarterly or monthly columns, e.g.
  COALESCE("2024 Q1", 0) + COALESCE("2024 Q2", 0) + COALESCE("2024 Q3", 0) + COALESCE("2024 Q4", 0) AS total_2024"#;

/// Render a schema as prompt text, tables sorted by name.
///
/// ```text
/// Table: orders
///   Description: Customer orders
///   Columns:
///     - Order Date (DATE): Day the order was placed [Examples: '2024-01-05', '2024-02-01']
/// ```
pub fn schema_to_text(schema: &Catalog) -> String {
    let mut lines = Vec::new();

    for table in schema.tables().sorted_by(|a, b| a.name.cmp(&b.name)) {
        lines.push(format!("Table: {}", table.name));
        if let Some(description) = table.description.as_deref().filter(|d| !d.is_empty()) {
            lines.push(format!("  Description: {}", description));
        }

        lines.push("  Columns:".to_string());
        for column in &table.columns {
            let mut line = format!("    - {} ({})", column.name, column.declared_type);
            if let Some(description) = column.description.as_deref().filter(|d| !d.is_empty()) {
                line.push_str(&format!(": {}", description));
            }
            if let Some(samples) = column.sample_values.as_ref().filter(|s| !s.is_empty()) {
                let examples = samples
                    .iter()
                    .take(SCHEMA_SAMPLE_VALUES)
                    .map(|s| format!("'{}'", s))
                    .join(", ");
                line.push_str(&format!(" [Examples: {}]", examples));
            }
            lines.push(line);
        }

        lines.push(String::new());
    }

    lines.join("\n")
}

pub fn sql_generation_messages(question: &str, schema: &Catalog) -> Vec<ChatMessage> {
    let system = format!(
        r#"You are an expert SQL query writer. Convert the user's question into one SQL query.

Instructions:
- Use ONLY the tables and columns listed in the schema
- Return exactly ONE query that can be executed as-is
- Do NOT add explanations, markdown fences or any other text
- Use JOINs, aggregations, WHERE and GROUP BY as the question requires
- Treat DATE and TIMESTAMP columns as dates, not strings

{}"#,
        SQL_RULES
    );

    let user = format!(
        "Database Schema:\n\n{}\n\nQuestion: {}\n\nGenerate the SQL query:",
        schema_to_text(schema),
        question
    );

    vec![ChatMessage::system(system), ChatMessage::user(user)]
}

pub fn sql_repair_messages(
    question: &str,
    schema: &Catalog,
    failed_sql: &str,
    error_message: &str,
) -> Vec<ChatMessage> {
    let system = format!(
        r#"You are an expert SQL debugger. Fix the failing query using the error message.

Instructions:
- Read the error message carefully; it usually names the offending column, table or type
- Use ONLY the tables and columns listed in the schema
- Return exactly ONE corrected query
- Do NOT add explanations, markdown fences or any other text
- Missing double quotes around column names with spaces is the most common cause of failures

{}"#,
        SQL_RULES
    );

    let user = format!(
        "Database Schema:\n\n{}\n\nOriginal Question: {}\n\nFailed SQL Query:\n{}\n\nError Message:\n{}\n\n\
         Fix the SQL query to resolve this error. Return only the corrected SQL query.",
        schema_to_text(schema),
        question,
        failed_sql,
        error_message
    );

    vec![ChatMessage::system(system), ChatMessage::user(user)]
}

/// Narration prompt over the preview rows. Only the first ten are listed.
pub fn answer_narration_messages(question: &str, sql: &str, rows: &[Record]) -> Vec<ChatMessage> {
    let system = r#"You are a data analyst answering business questions from query results.

Instructions:
- Base the answer ONLY on the rows provided; never invent numbers or facts
- Be concise and direct
- Quote the relevant numbers and metrics from the results
- If there are no results, say so plainly"#;

    let results = if rows.is_empty() {
        "(No results returned)".to_string()
    } else {
        let mut text = rows
            .iter()
            .take(NARRATION_ROWS)
            .enumerate()
            .map(|(i, row)| format!("Row {}: {}", i + 1, serde_json::Value::Object(row.clone())))
            .join("\n");
        if rows.len() > NARRATION_ROWS {
            text.push_str(&format!("\n\n... and {} more rows", rows.len() - NARRATION_ROWS));
        }
        text
    };

    let user = format!(
        "Question: {}\n\nSQL Query Executed:\n{}\n\nQuery Results:\n{}\n\n\
         Provide a clear, natural language answer based on these results:",
        question, sql, results
    );

    vec![ChatMessage::system(system), ChatMessage::user(user)]
}

/// Ask which data-row column index to drop so rows line up with the header.
pub fn csv_fix_messages(
    header: &[String],
    rows: &[Vec<String>],
    annotation: &TableAnnotation,
) -> Vec<ChatMessage> {
    let expected = annotation.columns.iter().map(|c| c.name.as_str()).collect::<Vec<_>>();
    let row_width = rows.first().map(Vec::len).unwrap_or(0);

    let prompt = format!(
        r#"You are a data quality expert. A CSV file has more fields in its data rows than in its header.

Expected schema (from annotations):
Table: {table}
Description: {description}
Expected columns ({expected_len}): {expected}

Actual CSV structure:
Header columns ({header_len}): {header}
Data row columns: {row_width}

Sample data (first {sample_len} rows):
{sample}

Decide which column index (0-based) of the DATA ROWS should be removed so they align with the header. Consider:
1. The expected schema above
2. Empty or duplicated values
3. Patterns in the trailing columns
4. Which removal best matches the expected columns

Respond with ONLY a JSON object, no markdown:
{{"column_index_to_remove": <number>, "reason": "<brief explanation>"}}"#,
        table = annotation.name.clone().unwrap_or_else(|| annotation.table_name()),
        description = annotation.description.as_deref().unwrap_or("(none)"),
        expected_len = expected.len(),
        expected = expected.join(", "),
        header_len = header.len(),
        header = header.join(", "),
        row_width = row_width,
        sample_len = rows.len(),
        sample = rows.iter().map(|r| r.join(",")).join("\n"),
    );

    vec![ChatMessage::user(prompt)]
}
