//! Direct procedure commands: add, quote and history
//!
//! These handlers coerce form input, call the API client once, and print
//! the result either as text/tables or as JSON.

use crate::api::{parse_instant, ApiClient, HistoryLimit, HistoryQuery, HistoryResult, Quote};
use crate::config::Config;
use crate::error::{ProcassistError, Result};
use colored::Colorize;
use prettytable::{format, row, Table};
use serde::Serialize;

/// Coerce a cost string to a number
///
/// Accepts an optional `$` prefix and `,` thousands separators. The value
/// must be finite and non-negative.
///
/// # Examples
///
/// ```
/// use procassist::commands::procedures::parse_cost;
///
/// assert_eq!(parse_cost("$1,250.50").unwrap(), 1250.5);
/// assert_eq!(parse_cost(" 99 ").unwrap(), 99.0);
/// assert!(parse_cost("-5").is_err());
/// assert!(parse_cost("abc").is_err());
/// ```
pub fn parse_cost(input: &str) -> std::result::Result<f64, ProcassistError> {
    let trimmed = input.trim();
    let digits: String = trimmed
        .strip_prefix('$')
        .unwrap_or(trimmed)
        .trim_start()
        .chars()
        .filter(|c| *c != ',')
        .collect();

    let value: f64 = digits
        .parse()
        .map_err(|_| ProcassistError::InvalidInput(format!("cost must be a number, got '{}'", input)))?;

    if !value.is_finite() {
        return Err(ProcassistError::InvalidInput(format!(
            "cost must be finite, got '{}'",
            input
        )));
    }

    if value < 0.0 {
        return Err(ProcassistError::InvalidInput(format!(
            "cost cannot be negative, got '{}'",
            input
        )));
    }

    Ok(value)
}

fn required<'a>(field: &str, value: &'a str) -> std::result::Result<&'a str, ProcassistError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ProcassistError::InvalidInput(format!("{} is required", field)));
    }
    Ok(trimmed)
}

/// Build a history query from raw form input
///
/// # Errors
///
/// Returns `ProcassistError::InvalidInput` for a blank doctor name, an
/// unparseable date, or a start date after the end date.
pub fn build_history_query(
    doctor: &str,
    limit: HistoryLimit,
    start: Option<&str>,
    end: Option<&str>,
) -> std::result::Result<HistoryQuery, ProcassistError> {
    let doctor = required("doctor", doctor)?;
    let parse = |field: &str, value: Option<&str>| {
        value
            .map(|v| {
                parse_instant(v)
                    .map_err(|e| ProcassistError::InvalidInput(format!("{}: {}", field, e)))
            })
            .transpose()
    };

    let start_date = parse("start", start)?;
    let end_date = parse("end", end)?;

    if let (Some(start), Some(end)) = (start_date, end_date) {
        if start > end {
            return Err(ProcassistError::InvalidInput(
                "start date must not be after end date".to_string(),
            ));
        }
    }

    Ok(HistoryQuery::new(doctor, limit).with_range(start_date, end_date))
}

/// Add a procedure record
///
/// # Errors
///
/// Returns error if input coercion fails or the backend call fails
pub async fn add_procedure(
    config: &Config,
    doctor: &str,
    code: &str,
    name: &str,
    cost: &str,
) -> Result<()> {
    let doctor = required("doctor", doctor)?;
    let code = required("code", code)?;
    let name = required("name", name)?;
    let cost = parse_cost(cost)?;

    let client = ApiClient::from_config(config)?;
    let ack = client
        .add_procedure(doctor, code, name, cost)
        .await
        .map_err(ProcassistError::from)?;

    let message = ack
        .message
        .unwrap_or_else(|| "Procedure added successfully".to_string());
    println!("{}", message.green());
    Ok(())
}

/// Get a cost quote
///
/// # Errors
///
/// Returns error if the backend call fails or JSON output cannot be produced
pub async fn get_quote(
    config: &Config,
    code: &str,
    doctor: Option<&str>,
    json: bool,
) -> Result<()> {
    let code = required("code", code)?;
    let doctor = doctor.map(str::trim).filter(|d| !d.is_empty());

    let client = ApiClient::from_config(config)?;
    let quote = client
        .get_quote(code, doctor)
        .await
        .map_err(ProcassistError::from)?;

    if json {
        print_json(&quote)?;
    } else {
        print_quote(&quote);
    }
    Ok(())
}

/// Show a doctor's procedure history
///
/// # Errors
///
/// Returns error if input coercion fails or the backend call fails
pub async fn show_history(
    config: &Config,
    doctor: &str,
    limit: Option<HistoryLimit>,
    start: Option<&str>,
    end: Option<&str>,
    json: bool,
) -> Result<()> {
    let limit = match limit {
        Some(limit) => limit,
        None => HistoryLimit::try_from(config.history.default_limit)
            .map_err(ProcassistError::Config)?,
    };
    let query = build_history_query(doctor, limit, start, end)?;

    let client = ApiClient::from_config(config)?;
    let result = client
        .query_history(&query)
        .await
        .map_err(ProcassistError::from)?;

    if json {
        print_json(&result)?;
        return Ok(());
    }

    println!("\n{}", result.summary().bold());
    if result.records().is_empty() {
        println!("{}", "No procedures found.".yellow());
        return Ok(());
    }

    history_table(&result).printstd();
    if let Some(total) = result.total_cost {
        println!("Total cost: {}", format_cost(total).green());
    }
    println!();
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(ProcassistError::Serialization)?;
    println!("{}", json);
    Ok(())
}

fn print_quote(quote: &Quote) {
    if let Some(message) = &quote.message {
        println!("{}", message.green());
    }
    if let Some(code) = &quote.procedure_code {
        println!("Procedure code: {}", code.cyan());
    }
    if let Some(name) = &quote.procedure_name {
        println!("Procedure name: {}", name);
    }
    if let Some(cost) = quote.average_cost {
        println!("Average cost:   {}", format_cost(cost).bold());
    }
    if let Some(count) = quote.sample_count {
        println!("Based on:       {} record(s)", count);
    }
}

fn format_cost(cost: f64) -> String {
    format!("${:.2}", cost)
}

/// Table of history records, one row per procedure
fn history_table(result: &HistoryResult) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.set_titles(row!["Procedure".bold(), "Cost".bold(), "Date".bold()]);

    for record in result.records() {
        table.add_row(row![
            record.procedure,
            format_cost(record.cost),
            record.display_time()
        ]);
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::HistoryRecord;

    #[test]
    fn test_parse_cost_plain_and_formatted() {
        assert_eq!(parse_cost("150").unwrap(), 150.0);
        assert_eq!(parse_cost("150.75").unwrap(), 150.75);
        assert_eq!(parse_cost("$ 2,000").unwrap(), 2000.0);
        assert_eq!(parse_cost("0").unwrap(), 0.0);
    }

    #[test]
    fn test_parse_cost_rejects_bad_values() {
        for input in ["", "  ", "$", "abc", "-1", "NaN", "inf", "12abc"] {
            let result = parse_cost(input);
            assert!(
                matches!(result, Err(ProcassistError::InvalidInput(_))),
                "input {:?} should be rejected",
                input
            );
        }
    }

    #[test]
    fn test_build_history_query_with_dates() {
        let query = build_history_query(
            " Dr. Smith ",
            HistoryLimit::Ten,
            Some("2025-01-01"),
            Some("2025-01-31T23:59:59Z"),
        )
        .unwrap();
        assert_eq!(query.doctor_name, "Dr. Smith");
        assert_eq!(query.limit, HistoryLimit::Ten);
        assert!(query.start_date.is_some());
        assert!(query.end_date.is_some());
    }

    #[test]
    fn test_build_history_query_rejects_reversed_range() {
        let result = build_history_query(
            "Dr. Smith",
            HistoryLimit::Five,
            Some("2025-02-01"),
            Some("2025-01-01"),
        );
        assert!(matches!(result, Err(ProcassistError::InvalidInput(_))));
    }

    #[test]
    fn test_build_history_query_rejects_bad_date() {
        let result = build_history_query("Dr. Smith", HistoryLimit::Five, Some("yesterday"), None);
        let err = result.unwrap_err();
        assert!(err.to_string().contains("start"));
    }

    #[test]
    fn test_build_history_query_requires_doctor() {
        let result = build_history_query("   ", HistoryLimit::Five, None, None);
        assert!(matches!(result, Err(ProcassistError::InvalidInput(_))));
    }

    #[test]
    fn test_history_table_rows() {
        let result = HistoryResult {
            message: Some("Found 2 procedures".to_string()),
            history: Some(vec![
                HistoryRecord {
                    procedure: "Checkup".to_string(),
                    cost: 100.0,
                    time: "2025-01-02T10:00:00Z".to_string(),
                },
                HistoryRecord {
                    procedure: "X-Ray".to_string(),
                    cost: 250.5,
                    time: "not a date".to_string(),
                },
            ]),
            ..Default::default()
        };
        let table = history_table(&result);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_format_cost() {
        assert_eq!(format_cost(1250.5), "$1250.50");
        assert_eq!(format_cost(0.0), "$0.00");
    }
}
