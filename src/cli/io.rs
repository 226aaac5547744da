//! JSON-lines I/O
//!
//! - Input: one JSON object per line
//! - Output: one JSON object per line, flushed after each response
//! - Blank lines are ignored

use std::io::{BufRead, Write};

use serde_json::Value;

use super::errors::{CliError, CliResult};

/// Iterate over the non-blank lines of `input`, parsed as JSON.
///
/// A line that fails to parse yields `CliError::Json`; a failed read yields
/// `CliError::Io`.
pub fn read_requests<R: BufRead>(input: R) -> impl Iterator<Item = CliResult<Value>> {
    input
        .lines()
        .filter(|line| line.as_ref().map_or(true, |l| !l.trim().is_empty()))
        .map(|line| {
            let line = line.map_err(CliError::from)?;
            serde_json::from_str(&line).map_err(CliError::from)
        })
}

/// Write a success response
pub fn write_response<W: Write>(out: &mut W, data: Value) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "ok",
        "data": data
    });
    write_line(out, &response)
}

/// Write an error response
pub fn write_error<W: Write>(out: &mut W, code: &str, message: &str) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "error",
        "code": code,
        "message": message
    });
    write_line(out, &response)
}

fn write_line<W: Write>(out: &mut W, value: &Value) -> CliResult<()> {
    serde_json::to_writer(&mut *out, value)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_requests_skips_blank_lines() {
        let input = "{\"op\":\"dump\"}\n\n   \n{\"op\":\"metrics\"}\n";
        let requests: Vec<_> = read_requests(input.as_bytes()).collect();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].as_ref().unwrap()["op"], "metrics");
    }

    #[test]
    fn test_read_requests_reports_bad_json() {
        let mut requests = read_requests("not json\n".as_bytes());
        let err = requests.next().unwrap().unwrap_err();
        assert_eq!(err.code(), "LS_CLI_MALFORMED_REQUEST");
    }

    #[test]
    fn test_write_error_shape() {
        let mut out = Vec::new();
        write_error(&mut out, "LS_NOT_FOUND", "missing").unwrap();
        let line: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(line["status"], "error");
        assert_eq!(line["code"], "LS_NOT_FOUND");
        assert_eq!(out.last(), Some(&b'\n'));
    }
}
