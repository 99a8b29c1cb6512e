//! Plain-text edge lists.
//!
//! One observation per line: `from to affinity [multiplicity]`, separated by
//! whitespace. Everything after `#` is a comment and blank lines are
//! skipped. The multiplicity defaults to `1`.

use std::io::{self, BufRead};
use std::str::FromStr;

use regionmerge_core::RawEdge;
use thiserror::Error;

/// Errors raised while reading an edge list.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EdgeListError {
    /// Reading from the underlying source failed.
    #[error("failed to read edge list: {0}")]
    Io(#[from] io::Error),
    /// A required column is absent.
    #[error("line {line}: missing `{field}`")]
    MissingField {
        /// One-based line number.
        line: usize,
        /// Name of the missing column.
        field: &'static str,
    },
    /// A column did not parse as the expected number.
    #[error("line {line}: `{value}` is not a valid {field}")]
    InvalidNumber {
        /// One-based line number.
        line: usize,
        /// Name of the offending column.
        field: &'static str,
        /// Text found in the column.
        value: String,
    },
    /// More than four columns were supplied.
    #[error("line {line}: unexpected trailing field `{value}`")]
    TrailingField {
        /// One-based line number.
        line: usize,
        /// First unexpected column.
        value: String,
    },
}

/// Reads every observation from `reader`.
///
/// # Errors
/// Returns [`EdgeListError`] for I/O failures and malformed lines. Semantic
/// checks such as self-loops are left to graph construction.
///
/// # Examples
/// ```
/// use regionmerge_cli::cli::read_edge_list;
///
/// let edges = read_edge_list("# from to affinity\n0 1 0.9\n\n1 2 0.4 3\n".as_bytes())?;
/// assert_eq!(edges.len(), 2);
/// assert_eq!(edges[1].multiplicity, 3);
/// # Ok::<(), regionmerge_cli::cli::EdgeListError>(())
/// ```
pub fn read_edge_list(reader: impl BufRead) -> Result<Vec<RawEdge>, EdgeListError> {
    let mut edges = Vec::new();
    for (offset, line) in reader.lines().enumerate() {
        if let Some(edge) = parse_line(offset + 1, &line?)? {
            edges.push(edge);
        }
    }
    Ok(edges)
}

fn parse_line(line: usize, text: &str) -> Result<Option<RawEdge>, EdgeListError> {
    let content = text.split_once('#').map_or(text, |(before, _)| before);
    let mut fields = content.split_whitespace();
    let Some(first) = fields.next() else {
        return Ok(None);
    };

    let from = parse_field(line, "from", Some(first))?;
    let to = parse_field(line, "to", fields.next())?;
    let affinity = parse_field(line, "affinity", fields.next())?;
    let multiplicity = match fields.next() {
        Some(raw) => parse_field(line, "multiplicity", Some(raw))?,
        None => 1,
    };
    if let Some(extra) = fields.next() {
        return Err(EdgeListError::TrailingField {
            line,
            value: extra.to_owned(),
        });
    }
    Ok(Some(RawEdge::new(affinity, from, to, multiplicity)))
}

fn parse_field<T: FromStr>(
    line: usize,
    field: &'static str,
    raw: Option<&str>,
) -> Result<T, EdgeListError> {
    let raw = raw.ok_or(EdgeListError::MissingField { line, field })?;
    raw.parse().map_err(|_| EdgeListError::InvalidNumber {
        line,
        field,
        value: raw.to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let input = "# header\n\n   \n0 1 0.5 # trailing comment\n2\t3\t0.25\t4\n";
        let edges = read_edge_list(input.as_bytes()).expect("valid input");
        assert_eq!(
            edges,
            vec![RawEdge::new(0.5, 0, 1, 1), RawEdge::new(0.25, 2, 3, 4)]
        );
    }

    #[rstest]
    #[case::missing_to("0", 1, "to")]
    #[case::missing_affinity("0 1", 1, "affinity")]
    fn missing_columns_are_reported(
        #[case] input: &str,
        #[case] line: usize,
        #[case] field: &str,
    ) {
        let err = read_edge_list(input.as_bytes()).expect_err("line is incomplete");
        assert!(matches!(
            err,
            EdgeListError::MissingField { line: l, field: f } if l == line && f == field
        ));
    }

    #[rstest]
    #[case::negative_node("0 1 0.5\n-1 2 0.5", 2, "from")]
    #[case::bad_affinity("0 1 high", 1, "affinity")]
    #[case::fractional_multiplicity("0 1 0.5 1.5", 1, "multiplicity")]
    fn malformed_numbers_are_reported(
        #[case] input: &str,
        #[case] line: usize,
        #[case] field: &str,
    ) {
        let err = read_edge_list(input.as_bytes()).expect_err("number is malformed");
        assert!(matches!(
            err,
            EdgeListError::InvalidNumber { line: l, field: f, .. } if l == line && f == field
        ));
    }

    #[test]
    fn trailing_columns_are_rejected() {
        let err = read_edge_list("0 1 0.5 2 extra".as_bytes()).expect_err("too many columns");
        assert!(matches!(err, EdgeListError::TrailingField { line: 1, ref value } if value == "extra"));
    }

    #[test]
    fn non_finite_affinities_reach_the_graph() {
        let edges = read_edge_list("0 1 NaN".as_bytes()).expect("parses as f64");
        assert!(edges[0].affinity.is_nan());
    }
}
