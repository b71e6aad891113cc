use super::normalizer::normalize_label;
use super::{AnswerTable, StoreError};
use std::io::Read;

/// Parses one answer table: a label column followed by one count column per
/// country, one row per answer level, the final row holding the totals.
pub(crate) fn parse_answer_table<R: Read>(
    response_code: &str,
    reader: R,
) -> Result<AnswerTable, StoreError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let countries: Vec<String> = headers.iter().skip(1).map(normalize_label).collect();
    if countries.is_empty() {
        return Err(StoreError::MalformedTable {
            code: response_code.to_string(),
            detail: "expected a label column followed by at least one country column"
                .to_string(),
        });
    }

    let mut levels = Vec::new();
    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); countries.len()];

    for (row_index, record) in csv_reader.records().enumerate() {
        let record = record?;
        let label = record.get(0).map(normalize_label).unwrap_or_default();

        for (column, country) in countries.iter().enumerate() {
            let raw = record.get(column + 1).unwrap_or_default();
            let count = parse_count(raw).ok_or_else(|| StoreError::InvalidCount {
                code: response_code.to_string(),
                country: country.clone(),
                row: row_index + 1,
                value: raw.to_string(),
            })?;
            columns[column].push(count);
        }

        levels.push(label);
    }

    AnswerTable::new(response_code, levels, countries.into_iter().zip(columns).collect())
}

fn parse_count(raw: &str) -> Option<f64> {
    let value = raw.trim().parse::<f64>().ok()?;
    (value.is_finite() && value >= 0.0).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_levels_and_country_columns() {
        let csv = "\u{feff}Answer,Netherlands,Germany\n\
Strongly disagree,10,4\n\
Agree,20,6\n\
Total,30,10\n";
        let table = parse_answer_table("users_Q1", Cursor::new(csv)).expect("parses");
        let distribution = table.distribution("Germany").expect("germany");
        assert_eq!(distribution.counts(), &[4.0, 6.0, 10.0]);
        assert_eq!(distribution.levels()[0], "Strongly disagree");
        assert_eq!(table.countries(), &["Netherlands".to_string(), "Germany".to_string()]);
    }

    #[test]
    fn rejects_negative_and_non_numeric_counts() {
        let csv = "Answer,Netherlands\nYes,-1\nTotal,3\n";
        let error = parse_answer_table("users_Q2", Cursor::new(csv)).expect_err("negative");
        assert!(matches!(error, StoreError::InvalidCount { row: 1, .. }));

        let csv = "Answer,Netherlands\nYes,many\nTotal,3\n";
        let error = parse_answer_table("users_Q2", Cursor::new(csv)).expect_err("text");
        assert!(error.to_string().contains("many"));
    }

    #[test]
    fn rejects_tables_without_country_columns() {
        let csv = "Answer\nYes\nTotal\n";
        let error = parse_answer_table("users_Q3", Cursor::new(csv)).expect_err("no countries");
        assert!(matches!(error, StoreError::MalformedTable { .. }));
    }
}
