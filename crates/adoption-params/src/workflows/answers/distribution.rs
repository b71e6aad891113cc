use serde::Serialize;
use std::ops::Range;

/// Ordered answer counts for one response code in one country.
///
/// Cells follow the ordinal answer levels; the last cell holds the grand
/// total of respondents. Some questionnaires append extra cells (for example
/// "don't know") before the total, which is why totals are addressed by an
/// offset from the end rather than a fixed position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerDistribution {
    response_code: String,
    country: String,
    levels: Vec<String>,
    counts: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DistributionError {
    #[error("distribution '{code}' for {country} has no cells")]
    Empty { code: String, country: String },
    #[error(
        "levels {start}..{end} of '{code}' for {country} fall outside its {len} cells"
    )]
    LevelRange {
        code: String,
        country: String,
        start: usize,
        end: usize,
        len: usize,
    },
    #[error("top band of {levels} levels exceeds answer length {answer_length} for '{code}'")]
    BandExceedsLength {
        code: String,
        levels: usize,
        answer_length: usize,
    },
}

impl AnswerDistribution {
    pub fn new(
        response_code: impl Into<String>,
        country: impl Into<String>,
        levels: Vec<String>,
        counts: Vec<f64>,
    ) -> Self {
        Self {
            response_code: response_code.into(),
            country: country.into(),
            levels,
            counts,
        }
    }

    /// Builds a distribution with generated level labels; handy for tests and
    /// for sources that carry no labels.
    pub fn from_counts(
        response_code: impl Into<String>,
        country: impl Into<String>,
        counts: Vec<f64>,
    ) -> Self {
        let levels = (1..=counts.len()).map(|level| format!("level {level}")).collect();
        Self::new(response_code, country, levels, counts)
    }

    pub fn response_code(&self) -> &str {
        &self.response_code
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    pub fn counts(&self) -> &[f64] {
        &self.counts
    }

    pub fn levels(&self) -> &[String] {
        &self.levels
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of the lowest `levels` answer levels.
    pub fn bottom_band(&self, levels: usize) -> Result<f64, DistributionError> {
        self.band(0..levels)
    }

    /// Sum of the highest `levels` levels among the first `answer_length`.
    pub fn top_band(&self, answer_length: usize, levels: usize) -> Result<f64, DistributionError> {
        if levels > answer_length {
            return Err(DistributionError::BandExceedsLength {
                code: self.response_code.clone(),
                levels,
                answer_length,
            });
        }
        self.band(answer_length - levels..answer_length)
    }

    /// Cell located `offset` positions before the last one.
    pub fn total_from_end(&self, offset: usize) -> Result<f64, DistributionError> {
        let len = self.counts.len();
        if len == 0 {
            return Err(self.empty());
        }
        if offset >= len {
            return Err(DistributionError::LevelRange {
                code: self.response_code.clone(),
                country: self.country.clone(),
                start: offset,
                end: offset + 1,
                len,
            });
        }
        Ok(self.counts[len - 1 - offset])
    }

    pub fn grand_total(&self) -> Result<f64, DistributionError> {
        self.total_from_end(0)
    }

    /// Every cell except the trailing grand total, paired with its label.
    pub fn categories(&self) -> Result<Vec<(&str, f64)>, DistributionError> {
        let Some((_, body)) = self.counts.split_last() else {
            return Err(self.empty());
        };

        Ok(self
            .levels
            .iter()
            .map(String::as_str)
            .zip(body.iter().copied())
            .collect())
    }

    fn band(&self, range: Range<usize>) -> Result<f64, DistributionError> {
        if self.counts.is_empty() {
            return Err(self.empty());
        }
        let Some(cells) = self.counts.get(range.clone()) else {
            return Err(DistributionError::LevelRange {
                code: self.response_code.clone(),
                country: self.country.clone(),
                start: range.start,
                end: range.end,
                len: self.counts.len(),
            });
        };
        Ok(cells.iter().sum())
    }

    fn empty(&self) -> DistributionError {
        DistributionError::Empty {
            code: self.response_code.clone(),
            country: self.country.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn five_level() -> AnswerDistribution {
        AnswerDistribution::from_counts(
            "users_Q1",
            "Netherlands",
            vec![10.0, 20.0, 30.0, 25.0, 15.0, 100.0],
        )
    }

    #[test]
    fn bands_slice_from_each_end_of_the_answer_levels() {
        let distribution = five_level();
        assert_eq!(distribution.bottom_band(1).expect("bottom"), 10.0);
        assert_eq!(distribution.bottom_band(2).expect("bottom"), 30.0);
        assert_eq!(distribution.top_band(5, 2).expect("top"), 40.0);
        assert_eq!(distribution.top_band(5, 0).expect("empty top"), 0.0);
    }

    #[test]
    fn totals_are_addressed_from_the_end() {
        let distribution = five_level();
        assert_eq!(distribution.grand_total().expect("total"), 100.0);
        assert_eq!(distribution.total_from_end(1).expect("offset"), 15.0);
        assert!(matches!(
            distribution.total_from_end(6),
            Err(DistributionError::LevelRange { len: 6, .. })
        ));
    }

    #[test]
    fn out_of_range_bands_are_rejected() {
        let distribution = five_level();
        assert!(matches!(
            distribution.top_band(7, 2),
            Err(DistributionError::LevelRange { start: 5, end: 7, .. })
        ));
        assert!(matches!(
            distribution.top_band(3, 4),
            Err(DistributionError::BandExceedsLength { .. })
        ));
    }

    #[test]
    fn categories_drop_the_grand_total() {
        let distribution = AnswerDistribution::new(
            "users_R1",
            "Germany",
            vec!["Market".into(), "Community".into(), "Total".into()],
            vec![3.0, 7.0, 10.0],
        );
        let categories = distribution.categories().expect("categories");
        assert_eq!(categories, vec![("Market", 3.0), ("Community", 7.0)]);
    }

    #[test]
    fn empty_distribution_is_an_error() {
        let distribution = AnswerDistribution::from_counts("users_Q9", "France", Vec::new());
        assert!(matches!(
            distribution.bottom_band(1),
            Err(DistributionError::Empty { .. })
        ));
        assert!(matches!(
            distribution.categories(),
            Err(DistributionError::Empty { .. })
        ));
    }
}
