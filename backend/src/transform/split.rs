//! Splitting delimited text fields into a fixed number of segments.

/// Separator between category, sub-category and frame material.
pub const DESCRIPTION_SEPARATOR: &str = " - ";

/// Separator between city and state.
pub const LOCATION_SEPARATOR: &str = ", ";

/// Segments of a split field, padded to the expected count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segments {
    pub values: Vec<Option<String>>,
    /// How many trailing values are padding
    pub missing: usize,
}

impl Segments {
    fn nulls(expected: usize) -> Self {
        Self {
            values: vec![None; expected],
            missing: 0,
        }
    }

    pub fn get(&self, i: usize) -> Option<String> {
        self.values.get(i).cloned().flatten()
    }

    pub fn is_short(&self) -> bool {
        self.missing > 0
    }
}

/// More segments than the output has fields for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TooManySegments {
    pub found: usize,
    pub expected: usize,
}

/// Split `text` on the literal `separator` into exactly `expected` values.
///
/// A null field gives `expected` nulls. Fewer segments are padded with nulls
/// and reported through [`Segments::missing`]; more segments are an error,
/// never truncated.
pub fn split_segments(
    text: Option<&str>,
    separator: &str,
    expected: usize,
) -> Result<Segments, TooManySegments> {
    let Some(text) = text else {
        return Ok(Segments::nulls(expected));
    };

    let parts: Vec<&str> = text.split(separator).collect();
    if parts.len() > expected {
        return Err(TooManySegments {
            found: parts.len(),
            expected,
        });
    }

    let missing = expected - parts.len();
    let mut values: Vec<Option<String>> = parts.into_iter().map(|p| Some(p.to_string())).collect();
    values.resize(expected, None);
    Ok(Segments { values, missing })
}
