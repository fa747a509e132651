use std::collections::{BTreeMap, BTreeSet};

use http::{HeaderMap, HeaderValue};
use serde::Serialize;

/// Which header values stayed the same across a batch of responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StabilityReport {
    /// Lower-case header name to its values joined with `", "`
    pub stable_headers: BTreeMap<String, String>,
    pub unstable_names: BTreeSet<String>,
    pub samples: usize,
}

impl StabilityReport {
    pub fn any_difference(&self) -> bool {
        !self.unstable_names.is_empty()
    }
}

/// Folds the header snapshots of every IP behind a domain into a
/// [`StabilityReport`].
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderStabilityComparator;

impl HeaderStabilityComparator {
    pub fn new() -> Self {
        Self
    }

    /// The first sample is the baseline. Names it lacks are never evaluated.
    pub fn compare(&self, samples: &[HeaderMap]) -> StabilityReport {
        let Some((baseline, rest)) = samples.split_first() else {
            return StabilityReport::default();
        };

        let mut report = StabilityReport { samples: samples.len(), ..Default::default() };

        for name in baseline.keys() {
            let expected = ordered_values(baseline, name.as_str());
            let stable = rest
                .iter()
                .all(|other| ordered_values(other, name.as_str()) == expected);

            if stable {
                report.stable_headers.insert(name.to_string(), display(&expected));
            } else {
                report.unstable_names.insert(name.to_string());
            }
        }

        report
    }
}

/// Shorthand for [`HeaderStabilityComparator::compare`].
pub fn compare(samples: &[HeaderMap]) -> StabilityReport {
    HeaderStabilityComparator.compare(samples)
}

/// Raw values in received order; compared byte for byte.
fn ordered_values<'a>(headers: &'a HeaderMap, name: &str) -> Vec<&'a HeaderValue> {
    headers.get_all(name).iter().collect()
}

fn display(values: &[&HeaderValue]) -> String {
    values
        .iter()
        .map(|v| String::from_utf8_lossy(v.as_bytes()))
        .collect::<Vec<_>>()
        .join(", ")
}
