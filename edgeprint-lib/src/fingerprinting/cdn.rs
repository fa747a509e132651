//! CDN detection from response headers.
//!
//! Each provider is described by an ordered table of [`Rule`]s. Rules are
//! evaluated uniformly: the first matching High rule wins outright, otherwise
//! every matching Medium rule contributes evidence. Correlation rules only
//! fire when enough generic cache headers accompany their own hint.

use std::collections::BTreeMap;

use http::HeaderMap;

use super::headers::{is_present, names, values, CORRELATION_SIGNALS};
use super::types::{ConfidenceTier, Detection, Provider};

/// Minimum number of [`CORRELATION_SIGNALS`] a correlation rule needs.
pub const CORRELATION_THRESHOLD: usize = 2;

/// Test applied to each value of the headers a rule checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    /// Header carries a non-empty value
    Present,
    /// Value contains one of the lower-case needles, ignoring ASCII case
    ContainsAny(&'static [&'static str]),
    /// Value contains every lower-case needle, ignoring ASCII case
    ContainsAll(&'static [&'static str]),
    /// Value contains the needle, case-sensitive
    ContainsExact(&'static str),
    /// Fastly `X-Timer` layout, e.g. `S1700000000.123456,VS0,VE1`
    FastlyTimer,
}

/// One data-described detection rule.
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    /// Headers checked, in order
    pub headers: &'static [&'static str],
    pub predicate: Predicate,
    pub tier: ConfidenceTier,
    /// Requires [`CORRELATION_THRESHOLD`] generic signals alongside the match
    pub correlated: bool,
    /// Evidence text; derived from header and predicate when `None`
    pub evidence: Option<&'static str>,
    /// Primary evidence replacing `Header: value`, for values not worth echoing
    pub primary: Option<&'static str>,
}

/// A header value that satisfied a rule's predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatch {
    pub header: &'static str,
    pub value: String,
    pub needle: Option<&'static str>,
}

impl Rule {
    const fn new(
        headers: &'static [&'static str],
        predicate: Predicate,
        tier: ConfidenceTier,
    ) -> Self {
        Self { headers, predicate, tier, correlated: false, evidence: None, primary: None }
    }

    const fn high(headers: &'static [&'static str], predicate: Predicate) -> Self {
        Self::new(headers, predicate, ConfidenceTier::High)
    }

    const fn medium(headers: &'static [&'static str], predicate: Predicate) -> Self {
        Self::new(headers, predicate, ConfidenceTier::Medium)
    }

    const fn correlated(mut self) -> Self {
        self.correlated = true;
        self
    }

    const fn evidence(mut self, text: &'static str) -> Self {
        self.evidence = Some(text);
        self
    }

    const fn primary(mut self, text: &'static str) -> Self {
        self.primary = Some(text);
        self
    }

    /// First header value satisfying the predicate, honouring correlation.
    pub fn find_match(&self, headers: &HeaderMap) -> Option<RuleMatch> {
        if self.correlated && correlation_count(headers) < CORRELATION_THRESHOLD {
            return None;
        }
        self.headers.iter().find_map(|&header| {
            values(headers, header).find_map(|value| {
                if value.is_empty() {
                    return None;
                }
                let needle = match self.predicate {
                    Predicate::Present => None,
                    Predicate::ContainsAny(needles) => {
                        let lower = value.to_ascii_lowercase();
                        Some(*needles.iter().find(|n| lower.contains(**n))?)
                    }
                    Predicate::ContainsAll(needles) => {
                        let lower = value.to_ascii_lowercase();
                        if !needles.iter().all(|n| lower.contains(*n)) {
                            return None;
                        }
                        None
                    }
                    Predicate::ContainsExact(needle) => {
                        if !value.contains(needle) {
                            return None;
                        }
                        Some(needle)
                    }
                    Predicate::FastlyTimer => {
                        if !is_fastly_timer(&value) {
                            return None;
                        }
                        None
                    }
                };
                Some(RuleMatch { header, value: value.into_owned(), needle })
            })
        })
    }

    pub fn evidence_for(&self, m: &RuleMatch) -> String {
        if let Some(text) = self.evidence {
            return text.to_string();
        }
        match (self.predicate, m.needle) {
            (Predicate::FastlyTimer, _) => format!("{} header with Fastly format", m.header),
            (Predicate::ContainsAll(needles), _) => {
                format!("{} header contains '{}'", m.header, needles.join("' and '"))
            }
            (_, Some(needle)) => format!("{} header contains '{needle}'", m.header),
            (_, None) => format!("{} header present", m.header),
        }
    }

    pub fn primary_for(&self, m: &RuleMatch) -> String {
        match self.primary {
            Some(text) => text.to_string(),
            None => format!("{}: {}", m.header, m.value),
        }
    }
}

/// How many generic cache/CDN signals are present.
pub fn correlation_count(headers: &HeaderMap) -> usize {
    CORRELATION_SIGNALS
        .iter()
        .filter(|name| is_present(headers, name))
        .count()
}

/// Matches `\dS[.,]\d` as well as Fastly's `S<secs>[.,]<frac>` start stamp.
fn is_fastly_timer(value: &str) -> bool {
    let b = value.as_bytes();
    let digit_at = |i: usize| b.get(i).is_some_and(u8::is_ascii_digit);
    let sep_at = |i: usize| matches!(b.get(i), Some(b'.') | Some(b','));

    b.iter().enumerate().any(|(i, &c)| {
        if c != b'S' {
            return false;
        }
        let after = i.saturating_add(1);
        if i > 0 && digit_at(i - 1) && sep_at(after) && digit_at(after.saturating_add(1)) {
            return true;
        }
        let mut j = after;
        while digit_at(j) {
            j = j.saturating_add(1);
        }
        j > after && sep_at(j) && digit_at(j.saturating_add(1))
    })
}

const HIT_OR_MISS: &[&str] = &["hit", "miss"];

static CLOUDFLARE_RULES: &[Rule] = &[
    Rule::high(&[names::CF_RAY], Predicate::Present),
    Rule::high(&[names::CF_CACHE_STATUS], Predicate::Present),
    Rule::medium(&[names::CF_CONNECTING_IP], Predicate::Present),
    Rule::medium(&[names::CF_IPCOUNTRY], Predicate::Present),
    Rule::medium(&[names::CF_VISITOR], Predicate::Present),
    Rule::medium(&[names::SERVER], Predicate::ContainsAny(&["cloudflare"])),
    Rule::medium(&[names::EXPECT_CT], Predicate::ContainsAny(&["cloudflare"])),
];

static CLOUDFRONT_RULES: &[Rule] = &[
    Rule::high(&[names::X_AMZ_CF_ID], Predicate::Present),
    Rule::medium(&[names::VIA], Predicate::ContainsAny(&["cloudfront"])),
    Rule::medium(&[names::X_CACHE], Predicate::ContainsAny(&["cloudfront"])),
    Rule::medium(&[names::SERVER], Predicate::ContainsAny(&["cloudfront"])),
    Rule::medium(&[names::SET_COOKIE], Predicate::ContainsExact("AWSALB"))
        .evidence("AWS Load Balancer cookie present")
        .primary("AWS ALB Cookie detected"),
];

static AKAMAI_RULES: &[Rule] = &[
    Rule::high(&["X-Akamai-Transformed"], Predicate::Present),
    Rule::high(&["X-Akamai-Session-Info"], Predicate::Present),
    Rule::high(&["Akamai-Origin-Hop"], Predicate::Present),
    Rule::high(&["X-Akamai-Staging"], Predicate::Present),
    Rule::high(&["X-Akamai-Edge-IP"], Predicate::Present),
    Rule::high(&["X-Akamai-Request-ID"], Predicate::Present),
    Rule::high(&["X-Akamai-Config-Log-Detail"], Predicate::Present),
    Rule::medium(&[names::TRUE_CLIENT_IP], Predicate::Present),
    Rule::medium(&[names::SERVER], Predicate::ContainsAny(&["akamai"])),
    Rule::medium(&[names::X_CACHE], Predicate::ContainsAny(&["akamai"])),
    Rule::medium(&[names::X_CACHE], Predicate::ContainsAll(&["tcp", "hit"])),
];

static FASTLY_RULES: &[Rule] = &[
    Rule::high(&["Fastly-Debug-Path"], Predicate::Present),
    Rule::high(&["Fastly-Debug-TTL"], Predicate::Present),
    Rule::high(&["Fastly-Debug-Digest"], Predicate::Present),
    Rule::high(&["X-Fastly-Request-ID"], Predicate::Present),
    Rule::high(&["X-Fastly-Trace"], Predicate::Present),
    Rule::high(&["Fastly-IO"], Predicate::Present),
    Rule::high(&["Fastly-Restarts"], Predicate::Present),
    Rule::medium(&[names::X_SERVED_BY], Predicate::ContainsAny(&["cache-", "fastly"]))
        .evidence("X-Served-By header with cache server pattern"),
    Rule::medium(&[names::X_TIMER], Predicate::FastlyTimer),
    Rule::medium(&[names::VIA], Predicate::ContainsAny(&["fastly", "varnish"])),
    Rule::medium(&[names::X_CACHE], Predicate::ContainsAny(HIT_OR_MISS))
        .correlated()
        .evidence("X-Cache header with hit/miss pattern and correlated cache headers"),
];

static KEYCDN_RULES: &[Rule] = &[Rule::high(
    &[names::X_EDGE_LOCATION, names::X_CACHE, names::SERVER],
    Predicate::ContainsAny(&["keycdn"]),
)];

static MAXCDN_RULES: &[Rule] =
    &[Rule::high(&[names::X_CACHE, names::SERVER], Predicate::ContainsAny(&["maxcdn"]))];

static INCAPSULA_RULES: &[Rule] = &[
    Rule::high(&[names::X_IINFO], Predicate::Present),
    Rule::high(&[names::X_CDN], Predicate::ContainsAny(&["incapsula"])),
    Rule::high(&[names::SET_COOKIE], Predicate::ContainsAny(&["visid_incap"]))
        .evidence("Incapsula visitor ID cookie present")
        .primary("Incapsula cookie detected"),
];

static SUCURI_RULES: &[Rule] = &[
    Rule::high(&[names::X_SUCURI_ID], Predicate::Present),
    Rule::high(&[names::X_SUCURI_CACHE], Predicate::Present),
    Rule::high(&[names::SERVER], Predicate::ContainsAny(&["sucuri"])),
];

/// Rule table of a provider, in reliability order.
pub fn rules_for(provider: Provider) -> &'static [Rule] {
    match provider {
        Provider::Cloudflare => CLOUDFLARE_RULES,
        Provider::CloudFront => CLOUDFRONT_RULES,
        Provider::Akamai => AKAMAI_RULES,
        Provider::Fastly => FASTLY_RULES,
        Provider::KeyCdn => KEYCDN_RULES,
        Provider::MaxCdn => MAXCDN_RULES,
        Provider::Incapsula => INCAPSULA_RULES,
        Provider::Sucuri => SUCURI_RULES,
    }
}

/// Merge the matches of `rules` into a single detection.
pub fn evaluate(provider: Provider, rules: &[Rule], headers: &HeaderMap) -> Detection {
    let mut detection = Detection::none(provider);

    for rule in rules {
        let Some(m) = rule.find_match(headers) else {
            continue;
        };
        let evidence = rule.evidence_for(&m);
        let primary = rule.primary_for(&m);

        if rule.tier == ConfidenceTier::High {
            return Detection {
                provider,
                detected: true,
                confidence: ConfidenceTier::High,
                evidence: vec![evidence],
                primary_evidence: primary,
            };
        }

        detection.detected = true;
        detection.confidence = detection.confidence.max(rule.tier);
        detection.evidence.push(evidence);
        if detection.primary_evidence.is_empty() {
            detection.primary_evidence = primary;
        }
    }

    detection
}

/// Stateless CDN classifier; cheap to share between per-IP tasks.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderEvidenceCollector;

impl HeaderEvidenceCollector {
    pub fn new() -> Self {
        Self
    }

    pub fn detect(&self, provider: Provider, headers: &HeaderMap) -> Detection {
        evaluate(provider, rules_for(provider), headers)
    }

    /// Detection for every supported provider, keyed by provider.
    pub fn detect_all(&self, headers: &HeaderMap) -> BTreeMap<Provider, Detection> {
        Provider::ALL
            .iter()
            .map(|&provider| (provider, self.detect(provider, headers)))
            .collect()
    }
}

/// Shorthand for [`HeaderEvidenceCollector::detect_all`].
pub fn detect_all(headers: &HeaderMap) -> BTreeMap<Provider, Detection> {
    HeaderEvidenceCollector.detect_all(headers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fastly_timer_formats() {
        assert!(is_fastly_timer("S1512504913.286427,VS0,VE96"));
        assert!(is_fastly_timer("1S.5"));
        assert!(is_fastly_timer("S1700000000,123"));
        assert!(!is_fastly_timer("S"));
        assert!(!is_fastly_timer("VS0,VE1"));
        assert!(!is_fastly_timer("12.5"));
    }

    #[test]
    fn test_every_table_lists_high_rules_first() {
        for provider in Provider::ALL {
            let rules = rules_for(provider);
            let first_non_high = rules
                .iter()
                .position(|r| r.tier != ConfidenceTier::High)
                .unwrap_or(rules.len());
            assert!(
                rules[first_non_high..]
                    .iter()
                    .all(|r| r.tier != ConfidenceTier::High),
                "{provider}: High rule after a lower tier"
            );
        }
    }
}
