use chrono::{DateTime, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DgError;

// ── Validation regexes ────────────────────────────────────────────────────────

static NAMESPACE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z][a-z0-9_]{0,63}(\.[a-z][a-z0-9_]{0,63})*$").expect("static regex")
});

static ROOT_NAMESPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9_]{1,63}$").expect("static regex"));

static GRAPH_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^graph:[0-9a-f]{8}-[0-9a-f]{4}-4[0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}$",
    )
    .expect("static regex")
});

static UTC_STAMP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(\.\d{3})?Z$").expect("static regex")
});

// ── CellId ────────────────────────────────────────────────────────────────────

/// 64-char lowercase hex content address of a cell's sealed fields.
/// Also used for `prev_cell_hash`; the all-zero value marks genesis.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CellId(String);

/// The `prev_cell_hash` of a genesis cell: 64 zeros.
pub const NULL_HASH: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

impl CellId {
    pub fn parse(s: &str) -> Result<Self, DgError> {
        if s.len() == 64 && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
            Ok(Self(s.to_string()))
        } else {
            Err(DgError::InvalidCellId(s.to_string()))
        }
    }

    pub fn null() -> Self {
        Self(NULL_HASH.to_string())
    }

    pub fn is_null(&self) -> bool {
        self.0 == NULL_HASH
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CellId {
    type Error = DgError;
    fn try_from(s: String) -> Result<Self, DgError> {
        CellId::parse(&s)
    }
}

impl From<CellId> for String {
    fn from(id: CellId) -> String {
        id.0
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CellId({}…)", &self.0[..16])
    }
}

// ── GraphId ───────────────────────────────────────────────────────────────────

/// Graph identifier: `graph:<uuid-v4>`. Sealed into every cell header; a cell
/// cannot move between graphs without invalidating its seal.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GraphId(String);

impl GraphId {
    pub fn parse(s: &str) -> Result<Self, DgError> {
        if GRAPH_ID_RE.is_match(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(DgError::InvalidGraphId(s.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for GraphId {
    type Error = DgError;
    fn try_from(s: String) -> Result<Self, DgError> {
        GraphId::parse(&s)
    }
}

impl From<GraphId> for String {
    fn from(id: GraphId) -> String {
        id.0
    }
}

impl fmt::Display for GraphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for GraphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GraphId({})", &self.0)
    }
}

// ── Namespace ─────────────────────────────────────────────────────────────────

/// Hierarchical dotted scope for facts and authorization, e.g.
/// `acme.hr.compensation`. Lowercase segments, 64 chars max each.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Namespace(String);

impl Namespace {
    pub fn parse(s: &str) -> Result<Self, DgError> {
        if NAMESPACE_RE.is_match(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(DgError::InvalidNamespace(s.to_string()))
        }
    }

    /// Root namespaces have a single segment (no dots) of at least two chars.
    pub fn parse_root(s: &str) -> Result<Self, DgError> {
        if ROOT_NAMESPACE_RE.is_match(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(DgError::InvalidNamespace(s.to_string()))
        }
    }

    pub fn is_root(&self) -> bool {
        !self.0.contains('.')
    }

    /// The first segment: `acme.hr.compensation` → `acme`.
    pub fn root(&self) -> Namespace {
        match self.0.split_once('.') {
            Some((root, _)) => Namespace(root.to_string()),
            None => self.clone(),
        }
    }

    /// True if `self` is a strict prefix-path ancestor of `other`.
    /// `acme` is an ancestor of `acme.hr`; it is not an ancestor of `acmex`.
    pub fn is_ancestor_of(&self, other: &Namespace) -> bool {
        other.0.len() > self.0.len()
            && other.0.starts_with(&self.0)
            && other.0.as_bytes()[self.0.len()] == b'.'
    }

    /// True if `other` equals `self` or sits below it in the tree.
    pub fn contains(&self, other: &Namespace) -> bool {
        self == other || self.is_ancestor_of(other)
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Namespace {
    type Error = DgError;
    fn try_from(s: String) -> Result<Self, DgError> {
        Namespace::parse(&s)
    }
}

impl From<Namespace> for String {
    fn from(ns: Namespace) -> String {
        ns.0
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Namespace({})", &self.0)
    }
}

// ── UtcStamp ──────────────────────────────────────────────────────────────────

/// An ISO-8601 UTC timestamp, `YYYY-MM-DDTHH:MM:SS(.fff)?Z`.
///
/// The raw string is preserved bit-exactly (it participates in sealed bytes);
/// ordering parses the instant and breaks ties on the raw string so that the
/// order is total even across precision variants of the same instant.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UtcStamp(String);

impl UtcStamp {
    pub fn parse(s: &str) -> Result<Self, DgError> {
        if !UTC_STAMP_RE.is_match(s) {
            return Err(DgError::InvalidTimestamp(s.to_string()));
        }
        // Regex guarantees shape; chrono guarantees the fields are a real
        // date-time (no Feb 30, no hour 25).
        let naive = s.strip_suffix('Z').expect("regex guarantees Z suffix");
        NaiveDateTime::parse_from_str(naive, "%Y-%m-%dT%H:%M:%S%.f")
            .map_err(|_| DgError::InvalidTimestamp(s.to_string()))?;
        Ok(Self(s.to_string()))
    }

    /// The current time, second precision.
    pub fn now() -> Self {
        Self(Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string())
    }

    pub fn instant(&self) -> DateTime<Utc> {
        let naive = self.0.strip_suffix('Z').expect("validated on construction");
        NaiveDateTime::parse_from_str(naive, "%Y-%m-%dT%H:%M:%S%.f")
            .expect("validated on construction")
            .and_utc()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq for UtcStamp {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for UtcStamp {}

impl PartialOrd for UtcStamp {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for UtcStamp {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.instant()
            .cmp(&other.instant())
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl TryFrom<String> for UtcStamp {
    type Error = DgError;
    fn try_from(s: String) -> Result<Self, DgError> {
        UtcStamp::parse(&s)
    }
}

impl From<UtcStamp> for String {
    fn from(t: UtcStamp) -> String {
        t.0
    }
}

impl fmt::Display for UtcStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for UtcStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UtcStamp({})", &self.0)
    }
}

// ── Confidence ────────────────────────────────────────────────────────────────

/// Fact confidence in fixed-point basis points, `0..=10_000`.
///
/// Hashed payloads forbid IEEE-754 floats, so confidence is carried as an
/// integer: 10_000 basis points ⇔ logical 1.0. Certainty (10_000) is only
/// valid together with `SourceQuality::Verified`; that pairing is enforced at
/// seal time.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct Confidence(u16);

impl Confidence {
    pub const CERTAIN: Confidence = Confidence(10_000);
    pub const MAX_BASIS_POINTS: u16 = 10_000;

    pub fn from_basis_points(bp: u16) -> Result<Self, DgError> {
        if bp <= Self::MAX_BASIS_POINTS {
            Ok(Self(bp))
        } else {
            Err(DgError::InvalidConfidence(format!(
                "{bp} basis points exceeds {}",
                Self::MAX_BASIS_POINTS
            )))
        }
    }

    pub fn basis_points(&self) -> u16 {
        self.0
    }

    pub fn is_certain(&self) -> bool {
        self.0 == Self::MAX_BASIS_POINTS
    }

    /// Logical value in [0, 1]. Read-side only; never hashed.
    pub fn as_f64(&self) -> f64 {
        f64::from(self.0) / f64::from(Self::MAX_BASIS_POINTS)
    }
}

impl TryFrom<u16> for Confidence {
    type Error = DgError;
    fn try_from(bp: u16) -> Result<Self, DgError> {
        Confidence::from_basis_points(bp)
    }
}

impl From<Confidence> for u16 {
    fn from(c: Confidence) -> u16 {
        c.0
    }
}

impl fmt::Debug for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Confidence({}bp)", self.0)
    }
}

// ── SourceQuality ─────────────────────────────────────────────────────────────

/// Provenance grade of a fact. Ranked for conflict resolution:
/// verified > self_reported > inferred.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceQuality {
    Verified,
    SelfReported,
    Inferred,
}

impl SourceQuality {
    pub fn rank(&self) -> u8 {
        match self {
            SourceQuality::Verified => 2,
            SourceQuality::SelfReported => 1,
            SourceQuality::Inferred => 0,
        }
    }
}

// ── HashScheme ────────────────────────────────────────────────────────────────

/// How a cell's sealed bytes are assembled. Fixed per chain; preserved
/// bit-exactly so historical graphs re-verify forever.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HashScheme {
    /// UTF-8 concatenation of the documented sealed-field sequence.
    /// Supports string fact objects only.
    #[serde(rename = "legacy:concat:v1")]
    LegacyConcatV1,
    /// RFC 8785 canonical JSON of the sealed document. Structured objects
    /// permitted; floats rejected everywhere.
    #[serde(rename = "canon:rfc8785:v1")]
    CanonRfc8785V1,
}

impl HashScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            HashScheme::LegacyConcatV1 => "legacy:concat:v1",
            HashScheme::CanonRfc8785V1 => "canon:rfc8785:v1",
        }
    }
}

impl fmt::Display for HashScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ── CellType ──────────────────────────────────────────────────────────────────

/// The closed set of record kinds the ledger carries. Per-variant structural
/// validation lives in the commit gate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellType {
    Genesis,
    Fact,
    Rule,
    Decision,
    Evidence,
    Override,
    AccessRule,
    BridgeRule,
    NamespaceDef,
    PolicyHead,
    Signal,
    Mitigation,
    Score,
    Verdict,
    Justification,
    PolicyRef,
    PolicyCitation,
    ReportRun,
    Judgment,
}

impl CellType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CellType::Genesis => "Genesis",
            CellType::Fact => "Fact",
            CellType::Rule => "Rule",
            CellType::Decision => "Decision",
            CellType::Evidence => "Evidence",
            CellType::Override => "Override",
            CellType::AccessRule => "AccessRule",
            CellType::BridgeRule => "BridgeRule",
            CellType::NamespaceDef => "NamespaceDef",
            CellType::PolicyHead => "PolicyHead",
            CellType::Signal => "Signal",
            CellType::Mitigation => "Mitigation",
            CellType::Score => "Score",
            CellType::Verdict => "Verdict",
            CellType::Justification => "Justification",
            CellType::PolicyRef => "PolicyRef",
            CellType::PolicyCitation => "PolicyCitation",
            CellType::ReportRun => "ReportRun",
            CellType::Judgment => "Judgment",
        }
    }
}

impl fmt::Display for CellType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespace_accepts_dotted_paths() {
        assert!(Namespace::parse("acme").is_ok());
        assert!(Namespace::parse("acme.hr.compensation").is_ok());
        assert!(Namespace::parse("a1_b.c2_d").is_ok());
    }

    #[test]
    fn namespace_rejects_bad_shapes() {
        for bad in ["Acme", "1acme", "acme..hr", ".acme", "acme.", "acme.HR", ""] {
            assert!(Namespace::parse(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn ancestor_requires_segment_boundary() {
        let acme = Namespace::parse("acme").unwrap();
        let hr = Namespace::parse("acme.hr").unwrap();
        let acmex = Namespace::parse("acmex").unwrap();
        assert!(acme.is_ancestor_of(&hr));
        assert!(!acme.is_ancestor_of(&acmex));
        assert!(!hr.is_ancestor_of(&acme));
        assert!(!acme.is_ancestor_of(&acme));
    }

    #[test]
    fn graph_id_format_enforced() {
        assert!(GraphId::parse("graph:4b4a7b1c-9f5e-4f3a-8c2d-1e2f3a4b5c6d").is_ok());
        assert!(GraphId::parse("graph:4B4A7B1C-9F5E-4F3A-8C2D-1E2F3A4B5C6D").is_err());
        // wrong version nibble
        assert!(GraphId::parse("graph:4b4a7b1c-9f5e-5f3a-8c2d-1e2f3a4b5c6d").is_err());
        assert!(GraphId::parse("4b4a7b1c-9f5e-4f3a-8c2d-1e2f3a4b5c6d").is_err());
    }

    #[test]
    fn stamp_ordering_spans_precision() {
        let coarse = UtcStamp::parse("2026-01-01T00:00:00Z").unwrap();
        let fine = UtcStamp::parse("2026-01-01T00:00:00.000Z").unwrap();
        let later = UtcStamp::parse("2026-01-01T00:00:00.500Z").unwrap();
        assert_eq!(coarse.instant(), fine.instant());
        assert!(coarse < fine, "raw string breaks the instant tie");
        assert!(fine < later);
    }

    #[test]
    fn stamp_rejects_non_utc() {
        for bad in [
            "2026-01-01T00:00:00",
            "2026-01-01T00:00:00+02:00",
            "2026-01-01 00:00:00Z",
            "2026-02-30T00:00:00Z",
        ] {
            assert!(UtcStamp::parse(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn confidence_bounds() {
        assert!(Confidence::from_basis_points(10_000).is_ok());
        assert!(Confidence::from_basis_points(10_001).is_err());
        assert!(Confidence::from_basis_points(0).unwrap().as_f64() == 0.0);
    }

    #[test]
    fn null_hash_is_64_zeros() {
        let null = CellId::null();
        assert!(null.is_null());
        assert_eq!(null.as_str().len(), 64);
        assert!(null.as_str().bytes().all(|b| b == b'0'));
    }
}
