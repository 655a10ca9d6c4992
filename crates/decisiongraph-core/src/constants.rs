//! ─── DecisionGraph protocol constants ────────────────────────────────────────
//!
//! Values sealed into cells. Changing any of these invalidates every seal
//! produced under the old value; they are frozen per cell `version`.

/// Cell format version written into every header.
pub const CELL_VERSION: &str = "1.0";

// ── Genesis ───────────────────────────────────────────────────────────────────

/// The rule id anchored by every genesis cell.
pub const GENESIS_RULE_ID: &str = "graph:genesis:v1";

/// The interpreter string anchored by every genesis cell.
pub const GENESIS_INTERPRETER: &str = "decisiongraph.core/1";

/// Genesis fact subject.
pub const GENESIS_SUBJECT: &str = "graph:root";

/// Genesis fact predicate.
pub const GENESIS_PREDICATE: &str = "instance_of";

// ── Well-known rule ids ───────────────────────────────────────────────────────

/// Logic anchor for sealed judgment cells.
pub const JUDGMENT_RULE_ID: &str = "judgment:precedent:v1";

// ── Well-known predicates ─────────────────────────────────────────────────────

/// Rule cells carrying a witness-set payload use this predicate.
pub const WITNESS_SET_PREDICATE: &str = "witness_set";

/// Canonical action string signed by witnesses when promoting rules.
pub const PROMOTE_POLICY_ACTION: &str = "promote_policy";

// ── Evidence types ────────────────────────────────────────────────────────────

/// Evidence type of the two owner approvals a bridge must carry.
pub const BRIDGE_APPROVAL_EVIDENCE: &str = "bridge_approval";
