//! Chain verification: recompute hashes and check linkage end to end.
//!
//! Verification never fails; it reports every inconsistency it finds so the
//! caller can decide on remediation.

use serde::{Deserialize, Serialize};

use crate::crypto::Sha256Hash;
use crate::entry::LedgerEntry;

/// The kind of inconsistency found in a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueKind {
    /// `prevHash` does not equal the previous entry's `contentHash`.
    PrevHashMismatch,
    /// `contentHash` does not equal SHA-256 of the stored `canonical`.
    ContentHashMismatch,
    /// `seq` does not equal the entry's position.
    SeqMismatch,
}

/// A single inconsistency at a given position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainIssue {
    pub kind: IssueKind,
    pub seq: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
}

/// Outcome of walking the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainReport {
    pub ok: bool,
    pub issues: Vec<ChainIssue>,
    pub length: usize,
}

impl ChainReport {
    /// Issues of one kind.
    pub fn issues_of(&self, kind: IssueKind) -> impl Iterator<Item = &ChainIssue> {
        self.issues.iter().filter(move |i| i.kind == kind)
    }
}

fn hash_str(h: Option<&Sha256Hash>) -> String {
    h.map_or_else(|| "null".to_string(), Sha256Hash::to_hex)
}

/// Walk `entries` from index 0 and collect every inconsistency.
///
/// Linkage is checked against the *stored* content hash of the previous
/// entry, so a tampered payload produces exactly one content issue rather
/// than cascading into a link issue on its successor.
pub fn verify_chain(entries: &[LedgerEntry]) -> ChainReport {
    let mut issues = Vec::new();
    let mut prev: Option<&LedgerEntry> = None;

    for (index, entry) in entries.iter().enumerate() {
        let position = index as u64;

        if entry.seq != position {
            issues.push(ChainIssue {
                kind: IssueKind::SeqMismatch,
                seq: entry.seq,
                expected: Some(position.to_string()),
                actual: Some(entry.seq.to_string()),
            });
        }

        let recomputed = entry.recompute_hash();
        if recomputed != entry.content_hash {
            issues.push(ChainIssue {
                kind: IssueKind::ContentHashMismatch,
                seq: entry.seq,
                expected: Some(recomputed.to_hex()),
                actual: Some(entry.content_hash.to_hex()),
            });
        }

        let expected_prev = prev.map(|p| &p.content_hash);
        if entry.prev_hash.as_ref() != expected_prev {
            issues.push(ChainIssue {
                kind: IssueKind::PrevHashMismatch,
                seq: entry.seq,
                expected: Some(hash_str(expected_prev)),
                actual: Some(hash_str(entry.prev_hash.as_ref())),
            });
        }

        prev = Some(entry);
    }

    ChainReport {
        ok: issues.is_empty(),
        issues,
        length: entries.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Keypair;
    use crate::entry::now;

    fn chain(n: usize) -> Vec<LedgerEntry> {
        let keypair = Keypair::from_seed(&[0x42; 32]);
        let mut entries: Vec<LedgerEntry> = Vec::new();
        for i in 0..n {
            let canonical = format!(r#"{{"i":{i}}}"#);
            let sig = keypair.sign(canonical.as_bytes());
            let entry = LedgerEntry::next(entries.last(), canonical, sig, now());
            entries.push(entry);
        }
        entries
    }

    #[test]
    fn test_empty_chain_is_ok() {
        let report = verify_chain(&[]);
        assert!(report.ok);
        assert_eq!(report.length, 0);
    }

    #[test]
    fn test_valid_chain() {
        let entries = chain(5);
        let report = verify_chain(&entries);
        assert!(report.ok, "{:?}", report.issues);
        assert_eq!(report.length, 5);
    }

    #[test]
    fn test_tampered_canonical_reports_single_issue() {
        let mut entries = chain(3);
        entries[0].canonical = r#"{"i":99}"#.into();

        let report = verify_chain(&entries);
        assert!(!report.ok);
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].kind, IssueKind::ContentHashMismatch);
        assert_eq!(report.issues[0].seq, 0);
    }

    #[test]
    fn test_broken_link() {
        let mut entries = chain(3);
        entries[2].prev_hash = None;

        let report = verify_chain(&entries);
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].kind, IssueKind::PrevHashMismatch);
        assert_eq!(report.issues[0].seq, 2);
        assert_eq!(report.issues[0].actual.as_deref(), Some("null"));
    }

    #[test]
    fn test_genesis_with_prev_hash() {
        let mut entries = chain(1);
        entries[0].prev_hash = Some(Sha256Hash::hash(b"bogus"));
        let report = verify_chain(&entries);
        assert_eq!(report.issues_of(IssueKind::PrevHashMismatch).count(), 1);
    }

    #[test]
    fn test_rewritten_hash_breaks_successor_link() {
        // Attacker edits payload and fixes up its hash: the next link breaks.
        let mut entries = chain(3);
        entries[1].canonical = r#"{"i":"forged"}"#.into();
        entries[1].content_hash = entries[1].recompute_hash();

        let report = verify_chain(&entries);
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].kind, IssueKind::PrevHashMismatch);
        assert_eq!(report.issues[0].seq, 2);
    }

    #[test]
    fn test_seq_gap_reported() {
        let mut entries = chain(2);
        entries[1].seq = 7;
        let report = verify_chain(&entries);
        assert_eq!(report.issues_of(IssueKind::SeqMismatch).count(), 1);
    }

    #[test]
    fn test_report_wire_format() {
        let mut entries = chain(1);
        entries[0].canonical = "{}".into();
        let json = serde_json::to_value(verify_chain(&entries)).unwrap();
        assert_eq!(json["ok"], false);
        assert_eq!(json["length"], 1);
        assert_eq!(json["issues"][0]["kind"], "CONTENT_HASH_MISMATCH");
        assert_eq!(json["issues"][0]["seq"], 0);
    }
}
