//! # Document Validator
//!
//! Scores a supporting document attached to a vault request and decides
//! whether an admin can rely on it.
//!
//! ## Pipeline
//!
//! ```text
//! base64 content
//!      │ decode            (invalid → VALIDATION_ERROR)
//!      ▼
//! bytes ── size limit ──> VALIDATION_ERROR
//!      │ SHA-256
//!      ▼
//! fingerprint ── seen on another request? ──> duplicate
//!      │ UTF-8
//!      ▼
//! text ── keyword score, red flags, name checks
//!      ▼
//! verdict
//! ```
//!
//! ## Verdict Precedence
//!
//! | Verdict | When |
//! |---------|------|
//! | `duplicate` | Same fingerprint already attached to a different request |
//! | `suspicious` | Any red-flag wording or a name mismatch |
//! | `verified` | Keyword score reaches the configured minimum |
//! | `needs_review` | Everything else, including non-text content |
//!
//! Only the fingerprint and the outcome are stored; the content itself is
//! dropped after validation.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use regex::Regex;
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use uuid::Uuid;

use super::{ServiceError, ServiceResult};
use crate::db::{DocumentKind, DocumentVerdict};
use crate::store::Store;

/// Flag raised when the content is not UTF-8 text.
pub const FLAG_NON_TEXT: &str = "non_text_content";
/// Flag raised when an expected person's name is missing.
pub const FLAG_NAME_MISMATCH: &str = "name_mismatch";
/// Flag raised for a fingerprint seen on another request.
pub const FLAG_DUPLICATE: &str = "duplicate_content";

/// A weighted phrase expected in a document of some kind.
struct KeywordPattern {
    kind: DocumentKind,
    pattern: &'static str,
    weight: u32,
}

const KEYWORD_PATTERNS: &[KeywordPattern] = &[
    // Death certificate
    KeywordPattern { kind: DocumentKind::DeathCertificate, pattern: r"death\s+certificate", weight: 3 },
    KeywordPattern { kind: DocumentKind::DeathCertificate, pattern: r"deceased|late\s+(shri|smt|mr|mrs|ms)\b", weight: 2 },
    KeywordPattern { kind: DocumentKind::DeathCertificate, pattern: r"date\s+of\s+death", weight: 2 },
    KeywordPattern { kind: DocumentKind::DeathCertificate, pattern: r"place\s+of\s+death", weight: 1 },
    KeywordPattern { kind: DocumentKind::DeathCertificate, pattern: r"cause\s+of\s+death", weight: 1 },
    KeywordPattern { kind: DocumentKind::DeathCertificate, pattern: r"registrar|registration\s+(no|number)", weight: 1 },
    // Identity proof
    KeywordPattern { kind: DocumentKind::IdentityProof, pattern: r"aadhaar|passport|permanent\s+account\s+number|voter\s+id|driving\s+licen[cs]e", weight: 3 },
    KeywordPattern { kind: DocumentKind::IdentityProof, pattern: r"date\s+of\s+birth|\bdob\b", weight: 2 },
    KeywordPattern { kind: DocumentKind::IdentityProof, pattern: r"government\s+of\s+india|republic\s+of\s+india", weight: 1 },
    KeywordPattern { kind: DocumentKind::IdentityProof, pattern: r"\baddress\b", weight: 1 },
    // Relationship proof
    KeywordPattern { kind: DocumentKind::RelationshipProof, pattern: r"marriage\s+certificate|birth\s+certificate|legal\s+heir", weight: 3 },
    KeywordPattern { kind: DocumentKind::RelationshipProof, pattern: r"(son|daughter|wife|husband|spouse)\s+of", weight: 2 },
    KeywordPattern { kind: DocumentKind::RelationshipProof, pattern: r"\b(father|mother|spouse|husband|wife)\b", weight: 1 },
    KeywordPattern { kind: DocumentKind::RelationshipProof, pattern: r"registrar|issued\s+by", weight: 1 },
];

/// Wording that marks a document as a template or not genuine.
const RED_FLAGS: &[(&str, &str)] = &[
    ("specimen", r"specimen"),
    ("sample", r"sample"),
    ("void", r"void"),
    ("for_test", r"for\s+test(ing)?"),
    ("draft", r"draft"),
    ("not_valid", r"not\s+valid"),
];

/// One document to check.
#[derive(Debug, Clone)]
pub struct DocumentInput<'a> {
    pub kind: DocumentKind,
    pub file_name: &'a str,
    /// Standard-alphabet base64.
    pub content_base64: &'a str,
    /// Name of the owner whose assets are claimed.
    pub owner_name: &'a str,
    /// Name of the nominee raising the claim.
    pub nominee_name: &'a str,
    pub vault_request_id: Uuid,
}

/// Outcome of [`DocumentValidator::validate`].
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    pub sha256: String,
    pub size_bytes: i64,
    pub score: f64,
    pub verdict: DocumentVerdict,
    pub flags: Vec<String>,
}

#[derive(Clone)]
pub struct DocumentValidator {
    store: Store,
    max_bytes: usize,
    min_score: f64,
    keywords: Vec<(Regex, DocumentKind, u32)>,
    red_flags: Vec<(Regex, &'static str)>,
}

/// Case-insensitive, word-bounded version of `pattern`.
fn compile(pattern: &str) -> Option<Regex> {
    Regex::new(&format!(r"(?i)\b(?:{})\b", pattern)).ok()
}

/// Collapse runs of whitespace and lower-case, for name matching.
fn squash(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

impl DocumentValidator {
    pub fn new(store: Store, max_bytes: usize, min_score: f64) -> Self {
        let keywords = KEYWORD_PATTERNS
            .iter()
            .filter_map(|p| compile(p.pattern).map(|re| (re, p.kind, p.weight)))
            .collect();
        let red_flags = RED_FLAGS
            .iter()
            .filter_map(|(name, pattern)| compile(pattern).map(|re| (re, *name)))
            .collect();

        Self {
            store,
            max_bytes,
            min_score,
            keywords,
            red_flags,
        }
    }

    /// Decode, fingerprint and score a document.
    ///
    /// ## Returns
    ///
    /// * `Ok(ValidationReport)` - Fingerprint, score, verdict and flags
    /// * `Err(ServiceError::Validation)` - Not base64, empty or over the size limit
    pub async fn validate(&self, input: &DocumentInput<'_>) -> ServiceResult<ValidationReport> {
        let bytes = STANDARD
            .decode(input.content_base64.trim())
            .map_err(|e| ServiceError::Validation(format!("content is not valid base64: {}", e)))?;

        if bytes.is_empty() {
            return Err(ServiceError::Validation("content is empty".to_string()));
        }
        if bytes.len() > self.max_bytes {
            return Err(ServiceError::Validation(format!(
                "Document is {} bytes; the limit is {}",
                bytes.len(),
                self.max_bytes
            )));
        }

        let sha256 = hex::encode(Sha256::digest(&bytes));
        let size_bytes = bytes.len() as i64;

        let seen_elsewhere = self
            .store
            .find_documents_by_hash(&sha256)
            .await?
            .iter()
            .any(|d| d.vault_request_id != input.vault_request_id);

        let mut report = match std::str::from_utf8(&bytes) {
            Ok(text) => self.inspect_text(input, text),
            Err(_) => ValidationReport {
                sha256: String::new(),
                size_bytes: 0,
                score: 0.0,
                verdict: DocumentVerdict::NeedsReview,
                flags: vec![FLAG_NON_TEXT.to_string()],
            },
        };
        report.sha256 = sha256;
        report.size_bytes = size_bytes;

        if seen_elsewhere {
            report.flags.push(FLAG_DUPLICATE.to_string());
            report.verdict = DocumentVerdict::Duplicate;
        }

        info!(
            "Validated {} '{}' for request {}: {} (score {:.2})",
            input.kind, input.file_name, input.vault_request_id, report.verdict, report.score
        );
        Ok(report)
    }

    /// Score text content; fingerprint fields are filled in by the caller.
    fn inspect_text(&self, input: &DocumentInput<'_>, text: &str) -> ValidationReport {
        let score = self.score(input.kind, text);

        let mut flags: Vec<String> = self
            .red_flags
            .iter()
            .filter(|(re, _)| re.is_match(text))
            .map(|(_, name)| name.to_string())
            .collect();

        let expected_name = match input.kind {
            DocumentKind::DeathCertificate => Some(input.owner_name),
            DocumentKind::IdentityProof => Some(input.nominee_name),
            DocumentKind::RelationshipProof | DocumentKind::Other => None,
        };
        if let Some(name) = expected_name {
            let name = squash(name);
            if !name.is_empty() && !squash(text).contains(&name) {
                flags.push(FLAG_NAME_MISMATCH.to_string());
            }
        }

        let verdict = if !flags.is_empty() {
            DocumentVerdict::Suspicious
        } else if input.kind != DocumentKind::Other && score >= self.min_score {
            DocumentVerdict::Verified
        } else {
            DocumentVerdict::NeedsReview
        };
        debug!("Document '{}' flags: {:?}", input.file_name, flags);

        ValidationReport {
            sha256: String::new(),
            size_bytes: 0,
            score,
            verdict,
            flags,
        }
    }

    /// Matched keyword weight over total weight for `kind`, in `0.0..=1.0`.
    fn score(&self, kind: DocumentKind, text: &str) -> f64 {
        let (matched, total) = self
            .keywords
            .iter()
            .filter(|(_, k, _)| *k == kind)
            .fold((0u32, 0u32), |(matched, total), (re, _, weight)| {
                let hit = if re.is_match(text) { *weight } else { 0 };
                (matched + hit, total + weight)
            });

        if total == 0 {
            0.0
        } else {
            f64::from(matched) / f64::from(total)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::db::DocumentRecord;

    const CERTIFICATE: &str = "GOVERNMENT OF MAHARASHTRA\n\
        DEATH CERTIFICATE\n\
        Registration No: 2024/1187\n\
        Name of deceased: Asha Kulkarni\n\
        Date of death: 02-03-2024\n\
        Place of death: Pune\n\
        Cause of death: Cardiac arrest\n\
        Issued by the Registrar of Births and Deaths";

    fn validator(store: Store) -> DocumentValidator {
        DocumentValidator::new(store, 64 * 1024, 0.6)
    }

    fn input<'a>(kind: DocumentKind, content: &'a str, request: Uuid) -> DocumentInput<'a> {
        DocumentInput {
            kind,
            file_name: "certificate.txt",
            content_base64: content,
            owner_name: "Asha Kulkarni",
            nominee_name: "Ravi Kulkarni",
            vault_request_id: request,
        }
    }

    #[actix_rt::test]
    async fn test_genuine_certificate_is_verified() {
        let v = validator(Store::memory());
        let content = STANDARD.encode(CERTIFICATE);
        let report = v
            .validate(&input(DocumentKind::DeathCertificate, &content, Uuid::new_v4()))
            .await
            .unwrap();

        assert_eq!(report.verdict, DocumentVerdict::Verified);
        assert!(report.flags.is_empty());
        assert!((report.score - 1.0).abs() < 1e-9);
        assert_eq!(report.sha256.len(), 64);
        assert_eq!(report.size_bytes, CERTIFICATE.len() as i64);
    }

    #[actix_rt::test]
    async fn test_red_flags_make_document_suspicious() {
        let v = validator(Store::memory());
        let text = format!("SPECIMEN - NOT VALID\n{}", CERTIFICATE);
        let content = STANDARD.encode(&text);
        let report = v
            .validate(&input(DocumentKind::DeathCertificate, &content, Uuid::new_v4()))
            .await
            .unwrap();

        assert_eq!(report.verdict, DocumentVerdict::Suspicious);
        assert!(report.flags.contains(&"specimen".to_string()));
        assert!(report.flags.contains(&"not_valid".to_string()));
    }

    #[actix_rt::test]
    async fn test_missing_owner_name_is_a_mismatch() {
        let v = validator(Store::memory());
        let text = CERTIFICATE.replace("Asha Kulkarni", "Someone Else");
        let content = STANDARD.encode(&text);
        let report = v
            .validate(&input(DocumentKind::DeathCertificate, &content, Uuid::new_v4()))
            .await
            .unwrap();

        assert_eq!(report.verdict, DocumentVerdict::Suspicious);
        assert_eq!(report.flags, vec![FLAG_NAME_MISMATCH.to_string()]);
    }

    #[actix_rt::test]
    async fn test_low_score_needs_review() {
        let v = validator(Store::memory());
        let content = STANDARD.encode("Letter from Asha Kulkarni about her savings.");
        let report = v
            .validate(&input(DocumentKind::DeathCertificate, &content, Uuid::new_v4()))
            .await
            .unwrap();

        assert_eq!(report.verdict, DocumentVerdict::NeedsReview);
        assert!(report.score < 0.6);
    }

    #[actix_rt::test]
    async fn test_binary_content_needs_review() {
        let v = validator(Store::memory());
        let content = STANDARD.encode([0xffu8, 0xfe, 0x00, 0x81]);
        let report = v
            .validate(&input(DocumentKind::IdentityProof, &content, Uuid::new_v4()))
            .await
            .unwrap();

        assert_eq!(report.verdict, DocumentVerdict::NeedsReview);
        assert_eq!(report.flags, vec![FLAG_NON_TEXT.to_string()]);
    }

    #[actix_rt::test]
    async fn test_reused_file_on_other_request_is_duplicate() {
        let store = Store::memory();
        let v = validator(store.clone());
        let content = STANDARD.encode(CERTIFICATE);
        let first_request = Uuid::new_v4();

        let first = v
            .validate(&input(DocumentKind::DeathCertificate, &content, first_request))
            .await
            .unwrap();
        store
            .insert_document(&DocumentRecord {
                id: Uuid::new_v4(),
                vault_request_id: first_request,
                kind: DocumentKind::DeathCertificate,
                file_name: "certificate.txt".to_string(),
                sha256: first.sha256.clone(),
                size_bytes: first.size_bytes,
                score: first.score,
                verdict: first.verdict,
                flags: first.flags.clone(),
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        let same_request = v
            .validate(&input(DocumentKind::DeathCertificate, &content, first_request))
            .await
            .unwrap();
        assert_eq!(same_request.verdict, DocumentVerdict::Verified);

        let other_request = v
            .validate(&input(DocumentKind::DeathCertificate, &content, Uuid::new_v4()))
            .await
            .unwrap();
        assert_eq!(other_request.verdict, DocumentVerdict::Duplicate);
    }

    #[actix_rt::test]
    async fn test_rejects_bad_input() {
        let v = DocumentValidator::new(Store::memory(), 16, 0.6);
        let bad = v
            .validate(&input(DocumentKind::Other, "@@not base64@@", Uuid::new_v4()))
            .await
            .unwrap_err();
        assert_eq!(bad.code(), "VALIDATION_ERROR");

        let big = STANDARD.encode([b'a'; 17]);
        let too_big = v
            .validate(&input(DocumentKind::Other, &big, Uuid::new_v4()))
            .await
            .unwrap_err();
        assert_eq!(too_big.code(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_other_kind_has_no_score() {
        let v = validator(Store::memory());
        assert_eq!(v.score(DocumentKind::Other, CERTIFICATE), 0.0);
        assert!(v.score(DocumentKind::DeathCertificate, CERTIFICATE) > 0.9);
    }
}
