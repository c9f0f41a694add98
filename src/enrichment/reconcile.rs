//! Field reconciliation: merge a chosen candidate into a track record.
//!
//! This is a hard policy boundary, not a UI convenience. Only the fields in
//! [`EnrichmentFields`] can ever be written, and an absent candidate value
//! never overwrites existing data. Genre in particular is user-owned and is
//! never touched here regardless of flags.
//!
//! The merge is a pure function - no I/O, no await. Cover art is merged as a
//! *source URL* decision; the orchestrator downloads the bytes afterwards and
//! attaches them with [`crate::metadata::TrackRecord::set_cover`].

use crate::enrichment::domain::{ChangedField, EnrichmentFields, ReleaseCandidate};
use crate::metadata::TrackRecord;

/// One row of the reconciliation policy: flag -> (candidate accessor,
/// track mutator). Declarative so the boundary is trivially testable.
struct FieldPolicy {
    flag: EnrichmentFields,
    field: ChangedField,
    candidate_value: fn(&ReleaseCandidate) -> Option<String>,
    current_value: fn(&TrackRecord) -> Option<String>,
    apply: fn(&mut TrackRecord, &str),
}

const POLICIES: &[FieldPolicy] = &[
    FieldPolicy {
        flag: EnrichmentFields::YEAR,
        field: ChangedField::Year,
        candidate_value: |c| c.year.map(|y| y.to_string()),
        current_value: |t| t.year.map(|y| y.to_string()),
        apply: |t, v| t.year = v.parse().ok(),
    },
    FieldPolicy {
        flag: EnrichmentFields::CATALOG,
        field: ChangedField::Catalog,
        candidate_value: |c| c.catalog_number.clone(),
        current_value: |t| {
            (!t.catalog_number.is_empty()).then(|| t.catalog_number.clone())
        },
        apply: |t, v| t.catalog_number = v.to_string(),
    },
    FieldPolicy {
        flag: EnrichmentFields::ART,
        field: ChangedField::Art,
        candidate_value: |c| c.cover_url.clone(),
        current_value: |t| t.cover_source.clone(),
        apply: |t, v| t.cover_source = Some(v.to_string()),
    },
];

/// Merge the candidate into the track for each enabled flag, returning the
/// list of fields actually changed.
///
/// A field is written only when the candidate carries a non-empty value for
/// it; a write that would not change the stored value is not reported.
/// Empty `fields` returns the track unchanged with an empty change list.
/// Sets the track's dirty flag iff at least one field changed.
pub fn merge(
    track: &mut TrackRecord,
    candidate: &ReleaseCandidate,
    fields: EnrichmentFields,
) -> Vec<ChangedField> {
    let mut changed = Vec::new();

    for policy in POLICIES {
        if !fields.contains(policy.flag) {
            continue;
        }
        let Some(value) = (policy.candidate_value)(candidate) else {
            continue;
        };
        if (policy.current_value)(track).as_deref() == Some(value.as_str()) {
            continue;
        }
        (policy.apply)(track, &value);
        changed.push(policy.field);
    }

    if !changed.is_empty() {
        track.dirty = true;
    }
    changed
}
