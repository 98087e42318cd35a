//! Record codec: typed domain events to and from log record fields.
//!
//! A log record is a flat list of string field pairs (the shape a
//! Redis-stream-like log natively stores). The single well-known field
//! `event` holds the JSON serialization of the tagged
//! [`SupportEvent`](crate::SupportEvent). Decoding validates shape
//! strictly and never coerces: an unknown `type` tag or a missing
//! required field is a [`MalformedEvent`], not a best-effort guess.

use crate::error::MalformedEvent;
use crate::event::SupportEvent;
use crate::log::RecordFields;

/// Record field that carries the serialized event object.
pub const EVENT_FIELD: &str = "event";

/// Wire tags this codec recognizes. Kept in one place so the
/// unknown-type check cannot drift from the enum's serde renames.
const KNOWN_TYPES: [&str; 5] = [
    "support.requested",
    "assignment.assigned",
    "assignment.unassigned",
    "support.resolved",
    "support.archived",
];

/// Encode a domain event into log record fields.
///
/// Total for every known variant; the fallible signature mirrors
/// `serde_json` rather than introducing a panic path.
///
/// # Errors
///
/// Returns `serde_json::Error` if serialization fails.
pub fn encode(event: &SupportEvent) -> serde_json::Result<RecordFields> {
    let json = serde_json::to_string(event)?;
    Ok(vec![(EVENT_FIELD.to_owned(), json)])
}

/// Decode log record fields into a domain event.
///
/// # Errors
///
/// - [`MalformedEvent::MissingEventField`] if no `event` field exists.
/// - [`MalformedEvent::InvalidJson`] if the payload is not JSON.
/// - [`MalformedEvent::UnknownType`] if the `type` tag is missing or not
///   one of the known event kinds.
/// - [`MalformedEvent::InvalidShape`] if the tag is known but a required
///   field is missing or mistyped.
pub fn decode(fields: &RecordFields) -> Result<SupportEvent, MalformedEvent> {
    let raw = fields
        .iter()
        .find(|(key, _)| key == EVENT_FIELD)
        .map(|(_, value)| value)
        .ok_or(MalformedEvent::MissingEventField)?;

    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(MalformedEvent::InvalidJson)?;

    // Check the tag before attempting the typed deserialization so that
    // "unknown kind" and "known kind, bad shape" are distinct errors.
    let event_type = value
        .get("type")
        .and_then(|tag| tag.as_str())
        .ok_or_else(|| MalformedEvent::UnknownType {
            event_type: String::new(),
        })?
        .to_owned();

    if !KNOWN_TYPES.contains(&event_type.as_str()) {
        return Err(MalformedEvent::UnknownType { event_type });
    }

    serde_json::from_value(value)
        .map_err(|source| MalformedEvent::InvalidShape { event_type, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_variants() -> Vec<SupportEvent> {
        vec![
            SupportEvent::SupportRequested {
                revert_user_id: "user-1".into(),
                timestamp: 10,
            },
            SupportEvent::AssignmentAssigned {
                revert_user_id: "user-1".into(),
                supervisor_user_id: "sup-1".into(),
                assigned_by_user_id: Some("mod-1".into()),
                timestamp: 11,
            },
            SupportEvent::AssignmentAssigned {
                revert_user_id: "user-1".into(),
                supervisor_user_id: "sup-2".into(),
                assigned_by_user_id: None,
                timestamp: 12,
            },
            SupportEvent::AssignmentUnassigned {
                revert_user_id: "user-1".into(),
                timestamp: 13,
            },
            SupportEvent::SupportResolved {
                revert_user_id: "user-1".into(),
                timestamp: 14,
            },
            SupportEvent::SupportArchived {
                revert_user_id: "user-1".into(),
                timestamp: 15,
            },
        ]
    }

    #[test]
    fn round_trip_every_variant() {
        for event in all_variants() {
            let fields = encode(&event).expect("encode should succeed");
            let back = decode(&fields).expect("decode should succeed");
            assert_eq!(back, event, "round-trip changed {}", event.event_type());
        }
    }

    #[test]
    fn encoded_record_has_single_event_field() {
        let event = SupportEvent::SupportRequested {
            revert_user_id: "user-1".into(),
            timestamp: 1,
        };
        let fields = encode(&event).expect("encode should succeed");
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].0, EVENT_FIELD);
        assert!(fields[0].1.contains("support.requested"));
    }

    #[test]
    fn decode_rejects_missing_event_field() {
        let fields = vec![("payload".to_owned(), "{}".to_owned())];
        let err = decode(&fields).unwrap_err();
        assert!(matches!(err, MalformedEvent::MissingEventField));
    }

    #[test]
    fn decode_rejects_invalid_json() {
        let fields = vec![(EVENT_FIELD.to_owned(), "{not json".to_owned())];
        let err = decode(&fields).unwrap_err();
        assert!(matches!(err, MalformedEvent::InvalidJson(_)));
    }

    #[test]
    fn decode_rejects_unknown_type_tag() {
        let fields = vec![(
            EVENT_FIELD.to_owned(),
            r#"{"type":"support.exploded","revertUserId":"u","timestamp":1}"#.to_owned(),
        )];
        let err = decode(&fields).unwrap_err();
        match err {
            MalformedEvent::UnknownType { event_type } => {
                assert_eq!(event_type, "support.exploded");
            }
            other => panic!("expected UnknownType, got {other:?}"),
        }
    }

    #[test]
    fn decode_rejects_missing_type_tag() {
        let fields = vec![(
            EVENT_FIELD.to_owned(),
            r#"{"revertUserId":"u","timestamp":1}"#.to_owned(),
        )];
        let err = decode(&fields).unwrap_err();
        assert!(matches!(err, MalformedEvent::UnknownType { .. }));
    }

    #[test]
    fn decode_rejects_missing_required_field() {
        // Known tag, but no supervisorUserId.
        let fields = vec![(
            EVENT_FIELD.to_owned(),
            r#"{"type":"assignment.assigned","revertUserId":"u","timestamp":1}"#.to_owned(),
        )];
        let err = decode(&fields).unwrap_err();
        match err {
            MalformedEvent::InvalidShape { event_type, .. } => {
                assert_eq!(event_type, "assignment.assigned");
            }
            other => panic!("expected InvalidShape, got {other:?}"),
        }
    }

    #[test]
    fn decode_rejects_mistyped_field() {
        let fields = vec![(
            EVENT_FIELD.to_owned(),
            r#"{"type":"support.requested","revertUserId":"u","timestamp":"soon"}"#.to_owned(),
        )];
        let err = decode(&fields).unwrap_err();
        assert!(matches!(err, MalformedEvent::InvalidShape { .. }));
    }

    #[test]
    fn decode_ignores_extra_fields_on_the_record() {
        let event = SupportEvent::SupportResolved {
            revert_user_id: "user-1".into(),
            timestamp: 9,
        };
        let mut fields = encode(&event).expect("encode should succeed");
        fields.push(("source".to_owned(), "dashboard".to_owned()));
        let back = decode(&fields).expect("decode should tolerate extra record fields");
        assert_eq!(back, event);
    }
}
