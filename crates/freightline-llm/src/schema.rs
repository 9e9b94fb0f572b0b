//! The `analyze_freight_communication` tool schema (§6) and the parser that
//! turns a raw tool-call `Value` into a typed [`ExtractedAnalysis`].
//!
//! The LLM is forced to call this tool (§4.3), so required properties are
//! always present in a well-behaved response; this module still validates
//! rather than trusting that, since a misconfigured model or a schema drift
//! on the provider side is exactly the "schema rejection" failure mode §7
//! calls out as fatal for the message.

use std::str::FromStr;

use chrono::NaiveDate;
use serde_json::{json, Map, Value};

use freightline_core::error::SchemaError;
use freightline_core::model::{ExtractedAnalysis, PartyContact, RoutingPoint};

/// JSON Schema for the forced tool call. Kept hand-written rather than
/// derived, since the wire contract (required fields, enum closures) is a
/// spec artifact independent of how `ExtractedAnalysis` happens to be laid
/// out in Rust.
#[must_use]
pub fn tool_schema() -> Value {
    json!({
        "name": "analyze_freight_communication",
        "description": "Extract structured shipment facts from a freight-forwarding email.",
        "input_schema": {
            "type": "object",
            "properties": {
                "transport_mode": enum_prop(&["ocean", "air", "road", "rail", "multimodal", "unknown"]),
                "booking_number": nullable_string(),
                "mbl_number": nullable_string(),
                "hbl_number": nullable_string(),
                "container_numbers": string_array(),
                "mawb_number": nullable_string(),
                "hawb_number": nullable_string(),
                "work_order_number": nullable_string(),
                "pro_number": nullable_string(),
                "reference_numbers": string_array(),
                "identifier_source": enum_prop(&["subject", "body", "attachment"]),
                "document_type": enum_prop(&[
                    "booking_request", "booking_confirmation", "booking_amendment", "booking_cancellation",
                    "si_submission", "si_confirmation", "vgm_submission", "vgm_confirmation",
                    "draft_bl", "bl_confirmation", "final_bl", "sea_waybill", "telex_release",
                    "sob_confirmation", "leo_copy", "arrival_notice", "customs_clearance",
                    "customs_hold", "container_release", "delivery_order", "pod_proof_of_delivery",
                    "empty_return", "trucking_dispatch", "trucking_pod", "invoice",
                    "payment_confirmation", "credit_note", "schedule_update", "vessel_update",
                    "rollover_notice", "delay_notice", "general_correspondence", "notification",
                    "approval", "request", "escalation", "internal_notification", "unknown",
                ]),
                "from_party": enum_prop(&[
                    "ocean_carrier", "airline", "nvocc", "trucker", "warehouse", "terminal",
                    "customs_broker", "freight_broker", "shipper", "consignee", "customer",
                    "notify_party", "intoglo", "system", "unknown",
                ]),
                "por": routing_point_prop(),
                "pol": routing_point_prop(),
                "pod": routing_point_prop(),
                "pofd": routing_point_prop(),
                "vessel_name": nullable_string(),
                "voyage_number": nullable_string(),
                "flight_number": nullable_string(),
                "carrier_name": nullable_string(),
                "etd": nullable_date(),
                "atd": nullable_date(),
                "eta": nullable_date(),
                "ata": nullable_date(),
                "pickup_date": nullable_date(),
                "delivery_date": nullable_date(),
                "si_cutoff": nullable_date(),
                "vgm_cutoff": nullable_date(),
                "cargo_cutoff": nullable_date(),
                "doc_cutoff": nullable_date(),
                "last_free_day": nullable_date(),
                "empty_return_date": nullable_date(),
                "pod_delivery_date": nullable_date(),
                "action_deadline": nullable_date(),
                "container_type": nullable_string(),
                "weight": nullable_string(),
                "pieces": {"type": ["integer", "null"]},
                "commodity": nullable_string(),
                "shipper": party_contact_prop(),
                "consignee": party_contact_prop(),
                "notify": party_contact_prop(),
                "invoice_number": nullable_string(),
                "amount": {"type": ["number", "null"]},
                "currency": nullable_string(),
                "message_type": enum_prop(&["inquiry", "confirmation", "notification", "instruction", "complaint", "update", "other"]),
                "sentiment": enum_prop(&["positive", "neutral", "negative", "urgent"]),
                "summary": {"type": "string", "maxLength": 150},
                "has_action": {"type": "boolean"},
                "action_description": nullable_string(),
                "action_owner": {"type": ["string", "null"]},
                "action_priority": {"type": ["string", "null"]},
                "has_issue": {"type": "boolean"},
                "issue_type": {"type": ["string", "null"]},
                "issue_description": nullable_string(),
            },
            "required": ExtractedAnalysis::REQUIRED_FIELD_NAMES,
        },
    })
}

fn nullable_string() -> Value {
    json!({"type": ["string", "null"]})
}

fn nullable_date() -> Value {
    json!({"type": ["string", "null"], "description": "ISO-8601 date, YYYY-MM-DD"})
}

fn string_array() -> Value {
    json!({"type": "array", "items": {"type": "string"}})
}

fn enum_prop(variants: &[&str]) -> Value {
    json!({"type": "string", "enum": variants})
}

fn routing_point_prop() -> Value {
    json!({
        "type": "object",
        "properties": {
            "location": nullable_string(),
            "location_type": {"type": ["string", "null"]},
        },
    })
}

fn party_contact_prop() -> Value {
    json!({
        "type": "object",
        "properties": {
            "name": nullable_string(),
            "address": nullable_string(),
            "contact": nullable_string(),
        },
    })
}

fn missing(field: &'static str) -> SchemaError {
    SchemaError::MissingRequiredField { field }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> SchemaError {
    SchemaError::InvalidField { field, reason: reason.into() }
}

fn get_str(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).filter(|s| !s.is_empty()).map(str::to_string)
}

fn get_required_str(obj: &Map<String, Value>, key: &'static str) -> Result<String, SchemaError> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| missing(key))
}

fn get_required_bool(obj: &Map<String, Value>, key: &'static str) -> Result<bool, SchemaError> {
    obj.get(key).and_then(Value::as_bool).ok_or_else(|| missing(key))
}

fn get_required_enum<T: FromStr>(obj: &Map<String, Value>, key: &'static str) -> Result<T, SchemaError> {
    let raw = get_required_str(obj, key)?;
    raw.parse::<T>().map_err(|_| invalid(key, format!("unrecognized value '{raw}'")))
}

fn get_optional_enum<T: FromStr>(
    obj: &Map<String, Value>,
    key: &'static str,
) -> Result<Option<T>, SchemaError> {
    match get_str(obj, key) {
        Some(raw) => raw.parse::<T>().map(Some).map_err(|_| invalid(key, format!("unrecognized value '{raw}'"))),
        None => Ok(None),
    }
}

fn get_date(obj: &Map<String, Value>, key: &'static str) -> Result<Option<NaiveDate>, SchemaError> {
    match get_str(obj, key) {
        Some(raw) => NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
            .map(Some)
            .map_err(|e| invalid(key, format!("not a valid YYYY-MM-DD date: {e}"))),
        None => Ok(None),
    }
}

fn get_string_array(obj: &Map<String, Value>, key: &str) -> Vec<String> {
    obj.get(key)
        .and_then(Value::as_array)
        .map(|arr| arr.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default()
}

fn get_u32(obj: &Map<String, Value>, key: &str) -> Option<u32> {
    obj.get(key).and_then(Value::as_u64).map(|n| n as u32)
}

fn get_f64(obj: &Map<String, Value>, key: &str) -> Option<f64> {
    obj.get(key).and_then(Value::as_f64)
}

fn get_party_contact(obj: &Map<String, Value>, key: &str) -> PartyContact {
    let Some(sub) = obj.get(key).and_then(Value::as_object) else {
        return PartyContact::default();
    };
    PartyContact {
        name: get_str(sub, "name"),
        address: get_str(sub, "address"),
        contact: get_str(sub, "contact"),
    }
}

fn get_routing_point(obj: &Map<String, Value>, key: &str) -> Result<RoutingPoint, SchemaError> {
    let Some(sub) = obj.get(key).and_then(Value::as_object) else {
        return Ok(RoutingPoint::default());
    };
    Ok(RoutingPoint {
        location: get_str(sub, "location"),
        location_type: get_optional_enum(sub, "location_type")?,
    })
}

/// Parses and validates a raw tool-call input against the closed schema
/// (§6, §7 "Schema rejection"). Never repairs data — that's the
/// normalizer's job (§4.1); this only rejects structurally invalid input.
pub fn parse(value: &Value) -> Result<ExtractedAnalysis, SchemaError> {
    let obj = value
        .as_object()
        .ok_or_else(|| invalid("root", "tool input was not a JSON object"))?;

    let summary = get_required_str(obj, "summary")?;
    if summary.chars().count() > 150 {
        return Err(invalid("summary", "summary exceeds 150 characters"));
    }

    Ok(ExtractedAnalysis {
        transport_mode: get_required_enum(obj, "transport_mode")?,
        booking_number: get_str(obj, "booking_number"),
        mbl_number: get_str(obj, "mbl_number"),
        hbl_number: get_str(obj, "hbl_number"),
        container_numbers: get_string_array(obj, "container_numbers"),
        mawb_number: get_str(obj, "mawb_number"),
        hawb_number: get_str(obj, "hawb_number"),
        work_order_number: get_str(obj, "work_order_number"),
        pro_number: get_str(obj, "pro_number"),
        reference_numbers: get_string_array(obj, "reference_numbers"),
        identifier_source: get_required_enum(obj, "identifier_source")?,
        document_type: get_required_enum(obj, "document_type")?,
        from_party: get_required_enum(obj, "from_party")?,
        por: get_routing_point(obj, "por")?,
        pol: get_routing_point(obj, "pol")?,
        pod: get_routing_point(obj, "pod")?,
        pofd: get_routing_point(obj, "pofd")?,
        vessel_name: get_str(obj, "vessel_name"),
        voyage_number: get_str(obj, "voyage_number"),
        flight_number: get_str(obj, "flight_number"),
        carrier_name: get_str(obj, "carrier_name"),
        etd: get_date(obj, "etd")?,
        atd: get_date(obj, "atd")?,
        eta: get_date(obj, "eta")?,
        ata: get_date(obj, "ata")?,
        pickup_date: get_date(obj, "pickup_date")?,
        delivery_date: get_date(obj, "delivery_date")?,
        si_cutoff: get_date(obj, "si_cutoff")?,
        vgm_cutoff: get_date(obj, "vgm_cutoff")?,
        cargo_cutoff: get_date(obj, "cargo_cutoff")?,
        doc_cutoff: get_date(obj, "doc_cutoff")?,
        last_free_day: get_date(obj, "last_free_day")?,
        empty_return_date: get_date(obj, "empty_return_date")?,
        pod_delivery_date: get_date(obj, "pod_delivery_date")?,
        action_deadline: get_date(obj, "action_deadline")?,
        container_type: get_str(obj, "container_type"),
        weight: get_str(obj, "weight"),
        pieces: get_u32(obj, "pieces"),
        commodity: get_str(obj, "commodity"),
        shipper: get_party_contact(obj, "shipper"),
        consignee: get_party_contact(obj, "consignee"),
        notify: get_party_contact(obj, "notify"),
        invoice_number: get_str(obj, "invoice_number"),
        amount: get_f64(obj, "amount"),
        currency: get_str(obj, "currency"),
        message_type: get_required_enum(obj, "message_type")?,
        sentiment: get_required_enum(obj, "sentiment")?,
        summary,
        has_action: get_required_bool(obj, "has_action")?,
        action_description: get_str(obj, "action_description"),
        action_owner: get_optional_enum(obj, "action_owner")?,
        action_priority: get_optional_enum(obj, "action_priority")?,
        has_issue: get_required_bool(obj, "has_issue")?,
        issue_type: get_optional_enum(obj, "issue_type")?,
        issue_description: get_str(obj, "issue_description"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_valid() -> Value {
        json!({
            "transport_mode": "ocean",
            "identifier_source": "body",
            "document_type": "booking_confirmation",
            "from_party": "ocean_carrier",
            "message_type": "confirmation",
            "sentiment": "neutral",
            "summary": "Booking confirmed for shipment",
            "has_action": false,
            "has_issue": false,
        })
    }

    #[test]
    fn parses_minimal_valid_input() {
        let analysis = parse(&minimal_valid()).unwrap();
        assert_eq!(analysis.document_type, freightline_core::enums::DocumentType::BookingConfirmation);
        assert!(analysis.booking_number.is_none());
    }

    #[test]
    fn rejects_missing_required_field() {
        let mut input = minimal_valid();
        input.as_object_mut().unwrap().remove("summary");
        let err = parse(&input).unwrap_err();
        assert!(matches!(err, SchemaError::MissingRequiredField { field: "summary" }));
    }

    #[test]
    fn rejects_unrecognized_enum_value() {
        let mut input = minimal_valid();
        input["document_type"] = json!("made_up_type");
        let err = parse(&input).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidField { field: "document_type", .. }));
    }

    #[test]
    fn rejects_malformed_date() {
        let mut input = minimal_valid();
        input["etd"] = json!("13/40/2025");
        let err = parse(&input).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidField { field: "etd", .. }));
    }

    #[test]
    fn parses_nested_routing_point() {
        let mut input = minimal_valid();
        input["pol"] = json!({"location": "Shanghai", "location_type": "port"});
        let analysis = parse(&input).unwrap();
        assert_eq!(analysis.pol.location.as_deref(), Some("Shanghai"));
    }

    #[test]
    fn tool_schema_lists_required_fields() {
        let schema = tool_schema();
        let required = schema["input_schema"]["required"].as_array().unwrap();
        assert_eq!(required.len(), ExtractedAnalysis::REQUIRED_FIELD_NAMES.len());
    }
}
