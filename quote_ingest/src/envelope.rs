//! Queue message envelopes: decoding, classification and payload extraction.
//!
//! An envelope looks like one SQS record:
//!
//! ```json
//! {
//!   "messageId": "4f1c...",
//!   "body": "{\"quoteObject\": [{\"stock_code\": \"29m\", \"quote_date\": \"2021-07-12\", ...}]}",
//!   "messageAttributes": { "QuoteType": { "stringValue": "stock", "dataType": "String" } }
//! }
//! ```
//!
//! Fields the worker does not use (`receiptHandle`, `attributes`, ...) are ignored.

use chrono::{NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{IngestError, MessageRef, Result};
use crate::{Quote, QuoteKind};

/// Message attribute carrying the quote kind tag.
pub const QUOTE_TYPE_ATTRIBUTE: &str = "QuoteType";

/// Body key holding the list of quotes.
pub const QUOTE_LIST_KEY: &str = "quoteObject";

/// One queued unit of work.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct MessageEnvelope {
    /// Position in the batch's `Records` list.
    #[serde(skip)]
    pub index: usize,
    /// Queue message id, used only for diagnostics.
    #[serde(rename = "messageId", default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    /// Serialized JSON payload.
    pub body: String,
    /// Message metadata; the kind tag lives here. Values stay raw so an
    /// attribute the worker does not read cannot fail the decode.
    #[serde(rename = "messageAttributes", default, skip_serializing_if = "Option::is_none")]
    pub message_attributes: Option<IndexMap<String, Value>>,
}

/// A typed message attribute value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct MessageAttribute {
    /// String value, present for `String` attributes.
    #[serde(rename = "stringValue", default, skip_serializing_if = "Option::is_none")]
    pub string_value: Option<String>,
    /// Declared attribute type (e.g. "String").
    #[serde(rename = "dataType", default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
}

impl MessageEnvelope {
    /// Decodes the `index`-th element of the batch's `Records` list.
    pub fn decode(index: usize, record: &Value) -> Result<Self> {
        let mut envelope = Self::deserialize(record).map_err(|e| IngestError::MalformedEnvelope {
            message: MessageRef {
                index,
                message_id: record
                    .get("messageId")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            },
            value: None,
            reason: format!("cannot decode envelope: {e}"),
        })?;
        envelope.index = index;
        Ok(envelope)
    }

    /// Position and id for error reports.
    pub fn message_ref(&self) -> MessageRef {
        MessageRef {
            index: self.index,
            message_id: self.message_id.clone(),
        }
    }

    /// Raw kind tag, if the envelope carries one.
    pub fn quote_type(&self) -> Option<&str> {
        self.message_attributes
            .as_ref()?
            .get(QUOTE_TYPE_ATTRIBUTE)?
            .get("stringValue")?
            .as_str()
    }
}

/// Determines the quote kind from envelope metadata. The body is not consulted.
pub fn classify(envelope: &MessageEnvelope) -> Result<QuoteKind> {
    let malformed = |value: Option<&str>, reason: &str| IngestError::MalformedEnvelope {
        message: envelope.message_ref(),
        value: value.map(str::to_string),
        reason: reason.to_string(),
    };

    let Some(attributes) = envelope.message_attributes.as_ref() else {
        return Err(malformed(None, "envelope has no messageAttributes"));
    };
    let Some(raw) = attributes.get(QUOTE_TYPE_ATTRIBUTE) else {
        return Err(malformed(None, "QuoteType attribute is missing"));
    };
    let attribute = MessageAttribute::deserialize(raw)
        .map_err(|e| malformed(None, &format!("QuoteType attribute is malformed: {e}")))?;
    let Some(tag) = attribute.string_value.as_deref() else {
        return Err(malformed(None, "QuoteType has no stringValue"));
    };

    QuoteKind::from_tag(tag)
        .ok_or_else(|| malformed(Some(tag), "QuoteType must be \"stock\" or \"sector\""))
}

/// Parses the body and converts every entry of `quoteObject` into a [`Quote`].
///
/// All entries are validated before any is returned, so a bad quote late in the
/// list fails the message before the sink is touched.
pub fn extract_quotes(envelope: &MessageEnvelope, kind: QuoteKind) -> Result<Vec<Quote>> {
    let payload_err = |reason: String| IngestError::MalformedPayload {
        message: envelope.message_ref(),
        kind,
        reason,
    };

    let body: Value = serde_json::from_str(&envelope.body)
        .map_err(|e| payload_err(format!("body is not valid JSON: {e}")))?;
    let entries = body
        .as_object()
        .ok_or_else(|| payload_err("body is not a JSON object".into()))?
        .get(QUOTE_LIST_KEY)
        .ok_or_else(|| payload_err(format!("unable to find {QUOTE_LIST_KEY} in payload")))?
        .as_array()
        .ok_or_else(|| payload_err(format!("{QUOTE_LIST_KEY} is not a list")))?;

    entries
        .iter()
        .enumerate()
        .map(|(position, entry)| -> Result<Quote> {
            let obj = entry
                .as_object()
                .ok_or_else(|| payload_err(format!("quote #{position} is not an object")))?;
            RawQuote { envelope, kind, position, obj }.into_quote()
        })
        .collect()
}

struct RawQuote<'a> {
    envelope: &'a MessageEnvelope,
    kind: QuoteKind,
    position: usize,
    obj: &'a Map<String, Value>,
}

impl RawQuote<'_> {
    fn into_quote(self) -> Result<Quote> {
        let entity_code = self.parse(self.kind.payload_code_field(), |v| {
            v.as_str().filter(|s| !s.is_empty()).map(str::to_string)
        })?;
        Ok(Quote {
            quote_date: self.parse("quote_date", parse_date)?,
            entity_code,
            open_price: self.parse("open", parse_price)?,
            high_price: self.parse("high", parse_price)?,
            low_price: self.parse("low", parse_price)?,
            close_price: self.parse("close", parse_price)?,
            volume: self.parse("volume", parse_volume)?,
        })
    }

    fn parse<T>(&self, field: &'static str, conv: impl Fn(&Value) -> Option<T>) -> Result<T> {
        let value = match self.obj.get(field) {
            None | Some(Value::Null) => {
                return Err(IngestError::MissingField {
                    message: self.envelope.message_ref(),
                    kind: self.kind,
                    position: self.position,
                    field,
                });
            }
            Some(v) => v,
        };
        conv(value).ok_or_else(|| IngestError::MalformedPayload {
            message: self.envelope.message_ref(),
            kind: self.kind,
            reason: format!("quote #{} has invalid {field}: {value}", self.position),
        })
    }
}

// "2021-07-12", or a full timestamp on that day ("2021-07-12T00:00:00").
fn parse_date(v: &Value) -> Option<NaiveDate> {
    let s = v.as_str()?;
    if s.len() == 10 {
        return NaiveDate::parse_from_str(s, "%Y-%m-%d").ok();
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|ts| ts.date())
}

fn parse_price(v: &Value) -> Option<f64> {
    let f = match v {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    f.is_finite().then_some(f)
}

fn parse_volume(v: &Value) -> Option<i64> {
    let n = match v {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && (0.0..i64::MAX as f64).contains(f))
                .map(|f| f as i64)
        })?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    (n >= 0).then_some(n)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn envelope(tag: Option<&str>, body: Value) -> MessageEnvelope {
        let mut record = json!({ "messageId": "m-1", "body": body.to_string() });
        if let Some(tag) = tag {
            record["messageAttributes"] =
                json!({ "QuoteType": { "stringValue": tag, "dataType": "String" } });
        }
        MessageEnvelope::decode(0, &record).expect("decode")
    }

    fn stock_body() -> Value {
        json!({ "quoteObject": [
            { "stock_code": "29m", "quote_date": "2021-07-12",
              "open": 1.1, "high": "1.3", "low": 1.0, "close": 1.2, "volume": 12000 }
        ]})
    }

    #[test]
    fn classify_reads_metadata_only() {
        assert_eq!(classify(&envelope(Some("stock"), json!({}))).unwrap(), QuoteKind::Stock);
        assert_eq!(classify(&envelope(Some("sector"), stock_body())).unwrap(), QuoteKind::Sector);
    }

    #[test]
    fn classify_rejects_unknown_tag_with_value() {
        let err = classify(&envelope(Some("equity"), stock_body())).unwrap_err();
        match err {
            IngestError::MalformedEnvelope { message, value, .. } => {
                assert_eq!(message.message_id.as_deref(), Some("m-1"));
                assert_eq!(value.as_deref(), Some("equity"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(classify(&envelope(Some("STOCK"), stock_body())).is_err());
    }

    #[test]
    fn classify_rejects_missing_metadata() {
        let no_attrs = envelope(None, stock_body());
        assert!(matches!(
            classify(&no_attrs),
            Err(IngestError::MalformedEnvelope { value: None, .. })
        ));

        let other_attr = MessageEnvelope::decode(0, &json!({
            "body": "{}",
            "messageAttributes": { "Source": { "stringValue": "stock" } }
        }))
        .unwrap();
        assert!(matches!(
            classify(&other_attr),
            Err(IngestError::MalformedEnvelope { value: None, .. })
        ));

        let no_string_value = MessageEnvelope::decode(0, &json!({
            "body": "{}",
            "messageAttributes": { "QuoteType": { "dataType": "Binary" } }
        }))
        .unwrap();
        assert!(classify(&no_string_value).is_err());

        let odd_shape = MessageEnvelope::decode(0, &json!({
            "body": "{}",
            "messageAttributes": { "QuoteType": "stock" }
        }))
        .unwrap();
        assert!(matches!(
            classify(&odd_shape),
            Err(IngestError::MalformedEnvelope { ref reason, .. }) if reason.contains("malformed")
        ));
    }

    #[test]
    fn unrelated_attributes_of_any_shape_are_ignored() {
        let env = MessageEnvelope::decode(4, &json!({
            "messageId": "m-5",
            "body": "{}",
            "messageAttributes": {
                "Other": 5,
                "Trace": ["a", "b"],
                "QuoteType": { "stringValue": "sector", "dataType": "String" }
            }
        }))
        .expect("decode");
        assert_eq!(env.index, 4);
        assert_eq!(env.quote_type(), Some("sector"));
        assert_eq!(classify(&env).unwrap(), QuoteKind::Sector);
    }

    #[test]
    fn decode_requires_a_string_body() {
        let err = MessageEnvelope::decode(2, &json!({ "messageId": "m-9", "body": 7 })).unwrap_err();
        match err {
            IngestError::MalformedEnvelope { message, .. } => {
                assert_eq!(message.index, 2);
                assert_eq!(message.message_id.as_deref(), Some("m-9"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(MessageEnvelope::decode(0, &json!({ "messageId": "m-9" })).is_err());
    }

    #[test]
    fn extract_builds_typed_quotes() {
        let quotes = extract_quotes(&envelope(Some("stock"), stock_body()), QuoteKind::Stock)
            .expect("extract");
        assert_eq!(
            quotes,
            vec![Quote {
                quote_date: NaiveDate::from_ymd_opt(2021, 7, 12).unwrap(),
                entity_code: "29m".into(),
                open_price: 1.1,
                high_price: 1.3,
                low_price: 1.0,
                close_price: 1.2,
                volume: 12000,
            }]
        );
    }

    #[test]
    fn extract_uses_the_kind_specific_code_field() {
        // a stock payload read as sector quotes lacks sector_code
        let err = extract_quotes(&envelope(Some("sector"), stock_body()), QuoteKind::Sector)
            .unwrap_err();
        assert!(matches!(
            err,
            IngestError::MissingField { field: "sector_code", position: 0, kind: QuoteKind::Sector, .. }
        ));
    }

    #[test]
    fn extract_requires_quote_object() {
        let err = extract_quotes(&envelope(Some("stock"), json!({ "quotes": [] })), QuoteKind::Stock)
            .unwrap_err();
        assert!(matches!(
            err,
            IngestError::MalformedPayload { ref reason, kind: QuoteKind::Stock, .. } if reason.contains("quoteObject")
        ));

        let mut env = envelope(Some("stock"), json!({}));
        env.body = "not json".into();
        assert!(matches!(
            extract_quotes(&env, QuoteKind::Stock),
            Err(IngestError::MalformedPayload { .. })
        ));
    }

    #[test]
    fn extract_empty_list_is_fine() {
        let quotes =
            extract_quotes(&envelope(Some("stock"), json!({ "quoteObject": [] })), QuoteKind::Stock)
                .unwrap();
        assert!(quotes.is_empty());
    }

    #[test]
    fn missing_field_reports_position() {
        let body = json!({ "quoteObject": [
            { "stock_code": "A", "quote_date": "2021-07-12", "open": 1, "high": 1, "low": 1, "close": 1, "volume": 1 },
            { "stock_code": "B", "quote_date": "2021-07-12", "open": 1, "high": 1, "low": 1, "volume": 1 }
        ]});
        let err = extract_quotes(&envelope(Some("stock"), body), QuoteKind::Stock).unwrap_err();
        assert!(matches!(err, IngestError::MissingField { field: "close", position: 1, .. }));
    }

    #[test]
    fn wrongly_typed_fields_are_malformed() {
        for (field, bad) in [
            ("quote_date", json!("12/07/2021")),
            ("quote_date", json!("2021-07-12 garbage here")),
            ("open", json!("abc")),
            ("volume", json!(-5)),
            ("volume", json!(1.5)),
            ("volume", json!(1e30)),
            ("volume", json!(u64::MAX)),
            ("volume", json!("99999999999999999999")),
            ("stock_code", json!(29)),
        ] {
            let mut q = stock_body()["quoteObject"][0].clone();
            q[field] = bad;
            let body = json!({ "quoteObject": [q] });
            let err = extract_quotes(&envelope(Some("stock"), body), QuoteKind::Stock).unwrap_err();
            assert!(
                matches!(err, IngestError::MalformedPayload { .. }),
                "{field}: {err:?}"
            );
        }
    }

    #[test]
    fn date_accepts_a_time_suffix() {
        let day = NaiveDate::from_ymd_opt(2021, 7, 12);
        assert_eq!(parse_date(&json!("2021-07-12")), day);
        assert_eq!(parse_date(&json!("2021-07-12T00:00:00")), day);
        assert_eq!(parse_date(&json!("2021-07-12 16:30:00.250")), day);
        assert_eq!(parse_date(&json!("2021-07-12x")), None);
        assert_eq!(parse_date(&json!("2021-07-12T")), None);
        assert_eq!(parse_date(&json!("2021-07-12 garbage here")), None);
        assert_eq!(parse_date(&json!("2021-7-1")), None);
    }

    #[test]
    fn volume_must_fit_the_column() {
        assert_eq!(parse_volume(&json!(150000)), Some(150000));
        assert_eq!(parse_volume(&json!(150000.0)), Some(150000));
        assert_eq!(parse_volume(&json!(i64::MAX)), Some(i64::MAX));
        assert_eq!(parse_volume(&json!(1e30)), None);
        assert_eq!(parse_volume(&json!(9.3e18)), None);
        assert_eq!(parse_volume(&json!(u64::MAX)), None);
        assert_eq!(parse_volume(&json!(-1.0)), None);
    }
}
