//! Stateless JSON to XML translation for REST-fronted SOAP backends.
//!
//! Mapping rules:
//! - the document root is always [`ROOT_ELEMENT`];
//! - each object key becomes a child element wrapping its converted value;
//! - an array repeats the *enclosing* element once per entry, so
//!   `{"c":["x","y"]}` yields `<c>x</c><c>y</c>` with no per-item wrapper;
//! - scalars become text content (`null` is rendered as the text `null`).
//!
//! Output never carries an XML declaration. Field order follows input order.

use serde_json::Value;

/// Fixed wrapper element for every translated document.
pub const ROOT_ELEMENT: &str = "processCardXmlRequest";

const SOAP_ENVELOPE_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";

/// Errors produced by [`json_to_xml`] and [`json_str_to_xml`].
#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    #[error("request body is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("object key {0:?} is not a valid XML element name")]
    InvalidElementName(String),
}

/// Operation element placed inside a SOAP body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoapOperation {
    pub name: String,
    pub namespace: String,
}

/// Parses `input` as JSON and converts it.
///
/// # Errors
///
/// Returns [`TranslateError`] for malformed JSON or unusable key names.
pub fn json_str_to_xml(input: &str) -> Result<String, TranslateError> {
    let value: Value = serde_json::from_str(input)?;
    json_to_xml(&value)
}

/// Converts a JSON value into an XML document rooted at [`ROOT_ELEMENT`].
///
/// # Errors
///
/// Returns [`TranslateError::InvalidElementName`] if an object key cannot be
/// used as an element name.
pub fn json_to_xml(value: &Value) -> Result<String, TranslateError> {
    let mut out = String::new();
    out.push('<');
    out.push_str(ROOT_ELEMENT);
    out.push('>');
    write_content(&mut out, value)?;
    out.push_str("</");
    out.push_str(ROOT_ELEMENT);
    out.push('>');
    Ok(out)
}

/// Wraps an XML fragment in a SOAP 1.1 envelope.
///
/// The operation element is bound to the `gen` prefix in
/// `operation.namespace`.
#[must_use]
pub fn soap_envelope(body: &str, operation: &SoapOperation) -> String {
    format!(
        "<soapenv:Envelope xmlns:soapenv=\"{SOAP_ENVELOPE_NS}\" xmlns:gen=\"{ns}\">\
         <soapenv:Header/><soapenv:Body><gen:{name}>{body}</gen:{name}></soapenv:Body>\
         </soapenv:Envelope>",
        ns = escape_attr(&operation.namespace),
        name = operation.name,
    )
}

/// Writes the children (object) or text (scalar) of an element.
fn write_content(out: &mut String, value: &Value) -> Result<(), TranslateError> {
    match value {
        Value::Object(fields) => {
            for (key, child) in fields {
                if !is_xml_name(key) {
                    return Err(TranslateError::InvalidElementName(key.clone()));
                }
                write_element(out, key, child)?;
            }
        }
        // Arrays nested directly in arrays keep flattening into the parent.
        Value::Array(items) => {
            for item in items {
                write_content(out, item)?;
            }
        }
        scalar => escape_text(out, &scalar_text(scalar)),
    }
    Ok(())
}

fn write_element(out: &mut String, name: &str, value: &Value) -> Result<(), TranslateError> {
    if let Value::Array(items) = value {
        for item in items {
            write_element(out, name, item)?;
        }
        return Ok(());
    }

    let mut inner = String::new();
    write_content(&mut inner, value)?;
    out.push('<');
    out.push_str(name);
    if inner.is_empty() {
        out.push_str("/>");
    } else {
        out.push('>');
        out.push_str(&inner);
        out.push_str("</");
        out.push_str(name);
        out.push('>');
    }
    Ok(())
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

fn escape_text(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
}

fn escape_attr(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
}

fn is_xml_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_alphabetic() || first == '_') {
        return false;
    }
    if name.get(..3).is_some_and(|prefix| prefix.eq_ignore_ascii_case("xml")) {
        return false;
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use serde_json::json;

    use super::*;

    #[test]
    fn nested_objects_and_repeated_array_elements() {
        let xml = json_str_to_xml(r#"{"a":{"b":"1"},"c":["x","y"]}"#).unwrap();
        assert_eq!(
            xml,
            "<processCardXmlRequest><a><b>1</b></a><c>x</c><c>y</c></processCardXmlRequest>"
        );
        assert!(!xml.contains("<?xml"));
    }

    #[test]
    fn field_order_follows_input() {
        let xml = json_str_to_xml(r#"{"z":1,"a":2,"m":3}"#).unwrap();
        assert_eq!(
            xml,
            "<processCardXmlRequest><z>1</z><a>2</a><m>3</m></processCardXmlRequest>"
        );
    }

    #[test]
    fn array_of_objects_repeats_enclosing_name() {
        let xml = json_to_xml(&json!({"card": [{"pan": "1"}, {"pan": "2"}]})).unwrap();
        assert_eq!(
            xml,
            "<processCardXmlRequest><card><pan>1</pan></card><card><pan>2</pan></card></processCardXmlRequest>"
        );
    }

    #[test]
    fn scalars_render_as_text() {
        let xml = json_to_xml(&json!({"n": 42, "f": true, "z": null, "e": ""})).unwrap();
        assert_eq!(
            xml,
            "<processCardXmlRequest><n>42</n><f>true</f><z>null</z><e/></processCardXmlRequest>"
        );
    }

    #[test]
    fn text_is_escaped() {
        let xml = json_to_xml(&json!({"q": "a<b & c>d"})).unwrap();
        assert!(xml.contains("<q>a&lt;b &amp; c&gt;d</q>"));
    }

    #[test]
    fn invalid_key_is_rejected() {
        let err = json_to_xml(&json!({"1bad": "x"})).unwrap_err();
        assert!(matches!(err, TranslateError::InvalidElementName(k) if k == "1bad"));
        assert!(json_to_xml(&json!({"has space": 1})).is_err());
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(matches!(
            json_str_to_xml("{not json"),
            Err(TranslateError::InvalidJson(_))
        ));
    }

    #[test]
    fn envelope_wraps_body() {
        let op = SoapOperation {
            name: "processCardXmlRequest".to_string(),
            namespace: "http://example.com/gen".to_string(),
        };
        let env = soap_envelope("<x>1</x>", &op);
        assert!(env.starts_with("<soapenv:Envelope xmlns:soapenv=\"http://schemas.xmlsoap.org/soap/envelope/\" xmlns:gen=\"http://example.com/gen\">"));
        assert!(env.contains("<soapenv:Body><gen:processCardXmlRequest><x>1</x></gen:processCardXmlRequest></soapenv:Body>"));
        assert!(env.ends_with("</soapenv:Envelope>"));
    }

    fn arb_json() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::from),
            "[a-z0-9 <>&]{0,8}".prop_map(Value::String),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::vec(("[a-w][a-z0-9_]{0,6}", inner), 0..4)
                    .prop_map(|entries| Value::Object(entries.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn translation_is_deterministic(value in arb_json()) {
            let first = json_to_xml(&value).unwrap();
            let reparsed: Value = serde_json::from_str(&value.to_string()).unwrap();
            let second = json_to_xml(&reparsed).unwrap();
            prop_assert_eq!(&first, &second);
            prop_assert!(first.starts_with("<processCardXmlRequest>"));
            prop_assert!(!first.contains("<?xml"));
        }
    }
}
