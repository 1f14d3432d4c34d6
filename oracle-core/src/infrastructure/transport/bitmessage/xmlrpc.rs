//! The slice of XML-RPC the Bitmessage API needs: string/int parameters in, one scalar out.
//!
//! Bitmessage returns structured data as a JSON document inside a single `<string>` value, so
//! no general XML-RPC value model is required.

use crate::foundation::OracleError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Param<'a> {
    Str(&'a str),
    Int(i64),
}

pub fn encode_call(method: &str, params: &[Param<'_>]) -> String {
    let mut body = String::with_capacity(128);
    body.push_str("<?xml version=\"1.0\"?><methodCall><methodName>");
    body.push_str(&escape(method));
    body.push_str("</methodName><params>");
    for param in params {
        body.push_str("<param><value>");
        match param {
            Param::Str(value) => {
                body.push_str("<string>");
                body.push_str(&escape(value));
                body.push_str("</string>");
            }
            Param::Int(value) => {
                body.push_str("<int>");
                body.push_str(&value.to_string());
                body.push_str("</int>");
            }
        }
        body.push_str("</value></param>");
    }
    body.push_str("</params></methodCall>");
    body
}

/// Extracts the scalar returned by a method response, or the fault string.
pub fn decode_response(method: &str, xml: &str) -> Result<String, OracleError> {
    if xml.contains("<fault>") {
        let detail = inner_text(xml, "string").unwrap_or_else(|| "unknown fault".to_string());
        return Err(OracleError::transport(format!("bitmessage {}", method), detail));
    }
    let params = section(xml, "params").ok_or_else(|| OracleError::transport(format!("bitmessage {}", method), "response has no params"))?;
    if let Some(text) = inner_text(params, "string") {
        return Ok(text);
    }
    for tag in ["int", "i4", "boolean"] {
        if let Some(text) = inner_text(params, tag) {
            return Ok(text);
        }
    }
    // untyped <value>text</value> is a string in XML-RPC
    inner_text(params, "value").ok_or_else(|| OracleError::transport(format!("bitmessage {}", method), "response has no value"))
}

fn section<'a>(xml: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let start = xml.find(&open)? + open.len();
    let end = xml[start..].find(&close)? + start;
    Some(&xml[start..end])
}

fn inner_text(xml: &str, tag: &str) -> Option<String> {
    let empty = format!("<{}/>", tag);
    if let (Some(empty_at), open_at) = (xml.find(&empty), xml.find(&format!("<{}>", tag))) {
        if open_at.map_or(true, |open_at| empty_at < open_at) {
            return Some(String::new());
        }
    }
    section(xml, tag).map(unescape)
}

fn escape(value: &str) -> String {
    value.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn unescape(value: &str) -> String {
    value.replace("&lt;", "<").replace("&gt;", ">").replace("&quot;", "\"").replace("&apos;", "'").replace("&#39;", "'").replace("&amp;", "&")
}
