//! Page scripts.
//!
//! Every query runs as injected JavaScript so that XPath lookups behave the
//! same in the top document and inside a same-origin frame. The prelude
//! resolves the current root document and defines `locateAll(xpath)` and
//! `locate(xpath, index)` for the body.

use serde_json::Value;

const PRELUDE: &str = r#"
const __frame = FRAME;
const __root = (function () {
  if (__frame === null) { return document; }
  const host = document.evaluate(__frame, document, null,
    XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue;
  if (!host || !host.contentDocument) { throw new Error('Frame unavailable: ' + __frame); }
  return host.contentDocument;
})();
const locateAll = function (xpath) {
  const found = __root.evaluate(xpath, __root, null,
    XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null);
  const out = [];
  for (let i = 0; i < found.snapshotLength; i++) { out.push(found.snapshotItem(i)); }
  return out;
};
const locate = function (xpath, index) { return locateAll(xpath)[index] || null; };
"#;

pub const COUNT: &str = "return locateAll(args[0]).length;";

pub const TEXT: &str = r#"
const el = locate(args[0], 0);
return el ? (el.innerText || el.textContent) : null;
"#;

pub const ATTRIBUTES: &str = "return locateAll(args[0]).map(function (el) { return el.getAttribute(args[1]); });";

pub const FOCUS: &str = r#"
const el = locate(args[0], 0);
if (!el) { throw new Error('Nothing to type into at ' + args[0]); }
el.focus();
if ('value' in el) { el.value = ''; }
return null;
"#;

pub const CLICK: &str = r#"
const el = locate(args[0], args[1]);
if (!el) { throw new Error('Nothing to click at ' + args[0] + '[' + args[1] + ']'); }
el.click();
return null;
"#;

pub const FRAME_READY: &str = r#"
const el = locate(args[0], 0);
return !!(el && el.contentDocument);
"#;

/// Wraps `body` into a self-contained expression evaluating to its JSON
/// encoded result, run against `frame` or the top document.
pub fn wrap(body: &str, frame: Option<&str>, args: &[Value]) -> String {
    let frame = match frame {
        Some(xpath) => Value::from(xpath).to_string(),
        None => "null".to_string(),
    };
    let prelude = PRELUDE.replacen("FRAME", &frame, 1);
    format!(
        "JSON.stringify((function (args) {{{prelude}{body}\n}})({}))",
        Value::from(args.to_vec())
    )
}

/// Decodes what [`wrap`] made the page return.
pub fn unwrap_result(raw: Option<Value>) -> anyhow::Result<Value> {
    match raw {
        Some(Value::String(json)) => Ok(serde_json::from_str(&json)?),
        Some(other) => anyhow::bail!("Unexpected script result {other}"),
        None => Ok(Value::Null),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn args_and_frame_are_json_encoded() {
        let script = wrap(COUNT, Some("(//iframe)[1]"), &[json!("//a[@href='x']")]);
        assert!(script.starts_with("JSON.stringify((function (args) {"));
        assert!(script.contains(r#"const __frame = "(//iframe)[1]";"#));
        assert!(script.ends_with(r#"})(["//a[@href='x']"]))"#));
    }

    #[test]
    fn top_document_has_no_frame() {
        let script = wrap(TEXT, None, &[json!("//h1")]);
        assert!(script.contains("const __frame = null;"));
    }

    #[test]
    fn results_are_decoded() {
        assert_eq!(
            unwrap_result(Some(json!("[\"a\",null]"))).unwrap(),
            json!(["a", null])
        );
        assert_eq!(unwrap_result(None).unwrap(), Value::Null);
        assert!(unwrap_result(Some(json!(3))).is_err());
    }
}
