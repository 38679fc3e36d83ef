//! SSR template filling.
//!
//! Templates carry `<!--ssr-*-->` placeholders and a title region between
//! `<!--START_TITLE-->` and `<!--END_TITLE-->`:
//!
//! ```ignore
//! <head><!--START_TITLE--><title>Default</title><!--END_TITLE--><!--ssr-preload-links--></head>
//! <body><div id="app"><!--ssr-app--></div><!--ssr-init-state--></body>
//! ```

use serde_json::{Map, Value};

use crate::context::RenderContextExtra;
use crate::result::SsrResult;

const TITLE_START: &str = "<!--START_TITLE-->";
const TITLE_END: &str = "<!--END_TITLE-->";

/// Placeholder comment for a camelCase key, e.g. `preloadLinks` -> `<!--ssr-preload-links-->`.
pub fn placeholder_of(key: &str) -> String {
    format!("<!--ssr-{}-->", to_kebab(key))
}

fn to_kebab(camel: &str) -> String {
    let mut out = String::with_capacity(camel.len() + 4);
    for c in camel.chars() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Serialize a JSON value for inlining into a `<script>` element.
///
/// Characters that could close the script or break the JS parser are
/// emitted as `\u` escapes.
pub fn serialize_for_script(value: &Value) -> String {
    let json = value.to_string();
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        match c {
            '<' => out.push_str("\\u003C"),
            '>' => out.push_str("\\u003E"),
            '/' => out.push_str("\\u002F"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c => out.push(c),
        }
    }
    out
}

/// Script assigning the init state on the client.
pub fn init_state_script(init_state: &Map<String, Value>) -> String {
    format!(
        "<script>try {{ window.Vise.initState = {}; }} catch (err) {{ console.error('[Vise] fail to read initState.'); }}</script>",
        serialize_for_script(&Value::Object(init_state.clone()))
    )
}

/// Replace the region between the title marks, marks included.
fn replace_title(source: &str, title: &str) -> String {
    let (Some(start), Some(end)) = (source.find(TITLE_START), source.find(TITLE_END)) else {
        return source.to_string();
    };
    if end < start {
        return source.to_string();
    }

    format!(
        "{}<title>{}</title>{}",
        &source[..start],
        title,
        &source[end + TITLE_END.len()..]
    )
}

/// Assemble the page from a renderer's template and fragments.
pub fn fill_ssr_template(ssr_result: &SsrResult, extra: &RenderContextExtra) -> String {
    let mut html = ssr_result.template.clone();

    if !extra.title.is_empty() {
        html = replace_title(&html, &extra.title);
    }

    html = html.replacen(
        &placeholder_of("initState"),
        &init_state_script(&extra.init_state),
        1,
    );

    for (key, value) in [
        ("app", &ssr_result.app),
        ("html", &ssr_result.html),
        ("template", &ssr_result.template),
        ("preloadLinks", &ssr_result.preload_links),
    ] {
        html = html.replacen(&placeholder_of(key), value, 1);
    }

    html
}
