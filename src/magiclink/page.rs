//! The single HTML page, in its three states: form, success and failure.

use crate::magiclink::outcome::AuthOutcome;

const HEAD: &str = r#"<!DOCTYPE html>
<html lang="en"><head><meta charset="utf-8">
<meta name="viewport" content="width=device-width,initial-scale=1">
<title>Mideye Login</title>
<style>
  *{margin:0;padding:0;box-sizing:border-box}
  body{font-family:system-ui,-apple-system,sans-serif;display:flex;
       align-items:center;justify-content:center;min-height:100vh;
       background:#f5f7fa;color:#1a1a2e}
  .card{background:#fff;border-radius:12px;padding:2.5rem;
        box-shadow:0 4px 24px rgba(0,0,0,.08);max-width:400px;width:100%}
  h1{font-size:1.4rem;margin-bottom:.5rem}
  p.sub{color:#666;font-size:.9rem;margin-bottom:1.5rem}
  label{font-size:.85rem;font-weight:600;display:block;margin-bottom:.3rem}
  input{width:100%;padding:.7rem .9rem;border:1px solid #ddd;
        border-radius:8px;font-size:1rem;margin-bottom:1rem}
  input:focus{outline:none;border-color:#4361ee;box-shadow:0 0 0 3px rgba(67,97,238,.15)}
  button{width:100%;padding:.8rem;background:#4361ee;color:#fff;border:none;
         border-radius:8px;font-size:1rem;font-weight:600;cursor:pointer}
  button:hover{background:#3651d4}
  .result{margin-top:1.5rem;padding:1rem;border-radius:8px;font-size:.9rem}
  .result.success{background:#ecfdf5;color:#065f46;border:1px solid #a7f3d0}
  .result.failure{background:#fef2f2;color:#991b1b;border:1px solid #fca5a5}
</style></head><body><div class="card">
<h1>&#x1F510; Mideye Login</h1>
<p class="sub">Enter your phone number to authenticate.</p>
"#;

const TAIL: &str = "\n</div></body></html>\n";

const FORM: &str = r#"<form method="post">
<label for="phone">Phone number</label>
<input type="tel" id="phone" name="phone" placeholder="+46701234567" required>
<button type="submit">Send authentication</button>
</form>"#;

const SUCCESS: &str = r#"<div class="result success">&#x2705; Authentication successful</div>"#;

/// Render the page. `None` is the initial form, before any attempt.
///
/// `phone` is only used by the failure state, for the retry form.
#[must_use]
pub fn render(outcome: Option<&AuthOutcome>, phone: &str) -> String {
    let mut html = String::with_capacity(HEAD.len() + 512);
    html.push_str(HEAD);

    match outcome {
        None => html.push_str(FORM),
        Some(AuthOutcome::Accepted) => html.push_str(SUCCESS),
        Some(failure) => {
            html.push_str(r#"<div class="result failure">&#x274C; "#);
            html.push_str(&escape_html(&failure.to_string()));
            html.push_str("</div>\n");
            html.push_str(r#"<form method="post" style="margin-top:1rem">"#);
            html.push_str(r#"<input type="hidden" name="phone" value=""#);
            html.push_str(&escape_html(phone));
            html.push_str(r#"">"#);
            html.push_str(r#"<button type="submit">Try again</button></form>"#);
        }
    }

    html.push_str(TAIL);
    html
}

/// Escape the five HTML-significant characters, safe for text and quoted attributes.
#[must_use]
pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&#34;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
