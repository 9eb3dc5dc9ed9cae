//! HTML rendering of the published status.

use std::fmt::Write as _;

use crate::session::{ConnectionState, PairingArtifact, StatusSnapshot};

/// Renders the operator page for `snapshot`.
#[must_use]
pub fn render_html(snapshot: &StatusSnapshot) -> String {
    let mut body = String::new();

    match (&snapshot.state, &snapshot.artifact) {
        (ConnectionState::LoggedOut, _) => {
            body.push_str("<h2>Session logged out</h2>\n");
            body.push_str(
                "<p>Clear the session directory and restart the service to pair again.</p>\n",
            );
        }
        (_, PairingArtifact::Qr(qr)) => {
            body.push_str("<h2>Scan this QR code with WhatsApp</h2>\n");
            match &qr.image {
                Some(image) => {
                    let _ = writeln!(body, "<img src=\"{}\" alt=\"QR code\" />", escape(image));
                }
                None => {
                    let _ = writeln!(body, "<pre>{}</pre>", escape(&qr.payload));
                }
            }
            body.push_str("<p>Or use pairing code below (if available):</p>\n");
            body.push_str("<h1 style=\"color:blue\">-</h1>\n");
        }
        (_, PairingArtifact::Code(code)) => {
            body.push_str("<h2>Enter this pairing code in your WhatsApp mobile</h2>\n");
            let _ = writeln!(body, "<h1 style=\"color:blue\">{}</h1>", escape(code));
        }
        (ConnectionState::Connected, PairingArtifact::None) => {
            body.push_str("<h2>WhatsApp is connected!</h2>\n");
            body.push_str("<p>Status viewing and auto-react enabled.</p>\n");
        }
        (state, PairingArtifact::None) => {
            body.push_str("<h2>Connecting to WhatsApp...</h2>\n");
            let _ = writeln!(body, "<p>State: {}</p>", escape(&state.to_string()));
        }
    }

    format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>Status Reactor</title></head>\n\
         <body style=\"font-family:sans-serif;text-align:center\">\n{body}</body>\n</html>\n"
    )
}

/// Escapes text for HTML element and attribute content.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
