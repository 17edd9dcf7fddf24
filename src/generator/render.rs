//! Turns recorded requests into documentation snippets.

use crate::domain::HttpRequest;
use anyhow::Context;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

/// Headers shown in examples, in display order. Everything else (notably
/// credentials) is left out.
const HEADERS_OF_INTEREST: [(&str, &str); 2] =
    [("accept", "Accept"), ("content-type", "Content-Type")];

/// Render a request as an HTTP/1.1 style block.
///
/// JSON bodies are re-indented; other bodies are shown verbatim.
pub fn render_request(request: &HttpRequest) -> String {
    let mut out = format!("{} {} HTTP/1.1\n", request.method, request.target());

    let host = match (request.url.host_str(), request.url.port()) {
        (Some(host), Some(port)) => format!("{}:{}", host, port),
        (Some(host), None) => host.to_string(),
        (None, _) => String::new(),
    };
    out.push_str(&format!("Host: {}\n", host));

    for (name, display) in &HEADERS_OF_INTEREST {
        if let Some(value) = request.headers.get(*name) {
            out.push_str(&format!("{}: {}\n", display, String::from_utf8_lossy(value.as_bytes())));
        }
    }

    if !request.body.is_empty() {
        out.push('\n');
        out.push_str(&render_body(&request.body));
        out.push('\n');
    }
    out
}

fn render_body(body: &[u8]) -> String {
    match serde_json::from_slice::<Value>(body) {
        Ok(value) => serde_json::to_string_pretty(&value)
            .unwrap_or_else(|_| String::from_utf8_lossy(body).into_owned()),
        Err(_) => String::from_utf8_lossy(body).into_owned(),
    }
}

/// Serialize the example mapping as a tab-indented JSON object, keys sorted.
pub fn encode_examples(examples: &BTreeMap<String, String>) -> serde_json::Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"\t");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    examples.serialize(&mut serializer)?;
    buf.push(b'\n');
    Ok(buf)
}

/// Write the examples to `output`, or to stdout when no path is given.
pub fn write_examples(
    examples: &BTreeMap<String, String>,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let data = encode_examples(examples).context("Failed to encode examples")?;
    match output {
        Some(path) => {
            let mut file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            file.write_all(&data)
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&data).context("Failed to write to stdout")?;
            stdout.flush()?;
        }
    }
    Ok(())
}
