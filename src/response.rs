//! Response assembly (spec §6): an ordered `key=value` pair list,
//! `&`-joined, optionally hex-encoded.

use crate::config::Config;

/// An ordered set of response key/value pairs. Order matters to the
/// client in the sense that it must be deterministic per request (so
/// tests can assert on it), though the client itself parses by key.
#[derive(Debug, Default)]
pub struct ResponseBuilder {
    pairs: Vec<(String, String)>,
}

impl ResponseBuilder {
    pub fn new() -> Self {
        ResponseBuilder::default()
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.pairs.push((key.into(), value.into()));
        self
    }

    /// Join as `key1=value1&key2=value2&...`, then hex-encode the whole
    /// body if `config.use_hex_encoding` is set (spec §6: "each response
    /// byte written as two lowercase hex characters").
    pub fn render(&self, config: &Config) -> String {
        render_pairs(&self.pairs, config)
    }

    /// The ordered key/value pairs, for callers that want to join or
    /// hex-encode them themselves (spec §4.9's dispatcher surface).
    pub fn into_pairs(self) -> Vec<(String, String)> {
        self.pairs
    }
}

/// Join `pairs` as `key1=value1&key2=value2&...`, then hex-encode the
/// whole body if `config.use_hex_encoding` is set.
pub fn render_pairs(pairs: &[(String, String)], config: &Config) -> String {
    let body = pairs.iter().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>().join("&");

    if config.use_hex_encoding {
        hex_encode(&body)
    } else {
        body
    }
}

fn hex_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len() * 2);
    for byte in s.as_bytes() {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// The permissive Flash cross-domain policy served at `/crossdomain.xml`
/// (spec §6). MIME type `text/xml` is the transport's concern, not this
/// core's, but the body is defined here since it never varies.
pub const CROSSDOMAIN_XML: &str = r#"<?xml version="1.0"?>
<!DOCTYPE cross-domain-policy SYSTEM "http://www.adobe.com/xml/dtds/cross-domain-policy.dtd">
<cross-domain-policy>
  <allow-access-from domain="*" secure="false"/>
  <site-control permitted-cross-domain-policies="all"/>
</cross-domain-policy>
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_plain_by_default() {
        let mut r = ResponseBuilder::new();
        r.push("Result", "Success").push("PC1", "0");
        assert_eq!(r.render(&Config::default()), "Result=Success&PC1=0");
    }

    #[test]
    fn renders_hex_when_enabled() {
        let mut r = ResponseBuilder::new();
        r.push("a", "b");
        let config = Config {
            use_hex_encoding: true,
            ..Config::default()
        };
        assert_eq!(r.render(&config), "613d62");
    }
}
