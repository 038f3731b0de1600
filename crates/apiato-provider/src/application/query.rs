//! Query strings in the shape Apiato list endpoints expect: every value is
//! JSON text, keys come out sorted, and encoding is strict (only
//! `A-Z a-z 0-9 - _ . ~` survive unescaped).

use std::collections::BTreeMap;

use serde::Serialize;
use url::form_urlencoded;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    params: BTreeMap<String, String>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `key` with `value` rendered as JSON, so `10` stays `10` and
    /// `"title"` becomes `"title"` including the quotes.
    pub fn json<T: Serialize + ?Sized>(
        mut self,
        key: &str,
        value: &T,
    ) -> Result<Self, serde_json::Error> {
        self.params
            .insert(key.to_string(), serde_json::to_string(value)?);
        Ok(self)
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn encode(&self) -> String {
        self.params
            .iter()
            .map(|(k, v)| format!("{}={}", strict_encode(k), strict_encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

fn strict_encode(raw: &str) -> String {
    // form encoding differs from encodeURIComponent on exactly these three;
    // a literal '+' in the input is already `%2B` at this point
    form_urlencoded::byte_serialize(raw.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
        .replace('*', "%2A")
        .replace("%7E", "~")
}
