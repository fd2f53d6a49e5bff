use std::time::Duration;

use serde::Deserialize;

/// Cross-origin access for browser frontends posting to `/generate`
///
/// The web client is usually served from a different origin than the API
/// (a Vite dev server on `http://localhost:5173`, or a static host in
/// production). An empty `[server.cors]` table allows any origin, method,
/// and header; list origins explicitly to lock the API to known frontends.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CorsConfig {
    /// Frontend origins allowed to call the API, e.g. `["http://localhost:5173"]`
    #[serde(default)]
    pub origins: AnyOrArray,
    /// Allowed request methods; the API only needs `GET` and `POST`
    #[serde(default)]
    pub methods: AnyOrArray,
    /// Allowed request headers
    #[serde(default)]
    pub headers: AnyOrArray,
    /// Let browsers send cookies; requires explicit origins, methods, and headers
    #[serde(default)]
    pub credentials: bool,
    /// How long browsers may cache a preflight answer, in seconds
    #[serde(default)]
    pub max_age: Option<u64>,
}

/// Either a wildcard "*" or explicit list of values
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AnyOrArray {
    /// Match any value
    #[default]
    Any,
    /// Explicit list
    List(Vec<String>),
}

impl<'de> Deserialize<'de> for AnyOrArray {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de;

        struct AnyOrArrayVisitor;

        impl<'de> de::Visitor<'de> for AnyOrArrayVisitor {
            type Value = AnyOrArray;

            fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                formatter.write_str("\"*\" or array of strings")
            }

            fn visit_str<E>(self, v: &str) -> Result<AnyOrArray, E>
            where
                E: de::Error,
            {
                if v == "*" {
                    Ok(AnyOrArray::Any)
                } else {
                    Ok(AnyOrArray::List(vec![v.to_string()]))
                }
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<AnyOrArray, A::Error>
            where
                A: de::SeqAccess<'de>,
            {
                let mut values = Vec::new();
                while let Some(val) = seq.next_element::<String>()? {
                    if val == "*" {
                        return Ok(AnyOrArray::Any);
                    }
                    values.push(val);
                }
                Ok(AnyOrArray::List(values))
            }
        }

        deserializer.deserialize_any(AnyOrArrayVisitor)
    }
}

impl CorsConfig {
    pub fn max_age_duration(&self) -> Option<Duration> {
        self.max_age.map(Duration::from_secs)
    }
}
