//! Outgoing request description and query parameters.

use std::collections::BTreeMap;

/// Name of the parameter injected when cache busting is enabled.
pub const CACHE_BUSTING_PARAM: &str = "cache-busting";

pub type Headers = BTreeMap<String, String>;

/// Query parameters, either keyed or as an ordered list of pairs.
///
/// Some provider APIs repeat keys or depend on parameter order, so the
/// pair form is kept as given and never re-sorted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Params {
    Map(BTreeMap<String, String>),
    Pairs(Vec<(String, String)>),
}

impl Default for Params {
    fn default() -> Self {
        Params::Map(BTreeMap::new())
    }
}

impl Params {
    pub fn map<I, K, V>(iter: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Params::Map(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    pub fn pairs<I, K, V>(iter: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Params::Pairs(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    pub fn len(&self) -> usize {
        match self {
            Params::Map(m) => m.len(),
            Params::Pairs(p) => p.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// First value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        match self {
            Params::Map(m) => m.get(key).map(String::as_str),
            Params::Pairs(p) => p.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str()),
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Map form replaces an existing key; pair form appends.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        match self {
            Params::Map(m) => {
                m.insert(key.into(), value.into());
            }
            Params::Pairs(p) => p.push((key.into(), value.into())),
        }
    }

    pub fn iter(&self) -> Box<dyn Iterator<Item = (&str, &str)> + '_> {
        match self {
            Params::Map(m) => Box::new(m.iter().map(|(k, v)| (k.as_str(), v.as_str()))),
            Params::Pairs(p) => Box::new(p.iter().map(|(k, v)| (k.as_str(), v.as_str()))),
        }
    }

    /// Add the cache-busting parameter; for pairs it lands at the end.
    pub fn with_cache_buster(mut self, token: &str) -> Self {
        self.insert(CACHE_BUSTING_PARAM, token);
        self
    }
}

impl From<BTreeMap<String, String>> for Params {
    fn from(m: BTreeMap<String, String>) -> Self {
        Params::Map(m)
    }
}

impl From<Vec<(String, String)>> for Params {
    fn from(p: Vec<(String, String)>) -> Self {
        Params::Pairs(p)
    }
}

/// Fresh random token for the cache-busting parameter.
pub fn cache_busting_token() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// One logical call: action path, method, params, headers and optional body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub action: String,
    pub method: String,
    pub params: Params,
    pub headers: Headers,
    pub data: Option<Vec<u8>>,
}

impl Request {
    pub fn new(method: &str, action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            method: method.to_ascii_uppercase(),
            params: Params::default(),
            headers: Headers::new(),
            data: None,
        }
    }

    pub fn get(action: impl Into<String>) -> Self {
        Self::new("GET", action)
    }

    pub fn post(action: impl Into<String>) -> Self {
        Self::new("POST", action)
    }

    pub fn params(mut self, params: impl Into<Params>) -> Self {
        self.params = params.into();
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn data(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.data = Some(body.into());
        self
    }
}
