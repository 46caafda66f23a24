//! Request command: one request through a configured connection.

use anyhow::{anyhow, bail, Context, Result};
use cloudlink_core::config::CloudlinkConfig;
use cloudlink_core::connection::{Connection, Params, Request};
use url::Url;

#[derive(Debug, Clone, Default)]
pub struct RequestArgs {
    pub url: String,
    pub method: String,
    pub headers: Vec<String>,
    pub params: Vec<String>,
    pub data: Option<String>,
    pub proxy: Option<String>,
    pub allow_insecure: bool,
    pub cache_busting: bool,
    pub include: bool,
}

/// Where a URL splits into connection and request.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct Target {
    pub host: String,
    pub port: u16,
    pub secure: bool,
    pub action: String,
    pub params: Vec<(String, String)>,
}

pub(crate) fn split_target(raw: &str) -> Result<Target> {
    let url = Url::parse(raw).with_context(|| format!("invalid URL '{}'", raw))?;
    let secure = match url.scheme() {
        "https" => true,
        "http" => false,
        other => bail!("unsupported scheme '{}' (expected http or https)", other),
    };
    let host = url
        .host_str()
        .ok_or_else(|| anyhow!("URL '{}' has no host", raw))?
        .to_string();
    let port = url
        .port_or_known_default()
        .ok_or_else(|| anyhow!("URL '{}' has no port", raw))?;
    let params = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    Ok(Target {
        host,
        port,
        secure,
        action: url.path().to_string(),
        params,
    })
}

/// "Name: value" -> ("Name", "value").
pub(crate) fn parse_header(raw: &str) -> Result<(String, String)> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| anyhow!("header '{}' must look like 'Name: value'", raw))?;
    let name = name.trim();
    if name.is_empty() {
        bail!("header '{}' has an empty name", raw);
    }
    Ok((name.to_string(), value.trim().to_string()))
}

/// "key=value" -> ("key", "value"). A bare key gets an empty value.
pub(crate) fn parse_param(raw: &str) -> (String, String) {
    match raw.split_once('=') {
        Some((k, v)) => (k.to_string(), v.to_string()),
        None => (raw.to_string(), String::new()),
    }
}

pub fn run_request(cfg: &CloudlinkConfig, args: &RequestArgs) -> Result<()> {
    let target = split_target(&args.url)?;

    let mut conn_cfg = cfg.connection.clone();
    conn_cfg.allow_insecure |= args.allow_insecure;
    conn_cfg.cache_busting |= args.cache_busting;
    if let Some(proxy) = &args.proxy {
        conn_cfg.proxy_url = Some(proxy.clone());
    }

    let mut conn = Connection::new(&target.host, target.port, target.secure, &conn_cfg)?;

    let mut pairs = target.params;
    pairs.extend(args.params.iter().map(|p| parse_param(p)));
    let mut request = Request::new(&args.method, target.action).params(Params::Pairs(pairs));
    for raw in &args.headers {
        let (name, value) = parse_header(raw)?;
        request = request.header(name, value);
    }
    if let Some(data) = &args.data {
        request = request.data(data.as_bytes());
    }

    let response = conn.request(request)?;
    tracing::info!(url = %args.url, status = response.status, "request finished");

    if args.include {
        println!("status: {}", response.status);
        for (k, v) in &response.headers {
            println!("{}: {}", k, v);
        }
        println!();
    }
    match response.text() {
        Ok(text) => print!("{}", text),
        Err(_) => println!("<{} bytes of binary data>", response.body.len()),
    }
    if !response.is_success() {
        bail!("server answered {}", response.status);
    }
    Ok(())
}
