//! Proxy command: parse a proxy URL the way connections do.

use anyhow::{bail, Result};
use cloudlink_core::proxy::{self, ProxyDescriptor};

pub fn run_proxy(url: Option<&str>) -> Result<()> {
    let Some(url) = proxy::resolve_from_env(url) else {
        bail!("no proxy given and none of {} is set", proxy::PROXY_ENV_VARS.join(", "));
    };
    let proxy = ProxyDescriptor::parse(&url)?;
    println!("endpoint:    {}", proxy.endpoint());
    println!("credentials: {}", if proxy.has_credentials() { "yes" } else { "no" });
    Ok(())
}
