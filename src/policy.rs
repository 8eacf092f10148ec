//! Adult-content filter policy
//!
//! Decides per request whether adult content is filtered. Three layers, first
//! match wins:
//!
//! 1. Request parameters: `adult=1|true` (show), `adult=0|false` (filter),
//!    then `filter=off|disable` (show), `filter=on|enable` (filter)
//! 2. The user's own override, if the admin set one
//! 3. The site-wide switch
//!
//! Both config layers store "disable filter" flags, so they are negated.
//! Nothing here touches storage; callers load the admin config themselves.

use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

use crate::error::{Result, StoreError};
use crate::model::AdminConfig;

/// Read access to request query parameters
pub trait RequestParams {
    /// First value of `name`, if present
    fn param(&self, name: &str) -> Option<&str>;
}

impl<S: BuildHasher> RequestParams for HashMap<String, String, S> {
    fn param(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

impl RequestParams for BTreeMap<String, String> {
    fn param(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

impl RequestParams for [(&str, &str)] {
    fn param(&self, name: &str) -> Option<&str> {
        self.iter().find(|(k, _)| *k == name).map(|(_, v)| *v)
    }
}

impl RequestParams for [(String, String)] {
    fn param(&self, name: &str) -> Option<&str> {
        self.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }
}

/// Parse `key=value` pairs into request parameters
///
/// A pair without `=` or with an empty key is rejected. When a key repeats,
/// the first value wins.
pub fn params_from_pairs<I, S>(pairs: I) -> Result<HashMap<String, String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut params = HashMap::new();
    for pair in pairs {
        let pair = pair.as_ref();
        let Some((key, value)) = pair.split_once('=') else {
            return Err(StoreError::Config(format!("malformed parameter {:?}, expected key=value", pair)));
        };
        if key.is_empty() {
            return Err(StoreError::Config(format!("parameter {:?} has an empty name", pair)));
        }
        params.entry(key.to_string()).or_insert_with(|| value.to_string());
    }
    Ok(params)
}

/// The request-level override, if the parameters carry one
///
/// `Some(true)` means filter, `Some(false)` means show everything.
pub fn request_override<P: RequestParams + ?Sized>(params: &P) -> Option<bool> {
    match params.param("adult") {
        Some("1" | "true") => return Some(false),
        Some("0" | "false") => return Some(true),
        _ => {}
    }

    match params.param("filter") {
        Some("off" | "disable") => Some(false),
        Some("on" | "enable") => Some(true),
        _ => None,
    }
}

/// Resolve whether to filter adult content (true = filter)
pub fn resolve_adult_filter<P: RequestParams + ?Sized>(
    params: &P,
    global_disable_filter: bool,
    user_disable_filter: Option<bool>,
) -> bool {
    if let Some(filter) = request_override(params) {
        return filter;
    }

    match user_disable_filter {
        Some(disabled) => !disabled,
        None => !global_disable_filter,
    }
}

/// Resolve using both layers from a loaded admin config
///
/// Anonymous requests, and users without an entry, fall through to the
/// site-wide switch.
pub fn resolve_for_user<P: RequestParams + ?Sized>(
    params: &P,
    config: &AdminConfig,
    username: Option<&str>,
) -> bool {
    let user_disable_filter = username
        .and_then(|name| config.user_config.find(name))
        .and_then(|user| user.disable_adult_filter);

    resolve_adult_filter(params, config.site_config.disable_yellow_filter, user_disable_filter)
}
