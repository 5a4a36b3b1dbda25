//! Job invocation options.

use serde::{Deserialize, Deserializer};
use serde_json::Value as JsonValue;

use tenantsync_core::{JobId, ResourceId, TenantContext, UserId};

/// Fully resolved options for one external job process.
///
/// Tenant handles are copied from the [`TenantContext`]; everything else comes
/// from the caller. `None` (or an empty string) means "let the job decide".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOptions {
    /// Start URLs; the first is the primary one.
    pub start_urls: Vec<String>,
    pub sitemap_url: Option<String>,
    pub domain: Option<String>,
    pub resource_id: ResourceId,
    pub user_id: UserId,
    pub vector_store_path: String,
    pub collection_name: Option<String>,
    pub embedding_model_name: Option<String>,
    pub mongo_uri: Option<String>,
    pub max_depth: Option<u32>,
    pub max_links_per_page: Option<u32>,
    pub job_id: JobId,
    pub log_level: Option<String>,
    /// Tri-state: `None` is never forwarded.
    pub respect_robots: Option<bool>,
    /// Tri-state: `None` is never forwarded.
    pub aggressive_discovery: Option<bool>,
    pub stats_output: Option<String>,
}

impl JobOptions {
    /// Options carrying only the tenant handles and the job id.
    pub fn for_tenant(tenant: &TenantContext, job_id: JobId) -> Self {
        Self {
            start_urls: Vec::new(),
            sitemap_url: None,
            domain: None,
            resource_id: tenant.resource_id.clone(),
            user_id: tenant.user_id.clone(),
            vector_store_path: tenant.vector_store_path.clone(),
            collection_name: None,
            embedding_model_name: None,
            mongo_uri: tenant.database_uri.clone(),
            max_depth: None,
            max_links_per_page: None,
            job_id,
            log_level: None,
            respect_robots: None,
            aggressive_discovery: None,
            stats_output: None,
        }
    }

    /// Overlay caller-supplied request fields (except the database override).
    pub fn with_request(mut self, req: &RefreshRequest) -> Self {
        self.start_urls = req.start_url.clone();
        self.sitemap_url = req.sitemap_url.clone();
        self.domain = req.domain.clone();
        self.collection_name = req.collection_name.clone();
        self.embedding_model_name = req.embedding_model_name.clone();
        self.max_depth = req.max_depth;
        self.max_links_per_page = req.max_links_per_page;
        self.log_level = req.log_level.clone();
        self.respect_robots = req.respect_robots;
        self.aggressive_discovery = req.aggressive_discovery;
        self.stats_output = req.stats_output.clone();
        self
    }

    /// Replace the tenant database URI when `uri` is non-empty.
    pub fn with_database_override(mut self, uri: Option<&str>) -> Self {
        if let Some(uri) = uri.map(str::trim).filter(|u| !u.is_empty()) {
            self.mongo_uri = Some(uri.to_string());
        }
        self
    }
}

/// Caller-facing invocation input (JSON, camelCase).
///
/// Parsing is lenient: values of the wrong shape become "unset" rather than
/// rejecting the whole request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RefreshRequest {
    #[serde(deserialize_with = "de_string_or_seq")]
    pub start_url: Vec<String>,
    pub sitemap_url: Option<String>,
    pub domain: Option<String>,
    pub collection_name: Option<String>,
    pub embedding_model_name: Option<String>,
    #[serde(deserialize_with = "de_lenient_u32")]
    pub max_depth: Option<u32>,
    #[serde(deserialize_with = "de_lenient_u32")]
    pub max_links_per_page: Option<u32>,
    #[serde(deserialize_with = "de_toggle")]
    pub respect_robots: Option<bool>,
    #[serde(deserialize_with = "de_toggle")]
    pub aggressive_discovery: Option<bool>,
    pub log_level: Option<String>,
    pub stats_output: Option<String>,
    /// Per-call database override (updates only).
    pub mongo_uri: Option<String>,
}

impl RefreshRequest {
    pub fn new(start_url: impl Into<String>) -> Self {
        Self {
            start_url: vec![start_url.into()],
            ..Default::default()
        }
    }

    /// First non-empty start URL, if any.
    pub fn primary_start_url(&self) -> Option<&str> {
        self.start_url
            .iter()
            .map(|u| u.trim())
            .find(|u| !u.is_empty())
    }
}

/// Parse a tri-state toggle from its string form.
///
/// Accepts `true/false/1/0/yes/no/on/off` (case-insensitive); anything else
/// is unset.
pub fn parse_toggle(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn toggle_from_json(value: &JsonValue) -> Option<bool> {
    match value {
        JsonValue::Bool(b) => Some(*b),
        JsonValue::String(s) => parse_toggle(s),
        JsonValue::Number(n) => match n.as_i64() {
            Some(1) => Some(true),
            Some(0) => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn de_toggle<'de, D>(d: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<JsonValue>::deserialize(d)?;
    Ok(raw.as_ref().and_then(toggle_from_json))
}

fn de_lenient_u32<'de, D>(d: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<JsonValue>::deserialize(d)?;
    Ok(match raw {
        Some(JsonValue::Number(n)) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Some(JsonValue::String(s)) => s.trim().parse::<u32>().ok(),
        _ => None,
    })
}

fn de_string_or_seq<'de, D>(d: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<JsonValue>::deserialize(d)?;
    Ok(match raw {
        Some(JsonValue::String(s)) => vec![s],
        Some(JsonValue::Array(items)) => items
            .into_iter()
            .filter_map(|v| match v {
                JsonValue::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}
