//! Options → command-line argument mapping.
//!
//! Pure and deterministic. Rules:
//! - a flag is emitted only when its option is defined (not `None`, not blank)
//! - tri-state toggles emit `--name`, `--no-name`, or nothing
//! - repeated options emit the flag once per element, in order
//! - other scalars emit `--flag value`

use core::fmt::Display;

use crate::options::JobOptions;

/// Build the argument list for the external job process.
///
/// Never fails: malformed options simply produce fewer tokens.
pub fn build_args(opts: &JobOptions) -> Vec<String> {
    let mut args = ArgList::default();

    args.repeated("--start-url", &opts.start_urls);
    args.value("--domain", opts.domain.as_deref());
    args.value("--resource-id", Some(opts.resource_id.as_str()));
    args.value("--user-id", Some(opts.user_id.as_str()));
    args.value("--vector-store-path", Some(opts.vector_store_path.as_str()));
    args.value("--collection-name", opts.collection_name.as_deref());
    args.value("--embedding-model-name", opts.embedding_model_name.as_deref());
    args.value("--mongo-uri", opts.mongo_uri.as_deref());
    args.display("--max-depth", opts.max_depth);
    args.display("--max-links-per-page", opts.max_links_per_page);
    args.value("--sitemap-url", opts.sitemap_url.as_deref());
    args.value("--job-id", Some(opts.job_id.as_str()));
    args.value("--log-level", opts.log_level.as_deref());
    args.toggle("respect-robots", opts.respect_robots);
    args.toggle("aggressive-discovery", opts.aggressive_discovery);
    args.value("--stats-output", opts.stats_output.as_deref());

    args.into_vec()
}

#[derive(Debug, Default)]
struct ArgList(Vec<String>);

impl ArgList {
    fn value(&mut self, flag: &str, value: Option<&str>) {
        if let Some(v) = value.filter(|v| !v.trim().is_empty()) {
            self.0.push(flag.to_string());
            self.0.push(v.to_string());
        }
    }

    fn display<T: Display>(&mut self, flag: &str, value: Option<T>) {
        if let Some(v) = value {
            self.0.push(flag.to_string());
            self.0.push(v.to_string());
        }
    }

    fn toggle(&mut self, name: &str, value: Option<bool>) {
        match value {
            Some(true) => self.0.push(format!("--{name}")),
            Some(false) => self.0.push(format!("--no-{name}")),
            None => {}
        }
    }

    fn repeated(&mut self, flag: &str, values: &[String]) {
        for v in values {
            self.value(flag, Some(v));
        }
    }

    fn into_vec(self) -> Vec<String> {
        self.0
    }
}
