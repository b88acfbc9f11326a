//! Clipboard rewriting: clear, regex replace and URL tracking-parameter removal.

use regex::{Captures, Regex};
use routines_domain::desktop::ClipboardContent;
use routines_domain::error::{HydrationError, RoutinesError};
use routines_domain::id::ActionId;
use routines_domain::routine::{
    ClipboardConfig, ClipboardOperation, DomainRule, SanitizeConfig, SanitizeMode,
};
use url::Url;

use crate::ports::Capabilities;

const URL_PATTERN: &str = r"https?://(www\.)?[-a-zA-Z0-9@:%._+~#=]{1,256}\.[a-zA-Z0-9()]{1,6}\b([-a-zA-Z0-9()@:%_+.~#?&/=]*)";

/// Parameters stripped from every URL.
const GLOBAL_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "utm_id",
    "utm_name",
    "utm_reader",
    "utm_referrer",
    "utm_social",
    "utm_social-type",
    "fbclid",
    "gclid",
    "gclsrc",
    "dclid",
    "msclkid",
    "yclid",
    "twclid",
    "ttclid",
    "igshid",
    "mc_cid",
    "mc_eid",
    "_ga",
    "_gl",
    "_hsenc",
    "_hsmi",
    "mkt_tok",
    "vero_id",
];

/// Per-site parameters. A key ending in `.` matches any host containing
/// it; other keys match the host or any of its subdomains.
const DOMAIN_PARAMS: &[(&str, &[&str])] = &[
    (
        "amazon.",
        &[
            "ref", "ref_", "tag", "pd_rd_r", "pd_rd_w", "pd_rd_wg", "pf_rd_p", "pf_rd_r", "psc",
            "crid", "sprefix", "qid", "sr",
        ],
    ),
    ("ebay.", &["_trkparms", "_trksid", "mkcid", "mkevt", "campid", "toolid"]),
    ("aliexpress.", &["spm", "scm", "pvid", "algo_pvid", "algo_exp_id"]),
    ("youtube.com", &["si", "feature", "pp"]),
    ("youtu.be", &["si", "feature"]),
    ("twitter.com", &["s", "t", "ref_src", "ref_url"]),
    ("x.com", &["s", "t"]),
    ("instagram.com", &["igsh", "img_index"]),
    ("facebook.com", &["mibextid", "sfnsn"]),
    (
        "tiktok.com",
        &["_r", "_t", "is_from_webapp", "sender_device", "share_app_id"],
    ),
    ("spotify.com", &["si", "context"]),
    ("linkedin.com", &["trk", "trackingId", "lipi", "refId"]),
    ("reddit.com", &["share_id", "rdt", "ref_source"]),
];

fn host_matches(host: &str, key: &str) -> bool {
    if key.ends_with('.') {
        host.contains(key)
    } else {
        host == key
            || host
                .strip_suffix(key)
                .is_some_and(|prefix| prefix.ends_with('.'))
    }
}

/// Removes tracking parameters from URLs found in text.
pub(super) struct Sanitizer {
    urls: Regex,
    predefined: bool,
    custom: Vec<DomainRule>,
}

impl Sanitizer {
    pub(super) fn new(config: &SanitizeConfig) -> Result<Self, regex::Error> {
        let custom = match config.mode {
            SanitizeMode::Predefined => Vec::new(),
            SanitizeMode::Merge | SanitizeMode::Custom => config.domain_rules.clone(),
        };
        Ok(Self {
            urls: Regex::new(URL_PATTERN)?,
            predefined: config.mode != SanitizeMode::Custom,
            custom,
        })
    }

    pub(super) fn sanitize(&self, text: &str) -> String {
        self.urls
            .replace_all(text, |caps: &Captures<'_>| self.clean(&caps[0]))
            .into_owned()
    }

    fn clean(&self, raw: &str) -> String {
        let Ok(mut url) = Url::parse(raw) else {
            return raw.to_string();
        };
        let Some(query) = url.query().map(str::to_string) else {
            return raw.to_string();
        };
        let host = url.host_str().unwrap_or_default().to_string();

        let mut removed = false;
        let kept: Vec<&str> = query
            .split('&')
            .filter(|pair| {
                let key = url::form_urlencoded::parse(pair.as_bytes())
                    .next()
                    .map(|(key, _)| key.into_owned())
                    .unwrap_or_default();
                let strip = self.strips(raw, &host, &key);
                removed |= strip;
                !strip
            })
            .collect();
        if !removed {
            return raw.to_string();
        }
        if kept.is_empty() {
            url.set_query(None);
        } else {
            url.set_query(Some(&kept.join("&")));
        }
        tracing::debug!(original = raw, cleaned = %url, "removed tracking parameters");
        url.to_string()
    }

    fn strips(&self, raw: &str, host: &str, key: &str) -> bool {
        if self.predefined
            && (GLOBAL_PARAMS.contains(&key)
                || DOMAIN_PARAMS
                    .iter()
                    .any(|(domain, params)| host_matches(host, domain) && params.contains(&key)))
        {
            return true;
        }
        self.custom.iter().any(|rule| {
            raw.starts_with(&rule.domain) && rule.params.iter().any(|param| param == key)
        })
    }
}

/// The compiled form of a clipboard action.
pub(super) struct ClipboardEditor {
    operation: ClipboardOperation,
    replace: Option<(Regex, String)>,
    sanitizer: Option<Sanitizer>,
}

impl ClipboardEditor {
    pub(super) fn new(id: &ActionId, config: &ClipboardConfig) -> Result<Self, HydrationError> {
        let invalid = |field: &'static str, err: regex::Error| HydrationError::InvalidValue {
            kind: "action",
            id: id.to_string(),
            field,
            reason: err.to_string(),
        };
        let replace = match (config.operation, &config.find, &config.replace) {
            (ClipboardOperation::Replace, Some(find), Some(replacement)) => Some((
                Regex::new(find).map_err(|err| invalid("find", err))?,
                replacement.clone(),
            )),
            _ => None,
        };
        let sanitizer = if config.sanitize {
            Some(Sanitizer::new(&config.sanitize_config).map_err(|err| invalid("sanitize", err))?)
        } else {
            None
        };
        Ok(Self {
            operation: config.operation,
            replace,
            sanitizer,
        })
    }

    pub(super) async fn apply<C: Capabilities>(&self, desktop: &C) -> Result<(), RoutinesError> {
        if self.operation == ClipboardOperation::Clear {
            desktop.clear_clipboard().await?;
            return Ok(());
        }
        if self.replace.is_none() && self.sanitizer.is_none() {
            return Ok(());
        }
        let ClipboardContent::Text(original) = desktop.clipboard().await? else {
            tracing::debug!("clipboard holds no text, nothing to rewrite");
            return Ok(());
        };
        let mut text = original.clone();
        if let Some((find, replacement)) = &self.replace {
            text = find.replace_all(&text, replacement.as_str()).into_owned();
        }
        if let Some(sanitizer) = &self.sanitizer {
            text = sanitizer.sanitize(&text);
        }
        if text != original {
            desktop.set_clipboard_text(&text).await?;
        }
        Ok(())
    }
}
