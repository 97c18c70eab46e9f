//! Host and path parsing into tenant lookup candidates.
//!
//! The resolver is a pure function of the request: it never touches the
//! database. It produces an ordered list of identifiers for the
//! [`TenantDirectory`](super::TenantDirectory) to try, highest precedence
//! first:
//!
//! 1. The full host, as a custom domain.
//! 2. The leftmost label, when the host is under the platform domain.
//! 3. The leading path segment, when the host is the bare platform domain.
//!
//! Reserved top-level routes and reserved subdomains are checked before any
//! candidate is produced, so `/admin` is never a store slug.

use std::collections::HashSet;

use serde::Serialize;
use shopkeep_core::IdentityField;

/// Top-level paths on the platform domain that belong to the platform.
pub const DEFAULT_RESERVED_ROUTES: &[&str] = &[
    "admin",
    "super-admin",
    "superadmin",
    "auth",
    "login",
    "logout",
    "signup",
    "register",
    "api",
    "dashboard",
    "onboarding",
    "pricing",
    "billing",
    "settings",
    "static",
    "assets",
    "health",
];

/// Subdomains of the platform domain that never name a store.
pub const DEFAULT_RESERVED_SUBDOMAINS: &[&str] =
    &["admin", "api", "app", "auth", "dashboard", "mail", "static", "status"];

const MAX_LABEL_LEN: usize = 63;

/// One identifier to look up, tagged with the field it was parsed as.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TenantKey {
    pub field: IdentityField,
    pub value: String,
}

impl TenantKey {
    #[must_use]
    pub fn custom_domain(host: impl Into<String>) -> Self {
        Self {
            field: IdentityField::CustomDomain,
            value: host.into(),
        }
    }

    #[must_use]
    pub fn subdomain(label: impl Into<String>) -> Self {
        Self {
            field: IdentityField::Subdomain,
            value: label.into(),
        }
    }

    #[must_use]
    pub fn slug(slug: impl Into<String>) -> Self {
        Self {
            field: IdentityField::Slug,
            value: slug.into(),
        }
    }

    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.value
    }
}

/// Outcome of parsing a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "candidates", rename_all = "snake_case")]
pub enum TenantRequest {
    /// A platform-level request (home page, admin, auth, ...).
    Platform,
    /// Candidates in precedence order; never empty.
    Tenant(Vec<TenantKey>),
}

impl TenantRequest {
    #[must_use]
    pub fn candidates(&self) -> &[TenantKey] {
        match self {
            Self::Platform => &[],
            Self::Tenant(keys) => keys,
        }
    }

    #[must_use]
    pub const fn is_platform(&self) -> bool {
        matches!(self, Self::Platform)
    }

    /// The highest-precedence candidate.
    #[must_use]
    pub fn primary(&self) -> Option<&TenantKey> {
        self.candidates().first()
    }
}

/// Parses request hosts and paths into [`TenantRequest`]s.
#[derive(Debug, Clone)]
pub struct DomainResolver {
    platform_domain: String,
    /// `.` + platform domain, for suffix checks.
    platform_suffix: String,
    platform_aliases: HashSet<String>,
    reserved_routes: HashSet<String>,
    reserved_subdomains: HashSet<String>,
}

impl DomainResolver {
    /// Create a resolver for `platform_domain` with the default reserved lists.
    ///
    /// `www.<platform_domain>` is always treated as the bare platform domain.
    #[must_use]
    pub fn new(platform_domain: &str) -> Self {
        let platform_domain = normalize_host(platform_domain).unwrap_or_default();
        let platform_suffix = format!(".{platform_domain}");
        let platform_aliases = HashSet::from([format!("www.{platform_domain}")]);

        Self {
            platform_domain,
            platform_suffix,
            platform_aliases,
            reserved_routes: DEFAULT_RESERVED_ROUTES
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            reserved_subdomains: DEFAULT_RESERVED_SUBDOMAINS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        }
    }

    /// Additional hosts served as the bare platform domain (e.g. `localhost`).
    #[must_use]
    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.platform_aliases
            .extend(aliases.into_iter().filter_map(|a| normalize_host(a.as_ref())));
        self
    }

    /// Replace the reserved top-level routes.
    #[must_use]
    pub fn with_reserved_routes<I, S>(mut self, routes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.reserved_routes = routes
            .into_iter()
            .map(|r| r.as_ref().trim_matches('/').to_ascii_lowercase())
            .filter(|r| !r.is_empty())
            .collect();
        self
    }

    /// Replace the reserved subdomains.
    #[must_use]
    pub fn with_reserved_subdomains<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.reserved_subdomains = labels
            .into_iter()
            .map(|l| l.as_ref().trim().to_ascii_lowercase())
            .filter(|l| !l.is_empty())
            .collect();
        self
    }

    #[must_use]
    pub fn platform_domain(&self) -> &str {
        &self.platform_domain
    }

    /// Parse a request host (as sent in the `Host` header) and path.
    #[must_use]
    pub fn resolve(&self, host: &str, path: &str) -> TenantRequest {
        let Some(host) = normalize_host(host) else {
            return TenantRequest::Platform;
        };

        if self.is_platform_host(&host) {
            return self.resolve_path(path);
        }

        if let Some(prefix) = host.strip_suffix(&self.platform_suffix) {
            let label = prefix.split('.').next().unwrap_or(prefix);
            if self.reserved_subdomains.contains(label) {
                return TenantRequest::Platform;
            }

            let mut candidates = vec![TenantKey::custom_domain(host.clone())];
            if is_valid_label(label) {
                candidates.push(TenantKey::subdomain(label));
            }
            return TenantRequest::Tenant(candidates);
        }

        TenantRequest::Tenant(vec![TenantKey::custom_domain(host)])
    }

    /// Whether a path's leading segment is a reserved platform route.
    #[must_use]
    pub fn is_reserved_route(&self, path: &str) -> bool {
        leading_segment(path).is_some_and(|s| self.reserved_routes.contains(&s))
    }

    fn is_platform_host(&self, host: &str) -> bool {
        host == self.platform_domain || self.platform_aliases.contains(host)
    }

    fn resolve_path(&self, path: &str) -> TenantRequest {
        let Some(segment) = leading_segment(path) else {
            return TenantRequest::Platform;
        };

        // Reserved routes are matched before slug extraction.
        if self.reserved_routes.contains(&segment) || !is_valid_label(&segment) {
            return TenantRequest::Platform;
        }

        TenantRequest::Tenant(vec![TenantKey::slug(segment)])
    }
}

/// Lower-case a host, dropping any port and trailing dot.
///
/// Returns `None` for empty hosts.
#[must_use]
pub fn normalize_host(host: &str) -> Option<String> {
    let host = host.trim();

    let without_port = if let Some(rest) = host.strip_prefix('[') {
        // IPv6 literal: "[::1]:3000"
        rest.split(']').next().unwrap_or(rest)
    } else {
        match host.rsplit_once(':') {
            Some((name, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => {
                name
            }
            _ => host,
        }
    };

    let normalized = without_port.trim_end_matches('.').to_ascii_lowercase();
    (!normalized.is_empty()).then_some(normalized)
}

/// The first path segment, lower-cased, ignoring query and fragment.
fn leading_segment(path: &str) -> Option<String> {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    path.split('/')
        .find(|s| !s.is_empty())
        .map(str::to_ascii_lowercase)
}

/// DNS-label style check shared by slugs and subdomains: `[a-z0-9-]{1,63}`,
/// no leading or trailing hyphen.
fn is_valid_label(label: &str) -> bool {
    !label.is_empty()
        && label.len() <= MAX_LABEL_LEN
        && !label.starts_with('-')
        && !label.ends_with('-')
        && label
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn resolver() -> DomainResolver {
        DomainResolver::new("shopkeep.in").with_aliases(["localhost"])
    }

    #[test]
    fn test_custom_domain_is_first_candidate() {
        let request = resolver().resolve("Shop.Acme.COM:443", "/products");
        assert_eq!(
            request,
            TenantRequest::Tenant(vec![TenantKey::custom_domain("shop.acme.com")])
        );
    }

    #[test]
    fn test_subdomain_follows_custom_domain() {
        let request = resolver().resolve("acme.shopkeep.in", "/");
        assert_eq!(
            request.candidates(),
            &[
                TenantKey::custom_domain("acme.shopkeep.in"),
                TenantKey::subdomain("acme"),
            ]
        );
    }

    #[test]
    fn test_leftmost_label_of_nested_subdomain() {
        let request = resolver().resolve("acme.eu.shopkeep.in", "/");
        assert_eq!(
            request.candidates().get(1),
            Some(&TenantKey::subdomain("acme"))
        );
    }

    #[test]
    fn test_bare_domain_path_slug() {
        let request = resolver().resolve("shopkeep.in", "/Acme/products?page=2");
        assert_eq!(request, TenantRequest::Tenant(vec![TenantKey::slug("acme")]));
    }

    #[test]
    fn test_www_and_aliases_are_bare_domain() {
        for host in ["www.shopkeep.in", "localhost:3000", "shopkeep.in."] {
            let request = resolver().resolve(host, "/acme");
            assert_eq!(request.primary(), Some(&TenantKey::slug("acme")), "{host}");
        }
    }

    #[test]
    fn test_bare_domain_without_path_is_platform() {
        assert!(resolver().resolve("shopkeep.in", "/").is_platform());
        assert!(resolver().resolve("shopkeep.in", "").is_platform());
        assert!(resolver().resolve("shopkeep.in", "/?ref=ad").is_platform());
    }

    #[test]
    fn test_reserved_routes_are_never_slugs() {
        let resolver = resolver();
        for path in ["/admin", "/auth/callback", "/API/checkout", "/super-admin/stores"] {
            assert!(resolver.resolve("shopkeep.in", path).is_platform(), "{path}");
            assert!(resolver.is_reserved_route(path));
        }
    }

    #[test]
    fn test_custom_reserved_routes() {
        let resolver = resolver().with_reserved_routes(["/partners/"]);
        assert!(resolver.resolve("shopkeep.in", "/partners").is_platform());
        assert_eq!(
            resolver.resolve("shopkeep.in", "/admin").primary(),
            Some(&TenantKey::slug("admin"))
        );
    }

    #[test]
    fn test_reserved_subdomains_are_platform() {
        assert!(resolver().resolve("admin.shopkeep.in", "/acme").is_platform());
        assert!(resolver().resolve("api.shopkeep.in", "/").is_platform());
    }

    #[test]
    fn test_invalid_slug_is_platform() {
        assert!(resolver().resolve("shopkeep.in", "/favicon.ico").is_platform());
        assert!(resolver().resolve("shopkeep.in", "/-acme").is_platform());
        assert!(resolver().resolve("shopkeep.in", "/acme_shop").is_platform());
    }

    #[test]
    fn test_missing_host_is_platform() {
        for host in ["", "   ", ":8080", "."] {
            assert_eq!(
                resolver().resolve(host, "/acme"),
                TenantRequest::Platform,
                "host {host:?}"
            );
        }
    }

    #[test]
    fn test_normalize_host() {
        assert_eq!(normalize_host("[::1]:8080").as_deref(), Some("::1"));
        assert_eq!(normalize_host("Example.COM.").as_deref(), Some("example.com"));
        assert_eq!(normalize_host("example.com:").as_deref(), Some("example.com:"));
        assert_eq!(normalize_host("  "), None);
    }

    proptest! {
        #[test]
        fn prop_foreign_host_resolves_to_custom_domain_first(
            label in "[a-z][a-z0-9]{0,10}",
            tld in "(com|in|co|store)",
            path in "(/[a-z0-9-]{0,12}){0,3}",
        ) {
            let host = format!("{label}.{tld}");
            prop_assume!(host != "shopkeep.in");
            let request = resolver().resolve(&host, &path);
            prop_assert_eq!(request.primary(), Some(&TenantKey::custom_domain(host)));
        }

        #[test]
        fn prop_subdomain_candidates_keep_custom_domain_precedence(
            label in "[a-z][a-z0-9-]{0,20}[a-z0-9]",
        ) {
            prop_assume!(!DEFAULT_RESERVED_SUBDOMAINS.contains(&label.as_str()));
            let host = format!("{label}.shopkeep.in");
            let request = resolver().resolve(&host, "/");
            prop_assert_eq!(
                request.candidates(),
                &[TenantKey::custom_domain(host.clone()), TenantKey::subdomain(label)][..]
            );
        }
    }
}
