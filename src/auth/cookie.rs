use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;
use url::Url;

use crate::config::{Environment, SameSitePolicy, SessionConfig};

/// How the SPA origin relates to this API for cookie purposes. Sites ignore
/// ports, so `localhost:3001` and `localhost:5173` count as the same site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OriginRelation {
    SameSite,
    CrossSite,
}

/// Resolved attributes for the session cookie. Computed once per response
/// from configuration alone so the policy is a pure function of deployment
/// shape, not of anything request-specific.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieAttributes {
    pub same_site: SameSite,
    pub secure: bool,
    pub domain: Option<String>,
}

pub fn origin_relation(session: &SessionConfig) -> OriginRelation {
    let api = Url::parse(&session.api_url);
    let frontend = Url::parse(&session.frontend_url);

    let (api, frontend) = match (api, frontend) {
        (Ok(a), Ok(f)) => (a, f),
        // Unparseable origins get the strictest treatment
        _ => return OriginRelation::CrossSite,
    };

    if api.scheme() != frontend.scheme() {
        return OriginRelation::CrossSite;
    }

    let same_host = match (api.host_str(), frontend.host_str()) {
        (Some(api_host), Some(frontend_host)) => match &session.cookie_domain {
            // A shared parent domain makes sibling subdomains one site
            Some(domain) => {
                let domain = domain.trim_start_matches('.');
                host_within(api_host, domain) && host_within(frontend_host, domain)
            }
            None => api_host == frontend_host,
        },
        _ => false,
    };

    if same_host {
        OriginRelation::SameSite
    } else {
        OriginRelation::CrossSite
    }
}

fn host_within(host: &str, domain: &str) -> bool {
    host == domain || host.ends_with(&format!(".{}", domain))
}

/// Computes the session cookie attributes for the current deployment.
///
/// Cross-site deployments always get `SameSite=None; Secure` or the browser
/// will drop the cookie on fetches from the SPA; the operator override is
/// only consulted when API and frontend share a site. `SameSite=None`
/// forces `Secure` in every environment because browsers reject the
/// combination otherwise.
pub fn session_cookie_attributes(
    environment: Environment,
    session: &SessionConfig,
) -> CookieAttributes {
    let same_site = match origin_relation(session) {
        OriginRelation::CrossSite => SameSite::None,
        OriginRelation::SameSite => match session.same_site_override {
            Some(SameSitePolicy::None) => SameSite::None,
            Some(SameSitePolicy::Lax) => SameSite::Lax,
            Some(SameSitePolicy::Strict) => SameSite::Strict,
            None => SameSite::Lax,
        },
    };

    let secure = match same_site {
        SameSite::None => true,
        _ => environment != Environment::Development,
    };

    CookieAttributes {
        same_site,
        secure,
        domain: session.cookie_domain.clone(),
    }
}

/// Builds the session cookie carrying a freshly minted access token.
/// HttpOnly always; lifetime matches the token's TTL.
pub fn session_cookie(
    environment: Environment,
    session: &SessionConfig,
    token: String,
    max_age_secs: i64,
) -> Cookie<'static> {
    let attrs = session_cookie_attributes(environment, session);

    let mut cookie = Cookie::new(session.cookie_name.clone(), token);
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_secure(attrs.secure);
    cookie.set_same_site(attrs.same_site);
    cookie.set_max_age(Duration::seconds(max_age_secs.max(0)));
    if let Some(domain) = attrs.domain {
        cookie.set_domain(domain);
    }

    cookie
}

/// An immediately-expiring cookie with the same attributes, used on sign-out.
/// Attributes must match the original or browsers treat it as a different
/// cookie and keep the session alive.
pub fn clear_session_cookie(environment: Environment, session: &SessionConfig) -> Cookie<'static> {
    let mut cookie = session_cookie(environment, session, String::new(), 0);
    cookie.set_max_age(Duration::ZERO);
    cookie
}
