//! Portal API endpoint templates, page routes, and the login redirect.
//!
//! Authentication is delegated: logging in means navigating the browser to
//! [`login_url`]; the resulting session cookie is ambient and never managed
//! here.

/// Endpoint templates under the portal API, relative to the base URL.
pub mod endpoints {
    pub const COLLECTIONS: &str = "/dp/v1/collections";
    pub const COLLECTION: &str = "/dp/v1/collections/{id}";
    pub const CREATE_COLLECTION: &str = "/dp/v1/collections";
    pub const DATASET: &str = "/dp/v1/datasets/{id}";
    pub const LOG_IN: &str = "/dp/v1/login";
}

/// Page routes handled by the portal's router. The client only links to
/// these; rendering is someone else's problem.
pub mod routes {
    pub const HOMEPAGE: &str = "/";
    pub const MY_COLLECTIONS: &str = "/my-collections";
    pub const COLLECTION: &str = "/collection/{id}";
    pub const PRIVATE_COLLECTION: &str = "/collection/{id}/private";
}

/// Query parameters shared between the client and the portal shell.
pub mod query_parameters {
    /// Set on the post-login redirect so the shell re-opens the module the
    /// user was in when they hit the login wall.
    pub const LOGIN_MODULE_REDIRECT: &str = "login-module-redirect";
}

/// The external URL a "log in" action navigates to, carrying the redirect
/// parameter back into the module that asked for it.
pub fn login_url(api_base_url: &str) -> String {
    format!(
        "{}{}?redirect=?{}=true",
        api_base_url.trim_end_matches('/'),
        endpoints::LOG_IN,
        query_parameters::LOGIN_MODULE_REDIRECT
    )
}
