//! Login handshake
//!
//! Fetches the login form, lifts the anti-forgery token, submits the
//! credentials and inspects the response. The response inspection is a pure
//! function over the markup so it can be tested against fixtures.

use crate::scrape::paginator::HistorySource;
use crate::scrape::session::{check_status, read_body, Session};
use crate::scrape::types::Credentials;
use crate::{Result, ScrapeError};
use async_trait::async_trait;
use scraper::{Html, Selector};
use tracing::instrument;
use url::Url;

/// Name of the hidden form field carrying the anti-forgery token
pub const TOKEN_FIELD: &str = "authenticity_token";

const LOGIN_PATH: &str = "/users/login";

/// Phrases in an error flash that mean the credentials were rejected
const BAD_CREDENTIAL_MARKERS: &[&str] = &[
    "password",
    "invalid",
    "incorrect",
    "couldn't find",
    "could not find",
];

/// Elements that only appear for a signed-in user
const SIGNED_IN_SELECTORS: &[&str] = &[
    "#greeting",
    "a[href$='/users/logout']",
    "form[action$='/users/logout']",
];

/// What the login response says about the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginState {
    /// A user-identifying element is present
    Confirmed,
    /// Neither an error nor a user-identifying element was found
    Ambiguous,
    /// An error message reports bad credentials
    Failed(String),
}

/// A session that went through the login handshake
///
/// `state` is never [`LoginState::Failed`]; that outcome is returned as an
/// error by [`authenticate`].
#[derive(Debug)]
pub struct AuthenticatedSession {
    session: Session,
    /// Account name used in history URLs
    username: String,
    state: LoginState,
}

impl AuthenticatedSession {
    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn state(&self) -> &LoginState {
        &self.state
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// URL of one page of the user's reading history
    ///
    /// The username is percent-encoded as a single path segment.
    pub fn history_url(&self, page: u32) -> Result<Url> {
        let mut url = self.session.base_url().clone();
        url.path_segments_mut()
            .map_err(|_| ScrapeError::UrlParse(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(["users", self.username.as_str(), "readings"]);
        url.query_pairs_mut().append_pair("page", &page.to_string());
        Ok(url)
    }

    /// Error for a history request that was bounced to the login form
    fn signed_out_error(&self, page: u32) -> ScrapeError {
        match self.state {
            LoginState::Ambiguous => {
                tracing::warn!(
                    "Unconfirmed login was rejected: history page {} asked to sign in",
                    page
                );
                ScrapeError::Authentication("Invalid username or password".to_string())
            }
            _ => {
                tracing::warn!("Session was signed out before history page {}", page);
                ScrapeError::Authentication(
                    "The archive ended the session. Please log in again.".to_string(),
                )
            }
        }
    }
}

#[async_trait]
impl HistorySource for AuthenticatedSession {
    fn base_url(&self) -> &Url {
        self.session.base_url()
    }

    #[instrument(skip(self), fields(username = %self.username))]
    async fn fetch_page(&self, page: u32) -> Result<String> {
        let url = self.history_url(page)?;
        let response = self.session.get(&url).await?;
        let final_url = response.url().clone();
        check_status(response.status(), url.as_str())?;
        let body = read_body(response, url.as_str()).await?;

        if is_login_page(&final_url, &body) {
            return Err(self.signed_out_error(page));
        }
        Ok(body)
    }
}

/// Performs the login handshake on a fresh session
///
/// # Errors
///
/// * `HttpStatus` - the login page answered 429, 403, 503 or another non-success status
/// * `Protocol` - the login form has no anti-forgery token
/// * `Authentication` - the site reported bad credentials
/// * `Transport` - the network failed underneath
///
/// An ambiguous response (no error, no signed-in marker) is logged and
/// accepted; the first history fetch reveals the real state.
#[instrument(skip(session, credentials), fields(login = %credentials.login))]
pub async fn authenticate(
    session: Session,
    credentials: &Credentials,
) -> Result<AuthenticatedSession> {
    let login_url = session.url(LOGIN_PATH)?;

    // Step 1: login form
    let response = session.get(&login_url).await?;
    check_status(response.status(), login_url.as_str())?;
    let login_page = read_body(response, login_url.as_str()).await?;

    // Step 2: anti-forgery token
    let token = extract_token(&login_page).ok_or_else(|| {
        let prefix: String = login_page.chars().take(500).collect();
        tracing::warn!("Login page has no {} field; markup starts with: {}", TOKEN_FIELD, prefix);
        ScrapeError::Protocol(format!("login form has no {} field", TOKEN_FIELD))
    })?;

    // Step 3: submit credentials; statuses below 400 are inspected rather than trusted
    let form = [
        ("user[login]", credentials.login.as_str()),
        ("user[password]", credentials.password.as_str()),
        (TOKEN_FIELD, token.as_str()),
        ("commit", "Log in"),
    ];
    let response = session.post_form(&login_url, &form).await?;
    let status = response.status();
    if status.as_u16() >= 400 {
        check_status(status, login_url.as_str())?;
    }
    let body = read_body(response, login_url.as_str()).await?;

    // Steps 4 and 5: error flash, then signed-in marker
    let state = inspect_login_response(&body, &credentials.login);
    match &state {
        LoginState::Failed(detail) => {
            tracing::debug!("Login rejected: {}", detail);
            return Err(ScrapeError::Authentication(
                "Invalid username or password".to_string(),
            ));
        }
        LoginState::Ambiguous => {
            tracing::warn!(
                "Login response has neither an error nor a signed-in marker; continuing"
            );
        }
        LoginState::Confirmed => {
            tracing::info!("Logged in");
        }
    }

    // the history lives under the account name, which may differ from an email login
    let username = signed_in_user(&body, session.base_url())
        .unwrap_or_else(|| credentials.login.clone());
    if username != credentials.login {
        tracing::debug!("History belongs to account {}", username);
    }

    Ok(AuthenticatedSession {
        session,
        username,
        state,
    })
}

/// Extracts the anti-forgery token from the login form
pub fn extract_token(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(&format!("input[name='{}']", TOKEN_FIELD)).ok()?;

    document
        .select(&selector)
        .filter_map(|input| input.value().attr("value"))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

/// Account name from the signed-in greeting, e.g. `<a href="/users/reader">Hi, reader!</a>`
pub fn signed_in_user(html: &str, base_url: &Url) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("#greeting a[href]").ok()?;

    document
        .select(&selector)
        .filter_map(|anchor| anchor.value().attr("href"))
        .filter_map(|href| base_url.join(href).ok())
        .find_map(|url| {
            let mut segments = url.path_segments()?;
            if segments.next()? != "users" {
                return None;
            }
            let name = segments.next()?;
            let valid = !name.is_empty()
                && !matches!(name, "login" | "logout")
                && name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
            valid.then(|| name.to_string())
        })
}

/// Whether a response is the login form rather than the requested page
///
/// Either the request was redirected to the login path, or the markup
/// carries a credentials form. Signed-in pages never show one.
pub fn is_login_page(final_url: &Url, html: &str) -> bool {
    if final_url.path().trim_end_matches('/').ends_with(LOGIN_PATH) {
        return true;
    }

    let document = Html::parse_document(html);
    Selector::parse("input[name='user[login]']")
        .map(|selector| document.select(&selector).next().is_some())
        .unwrap_or(false)
}

/// Classifies the markup returned by the login submission
pub fn inspect_login_response(html: &str, login: &str) -> LoginState {
    let document = Html::parse_document(html);

    if let Ok(error_selector) = Selector::parse(".error, #error") {
        for element in document.select(&error_selector) {
            let text = element
                .text()
                .collect::<String>()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ");
            let lowered = text.to_lowercase();
            if BAD_CREDENTIAL_MARKERS
                .iter()
                .any(|marker| lowered.contains(marker))
            {
                return LoginState::Failed(text);
            }
        }
    }

    let signed_in = SIGNED_IN_SELECTORS
        .iter()
        .filter_map(|css| Selector::parse(css).ok())
        .any(|selector| document.select(&selector).next().is_some());
    if signed_in {
        return LoginState::Confirmed;
    }

    // A link to the user's own profile also identifies the account
    let profile_path = format!("/users/{}", login);
    if let Ok(anchor_selector) = Selector::parse("a[href]") {
        let links_to_profile = document.select(&anchor_selector).any(|anchor| {
            anchor
                .value()
                .attr("href")
                .map(|href| href.trim_end_matches('/').ends_with(&profile_path))
                .unwrap_or(false)
        });
        if links_to_profile {
            return LoginState::Confirmed;
        }
    }

    LoginState::Ambiguous
}
