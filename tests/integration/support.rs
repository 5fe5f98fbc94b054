//! Shared fixtures: a mock archive and canned markup

use ao3_history::config::Config;
use ao3_history::retry::Backoff;
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;
use wiremock::matchers::{body_string_contains, header_regex, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const LOGIN: &str = "reader";
pub const PASSWORD: &str = "correct horse";
pub const TOKEN: &str = "tok123";
pub const SESSION_COOKIE: &str = "_otwarchive_session=abc123";

/// Records requested delays without sleeping
#[derive(Default)]
pub struct RecordingBackoff {
    pub waits: Mutex<Vec<Duration>>,
}

#[async_trait]
impl Backoff for RecordingBackoff {
    async fn wait(&self, delay: Duration) {
        self.waits.lock().unwrap().push(delay);
    }
}

/// Config pointed at the mock server with no pacing delays
pub fn test_config(base_url: &str) -> Config {
    let mut config = Config::default();
    config.site.base_url = base_url.to_string();
    config.session.timeout_secs = 5;
    config.session.connect_timeout_secs = 2;
    config.pagination.cooldown_ms = 0;
    config.retry.login_base_delay_ms = 10;
    config.retry.pagination_base_delay_ms = 30;
    config
}

pub fn login_form(token: Option<&str>) -> String {
    let token_input = token
        .map(|t| format!(r#"<input type="hidden" name="authenticity_token" value="{}" />"#, t))
        .unwrap_or_default();
    format!(
        r#"<html><body>
        <form id="new_user" action="/users/login" method="post">
          {}
          <input type="text" name="user[login]" />
          <input type="password" name="user[password]" />
          <input type="submit" name="commit" value="Log in" />
        </form>
        </body></html>"#,
        token_input
    )
}

pub fn signed_in_page() -> String {
    format!(
        r#"<html><body>
        <ul id="greeting"><li><a href="/users/{0}">Hi, {0}!</a></li></ul>
        <p>Successfully logged in.</p>
        </body></html>"#,
        LOGIN
    )
}

/// One history entry: work id, title and "last visited" date text
pub struct Entry {
    pub id: u32,
    pub title: &'static str,
    pub visited: &'static str,
}

pub fn entry(id: u32, title: &'static str, visited: &'static str) -> Entry {
    Entry { id, title, visited }
}

pub fn history_page(entries: &[Entry], has_next: bool) -> String {
    let blurbs: String = entries
        .iter()
        .map(|e| {
            format!(
                r#"<li id="work_{id}" class="reading work blurb group" role="article">
                  <div class="header module">
                    <h4 class="heading">
                      <a href="/works/{id}">{title}</a> by
                      <a rel="author" href="/users/writer{id}/pseuds/writer{id}">writer{id}</a>
                    </h4>
                    <h5 class="fandoms heading"><a class="tag" href="/tags/F/works">Fandom F</a></h5>
                  </div>
                  <ul class="tags commas">
                    <li class="relationships"><a class="tag">A/B</a></li>
                    <li class="freeforms"><a class="tag">Fluff</a></li>
                  </ul>
                  <dl class="stats"><dt class="words">Words:</dt><dd class="words">{words}</dd></dl>
                  <div class="user module group">
                    <h4 class="viewed heading"><span>Last visited:</span> {visited} Visited once</h4>
                  </div>
                </li>"#,
                id = e.id,
                title = e.title,
                words = e.id * 100,
                visited = e.visited
            )
        })
        .collect();

    let next = if has_next {
        r#"<ol class="pagination actions"><li class="next"><a rel="next" href="?page=next">Next →</a></li></ol>"#
    } else {
        r#"<ol class="pagination actions"><li class="next"><span class="disabled">Next →</span></li></ol>"#
    };

    format!(
        r#"<html><body><ol class="reading work index group">{}</ol>{}</body></html>"#,
        blurbs, next
    )
}

/// Mounts a working login handshake that sets the session cookie
pub async fn mount_login(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/users/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", format!("{}; path=/", SESSION_COOKIE).as_str())
                .set_body_string(login_form(Some(TOKEN))),
        )
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/users/login"))
        .and(body_string_contains(format!("authenticity_token={}", TOKEN).as_str()))
        .and(body_string_contains("user%5Blogin%5D=reader"))
        .respond_with(ResponseTemplate::new(200).set_body_string(signed_in_page()))
        .mount(server)
        .await;
}

/// Mounts one history page; requests must carry the session cookie
pub async fn mount_history_page(server: &MockServer, page: u32, body: String) {
    Mock::given(method("GET"))
        .and(path(format!("/users/{}/readings", LOGIN).as_str()))
        .and(query_param("page", page.to_string().as_str()))
        .and(header_regex("cookie", "_otwarchive_session=abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}
