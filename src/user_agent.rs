//! Browser-like request headers shared by page and attachment fetches.
//!
//! Every request picks one User-Agent from a small pool of current desktop
//! browsers, so consecutive fetches against the listings site do not carry an
//! identical fingerprint.

use rand::Rng;
use rand::seq::SliceRandom;

/// Desktop browser User-Agent strings rotated across requests.
pub const BROWSER_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:133.0) Gecko/20100101 Firefox/133.0",
];

/// Accept header sent with every request.
pub const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Accept-Language variants; the listings site serves French content.
const ACCEPT_LANGUAGES: &[&str] = &["fr-FR,fr;q=0.9", "fr-FR,fr;q=0.9,en;q=0.8", "fr,en-US;q=0.7"];

/// Picks a random browser User-Agent.
#[must_use]
pub fn random_browser_user_agent() -> &'static str {
    let mut rng = rand::thread_rng();
    BROWSER_USER_AGENTS
        .choose(&mut rng)
        .copied()
        .unwrap_or(BROWSER_USER_AGENTS[0])
}

/// Picks a random Accept-Language value.
#[must_use]
pub fn random_accept_language() -> &'static str {
    let index = rand::thread_rng().gen_range(0..ACCEPT_LANGUAGES.len());
    ACCEPT_LANGUAGES[index]
}
