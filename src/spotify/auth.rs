//! Authorization-code login and the on-disk token cache.
//!
//! The first login opens the authorisation page in a browser and asks the
//! user to paste back the URL they were redirected to. The resulting token
//! is cached so later runs only need a refresh.

use super::models::Token;
use crate::error::ServiceError;
use crate::service::Credentials;
use log::{debug, warn};
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};
use url::Url;

/// Current Unix time in seconds.
pub(crate) fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Authorisation page URL for `credentials` and `scope`.
pub fn authorize_url(accounts_base: &str, credentials: &Credentials, scope: &str) -> Result<String, ServiceError> {
    let url = Url::parse_with_params(
        &format!("{accounts_base}/authorize"),
        &[
            ("client_id", credentials.client_id.as_str()),
            ("response_type", "code"),
            ("redirect_uri", credentials.redirect_uri.as_str()),
            ("scope", scope),
            ("show_dialog", "true"),
        ],
    )
    .map_err(|e| ServiceError::Auth(format!("invalid accounts URL: {e}")))?;
    Ok(url.into())
}

/// Pull the authorisation code out of what the user pasted.
///
/// Accepts the full redirect URL or the bare code. A redirect carrying an
/// `error` parameter (user denied access) yields `None`.
pub fn extract_code(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    match Url::parse(input) {
        Ok(url) => {
            let mut code = None;
            for (key, value) in url.query_pairs() {
                match key.as_ref() {
                    "error" => return None,
                    "code" if !value.is_empty() => code = Some(value.into_owned()),
                    _ => {}
                }
            }
            code
        }
        Err(_) if !input.contains(char::is_whitespace) && !input.contains('?') => Some(input.to_string()),
        Err(_) => None,
    }
}

/// Ask the user to authorise the app and read back the code.
pub(crate) fn prompt_for_code(url: &str) -> Result<String, ServiceError> {
    println!("Opening browser for authentication - please log in and authorize the app");
    println!("If no browser opens, visit:\n  {url}");
    open_browser(url);

    print!("Paste the URL you were redirected to: ");
    io::stdout()
        .flush()
        .map_err(|e| ServiceError::Unexpected(format!("cannot write prompt: {e}")))?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|e| ServiceError::Auth(format!("cannot read the redirect URL: {e}")))?;

    extract_code(&line).ok_or_else(|| ServiceError::Auth("no authorization code in the redirect URL".to_string()))
}

/// Best effort; the URL is printed anyway.
fn open_browser(url: &str) {
    let mut command = if cfg!(target_os = "macos") {
        Command::new("open")
    } else if cfg!(target_os = "windows") {
        let mut c = Command::new("cmd");
        c.args(["/C", "start", ""]);
        c
    } else {
        Command::new("xdg-open")
    };

    let spawned = command
        .arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();
    if let Err(e) = spawned {
        debug!("Could not launch a browser: {e}");
    }
}

/// JSON file holding the last token.
#[derive(Debug, Clone)]
pub struct TokenCache {
    path: PathBuf,
}

impl TokenCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Cached token, or `None` when absent or unreadable.
    pub fn load(&self) -> Option<Token> {
        let text = fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&text) {
            Ok(token) => Some(token),
            Err(e) => {
                warn!("Ignoring unreadable token cache {}: {e}", self.path.display());
                None
            }
        }
    }

    /// Failures are logged, a missing cache only costs a new login.
    pub fn store(&self, token: &Token) {
        let result = serde_json::to_string_pretty(token)
            .map_err(io::Error::other)
            .and_then(|text| {
                if let Some(parent) = self.path.parent() {
                    fs::create_dir_all(parent)?;
                }
                write_private(&self.path, text.as_bytes())
            });
        if let Err(e) = result {
            warn!("Could not write token cache {}: {e}", self.path.display());
        }
    }

    pub fn clear(&self) {
        if self.path.exists() {
            if let Err(e) = fs::remove_file(&self.path) {
                warn!("Could not remove token cache {}: {e}", self.path.display());
            }
        }
    }
}

/// Write `contents` readable by the owner only.
#[cfg(unix)]
fn write_private(path: &Path, contents: &[u8]) -> io::Result<()> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = fs::OpenOptions::new().write(true).create(true).truncate(true).mode(0o600).open(path)?;
    // `mode` only applies on creation; tighten caches written by older versions.
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    file.write_all(contents)
}

#[cfg(not(unix))]
fn write_private(path: &Path, contents: &[u8]) -> io::Result<()> {
    fs::write(path, contents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn credentials() -> Credentials {
        Credentials {
            client_id: "my client".into(),
            client_secret: "secret".into(),
            redirect_uri: "http://127.0.0.1:8888/callback".into(),
        }
    }

    #[test]
    fn test_authorize_url_encodes_parameters() {
        let url = authorize_url("https://accounts.spotify.com", &credentials(), "a,b").unwrap();
        assert!(url.starts_with("https://accounts.spotify.com/authorize?"));
        assert!(url.contains("client_id=my+client"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("redirect_uri=http%3A%2F%2F127.0.0.1%3A8888%2Fcallback"));
        assert!(url.contains("show_dialog=true"));
    }

    #[test]
    fn test_extract_code_from_redirect() {
        assert_eq!(
            extract_code("http://127.0.0.1:8888/callback?code=AQBx-123&state=xyz\n"),
            Some("AQBx-123".to_string())
        );
    }

    #[test]
    fn test_extract_code_bare() {
        assert_eq!(extract_code("  AQBx-123  "), Some("AQBx-123".to_string()));
    }

    #[test]
    fn test_extract_code_rejects_denied_and_garbage() {
        assert_eq!(extract_code("http://127.0.0.1:8888/callback?error=access_denied"), None);
        assert_eq!(extract_code("http://127.0.0.1:8888/callback"), None);
        assert_eq!(extract_code(""), None);
        assert_eq!(extract_code("not a code"), None);
    }

    #[test]
    fn test_token_cache_round_trip_and_clear() {
        let dir = TempDir::new().unwrap();
        let cache = TokenCache::new(dir.path().join("nested").join("token.json"));
        assert!(cache.load().is_none());

        let token = Token {
            access_token: "access".into(),
            refresh_token: Some("refresh".into()),
            expires_at: 42,
            scope: "s".into(),
        };
        cache.store(&token);
        assert_eq!(cache.load(), Some(token));

        cache.clear();
        assert!(!cache.path().exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_token_cache_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("token.json");
        fs::write(&path, "{}").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        let cache = TokenCache::new(path.clone());
        cache.store(&Token {
            access_token: "access".into(),
            refresh_token: None,
            expires_at: 1,
            scope: String::new(),
        });

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert!(cache.load().is_some());
    }

    #[test]
    fn test_corrupt_cache_is_ignored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("token.json");
        fs::write(&path, "{ nope").unwrap();
        assert!(TokenCache::new(path).load().is_none());
    }
}
