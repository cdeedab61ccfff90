//! Turn a curl command line into the parts of an HTTP request.

use base64::Engine;

use super::command_line::{normalize_script, split_command_line, ParseCommandError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CurlParseError {
    #[error(transparent)]
    Command(#[from] ParseCommandError),
    #[error("Option `{0}` requires a value")]
    MissingValue(String),
    #[error("Header `{0}` is not of the form `Name: value`")]
    InvalidHeader(String),
    #[error("No URL given")]
    MissingUrl,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurlRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

enum CurlOption {
    Method,
    Header,
    Data,
    /// Data sent as JSON, with matching content headers.
    Json,
    User,
    Bearer,
    UserAgent,
    Cookie,
    Referer,
    Url,
    Head,
    /// Takes a value that has no effect on the request.
    IgnoredWithValue,
}

fn long_option(name: &str) -> Option<CurlOption> {
    Some(match name {
        "request" => CurlOption::Method,
        "header" => CurlOption::Header,
        "data" | "data-raw" | "data-binary" | "data-ascii" | "data-urlencode" => CurlOption::Data,
        "json" => CurlOption::Json,
        "user" => CurlOption::User,
        "oauth2-bearer" => CurlOption::Bearer,
        "user-agent" => CurlOption::UserAgent,
        "cookie" => CurlOption::Cookie,
        "referer" => CurlOption::Referer,
        "url" => CurlOption::Url,
        "head" => CurlOption::Head,
        "output" | "output-dir" | "max-time" | "connect-timeout" | "write-out" | "retry"
        | "retry-delay" | "retry-max-time" | "cookie-jar" | "cacert" | "capath" | "cert"
        | "cert-type" | "key" | "key-type" | "pass" | "ciphers" | "proxy" | "proxy-user"
        | "form" | "form-string" | "resolve" | "connect-to" | "upload-file" | "config"
        | "range" | "dump-header" | "time-cond" | "limit-rate" | "max-filesize"
        | "speed-limit" | "speed-time" | "continue-at" | "interface" | "unix-socket"
        | "trace" | "trace-ascii" | "stderr" | "variable" | "expect100-timeout" => {
            CurlOption::IgnoredWithValue
        }
        _ => return None,
    })
}

fn short_option(flag: char) -> Option<CurlOption> {
    Some(match flag {
        'X' => CurlOption::Method,
        'H' => CurlOption::Header,
        'd' => CurlOption::Data,
        'u' => CurlOption::User,
        'A' => CurlOption::UserAgent,
        'b' => CurlOption::Cookie,
        'e' => CurlOption::Referer,
        'I' => CurlOption::Head,
        'o' | 'm' | 'w' | 'c' | 'x' | 'E' | 'U' | 'F' | 'T' | 'K' | 'r' | 'D' | 'z' | 'Y'
        | 'y' | 'C' | 't' | 'Q' | 'P' => CurlOption::IgnoredWithValue,
        _ => return None,
    })
}

impl CurlOption {
    fn takes_value(&self) -> bool {
        !matches!(self, CurlOption::Head)
    }
}

#[derive(Default)]
struct RequestBuilder {
    method: Option<String>,
    head: bool,
    url: Option<String>,
    headers: Vec<(String, String)>,
    data: Vec<String>,
}

impl RequestBuilder {
    fn apply(&mut self, option: CurlOption, value: Option<String>) -> Result<(), CurlParseError> {
        let value = value.unwrap_or_default();
        match option {
            CurlOption::Method => self.method = Some(value),
            CurlOption::Header => {
                let (name, header_value) = value
                    .split_once(':')
                    .ok_or_else(|| CurlParseError::InvalidHeader(value.clone()))?;
                let name = name.trim();
                if name.is_empty() {
                    return Err(CurlParseError::InvalidHeader(value));
                }
                self.headers
                    .push((name.to_string(), header_value.trim().to_string()));
            }
            CurlOption::Data => self.data.push(value),
            CurlOption::Json => {
                if self.data.is_empty() {
                    self.headers
                        .push(("Content-Type".to_string(), "application/json".to_string()));
                    self.headers
                        .push(("Accept".to_string(), "application/json".to_string()));
                }
                self.data.push(value);
            }
            CurlOption::User => {
                let encoded = base64::engine::general_purpose::STANDARD.encode(value.as_bytes());
                self.headers
                    .push(("Authorization".to_string(), format!("Basic {encoded}")));
            }
            CurlOption::Bearer => self
                .headers
                .push(("Authorization".to_string(), format!("Bearer {value}"))),
            CurlOption::UserAgent => self.headers.push(("User-Agent".to_string(), value)),
            CurlOption::Cookie => self.headers.push(("Cookie".to_string(), value)),
            CurlOption::Referer => self.headers.push(("Referer".to_string(), value)),
            CurlOption::Url => self.url = Some(value),
            CurlOption::Head => self.head = true,
            CurlOption::IgnoredWithValue => {}
        }
        Ok(())
    }

    fn build(self) -> Result<CurlRequest, CurlParseError> {
        let url = self.url.ok_or(CurlParseError::MissingUrl)?;
        let body = (!self.data.is_empty()).then(|| self.data.join("&"));
        let method = match (self.method, self.head) {
            (Some(method), _) => method.to_uppercase(),
            (None, true) => "HEAD".to_string(),
            (None, false) if body.is_some() => "POST".to_string(),
            (None, false) => "GET".to_string(),
        };

        Ok(CurlRequest {
            method,
            url,
            headers: self.headers,
            body,
        })
    }
}

/// A bare argument is only taken as the URL when it has a scheme or could be a host and path.
fn looks_like_url(token: &str) -> bool {
    if token.contains("://") {
        return true;
    }

    !token.is_empty()
        && !token.contains(['=', '{', '}', '"'])
        && !token.chars().any(char::is_whitespace)
}

/// Parse a curl command line. The leading `curl` is optional and options that do not change the
/// request are ignored.
pub fn parse_curl(script: &str) -> Result<CurlRequest, CurlParseError> {
    let mut tokens = split_command_line(&normalize_script(script))?.into_iter().peekable();
    if tokens.peek().map(String::as_str) == Some("curl") {
        tokens.next();
    }

    let mut request = RequestBuilder::default();
    while let Some(token) = tokens.next() {
        if let Some(long) = token.strip_prefix("--") {
            let (name, inline_value) = match long.split_once('=') {
                Some((name, value)) => (name, Some(value.to_string())),
                None => (long, None),
            };
            let Some(option) = long_option(name) else {
                log::debug!("Ignoring curl option `--{name}`");
                continue;
            };
            let value = match inline_value {
                Some(value) => Some(value),
                None if option.takes_value() => Some(
                    tokens
                        .next()
                        .ok_or_else(|| CurlParseError::MissingValue(token.clone()))?,
                ),
                None => None,
            };
            request.apply(option, value)?;
        } else if token.len() > 1 && token.starts_with('-') {
            let mut flags = token[1..].chars();
            while let Some(flag) = flags.next() {
                let Some(option) = short_option(flag) else {
                    log::debug!("Ignoring curl option `-{flag}`");
                    continue;
                };
                if !option.takes_value() {
                    request.apply(option, None)?;
                    continue;
                }
                // The value is either the rest of this token or the next one.
                let attached = flags.as_str();
                let value = if attached.is_empty() {
                    tokens
                        .next()
                        .ok_or_else(|| CurlParseError::MissingValue(format!("-{flag}")))?
                } else {
                    attached.to_string()
                };
                request.apply(option, Some(value))?;
                break;
            }
        } else if request.url.is_none() && looks_like_url(&token) {
            request.url = Some(token);
        } else {
            log::debug!("Ignoring extra curl argument `{token}`");
        }
    }

    request.build()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn plain_get() {
        let request = parse_curl("curl https://example.com/health").unwrap();

        assert_eq!(
            request,
            CurlRequest {
                method: "GET".to_string(),
                url: "https://example.com/health".to_string(),
                headers: vec![],
                body: None,
            }
        );
    }

    #[test]
    fn multi_line_post_with_headers_and_body() {
        let script = r#"
            curl -X post \
              -H 'Content-Type: application/json' \
              --header "Accept:text/plain" \
              --data '{"name": "runmeter"}' \
              http://localhost:8080/items
        "#;

        let request = parse_curl(script).unwrap();

        assert_eq!(request.method, "POST");
        assert_eq!(request.url, "http://localhost:8080/items");
        assert_eq!(
            request.headers,
            vec![
                ("Content-Type".to_string(), "application/json".to_string()),
                ("Accept".to_string(), "text/plain".to_string()),
            ]
        );
        assert_eq!(request.body.as_deref(), Some(r#"{"name": "runmeter"}"#));
    }

    #[test]
    fn data_implies_post_and_joins_with_ampersand() {
        let request = parse_curl("curl -d a=1 --data-urlencode b=2 localhost").unwrap();

        assert_eq!(request.method, "POST");
        assert_eq!(request.body.as_deref(), Some("a=1&b=2"));
    }

    #[test]
    fn head_flag_and_attached_short_values() {
        let request = parse_curl("curl -sI -XOPTIONS http://localhost").unwrap();
        assert_eq!(request.method, "OPTIONS");

        let request = parse_curl("curl -sI http://localhost").unwrap();
        assert_eq!(request.method, "HEAD");
    }

    #[test]
    fn convenience_options_become_headers() {
        let request = parse_curl(
            "curl -u user:secret -A bench/1.0 -b session=abc --referer=http://origin --url http://localhost",
        )
        .unwrap();

        assert_eq!(request.url, "http://localhost");
        assert_eq!(
            request.headers,
            vec![
                (
                    "Authorization".to_string(),
                    "Basic dXNlcjpzZWNyZXQ=".to_string()
                ),
                ("User-Agent".to_string(), "bench/1.0".to_string()),
                ("Cookie".to_string(), "session=abc".to_string()),
                ("Referer".to_string(), "http://origin".to_string()),
            ]
        );
    }

    #[test]
    fn ignored_options_do_not_swallow_the_url() {
        let request =
            parse_curl("curl --compressed -o /dev/null -L --max-time 5 http://localhost/x").unwrap();

        assert_eq!(request.url, "http://localhost/x");
        assert_eq!(request.method, "GET");
    }

    #[test]
    fn options_with_ignored_values_do_not_become_the_url() {
        let scripts = [
            "curl -F a=b http://localhost/target",
            "curl --form file=@data.bin http://localhost/target",
            "curl --form-string note=hi http://localhost/target",
            "curl --resolve example.com:80:127.0.0.1 http://localhost/target",
            "curl --connect-to a:80:b:8080 http://localhost/target",
            "curl -T payload.txt http://localhost/target",
            "curl --upload-file payload.txt http://localhost/target",
            "curl -K curlrc http://localhost/target",
            "curl --config curlrc http://localhost/target",
            "curl -r 0-99 http://localhost/target",
            "curl --range 0-99 http://localhost/target",
            "curl -U user:pass http://localhost/target",
            "curl --proxy-user user:pass http://localhost/target",
            "curl -D headers.txt http://localhost/target",
            "curl --limit-rate 100K http://localhost/target",
        ];

        for script in scripts {
            let request = parse_curl(script).unwrap();
            assert_eq!(request.url, "http://localhost/target", "script: {script}");
        }
    }

    #[test]
    fn json_sets_body_and_content_headers() {
        let request = parse_curl(r#"curl --json '{"a":1}' http://localhost/api"#).unwrap();

        assert_eq!(request.url, "http://localhost/api");
        assert_eq!(request.method, "POST");
        assert_eq!(request.body.as_deref(), Some(r#"{"a":1}"#));
        assert_eq!(
            request.headers,
            vec![
                ("Content-Type".to_string(), "application/json".to_string()),
                ("Accept".to_string(), "application/json".to_string()),
            ]
        );
    }

    #[test]
    fn bearer_token_becomes_authorization_header() {
        let request = parse_curl("curl --oauth2-bearer t0ken http://localhost").unwrap();

        assert_eq!(
            request.headers,
            vec![("Authorization".to_string(), "Bearer t0ken".to_string())]
        );
    }

    #[test]
    fn unknown_option_values_are_not_taken_as_url() {
        let request =
            parse_curl(r#"curl --some-new-flag '{"x": 1}' --other key=value localhost:8080/x"#)
                .unwrap();
        assert_eq!(request.url, "localhost:8080/x");

        assert!(looks_like_url("https://example.com/a?b=c"));
        assert!(looks_like_url("example.com/path"));
        assert!(!looks_like_url("a=b"));
        assert!(!looks_like_url("{\"a\":1}"));
        assert!(!looks_like_url("two words"));
    }

    #[test]
    fn curl_prefix_is_optional() {
        assert_eq!(parse_curl("http://localhost").unwrap().url, "http://localhost");
    }

    #[test]
    fn errors() {
        assert_eq!(parse_curl("curl -X GET"), Err(CurlParseError::MissingUrl));
        assert_eq!(
            parse_curl("curl http://localhost -H"),
            Err(CurlParseError::MissingValue("-H".to_string()))
        );
        assert_eq!(
            parse_curl("curl http://localhost --data"),
            Err(CurlParseError::MissingValue("--data".to_string()))
        );
        assert_eq!(
            parse_curl("curl -H 'no colon' http://localhost"),
            Err(CurlParseError::InvalidHeader("no colon".to_string()))
        );
        assert!(matches!(
            parse_curl("curl 'http://localhost"),
            Err(CurlParseError::Command(_))
        ));
    }
}
