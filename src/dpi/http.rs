use crate::dpi::DpiAnalyzer;
use crate::packet::Packet;
use crate::types::AnalysisResult;

const PORTS: &[u16] = &[80, 8080, 8000, 8008, 3000, 4200, 5000, 9000];
const REQUEST_METHODS: &[&str] = &[
    "GET", "POST", "PUT", "DELETE", "HEAD", "OPTIONS", "PATCH", "TRACE", "CONNECT",
];
const COMMON_HEADER_NAMES: &[&str] = &["Host:", "User-Agent:", "Content-Type:", "Accept:"];

fn looks_like_http(payload: &[u8]) -> bool {
    if payload.len() < 10 {
        return false;
    }
    let window = &payload[..payload.len().min(100)];
    let text = String::from_utf8_lossy(window);
    REQUEST_METHODS.iter().any(|m| text.starts_with(&format!("{m} ")))
        || text.contains("HTTP/")
        || COMMON_HEADER_NAMES.iter().any(|h| text.contains(h))
}

struct ParsedMessage {
    is_request: bool,
    method: Option<String>,
    uri: Option<String>,
    version: Option<String>,
    status_code: Option<u16>,
    status_text: Option<String>,
    headers: Vec<(String, String)>,
    /// No recognisable request-line or status-line was found, but the
    /// payload still looks like a run of `NAME: VALUE` header lines.
    partial: bool,
}

/// Splits on CRLF. The first line is tried as a request-line or a
/// status-line; if neither matches, the whole message is re-parsed as a
/// bare run of `NAME: VALUE` header lines (a `Partial` fragment) instead
/// of being rejected outright.
fn parse_message(payload: &[u8]) -> Option<ParsedMessage> {
    let text = String::from_utf8_lossy(payload);
    let mut lines = text.split("\r\n");
    let first_line = lines.next()?;

    let mut parts = first_line.splitn(3, ' ');
    let a = parts.next()?;
    let b = parts.next();
    let c = parts.next();

    let recognised = if REQUEST_METHODS.contains(&a) {
        Some((true, Some(a.to_string()), b.map(str::to_string), c.map(str::to_string), None, None))
    } else if a.starts_with("HTTP/") {
        let code = b.and_then(|s| s.parse::<u16>().ok());
        Some((false, None, None, Some(a.to_string()), code, c.map(str::to_string)))
    } else {
        None
    };

    let (is_request, method, uri, version, status_code, status_text, header_lines, partial) =
        match recognised {
            Some((is_request, method, uri, version, status_code, status_text)) => {
                (is_request, method, uri, version, status_code, status_text, lines, false)
            }
            None => (false, None, None, None, None, None, text.split("\r\n"), true),
        };

    let mut headers = Vec::new();
    let mut saw_header = false;
    for line in header_lines {
        if line.is_empty() {
            break;
        }
        match line.split_once(':') {
            Some((name, value)) => {
                headers.push((name.trim().to_string(), value.trim().to_string()));
                saw_header = true;
            }
            None if partial => return None,
            None => break,
        }
    }
    if partial && !saw_header {
        return None;
    }

    Some(ParsedMessage {
        is_request,
        method,
        uri,
        version,
        status_code,
        status_text,
        headers,
        partial,
    })
}

fn header_value<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

fn categorize_user_agent(ua: &str) -> &'static str {
    let lower = ua.to_ascii_lowercase();
    if lower.contains("curl") {
        "cURL Tool"
    } else if lower.contains("wget") {
        "wget Tool"
    } else if lower.contains("python") {
        "Python Client"
    } else if lower.contains("java") {
        "Java Client"
    } else if lower.contains("bot") || lower.contains("crawler") || lower.contains("spider") {
        "Web Crawler/Bot"
    } else if lower.contains("edg") {
        "Edge"
    } else if lower.contains("chrome") {
        "Chrome"
    } else if lower.contains("firefox") {
        "Firefox"
    } else if lower.contains("safari") {
        "Safari"
    } else {
        "Unknown"
    }
}

fn categorize_server(server: &str) -> &'static str {
    let lower = server.to_ascii_lowercase();
    if lower.contains("nginx") {
        "Nginx"
    } else if lower.contains("apache") {
        "Apache"
    } else if lower.contains("iis") {
        "IIS"
    } else if lower.contains("tomcat") {
        "Tomcat"
    } else if lower.contains("jetty") {
        "Jetty"
    } else if lower.contains("express") {
        "Express.js"
    } else if lower.contains("node") {
        "Node.js"
    } else {
        "Unknown"
    }
}

fn categorize_content_type(content_type: &str) -> &'static str {
    let lower = content_type.to_ascii_lowercase();
    if lower.contains("json") {
        "JSON API"
    } else if lower.contains("html") {
        "HTML Page"
    } else if lower.contains("xml") {
        "XML Data"
    } else if lower.contains("css") {
        "CSS Stylesheet"
    } else if lower.contains("javascript") {
        "JavaScript"
    } else if lower.contains("image") {
        "Image"
    } else if lower.contains("video") {
        "Video"
    } else if lower.contains("pdf") {
        "PDF Document"
    } else {
        "Unknown"
    }
}

const STATIC_EXTENSIONS: &[&str] = &[".css", ".js", ".png", ".jpg", ".gif", ".ico", ".woff"];

fn categorize_uri(uri: &str) -> &'static str {
    if uri.contains("/api/") {
        "API Request"
    } else if STATIC_EXTENSIONS.iter().any(|ext| uri.ends_with(ext)) {
        "Static Resource"
    } else {
        "Page Request"
    }
}

fn categorize_status(code: u16) -> &'static str {
    match code {
        200..=299 => "Success",
        300..=399 => "Redirection",
        400..=499 => "Client Error",
        500..=599 => "Server Error",
        _ => "Unknown",
    }
}

pub struct HttpAnalyzer;

impl DpiAnalyzer for HttpAnalyzer {
    fn can_analyze(&self, packet: &Packet) -> bool {
        if !packet.is_tcp() {
            return false;
        }
        let (_, dst_port) = match packet.transport_flow() {
            Some(flow) => flow,
            None => return false,
        };
        PORTS.contains(&dst_port) || looks_like_http(packet.transport_payload())
    }

    fn analyze(&self, packet: &Packet) -> Option<AnalysisResult> {
        let payload = packet.transport_payload();
        if payload.len() < 10 {
            return None;
        }

        let parsed = parse_message(payload)?;

        let (subprotocol, confidence) = if parsed.partial {
            ("Partial", 0.7)
        } else if parsed.is_request {
            ("Request", 0.95)
        } else {
            ("Response", 0.95)
        };

        let mut result = AnalysisResult::new("HTTP", subprotocol, confidence)
            .with_detail("header_count", parsed.headers.len().to_string());

        if let Some(method) = &parsed.method {
            result = result.with_detail("method", method);
        }
        if let Some(uri) = &parsed.uri {
            result = result
                .with_detail("uri", uri)
                .with_metadata("uri_category", categorize_uri(uri));
        }
        if let Some(version) = &parsed.version {
            result = result.with_detail("version", version);
        }
        if let Some(code) = parsed.status_code {
            result = result
                .with_detail("status_code", code.to_string())
                .with_metadata("status_category", categorize_status(code));
            if let Some(text) = &parsed.status_text {
                result = result.with_detail("status_text", text);
            }
        }

        if let Some(host) = header_value(&parsed.headers, "Host") {
            result = result.with_detail("host", host);
        }
        if let Some(ua) = header_value(&parsed.headers, "User-Agent") {
            result = result
                .with_detail("user_agent", ua)
                .with_metadata("user_agent", categorize_user_agent(ua));
        }
        if let Some(server) = header_value(&parsed.headers, "Server") {
            result = result
                .with_detail("server", server)
                .with_metadata("server", categorize_server(server));
        }
        if let Some(content_type) = header_value(&parsed.headers, "Content-Type") {
            result = result
                .with_detail("content_type", content_type)
                .with_metadata("content_type", categorize_content_type(content_type));
        }
        if let Some(content_length) = header_value(&parsed.headers, "Content-Length") {
            if let Ok(len) = content_length.trim().parse::<u64>() {
                result = result.with_detail("content_length", len.to_string());
            }
        }

        Some(result)
    }

    fn protocol_name(&self) -> &'static str {
        "HTTP"
    }

    fn confidence_threshold(&self) -> f32 {
        0.95
    }
}
