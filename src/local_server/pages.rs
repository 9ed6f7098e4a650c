use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};

use crate::TokenRecord;

const LOGIN_HTML: &str = include_str!("html/login.html");
const SUCCESS_HTML: &str = include_str!("html/success.html");
const ERROR_HTML: &str = include_str!("html/error.html");

/// A rendered HTML reply from the local server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub status: StatusCode,
    pub html: String,
}

impl IntoResponse for Page {
    fn into_response(self) -> Response {
        (self.status, Html(self.html)).into_response()
    }
}

pub(super) fn login(authorization_url: &str) -> Page {
    Page {
        status: StatusCode::OK,
        html: fill(LOGIN_HTML, &[("authorization_url", authorization_url)]),
    }
}

pub(super) fn success(record: &TokenRecord, store_path: &str) -> Page {
    let hours = format!("{:.1}", record.expires_in_hours());
    Page {
        status: StatusCode::OK,
        html: fill(
            SUCCESS_HTML,
            &[
                ("store_path", store_path),
                ("access_token", &record.access_token),
                ("expires_in_hours", &hours),
            ],
        ),
    }
}

pub(super) fn failure(status: StatusCode, title: &str, detail: &str) -> Page {
    Page {
        status,
        html: fill(ERROR_HTML, &[("title", title), ("detail", detail)]),
    }
}

fn fill(template: &str, values: &[(&str, &str)]) -> String {
    values.iter().fold(template.to_string(), |html, (name, value)| {
        html.replace(&format!("{{{{{name}}}}}"), &escape_html(value))
    })
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
