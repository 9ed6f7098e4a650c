//! Turning tool results into exit codes and the text shown to the user.

use std::path::Path;

use crate::{FailureKind, KakaoError, SendResult, TokenRecord};

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;

/// What a tool prints and the status it exits with. Successful reports go to
/// stdout, failures to stderr.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub exit_code: u8,
    pub text: String,
}

impl Report {
    fn success(text: String) -> Self {
        Self {
            exit_code: EXIT_SUCCESS,
            text,
        }
    }

    fn failure(text: String) -> Self {
        Self {
            exit_code: EXIT_FAILURE,
            text,
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == EXIT_SUCCESS
    }
}

pub fn send_report(result: &Result<SendResult, KakaoError>) -> Report {
    match result {
        Ok(SendResult::Success(_)) => Report::success("Message sent. Check KakaoTalk.".to_string()),
        Ok(SendResult::Failure {
            kind: FailureKind::TokenExpired,
            ..
        }) => Report::failure(
            "Failed to send message.\n\nThe access token has expired. Issue a new one with:\n\n  kakao-token\n"
                .to_string(),
        ),
        Ok(SendResult::Failure {
            kind: FailureKind::Other,
            detail,
        }) => Report::failure(format!("Failed to send message.\n\nError: {detail}")),
        Err(err @ KakaoError::ConfigurationMissing { .. }) => Report::failure(format!(
            "Error: {}\n\nRun kakao-token first to issue an access token.",
            err.detail()
        )),
        Err(err) => Report::failure(format!("Error: {}", err.detail())),
    }
}

pub fn token_report(result: &Result<TokenRecord, KakaoError>, store_path: &Path) -> Report {
    let err = match result {
        Ok(record) => {
            return Report::success(format!(
                "Access token saved to {}\nExpires in {:.1} hours",
                store_path.display(),
                record.expires_in_hours()
            ));
        }
        Err(err) => err,
    };

    let mut text = format!("Error: {}", err.detail());
    match err {
        KakaoError::ConfigurationMissing { key } => {
            text.push_str(&format!("\n\nAdd it to the env file, for example:\n  {key}=your_value"));
        }
        KakaoError::TokenExchangeFailed { .. } => {
            text.push_str("\n\nThe token request was rejected. Run kakao-token to sign in again.");
        }
        KakaoError::Bind { .. } => {
            text.push_str("\n\nIs another kakao-token already running on that port?");
        }
        _ => {}
    }
    Report::failure(text)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use chrono::Utc;

    use super::*;
    use crate::config::REST_API_KEY;

    #[test]
    fn delivered_memo_exits_zero() {
        let report = send_report(&Ok(SendResult::Success("{\"result_code\":0}".to_string())));
        assert_eq!(report.exit_code, 0);
        assert!(report.is_success());
        assert!(report.text.contains("Message sent"));
    }

    #[test]
    fn expired_token_points_at_kakao_token() {
        let report = send_report(&Ok(SendResult::Failure {
            kind: FailureKind::TokenExpired,
            detail: "{\"code\":-401}".to_string(),
        }));
        assert_eq!(report.exit_code, 1);
        assert!(report.text.contains("expired"));
        assert!(report.text.contains("  kakao-token"));
    }

    #[test]
    fn other_send_failure_shows_detail() {
        let report = send_report(&Ok(SendResult::Failure {
            kind: FailureKind::Other,
            detail: "quota exceeded".to_string(),
        }));
        assert_eq!(report.exit_code, 1);
        assert!(report.text.contains("Error: quota exceeded"));
        assert!(!report.text.contains("kakao-token"));
    }

    #[test]
    fn errors_before_sending_exit_one() {
        let missing_file = send_report(&Err(KakaoError::FileNotFound(PathBuf::from("absent.txt"))));
        assert_eq!(missing_file.exit_code, 1);
        assert!(missing_file.text.contains("absent.txt"));

        let no_token = send_report(&Err(KakaoError::ConfigurationMissing {
            key: "KAKAO_ACCESS_TOKEN",
        }));
        assert_eq!(no_token.exit_code, 1);
        assert!(no_token.text.contains("Run kakao-token first"));
    }

    #[test]
    fn saved_token_reports_store_and_expiry() {
        let record = TokenRecord {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires_in: 21600,
            issued_at: Utc::now(),
        };
        let report = token_report(&Ok(record), Path::new(".env"));
        assert_eq!(report.exit_code, 0);
        assert_eq!(report.text, "Access token saved to .env\nExpires in 6.0 hours");
    }

    #[test]
    fn missing_api_key_suggests_entry() {
        let report = token_report(
            &Err(KakaoError::ConfigurationMissing { key: REST_API_KEY }),
            Path::new(".env"),
        );
        assert_eq!(report.exit_code, 1);
        assert!(report.text.contains("KAKAO_REST_API_KEY=your_value"));
    }
}
