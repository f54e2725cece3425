use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Storage backend kinds
///
/// Closed set of backends an asset can be placed on. `Local` is the pseudo-backend
/// that needs no adapter: the asset simply stays where the host wrote it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Local,
    AliyunOss,
    AwsS3,
    CloudflareR2,
    GithubJsdelivr,
    Imgur,
}

impl BackendKind {
    /// Every backend kind, local first.
    pub const ALL: [BackendKind; 6] = [
        BackendKind::Local,
        BackendKind::AliyunOss,
        BackendKind::AwsS3,
        BackendKind::CloudflareR2,
        BackendKind::GithubJsdelivr,
        BackendKind::Imgur,
    ];

    /// Stable identifier used in configuration and provenance records.
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Local => "local",
            BackendKind::AliyunOss => "aliyun_oss",
            BackendKind::AwsS3 => "aws_s3",
            BackendKind::CloudflareR2 => "cloudflare_r2",
            BackendKind::GithubJsdelivr => "github_jsdelivr",
            BackendKind::Imgur => "imgur",
        }
    }

    /// Human readable name for CLI output.
    pub fn display_name(&self) -> &'static str {
        match self {
            BackendKind::Local => "Local storage",
            BackendKind::AliyunOss => "Aliyun OSS",
            BackendKind::AwsS3 => "AWS S3",
            BackendKind::CloudflareR2 => "Cloudflare R2",
            BackendKind::GithubJsdelivr => "GitHub + jsDelivr",
            BackendKind::Imgur => "Imgur",
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, BackendKind::Local)
    }

    /// Fields that must be non-empty before an adapter for this kind is usable.
    pub fn required_fields(&self) -> &'static [&'static str] {
        match self {
            BackendKind::Local => &[],
            BackendKind::AliyunOss => &["access_key", "access_secret", "bucket", "endpoint"],
            BackendKind::AwsS3 => &["access_key", "access_secret", "bucket", "region"],
            BackendKind::CloudflareR2 => &["account_id", "access_key", "access_secret", "bucket"],
            BackendKind::GithubJsdelivr => &["token", "repo", "branch", "path"],
            BackendKind::Imgur => &["client_id"],
        }
    }

    /// Fields that may be configured but are not required.
    pub fn optional_fields(&self) -> &'static [&'static str] {
        match self {
            BackendKind::Local => &[],
            BackendKind::Imgur => &["access_token", "url_prefix"],
            _ => &["url_prefix"],
        }
    }
}

impl FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(BackendKind::Local),
            "aliyun_oss" => Ok(BackendKind::AliyunOss),
            "aws_s3" => Ok(BackendKind::AwsS3),
            "cloudflare_r2" => Ok(BackendKind::CloudflareR2),
            "github_jsdelivr" => Ok(BackendKind::GithubJsdelivr),
            "imgur" => Ok(BackendKind::Imgur),
            _ => Err(anyhow::anyhow!("Invalid storage backend: {}", s)),
        }
    }
}

impl Display for BackendKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}
