use anyhow::Result;
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Region},
    Client as S3Client,
};

use crate::config::AppConfig;
use crate::storage::S3Storage;

/// Builds the S3-backed blob store from config. The region always comes from
/// config (which supplies its own default), so no provider-chain fallback is
/// layered on; a custom endpoint and static credentials are only wired in
/// when supplied, leaving the SDK's ambient providers to cover the rest.
pub async fn build_storage(config: &AppConfig) -> Result<S3Storage> {
    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new(config.aws_region.clone()));

    if let Some(endpoint) = &config.aws_endpoint_url {
        loader = loader.endpoint_url(endpoint);
    }

    if let (Some(access_key), Some(secret_key)) = (
        config.aws_access_key_id.clone(),
        config.aws_secret_access_key.clone(),
    ) {
        loader = loader.credentials_provider(Credentials::new(
            access_key,
            secret_key,
            None,
            None,
            "static",
        ));
    }

    let base_config = loader.load().await;
    let s3_config = S3ConfigBuilder::from(&base_config)
        .force_path_style(true)
        .build();

    Ok(S3Storage::new(
        S3Client::from_conf(s3_config),
        config.s3_bucket.clone(),
        config.aws_endpoint_url.as_deref(),
        &config.aws_region,
    ))
}
