use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;

/// Outcome of a blob write: where the object lives and the opaque integrity
/// tag the store reported for it. The tag is a storage-layer consistency
/// token (an ETag for S3), not a cryptographic digest of the content.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub location: String,
    pub integrity_tag: String,
}

#[derive(Debug, Clone)]
pub struct FetchedObject {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

#[async_trait]
pub trait ObjectStorage: Send + Sync + 'static {
    /// Stores bytes under the key, replacing any previous content.
    async fn put_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: Option<String>,
    ) -> Result<StoredObject>;

    /// `None` when the key is absent.
    async fn get_object(&self, key: &str) -> Result<Option<FetchedObject>>;
}

pub struct S3Storage {
    client: S3Client,
    bucket: String,
    object_url_base: String,
}

impl S3Storage {
    pub fn new(client: S3Client, bucket: impl Into<String>, endpoint_url: Option<&str>, region: &str) -> Self {
        let bucket = bucket.into();
        let object_url_base = match endpoint_url {
            Some(endpoint) => format!("{}/{}", endpoint.trim_end_matches('/'), bucket),
            None => format!("https://{bucket}.s3.{region}.amazonaws.com"),
        };
        Self {
            client,
            bucket,
            object_url_base,
        }
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{key}", self.object_url_base)
    }
}

#[async_trait]
impl ObjectStorage for S3Storage {
    async fn put_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: Option<String>,
    ) -> Result<StoredObject> {
        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes));

        if let Some(content_type) = content_type {
            request = request.content_type(content_type);
        }

        let response = request
            .send()
            .await
            .context("failed to upload object to S3")?;

        // S3 quotes the ETag on the wire.
        let integrity_tag = response
            .e_tag()
            .unwrap_or_default()
            .trim_matches('"')
            .to_string();

        Ok(StoredObject {
            location: self.object_url(key),
            integrity_tag,
        })
    }

    async fn get_object(&self, key: &str) -> Result<Option<FetchedObject>> {
        let response = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                if err
                    .as_service_error()
                    .map(|service| service.is_no_such_key())
                    .unwrap_or(false)
                {
                    return Ok(None);
                }
                return Err(anyhow::Error::from(err).context("failed to download object from S3"));
            }
        };

        let content_type = response.content_type().map(|value| value.to_string());
        let bytes = response
            .body
            .collect()
            .await
            .context("failed to read object stream")?
            .into_bytes()
            .to_vec();

        Ok(Some(FetchedObject {
            bytes,
            content_type,
        }))
    }
}
