use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::Client as S3Client;
use std::time::Duration;

/// Object storage gateway, bucket-overridable per call since the pipeline
/// reads raw recordings from an intake bucket and writes derived artifacts
/// (mixdown, waveform) to a separate one.
#[derive(Clone)]
pub struct StorageClient {
    client: S3Client,
    default_bucket: String,
    public_url: String,
}

impl StorageClient {
    pub async fn new(
        endpoint: &str,
        access_key: &str,
        secret_key: &str,
        default_bucket: &str,
        public_url: &str,
    ) -> Self {
        let credentials = Credentials::new(access_key, secret_key, None, None, "meet-storage");

        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(endpoint)
            .region(Region::new("us-east-1"))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        let client = S3Client::from_conf(config);

        let _ = client.create_bucket().bucket(default_bucket).send().await;

        tracing::info!(endpoint = %endpoint, bucket = %default_bucket, "object storage client initialized");

        Self {
            client,
            default_bucket: default_bucket.to_string(),
            public_url: public_url.to_string(),
        }
    }

    pub async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<String, String> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body.into())
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| format!("put failed: {e}"))?;

        Ok(format!("{}/{}/{}", self.public_url, bucket, key))
    }

    pub async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, String> {
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| format!("get failed: {e}"))?;

        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| format!("read body failed: {e}"))?;

        Ok(bytes.into_bytes().to_vec())
    }

    pub async fn presigned_url(
        &self,
        bucket: &str,
        key: &str,
        expires_secs: u64,
    ) -> Result<String, String> {
        let presign_config = PresigningConfig::builder()
            .expires_in(Duration::from_secs(expires_secs))
            .build()
            .map_err(|e| format!("presign config error: {e}"))?;

        let url = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(presign_config)
            .await
            .map_err(|e| format!("presign error: {e}"))?
            .uri()
            .to_string();

        Ok(url)
    }

    pub async fn delete(&self, bucket: &str, key: &str) -> Result<(), String> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| format!("delete failed: {e}"))?;

        Ok(())
    }

    pub async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, String> {
        let output = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .send()
            .await
            .map_err(|e| format!("list failed: {e}"))?;

        Ok(output
            .contents()
            .iter()
            .filter_map(|obj| obj.key().map(|k| k.to_string()))
            .collect())
    }

    pub fn default_bucket(&self) -> &str {
        &self.default_bucket
    }
}
