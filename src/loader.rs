//! Sources a form schema can be loaded from.

use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;

use rust_embed::RustEmbed;
use thiserror::Error;
use tracing::{debug, warn};

use crate::schema::{FormSchema, SchemaError};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to fetch schema")]
    Status { status: u16 },
    #[error("{0}")]
    Transport(String),
    #[error("No schema found")]
    Empty,
    #[error("schema asset `{0}` not found")]
    MissingAsset(String),
    #[error(transparent)]
    Parse(#[from] SchemaError),
}

pub type BoxedLoadFuture<'a> =
    Pin<Box<dyn Future<Output = Result<FormSchema, LoadError>> + Send + 'a>>;

pub trait SchemaLoader: Send + Sync {
    fn load(&self) -> BoxedLoadFuture<'_>;
}

impl<F> SchemaLoader for F
where
    F: Fn() -> BoxedLoadFuture<'static> + Send + Sync,
{
    fn load(&self) -> BoxedLoadFuture<'_> {
        (self)()
    }
}

/// Parses a schema document; a JSON `null` body means no schema.
pub fn parse_schema_document(body: &str) -> Result<FormSchema, LoadError> {
    let document: serde_json::Value = serde_json::from_str(body).map_err(SchemaError::from)?;
    if document.is_null() {
        return Err(LoadError::Empty);
    }
    let schema: FormSchema = serde_json::from_value(document).map_err(SchemaError::from)?;
    schema.check_field_ids()?;
    Ok(schema)
}

/// Maps an HTTP response to a schema. Non-2xx statuses fail without looking
/// at the body.
pub fn schema_from_response(status: u16, body: &str) -> Result<FormSchema, LoadError> {
    if !(200..300).contains(&status) {
        warn!(status, "schema endpoint returned an error status");
        return Err(LoadError::Status { status });
    }
    parse_schema_document(body)
}

/// Serves an in-memory schema.
#[derive(Clone, Debug)]
pub struct StaticSchemaLoader {
    schema: FormSchema,
}

impl StaticSchemaLoader {
    pub fn new(schema: FormSchema) -> Self {
        Self { schema }
    }
}

impl SchemaLoader for StaticSchemaLoader {
    fn load(&self) -> BoxedLoadFuture<'_> {
        let schema = self.schema.clone();
        Box::pin(async move {
            schema.check_field_ids()?;
            Ok(schema)
        })
    }
}

#[derive(RustEmbed)]
#[folder = "assets/schemas"]
pub struct BundledSchemas;

/// Reads a schema document compiled into the binary.
pub struct EmbeddedSchemaLoader<A: RustEmbed = BundledSchemas> {
    path: String,
    assets: PhantomData<fn() -> A>,
}

impl<A: RustEmbed> EmbeddedSchemaLoader<A> {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            assets: PhantomData,
        }
    }

    pub fn available() -> Vec<String> {
        A::iter().map(|path| path.into_owned()).collect()
    }

    fn read(&self) -> Result<FormSchema, LoadError> {
        let asset = A::get(&self.path).ok_or_else(|| LoadError::MissingAsset(self.path.clone()))?;
        let body = String::from_utf8_lossy(asset.data.as_ref());
        let schema = parse_schema_document(&body)?;
        debug!(path = %self.path, fields = schema.fields.len(), "loaded bundled schema");
        Ok(schema)
    }
}

impl<A: RustEmbed> SchemaLoader for EmbeddedSchemaLoader<A> {
    fn load(&self) -> BoxedLoadFuture<'_> {
        let result = self.read();
        Box::pin(async move { result })
    }
}

#[cfg(feature = "http")]
pub use http::HttpSchemaLoader;

#[cfg(feature = "http")]
mod http {
    use std::time::Duration;

    use tracing::debug;

    use super::{BoxedLoadFuture, LoadError, SchemaLoader, schema_from_response};

    /// Fetches the schema with a GET request.
    #[derive(Clone, Debug)]
    pub struct HttpSchemaLoader {
        client: reqwest::Client,
        url: String,
        timeout: Duration,
    }

    impl HttpSchemaLoader {
        pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
            Self {
                client: reqwest::Client::new(),
                url: url.into(),
                timeout,
            }
        }

        pub fn url(&self) -> &str {
            &self.url
        }
    }

    impl SchemaLoader for HttpSchemaLoader {
        fn load(&self) -> BoxedLoadFuture<'_> {
            Box::pin(async move {
                let response = self
                    .client
                    .get(&self.url)
                    .timeout(self.timeout)
                    .send()
                    .await
                    .map_err(|error| LoadError::Transport(error.to_string()))?;
                let status = response.status().as_u16();
                let body = response
                    .text()
                    .await
                    .map_err(|error| LoadError::Transport(error.to_string()))?;
                debug!(url = %self.url, status, bytes = body.len(), "fetched schema");
                schema_from_response(status, &body)
            })
        }
    }
}
