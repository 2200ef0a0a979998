//! Transport seam between the sync engine and the network

use crate::error::Result;
use crate::types::{JsonValue, StringMap};
use async_trait::async_trait;

/// Something that can fetch a JSON document for a stream
///
/// `HttpClient` is the production implementation; the engine only ever
/// awaits one call at a time.
#[async_trait]
pub trait Transport: Send + Sync {
    /// GET `path` with `params`, returning `None` for an empty body
    async fn get_json(
        &self,
        path: &str,
        params: &StringMap,
        stream: &str,
    ) -> Result<Option<JsonValue>>;
}
