//! The storage operations the pipeline depends on.

use blogsmith_shared::{ArticleRecord, EnhancedDocument, Result, SourceDocument};
use blogsmith_storage::Storage;

/// Create, unique lookup, list originals, create derived.
#[allow(async_fn_in_trait)]
pub trait ArticleStore {
    async fn create_original(&self, doc: &SourceDocument) -> Result<ArticleRecord>;

    async fn find_by_source_url(&self, source_url: &str) -> Result<Option<ArticleRecord>>;

    async fn list_originals(&self) -> Result<Vec<ArticleRecord>>;

    async fn create_enhanced(&self, doc: &EnhancedDocument) -> Result<ArticleRecord>;
}

impl ArticleStore for Storage {
    async fn create_original(&self, doc: &SourceDocument) -> Result<ArticleRecord> {
        self.insert_original(doc).await
    }

    async fn find_by_source_url(&self, source_url: &str) -> Result<Option<ArticleRecord>> {
        Storage::find_by_source_url(self, source_url).await
    }

    async fn list_originals(&self) -> Result<Vec<ArticleRecord>> {
        Storage::list_originals(self).await
    }

    async fn create_enhanced(&self, doc: &EnhancedDocument) -> Result<ArticleRecord> {
        self.insert_enhanced(doc).await
    }
}

impl<T: ArticleStore> ArticleStore for &T {
    async fn create_original(&self, doc: &SourceDocument) -> Result<ArticleRecord> {
        (**self).create_original(doc).await
    }

    async fn find_by_source_url(&self, source_url: &str) -> Result<Option<ArticleRecord>> {
        (**self).find_by_source_url(source_url).await
    }

    async fn list_originals(&self) -> Result<Vec<ArticleRecord>> {
        (**self).list_originals().await
    }

    async fn create_enhanced(&self, doc: &EnhancedDocument) -> Result<ArticleRecord> {
        (**self).create_enhanced(doc).await
    }
}
