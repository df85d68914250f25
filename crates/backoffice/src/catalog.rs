use document_store::{DocumentQuery, DocumentStore};
use domain::CatalogSnapshot;
use domain::collections::PRODUCTS;

use crate::Result;

const CATALOG_PAGE_SIZE: usize = 500;

/// Reads every product document into a catalog snapshot.
#[tracing::instrument(skip(store))]
pub async fn load_catalog<S: DocumentStore + ?Sized>(store: &S) -> Result<CatalogSnapshot> {
    let mut documents = Vec::new();
    let mut query = DocumentQuery::collection(PRODUCTS).limit(CATALOG_PAGE_SIZE);

    loop {
        let page = store.query(query.clone()).await?;
        let next = page.next_cursor;
        documents.extend(page.documents);
        match next {
            Some(cursor) => query = query.start_after(cursor),
            None => break,
        }
    }

    let catalog = CatalogSnapshot::from_documents(&documents);
    tracing::debug!(products = catalog.len(), "catalog loaded");
    Ok(catalog)
}
