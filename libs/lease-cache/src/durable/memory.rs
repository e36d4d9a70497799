// Copyright 2025 Anapaya Systems
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//! In-memory document store.

use std::{
    sync::{
        Mutex, MutexGuard,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    durable::{InsertOutcome, LeaseDocument, LeaseDocumentStore, LeaseFilter},
    error::DocumentStoreError,
};

/// A [LeaseDocumentStore] keeping documents in process memory.
///
/// Suitable for single-instance deployments and tests. An outage can be simulated with
/// [Self::set_unavailable] and a slow store with [Self::with_latency].
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    documents: Mutex<Vec<LeaseDocument>>,
    unavailable: AtomicBool,
    latency: Option<Duration>,
}

impl MemoryDocumentStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every operation by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Makes every subsequent operation fail with a connection error, or recovers from it.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Snapshot of all stored documents.
    ///
    /// Empty if the document lock is poisoned.
    pub fn documents(&self) -> Vec<LeaseDocument> {
        match self.lock() {
            Ok(docs) => docs.clone(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to read in-memory lease documents");
                Vec::new()
            }
        }
    }

    /// Stores `document` without any existence check.
    pub fn seed(&self, document: LeaseDocument) {
        match self.lock() {
            Ok(mut docs) => docs.push(document),
            Err(e) => {
                tracing::error!(error = %e, supi = %document.supi, "Failed to seed lease document");
            }
        }
    }

    async fn enter(&self) -> Result<MutexGuard<'_, Vec<LeaseDocument>>, DocumentStoreError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DocumentStoreError::Connection(
                "in-memory store marked unavailable".to_string(),
            ));
        }
        self.lock()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<LeaseDocument>>, DocumentStoreError> {
        self.documents
            .lock()
            .map_err(|_| DocumentStoreError::Query("document lock poisoned".to_string()))
    }
}

#[async_trait]
impl LeaseDocumentStore for MemoryDocumentStore {
    async fn ping(&self) -> Result<(), DocumentStoreError> {
        self.enter().await.map(|_| ())
    }

    async fn find_one(
        &self,
        filter: &LeaseFilter,
    ) -> Result<Option<LeaseDocument>, DocumentStoreError> {
        let docs = self.enter().await?;
        Ok(docs
            .iter()
            .filter(|doc| filter.matches(doc))
            .max_by_key(|doc| doc.expires_at)
            .cloned())
    }

    async fn insert_if_absent(
        &self,
        document: LeaseDocument,
    ) -> Result<InsertOutcome, DocumentStoreError> {
        let mut docs = self.enter().await?;
        let same_identity =
            |doc: &LeaseDocument| doc.supi == document.supi && doc.selection == document.selection;

        if docs
            .iter()
            .any(|doc| same_identity(doc) && doc.address == document.address)
        {
            return Ok(InsertOutcome::AlreadyPresent);
        }
        let before = docs.len();
        docs.retain(|doc| !same_identity(doc));
        let outcome = if docs.len() < before {
            InsertOutcome::Replaced
        } else {
            InsertOutcome::Inserted
        };
        docs.push(document);
        Ok(outcome)
    }

    async fn update_expiration(
        &self,
        filter: &LeaseFilter,
        expires_at: DateTime<Utc>,
    ) -> Result<u64, DocumentStoreError> {
        let mut docs = self.enter().await?;
        let mut matched = 0;
        for doc in docs.iter_mut().filter(|doc| filter.matches(doc)) {
            doc.expires_at = expires_at;
            matched += 1;
        }
        Ok(matched)
    }

    async fn count(&self, filter: &LeaseFilter) -> Result<u64, DocumentStoreError> {
        let docs = self.enter().await?;
        Ok(docs.iter().filter(|doc| filter.matches(doc)).count() as u64)
    }

    async fn delete_many(&self, filter: &LeaseFilter) -> Result<u64, DocumentStoreError> {
        let mut docs = self.enter().await?;
        let before = docs.len();
        docs.retain(|doc| !filter.matches(doc));
        Ok((before - docs.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use test_log::test;

    use super::*;
    use crate::identity::tests::identity;

    fn document(supi: &str, address: Ipv4Addr) -> LeaseDocument {
        LeaseDocument::new(&identity(supi, "internet"), address, Utc::now())
    }

    #[test(tokio::test)]
    async fn should_find_count_and_delete_by_filter() {
        let store = MemoryDocumentStore::new();
        store
            .insert_if_absent(document("imsi-1", Ipv4Addr::new(10, 0, 0, 1)))
            .await
            .unwrap();
        store
            .insert_if_absent(document("imsi-2", Ipv4Addr::new(10, 0, 0, 2)))
            .await
            .unwrap();

        let filter = LeaseFilter::identity(&identity("imsi-2", "internet"));
        let found = store.find_one(&filter).await.unwrap().expect("document");
        assert_eq!(found.address, "10.0.0.2");

        assert_eq!(
            store
                .count(&LeaseFilter::address(Ipv4Addr::new(10, 0, 0, 1)))
                .await
                .unwrap(),
            1
        );
        assert_eq!(store.delete_many(&filter).await.unwrap(), 1);
        assert_eq!(store.documents().len(), 1);
    }

    #[test(tokio::test)]
    async fn should_update_expiration_of_matching_documents_only() {
        let store = MemoryDocumentStore::new();
        store.seed(document("imsi-1", Ipv4Addr::new(10, 0, 0, 1)));
        store.seed(document("imsi-2", Ipv4Addr::new(10, 0, 0, 2)));

        let later = Utc::now() + chrono::Duration::hours(48);
        let filter = LeaseFilter::identity(&identity("imsi-1", "internet"));
        assert_eq!(store.update_expiration(&filter, later).await.unwrap(), 1);

        let docs = store.documents();
        assert_eq!(docs[0].expires_at, later);
        assert_ne!(docs[1].expires_at, later);
    }

    #[test(tokio::test)]
    async fn should_keep_one_document_per_identity() {
        let store = MemoryDocumentStore::new();

        assert_eq!(
            store
                .insert_if_absent(document("imsi-1", Ipv4Addr::new(10, 0, 0, 1)))
                .await,
            Ok(InsertOutcome::Inserted)
        );
        assert_eq!(
            store
                .insert_if_absent(document("imsi-1", Ipv4Addr::new(10, 0, 0, 1)))
                .await,
            Ok(InsertOutcome::AlreadyPresent)
        );
        assert_eq!(
            store
                .insert_if_absent(document("imsi-1", Ipv4Addr::new(10, 0, 0, 2)))
                .await,
            Ok(InsertOutcome::Replaced)
        );
        assert_eq!(
            store
                .insert_if_absent(document("imsi-2", Ipv4Addr::new(10, 0, 0, 1)))
                .await,
            Ok(InsertOutcome::Inserted)
        );

        let docs = store.documents();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].address, "10.0.0.2");
    }

    #[test]
    fn should_snapshot_nothing_after_lock_poisoning() {
        let store = std::sync::Arc::new(MemoryDocumentStore::new());
        store.seed(document("imsi-1", Ipv4Addr::new(10, 0, 0, 1)));

        let poisoner = store.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.documents.lock().unwrap();
            panic!("poison the document lock");
        })
        .join();

        assert!(store.documents().is_empty());
        store.seed(document("imsi-2", Ipv4Addr::new(10, 0, 0, 2)));
        assert!(matches!(
            store.lock(),
            Err(DocumentStoreError::Query(_))
        ));
    }

    #[test(tokio::test)]
    async fn should_fail_every_operation_while_unavailable() {
        let store = MemoryDocumentStore::new();
        store.set_unavailable(true);

        assert!(matches!(
            store.ping().await,
            Err(DocumentStoreError::Connection(_))
        ));
        assert!(store.count(&LeaseFilter::default()).await.is_err());

        store.set_unavailable(false);
        assert_eq!(store.count(&LeaseFilter::default()).await, Ok(0));
    }
}
