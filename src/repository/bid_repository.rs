// src/repository/bid_repository.rs
use futures::stream::TryStreamExt;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{doc, Document};
use mongodb::error::Result;
use mongodb::options::IndexOptions;
use mongodb::results::{InsertOneResult, UpdateResult};
use mongodb::{Client, Collection, IndexModel};

use crate::errors::ApiError;
use crate::models::bid::Bid;

/// Sequential duplicate prevention: a prior bid for the same (email, jobId)
/// pair blocks the submission before any insert is attempted.
pub fn reject_duplicate(existing: Option<&Bid>) -> std::result::Result<(), ApiError> {
    match existing {
        Some(_) => Err(ApiError::DuplicateBid),
        None => Ok(()),
    }
}

/// Business outcome of the insert itself. Concurrent submissions can pass
/// the existence check together; the unique index fails the later insert
/// with a duplicate-key error, which is the same duplicate bid.
pub fn insert_outcome(
    result: mongodb::error::Result<InsertOneResult>,
) -> std::result::Result<InsertOneResult, ApiError> {
    match result {
        Ok(result) => Ok(result),
        Err(e) if ApiError::is_duplicate_key(&e) => Err(ApiError::DuplicateBid),
        Err(e) => Err(e.into()),
    }
}

pub struct BidRepository {
    collection: Collection<Bid>,
}

impl BidRepository {
    pub fn new(client: &Client, db_name: &str) -> Self {
        let db = client.database(db_name);
        let collection = db.collection::<Bid>("bids");
        BidRepository { collection }
    }

    /// Unique index on (email, jobId). The pre-insert existence check alone
    /// is racy under concurrent submissions; the index makes the second
    /// insert fail with a duplicate-key error instead.
    pub async fn ensure_indexes(&self) -> Result<()> {
        let index = IndexModel::builder()
            .keys(doc! { "email": 1, "jobId": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.collection.create_index(index, None).await.map(|_| ())
    }

    pub async fn find_existing(&self, email: &str, job_id: &str) -> Result<Option<Bid>> {
        let filter = doc! { "email": email, "jobId": job_id };
        self.collection.find_one(filter, None).await
    }

    pub async fn insert(&self, bid: Bid) -> Result<InsertOneResult> {
        self.collection.insert_one(bid, None).await
    }

    /// One bid per user per job, checked on both layers.
    pub async fn submit(&self, bid: Bid) -> std::result::Result<InsertOneResult, ApiError> {
        let existing = self.find_existing(&bid.email, &bid.job_id).await?;
        reject_duplicate(existing.as_ref())?;
        insert_outcome(self.insert(bid).await)
    }

    pub async fn find_by_bidder_email(&self, email: &str) -> Result<Vec<Bid>> {
        let filter = doc! { "email": email };
        let mut cursor = self.collection.find(filter, None).await?;
        let mut bids = Vec::new();
        while let Some(bid) = cursor.try_next().await? {
            bids.push(bid);
        }
        Ok(bids)
    }

    /// Bids placed against jobs owned by `email`, via the denormalized
    /// buyer_email field.
    pub async fn find_by_buyer_email(&self, email: &str) -> Result<Vec<Bid>> {
        let filter = doc! { "buyer_email": email };
        let mut cursor = self.collection.find(filter, None).await?;
        let mut bids = Vec::new();
        while let Some(bid) = cursor.try_next().await? {
            bids.push(bid);
        }
        Ok(bids)
    }

    /// `$set` of the caller's partial patch. Status values are free-form and
    /// transitions are not checked.
    pub async fn update_status(&self, id: ObjectId, patch: Document) -> Result<UpdateResult> {
        let filter = doc! { "_id": id };
        let update = doc! { "$set": patch };
        self.collection
            .clone_with_type::<Document>()
            .update_one(filter, update, None)
            .await
    }
}
