// src/repository/job_repository.rs
use futures::stream::TryStreamExt;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{doc, Document};
use mongodb::error::Result;
use mongodb::options::{FindOptions, UpdateOptions};
use mongodb::results::{DeleteResult, InsertOneResult, UpdateResult};
use mongodb::{Client, Collection};

use crate::models::job::Job;

/// Search criteria for the paginated job listing. The filter is built from a
/// base title predicate and optional clauses, so construction order never
/// matters and each clause can be tested on its own.
#[derive(Debug, Default)]
pub struct JobSearch {
    pub search: Option<String>,
    pub category: Option<String>,
    pub sort: Option<String>,
}

impl JobSearch {
    pub fn new(search: Option<String>, category: Option<String>, sort: Option<String>) -> Self {
        JobSearch {
            search,
            // empty query-string values mean "not filtered"
            category: category.filter(|c| !c.is_empty()),
            sort: sort.filter(|s| !s.is_empty()),
        }
    }

    /// Case-insensitive substring match on the title; an absent or empty
    /// search text matches every document. Category is exact-match when set.
    pub fn filter_doc(&self) -> Document {
        let mut filter = doc! {
            "job_title": {
                "$regex": self.search.as_deref().unwrap_or(""),
                "$options": "i",
            }
        };
        if let Some(category) = &self.category {
            filter.insert("category", category.clone());
        }
        filter
    }

    /// Deadline sort, only when the caller asked for one.
    pub fn sort_doc(&self) -> Option<Document> {
        self.sort
            .as_deref()
            .map(|dir| doc! { "deadline": if dir == "asc" { 1 } else { -1 } })
    }
}

/// Offset of a 1-based page. `None` when the page is 0 or the offset does
/// not fit in a u64; callers reject both as invalid input.
pub fn page_offset(page: u64, size: u64) -> Option<u64> {
    page.checked_sub(1)?.checked_mul(size)
}

pub struct JobRepository {
    collection: Collection<Job>,
}

impl JobRepository {
    pub fn new(client: &Client, db_name: &str) -> Self {
        let db = client.database(db_name);
        let collection = db.collection::<Job>("jobs");
        JobRepository { collection }
    }

    pub async fn find_all(&self) -> Result<Vec<Job>> {
        let mut cursor = self.collection.find(None, None).await?;
        let mut jobs = Vec::new();
        while let Some(job) = cursor.try_next().await? {
            jobs.push(job);
        }
        Ok(jobs)
    }

    pub async fn find_by_id(&self, id: ObjectId) -> Result<Option<Job>> {
        let filter = doc! { "_id": id };
        self.collection.find_one(filter, None).await
    }

    pub async fn find_by_buyer_email(&self, email: &str) -> Result<Vec<Job>> {
        let filter = doc! { "buyer.email": email };
        let mut cursor = self.collection.find(filter, None).await?;
        let mut jobs = Vec::new();
        while let Some(job) = cursor.try_next().await? {
            jobs.push(job);
        }
        Ok(jobs)
    }

    pub async fn insert(&self, job: Job) -> Result<InsertOneResult> {
        self.collection.insert_one(job, None).await
    }

    /// `$set` upsert: creates the document under this id when absent,
    /// otherwise replaces the supplied fields and keeps the id.
    pub async fn upsert(&self, id: ObjectId, fields: Document) -> Result<UpdateResult> {
        let filter = doc! { "_id": id };
        let update = doc! { "$set": fields };
        let options = UpdateOptions::builder().upsert(true).build();
        self.collection
            .clone_with_type::<Document>()
            .update_one(filter, update, options)
            .await
    }

    pub async fn delete_by_id(&self, id: ObjectId) -> Result<DeleteResult> {
        let filter = doc! { "_id": id };
        self.collection.delete_one(filter, None).await
    }

    pub async fn search(&self, query: &JobSearch, offset: u64, limit: i64) -> Result<Vec<Job>> {
        let options = FindOptions::builder()
            .sort(query.sort_doc())
            .skip(offset)
            .limit(limit)
            .build();
        let mut cursor = self.collection.find(query.filter_doc(), options).await?;
        let mut jobs = Vec::new();
        while let Some(job) = cursor.try_next().await? {
            jobs.push(job);
        }
        Ok(jobs)
    }

    /// Same filter as `search`, no sort or pagination. Pairs with the page
    /// size on the client to draw the pagination controls.
    pub async fn count(&self, query: &JobSearch) -> Result<u64> {
        self.collection
            .count_documents(query.filter_doc(), None)
            .await
    }
}
