use mongodb::bson::oid::ObjectId;
use mongodb::bson::Document;
use serde::{Deserialize, Serialize};

/// Owner of a job posting. `email` is the identity every owner-scoped
/// query keys on.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Buyer {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
}

/// A job posting. Postings are schemaless beyond the fields the backend
/// queries on; everything else the client sends rides along in `extra`.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Job {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub job_title: String,
    pub category: String,
    pub deadline: String, // ISO date string, sorts lexically
    pub buyer: Buyer,
    #[serde(flatten)]
    pub extra: Document,
}
