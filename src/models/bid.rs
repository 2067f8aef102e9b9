use mongodb::bson::oid::ObjectId;
use mongodb::bson::Document;
use serde::{Deserialize, Serialize};

/// A bid placed on a job. `job_id` references the job, `buyer_email` is a
/// denormalized copy of the job owner's email so bid requests can be looked
/// up without a join. At most one bid may exist per (email, jobId) pair.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Bid {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub email: String,
    #[serde(rename = "jobId")]
    pub job_id: String,
    pub buyer_email: String,
    pub status: String,
    #[serde(flatten)]
    pub extra: Document,
}
