#[macro_use]
extern crate rocket;

mod config;
mod errors;
mod jwt;
mod models;
mod repository;
mod services;

use mongodb::bson::oid::ObjectId;
use mongodb::bson::{self, Bson};
use mongodb::Client;
use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::{CookieJar, Header, Status};
use rocket::serde::json::Json;
use rocket::{Build, Request, Response, Rocket, State};
use serde::{Deserialize, Serialize};

use config::AppConfig;
use errors::{ApiError, ErrorBody};
use models::bid::Bid;
use models::job::Job;
use repository::bid_repository::BidRepository;
use repository::job_repository::{page_offset, JobRepository, JobSearch};
use services::auth_guard::{self, AuthUser};

// CORS fairing. The cookie credential requires echoing a concrete allowed
// origin rather than "*".
pub struct Cors {
    allowed_origins: Vec<String>,
}

impl Cors {
    pub fn new(allowed_origins: Vec<String>) -> Self {
        Cors { allowed_origins }
    }
}

#[rocket::async_trait]
impl Fairing for Cors {
    fn info(&self) -> Info {
        Info {
            name: "Add CORS headers to responses",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        if let Some(origin) = request.headers().get_one("Origin") {
            if self.allowed_origins.iter().any(|o| o == origin) {
                response.set_header(Header::new(
                    "Access-Control-Allow-Origin",
                    origin.to_string(),
                ));
                response.set_header(Header::new("Access-Control-Allow-Credentials", "true"));
            }
        }
        response.set_header(Header::new(
            "Access-Control-Allow-Methods",
            "POST, GET, PUT, PATCH, DELETE, OPTIONS",
        ));
        response.set_header(Header::new(
            "Access-Control-Allow-Headers",
            "Content-Type, Authorization",
        ));
    }
}

// Preflight route
#[options("/<_..>")]
fn all_options() -> Status {
    Status::Ok
}

#[derive(Deserialize)]
struct TokenRequest {
    email: String,
}

#[derive(Serialize)]
struct AckResponse {
    success: bool,
}

#[derive(Serialize)]
struct CountResponse {
    count: u64,
}

// Write results on the wire, shaped like the driver's own result documents.
#[derive(Serialize)]
struct InsertResponse {
    #[serde(rename = "insertedId")]
    inserted_id: String,
}

impl From<mongodb::results::InsertOneResult> for InsertResponse {
    fn from(result: mongodb::results::InsertOneResult) -> Self {
        InsertResponse {
            inserted_id: bson_id_string(&result.inserted_id),
        }
    }
}

#[derive(Serialize)]
struct UpdateResponse {
    #[serde(rename = "matchedCount")]
    matched_count: u64,
    #[serde(rename = "modifiedCount")]
    modified_count: u64,
    #[serde(rename = "upsertedId", skip_serializing_if = "Option::is_none")]
    upserted_id: Option<String>,
}

impl From<mongodb::results::UpdateResult> for UpdateResponse {
    fn from(result: mongodb::results::UpdateResult) -> Self {
        UpdateResponse {
            matched_count: result.matched_count,
            modified_count: result.modified_count,
            upserted_id: result.upserted_id.as_ref().map(bson_id_string),
        }
    }
}

#[derive(Serialize)]
struct DeleteResponse {
    #[serde(rename = "deletedCount")]
    deleted_count: u64,
}

fn bson_id_string(id: &Bson) -> String {
    match id {
        Bson::ObjectId(oid) => oid.to_hex(),
        other => other.to_string(),
    }
}

// Issue a 365-day session token and hand it over as an HTTP-only cookie.
#[post("/jwt", format = "json", data = "<payload>")]
fn issue_token(
    payload: Json<TokenRequest>,
    cookies: &CookieJar<'_>,
    config: &State<AppConfig>,
) -> Result<Json<AckResponse>, ApiError> {
    let token =
        jwt::jwt_helper::create_token(&payload.email, config.access_token_secret.as_bytes())?;
    cookies.add(auth_guard::session_cookie(token, config.production));
    Ok(Json(AckResponse { success: true }))
}

// Clear the session cookie on logout
#[get("/logout")]
fn logout(cookies: &CookieJar<'_>) -> Json<AckResponse> {
    cookies.remove(auth_guard::removal_cookie());
    Json(AckResponse { success: true })
}

// All jobs, unfiltered, for the public browse page
#[get("/jobs")]
async fn list_jobs(job_repo: &State<JobRepository>) -> Result<Json<Vec<Job>>, ApiError> {
    Ok(Json(job_repo.find_all().await?))
}

// Single job for the details page
#[get("/jobDetail/<id>")]
async fn job_detail(id: &str, job_repo: &State<JobRepository>) -> Result<Json<Job>, ApiError> {
    let oid = ObjectId::parse_str(id)?;
    job_repo
        .find_by_id(oid)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

// Same lookup, used by the update form
#[get("/job/<id>")]
async fn job_for_update(id: &str, job_repo: &State<JobRepository>) -> Result<Json<Job>, ApiError> {
    job_detail(id, job_repo).await
}

// Upsert a job under the given id
#[put("/job/<id>", format = "json", data = "<body>")]
async fn update_job(
    id: &str,
    body: Json<serde_json::Value>,
    job_repo: &State<JobRepository>,
) -> Result<Json<UpdateResponse>, ApiError> {
    let oid = ObjectId::parse_str(id)?;
    let fields = bson::to_document(&body.into_inner())
        .map_err(|_| ApiError::InvalidParameter("body must be a JSON object".to_string()))?;
    let result = job_repo.upsert(oid, fields).await?;
    Ok(Json(UpdateResponse::from(result)))
}

// Save a new job posting
#[post("/job", format = "json", data = "<job>")]
async fn post_job(
    job: Json<Job>,
    job_repo: &State<JobRepository>,
) -> Result<Json<InsertResponse>, ApiError> {
    let result = job_repo.insert(job.into_inner()).await?;
    Ok(Json(InsertResponse::from(result)))
}

#[delete("/job/<id>")]
async fn delete_job(
    id: &str,
    job_repo: &State<JobRepository>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let oid = ObjectId::parse_str(id)?;
    let result = job_repo.delete_by_id(oid).await?;
    Ok(Json(DeleteResponse {
        deleted_count: result.deleted_count,
    }))
}

// Jobs posted by a specific user; only that user may list them
#[get("/jobs/<email>")]
async fn jobs_by_owner(
    email: &str,
    user: AuthUser,
    job_repo: &State<JobRepository>,
) -> Result<Json<Vec<Job>>, ApiError> {
    user.require_owner(email)?;
    Ok(Json(job_repo.find_by_buyer_email(email).await?))
}

// Save a bid; one bid per user per job
#[post("/bid", format = "json", data = "<bid>")]
async fn place_bid(
    bid: Json<Bid>,
    bid_repo: &State<BidRepository>,
) -> Result<Json<InsertResponse>, ApiError> {
    let result = bid_repo.submit(bid.into_inner()).await?;
    Ok(Json(InsertResponse::from(result)))
}

// Bids placed by a specific user
#[get("/myBids/<email>")]
async fn my_bids(
    email: &str,
    user: AuthUser,
    bid_repo: &State<BidRepository>,
) -> Result<Json<Vec<Bid>>, ApiError> {
    user.require_owner(email)?;
    Ok(Json(bid_repo.find_by_bidder_email(email).await?))
}

// Bid requests received by a job owner
#[get("/bidRequests/<email>")]
async fn bid_requests(
    email: &str,
    user: AuthUser,
    bid_repo: &State<BidRepository>,
) -> Result<Json<Vec<Bid>>, ApiError> {
    user.require_owner(email)?;
    Ok(Json(bid_repo.find_by_buyer_email(email).await?))
}

// Patch a bid's status. Not gated; see DESIGN.md.
#[patch("/updateStatus/<id>", format = "json", data = "<patch>")]
async fn update_bid_status(
    id: &str,
    patch: Json<serde_json::Value>,
    bid_repo: &State<BidRepository>,
) -> Result<Json<UpdateResponse>, ApiError> {
    let oid = ObjectId::parse_str(id)?;
    let fields = bson::to_document(&patch.into_inner())
        .map_err(|_| ApiError::InvalidParameter("body must be a JSON object".to_string()))?;
    let result = bid_repo.update_status(oid, fields).await?;
    Ok(Json(UpdateResponse::from(result)))
}

// Paginated, filtered, searchable job listing
#[get("/allJobs?<size>&<page>&<filter>&<sort>&<search>")]
async fn all_jobs(
    size: Option<i64>,
    page: Option<i64>,
    filter: Option<String>,
    sort: Option<String>,
    search: Option<String>,
    job_repo: &State<JobRepository>,
) -> Result<Json<Vec<Job>>, ApiError> {
    let size = size
        .filter(|s| *s >= 1)
        .ok_or_else(|| ApiError::InvalidParameter("size must be a positive integer".to_string()))?;
    let page = page
        .filter(|p| *p >= 1)
        .ok_or_else(|| ApiError::InvalidParameter("page must be a positive integer".to_string()))?;
    // offset can exceed u64 for absurd page/size pairs
    let offset = page_offset(page as u64, size as u64)
        .ok_or_else(|| ApiError::InvalidParameter("page is out of range".to_string()))?;

    let query = JobSearch::new(search, filter, sort);
    let jobs = job_repo.search(&query, offset, size).await?;
    Ok(Json(jobs))
}

// Total count for the same filter, so the client can size its pager
#[get("/jobsCount?<filter>&<search>")]
async fn jobs_count(
    filter: Option<String>,
    search: Option<String>,
    job_repo: &State<JobRepository>,
) -> Result<Json<CountResponse>, ApiError> {
    let query = JobSearch::new(search, filter, None);
    let count = job_repo.count(&query).await?;
    Ok(Json(CountResponse { count }))
}

#[get("/")]
fn index() -> &'static str {
    "marketplace server is running"
}

#[catch(404)]
fn not_found(req: &Request) -> Json<ErrorBody> {
    Json(ErrorBody {
        message: format!("404: '{}' route not found", req.uri()),
    })
}

#[catch(401)]
fn unauthorized(_req: &Request) -> Json<ErrorBody> {
    Json(ErrorBody {
        message: "Unauthorized Access".to_string(),
    })
}

fn build_rocket(config: AppConfig, client: &Client) -> Rocket<Build> {
    let job_repo = JobRepository::new(client, &config.database);
    let bid_repo = BidRepository::new(client, &config.database);
    let cors = Cors::new(config.allowed_origins.clone());

    rocket::build()
        .manage(config)
        .manage(job_repo)
        .manage(bid_repo)
        .attach(cors)
        .mount(
            "/",
            routes![
                index,
                all_options,
                issue_token,
                logout,
                list_jobs,
                job_detail,
                job_for_update,
                update_job,
                post_job,
                delete_job,
                jobs_by_owner,
                place_bid,
                my_bids,
                bid_requests,
                update_bid_status,
                all_jobs,
                jobs_count,
            ],
        )
        .register("/", catchers![not_found, unauthorized])
}

#[launch]
async fn rocket() -> _ {
    let config = AppConfig::from_env();
    let client = Client::with_uri_str(&config.mongo_uri)
        .await
        .expect("failed to connect to MongoDB");

    let bid_repo = BidRepository::new(&client, &config.database);
    if let Err(e) = bid_repo.ensure_indexes().await {
        eprintln!("could not create bid indexes: {:?}", e);
    }

    build_rocket(config, &client)
}

#[cfg(test)]
mod tests {
    use mongodb::options::{ClientOptions, ServerAddress};
    use rocket::http::{ContentType, Cookie, Status};
    use rocket::local::blocking::Client as LocalClient;

    use super::*;
    use crate::jwt::jwt_helper;

    const SECRET: &str = "route-test-secret";

    // The mongodb driver spawns its topology worker at construction time,
    // so building the client needs a live Tokio reactor even though these
    // tests never reach the store.
    fn test_runtime() -> &'static tokio::runtime::Runtime {
        static RT: std::sync::OnceLock<tokio::runtime::Runtime> = std::sync::OnceLock::new();
        RT.get_or_init(|| tokio::runtime::Runtime::new().unwrap())
    }

    // The mongodb client connects lazily, so these tests cover every path
    // that must fail before the first store round-trip.
    fn test_client(production: bool) -> LocalClient {
        let config = AppConfig {
            mongo_uri: "mongodb://localhost:27017".to_string(),
            database: "marketplace-test".to_string(),
            access_token_secret: SECRET.to_string(),
            production,
            allowed_origins: vec!["http://localhost:5173".to_string()],
        };
        let options = ClientOptions::builder()
            .hosts(vec![ServerAddress::default()])
            .build();
        let client = {
            let _guard = test_runtime().enter();
            Client::with_options(options).unwrap()
        };
        LocalClient::tracked(build_rocket(config, &client)).unwrap()
    }

    #[test]
    fn jwt_sets_http_only_same_site_cookie_in_dev() {
        let client = test_client(false);
        let response = client
            .post("/jwt")
            .header(ContentType::JSON)
            .body(r#"{"email":"a@mail.com"}"#)
            .dispatch();
        assert_eq!(response.status(), Status::Ok);

        let set_cookie = response.headers().get_one("Set-Cookie").unwrap();
        assert!(set_cookie.starts_with("token="));
        assert!(set_cookie.contains("HttpOnly"));
        assert!(set_cookie.contains("SameSite=Strict"));
        assert!(!set_cookie.contains("Secure"));
    }

    #[test]
    fn jwt_cookie_is_secure_and_cross_site_in_production() {
        let client = test_client(true);
        let response = client
            .post("/jwt")
            .header(ContentType::JSON)
            .body(r#"{"email":"a@mail.com"}"#)
            .dispatch();
        assert_eq!(response.status(), Status::Ok);

        let set_cookie = response.headers().get_one("Set-Cookie").unwrap();
        assert!(set_cookie.contains("SameSite=None"));
        assert!(set_cookie.contains("Secure"));
    }

    #[test]
    fn issued_cookie_round_trips_through_the_gate() {
        let client = test_client(false);
        client
            .post("/jwt")
            .header(ContentType::JSON)
            .body(r#"{"email":"a@mail.com"}"#)
            .dispatch();

        // the tracked client carries the cookie jar forward; a scoped
        // mismatch must still be rejected
        let response = client.get("/myBids/b@mail.com").dispatch();
        assert_eq!(response.status(), Status::Forbidden);
    }

    #[test]
    fn logout_expires_the_cookie() {
        let client = test_client(false);
        let response = client.get("/logout").dispatch();
        assert_eq!(response.status(), Status::Ok);

        let set_cookie = response.headers().get_one("Set-Cookie").unwrap();
        assert!(set_cookie.starts_with("token="));
        assert!(set_cookie.contains("Max-Age=0"));
    }

    #[test]
    fn gated_route_without_cookie_is_unauthorized() {
        let client = test_client(false);
        for path in [
            "/jobs/a@mail.com",
            "/myBids/a@mail.com",
            "/bidRequests/a@mail.com",
        ] {
            let response = client.get(path).dispatch();
            assert_eq!(response.status(), Status::Unauthorized, "{}", path);
        }
    }

    #[test]
    fn gated_route_with_foreign_token_is_forbidden() {
        let client = test_client(false);
        let token = jwt_helper::create_token("b@mail.com", SECRET.as_bytes()).unwrap();
        for path in [
            "/jobs/a@mail.com",
            "/myBids/a@mail.com",
            "/bidRequests/a@mail.com",
        ] {
            let response = client
                .get(path)
                .cookie(Cookie::new("token", token.clone()))
                .dispatch();
            assert_eq!(response.status(), Status::Forbidden, "{}", path);
        }
    }

    #[test]
    fn malformed_job_id_is_a_client_error() {
        let client = test_client(false);
        let response = client.get("/jobDetail/not-an-object-id").dispatch();
        assert_eq!(response.status(), Status::BadRequest);

        let response = client.delete("/job/also-bad").dispatch();
        assert_eq!(response.status(), Status::BadRequest);
    }

    #[test]
    fn pagination_parameters_must_be_positive() {
        let client = test_client(false);
        for uri in [
            "/allJobs?page=0&size=10",
            "/allJobs?page=1&size=0",
            "/allJobs?page=-1&size=10",
            "/allJobs?page=1",
            "/allJobs?size=10",
            // offset would overflow u64
            "/allJobs?page=9223372036854775807&size=9223372036854775807",
        ] {
            let response = client.get(uri).dispatch();
            assert_eq!(response.status(), Status::BadRequest, "{}", uri);
        }
    }

    #[test]
    fn health_route_answers() {
        let client = test_client(false);
        let response = client.get("/").dispatch();
        assert_eq!(response.status(), Status::Ok);
        assert_eq!(
            response.into_string().unwrap(),
            "marketplace server is running"
        );
    }
}
