use crate::{NewPlace, Place, PlaceId, UserInfo};
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};

/// HTTP Methods for API Requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HttpMethod {
    Get,
    Post,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// A trait that defines the request-response relationship and metadata for an API endpoint.
pub trait ApiRequest: Serialize + DeserializeOwned {
    /// The response type returned by this request.
    type Response: Serialize + DeserializeOwned;
    /// The URL path (or prefix, for requests carrying a path parameter).
    const PATH: &'static str;
    /// The HTTP method.
    const METHOD: HttpMethod;

    /// Concrete path for this request instance.
    fn path(&self) -> String {
        Self::PATH.to_string()
    }

    /// Whether the request itself is sent as the JSON body.
    fn has_body() -> bool {
        matches!(Self::METHOD, HttpMethod::Post)
    }
}

// =========================================================
// Response Helpers
// =========================================================

/// `{ "message": "..." }` acknowledgement returned by write endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusMessage {
    #[serde(default)]
    pub message: String,
}

/// A response whose body carries nothing we need.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Ack;

impl<'de> Deserialize<'de> for Ack {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        IgnoredAny::deserialize(deserializer)?;
        Ok(Ack)
    }
}

// =========================================================
// Request Definitions
// =========================================================

/// Fetch the signed-in user
#[derive(Debug, Serialize, Deserialize)]
pub struct UserInfoRequest;

impl ApiRequest for UserInfoRequest {
    type Response = UserInfo;
    const PATH: &'static str = "/userinfo";
    const METHOD: HttpMethod = HttpMethod::Get;
}

/// List the user's starred places
#[derive(Debug, Serialize, Deserialize)]
pub struct ListPlacesRequest;

impl ApiRequest for ListPlacesRequest {
    type Response = Vec<Place>;
    const PATH: &'static str = "/places";
    const METHOD: HttpMethod = HttpMethod::Get;
}

/// Save a new place (the candidate itself is the body)
impl ApiRequest for NewPlace {
    type Response = StatusMessage;
    const PATH: &'static str = "/add_place";
    const METHOD: HttpMethod = HttpMethod::Post;
}

/// Delete a place by id: `DELETE /remove_place/{id}`
#[derive(Debug, Serialize, Deserialize)]
pub struct RemovePlaceRequest {
    pub id: PlaceId,
}

impl ApiRequest for RemovePlaceRequest {
    type Response = Ack;
    const PATH: &'static str = "/remove_place";
    const METHOD: HttpMethod = HttpMethod::Delete;

    fn path(&self) -> String {
        format!("{}/{}", Self::PATH, self.id)
    }
}
