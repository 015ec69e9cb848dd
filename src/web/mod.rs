pub mod admin;
pub mod delete;
pub mod rating;

use actix_web::dev::Payload;
use actix_web::{error, Error, FromRequest, HttpRequest};
use futures::future::{err, ok, Ready};

/// Header carrying the authenticated user id, set by the upstream auth layer.
pub const ACTOR_HEADER: &str = "X-Actor-Id";

/// Configures the web app by adding services from each web file.
///
/// @see https://docs.rs/actix-web/4.0.1/actix_web/struct.App.html#method.configure
pub fn configure(conf: &mut actix_web::web::ServiceConfig) {
    // Descending order. Order is important.
    // Route resolution will stop at the first match.
    admin::configure(conf);
    rating::configure(conf);
    delete::configure(conf);
}

/// Id of the user making the request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActorId(pub i32);

impl FromRequest for ActorId {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let id = req
            .headers()
            .get(ACTOR_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<i32>().ok());

        match id {
            Some(id) => ok(ActorId(id)),
            None => err(error::ErrorUnauthorized("Missing or invalid actor id.")),
        }
    }
}
