//! Extractor for the user performing an admin mutation.
//!
//! Clause and contract mutations are attributed on the audit trail, so the
//! caller names themselves through the `X-Acting-User` header. Authentication
//! happens upstream of this service.

use actix_web::{FromRequest, HttpRequest, dev::Payload};
use futures_util::future::{Ready, ready};

use crate::domain::{Error, UserId};

use super::validation::{FieldName, missing_field_error, parse_id};

/// Header naming the acting user.
pub const ACTING_USER_HEADER: &str = "X-Acting-User";

const FIELD: FieldName = FieldName::new(ACTING_USER_HEADER);

/// The user an admin request acts on behalf of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActingUser(pub UserId);

impl ActingUser {
    pub fn user_id(&self) -> UserId {
        self.0
    }
}

fn acting_user(req: &HttpRequest) -> Result<ActingUser, Error> {
    let raw = req
        .headers()
        .get(ACTING_USER_HEADER)
        .ok_or_else(|| missing_field_error(FIELD))?;
    let raw = raw
        .to_str()
        .map_err(|_| Error::invalid_request(format!("{ACTING_USER_HEADER} must be ASCII")))?;
    parse_id(raw, FIELD).map(ActingUser)
}

impl FromRequest for ActingUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(acting_user(req))
    }
}
