use axum::{
    Form, Json,
    extract::{
        FromRequest, Request,
        rejection::{FormRejection, JsonRejection},
    },
    http::header,
    response::{IntoResponse, Response},
};
use presence::serde::de::DeserializeOwned;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// A request body read as JSON, or as a urlencoded form when the request says so.
#[derive(Debug)]
pub struct Payload<T>(pub T);

#[derive(Debug)]
pub enum PayloadRejection {
    Json(JsonRejection),
    Form(FormRejection),
}

impl PayloadRejection {
    pub fn body_text(&self) -> String {
        match self {
            Self::Json(rejection) => rejection.body_text(),
            Self::Form(rejection) => rejection.body_text(),
        }
    }
}

impl IntoResponse for PayloadRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Json(rejection) => rejection.into_response(),
            Self::Form(rejection) => rejection.into_response(),
        }
    }
}

fn is_form(req: &Request) -> bool {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|content_type| content_type.starts_with(FORM_CONTENT_TYPE))
}

impl<T, S> FromRequest<S> for Payload<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = PayloadRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if is_form(&req) {
            let Form(value) = Form::<T>::from_request(req, state)
                .await
                .map_err(PayloadRejection::Form)?;
            Ok(Self(value))
        } else {
            let Json(value) = Json::<T>::from_request(req, state)
                .await
                .map_err(PayloadRejection::Json)?;
            Ok(Self(value))
        }
    }
}
