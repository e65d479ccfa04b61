use std::rc::Rc;
use std::sync::Arc;

use actix_web::body::EitherBody;
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header;
use actix_web::{Error, HttpMessage, ResponseError};
use futures::future::{ready, LocalBoxFuture, Ready};
use tracing::{debug, warn};

use crate::auth::service::TokenGate;
use crate::error::AppError;

/// Middleware that admits only requests carrying a valid bearer credential.
///
/// Rejected requests get a 401 JSON body and never reach the wrapped
/// service. Accepted requests carry an [`AuthContext`](crate::auth::AuthContext)
/// in their extensions.
#[derive(Clone)]
pub struct RequireAuth {
    gate: Arc<TokenGate>,
}

impl RequireAuth {
    pub fn new(gate: Arc<TokenGate>) -> Self {
        Self { gate }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequireAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RequireAuthMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequireAuthMiddleware {
            service: Rc::new(service),
            gate: self.gate.clone(),
        }))
    }
}

pub struct RequireAuthMiddleware<S> {
    service: Rc<S>,
    gate: Arc<TokenGate>,
}

impl<S, B> Service<ServiceRequest> for RequireAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let authorization = req
            .headers()
            .get(header::AUTHORIZATION)
            .map(|value| value.to_str().map_err(|_| ()));

        let verdict = match authorization {
            None => self.gate.verify(None),
            Some(Ok(value)) => self.gate.verify(Some(value)),
            // Non-visible ASCII in the header can never be a valid token
            Some(Err(())) => Err(crate::error::AuthError::MalformedCredential),
        };

        match verdict {
            Ok(ctx) => {
                debug!(user_id = %ctx.subject(), path = %req.path(), "request authenticated");
                req.extensions_mut().insert(ctx);

                let service = self.service.clone();
                Box::pin(async move {
                    let res = service.call(req).await?;
                    Ok(res.map_into_left_body())
                })
            }
            Err(err) => {
                warn!(reason = err.reason(), path = %req.path(), "request rejected");
                let response = AppError::from(err).error_response();
                Box::pin(async move { Ok(req.into_response(response).map_into_right_body()) })
            }
        }
    }
}
