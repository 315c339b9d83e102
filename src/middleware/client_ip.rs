// src/middleware/client_ip.rs

use std::{convert::Infallible, net::SocketAddr};

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{request::Parts, HeaderMap},
};

const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// Quem fez a requisição, para o rate limit.
///
/// Primeiro endereço do `X-Forwarded-For` (o cliente original atrás do proxy),
/// senão o endereço do socket. O header não é verificado: o serviço assume que
/// roda atrás de um proxy confiável.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity(pub String);

impl ClientIdentity {
    pub fn from_parts(headers: &HeaderMap, peer: Option<SocketAddr>) -> Self {
        let forwarded = headers
            .get(FORWARDED_FOR_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|list| list.split(',').next())
            .map(str::trim)
            .filter(|first| !first.is_empty());

        let identity = match (forwarded, peer) {
            (Some(first), _) => first.to_string(),
            (None, Some(addr)) => addr.ip().to_string(),
            (None, None) => "unknown".to_string(),
        };

        ClientIdentity(identity)
    }
}

impl<S> FromRequestParts<S> for ClientIdentity
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        Ok(ClientIdentity::from_parts(&parts.headers, peer))
    }
}
