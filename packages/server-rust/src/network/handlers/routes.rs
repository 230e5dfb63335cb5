//! `/dynamic` admin endpoints.
//!
//! Request bodies keep the field names existing clients already send.
//! Ports are accepted as JSON numbers or strings; `0` and the empty string
//! both mean "not given".

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use routegate_core::{HostData, RouteSpec};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use tracing::info;

use super::{ApiError, AppState};
use crate::engine::RouteSummary;
use crate::lifecycle::parse_transform_flag;

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(untagged)]
enum PortValue {
    Number(u64),
    Text(String),
}

fn flexible_port<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u16>, D::Error> {
    let number = match Option::<PortValue>::deserialize(deserializer)? {
        None => return Ok(None),
        Some(PortValue::Number(n)) => n,
        Some(PortValue::Text(s)) if s.trim().is_empty() => return Ok(None),
        Some(PortValue::Text(s)) => s
            .trim()
            .parse()
            .map_err(|_| D::Error::custom(format!("invalid port {s:?}")))?,
    };
    match number {
        0 => Ok(None),
        n => u16::try_from(n)
            .map(Some)
            .map_err(|_| D::Error::custom(format!("port {n} out of range"))),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FlagValue {
    Bool(bool),
    Text(String),
}

fn flexible_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
    Ok(match Option::<FlagValue>::deserialize(deserializer)? {
        None => None,
        Some(FlagValue::Bool(b)) => Some(b),
        Some(FlagValue::Text(s)) => parse_transform_flag(&s),
    })
}

/// Body of `POST /dynamic/add`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddRouteRequest {
    pub service_name: String,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default, deserialize_with = "flexible_port")]
    pub port: Option<u16>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub local_uri: Option<String>,
    #[serde(default)]
    pub xslt_path: Option<String>,
    #[serde(default, deserialize_with = "flexible_port")]
    pub rest_port: Option<u16>,
    #[serde(default)]
    pub rest_path: Option<String>,
}

impl From<AddRouteRequest> for RouteSpec {
    fn from(req: AddRouteRequest) -> Self {
        Self {
            service_name: req.service_name,
            protocol: req.protocol,
            host: req.host,
            port: req.port,
            path: req.path,
            local_uri: req.local_uri,
            xslt_path: req.xslt_path,
            rest_port: req.rest_port,
            rest_path: req.rest_path,
        }
    }
}

/// Body of `POST /dynamic/soap` and `POST /dynamic/modify`.
#[derive(Debug, Deserialize)]
pub struct SoapRouteRequest {
    #[serde(rename = "nameService")]
    pub service_name: String,
    #[serde(rename = "protocolService", default)]
    pub protocol: Option<String>,
    #[serde(rename = "hostService", default)]
    pub host: Option<String>,
    #[serde(rename = "portService", default, deserialize_with = "flexible_port")]
    pub port: Option<u16>,
    #[serde(rename = "pathService", default)]
    pub path: Option<String>,
}

impl From<SoapRouteRequest> for RouteSpec {
    fn from(req: SoapRouteRequest) -> Self {
        Self {
            protocol: req.protocol,
            host: req.host,
            port: req.port,
            path: req.path,
            ..Self::new(req.service_name)
        }
    }
}

/// Body of `POST /dynamic/stopRoute` and `POST /dynamic/startRoute`.
#[derive(Debug, Deserialize)]
pub struct RouteIdRequest {
    #[serde(rename = "routeId")]
    pub route_id: String,
    /// Transform flag; absent or empty leaves it unchanged.
    #[serde(rename = "xstlValue", default, deserialize_with = "flexible_flag")]
    pub transform: Option<bool>,
}

/// Body carrying only a service name.
#[derive(Debug, Deserialize)]
pub struct ServiceNameRequest {
    #[serde(rename = "nameService")]
    pub service_name: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `POST /dynamic/add`: REST front route, translated to SOAP.
///
/// # Errors
///
/// Any lifecycle failure is answered with 500.
pub async fn add_route_handler(
    State(state): State<AppState>,
    body: Result<Json<AddRouteRequest>, JsonRejection>,
) -> Result<(StatusCode, &'static str), ApiError> {
    let Json(req) = body?;
    state.manager.add_route(&req.into()).await?;
    Ok((StatusCode::CREATED, "Route created successfully"))
}

/// `POST /dynamic/soap`: create or replace a SOAP route pair.
///
/// # Errors
///
/// Any lifecycle failure is answered with 500.
pub async fn soap_route_handler(
    State(state): State<AppState>,
    body: Result<Json<SoapRouteRequest>, JsonRejection>,
) -> Result<(StatusCode, &'static str), ApiError> {
    let Json(req) = body?;
    state.manager.upsert_soap_route(&req.into()).await?;
    Ok((StatusCode::CREATED, "SOAP route created successfully"))
}

/// `POST /dynamic/modify`: same as `/soap`, reported as a modification.
///
/// # Errors
///
/// Any lifecycle failure is answered with 500.
pub async fn modify_route_handler(
    State(state): State<AppState>,
    body: Result<Json<SoapRouteRequest>, JsonRejection>,
) -> Result<(StatusCode, &'static str), ApiError> {
    let Json(req) = body?;
    info!(service = %req.service_name, "modifying route");
    state.manager.upsert_soap_route(&req.into()).await?;
    Ok((StatusCode::CREATED, "Route modified successfully"))
}

/// `POST /dynamic/stopRoute`
///
/// # Errors
///
/// A route that cannot be stopped is answered with 500.
pub async fn stop_route_handler(
    State(state): State<AppState>,
    body: Result<Json<RouteIdRequest>, JsonRejection>,
) -> Result<&'static str, ApiError> {
    let Json(req) = body?;
    state.manager.stop_route(&req.route_id, req.transform).await?;
    Ok("Transform flag applied")
}

/// `POST /dynamic/startRoute`. Start failures are logged, never reported.
///
/// # Errors
///
/// A malformed body is answered with 500.
pub async fn start_route_handler(
    State(state): State<AppState>,
    body: Result<Json<RouteIdRequest>, JsonRejection>,
) -> Result<&'static str, ApiError> {
    let Json(req) = body?;
    state.manager.start_route(&req.route_id).await;
    Ok("Route started")
}

/// `POST /dynamic/deleteRoute`
///
/// # Errors
///
/// Any lifecycle failure is answered with 500.
pub async fn delete_route_handler(
    State(state): State<AppState>,
    body: Result<Json<ServiceNameRequest>, JsonRejection>,
) -> Result<&'static str, ApiError> {
    let Json(req) = body?;
    if state.manager.delete_route(&req.service_name).await? {
        Ok("Route deleted successfully")
    } else {
        Ok("No stored route to delete")
    }
}

/// `POST /dynamic/dataHost`: stored backend fields, or `null`.
///
/// # Errors
///
/// Store failures are answered with 500.
pub async fn data_host_handler(
    State(state): State<AppState>,
    body: Result<Json<ServiceNameRequest>, JsonRejection>,
) -> Result<Json<Option<HostData>>, ApiError> {
    let Json(req) = body?;
    Ok(Json(state.manager.host_data(&req.service_name).await?))
}

/// `POST /dynamic/variable`
///
/// # Errors
///
/// Store failures are answered with 500.
pub async fn set_variable_handler(
    State(state): State<AppState>,
    body: Result<Json<ServiceNameRequest>, JsonRejection>,
) -> Result<(StatusCode, &'static str), ApiError> {
    let Json(req) = body?;
    state.manager.set_variable(&req.service_name).await?;
    Ok((StatusCode::CREATED, "Variable created successfully"))
}

/// `GET /dynamic/getVariable`: the stored name, or `null`.
///
/// # Errors
///
/// Store failures are answered with 500.
pub async fn get_variable_handler(
    State(state): State<AppState>,
) -> Result<Json<Option<String>>, ApiError> {
    Ok(Json(state.manager.get_variable().await?))
}

/// `GET /dynamic/routes`
pub async fn list_routes_handler(State(state): State<AppState>) -> Json<Vec<RouteSummary>> {
    Json(state.manager.list_routes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn soap_request_accepts_string_and_numeric_ports() {
        let text: SoapRouteRequest = serde_json::from_str(
            r#"{"nameService":"billing","hostService":"h","portService":"8080"}"#,
        )
        .unwrap();
        assert_eq!(text.port, Some(8080));

        let number: SoapRouteRequest =
            serde_json::from_str(r#"{"nameService":"billing","portService":8080}"#).unwrap();
        assert_eq!(number.port, Some(8080));

        let empty: SoapRouteRequest =
            serde_json::from_str(r#"{"nameService":"billing","portService":""}"#).unwrap();
        assert_eq!(empty.port, None);

        let absent: SoapRouteRequest = serde_json::from_str(r#"{"nameService":"billing"}"#).unwrap();
        assert_eq!(absent.port, None);
        assert_eq!(absent.host, None);
    }

    #[test]
    fn invalid_ports_are_rejected() {
        assert!(serde_json::from_str::<SoapRouteRequest>(
            r#"{"nameService":"billing","portService":"http"}"#
        )
        .is_err());
        assert!(serde_json::from_str::<SoapRouteRequest>(
            r#"{"nameService":"billing","portService":70000}"#
        )
        .is_err());
    }

    #[test]
    fn add_request_maps_onto_spec() {
        let req: AddRouteRequest = serde_json::from_str(
            r#"{"serviceName":"cards","protocol":"http","host":"b","port":0,
                "path":"/soap","localUri":"card","xsltPath":"","restPort":9000,"restPath":"api"}"#,
        )
        .unwrap();
        let spec = RouteSpec::from(req);
        assert_eq!(spec.service_name, "cards");
        assert_eq!(spec.port, None);
        assert_eq!(spec.rest_port, Some(9000));
        assert_eq!(spec.local_uri(), "card");
    }

    #[test]
    fn transform_flag_accepts_text_and_bool() {
        let parse = |body: &str| serde_json::from_str::<RouteIdRequest>(body).unwrap().transform;
        assert_eq!(parse(r#"{"routeId":"billing","xstlValue":"true"}"#), Some(true));
        assert_eq!(parse(r#"{"routeId":"billing","xstlValue":"FALSE"}"#), Some(false));
        assert_eq!(parse(r#"{"routeId":"billing","xstlValue":""}"#), None);
        assert_eq!(parse(r#"{"routeId":"billing","xstlValue":true}"#), Some(true));
        assert_eq!(parse(r#"{"routeId":"billing"}"#), None);
    }
}
