use std::sync::Arc;
use axum::{
    body::Body,
    extract::{Extension, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use moka::sync::Cache; // ✅ High-performance TTL Cache
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use std::time::Duration;
use tracing::error;

use crate::config::Config;
use crate::utils::api_response::ApiResponse;

/// JWT claims issued by the identity provider. `sub` carries the
/// numeric employee id as a string.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub username: String,
    pub role: String,
    pub exp: usize,
}

impl Claims {
    pub fn user_id(&self) -> Result<i32, ApiResponse<()>> {
        self.sub.parse::<i32>().map_err(|_| {
            ApiResponse::error(
                StatusCode::UNAUTHORIZED,
                "Invalid user ID in token",
                None,
            )
        })
    }
}

/// Permissions Cache Using `moka`
pub type PermissionCache = Arc<Cache<i32, EmployeePermissions>>;

pub fn create_permission_cache() -> PermissionCache {
    Arc::new(
        Cache::builder()
            .time_to_live(Duration::from_secs(600)) // TTL = 10 minutes
            .build(),
    )
}

pub fn decode_token(token: &str, secret: &[u8]) -> Result<Claims, jsonwebtoken::errors::Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret),
        &Validation::default(),
    )
    .map(|data| data.claims)
}

/// JWT Middleware (Handles Token Authentication)
pub async fn jwt_middleware(mut req: Request<Body>, next: Next) -> Result<Response, Response> {
    // Step 1: Extract Authorization header
    let auth_header = req.headers().get("Authorization").ok_or_else(|| {
        tracing::error!("Missing Authorization header");
        ApiResponse::<()>::error(StatusCode::UNAUTHORIZED, "Missing Authorization header", None)
            .into_response()
    })?;

    // Step 2: Convert header to string
    let token_str = auth_header.to_str().map_err(|_| {
        tracing::error!("Invalid Authorization header format");
        ApiResponse::<()>::error(
            StatusCode::BAD_REQUEST,
            "Invalid Authorization header format",
            None,
        )
        .into_response()
    })?;

    // Step 3: Strip "Bearer " prefix
    let token = token_str.strip_prefix("Bearer ").ok_or_else(|| {
        tracing::error!("Invalid token format (missing 'Bearer ' prefix)");
        ApiResponse::<()>::error(
            StatusCode::BAD_REQUEST,
            "Invalid token format (missing 'Bearer ' prefix)",
            None,
        )
        .into_response()
    })?;

    // Step 4: Decode the JWT token
    let claims = decode_token(token, Config::get().jwt_secret.as_bytes()).map_err(|e| {
        tracing::error!("JWT decoding failed: {:?}", e);
        ApiResponse::<()>::error(
            StatusCode::UNAUTHORIZED,
            "Invalid token",
            Some(json!({ "error": e.to_string() })),
        )
        .into_response()
    })?;

    // Step 5: Insert claims into request extensions
    req.extensions_mut().insert(claims);

    // Step 6: Proceed to the next middleware
    Ok(next.run(req).await)
}

/// What the workflow needs to know about the calling employee for
/// authorization decisions. Loaded from the profiles table and cached.
#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct EmployeePermissions {
    pub user_id: i32,
    pub role: String,
    pub department: String,
}

impl EmployeePermissions {
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }

    /// HR powers: decide the final stage, verify evidence, manage
    /// policies. Admins hold them too.
    pub fn is_hr(&self) -> bool {
        self.role == "hr" || self.is_admin()
    }

    /// Employees see their own requests; HR sees everyone's.
    pub fn can_view_requests_of(&self, user_id: i32) -> bool {
        self.user_id == user_id || self.is_hr()
    }
}

/// Permissions Middleware with `moka`
pub async fn permissions_middleware(
    State(db_pool): State<PgPool>,
    Extension(permission_cache): Extension<PermissionCache>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, Response> {
    let claims = req.extensions().get::<Claims>().cloned().ok_or_else(|| {
        error!("Missing JWT claims in request");
        ApiResponse::<()>::error(StatusCode::UNAUTHORIZED, "Missing JWT claims in request", None)
            .into_response()
    })?;

    let user_id = claims.user_id().map_err(IntoResponse::into_response)?;

    // Check cache first before querying DB
    if let Some(cached_permissions) = permission_cache.get(&user_id) {
        req.extensions_mut().insert(cached_permissions.clone());
        return Ok(next.run(req).await);
    }

    // If not cached, query database
    let permissions = match fetch_permissions(user_id, &db_pool).await {
        Ok(Some(permissions)) => permissions,
        Ok(None) => {
            return Err(ApiResponse::<()>::error(
                StatusCode::FORBIDDEN,
                "No employee profile is linked to this account",
                None,
            )
            .into_response());
        }
        Err(err) => {
            error!("Database query failed: {:?}", err);
            return Err(ApiResponse::<()>::error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to load employee permissions",
                Some(json!({ "error": err.to_string() })),
            )
            .into_response());
        }
    };

    // Cache the retrieved permissions
    permission_cache.insert(user_id, permissions.clone());

    // Attach to request & continue
    req.extensions_mut().insert(permissions);
    Ok(next.run(req).await)
}

async fn fetch_permissions(
    user_id: i32,
    pool: &PgPool,
) -> Result<Option<EmployeePermissions>, sqlx::Error> {
    sqlx::query_as::<_, EmployeePermissions>(
        "SELECT id AS user_id, role, department FROM profiles WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &[u8] = b"test-secret";

    fn claims_for(user_id: i32, exp: usize) -> Claims {
        Claims {
            sub: user_id.to_string(),
            username: "amina".to_string(),
            role: "employee".to_string(),
            exp,
        }
    }

    fn sign(claims: &Claims) -> String {
        encode(&Header::default(), claims, &EncodingKey::from_secret(SECRET)).unwrap()
    }

    fn future_exp() -> usize {
        (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp() as usize
    }

    #[test]
    fn valid_token_round_trips_claims() {
        let token = sign(&claims_for(7, future_exp()));
        let decoded = decode_token(&token, SECRET).unwrap();
        assert_eq!(decoded.sub, "7");
        assert_eq!(decoded.username, "amina");
        assert_eq!(decoded.user_id().unwrap(), 7);
    }

    #[test]
    fn expired_token_is_rejected() {
        let stale = (chrono::Utc::now() - chrono::Duration::hours(24)).timestamp() as usize;
        let token = sign(&claims_for(7, stale));
        assert!(decode_token(&token, SECRET).is_err());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = sign(&claims_for(7, future_exp()));
        assert!(decode_token(&token, b"other-secret").is_err());
    }

    #[test]
    fn non_numeric_subject_is_rejected() {
        let claims = Claims {
            sub: "not-a-number".to_string(),
            username: "amina".to_string(),
            role: "employee".to_string(),
            exp: future_exp(),
        };
        assert!(claims.user_id().is_err());
    }

    fn perms(user_id: i32, role: &str) -> EmployeePermissions {
        EmployeePermissions {
            user_id,
            role: role.to_string(),
            department: "Engineering".to_string(),
        }
    }

    #[test]
    fn hr_and_admin_hold_hr_powers() {
        assert!(perms(1, "hr").is_hr());
        assert!(perms(1, "admin").is_hr());
        assert!(!perms(1, "employee").is_hr());
        assert!(!perms(1, "hr").is_admin());
    }

    #[test]
    fn employees_only_see_their_own_requests() {
        assert!(perms(7, "employee").can_view_requests_of(7));
        assert!(!perms(7, "employee").can_view_requests_of(8));
        assert!(perms(2, "hr").can_view_requests_of(8));
    }
}
