use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

/// Fixed one-second window limiter shared by every request that passes
/// through the router it is layered on.
#[derive(Clone, Debug)]
pub struct RpsLimit {
    limit: u32,
    slot: Arc<Mutex<(u64, u32)>>,
}

impl RpsLimit {
    fn new(limit: u32) -> Self {
        Self {
            limit: limit.max(1),
            slot: Arc::new(Mutex::new((0, 0))),
        }
    }

    fn try_acquire(&self) -> bool {
        let second = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let mut slot = self.slot.lock().expect("rate limiter mutex poisoned");
        if slot.0 != second {
            *slot = (second, 0);
        }
        if slot.1 < self.limit {
            slot.1 += 1;
            true
        } else {
            false
        }
    }
}

pub async fn rps_middleware(
    State(limit): State<RpsLimit>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if !limit.try_acquire() {
        return (StatusCode::TOO_MANY_REQUESTS, "rate_limit_exceeded").into_response();
    }
    next.run(req).await
}

pub fn new_rps_state(limit: u32) -> RpsLimit {
    RpsLimit::new(limit)
}
